//! Password reset tokens.
//!
//! A token is issued for a commissioner's email, can be used exactly once, and
//! expires after the configured TTL. Consuming a token and replacing the
//! password happen in a single database transaction.

use crate::{
    config::Settings,
    core::commissioner::{get_commissioner_by_email, hash_password},
    entities::{Commissioner, PasswordReset, commissioner, password_reset},
    errors::{Error, Result},
};
use chrono::{Duration, Utc};
use rand::{Rng, distributions::Alphanumeric};
use sea_orm::{Condition, QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{debug, info, warn};

const TOKEN_LEN: usize = 48;

fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Issues a new reset token for the commissioner registered under `email`.
///
/// # Errors
/// Returns [`Error::NotFound`] if no commissioner uses the email.
pub async fn create_reset_token(
    db: &DatabaseConnection,
    settings: &Settings,
    email: &str,
) -> Result<password_reset::Model> {
    let commissioner = get_commissioner_by_email(db, email)
        .await?
        .ok_or_else(|| Error::not_found("commissioner", email.trim()))?;

    let now = Utc::now();
    let reset = password_reset::ActiveModel {
        commissioner_id: Set(commissioner.id),
        token: Set(generate_token()),
        expires_at: Set(now + Duration::minutes(settings.reset_token_ttl_minutes)),
        used: Set(false),
        created_at: Set(now),
        used_at: Set(None),
        ..Default::default()
    };

    let created = reset.insert(db).await?;
    info!(
        "Issued password reset token {} for commissioner {}",
        created.id, commissioner.id
    );
    Ok(created)
}

async fn find_usable_token<C>(db: &C, token: &str) -> Result<password_reset::Model>
where
    C: ConnectionTrait,
{
    let reset = PasswordReset::find()
        .filter(password_reset::Column::Token.eq(token))
        .one(db)
        .await?
        .ok_or(Error::InvalidResetToken)?;

    if reset.used || reset.expires_at <= Utc::now() {
        debug!("Reset token {} is used or expired", reset.id);
        return Err(Error::InvalidResetToken);
    }
    Ok(reset)
}

/// Returns the token row if it exists, is unused and has not expired.
pub async fn verify_reset_token(
    db: &DatabaseConnection,
    token: &str,
) -> Result<password_reset::Model> {
    find_usable_token(db, token).await
}

/// Consumes `token` and sets a new password for its commissioner.
///
/// # Errors
/// Returns [`Error::InvalidResetToken`] for unknown, used or expired tokens and
/// [`Error::Validation`] if the new password is too short.
pub async fn reset_password(
    db: &DatabaseConnection,
    settings: &Settings,
    token: &str,
    new_password: &str,
) -> Result<commissioner::Model> {
    let hashed = hash_password(new_password, settings).await?;

    let txn = db.begin().await?;

    let reset = match find_usable_token(&txn, token).await {
        Ok(reset) => reset,
        Err(e) => {
            warn!("Rejected password reset attempt");
            return Err(e);
        }
    };
    let commissioner_id = reset.commissioner_id;

    let mut commissioner: commissioner::ActiveModel = Commissioner::find_by_id(commissioner_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("commissioner", commissioner_id))?
        .into();
    let now = Utc::now();
    commissioner.password = Set(hashed);
    commissioner.updated_at = Set(now);
    let updated = commissioner.update(&txn).await?;

    let mut reset: password_reset::ActiveModel = reset.into();
    reset.used = Set(true);
    reset.used_at = Set(Some(now));
    reset.update(&txn).await?;

    txn.commit().await?;

    info!("Password reset for commissioner {}", commissioner_id);
    Ok(updated)
}

/// Lists every token issued to a commissioner, newest first.
pub async fn list_reset_tokens_for_commissioner(
    db: &DatabaseConnection,
    commissioner_id: i64,
) -> Result<Vec<password_reset::Model>> {
    PasswordReset::find()
        .filter(password_reset::Column::CommissionerId.eq(commissioner_id))
        .order_by_desc(password_reset::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes tokens that are used or expired. Returns how many were removed.
pub async fn purge_expired_tokens(db: &DatabaseConnection) -> Result<u64> {
    let result = PasswordReset::delete_many()
        .filter(
            Condition::any()
                .add(password_reset::Column::Used.eq(true))
                .add(password_reset::Column::ExpiresAt.lte(Utc::now())),
        )
        .exec(db)
        .await?;

    if result.rows_affected > 0 {
        info!("Purged {} stale password reset tokens", result.rows_affected);
    }
    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::commissioner::authenticate;
    use crate::test_utils::*;

    #[test]
    fn test_generate_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, generate_token());
    }

    #[tokio::test]
    async fn test_create_reset_token_unknown_email() -> Result<()> {
        let db = setup_test_db().await?;

        let result = create_reset_token(&db, &test_settings(), "ghost@market.in").await;
        assert!(matches!(result.unwrap_err(), Error::NotFound { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_reset_password_flow() -> Result<()> {
        let db = setup_test_db().await?;
        let settings = test_settings();
        let owner = create_test_commissioner(&db, "reset@market.in").await?;

        let reset = create_reset_token(&db, &settings, "Reset@Market.in").await?;
        assert_eq!(reset.commissioner_id, owner.id);
        assert!(!reset.used);
        assert!(reset.expires_at > Utc::now());

        let verified = verify_reset_token(&db, &reset.token).await?;
        assert_eq!(verified.id, reset.id);

        reset_password(&db, &settings, &reset.token, "brand-new-pass").await?;
        assert!(authenticate(&db, "reset@market.in", "brand-new-pass").await.is_ok());

        // Tokens are single-use
        let again = reset_password(&db, &settings, &reset.token, "another-pass-1").await;
        assert!(matches!(again.unwrap_err(), Error::InvalidResetToken));

        let tokens = list_reset_tokens_for_commissioner(&db, owner.id).await?;
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].used);
        assert!(tokens[0].used_at.is_some());

        Ok(())
    }

    #[tokio::test]
    async fn test_expired_token_rejected_and_purged() -> Result<()> {
        let db = setup_test_db().await?;
        let settings = test_settings();
        create_test_commissioner(&db, "late@market.in").await?;

        let reset = create_reset_token(&db, &settings, "late@market.in").await?;
        let mut expired: password_reset::ActiveModel = reset.clone().into();
        expired.expires_at = Set(Utc::now() - Duration::minutes(1));
        expired.update(&db).await?;

        let result = verify_reset_token(&db, &reset.token).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidResetToken));

        let fresh = create_reset_token(&db, &settings, "late@market.in").await?;
        assert_eq!(purge_expired_tokens(&db).await?, 1);
        assert!(verify_reset_token(&db, &fresh.token).await.is_ok());

        Ok(())
    }

    #[tokio::test]
    async fn test_short_password_does_not_consume_token() -> Result<()> {
        let db = setup_test_db().await?;
        let settings = test_settings();
        create_test_commissioner(&db, "keep@market.in").await?;
        let reset = create_reset_token(&db, &settings, "keep@market.in").await?;

        let result = reset_password(&db, &settings, &reset.token, "short").await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));
        assert!(verify_reset_token(&db, &reset.token).await.is_ok());

        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_token_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let result = verify_reset_token(&db, "nope").await;
        assert!(matches!(result.unwrap_err(), Error::InvalidResetToken));
        Ok(())
    }
}
