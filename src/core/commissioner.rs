//! Commissioner business logic - accounts, credentials and commission rates.
//!
//! Passwords are hashed with bcrypt before they reach the database and are
//! never returned in plain text. Emails are compared lower-cased.

use crate::{
    config::Settings,
    core::require_text,
    entities::{AuctionSession, Bill, Buyer, Commissioner, Farmer, commissioner},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{debug, info, warn};

const MIN_PASSWORD_LEN: usize = 8;

/// Input for [`register_commissioner`].
#[derive(Clone)]
pub struct NewCommissioner {
    pub name: String,
    pub location: String,
    pub phone: String,
    pub email: String,
    /// Plain-text password, hashed before storage
    pub password: String,
    pub commission_rate: f64,
}

/// Fields of a commissioner profile that may change. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub location: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

pub(crate) fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(Error::validation(format!("'{email}' is not a valid email")));
    }
    Ok(email)
}

pub(crate) fn validate_commission_rate(rate: f64) -> Result<()> {
    if !rate.is_finite() || !(0.0..=100.0).contains(&rate) {
        return Err(Error::InvalidAmount { amount: rate });
    }
    Ok(())
}

/// Hashes a new password on the blocking thread pool.
pub(crate) async fn hash_password(password: &str, settings: &Settings) -> Result<String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    let password = password.to_string();
    let cost = settings.bcrypt_cost;
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await?
        .map_err(Into::into)
}

/// Checks a password against a stored bcrypt hash on the blocking thread pool.
pub(crate) async fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await?
        .map_err(Into::into)
}

/// Creates a commissioner account.
///
/// # Errors
/// Returns an error if:
/// - The name is empty or the email is malformed
/// - The password is shorter than 8 characters
/// - The commission rate is outside `0..=100`
/// - Another commissioner already uses the email
pub async fn register_commissioner(
    db: &DatabaseConnection,
    settings: &Settings,
    input: NewCommissioner,
) -> Result<commissioner::Model> {
    let name = require_text(&input.name, "Commissioner name")?;
    let email = normalize_email(&input.email)?;
    validate_commission_rate(input.commission_rate)?;

    if get_commissioner_by_email(db, &email).await?.is_some() {
        return Err(Error::conflict(format!("Email '{email}' is already registered")));
    }

    let password = hash_password(&input.password, settings).await?;
    let now = chrono::Utc::now();

    let commissioner = commissioner::ActiveModel {
        name: Set(name),
        location: Set(input.location.trim().to_string()),
        phone: Set(input.phone.trim().to_string()),
        email: Set(email),
        password: Set(password),
        commission_rate: Set(input.commission_rate),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let created = commissioner.insert(db).await?;
    info!(
        "Registered commissioner '{}' (ID: {})",
        created.name, created.id
    );
    Ok(created)
}

/// Finds a commissioner by primary key.
pub async fn get_commissioner_by_id<C>(
    db: &C,
    commissioner_id: i64,
) -> Result<Option<commissioner::Model>>
where
    C: ConnectionTrait,
{
    Commissioner::find_by_id(commissioner_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Like [`get_commissioner_by_id`] but a missing row is an error.
pub(crate) async fn require_commissioner<C>(
    db: &C,
    commissioner_id: i64,
) -> Result<commissioner::Model>
where
    C: ConnectionTrait,
{
    get_commissioner_by_id(db, commissioner_id)
        .await?
        .ok_or_else(|| Error::not_found("commissioner", commissioner_id))
}

/// Finds a commissioner by login email, ignoring case and surrounding whitespace.
pub async fn get_commissioner_by_email(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Option<commissioner::Model>> {
    let email = email.trim().to_lowercase();
    debug!("Looking up commissioner by email {}", email);
    Commissioner::find()
        .filter(commissioner::Column::Email.eq(email))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists all commissioners ordered by name.
pub async fn list_commissioners(db: &DatabaseConnection) -> Result<Vec<commissioner::Model>> {
    Commissioner::find()
        .order_by_asc(commissioner::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Updates name, location, phone and/or email.
///
/// # Errors
/// Returns an error if the commissioner does not exist, a new value is
/// empty or malformed, or the new email belongs to another commissioner.
pub async fn update_commissioner_profile(
    db: &DatabaseConnection,
    commissioner_id: i64,
    update: ProfileUpdate,
) -> Result<commissioner::Model> {
    let mut commissioner: commissioner::ActiveModel =
        require_commissioner(db, commissioner_id).await?.into();

    if let Some(name) = update.name {
        commissioner.name = Set(require_text(&name, "Commissioner name")?);
    }
    if let Some(location) = update.location {
        commissioner.location = Set(location.trim().to_string());
    }
    if let Some(phone) = update.phone {
        commissioner.phone = Set(phone.trim().to_string());
    }
    if let Some(email) = update.email {
        let email = normalize_email(&email)?;
        if let Some(other) = get_commissioner_by_email(db, &email).await? {
            if other.id != commissioner_id {
                return Err(Error::conflict(format!(
                    "Email '{email}' is already registered"
                )));
            }
        }
        commissioner.email = Set(email);
    }
    commissioner.updated_at = Set(chrono::Utc::now());

    let updated = commissioner.update(db).await?;
    info!("Updated profile of commissioner {}", commissioner_id);
    Ok(updated)
}

/// Sets the commission percentage used for bills generated from now on.
pub async fn update_commission_rate(
    db: &DatabaseConnection,
    commissioner_id: i64,
    commission_rate: f64,
) -> Result<commissioner::Model> {
    validate_commission_rate(commission_rate)?;

    let mut commissioner: commissioner::ActiveModel =
        require_commissioner(db, commissioner_id).await?.into();
    commissioner.commission_rate = Set(commission_rate);
    commissioner.updated_at = Set(chrono::Utc::now());

    let updated = commissioner.update(db).await?;
    info!(
        "Commission rate of commissioner {} set to {}%",
        commissioner_id, commission_rate
    );
    Ok(updated)
}

/// Checks an email/password pair and returns the matching commissioner.
///
/// Unknown emails and wrong passwords both yield [`Error::InvalidCredentials`].
pub async fn authenticate(
    db: &DatabaseConnection,
    email: &str,
    password: &str,
) -> Result<commissioner::Model> {
    let Some(commissioner) = get_commissioner_by_email(db, email).await? else {
        warn!("Login attempt for unknown email");
        return Err(Error::InvalidCredentials);
    };

    if verify_password(password, &commissioner.password).await? {
        Ok(commissioner)
    } else {
        warn!("Wrong password for commissioner {}", commissioner.id);
        Err(Error::InvalidCredentials)
    }
}

/// Replaces the password after checking the current one.
pub async fn change_password(
    db: &DatabaseConnection,
    settings: &Settings,
    commissioner_id: i64,
    current_password: &str,
    new_password: &str,
) -> Result<()> {
    let existing = require_commissioner(db, commissioner_id).await?;
    if !verify_password(current_password, &existing.password).await? {
        return Err(Error::InvalidCredentials);
    }

    let hashed = hash_password(new_password, settings).await?;
    let mut commissioner: commissioner::ActiveModel = existing.into();
    commissioner.password = Set(hashed);
    commissioner.updated_at = Set(chrono::Utc::now());
    commissioner.update(db).await?;

    info!("Password changed for commissioner {}", commissioner_id);
    Ok(())
}

/// Deletes a commissioner that owns no business records.
///
/// Password reset tokens are removed with it.
///
/// # Errors
/// Returns [`Error::InvalidState`] while farmers, buyers, sessions or bills
/// still reference the commissioner.
pub async fn delete_commissioner(db: &DatabaseConnection, commissioner_id: i64) -> Result<()> {
    let commissioner = require_commissioner(db, commissioner_id).await?;

    let owned = Farmer::find()
        .filter(crate::entities::farmer::Column::CommissionerId.eq(commissioner_id))
        .count(db)
        .await?
        + Buyer::find()
            .filter(crate::entities::buyer::Column::CommissionerId.eq(commissioner_id))
            .count(db)
            .await?
        + AuctionSession::find()
            .filter(crate::entities::auction_session::Column::CommissionerId.eq(commissioner_id))
            .count(db)
            .await?
        + Bill::find()
            .filter(crate::entities::bill::Column::CommissionerId.eq(commissioner_id))
            .count(db)
            .await?;

    if owned > 0 {
        warn!(
            "Refusing to delete commissioner {} which owns {} records",
            commissioner_id, owned
        );
        return Err(Error::invalid_state(format!(
            "Commissioner {commissioner_id} still owns {owned} records"
        )));
    }

    commissioner.delete(db).await?;
    info!("Deleted commissioner {}", commissioner_id);
    Ok(())
}

/// Number of registered commissioners.
pub async fn count_commissioners(db: &DatabaseConnection) -> Result<u64> {
    Commissioner::find().count(db).await.map_err(Into::into)
}
