//! Auction session lifecycle.
//!
//! Sessions open `ACTIVE`. Completing a session requires every lot to be sold.
//! The payment status is derived, never set directly: it is `COMPLETED` only
//! when the session is completed, every lot is billed and every bill is paid.

use crate::{
    core::commissioner::require_commissioner,
    entities::{
        AuctionItem, AuctionSession, Bill, BillPaymentStatus, SessionPaymentStatus, SessionStatus,
        auction_item, auction_session, bill,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{Condition, QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{debug, info, warn};

/// Opens a new `ACTIVE` session for a commissioner on `date`.
pub async fn open_session(
    db: &DatabaseConnection,
    commissioner_id: i64,
    date: NaiveDate,
) -> Result<auction_session::Model> {
    require_commissioner(db, commissioner_id).await?;

    let now = chrono::Utc::now();
    let session = auction_session::ActiveModel {
        date: Set(date),
        commissioner_id: Set(commissioner_id),
        status: Set(SessionStatus::Active),
        payment_status: Set(SessionPaymentStatus::Pending),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let created = session.insert(db).await?;
    info!(
        "Opened auction session {} on {} for commissioner {}",
        created.id, date, commissioner_id
    );
    Ok(created)
}

/// Finds a session by its unique ID.
pub async fn get_session_by_id<C>(db: &C, session_id: i64) -> Result<Option<auction_session::Model>>
where
    C: ConnectionTrait,
{
    AuctionSession::find_by_id(session_id)
        .one(db)
        .await
        .map_err(Into::into)
}

pub(crate) async fn require_session<C>(db: &C, session_id: i64) -> Result<auction_session::Model>
where
    C: ConnectionTrait,
{
    get_session_by_id(db, session_id)
        .await?
        .ok_or_else(|| Error::not_found("auction session", session_id))
}

/// Sessions of a commissioner, most recent date first.
pub async fn list_sessions(
    db: &DatabaseConnection,
    commissioner_id: i64,
) -> Result<Vec<auction_session::Model>> {
    AuctionSession::find()
        .filter(auction_session::Column::CommissionerId.eq(commissioner_id))
        .order_by_desc(auction_session::Column::Date)
        .order_by_desc(auction_session::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Sessions of a commissioner in the given status, most recent date first.
pub async fn list_sessions_by_status(
    db: &DatabaseConnection,
    commissioner_id: i64,
    status: SessionStatus,
) -> Result<Vec<auction_session::Model>> {
    AuctionSession::find()
        .filter(auction_session::Column::CommissionerId.eq(commissioner_id))
        .filter(auction_session::Column::Status.eq(status))
        .order_by_desc(auction_session::Column::Date)
        .order_by_desc(auction_session::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

fn unsold_condition() -> Condition {
    Condition::any()
        .add(auction_item::Column::BuyerId.is_null())
        .add(auction_item::Column::Rate.is_null())
}

/// Closes an `ACTIVE` session.
///
/// The unsold check, the status change and the payment status refresh run in
/// one transaction.
///
/// # Errors
/// Returns [`Error::InvalidState`] if the session is already completed or
/// still has unsold lots.
pub async fn complete_session(
    db: &DatabaseConnection,
    session_id: i64,
) -> Result<auction_session::Model> {
    let txn = db.begin().await?;

    let session = require_session(&txn, session_id).await?;
    if session.status != SessionStatus::Active {
        return Err(Error::invalid_state(format!(
            "Session {session_id} is already completed"
        )));
    }

    let unsold = AuctionItem::find()
        .filter(auction_item::Column::SessionId.eq(session_id))
        .filter(unsold_condition())
        .count(&txn)
        .await?;
    if unsold > 0 {
        warn!(
            "Cannot complete session {}: {} lots unsold",
            session_id, unsold
        );
        return Err(Error::invalid_state(format!(
            "Session {session_id} still has {unsold} unsold lots"
        )));
    }

    let mut active: auction_session::ActiveModel = session.into();
    active.status = Set(SessionStatus::Completed);
    active.updated_at = Set(chrono::Utc::now());
    active.update(&txn).await?;

    let completed = refresh_payment_status(&txn, session_id).await?;
    txn.commit().await?;

    info!("Completed auction session {}", session_id);
    Ok(completed)
}

/// Recomputes and stores the payment status of a session.
///
/// Works on a plain connection or inside an open transaction.
pub async fn refresh_payment_status<C>(db: &C, session_id: i64) -> Result<auction_session::Model>
where
    C: ConnectionTrait,
{
    let session = require_session(db, session_id).await?;

    let unbilled = AuctionItem::find()
        .filter(auction_item::Column::SessionId.eq(session_id))
        .filter(auction_item::Column::BillId.is_null())
        .count(db)
        .await?;
    let unpaid = Bill::find()
        .filter(bill::Column::SessionId.eq(session_id))
        .filter(bill::Column::PaymentStatus.eq(BillPaymentStatus::Unpaid))
        .count(db)
        .await?;

    let status = if session.status == SessionStatus::Completed && unbilled == 0 && unpaid == 0 {
        SessionPaymentStatus::Completed
    } else {
        SessionPaymentStatus::Pending
    };
    debug!(
        "Session {}: {} unbilled lots, {} unpaid bills -> {:?}",
        session_id, unbilled, unpaid, status
    );

    if session.payment_status == status {
        return Ok(session);
    }

    let mut active: auction_session::ActiveModel = session.into();
    active.payment_status = Set(status);
    active.updated_at = Set(chrono::Utc::now());
    let updated = active.update(db).await?;
    info!("Session {} payment status now {:?}", session_id, status);
    Ok(updated)
}

/// Deletes a session together with its lots.
///
/// # Errors
/// Returns [`Error::InvalidState`] once any bill has been generated for the
/// session.
pub async fn delete_session(db: &DatabaseConnection, session_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let session = require_session(&txn, session_id).await?;
    let bills = Bill::find()
        .filter(bill::Column::SessionId.eq(session_id))
        .count(&txn)
        .await?;
    if bills > 0 {
        return Err(Error::invalid_state(format!(
            "Session {session_id} has {bills} bills"
        )));
    }

    let removed = AuctionItem::delete_many()
        .filter(auction_item::Column::SessionId.eq(session_id))
        .exec(&txn)
        .await?;
    session.delete(&txn).await?;

    txn.commit().await?;
    info!(
        "Deleted auction session {} and {} lots",
        session_id, removed.rows_affected
    );
    Ok(())
}

/// Number of sessions of a commissioner, optionally restricted to one status.
pub async fn count_sessions(
    db: &DatabaseConnection,
    commissioner_id: i64,
    status: Option<SessionStatus>,
) -> Result<u64> {
    let mut query = AuctionSession::find()
        .filter(auction_session::Column::CommissionerId.eq(commissioner_id));
    if let Some(status) = status {
        query = query.filter(auction_session::Column::Status.eq(status));
    }
    query.count(db).await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::auction_item::record_sale;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_open_session() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_commissioner(&db, "session@market.in").await?;

        let session = open_session(&db, owner.id, test_date()).await?;
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(session.payment_status, SessionPaymentStatus::Pending);
        assert_eq!(session.date, test_date());

        let missing = open_session(&db, 999, test_date()).await;
        assert!(matches!(missing.unwrap_err(), Error::NotFound { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_list_sessions_newest_first() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_commissioner(&db, "list@market.in").await?;

        let older = open_session(&db, owner.id, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()).await?;
        let newer = open_session(&db, owner.id, NaiveDate::from_ymd_opt(2024, 2, 5).unwrap()).await?;

        let sessions = list_sessions(&db, owner.id).await?;
        assert_eq!(sessions, vec![newer.clone(), older.clone()]);

        complete_session(&db, older.id).await?;
        let active = list_sessions_by_status(&db, owner.id, SessionStatus::Active).await?;
        assert_eq!(active, vec![newer]);
        assert_eq!(count_sessions(&db, owner.id, None).await?, 2);
        assert_eq!(
            count_sessions(&db, owner.id, Some(SessionStatus::Completed)).await?,
            1
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_complete_session_requires_all_lots_sold() -> Result<()> {
        let fx = setup_auction().await?;
        let item = create_test_item(&fx, 12.0).await?;

        let result = complete_session(&fx.db, fx.session.id).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidState { .. }));

        record_sale(&fx.db, item.id, fx.buyer.id, 18.5).await?;
        let completed = complete_session(&fx.db, fx.session.id).await?;
        assert_eq!(completed.status, SessionStatus::Completed);
        // The sold lot is not billed yet
        assert_eq!(completed.payment_status, SessionPaymentStatus::Pending);

        let again = complete_session(&fx.db, fx.session.id).await;
        assert!(matches!(again.unwrap_err(), Error::InvalidState { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_refused_completion_leaves_session_open() -> Result<()> {
        let fx = setup_auction().await?;
        create_test_item(&fx, 3.0).await?;

        let result = complete_session(&fx.db, fx.session.id).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidState { .. }));

        let stored = get_session_by_id(&fx.db, fx.session.id).await?.unwrap();
        assert_eq!(stored, fx.session);

        // The rolled back transaction released the connection
        create_test_item(&fx, 2.0).await?;
        assert_eq!(
            crate::core::auction_item::count_items_for_session(&fx.db, fx.session.id).await?,
            2
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_empty_completed_session_is_settled() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_commissioner(&db, "empty@market.in").await?;
        let session = open_session(&db, owner.id, test_date()).await?;

        let completed = complete_session(&db, session.id).await?;
        assert_eq!(completed.payment_status, SessionPaymentStatus::Completed);

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_session_removes_lots() -> Result<()> {
        let fx = setup_auction().await?;
        create_test_item(&fx, 4.0).await?;
        create_test_item(&fx, 6.0).await?;

        delete_session(&fx.db, fx.session.id).await?;

        assert!(get_session_by_id(&fx.db, fx.session.id).await?.is_none());
        assert_eq!(AuctionItem::find().count(&fx.db).await?, 0);

        Ok(())
    }
}
