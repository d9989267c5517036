//! Auction item (lot) business logic.
//!
//! Lots can be registered, sold, corrected and withdrawn only while their
//! session is `ACTIVE`. Once a lot is linked to a bill it is frozen; the bill
//! has to be deleted first to change it.

use crate::{
    core::{
        auction_session::require_session, buyer::get_buyer_by_id, farmer::get_farmer_by_id,
        product::get_product_by_id,
    },
    entities::{AuctionItem, SessionStatus, Unit, auction_item, auction_session},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::info;

/// Input for [`add_item`].
#[derive(Debug, Clone, Copy)]
pub struct NewAuctionItem {
    pub session_id: i64,
    pub farmer_id: i64,
    pub product_id: i64,
    pub unit: Unit,
    pub quantity: f64,
}

fn validate_positive(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(())
}

fn ensure_active(session: &auction_session::Model) -> Result<()> {
    if session.status != SessionStatus::Active {
        return Err(Error::invalid_state(format!(
            "Session {} is completed",
            session.id
        )));
    }
    Ok(())
}

/// Loads a lot that may still be changed, together with its session.
async fn require_editable(
    db: &DatabaseConnection,
    item_id: i64,
) -> Result<(auction_item::Model, auction_session::Model)> {
    let item = get_item_by_id(db, item_id)
        .await?
        .ok_or_else(|| Error::not_found("auction item", item_id))?;
    if let Some(bill_id) = item.bill_id {
        return Err(Error::invalid_state(format!(
            "Lot {item_id} is settled by bill {bill_id}"
        )));
    }
    let session = require_session(db, item.session_id).await?;
    ensure_active(&session)?;
    Ok((item, session))
}

/// Registers a farmer's lot in an active session.
///
/// # Errors
/// Returns an error if:
/// - The quantity is not a positive finite number
/// - The session does not exist or is completed
/// - The farmer is unknown, inactive or registered with another commissioner
/// - The product is unknown or inactive
pub async fn add_item(db: &DatabaseConnection, input: NewAuctionItem) -> Result<auction_item::Model> {
    validate_positive(input.quantity)?;

    let session = require_session(db, input.session_id).await?;
    ensure_active(&session)?;

    let farmer = get_farmer_by_id(db, input.farmer_id)
        .await?
        .ok_or_else(|| Error::not_found("farmer", input.farmer_id))?;
    if !farmer.is_active || farmer.commissioner_id != session.commissioner_id {
        return Err(Error::validation(format!(
            "Farmer {} cannot sell in session {}",
            farmer.id, session.id
        )));
    }

    let product = get_product_by_id(db, input.product_id)
        .await?
        .ok_or_else(|| Error::not_found("product", input.product_id))?;
    if !product.is_active {
        return Err(Error::validation(format!(
            "Product '{}' is inactive",
            product.name
        )));
    }

    let now = chrono::Utc::now();
    let item = auction_item::ActiveModel {
        session_id: Set(input.session_id),
        farmer_id: Set(input.farmer_id),
        product_id: Set(input.product_id),
        unit: Set(input.unit),
        quantity: Set(input.quantity),
        buyer_id: Set(None),
        bill_id: Set(None),
        rate: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let created = item.insert(db).await?;
    info!(
        "Lot {} registered: {} {:?} of '{}' from farmer {} in session {}",
        created.id, created.quantity, created.unit, product.name, farmer.id, session.id
    );
    Ok(created)
}

/// Finds a lot by its unique ID.
pub async fn get_item_by_id<C>(db: &C, item_id: i64) -> Result<Option<auction_item::Model>>
where
    C: ConnectionTrait,
{
    AuctionItem::find_by_id(item_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// All lots of a session in registration order.
pub async fn list_items_for_session(
    db: &DatabaseConnection,
    session_id: i64,
) -> Result<Vec<auction_item::Model>> {
    AuctionItem::find()
        .filter(auction_item::Column::SessionId.eq(session_id))
        .order_by_asc(auction_item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lots of a session not yet linked to a bill.
pub async fn list_unbilled_items(
    db: &DatabaseConnection,
    session_id: i64,
) -> Result<Vec<auction_item::Model>> {
    AuctionItem::find()
        .filter(auction_item::Column::SessionId.eq(session_id))
        .filter(auction_item::Column::BillId.is_null())
        .order_by_asc(auction_item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Records the winning buyer and the rate per unit for a lot.
///
/// Re-recording a sale on an unbilled lot overwrites the previous result.
///
/// # Errors
/// Returns an error if the rate is not positive, the lot is billed, its
/// session is completed, or the buyer is unknown, inactive or trades with
/// another commissioner.
pub async fn record_sale(
    db: &DatabaseConnection,
    item_id: i64,
    buyer_id: i64,
    rate: f64,
) -> Result<auction_item::Model> {
    validate_positive(rate)?;

    let (item, session) = require_editable(db, item_id).await?;

    let buyer = get_buyer_by_id(db, buyer_id)
        .await?
        .ok_or_else(|| Error::not_found("buyer", buyer_id))?;
    if !buyer.is_active || buyer.commissioner_id != session.commissioner_id {
        return Err(Error::validation(format!(
            "Buyer {buyer_id} cannot buy in session {}",
            session.id
        )));
    }

    let mut item: auction_item::ActiveModel = item.into();
    item.buyer_id = Set(Some(buyer_id));
    item.rate = Set(Some(rate));
    item.updated_at = Set(chrono::Utc::now());

    let updated = item.update(db).await?;
    info!("Lot {} sold to buyer {} at {}", item_id, buyer_id, rate);
    Ok(updated)
}

/// Removes buyer and rate from an unbilled lot, making it unsold again.
pub async fn clear_sale(db: &DatabaseConnection, item_id: i64) -> Result<auction_item::Model> {
    let (item, _) = require_editable(db, item_id).await?;

    let mut item: auction_item::ActiveModel = item.into();
    item.buyer_id = Set(None);
    item.rate = Set(None);
    item.updated_at = Set(chrono::Utc::now());

    let updated = item.update(db).await?;
    info!("Sale of lot {} cleared", item_id);
    Ok(updated)
}

/// Corrects the quantity of an unbilled lot.
pub async fn update_item_quantity(
    db: &DatabaseConnection,
    item_id: i64,
    quantity: f64,
) -> Result<auction_item::Model> {
    validate_positive(quantity)?;
    let (item, _) = require_editable(db, item_id).await?;

    let mut item: auction_item::ActiveModel = item.into();
    item.quantity = Set(quantity);
    item.updated_at = Set(chrono::Utc::now());

    let updated = item.update(db).await?;
    info!("Lot {} quantity set to {}", item_id, quantity);
    Ok(updated)
}

/// Withdraws an unbilled lot from an active session.
pub async fn delete_item(db: &DatabaseConnection, item_id: i64) -> Result<()> {
    let (item, _) = require_editable(db, item_id).await?;
    item.delete(db).await?;
    info!("Lot {} withdrawn", item_id);
    Ok(())
}

/// Number of lots in a session.
pub async fn count_items_for_session(db: &DatabaseConnection, session_id: i64) -> Result<u64> {
    AuctionItem::find()
        .filter(auction_item::Column::SessionId.eq(session_id))
        .count(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::{
        auction_session::complete_session, buyer::create_buyer, farmer::set_farmer_active,
        product::set_product_active,
    };
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_add_item_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let input = NewAuctionItem {
            session_id: 1,
            farmer_id: 1,
            product_id: 1,
            unit: Unit::Kg,
            quantity: 0.0,
        };

        let result = add_item(&db, input).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidAmount { .. }));

        let result = add_item(
            &db,
            NewAuctionItem {
                quantity: f64::INFINITY,
                ..input
            },
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::InvalidAmount { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_add_and_list_items() -> Result<()> {
        let fx = setup_auction().await?;

        let first = create_test_item(&fx, 10.0).await?;
        let second = add_item(
            &fx.db,
            NewAuctionItem {
                session_id: fx.session.id,
                farmer_id: fx.farmer.id,
                product_id: fx.product.id,
                unit: Unit::Crate,
                quantity: 3.0,
            },
        )
        .await?;

        assert!(!first.is_sold());
        assert_eq!(first.amount(), None);
        assert_eq!(second.unit, Unit::Crate);

        let items = list_items_for_session(&fx.db, fx.session.id).await?;
        assert_eq!(items, vec![first, second]);
        assert_eq!(count_items_for_session(&fx.db, fx.session.id).await?, 2);
        assert_eq!(list_unbilled_items(&fx.db, fx.session.id).await?.len(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_add_item_rejects_inactive_or_foreign_records() -> Result<()> {
        let fx = setup_auction().await?;
        let input = NewAuctionItem {
            session_id: fx.session.id,
            farmer_id: fx.farmer.id,
            product_id: fx.product.id,
            unit: Unit::Kg,
            quantity: 1.0,
        };

        let stranger = create_test_commissioner(&fx.db, "stranger@market.in").await?;
        let foreign = create_test_farmer(&fx.db, stranger.id, "Outsider").await?;
        let result = add_item(
            &fx.db,
            NewAuctionItem {
                farmer_id: foreign.id,
                ..input
            },
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        set_product_active(&fx.db, fx.product.id, false).await?;
        let result = add_item(&fx.db, input).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));
        set_product_active(&fx.db, fx.product.id, true).await?;

        set_farmer_active(&fx.db, fx.farmer.id, false).await?;
        let result = add_item(&fx.db, input).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_record_and_clear_sale() -> Result<()> {
        let fx = setup_auction().await?;
        let item = create_test_item(&fx, 10.0).await?;

        let sold = record_sale(&fx.db, item.id, fx.buyer.id, 22.5).await?;
        assert!(sold.is_sold());
        assert_eq!(sold.buyer_id, Some(fx.buyer.id));
        assert_eq!(sold.amount(), Some(225.0));

        let bad_rate = record_sale(&fx.db, item.id, fx.buyer.id, -1.0).await;
        assert!(matches!(bad_rate.unwrap_err(), Error::InvalidAmount { .. }));

        let stranger = create_test_commissioner(&fx.db, "rival@market.in").await?;
        let rival = create_buyer(&fx.db, stranger.id, "Rival".to_string(), String::new()).await?;
        let wrong_buyer = record_sale(&fx.db, item.id, rival.id, 20.0).await;
        assert!(matches!(wrong_buyer.unwrap_err(), Error::Validation { .. }));

        let cleared = clear_sale(&fx.db, item.id).await?;
        assert!(!cleared.is_sold());
        assert_eq!(cleared.rate, None);

        Ok(())
    }

    #[tokio::test]
    async fn test_completed_session_freezes_lots() -> Result<()> {
        let fx = setup_auction().await?;
        let item = create_test_item(&fx, 10.0).await?;
        record_sale(&fx.db, item.id, fx.buyer.id, 15.0).await?;
        complete_session(&fx.db, fx.session.id).await?;

        let result = update_item_quantity(&fx.db, item.id, 12.0).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidState { .. }));

        let result = add_item(
            &fx.db,
            NewAuctionItem {
                session_id: fx.session.id,
                farmer_id: fx.farmer.id,
                product_id: fx.product.id,
                unit: Unit::Kg,
                quantity: 1.0,
            },
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::InvalidState { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_update_quantity_and_delete() -> Result<()> {
        let fx = setup_auction().await?;
        let item = create_test_item(&fx, 10.0).await?;

        let updated = update_item_quantity(&fx.db, item.id, 11.5).await?;
        assert_eq!(updated.quantity, 11.5);

        delete_item(&fx.db, item.id).await?;
        assert!(get_item_by_id(&fx.db, item.id).await?.is_none());

        let missing = delete_item(&fx.db, item.id).await;
        assert!(matches!(missing.unwrap_err(), Error::NotFound { .. }));

        Ok(())
    }
}
