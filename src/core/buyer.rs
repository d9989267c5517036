//! Buyer business logic.
//!
//! Mirrors the farmer operations: buyers belong to a commissioner, are
//! deactivated rather than deleted once they have won a lot, and only active
//! buyers can be recorded as winners.

use crate::{
    core::{commissioner::require_commissioner, require_text},
    entities::{AuctionItem, Buyer, auction_item, buyer},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{info, warn};

/// Fields of a buyer that may change. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct BuyerUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
}

/// Registers a buyer under a commissioner.
pub async fn create_buyer(
    db: &DatabaseConnection,
    commissioner_id: i64,
    name: String,
    phone: String,
) -> Result<buyer::Model> {
    let name = require_text(&name, "Buyer name")?;
    require_commissioner(db, commissioner_id).await?;

    let now = chrono::Utc::now();
    let buyer = buyer::ActiveModel {
        name: Set(name),
        phone: Set(phone.trim().to_string()),
        commissioner_id: Set(commissioner_id),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let created = buyer.insert(db).await?;
    info!(
        "Registered buyer '{}' (ID: {}) for commissioner {}",
        created.name, created.id, commissioner_id
    );
    Ok(created)
}

/// Finds a buyer by its unique ID, active or not.
pub async fn get_buyer_by_id<C>(db: &C, buyer_id: i64) -> Result<Option<buyer::Model>>
where
    C: ConnectionTrait,
{
    Buyer::find_by_id(buyer_id).one(db).await.map_err(Into::into)
}

/// Active buyers of a commissioner, ordered by name.
pub async fn list_active_buyers(
    db: &DatabaseConnection,
    commissioner_id: i64,
) -> Result<Vec<buyer::Model>> {
    Buyer::find()
        .filter(buyer::Column::CommissionerId.eq(commissioner_id))
        .filter(buyer::Column::IsActive.eq(true))
        .order_by_asc(buyer::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// All buyers of a commissioner including deactivated ones.
pub async fn list_buyers(
    db: &DatabaseConnection,
    commissioner_id: i64,
) -> Result<Vec<buyer::Model>> {
    Buyer::find()
        .filter(buyer::Column::CommissionerId.eq(commissioner_id))
        .order_by_asc(buyer::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Active buyers whose name contains `query`.
pub async fn search_buyers(
    db: &DatabaseConnection,
    commissioner_id: i64,
    query: &str,
) -> Result<Vec<buyer::Model>> {
    Buyer::find()
        .filter(buyer::Column::CommissionerId.eq(commissioner_id))
        .filter(buyer::Column::IsActive.eq(true))
        .filter(buyer::Column::Name.contains(query.trim()))
        .order_by_asc(buyer::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn require_buyer(db: &DatabaseConnection, buyer_id: i64) -> Result<buyer::Model> {
    get_buyer_by_id(db, buyer_id)
        .await?
        .ok_or_else(|| Error::not_found("buyer", buyer_id))
}

/// Updates name and/or phone.
pub async fn update_buyer(
    db: &DatabaseConnection,
    buyer_id: i64,
    update: BuyerUpdate,
) -> Result<buyer::Model> {
    let mut buyer: buyer::ActiveModel = require_buyer(db, buyer_id).await?.into();

    if let Some(name) = update.name {
        buyer.name = Set(require_text(&name, "Buyer name")?);
    }
    if let Some(phone) = update.phone {
        buyer.phone = Set(phone.trim().to_string());
    }
    buyer.updated_at = Set(chrono::Utc::now());

    let updated = buyer.update(db).await?;
    info!("Updated buyer {}", buyer_id);
    Ok(updated)
}

/// Activates or deactivates a buyer.
pub async fn set_buyer_active(
    db: &DatabaseConnection,
    buyer_id: i64,
    is_active: bool,
) -> Result<buyer::Model> {
    let mut buyer: buyer::ActiveModel = require_buyer(db, buyer_id).await?.into();
    buyer.is_active = Set(is_active);
    buyer.updated_at = Set(chrono::Utc::now());

    let updated = buyer.update(db).await?;
    info!("Buyer {} active = {}", buyer_id, is_active);
    Ok(updated)
}

/// Permanently deletes a buyer that never won a lot.
pub async fn delete_buyer(db: &DatabaseConnection, buyer_id: i64) -> Result<()> {
    let buyer = require_buyer(db, buyer_id).await?;

    let lots = AuctionItem::find()
        .filter(auction_item::Column::BuyerId.eq(buyer_id))
        .count(db)
        .await?;
    if lots > 0 {
        warn!("Refusing to delete buyer {} who won {} lots", buyer_id, lots);
        return Err(Error::invalid_state(format!(
            "Buyer {buyer_id} has won {lots} lots"
        )));
    }

    buyer.delete(db).await?;
    info!("Deleted buyer {}", buyer_id);
    Ok(())
}

/// Number of active buyers registered under a commissioner.
pub async fn count_active_buyers(db: &DatabaseConnection, commissioner_id: i64) -> Result<u64> {
    Buyer::find()
        .filter(buyer::Column::CommissionerId.eq(commissioner_id))
        .filter(buyer::Column::IsActive.eq(true))
        .count(db)
        .await
        .map_err(Into::into)
}
