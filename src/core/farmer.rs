//! Farmer business logic - registration, lookup and deactivation of farmers.
//!
//! Farmers are scoped to a commissioner. Deactivation hides a farmer from
//! the active lists while keeping lots and bills intact; hard deletion is
//! only possible before the farmer has any auction history.

use crate::{
    core::{commissioner::require_commissioner, require_text},
    entities::{AuctionItem, Bill, Farmer, auction_item, bill, farmer},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{info, warn};

/// Fields of a farmer that may change. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct FarmerUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub village: Option<String>,
}

/// Registers a farmer under a commissioner.
///
/// # Errors
/// Returns an error if the name is empty or the commissioner does not exist.
pub async fn create_farmer(
    db: &DatabaseConnection,
    commissioner_id: i64,
    name: String,
    phone: String,
    village: String,
) -> Result<farmer::Model> {
    let name = require_text(&name, "Farmer name")?;
    require_commissioner(db, commissioner_id).await?;

    let now = chrono::Utc::now();
    let farmer = farmer::ActiveModel {
        name: Set(name),
        phone: Set(phone.trim().to_string()),
        village: Set(village.trim().to_string()),
        commissioner_id: Set(commissioner_id),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let created = farmer.insert(db).await?;
    info!(
        "Registered farmer '{}' (ID: {}) for commissioner {}",
        created.name, created.id, commissioner_id
    );
    Ok(created)
}

/// Finds a farmer by its unique ID, active or not.
pub async fn get_farmer_by_id<C>(db: &C, farmer_id: i64) -> Result<Option<farmer::Model>>
where
    C: ConnectionTrait,
{
    Farmer::find_by_id(farmer_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Active farmers of a commissioner, ordered by name.
pub async fn list_active_farmers(
    db: &DatabaseConnection,
    commissioner_id: i64,
) -> Result<Vec<farmer::Model>> {
    Farmer::find()
        .filter(farmer::Column::CommissionerId.eq(commissioner_id))
        .filter(farmer::Column::IsActive.eq(true))
        .order_by_asc(farmer::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// All farmers of a commissioner including deactivated ones, ordered by name.
pub async fn list_farmers(
    db: &DatabaseConnection,
    commissioner_id: i64,
) -> Result<Vec<farmer::Model>> {
    Farmer::find()
        .filter(farmer::Column::CommissionerId.eq(commissioner_id))
        .order_by_asc(farmer::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Active farmers whose name contains `query`.
pub async fn search_farmers(
    db: &DatabaseConnection,
    commissioner_id: i64,
    query: &str,
) -> Result<Vec<farmer::Model>> {
    Farmer::find()
        .filter(farmer::Column::CommissionerId.eq(commissioner_id))
        .filter(farmer::Column::IsActive.eq(true))
        .filter(farmer::Column::Name.contains(query.trim()))
        .order_by_asc(farmer::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn require_farmer(db: &DatabaseConnection, farmer_id: i64) -> Result<farmer::Model> {
    get_farmer_by_id(db, farmer_id)
        .await?
        .ok_or_else(|| Error::not_found("farmer", farmer_id))
}

/// Updates name, phone and/or village.
pub async fn update_farmer(
    db: &DatabaseConnection,
    farmer_id: i64,
    update: FarmerUpdate,
) -> Result<farmer::Model> {
    let mut farmer: farmer::ActiveModel = require_farmer(db, farmer_id).await?.into();

    if let Some(name) = update.name {
        farmer.name = Set(require_text(&name, "Farmer name")?);
    }
    if let Some(phone) = update.phone {
        farmer.phone = Set(phone.trim().to_string());
    }
    if let Some(village) = update.village {
        farmer.village = Set(village.trim().to_string());
    }
    farmer.updated_at = Set(chrono::Utc::now());

    let updated = farmer.update(db).await?;
    info!("Updated farmer {}", farmer_id);
    Ok(updated)
}

/// Activates or deactivates a farmer.
pub async fn set_farmer_active(
    db: &DatabaseConnection,
    farmer_id: i64,
    is_active: bool,
) -> Result<farmer::Model> {
    let mut farmer: farmer::ActiveModel = require_farmer(db, farmer_id).await?.into();
    farmer.is_active = Set(is_active);
    farmer.updated_at = Set(chrono::Utc::now());

    let updated = farmer.update(db).await?;
    info!("Farmer {} active = {}", farmer_id, is_active);
    Ok(updated)
}

/// Permanently deletes a farmer that never brought a lot.
///
/// # Errors
/// Returns [`Error::InvalidState`] if lots or bills reference the farmer;
/// deactivate it with [`set_farmer_active`] instead.
pub async fn delete_farmer(db: &DatabaseConnection, farmer_id: i64) -> Result<()> {
    let farmer = require_farmer(db, farmer_id).await?;

    let lots = AuctionItem::find()
        .filter(auction_item::Column::FarmerId.eq(farmer_id))
        .count(db)
        .await?;
    let bills = Bill::find()
        .filter(bill::Column::FarmerId.eq(farmer_id))
        .count(db)
        .await?;
    if lots + bills > 0 {
        warn!("Refusing to delete farmer {} with auction history", farmer_id);
        return Err(Error::invalid_state(format!(
            "Farmer {farmer_id} has {lots} lots and {bills} bills"
        )));
    }

    farmer.delete(db).await?;
    info!("Deleted farmer {}", farmer_id);
    Ok(())
}

/// Number of active farmers registered under a commissioner.
pub async fn count_active_farmers(db: &DatabaseConnection, commissioner_id: i64) -> Result<u64> {
    Farmer::find()
        .filter(farmer::Column::CommissionerId.eq(commissioner_id))
        .filter(farmer::Column::IsActive.eq(true))
        .count(db)
        .await
        .map_err(Into::into)
}
