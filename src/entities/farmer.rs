//! Farmer entity - a seller who brings lots to auction.
//!
//! Farmers are registered under one commissioner and can be deactivated
//! instead of deleted so that their bills stay readable.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Farmer database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "farmers")]
pub struct Model {
    /// Unique identifier for the farmer
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Farmer's name
    pub name: String,
    /// Contact phone number
    pub phone: String,
    /// Home village, used to tell namesakes apart
    pub village: String,
    /// Commissioner the farmer sells through
    pub commissioner_id: i64,
    /// Inactive farmers are hidden from lookups but keep their history
    pub is_active: bool,
    /// When the farmer was registered
    pub created_at: DateTimeUtc,
    /// When the farmer was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Farmer and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each farmer belongs to one commissioner
    #[sea_orm(
        belongs_to = "super::commissioner::Entity",
        from = "Column::CommissionerId",
        to = "super::commissioner::Column::Id"
    )]
    Commissioner,
    /// One farmer brings many lots
    #[sea_orm(has_many = "super::auction_item::Entity")]
    AuctionItems,
    /// One farmer receives many bills
    #[sea_orm(has_many = "super::bill::Entity")]
    Bills,
}

impl Related<super::commissioner::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Commissioner.def()
    }
}

impl Related<super::auction_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AuctionItems.def()
    }
}

impl Related<super::bill::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bills.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
