//! Auction session entity - a dated auction event run by one commissioner.
//!
//! A session starts `ACTIVE`, moves to `COMPLETED` once every lot is sold, and
//! its `payment_status` flips to `COMPLETED` when every resulting bill is paid.

use super::enums::{SessionPaymentStatus, SessionStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Auction session database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "auction_sessions")]
pub struct Model {
    /// Unique identifier for the session
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Calendar day the auction takes place
    pub date: Date,
    /// Commissioner running the auction
    pub commissioner_id: i64,
    /// `ACTIVE` while lots can be added or sold
    pub status: SessionStatus,
    /// `COMPLETED` once all farmers are settled
    pub payment_status: SessionPaymentStatus,
    /// When the session was opened
    pub created_at: DateTimeUtc,
    /// When the session was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `AuctionSession` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each session belongs to one commissioner
    #[sea_orm(
        belongs_to = "super::commissioner::Entity",
        from = "Column::CommissionerId",
        to = "super::commissioner::Column::Id"
    )]
    Commissioner,
    /// Lots offered in this session
    #[sea_orm(has_many = "super::auction_item::Entity")]
    AuctionItems,
    /// Bills settled against this session
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
