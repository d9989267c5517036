//! Auction item entity - one farmer's lot of a product in a session.
//!
//! A lot is unsold until both `buyer_id` and `rate` are set, and unbilled until
//! `bill_id` is set. Billed lots are frozen.

use super::enums::Unit;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Auction item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "auction_items")]
pub struct Model {
    /// Unique identifier for the lot
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Session the lot is offered in
    pub session_id: i64,
    /// Farmer who brought the lot
    pub farmer_id: i64,
    /// Product being sold
    pub product_id: i64,
    /// Unit `quantity` is measured in
    pub unit: Unit,
    /// Amount of product in the lot, always positive
    pub quantity: f64,
    /// Winning buyer, None while unsold
    pub buyer_id: Option<i64>,
    /// Bill that settled this lot, None while unbilled
    pub bill_id: Option<i64>,
    /// Price per unit, None while unsold
    pub rate: Option<f64>,
    /// When the lot was registered
    pub created_at: DateTimeUtc,
    /// When the lot was last modified
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// A lot is sold once it has both a buyer and a rate.
    #[must_use]
    pub const fn is_sold(&self) -> bool {
        self.buyer_id.is_some() && self.rate.is_some()
    }

    /// Sale value of the lot, or None while unsold.
    #[must_use]
    pub fn amount(&self) -> Option<f64> {
        self.rate.map(|rate| rate * self.quantity)
    }
}

/// Defines relationships between `AuctionItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::auction_session::Entity",
        from = "Column::SessionId",
        to = "super::auction_session::Column::Id"
    )]
    AuctionSession,
    #[sea_orm(
        belongs_to = "super::farmer::Entity",
        from = "Column::FarmerId",
        to = "super::farmer::Column::Id"
    )]
    Farmer,
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(
        belongs_to = "super::buyer::Entity",
        from = "Column::BuyerId",
        to = "super::buyer::Column::Id"
    )]
    Buyer,
    /// Deleting a bill releases its lots
    #[sea_orm(
        belongs_to = "super::bill::Entity",
        from = "Column::BillId",
        to = "super::bill::Column::Id",
        on_delete = "SetNull"
    )]
    Bill,
}

impl Related<super::auction_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AuctionSession.def()
    }
}

impl Related<super::farmer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Farmer.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::buyer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Buyer.def()
    }
}

impl Related<super::bill::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bill.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
