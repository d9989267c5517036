//! Buyer entity - a trader who wins lots at auction.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Buyer database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "buyers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub phone: String,
    /// Commissioner the buyer trades with
    pub commissioner_id: i64,
    /// Inactive buyers cannot win new lots
    pub is_active: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::commissioner::Entity",
        from = "Column::CommissionerId",
        to = "super::commissioner::Column::Id"
    )]
    Commissioner,
    /// Lots this buyer won
    #[sea_orm(has_many = "super::auction_item::Entity")]
    AuctionItems,
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

impl ActiveModelBehavior for ActiveModel {}
