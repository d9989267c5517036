//! Bill entity - the payable statement for one farmer's product in one session.
//!
//! Amounts are snapshotted at generation time: later changes to the
//! commissioner's commission rate do not touch issued bills. The
//! `(farmer_id, product_id, session_id)` triple is unique; the index is created
//! alongside the tables.

use super::enums::BillPaymentStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Bill database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bills")]
pub struct Model {
    /// Unique identifier for the bill
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Human-facing number, e.g. `BILL-20240315-0001`
    #[sea_orm(unique)]
    pub bill_number: String,
    pub farmer_id: i64,
    pub commissioner_id: i64,
    pub product_id: i64,
    pub session_id: i64,
    /// Sum of the quantities of all billed lots
    pub total_quantity: f64,
    /// Sum of quantity times rate over all billed lots
    pub gross_amount: f64,
    /// Commission percentage in force when the bill was generated
    pub commission_rate: f64,
    /// `gross_amount * commission_rate / 100`
    pub commission_amount: f64,
    /// Named deductions, a JSON object of charge name to amount
    pub other_charges: Json,
    /// What the farmer receives after commission and other charges
    pub net_payable: f64,
    pub payment_status: BillPaymentStatus,
    /// Free-form payment method, e.g. "cash" or "bank transfer"
    pub payment_method: Option<String>,
    pub payment_date: Option<DateTimeUtc>,
    pub notes: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Bill and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::farmer::Entity",
        from = "Column::FarmerId",
        to = "super::farmer::Column::Id"
    )]
    Farmer,
    #[sea_orm(
        belongs_to = "super::commissioner::Entity",
        from = "Column::CommissionerId",
        to = "super::commissioner::Column::Id"
    )]
    Commissioner,
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(
        belongs_to = "super::auction_session::Entity",
        from = "Column::SessionId",
        to = "super::auction_session::Column::Id"
    )]
    AuctionSession,
    /// Lots settled by this bill
    #[sea_orm(has_many = "super::auction_item::Entity")]
    AuctionItems,
}

impl Related<super::farmer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Farmer.def()
    }
}

impl Related<super::commissioner::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Commissioner.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::auction_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AuctionSession.def()
    }
}

impl Related<super::auction_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AuctionItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
