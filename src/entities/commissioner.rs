//! Commissioner entity - the account that runs an auction business.
//!
//! A commissioner owns farmers, buyers, auction sessions and bills, and earns
//! a percentage commission on every bill it issues.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Commissioner database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "commissioners")]
pub struct Model {
    /// Unique identifier for the commissioner
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Business or owner name
    pub name: String,
    /// Market yard or town the business operates from
    pub location: String,
    /// Contact phone number
    pub phone: String,
    /// Login email, stored lower-cased
    #[sea_orm(unique)]
    pub email: String,
    /// bcrypt hash of the login password
    #[serde(skip_serializing)]
    pub password: String,
    /// Commission charged on gross sales, as a percentage
    pub commission_rate: f64,
    /// When the account was created
    pub created_at: DateTimeUtc,
    /// When the account was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Commissioner and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One commissioner has many farmers
    #[sea_orm(has_many = "super::farmer::Entity")]
    Farmers,
    /// One commissioner has many buyers
    #[sea_orm(has_many = "super::buyer::Entity")]
    Buyers,
    /// One commissioner runs many auction sessions
    #[sea_orm(has_many = "super::auction_session::Entity")]
    AuctionSessions,
    /// One commissioner issues many bills
    #[sea_orm(has_many = "super::bill::Entity")]
    Bills,
    /// Outstanding and consumed password reset tokens
    #[sea_orm(has_many = "super::password_reset::Entity")]
    PasswordResets,
}

impl Related<super::farmer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Farmers.def()
    }
}

impl Related<super::buyer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Buyers.def()
    }
}

impl Related<super::auction_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AuctionSessions.def()
    }
}

impl Related<super::bill::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bills.def()
    }
}

impl Related<super::password_reset::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PasswordResets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
