//! Enumerations stored as upper-case strings.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of an auction session
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Lots can still be added and sold
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    /// Auction closed, every lot sold
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
}

/// Whether every farmer of a session has been paid
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPaymentStatus {
    /// At least one lot is unbilled or one bill unpaid
    #[sea_orm(string_value = "PENDING")]
    Pending,
    /// All bills settled
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
}

/// Payment state of a single bill
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillPaymentStatus {
    #[sea_orm(string_value = "UNPAID")]
    Unpaid,
    #[sea_orm(string_value = "PAID")]
    Paid,
}

/// Measurement unit of a lot
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Unit {
    #[sea_orm(string_value = "KG")]
    Kg,
    #[sea_orm(string_value = "QUINTAL")]
    Quintal,
    #[sea_orm(string_value = "TONNE")]
    Tonne,
    #[sea_orm(string_value = "BAG")]
    Bag,
    #[sea_orm(string_value = "BOX")]
    Box,
    #[sea_orm(string_value = "CRATE")]
    Crate,
    #[sea_orm(string_value = "BUNCH")]
    Bunch,
    #[sea_orm(string_value = "DOZEN")]
    Dozen,
    #[sea_orm(string_value = "PIECE")]
    Piece,
}
