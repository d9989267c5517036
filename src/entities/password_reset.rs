//! Password reset entity - single-use tokens issued to a commissioner.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Password reset token model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "password_resets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Commissioner the token was issued to
    pub commissioner_id: i64,
    /// Random token sent to the commissioner
    #[sea_orm(unique)]
    pub token: String,
    /// Token is rejected at or after this instant
    pub expires_at: DateTimeUtc,
    /// Set once the token has reset a password
    pub used: bool,
    pub created_at: DateTimeUtc,
    /// When the token was consumed
    pub used_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each token belongs to one commissioner
    #[sea_orm(
        belongs_to = "super::commissioner::Entity",
        from = "Column::CommissionerId",
        to = "super::commissioner::Column::Id",
        on_delete = "Cascade"
    )]
    Commissioner,
}

impl Related<super::commissioner::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Commissioner.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
