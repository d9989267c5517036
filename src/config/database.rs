//! Database configuration module.
//!
//! This module handles the `SQLite` connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so column types, unique columns and
//! foreign keys always match the Rust structs. The one constraint the entity
//! macros cannot express, the composite unique key on bills, is added as a
//! separate index.

use crate::entities::{
    AuctionItem, AuctionSession, Bill, Buyer, Category, Commissioner, Farmer, PasswordReset,
    Product, bill,
};
use crate::errors::Result;
use sea_orm::sea_query::{Index, IndexCreateStatement, TableCreateStatement};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/auction_ledger.sqlite?mode=rwc";

/// Name of the composite unique index on `(farmer_id, product_id, session_id)`.
pub const BILL_TRIPLE_INDEX: &str = "idx_bills_farmer_product_session";

/// Gets the database URL from environment variable or returns default `SQLite` path.
///
/// This function looks for `DATABASE_URL` in the environment and falls back to
/// a default local `SQLite` file if not found.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by [`get_database_url`].
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

fn table_for<E: EntityTrait>(schema: &Schema, entity: E) -> TableCreateStatement {
    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    table
}

fn bill_triple_index() -> IndexCreateStatement {
    Index::create()
        .name(BILL_TRIPLE_INDEX)
        .table(Bill)
        .col(bill::Column::FarmerId)
        .col(bill::Column::ProductId)
        .col(bill::Column::SessionId)
        .unique()
        .if_not_exists()
        .to_owned()
}

/// Creates all tables and indexes if they do not exist yet.
///
/// Tables are created parents first so the statements also work on backends
/// that check foreign key targets at creation time.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let tables = [
        table_for(&schema, Commissioner),
        table_for(&schema, PasswordReset),
        table_for(&schema, Category),
        table_for(&schema, Product),
        table_for(&schema, Farmer),
        table_for(&schema, Buyer),
        table_for(&schema, AuctionSession),
        table_for(&schema, Bill),
        table_for(&schema, AuctionItem),
    ];

    for table in &tables {
        db.execute(builder.build(table)).await?;
    }
    db.execute(builder.build(&bill_triple_index())).await?;

    info!("Database schema ensured ({} tables)", tables.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        auction_item::Model as AuctionItemModel, bill::Model as BillModel,
        commissioner::Model as CommissionerModel, farmer::Model as FarmerModel,
    };
    use sea_orm::{EntityTrait, QuerySelect};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<CommissionerModel> = Commissioner::find().limit(1).all(&db).await?;
        let _: Vec<FarmerModel> = Farmer::find().limit(1).all(&db).await?;
        let _: Vec<AuctionItemModel> = AuctionItem::find().limit(1).all(&db).await?;
        let _: Vec<BillModel> = Bill::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }

    #[test]
    fn test_default_database_url_is_sqlite() {
        assert!(DEFAULT_DATABASE_URL.starts_with("sqlite://"));
    }
}
