//! Shared test utilities for the auction ledger.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test records with sensible defaults.

use crate::{
    config::Settings,
    core::{
        auction_item::{self, NewAuctionItem},
        auction_session, buyer, category,
        commissioner::{self, NewCommissioner},
        farmer, product,
    },
    entities::{self, Unit},
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;

/// Password given to every commissioner created by [`create_test_commissioner`].
pub const TEST_PASSWORD: &str = "market-secret-1";

/// Commission percentage given to every test commissioner.
pub const TEST_COMMISSION_RATE: f64 = 10.0;

/// Routes `tracing` output through the test harness so it shows up for
/// failing tests. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Default settings with the cheapest bcrypt cost so hashing stays fast.
pub fn test_settings() -> Settings {
    Settings {
        bcrypt_cost: 4,
        ..Settings::default()
    }
}

/// Auction day used by fixtures: 15 March 2024.
pub fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap_or_default()
}

/// Registers a commissioner with sensible defaults.
///
/// # Defaults
/// * `name`: "Test Commissioner"
/// * `location`: "Kolar"
/// * `password`: [`TEST_PASSWORD`]
/// * `commission_rate`: [`TEST_COMMISSION_RATE`]
pub async fn create_test_commissioner(
    db: &DatabaseConnection,
    email: &str,
) -> Result<entities::commissioner::Model> {
    commissioner::register_commissioner(
        db,
        &test_settings(),
        NewCommissioner {
            name: "Test Commissioner".to_string(),
            location: "Kolar".to_string(),
            phone: "9800000000".to_string(),
            email: email.to_string(),
            password: TEST_PASSWORD.to_string(),
            commission_rate: TEST_COMMISSION_RATE,
        },
    )
    .await
}

/// Creates a farmer from the village "Test Village".
pub async fn create_test_farmer(
    db: &DatabaseConnection,
    commissioner_id: i64,
    name: &str,
) -> Result<entities::farmer::Model> {
    farmer::create_farmer(
        db,
        commissioner_id,
        name.to_string(),
        "9811111111".to_string(),
        "Test Village".to_string(),
    )
    .await
}

/// Everything needed to put lots on the block.
pub struct AuctionFixture {
    pub db: DatabaseConnection,
    pub commissioner: entities::commissioner::Model,
    pub farmer: entities::farmer::Model,
    pub buyer: entities::buyer::Model,
    pub category: entities::category::Model,
    pub product: entities::product::Model,
    pub session: entities::auction_session::Model,
}

/// Sets up a complete auction day: a commissioner with one farmer and one
/// buyer, the product "Tomato" under "Vegetables", and an active session on
/// [`test_date`].
pub async fn setup_auction() -> Result<AuctionFixture> {
    let db = setup_test_db().await?;
    let commissioner = create_test_commissioner(&db, "owner@market.in").await?;
    let farmer = create_test_farmer(&db, commissioner.id, "Ramesh").await?;
    let buyer = buyer::create_buyer(
        &db,
        commissioner.id,
        "Sri Lakshmi Traders".to_string(),
        "9822222222".to_string(),
    )
    .await?;
    let category = category::create_category(&db, "Vegetables".to_string()).await?;
    let product = product::create_product(&db, "Tomato".to_string(), category.id).await?;
    let session = auction_session::open_session(&db, commissioner.id, test_date()).await?;

    Ok(AuctionFixture {
        db,
        commissioner,
        farmer,
        buyer,
        category,
        product,
        session,
    })
}

/// Adds an unsold lot of the fixture's farmer and product, measured in kg.
pub async fn create_test_item(
    fx: &AuctionFixture,
    quantity: f64,
) -> Result<entities::auction_item::Model> {
    auction_item::add_item(
        &fx.db,
        NewAuctionItem {
            session_id: fx.session.id,
            farmer_id: fx.farmer.id,
            product_id: fx.product.id,
            unit: Unit::Kg,
            quantity,
        },
    )
    .await
}
