use auction_ledger::{
    config::{Settings, catalog, database},
    core::{category, password_reset},
    errors::Result,
};
use dotenvy::dotenv;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Runtime settings
    let settings = Settings::from_env()
        .inspect_err(|e| error!("Invalid settings: {}", e))?;
    info!("Loaded settings: {:?}", settings);

    // 4. Database and schema
    std::fs::create_dir_all("data")?;
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed the product catalog if one is configured
    if Path::new(&settings.catalog_path).exists() {
        let catalog = catalog::load_catalog(&settings.catalog_path)?;
        let summary = category::seed_catalog(&db, &catalog).await?;
        info!(
            "Catalog seeded: {} new categories, {} new products",
            summary.categories_created, summary.products_created
        );
    } else {
        warn!(
            "Catalog file {} not found, skipping seeding",
            settings.catalog_path
        );
    }

    // 6. Housekeeping
    let purged = password_reset::purge_expired_tokens(&db).await?;
    info!("Purged {} expired password reset tokens", purged);

    info!("Auction ledger ready.");
    Ok(())
}
