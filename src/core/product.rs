//! Product business logic - Handles all product-related operations.
//!
//! Products form a catalog shared by every commissioner. Each product belongs
//! to one category and has a globally unique name. Deactivated products remain
//! visible on old lots and bills but cannot be auctioned again.

use crate::{
    core::require_text,
    entities::{AuctionItem, Bill, Category, Product, auction_item, bill, product},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{info, warn};

/// Fields of a product that may change. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub category_id: Option<i64>,
}

async fn require_category(db: &DatabaseConnection, category_id: i64) -> Result<()> {
    Category::find_by_id(category_id)
        .one(db)
        .await?
        .map(|_| ())
        .ok_or_else(|| Error::not_found("category", category_id))
}

/// Retrieves all active products from the database, ordered alphabetically by name.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn list_active_products(db: &DatabaseConnection) -> Result<Vec<product::Model>> {
    Product::find()
        .filter(product::Column::IsActive.eq(true))
        .order_by_asc(product::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Products listed under a category, active or not.
pub async fn list_products_in_category(
    db: &DatabaseConnection,
    category_id: i64,
) -> Result<Vec<product::Model>> {
    Product::find()
        .filter(product::Column::CategoryId.eq(category_id))
        .order_by_asc(product::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a product by its unique name, active or not.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_product_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<product::Model>> {
    Product::find()
        .filter(product::Column::Name.eq(name.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a specific product by its unique ID.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_product_by_id<C>(db: &C, product_id: i64) -> Result<Option<product::Model>>
where
    C: ConnectionTrait,
{
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a new active product in a category.
///
/// # Errors
/// Returns an error if:
/// - The product name is empty or whitespace-only
/// - Another product already has the name
/// - The category does not exist
/// - The database insert operation fails
pub async fn create_product(
    db: &DatabaseConnection,
    name: String,
    category_id: i64,
) -> Result<product::Model> {
    let name = require_text(&name, "Product name")?;
    if get_product_by_name(db, &name).await?.is_some() {
        return Err(Error::conflict(format!("Product '{name}' already exists")));
    }
    require_category(db, category_id).await?;

    let now = chrono::Utc::now();
    let product = product::ActiveModel {
        name: Set(name),
        category_id: Set(category_id),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let created = product.insert(db).await?;
    info!(
        "Added product '{}' (ID: {}) to category {}",
        created.name, created.id, category_id
    );
    Ok(created)
}

/// Renames a product and/or moves it to another category.
///
/// # Errors
/// Returns an error if:
/// - The product or the target category does not exist
/// - The new name is empty or used by another product
pub async fn update_product(
    db: &DatabaseConnection,
    product_id: i64,
    update: ProductUpdate,
) -> Result<product::Model> {
    let mut product: product::ActiveModel = get_product_by_id(db, product_id)
        .await?
        .ok_or_else(|| Error::not_found("product", product_id))?
        .into();

    if let Some(name) = update.name {
        let name = require_text(&name, "Product name")?;
        if let Some(other) = get_product_by_name(db, &name).await? {
            if other.id != product_id {
                return Err(Error::conflict(format!("Product '{name}' already exists")));
            }
        }
        product.name = Set(name);
    }
    if let Some(category_id) = update.category_id {
        require_category(db, category_id).await?;
        product.category_id = Set(category_id);
    }
    product.updated_at = Set(chrono::Utc::now());

    let updated = product.update(db).await?;
    info!("Updated product {}", product_id);
    Ok(updated)
}

/// Activates or deactivates a product.
pub async fn set_product_active(
    db: &DatabaseConnection,
    product_id: i64,
    is_active: bool,
) -> Result<product::Model> {
    let mut product: product::ActiveModel = get_product_by_id(db, product_id)
        .await?
        .ok_or_else(|| Error::not_found("product", product_id))?
        .into();

    product.is_active = Set(is_active);
    product.updated_at = Set(chrono::Utc::now());

    let updated = product.update(db).await?;
    info!("Product {} active = {}", product_id, is_active);
    Ok(updated)
}

/// Permanently deletes a product that was never auctioned.
///
/// # Errors
/// Returns [`Error::InvalidState`] if lots or bills reference the product.
pub async fn delete_product(db: &DatabaseConnection, product_id: i64) -> Result<()> {
    let product = get_product_by_id(db, product_id)
        .await?
        .ok_or_else(|| Error::not_found("product", product_id))?;

    let lots = AuctionItem::find()
        .filter(auction_item::Column::ProductId.eq(product_id))
        .count(db)
        .await?;
    let bills = Bill::find()
        .filter(bill::Column::ProductId.eq(product_id))
        .count(db)
        .await?;
    if lots + bills > 0 {
        warn!("Refusing to delete product '{}' with history", product.name);
        return Err(Error::invalid_state(format!(
            "Product '{}' has {lots} lots and {bills} bills",
            product.name
        )));
    }

    product.delete(db).await?;
    info!("Deleted product {}", product_id);
    Ok(())
}

/// Number of active products in the catalog.
pub async fn count_active_products(db: &DatabaseConnection) -> Result<u64> {
    Product::find()
        .filter(product::Column::IsActive.eq(true))
        .count(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::category::create_category;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_product_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        // Test empty name validation
        let result = create_product(&db, String::new(), 1).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        // Test whitespace-only name validation
        let result = create_product(&db, "   ".to_string(), 1).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_product_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let veg = create_category(&db, "Vegetables".to_string()).await?;

        let product = create_product(&db, " Tomato ".to_string(), veg.id).await?;

        assert_eq!(product.name, "Tomato");
        assert_eq!(product.category_id, veg.id);
        assert!(product.is_active);

        let dup = create_product(&db, "Tomato".to_string(), veg.id).await;
        assert!(matches!(dup.unwrap_err(), Error::Conflict { .. }));

        let orphan = create_product(&db, "Okra".to_string(), 999).await;
        assert!(matches!(orphan.unwrap_err(), Error::NotFound { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_list_and_deactivate_products() -> Result<()> {
        let db = setup_test_db().await?;
        let veg = create_category(&db, "Vegetables".to_string()).await?;

        let onion = create_product(&db, "Onion".to_string(), veg.id).await?;
        let beans = create_product(&db, "Beans".to_string(), veg.id).await?;

        // Test that they're ordered alphabetically
        let active = list_active_products(&db).await?;
        assert_eq!(active, vec![beans.clone(), onion.clone()]);

        set_product_active(&db, onion.id, false).await?;
        assert_eq!(list_active_products(&db).await?, vec![beans]);
        assert_eq!(count_active_products(&db).await?, 1);
        assert_eq!(list_products_in_category(&db, veg.id).await?.len(), 2);

        // Inactive products are still found by name
        assert!(get_product_by_name(&db, "Onion").await?.is_some());

        Ok(())
    }

    #[tokio::test]
    async fn test_update_product_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let veg = create_category(&db, "Vegetables".to_string()).await?;
        let fruit = create_category(&db, "Fruits".to_string()).await?;
        let product = create_product(&db, "Tomato".to_string(), veg.id).await?;
        create_product(&db, "Mango".to_string(), fruit.id).await?;

        let moved = update_product(
            &db,
            product.id,
            ProductUpdate {
                name: Some("Cherry Tomato".to_string()),
                category_id: Some(fruit.id),
            },
        )
        .await?;
        assert_eq!(moved.name, "Cherry Tomato");
        assert_eq!(moved.category_id, fruit.id);

        // Verify the update persisted
        let retrieved = Product::find_by_id(product.id).one(&db).await?.unwrap();
        assert_eq!(retrieved.name, "Cherry Tomato");

        let clash = update_product(
            &db,
            product.id,
            ProductUpdate {
                name: Some("Mango".to_string()),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(clash.unwrap_err(), Error::Conflict { .. }));

        let missing = update_product(&db, 999, ProductUpdate::default()).await;
        assert!(matches!(missing.unwrap_err(), Error::NotFound { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_product() -> Result<()> {
        let fx = setup_auction().await?;
        let veg = create_category(&fx.db, "Leafy".to_string()).await?;
        let spinach = create_product(&fx.db, "Spinach".to_string(), veg.id).await?;

        delete_product(&fx.db, spinach.id).await?;
        assert!(get_product_by_id(&fx.db, spinach.id).await?.is_none());

        create_test_item(&fx, 3.0).await?;
        let result = delete_product(&fx.db, fx.product.id).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidState { .. }));

        Ok(())
    }
}
