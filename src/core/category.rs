//! Category business logic and catalog seeding.

use crate::{
    config::catalog::CatalogConfig,
    core::{product, require_text},
    entities::{Category, Product, category},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{debug, info, warn};

/// Outcome of [`seed_catalog`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    /// Categories that did not exist before
    pub categories_created: usize,
    /// Products that did not exist before
    pub products_created: usize,
}

/// Creates a category with a unique name.
///
/// # Errors
/// Returns [`Error::Validation`] for an empty name and [`Error::Conflict`] if
/// the name is taken.
pub async fn create_category(db: &DatabaseConnection, name: String) -> Result<category::Model> {
    let name = require_text(&name, "Category name")?;
    if get_category_by_name(db, &name).await?.is_some() {
        return Err(Error::conflict(format!("Category '{name}' already exists")));
    }

    let now = chrono::Utc::now();
    let category = category::ActiveModel {
        name: Set(name),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let created = category.insert(db).await?;
    info!("Created category '{}' (ID: {})", created.name, created.id);
    Ok(created)
}

/// Finds a category by its unique ID.
pub async fn get_category_by_id(
    db: &DatabaseConnection,
    category_id: i64,
) -> Result<Option<category::Model>> {
    Category::find_by_id(category_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a category by its unique name.
pub async fn get_category_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<category::Model>> {
    Category::find()
        .filter(category::Column::Name.eq(name.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// All categories ordered alphabetically.
pub async fn list_categories(db: &DatabaseConnection) -> Result<Vec<category::Model>> {
    Category::find()
        .order_by_asc(category::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Renames a category, keeping names unique.
pub async fn rename_category(
    db: &DatabaseConnection,
    category_id: i64,
    new_name: String,
) -> Result<category::Model> {
    let new_name = require_text(&new_name, "Category name")?;

    let existing = get_category_by_id(db, category_id)
        .await?
        .ok_or_else(|| Error::not_found("category", category_id))?;

    if let Some(other) = get_category_by_name(db, &new_name).await? {
        if other.id != category_id {
            return Err(Error::conflict(format!(
                "Category '{new_name}' already exists"
            )));
        }
    }

    let mut category: category::ActiveModel = existing.into();
    category.name = Set(new_name);
    category.updated_at = Set(chrono::Utc::now());

    let updated = category.update(db).await?;
    info!("Renamed category {} to '{}'", category_id, updated.name);
    Ok(updated)
}

/// Deletes an empty category.
///
/// # Errors
/// Returns [`Error::InvalidState`] while any product, active or not, is
/// listed under the category.
pub async fn delete_category(db: &DatabaseConnection, category_id: i64) -> Result<()> {
    let category = get_category_by_id(db, category_id)
        .await?
        .ok_or_else(|| Error::not_found("category", category_id))?;

    let products = Product::find()
        .filter(crate::entities::product::Column::CategoryId.eq(category_id))
        .count(db)
        .await?;
    if products > 0 {
        warn!(
            "Refusing to delete category '{}' with {} products",
            category.name, products
        );
        return Err(Error::invalid_state(format!(
            "Category '{}' still has {products} products",
            category.name
        )));
    }

    category.delete(db).await?;
    info!("Deleted category {}", category_id);
    Ok(())
}

/// Number of categories.
pub async fn count_categories(db: &DatabaseConnection) -> Result<u64> {
    Category::find().count(db).await.map_err(Into::into)
}

/// Makes sure every category and product in `catalog` exists.
///
/// Existing rows are left alone, so running the seed twice is harmless. A
/// product already listed under a different category keeps its category.
pub async fn seed_catalog(db: &DatabaseConnection, catalog: &CatalogConfig) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    for entry in &catalog.categories {
        let category = match get_category_by_name(db, &entry.name).await? {
            Some(existing) => existing,
            None => {
                summary.categories_created += 1;
                create_category(db, entry.name.clone()).await?
            }
        };

        for product_name in &entry.products {
            match product::get_product_by_name(db, product_name).await? {
                Some(existing) if existing.category_id != category.id => warn!(
                    "Product '{}' already listed under category {}, not moving it",
                    existing.name, existing.category_id
                ),
                Some(_) => debug!("Product '{}' already seeded", product_name),
                None => {
                    product::create_product(db, product_name.clone(), category.id).await?;
                    summary.products_created += 1;
                }
            }
        }
    }

    info!(
        "Catalog seeded: {} new categories, {} new products",
        summary.categories_created, summary.products_created
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::config::catalog::parse_catalog;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_category_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = create_category(&db, "  ".to_string()).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_category_crud() -> Result<()> {
        let db = setup_test_db().await?;

        let fruits = create_category(&db, "Fruits".to_string()).await?;
        let grains = create_category(&db, "Grains".to_string()).await?;
        assert_eq!(list_categories(&db).await?, vec![fruits.clone(), grains.clone()]);

        let dup = create_category(&db, "Fruits".to_string()).await;
        assert!(matches!(dup.unwrap_err(), Error::Conflict { .. }));

        let renamed = rename_category(&db, grains.id, "Pulses".to_string()).await?;
        assert_eq!(renamed.name, "Pulses");
        assert!(get_category_by_name(&db, "Grains").await?.is_none());

        let clash = rename_category(&db, grains.id, "Fruits".to_string()).await;
        assert!(matches!(clash.unwrap_err(), Error::Conflict { .. }));

        delete_category(&db, grains.id).await?;
        assert_eq!(count_categories(&db).await?, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_category_with_products_refused() -> Result<()> {
        let db = setup_test_db().await?;
        let veg = create_category(&db, "Vegetables".to_string()).await?;
        product::create_product(&db, "Tomato".to_string(), veg.id).await?;

        let result = delete_category(&db, veg.id).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidState { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_seed_catalog_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = parse_catalog(
            r#"
            [[categories]]
            name = "Vegetables"
            products = ["Tomato", "Onion"]

            [[categories]]
            name = "Fruits"
            products = ["Mango", "Tomato"]
            "#,
        )?;

        let first = seed_catalog(&db, &catalog).await?;
        assert_eq!(
            first,
            SeedSummary {
                categories_created: 2,
                products_created: 3,
            }
        );

        let second = seed_catalog(&db, &catalog).await?;
        assert_eq!(second, SeedSummary::default());

        let tomato = product::get_product_by_name(&db, "Tomato").await?.unwrap();
        let veg = get_category_by_name(&db, "Vegetables").await?.unwrap();
        assert_eq!(tomato.category_id, veg.id);

        Ok(())
    }
}
