//! Product catalog loading from config.toml
//!
//! The catalog lists the categories and products that should exist before the
//! first auction. It is read once at startup and used to seed the database;
//! entries already present are left untouched.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the catalog file
#[derive(Debug, Deserialize, Default)]
pub struct CatalogConfig {
    /// Categories to seed, each with its products
    #[serde(default)]
    pub categories: Vec<CategoryConfig>,
}

/// A single category and the products listed under it
#[derive(Debug, Deserialize, Clone)]
pub struct CategoryConfig {
    /// Category name (e.g. "Vegetables")
    pub name: String,
    /// Product names in this category (e.g. "Tomato", "Onion")
    #[serde(default)]
    pub products: Vec<String>,
}

/// Parses a catalog from TOML text.
pub fn parse_catalog(contents: &str) -> Result<CatalogConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse catalog: {e}"),
    })
}

/// Loads the catalog from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<CatalogConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!(
            "Failed to read catalog file {}: {e}",
            path.as_ref().display()
        ),
    })?;
    parse_catalog(&contents)
}
