//! Runtime settings read from environment variables.
//!
//! Every setting has a default, so an empty environment is valid. A variable
//! that is present but cannot be parsed is a configuration error rather than
//! being silently ignored.

use crate::errors::{Error, Result};
use std::str::FromStr;

// Bounds accepted by bcrypt
const MIN_BCRYPT_COST: u32 = 4;
const MAX_BCRYPT_COST: u32 = 31;

/// Tunables shared by the core operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// bcrypt work factor for commissioner passwords
    pub bcrypt_cost: u32,
    /// How long a password reset token stays valid
    pub reset_token_ttl_minutes: i64,
    /// Leading part of every generated bill number
    pub bill_number_prefix: String,
    /// TOML file the product catalog is seeded from
    pub catalog_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bcrypt_cost: bcrypt::DEFAULT_COST,
            reset_token_ttl_minutes: 60,
            bill_number_prefix: "BILL".to_string(),
            catalog_path: "config.toml".to_string(),
        }
    }
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e| Error::Config {
            message: format!("{key} has invalid value '{raw}': {e}"),
        }),
        Err(std::env::VarError::NotPresent) => Ok(default),
        Err(e) => Err(e.into()),
    }
}

impl Settings {
    /// Reads `BCRYPT_COST`, `RESET_TOKEN_TTL_MINUTES`, `BILL_NUMBER_PREFIX` and
    /// `CATALOG_PATH`, falling back to [`Settings::default`] for missing ones.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let settings = Self {
            bcrypt_cost: parse_var("BCRYPT_COST", defaults.bcrypt_cost)?,
            reset_token_ttl_minutes: parse_var(
                "RESET_TOKEN_TTL_MINUTES",
                defaults.reset_token_ttl_minutes,
            )?,
            bill_number_prefix: parse_var("BILL_NUMBER_PREFIX", defaults.bill_number_prefix)?,
            catalog_path: parse_var("CATALOG_PATH", defaults.catalog_path)?,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Checks that the values are usable.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.bcrypt_cost) {
            return Err(Error::Config {
                message: format!(
                    "BCRYPT_COST must be between {} and {}",
                    MIN_BCRYPT_COST,
                    MAX_BCRYPT_COST
                ),
            });
        }
        if self.reset_token_ttl_minutes <= 0 {
            return Err(Error::Config {
                message: "RESET_TOKEN_TTL_MINUTES must be positive".to_string(),
            });
        }
        if self.bill_number_prefix.trim().is_empty() {
            return Err(Error::Config {
                message: "BILL_NUMBER_PREFIX cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.bill_number_prefix, "BILL");
        assert_eq!(settings.reset_token_ttl_minutes, 60);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let settings = Settings {
            bcrypt_cost: 1,
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(Error::Config { .. })));

        let settings = Settings {
            reset_token_ttl_minutes: 0,
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(Error::Config { .. })));

        let settings = Settings {
            bill_number_prefix: "  ".to_string(),
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(Error::Config { .. })));
    }
}
