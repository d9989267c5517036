//! Core data-access operations, one module per table plus settlement and reports.
//!
//! Every function is async, takes a shared database connection and returns the
//! crate [`Result`]. Operations that write several rows open their own
//! transaction.

pub mod auction_item;
pub mod auction_session;
pub mod bill;
pub mod buyer;
pub mod category;
pub mod commissioner;
pub mod farmer;
pub mod password_reset;
pub mod product;
pub mod report;

use crate::errors::{Error, Result};

/// Trims `value` and rejects it if nothing is left.
pub(crate) fn require_text(value: &str, what: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{what} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

/// Rounds a money amount to paise/cents.
#[must_use]
pub fn round_currency(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_require_text() {
        assert_eq!(require_text("  Onion ", "name").unwrap(), "Onion");
        assert!(matches!(
            require_text(" \t", "name"),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn test_round_currency() {
        assert_eq!(round_currency(10.005_1), 10.01);
        assert_eq!(round_currency(3.333_333), 3.33);
        assert_eq!(round_currency(0.0), 0.0);
    }
}
