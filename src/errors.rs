use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Every failure the ledger can report.
#[derive(Debug, Error)]
pub enum Error {
    /// Any database failure that is not a recognised constraint violation
    #[error("Database error: {0}")]
    Database(DbErr),

    /// Missing or malformed configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong with the configuration
        message: String,
    },

    /// Input rejected before reaching the database
    #[error("Validation error: {message}")]
    Validation {
        /// Why the input was rejected
        message: String,
    },

    /// A money, rate or quantity value that is negative, zero or not finite
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The offending value
        amount: f64,
    },

    /// Lookup by primary or unique key found nothing
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind, e.g. `"farmer"`
        entity: &'static str,
        /// Key that was looked up
        id: String,
    },

    /// A uniqueness rule would be broken
    #[error("Conflict: {message}")]
    Conflict {
        /// Which rule was hit
        message: String,
    },

    /// A foreign key points at a row that does not exist
    #[error("Missing reference: {message}")]
    MissingReference {
        /// Which reference was missing
        message: String,
    },

    /// The operation is not allowed in the record's current lifecycle state
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Why the transition was refused
        message: String,
    },

    /// Email/password pair did not match
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Reset token unknown, already used or expired
    #[error("Password reset token is invalid or expired")]
    InvalidResetToken,

    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Integer conversion error: {0}")]
    IntConversion(#[from] std::num::TryFromIntError),
}

impl From<DbErr> for Error {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(message)) => Self::Conflict { message },
            Some(SqlErr::ForeignKeyConstraintViolation(message)) => {
                Self::MissingReference { message }
            }
            _ => Self::Database(err),
        }
    }
}

impl Error {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    pub(crate) fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
