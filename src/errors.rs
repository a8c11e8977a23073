//! Unified error types and result handling.
//!
//! Every fallible operation in the crate returns [`Result`]. The HTTP layer maps
//! each variant to a status code in `api::error`.

use thiserror::Error;

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description
        message: String,
    },

    /// Input failed a field-level validation rule
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable description
        message: String,
    },

    /// A referenced record does not exist
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record (e.g. "Student")
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// A grade already has open attendance records
    #[error("An attendance session is already open for grade {grade}")]
    SessionAlreadyOpen {
        /// Grade name
        grade: String,
    },

    /// A grade cannot be removed while it still has open attendance records
    #[error("Grade {grade} still has an open attendance session")]
    GradeInUse {
        /// Grade name
        grade: String,
    },

    /// Open attendance records with no linked student were found while archiving
    #[error("Grade {grade} has {count} attendance record(s) without a student")]
    OrphanedAttendance {
        /// Grade name
        grade: String,
        /// Number of orphaned records
        count: usize,
    },

    /// A receipt with this number was already recorded
    #[error("Receipt number {receipt_number} already exists")]
    DuplicateReceipt {
        /// The conflicting receipt number
        receipt_number: String,
    },

    /// A monetary amount is out of range
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount, rendered as text
        amount: String,
    },

    /// The shared secret for the trigger endpoints is not configured
    #[error("Server configuration error: attendance API token not set")]
    MissingApiToken,

    /// Missing or wrong bearer credential
    #[error("Unauthorized")]
    Unauthorized,

    /// Error reported by the database layer
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O error (config file, socket binding)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

impl Error {
    /// Shorthand for a [`Error::Validation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a [`Error::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
