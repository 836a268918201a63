//! Custom error types for the common library
//!
//! This module defines the storage error type shared by every crate that
//! talks to PostgreSQL.

use sqlx::Error as SqlxError;
use sqlx::migrate::MigrateError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(#[source] MigrateError),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),

    /// A stored value could not be mapped back onto the domain model
    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    /// Insert rejected by a uniqueness constraint (SQLSTATE 23505)
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),
}

impl From<SqlxError> for DatabaseError {
    fn from(err: SqlxError) -> Self {
        let unique = err
            .as_database_error()
            .is_some_and(|db| db.is_unique_violation());

        if unique {
            DatabaseError::UniqueViolation(err.to_string())
        } else {
            DatabaseError::Query(err)
        }
    }
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;
