//! Error types for store operations.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while talking to the relational store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("connection failed: {0}")]
    Connection(String),

    /// A statement was rejected or failed while executing.
    #[error("query failed: {0}")]
    Query(String),

    /// A fault injected by a test gateway.
    #[error("injected fault: {0}")]
    Injected(String),

    /// An error reported by the PostgreSQL driver.
    #[cfg(feature = "postgres")]
    #[error("postgres error: {0}")]
    Postgres(#[from] sqlx::Error),
}

impl StoreError {
    /// Creates a query error from any displayable message.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    /// Returns true if the error happened before a connection was established.
    pub fn is_connection(&self) -> bool {
        match self {
            StoreError::Connection(_) => true,
            #[cfg(feature = "postgres")]
            StoreError::Postgres(e) => matches!(
                e,
                sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut
            ),
            _ => false,
        }
    }
}
