//! Error types for the relay server.

use axum::http::StatusCode;
use std::time::Duration;
use syncrelay_store::StoreError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Message returned to callers whose credentials did not match.
pub const UNAUTHORIZED_MESSAGE: &str = "Invalid client ID or access token";

/// Message returned to callers for every server-side failure.
pub const SERVER_ERROR_MESSAGE: &str = "Server error";

/// Errors that can occur while handling a relay request.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Missing or malformed input.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The client identifier and access token did not match a tenant.
    ///
    /// Unknown client and wrong token both map here.
    #[error("authentication failed")]
    Unauthorized,

    /// The store could not be reached or rejected a statement.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A replace-sync failed mid-write and was rolled back.
    #[error("sync rolled back: {0}")]
    PartialFailure(String),

    /// The request did not finish in time.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Creates a validation error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(self, ServerError::InvalidRequest(_) | ServerError::Unauthorized)
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// Returns the HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Unauthorized => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the underlying failure text without the variant prefix.
    ///
    /// This is what the audit log stores for a failed sync.
    pub fn detail(&self) -> String {
        match self {
            ServerError::InvalidRequest(message)
            | ServerError::PartialFailure(message)
            | ServerError::Internal(message) => message.clone(),
            ServerError::Store(e) => e.to_string(),
            other => other.to_string(),
        }
    }

    /// Returns the message that may be shown to the caller.
    ///
    /// Server errors collapse to a generic message.
    pub fn public_message(&self) -> String {
        match self {
            ServerError::InvalidRequest(message) => message.clone(),
            ServerError::Unauthorized => UNAUTHORIZED_MESSAGE.to_string(),
            _ => SERVER_ERROR_MESSAGE.to_string(),
        }
    }
}
