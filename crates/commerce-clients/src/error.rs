//! Client Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors from the downstream backend clients
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be interpreted
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Identity backend rejected the credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Account already exists at the identity backend
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The backend rejected the request as invalid
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Referenced record does not exist at the backend
    #[error("Not found: {0}")]
    NotFound(String),

    /// Identity token could not be decoded
    #[error("Token error: {0}")]
    Token(String),

    /// Any other backend failure, raw message passed through
    #[error("Provider error: {0}")]
    Provider(String),
}

impl ClientError {
    /// HTTP status the edge should answer with
    pub fn status(&self) -> u16 {
        match self {
            ClientError::Unauthorized(_) => 401,
            ClientError::Conflict(_) => 409,
            ClientError::Rejected(_) => 400,
            ClientError::NotFound(_) => 404,
            _ => 500,
        }
    }
}
