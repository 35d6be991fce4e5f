//! Error Types

use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Gateway error taxonomy
///
/// Every downstream provider failure collapses into `Provider` with the
/// provider's raw message preserved; the HTTP layer echoes it to the caller.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A required request field was absent or empty
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Request shape was valid but a value was not
    #[error("Validation error: {0}")]
    Validation(String),

    /// A referenced record does not exist at the provider
    #[error("Not found: {0}")]
    NotFound(String),

    /// The record already exists (duplicate account)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Credentials rejected by the identity backend
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Configuration error at startup
    #[error("Configuration error: {0}")]
    Config(String),

    /// Downstream provider failure, message passed through
    #[error("Provider error: {0}")]
    Provider(String),
}

impl CoreError {
    /// HTTP status this error maps to at the edge
    pub fn status(&self) -> u16 {
        match self {
            CoreError::MissingField(_) | CoreError::Validation(_) => 400,
            CoreError::NotFound(_) => 404,
            CoreError::Conflict(_) => 409,
            CoreError::Unauthorized(_) => 401,
            CoreError::Config(_) | CoreError::Provider(_) => 500,
        }
    }

    /// Stable machine-readable code for response bodies
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::MissingField(_) => "MISSING_FIELD",
            CoreError::Validation(_) => "INVALID_REQUEST",
            CoreError::NotFound(_) => "NOT_FOUND",
            CoreError::Conflict(_) => "CONFLICT",
            CoreError::Unauthorized(_) => "UNAUTHORIZED",
            CoreError::Config(_) => "CONFIG_ERROR",
            CoreError::Provider(_) => "PROVIDER_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(CoreError::MissingField("email").status(), 400);
        assert_eq!(CoreError::NotFound("subscriber".into()).status(), 404);
        assert_eq!(CoreError::Conflict("account".into()).status(), 409);
        assert_eq!(CoreError::Unauthorized("bad password".into()).status(), 401);
        assert_eq!(CoreError::Provider("card declined".into()).status(), 500);
    }
}
