//! HTTP Handlers
//!
//! One module per endpoint group. Shared here: the error-response shape,
//! the field-validation helper (validation happens before any downstream
//! call), and the mapping from client/payment errors to HTTP statuses.

pub mod accounts;
pub mod checkout;
pub mod entitlements;
pub mod tags;
pub mod webhook;

use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;

use commerce_clients::ClientError;
use commerce_payments::PaymentError;

/// Error body returned by every endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    /// Raw downstream provider message, when one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Partial progress: the user id resolved before the failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Partial progress: whether an account was created before the failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_created: Option<bool>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
            user_id: None,
            account_created: None,
        }
    }
}

pub type HandlerError = (StatusCode, Json<ErrorResponse>);

pub fn reject(status: StatusCode, code: &str, message: impl Into<String>) -> HandlerError {
    (status, Json(ErrorResponse::new(message, code)))
}

/// Validate a required string field; 400 naming the field when absent
pub fn require<'a>(
    field: &'static str,
    value: Option<&'a String>,
) -> Result<&'a str, HandlerError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.as_str()),
        _ => Err(reject(
            StatusCode::BAD_REQUEST,
            "MISSING_FIELD",
            format!("Missing required field: {field}"),
        )),
    }
}

/// Translate a backend-client error into an HTTP response
pub fn client_error(e: &ClientError) -> HandlerError {
    let status =
        StatusCode::from_u16(e.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let code = match e {
        ClientError::Unauthorized(_) => "UNAUTHORIZED",
        ClientError::Conflict(_) => "CONFLICT",
        ClientError::NotFound(_) => "NOT_FOUND",
        ClientError::Rejected(_) => "INVALID_REQUEST",
        _ => "PROVIDER_ERROR",
    };
    reject(status, code, e.to_string())
}

/// Translate a Stripe-side error into an HTTP response
pub fn payment_error(e: &PaymentError) -> HandlerError {
    let status =
        StatusCode::from_u16(e.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let code = match e {
        PaymentError::NoPaymentMethod(_) => "NO_PAYMENT_METHOD",
        PaymentError::WebhookSignature(_) => "INVALID_SIGNATURE",
        PaymentError::WebhookParse(_) => "INVALID_PAYLOAD",
        _ => "STRIPE_ERROR",
    };
    reject(status, code, e.to_string())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Whether identity tokens are signature-verified
    pub jwt_verification: bool,
    /// Whether the tag endpoint runs with an origin allow-list
    pub tag_origin_allowlist: bool,
}

/// Health check endpoint
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<crate::state::AppState>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        jwt_verification: state.config.identity_jwt_public_key.is_some(),
        tag_origin_allowlist: !state.config.tag_allowed_origins.is_empty(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_rejects_missing_and_blank() {
        assert!(require("email", None).is_err());
        assert!(require("email", Some(&"  ".to_string())).is_err());
        let value = "a@b.c".to_string();
        assert_eq!(require("email", Some(&value)).unwrap(), "a@b.c");
    }

    #[test]
    fn test_require_names_the_field() {
        let (status, body) = require("productSku", None).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.error.contains("productSku"));
    }

    #[test]
    fn test_client_error_statuses() {
        let (status, _) = client_error(&ClientError::Unauthorized("bad".into()));
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = client_error(&ClientError::Conflict("dup".into()));
        assert_eq!(status, StatusCode::CONFLICT);
        let (status, _) = client_error(&ClientError::Provider("boom".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_no_payment_method_is_client_fault() {
        let (status, body) = payment_error(&PaymentError::NoPaymentMethod("cus_1".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, "NO_PAYMENT_METHOD");
    }
}
