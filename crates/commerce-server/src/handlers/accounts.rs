//! Account Endpoint
//!
//! Sign-up or sign-in against the identity backend, selected by the
//! `action` field. Password policy is enforced here for sign-up so a bad
//! password never reaches the backend.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use commerce_core::Mode;

use crate::handlers::{HandlerError, client_error, reject, require};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    /// "signup" (default) or "signin"
    pub action: Option<String>,
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub user_id: String,
    pub token: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub success: bool,
}

/// Minimum length plus at least one digit or symbol
fn password_meets_policy(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    if !password
        .chars()
        .any(|c| c.is_ascii_digit() || c.is_ascii_punctuation())
    {
        return Err("Password must contain at least 1 symbol or number");
    }
    Ok(())
}

pub async fn account(
    State(state): State<AppState>,
    Json(payload): Json<AccountRequest>,
) -> Result<Json<AccountResponse>, HandlerError> {
    let email = require("email", payload.email.as_ref())?;
    let password = require("password", payload.password.as_ref())?;
    let sign_in = payload.action.as_deref() == Some("signin");
    let mode = Mode::parse(payload.mode.as_deref().unwrap_or("stage"));

    let session = if sign_in {
        state
            .identity
            .sign_in(mode, email, password)
            .await
            .map_err(|e| client_error(&e))?
    } else {
        let first_name = require("firstName", payload.first_name.as_ref())?;
        if let Err(message) = password_meets_policy(password) {
            return Err(reject(StatusCode::BAD_REQUEST, "WEAK_PASSWORD", message));
        }
        state
            .identity
            .sign_up(mode, email, password, first_name)
            .await
            .map_err(|e| client_error(&e))?
    };

    tracing::info!(user_id = %session.user_id, sign_in, "Identity operation succeeded");

    Ok(Json(AccountResponse {
        user_id: session.user_id,
        token: session.token,
        first_name: session
            .first_name
            .or(payload.first_name)
            .unwrap_or_default(),
        last_name: session.last_name.unwrap_or_default(),
        email: session.email.unwrap_or_else(|| email.to_string()),
        success: true,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_policy() {
        assert!(password_meets_policy("short1!").is_err());
        assert!(password_meets_policy("allletters").is_err());
        assert!(password_meets_policy("longenough1").is_ok());
        assert!(password_meets_policy("longenough!").is_ok());
    }
}
