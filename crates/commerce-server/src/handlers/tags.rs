//! Tag Endpoint
//!
//! Applies marketing tags to a contact outside the checkout flow. This is
//! the one route served with an origin allow-list instead of the permissive
//! CORS layer.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use commerce_clients::TagOutcome;

use crate::handlers::{HandlerError, client_error, reject, require};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRequest {
    pub email: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagResponse {
    pub success: bool,
    pub results: Vec<TagOutcome>,
}

pub async fn apply_tags(
    State(state): State<AppState>,
    Json(payload): Json<TagRequest>,
) -> Result<Json<TagResponse>, HandlerError> {
    let email = require("email", payload.email.as_ref())?;

    let tags: Vec<String> = payload
        .tags
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if tags.is_empty() {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            "MISSING_FIELD",
            "At least one tag is required",
        ));
    }

    let results = state
        .marketing
        .apply_tags(email, &tags)
        .await
        .map_err(|e| client_error(&e))?;

    let success = results.iter().all(|r| r.success);
    Ok(Json(TagResponse { success, results }))
}
