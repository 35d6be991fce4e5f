//! Entitlement Endpoints
//!
//! Grant, renew, and convert-to-lifetime. All three resolve the product
//! SKU through the catalog, compute a window from the policy table, then
//! issue a promotional grant against the entitlement backend. Account
//! provisioning (grant only) and attribute sync are best-effort.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use commerce_core::{
    BillingPeriod, Mode, Product, PurchaseKind, grant_window, lifetime_window, lookup_product,
    renewal_window,
};

use crate::handlers::{ErrorResponse, HandlerError, client_error, reject, require};
use crate::state::AppState;

fn resolve_product(sku: &str) -> Result<&'static Product, HandlerError> {
    lookup_product(sku).ok_or_else(|| {
        reject(
            StatusCode::BAD_REQUEST,
            "INVALID_SKU",
            format!("Invalid product SKU: {sku}"),
        )
    })
}

// ---------------------------------------------------------------------------
// Grant
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub product_sku: Option<String>,
    pub period: Option<String>,
    /// Password to use for a new account; generated when absent
    pub password: Option<String>,
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantResponse {
    pub success: bool,
    pub user_id: String,
    pub email: String,
    /// The generated password, or a placeholder when the caller supplied one
    pub password: String,
    pub password_was_generated: bool,
    pub entitlement: String,
    /// ISO-8601 duration of the granted window
    pub duration: String,
    pub expires_at: DateTime<Utc>,
    pub account_created: bool,
}

pub async fn grant_entitlement(
    State(state): State<AppState>,
    Json(payload): Json<GrantRequest>,
) -> Result<Json<GrantResponse>, HandlerError> {
    let email = require("email", payload.email.as_ref())?;
    let first_name = require("firstName", payload.first_name.as_ref())?;
    let sku = require("productSku", payload.product_sku.as_ref())?;
    let product = resolve_product(sku)?;
    let period = BillingPeriod::parse(payload.period.as_deref().unwrap_or(""));
    let mode = Mode::parse(payload.mode.as_deref().unwrap_or("live"));

    let account = state
        .identity
        .ensure_account(mode, email, payload.password.as_deref(), first_name)
        .await
        .map_err(|e| client_error(&e))?;

    // The backend's GET creates the subscriber record when absent. A failure
    // here is not fatal; the grant call below is authoritative.
    if let Err(e) = state.entitlements.subscriber(&account.user_id).await {
        tracing::warn!(user_id = %account.user_id, error = %e, "Subscriber pre-fetch failed");
    }

    let display_name = match payload.last_name.as_deref() {
        Some(last) if !last.is_empty() => format!("{first_name} {last}"),
        _ => first_name.to_string(),
    };
    if let Err(e) = state
        .entitlements
        .set_attributes(&account.user_id, email, &display_name)
        .await
    {
        tracing::warn!(user_id = %account.user_id, error = %e, "Attribute sync failed");
    }

    let window = grant_window(product.kind, period, Utc::now());

    if let Err(e) = state
        .entitlements
        .grant_promotional(&account.user_id, product.entitlement_id, &window)
        .await
    {
        let mut body = ErrorResponse::new("Entitlement grant failed", "GRANT_FAILED");
        body.details = Some(e.to_string());
        body.user_id = Some(account.user_id);
        body.account_created = Some(account.account_created);
        return Err((StatusCode::INTERNAL_SERVER_ERROR, Json(body)));
    }

    tracing::info!(
        user_id = %account.user_id,
        entitlement = product.entitlement_id,
        expires = %window.end,
        "Entitlement granted"
    );

    let duration = match product.kind {
        PurchaseKind::OneTime => "P100Y".to_string(),
        PurchaseKind::MultiPay => "P1M".to_string(),
        PurchaseKind::Subscription => period.iso_duration().to_string(),
    };

    Ok(Json(GrantResponse {
        success: true,
        user_id: account.user_id,
        email: email.to_string(),
        password: if account.password_generated {
            account.password
        } else {
            "[provided by user]".to_string()
        },
        password_was_generated: account.password_generated,
        entitlement: product.entitlement_id.to_string(),
        duration,
        expires_at: window.end,
        account_created: account.account_created,
    }))
}

// ---------------------------------------------------------------------------
// Renew
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewRequest {
    pub email: Option<String>,
    pub product_sku: Option<String>,
    pub period: Option<String>,
    /// The entitlement-backend subscriber id from the original grant
    pub subscriber_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewResponse {
    pub success: bool,
    pub user_id: String,
    pub entitlement: String,
    pub previous_expiry: Option<DateTime<Utc>>,
    pub new_expiry: DateTime<Utc>,
}

pub async fn renew_entitlement(
    State(state): State<AppState>,
    Json(payload): Json<RenewRequest>,
) -> Result<Json<RenewResponse>, HandlerError> {
    require("email", payload.email.as_ref())?;
    let sku = require("productSku", payload.product_sku.as_ref())?;
    let product = resolve_product(sku)?;
    let period = BillingPeriod::parse(payload.period.as_deref().unwrap_or(""));

    // Renewals never guess the subscriber: the id minted at grant time must
    // come back with the request, or the wrong record could be extended.
    let user_id = match payload.subscriber_id.as_ref() {
        Some(id) if !id.trim().is_empty() => id.as_str(),
        _ => {
            return Err(reject(
                StatusCode::BAD_REQUEST,
                "MISSING_FIELD",
                "Renewal requires subscriberId; include the id from the original grant",
            ));
        }
    };

    let subscriber = state.entitlements.subscriber(user_id).await.map_err(|e| {
        reject(
            StatusCode::NOT_FOUND,
            "SUBSCRIBER_NOT_FOUND",
            format!("No subscriber record for {user_id}: {e}"),
        )
    })?;

    let previous_expiry = subscriber.entitlement_expiry(product.entitlement_id);
    let window = renewal_window(period, Utc::now(), previous_expiry);

    state
        .entitlements
        .grant_promotional(user_id, product.entitlement_id, &window)
        .await
        .map_err(|e| client_error(&e))?;

    tracing::info!(
        user_id,
        entitlement = product.entitlement_id,
        previous = ?previous_expiry,
        new = %window.end,
        "Entitlement renewed"
    );

    Ok(Json(RenewResponse {
        success: true,
        user_id: user_id.to_string(),
        entitlement: product.entitlement_id.to_string(),
        previous_expiry,
        new_expiry: window.end,
    }))
}

// ---------------------------------------------------------------------------
// Convert to lifetime
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertRequest {
    pub email: Option<String>,
    pub user_id: Option<String>,
    pub product_sku: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub success: bool,
    pub user_id: String,
    pub entitlement: String,
    pub previous_expiry: Option<DateTime<Utc>>,
    pub new_expiry: DateTime<Utc>,
}

pub async fn convert_to_lifetime(
    State(state): State<AppState>,
    Json(payload): Json<ConvertRequest>,
) -> Result<Json<ConvertResponse>, HandlerError> {
    require("email", payload.email.as_ref())?;
    let user_id = require("userId", payload.user_id.as_ref())?;
    let sku = require("productSku", payload.product_sku.as_ref())?;
    let product = resolve_product(sku)?;

    if product.kind != PurchaseKind::MultiPay {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            "NOT_MULTI_PAY",
            format!("Product {sku} is not a multi-pay plan"),
        ));
    }

    let subscriber = state.entitlements.subscriber(user_id).await.map_err(|e| {
        reject(
            StatusCode::NOT_FOUND,
            "SUBSCRIBER_NOT_FOUND",
            format!("No subscriber record for {user_id}: {e}"),
        )
    })?;

    let previous_expiry = subscriber.entitlement_expiry(product.entitlement_id);
    let window = lifetime_window(Utc::now());

    state
        .entitlements
        .grant_promotional(user_id, product.entitlement_id, &window)
        .await
        .map_err(|e| client_error(&e))?;

    tracing::info!(
        user_id,
        entitlement = product.entitlement_id,
        "Multi-pay plan converted to lifetime"
    );

    Ok(Json(ConvertResponse {
        success: true,
        user_id: user_id.to_string(),
        entitlement: product.entitlement_id.to_string(),
        previous_expiry,
        new_expiry: window.end,
    }))
}
