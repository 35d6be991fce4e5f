//! Payment Endpoints
//!
//! The four Stripe-facing flows: embedded checkout sessions, order-bump
//! payment intents, setup intents, and subscriptions built from them, plus
//! the off-session upsell charge. Each one validates its body, reuses or
//! creates the customer, then performs the provider calls in sequence.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use stripe::{CustomerId, Metadata, SetupIntentId};

use commerce_clients::{PurchaseRecord, split_tag_list};
use commerce_core::Mode;
use commerce_payments::{
    BumpOrder, CHECKOUT_SOURCE, CheckoutContext, CustomerProfile, build_return_url,
};

use crate::handlers::{HandlerError, payment_error, reject, require};
use crate::state::AppState;

fn parse_customer_id(raw: &str) -> Result<CustomerId, HandlerError> {
    raw.parse().map_err(|_| {
        reject(
            StatusCode::BAD_REQUEST,
            "INVALID_CUSTOMER_ID",
            format!("Invalid customer id: {raw}"),
        )
    })
}

fn parse_setup_intent_id(raw: &str) -> Result<SetupIntentId, HandlerError> {
    raw.parse().map_err(|_| {
        reject(
            StatusCode::BAD_REQUEST,
            "INVALID_SETUP_INTENT_ID",
            format!("Invalid setup intent id: {raw}"),
        )
    })
}

fn request_mode(mode: Option<&String>) -> Mode {
    Mode::parse(mode.map_or("stage", String::as_str))
}

// ---------------------------------------------------------------------------
// Checkout session
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub price_id: Option<String>,
    pub product_label: Option<String>,
    pub product_type: Option<String>,
    pub period: Option<String>,
    pub success_url: Option<String>,
    pub crm_form_guid: Option<String>,
    pub marketing_tags: Option<String>,
    pub user_id: Option<String>,
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionResponse {
    pub client_secret: String,
    pub session_id: String,
    pub customer_id: String,
}

pub async fn create_checkout_session(
    State(state): State<AppState>,
    Json(payload): Json<CheckoutSessionRequest>,
) -> Result<Json<CheckoutSessionResponse>, HandlerError> {
    let first_name = require("firstName", payload.first_name.as_ref())?;
    let last_name = require("lastName", payload.last_name.as_ref())?;
    let email = require("email", payload.email.as_ref())?;
    let price_id = require("priceId", payload.price_id.as_ref())?;
    let success_url = require("successUrl", payload.success_url.as_ref())?;
    let mode = request_mode(payload.mode.as_ref());

    let profile = CustomerProfile {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: email.to_string(),
        phone: payload.phone.clone(),
        user_id: payload.user_id.clone(),
    };
    let customer = state
        .stripe
        .find_or_create_customer(mode, &profile)
        .await
        .map_err(|e| payment_error(&e))?;

    let field = |v: &Option<String>| v.clone().unwrap_or_default();
    let context = CheckoutContext {
        product_label: field(&payload.product_label),
        product_type: field(&payload.product_type),
        period: field(&payload.period),
        crm_form_guid: field(&payload.crm_form_guid),
        marketing_tags: field(&payload.marketing_tags),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: email.to_string(),
        phone: field(&payload.phone),
        user_id: field(&payload.user_id),
    };

    let return_url = build_return_url(
        success_url,
        customer.id.as_str(),
        first_name,
        &context.product_label,
        &context.product_type,
    )
    .map_err(|e| payment_error(&e))?;

    let session = state
        .stripe
        .create_embedded_session(mode, &customer.id, price_id, &return_url, &context)
        .await
        .map_err(|e| payment_error(&e))?;

    Ok(Json(CheckoutSessionResponse {
        client_secret: session.client_secret,
        session_id: session.session_id,
        customer_id: customer.id.to_string(),
    }))
}

// ---------------------------------------------------------------------------
// Order-bump payment intent
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub with_bump: bool,
    pub base_price: Option<i64>,
    #[serde(default)]
    pub bump_price: i64,
    pub base_label: Option<String>,
    pub bump_label: Option<String>,
    pub base_price_id: Option<String>,
    pub bump_price_id: Option<String>,
    pub user_id: Option<String>,
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: String,
    pub customer_id: String,
}

pub async fn create_payment_intent(
    State(state): State<AppState>,
    Json(payload): Json<PaymentIntentRequest>,
) -> Result<Json<PaymentIntentResponse>, HandlerError> {
    let first_name = require("firstName", payload.first_name.as_ref())?;
    let last_name = require("lastName", payload.last_name.as_ref())?;
    let email = require("email", payload.email.as_ref())?;
    let base_amount = payload.base_price.ok_or_else(|| {
        reject(
            StatusCode::BAD_REQUEST,
            "MISSING_FIELD",
            "Missing required field: basePrice",
        )
    })?;
    let mode = request_mode(payload.mode.as_ref());

    let profile = CustomerProfile {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: email.to_string(),
        phone: payload.phone.clone(),
        user_id: payload.user_id.clone(),
    };
    let customer = state
        .stripe
        .find_or_create_customer(mode, &profile)
        .await
        .map_err(|e| payment_error(&e))?;

    let order = BumpOrder {
        base_amount,
        bump_amount: payload.bump_price,
        with_bump: payload.with_bump,
        base_label: payload.base_label.unwrap_or_else(|| "Main Product".into()),
        bump_label: payload.bump_label.unwrap_or_default(),
        base_price_id: payload.base_price_id.unwrap_or_default(),
        bump_price_id: payload.bump_price_id.unwrap_or_default(),
        email: email.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
    };

    let intent = state
        .stripe
        .create_bump_intent(mode, &customer.id, &order)
        .await
        .map_err(|e| payment_error(&e))?;

    Ok(Json(PaymentIntentResponse {
        client_secret: intent.client_secret.unwrap_or_default(),
        customer_id: customer.id.to_string(),
    }))
}

// ---------------------------------------------------------------------------
// Setup intent
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupIntentRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub user_id: Option<String>,
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupIntentResponse {
    pub client_secret: String,
    pub customer_id: String,
    pub setup_intent_id: String,
}

pub async fn create_setup_intent(
    State(state): State<AppState>,
    Json(payload): Json<SetupIntentRequest>,
) -> Result<Json<SetupIntentResponse>, HandlerError> {
    let first_name = require("firstName", payload.first_name.as_ref())?;
    let last_name = require("lastName", payload.last_name.as_ref())?;
    let email = require("email", payload.email.as_ref())?;
    let user_id = require("userId", payload.user_id.as_ref())?;
    let mode = request_mode(payload.mode.as_ref());

    let profile = CustomerProfile {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: email.to_string(),
        phone: None,
        user_id: Some(user_id.to_string()),
    };
    let customer = state
        .stripe
        .find_or_create_customer(mode, &profile)
        .await
        .map_err(|e| payment_error(&e))?;

    let mut metadata = Metadata::new();
    metadata.insert("userId".into(), user_id.to_string());
    metadata.insert("email".into(), email.to_string());
    metadata.insert("firstName".into(), first_name.to_string());
    metadata.insert("lastName".into(), last_name.to_string());
    metadata.insert("source".into(), CHECKOUT_SOURCE.to_string());

    let intent = state
        .stripe
        .create_setup_intent(mode, &customer.id, metadata)
        .await
        .map_err(|e| payment_error(&e))?;

    Ok(Json(SetupIntentResponse {
        client_secret: intent.client_secret.unwrap_or_default(),
        customer_id: customer.id.to_string(),
        setup_intent_id: intent.id.to_string(),
    }))
}

// ---------------------------------------------------------------------------
// Subscription from setup intent
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRequest {
    pub customer_id: Option<String>,
    pub setup_intent_id: Option<String>,
    pub price_id: Option<String>,
    pub product_label: Option<String>,
    pub product_type: Option<String>,
    pub period: Option<String>,
    pub crm_form_guid: Option<String>,
    pub marketing_tags: Option<String>,
    pub user_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub subscription_id: String,
    pub customer_id: String,
    pub status: String,
}

pub async fn create_subscription(
    State(state): State<AppState>,
    Json(payload): Json<SubscriptionRequest>,
) -> Result<Json<SubscriptionResponse>, HandlerError> {
    let customer_raw = require("customerId", payload.customer_id.as_ref())?;
    let setup_intent_raw = require("setupIntentId", payload.setup_intent_id.as_ref())?;
    let price_id = require("priceId", payload.price_id.as_ref())?;
    let customer_id = parse_customer_id(customer_raw)?;
    let setup_intent_id = parse_setup_intent_id(setup_intent_raw)?;
    let mode = request_mode(payload.mode.as_ref());

    let field = |v: &Option<String>| v.clone().unwrap_or_default();
    let context = CheckoutContext {
        product_label: field(&payload.product_label),
        product_type: field(&payload.product_type),
        period: field(&payload.period),
        crm_form_guid: field(&payload.crm_form_guid),
        marketing_tags: field(&payload.marketing_tags),
        first_name: field(&payload.first_name),
        last_name: field(&payload.last_name),
        email: field(&payload.email),
        phone: String::new(),
        user_id: field(&payload.user_id),
    };

    let subscription = state
        .stripe
        .create_subscription_from_setup(
            mode,
            &customer_id,
            &setup_intent_id,
            price_id,
            context.to_metadata(),
        )
        .await
        .map_err(|e| payment_error(&e))?;

    // Post-purchase CRM and tagging are best-effort: failures are logged
    // and the subscription response still succeeds.
    if !context.crm_form_guid.is_empty() && !context.email.is_empty() {
        let amount = subscription
            .items
            .data
            .first()
            .and_then(|item| item.price.as_ref())
            .and_then(|price| price.unit_amount)
            .unwrap_or(0) as f64
            / 100.0;
        let record = PurchaseRecord {
            first_name: context.first_name.clone(),
            last_name: context.last_name.clone(),
            email: context.email.clone(),
            phone: String::new(),
            user_id: context.user_id.clone(),
            product_label: context.product_label.clone(),
            product_type: context.product_type.clone(),
            period: context.period.clone(),
            amount,
            checkout_session_id: String::new(),
            customer_id: customer_id.to_string(),
            subscription_id: subscription.id.to_string(),
        };
        if let Err(e) = state
            .crm
            .submit_purchase_form(&context.crm_form_guid, &record)
            .await
        {
            tracing::error!(error = %e, "CRM form submission failed after subscription");
        }
    }

    let tags = split_tag_list(&context.marketing_tags);
    if !tags.is_empty() && !context.email.is_empty() {
        if let Err(e) = state.marketing.apply_tags(&context.email, &tags).await {
            tracing::error!(error = %e, "Tag application failed after subscription");
        }
    }

    Ok(Json(SubscriptionResponse {
        subscription_id: subscription.id.to_string(),
        customer_id: customer_id.to_string(),
        status: subscription.status.to_string(),
    }))
}

// ---------------------------------------------------------------------------
// Off-session upsell charge
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsellRequest {
    pub customer_id: Option<String>,
    pub upsell_amount: Option<i64>,
    pub upsell_description: Option<String>,
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsellResponse {
    pub success: bool,
    pub payment_intent_id: String,
    pub status: String,
}

pub async fn charge_upsell(
    State(state): State<AppState>,
    Json(payload): Json<UpsellRequest>,
) -> Result<Json<UpsellResponse>, HandlerError> {
    let customer_raw = require("customerId", payload.customer_id.as_ref())?;
    let customer_id = parse_customer_id(customer_raw)?;
    let amount = payload.upsell_amount.ok_or_else(|| {
        reject(
            StatusCode::BAD_REQUEST,
            "MISSING_FIELD",
            "Missing required field: upsellAmount",
        )
    })?;
    let mode = request_mode(payload.mode.as_ref());
    let description = payload.upsell_description.unwrap_or_default();

    let intent = state
        .stripe
        .charge_off_session(mode, &customer_id, amount, &description)
        .await
        .map_err(|e| payment_error(&e))?;

    Ok(Json(UpsellResponse {
        success: true,
        payment_intent_id: intent.id.to_string(),
        status: intent.status.to_string(),
    }))
}
