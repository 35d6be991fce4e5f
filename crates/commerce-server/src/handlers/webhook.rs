//! Checkout Webhook Endpoint
//!
//! Receives `checkout.session.completed` deliveries, verifies the
//! signature, and runs the post-purchase side effects: CRM form submission
//! and marketing tags. Side effects are best-effort; the provider always
//! gets a 200 once the signature verifies so it never retries a delivery
//! that failed on our side of the fence.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use serde_json::{Value, json};

use commerce_clients::{PurchaseRecord, split_tag_list};
use commerce_payments::{CheckoutEvent, CompletedCheckout, classify_event};

use crate::handlers::{HandlerError, reject};
use crate::state::AppState;

pub async fn checkout_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>, HandlerError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            reject(
                StatusCode::BAD_REQUEST,
                "MISSING_SIGNATURE",
                "Missing stripe-signature header",
            )
        })?;

    let event = state.stripe.verify_event(&body, signature).map_err(|e| {
        tracing::warn!(error = %e, "Webhook signature verification failed");
        reject(StatusCode::BAD_REQUEST, "INVALID_SIGNATURE", e.to_string())
    })?;

    let completed = match classify_event(&event) {
        Ok(CheckoutEvent::Completed(c)) => c,
        Ok(CheckoutEvent::Ignored { event_type }) => {
            tracing::debug!(event_type, "Ignoring webhook event");
            return Ok(Json(json!({ "received": true })));
        }
        Err(e) => {
            return Err(reject(
                StatusCode::BAD_REQUEST,
                "INVALID_PAYLOAD",
                e.to_string(),
            ));
        }
    };

    if !completed.from_recognized_source() {
        tracing::info!(
            session_id = %completed.session_id,
            "Session not created by this gateway, skipping"
        );
        return Ok(Json(json!({ "received": true, "skipped": true })));
    }

    tracing::info!(
        session_id = %completed.session_id,
        payment_status = %completed.payment_status,
        "Processing completed checkout"
    );

    let mut errors: Vec<String> = Vec::new();
    process_completed(&state, &completed, &mut errors).await;

    let response = if errors.is_empty() {
        json!({ "received": true })
    } else {
        json!({ "received": true, "errors": errors })
    };
    Ok(Json(response))
}

/// CRM and tagging for a session we created. Each step logs and records
/// its own failure so the others still run.
async fn process_completed(state: &AppState, completed: &CompletedCheckout, errors: &mut Vec<String>) {
    // Email entered at checkout wins over what the frontend sent at
    // session-creation time.
    let email = completed
        .email
        .clone()
        .unwrap_or_else(|| completed.meta("email").to_string());
    if email.is_empty() {
        errors.push("no email on session".to_string());
        return;
    }

    let form_guid = completed.meta("crmFormGuid");
    if !form_guid.is_empty() {
        let record = PurchaseRecord {
            first_name: completed.meta("firstName").to_string(),
            last_name: completed.meta("lastName").to_string(),
            email: email.clone(),
            phone: completed
                .phone
                .clone()
                .unwrap_or_else(|| completed.meta("phone").to_string()),
            user_id: completed.meta("userId").to_string(),
            product_label: completed.meta("productLabel").to_string(),
            product_type: completed.meta("productType").to_string(),
            period: completed.meta("period").to_string(),
            amount: completed.amount_major(),
            checkout_session_id: completed.session_id.clone(),
            customer_id: completed.customer_id.clone().unwrap_or_default(),
            subscription_id: completed.subscription_id.clone().unwrap_or_default(),
        };
        if let Err(e) = state.crm.submit_purchase_form(form_guid, &record).await {
            tracing::error!(error = %e, session_id = %completed.session_id, "CRM submission failed");
            errors.push(format!("crm: {e}"));
        }
    }

    let tags = split_tag_list(completed.meta("marketingTags"));
    if !tags.is_empty() {
        match state.marketing.apply_tags(&email, &tags).await {
            Ok(outcomes) => {
                for outcome in outcomes.iter().filter(|o| !o.success) {
                    errors.push(format!("tag {}: failed", outcome.tag));
                }
            }
            Err(e) => {
                tracing::error!(error = %e, session_id = %completed.session_id, "Tagging failed");
                errors.push(format!("tags: {e}"));
            }
        }
    }
}
