//! Checkout Webhook Handling
//!
//! Verifies webhook signatures and extracts the one event this gateway
//! acts on: `checkout.session.completed`. Everything else is acknowledged
//! and ignored. The `source` metadata marker gates processing so events
//! from sessions we did not create pass through untouched.

use std::collections::HashMap;

use stripe::{Event, EventObject, EventType, Webhook};

use crate::checkout::CHECKOUT_SOURCE;
use crate::error::{PaymentError, Result};
use crate::gateway::StripeGateway;

/// A parsed webhook delivery
#[derive(Clone, Debug)]
pub enum CheckoutEvent {
    /// A checkout session finished; may or may not be ours
    Completed(CompletedCheckout),
    /// Any other event type, acknowledged without action
    Ignored { event_type: String },
}

/// The fields of a completed checkout session the downstream steps need
#[derive(Clone, Debug, Default)]
pub struct CompletedCheckout {
    pub session_id: String,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    /// Email as entered at checkout, preferred over metadata
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Total in minor units
    pub amount_total: Option<i64>,
    pub payment_status: String,
    pub metadata: HashMap<String, String>,
}

impl CompletedCheckout {
    /// Whether this session was created by this gateway
    pub fn from_recognized_source(&self) -> bool {
        source_recognized(&self.metadata)
    }

    /// Total in major units for CRM reporting
    pub fn amount_major(&self) -> f64 {
        self.amount_total.unwrap_or(0) as f64 / 100.0
    }

    /// Metadata field, empty string when absent
    pub fn meta(&self, key: &str) -> &str {
        self.metadata.get(key).map_or("", String::as_str)
    }
}

fn source_recognized(metadata: &HashMap<String, String>) -> bool {
    metadata.get("source").map(String::as_str) == Some(CHECKOUT_SOURCE)
}

impl StripeGateway {
    /// Verify the webhook signature and parse the event
    pub fn verify_event(&self, payload: &str, signature: &str) -> Result<Event> {
        Webhook::construct_event(payload, signature, self.webhook_secret())
            .map_err(|e| PaymentError::WebhookSignature(e.to_string()))
    }
}

/// Classify a verified event into the shapes the handler acts on
pub fn classify_event(event: &Event) -> Result<CheckoutEvent> {
    match event.type_ {
        EventType::CheckoutSessionCompleted => {
            if let EventObject::CheckoutSession(session) = &event.data.object {
                Ok(CheckoutEvent::Completed(CompletedCheckout {
                    session_id: session.id.to_string(),
                    customer_id: session.customer.as_ref().map(|c| c.id().to_string()),
                    subscription_id: session.subscription.as_ref().map(|s| s.id().to_string()),
                    email: session
                        .customer_details
                        .as_ref()
                        .and_then(|d| d.email.clone()),
                    phone: session
                        .customer_details
                        .as_ref()
                        .and_then(|d| d.phone.clone()),
                    amount_total: session.amount_total,
                    payment_status: format!("{:?}", session.payment_status),
                    metadata: session.metadata.clone().unwrap_or_default(),
                }))
            } else {
                Err(PaymentError::WebhookParse(
                    "invalid checkout session data".into(),
                ))
            }
        }
        _ => Ok(CheckoutEvent::Ignored {
            event_type: format!("{:?}", event.type_),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(source: Option<&str>) -> CompletedCheckout {
        let mut metadata = HashMap::new();
        if let Some(s) = source {
            metadata.insert("source".to_string(), s.to_string());
        }
        CompletedCheckout {
            session_id: "cs_test_1".into(),
            amount_total: Some(12_345),
            metadata,
            ..Default::default()
        }
    }

    #[test]
    fn test_source_marker_recognized() {
        assert!(completed(Some(CHECKOUT_SOURCE)).from_recognized_source());
    }

    #[test]
    fn test_foreign_source_rejected() {
        assert!(!completed(Some("someone-elses-store")).from_recognized_source());
        assert!(!completed(None).from_recognized_source());
    }

    #[test]
    fn test_amount_major() {
        let c = completed(None);
        assert!((c.amount_major() - 123.45).abs() < f64::EPSILON);
    }

    #[test]
    fn test_meta_defaults_to_empty() {
        let c = completed(Some(CHECKOUT_SOURCE));
        assert_eq!(c.meta("source"), CHECKOUT_SOURCE);
        assert_eq!(c.meta("missing"), "");
    }
}
