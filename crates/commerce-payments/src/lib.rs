//! # commerce-payments
//!
//! Stripe wrapper for the commerce gateway. One [`StripeGateway`] holds a
//! client per provider environment (stage/live) and exposes the handful of
//! operations the endpoints need:
//!
//! - customer find-or-create with the duplicate tie-break rule
//! - embedded checkout sessions (subscription with one-time fallback)
//! - order-bump and off-session payment intents
//! - setup intents and subscriptions created from them
//! - webhook signature verification and checkout-completion extraction
//!
//! Business context rides on object metadata; the `source` marker decides
//! whether the webhook handler processes an event at all.

mod checkout;
mod customers;
mod error;
mod gateway;
mod intents;
mod webhook;

pub use checkout::{CHECKOUT_SOURCE, CheckoutContext, EmbeddedCheckout, build_return_url};
pub use customers::{CustomerProfile, USER_ID_METADATA_KEY, select_customer};
pub use error::{PaymentError, Result};
pub use gateway::StripeGateway;
pub use intents::BumpOrder;
pub use webhook::{CheckoutEvent, CompletedCheckout, classify_event};
