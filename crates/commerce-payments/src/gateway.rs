//! Stripe Gateway
//!
//! Holds one `stripe::Client` per provider environment. Handlers select the
//! environment with the request's `mode` field; keys come from process
//! configuration, never from handler bodies.

use commerce_core::{Config, Mode};
use stripe::Client;

/// Stripe client pair plus the checkout webhook secret
pub struct StripeGateway {
    stage: Client,
    live: Client,
    webhook_secret: String,
}

impl StripeGateway {
    pub fn new(stage_key: &str, live_key: &str, webhook_secret: &str) -> Self {
        Self {
            stage: Client::new(stage_key),
            live: Client::new(live_key),
            webhook_secret: webhook_secret.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.stripe_stage_secret_key,
            &config.stripe_live_secret_key,
            &config.checkout_webhook_secret,
        )
    }

    /// The client for a provider environment
    pub(crate) fn client(&self, mode: Mode) -> &Client {
        match mode {
            Mode::Stage => &self.stage,
            Mode::Live => &self.live,
        }
    }

    /// The checkout webhook signing secret
    pub fn webhook_secret(&self) -> &str {
        &self.webhook_secret
    }
}
