//! Process Configuration
//!
//! Every secret and base URL the gateway touches is resolved once at
//! startup. Handlers never read the environment and never carry literal
//! keys; they pick the stage or live half of this struct based on the
//! request's `mode` field.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Which provider environment a request targets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Stage,
    Live,
}

impl Mode {
    /// Parse the `mode` request field; anything but `"live"` is stage.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("live") {
            Mode::Live
        } else {
            Mode::Stage
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Stage => "stage",
            Mode::Live => "live",
        }
    }
}

/// Gateway configuration, resolved from the environment at startup
#[derive(Clone, Debug)]
pub struct Config {
    /// Stripe secret key for the stage environment
    pub stripe_stage_secret_key: String,
    /// Stripe secret key for the live environment
    pub stripe_live_secret_key: String,
    /// Signing secret for the checkout webhook endpoint
    pub checkout_webhook_secret: String,

    /// Entitlement backend API key
    pub entitlement_api_key: String,
    /// Entitlement backend base URL
    pub entitlement_api_base: String,

    /// Marketing-tag backend API key
    pub marketing_api_key: String,
    /// Marketing-tag backend base URL
    pub marketing_api_base: String,

    /// CRM portal id used in form submission URLs
    pub crm_portal_id: String,
    /// CRM form-submission base URL
    pub crm_api_base: String,

    /// Identity GraphQL endpoint, stage environment
    pub identity_stage_url: String,
    /// Identity GraphQL endpoint, live environment
    pub identity_live_url: String,
    /// PEM public key for verifying identity tokens; unverified decode
    /// is used when absent
    pub identity_jwt_public_key: Option<String>,

    /// Origins allowed to call the tag endpoint
    pub tag_allowed_origins: Vec<String>,

    /// Server bind address
    pub bind_addr: String,
}

fn required(name: &'static str) -> Result<String> {
    std::env::var(name).map_err(|_| CoreError::Config(format!("{name} not set")))
}

fn optional(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            stripe_stage_secret_key: required("STRIPE_STAGE_SECRET_KEY")?,
            stripe_live_secret_key: required("STRIPE_LIVE_SECRET_KEY")?,
            checkout_webhook_secret: required("STRIPE_CHECKOUT_WEBHOOK_SECRET")?,
            entitlement_api_key: required("ENTITLEMENT_API_KEY")?,
            entitlement_api_base: optional(
                "ENTITLEMENT_API_BASE",
                "https://api.revenuecat.com/v1",
            ),
            marketing_api_key: required("MARKETING_API_KEY")?,
            marketing_api_base: required("MARKETING_API_BASE")?,
            crm_portal_id: required("CRM_PORTAL_ID")?,
            crm_api_base: optional("CRM_API_BASE", "https://api.hsforms.com"),
            identity_stage_url: required("IDENTITY_STAGE_URL")?,
            identity_live_url: required("IDENTITY_LIVE_URL")?,
            identity_jwt_public_key: std::env::var("IDENTITY_JWT_PUBLIC_KEY").ok(),
            tag_allowed_origins: std::env::var("TAG_ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            bind_addr: optional("BIND_ADDR", "0.0.0.0:3000"),
        })
    }

    /// The identity endpoint for a mode
    pub fn identity_url(&self, mode: Mode) -> &str {
        match mode {
            Mode::Stage => &self.identity_stage_url,
            Mode::Live => &self.identity_live_url,
        }
    }

    /// The Stripe secret key for a mode
    pub fn stripe_secret_key(&self, mode: Mode) -> &str {
        match mode {
            Mode::Stage => &self.stripe_stage_secret_key,
            Mode::Live => &self.stripe_live_secret_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!(Mode::parse("live"), Mode::Live);
        assert_eq!(Mode::parse("LIVE"), Mode::Live);
        assert_eq!(Mode::parse("stage"), Mode::Stage);
        assert_eq!(Mode::parse("anything"), Mode::Stage);
    }
}
