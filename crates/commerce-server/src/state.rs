//! Application State

use std::sync::Arc;

use commerce_clients::{CrmClient, EntitlementsClient, IdentityClient, MarketingClient};
use commerce_core::Config;
use commerce_payments::StripeGateway;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    /// Stripe clients for both provider environments
    pub stripe: Arc<StripeGateway>,

    /// GraphQL identity backend
    pub identity: Arc<IdentityClient>,

    /// Entitlement backend (subscribers, promotional grants)
    pub entitlements: Arc<EntitlementsClient>,

    /// CRM form submissions
    pub crm: Arc<CrmClient>,

    /// Marketing-tag backend
    pub marketing: Arc<MarketingClient>,
}

impl AppState {
    /// Build all clients from resolved configuration, sharing one
    /// `reqwest::Client` connection pool.
    pub fn from_config(config: Config) -> Self {
        let http = reqwest::Client::new();

        let stripe = Arc::new(StripeGateway::from_config(&config));
        let identity = Arc::new(IdentityClient::new(
            http.clone(),
            config.identity_stage_url.clone(),
            config.identity_live_url.clone(),
            config.identity_jwt_public_key.clone(),
        ));
        let entitlements = Arc::new(EntitlementsClient::new(
            http.clone(),
            config.entitlement_api_base.clone(),
            config.entitlement_api_key.clone(),
        ));
        let crm = Arc::new(CrmClient::new(
            http.clone(),
            config.crm_api_base.clone(),
            config.crm_portal_id.clone(),
        ));
        let marketing = Arc::new(MarketingClient::new(
            http,
            config.marketing_api_base.clone(),
            config.marketing_api_key.clone(),
        ));

        Self {
            config: Arc::new(config),
            stripe,
            identity,
            entitlements,
            crm,
            marketing,
        }
    }
}
