//! Commerce Gateway HTTP Server
//!
//! Axum-based gateway gluing the payment provider, identity backend,
//! entitlement backend, CRM, and marketing-tag API behind one REST
//! surface for the pricing frontend.

mod handlers;
mod state;

use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commerce_core::Config;

use crate::handlers::health_check;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    let addr = config.bind_addr.clone();
    let tag_cors = tag_cors_layer(&config.tag_allowed_origins);
    let state = AppState::from_config(config);

    // The checkout-facing routes are called from arbitrary sales pages,
    // so they get permissive CORS. The tag route is allow-listed.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Health
        .route("/health", get(health_check))
        // Payments
        .route("/api/checkout-session", post(handlers::checkout::create_checkout_session))
        .route("/api/payment-intent", post(handlers::checkout::create_payment_intent))
        .route("/api/setup-intent", post(handlers::checkout::create_setup_intent))
        .route("/api/subscription", post(handlers::checkout::create_subscription))
        .route("/api/upsell", post(handlers::checkout::charge_upsell))
        // Identity
        .route("/api/account", post(handlers::accounts::account))
        // Entitlements
        .route("/api/entitlement/grant", post(handlers::entitlements::grant_entitlement))
        .route("/api/entitlement/renew", post(handlers::entitlements::renew_entitlement))
        .route(
            "/api/entitlement/convert-lifetime",
            post(handlers::entitlements::convert_to_lifetime),
        )
        // Webhooks (signature-verified, no CORS concern)
        .route("/webhook/checkout", post(handlers::webhook::checkout_webhook))
        .layer(cors);

    let tags = Router::new()
        .route("/api/tags", post(handlers::tags::apply_tags))
        .layer(tag_cors);

    let app = api
        .merge(tags)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Commerce gateway listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// CORS layer for the tag endpoint: explicit origins when configured,
/// otherwise same permissive posture as the rest of the API.
fn tag_cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| o.parse::<HeaderValue>().ok())
        .collect();

    if parsed.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(parsed)
            .allow_methods([Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    }
}
