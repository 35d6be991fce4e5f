//! # commerce-core
//!
//! Shared building blocks for the commerce gateway: the product catalog
//! (SKU to entitlement mapping), the grant-window policy, the error
//! taxonomy, and process configuration.
//!
//! Everything in this crate is pure and synchronous; the network-facing
//! crates (`commerce-clients`, `commerce-payments`, `commerce-server`)
//! build on top of it.

mod catalog;
mod config;
mod error;
mod window;

pub use catalog::{BillingPeriod, Product, PurchaseKind, lookup_product, multi_pay_skus};
pub use config::{Config, Mode};
pub use error::{CoreError, Result};
pub use window::{
    ANNUAL_GRANT_DAYS, GrantWindow, LIFETIME_GRANT_DAYS, MONTHLY_GRANT_DAYS, grant_window,
    lifetime_window, renewal_start, renewal_window,
};
