//! # commerce-clients
//!
//! HTTP clients for the third-party backends the gateway orchestrates:
//!
//! - [`IdentityClient`] — GraphQL sign-up/sign-in plus token-subject decoding
//! - [`EntitlementsClient`] — subscriber records and promotional grants
//! - [`CrmClient`] — purchase form submissions
//! - [`MarketingClient`] — find-or-create contact/tag plumbing
//!
//! All clients share one `reqwest::Client` owned by the caller, carry their
//! keys from [`commerce_core::Config`], and surface provider failures as
//! [`ClientError::Provider`] with the raw message preserved.

mod crm;
mod entitlements;
mod error;
mod identity;
mod marketing;

pub use crm::{CrmClient, PurchaseRecord};
pub use entitlements::{EntitlementInfo, EntitlementsClient, Subscriber};
pub use error::{ClientError, Result};
pub use identity::{AuthSession, EnsuredAccount, IdentityClient, generate_password};
pub use marketing::{MarketingClient, TagOutcome, split_tag_list};
