//! Customer Lookup and Creation
//!
//! Customers are de-duplicated by email before creation, best-effort. When
//! several records share an email the tie-break prefers the one already
//! tagged with our platform user id; the provider's ordering of the rest is
//! undocumented, so "first returned" is a fallback, not a guarantee.

use stripe::{CreateCustomer, Customer, ListCustomers, Metadata, UpdateCustomer};

use commerce_core::Mode;

use crate::error::{PaymentError, Result};
use crate::gateway::StripeGateway;

/// Metadata key linking a Stripe customer to our platform account
pub const USER_ID_METADATA_KEY: &str = "platform_user_id";

/// Customer details collected at checkout
#[derive(Clone, Debug, Default)]
pub struct CustomerProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub user_id: Option<String>,
}

impl CustomerProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

fn has_user_tag(customer: &Customer) -> bool {
    customer
        .metadata
        .as_ref()
        .and_then(|m| m.get(USER_ID_METADATA_KEY))
        .is_some_and(|v| !v.is_empty())
}

/// Index of the record to keep: first tagged candidate, else the first one
fn pick_index(tagged: &[bool]) -> Option<usize> {
    if tagged.is_empty() {
        None
    } else {
        Some(tagged.iter().position(|t| *t).unwrap_or(0))
    }
}

/// Choose one customer among several sharing an email.
///
/// Prefers the record carrying [`USER_ID_METADATA_KEY`]; otherwise the
/// first candidate as returned by the provider.
pub fn select_customer(candidates: &[Customer]) -> Option<&Customer> {
    let tagged: Vec<bool> = candidates.iter().map(has_user_tag).collect();
    pick_index(&tagged).map(|i| &candidates[i])
}

impl StripeGateway {
    /// Reuse the customer for `profile.email`, creating one when absent.
    ///
    /// An existing single match gets its name and phone refreshed; multiple
    /// matches go through [`select_customer`]. The platform user id is
    /// stamped onto the record when known and missing.
    pub async fn find_or_create_customer(
        &self,
        mode: Mode,
        profile: &CustomerProfile,
    ) -> Result<Customer> {
        let client = self.client(mode);

        let mut list = ListCustomers::new();
        list.email = Some(&profile.email);
        list.limit = Some(10);
        let existing = Customer::list(client, &list).await?.data;

        let full_name = profile.full_name();
        let customer = if existing.is_empty() {
            let mut metadata = Metadata::new();
            if let Some(user_id) = &profile.user_id {
                metadata.insert(USER_ID_METADATA_KEY.to_string(), user_id.clone());
            }
            let mut create = CreateCustomer::new();
            create.name = Some(&full_name);
            create.email = Some(&profile.email);
            create.phone = profile.phone.as_deref();
            create.metadata = Some(metadata);

            let created = Customer::create(client, create).await?;
            tracing::info!(customer = %created.id, "Created new customer");
            created
        } else if existing.len() == 1 {
            let found = &existing[0];
            let mut update = UpdateCustomer::new();
            update.name = Some(&full_name);
            // Refresh phone in case it changed, keep the old one otherwise
            update.phone = profile.phone.as_deref().or(found.phone.as_deref());

            let updated = Customer::update(client, &found.id, update).await?;
            tracing::info!(customer = %updated.id, "Using existing customer");
            updated
        } else {
            let chosen = select_customer(&existing).cloned().ok_or_else(|| {
                PaymentError::Stripe("customer lookup returned no records".into())
            })?;
            tracing::info!(
                customer = %chosen.id,
                matches = existing.len(),
                "Multiple customers matched email, applied tie-break"
            );
            chosen
        };

        if let Some(user_id) = &profile.user_id {
            if !has_user_tag(&customer) {
                let mut metadata = customer.metadata.clone().unwrap_or_default();
                metadata.insert(USER_ID_METADATA_KEY.to_string(), user_id.clone());
                let mut update = UpdateCustomer::new();
                update.metadata = Some(metadata);
                let stamped = Customer::update(client, &customer.id, update).await?;
                tracing::info!(customer = %stamped.id, "Stamped platform user id onto customer");
                return Ok(stamped);
            }
        }

        Ok(customer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_prefers_tagged_candidate() {
        // Two records by email, second carries the platform tag
        assert_eq!(pick_index(&[false, true]), Some(1));
        assert_eq!(pick_index(&[false, true, true]), Some(1));
    }

    #[test]
    fn test_pick_falls_back_to_first() {
        assert_eq!(pick_index(&[false, false]), Some(0));
    }

    #[test]
    fn test_pick_empty() {
        assert_eq!(pick_index(&[]), None);
    }

    #[test]
    fn test_full_name_trims() {
        let profile = CustomerProfile {
            first_name: "Ada".into(),
            last_name: String::new(),
            ..Default::default()
        };
        assert_eq!(profile.full_name(), "Ada");
    }
}
