//! Embedded Checkout Sessions
//!
//! Creates a provider-hosted embedded checkout for a price id. The session
//! mode follows the price: subscription first, and when the provider
//! rejects a non-recurring price the call is retried in one-time payment
//! mode. Business context for the completion webhook rides on metadata.

use stripe::{
    CheckoutSession, CheckoutSessionBillingAddressCollection, CheckoutSessionMode,
    CheckoutSessionUiMode, CreateCheckoutSession, CreateCheckoutSessionConsentCollection,
    CreateCheckoutSessionConsentCollectionTermsOfService, CreateCheckoutSessionCustomText,
    CreateCheckoutSessionCustomTextTermsOfServiceAcceptance, CreateCheckoutSessionLineItems,
    CustomerId, Metadata,
};

use commerce_core::Mode;

use crate::error::{PaymentError, Result};
use crate::gateway::StripeGateway;

/// Metadata marker identifying sessions created by this gateway; the
/// completion webhook ignores events without it.
pub const CHECKOUT_SOURCE: &str = "pricing-module";

const TOS_MESSAGE: &str =
    "By continuing, you agree to our Terms & Conditions and Privacy Policy.";

/// Business context smuggled through session metadata to the webhook
#[derive(Clone, Debug, Default)]
pub struct CheckoutContext {
    pub product_label: String,
    pub product_type: String,
    pub period: String,
    pub crm_form_guid: String,
    pub marketing_tags: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub user_id: String,
}

impl CheckoutContext {
    pub fn to_metadata(&self) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert("productLabel".into(), self.product_label.clone());
        metadata.insert("productType".into(), self.product_type.clone());
        metadata.insert("period".into(), self.period.clone());
        metadata.insert("crmFormGuid".into(), self.crm_form_guid.clone());
        metadata.insert("marketingTags".into(), self.marketing_tags.clone());
        metadata.insert("firstName".into(), self.first_name.clone());
        metadata.insert("lastName".into(), self.last_name.clone());
        metadata.insert("email".into(), self.email.clone());
        metadata.insert("phone".into(), self.phone.clone());
        metadata.insert("userId".into(), self.user_id.clone());
        metadata.insert("source".into(), CHECKOUT_SOURCE.to_string());
        metadata
    }
}

/// Result of creating an embedded checkout session
#[derive(Clone, Debug)]
pub struct EmbeddedCheckout {
    pub session_id: String,
    pub client_secret: String,
}

/// Compose the post-checkout redirect URL.
///
/// The provider substitutes the `{CHECKOUT_SESSION_ID}` placeholder, so it
/// must survive unencoded; the other parameters are percent-encoded.
pub fn build_return_url(
    success_url: &str,
    customer_id: &str,
    first_name: &str,
    product_label: &str,
    product_type: &str,
) -> Result<String> {
    let mut url = reqwest::Url::parse(success_url)
        .map_err(|e| PaymentError::Config(format!("invalid success url: {e}")))?;
    url.query_pairs_mut()
        .append_pair("cid", customer_id)
        .append_pair("name", first_name)
        .append_pair("product", product_label)
        .append_pair("type", product_type);
    Ok(format!("{url}&session_id={{CHECKOUT_SESSION_ID}}"))
}

fn session_params<'a>(
    customer_id: &CustomerId,
    price_id: &str,
    return_url: &'a str,
    context: &CheckoutContext,
    session_mode: CheckoutSessionMode,
) -> CreateCheckoutSession<'a> {
    let mut params = CreateCheckoutSession::new();
    params.ui_mode = Some(CheckoutSessionUiMode::Embedded);
    params.customer = Some(customer_id.clone());
    params.mode = Some(session_mode);
    params.return_url = Some(return_url);
    params.line_items = Some(vec![CreateCheckoutSessionLineItems {
        price: Some(price_id.to_string()),
        quantity: Some(1),
        ..Default::default()
    }]);
    params.consent_collection = Some(CreateCheckoutSessionConsentCollection {
        terms_of_service: Some(CreateCheckoutSessionConsentCollectionTermsOfService::Required),
        ..Default::default()
    });
    params.custom_text = Some(CreateCheckoutSessionCustomText {
        terms_of_service_acceptance: Some(CreateCheckoutSessionCustomTextTermsOfServiceAcceptance {
            message: TOS_MESSAGE.to_string(),
        }),
        ..Default::default()
    });
    params.billing_address_collection = Some(CheckoutSessionBillingAddressCollection::Auto);
    params.metadata = Some(context.to_metadata());
    params
}

impl StripeGateway {
    /// Create an embedded checkout session for `price_id`.
    ///
    /// Tries subscription mode first; a rejection mentioning the mode or a
    /// non-recurring price triggers one retry in payment mode.
    pub async fn create_embedded_session(
        &self,
        mode: Mode,
        customer_id: &CustomerId,
        price_id: &str,
        return_url: &str,
        context: &CheckoutContext,
    ) -> Result<EmbeddedCheckout> {
        let client = self.client(mode);

        let session = match CheckoutSession::create(
            client,
            session_params(
                customer_id,
                price_id,
                return_url,
                context,
                CheckoutSessionMode::Subscription,
            ),
        )
        .await
        {
            Ok(session) => session,
            Err(e) => {
                let message = e.to_string();
                if message.contains("mode") || message.contains("recurring") {
                    tracing::warn!(price_id, "Subscription mode rejected, retrying as one-time payment");
                    CheckoutSession::create(
                        client,
                        session_params(
                            customer_id,
                            price_id,
                            return_url,
                            context,
                            CheckoutSessionMode::Payment,
                        ),
                    )
                    .await?
                } else {
                    return Err(e.into());
                }
            }
        };

        tracing::info!(session = %session.id, "Checkout session created");

        Ok(EmbeddedCheckout {
            session_id: session.id.to_string(),
            client_secret: session
                .client_secret
                .ok_or(PaymentError::MissingObjectField("client_secret"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_url_keeps_session_placeholder() {
        let url = build_return_url(
            "https://shop.example/thanks",
            "cus_123",
            "Ada Lovelace",
            "Mastery - Monthly",
            "course",
        )
        .unwrap();
        assert!(url.ends_with("&session_id={CHECKOUT_SESSION_ID}"));
        assert!(url.contains("cid=cus_123"));
        // Values are percent-encoded
        assert!(url.contains("name=Ada+Lovelace") || url.contains("name=Ada%20Lovelace"));
    }

    #[test]
    fn test_return_url_rejects_garbage() {
        assert!(build_return_url("not a url", "cus_1", "", "", "").is_err());
    }

    #[test]
    fn test_metadata_carries_source_marker() {
        let context = CheckoutContext {
            product_label: "Mastery".into(),
            ..Default::default()
        };
        let metadata = context.to_metadata();
        assert_eq!(metadata.get("source").map(String::as_str), Some(CHECKOUT_SOURCE));
        assert_eq!(metadata.get("productLabel").map(String::as_str), Some("Mastery"));
    }
}
