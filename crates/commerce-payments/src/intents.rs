//! Payment Intents, Setup Intents, and Subscriptions
//!
//! Three payment shapes besides hosted checkout:
//!
//! - the order-bump flow: one payment intent for a base product plus an
//!   optional add-on, storing the card for later off-session use
//! - the upsell flow: charge a returning customer's stored payment method
//!   without them present
//! - the setup-intent flow: collect a payment method first, then start a
//!   subscription with it

use stripe::{
    CreatePaymentIntent, CreatePaymentIntentAutomaticPaymentMethods, CreateSetupIntent,
    CreateSetupIntentAutomaticPaymentMethods, CreateSubscription, CreateSubscriptionItems,
    Currency, Customer, CustomerId, ListPaymentMethods, Metadata, PaymentIntent,
    PaymentIntentOffSession, PaymentIntentSetupFutureUsage, PaymentMethod, PaymentMethodId,
    PaymentMethodTypeFilter, SetupIntent, SetupIntentId, Subscription,
};

use commerce_core::Mode;

use crate::checkout::CHECKOUT_SOURCE;
use crate::error::{PaymentError, Result};
use crate::gateway::StripeGateway;

/// An order-bump purchase: base product plus optional add-on
#[derive(Clone, Debug, Default)]
pub struct BumpOrder {
    /// Base price in minor units
    pub base_amount: i64,
    /// Add-on price in minor units
    pub bump_amount: i64,
    pub with_bump: bool,
    pub base_label: String,
    pub bump_label: String,
    pub base_price_id: String,
    pub bump_price_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl BumpOrder {
    /// Total charge in minor units
    pub fn total(&self) -> i64 {
        if self.with_bump {
            self.base_amount + self.bump_amount
        } else {
            self.base_amount
        }
    }

    pub fn description(&self) -> String {
        if self.with_bump {
            format!("{} + {}", self.base_label, self.bump_label)
        } else {
            self.base_label.clone()
        }
    }

    fn metadata(&self) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert("withBump".into(), self.with_bump.to_string());
        metadata.insert("basePrice".into(), self.base_amount.to_string());
        metadata.insert(
            "bumpPrice".into(),
            if self.with_bump { self.bump_amount } else { 0 }.to_string(),
        );
        metadata.insert("baseLabel".into(), self.base_label.clone());
        metadata.insert(
            "bumpLabel".into(),
            if self.with_bump {
                self.bump_label.clone()
            } else {
                String::new()
            },
        );
        metadata.insert("basePriceId".into(), self.base_price_id.clone());
        metadata.insert(
            "bumpPriceId".into(),
            if self.with_bump {
                self.bump_price_id.clone()
            } else {
                String::new()
            },
        );
        metadata.insert("email".into(), self.email.clone());
        metadata.insert("firstName".into(), self.first_name.clone());
        metadata.insert("lastName".into(), self.last_name.clone());
        metadata.insert("source".into(), CHECKOUT_SOURCE.to_string());
        metadata
    }
}

impl StripeGateway {
    /// Create the order-bump payment intent, storing the card for
    /// off-session reuse by the upsell flow.
    pub async fn create_bump_intent(
        &self,
        mode: Mode,
        customer_id: &CustomerId,
        order: &BumpOrder,
    ) -> Result<PaymentIntent> {
        let client = self.client(mode);
        let description = order.description();

        let mut params = CreatePaymentIntent::new(order.total(), Currency::USD);
        params.customer = Some(customer_id.clone());
        params.description = Some(&description);
        params.setup_future_usage = Some(PaymentIntentSetupFutureUsage::OffSession);
        params.automatic_payment_methods = Some(CreatePaymentIntentAutomaticPaymentMethods {
            enabled: true,
            ..Default::default()
        });
        params.metadata = Some(order.metadata());

        let intent = PaymentIntent::create(client, params).await?;
        tracing::info!(intent = %intent.id, amount = order.total(), "Payment intent created");
        Ok(intent)
    }

    /// Charge a returning customer off-session using their stored payment
    /// method. `NoPaymentMethod` when nothing is on file.
    pub async fn charge_off_session(
        &self,
        mode: Mode,
        customer_id: &CustomerId,
        amount: i64,
        description: &str,
    ) -> Result<PaymentIntent> {
        let client = self.client(mode);

        let payment_method = self.stored_payment_method(mode, customer_id).await?;

        let mut params = CreatePaymentIntent::new(amount, Currency::USD);
        params.customer = Some(customer_id.clone());
        params.payment_method = Some(payment_method);
        params.confirm = Some(true);
        params.off_session = Some(PaymentIntentOffSession::Exists(true));
        params.description = Some(description);

        let intent = PaymentIntent::create(client, params).await?;
        tracing::info!(intent = %intent.id, amount, "Off-session charge confirmed");
        Ok(intent)
    }

    /// The customer's default payment method, else their most recent card
    async fn stored_payment_method(
        &self,
        mode: Mode,
        customer_id: &CustomerId,
    ) -> Result<PaymentMethodId> {
        let client = self.client(mode);

        let customer = Customer::retrieve(client, customer_id, &[]).await?;
        if let Some(pm) = customer
            .invoice_settings
            .as_ref()
            .and_then(|s| s.default_payment_method.as_ref())
        {
            return Ok(pm.id());
        }

        let mut list = ListPaymentMethods::new();
        list.customer = Some(customer_id.clone());
        list.type_ = Some(PaymentMethodTypeFilter::Card);
        let methods = PaymentMethod::list(client, &list).await?;

        methods
            .data
            .first()
            .map(|pm| pm.id.clone())
            .ok_or_else(|| PaymentError::NoPaymentMethod(customer_id.to_string()))
    }

    /// Create a setup intent to collect a payment method without charging
    pub async fn create_setup_intent(
        &self,
        mode: Mode,
        customer_id: &CustomerId,
        metadata: Metadata,
    ) -> Result<SetupIntent> {
        let client = self.client(mode);

        let mut params = CreateSetupIntent::new();
        params.customer = Some(customer_id.clone());
        params.automatic_payment_methods = Some(CreateSetupIntentAutomaticPaymentMethods {
            enabled: true,
            ..Default::default()
        });
        params.metadata = Some(metadata);

        let intent = SetupIntent::create(client, params).await?;
        tracing::info!(intent = %intent.id, "Setup intent created");
        Ok(intent)
    }

    /// Start a subscription using the payment method collected by a
    /// completed setup intent.
    pub async fn create_subscription_from_setup(
        &self,
        mode: Mode,
        customer_id: &CustomerId,
        setup_intent_id: &SetupIntentId,
        price_id: &str,
        metadata: Metadata,
    ) -> Result<Subscription> {
        let client = self.client(mode);

        let setup_intent = SetupIntent::retrieve(client, setup_intent_id, &[]).await?;
        let payment_method = setup_intent
            .payment_method
            .as_ref()
            .map(stripe::Expandable::id)
            .ok_or_else(|| PaymentError::NoPaymentMethod(customer_id.to_string()))?;

        let mut params = CreateSubscription::new(customer_id.clone());
        params.items = Some(vec![CreateSubscriptionItems {
            price: Some(price_id.to_string()),
            ..Default::default()
        }]);
        params.default_payment_method = Some(payment_method.as_str());
        params.metadata = Some(metadata);

        let subscription = Subscription::create(client, params).await?;
        tracing::info!(subscription = %subscription.id, "Subscription created");
        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(with_bump: bool) -> BumpOrder {
        BumpOrder {
            base_amount: 2700,
            bump_amount: 4900,
            with_bump,
            base_label: "Main Product".into(),
            bump_label: "Order Bump".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_total_with_and_without_bump() {
        assert_eq!(order(false).total(), 2700);
        assert_eq!(order(true).total(), 7600);
    }

    #[test]
    fn test_description() {
        assert_eq!(order(false).description(), "Main Product");
        assert_eq!(order(true).description(), "Main Product + Order Bump");
    }

    #[test]
    fn test_metadata_zeroes_bump_fields_when_absent() {
        let metadata = order(false).metadata();
        assert_eq!(metadata.get("bumpPrice").map(String::as_str), Some("0"));
        assert_eq!(metadata.get("bumpLabel").map(String::as_str), Some(""));
        assert_eq!(
            metadata.get("source").map(String::as_str),
            Some(CHECKOUT_SOURCE)
        );
    }
}
