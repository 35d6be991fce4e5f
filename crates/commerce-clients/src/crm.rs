//! CRM Form Client
//!
//! Submits a purchase record to a CRM form after checkout completes. The
//! form endpoint is keyed by portal id and a per-campaign form GUID carried
//! in checkout metadata.

use serde_json::json;

use crate::error::{ClientError, Result};

/// Everything the CRM form wants to know about one purchase
#[derive(Clone, Debug, Default)]
pub struct PurchaseRecord {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub user_id: String,
    pub product_label: String,
    pub product_type: String,
    pub period: String,
    /// Total in major currency units
    pub amount: f64,
    pub checkout_session_id: String,
    pub customer_id: String,
    pub subscription_id: String,
}

/// Client for the CRM form-submission API
pub struct CrmClient {
    http: reqwest::Client,
    base_url: String,
    portal_id: String,
}

impl CrmClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, portal_id: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            portal_id: portal_id.into(),
        }
    }

    /// Submit the purchase form identified by `form_guid`
    pub async fn submit_purchase_form(
        &self,
        form_guid: &str,
        record: &PurchaseRecord,
    ) -> Result<serde_json::Value> {
        let amount = format!("{:.2}", record.amount);
        let details = json!({
            "checkoutSessionId": record.checkout_session_id,
            "customerId": record.customer_id,
            "subscriptionId": record.subscription_id,
            "userId": record.user_id,
            "totalAmount": amount,
            "productName": record.product_label,
            "productType": record.product_type,
            "period": record.period,
        });

        let field = |name: &str, value: &str| json!({ "name": name, "value": value });
        let body = json!({
            "fields": [
                field("0-1/firstname", &record.first_name),
                field("0-1/lastname", &record.last_name),
                field("0-1/email", &record.email),
                field("0-1/phone", &record.phone),
                field("0-1/purchase_amount", &amount),
                field("0-1/product_name", &record.product_label),
                field("0-1/checkout_session_id", &record.checkout_session_id),
                field("0-1/purchase_details", &details.to_string()),
            ]
        });

        let url = format!(
            "{}/submissions/v3/integration/submit/{}/{}",
            self.base_url, self.portal_id, form_guid
        );

        let response = self.http.post(url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(form_guid, %status, "CRM form submission failed");
            return Err(ClientError::Provider(format!(
                "form submission failed: {status}: {body}"
            )));
        }

        Ok(response.json().await?)
    }
}
