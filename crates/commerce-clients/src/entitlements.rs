//! Entitlement Backend Client
//!
//! Subscriber records and time-boxed promotional grants. The backend's GET
//! has fetch-or-create semantics, so fetching a subscriber before granting
//! doubles as initialization.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use commerce_core::GrantWindow;

use crate::error::{ClientError, Result};

/// One entitlement as reported by the backend
#[derive(Clone, Debug, Deserialize)]
pub struct EntitlementInfo {
    /// Current expiry; `None` for grants without an end date
    pub expires_date: Option<DateTime<Utc>>,
}

/// A subscriber record
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Subscriber {
    #[serde(default)]
    pub entitlements: HashMap<String, EntitlementInfo>,
}

impl Subscriber {
    /// Expiry of a specific entitlement, when one is recorded
    pub fn entitlement_expiry(&self, entitlement_id: &str) -> Option<DateTime<Utc>> {
        self.entitlements
            .get(entitlement_id)
            .and_then(|e| e.expires_date)
    }
}

#[derive(Debug, Deserialize)]
struct SubscriberResponse {
    subscriber: Subscriber,
}

/// Client for the entitlement backend
pub struct EntitlementsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl EntitlementsClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn subscriber_url(&self, app_user_id: &str) -> String {
        format!(
            "{}/subscribers/{}",
            self.base_url,
            urlencode(app_user_id)
        )
    }

    /// Fetch (and implicitly create) a subscriber record
    pub async fn subscriber(&self, app_user_id: &str) -> Result<Subscriber> {
        let response = self
            .http
            .get(self.subscriber_url(app_user_id))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(app_user_id, %status, "Subscriber fetch failed");
            return Err(ClientError::NotFound(body));
        }

        Ok(response.json::<SubscriberResponse>().await?.subscriber)
    }

    /// Set the subscriber's email and display name attributes
    pub async fn set_attributes(
        &self,
        app_user_id: &str,
        email: &str,
        display_name: &str,
    ) -> Result<()> {
        let body = json!({
            "attributes": {
                "$email": { "value": email },
                "$displayName": { "value": display_name },
            }
        });

        let response = self
            .http
            .post(format!("{}/attributes", self.subscriber_url(app_user_id)))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Provider(body));
        }

        Ok(())
    }

    /// Grant (or extend) a promotional entitlement for the given window.
    ///
    /// The subscriber must already exist; callers fetch it first.
    pub async fn grant_promotional(
        &self,
        app_user_id: &str,
        entitlement_id: &str,
        window: &GrantWindow,
    ) -> Result<serde_json::Value> {
        let url = format!(
            "{}/entitlements/{}/promotional",
            self.subscriber_url(app_user_id),
            urlencode(entitlement_id)
        );

        tracing::info!(
            app_user_id,
            entitlement_id,
            start = %window.start,
            end = %window.end,
            "Granting promotional entitlement"
        );

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "start_time_ms": window.start_ms(),
                "end_time_ms": window.end_ms(),
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(app_user_id, entitlement_id, %body, "Promotional grant failed");
            return Err(ClientError::Provider(body));
        }

        Ok(response.json().await?)
    }
}

/// Minimal percent-encoding for user ids embedded in a path segment
fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urlencode_path_segment() {
        assert_eq!(urlencode("user-123"), "user-123");
        assert_eq!(urlencode("a@b.com"), "a%40b.com");
        assert_eq!(urlencode("a b/c"), "a%20b%2Fc");
    }

    #[test]
    fn test_subscriber_entitlement_expiry() {
        let body = serde_json::json!({
            "subscriber": {
                "entitlements": {
                    "prod_premium": { "expires_date": "2026-06-01T00:00:00Z" },
                    "prod_live": { "expires_date": null }
                }
            }
        });
        let parsed: SubscriberResponse = serde_json::from_value(body).unwrap();
        let sub = parsed.subscriber;
        assert!(sub.entitlement_expiry("prod_premium").is_some());
        assert!(sub.entitlement_expiry("prod_live").is_none());
        assert!(sub.entitlement_expiry("prod_missing").is_none());
    }

    #[test]
    fn test_subscriber_without_entitlements() {
        let body = serde_json::json!({ "subscriber": {} });
        let parsed: SubscriberResponse = serde_json::from_value(body).unwrap();
        assert!(parsed.subscriber.entitlements.is_empty());
    }
}
