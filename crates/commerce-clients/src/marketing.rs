//! Marketing-Tag Client
//!
//! Find-or-create contact and tag records, then attach tags to the contact.
//! Tag application is deliberately partial-failure tolerant: one bad tag
//! never aborts the batch, each outcome is reported separately.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{ClientError, Result};

#[derive(Debug, Deserialize)]
struct ContactList {
    #[serde(default)]
    contacts: Vec<RecordId>,
}

#[derive(Debug, Deserialize)]
struct ContactCreated {
    contact: Option<RecordId>,
}

#[derive(Debug, Deserialize)]
struct TagList {
    #[serde(default)]
    tags: Vec<RecordId>,
}

#[derive(Debug, Deserialize)]
struct TagCreated {
    tag: Option<RecordId>,
}

#[derive(Debug, Deserialize)]
struct RecordId {
    id: String,
}

/// Result of applying one tag
#[derive(Clone, Debug, Serialize)]
pub struct TagOutcome {
    pub tag: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Client for the marketing-tag API
pub struct MarketingClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl MarketingClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Find a contact by email, creating it when absent
    pub async fn find_or_create_contact(&self, email: &str) -> Result<String> {
        let response = self
            .http
            .get(format!("{}/api/3/contacts", self.base_url))
            .query(&[("email", email)])
            .header("Api-Token", &self.api_key)
            .send()
            .await?;
        let found = response.json::<ContactList>().await.unwrap_or(ContactList { contacts: vec![] });

        if let Some(contact) = found.contacts.into_iter().next() {
            return Ok(contact.id);
        }

        let response = self
            .http
            .post(format!("{}/api/3/contacts", self.base_url))
            .header("Api-Token", &self.api_key)
            .json(&json!({ "contact": { "email": email } }))
            .send()
            .await?;

        let status = response.status();
        let created = response.json::<ContactCreated>().await.ok().and_then(|c| c.contact);
        match created {
            Some(contact) if status.is_success() => Ok(contact.id),
            _ => Err(ClientError::Provider(format!(
                "failed to create contact: {status}"
            ))),
        }
    }

    /// Find a tag by name, creating it when absent
    pub async fn find_or_create_tag(&self, name: &str) -> Result<String> {
        let response = self
            .http
            .get(format!("{}/api/3/tags", self.base_url))
            .query(&[("search", name)])
            .header("Api-Token", &self.api_key)
            .send()
            .await?;
        let found = response.json::<TagList>().await.unwrap_or(TagList { tags: vec![] });

        if let Some(tag) = found.tags.into_iter().next() {
            return Ok(tag.id);
        }

        let response = self
            .http
            .post(format!("{}/api/3/tags", self.base_url))
            .header("Api-Token", &self.api_key)
            .json(&json!({
                "tag": { "tag": name, "tagType": "contact", "description": "Created via API" }
            }))
            .send()
            .await?;

        let status = response.status();
        let created = response.json::<TagCreated>().await.ok().and_then(|t| t.tag);
        match created {
            Some(tag) if status.is_success() => Ok(tag.id),
            _ => Err(ClientError::Provider(format!(
                "failed to create tag: {status}"
            ))),
        }
    }

    /// Attach an existing tag to an existing contact
    pub async fn attach_tag(&self, contact_id: &str, tag_id: &str) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/api/3/contactTags", self.base_url))
            .header("Api-Token", &self.api_key)
            .json(&json!({ "contactTag": { "contact": contact_id, "tag": tag_id } }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Provider(format!(
                "failed to attach tag: {status}: {body}"
            )));
        }

        Ok(())
    }

    /// Apply a set of named tags to the contact for `email`.
    ///
    /// Contact resolution failure fails the whole call; individual tag
    /// failures are recorded per tag and the rest of the batch continues.
    pub async fn apply_tags(&self, email: &str, tags: &[String]) -> Result<Vec<TagOutcome>> {
        let contact_id = self.find_or_create_contact(email).await?;

        let mut outcomes = Vec::with_capacity(tags.len());
        for name in tags {
            let outcome = match self.find_or_create_tag(name).await {
                Ok(tag_id) => match self.attach_tag(&contact_id, &tag_id).await {
                    Ok(()) => TagOutcome {
                        tag: name.clone(),
                        success: true,
                        message: None,
                    },
                    Err(e) => TagOutcome {
                        tag: name.clone(),
                        success: false,
                        message: Some(e.to_string()),
                    },
                },
                Err(e) => TagOutcome {
                    tag: name.clone(),
                    success: false,
                    message: Some(e.to_string()),
                },
            };
            if !outcome.success {
                tracing::warn!(email, tag = %name, "Tag application failed");
            }
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }
}

/// Split the comma-separated tag list carried in checkout metadata
pub fn split_tag_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_tag_list() {
        assert_eq!(
            split_tag_list("buyer, launch-2026 ,vip"),
            vec!["buyer", "launch-2026", "vip"]
        );
        assert!(split_tag_list("  , ,").is_empty());
        assert!(split_tag_list("").is_empty());
    }
}
