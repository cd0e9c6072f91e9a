//! Recording API: media retention policies

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::common::{ApiQueryParams, EntityListing, GenesysApiResource};
use super::{ApiError, Client};

/// A media retention policy; nested blocks are kept as raw JSON
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRetentionPolicy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_policies: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_errors: Option<Value>,
}

impl GenesysApiResource for MediaRetentionPolicy {
    type CreateRequest = MediaRetentionPolicy;
    type UpdateRequest = MediaRetentionPolicy;

    fn api_path() -> &'static str {
        "/api/v2/recording/mediaretentionpolicies"
    }
}

/// Recording API operations
pub struct RecordingApi<'a> {
    client: &'a Client,
}

impl<'a> RecordingApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub fn media_retention_policies(&self) -> MediaRetentionPoliciesApi<'a> {
        MediaRetentionPoliciesApi {
            client: self.client,
        }
    }
}

pub struct MediaRetentionPoliciesApi<'a> {
    client: &'a Client,
}

impl MediaRetentionPoliciesApi<'_> {
    /// One page of policies, optionally filtered by name
    pub async fn list_page(
        &self,
        page_number: u32,
        page_size: u32,
        name: Option<&str>,
    ) -> Result<Vec<MediaRetentionPolicy>, ApiError> {
        let params = ApiQueryParams::new()
            .page(page_number, page_size)
            .add_optional("name", name);
        let listing: EntityListing<MediaRetentionPolicy> = self
            .client
            .get_with_params(MediaRetentionPolicy::api_path(), &params)
            .await?;
        Ok(listing.into_entities())
    }

    pub async fn get(&self, id: &str) -> Result<MediaRetentionPolicy, ApiError> {
        self.client
            .get(&MediaRetentionPolicy::resource_path(id))
            .await
    }

    pub async fn create(
        &self,
        policy: &MediaRetentionPolicy,
    ) -> Result<MediaRetentionPolicy, ApiError> {
        self.client
            .post(MediaRetentionPolicy::api_path(), policy)
            .await
    }

    pub async fn update(
        &self,
        id: &str,
        policy: &MediaRetentionPolicy,
    ) -> Result<MediaRetentionPolicy, ApiError> {
        self.client
            .put(&MediaRetentionPolicy::resource_path(id), policy)
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&MediaRetentionPolicy::resource_path(id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[tokio::test]
    async fn create_omits_absent_fields() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/recording/mediaretentionpolicies")
            .match_body(Matcher::Json(json!({
                "name": "keep calls",
                "order": 0,
                "mediaPolicies": {
                    "callPolicy": { "conditions": { "forQueues": [{ "id": "q1" }] } }
                }
            })))
            .with_body(r#"{"id":"p1","name":"keep calls"}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let created = client
            .recording()
            .media_retention_policies()
            .create(&MediaRetentionPolicy {
                name: Some("keep calls".to_string()),
                order: Some(0),
                media_policies: Some(json!({
                    "callPolicy": { "conditions": { "forQueues": [{ "id": "q1" }] } }
                })),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(created.id.as_deref(), Some("p1"));
        mock.assert_async().await;
    }
}
