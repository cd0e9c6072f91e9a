//! Integration action API

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::common::{ApiQueryParams, EntityListing, GenesysApiResource};
use super::{ApiError, Client};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integration_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<ActionConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract: Option<ActionContract>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_url_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation_map: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation_map_defaults: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_template: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionContract {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<ContractInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<ContractOutput>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractInput {
    pub input_schema: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractOutput {
    pub success_schema: Option<Value>,
}

/// Request body for POST /api/v2/integrations/actions
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActionRequest {
    pub name: String,
    pub category: String,
    pub integration_id: String,
    pub secure: bool,
    pub config: ActionConfig,
    pub contract: ActionContract,
}

/// Request body for PATCH /api/v2/integrations/actions/{id}
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateActionRequest {
    pub name: String,
    pub category: String,
    pub version: i64,
    pub config: ActionConfig,
}

impl GenesysApiResource for Action {
    type CreateRequest = CreateActionRequest;
    type UpdateRequest = UpdateActionRequest;

    fn api_path() -> &'static str {
        "/api/v2/integrations/actions"
    }
}

pub struct ActionsApi<'a> {
    client: &'a Client,
}

impl<'a> ActionsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// One page of actions, optionally filtered by exact name
    pub async fn list_page(
        &self,
        page_number: u32,
        page_size: u32,
        name: Option<&str>,
    ) -> Result<Vec<Action>, ApiError> {
        let params = ApiQueryParams::new()
            .page(page_number, page_size)
            .add_optional("name", name);
        let listing: EntityListing<Action> = self
            .client
            .get_with_params(Action::api_path(), &params)
            .await?;
        Ok(listing.into_entities())
    }

    /// Fetches the action with its contract and config expanded
    pub async fn get(&self, id: &str) -> Result<Action, ApiError> {
        let params = ApiQueryParams::new()
            .add("expand", "contract")
            .add("includeConfig", true);
        self.client
            .get_with_params(&Action::resource_path(id), &params)
            .await
    }

    pub async fn create(&self, request: &CreateActionRequest) -> Result<Action, ApiError> {
        self.client.post(Action::api_path(), request).await
    }

    pub async fn update(
        &self,
        id: &str,
        request: &UpdateActionRequest,
    ) -> Result<Action, ApiError> {
        self.client
            .patch(&Action::resource_path(id), request)
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&Action::resource_path(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn get_expands_contract_and_config() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v2/integrations/actions/a1")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("expand".into(), "contract".into()),
                Matcher::UrlEncoded("includeConfig".into(), "true".into()),
            ]))
            .with_body(
                r#"{
                    "id": "a1",
                    "name": "Lookup",
                    "category": "Data",
                    "integrationId": "i1",
                    "secure": false,
                    "version": 2,
                    "config": {
                        "request": { "requestUrlTemplate": "https://x", "requestType": "GET" },
                        "response": { "translationMap": { "id": "$.id" } },
                        "timeoutSeconds": 10
                    },
                    "contract": {
                        "input": { "inputSchema": { "type": "object" } },
                        "output": { "successSchema": { "type": "object" } }
                    }
                }"#,
            )
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let action = client.integrations().actions().get("a1").await.unwrap();

        let config = action.config.unwrap();
        assert_eq!(config.timeout_seconds, Some(10));
        assert_eq!(
            config.request.unwrap().request_type.as_deref(),
            Some("GET")
        );
        assert!(action.contract.unwrap().input.unwrap().input_schema.is_some());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn list_page_filters_by_name() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v2/integrations/actions")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("pageNumber".into(), "1".into()),
                Matcher::UrlEncoded("name".into(), "Get Weather".into()),
            ]))
            .with_body(r#"{"entities":[{"id":"a1","name":"Get Weather"}]}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let page = client
            .integrations()
            .actions()
            .list_page(1, 100, Some("Get Weather"))
            .await
            .unwrap();

        assert_eq!(page[0].id.as_deref(), Some("a1"));
        mock.assert_async().await;
    }
}
