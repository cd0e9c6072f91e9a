//! Integrations API: integration instances and their current config

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::common::{ApiQueryParams, DomainRef, EntityListing, GenesysApiResource};
use super::{ApiError, Client};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Integration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integration_type: Option<DomainRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intended_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Request body for POST /api/v2/integrations
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntegrationRequest {
    pub integration_type: DomainRef,
}

/// Request body for PATCH /api/v2/integrations/{id}
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIntegrationRequest {
    pub intended_state: String,
}

/// Current configuration of an integration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advanced: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<BTreeMap<String, DomainRef>>,
    /// Must echo the current version on update
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

impl GenesysApiResource for Integration {
    type CreateRequest = CreateIntegrationRequest;
    type UpdateRequest = UpdateIntegrationRequest;

    fn api_path() -> &'static str {
        "/api/v2/integrations"
    }
}

/// Integrations API operations
pub struct IntegrationsApi<'a> {
    client: &'a Client,
}

impl<'a> IntegrationsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Credential operations
    pub fn credentials(&self) -> super::credentials::CredentialsApi<'a> {
        super::credentials::CredentialsApi::new(self.client)
    }

    /// Integration action operations
    pub fn actions(&self) -> super::actions::ActionsApi<'a> {
        super::actions::ActionsApi::new(self.client)
    }

    /// One page of integrations
    pub async fn list_page(
        &self,
        page_number: u32,
        page_size: u32,
    ) -> Result<Vec<Integration>, ApiError> {
        let params = ApiQueryParams::new().page(page_number, page_size);
        let listing: EntityListing<Integration> = self
            .client
            .get_with_params(Integration::api_path(), &params)
            .await?;
        Ok(listing.into_entities())
    }

    pub async fn get(&self, id: &str) -> Result<Integration, ApiError> {
        self.client.get(&Integration::resource_path(id)).await
    }

    pub async fn create(
        &self,
        request: &CreateIntegrationRequest,
    ) -> Result<Integration, ApiError> {
        self.client.post(Integration::api_path(), request).await
    }

    /// Changes the intended state
    pub async fn update(
        &self,
        id: &str,
        request: &UpdateIntegrationRequest,
    ) -> Result<Integration, ApiError> {
        self.client
            .patch(&Integration::resource_path(id), request)
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&Integration::resource_path(id)).await
    }

    pub async fn get_config(&self, id: &str) -> Result<IntegrationConfig, ApiError> {
        self.client
            .get(&format!("{}/config/current", Integration::resource_path(id)))
            .await
    }

    pub async fn update_config(
        &self,
        id: &str,
        config: &IntegrationConfig,
    ) -> Result<IntegrationConfig, ApiError> {
        self.client
            .put(
                &format!("{}/config/current", Integration::resource_path(id)),
                config,
            )
            .await
    }
}
