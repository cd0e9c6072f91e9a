//! Integration credential API

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::common::{ApiQueryParams, DomainRef, EntityListing, GenesysApiResource};
use super::{ApiError, Client};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub credential_type: Option<DomainRef>,
    /// Secret values are never returned
    pub credential_fields: Option<BTreeMap<String, String>>,
}

/// Request body for creating and replacing credentials
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub credential_type: DomainRef,
    pub credential_fields: BTreeMap<String, String>,
}

impl GenesysApiResource for Credential {
    type CreateRequest = CredentialRequest;
    type UpdateRequest = CredentialRequest;

    fn api_path() -> &'static str {
        "/api/v2/integrations/credentials"
    }
}

pub struct CredentialsApi<'a> {
    client: &'a Client,
}

impl<'a> CredentialsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn list_page(
        &self,
        page_number: u32,
        page_size: u32,
    ) -> Result<Vec<Credential>, ApiError> {
        let params = ApiQueryParams::new().page(page_number, page_size);
        let listing: EntityListing<Credential> = self
            .client
            .get_with_params(Credential::api_path(), &params)
            .await?;
        Ok(listing.into_entities())
    }

    pub async fn get(&self, id: &str) -> Result<Credential, ApiError> {
        self.client.get(&Credential::resource_path(id)).await
    }

    pub async fn create(&self, request: &CredentialRequest) -> Result<Credential, ApiError> {
        self.client.post(Credential::api_path(), request).await
    }

    pub async fn update(
        &self,
        id: &str,
        request: &CredentialRequest,
    ) -> Result<Credential, ApiError> {
        self.client
            .put(&Credential::resource_path(id), request)
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&Credential::resource_path(id)).await
    }
}
