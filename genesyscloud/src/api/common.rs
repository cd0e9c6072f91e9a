//! Common types and utilities for the Genesys Cloud API

use serde::{Deserialize, Serialize};

/// One page of a listing endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityListing<T> {
    pub entities: Option<Vec<T>>,
    pub page_size: Option<u32>,
    pub page_number: Option<u32>,
    pub total: Option<u64>,
    pub page_count: Option<u32>,
}

impl<T> EntityListing<T> {
    pub fn into_entities(self) -> Vec<T> {
        self.entities.unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    pub message: Option<String>,
    pub code: Option<String>,
    pub status: Option<u16>,
    pub context_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("API error details: code={code:?}, context_id={context_id:?}")]
pub struct ApiErrorDetails {
    pub code: Option<String>,
    pub context_id: Option<String>,
}

/// Reference to another object by id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl DomainRef {
    pub fn id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: None,
        }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }
}

pub trait GenesysApiResource: Sized {
    type CreateRequest: Serialize;
    type UpdateRequest: Serialize;

    fn api_path() -> &'static str;
    fn resource_path(id: &str) -> String {
        format!("{}/{}", Self::api_path(), id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn add_optional<K: Into<String>, V: ToString>(mut self, key: K, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.params.push((key.into(), v.to_string()));
        }
        self
    }

    /// Adds `pageNumber` and `pageSize`
    pub fn page(self, page_number: u32, page_size: u32) -> Self {
        self.add("pageNumber", page_number).add("pageSize", page_size)
    }

    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            String::new()
        } else {
            format!(
                "?{}",
                self.params
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&")
            )
        }
    }
}
