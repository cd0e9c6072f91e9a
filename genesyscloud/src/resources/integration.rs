//! genesyscloud_integration
//!
//! An integration is created from its type, then configured through the
//! current-config endpoint, then moved to its intended state.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tfplug::defaults::StaticDefault;
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{Diagnostic, Dynamic};
use tfplug::validator::StringOneOfValidator;
use tfplug::{Context, Resource, ResourceData};

use super::{block, block_string, block_string_map, json_string, missing_id, parse_json, prepare};
use crate::api::common::DomainRef;
use crate::api::integrations::{
    CreateIntegrationRequest, Integration, IntegrationConfig, IntegrationsApi,
    UpdateIntegrationRequest,
};
use crate::api::paging::{collect_all, enumerate_all, DEFAULT_PAGE_SIZE};
use crate::api::Client;
use crate::consistency_checker::ConsistencyCheck;
use crate::provider_data::GenesysCloudProviderData;
use crate::registrar::{Registrar, ResourceRegistration};
use crate::resource_exporter::{RefAttrSettings, ResourceExporter, ResourceIdMetaMap, ResourceMeta};
use crate::util::retries::{classify_read_error, confirm_deleted, with_retries_for_read};

pub const RESOURCE_TYPE: &str = "genesyscloud_integration";
const KIND: &str = "integration";

pub const INTENDED_STATES: &[&str] = &["ENABLED", "DISABLED", "DELETED"];

pub fn register(registrar: &mut Registrar) {
    registrar.register_resource(
        RESOURCE_TYPE,
        ResourceRegistration {
            schema,
            factory: |provider_data| Box::new(IntegrationResource::new(provider_data)),
        },
    );
    registrar.register_exporter(RESOURCE_TYPE, exporter());
}

pub fn schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        let config_fields = BTreeMap::from([
            ("name".to_string(), AttributeType::String),
            ("notes".to_string(), AttributeType::String),
            ("properties".to_string(), AttributeType::String),
            ("advanced".to_string(), AttributeType::String),
            (
                "credentials".to_string(),
                AttributeType::Map(Box::new(AttributeType::String)),
            ),
        ]);

        SchemaBuilder::new()
            .description("Genesys Cloud Integration")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .description("Integration ID")
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("intended_state", AttributeType::String)
                    .optional()
                    .description("Integration state: ENABLED, DISABLED or DELETED")
                    .validator(StringOneOfValidator::create(INTENDED_STATES))
                    .default(StaticDefault::string("DISABLED"))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("integration_type", AttributeType::String)
                    .required()
                    .force_new()
                    .description("Integration type ID, e.g. \"purecloud-data-actions\"")
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "config",
                    AttributeType::List(Box::new(AttributeType::Object(config_fields))),
                )
                .optional()
                .description("Integration config; properties and advanced are JSON strings")
                .nested_json_fields(&["properties", "advanced"])
                .build(),
            )
            .build()
    })
}

pub fn exporter() -> ResourceExporter {
    ResourceExporter::new(get_all_integrations)
        .ref_attr(
            "config.credentials.*",
            RefAttrSettings::new("genesyscloud_integration_credential"),
        )
        .json_encode_attributes(&["config.properties", "config.advanced"])
        .encoded_ref_attr(
            "config.properties",
            "groups",
            RefAttrSettings::new("genesyscloud_group"),
        )
}

fn get_all_integrations(
    _ctx: Context,
    client: Client,
) -> BoxFuture<'static, Result<ResourceIdMetaMap, Diagnostic>> {
    Box::pin(async move {
        let api = client.integrations();
        let api = &api;
        let integrations = collect_all(enumerate_all(DEFAULT_PAGE_SIZE, move |page, size| {
            api.list_page(page, size)
        }))
        .await
        .map_err(|e| Diagnostic::error("Failed to get page of integrations", e.to_string()))?;

        Ok(integrations
            .into_iter()
            .filter_map(|i| Some((i.id?, ResourceMeta::new(i.name.unwrap_or_default()))))
            .collect())
    })
}

pub struct IntegrationResource {
    provider_data: GenesysCloudProviderData,
}

impl IntegrationResource {
    pub fn new(provider_data: GenesysCloudProviderData) -> Self {
        Self { provider_data }
    }

    fn api(&self) -> IntegrationsApi<'_> {
        self.provider_data.client.integrations()
    }

    /// PUTs the config block over the current config, echoing its version
    async fn update_config(&self, id: &str, data: &ResourceData) -> Vec<Diagnostic> {
        let Some(config) = block(data, "config") else {
            return vec![];
        };

        let current = match self.api().get_config(id).await {
            Ok(current) => current,
            Err(e) => {
                return vec![Diagnostic::error(
                    format!("Failed to get the integration config for {}", id),
                    e.to_string(),
                )]
            }
        };

        let properties = match block_string(&config, "properties") {
            Some(raw) => match parse_json("config.properties", &raw) {
                Ok(value) => Some(value),
                Err(diags) => return diags,
            },
            None => current.properties.clone(),
        };
        let advanced = match block_string(&config, "advanced") {
            Some(raw) => match parse_json("config.advanced", &raw) {
                Ok(value) => Some(value),
                Err(diags) => return diags,
            },
            None => current.advanced.clone(),
        };
        let credentials = block_string_map(&config, "credentials").map(|entries| {
            entries
                .into_iter()
                .map(|(key, credential_id)| (key, DomainRef::id(credential_id)))
                .collect()
        });

        let update = IntegrationConfig {
            name: block_string(&config, "name").or(current.name),
            notes: block_string(&config, "notes"),
            properties,
            advanced,
            credentials,
            version: current.version,
        };

        tracing::info!("Updating config of integration {}", id);
        match self.api().update_config(id, &update).await {
            Ok(_) => vec![],
            Err(e) => vec![Diagnostic::error(
                format!("Failed to update config for integration {}", id),
                e.to_string(),
            )],
        }
    }

    async fn update_intended_state(&self, id: &str, state: String) -> Vec<Diagnostic> {
        tracing::info!("Setting integration {} intended state to {}", id, state);
        let request = UpdateIntegrationRequest {
            intended_state: state,
        };
        match self.api().update(id, &request).await {
            Ok(_) => vec![],
            Err(e) => vec![Diagnostic::error(
                format!("Failed to update integration {}", id),
                e.to_string(),
            )],
        }
    }
}

/// Writes the remote integration and its config into `data`
fn flatten(data: &mut ResourceData, integration: &Integration, config: &IntegrationConfig) {
    data.set_optional_string(
        "integration_type",
        integration
            .integration_type
            .as_ref()
            .and_then(|t| t.id.clone()),
    );
    data.set_optional_string("intended_state", integration.intended_state.clone());
    data.set("config", flatten_config(config));
}

fn flatten_config(config: &IntegrationConfig) -> Dynamic {
    let mut block = BTreeMap::new();
    block.insert(
        "name".to_string(),
        config.name.clone().map(Dynamic::String).unwrap_or(Dynamic::Null),
    );
    block.insert(
        "notes".to_string(),
        config.notes.clone().map(Dynamic::String).unwrap_or(Dynamic::Null),
    );
    block.insert(
        "properties".to_string(),
        config.properties.as_ref().map(json_string).unwrap_or(Dynamic::Null),
    );
    block.insert(
        "advanced".to_string(),
        config.advanced.as_ref().map(json_string).unwrap_or(Dynamic::Null),
    );
    let credentials = config
        .credentials
        .iter()
        .flatten()
        .filter_map(|(key, reference)| {
            reference
                .id
                .clone()
                .map(|id| (key.clone(), Dynamic::String(id)))
        })
        .collect();
    block.insert("credentials".to_string(), Dynamic::Map(credentials));
    Dynamic::List(vec![Dynamic::Map(block)])
}

#[async_trait]
impl Resource for IntegrationResource {
    fn type_name(&self) -> &str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        schema().clone()
    }

    async fn create(&self, ctx: Context, data: &mut ResourceData) -> Vec<Diagnostic> {
        if let Err(diags) = prepare(schema(), data) {
            return diags;
        }
        let Some(integration_type) = data.get_string("integration_type") else {
            return vec![Diagnostic::error(
                "Missing integration_type",
                "integration_type is required",
            )];
        };

        let request = CreateIntegrationRequest {
            integration_type: DomainRef::id(integration_type),
        };
        let created = match self.api().create(&request).await {
            Ok(created) => created,
            Err(e) => return vec![Diagnostic::error("Failed to create integration", e.to_string())],
        };
        let Some(id) = created.id.clone() else {
            return vec![Diagnostic::error(
                "Failed to create integration",
                "The API response did not include an id",
            )];
        };
        data.set_id(&id);

        let diags = self.update_config(&id, data).await;
        if !diags.is_empty() {
            return diags;
        }

        if let Some(state) = data.get_string("intended_state") {
            if created.intended_state.as_deref() != Some(state.as_str()) {
                let diags = self.update_intended_state(&id, state).await;
                if !diags.is_empty() {
                    return diags;
                }
            }
        }

        tracing::info!("Created integration {}", id);
        self.read(ctx, data).await
    }

    async fn read(&self, ctx: Context, data: &mut ResourceData) -> Vec<Diagnostic> {
        let Some(id) = data.id().map(str::to_string) else {
            return missing_id(KIND);
        };
        tracing::debug!("Reading integration {}", id);

        let check = ConsistencyCheck::new(
            data,
            schema(),
            self.provider_data.bypass_consistency_checker,
        );
        let post_write = data.intent().is_some();
        let base = data.clone();
        let api = self.api();
        let (api, check, base, id) = (&api, &check, &base, id.as_str());

        with_retries_for_read(&ctx, &self.provider_data.timeouts, data, KIND, move || async move {
            let integration = match api.get(id).await {
                Ok(integration) => integration,
                Err(e) => {
                    return classify_read_error(
                        format!("Failed to read integration {}", id),
                        e,
                        post_write,
                    )
                }
            };
            let config = match api.get_config(id).await {
                Ok(config) => config,
                Err(e) => {
                    return classify_read_error(
                        format!("Failed to read config of integration {}", id),
                        e,
                        post_write,
                    )
                }
            };

            let mut observed = base.clone();
            flatten(&mut observed, &integration, &config);
            check.check(&observed).map(|_| Some(observed))
        })
        .await
    }

    async fn update(&self, ctx: Context, data: &mut ResourceData) -> Vec<Diagnostic> {
        if let Err(diags) = prepare(schema(), data) {
            return diags;
        }
        let Some(id) = data.id().map(str::to_string) else {
            return missing_id(KIND);
        };

        if data.has_change("config") {
            let diags = self.update_config(&id, data).await;
            if !diags.is_empty() {
                return diags;
            }
        }

        if data.has_change("intended_state") {
            if let Some(state) = data.get_string("intended_state") {
                let diags = self.update_intended_state(&id, state).await;
                if !diags.is_empty() {
                    return diags;
                }
            }
        }

        tracing::info!("Updated integration {}", id);
        self.read(ctx, data).await
    }

    async fn delete(&self, ctx: Context, data: &mut ResourceData) -> Vec<Diagnostic> {
        let Some(id) = data.id().map(str::to_string) else {
            return missing_id(KIND);
        };

        match self.api().delete(&id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!("Integration {} already deleted", id);
            }
            Err(e) => {
                return vec![Diagnostic::error(
                    format!("Failed to delete the integration {}", id),
                    e.to_string(),
                )]
            }
        }

        let api = self.api();
        let api = &api;
        let id = id.as_str();
        confirm_deleted(&ctx, &self.provider_data.timeouts, KIND, id, move || {
            api.get(id)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use crate::provider_data::RetryTimeouts;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::time::Duration;
    use tfplug::DynamicValue;

    fn provider_data(url: &str) -> GenesysCloudProviderData {
        GenesysCloudProviderData::new(create_test_client(url)).with_timeouts(RetryTimeouts {
            read: Duration::from_millis(200),
            search: Duration::from_millis(100),
            delete: Duration::from_millis(100),
            backoff: Duration::from_millis(10),
        })
    }

    #[test]
    fn schema_defaults_intended_state() {
        let schema = schema();

        let state = schema.attribute("intended_state").unwrap();
        assert!(state.optional);
        assert!(state.default.is_some());
        assert!(schema.attribute("integration_type").unwrap().force_new);
        assert_eq!(
            schema.attribute("config").unwrap().nested_json,
            vec!["properties".to_string(), "advanced".to_string()]
        );
    }

    #[test]
    fn flatten_config_encodes_json_and_credentials() {
        let config = IntegrationConfig {
            name: Some("My Integration".to_string()),
            properties: Some(json!({ "displayTypeId": "text" })),
            credentials: Some(BTreeMap::from([(
                "basicAuth".to_string(),
                DomainRef::id("cred-1"),
            )])),
            ..Default::default()
        };

        let flattened: serde_json::Value = (&flatten_config(&config)).into();

        assert_eq!(flattened[0]["name"], "My Integration");
        assert_eq!(flattened[0]["properties"], r#"{"displayTypeId":"text"}"#);
        assert_eq!(flattened[0]["credentials"]["basicAuth"], "cred-1");
        assert!(flattened[0]["advanced"].is_null());
    }

    #[tokio::test]
    async fn create_configures_and_enables() {
        let mut server = Server::new_async().await;
        let create = server
            .mock("POST", "/api/v2/integrations")
            .match_body(Matcher::PartialJson(json!({
                "integrationType": { "id": "purecloud-data-actions" }
            })))
            .with_status(200)
            .with_body(r#"{"id": "int-1", "intendedState": "DISABLED"}"#)
            .create_async()
            .await;
        let get_config = server
            .mock("GET", "/api/v2/integrations/int-1/config/current")
            .with_status(200)
            .with_body(
                r#"{"name": "Data Actions", "properties": {"a": 1},
                    "credentials": {}, "version": 1}"#,
            )
            .expect_at_least(2)
            .create_async()
            .await;
        let put_config = server
            .mock("PUT", "/api/v2/integrations/int-1/config/current")
            .match_body(Matcher::PartialJson(json!({
                "name": "Data Actions",
                "properties": { "a": 1 },
                "version": 1
            })))
            .with_status(200)
            .with_body(r#"{"version": 2}"#)
            .create_async()
            .await;
        let patch = server
            .mock("PATCH", "/api/v2/integrations/int-1")
            .match_body(Matcher::Json(json!({ "intendedState": "ENABLED" })))
            .with_status(200)
            .with_body(r#"{"id": "int-1", "intendedState": "ENABLED"}"#)
            .create_async()
            .await;
        let get = server
            .mock("GET", "/api/v2/integrations/int-1")
            .with_status(200)
            .with_body(
                r#"{"id": "int-1", "name": "Data Actions", "intendedState": "ENABLED",
                    "integrationType": {"id": "purecloud-data-actions"}}"#,
            )
            .create_async()
            .await;

        let resource = IntegrationResource::new(provider_data(&server.url()));
        let mut data = ResourceData::for_create(DynamicValue::from_json(json!({
            "integration_type": "purecloud-data-actions",
            "intended_state": "ENABLED",
            "config": [{ "name": "Data Actions", "properties": "{\"a\": 1}" }]
        })));

        let diags = resource.create(Context::new(), &mut data).await;

        assert!(diags.is_empty(), "{:?}", diags);
        assert_eq!(data.id(), Some("int-1"));
        assert_eq!(data.get_string("intended_state").as_deref(), Some("ENABLED"));
        create.assert_async().await;
        get_config.assert_async().await;
        put_config.assert_async().await;
        patch.assert_async().await;
        get.assert_async().await;
    }

    #[tokio::test]
    async fn update_puts_config_and_changes_state() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v2/integrations/int-1/config/current")
            .with_status(200)
            .with_body(r#"{"name": "New", "credentials": {}, "version": 3}"#)
            .expect_at_least(2)
            .create_async()
            .await;
        let put_config = server
            .mock("PUT", "/api/v2/integrations/int-1/config/current")
            .match_body(Matcher::PartialJson(json!({ "name": "New", "version": 3 })))
            .with_status(200)
            .with_body(r#"{"version": 4}"#)
            .create_async()
            .await;
        let patch = server
            .mock("PATCH", "/api/v2/integrations/int-1")
            .match_body(Matcher::Json(json!({ "intendedState": "ENABLED" })))
            .with_status(200)
            .with_body(r#"{"id": "int-1", "intendedState": "ENABLED"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v2/integrations/int-1")
            .with_status(200)
            .with_body(
                r#"{"id": "int-1", "intendedState": "ENABLED",
                    "integrationType": {"id": "purecloud-data-actions"}}"#,
            )
            .create_async()
            .await;

        let resource = IntegrationResource::new(provider_data(&server.url()));
        let mut data = ResourceData::for_update(
            DynamicValue::from_json(json!({
                "id": "int-1",
                "integration_type": "purecloud-data-actions",
                "intended_state": "DISABLED",
                "config": [{ "name": "Old" }]
            })),
            DynamicValue::from_json(json!({
                "integration_type": "purecloud-data-actions",
                "intended_state": "ENABLED",
                "config": [{ "name": "New" }]
            })),
        );

        let diags = resource.update(Context::new(), &mut data).await;

        assert!(diags.is_empty(), "{:?}", diags);
        put_config.assert_async().await;
        patch.assert_async().await;
        assert_eq!(data.id(), Some("int-1"));
        assert_eq!(data.get_string("intended_state").as_deref(), Some("ENABLED"));
        let config = block(&data, "config").unwrap();
        assert_eq!(block_string(&config, "name").as_deref(), Some("New"));
    }

    #[tokio::test]
    async fn read_of_deleted_integration_clears_id() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v2/integrations/gone")
            .with_status(404)
            .with_body(r#"{"message": "not found"}"#)
            .create_async()
            .await;

        let resource = IntegrationResource::new(provider_data(&server.url()));
        let mut data = ResourceData::for_read(DynamicValue::from_json(json!({ "id": "gone" })));

        let diags = resource.read(Context::new(), &mut data).await;

        assert!(diags.is_empty(), "{:?}", diags);
        assert!(data.id().is_none());
    }

    #[tokio::test]
    async fn delete_confirms_with_not_found() {
        let mut server = Server::new_async().await;
        let delete = server
            .mock("DELETE", "/api/v2/integrations/int-1")
            .with_status(204)
            .create_async()
            .await;
        let poll = server
            .mock("GET", "/api/v2/integrations/int-1")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let resource = IntegrationResource::new(provider_data(&server.url()));
        let mut data = ResourceData::for_delete(DynamicValue::from_json(json!({ "id": "int-1" })));

        let diags = resource.delete(Context::new(), &mut data).await;

        assert!(diags.is_empty(), "{:?}", diags);
        delete.assert_async().await;
        poll.assert_async().await;
    }
}
