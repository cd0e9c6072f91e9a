//! genesyscloud_integration_action
//!
//! Custom data actions. The contract is fixed at creation; name, category
//! and the request/response config can be updated against the current
//! version.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tfplug::defaults::StaticDefault;
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic};
use tfplug::validator::{NumberRangeValidator, StringLengthValidator};
use tfplug::{Context, Resource, ResourceData};

use super::{
    block, block_string, block_string_map, json_string, missing_id, parse_json, prepare, string_map,
};
use crate::api::actions::{
    Action, ActionConfig, ActionContract, ActionsApi, ContractInput, ContractOutput,
    CreateActionRequest, RequestConfig, ResponseConfig, UpdateActionRequest,
};
use crate::api::paging::{collect_all, enumerate_all, DEFAULT_PAGE_SIZE};
use crate::api::Client;
use crate::consistency_checker::ConsistencyCheck;
use crate::provider_data::GenesysCloudProviderData;
use crate::registrar::{Registrar, ResourceRegistration};
use crate::resource_exporter::{RefAttrSettings, ResourceExporter, ResourceIdMetaMap, ResourceMeta};
use crate::util::retries::{classify_read_error, confirm_deleted, with_retries_for_read};

pub const RESOURCE_TYPE: &str = "genesyscloud_integration_action";
const KIND: &str = "integration action";

const REQUEST_TYPES: &[&str] = &["GET", "PUT", "POST", "PATCH", "DELETE"];
const DEFAULT_REQUEST_TEMPLATE: &str = "${input.rawRequest}";
const DEFAULT_SUCCESS_TEMPLATE: &str = "${rawResult}";

pub fn register(registrar: &mut Registrar) {
    registrar.register_resource(
        RESOURCE_TYPE,
        ResourceRegistration {
            schema,
            factory: |provider_data| Box::new(IntegrationActionResource::new(provider_data)),
        },
    );
    registrar.register_exporter(RESOURCE_TYPE, exporter());
}

pub fn schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        let string_map = || AttributeType::Map(Box::new(AttributeType::String));
        let request_fields = BTreeMap::from([
            ("request_url_template".to_string(), AttributeType::String),
            ("request_type".to_string(), AttributeType::String),
            ("request_template".to_string(), AttributeType::String),
            ("headers".to_string(), string_map()),
        ]);
        let response_fields = BTreeMap::from([
            ("translation_map".to_string(), AttributeType::String),
            ("translation_map_defaults".to_string(), string_map()),
            ("success_template".to_string(), AttributeType::String),
        ]);

        SchemaBuilder::new()
            .description("Genesys Cloud Integration Actions")
            .version(1)
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .description("Name of the action. Can be up to 256 characters long")
                    .validator(StringLengthValidator::between(1, 256))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("category", AttributeType::String)
                    .required()
                    .description("Category of action. Can be up to 256 characters long")
                    .validator(StringLengthValidator::between(1, 256))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("integration_id", AttributeType::String)
                    .required()
                    .force_new()
                    .description("The ID of the integration this action is associated with")
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("secure", AttributeType::Bool)
                    .optional()
                    .force_new()
                    .description("Whether the action is designed to accept sensitive data")
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("config_timeout_seconds", AttributeType::Number)
                    .optional()
                    .description("Optional 1-60 second timeout enforced on execution of this action")
                    .validator(NumberRangeValidator::between(1.0, 60.0))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("contract_input", AttributeType::String)
                    .required()
                    .force_new()
                    .json_string()
                    .description("JSON Schema of the request body sent to the action")
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("contract_output", AttributeType::String)
                    .required()
                    .force_new()
                    .json_string()
                    .description("JSON Schema of the successful result sent back to the caller")
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "config_request",
                    AttributeType::List(Box::new(AttributeType::Object(request_fields))),
                )
                .optional()
                .description("Configuration of outbound request")
                .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "config_response",
                    AttributeType::List(Box::new(AttributeType::Object(response_fields))),
                )
                .optional()
                .computed()
                .description("Configuration of response processing")
                .nested_json_fields(&["translation_map"])
                .build(),
            )
            .build()
    })
}

pub fn exporter() -> ResourceExporter {
    ResourceExporter::new(get_all_actions)
        .ref_attr("integration_id", RefAttrSettings::new("genesyscloud_integration"))
        .json_encode_attributes(&["contract_input", "contract_output"])
}

fn get_all_actions(
    _ctx: Context,
    client: Client,
) -> BoxFuture<'static, Result<ResourceIdMetaMap, Diagnostic>> {
    Box::pin(async move {
        let api = client.integrations().actions();
        let api = &api;
        let actions = collect_all(enumerate_all(DEFAULT_PAGE_SIZE, move |page, size| {
            api.list_page(page, size, None)
        }))
        .await
        .map_err(|e| {
            Diagnostic::error("Failed to get page of integration actions", e.to_string())
        })?;

        Ok(actions
            .into_iter()
            .filter_map(|a| Some((a.id?, ResourceMeta::new(a.name.unwrap_or_default()))))
            .collect())
    })
}

pub struct IntegrationActionResource {
    provider_data: GenesysCloudProviderData,
}

impl IntegrationActionResource {
    pub fn new(provider_data: GenesysCloudProviderData) -> Self {
        Self { provider_data }
    }

    fn api(&self) -> ActionsApi<'_> {
        self.provider_data.client.integrations().actions()
    }
}

fn required_string(data: &ResourceData, name: &str) -> Result<String, Vec<Diagnostic>> {
    data.get_string(name).ok_or_else(|| {
        vec![Diagnostic::error(
            format!("Missing {}", name),
            format!("{} is required", name),
        )
        .with_attribute(AttributePath::new(name))]
    })
}

fn build_contract(data: &ResourceData) -> Result<ActionContract, Vec<Diagnostic>> {
    let input = parse_json("contract_input", &required_string(data, "contract_input")?)?;
    let output = parse_json("contract_output", &required_string(data, "contract_output")?)?;

    Ok(ActionContract {
        input: Some(ContractInput {
            input_schema: Some(input),
        }),
        output: Some(ContractOutput {
            success_schema: Some(output),
        }),
    })
}

fn build_config(data: &ResourceData) -> Result<ActionConfig, Vec<Diagnostic>> {
    let request = block(data, "config_request")
        .map(|request| {
            let request_type = block_string(&request, "request_type");
            if let Some(kind) = request_type.as_deref() {
                if !REQUEST_TYPES.contains(&kind) {
                    return Err(vec![Diagnostic::error(
                        "Invalid config_request.request_type",
                        format!("Got \"{}\", expected one of {}", kind, REQUEST_TYPES.join(", ")),
                    )
                    .with_attribute(AttributePath::parse("config_request.0.request_type"))]);
                }
            }
            Ok(RequestConfig {
                request_url_template: block_string(&request, "request_url_template"),
                request_type,
                request_template: block_string(&request, "request_template")
                    .or_else(|| Some(DEFAULT_REQUEST_TEMPLATE.to_string())),
                headers: block_string_map(&request, "headers"),
            })
        })
        .transpose()?;

    let response = block(data, "config_response")
        .map(|response| {
            let translation_map = match block_string(&response, "translation_map") {
                Some(raw) => {
                    let value = parse_json("config_response.translation_map", &raw)?;
                    let map: BTreeMap<String, String> = serde_json::from_value(value).map_err(|e| {
                        vec![Diagnostic::error(
                            "Invalid config_response.translation_map",
                            format!("Expected an object of strings: {}", e),
                        )]
                    })?;
                    Some(map)
                }
                None => None,
            };
            Ok::<_, Vec<Diagnostic>>(ResponseConfig {
                translation_map,
                translation_map_defaults: block_string_map(&response, "translation_map_defaults"),
                success_template: block_string(&response, "success_template")
                    .or_else(|| Some(DEFAULT_SUCCESS_TEMPLATE.to_string())),
            })
        })
        .transpose()?;

    Ok(ActionConfig {
        request,
        response,
        timeout_seconds: data.get_int("config_timeout_seconds"),
    })
}

fn create_request(data: &ResourceData) -> Result<CreateActionRequest, Vec<Diagnostic>> {
    Ok(CreateActionRequest {
        name: required_string(data, "name")?,
        category: required_string(data, "category")?,
        integration_id: required_string(data, "integration_id")?,
        secure: data.get_bool("secure").unwrap_or(false),
        config: build_config(data)?,
        contract: build_contract(data)?,
    })
}

/// The contract cannot change in place, so only name, category and config are sent
fn update_request(
    data: &ResourceData,
    version: i64,
) -> Result<UpdateActionRequest, Vec<Diagnostic>> {
    Ok(UpdateActionRequest {
        name: required_string(data, "name")?,
        category: required_string(data, "category")?,
        version,
        config: build_config(data)?,
    })
}

fn optional(value: Option<String>) -> Dynamic {
    value.map(Dynamic::String).unwrap_or(Dynamic::Null)
}

fn flatten_request(request: &RequestConfig) -> Dynamic {
    let mut block = BTreeMap::new();
    block.insert(
        "request_url_template".to_string(),
        optional(request.request_url_template.clone()),
    );
    block.insert("request_type".to_string(), optional(request.request_type.clone()));
    block.insert(
        "request_template".to_string(),
        optional(request.request_template.clone()),
    );
    block.insert(
        "headers".to_string(),
        request.headers.as_ref().map(string_map).unwrap_or(Dynamic::Null),
    );
    Dynamic::List(vec![Dynamic::Map(block)])
}

fn flatten_response(response: &ResponseConfig) -> Dynamic {
    let mut block = BTreeMap::new();
    block.insert(
        "translation_map".to_string(),
        response
            .translation_map
            .as_ref()
            .map(|map| {
                let value: Value = map
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect::<serde_json::Map<_, _>>()
                    .into();
                json_string(&value)
            })
            .unwrap_or(Dynamic::Null),
    );
    block.insert(
        "translation_map_defaults".to_string(),
        response
            .translation_map_defaults
            .as_ref()
            .map(string_map)
            .unwrap_or(Dynamic::Null),
    );
    block.insert(
        "success_template".to_string(),
        optional(response.success_template.clone()),
    );
    Dynamic::List(vec![Dynamic::Map(block)])
}

fn flatten(data: &mut ResourceData, action: &Action) {
    data.set_optional_string("name", action.name.clone());
    data.set_optional_string("category", action.category.clone());
    data.set_optional_string("integration_id", action.integration_id.clone());
    data.set_bool("secure", action.secure.unwrap_or(false));

    let contract = action.contract.as_ref();
    data.set(
        "contract_input",
        contract
            .and_then(|c| c.input.as_ref())
            .and_then(|i| i.input_schema.as_ref())
            .map(json_string)
            .unwrap_or(Dynamic::Null),
    );
    data.set(
        "contract_output",
        contract
            .and_then(|c| c.output.as_ref())
            .and_then(|o| o.success_schema.as_ref())
            .map(json_string)
            .unwrap_or(Dynamic::Null),
    );

    let config = action.config.as_ref();
    match config.and_then(|c| c.timeout_seconds) {
        Some(timeout) => data.set_int("config_timeout_seconds", timeout),
        None => data.set_null("config_timeout_seconds"),
    }
    data.set(
        "config_request",
        config
            .and_then(|c| c.request.as_ref())
            .map(flatten_request)
            .unwrap_or(Dynamic::Null),
    );
    data.set(
        "config_response",
        config
            .and_then(|c| c.response.as_ref())
            .map(flatten_response)
            .unwrap_or(Dynamic::Null),
    );
}

#[async_trait]
impl Resource for IntegrationActionResource {
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
        let request = match create_request(data) {
            Ok(request) => request,
            Err(diags) => return diags,
        };

        tracing::info!("Creating integration action {}", request.name);
        let created = match self.api().create(&request).await {
            Ok(created) => created,
            Err(e) => {
                return vec![Diagnostic::error(
                    format!("Failed to create integration action {}", request.name),
                    e.to_string(),
                )]
            }
        };
        let Some(id) = created.id else {
            return vec![Diagnostic::error(
                format!("Failed to create integration action {}", request.name),
                "The API response did not include an id",
            )];
        };
        data.set_id(&id);

        tracing::info!("Created integration action {} {}", request.name, id);
        self.read(ctx, data).await
    }

    async fn read(&self, ctx: Context, data: &mut ResourceData) -> Vec<Diagnostic> {
        let Some(id) = data.id().map(str::to_string) else {
            return missing_id(KIND);
        };
        tracing::debug!("Reading integration action {}", id);

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
            match api.get(id).await {
                Ok(action) => {
                    let mut observed = base.clone();
                    flatten(&mut observed, &action);
                    check.check(&observed).map(|_| Some(observed))
                }
                Err(e) => classify_read_error(
                    format!("Failed to read integration action {}", id),
                    e,
                    post_write,
                ),
            }
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

        let current = match self.api().get(&id).await {
            Ok(current) => current,
            Err(e) => {
                return vec![Diagnostic::error(
                    format!("Failed to read integration action {}", id),
                    e.to_string(),
                )]
            }
        };

        let request = match update_request(data, current.version.unwrap_or_default()) {
            Ok(request) => request,
            Err(diags) => return diags,
        };

        tracing::info!("Updating integration action {}", request.name);
        if let Err(e) = self.api().update(&id, &request).await {
            return vec![Diagnostic::error(
                format!("Failed to update integration action {}", request.name),
                e.to_string(),
            )];
        }

        tracing::info!("Updated integration action {} {}", request.name, id);
        self.read(ctx, data).await
    }

    async fn delete(&self, ctx: Context, data: &mut ResourceData) -> Vec<Diagnostic> {
        let Some(id) = data.id().map(str::to_string) else {
            return missing_id(KIND);
        };

        match self.api().delete(&id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                return vec![Diagnostic::error(
                    format!("Failed to delete integration action {}", id),
                    e.to_string(),
                )]
            }
        }

        let api = self.api();
        let (api, id) = (&api, id.as_str());
        confirm_deleted(&ctx, &self.provider_data.timeouts, KIND, id, move || api.get(id)).await
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

    fn resource(url: &str) -> IntegrationActionResource {
        IntegrationActionResource::new(
            GenesysCloudProviderData::new(create_test_client(url)).with_timeouts(RetryTimeouts {
                read: Duration::from_millis(200),
                search: Duration::from_millis(100),
                delete: Duration::from_millis(100),
                backoff: Duration::from_millis(10),
            }),
        )
    }

    fn planned() -> ResourceData {
        ResourceData::for_create(DynamicValue::from_json(json!({
            "name": "Get Weather",
            "category": "Weather",
            "integration_id": "int-1",
            "contract_input": r#"{"type": "object", "properties": {"city": {"type": "string"}}}"#,
            "contract_output": r#"{"type": "object"}"#,
            "config_request": [{
                "request_url_template": "https://example.com/${input.city}",
                "request_type": "GET"
            }],
            "config_response": [{
                "translation_map": r#"{"temp": "$.main.temp"}"#
            }]
        })))
    }

    #[test]
    fn config_fills_template_defaults() {
        let config = build_config(&planned()).unwrap();

        let request = config.request.unwrap();
        assert_eq!(request.request_template.as_deref(), Some(DEFAULT_REQUEST_TEMPLATE));
        let response = config.response.unwrap();
        assert_eq!(response.success_template.as_deref(), Some(DEFAULT_SUCCESS_TEMPLATE));
        assert_eq!(response.translation_map.unwrap()["temp"], "$.main.temp");
    }

    #[test]
    fn unknown_request_type_is_rejected() {
        let data = ResourceData::for_create(DynamicValue::from_json(json!({
            "config_request": [{ "request_type": "FETCH" }]
        })));

        let diags = build_config(&data).unwrap_err();

        assert_eq!(diags[0].summary, "Invalid config_request.request_type");
    }

    #[test]
    fn translation_map_must_be_object_of_strings() {
        let data = ResourceData::for_create(DynamicValue::from_json(json!({
            "config_response": [{ "translation_map": "[1, 2]" }]
        })));

        assert!(build_config(&data).is_err());
    }

    #[tokio::test]
    async fn create_reads_back_with_reformatted_json() {
        let mut server = Server::new_async().await;
        let create = server
            .mock("POST", "/api/v2/integrations/actions")
            .match_body(Matcher::PartialJson(json!({
                "name": "Get Weather",
                "integrationId": "int-1",
                "secure": false,
                "contract": { "output": { "successSchema": { "type": "object" } } }
            })))
            .with_status(200)
            .with_body(r#"{"id": "action-1"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v2/integrations/actions/action-1")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("expand".into(), "contract".into()),
                Matcher::UrlEncoded("includeConfig".into(), "true".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{
                    "id": "action-1", "name": "Get Weather", "category": "Weather",
                    "integrationId": "int-1", "secure": false, "version": 1,
                    "contract": {
                        "input": {"inputSchema": {
                            "properties": {"city": {"type": "string"}}, "type": "object"
                        }},
                        "output": {"successSchema": {"type": "object"}}
                    },
                    "config": {
                        "request": {
                            "requestUrlTemplate": "https://example.com/${input.city}",
                            "requestType": "GET",
                            "requestTemplate": "${input.rawRequest}"
                        },
                        "response": {
                            "translationMap": {"temp": "$.main.temp"},
                            "successTemplate": "${rawResult}"
                        }
                    }
                }"#,
            )
            .create_async()
            .await;

        let mut data = planned();
        let diags = resource(&server.url()).create(Context::new(), &mut data).await;

        assert!(diags.is_empty(), "{:?}", diags);
        create.assert_async().await;
        assert_eq!(data.id(), Some("action-1"));
        assert_eq!(data.get_bool("secure"), Some(false));
        let response = block(&data, "config_response").unwrap();
        assert_eq!(
            block_string(&response, "success_template").as_deref(),
            Some("${rawResult}")
        );
    }

    #[tokio::test]
    async fn update_echoes_current_version() {
        let mut server = Server::new_async().await;
        let body = r#"{"id": "action-1", "name": "Renamed", "category": "Weather",
                       "integrationId": "int-1", "version": 4,
                       "contract": {"input": {"inputSchema": {}},
                                    "output": {"successSchema": {}}}}"#;
        server
            .mock("GET", "/api/v2/integrations/actions/action-1")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;
        let patch = server
            .mock("PATCH", "/api/v2/integrations/actions/action-1")
            .match_body(Matcher::PartialJson(json!({ "name": "Renamed", "version": 4 })))
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let mut data = ResourceData::for_update(
            DynamicValue::from_json(json!({ "id": "action-1", "name": "Old" })),
            DynamicValue::from_json(json!({
                "name": "Renamed",
                "category": "Weather",
                "integration_id": "int-1",
                "contract_input": "{}",
                "contract_output": "{}"
            })),
        );

        let diags = resource(&server.url()).update(Context::new(), &mut data).await;

        assert!(diags.is_empty(), "{:?}", diags);
        patch.assert_async().await;
        assert_eq!(data.get_string("name").as_deref(), Some("Renamed"));
    }
}
