//! genesyscloud_recording_media_retention_policy
//!
//! The nested blocks mirror the API documents with snake_case field names,
//! except that entity references (`forQueues: [{id}]`, `evaluationForm: {id}`)
//! are held as bare ids (`for_queue_ids`, `evaluation_form_id`). Each
//! top-level block is a single-item list; below that, objects stay maps and
//! arrays stay lists.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::OnceLock;
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{Diagnostic, Dynamic};
use tfplug::validator::ListLengthValidator;
use tfplug::{Context, Resource, ResourceData};

use super::{missing_id, prepare};
use crate::api::paging::{collect_all, enumerate_all, DEFAULT_PAGE_SIZE};
use crate::api::recording::{MediaRetentionPoliciesApi, MediaRetentionPolicy};
use crate::api::Client;
use crate::consistency_checker::ConsistencyCheck;
use crate::provider_data::GenesysCloudProviderData;
use crate::registrar::{Registrar, ResourceRegistration};
use crate::resource_exporter::{RefAttrSettings, ResourceExporter, ResourceIdMetaMap, ResourceMeta};
use crate::util::retries::{classify_read_error, confirm_deleted, with_retries_for_read};

pub const RESOURCE_TYPE: &str = "genesyscloud_recording_media_retention_policy";
const KIND: &str = "media retention policy";

const MEDIA_POLICIES: &[&str] = &["call_policy", "chat_policy", "message_policy", "email_policy"];
const EVALUATION_ACTIONS: &[&str] = &[
    "assign_evaluations",
    "assign_calibrations",
    "assign_metered_evaluations",
    "assign_metered_assignment_by_agent",
];

pub fn register(registrar: &mut Registrar) {
    registrar.register_resource(
        RESOURCE_TYPE,
        ResourceRegistration {
            schema,
            factory: |provider_data| Box::new(MediaRetentionPolicyResource::new(provider_data)),
        },
    );
    registrar.register_exporter(RESOURCE_TYPE, exporter());
}

pub fn schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        let nested_block = |name: &str, description: &str| {
            AttributeBuilder::new(name, AttributeType::Dynamic)
                .optional()
                .description(description)
                .validator(ListLengthValidator::at_most(1))
                .build()
        };

        SchemaBuilder::new()
            .description("Genesys Cloud Media Retention Policies")
            .version(1)
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .force_new()
                    .description("The policy name")
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("order", AttributeType::Number)
                    .optional()
                    .description("The ordinal number for the policy")
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .optional()
                    .description("The description for the policy")
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("enabled", AttributeType::Bool)
                    .optional()
                    .description(
                        "The policy will be enabled if true, otherwise it will be disabled",
                    )
                    .build(),
            )
            .attribute(nested_block("media_policies", "Conditions and actions per media type"))
            .attribute(nested_block("conditions", "Conditions"))
            .attribute(nested_block("actions", "Actions"))
            .attribute(nested_block(
                "policy_errors",
                "A list of errors in the policy configuration",
            ))
            .build()
    })
}

pub fn exporter() -> ResourceExporter {
    let any = ["*"];
    let prefixes = MEDIA_POLICIES
        .iter()
        .map(|policy| format!("media_policies.{}.", policy))
        .chain(std::iter::once(String::new()));

    let mut exporter = ResourceExporter::new(get_all_policies);
    for prefix in prefixes {
        let conditions = format!("{}conditions", prefix);
        let actions = format!("{}actions", prefix);

        exporter = exporter
            .ref_attr(
                &format!("{}.for_queue_ids", conditions),
                RefAttrSettings::new("genesyscloud_routing_queue").with_alt_values(&any),
            )
            .ref_attr(
                &format!("{}.for_user_ids", conditions),
                RefAttrSettings::new("genesyscloud_user").with_alt_values(&any),
            )
            .ref_attr(
                &format!("{}.wrapup_code_ids", conditions),
                RefAttrSettings::new("genesyscloud_routing_wrapupcode").with_alt_values(&any),
            )
            .ref_attr(
                &format!("{}.language_ids", conditions),
                RefAttrSettings::new("genesyscloud_routing_language").with_alt_values(&any),
            );

        for action in EVALUATION_ACTIONS {
            exporter = exporter
                .ref_attr(
                    &format!("{}.{}.evaluation_form_id", actions, action),
                    RefAttrSettings::new("genesyscloud_quality_forms_evaluation"),
                )
                .ref_attr(
                    &format!("{}.{}.evaluator_ids", actions, action),
                    RefAttrSettings::new("genesyscloud_user").with_alt_values(&any),
                );
        }

        exporter = exporter
            .ref_attr(
                &format!("{}.assign_calibrations.calibrator_id", actions),
                RefAttrSettings::new("genesyscloud_user"),
            )
            .ref_attr(
                &format!("{}.assign_calibrations.expert_evaluator_id", actions),
                RefAttrSettings::new("genesyscloud_user"),
            )
            .ref_attr(
                &format!("{}.assign_evaluations.user_id", actions),
                RefAttrSettings::new("genesyscloud_user"),
            )
            .ref_attr(
                &format!("{}.assign_surveys.flow_id", actions),
                RefAttrSettings::new("genesyscloud_flow"),
            )
            .ref_attr(
                &format!("{}.integration_export.integration_id", actions),
                RefAttrSettings::new("genesyscloud_integration"),
            );
    }

    exporter
        .ref_attr(
            "actions.media_transcriptions.integration_id",
            RefAttrSettings::new("genesyscloud_integration"),
        )
        .allow_zero_values(&["order"])
        .remove_if_missing("", &["conditions", "actions"])
        .remove_if_missing("media_policies", MEDIA_POLICIES)
}

fn get_all_policies(
    _ctx: Context,
    client: Client,
) -> BoxFuture<'static, Result<ResourceIdMetaMap, Diagnostic>> {
    Box::pin(async move {
        let api = client.recording().media_retention_policies();
        let api = &api;
        let policies = collect_all(enumerate_all(DEFAULT_PAGE_SIZE, move |page, size| {
            api.list_page(page, size, None)
        }))
        .await
        .map_err(|e| {
            Diagnostic::error("Failed to get page of media retention policies", e.to_string())
        })?;

        Ok(policies
            .into_iter()
            .filter_map(|p| Some((p.id?, ResourceMeta::new(p.name.unwrap_or_default()))))
            .collect())
    })
}

pub(crate) fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if !out.is_empty() {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

pub(crate) fn snake_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = !out.is_empty();
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// API field holding entity references, kept as bare ids in state
struct ReferenceField {
    api: &'static str,
    state: &'static str,
    many: bool,
    /// API name of the enclosing object, when the field name is ambiguous
    within: Option<&'static str>,
}

impl ReferenceField {
    const fn one(api: &'static str, state: &'static str) -> Self {
        Self { api, state, many: false, within: None }
    }

    const fn many(api: &'static str, state: &'static str) -> Self {
        Self { api, state, many: true, within: None }
    }

    const fn within(mut self, parent: &'static str) -> Self {
        self.within = Some(parent);
        self
    }

    fn applies(&self, parent: &str) -> bool {
        self.within.map_or(true, |within| within == parent)
    }
}

const REFERENCE_FIELDS: &[ReferenceField] = &[
    ReferenceField::many("forQueues", "for_queue_ids"),
    ReferenceField::many("forUsers", "for_user_ids"),
    ReferenceField::many("wrapupCodes", "wrapup_code_ids"),
    ReferenceField::many("languages", "language_ids"),
    ReferenceField::many("evaluators", "evaluator_ids"),
    ReferenceField::one("evaluationForm", "evaluation_form_id"),
    ReferenceField::one("calibrator", "calibrator_id"),
    ReferenceField::one("expertEvaluator", "expert_evaluator_id"),
    ReferenceField::one("user", "user_id").within("assignEvaluations"),
    ReferenceField::one("flow", "flow_id").within("assignSurveys"),
    ReferenceField::one("integration", "integration_id").within("integrationExport"),
];

fn reference_id(value: &Value) -> Value {
    value.get("id").cloned().unwrap_or(Value::Null)
}

fn reference(id: &Value) -> Value {
    match id {
        Value::Null => Value::Null,
        id => serde_json::json!({ "id": id }),
    }
}

/// API document to state: snake_case keys, references reduced to ids.
/// `parent` is the API name of the field holding `value`.
fn to_state(value: &Value, parent: &str) -> Value {
    match value {
        Value::Object(entries) => entries
            .iter()
            .map(|(k, v)| {
                let field = REFERENCE_FIELDS
                    .iter()
                    .find(|f| f.api == k.as_str() && f.applies(parent));
                match field {
                    Some(field) if field.many => (
                        field.state.to_string(),
                        v.as_array()
                            .map(|refs| refs.iter().map(reference_id).collect())
                            .unwrap_or(Value::Null),
                    ),
                    Some(field) => (field.state.to_string(), reference_id(v)),
                    None => (camel_to_snake(k), to_state(v, k)),
                }
            })
            .collect::<serde_json::Map<_, _>>()
            .into(),
        Value::Array(items) => items.iter().map(|item| to_state(item, parent)).collect(),
        other => other.clone(),
    }
}

/// State to API document: camelCase keys, ids wrapped as references.
/// `parent` is the API name of the field holding `value`.
fn to_api(value: &Value, parent: &str) -> Value {
    match value {
        Value::Object(entries) => entries
            .iter()
            .map(|(k, v)| {
                let field = REFERENCE_FIELDS
                    .iter()
                    .find(|f| f.state == k.as_str() && f.applies(parent));
                match field {
                    Some(field) if field.many => (
                        field.api.to_string(),
                        v.as_array()
                            .map(|ids| ids.iter().map(reference).collect())
                            .unwrap_or(Value::Null),
                    ),
                    Some(field) => (field.api.to_string(), reference(v)),
                    None => {
                        let api_name = snake_to_camel(k);
                        let converted = to_api(v, &api_name);
                        (api_name, converted)
                    }
                }
            })
            .collect::<serde_json::Map<_, _>>()
            .into(),
        Value::Array(items) => items.iter().map(|item| to_api(item, parent)).collect(),
        other => other.clone(),
    }
}

/// API document to a single-item block
fn flatten_block(value: Option<&Value>) -> Dynamic {
    match value {
        Some(Value::Null) | None => Dynamic::Null,
        Some(value) => Dynamic::List(vec![Dynamic::from(to_state(value, ""))]),
    }
}

/// Single-item block to an API document; an empty block is absent
fn build_block(data: &ResourceData, name: &str) -> Option<Value> {
    let first = match data.get(name)? {
        Dynamic::List(items) => items.first()?.clone(),
        other => other.clone(),
    };
    if first.is_null() {
        return None;
    }
    Some(to_api(&Value::from(&first), ""))
}

fn build_policy(data: &ResourceData) -> MediaRetentionPolicy {
    MediaRetentionPolicy {
        id: None,
        name: data.get_string("name"),
        order: data.get_int("order"),
        description: data.get_string("description"),
        enabled: data.get_bool("enabled"),
        media_policies: build_block(data, "media_policies"),
        conditions: build_block(data, "conditions"),
        actions: build_block(data, "actions"),
        policy_errors: build_block(data, "policy_errors"),
    }
}

fn flatten(data: &mut ResourceData, policy: &MediaRetentionPolicy) {
    data.set_optional_string("name", policy.name.clone());
    match policy.order {
        Some(order) => data.set_int("order", order),
        None => data.set_null("order"),
    }
    data.set_optional_string("description", policy.description.clone());
    match policy.enabled {
        Some(enabled) => data.set_bool("enabled", enabled),
        None => data.set_null("enabled"),
    }
    data.set("media_policies", flatten_block(policy.media_policies.as_ref()));
    data.set("conditions", flatten_block(policy.conditions.as_ref()));
    data.set("actions", flatten_block(policy.actions.as_ref()));
    data.set("policy_errors", flatten_block(policy.policy_errors.as_ref()));
}

pub struct MediaRetentionPolicyResource {
    provider_data: GenesysCloudProviderData,
}

impl MediaRetentionPolicyResource {
    pub fn new(provider_data: GenesysCloudProviderData) -> Self {
        Self { provider_data }
    }

    fn api(&self) -> MediaRetentionPoliciesApi<'_> {
        self.provider_data.client.recording().media_retention_policies()
    }
}

#[async_trait]
impl Resource for MediaRetentionPolicyResource {
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
        let policy = build_policy(data);
        let name = policy.name.clone().unwrap_or_default();

        tracing::info!("Creating media retention policy {}", name);
        let created = match self.api().create(&policy).await {
            Ok(created) => created,
            Err(e) => {
                return vec![Diagnostic::error(
                    format!("Failed to create media retention policy {}", name),
                    e.to_string(),
                )]
            }
        };
        let Some(id) = created.id else {
            return vec![Diagnostic::error(
                format!("Failed to create media retention policy {}", name),
                "The API response did not include an id",
            )];
        };
        data.set_id(&id);

        tracing::info!("Created media retention policy {} {}", name, id);
        self.read(ctx, data).await
    }

    async fn read(&self, ctx: Context, data: &mut ResourceData) -> Vec<Diagnostic> {
        let Some(id) = data.id().map(str::to_string) else {
            return missing_id(KIND);
        };
        tracing::debug!("Reading media retention policy {}", id);

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
                Ok(policy) => {
                    let mut observed = base.clone();
                    flatten(&mut observed, &policy);
                    check.check(&observed).map(|_| Some(observed))
                }
                Err(e) => classify_read_error(
                    format!("Failed to read media retention policy {}", id),
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

        let policy = build_policy(data);
        tracing::info!("Updating media retention policy {}", id);
        if let Err(e) = self.api().update(&id, &policy).await {
            return vec![Diagnostic::error(
                format!("Failed to update media retention policy {}", id),
                e.to_string(),
            )];
        }

        tracing::info!("Updated media retention policy {}", id);
        self.read(ctx, data).await
    }

    async fn delete(&self, ctx: Context, data: &mut ResourceData) -> Vec<Diagnostic> {
        let Some(id) = data.id().map(str::to_string) else {
            return missing_id(KIND);
        };

        tracing::info!("Deleting media retention policy {}", id);
        match self.api().delete(&id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                return vec![Diagnostic::error(
                    format!("Failed to delete media retention policy {}", id),
                    e.to_string(),
                )]
            }
        }

        let api = self.api();
        let (api, id) = (&api, id.as_str());
        confirm_deleted(&ctx, &self.provider_data.timeouts, KIND, id, move || api.get(id)).await
    }
}
