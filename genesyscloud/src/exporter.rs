//! Export of existing objects as a `.tf.json` document
//!
//! Every registered [`ResourceExporter`] enumerates its objects, each object
//! is read through its resource, and the settable attributes are rewritten:
//! references to other exported objects become interpolations, values the
//! API never returns become variables, and empty values are dropped.

use futures::stream::{self, StreamExt};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use tfplug::schema::Schema;
use tfplug::types::{Diagnostic, DynamicValue};
use tfplug::{Context, ResourceData};

use crate::provider_data::GenesysCloudProviderData;
use crate::registrar::{Registrar, ResourceRegistration};
use crate::resource_exporter::{sanitize_label, RefAttrSettings, ResourceExporter, ResourceMeta};

pub const PROVIDER_SOURCE: &str = "mypurecloud/genesyscloud";

const MAX_CONCURRENT_READS: usize = 8;

/// Resource type to object id to label
type Labels = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug)]
struct ExportedObject {
    id: String,
    meta: ResourceMeta,
    attributes: Map<String, Value>,
}

pub struct Exporter<'a> {
    registrar: &'a Registrar,
    provider_data: GenesysCloudProviderData,
    resource_types: Option<BTreeSet<String>>,
}

impl<'a> Exporter<'a> {
    pub fn new(registrar: &'a Registrar, provider_data: GenesysCloudProviderData) -> Self {
        Self {
            registrar,
            provider_data,
            resource_types: None,
        }
    }

    /// Limits the export to the given resource types
    pub fn with_resource_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resource_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    fn selected(&self) -> impl Iterator<Item = (&'a str, &'a ResourceExporter)> + '_ {
        self.registrar.exporters().filter(move |(type_name, _)| {
            self.resource_types
                .as_ref()
                .map_or(true, |types| types.contains(*type_name))
        })
    }

    pub async fn export(&self, ctx: &Context) -> Result<Value, Diagnostic> {
        let mut exported: BTreeMap<String, Vec<ExportedObject>> = BTreeMap::new();
        for (type_name, exporter) in self.selected() {
            let objects = self.read_all(ctx, type_name, exporter).await?;
            tracing::info!("Exporting {} {} objects", objects.len(), type_name);
            exported.insert(type_name.to_string(), objects);
        }

        let labels = assign_labels(&exported);
        let mut resources = Map::new();
        let mut variables = Map::new();

        for (type_name, objects) in exported {
            let (Some(exporter), Some(registration)) = (
                self.registrar.exporter(&type_name),
                self.registrar.resource(&type_name),
            ) else {
                continue;
            };
            let schema = (registration.schema)();

            let mut blocks = Map::new();
            for object in objects {
                let Some(label) = labels.get(&type_name).and_then(|l| l.get(&object.id)) else {
                    continue;
                };
                let mut attributes = Value::Object(object.attributes);

                for attr in &exporter.unresolvable_attributes {
                    let var_name = format!("{}_{}_{}", type_name, label, attr);
                    if let Value::Object(map) = &mut attributes {
                        map.insert(attr.clone(), Value::String(format!("${{var.{}}}", var_name)));
                    }
                    let description = format!("{} of {} {}", attr, type_name, object.meta.name);
                    variables.insert(
                        var_name,
                        json!({
                            "description": description,
                            "sensitive": schema.attribute(attr).map_or(false, |a| a.sensitive),
                        }),
                    );
                }

                for attr in &exporter.json_encode_attributes {
                    walk_mut(&mut attributes, &segments(attr), &mut normalize_json);
                }

                for (path, settings) in &exporter.ref_attrs {
                    walk_mut(&mut attributes, &segments(path), &mut |value: &mut Value| {
                        resolve_refs(value, settings, &labels)
                    });
                }

                for (encoded, settings) in &exporter.encoded_ref_attrs {
                    let nested = segments(&encoded.nested_attr);
                    walk_mut(&mut attributes, &segments(&encoded.attr), &mut |value: &mut Value| {
                        resolve_encoded_refs(value, &nested, settings, &labels)
                    });
                }

                if let Value::Object(map) = &mut attributes {
                    remove_zero_values(map, "", exporter);
                }
                for (block, children) in &exporter.remove_if_missing {
                    if block.is_empty() {
                        continue;
                    }
                    walk_mut(&mut attributes, &segments(block), &mut |value: &mut Value| {
                        let missing =
                            matches!(value, Value::Object(map) if !has_any(map, children));
                        if missing {
                            *value = Value::Null;
                        }
                    });
                }
                if let Value::Object(map) = &mut attributes {
                    remove_zero_values(map, "", exporter);
                }

                blocks.insert(label.clone(), attributes);
            }

            if !blocks.is_empty() {
                resources.insert(type_name, Value::Object(blocks));
            }
        }

        let mut document = json!({
            "terraform": {
                "required_providers": {
                    "genesyscloud": { "source": PROVIDER_SOURCE }
                }
            },
            "resource": resources,
        });
        if !variables.is_empty() {
            document["variable"] = Value::Object(variables);
        }
        Ok(document)
    }

    /// Enumerates one type and reads every object, skipping those that
    /// disappeared in between
    async fn read_all(
        &self,
        ctx: &Context,
        type_name: &str,
        exporter: &ResourceExporter,
    ) -> Result<Vec<ExportedObject>, Diagnostic> {
        let registration = self.registrar.resource(type_name).ok_or_else(|| {
            Diagnostic::error(
                format!("Cannot export {}", type_name),
                "No resource is registered for this exporter",
            )
        })?;
        let found = (exporter.get_resources)(ctx.clone(), self.provider_data.client.clone()).await?;
        tracing::debug!("Found {} {} objects", found.len(), type_name);

        let results: Vec<Result<Option<ExportedObject>, Diagnostic>> = stream::iter(found)
            .map(|(id, meta)| self.read_one(ctx, type_name, registration, exporter, id, meta))
            .buffer_unordered(MAX_CONCURRENT_READS)
            .collect()
            .await;

        let mut objects = Vec::new();
        for result in results {
            if let Some(object) = result? {
                objects.push(object);
            }
        }
        objects.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(objects)
    }

    async fn read_one(
        &self,
        ctx: &Context,
        type_name: &str,
        registration: &ResourceRegistration,
        exporter: &ResourceExporter,
        id: String,
        meta: ResourceMeta,
    ) -> Result<Option<ExportedObject>, Diagnostic> {
        let resource = (registration.factory)(self.provider_data.clone());
        let mut data = ResourceData::for_read(DynamicValue::from_json(json!({ "id": id })));

        let diags = resource.read(ctx.clone(), &mut data).await;
        if let Some(err) = diags.into_iter().find(|d| d.is_error()) {
            return Err(err);
        }
        if data.id().is_none() {
            tracing::warn!("{} {} no longer exists, skipping", type_name, id);
            return Ok(None);
        }

        let mut attributes = settable_attributes((registration.schema)(), &data);
        remove_zero_values(&mut attributes, "", exporter);
        if let Some(children) = exporter.remove_if_missing.get("") {
            if !has_any(&attributes, children) {
                tracing::warn!(
                    "Skipping {} {}: none of {} are set",
                    type_name,
                    id,
                    children.join(", ")
                );
                return Ok(None);
            }
        }

        Ok(Some(ExportedObject {
            id,
            meta,
            attributes,
        }))
    }
}

fn settable_attributes(schema: &Schema, data: &ResourceData) -> Map<String, Value> {
    schema
        .settable_attributes()
        .filter_map(|attr| {
            data.get(&attr.name)
                .map(|value| (attr.name.clone(), Value::from(value)))
        })
        .collect()
}

/// Labels are unique per type; a clash gets the id prefix appended
fn assign_labels(exported: &BTreeMap<String, Vec<ExportedObject>>) -> Labels {
    exported
        .iter()
        .map(|(type_name, objects)| {
            let mut used = BTreeSet::new();
            let mut by_id = BTreeMap::new();
            for object in objects {
                let label = sanitize_label(&object.meta.name);
                let label = if used.contains(&label) {
                    let prefix: String = object.id.chars().take(8).collect();
                    let suffixed = sanitize_label(&format!("{}_{}", label, prefix));
                    let mut candidate = suffixed.clone();
                    let mut counter = 2;
                    while used.contains(&candidate) {
                        candidate = format!("{}_{}", suffixed, counter);
                        counter += 1;
                    }
                    candidate
                } else {
                    label
                };
                used.insert(label.clone());
                by_id.insert(object.id.clone(), label);
            }
            (type_name.clone(), by_id)
        })
        .collect()
}

fn segments(path: &str) -> Vec<&str> {
    path.split('.').filter(|s| !s.is_empty()).collect()
}

/// Applies `f` to every value at `path`; lists are walked through and `*`
/// matches every value of a map
fn walk_mut<F>(value: &mut Value, path: &[&str], f: &mut F)
where
    F: FnMut(&mut Value),
{
    let Some((segment, rest)) = path.split_first() else {
        f(value);
        return;
    };
    match value {
        Value::Array(items) => {
            for item in items {
                walk_mut(item, path, f);
            }
        }
        Value::Object(map) if *segment == "*" => {
            for child in map.values_mut() {
                walk_mut(child, rest, f);
            }
        }
        Value::Object(map) => {
            if let Some(child) = map.get_mut(*segment) {
                walk_mut(child, rest, f);
            }
        }
        _ => {}
    }
}

fn resolve_ref(id: &str, settings: &RefAttrSettings, labels: &Labels) -> Option<String> {
    if settings.alt_values.iter().any(|alt| alt == id) {
        return Some(id.to_string());
    }
    match labels.get(&settings.ref_type) {
        Some(exported) => exported
            .get(id)
            .map(|label| format!("${{{}.{}.id}}", settings.ref_type, label)),
        None => Some(id.to_string()),
    }
}

/// Ids of an exported type that were not exported are dropped
fn resolve_refs(value: &mut Value, settings: &RefAttrSettings, labels: &Labels) {
    match value {
        Value::String(id) => {
            let resolved = resolve_ref(id, settings, labels);
            *value = resolved.map(Value::String).unwrap_or(Value::Null);
        }
        Value::Array(items) => {
            let resolved = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(id) => resolve_ref(id, settings, labels).map(Value::String),
                    other => Some(other.clone()),
                })
                .collect();
            *items = resolved;
        }
        _ => {}
    }
}

fn resolve_encoded_refs(
    value: &mut Value,
    nested: &[&str],
    settings: &RefAttrSettings,
    labels: &Labels,
) {
    let Value::String(raw) = value else {
        return;
    };
    let Ok(mut document) = serde_json::from_str::<Value>(raw) else {
        tracing::warn!("Skipping reference resolution in invalid JSON attribute");
        return;
    };
    walk_mut(&mut document, nested, &mut |inner: &mut Value| resolve_refs(inner, settings, labels));
    *raw = document.to_string();
}

fn normalize_json(value: &mut Value) {
    if let Value::String(raw) = value {
        if let Ok(document) = serde_json::from_str::<Value>(raw) {
            *raw = document.to_string();
        }
    }
}

fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items
            .iter()
            .all(|item| item.is_null() || item.as_object().is_some_and(Map::is_empty)),
        Value::Object(map) => map.is_empty(),
    }
}

/// Drops zero, false and empty values depth first, keeping paths listed in
/// `allow_zero_values`
fn remove_zero_values(map: &mut Map<String, Value>, prefix: &str, exporter: &ResourceExporter) {
    let keys: Vec<String> = map.keys().cloned().collect();
    for key in keys {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        let Some(value) = map.get_mut(&key) else {
            continue;
        };
        remove_nested_zero_values(value, &path, exporter);
        if is_zero(value) && !(exporter.allows_zero_value(&path) && !value.is_null()) {
            map.remove(&key);
        }
    }
}

fn remove_nested_zero_values(value: &mut Value, path: &str, exporter: &ResourceExporter) {
    match value {
        Value::Object(map) => remove_zero_values(map, path, exporter),
        Value::Array(items) => {
            for item in items {
                remove_nested_zero_values(item, path, exporter);
            }
        }
        _ => {}
    }
}

fn has_any(map: &Map<String, Value>, children: &[String]) -> bool {
    children
        .iter()
        .any(|child| map.get(child).is_some_and(|v| !is_zero(v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Client;
    use crate::resource_exporter::ResourceIdMetaMap;
    use futures::future::BoxFuture;

    fn no_resources(
        _ctx: Context,
        _client: Client,
    ) -> BoxFuture<'static, Result<ResourceIdMetaMap, Diagnostic>> {
        Box::pin(async { Ok(ResourceIdMetaMap::new()) })
    }

    fn labels() -> Labels {
        let mut integrations = BTreeMap::new();
        integrations.insert("int-1".to_string(), "Data_Actions".to_string());
        let mut labels = Labels::new();
        labels.insert("genesyscloud_integration".to_string(), integrations);
        labels
    }

    fn object(id: &str, name: &str) -> ExportedObject {
        ExportedObject {
            id: id.to_string(),
            meta: ResourceMeta::new(name),
            attributes: Map::new(),
        }
    }

    #[test]
    fn exported_reference_becomes_interpolation() {
        let settings = RefAttrSettings::new("genesyscloud_integration");

        assert_eq!(
            resolve_ref("int-1", &settings, &labels()).as_deref(),
            Some("${genesyscloud_integration.Data_Actions.id}")
        );
        assert_eq!(resolve_ref("int-2", &settings, &labels()), None);
    }

    #[test]
    fn alt_values_and_foreign_types_are_kept() {
        let queues = RefAttrSettings::new("genesyscloud_routing_queue").with_alt_values(&["*"]);
        let mut value = json!(["*", "queue-1"]);

        resolve_refs(&mut value, &queues, &labels());

        assert_eq!(value, json!(["*", "queue-1"]));
    }

    #[test]
    fn wildcard_walks_map_values_through_lists() {
        let mut value = json!({
            "config": [{ "credentials": { "basicAuth": "int-1", "other": "int-9" } }]
        });
        let settings = RefAttrSettings::new("genesyscloud_integration");

        walk_mut(&mut value, &segments("config.credentials.*"), &mut |v: &mut Value| {
            resolve_refs(v, &settings, &labels())
        });

        assert_eq!(
            value["config"][0]["credentials"]["basicAuth"],
            "${genesyscloud_integration.Data_Actions.id}"
        );
        assert!(value["config"][0]["credentials"]["other"].is_null());
    }

    #[test]
    fn encoded_references_are_resolved_inside_the_document() {
        let mut value = json!("{\"groups\": [\"int-1\", \"int-7\"], \"name\": \"x\"}");
        let settings = RefAttrSettings::new("genesyscloud_integration");

        resolve_encoded_refs(&mut value, &["groups"], &settings, &labels());

        let document: Value = serde_json::from_str(value.as_str().unwrap()).unwrap();
        assert_eq!(
            document,
            json!({ "groups": ["${genesyscloud_integration.Data_Actions.id}"], "name": "x" })
        );
    }

    #[test]
    fn zero_values_are_dropped_unless_allowed() {
        let exporter = ResourceExporter::new(no_resources).allow_zero_values(&["order"]);
        let mut map = json!({
            "order": 0,
            "enabled": false,
            "description": "",
            "conditions": [{ "for_queue_ids": [], "date_ranges": ["2024-01-01"] }],
            "actions": [{ "retain_recording": false }]
        })
        .as_object()
        .cloned()
        .unwrap();

        remove_zero_values(&mut map, "", &exporter);

        assert_eq!(
            Value::Object(map),
            json!({ "order": 0, "conditions": [{ "date_ranges": ["2024-01-01"] }] })
        );
    }

    #[test]
    fn colliding_names_get_id_suffix() {
        let mut exported = BTreeMap::new();
        exported.insert(
            "genesyscloud_integration".to_string(),
            vec![object("aaaa1111-x", "Web Services"), object("bbbb2222-y", "Web Services")],
        );

        let labels = assign_labels(&exported);
        let integrations = &labels["genesyscloud_integration"];

        assert_eq!(integrations["aaaa1111-x"], "Web_Services");
        assert_eq!(integrations["bbbb2222-y"], "Web_Services_bbbb2222");
    }

    #[test]
    fn suffixed_label_never_reuses_a_taken_label() {
        let mut exported = BTreeMap::new();
        exported.insert(
            "genesyscloud_integration".to_string(),
            vec![object("aaaa", "x_cccc"), object("bbbb", "x"), object("cccc", "x")],
        );

        let labels = assign_labels(&exported);
        let integrations = &labels["genesyscloud_integration"];

        assert_eq!(integrations["aaaa"], "x_cccc");
        assert_eq!(integrations["bbbb"], "x");
        assert_eq!(integrations["cccc"], "x_cccc_2");
    }

    #[test]
    fn json_attributes_are_normalized() {
        let mut value = json!("{ \"b\": 1,\n \"a\": 2 }");

        normalize_json(&mut value);

        assert_eq!(value, json!("{\"a\":2,\"b\":1}"));
    }
}
