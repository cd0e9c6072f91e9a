//! Resource implementations

pub mod integration;
pub mod integration_action;
pub mod integration_credential;
pub mod media_retention_policy;

pub use integration::IntegrationResource;
pub use integration_action::IntegrationActionResource;
pub use integration_credential::IntegrationCredentialResource;
pub use media_retention_policy::MediaRetentionPolicyResource;

use std::collections::BTreeMap;
use tfplug::schema::Schema;
use tfplug::types::{AttributePath, Diagnostic, Dynamic};
use tfplug::{prepare_config, ResourceData};

use crate::registrar::Registrar;

pub fn register(registrar: &mut Registrar) {
    integration::register(registrar);
    integration_credential::register(registrar);
    integration_action::register(registrar);
    media_retention_policy::register(registrar);
}

/// Validates the planned values and fills schema defaults in place.
/// The id of an existing object is not part of the configuration.
pub(crate) fn prepare(schema: &Schema, data: &mut ResourceData) -> Result<(), Vec<Diagnostic>> {
    let mut config = data.values().clone();
    config.remove(&AttributePath::new("id"));
    let config = prepare_config(schema, config)?;
    if let Dynamic::Map(entries) = config.value {
        for (name, value) in entries {
            data.set(&name, value);
        }
    }
    Ok(())
}

pub(crate) fn missing_id(kind: &str) -> Vec<Diagnostic> {
    vec![Diagnostic::error(
        format!("Missing {} id", kind),
        "The resource has no id; it may not have been created",
    )
    .with_attribute(AttributePath::new("id"))]
}

/// Fields of the single element of a list block
pub(crate) fn block(data: &ResourceData, name: &str) -> Option<BTreeMap<String, Dynamic>> {
    data.get_list(name)
        .into_iter()
        .next()
        .and_then(|item| item.as_map().cloned())
}

pub(crate) fn block_string(block: &BTreeMap<String, Dynamic>, field: &str) -> Option<String> {
    block
        .get(field)
        .and_then(Dynamic::as_str)
        .map(str::to_string)
}

pub(crate) fn block_string_map(
    block: &BTreeMap<String, Dynamic>,
    field: &str,
) -> Option<BTreeMap<String, String>> {
    block.get(field).and_then(Dynamic::as_map).map(|entries| {
        entries
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect()
    })
}

/// Parses a JSON string attribute, reporting the path on failure
pub(crate) fn parse_json(
    path: &str,
    raw: &str,
) -> Result<serde_json::Value, Vec<Diagnostic>> {
    serde_json::from_str(raw).map_err(|e| {
        vec![Diagnostic::error(format!("Invalid JSON in {}", path), e.to_string())
            .with_attribute(AttributePath::parse(path))]
    })
}

/// Encodes an API document back into a JSON string attribute
pub(crate) fn json_string(value: &serde_json::Value) -> Dynamic {
    match serde_json::to_string(value) {
        Ok(s) => Dynamic::String(s),
        Err(_) => Dynamic::Null,
    }
}

pub(crate) fn string_map(entries: &BTreeMap<String, String>) -> Dynamic {
    Dynamic::Map(
        entries
            .iter()
            .map(|(k, v)| (k.clone(), Dynamic::String(v.clone())))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tfplug::defaults::StaticDefault;
    use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
    use tfplug::DynamicValue;

    #[test]
    fn prepare_fills_defaults_into_data() {
        let schema = SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new("state", AttributeType::String)
                    .optional()
                    .default(StaticDefault::string("DISABLED"))
                    .build(),
            )
            .build();
        let mut data = ResourceData::for_create(DynamicValue::object());

        prepare(&schema, &mut data).unwrap();

        assert_eq!(data.get_string("state").as_deref(), Some("DISABLED"));
    }

    #[test]
    fn prepare_accepts_update_of_existing_object() {
        let schema = SchemaBuilder::new()
            .attribute(AttributeBuilder::new("id", AttributeType::String).computed().build())
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .build(),
            )
            .build();
        let mut data = ResourceData::for_update(
            DynamicValue::from_json(json!({ "id": "obj-1", "name": "old" })),
            DynamicValue::from_json(json!({ "name": "new" })),
        );

        prepare(&schema, &mut data).unwrap();

        assert_eq!(data.id(), Some("obj-1"));
        assert_eq!(data.get_string("id").as_deref(), Some("obj-1"));
        assert_eq!(data.get_string("name").as_deref(), Some("new"));
    }

    #[test]
    fn block_reads_first_element() {
        let data = ResourceData::for_read(DynamicValue::from_json(json!({
            "config": [{ "name": "n", "headers": { "a": "b" } }]
        })));

        let config = block(&data, "config").unwrap();

        assert_eq!(block_string(&config, "name").as_deref(), Some("n"));
        assert_eq!(block_string_map(&config, "headers").unwrap()["a"], "b");
        assert!(block(&data, "other").is_none());
    }

    #[test]
    fn parse_json_reports_path() {
        let diags = parse_json("config.properties", "{").unwrap_err();

        assert_eq!(diags[0].summary, "Invalid JSON in config.properties");
    }
}
