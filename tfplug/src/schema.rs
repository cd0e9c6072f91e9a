//! Schema types and builders for tfplug
//!
//! This module provides the schema system for defining resource and data source
//! schemas, including attribute types, defaults and validation.

use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use std::collections::BTreeMap;
use std::sync::Arc;

/// AttributeType defines the type system for attributes
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number,
    Bool,
    /// Ordered, allows duplicates
    List(Box<AttributeType>),
    /// Unordered, no duplicates
    Set(Box<AttributeType>),
    /// String keys only
    Map(Box<AttributeType>),
    /// Fixed structure
    Object(BTreeMap<String, AttributeType>),
    /// Any structure; nested blocks whose shape the API owns
    Dynamic,
}

impl AttributeType {
    /// Shallow check that a value has this type; null and unknown always match
    pub fn accepts(&self, value: &Dynamic) -> bool {
        match (self, value) {
            (_, Dynamic::Null) | (_, Dynamic::Unknown) | (AttributeType::Dynamic, _) => true,
            (AttributeType::String, Dynamic::String(_)) => true,
            (AttributeType::Number, Dynamic::Number(_)) => true,
            (AttributeType::Bool, Dynamic::Bool(_)) => true,
            (AttributeType::List(inner), Dynamic::List(items))
            | (AttributeType::Set(inner), Dynamic::List(items)) => {
                items.iter().all(|item| inner.accepts(item))
            }
            (AttributeType::Map(inner), Dynamic::Map(entries)) => {
                entries.values().all(|item| inner.accepts(item))
            }
            (AttributeType::Object(fields), Dynamic::Map(entries)) => {
                entries.iter().all(|(key, item)| {
                    fields.get(key).map(|t| t.accepts(item)).unwrap_or(false)
                })
            }
            _ => false,
        }
    }
}

/// Schema is returned by providers, resources and data sources
/// Version is used for state migration
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: i64,
    pub description: String,
    pub attributes: Vec<Attribute>,
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Attributes the practitioner can set (required or optional)
    pub fn settable_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().filter(|a| a.is_settable())
    }

    /// Validates a configuration against required flags, types and validators
    pub fn validate(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for attr in &self.attributes {
            let path = AttributePath::new(&attr.name);
            let value = config.get(&path).cloned().unwrap_or(Dynamic::Null);

            if value.is_null() {
                if attr.required {
                    diagnostics.push(
                        Diagnostic::error(
                            "Missing required argument",
                            format!("The argument \"{}\" is required", attr.name),
                        )
                        .with_attribute(path),
                    );
                }
                continue;
            }

            if !attr.is_settable() {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid configuration",
                        format!("\"{}\" is computed and cannot be set", attr.name),
                    )
                    .with_attribute(path),
                );
                continue;
            }

            if !attr.r#type.accepts(&value) {
                diagnostics.push(
                    Diagnostic::error(
                        "Incorrect attribute value type",
                        format!(
                            "\"{}\" expects {:?}, got {}",
                            attr.name,
                            attr.r#type,
                            value.type_name()
                        ),
                    )
                    .with_attribute(path),
                );
                continue;
            }

            if attr.json_string {
                if let Some(raw) = value.as_str() {
                    if let Err(e) = serde_json::from_str::<serde_json::Value>(raw) {
                        diagnostics.push(
                            Diagnostic::error(
                                "Invalid JSON string",
                                format!("\"{}\" must be valid JSON: {}", attr.name, e),
                            )
                            .with_attribute(path.clone()),
                        );
                    }
                }
            }

            for field in &attr.nested_json {
                for raw in nested_strings(&value, field) {
                    if let Err(e) = serde_json::from_str::<serde_json::Value>(raw) {
                        diagnostics.push(
                            Diagnostic::error(
                                "Invalid JSON string",
                                format!("\"{}.{}\" must be valid JSON: {}", attr.name, field, e),
                            )
                            .with_attribute(path.clone()),
                        );
                    }
                }
            }

            for validator in &attr.validators {
                let response = validator.validate(ValidatorRequest {
                    config_value: DynamicValue::new(value.clone()),
                    path: path.clone(),
                });
                diagnostics.extend(response.diagnostics);
            }
        }

        diagnostics
    }

    /// Fills absent optional attributes from their defaults
    pub fn apply_defaults(&self, config: &mut DynamicValue) {
        for attr in &self.attributes {
            let Some(default) = &attr.default else {
                continue;
            };
            let path = AttributePath::new(&attr.name);
            let absent = config.get(&path).map(Dynamic::is_null).unwrap_or(true);
            if absent {
                let response = default.default_value(DefaultRequest { path: path.clone() });
                // Setting a top-level name on an object root cannot fail
                let _ = config.set_value(&path, response.value.value);
            }
        }
    }
}

/// String values stored under `field` in any object nested within `value`
fn nested_strings<'a>(value: &'a Dynamic, field: &str) -> Vec<&'a str> {
    match value {
        Dynamic::List(items) => items.iter().flat_map(|i| nested_strings(i, field)).collect(),
        Dynamic::Map(entries) => entries
            .get(field)
            .and_then(Dynamic::as_str)
            .into_iter()
            .collect(),
        _ => Vec::new(),
    }
}

/// Attribute represents a single configuration attribute
#[derive(Clone)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    /// Changing the value replaces the object
    pub force_new: bool,
    /// String holding a JSON document; compared semantically
    pub json_string: bool,
    /// Fields of nested objects that hold JSON strings
    pub nested_json: Vec<String>,
    pub validators: Vec<Arc<dyn Validator>>,
    pub default: Option<Arc<dyn Default>>,
    pub deprecated: bool,
}

impl Attribute {
    pub fn is_settable(&self) -> bool {
        self.required || self.optional
    }
}

// Manual Debug implementation since validators/defaults don't implement Debug
impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field("force_new", &self.force_new)
            .field("json_string", &self.json_string)
            .field("nested_json", &self.nested_json)
            .field(
                "validators",
                &format!("{} validators", self.validators.len()),
            )
            .field("default", &self.default.is_some())
            .finish()
    }
}

/// Validator performs validation on attribute values
/// Implement this for custom validation logic
pub trait Validator: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;
    /// Perform validation
    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse;
}

/// Request for validators
pub struct ValidatorRequest {
    pub config_value: DynamicValue,
    pub path: AttributePath,
}

/// Response from validators
pub struct ValidatorResponse {
    pub diagnostics: Vec<Diagnostic>,
}

/// Default provides default values for optional attributes
/// Called when attribute is not set in configuration
pub trait Default: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;
    /// Provide default value
    fn default_value(&self, request: DefaultRequest) -> DefaultResponse;
}

/// Request for default values
pub struct DefaultRequest {
    pub path: AttributePath,
}

/// Response with default value
pub struct DefaultResponse {
    pub value: DynamicValue,
}

/// AttributeBuilder provides fluent API for building attributes
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                force_new: false,
                json_string: false,
                nested_json: Vec::new(),
                validators: Vec::new(),
                default: None,
                deprecated: false,
            },
        }
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    /// Mark as sensitive (hidden)
    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    /// Mark as requiring replacement when changed
    pub fn force_new(mut self) -> Self {
        self.attribute.force_new = true;
        self
    }

    /// Mark as a JSON document held in a string
    pub fn json_string(mut self) -> Self {
        self.attribute.json_string = true;
        self
    }

    /// Names fields of nested objects that hold JSON documents
    pub fn nested_json_fields(mut self, fields: &[&str]) -> Self {
        self.attribute.nested_json = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.attribute.deprecated = true;
        self
    }

    pub fn validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.attribute.validators.push(validator);
        self
    }

    pub fn default(mut self, default: Arc<dyn Default>) -> Self {
        self.attribute.default = Some(default);
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// SchemaBuilder provides fluent API for building schemas
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                description: String::new(),
                attributes: Vec::new(),
            },
        }
    }

    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.attributes.push(attr);
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.schema.description = desc.to_string();
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}

impl std::default::Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::StaticDefault;
    use crate::validator::StringLengthValidator;
    use serde_json::json;

    fn sample_schema() -> Schema {
        SchemaBuilder::new()
            .version(1)
            .description("Test resource schema")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .validator(StringLengthValidator::between(1, 8))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("state", AttributeType::String)
                    .optional()
                    .default(StaticDefault::string("DISABLED"))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("properties", AttributeType::String)
                    .optional()
                    .json_string()
                    .build(),
            )
            .build()
    }

    #[test]
    fn attribute_builder_creates_required_string() {
        let attr = AttributeBuilder::new("name", AttributeType::String)
            .description("The name of the resource")
            .required()
            .build();

        assert_eq!(attr.name, "name");
        assert!(matches!(attr.r#type, AttributeType::String));
        assert!(attr.required);
        assert!(!attr.optional);
        assert_eq!(attr.description, "The name of the resource");
    }

    #[test]
    fn schema_builder_creates_schema_with_attributes() {
        let schema = sample_schema();

        assert_eq!(schema.version, 1);
        assert_eq!(schema.attributes.len(), 4);
        assert_eq!(schema.settable_attributes().count(), 3);
        assert_eq!(schema.description, "Test resource schema");
    }

    #[test]
    fn cloned_attribute_keeps_validators_and_default() {
        let schema = sample_schema().clone();

        assert_eq!(schema.attribute("name").unwrap().validators.len(), 1);
        assert!(schema.attribute("state").unwrap().default.is_some());
    }

    #[test]
    fn validate_reports_missing_required() {
        let diags = sample_schema().validate(&DynamicValue::from_json(json!({})));

        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].summary, "Missing required argument");
    }

    #[test]
    fn validate_runs_validators_and_json_check() {
        let config = DynamicValue::from_json(json!({
            "name": "much-too-long-name",
            "properties": "{not json"
        }));

        let diags = sample_schema().validate(&config);

        assert_eq!(diags.len(), 2);
        assert!(diags.iter().any(|d| d.summary == "Invalid JSON string"));
    }

    #[test]
    fn validate_checks_nested_json_fields() {
        let schema = SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new(
                    "config",
                    AttributeType::List(Box::new(AttributeType::Object(BTreeMap::from([(
                        "properties".to_string(),
                        AttributeType::String,
                    )])))),
                )
                .optional()
                .nested_json_fields(&["properties"])
                .build(),
            )
            .build();

        let good = json!({ "config": [{ "properties": "{\"a\":1}" }] });
        let bad = json!({ "config": [{ "properties": "{oops" }] });

        assert!(schema.validate(&DynamicValue::from_json(good)).is_empty());
        assert_eq!(schema.validate(&DynamicValue::from_json(bad)).len(), 1);
    }

    #[test]
    fn validate_rejects_computed_in_config() {
        let config = DynamicValue::from_json(json!({ "name": "ok", "id": "x" }));

        let diags = sample_schema().validate(&config);

        assert_eq!(diags.len(), 1);
        assert!(diags[0].detail.contains("computed"));
    }

    #[test]
    fn apply_defaults_only_fills_absent_values() {
        let schema = sample_schema();
        let mut absent = DynamicValue::from_json(json!({ "name": "a" }));
        let mut present = DynamicValue::from_json(json!({ "name": "a", "state": "ENABLED" }));

        schema.apply_defaults(&mut absent);
        schema.apply_defaults(&mut present);

        assert_eq!(
            absent.get_string(&AttributePath::new("state")).unwrap(),
            "DISABLED"
        );
        assert_eq!(
            present.get_string(&AttributePath::new("state")).unwrap(),
            "ENABLED"
        );
    }

    #[test]
    fn nested_attribute_type() {
        let object_type = AttributeType::Object(BTreeMap::from([
            ("host".to_string(), AttributeType::String),
            ("port".to_string(), AttributeType::Number),
        ]));

        assert!(object_type.accepts(&Dynamic::from(json!({ "host": "h", "port": 1 }))));
        assert!(!object_type.accepts(&Dynamic::from(json!({ "host": 1 }))));
        assert!(!object_type.accepts(&Dynamic::from(json!({ "other": "x" }))));
    }
}
