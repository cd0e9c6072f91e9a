//! Per-type export settings
//!
//! A [`ResourceExporter`] tells the export engine how to enumerate a
//! resource type and how to rewrite attributes that refer to other objects.

use futures::future::BoxFuture;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tfplug::types::Diagnostic;
use tfplug::Context;

use crate::api::Client;

/// Display metadata of one exported object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceMeta {
    pub name: String,
}

impl ResourceMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Object id to metadata
pub type ResourceIdMetaMap = BTreeMap<String, ResourceMeta>;

/// Enumerates every object of one type
pub type GetAllResourcesFn =
    fn(Context, Client) -> BoxFuture<'static, Result<ResourceIdMetaMap, Diagnostic>>;

/// Target of an attribute holding another object's id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefAttrSettings {
    pub ref_type: String,
    /// Values that are kept verbatim rather than resolved
    pub alt_values: Vec<String>,
}

impl RefAttrSettings {
    pub fn new(ref_type: &str) -> Self {
        Self {
            ref_type: ref_type.to_string(),
            alt_values: Vec::new(),
        }
    }

    pub fn with_alt_values(mut self, values: &[&str]) -> Self {
        self.alt_values = values.iter().map(|v| v.to_string()).collect();
        self
    }
}

/// An id reference stored inside a JSON-encoded attribute
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct JsonEncodeRefAttr {
    /// Dotted path to the JSON string attribute
    pub attr: String,
    /// Dotted path inside the decoded document
    pub nested_attr: String,
}

#[derive(Clone)]
pub struct ResourceExporter {
    pub get_resources: GetAllResourcesFn,
    /// Dotted attribute path to reference target; `*` matches every map value
    pub ref_attrs: BTreeMap<String, RefAttrSettings>,
    /// JSON string attributes emitted as normalized documents
    pub json_encode_attributes: Vec<String>,
    pub encoded_ref_attrs: BTreeMap<JsonEncodeRefAttr, RefAttrSettings>,
    /// Attributes the API never returns; exported as variables
    pub unresolvable_attributes: Vec<String>,
    /// Attributes kept even when zero, false or empty
    pub allow_zero_values: Vec<String>,
    /// Block path to child attributes; a block holding none of them is
    /// dropped, and for the empty path the whole object is skipped
    pub remove_if_missing: BTreeMap<String, Vec<String>>,
}

impl ResourceExporter {
    pub fn new(get_resources: GetAllResourcesFn) -> Self {
        Self {
            get_resources,
            ref_attrs: BTreeMap::new(),
            json_encode_attributes: Vec::new(),
            encoded_ref_attrs: BTreeMap::new(),
            unresolvable_attributes: Vec::new(),
            allow_zero_values: Vec::new(),
            remove_if_missing: BTreeMap::new(),
        }
    }

    pub fn ref_attr(mut self, path: &str, settings: RefAttrSettings) -> Self {
        self.ref_attrs.insert(path.to_string(), settings);
        self
    }

    pub fn json_encode_attributes(mut self, attrs: &[&str]) -> Self {
        self.json_encode_attributes = attrs.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn encoded_ref_attr(
        mut self,
        attr: &str,
        nested_attr: &str,
        settings: RefAttrSettings,
    ) -> Self {
        self.encoded_ref_attrs.insert(
            JsonEncodeRefAttr {
                attr: attr.to_string(),
                nested_attr: nested_attr.to_string(),
            },
            settings,
        );
        self
    }

    pub fn unresolvable_attributes(mut self, attrs: &[&str]) -> Self {
        self.unresolvable_attributes = attrs.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn allow_zero_values(mut self, attrs: &[&str]) -> Self {
        self.allow_zero_values = attrs.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn remove_if_missing(mut self, block: &str, attrs: &[&str]) -> Self {
        self.remove_if_missing
            .insert(block.to_string(), attrs.iter().map(|a| a.to_string()).collect());
        self
    }

    pub fn ref_settings(&self, path: &str) -> Option<&RefAttrSettings> {
        self.ref_attrs.get(path)
    }

    pub fn allows_zero_value(&self, path: &str) -> bool {
        self.allow_zero_values.iter().any(|a| a == path)
    }
}

/// Turns an object name into a valid resource label
pub fn sanitize_label(name: &str) -> String {
    static INVALID: OnceLock<Regex> = OnceLock::new();
    let invalid =
        INVALID.get_or_init(|| Regex::new(r"[^A-Za-z0-9_-]+").expect("Invalid regex pattern"));

    let label = invalid.replace_all(name.trim(), "_");
    let label = label.trim_matches('_');
    if label.is_empty() {
        return "unnamed".to_string();
    }
    match label.chars().next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => label.to_string(),
        _ => format!("_{}", label),
    }
}
