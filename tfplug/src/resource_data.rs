//! Working copy of a resource's attributes during one operation
//!
//! `ResourceData` holds the values a resource operation reads and writes,
//! the prior state (for updates) and, after a create or update, the
//! declared configuration the remote object is expected to converge to.

use crate::types::{AttributePath, Dynamic, DynamicValue};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct ResourceData {
    id: Option<String>,
    values: DynamicValue,
    prior: Option<DynamicValue>,
    intent: Option<DynamicValue>,
}

impl ResourceData {
    /// Data for a create: values start as the planned configuration
    pub fn for_create(config: DynamicValue) -> Self {
        Self {
            id: None,
            values: object_or_empty(config.clone()),
            prior: None,
            intent: Some(config),
        }
    }

    /// Data for an update of an existing object
    pub fn for_update(prior_state: DynamicValue, config: DynamicValue) -> Self {
        let id = id_of(&prior_state);
        let mut data = Self {
            id: None,
            values: object_or_empty(config.clone()),
            prior: Some(prior_state),
            intent: Some(config),
        };
        if let Some(id) = id {
            data.set_id(id);
        }
        data
    }

    /// Data for a refresh of existing state; no declared intent
    pub fn for_read(state: DynamicValue) -> Self {
        Self {
            id: id_of(&state),
            values: object_or_empty(state),
            prior: None,
            intent: None,
        }
    }

    pub fn for_delete(state: DynamicValue) -> Self {
        Self::for_read(state)
    }

    /// Data holding only the identifier supplied to an import
    pub fn for_import(id: impl Into<String>) -> Self {
        let mut data = Self::for_read(DynamicValue::object());
        data.set_id(id);
        data
    }

    /// Data for a data source lookup
    pub fn for_data_source(config: DynamicValue) -> Self {
        Self {
            id: None,
            values: object_or_empty(config),
            prior: None,
            intent: None,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        let id = id.into();
        self.set_string("id", id.clone());
        self.id = Some(id);
    }

    /// Marks the object as gone; the state will be dropped
    pub fn clear_id(&mut self) {
        self.id = None;
        self.set_null("id");
    }

    /// Configuration declared by the last create or update, if any
    pub fn intent(&self) -> Option<&DynamicValue> {
        self.intent.as_ref()
    }

    pub fn prior(&self) -> Option<&DynamicValue> {
        self.prior.as_ref()
    }

    pub fn values(&self) -> &DynamicValue {
        &self.values
    }

    /// Resulting state, or `None` when the object no longer exists
    pub fn into_state(self) -> Option<DynamicValue> {
        self.id.map(|_| self.values)
    }

    pub fn get(&self, name: &str) -> Option<&Dynamic> {
        self.values
            .get(&AttributePath::new(name))
            .filter(|v| !v.is_null())
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        self.get(name).and_then(Dynamic::as_str).map(str::to_string)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some(Dynamic::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn get_number(&self, name: &str) -> Option<f64> {
        match self.get(name) {
            Some(Dynamic::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get_number(name).map(|n| n as i64)
    }

    pub fn get_list(&self, name: &str) -> Vec<Dynamic> {
        match self.get(name) {
            Some(Dynamic::List(items)) => items.clone(),
            _ => Vec::new(),
        }
    }

    pub fn get_map(&self, name: &str) -> BTreeMap<String, Dynamic> {
        match self.get(name) {
            Some(Dynamic::Map(entries)) => entries.clone(),
            _ => BTreeMap::new(),
        }
    }

    pub fn set(&mut self, name: &str, value: Dynamic) {
        if let Dynamic::Map(entries) = self.root_mut() {
            entries.insert(name.to_string(), value);
        }
    }

    pub fn set_string(&mut self, name: &str, value: impl Into<String>) {
        self.set(name, Dynamic::String(value.into()));
    }

    /// Sets the string, or null when `None`
    pub fn set_optional_string(&mut self, name: &str, value: Option<String>) {
        self.set(name, value.map(Dynamic::String).unwrap_or(Dynamic::Null));
    }

    pub fn set_bool(&mut self, name: &str, value: bool) {
        self.set(name, Dynamic::Bool(value));
    }

    pub fn set_int(&mut self, name: &str, value: i64) {
        self.set(name, Dynamic::Number(value as f64));
    }

    pub fn set_null(&mut self, name: &str) {
        self.set(name, Dynamic::Null);
    }

    /// True when the attribute differs from the prior state
    pub fn has_change(&self, name: &str) -> bool {
        let path = AttributePath::new(name);
        let current = self.values.get(&path).unwrap_or(&Dynamic::Null);
        match &self.prior {
            Some(prior) => prior.get(&path).unwrap_or(&Dynamic::Null) != current,
            None => !current.is_null(),
        }
    }

    fn root_mut(&mut self) -> &mut Dynamic {
        if !matches!(self.values.value, Dynamic::Map(_)) {
            self.values.value = Dynamic::Map(BTreeMap::new());
        }
        &mut self.values.value
    }
}

fn object_or_empty(value: DynamicValue) -> DynamicValue {
    match value.value {
        Dynamic::Map(_) => value,
        _ => DynamicValue::object(),
    }
}

fn id_of(state: &DynamicValue) -> Option<String> {
    state
        .get(&AttributePath::new("id"))
        .and_then(Dynamic::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}
