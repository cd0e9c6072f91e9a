//! Registry of resource types, data sources and exporters
//!
//! Each resource family adds itself through its `register` function when
//! the provider is built; the registry is read-only afterwards.

use std::collections::BTreeMap;
use tfplug::schema::Schema;
use tfplug::{DataSource, Resource};

use crate::provider_data::GenesysCloudProviderData;
use crate::resource_exporter::ResourceExporter;

pub type ResourceFactory = fn(GenesysCloudProviderData) -> Box<dyn Resource>;
pub type DataSourceFactory = fn(GenesysCloudProviderData) -> Box<dyn DataSource>;

#[derive(Clone, Copy)]
pub struct ResourceRegistration {
    pub schema: fn() -> &'static Schema,
    pub factory: ResourceFactory,
}

#[derive(Clone, Copy)]
pub struct DataSourceRegistration {
    pub schema: fn() -> &'static Schema,
    pub factory: DataSourceFactory,
}

#[derive(Default, Clone)]
pub struct Registrar {
    resources: BTreeMap<String, ResourceRegistration>,
    data_sources: BTreeMap<String, DataSourceRegistration>,
    exporters: BTreeMap<String, ResourceExporter>,
}

impl Registrar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_resource(&mut self, type_name: &str, registration: ResourceRegistration) {
        if self
            .resources
            .insert(type_name.to_string(), registration)
            .is_some()
        {
            tracing::warn!("Resource {} registered twice", type_name);
        }
    }

    pub fn register_data_source(&mut self, type_name: &str, registration: DataSourceRegistration) {
        if self
            .data_sources
            .insert(type_name.to_string(), registration)
            .is_some()
        {
            tracing::warn!("Data source {} registered twice", type_name);
        }
    }

    pub fn register_exporter(&mut self, type_name: &str, exporter: ResourceExporter) {
        if self
            .exporters
            .insert(type_name.to_string(), exporter)
            .is_some()
        {
            tracing::warn!("Exporter {} registered twice", type_name);
        }
    }

    pub fn resource(&self, type_name: &str) -> Option<&ResourceRegistration> {
        self.resources.get(type_name)
    }

    pub fn data_source(&self, type_name: &str) -> Option<&DataSourceRegistration> {
        self.data_sources.get(type_name)
    }

    pub fn exporter(&self, type_name: &str) -> Option<&ResourceExporter> {
        self.exporters.get(type_name)
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    pub fn data_source_types(&self) -> impl Iterator<Item = &str> {
        self.data_sources.keys().map(String::as_str)
    }

    pub fn exporters(&self) -> impl Iterator<Item = (&str, &ResourceExporter)> {
        self.exporters.iter().map(|(k, v)| (k.as_str(), v))
    }
}
