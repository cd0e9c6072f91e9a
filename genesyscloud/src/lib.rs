pub mod api;
pub mod config;
pub mod consistency_checker;
pub mod data_sources;
pub mod exporter;
pub mod provider_data;
pub mod registrar;
pub mod resource_exporter;
pub mod resources;
pub mod util;

use async_trait::async_trait;
use serde_json::Value;
use tfplug::types::{Diagnostic, DynamicValue};
use tfplug::{prepare_config, Context, DataSource, Provider, Resource, Schema, TfplugError};

use crate::config::ProviderConfig;
use crate::exporter::Exporter;
use crate::provider_data::{GenesysCloudProviderData, RetryTimeouts};
use crate::registrar::Registrar;

pub const PROVIDER_NAME: &str = "genesyscloud";

/// Registry holding every resource, data source and exporter
pub fn registrar() -> Registrar {
    let mut registrar = Registrar::new();
    resources::register(&mut registrar);
    data_sources::register(&mut registrar);
    registrar
}

pub struct GenesysCloudProvider {
    registrar: Registrar,
    timeouts: RetryTimeouts,
    provider_data: Option<GenesysCloudProviderData>,
}

impl Default for GenesysCloudProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl GenesysCloudProvider {
    pub fn new() -> Self {
        Self {
            registrar: registrar(),
            timeouts: RetryTimeouts::default(),
            provider_data: None,
        }
    }

    /// Timing handed to every resource once configured
    pub fn with_timeouts(mut self, timeouts: RetryTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn registrar(&self) -> &Registrar {
        &self.registrar
    }

    pub fn provider_data(&self) -> Option<&GenesysCloudProviderData> {
        self.provider_data.as_ref()
    }

    /// Exports every object of `resource_types`, or of all exportable types
    /// when empty
    pub async fn export(
        &self,
        ctx: &Context,
        resource_types: &[String],
    ) -> Result<Value, Diagnostic> {
        let provider_data = self.provider_data.clone().ok_or_else(|| {
            Diagnostic::error("Provider not configured", "configure must succeed before exporting")
        })?;

        let mut exporter = Exporter::new(&self.registrar, provider_data);
        if !resource_types.is_empty() {
            exporter = exporter.with_resource_types(resource_types.iter().cloned());
        }
        exporter.export(ctx).await
    }

    fn configured(&self) -> tfplug::Result<&GenesysCloudProviderData> {
        self.provider_data
            .as_ref()
            .ok_or(TfplugError::ProviderNotConfigured)
    }
}

fn create_client(settings: &ProviderConfig) -> Result<api::Client, Diagnostic> {
    let base_url = settings.base_url()?;
    let credentials = settings.credentials()?;
    api::Client::new(&base_url, credentials)
        .map_err(|e| Diagnostic::error("Failed to create API client", e.to_string()))
}

#[async_trait]
impl Provider for GenesysCloudProvider {
    fn type_name(&self) -> &str {
        PROVIDER_NAME
    }

    fn schema(&self) -> Schema {
        config::provider_schema()
    }

    async fn configure(&mut self, _ctx: Context, config: DynamicValue) -> Vec<Diagnostic> {
        let config = match prepare_config(&config::provider_schema(), config) {
            Ok(config) => config,
            Err(diags) => return diags,
        };
        let settings = ProviderConfig::from_config(&config);
        tracing::debug!(?settings, "Configuring provider");

        match create_client(&settings) {
            Ok(client) => {
                tracing::info!("Configured provider for {}", client.base_url());
                self.provider_data = Some(
                    GenesysCloudProviderData::new(client)
                        .with_timeouts(self.timeouts)
                        .with_bypass_consistency_checker(settings.bypass_consistency_checker),
                );
                vec![]
            }
            Err(diag) => vec![diag],
        }
    }

    fn resource_types(&self) -> Vec<String> {
        self.registrar.resource_types().map(str::to_string).collect()
    }

    fn data_source_types(&self) -> Vec<String> {
        self.registrar.data_source_types().map(str::to_string).collect()
    }

    fn create_resource(&self, type_name: &str) -> tfplug::Result<Box<dyn Resource>> {
        let registration = self
            .registrar
            .resource(type_name)
            .ok_or_else(|| TfplugError::ResourceNotFound(type_name.to_string()))?;
        Ok((registration.factory)(self.configured()?.clone()))
    }

    fn create_data_source(&self, type_name: &str) -> tfplug::Result<Box<dyn DataSource>> {
        let registration = self
            .registrar
            .data_source(type_name)
            .ok_or_else(|| TfplugError::DataSourceNotFound(type_name.to_string()))?;
        Ok((registration.factory)(self.configured()?.clone()))
    }
}
