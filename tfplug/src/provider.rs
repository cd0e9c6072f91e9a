//! Provider trait
//!
//! A provider is configured once and then hands out configured resource
//! and data source instances by type name.

use crate::context::Context;
use crate::data_source::DataSource;
use crate::error::Result;
use crate::resource::Resource;
use crate::schema::Schema;
use crate::types::{Diagnostic, DynamicValue};
use async_trait::async_trait;

#[async_trait]
pub trait Provider: Send + Sync {
    /// Prefix shared by every resource type name
    fn type_name(&self) -> &str;

    /// Schema of the provider configuration block
    fn schema(&self) -> Schema;

    /// Configure must succeed before resources are created
    async fn configure(&mut self, ctx: Context, config: DynamicValue) -> Vec<Diagnostic>;

    fn resource_types(&self) -> Vec<String>;

    fn data_source_types(&self) -> Vec<String>;

    /// Returns a resource bound to the configured client
    fn create_resource(&self, type_name: &str) -> Result<Box<dyn Resource>>;

    /// Returns a data source bound to the configured client
    fn create_data_source(&self, type_name: &str) -> Result<Box<dyn DataSource>>;
}
