//! DataSource trait
//!
//! Data sources look up existing objects and populate their computed
//! attributes, including the id.

use crate::context::Context;
use crate::resource_data::ResourceData;
use crate::schema::Schema;
use crate::types::{Diagnostic, DynamicValue};
use async_trait::async_trait;

/// Base trait for data sources - implement the read operation
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Type name should be constant (e.g., "genesyscloud_integration")
    fn type_name(&self) -> &str;

    fn schema(&self) -> Schema;

    /// Called during plan to validate configuration
    async fn validate(&self, _ctx: Context, config: &DynamicValue) -> Vec<Diagnostic> {
        self.schema().validate(config)
    }

    /// Looks up the object and sets the id and attributes
    async fn read(&self, ctx: Context, data: &mut ResourceData) -> Vec<Diagnostic>;
}
