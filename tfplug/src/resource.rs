//! Resource trait
//!
//! Resources receive a [`ResourceData`] for each operation and report
//! problems as diagnostics; an empty list means success.

use crate::context::Context;
use crate::import::import_state_passthrough_id;
use crate::resource_data::ResourceData;
use crate::schema::Schema;
use crate::types::{has_errors, Diagnostic, DynamicValue};
use async_trait::async_trait;

/// Base trait for resources - implement CRUD operations
#[async_trait]
pub trait Resource: Send + Sync {
    /// Type name should be constant (e.g., "genesyscloud_integration")
    fn type_name(&self) -> &str;

    fn schema(&self) -> Schema;

    /// Called during plan to validate configuration
    async fn validate(&self, _ctx: Context, config: &DynamicValue) -> Vec<Diagnostic> {
        self.schema().validate(config)
    }

    /// Creates the object and sets the id; values must reflect the
    /// remote object afterwards
    async fn create(&self, ctx: Context, data: &mut ResourceData) -> Vec<Diagnostic>;

    /// Refreshes values from the remote object; clears the id when the
    /// object no longer exists
    async fn read(&self, ctx: Context, data: &mut ResourceData) -> Vec<Diagnostic>;

    async fn update(&self, ctx: Context, data: &mut ResourceData) -> Vec<Diagnostic>;

    /// Deletes the object and returns once it is confirmed gone
    async fn delete(&self, ctx: Context, data: &mut ResourceData) -> Vec<Diagnostic>;

    /// Builds the data a subsequent read starts from
    async fn import_state(&self, ctx: Context, id: &str) -> Result<ResourceData, Vec<Diagnostic>> {
        import_state_passthrough_id(&ctx, id)
    }
}

/// Validates configuration and fills defaults ahead of create or update
pub fn prepare_config(
    schema: &Schema,
    mut config: DynamicValue,
) -> Result<DynamicValue, Vec<Diagnostic>> {
    let diagnostics = schema.validate(&config);
    if has_errors(&diagnostics) {
        return Err(diagnostics);
    }
    schema.apply_defaults(&mut config);
    Ok(config)
}
