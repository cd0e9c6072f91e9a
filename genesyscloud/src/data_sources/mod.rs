//! Data source implementations
//!
//! Every data source selects one object by exact name and sets its id.

pub mod integration;
pub mod integration_action;
pub mod integration_credential;
pub mod media_retention_policy;

pub use integration::IntegrationDataSource;
pub use integration_action::IntegrationActionDataSource;
pub use integration_credential::IntegrationCredentialDataSource;
pub use media_retention_policy::MediaRetentionPolicyDataSource;

use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic};
use tfplug::ResourceData;

use crate::registrar::Registrar;

pub fn register(registrar: &mut Registrar) {
    integration::register(registrar);
    integration_credential::register(registrar);
    integration_action::register(registrar);
    media_retention_policy::register(registrar);
}

/// `name` to look up and the computed `id`
pub(crate) fn name_lookup_schema(description: &str, name_description: &str) -> Schema {
    SchemaBuilder::new()
        .description(description)
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .required()
                .description(name_description)
                .build(),
        )
        .build()
}

pub(crate) fn required_name(data: &ResourceData) -> Result<String, Vec<Diagnostic>> {
    data.get_string("name").ok_or_else(|| {
        vec![Diagnostic::error("Missing name", "name is required")
            .with_attribute(AttributePath::new("name"))]
    })
}
