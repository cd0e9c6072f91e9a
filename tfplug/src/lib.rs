//! tfplug - plugin framework for declarative resource providers
//!
//! Provides the value model, schemas, resource and provider traits, and the
//! retrying operation runner that providers build on.

// Core modules
pub mod context;
pub mod error;
pub mod schema;
pub mod types;

// Provider API modules
pub mod data_source;
pub mod provider;
pub mod resource;
pub mod resource_data;

// Helper modules
pub mod defaults;
pub mod import;
pub mod retry;
pub mod validator;

// Re-exports for convenience
pub use context::{Context, ContextError};
pub use data_source::DataSource;
pub use error::{Result, TfplugError};
pub use import::import_state_passthrough_id;
pub use provider::Provider;
pub use resource::{prepare_config, Resource};
pub use resource_data::ResourceData;
pub use retry::{RetryError, RetryOutcome, RetryPolicy};
pub use schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
pub use types::{AttributePath, Diagnostic, DiagnosticSeverity, Dynamic, DynamicValue};
