//! Import helpers for simplifying resource import implementations

use crate::context::Context;
use crate::resource_data::ResourceData;
use crate::types::{AttributePath, Diagnostic};

/// Uses the import ID as the resource id
///
/// Example: ID "3fa85f64" -> state.id = "3fa85f64"
pub fn import_state_passthrough_id(
    _ctx: &Context,
    id: &str,
) -> Result<ResourceData, Vec<Diagnostic>> {
    let id = id.trim();
    if id.is_empty() {
        return Err(vec![Diagnostic::error(
            "Invalid import ID",
            "The import ID must not be empty",
        )
        .with_attribute(AttributePath::new("id"))]);
    }

    Ok(ResourceData::for_import(id))
}
