//! Wrappers around a JSON:API serialization engine.

pub mod basic;
pub mod formatter;
pub mod included;

pub use basic::{BasicSerializer, ResourceType};
pub use formatter::{Formatter, SerializeOptions};
pub use included::keep_included_if_request;

use serde_json::Value;

/// The `(type, id)` pair identifying a resource object or linkage.
pub(crate) fn resource_identifier(resource: &Value) -> Option<(String, String)> {
    let resource_type = resource.get("type")?.as_str()?;
    let id = id_string(resource.get("id")?)?;
    Some((resource_type.to_string(), id))
}

/// JSON:API ids are strings; numeric ids are accepted and stringified.
pub(crate) fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
