use crate::utils::error::{Result, ShaperError};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// A value that did not match its declared type spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterError {
    pub name: String,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for ParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} must be of type {}, got {}",
            self.name, self.expected, self.actual
        )
    }
}

/// JSON type name used in type specs.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Check named values against type specs such as `"string"`, `"object|array"`
/// or `"*"` (anything). Values and specs are matched by position; values
/// without a spec are not checked.
pub fn validate_parameters(values: &[(&str, &Value)], type_specs: &[&str]) -> Vec<ParameterError> {
    values
        .iter()
        .zip(type_specs)
        .filter(|((_, value), spec)| !matches_type_spec(value, spec))
        .map(|((name, value), spec)| ParameterError {
            name: (*name).to_string(),
            expected: (*spec).to_string(),
            actual: type_name(value).to_string(),
        })
        .collect()
}

fn matches_type_spec(value: &Value, spec: &str) -> bool {
    spec.split('|')
        .map(str::trim)
        .any(|t| t == "*" || t == type_name(value))
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(ShaperError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(ShaperError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_file_extension(field_name: &str, file: &str, allowed_extensions: &[&str]) -> Result<()> {
    let allowed_set: HashSet<&str> = allowed_extensions.iter().copied().collect();

    match std::path::Path::new(file)
        .extension()
        .and_then(|ext| ext.to_str())
    {
        Some(extension) if allowed_set.contains(extension) => Ok(()),
        Some(extension) => Err(ShaperError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: file.to_string(),
            reason: format!(
                "Unsupported file extension: {}. Allowed extensions: {}",
                extension,
                allowed_extensions.join(", ")
            ),
        }),
        None => Err(ShaperError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: file.to_string(),
            reason: "File has no extension or invalid filename".to_string(),
        }),
    }
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| ShaperError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ShaperError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}
