use super::included::keep_included_if_request;
use crate::domain::ports::JsonApiSerializer;
use crate::utils::error::{ErrorKind, ErrorStyle, FormatError};
use crate::utils::validation::{validate_parameters, ParameterError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type FormatResult<T> = std::result::Result<T, FormatError>;

/// Engine type plus the engine specific extra data (links, meta, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializeOptions {
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub extra_data: Option<Value>,
}

impl SerializeOptions {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            extra_data: None,
        }
    }

    pub fn with_extra_data(mut self, extra_data: Value) -> Self {
        self.extra_data = Some(extra_data);
        self
    }
}

/// Validating front end to a [`JsonApiSerializer`].
///
/// Every call reports failures as [`FormatError`] in the configured
/// [`ErrorStyle`]: `BadData` for arguments of the wrong shape and for engine
/// failures, `NotFound` for empty data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Formatter {
    error_style: ErrorStyle,
}

impl Formatter {
    pub fn new(error_style: ErrorStyle) -> Self {
        Self { error_style }
    }

    pub fn generic() -> Self {
        Self::new(ErrorStyle::Generic)
    }

    pub fn http() -> Self {
        Self::new(ErrorStyle::Http)
    }

    pub fn error_style(&self) -> ErrorStyle {
        self.error_style
    }

    /// Serialize the Ok value of `data`; an Err is passed along untouched.
    pub fn serialize<S, I>(
        &self,
        include: &[I],
        serializer: &S,
        options: &SerializeOptions,
        data: FormatResult<Value>,
    ) -> FormatResult<Value>
    where
        S: JsonApiSerializer + ?Sized,
        I: AsRef<str>,
    {
        data.and_then(|data| self.serialize_data(include, serializer, options, &data))
    }

    pub fn serialize_data<S, I>(
        &self,
        include: &[I],
        serializer: &S,
        options: &SerializeOptions,
        data: &Value,
    ) -> FormatResult<Value>
    where
        S: JsonApiSerializer + ?Sized,
        I: AsRef<str>,
    {
        let resource_type = Value::String(options.resource_type.clone());
        let extra_data = options.extra_data.clone().unwrap_or(Value::Null);
        let type_errors = validate_parameters(
            &[
                ("type", &resource_type),
                ("extraData", &extra_data),
                ("data", data),
            ],
            &["string", "*", "object|array"],
        );
        if !type_errors.is_empty() {
            return Err(self.bad_parameters(type_errors));
        }
        if is_empty(data) {
            return Err(self
                .error_style
                .error(ErrorKind::NotFound, "JSONAPI: No data provided", vec![]));
        }
        if options.resource_type.trim().is_empty() {
            return Err(self.error_style.error(
                ErrorKind::BadData,
                "type property not found in {type, extraData}",
                vec![],
            ));
        }

        tracing::debug!("Serializing {} as JSON:API", options.resource_type);
        let document = serializer
            .serialize(&options.resource_type, data, options.extra_data.as_ref())
            .map_err(|e| self.engine_error(e))?;
        Ok(keep_included_if_request(include, document))
    }

    pub fn deserialize<S>(
        &self,
        serializer: &S,
        resource_type: &str,
        document: &Value,
    ) -> FormatResult<Value>
    where
        S: JsonApiSerializer + ?Sized,
    {
        self.check_deserialize_input(resource_type, document)?;
        serializer
            .deserialize(resource_type, document)
            .map_err(|e| self.engine_error(e))
    }

    /// Deserialize the Ok value of `document`; an Err is passed along untouched.
    pub fn deserialize_result<S>(
        &self,
        serializer: &S,
        resource_type: &str,
        document: FormatResult<Value>,
    ) -> FormatResult<Value>
    where
        S: JsonApiSerializer + ?Sized,
    {
        document.and_then(|document| self.deserialize(serializer, resource_type, &document))
    }

    pub async fn deserialize_async<S>(
        &self,
        serializer: &S,
        resource_type: &str,
        document: &Value,
    ) -> FormatResult<Value>
    where
        S: JsonApiSerializer + ?Sized,
    {
        self.check_deserialize_input(resource_type, document)?;
        serializer
            .deserialize_async(resource_type, document)
            .await
            .map_err(|e| self.engine_error(e))
    }

    pub async fn deserialize_result_async<S>(
        &self,
        serializer: &S,
        resource_type: &str,
        document: FormatResult<Value>,
    ) -> FormatResult<Value>
    where
        S: JsonApiSerializer + ?Sized,
    {
        let document = document?;
        self.deserialize_async(serializer, resource_type, &document)
            .await
    }

    fn check_deserialize_input(&self, resource_type: &str, document: &Value) -> FormatResult<()> {
        let type_errors = validate_parameters(&[("jsonApiData", document)], &["object|array"]);
        if !type_errors.is_empty() {
            return Err(self.bad_parameters(type_errors));
        }
        if resource_type.trim().is_empty() {
            return Err(self.error_style.error(
                ErrorKind::BadData,
                "type must be a non-empty string",
                vec![],
            ));
        }
        Ok(())
    }

    fn bad_parameters(&self, errors: Vec<ParameterError>) -> FormatError {
        let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
        self.error_style.error(
            ErrorKind::BadData,
            format!("Invalid parameters: {}", details.join("; ")),
            details,
        )
    }

    fn engine_error(&self, message: String) -> FormatError {
        tracing::debug!("JSON:API engine failed: {}", message);
        self.error_style.error(ErrorKind::BadData, message, vec![])
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonapi::{BasicSerializer, ResourceType};
    use serde_json::json;

    const NO_INCLUDE: [&str; 0] = [];

    fn serializer() -> BasicSerializer {
        BasicSerializer::new().register("articles", ResourceType::default())
    }

    #[test]
    fn test_serialize_passes_error_through() {
        let upstream = ErrorStyle::Generic.error(ErrorKind::NotFound, "upstream", vec![]);
        let result = Formatter::http().serialize(
            &NO_INCLUDE,
            &serializer(),
            &SerializeOptions::new("articles"),
            Err(upstream.clone()),
        );
        assert_eq!(result.unwrap_err(), upstream);
    }

    #[test]
    fn test_serialize_empty_data_is_not_found() {
        let err = Formatter::generic()
            .serialize_data(&NO_INCLUDE, &serializer(), &SerializeOptions::new("articles"), &json!([]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.message(), "JSONAPI: No data provided");
    }

    #[test]
    fn test_serialize_bad_data_shape() {
        let err = Formatter::http()
            .serialize_data(&NO_INCLUDE, &serializer(), &SerializeOptions::new("articles"), &json!(42))
            .unwrap_err();
        match err {
            FormatError::Http(e) => {
                assert_eq!(e.status_code, 400);
                assert_eq!(e.details, vec!["data must be of type object|array, got number"]);
            }
            other => panic!("unexpected error shape: {:?}", other),
        }
    }

    #[test]
    fn test_serialize_empty_type() {
        let err = Formatter::generic()
            .serialize_data(&NO_INCLUDE, &serializer(), &SerializeOptions::new(""), &json!({"id": 1}))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadData);
        assert_eq!(err.message(), "type property not found in {type, extraData}");
    }

    #[test]
    fn test_engine_failure_is_bad_data() {
        let err = Formatter::generic()
            .serialize_data(&NO_INCLUDE, &serializer(), &SerializeOptions::new("tags"), &json!({"id": 1}))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadData);
    }

    #[test]
    fn test_deserialize_rejects_scalar_document() {
        let err = Formatter::generic()
            .deserialize(&serializer(), "articles", &json!("text"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadData);
    }
}
