use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Failures raised while validating grouping input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GroupError {
    #[error("Malformed record at index {index}: {reason}")]
    MalformedRecord { index: usize, reason: String },

    #[error("Invalid group structure '{group_name}': {reason}")]
    InvalidStructure { group_name: String, reason: String },
}

/// The two error categories the JSON:API formatter reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    BadData,
    NotFound,
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadData => 400,
            ErrorKind::NotFound => 404,
        }
    }

    pub fn reason_phrase(&self) -> &'static str {
        match self {
            ErrorKind::BadData => "Bad Request",
            ErrorKind::NotFound => "Not Found",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::BadData => write!(f, "badData"),
            ErrorKind::NotFound => write!(f, "notFound"),
        }
    }
}

/// Which error shape the formatter hands back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStyle {
    #[default]
    Generic,
    Http,
}

impl ErrorStyle {
    pub fn error(
        &self,
        kind: ErrorKind,
        message: impl Into<String>,
        details: Vec<String>,
    ) -> FormatError {
        let message = message.into();
        match self {
            ErrorStyle::Generic => FormatError::Generic(GenericError {
                kind,
                message,
                details,
            }),
            ErrorStyle::Http => FormatError::Http(HttpError {
                status_code: kind.status_code(),
                error: kind.reason_phrase().to_string(),
                message,
                details,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenericError {
    pub kind: ErrorKind,
    pub message: String,
    pub details: Vec<String>,
}

impl fmt::Display for GenericError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// HTTP-flavoured error payload, serialized as `{statusCode, error, message}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpError {
    pub status_code: u16,
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.status_code, self.error, self.message)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FormatError {
    #[error("{0}")]
    Generic(GenericError),

    #[error("{0}")]
    Http(HttpError),
}

impl FormatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FormatError::Generic(e) => e.kind,
            FormatError::Http(e) if e.status_code == 404 => ErrorKind::NotFound,
            FormatError::Http(_) => ErrorKind::BadData,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            FormatError::Generic(e) => &e.message,
            FormatError::Http(e) => &e.message,
        }
    }

    pub fn details(&self) -> &[String] {
        match self {
            FormatError::Generic(e) => &e.details,
            FormatError::Http(e) => &e.details,
        }
    }
}

#[derive(Error, Debug)]
pub enum ShaperError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Grouping error: {0}")]
    GroupError(#[from] GroupError),

    #[error("JSON:API error: {0}")]
    FormatError(#[from] FormatError),

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

impl ShaperError {
    pub fn user_friendly_message(&self) -> String {
        match self {
            ShaperError::IoError(e) => format!("Could not read or write a file: {}", e),
            ShaperError::SerializationError(e) => format!("Input is not valid JSON: {}", e),
            ShaperError::CsvError(e) => format!("Input is not valid CSV: {}", e),
            ShaperError::ConfigError { .. }
            | ShaperError::MissingConfigError { .. }
            | ShaperError::InvalidConfigValueError { .. } => {
                format!("Configuration problem: {}", self)
            }
            ShaperError::GroupError(e) => format!("Records could not be grouped: {}", e),
            ShaperError::FormatError(e) => format!("JSON:API formatting failed: {}", e),
            ShaperError::ProcessingError { message } => message.clone(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            ShaperError::ConfigError { .. }
            | ShaperError::MissingConfigError { .. }
            | ShaperError::InvalidConfigValueError { .. } => 2,
            ShaperError::IoError(_) => 3,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, ShaperError>;
