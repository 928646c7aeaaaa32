//! Errors raised while loading a chat client configuration
//!
//! Loading fails in one of four places: reading the file, interpolating
//! `${VAR}` references, parsing YAML/JSON, or validating the parsed values.

use std::fmt;
use thiserror::Error;

/// Failure to produce a usable [`ChatConfig`](super::ChatConfig)
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("Cannot read chat config '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed document or unknown field; position is best-effort
    #[error("Cannot parse chat config '{path}' (line {}, column {}): {message}",
            .line.unwrap_or(0), .column.unwrap_or(0))]
    ParseError {
        path: String,
        line: Option<usize>,
        column: Option<usize>,
        message: String,
    },

    #[error("Invalid chat config: {0}")]
    ValidationError(#[from] ValidationError),

    /// A `${VAR}` reference names an unset variable
    #[error("Config references unset environment variable '{var}'")]
    EnvVarNotFound { var: String },
}

/// A config value that parsed but cannot be used
#[derive(Debug, Error)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `proxy.base_url` or
    /// `content.image_extensions[2]`
    pub field_path: String,
    pub kind: ValidationErrorKind,
    pub context: Option<String>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field_path, self.kind)?;
        if let Some(ctx) = &self.context {
            write!(f, " ({})", ctx)?;
        }
        Ok(())
    }
}

/// What was wrong with a config value
#[derive(Debug, Error)]
pub enum ValidationErrorKind {
    #[error("missing or empty")]
    RequiredFieldMissing,

    /// Timeouts, size limits and other numeric bounds
    #[error("out of range ({message})")]
    OutOfRange { message: String },

    /// Endpoint paths that do not start with `/`
    #[error("malformed ({message})")]
    InvalidFormat { message: String },

    /// Repeated image extension or endpoint path
    #[error("'{value}' is already in use")]
    DuplicateValue { value: String },

    #[error("not a usable proxy URL ({message})")]
    InvalidUrl { message: String },

    #[error("unsupported schema version {actual} (this client reads {expected})")]
    InvalidVersion { expected: String, actual: String },
}

impl ValidationError {
    pub fn new(field_path: impl Into<String>, kind: ValidationErrorKind) -> Self {
        Self {
            field_path: field_path.into(),
            kind,
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn required(field_path: impl Into<String>) -> Self {
        Self::new(field_path, ValidationErrorKind::RequiredFieldMissing)
    }

    pub fn out_of_range(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            field_path,
            ValidationErrorKind::OutOfRange {
                message: message.into(),
            },
        )
    }

    pub fn invalid_format(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            field_path,
            ValidationErrorKind::InvalidFormat {
                message: message.into(),
            },
        )
    }
}

/// Result of loading a configuration
pub type ConfigResult<T> = Result<T, ConfigError>;
