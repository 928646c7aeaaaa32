//! Chat error types and handling

use thiserror::Error;

/// Result type for chat operations
pub type ChatResult<T> = Result<T, ChatError>;

/// Errors that can occur while talking to the chat proxy
#[derive(Debug, Error)]
pub enum ChatError {
    /// The proxy answered with a non-success status before any stream began
    #[error("{message}")]
    Transport { status: u16, message: String },

    /// A `data:` line carried a payload that is not a valid event record
    #[error("Malformed stream record: {message}")]
    Framing { payload: String, message: String },

    /// The vendor reported an error event inside the stream
    #[error("API error: {message}")]
    VendorStream { message: String },

    /// The connection failed or a read of the response body failed
    #[error("Network error: {message}")]
    Network { message: String },

    /// Attachment upload was rejected
    #[error("Upload failed: {message}")]
    Upload { message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Request or response (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ChatError {
    /// Whether this error aborted an already-running stream
    pub fn is_fatal_stream_error(&self) -> bool {
        matches!(
            self,
            ChatError::Framing { .. } | ChatError::VendorStream { .. } | ChatError::Network { .. }
        )
    }

    /// HTTP status attached to this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ChatError::Transport { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            ChatError::Transport {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else if err.is_timeout() {
            ChatError::Network {
                message: format!("Request timed out: {}", err),
            }
        } else if err.is_connect() {
            ChatError::Network {
                message: format!("Connection failed: {}", err),
            }
        } else {
            ChatError::Network {
                message: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        ChatError::Serialization(err.to_string())
    }
}
