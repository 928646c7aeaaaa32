//! Configuration schema structures with serde support

use super::error::{ValidationError, ValidationErrorKind};
use super::secrets::SecretString;
use crate::content::COMPLAINT_MARKER;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Schema version accepted by this release
pub const SUPPORTED_VERSION: &str = "0.1";

/// Root configuration structure for the IndyChat client
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatConfig {
    /// Schema version (required - no default)
    pub version: String,

    /// Chat proxy endpoints
    pub proxy: ProxyConfig,

    #[serde(default)]
    pub connection: ConnectionConfig,

    #[serde(default)]
    pub content: ContentConfig,

    #[serde(default)]
    pub speech: SpeechConfig,
}

impl ChatConfig {
    /// Minimal configuration pointing at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            version: SUPPORTED_VERSION.to_string(),
            proxy: ProxyConfig::new(base_url),
            connection: ConnectionConfig::default(),
            content: ContentConfig::default(),
            speech: SpeechConfig::default(),
        }
    }
}

/// Internal chat proxy endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProxyConfig {
    /// Site origin, e.g. `https://indychat.example`
    pub base_url: String,

    #[serde(default = "default_chat_path")]
    pub chat_path: String,

    #[serde(default = "default_upload_path")]
    pub upload_path: String,

    #[serde(default = "default_tts_path")]
    pub tts_path: String,

    /// Bearer token presented to the speech endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<SecretString>,
}

impl ProxyConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            chat_path: default_chat_path(),
            upload_path: default_upload_path(),
            tts_path: default_tts_path(),
            auth_token: None,
        }
    }

    /// Join the base URL and an endpoint path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Upper bound for a whole request, including reading the stream
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_idle")]
    pub pool_max_idle_per_host: usize,

    /// Largest attachment accepted for upload
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,

    /// Per-call bound for attachment uploads
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout_secs: u64,

    /// Per-call bound for speech synthesis
    #[serde(default = "default_speech_timeout")]
    pub speech_timeout_secs: u64,
}

impl ConnectionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub fn speech_timeout(&self) -> Duration {
        Duration::from_secs(self.speech_timeout_secs)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
            pool_max_idle_per_host: default_max_idle(),
            max_upload_bytes: default_max_upload_bytes(),
            upload_timeout_secs: default_upload_timeout(),
            speech_timeout_secs: default_speech_timeout(),
        }
    }
}

/// Answer segmentation rules
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContentConfig {
    /// Literal that requests the complaint affordance
    #[serde(default = "default_complaint_marker")]
    pub complaint_marker: String,

    /// Host serving inline images
    #[serde(default = "default_media_host")]
    pub media_host: String,

    /// Extensions recognised as images
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            complaint_marker: default_complaint_marker(),
            media_host: default_media_host(),
            image_extensions: default_image_extensions(),
        }
    }
}

/// Speech settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SpeechConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_voice_id")]
    pub default_voice_id: String,

    /// Cleaned text shorter than this is not sent for synthesis
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_voice_id: default_voice_id(),
            min_text_chars: default_min_text_chars(),
        }
    }
}

// Default value functions for serde
fn default_true() -> bool { true }
fn default_chat_path() -> String { "/api/chat".to_string() }
fn default_upload_path() -> String { "/api/upload".to_string() }
fn default_tts_path() -> String { "/api/tts".to_string() }
fn default_connect_timeout() -> u64 { 10 }
fn default_request_timeout() -> u64 { 120 }
fn default_max_idle() -> usize { 10 }
fn default_max_upload_bytes() -> u64 { 15 * 1024 * 1024 }
fn default_upload_timeout() -> u64 { 60 }
fn default_speech_timeout() -> u64 { 30 }
fn default_complaint_marker() -> String { COMPLAINT_MARKER.to_string() }
fn default_media_host() -> String { "res.cloudinary.com".to_string() }
fn default_image_extensions() -> Vec<String> {
    ["jpg", "jpeg", "png", "gif", "webp"].iter().map(|s| s.to_string()).collect()
}
fn default_voice_id() -> String { "pNInz6obpgDQGcFmaJgB".to_string() }
fn default_min_text_chars() -> usize { 5 }

impl ChatConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.version.is_empty() {
            return Err(ValidationError::required("version"));
        }

        if self.version != SUPPORTED_VERSION {
            return Err(ValidationError::new(
                "version",
                ValidationErrorKind::InvalidVersion {
                    expected: SUPPORTED_VERSION.to_string(),
                    actual: self.version.clone(),
                },
            ));
        }

        self.proxy.validate("proxy")?;
        self.connection.validate("connection")?;
        self.content.validate("content")?;
        self.speech.validate("speech")?;

        Ok(())
    }
}

impl ProxyConfig {
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.base_url.is_empty() {
            return Err(ValidationError::required(format!("{}.base_url", path)));
        }

        match url::Url::parse(&self.base_url) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    return Err(ValidationError::new(
                        format!("{}.base_url", path),
                        ValidationErrorKind::InvalidUrl {
                            message: format!(
                                "URL scheme must be http or https, got: {}",
                                url.scheme()
                            ),
                        },
                    ));
                }
            }
            Err(e) => {
                return Err(ValidationError::new(
                    format!("{}.base_url", path),
                    ValidationErrorKind::InvalidUrl {
                        message: e.to_string(),
                    },
                ));
            }
        }

        for (field, value) in [
            ("chat_path", &self.chat_path),
            ("upload_path", &self.upload_path),
            ("tts_path", &self.tts_path),
        ] {
            if !value.starts_with('/') {
                return Err(ValidationError::invalid_format(
                    format!("{}.{}", path, field),
                    format!("endpoint path must start with '/', got: {}", value),
                ));
            }
        }

        Ok(())
    }
}

impl ConnectionConfig {
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.connect_timeout_secs == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.connect_timeout_secs", path),
                "Must be greater than 0",
            ));
        }

        if self.request_timeout_secs < self.connect_timeout_secs {
            return Err(ValidationError::out_of_range(
                format!("{}.request_timeout_secs", path),
                "Must be >= connect_timeout_secs",
            ));
        }

        for (field, value) in [
            ("upload_timeout_secs", self.upload_timeout_secs),
            ("speech_timeout_secs", self.speech_timeout_secs),
        ] {
            if value == 0 {
                return Err(ValidationError::out_of_range(
                    format!("{}.{}", path, field),
                    "Must be greater than 0",
                ));
            }
        }

        if self.max_upload_bytes == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.max_upload_bytes", path),
                "Must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl ContentConfig {
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.media_host.is_empty() {
            return Err(ValidationError::required(format!("{}.media_host", path)));
        }

        if self.image_extensions.is_empty() {
            return Err(ValidationError::required(format!("{}.image_extensions", path))
                .with_context("At least one image extension must be configured"));
        }

        let mut seen = std::collections::HashSet::new();
        for (i, ext) in self.image_extensions.iter().enumerate() {
            if ext.is_empty() {
                return Err(ValidationError::required(format!(
                    "{}.image_extensions[{}]",
                    path, i
                )));
            }
            if !seen.insert(ext.to_lowercase()) {
                return Err(ValidationError::new(
                    format!("{}.image_extensions[{}]", path, i),
                    ValidationErrorKind::DuplicateValue { value: ext.clone() },
                ));
            }
        }

        Ok(())
    }
}

impl SpeechConfig {
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.enabled && self.default_voice_id.is_empty() {
            return Err(ValidationError::required(format!("{}.default_voice_id", path))
                .with_context("Speech is enabled but no voice is configured"));
        }

        Ok(())
    }
}
