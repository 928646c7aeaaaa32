//! Configuration validation utilities

use super::error::{ValidationError, ValidationErrorKind};
use super::schema::ChatConfig;
use tracing::warn;

/// Configuration validator layering cross-section rules on top of
/// [`ChatConfig::validate`]
#[derive(Debug, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a configuration with extended rules
    pub fn validate(&self, config: &ChatConfig) -> Result<(), ValidationError> {
        config.validate()?;

        self.validate_endpoints_distinct(config)?;
        self.validate_speech_credentials(config);

        Ok(())
    }

    /// The chat, upload and speech endpoints must not collide
    fn validate_endpoints_distinct(&self, config: &ChatConfig) -> Result<(), ValidationError> {
        let proxy = &config.proxy;
        let endpoints = [
            ("proxy.chat_path", &proxy.chat_path),
            ("proxy.upload_path", &proxy.upload_path),
            ("proxy.tts_path", &proxy.tts_path),
        ];

        for (i, (field, path)) in endpoints.iter().enumerate() {
            if endpoints[..i].iter().any(|(_, earlier)| earlier == path) {
                return Err(ValidationError::new(
                    *field,
                    ValidationErrorKind::DuplicateValue {
                        value: path.to_string(),
                    },
                )
                .with_context("Each endpoint needs its own path"));
            }
        }

        Ok(())
    }

    /// Speech without a token is allowed but every synthesis call will be rejected
    fn validate_speech_credentials(&self, config: &ChatConfig) {
        let has_token = config
            .proxy
            .auth_token
            .as_ref()
            .is_some_and(|token| !token.is_empty());
        if config.speech.enabled && !has_token {
            warn!("Speech is enabled but proxy.auth_token is not set; synthesis requests will be unauthorized");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes() {
        let config = ChatConfig::new("https://indychat.example");
        assert!(ConfigValidator::new().validate(&config).is_ok());
    }

    #[test]
    fn test_duplicate_endpoint_paths() {
        let mut config = ChatConfig::new("https://indychat.example");
        config.proxy.tts_path = config.proxy.chat_path.clone();

        let err = ConfigValidator::new().validate(&config).unwrap_err();
        assert_eq!(err.field_path, "proxy.tts_path");
        assert!(matches!(err.kind, ValidationErrorKind::DuplicateValue { .. }));
    }
}
