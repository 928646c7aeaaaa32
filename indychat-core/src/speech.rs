//! Speech capabilities
//!
//! Two optional features surround the chat: dictation (speech-to-text, provided
//! by the host platform) and read-aloud (text-to-speech, served by the proxy's
//! speech endpoint). Dictation is modelled as a capability that may be absent;
//! read-aloud needs its input cleaned of markdown before synthesis.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use thiserror::Error;

static FENCED_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)```.*?```").unwrap());
static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)`.*?`").unwrap());
static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[.*?\]\(.*?\)").unwrap());
static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());
static ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*(.*?)\*").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Errors from speech features
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("Your session has expired. Please refresh the page to continue using text-to-speech.")]
    SessionExpired,

    #[error("Text-to-speech is not enabled for your account. Please enable it in your profile settings.")]
    NotEnabled,

    #[error("Failed to generate speech (status {status}). Please try again later.")]
    Failed { status: u16 },

    #[error("Speech request failed: {0}")]
    Network(String),

    #[error("Speech recognition error: {0}")]
    Recognition(String),
}

impl SpeechError {
    /// Classify a non-success status from the speech endpoint
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => SpeechError::SessionExpired,
            403 => SpeechError::NotEnabled,
            status => SpeechError::Failed { status },
        }
    }
}

impl From<reqwest::Error> for SpeechError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => SpeechError::from_status(status.as_u16()),
            None => SpeechError::Network(err.to_string()),
        }
    }
}

/// Body sent to the speech endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TtsRequest {
    pub text: String,

    #[serde(rename = "voiceId")]
    pub voice_id: String,
}

/// Strip markdown so synthesized speech reads naturally
pub fn clean_text_for_tts(text: &str) -> String {
    let text = FENCED_CODE.replace_all(text, "Code block omitted.");
    let text = INLINE_CODE.replace_all(&text, "");
    let text = MARKDOWN_LINK.replace_all(&text, "");
    let text = BOLD.replace_all(&text, "$1");
    let text = ITALIC.replace_all(&text, "$1");
    let text = text.replace("\n\n", ". ").replace('\n', ". ");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// Receives dictation events
pub trait RecognitionHandler {
    /// A transcript; interim results are superseded by later ones
    fn on_result(&mut self, transcript: &str, is_final: bool);

    fn on_error(&mut self, error: SpeechError);

    fn on_state_change(&mut self, listening: bool);
}

/// A platform dictation capability
pub trait SpeechRecognizer {
    /// Whether the platform offers recognition at all
    fn is_supported(&self) -> bool;

    fn is_listening(&self) -> bool;

    /// Begin listening; a no-op when unsupported
    fn start(&mut self);

    /// Stop listening; a no-op when not listening
    fn stop(&mut self);

    /// Human-readable support status for the UI
    fn support_message(&self) -> &'static str {
        if self.is_supported() {
            "Speech recognition is supported in your browser."
        } else {
            "Your browser does not support speech recognition. Try using Chrome, Edge, or Safari."
        }
    }
}

/// Recognizer for platforms without dictation
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedRecognizer;

impl SpeechRecognizer for UnsupportedRecognizer {
    fn is_supported(&self) -> bool {
        false
    }

    fn is_listening(&self) -> bool {
        false
    }

    fn start(&mut self) {
        tracing::debug!("Speech recognition unavailable; ignoring start");
    }

    fn stop(&mut self) {}
}

/// Collects dictation results into composer text
#[derive(Debug, Default)]
pub struct TranscriptBuffer {
    text: String,
    interim: String,
    listening: bool,
    last_error: Option<String>,
}

impl TranscriptBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finalized text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Pending interim transcript, if any
    pub fn interim(&self) -> &str {
        &self.interim
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Take the finalized text, leaving the buffer empty
    pub fn take(&mut self) -> String {
        self.interim.clear();
        std::mem::take(&mut self.text)
    }
}

impl RecognitionHandler for TranscriptBuffer {
    fn on_result(&mut self, transcript: &str, is_final: bool) {
        if is_final {
            let transcript = transcript.trim();
            if !transcript.is_empty() {
                if !self.text.is_empty() {
                    self.text.push(' ');
                }
                self.text.push_str(transcript);
            }
            self.interim.clear();
        } else {
            self.interim = transcript.to_string();
        }
    }

    fn on_error(&mut self, error: SpeechError) {
        tracing::warn!("Dictation error: {}", error);
        self.last_error = Some(error.to_string());
        self.listening = false;
    }

    fn on_state_change(&mut self, listening: bool) {
        self.listening = listening;
    }
}
