//! Splitting assistant answers into renderable segments
//!
//! Answers are free text that may embed hosted image URLs and a literal
//! complaint marker. The segmenter strips the marker (surfacing it as a flag)
//! and cuts the text around image URLs so media can be rendered inline while
//! the surrounding prose is rendered as markdown.

use crate::config::ContentConfig;
use crate::error::{ChatError, ChatResult};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Literal the assistant emits to request the complaint affordance
pub const COMPLAINT_MARKER: &str = "<complaint button>";

static DEFAULT_SEGMENTER: LazyLock<ContentSegmenter> = LazyLock::new(|| {
    ContentSegmenter::new(&ContentConfig::default()).expect("default media pattern is valid")
});

/// One renderable unit of an answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ContentSegment {
    /// Markdown prose
    Text(String),
    /// Hosted image URL
    Media(String),
}

impl ContentSegment {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentSegment::Text(text) => Some(text),
            ContentSegment::Media(_) => None,
        }
    }

    pub fn as_media(&self) -> Option<&str> {
        match self {
            ContentSegment::Media(url) => Some(url),
            ContentSegment::Text(_) => None,
        }
    }
}

/// Result of segmenting one answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentedMessage {
    /// Segments in source order; never empty
    pub segments: Vec<ContentSegment>,

    /// Whether the complaint marker appeared anywhere in the answer
    pub has_complaint_button: bool,
}

impl SegmentedMessage {
    /// Iterate over the embedded media URLs
    pub fn media_urls(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(ContentSegment::as_media)
    }
}

/// Compiled segmentation rules
#[derive(Debug, Clone)]
pub struct ContentSegmenter {
    complaint_marker: String,
    media_pattern: Regex,
}

impl ContentSegmenter {
    /// Build a segmenter from configuration.
    ///
    /// The media host and extensions are escaped before being spliced into
    /// the URL pattern.
    pub fn new(config: &ContentConfig) -> ChatResult<Self> {
        let extensions = config
            .image_extensions
            .iter()
            .map(|ext| regex::escape(ext.trim_start_matches('.')))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = format!(
            r"https://{}/[^/\s]+/image/upload/[^/\s]+/\S+\.(?:{})",
            regex::escape(&config.media_host),
            extensions
        );
        let media_pattern = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| ChatError::Configuration(format!("Invalid media pattern: {}", e)))?;

        Ok(Self {
            complaint_marker: config.complaint_marker.clone(),
            media_pattern,
        })
    }

    /// Whether `message` contains the complaint marker
    pub fn has_complaint_marker(&self, message: &str) -> bool {
        !self.complaint_marker.is_empty() && message.contains(&self.complaint_marker)
    }

    /// Segment a complete (or still-growing) answer
    pub fn segment(&self, message: &str) -> SegmentedMessage {
        let has_complaint_button = self.has_complaint_marker(message);
        let cleaned = if has_complaint_button {
            message.replace(&self.complaint_marker, "")
        } else {
            message.to_string()
        };

        let mut segments = Vec::new();
        let mut cursor = 0;
        for found in self.media_pattern.find_iter(&cleaned) {
            if found.start() > cursor {
                segments.push(ContentSegment::Text(cleaned[cursor..found.start()].to_string()));
            }
            segments.push(ContentSegment::Media(found.as_str().to_string()));
            cursor = found.end();
        }
        if cursor < cleaned.len() || segments.is_empty() {
            segments.push(ContentSegment::Text(cleaned[cursor..].to_string()));
        }

        SegmentedMessage {
            segments,
            has_complaint_button,
        }
    }
}

impl Default for ContentSegmenter {
    fn default() -> Self {
        DEFAULT_SEGMENTER.clone()
    }
}

/// Segment an answer with the default rules
pub fn segment_message(message: &str) -> SegmentedMessage {
    DEFAULT_SEGMENTER.segment(message)
}
