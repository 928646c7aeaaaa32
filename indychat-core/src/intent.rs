//! Complaint intent detection for user input
//!
//! Some requests are better served by the structured complaint form than by
//! the assistant. Detection is a plain phrase match on the lowercased input.

use serde::{Deserialize, Serialize};

/// Kind of structured report a user can file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplaintType {
    Complaint,
    Report,
    Feedback,
    Suggestion,
}

impl ComplaintType {
    /// Canned assistant reply shown above the complaint form
    pub fn assistant_reply(&self) -> &'static str {
        match self {
            ComplaintType::Complaint => {
                "I understand you'd like to file a complaint. Please use the form below."
            }
            ComplaintType::Report => "I can help you report this issue. Please use the form below.",
            ComplaintType::Feedback => {
                "Thank you for your feedback. Please use the form below to submit it formally."
            }
            ComplaintType::Suggestion => {
                "I can help with that. Please use the form below to provide more details."
            }
        }
    }
}

const COMPLAINT_PHRASES: &[&str] = &["file a complaint", "formal complaint"];
const REPORT_PHRASES: &[&str] = &["report issue", "problem with"];

/// Detect whether `text` asks for the complaint form
pub fn detect_complaint_intent(text: &str) -> Option<ComplaintType> {
    let lower = text.to_lowercase();
    if COMPLAINT_PHRASES.iter().any(|p| lower.contains(p)) {
        Some(ComplaintType::Complaint)
    } else if REPORT_PHRASES.iter().any(|p| lower.contains(p)) {
        Some(ComplaintType::Report)
    } else {
        None
    }
}
