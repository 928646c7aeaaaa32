//! Core protocol types for the chat proxy
//!
//! The proxy is a pass-through of the vendor's streaming chat API, so these
//! structures mirror the vendor vocabulary (`answer`, `conversation_id`,
//! `upload_file_id`) rather than inventing a canonical format.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How the vendor should deliver the answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// Server-sent event stream
    #[default]
    Streaming,
}

/// How an attachment reaches the vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransferMethod {
    /// The file was previously stored through the upload endpoint
    #[default]
    LocalFile,
}

/// Attachment category understood by the vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    File,
}

impl FileKind {
    /// Classify an attachment by its MIME type
    pub fn from_mime_type(mime_type: &str) -> Self {
        if mime_type.starts_with("image") {
            FileKind::Image
        } else {
            FileKind::File
        }
    }
}

/// Reference to an uploaded attachment, as sent in `files[]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileParam {
    /// Attachment category
    #[serde(rename = "type")]
    pub file_type: FileKind,

    /// Always `local_file` for uploads made through the proxy
    pub transfer_method: TransferMethod,

    /// Identifier returned by the upload endpoint
    pub upload_file_id: String,
}

impl FileParam {
    /// Build the request entry for a stored attachment
    pub fn from_upload(file: &UploadedFile) -> Self {
        Self {
            file_type: FileKind::from_mime_type(&file.mime_type),
            transfer_method: TransferMethod::LocalFile,
            upload_file_id: file.id.clone(),
        }
    }
}

/// Attachment stored by the upload endpoint
///
/// Only `id` is guaranteed; the remaining fields are best-effort and extra
/// vendor fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub size: u64,

    #[serde(default)]
    pub mime_type: String,
}

/// Streaming chat request sent to the proxy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequestBody {
    /// Workflow inputs; always an empty object for plain chat
    #[serde(default)]
    pub inputs: Map<String, Value>,

    /// The user's query text
    pub query: String,

    /// Caller-chosen identity token, used verbatim
    pub user: String,

    /// Delivery mode
    pub response_mode: ResponseMode,

    /// Vendor conversation to continue, if one was captured earlier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,

    /// Attachments; omitted from the body when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileParam>,
}

impl ChatRequestBody {
    /// Create a streaming request for a query
    pub fn new(query: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            inputs: Map::new(),
            query: query.into(),
            user: user.into(),
            response_mode: ResponseMode::Streaming,
            conversation_id: None,
            files: Vec::new(),
        }
    }

    /// Continue an existing vendor conversation
    pub fn with_conversation_id(mut self, conversation_id: Option<String>) -> Self {
        self.conversation_id = conversation_id.filter(|id| !id.is_empty());
        self
    }

    /// Attach previously uploaded files
    pub fn with_files(mut self, files: Vec<FileParam>) -> Self {
        self.files = files;
        self
    }
}

/// Discriminant of an [`EventRecord`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Plain model output (`message`)
    Message,
    /// Agent-mode model output (`agent_message`)
    AgentMessage,
    /// Vendor-side failure (`error`)
    Error,
    /// Anything else (`message_end`, `ping`, workflow events, ...)
    Other(String),
}

impl EventKind {
    /// Parse the `event` field
    pub fn parse(event: &str) -> Self {
        match event {
            "message" => EventKind::Message,
            "agent_message" => EventKind::AgentMessage,
            "error" => EventKind::Error,
            other => EventKind::Other(other.to_string()),
        }
    }

    /// Whether the event carries an assistant content chunk
    pub fn is_content(&self) -> bool {
        matches!(self, EventKind::Message | EventKind::AgentMessage)
    }
}

/// Decoded payload of one `data:` line
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event discriminant
    #[serde(default)]
    pub event: String,

    /// Vendor conversation handle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,

    /// Content fragment; usually a string but any JSON value is accepted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<Value>,

    /// Error description on `error` events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl EventRecord {
    /// Parsed discriminant
    pub fn kind(&self) -> EventKind {
        EventKind::parse(&self.event)
    }

    /// Conversation id, ignoring empty strings
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref().filter(|id| !id.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body_omits_optional_fields() {
        let body = ChatRequestBody::new("hello", "user-1");
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(
            value,
            json!({
                "inputs": {},
                "query": "hello",
                "user": "user-1",
                "response_mode": "streaming"
            })
        );
    }

    #[test]
    fn test_request_body_with_conversation_and_files() {
        let upload = UploadedFile {
            id: "file-1".to_string(),
            name: "scan.png".to_string(),
            size: 42,
            mime_type: "image/png".to_string(),
        };
        let body = ChatRequestBody::new("look", "user-1")
            .with_conversation_id(Some("conv-9".to_string()))
            .with_files(vec![FileParam::from_upload(&upload)]);
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value["conversation_id"], "conv-9");
        assert_eq!(
            value["files"],
            json!([{ "type": "image", "transfer_method": "local_file", "upload_file_id": "file-1" }])
        );
    }

    #[test]
    fn test_empty_conversation_id_is_dropped() {
        let body = ChatRequestBody::new("q", "u").with_conversation_id(Some(String::new()));
        assert!(body.conversation_id.is_none());
    }

    #[test]
    fn test_file_kind_from_mime() {
        assert_eq!(FileKind::from_mime_type("image/jpeg"), FileKind::Image);
        assert_eq!(FileKind::from_mime_type("application/pdf"), FileKind::File);
        assert_eq!(FileKind::from_mime_type(""), FileKind::File);
    }

    #[test]
    fn test_event_record_accepts_non_string_answer() {
        let record: EventRecord =
            serde_json::from_str(r#"{"event":"agent_message","answer":{"k":1}}"#).unwrap();
        assert_eq!(record.kind(), EventKind::AgentMessage);
        assert_eq!(record.answer, Some(json!({"k": 1})));
        assert!(record.conversation_id().is_none());
    }

    #[test]
    fn test_uploaded_file_ignores_vendor_fields() {
        let file: UploadedFile = serde_json::from_str(
            r#"{"id":"abc","name":"a.pdf","size":10,"extension":"pdf","mime_type":"application/pdf","created_by":"u"}"#,
        )
        .unwrap();
        assert_eq!(file.id, "abc");
        assert_eq!(file.mime_type, "application/pdf");
    }
}
