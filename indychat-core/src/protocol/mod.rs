//! Protocol module for chat-proxy request/response structures
//!
//! This module defines the wire data models exchanged with the chat proxy:
//! - The outbound streaming chat request body
//! - Attachment references produced by the upload endpoint
//! - The event records carried on `data:` lines of the response stream

pub mod types;

pub use types::{
    ChatRequestBody, EventKind, EventRecord, FileKind, FileParam, ResponseMode, TransferMethod,
    UploadedFile,
};
