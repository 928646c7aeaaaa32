//! IndyChat Core Library
//!
//! This crate provides the client side of the IndyChat chat proxy: it issues
//! streaming chat requests, reassembles the server-sent event stream into the
//! assistant's answer, and splits finished answers into renderable segments.

pub mod config;
pub mod content;
pub mod conversation;
pub mod error;
pub mod http;
pub mod intent;
pub mod protocol;
pub mod session;
pub mod speech;
pub mod stream;

pub use content::{segment_message, ContentSegment, ContentSegmenter, SegmentedMessage};
pub use error::{ChatError, ChatResult};
pub use http::client::ChatClient;
pub use http::{LoadingFlag, LoadingGuard};
pub use session::ChatSession;
pub use stream::{AssembledMessage, CallbackSink, Detachable, StreamSink, TeardownHandle};

/// Returns the version of the IndyChat Core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
