//! HTTP module for talking to the IndyChat proxy
//!
//! This module implements the transport layer, handling:
//! - Connection pooling and client management
//! - The streaming chat call and its loading-state guarantee
//! - Attachment upload and speech synthesis calls
//! - Error body classification and request ID correlation

pub mod client;
pub mod error;

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Proxy endpoint being called
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endpoint {
    /// Streaming chat
    Chat,
    /// Attachment upload
    Upload,
    /// Text-to-speech
    Tts,
}

/// Options for an HTTP request
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub endpoint: Endpoint,

    /// Unique request ID for correlation
    pub request_id: Uuid,

    /// Per-request timeout; falls back to the client's configured timeout
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    /// Create new request options with a generated request ID
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            request_id: Uuid::new_v4(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Shared "request in flight" indicator observed by the UI
#[derive(Debug, Clone, Default)]
pub struct LoadingFlag {
    loading: Arc<AtomicBool>,
}

impl LoadingFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Set the flag until the returned guard is dropped
    pub fn acquire(&self) -> LoadingGuard {
        self.loading.store(true, Ordering::SeqCst);
        LoadingGuard {
            loading: Arc::clone(&self.loading),
        }
    }
}

/// Clears its [`LoadingFlag`] when dropped, on every exit path
#[derive(Debug)]
#[must_use = "the loading flag is cleared as soon as the guard is dropped"]
pub struct LoadingGuard {
    loading: Arc<AtomicBool>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.loading.store(false, Ordering::SeqCst);
    }
}
