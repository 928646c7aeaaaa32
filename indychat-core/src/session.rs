//! Chat session state
//!
//! A session carries what must persist between requests of one chat: the
//! user, the vendor conversation id captured from the first answer, and the
//! loading indicator. Within a request the stored id is only read.

use crate::conversation::ConversationStore;
use crate::error::ChatResult;
use crate::http::client::ChatClient;
use crate::http::LoadingFlag;
use crate::protocol::{ChatRequestBody, FileParam};
use crate::stream::{AssembledMessage, StreamSink};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Stored conversation that captured vendor ids are written back to
struct PersistTarget {
    store: Arc<dyn ConversationStore>,
    conversation_id: String,
    /// Vendor id last written to the store
    written: Option<String>,
}

/// Forwards to the caller's sink while remembering the first conversation id
struct CaptureSink<S> {
    inner: S,
    captured: Option<String>,
}

impl<S: StreamSink> StreamSink for CaptureSink<S> {
    fn on_chunk(&mut self, chunk: &str) {
        self.inner.on_chunk(chunk);
    }

    fn on_conversation_id(&mut self, conversation_id: &str) {
        if self.captured.is_none() {
            self.captured = Some(conversation_id.to_string());
        }
        self.inner.on_conversation_id(conversation_id);
    }
}

/// One chat between a user and the assistant
pub struct ChatSession {
    client: ChatClient,
    user_id: String,
    conversation_id: Option<String>,
    temporary: bool,
    loading: LoadingFlag,
    persist: Option<PersistTarget>,
}

impl ChatSession {
    pub fn new(client: ChatClient, user_id: impl Into<String>) -> Self {
        Self {
            client,
            user_id: user_id.into(),
            conversation_id: None,
            temporary: false,
            loading: LoadingFlag::new(),
            persist: None,
        }
    }

    /// Temporary chats are never written back to the conversation store
    pub fn temporary(mut self, temporary: bool) -> Self {
        self.temporary = temporary;
        self
    }

    /// Write captured vendor ids to `conversation_id` in `store`
    pub fn with_store(
        mut self,
        store: Arc<dyn ConversationStore>,
        conversation_id: impl Into<String>,
    ) -> Self {
        self.persist = Some(PersistTarget {
            store,
            conversation_id: conversation_id.into(),
            written: None,
        });
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Resume an existing vendor conversation
    pub fn set_conversation_id(&mut self, conversation_id: Option<String>) {
        self.conversation_id = conversation_id.filter(|id| !id.is_empty());
    }

    /// Loading indicator shared with the UI
    pub fn loading(&self) -> &LoadingFlag {
        &self.loading
    }

    pub fn client(&self) -> &ChatClient {
        &self.client
    }

    /// Send `query` with `files`, streaming the answer into `sink`.
    ///
    /// Returns `Ok(None)` without contacting the proxy when there is neither
    /// text nor an attachment to send.
    pub async fn send<S: StreamSink>(
        &mut self,
        query: &str,
        files: Vec<FileParam>,
        sink: S,
    ) -> ChatResult<Option<AssembledMessage>> {
        let query = query.trim();
        if query.is_empty() && files.is_empty() {
            debug!("Ignoring empty chat submission");
            return Ok(None);
        }

        let request = ChatRequestBody::new(query, self.user_id.clone())
            .with_conversation_id(self.conversation_id.clone())
            .with_files(files);

        let mut capture = CaptureSink {
            inner: sink,
            captured: None,
        };
        let result = self
            .client
            .send_message(request, &mut capture, &self.loading)
            .await;

        // an id captured before a failure still continues the conversation
        if self.conversation_id.is_none() {
            if let Some(captured) = capture.captured {
                info!("Captured conversation id {}", captured);
                self.conversation_id = Some(captured);
            }
        }

        let message = result?;
        self.persist_conversation_id().await;

        Ok(Some(message))
    }

    /// Write the current vendor id back to the store if it changed
    async fn persist_conversation_id(&mut self) {
        if self.temporary {
            return;
        }
        let (Some(target), Some(vendor_id)) = (self.persist.as_mut(), &self.conversation_id) else {
            return;
        };
        if target.written.as_ref() == Some(vendor_id) {
            return;
        }
        match target
            .store
            .set_vendor_conversation_id(&target.conversation_id, vendor_id)
            .await
        {
            Ok(()) => target.written = Some(vendor_id.clone()),
            // the chat itself succeeded; only continuity across reloads is lost
            Err(e) => warn!(
                "Failed to store conversation id for {}: {}",
                target.conversation_id, e
            ),
        }
    }

    /// Start a new chat; the next request opens a fresh vendor conversation
    pub fn reset(&mut self) {
        debug!("Resetting chat session for user {}", self.user_id);
        self.conversation_id = None;
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("user_id", &self.user_id)
            .field("conversation_id", &self.conversation_id)
            .field("temporary", &self.temporary)
            .finish()
    }
}
