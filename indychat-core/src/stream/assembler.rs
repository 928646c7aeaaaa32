//! Answer assembly and in-band signal handling

use crate::error::{ChatError, ChatResult};
use crate::protocol::{EventKind, EventRecord};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, warn};

/// Message used when an error event carries no description
pub const UNKNOWN_VENDOR_ERROR: &str = "Unknown error from API during response generation";

const ACTION_INPUT_KEY: &str = "action_input";

/// Receiver of incremental stream output
pub trait StreamSink {
    /// A non-empty content fragment, in arrival order
    fn on_chunk(&mut self, chunk: &str);

    /// The vendor conversation id; called at most once per stream
    fn on_conversation_id(&mut self, conversation_id: &str);
}

impl<S: StreamSink + ?Sized> StreamSink for &mut S {
    fn on_chunk(&mut self, chunk: &str) {
        (**self).on_chunk(chunk)
    }

    fn on_conversation_id(&mut self, conversation_id: &str) {
        (**self).on_conversation_id(conversation_id)
    }
}

/// Sink built from two closures
pub struct CallbackSink<C, I> {
    on_chunk: C,
    on_conversation_id: I,
}

impl<C, I> CallbackSink<C, I>
where
    C: FnMut(&str),
    I: FnMut(&str),
{
    pub fn new(on_chunk: C, on_conversation_id: I) -> Self {
        Self {
            on_chunk,
            on_conversation_id,
        }
    }
}

impl<C, I> StreamSink for CallbackSink<C, I>
where
    C: FnMut(&str),
    I: FnMut(&str),
{
    fn on_chunk(&mut self, chunk: &str) {
        (self.on_chunk)(chunk)
    }

    fn on_conversation_id(&mut self, conversation_id: &str) {
        (self.on_conversation_id)(conversation_id)
    }
}

/// Update forwarded through a [`ChannelSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamUpdate {
    Chunk(String),
    ConversationId(String),
}

/// Sink that forwards updates to a channel.
///
/// Once the receiver is dropped, sends are silently discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<StreamUpdate>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<StreamUpdate>) -> Self {
        Self { tx }
    }
}

impl StreamSink for ChannelSink {
    fn on_chunk(&mut self, chunk: &str) {
        let _ = self.tx.send(StreamUpdate::Chunk(chunk.to_string()));
    }

    fn on_conversation_id(&mut self, conversation_id: &str) {
        let _ = self
            .tx
            .send(StreamUpdate::ConversationId(conversation_id.to_string()));
    }
}

/// Caller-side switch that silences a [`Detachable`] sink
#[derive(Debug, Clone, Default)]
pub struct TeardownHandle {
    torn_down: Arc<AtomicBool>,
}

impl TeardownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal that the receiving side is gone
    pub fn teardown(&self) {
        self.torn_down.store(true, Ordering::SeqCst);
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }
}

/// Wraps a sink so that callbacks after teardown are no-ops
pub struct Detachable<S> {
    inner: S,
    handle: TeardownHandle,
}

impl<S: StreamSink> Detachable<S> {
    /// Wrap `inner`, returning the sink and the handle that detaches it
    pub fn new(inner: S) -> (Self, TeardownHandle) {
        let handle = TeardownHandle::new();
        (
            Self {
                inner,
                handle: handle.clone(),
            },
            handle,
        )
    }

    /// Wrap `inner` using an existing handle
    pub fn with_handle(inner: S, handle: TeardownHandle) -> Self {
        Self { inner, handle }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: StreamSink> StreamSink for Detachable<S> {
    fn on_chunk(&mut self, chunk: &str) {
        if self.handle.is_torn_down() {
            return;
        }
        self.inner.on_chunk(chunk);
    }

    fn on_conversation_id(&mut self, conversation_id: &str) {
        if self.handle.is_torn_down() {
            return;
        }
        self.inner.on_conversation_id(conversation_id);
    }
}

/// Assistant answer accumulated over one request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledMessage {
    /// Concatenated content fragments
    pub text: String,

    /// Conversation id captured from the stream, if any
    pub conversation_id: Option<String>,

    /// Number of non-empty fragments received
    pub fragments: usize,
}

/// Applies event records to an [`AssembledMessage`] and forwards output to a sink
pub struct AnswerAssembler<S> {
    sink: S,
    message: AssembledMessage,
    terminated: bool,
}

impl<S: StreamSink> AnswerAssembler<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            message: AssembledMessage::default(),
            terminated: false,
        }
    }

    /// Apply one record.
    ///
    /// An error event terminates the assembler: the error is returned and any
    /// later record is rejected without touching the message or the sink.
    pub fn apply(&mut self, record: EventRecord) -> ChatResult<()> {
        if self.terminated {
            return Err(ChatError::VendorStream {
                message: "record received after stream termination".to_string(),
            });
        }

        if self.message.conversation_id.is_none() {
            if let Some(conversation_id) = record.conversation_id() {
                debug!("Captured conversation id {}", conversation_id);
                self.message.conversation_id = Some(conversation_id.to_string());
                self.sink.on_conversation_id(conversation_id);
            }
        }

        match record.kind() {
            kind if kind.is_content() => {
                let fragment = record.answer.as_ref().map(extract_fragment).unwrap_or_default();
                if !fragment.is_empty() {
                    self.message.text.push_str(&fragment);
                    self.message.fragments += 1;
                    self.sink.on_chunk(&fragment);
                }
                Ok(())
            }
            EventKind::Error => {
                self.terminated = true;
                let message = record
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| UNKNOWN_VENDOR_ERROR.to_string());
                error!("Vendor stream error event: {}", message);
                Err(ChatError::VendorStream { message })
            }
            EventKind::Other(event) => {
                if event.is_empty() {
                    warn!("Stream record without event discriminant");
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Whether an error event has been applied
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Message assembled so far
    pub fn message(&self) -> &AssembledMessage {
        &self.message
    }

    /// Consume the assembler, returning the message
    pub fn finish(self) -> AssembledMessage {
        self.message
    }
}

/// Extract the visible fragment from an `answer` value.
///
/// A string that is itself a JSON object with a string `action_input` is
/// replaced by that nested string. Other strings are used verbatim and
/// non-string values are stringified; `null` yields nothing.
pub fn extract_fragment(answer: &Value) -> String {
    match answer {
        Value::String(raw) => unwrap_action_input(raw).unwrap_or_else(|| raw.clone()),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn unwrap_action_input(raw: &str) -> Option<String> {
    if !raw.trim_start().starts_with('{') || !raw.contains("\"action_input\"") {
        return None;
    }
    let nested: Value = serde_json::from_str(raw).ok()?;
    nested
        .get(ACTION_INPUT_KEY)?
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct Recorder {
        chunks: Vec<String>,
        ids: Vec<String>,
    }

    impl StreamSink for Recorder {
        fn on_chunk(&mut self, chunk: &str) {
            self.chunks.push(chunk.to_string());
        }

        fn on_conversation_id(&mut self, conversation_id: &str) {
            self.ids.push(conversation_id.to_string());
        }
    }

    fn content(answer: Value, conversation_id: Option<&str>) -> EventRecord {
        EventRecord {
            event: "message".to_string(),
            conversation_id: conversation_id.map(str::to_string),
            answer: Some(answer),
            message: None,
        }
    }

    #[test]
    fn test_fragments_assemble_in_order() {
        let mut recorder = Recorder::default();
        let mut assembler = AnswerAssembler::new(&mut recorder);
        assembler.apply(content(json!("hello"), None)).unwrap();
        assembler.apply(content(json!(" world"), None)).unwrap();
        let message = assembler.finish();

        assert_eq!(message.text, "hello world");
        assert_eq!(message.fragments, 2);
        assert_eq!(recorder.chunks, vec!["hello", " world"]);
    }

    #[test]
    fn test_conversation_id_first_wins() {
        let mut recorder = Recorder::default();
        let mut assembler = AnswerAssembler::new(&mut recorder);
        assembler.apply(content(json!("hi"), Some("abc123"))).unwrap();
        assembler.apply(content(json!("!"), Some("abc123"))).unwrap();
        assembler.apply(content(json!("?"), Some("other"))).unwrap();
        let message = assembler.finish();

        assert_eq!(message.conversation_id.as_deref(), Some("abc123"));
        assert_eq!(recorder.ids, vec!["abc123"]);
    }

    #[test]
    fn test_action_input_is_unwrapped() {
        let raw = r#"{"action": "Final Answer", "action_input": "nested text"}"#;
        assert_eq!(extract_fragment(&json!(raw)), "nested text");
    }

    #[test]
    fn test_json_without_action_input_is_verbatim() {
        let raw = r#"{"action": "lookup"}"#;
        assert_eq!(extract_fragment(&json!(raw)), raw);

        let broken = r#"{"action_input": "unterminated"#;
        assert_eq!(extract_fragment(&json!(broken)), broken);
    }

    #[test]
    fn test_non_string_answers_are_stringified() {
        assert_eq!(extract_fragment(&json!(42)), "42");
        assert_eq!(extract_fragment(&json!({"a": 1})), r#"{"a":1}"#);
        assert_eq!(extract_fragment(&Value::Null), "");
    }

    #[test]
    fn test_empty_fragment_contributes_nothing() {
        let mut recorder = Recorder::default();
        let mut assembler = AnswerAssembler::new(&mut recorder);
        assembler.apply(content(json!(""), None)).unwrap();
        assert_eq!(assembler.finish().fragments, 0);
        assert!(recorder.chunks.is_empty());
    }

    #[test]
    fn test_error_event_terminates() {
        let mut recorder = Recorder::default();
        let mut assembler = AnswerAssembler::new(&mut recorder);
        assembler.apply(content(json!("partial"), None)).unwrap();

        let err = assembler
            .apply(EventRecord {
                event: "error".to_string(),
                message: Some("boom".to_string()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert!(assembler.is_terminated());

        assert!(assembler.apply(content(json!("late"), None)).is_err());
        assert_eq!(assembler.message().text, "partial");
        assert_eq!(recorder.chunks, vec!["partial"]);
    }

    #[test]
    fn test_error_event_without_message_uses_fallback() {
        let mut assembler = AnswerAssembler::new(Recorder::default());
        let err = assembler
            .apply(EventRecord {
                event: "error".to_string(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.to_string().contains(UNKNOWN_VENDOR_ERROR));
    }

    #[test]
    fn test_detached_sink_is_silent() {
        let (mut sink, handle) = Detachable::new(Recorder::default());
        sink.on_chunk("before");
        handle.teardown();
        sink.on_chunk("after");
        sink.on_conversation_id("abc");

        let recorder = sink.into_inner();
        assert_eq!(recorder.chunks, vec!["before"]);
        assert!(recorder.ids.is_empty());
    }

    #[test]
    fn test_channel_sink_survives_dropped_receiver() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let mut sink = ChannelSink::new(tx);
        drop(rx);
        sink.on_chunk("nobody listening");
        sink.on_conversation_id("abc");
    }
}
