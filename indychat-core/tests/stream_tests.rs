//! Integration tests for the streaming response pipeline

use futures::stream;
use indychat_core::stream::{drive, CallbackSink, Detachable, StreamSink};
use indychat_core::{AssembledMessage, ChatError, ChatResult};
use proptest::prelude::*;

/// Sink that records everything it receives
#[derive(Debug, Default)]
struct Recorder {
    chunks: Vec<String>,
    conversation_ids: Vec<String>,
}

impl StreamSink for Recorder {
    fn on_chunk(&mut self, chunk: &str) {
        self.chunks.push(chunk.to_string());
    }

    fn on_conversation_id(&mut self, conversation_id: &str) {
        self.conversation_ids.push(conversation_id.to_string());
    }
}

/// Feed `chunks` through the pipeline as a successful byte stream
fn run(chunks: Vec<Vec<u8>>, sink: &mut Recorder) -> ChatResult<AssembledMessage> {
    let items = chunks.into_iter().map(Ok::<_, std::io::Error>);
    tokio_test::block_on(drive(stream::iter(items), sink))
}

fn run_str(body: &str, sink: &mut Recorder) -> ChatResult<AssembledMessage> {
    run(vec![body.as_bytes().to_vec()], sink)
}

const TWO_FRAGMENTS: &str = "data: {\"event\":\"message\",\"answer\":\"Hel\"}\n\
                             data: {\"event\":\"message\",\"answer\":\"lo\"}\n";

#[test]
fn test_fragments_concatenate_in_order() {
    let mut sink = Recorder::default();
    let message = run_str(TWO_FRAGMENTS, &mut sink).unwrap();
    assert_eq!(message.text, "Hello");
    assert_eq!(sink.chunks, vec!["Hel", "lo"]);
}

#[test]
fn test_leading_whitespace_in_fragment_is_kept() {
    let body = "data: {\"event\":\"message\",\"answer\":\"hello\"}\n\
                data: {\"event\":\"message\",\"answer\":\" world\"}\n";
    let mut sink = Recorder::default();
    let message = run_str(body, &mut sink).unwrap();
    assert_eq!(sink.chunks, vec!["hello", " world"]);
    assert_eq!(message.text, "hello world");
}

#[test]
fn test_line_split_across_chunks() {
    let mut sink = Recorder::default();
    let chunks = vec![
        b"data: {\"event\":\"message\",\"ans".to_vec(),
        b"wer\":\"hi\"}\n".to_vec(),
    ];
    let message = run(chunks, &mut sink).unwrap();
    assert_eq!(message.text, "hi");
}

#[test]
fn test_conversation_id_reported_once() {
    let body = "data: {\"event\":\"message\",\"conversation_id\":\"abc123\",\"answer\":\"a\"}\n\
                data: {\"event\":\"message\",\"conversation_id\":\"abc123\",\"answer\":\"b\"}\n\
                data: {\"event\":\"message_end\",\"conversation_id\":\"other\"}\n";
    let mut sink = Recorder::default();
    let message = run_str(body, &mut sink).unwrap();
    assert_eq!(sink.conversation_ids, vec!["abc123"]);
    assert_eq!(message.conversation_id.as_deref(), Some("abc123"));
    assert_eq!(message.text, "ab");
}

#[test]
fn test_error_event_stops_processing() {
    let body = "data: {\"event\":\"message\",\"answer\":\"partial\"}\n\
                data: {\"event\":\"error\",\"message\":\"boom\"}\n\
                data: {\"event\":\"message\",\"answer\":\"never\"}\n";
    let mut sink = Recorder::default();
    let err = run_str(body, &mut sink).unwrap_err();
    match err {
        ChatError::VendorStream { message } => assert_eq!(message, "boom"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(sink.chunks, vec!["partial"]);
}

#[test]
fn test_error_event_without_message_uses_fallback() {
    let mut sink = Recorder::default();
    let err = run_str("data: {\"event\":\"error\"}\n", &mut sink).unwrap_err();
    assert!(err
        .to_string()
        .contains("Unknown error from API during response generation"));
}

#[test]
fn test_keepalives_and_non_data_lines_are_ignored() {
    let body = "\n: ping\nevent: message\ndata: \ndata:    \n\
                data: {\"event\":\"message\",\"answer\":\"ok\"}\r\n";
    let mut sink = Recorder::default();
    let message = run_str(body, &mut sink).unwrap();
    assert_eq!(message.text, "ok");
    assert_eq!(message.fragments, 1);
}

#[test]
fn test_malformed_record_is_fatal() {
    let body = "data: {\"event\":\"message\",\"answer\":\"x\"}\n\
                data: {not json}\n\
                data: {\"event\":\"message\",\"answer\":\"y\"}\n";
    let mut sink = Recorder::default();
    let err = run_str(body, &mut sink).unwrap_err();
    assert!(matches!(err, ChatError::Framing { .. }));
    assert_eq!(sink.chunks, vec!["x"]);
}

#[test]
fn test_action_input_is_unwrapped() {
    let body = r#"data: {"event":"agent_message","answer":"{\"action\":\"Final Answer\",\"action_input\":\"Bins go out Monday\"}"}"#;
    let mut sink = Recorder::default();
    let message = run_str(&format!("{body}\n"), &mut sink).unwrap();
    assert_eq!(message.text, "Bins go out Monday");
}

#[test]
fn test_non_content_events_add_nothing() {
    let body = "data: {\"event\":\"agent_thought\",\"answer\":\"thinking\"}\n\
                data: {\"event\":\"message_end\"}\n";
    let mut sink = Recorder::default();
    let message = run_str(body, &mut sink).unwrap();
    assert!(message.text.is_empty());
    assert!(sink.chunks.is_empty());
}

#[test]
fn test_unterminated_final_line_is_dropped() {
    let body = "data: {\"event\":\"message\",\"answer\":\"kept\"}\n\
                data: {\"event\":\"message\",\"answer\":\"lost\"}";
    let mut sink = Recorder::default();
    let message = run_str(body, &mut sink).unwrap();
    assert_eq!(message.text, "kept");
}

#[test]
fn test_read_error_maps_to_network() {
    let items = vec![
        Ok(b"data: {\"event\":\"message\",\"answer\":\"a\"}\n".to_vec()),
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
    ];
    let mut sink = Recorder::default();
    let err = tokio_test::block_on(drive(stream::iter(items), &mut sink)).unwrap_err();
    assert!(matches!(err, ChatError::Network { .. }));
    assert_eq!(sink.chunks, vec!["a"]);
}

#[test]
fn test_detached_sink_is_silent() {
    let mut received = Vec::new();
    {
        let sink = CallbackSink::new(|c: &str| received.push(c.to_string()), |_: &str| {});
        let (sink, handle) = Detachable::new(sink);
        handle.teardown();
        let items = vec![Ok::<_, std::io::Error>(TWO_FRAGMENTS.as_bytes().to_vec())];
        let message = tokio_test::block_on(drive(stream::iter(items), sink)).unwrap();
        assert_eq!(message.text, "Hello");
    }
    assert!(received.is_empty());
}

/// Split `body` at the given sorted cut points
fn split_at(body: &[u8], cuts: &[usize]) -> Vec<Vec<u8>> {
    let mut chunks = Vec::new();
    let mut start = 0;
    for &cut in cuts {
        chunks.push(body[start..cut].to_vec());
        start = cut;
    }
    chunks.push(body[start..].to_vec());
    chunks
}

proptest! {
    #[test]
    fn prop_split_invariance(
        fragments in proptest::collection::vec("[a-zA-Zé€😀 .,]{0,8}", 1..6),
        raw_cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..8),
    ) {
        let body: String = fragments
            .iter()
            .map(|f| {
                let record = serde_json::json!({"event": "message", "conversation_id": "c1", "answer": f});
                format!("data: {}\n", record)
            })
            .collect();
        let bytes = body.as_bytes();

        let mut cuts: Vec<usize> = raw_cuts.iter().map(|i| i.index(bytes.len() + 1)).collect();
        cuts.sort_unstable();

        let mut whole = Recorder::default();
        let expected = run(vec![bytes.to_vec()], &mut whole).unwrap();

        let mut split = Recorder::default();
        let actual = run(split_at(bytes, &cuts), &mut split).unwrap();

        prop_assert_eq!(&actual, &expected);
        prop_assert_eq!(&split.chunks, &whole.chunks);
        prop_assert_eq!(split.conversation_ids.len(), 1);
        prop_assert_eq!(actual.text, fragments.concat());
    }
}
