//! Shared utilities for integration tests.

// Items in this shared module may not be used by all test binaries that import it.
#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use std::sync::{Arc, Mutex};

use hl7_listener::{
    hl7::PipeDelimitedCodec,
    hub::{BroadcastHub, EventSink, SinkClosed},
    mllp::{CARRIAGE_RETURN, END_BLOCK, START_BLOCK},
    persist::Discard,
    pipeline::MessagePipeline,
    store::MessageStore,
};

/// Boxed-error result alias shared by the integration tests.
pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Sample ADT^A01 message with control id `1`.
pub const SAMPLE_ADT: &str = "MSH|^~\\&|A|B|C|D|20240101||ADT^A01|1|P|2.4\r";

/// Wrap `text` in MLLP framing: `<0x0B><text><0x1C><0x0D>`.
pub fn frame(text: &str) -> Vec<u8> {
    let mut framed = Vec::with_capacity(text.len() + 3);
    framed.push(START_BLOCK);
    framed.extend_from_slice(text.as_bytes());
    framed.push(END_BLOCK);
    framed.push(CARRIAGE_RETURN);
    framed
}

/// A sample message with the given control id, plus its framed bytes.
pub fn sample_with_control_id(control_id: &str) -> (String, Vec<u8>) {
    let text = format!("MSH|^~\\&|A|B|C|D|20240101||ADT^A01|{control_id}|P|2.4\r");
    let framed = frame(&text);
    (text, framed)
}

/// Shared collaborators behind a pipeline, kept around for assertions.
pub struct Fixture {
    pub store: Arc<MessageStore>,
    pub hub: Arc<BroadcastHub>,
    pub pipeline: Arc<MessagePipeline>,
}

/// Build a pipeline over the default codec, a discarding sink, and fresh
/// shared state.
pub fn fixture() -> Fixture {
    let store = Arc::new(MessageStore::new());
    let hub = Arc::new(BroadcastHub::new());
    let pipeline = Arc::new(MessagePipeline::new(
        Arc::new(PipeDelimitedCodec::default()),
        Arc::new(Discard),
        Arc::clone(&store),
        Arc::clone(&hub) as Arc<dyn hl7_listener::hub::EventPublisher>,
    ));
    Fixture {
        store,
        hub,
        pipeline,
    }
}

/// Extract the acknowledgment payloads from a raw reply stream, in order.
pub fn ack_payloads(bytes: &[u8]) -> Vec<String> {
    let mut payloads = Vec::new();
    let mut rest = bytes;
    while let Some(start) = rest.iter().position(|&b| b == START_BLOCK) {
        let Some(end) = rest.iter().position(|&b| b == END_BLOCK) else {
            break;
        };
        assert!(
            start < end,
            "end-of-block before start-of-block in reply stream"
        );
        payloads.push(String::from_utf8_lossy(&rest[start + 1..end]).into_owned());
        rest = &rest[end + 1..];
    }
    payloads
}

/// Event sink that records everything it is offered.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().expect("sink lock poisoned").clone()
    }
}

impl EventSink for RecordingSink {
    fn send_event(&self, event: &str) -> Result<(), SinkClosed> {
        self.events
            .lock()
            .expect("sink lock poisoned")
            .push(event.to_owned());
        Ok(())
    }
}

/// Event sink that refuses every event.
pub struct FailingSink;

impl EventSink for FailingSink {
    fn send_event(&self, _event: &str) -> Result<(), SinkClosed> { Err(SinkClosed) }
}
