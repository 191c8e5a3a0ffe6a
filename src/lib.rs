//! Core building blocks for an HL7 MLLP listener.
//!
//! This crate accepts HL7 messages framed with the Minimal Lower Layer
//! Protocol over raw TCP: it extracts frames from the byte stream, runs each
//! through a processing pipeline that parses the message and replies with a
//! framed acknowledgment, records traffic in a bounded shared store, and
//! fans notifications out to live observers.

pub mod config;
pub mod hl7;
pub mod hub;
pub mod mllp;
pub mod persist;
pub mod pipeline;
pub mod server;
pub mod session;
pub mod store;

pub use hub::{BroadcastHub, EventPublisher, EventSink, SubscriberId};
pub use mllp::{MllpCodec, MllpFrame};
pub use pipeline::MessagePipeline;
pub use session::ConnectionSession;
pub use store::{MessageStore, StoreStats};
