//! Best-effort fan-out of traffic notifications to live observers.
//!
//! [`BroadcastHub`] keeps a concurrent registry of subscriber sinks and
//! delivers each event to every registered sink. Delivery is strictly
//! best-effort: a sink that fails to accept an event is marked dead and
//! evicted after the broadcast pass, and no subscriber failure ever reaches
//! the caller.

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::warn;

/// Identifier assigned to a subscriber.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl From<u64> for SubscriberId {
    fn from(value: u64) -> Self { Self(value) }
}

impl SubscriberId {
    /// Create a new [`SubscriberId`] with the provided value.
    #[must_use]
    pub const fn new(id: u64) -> Self { Self(id) }

    /// Return the inner `u64` representation.
    #[must_use]
    pub const fn as_u64(&self) -> u64 { self.0 }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SubscriberId({})", self.0)
    }
}

/// The sink refused the event; the subscriber is considered dead.
#[derive(Debug, Error)]
#[error("subscriber sink is closed or full")]
pub struct SinkClosed;

/// Append-only text sink owned by one subscriber.
///
/// Implementations must not block: an event is either accepted immediately
/// (and flushed by the sink's transport) or refused with [`SinkClosed`].
pub trait EventSink: Send + Sync {
    /// Deliver one formatted event to the subscriber.
    ///
    /// # Errors
    ///
    /// Returns [`SinkClosed`] when the event cannot be delivered; the hub
    /// responds by evicting the subscriber.
    fn send_event(&self, event: &str) -> Result<(), SinkClosed>;
}

impl<S: EventSink + ?Sized> EventSink for std::sync::Arc<S> {
    fn send_event(&self, event: &str) -> Result<(), SinkClosed> {
        (**self).send_event(event)
    }
}

/// Sink delivering events over a bounded tokio channel.
///
/// A full or closed channel counts as a dead subscriber; slow consumers are
/// evicted rather than allowed to stall message acknowledgment.
pub struct ChannelSink(mpsc::Sender<String>);

impl ChannelSink {
    /// Wrap a channel sender as an event sink.
    #[must_use]
    pub const fn new(tx: mpsc::Sender<String>) -> Self { Self(tx) }
}

impl EventSink for ChannelSink {
    fn send_event(&self, event: &str) -> Result<(), SinkClosed> {
        self.0.try_send(event.to_owned()).map_err(|_| SinkClosed)
    }
}

/// Capability consumed by the processing pipeline to announce new traffic.
///
/// Decoupled from the registry so the subscriber transport can change
/// without touching the pipeline.
pub trait EventPublisher: Send + Sync {
    /// Announce an event to whoever is listening. Never fails.
    fn notify(&self, text: &str);
}

/// Concurrent subscriber registry with best-effort fan-out.
#[derive(Default)]
pub struct BroadcastHub {
    subscribers: DashMap<SubscriberId, Box<dyn EventSink>>,
}

impl BroadcastHub {
    /// Create a hub with no subscribers.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Register a sink for `id`, replacing any existing registration.
    pub fn register(&self, id: SubscriberId, sink: Box<dyn EventSink>) {
        self.subscribers.insert(id, sink);
    }

    /// Remove a subscriber, typically on observer disconnect.
    pub fn unregister(&self, id: &SubscriberId) { self.subscribers.remove(id); }

    /// Number of currently registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize { self.subscribers.len() }

    /// Deliver `text` to every registered subscriber.
    ///
    /// Each subscriber receives one `data: <text>` event. Sinks that refuse
    /// the event are collected during the pass and evicted afterwards, so
    /// the registry is never mutated while it is being iterated.
    pub fn broadcast(&self, text: &str) {
        let event = format!("data: {text}\n\n");
        let mut dead = Vec::new();
        for entry in &self.subscribers {
            if entry.value().send_event(&event).is_err() {
                dead.push(*entry.key());
            }
        }
        for id in dead {
            warn!(%id, "evicting unresponsive subscriber");
            self.subscribers.remove(&id);
        }
    }
}

impl EventPublisher for BroadcastHub {
    fn notify(&self, text: &str) { self.broadcast(text); }
}
