//! Per-frame orchestration: decode, parse, persist, acknowledge, record.
//!
//! [`MessagePipeline::process`] drives one extracted frame end to end. Every
//! message-level fault (invalid UTF-8, a codec parse failure, a failed dump
//! write) is logged and contained at that frame: the message gets no
//! acknowledgment and the connection stays usable. The only error that
//! crosses the pipeline boundary is a failed write on the reply channel,
//! which the session treats as fatal for the connection.

use std::{io, sync::Arc};

use bytes::{Bytes, BytesMut};
use chrono::Utc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::codec::Encoder;
use tracing::{debug, error, info, warn};

use crate::{
    hl7::{AckKind, Hl7Codec},
    hub::EventPublisher,
    mllp::{MllpCodec, MllpFrame},
    persist::MessageSink,
    store::MessageStore,
};

/// Processes extracted MLLP frames on behalf of connection sessions.
///
/// All collaborators are injected at construction and shared across every
/// connection; the pipeline itself holds no per-connection state.
pub struct MessagePipeline {
    codec: Arc<dyn Hl7Codec>,
    sink: Arc<dyn MessageSink>,
    store: Arc<MessageStore>,
    events: Arc<dyn EventPublisher>,
}

impl MessagePipeline {
    /// Assemble a pipeline from its collaborators.
    #[must_use]
    pub fn new(
        codec: Arc<dyn Hl7Codec>,
        sink: Arc<dyn MessageSink>,
        store: Arc<MessageStore>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            codec,
            sink,
            store,
            events,
        }
    }

    /// Process one frame and write the framed acknowledgment to `reply`.
    ///
    /// The acknowledgment write completes (or fails) before the store and
    /// broadcast updates run; failures in those updates can neither retract
    /// nor delay an acknowledgment already sent.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] only when writing to `reply` fails, which is
    /// a transport fault that terminates the connection. All other faults are
    /// logged and swallowed here.
    pub async fn process<W>(&self, frame: &MllpFrame, reply: &mut W, peer: &str) -> io::Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let Some(text) = Self::frame_text(frame, peer) else {
            return Ok(());
        };
        let Some(message) = self.parse_message(&text, peer) else {
            return Ok(());
        };

        let control_id = message.control_id().to_owned();
        let message_type = message.message_type().to_owned();
        let sending_app = message.sending_app().to_owned();
        let sending_facility = message.sending_facility().to_owned();
        debug!(
            peer,
            %control_id,
            %message_type,
            %sending_app,
            %sending_facility,
            "message received"
        );

        // Best-effort: a failed dump must not suppress a protocol-correct ACK.
        let key = format!("{}_{control_id}", Utc::now().format("%Y%m%d%H%M%S%3f"));
        if let Err(err) = self.sink.persist(&key, &text).await {
            warn!(peer, %control_id, %err, "failed to persist message");
        }

        let ack = self
            .codec
            .generate_ack(&message, AckKind::Accept, &sending_app, &sending_facility);
        let ack_text = self.codec.encode(&ack);
        let mut framed = BytesMut::with_capacity(ack_text.len() + 3);
        if let Err(err) = MllpCodec::default().encode(Bytes::from(ack_text), &mut framed) {
            error!(peer, %control_id, %err, "failed to frame acknowledgment");
            return Ok(());
        }

        reply.write_all(&framed).await?;
        reply.flush().await?;

        self.store.add_message(&text);
        self.events.notify(&format!(
            "{message_type} {control_id} received at {}",
            Utc::now().to_rfc3339()
        ));
        info!(peer, %control_id, "message acknowledged");
        Ok(())
    }

    fn frame_text(frame: &MllpFrame, peer: &str) -> Option<String> {
        match frame.text() {
            Ok(text) => Some(text.to_owned()),
            Err(err) => {
                warn!(peer, %err, "frame payload is not valid UTF-8; dropping");
                None
            }
        }
    }

    fn parse_message(&self, text: &str, peer: &str) -> Option<crate::hl7::StructuredMessage> {
        match self.codec.parse(text) {
            Ok(message) => Some(message),
            Err(err) => {
                warn!(peer, %err, payload = text, "failed to parse message; no acknowledgment sent");
                None
            }
        }
    }
}
