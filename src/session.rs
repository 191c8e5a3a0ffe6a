//! Read/decode/process/write loop for one connection.
//!
//! A session owns its transport exclusively and is generic over the stream
//! type, so tests drive it with [`tokio::io::duplex`] and a deployment can
//! wrap the accepted socket (for TLS, say) without the session noticing.
//!
//! Within a session, frames are dispatched strictly in arrival order and
//! each is fully processed before more bytes are read, so acknowledgments
//! leave in the same order the frames came in. Message-level faults are
//! contained inside the pipeline; only transport and framing errors end the
//! session.

use std::{io, sync::Arc, time::Instant};

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio_util::codec::Decoder;
use tracing::{error, info};

use crate::{mllp::MllpCodec, pipeline::MessagePipeline};

const READ_CHUNK: usize = 4096;

/// Drives a single connection from establishment to disconnect.
pub struct ConnectionSession<S> {
    stream: S,
    peer: String,
    pipeline: Arc<MessagePipeline>,
    codec: MllpCodec,
}

impl<S> ConnectionSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Create a session for `stream`, labelled with the peer's identity.
    pub fn new(stream: S, peer: impl Into<String>, pipeline: Arc<MessagePipeline>) -> Self {
        Self {
            stream,
            peer: peer.into(),
            pipeline,
            codec: MllpCodec::default(),
        }
    }

    /// Replace the default framing codec, e.g. to lower the buffering limit.
    #[must_use]
    pub fn with_codec(mut self, codec: MllpCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Run the session until the peer closes the connection or the transport
    /// fails.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] on a read or write failure, or when the
    /// framing codec rejects the stream. Both are terminal for the
    /// connection; the error is also logged here with the session duration.
    pub async fn run(mut self) -> io::Result<()> {
        info!(peer = %self.peer, "connection established");
        let started = Instant::now();
        match self.read_loop().await {
            Ok(frames) => {
                info!(
                    peer = %self.peer,
                    frames,
                    elapsed = ?started.elapsed(),
                    "connection closed"
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    peer = %self.peer,
                    %err,
                    elapsed = ?started.elapsed(),
                    "connection terminated"
                );
                Err(err)
            }
        }
    }

    async fn read_loop(&mut self) -> io::Result<u64> {
        let mut buffer = BytesMut::with_capacity(READ_CHUNK);
        let mut frames: u64 = 0;
        loop {
            // Drain every complete frame before reading more bytes: per-frame
            // processing is synchronous and in order within a connection.
            while let Some(frame) = self.codec.decode(&mut buffer)? {
                self.pipeline
                    .process(&frame, &mut self.stream, &self.peer)
                    .await?;
                frames += 1;
            }
            if self.stream.read_buf(&mut buffer).await? == 0 {
                // End of stream. Whatever is left never formed a frame.
                self.codec.decode_eof(&mut buffer)?;
                return Ok(frames);
            }
        }
    }
}
