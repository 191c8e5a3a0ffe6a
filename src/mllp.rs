//! MLLP framing over a raw byte stream.
//!
//! The Minimal Lower Layer Protocol wraps each HL7 message in a start-of-block
//! byte (`0x0B`) and an end-of-block byte (`0x1C`), with a trailing carriage
//! return on the wire. [`MllpCodec`] extracts complete frames from an
//! accumulating [`BytesMut`] buffer and wraps outbound payloads for
//! transmission.
//!
//! A single read may carry zero, one, or many complete frames, so the decoder
//! is driven repeatedly until it reports that no full frame remains. Partial
//! frames are never emitted; the unconsumed bytes stay in the buffer until
//! more input arrives.

use std::io;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Start-of-block marker (`<VT>`).
pub const START_BLOCK: u8 = 0x0B;
/// End-of-block marker (`<FS>`).
pub const END_BLOCK: u8 = 0x1C;
/// Trailing terminator written after the end-of-block on outbound frames.
pub const CARRIAGE_RETURN: u8 = 0x0D;

/// Default cap on bytes buffered while waiting for an end-of-block marker
/// (1 MiB). A peer that streams unframed data past this limit is terminated
/// rather than buffered without bound.
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 1024 * 1024;

/// One complete MLLP frame, start and end markers included.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MllpFrame(Bytes);

impl MllpFrame {
    /// Message bytes between the markers.
    #[must_use]
    pub fn payload(&self) -> &[u8] { self.0.get(1..self.0.len() - 1).unwrap_or(&[]) }

    /// Decode the payload as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns a [`std::str::Utf8Error`] if the payload is not valid UTF-8.
    pub fn text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(self.payload())
    }

    /// Raw frame bytes, markers included.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] { &self.0 }
}

/// Marker-delimited framing codec for MLLP streams.
#[derive(Clone, Debug)]
pub struct MllpCodec {
    max_frame_length: usize,
}

impl MllpCodec {
    /// Construct a codec with a custom buffering limit.
    #[must_use]
    pub const fn new(max_frame_length: usize) -> Self { Self { max_frame_length } }

    /// Maximum number of bytes buffered before an unframed stream is rejected.
    #[must_use]
    pub const fn max_frame_length(&self) -> usize { self.max_frame_length }
}

impl Default for MllpCodec {
    fn default() -> Self { Self::new(DEFAULT_MAX_FRAME_LENGTH) }
}

impl Decoder for MllpCodec {
    type Item = MllpFrame;
    type Error = io::Error;

    /// Extract the next complete frame from `src`, if one is present.
    ///
    /// A frame is emitted only when a start marker occurs strictly before an
    /// end marker. An end marker with no preceding start marker is leftover
    /// noise from a malformed send: everything up to and including it is
    /// discarded and the scan continues. Bytes preceding the start marker
    /// (including the trailing carriage return of the previous frame) are
    /// dropped silently.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] when more than `max_frame_length` bytes
    /// accumulate without a complete frame.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let start = src.iter().position(|&b| b == START_BLOCK);
            let end = src.iter().position(|&b| b == END_BLOCK);
            match (start, end) {
                (Some(s), Some(e)) if s < e => {
                    let mut frame = src.split_to(e + 1);
                    frame.advance(s);
                    return Ok(Some(MllpFrame(frame.freeze())));
                }
                // End-of-block before any start-of-block: not a valid frame
                // boundary. Skip past it rather than emitting a corrupt slice.
                (_, Some(e)) => {
                    tracing::debug!(discarded = e + 1, "skipping spurious end-of-block marker");
                    src.advance(e + 1);
                }
                _ => {
                    if src.len() > self.max_frame_length {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!(
                                "no end-of-block marker within {} bytes",
                                self.max_frame_length
                            ),
                        ));
                    }
                    return Ok(None);
                }
            }
        }
    }

    /// Drain remaining complete frames at end of stream.
    ///
    /// Disconnection mid-frame is routine for a protocol listener, so residual
    /// bytes that never formed a complete frame are discarded rather than
    /// reported as an error.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] only when the buffering limit is exceeded.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if !src.is_empty() {
            tracing::debug!(residual = src.len(), "discarding residual bytes at end of stream");
            src.clear();
        }
        Ok(None)
    }
}

impl Encoder<Bytes> for MllpCodec {
    type Error = io::Error;

    /// Wrap `payload` as `<0x0B><payload><0x1C><0x0D>` and append it to `dst`.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] if `payload` exceeds the configured frame
    /// length.
    fn encode(&mut self, payload: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if payload.len() > self.max_frame_length {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "payload exceeds maximum frame length",
            ));
        }
        dst.reserve(payload.len() + 3);
        dst.put_u8(START_BLOCK);
        dst.extend_from_slice(&payload);
        dst.put_u8(END_BLOCK);
        dst.put_u8(CARRIAGE_RETURN);
        Ok(())
    }
}
