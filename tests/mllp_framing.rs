//! Frame extraction and encoding behaviour of the MLLP codec.

use bytes::{Bytes, BytesMut};
use hl7_listener::mllp::{CARRIAGE_RETURN, END_BLOCK, MllpCodec, MllpFrame, START_BLOCK};
use proptest::prelude::*;
use rstest::rstest;
use tokio_util::codec::{Decoder, Encoder};

mod common;
use common::{SAMPLE_ADT, TestResult, frame};

fn decode_all(codec: &mut MllpCodec, src: &mut BytesMut) -> Vec<MllpFrame> {
    let mut frames = Vec::new();
    while let Some(frame) = codec.decode(src).expect("decode should not fail") {
        frames.push(frame);
    }
    frames
}

#[test]
fn extracts_a_single_frame() -> TestResult {
    let mut codec = MllpCodec::default();
    let mut buffer = BytesMut::from(frame(SAMPLE_ADT).as_slice());

    let extracted = codec.decode(&mut buffer)?.ok_or("expected a frame")?;
    assert!(extracted.text()?.starts_with("MSH|"));
    assert_eq!(extracted.text()?, SAMPLE_ADT);
    assert_eq!(extracted.as_bytes().first(), Some(&START_BLOCK));
    assert_eq!(extracted.as_bytes().last(), Some(&END_BLOCK));

    // Only the trailing carriage return remains; no further frame.
    assert!(codec.decode(&mut buffer)?.is_none());
    Ok(())
}

#[test]
fn two_back_to_back_frames_decode_in_order() -> TestResult {
    let mut bytes = frame("MSH|^~\\&|A|B|C|D|1||ADT^A01|first|P|2.4\r");
    bytes.extend_from_slice(&frame("MSH|^~\\&|A|B|C|D|2||ADT^A01|second|P|2.4\r"));

    let mut codec = MllpCodec::default();
    let mut buffer = BytesMut::from(bytes.as_slice());
    let frames = decode_all(&mut codec, &mut buffer);

    assert_eq!(frames.len(), 2);
    assert!(frames[0].text()?.contains("|first|"));
    assert!(frames[1].text()?.contains("|second|"));
    Ok(())
}

#[test]
fn partial_frame_is_retained_until_completed() -> TestResult {
    let full = frame(SAMPLE_ADT);
    let (head, tail) = full.split_at(10);

    let mut codec = MllpCodec::default();
    let mut buffer = BytesMut::from(head);
    assert!(codec.decode(&mut buffer)?.is_none());

    buffer.extend_from_slice(tail);
    let extracted = codec.decode(&mut buffer)?.ok_or("expected a frame")?;
    assert_eq!(extracted.text()?, SAMPLE_ADT);
    Ok(())
}

/// An end-of-block with no preceding start-of-block must never produce a
/// frame; the decoder discards through it and keeps scanning.
#[rstest]
#[case::lone_end_marker(vec![END_BLOCK])]
#[case::noise_then_end_marker(b"leftover\x1c".to_vec())]
#[case::end_marker_then_partial(b"\x1c\x0bMSH|".to_vec())]
fn spurious_end_marker_yields_no_frame(#[case] bytes: Vec<u8>) -> TestResult {
    let mut codec = MllpCodec::default();
    let mut buffer = BytesMut::from(bytes.as_slice());
    assert!(codec.decode(&mut buffer)?.is_none());
    Ok(())
}

#[test]
fn frame_after_spurious_end_marker_is_extracted() -> TestResult {
    let mut bytes = b"garbage\x1cmore".to_vec();
    bytes.extend_from_slice(&frame(SAMPLE_ADT));

    let mut codec = MllpCodec::default();
    let mut buffer = BytesMut::from(bytes.as_slice());
    let extracted = codec.decode(&mut buffer)?.ok_or("expected a frame")?;
    assert_eq!(extracted.text()?, SAMPLE_ADT);
    Ok(())
}

#[test]
fn leading_noise_is_dropped_from_the_frame() -> TestResult {
    let mut bytes = b"\r\nnoise".to_vec();
    bytes.extend_from_slice(&frame(SAMPLE_ADT));

    let mut codec = MllpCodec::default();
    let mut buffer = BytesMut::from(bytes.as_slice());
    let extracted = codec.decode(&mut buffer)?.ok_or("expected a frame")?;
    assert_eq!(extracted.text()?, SAMPLE_ADT);
    Ok(())
}

#[test]
fn unframed_stream_beyond_limit_is_rejected() {
    let mut codec = MllpCodec::new(16);
    let mut buffer = BytesMut::from(&[0x41u8; 32][..]);
    let err = codec
        .decode(&mut buffer)
        .expect_err("oversized unframed input should be rejected");
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
}

#[test]
fn decode_eof_discards_residual_bytes() -> TestResult {
    let mut codec = MllpCodec::default();
    let mut buffer = BytesMut::from(&b"\x0bMSH|truncated"[..]);
    assert!(codec.decode_eof(&mut buffer)?.is_none());
    assert!(buffer.is_empty());
    Ok(())
}

#[test]
fn encoder_wraps_payload_with_markers() -> TestResult {
    let mut codec = MllpCodec::default();
    let mut out = BytesMut::new();
    codec.encode(Bytes::from_static(b"MSA|AA|1"), &mut out)?;

    assert_eq!(out.first(), Some(&START_BLOCK));
    assert_eq!(&out[1..out.len() - 2], b"MSA|AA|1");
    assert_eq!(out[out.len() - 2], END_BLOCK);
    assert_eq!(out[out.len() - 1], CARRIAGE_RETURN);
    Ok(())
}

proptest! {
    /// Frames extracted from a stream are the same no matter how the stream
    /// is split across reads.
    #[test]
    fn split_invariance(
        payloads in prop::collection::vec(
            prop::collection::vec(0x20u8..0x7f, 0..40),
            0..5,
        ),
        chunk_len in 1usize..17,
    ) {
        let mut stream = Vec::new();
        for payload in &payloads {
            stream.push(START_BLOCK);
            stream.extend_from_slice(payload);
            stream.push(END_BLOCK);
            stream.push(CARRIAGE_RETURN);
        }

        // All at once.
        let mut whole = BytesMut::from(stream.as_slice());
        let all_at_once = decode_all(&mut MllpCodec::default(), &mut whole);

        // Fed chunk by chunk, draining between reads.
        let mut codec = MllpCodec::default();
        let mut buffer = BytesMut::new();
        let mut chunked = Vec::new();
        for chunk in stream.chunks(chunk_len) {
            buffer.extend_from_slice(chunk);
            chunked.extend(decode_all(&mut codec, &mut buffer));
        }

        prop_assert_eq!(all_at_once, chunked);
    }
}
