//! HL7 message codec seam.
//!
//! The listener core never interprets HL7 semantics beyond a handful of
//! header fields; everything else is the codec's business. [`Hl7Codec`] is
//! the boundary: parse raw text into a [`StructuredMessage`], generate an
//! acknowledgment for it, and encode that acknowledgment back to text.
//! [`PipeDelimitedCodec`] is the default implementation; a validating
//! library can replace it at wiring time without touching the pipeline.

use thiserror::Error;

/// Fallback returned by the convenience accessors when a header field is
/// absent. Absence is routine, not an error.
pub const FIELD_FALLBACK: &str = "Unknown";

/// Failure to turn raw text into a structured message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The message contained no segments.
    #[error("message is empty")]
    Empty,
    /// The first segment was not an MSH header.
    #[error("message does not begin with an MSH segment")]
    MissingHeader,
}

/// Acknowledgment disposition carried in MSA-1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AckKind {
    /// Application accept (`AA`).
    Accept,
    /// Application error (`AE`).
    Error,
    /// Application reject (`AR`).
    Reject,
}

impl AckKind {
    /// Two-letter MSA-1 code for this disposition.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Accept => "AA",
            Self::Error => "AE",
            Self::Reject => "AR",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Segment {
    id: String,
    fields: Vec<String>,
}

/// A parsed HL7 message: an ordered list of `|`-delimited segments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructuredMessage {
    segments: Vec<Segment>,
}

impl StructuredMessage {
    /// Look up a field by segment identifier and standard field number.
    ///
    /// Returns `None` when the segment or field is absent or empty. MSH-1 is
    /// the field separator itself, so MSH lookups are offset by one relative
    /// to the other segments.
    #[must_use]
    pub fn field(&self, segment_id: &str, index: usize) -> Option<&str> {
        let segment = self.segments.iter().find(|s| s.id == segment_id)?;
        let slot = if segment_id == "MSH" {
            index.checked_sub(2)?
        } else {
            index.checked_sub(1)?
        };
        segment
            .fields
            .get(slot)
            .map(String::as_str)
            .filter(|f| !f.is_empty())
    }

    /// Look up a field, falling back to `default` when it is absent.
    #[must_use]
    pub fn field_or<'a>(&'a self, segment_id: &str, index: usize, default: &'a str) -> &'a str {
        self.field(segment_id, index).unwrap_or(default)
    }

    /// Sender-assigned control identifier (MSH-10).
    #[must_use]
    pub fn control_id(&self) -> &str { self.field_or("MSH", 10, FIELD_FALLBACK) }

    /// Message type and trigger event, `code^trigger` (MSH-9).
    #[must_use]
    pub fn message_type(&self) -> &str { self.field_or("MSH", 9, FIELD_FALLBACK) }

    /// Sending application (MSH-3).
    #[must_use]
    pub fn sending_app(&self) -> &str { self.field_or("MSH", 3, FIELD_FALLBACK) }

    /// Sending facility (MSH-4).
    #[must_use]
    pub fn sending_facility(&self) -> &str { self.field_or("MSH", 4, FIELD_FALLBACK) }

    /// Protocol version (MSH-12), defaulting to `2.4`.
    #[must_use]
    pub fn version(&self) -> &str { self.field_or("MSH", 12, "2.4") }
}

/// An acknowledgment message awaiting encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AckMessage {
    segments: Vec<String>,
}

impl AckMessage {
    /// Segments of the acknowledgment in wire order.
    #[must_use]
    pub fn segments(&self) -> &[String] { &self.segments }
}

/// Boundary to the HL7 parsing and acknowledgment machinery.
pub trait Hl7Codec: Send + Sync {
    /// Parse raw message text into a structured message.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] when the text cannot be interpreted as an
    /// HL7 message at all. Individual absent fields are not errors.
    fn parse(&self, text: &str) -> Result<StructuredMessage, ParseError>;

    /// Build an acknowledgment for `message`, addressed back to the sender
    /// identified by `sending_app` and `sending_facility`.
    fn generate_ack(
        &self,
        message: &StructuredMessage,
        kind: AckKind,
        sending_app: &str,
        sending_facility: &str,
    ) -> AckMessage;

    /// Encode an acknowledgment as message text ready for framing.
    fn encode(&self, ack: &AckMessage) -> String;
}

/// Default codec: segments on carriage returns, fields on pipes.
///
/// `app` and `facility` identify this listener in the MSH header of generated
/// acknowledgments.
#[derive(Clone, Debug)]
pub struct PipeDelimitedCodec {
    app: String,
    facility: String,
}

impl PipeDelimitedCodec {
    /// Construct a codec that signs acknowledgments as `app` at `facility`.
    #[must_use]
    pub fn new(app: impl Into<String>, facility: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            facility: facility.into(),
        }
    }
}

impl Default for PipeDelimitedCodec {
    fn default() -> Self { Self::new("HL7Listener", "Main") }
}

impl Hl7Codec for PipeDelimitedCodec {
    fn parse(&self, text: &str) -> Result<StructuredMessage, ParseError> {
        let segments: Vec<Segment> = text
            .split(['\r', '\n'])
            .filter(|raw| !raw.is_empty())
            .map(|raw| {
                let mut parts = raw.split('|');
                let id = parts.next().unwrap_or_default().to_owned();
                Segment {
                    id,
                    fields: parts.map(str::to_owned).collect(),
                }
            })
            .collect();

        match segments.first() {
            None => Err(ParseError::Empty),
            Some(first) if first.id != "MSH" => Err(ParseError::MissingHeader),
            Some(_) => Ok(StructuredMessage { segments }),
        }
    }

    fn generate_ack(
        &self,
        message: &StructuredMessage,
        kind: AckKind,
        sending_app: &str,
        sending_facility: &str,
    ) -> AckMessage {
        let now = chrono::Utc::now().format("%Y%m%d%H%M%S");
        let trigger = message
            .message_type()
            .split('^')
            .nth(1)
            .filter(|t| !t.is_empty())
            .map_or_else(|| "ACK".to_owned(), |t| format!("ACK^{t}"));
        let header = format!(
            "MSH|^~\\&|{}|{}|{}|{}|{}||{}|ACK{}|P|{}",
            self.app,
            self.facility,
            sending_app,
            sending_facility,
            now,
            trigger,
            now,
            message.version(),
        );
        let status = format!("MSA|{}|{}", kind.code(), message.control_id());
        AckMessage {
            segments: vec![header, status],
        }
    }

    fn encode(&self, ack: &AckMessage) -> String {
        let mut text = ack.segments.join("\r");
        text.push('\r');
        text
    }
}
