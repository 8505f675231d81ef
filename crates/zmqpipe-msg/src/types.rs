//! ---
//! zmq_section: "02-messaging"
//! zmq_subsection: "module"
//! zmq_type: "source"
//! zmq_scope: "code"
//! zmq_description: "Message framing and publish lifecycle."
//! zmq_version: "v0.1.0"
//! zmq_owner: "tbd"
//! ---
use std::fmt;
use std::io::Read;

/// Trailing frame sent when a sequence number is faked: the integer 0 as a
/// 4-byte little-endian value.
pub const FAKE_SEQUENCE_FRAME: [u8; 4] = 0u32.to_le_bytes();

/// Topic string, sent verbatim as the first frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic(String);

impl Topic {
    /// Wrap a caller-supplied topic without altering it.
    pub fn new(topic: impl Into<String>) -> Self {
        Self(topic.into())
    }

    /// Topic as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Topic bytes exactly as they go on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw bytes read from the input stream. Never modified after reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload(Vec<u8>);

impl Payload {
    /// Wrap bytes that were already read.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Read `reader` to end of stream.
    pub fn read_from<R: Read>(mut reader: R) -> std::io::Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(Self(bytes))
    }

    /// The untrimmed input.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Input with surrounding whitespace removed, used only to detect hex.
    ///
    /// Unicode whitespace is trimmed when the input is UTF-8, ASCII
    /// whitespace otherwise.
    pub fn trimmed(&self) -> &[u8] {
        match std::str::from_utf8(&self.0) {
            Ok(text) => text.trim().as_bytes(),
            Err(_) => self.0.trim_ascii(),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// How the payload frame was derived from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadEncoding {
    /// The trimmed input was a hex string and its decoded bytes are sent.
    HexDecoded,
    /// The untrimmed input is sent as-is.
    Literal,
}

impl fmt::Display for PayloadEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadEncoding::HexDecoded => f.write_str("hex-decoded"),
            PayloadEncoding::Literal => f.write_str("literal"),
        }
    }
}

/// Bytes of the payload frame together with the encoding that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    bytes: Vec<u8>,
    encoding: PayloadEncoding,
}

impl EncodedPayload {
    pub(crate) fn new(bytes: Vec<u8>, encoding: PayloadEncoding) -> Self {
        Self { bytes, encoding }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn encoding(&self) -> PayloadEncoding {
        self.encoding
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Role of a frame within a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// First frame, the topic.
    Topic,
    /// Second frame, the encoded payload.
    Payload,
    /// Optional last frame, the constant zero sequence number.
    SequenceNumber,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameKind::Topic => f.write_str("topic"),
            FrameKind::Payload => f.write_str("payload"),
            FrameKind::SequenceNumber => f.write_str("sequence number"),
        }
    }
}

/// One part of a multipart message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    kind: FrameKind,
    bytes: Vec<u8>,
}

impl Frame {
    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Ordered frames of one publish.
///
/// Always topic then payload, optionally followed by the zero sequence
/// frame. The constructor is the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    frames: Vec<Frame>,
    encoding: PayloadEncoding,
}

impl Message {
    /// Build the frame sequence for `topic` and `payload`.
    pub fn new(topic: &Topic, payload: EncodedPayload, fake_seq_num: bool) -> Self {
        let encoding = payload.encoding;
        let mut frames = Vec::with_capacity(if fake_seq_num { 3 } else { 2 });
        frames.push(Frame {
            kind: FrameKind::Topic,
            bytes: topic.as_bytes().to_vec(),
        });
        frames.push(Frame {
            kind: FrameKind::Payload,
            bytes: payload.bytes,
        });
        if fake_seq_num {
            frames.push(Frame {
                kind: FrameKind::SequenceNumber,
                bytes: FAKE_SEQUENCE_FRAME.to_vec(),
            });
        }
        Self { frames, encoding }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Frames paired with their "more frames follow" flag.
    pub fn parts(&self) -> impl Iterator<Item = (usize, &Frame, bool)> {
        let last = self.frames.len() - 1;
        self.frames
            .iter()
            .enumerate()
            .map(move |(index, frame)| (index, frame, index != last))
    }

    pub fn payload(&self) -> &Frame {
        &self.frames[1]
    }

    pub fn encoding(&self) -> PayloadEncoding {
        self.encoding
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always false; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
