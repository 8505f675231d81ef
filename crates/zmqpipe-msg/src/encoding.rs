//! ---
//! zmq_section: "02-messaging"
//! zmq_subsection: "module"
//! zmq_type: "source"
//! zmq_scope: "code"
//! zmq_description: "Message framing and publish lifecycle."
//! zmq_version: "v0.1.0"
//! zmq_owner: "tbd"
//! ---
//! Payload encoding decision: hex-decoded bytes or the literal input.
use tracing::debug;

use crate::types::{EncodedPayload, Payload, PayloadEncoding};
use crate::Result;

/// What to do when hex decoding is enabled but the input is not hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HexPolicy {
    /// Send the untrimmed input unchanged.
    #[default]
    Lenient,
    /// Fail with [`crate::PipeError::InvalidHex`].
    Strict,
}

/// Choose the payload frame for `payload`.
///
/// With `decode_hex` on, the trimmed input is decoded as hex (two digits per
/// byte, either case). If that fails, or `decode_hex` is off, the untrimmed
/// input is used verbatim. A blank input decodes to an empty frame.
pub fn encode_payload(
    payload: &Payload,
    decode_hex: bool,
    policy: HexPolicy,
) -> Result<EncodedPayload> {
    if !decode_hex {
        return Ok(literal(payload));
    }

    match hex::decode(payload.trimmed()) {
        Ok(bytes) => Ok(EncodedPayload::new(bytes, PayloadEncoding::HexDecoded)),
        Err(err) if policy == HexPolicy::Strict => Err(err.into()),
        Err(err) => {
            debug!(error = %err, len = payload.len(), "input is not hex; sending literal bytes");
            Ok(literal(payload))
        }
    }
}

fn literal(payload: &Payload) -> EncodedPayload {
    EncodedPayload::new(payload.as_bytes().to_vec(), PayloadEncoding::Literal)
}
