//! ---
//! zmq_section: "02-messaging"
//! zmq_subsection: "module"
//! zmq_type: "source"
//! zmq_scope: "code"
//! zmq_description: "Message framing and publish lifecycle."
//! zmq_version: "v0.1.0"
//! zmq_owner: "tbd"
//! ---
use std::time::Duration;

use zmqpipe_common::PublishConfig;

use crate::encoding::{encode_payload, HexPolicy};
use crate::endpoint::Endpoint;
use crate::logging::{log_frame, log_message};
use crate::transport::Publisher;
use crate::types::{Message, Payload, PayloadEncoding, Topic};
use crate::Result;

/// Switches that shape the frame sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblyOptions {
    /// Try to hex-decode the trimmed input.
    pub decode_hex: bool,
    /// Append the constant zero sequence frame.
    pub fake_seq_num: bool,
    /// Behavior when hex decoding is on and the input is not hex.
    pub hex_policy: HexPolicy,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            decode_hex: true,
            fake_seq_num: false,
            hex_policy: HexPolicy::Lenient,
        }
    }
}

impl From<&PublishConfig> for AssemblyOptions {
    fn from(config: &PublishConfig) -> Self {
        Self {
            decode_hex: config.decode_hex,
            fake_seq_num: config.fake_seq_num,
            hex_policy: if config.strict_hex {
                HexPolicy::Strict
            } else {
                HexPolicy::Lenient
            },
        }
    }
}

/// Pause after each frame so the transport can drain its queue before the
/// next frame or process exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePacing(pub Duration);

impl FramePacing {
    pub const DEFAULT: FramePacing = FramePacing(Duration::from_millis(1));

    fn pause(&self) {
        if !self.0.is_zero() {
            std::thread::sleep(self.0);
        }
    }
}

impl Default for FramePacing {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Outcome of a successful transmit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendReport {
    /// Length of the payload frame actually sent.
    pub payload_bytes: usize,
    /// Number of frames in the message.
    pub frames: usize,
    pub encoding: PayloadEncoding,
}

/// Builds the frame sequence for a topic and payload and sends it in order.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageAssembler {
    options: AssemblyOptions,
    pacing: FramePacing,
}

impl MessageAssembler {
    pub fn new(options: AssemblyOptions, pacing: FramePacing) -> Self {
        Self { options, pacing }
    }

    /// Encode the payload and lay out topic, payload and optional sequence
    /// frames. Nothing is sent.
    pub fn assemble(&self, topic: &Topic, payload: &Payload) -> Result<Message> {
        let encoded = encode_payload(payload, self.options.decode_hex, self.options.hex_policy)?;
        let message = Message::new(topic, encoded, self.options.fake_seq_num);
        log_message(topic.as_str(), &message);
        Ok(message)
    }

    /// Send every frame of `message` in order, pausing after each one.
    ///
    /// The first failure aborts the message; later frames are not attempted.
    pub fn transmit<P: Publisher>(
        &self,
        endpoint: &mut Endpoint<P>,
        topic: &Topic,
        message: &Message,
    ) -> Result<SendReport> {
        for (index, frame, more) in message.parts() {
            endpoint.send(index, frame.kind(), frame.as_bytes(), more)?;
            log_frame(topic.as_str(), index, frame, more);
            self.pacing.pause();
        }
        Ok(SendReport {
            payload_bytes: message.payload().len(),
            frames: message.len(),
            encoding: message.encoding(),
        })
    }

    /// [`assemble`](Self::assemble) then [`transmit`](Self::transmit).
    pub fn publish<P: Publisher>(
        &self,
        endpoint: &mut Endpoint<P>,
        topic: &Topic,
        payload: &Payload,
    ) -> Result<SendReport> {
        let message = self.assemble(topic, payload)?;
        self.transmit(endpoint, topic, &message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::SettleDelay;
    use crate::transport::{BindAddress, InMemoryHandle, InMemoryPublisher};
    use crate::types::FAKE_SEQUENCE_FRAME;
    use crate::PipeError;

    fn ready_endpoint(publisher: InMemoryPublisher) -> (Endpoint<InMemoryPublisher>, InMemoryHandle) {
        let handle = publisher.handle();
        let address = BindAddress::parse("127.0.0.1:5555").expect("address");
        let mut endpoint = Endpoint::open(&address, publisher).expect("open");
        endpoint
            .stabilize(&SettleDelay::new(Duration::ZERO))
            .expect("stabilize");
        (endpoint, handle)
    }

    fn assembler(decode_hex: bool, fake_seq_num: bool) -> MessageAssembler {
        MessageAssembler::new(
            AssemblyOptions {
                decode_hex,
                fake_seq_num,
                hex_policy: HexPolicy::Lenient,
            },
            FramePacing(Duration::ZERO),
        )
    }

    #[test]
    fn hex_payload_is_sent_decoded() {
        let (mut endpoint, handle) = ready_endpoint(InMemoryPublisher::new());
        let report = assembler(true, false)
            .publish(
                &mut endpoint,
                &Topic::new("ticks"),
                &Payload::from_bytes(&b"deadbeef"[..]),
            )
            .expect("publish");

        assert_eq!(report.payload_bytes, 4);
        assert_eq!(report.frames, 2);
        assert_eq!(report.encoding, PayloadEncoding::HexDecoded);
        let frames = handle.frames();
        assert_eq!(frames[0].bytes, b"ticks");
        assert!(frames[0].more);
        assert_eq!(frames[1].bytes, vec![0xde, 0xad, 0xbe, 0xef]);
        assert!(!frames[1].more);
    }

    #[test]
    fn text_payload_is_sent_literally() {
        let (mut endpoint, handle) = ready_endpoint(InMemoryPublisher::new());
        let report = assembler(true, false)
            .publish(
                &mut endpoint,
                &Topic::new("ticks"),
                &Payload::from_bytes(&b"hello world"[..]),
            )
            .expect("publish");

        assert_eq!(report.payload_bytes, 11);
        assert_eq!(handle.frames()[1].bytes, b"hello world");
    }

    #[test]
    fn fake_sequence_adds_trailing_zero_frame() {
        let (mut endpoint, handle) = ready_endpoint(InMemoryPublisher::new());
        let report = assembler(true, true)
            .publish(
                &mut endpoint,
                &Topic::new("ticks"),
                &Payload::from_bytes(&b"deadbeef"[..]),
            )
            .expect("publish");

        assert_eq!(report.frames, 3);
        assert_eq!(report.payload_bytes, 4);
        let frames = handle.frames();
        assert_eq!(frames.len(), 3);
        assert!(frames[1].more, "payload frame must announce the sequence frame");
        assert_eq!(frames[2].bytes, FAKE_SEQUENCE_FRAME);
        assert!(!frames[2].more);
    }

    #[test]
    fn send_failure_stops_remaining_frames() {
        let (mut endpoint, handle) = ready_endpoint(InMemoryPublisher::new().failing_on_frame(1));
        let err = assembler(true, true)
            .publish(
                &mut endpoint,
                &Topic::new("ticks"),
                &Payload::from_bytes(&b"00"[..]),
            )
            .expect_err("payload frame fails");

        assert!(matches!(err, PipeError::Send { index: 1, .. }));
        assert_eq!(handle.frames().len(), 1);
    }

    #[test]
    fn topic_is_sent_verbatim() {
        for topic in ["ticks", " spaced topic ", "deadbeef", "ünïcode/topic"] {
            let (mut endpoint, handle) = ready_endpoint(InMemoryPublisher::new());
            assembler(true, false)
                .publish(
                    &mut endpoint,
                    &Topic::new(topic),
                    &Payload::from_bytes(&b"ff"[..]),
                )
                .expect("publish");
            assert_eq!(handle.frames()[0].bytes, topic.as_bytes());
        }
    }

    #[test]
    fn options_follow_publish_config() {
        let config = PublishConfig {
            decode_hex: false,
            fake_seq_num: true,
            strict_hex: true,
            ..PublishConfig::default()
        };
        let options = AssemblyOptions::from(&config);
        assert!(!options.decode_hex);
        assert!(options.fake_seq_num);
        assert_eq!(options.hex_policy, HexPolicy::Strict);
    }
}
