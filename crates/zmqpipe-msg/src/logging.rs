//! ---
//! zmq_section: "02-messaging"
//! zmq_subsection: "module"
//! zmq_type: "source"
//! zmq_scope: "code"
//! zmq_description: "Message framing and publish lifecycle."
//! zmq_version: "v0.1.0"
//! zmq_owner: "tbd"
//! ---
use zmqpipe_logging::{pipe_debug, LogContext};

use crate::types::{Frame, Message};

/// Emit a structured log entry for one frame handed to the transport.
pub fn log_frame(topic: &str, index: usize, frame: &Frame, more: bool) {
    let context = LogContext::new().with_topic(topic).with_frame(index);
    pipe_debug!(
        context = context,
        "{} frame queued: {} bytes, more={}",
        frame.kind(),
        frame.len(),
        more
    );
}

/// Emit a summary of a fully assembled message before it is sent.
pub fn log_message(topic: &str, message: &Message) {
    let context = LogContext::new().with_topic(topic);
    pipe_debug!(
        context = context,
        "message assembled: {} frames, {} payload bytes ({})",
        message.len(),
        message.payload().len(),
        message.encoding()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    use crate::types::{EncodedPayload, PayloadEncoding, Topic};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("capture poisoned").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(emit: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, emit);
        let bytes = captured.0.lock().expect("capture poisoned").clone();
        String::from_utf8(bytes).expect("utf-8 log output")
    }

    fn message() -> Message {
        let payload = EncodedPayload::new(vec![0xde, 0xad], PayloadEncoding::HexDecoded);
        Message::new(&Topic::new("ticks"), payload, true)
    }

    #[test]
    fn frame_events_carry_topic_and_frame_index() {
        let message = message();
        let output = capture(|| {
            for (index, frame, more) in message.parts() {
                log_frame("ticks", index, frame, more);
            }
        });
        assert!(output.contains("frame=1"), "{output}");
        assert!(output.contains("frame=2"), "{output}");
        assert!(output.contains("ticks"), "{output}");
        assert!(output.contains("sequence number frame queued: 4 bytes, more=false"), "{output}");
    }

    #[test]
    fn message_summary_has_no_frame_index() {
        let message = message();
        let output = capture(|| log_message("ticks", &message));
        assert!(output.contains("message assembled: 3 frames, 2 payload bytes (hex-decoded)"), "{output}");
        assert!(!output.contains("frame="), "{output}");
    }
}
