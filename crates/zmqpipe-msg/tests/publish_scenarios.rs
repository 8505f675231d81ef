//! ---
//! zmq_section: "02-messaging"
//! zmq_subsection: "integration-tests"
//! zmq_type: "source"
//! zmq_scope: "code"
//! zmq_description: "Message framing and publish lifecycle."
//! zmq_version: "v0.1.0"
//! zmq_owner: "tbd"
//! ---
use std::time::Duration;

use zmqpipe_common::PipeConfig;
use zmqpipe_msg::{
    InMemoryHandle, InMemoryPublisher, PipeError, RecordedFrame, Session, SessionState,
    SettleDelay, FAKE_SEQUENCE_FRAME,
};

fn config(fake_seq_num: bool) -> PipeConfig {
    let mut config = PipeConfig::default();
    config.publish.addr = "127.0.0.1:5555".into();
    config.publish.topic = "ticks".into();
    config.publish.fake_seq_num = fake_seq_num;
    config.timing.frame_pacing = Duration::ZERO;
    config
}

fn publish(config: &PipeConfig, input: &[u8]) -> (zmqpipe_msg::Result<usize>, InMemoryHandle) {
    let publisher = InMemoryPublisher::new();
    let handle = publisher.handle();
    let result = Session::new(config)
        .run_with(publisher, &SettleDelay::new(Duration::ZERO), input)
        .map(|report| report.payload_bytes);
    (result, handle)
}

fn payloads(frames: &[RecordedFrame]) -> Vec<&[u8]> {
    frames.iter().map(|frame| frame.bytes.as_slice()).collect()
}

#[test]
fn scenario_a_hex_payload_is_decoded() {
    let (sent, handle) = publish(&config(false), b"deadbeef");
    assert_eq!(sent.expect("publish"), 4);
    assert_eq!(
        handle.bound_endpoint().as_deref(),
        Some("tcp://127.0.0.1:5555")
    );
    let frames = handle.frames();
    assert_eq!(
        payloads(&frames),
        vec![&b"ticks"[..], &[0xde_u8, 0xad, 0xbe, 0xef][..]]
    );
}

#[test]
fn scenario_b_text_payload_is_literal() {
    let (sent, handle) = publish(&config(false), b"hello world");
    assert_eq!(sent.expect("publish"), 11);
    assert_eq!(
        payloads(&handle.frames()),
        vec![&b"ticks"[..], &b"hello world"[..]]
    );
}

#[test]
fn scenario_c_fake_sequence_number_is_third() {
    let (sent, handle) = publish(&config(true), b"deadbeef");
    assert_eq!(sent.expect("publish"), 4);
    let frames = handle.frames();
    assert_eq!(
        payloads(&frames),
        vec![
            &b"ticks"[..],
            &[0xde_u8, 0xad, 0xbe, 0xef][..],
            &FAKE_SEQUENCE_FRAME[..]
        ]
    );
    let flags: Vec<bool> = frames.iter().map(|frame| frame.more).collect();
    assert_eq!(flags, vec![true, true, false]);
}

#[test]
fn scenario_d_empty_settings_send_nothing() {
    for (addr, topic) in [("", "ticks"), ("127.0.0.1:5555", "")] {
        let mut config = config(false);
        config.publish.addr = addr.into();
        config.publish.topic = topic.into();

        let publisher = InMemoryPublisher::new();
        let handle = publisher.handle();
        let mut session = Session::new(&config);
        let err = session
            .run_with(publisher, &SettleDelay::new(Duration::ZERO), &b"deadbeef"[..])
            .expect_err("config error");

        assert!(matches!(err, PipeError::Config(_)), "{addr:?} {topic:?}");
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(handle.bound_endpoint(), None);
        assert_eq!(handle.close_count(), 0);
    }
}

#[test]
fn disabled_hex_decoding_sends_input_untouched() {
    let mut config = config(false);
    config.publish.decode_hex = false;
    let (sent, handle) = publish(&config, b"deadbeef\n");
    assert_eq!(sent.expect("publish"), 9);
    assert_eq!(handle.frames()[1].bytes, b"deadbeef\n");
}

#[test]
fn strict_hex_rejects_text_before_sending() {
    let mut config = config(false);
    config.publish.strict_hex = true;
    let (sent, handle) = publish(&config, b"hello world");
    let err = sent.expect_err("strict hex");
    assert_eq!(err.stage(), "hex-decode");
    assert!(handle.frames().is_empty());
    assert_eq!(handle.close_count(), 1);
}
