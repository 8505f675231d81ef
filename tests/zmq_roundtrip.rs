//! ---
//! zmq_section: "15-testing-qa-runbook"
//! zmq_subsection: "integration-tests"
//! zmq_type: "source"
//! zmq_scope: "code"
//! zmq_description: "Integration and validation tests for the zmqpipe stack."
//! zmq_version: "v0.1.0"
//! zmq_owner: "tbd"
//! ---
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use zmqpipe_common::PipeConfig;
use zmqpipe_msg::{PayloadEncoding, SendReport, Session, FAKE_SEQUENCE_FRAME};

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("ephemeral port");
    listener.local_addr().expect("local addr").port()
}

/// Publish `input` from a background thread while a SUB socket listens on
/// the same port; returns the received frames and the publisher's report.
fn roundtrip(input: &'static [u8], fake_seq_num: bool) -> (Vec<Vec<u8>>, SendReport) {
    let port = free_port();
    let mut config = PipeConfig::default();
    config.publish.addr = format!("127.0.0.1:{port}");
    config.publish.topic = "ticks".into();
    config.publish.fake_seq_num = fake_seq_num;
    // Long enough for the subscriber below to connect and subscribe.
    config.timing.settle = Duration::from_millis(1000);

    let context = zmq::Context::new();
    let subscriber = context.socket(zmq::SUB).expect("sub socket");
    subscriber.set_subscribe(b"ticks").expect("subscribe");
    subscriber.set_rcvtimeo(10_000).expect("receive timeout");
    subscriber.set_linger(0).expect("linger");

    let publisher = thread::spawn(move || Session::new(&config).run(input));
    subscriber
        .connect(&format!("tcp://127.0.0.1:{port}"))
        .expect("connect");

    let frames = subscriber.recv_multipart(0).expect("message received");
    let report = publisher
        .join()
        .expect("publisher thread")
        .expect("publish succeeds");
    (frames, report)
}

#[test]
fn hex_payload_arrives_decoded() {
    let (frames, report) = roundtrip(b"deadbeef\n", false);
    assert_eq!(frames, vec![b"ticks".to_vec(), vec![0xde, 0xad, 0xbe, 0xef]]);
    assert_eq!(report.payload_bytes, 4);
    assert_eq!(report.encoding, PayloadEncoding::HexDecoded);
}

#[test]
fn text_payload_arrives_verbatim() {
    let (frames, report) = roundtrip(b"hello world", false);
    assert_eq!(frames, vec![b"ticks".to_vec(), b"hello world".to_vec()]);
    assert_eq!(report.payload_bytes, 11);
}

#[test]
fn fake_sequence_number_arrives_last() {
    let (frames, report) = roundtrip(b"deadbeef", true);
    assert_eq!(report.frames, 3);
    assert_eq!(
        frames,
        vec![
            b"ticks".to_vec(),
            vec![0xde, 0xad, 0xbe, 0xef],
            FAKE_SEQUENCE_FRAME.to_vec()
        ]
    );
}
