//! ---
//! zmq_section: "02-messaging"
//! zmq_subsection: "module"
//! zmq_type: "source"
//! zmq_scope: "code"
//! zmq_description: "Message framing and publish lifecycle."
//! zmq_version: "v0.1.0"
//! zmq_owner: "tbd"
//! ---
//! Publishes one stdin payload as a multipart message on a PUB endpoint.
//!
//! The flow is strictly sequential: [`Endpoint`] binds and settles,
//! [`MessageAssembler`] decides the payload encoding and orders the frames,
//! and [`Session`] drives both and guarantees the endpoint is released.

pub mod assembler;
pub mod encoding;
pub mod endpoint;
pub mod logging;
pub mod session;
pub mod transport;
pub mod types;

use zmqpipe_common::ConfigError;

/// Shared result type for publish operations.
pub type Result<T> = std::result::Result<T, PipeError>;

/// Failure raised by a [`transport::Publisher`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Error reported by libzmq.
    #[error(transparent)]
    Zmq(#[from] zmq::Error),
    /// The bind address could not be turned into an endpoint.
    #[error("malformed address {0:?}: expected host:port or host:*")]
    InvalidAddress(String),
    /// The publisher was used after it had been closed.
    #[error("publisher already closed")]
    Closed,
    /// Failure injected by the in-memory publisher.
    #[error("{0}")]
    Injected(String),
}

/// Every way a publish can fail. Each variant maps to one stage of the flow.
#[derive(Debug, thiserror::Error)]
pub enum PipeError {
    /// Required settings were missing.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// The context or socket could not be created.
    #[error("unable to create publisher: {0}")]
    TransportInit(#[source] TransportError),
    /// The address was malformed, in use, or otherwise unbindable.
    #[error("unable to bind {endpoint}: {source}")]
    Bind {
        /// Endpoint string handed to the transport.
        endpoint: String,
        /// Underlying failure.
        #[source]
        source: TransportError,
    },
    /// The endpoint did not become ready to send.
    #[error("endpoint did not settle: {0}")]
    Stabilize(String),
    /// Standard input could not be read to completion.
    #[error("unable to read input: {0}")]
    InputRead(#[from] std::io::Error),
    /// The input is not valid hex and strict decoding was requested.
    #[error("input is not a valid hex string: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    /// A frame was sent before the endpoint settled.
    #[error("endpoint is {0}, not ready to send")]
    NotReady(endpoint::EndpointState),
    /// The transport rejected a frame; later frames were not attempted.
    #[error("unable to send {kind} frame {index}: {source}")]
    Send {
        /// Zero-based position of the frame in the message.
        index: usize,
        /// Which frame failed.
        kind: types::FrameKind,
        /// Underlying failure.
        #[source]
        source: TransportError,
    },
    /// Releasing the socket or context failed.
    #[error("unable to close publisher: {0}")]
    Close(#[source] TransportError),
}

impl PipeError {
    /// Stable name of the stage that failed, used in user-facing messages.
    pub fn stage(&self) -> &'static str {
        match self {
            PipeError::Config(_) => "config",
            PipeError::TransportInit(_) => "transport-init",
            PipeError::Bind { .. } => "bind",
            PipeError::Stabilize(_) => "stabilize",
            PipeError::InputRead(_) => "input-read",
            PipeError::InvalidHex(_) => "hex-decode",
            PipeError::NotReady(_) | PipeError::Send { .. } => "send",
            PipeError::Close(_) => "close",
        }
    }
}

pub use assembler::{AssemblyOptions, FramePacing, MessageAssembler, SendReport};
pub use encoding::{encode_payload, HexPolicy};
pub use endpoint::{Endpoint, EndpointState, Readiness, SettleDelay};
pub use session::{Session, SessionState};
pub use transport::{
    BindAddress, BindPort, InMemoryHandle, InMemoryPublisher, Publisher, RecordedFrame,
    ZmqPublisher,
};
pub use types::{
    EncodedPayload, Frame, FrameKind, Message, Payload, PayloadEncoding, Topic,
    FAKE_SEQUENCE_FRAME,
};
