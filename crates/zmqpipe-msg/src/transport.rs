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
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::{PipeError, Result, TransportError};

/// A socket that can bind and publish multipart frames.
pub trait Publisher {
    /// Bind to a transport endpoint such as `tcp://127.0.0.1:5555`.
    fn bind(&mut self, endpoint: &str) -> std::result::Result<(), TransportError>;
    /// Queue one frame. `more` marks that further frames of the same message follow.
    fn send_frame(&mut self, bytes: &[u8], more: bool) -> std::result::Result<(), TransportError>;
    /// Release the socket and any context behind it.
    fn close(&mut self) -> std::result::Result<(), TransportError>;
    /// Human-readable transport name for logging.
    fn name(&self) -> &'static str;
}

/// Port half of a bind address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindPort {
    Fixed(u16),
    /// `*`: the transport picks a free port.
    Wildcard,
}

impl fmt::Display for BindPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindPort::Fixed(port) => write!(f, "{port}"),
            BindPort::Wildcard => f.write_str("*"),
        }
    }
}

/// Validated `host:port` bind address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindAddress {
    host: String,
    port: BindPort,
}

impl BindAddress {
    /// Parse `host:port`. The host is passed to the transport unchanged, so
    /// interface names and `*` are accepted; the port is a number or `*`.
    pub fn parse(addr: &str) -> Result<Self> {
        let addr = addr.trim();
        let malformed = || PipeError::Bind {
            endpoint: format!("tcp://{addr}"),
            source: TransportError::InvalidAddress(addr.to_owned()),
        };
        let (host, port) = addr.rsplit_once(':').ok_or_else(malformed)?;
        if host.is_empty() {
            return Err(malformed());
        }
        let port = match port {
            "*" => BindPort::Wildcard,
            port => BindPort::Fixed(port.parse::<u16>().map_err(|_| malformed())?),
        };
        Ok(Self {
            host: host.to_owned(),
            port,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> BindPort {
        self.port
    }

    /// Endpoint string understood by the transport.
    pub fn to_endpoint(&self) -> String {
        format!("tcp://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for BindAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// ZeroMQ PUB socket together with the context that owns it.
pub struct ZmqPublisher {
    // Dropped in this order: the socket must close before the context terminates.
    socket: Option<zmq::Socket>,
    context: Option<zmq::Context>,
}

impl ZmqPublisher {
    /// Create a context and PUB socket. `linger` bounds how long queued
    /// frames may delay close.
    pub fn new(linger: Duration) -> Result<Self> {
        let context = zmq::Context::new();
        let socket = context
            .socket(zmq::PUB)
            .map_err(|err| PipeError::TransportInit(err.into()))?;
        let linger_ms = i32::try_from(linger.as_millis()).unwrap_or(i32::MAX);
        socket
            .set_linger(linger_ms)
            .map_err(|err| PipeError::TransportInit(err.into()))?;
        Ok(Self {
            socket: Some(socket),
            context: Some(context),
        })
    }

    fn socket(&self) -> std::result::Result<&zmq::Socket, TransportError> {
        self.socket.as_ref().ok_or(TransportError::Closed)
    }
}

impl Publisher for ZmqPublisher {
    fn bind(&mut self, endpoint: &str) -> std::result::Result<(), TransportError> {
        self.socket()?.bind(endpoint)?;
        Ok(())
    }

    fn send_frame(&mut self, bytes: &[u8], more: bool) -> std::result::Result<(), TransportError> {
        let flags = if more { zmq::SNDMORE } else { 0 };
        self.socket()?.send(bytes, flags)?;
        Ok(())
    }

    fn close(&mut self) -> std::result::Result<(), TransportError> {
        // Dropping the context blocks in zmq_ctx_term until linger expires.
        drop(self.socket.take());
        drop(self.context.take());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "zmq"
    }
}

/// Frame captured by [`InMemoryPublisher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFrame {
    pub bytes: Vec<u8>,
    pub more: bool,
}

#[derive(Default)]
struct Recorder {
    endpoint: Mutex<Option<String>>,
    frames: Mutex<Vec<RecordedFrame>>,
    closes: AtomicUsize,
}

/// Publisher that records frames instead of sending them. Used for dry runs
/// and tests; failures can be injected at bind or at a given frame.
#[derive(Default)]
pub struct InMemoryPublisher {
    recorder: Arc<Recorder>,
    fail_bind: bool,
    fail_on_frame: Option<usize>,
    closed: bool,
}

impl InMemoryPublisher {
    /// Create a recorder that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `bind` fail.
    pub fn failing_bind(mut self) -> Self {
        self.fail_bind = true;
        self
    }

    /// Make the frame at zero-based `index` fail.
    pub fn failing_on_frame(mut self, index: usize) -> Self {
        self.fail_on_frame = Some(index);
        self
    }

    /// Handle for inspecting what was recorded after the publisher is consumed.
    pub fn handle(&self) -> InMemoryHandle {
        InMemoryHandle {
            recorder: Arc::clone(&self.recorder),
        }
    }
}

impl Publisher for InMemoryPublisher {
    fn bind(&mut self, endpoint: &str) -> std::result::Result<(), TransportError> {
        if self.fail_bind {
            return Err(TransportError::Injected(format!("bind refused for {endpoint}")));
        }
        *self.recorder.endpoint.lock().expect("endpoint poisoned") = Some(endpoint.to_owned());
        Ok(())
    }

    fn send_frame(&mut self, bytes: &[u8], more: bool) -> std::result::Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        let mut frames = self.recorder.frames.lock().expect("frames poisoned");
        if self.fail_on_frame == Some(frames.len()) {
            return Err(TransportError::Injected(format!(
                "frame {} rejected",
                frames.len()
            )));
        }
        frames.push(RecordedFrame {
            bytes: bytes.to_vec(),
            more,
        });
        Ok(())
    }

    fn close(&mut self) -> std::result::Result<(), TransportError> {
        self.closed = true;
        self.recorder.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}

/// Read side of an [`InMemoryPublisher`].
#[derive(Clone)]
pub struct InMemoryHandle {
    recorder: Arc<Recorder>,
}

impl InMemoryHandle {
    /// Endpoint passed to the last successful bind.
    pub fn bound_endpoint(&self) -> Option<String> {
        self.recorder.endpoint.lock().expect("endpoint poisoned").clone()
    }

    /// Frames recorded so far, in send order.
    pub fn frames(&self) -> Vec<RecordedFrame> {
        self.recorder.frames.lock().expect("frames poisoned").clone()
    }

    /// Number of times `close` was called.
    pub fn close_count(&self) -> usize {
        self.recorder.closes.load(Ordering::SeqCst)
    }
}
