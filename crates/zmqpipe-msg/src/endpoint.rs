//! ---
//! zmq_section: "02-messaging"
//! zmq_subsection: "module"
//! zmq_type: "source"
//! zmq_scope: "code"
//! zmq_description: "Message framing and publish lifecycle."
//! zmq_version: "v0.1.0"
//! zmq_owner: "tbd"
//! ---
//! Lifecycle of the single publishing endpoint: bind, settle, send, close.
//!
//! A freshly bound PUB socket silently drops messages for subscribers that
//! have not finished joining. [`Endpoint::stabilize`] must run before the
//! first send; the wait itself lives behind [`Readiness`] so the fixed delay
//! can later be swapped for a real handshake without touching the framing.
use std::fmt;
use std::time::Duration;

use tracing::{debug, warn};

use crate::transport::{BindAddress, Publisher, ZmqPublisher};
use crate::types::FrameKind;
use crate::{PipeError, Result};

/// Where an endpoint is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    /// Bound but not yet safe to send on.
    Bound,
    /// Settled; frames may be sent.
    Stabilized,
    /// Socket and context released.
    Closed,
}

impl fmt::Display for EndpointState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointState::Bound => f.write_str("bound"),
            EndpointState::Stabilized => f.write_str("stabilized"),
            EndpointState::Closed => f.write_str("closed"),
        }
    }
}

/// Decides when a bound endpoint may start sending.
pub trait Readiness {
    /// Block until sends on `address` are unlikely to be dropped.
    fn await_ready(&self, address: &BindAddress) -> Result<()>;
    /// Strategy name for logging.
    fn name(&self) -> &'static str;
}

/// Fixed post-bind pause. Reduces, but does not eliminate, slow-joiner loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleDelay {
    interval: Duration,
}

impl SettleDelay {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for SettleDelay {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL)
    }
}

impl Readiness for SettleDelay {
    fn await_ready(&self, address: &BindAddress) -> Result<()> {
        debug!(%address, interval_ms = self.interval.as_millis() as u64, "waiting for subscribers to join");
        if !self.interval.is_zero() {
            std::thread::sleep(self.interval);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "settle_delay"
    }
}

/// Exclusively owned, bound publisher.
///
/// The publisher is released exactly once: by [`Endpoint::close`], or by
/// `Drop` if the endpoint goes out of scope first.
pub struct Endpoint<P: Publisher> {
    address: BindAddress,
    publisher: Option<P>,
    state: EndpointState,
}

impl Endpoint<ZmqPublisher> {
    /// Create a ZeroMQ context and PUB socket and bind it to `address`.
    pub fn open_zmq(address: &BindAddress, linger: Duration) -> Result<Self> {
        Self::open(address, ZmqPublisher::new(linger)?)
    }
}

impl<P: Publisher> Endpoint<P> {
    /// Bind `publisher` to `tcp://address`. One attempt; on failure the
    /// publisher is released before the error is returned.
    pub fn open(address: &BindAddress, publisher: P) -> Result<Self> {
        let mut endpoint = Self {
            address: address.clone(),
            publisher: Some(publisher),
            state: EndpointState::Bound,
        };
        let target = address.to_endpoint();
        endpoint
            .publisher_mut()?
            .bind(&target)
            .map_err(|source| PipeError::Bind {
                endpoint: target.clone(),
                source,
            })?;
        debug!(endpoint = %target, transport = endpoint.transport_name(), "endpoint bound");
        Ok(endpoint)
    }

    pub fn state(&self) -> EndpointState {
        self.state
    }

    fn transport_name(&self) -> &'static str {
        self.publisher.as_ref().map_or("closed", |publisher| publisher.name())
    }

    fn publisher_mut(&mut self) -> Result<&mut P> {
        let state = self.state;
        self.publisher.as_mut().ok_or(PipeError::NotReady(state))
    }

    /// Wait until `readiness` reports the endpoint safe to send on.
    pub fn stabilize(&mut self, readiness: &dyn Readiness) -> Result<()> {
        if self.state != EndpointState::Bound {
            return Err(PipeError::NotReady(self.state));
        }
        readiness.await_ready(&self.address)?;
        self.state = EndpointState::Stabilized;
        debug!(address = %self.address, strategy = readiness.name(), "endpoint stabilized");
        Ok(())
    }

    /// Send one frame of a message.
    pub fn send(&mut self, index: usize, kind: FrameKind, bytes: &[u8], more: bool) -> Result<()> {
        if self.state != EndpointState::Stabilized {
            return Err(PipeError::NotReady(self.state));
        }
        self.publisher_mut()?
            .send_frame(bytes, more)
            .map_err(|source| PipeError::Send {
                index,
                kind,
                source,
            })
    }

    /// Release the socket and context.
    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        let Some(mut publisher) = self.publisher.take() else {
            return Ok(());
        };
        self.state = EndpointState::Closed;
        publisher.close().map_err(PipeError::Close)?;
        debug!(address = %self.address, "endpoint closed");
        Ok(())
    }
}

impl<P: Publisher> Drop for Endpoint<P> {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            warn!(address = %self.address, error = %err, "endpoint release failed");
        }
    }
}
