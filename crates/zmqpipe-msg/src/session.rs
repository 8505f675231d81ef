//! ---
//! zmq_section: "02-messaging"
//! zmq_subsection: "module"
//! zmq_type: "source"
//! zmq_scope: "code"
//! zmq_description: "Message framing and publish lifecycle."
//! zmq_version: "v0.1.0"
//! zmq_owner: "tbd"
//! ---
//! One-shot publish: validate, bind, settle, read input, send, close.
use std::fmt;
use std::io::Read;

use zmqpipe_common::PipeConfig;
use zmqpipe_logging::{log_stage_event, pipe_error, LogContext, StageOutcome};

use crate::assembler::{AssemblyOptions, FramePacing, MessageAssembler, SendReport};
use crate::endpoint::{Endpoint, Readiness, SettleDelay};
use crate::transport::{BindAddress, Publisher, ZmqPublisher};
use crate::types::{Payload, Topic};
use crate::{PipeError, Result};

/// Progress of a session. There is no retry edge; every run ends in
/// `Failed` or `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Bound,
    Stabilized,
    Sent,
    Failed,
    Closed,
}

impl SessionState {
    fn event(&self) -> &'static str {
        match self {
            SessionState::Idle => "session.idle",
            SessionState::Bound => "session.bound",
            SessionState::Stabilized => "session.stabilized",
            SessionState::Sent => "session.sent",
            SessionState::Failed => "session.failed",
            SessionState::Closed => "session.closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let event = self.event();
        f.write_str(&event["session.".len()..])
    }
}

/// Settings resolved before any transport object exists.
struct Plan {
    address: BindAddress,
    topic: Topic,
    assembler: MessageAssembler,
}

/// Drives one publish from configuration to a closed endpoint.
pub struct Session<'a> {
    config: &'a PipeConfig,
    history: Vec<SessionState>,
}

impl<'a> Session<'a> {
    pub fn new(config: &'a PipeConfig) -> Self {
        Self {
            config,
            history: vec![SessionState::Idle],
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.history
            .last()
            .copied()
            .unwrap_or(SessionState::Idle)
    }

    /// Every state visited so far, starting with `Idle`.
    pub fn history(&self) -> &[SessionState] {
        &self.history
    }

    /// Publish `input` on a ZeroMQ PUB socket using the configured timing.
    pub fn run<R: Read>(&mut self, input: R) -> Result<SendReport> {
        let plan = match self.plan() {
            Ok(plan) => plan,
            Err(err) => return self.fail(err),
        };
        let publisher = match ZmqPublisher::new(self.config.timing.linger) {
            Ok(publisher) => publisher,
            Err(err) => return self.fail(err),
        };
        let readiness = SettleDelay::new(self.config.timing.settle);
        self.drive(plan, publisher, &readiness, input)
    }

    /// Publish `input` through a caller-supplied publisher and readiness strategy.
    pub fn run_with<P: Publisher, R: Read>(
        &mut self,
        publisher: P,
        readiness: &dyn Readiness,
        input: R,
    ) -> Result<SendReport> {
        let plan = match self.plan() {
            Ok(plan) => plan,
            Err(err) => return self.fail(err),
        };
        self.drive(plan, publisher, readiness, input)
    }

    fn plan(&self) -> Result<Plan> {
        self.config.validate()?;
        let publish = &self.config.publish;
        Ok(Plan {
            address: BindAddress::parse(&publish.addr)?,
            topic: Topic::new(publish.topic.clone()),
            assembler: MessageAssembler::new(
                AssemblyOptions::from(publish),
                FramePacing(self.config.timing.frame_pacing),
            ),
        })
    }

    fn drive<P: Publisher, R: Read>(
        &mut self,
        plan: Plan,
        publisher: P,
        readiness: &dyn Readiness,
        input: R,
    ) -> Result<SendReport> {
        let mut endpoint = match Endpoint::open(&plan.address, publisher) {
            Ok(endpoint) => endpoint,
            Err(err) => {
                // The publisher existed, so it has been released by now.
                let result = self.fail(err);
                self.advance(SessionState::Closed, "publisher released after failed bind");
                return result;
            }
        };
        self.advance(SessionState::Bound, "endpoint bound");

        let outcome = self.publish(&plan, &mut endpoint, readiness, input);
        let outcome = match outcome {
            Ok(report) => {
                self.advance(SessionState::Sent, "message sent");
                Ok(report)
            }
            Err(err) => self.fail(err),
        };

        if let Err(err) = endpoint.close() {
            let context = LogContext::new().with_addr(&self.config.publish.addr);
            pipe_error!(context = context, "endpoint close failed: {err}");
        }
        self.advance(SessionState::Closed, "endpoint released");
        outcome
    }

    fn publish<P: Publisher, R: Read>(
        &mut self,
        plan: &Plan,
        endpoint: &mut Endpoint<P>,
        readiness: &dyn Readiness,
        input: R,
    ) -> Result<SendReport> {
        endpoint.stabilize(readiness)?;
        self.advance(SessionState::Stabilized, "endpoint settled");
        let payload = Payload::read_from(input)?;
        plan.assembler.publish(endpoint, &plan.topic, &payload)
    }

    fn advance(&mut self, state: SessionState, message: &str) {
        let config = self.config;
        let context = LogContext::new()
            .with_topic(&config.publish.topic)
            .with_addr(&config.publish.addr);
        let outcome = match state {
            SessionState::Failed => StageOutcome::Fault,
            _ => StageOutcome::Success,
        };
        log_stage_event(Some(&context), state.event(), message, outcome);
        self.history.push(state);
    }

    fn fail<T>(&mut self, err: PipeError) -> Result<T> {
        let message = format!("{} failed: {}", err.stage(), err);
        self.advance(SessionState::Failed, &message);
        Err(err)
    }
}
