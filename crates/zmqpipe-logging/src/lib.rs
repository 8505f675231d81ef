//! ---
//! zmq_section: "03-logging"
//! zmq_subsection: "module"
//! zmq_type: "source"
//! zmq_scope: "code"
//! zmq_description: "Structured logging adapters and sinks."
//! zmq_version: "v0.1.0"
//! zmq_owner: "tbd"
//! ---
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

/// Environment variable overriding the configured filter directive.
pub const LOG_ENV: &str = "ZMQPIPE_LOG";

/// Output format of the diagnostic stream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    /// Human readable single-line events.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Initialize the tracing subscriber.
///
/// Events are written to stderr; stdout is reserved for the status lines
/// scripts parse. `ZMQPIPE_LOG` wins over `RUST_LOG`, which wins over
/// `default_directive`. Calling this more than once is a no-op.
pub fn init_with(format: LogFormat, default_directive: &str) {
    let filter = resolve_filter(default_directive);
    let layer = match format {
        LogFormat::Pretty => subscriber_fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Json => subscriber_fmt::layer()
            .with_target(true)
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
    };
    let _ = Registry::default().with(filter).with(layer).try_init();
}

fn resolve_filter(default_directive: &str) -> EnvFilter {
    if let Ok(directive) = std::env::var(LOG_ENV) {
        if let Ok(filter) = EnvFilter::try_new(&directive) {
            return filter;
        }
        eprintln!("invalid {LOG_ENV} directive ({directive}); using {default_directive}");
    }
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::default().add_directive(Level::WARN.into()))
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Topic the message is published under.
    pub topic: Option<&'a str>,
    /// Bind address of the publishing endpoint.
    pub addr: Option<&'a str>,
    /// Zero-based index of the frame being handled.
    pub frame: Option<usize>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a topic.
    pub fn with_topic(mut self, topic: &'a str) -> Self {
        self.topic = Some(topic);
        self
    }

    /// Attach a bind address.
    pub fn with_addr(mut self, addr: &'a str) -> Self {
        self.addr = Some(addr);
        self
    }

    /// Attach a frame index.
    pub fn with_frame(mut self, frame: usize) -> Self {
        self.frame = Some(frame);
        self
    }
}

/// High-level outcome used when emitting lifecycle log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// The stage completed successfully.
    Success,
    /// The stage failed and the session is aborting.
    Fault,
}

impl StageOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            StageOutcome::Success => "success",
            StageOutcome::Fault => "fault",
        }
    }
}

/// Emit a standardized lifecycle event with a success/fault outcome.
pub fn log_stage_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: StageOutcome,
) {
    let fallback = LogContext::default();
    let ctx = context.unwrap_or(&fallback);
    let topic = ctx.topic.unwrap_or("");
    let addr = ctx.addr.unwrap_or("");
    // `tracing::event!` needs a constant level, so branch instead of passing one through.
    match outcome {
        StageOutcome::Success => tracing::info!(
            event,
            outcome = outcome.as_str(),
            topic,
            addr,
            message = %message
        ),
        StageOutcome::Fault => tracing::error!(
            event,
            outcome = outcome.as_str(),
            topic,
            addr,
            message = %message
        ),
    }
}
