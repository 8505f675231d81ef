//! ---
//! zmq_section: "01-core-functionality"
//! zmq_subsection: "module"
//! zmq_type: "source"
//! zmq_scope: "code"
//! zmq_description: "Shared primitives and utilities for the publisher."
//! zmq_version: "v0.1.0"
//! zmq_owner: "tbd"
//! ---
//! Shared configuration for the zmqpipe workspace.

pub mod config;

pub use config::{
    ConfigError, LoadedPipeConfig, LoggingConfig, PipeConfig, PublishConfig, TimingConfig,
};
