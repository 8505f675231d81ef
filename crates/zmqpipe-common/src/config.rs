//! ---
//! zmq_section: "01-core-functionality"
//! zmq_subsection: "module"
//! zmq_type: "source"
//! zmq_scope: "code"
//! zmq_description: "Shared primitives and utilities for the publisher."
//! zmq_version: "v0.1.0"
//! zmq_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use tracing::debug;
use zmqpipe_logging::LogFormat;

fn default_decode_hex() -> bool {
    true
}

fn default_settle() -> Duration {
    Duration::from_millis(500)
}

fn default_frame_pacing() -> Duration {
    Duration::from_millis(1)
}

fn default_linger() -> Duration {
    Duration::from_millis(1000)
}

fn default_log_level() -> String {
    "warn".to_owned()
}

/// Validation failures raised before any transport object is created.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No bind address was supplied.
    #[error("bind address is required (host:port)")]
    MissingAddress,
    /// No topic was supplied.
    #[error("topic is required")]
    MissingTopic,
}

/// Primary configuration object for a single publish.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipeConfig {
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where a [`PipeConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedPipeConfig {
    pub config: PipeConfig,
    /// `None` when only built-in defaults were used.
    pub source: Option<PathBuf>,
}

impl PipeConfig {
    pub const ENV_CONFIG_PATH: &'static str = "ZMQPIPE_CONFIG";

    /// Load configuration, preferring `explicit`, then the `ZMQPIPE_CONFIG`
    /// override, then built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<LoadedPipeConfig> {
        if let Some(path) = explicit {
            return Ok(LoadedPipeConfig {
                config: Self::from_path(path)?,
                source: Some(path.to_path_buf()),
            });
        }

        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                return Ok(LoadedPipeConfig {
                    config: Self::from_path(&path)?,
                    source: Some(path),
                });
            }
        }

        Ok(LoadedPipeConfig {
            config: Self::default(),
            source: None,
        })
    }

    /// Read and parse a TOML configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str::<PipeConfig>(contents)?)
    }

    /// Check the fields that must be present before the endpoint is opened.
    ///
    /// The topic is opaque, so only an empty one is rejected. Address shape is
    /// checked later, at bind time.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.publish.addr.trim().is_empty() {
            return Err(ConfigError::MissingAddress);
        }
        if self.publish.topic.is_empty() {
            return Err(ConfigError::MissingTopic);
        }
        Ok(())
    }
}

/// What to publish and how to encode it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublishConfig {
    #[serde(default)]
    pub addr: String,
    #[serde(default)]
    pub topic: String,
    /// Try to hex-decode the trimmed input before sending.
    #[serde(default = "default_decode_hex")]
    pub decode_hex: bool,
    /// Append a constant zero sequence-number frame.
    #[serde(default)]
    pub fake_seq_num: bool,
    /// Reject malformed hex instead of falling back to the literal input.
    #[serde(default)]
    pub strict_hex: bool,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            addr: String::new(),
            topic: String::new(),
            decode_hex: default_decode_hex(),
            fake_seq_num: false,
            strict_hex: false,
        }
    }
}

/// Delays that stand in for a readiness handshake.
#[serde_as]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimingConfig {
    /// Pause between bind and the first send.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "settle_ms", default = "default_settle")]
    pub settle: Duration,
    /// Pause after every frame.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "frame_pacing_ms", default = "default_frame_pacing")]
    pub frame_pacing: Duration,
    /// How long queued frames may linger when the socket closes.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "linger_ms", default = "default_linger")]
    pub linger: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            settle: default_settle(),
            frame_pacing: default_frame_pacing(),
            linger: default_linger(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    /// Filter directive used when neither `ZMQPIPE_LOG` nor `RUST_LOG` is set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: default_log_level(),
        }
    }
}
