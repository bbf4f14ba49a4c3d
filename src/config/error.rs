//! Errors raised while assembling a sniffer [`Config`](super::Config).
//!
//! Every variant maps to exit code 2 in the binary. Keys are reported in
//! their dotted TOML form (`relay.hardware_port`, `relay.idle_gap_secs`,
//! `trace.color`) so the message points at the line to fix.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config file '{}': {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A setting is present but out of range.
    #[error("invalid value for '{key}': {message}")]
    Invalid { key: &'static str, message: String },

    /// A `SERIAL_SNIFFER_*` override could not be parsed.
    #[error("invalid environment override '{var}': {message}")]
    BadOverride { var: String, message: String },

    /// `relay.hardware_port` or `relay.software_port` was never given.
    #[error("no port given for '{0}' (pass it on the command line or in the config file)")]
    MissingPort(&'static str),
}

impl ConfigError {
    pub fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            message: message.into(),
        }
    }

    pub fn bad_override(var: &str, message: impl Into<String>) -> Self {
        Self::BadOverride {
            var: var.to_string(),
            message: message.into(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
