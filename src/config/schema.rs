//! Configuration schema definitions.
//!
//! Defines the structure of the configuration file. Every section has
//! defaults, so an empty file (or no file) is valid apart from the two port
//! names, which have to come from somewhere.

use super::error::{ConfigError, ConfigResult};
use crate::port::{DataBits, FlowControl, Parity, PortConfiguration, StopBits};
use crate::relay::{RelaySettings, RetryPolicy, WorkerSettings, DEFAULT_IDLE_GAP};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Endpoints and relay tuning
    pub relay: RelayConfig,
    /// Serial line settings shared by both endpoints
    pub serial: SerialConfig,
    /// Trace output
    pub trace: TraceConfig,
    /// Diagnostic logging (stderr)
    pub logging: LoggingConfig,
}

impl Config {
    /// Check every value the relay depends on.
    pub fn validate(&self) -> ConfigResult<()> {
        let relay = &self.relay;

        let hardware = relay
            .hardware_port
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingPort("relay.hardware_port"))?;
        let software = relay
            .software_port
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingPort("relay.software_port"))?;

        if self.serial.resolve_port(hardware) == self.serial.resolve_port(software) {
            return Err(ConfigError::invalid(
                "relay.software_port",
                "must name a different port than relay.hardware_port",
            ));
        }
        if relay.baud_rate == 0 {
            return Err(ConfigError::invalid("relay.baud_rate", "must be positive"));
        }
        if Duration::try_from_secs_f64(relay.idle_gap_secs).is_err() {
            return Err(ConfigError::invalid(
                "relay.idle_gap_secs",
                format!(
                    "{} is not a usable number of seconds (must be finite, non-negative and in range)",
                    relay.idle_gap_secs
                ),
            ));
        }
        if relay.channel_capacity == 0 {
            return Err(ConfigError::invalid("relay.channel_capacity", "must be at least 1"));
        }
        if relay.read_buffer_size == 0 {
            return Err(ConfigError::invalid("relay.read_buffer_size", "must be at least 1"));
        }
        if relay.drain_batch == 0 {
            return Err(ConfigError::invalid("relay.drain_batch", "must be at least 1"));
        }
        if relay.retry.max_attempts == 0 {
            return Err(ConfigError::invalid("relay.retry.max_attempts", "must be at least 1"));
        }
        if relay.retry.max_backoff_ms < relay.retry.initial_backoff_ms {
            return Err(ConfigError::invalid(
                "relay.retry.max_backoff_ms",
                "must not be smaller than initial_backoff_ms",
            ));
        }
        Ok(())
    }

    /// Validate and convert into the settings the relay runs with.
    pub fn relay_settings(&self) -> ConfigResult<RelaySettings> {
        self.validate()?;

        let relay = &self.relay;
        // validate() has already checked both names are present
        let hardware = relay.hardware_port.as_deref().unwrap_or_default();
        let software = relay.software_port.as_deref().unwrap_or_default();

        Ok(RelaySettings {
            hardware_port: self.serial.resolve_port(hardware),
            software_port: self.serial.resolve_port(software),
            port: self.serial.port_configuration(relay.baud_rate),
            channel_capacity: relay.channel_capacity,
            worker: WorkerSettings {
                idle_gap: relay.idle_gap(),
                poll_interval: Duration::from_millis(relay.poll_interval_ms),
                read_buffer_size: relay.read_buffer_size,
                drain_batch: relay.drain_batch,
                retry: relay.retry.policy(),
                shutdown_timeout: Duration::from_millis(relay.shutdown_timeout_ms),
            },
        })
    }
}

/// Relay section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Physical device port (e.g. "COM5", "/dev/ttyUSB0")
    pub hardware_port: Option<String>,
    /// Virtual port the host software is attached to through a null-modem pair
    pub software_port: Option<String>,
    /// Baud rate, applied to both ports
    pub baud_rate: u32,
    /// Idle time in seconds after which the trace starts a new line
    pub idle_gap_secs: f64,
    /// Chunks each direction may queue before capture stalls
    pub channel_capacity: usize,
    /// Sleep between poll iterations in milliseconds (0 = just yield)
    pub poll_interval_ms: u64,
    /// Most bytes captured in one read
    pub read_buffer_size: usize,
    /// Most peer chunks written per iteration
    pub drain_batch: usize,
    /// How long each side waits on the other to hand over in-flight bytes at shutdown
    pub shutdown_timeout_ms: u64,
    /// Retry policy for transient device faults
    pub retry: RetryConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            hardware_port: None,
            software_port: None,
            baud_rate: 115200,
            idle_gap_secs: 2.0,
            channel_capacity: 1024,
            poll_interval_ms: 1,
            read_buffer_size: 256,
            drain_batch: 64,
            shutdown_timeout_ms: 2000,
            retry: RetryConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Get the idle gap as Duration. Falls back to the default only for
    /// values `validate()` rejects.
    pub fn idle_gap(&self) -> Duration {
        Duration::try_from_secs_f64(self.idle_gap_secs).unwrap_or(DEFAULT_IDLE_GAP)
    }
}

/// Retry section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per operation including the first
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 10,
            max_backoff_ms: 200,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }
}

/// Serial line section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
    /// Driver read/write timeout in milliseconds
    pub timeout_ms: u64,
    /// Port aliases for convenience
    #[serde(default)]
    pub port_aliases: HashMap<String, String>,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            timeout_ms: 10,
            port_aliases: HashMap::new(),
        }
    }
}

impl SerialConfig {
    /// Resolve a port name through aliases
    pub fn resolve_port(&self, name: &str) -> String {
        self.port_aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    pub fn port_configuration(&self, baud_rate: u32) -> PortConfiguration {
        PortConfiguration {
            baud_rate,
            data_bits: self.data_bits,
            flow_control: self.flow_control,
            parity: self.parity,
            stop_bits: self.stop_bits,
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

/// Trace output section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Color hex runs by direction
    pub color: bool,
    /// Prefix each trace line with the capture time
    pub show_timestamps: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            color: true,
            show_timestamps: false,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Multi-line format with colors
    Pretty,
    /// Single-line format
    #[default]
    Compact,
}
