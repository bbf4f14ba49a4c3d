//! Configuration module for serial-sniffer.
//!
//! This module provides TOML-based configuration with environment variable
//! overrides. Command-line flags are applied on top by the binary.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `--config <path>` on the command line
//! 2. `SERIAL_SNIFFER_CONFIG` environment variable (explicit path)
//! 3. `./sniffer.toml` (current directory)
//! 4. `sniffer.toml` in the platform config directory
//! 5. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! The pattern is `SERIAL_SNIFFER_<SECTION>_<KEY>`, e.g.
//! `SERIAL_SNIFFER_RELAY_HARDWARE_PORT=COM5` or `SERIAL_SNIFFER_TRACE_COLOR=false`.
//!
//! # Example
//!
//! ```toml
//! [relay]
//! hardware_port = "COM5"
//! software_port = "COM8"
//! baud_rate = 115200
//! idle_gap_secs = 2.0
//!
//! [trace]
//! show_timestamps = true
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    apply_overrides, get_default_config_dir, get_default_config_path, resolve_config_path,
    ConfigLoader,
};
pub use schema::{
    Config, LogFormat, LoggingConfig, RelayConfig, RetryConfig, SerialConfig, TraceConfig,
};
