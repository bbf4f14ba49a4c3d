//! Top-level application errors and process exit codes.

use crate::config::ConfigError;
use crate::port::PortError;
use crate::relay::{EndpointRole, RelayError};
use thiserror::Error;

// Process exit codes.
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_USAGE: u8 = 2;
pub const EXIT_HARDWARE_UNAVAILABLE: u8 = 3;
pub const EXIT_SOFTWARE_UNAVAILABLE: u8 = 4;
pub const EXIT_HARDWARE_FAULT: u8 = 5;
pub const EXIT_SOFTWARE_FAULT: u8 = 6;

/// Unified application error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    /// Port enumeration failed.
    #[error("could not list serial ports: {0}")]
    PortList(#[source] PortError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Exit code the process should terminate with.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => EXIT_USAGE,
            Self::Relay(err) => match (err, err.failed_endpoint()) {
                (RelayError::PortUnavailable { .. }, Some(EndpointRole::Hardware)) => {
                    EXIT_HARDWARE_UNAVAILABLE
                }
                (RelayError::PortUnavailable { .. }, Some(EndpointRole::Software)) => {
                    EXIT_SOFTWARE_UNAVAILABLE
                }
                (_, Some(EndpointRole::Hardware)) => EXIT_HARDWARE_FAULT,
                (_, Some(EndpointRole::Software)) => EXIT_SOFTWARE_FAULT,
                (_, None) => EXIT_FAILURE,
            },
            Self::PortList(_) | Self::Io(_) => EXIT_FAILURE,
        }
    }
}
