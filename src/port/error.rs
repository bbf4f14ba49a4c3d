//! Port-specific error types.
//!
//! Device-level faults are kept separate from relay-level errors so that the
//! worker can decide whether a fault is worth retrying before it escalates.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during serial port operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The specified serial port was not found on the system.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// An I/O error occurred during port operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Port configuration failed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation timed out.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The device went away while the port was open.
    #[error("Serial port disconnected: {0}")]
    Disconnected(String),

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Create a Config error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a Timeout error from a duration.
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout(duration)
    }

    /// Create a Disconnected error from a port name.
    pub fn disconnected(port_name: impl Into<String>) -> Self {
        Self::Disconnected(port_name.into())
    }

    /// Whether the fault may clear up on its own if the operation is repeated.
    ///
    /// Timeouts and interrupted or would-block I/O are transient. Everything
    /// else (missing device, broken pipe, bad configuration) is treated as
    /// permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
            ),
            Self::Serial(e) => match e.kind() {
                serialport::ErrorKind::Io(kind) => matches!(
                    kind,
                    io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
                ),
                _ => false,
            },
            Self::NotFound(_) | Self::Config(_) | Self::Disconnected(_) => false,
        }
    }
}
