//! Serial Sniffer Library
//!
//! Splices itself between a serial device and the software that talks to it,
//! relaying every byte unmodified in both directions while writing a
//! direction-colored hex trace of the conversation.
//!
//! # Modules
//!
//! - `config`: Configuration management with TOML support
//! - `port`: Port abstraction layer for serial communication
//! - `relay`: The two relay workers, their channel and the orchestrator
//! - `trace`: Rendering of captured traffic
//! - `clock`: Time sources (real and manual)
//! - `error`: Top-level errors and exit codes
//! - `logging`: Diagnostic log setup

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod port;
pub mod relay;
pub mod trace;

// Re-export commonly used types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
pub use error::AppError;
pub use port::{
    MockPortOpener, MockSerialPort, PortConfiguration, PortError, PortOpener, SerialPortAdapter,
    SyncSerialPort, SystemPortOpener,
};
pub use relay::{
    ByteChunk, Direction, EndpointRole, RelayError, RelayReport, RelaySettings, ShutdownSignal,
    Sniffer,
};
pub use trace::{TerminalSink, TraceRecord, TraceSink, TraceStyle};
