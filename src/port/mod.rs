//! Port abstraction layer for serial communication.
//!
//! Provides the adapter trait both relay workers are written against, the
//! `serialport`-backed implementation, and mocks for tests.

pub mod error;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use error::PortError;
pub use mock::{MockPortOpener, MockSerialPort};
pub use sync_port::{list_port_names, SyncSerialPort, SystemPortOpener};
pub use traits::*;
