//! The two-sided relay.
//!
//! # Architecture
//!
//! ```text
//! hardware port <-> PortWorker(hw) <-> relay channel <-> PortWorker(sw) <-> software port
//!                          \                                   /
//!                           '------------> TraceSink <--------'
//! ```
//!
//! Each worker owns its endpoint exclusively and runs on its own thread. The
//! relay channel is the only link between them; the trace sink and the
//! shutdown signal are shared.

pub mod channel;
mod error;
mod idle;
mod retry;
mod shutdown;
mod sniffer;
mod types;
pub mod worker;

pub use channel::{relay_channel, ChannelError, RelayEndpoint, SendOutcome};
pub use error::RelayError;
pub use idle::{IdleTracker, DEFAULT_IDLE_GAP};
pub use retry::RetryPolicy;
pub use shutdown::ShutdownSignal;
pub use sniffer::{RelayReport, RelaySettings, Sniffer};
pub use types::{ByteChunk, Direction, EndpointRole};
pub use worker::{PortWorker, StepOutcome, WorkerSettings, WorkerSummary};
