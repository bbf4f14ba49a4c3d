use super::types::EndpointRole;
use crate::port::PortError;
use std::io;
use thiserror::Error;

/// Faults that stop the relay.
#[derive(Debug, Error)]
pub enum RelayError {
    /// An endpoint could not be opened at startup.
    #[error("{role} port '{port}' is unavailable: {source}")]
    PortUnavailable {
        role: EndpointRole,
        port: String,
        #[source]
        source: PortError,
    },

    #[error("failed to read from {role} port '{port}': {source}")]
    Read {
        role: EndpointRole,
        port: String,
        #[source]
        source: PortError,
    },

    #[error("failed to write to {role} port '{port}': {source}")]
    Write {
        role: EndpointRole,
        port: String,
        #[source]
        source: PortError,
    },

    /// The peer worker dropped its end of the relay channel without a
    /// shutdown having been requested.
    #[error("{role} worker lost its relay peer")]
    PeerDisconnected { role: EndpointRole },

    #[error("failed to write trace output: {0}")]
    Trace(#[source] io::Error),

    #[error("{role} worker panicked")]
    WorkerPanicked { role: EndpointRole },
}

impl RelayError {
    /// The endpoint whose device caused the failure, if any.
    pub fn failed_endpoint(&self) -> Option<EndpointRole> {
        match self {
            Self::PortUnavailable { role, .. }
            | Self::Read { role, .. }
            | Self::Write { role, .. } => Some(*role),
            Self::PeerDisconnected { .. } | Self::Trace(_) | Self::WorkerPanicked { .. } => None,
        }
    }

    /// Whether this error is only a consequence of a failure elsewhere.
    pub fn is_secondary(&self) -> bool {
        matches!(self, Self::PeerDisconnected { .. })
    }
}
