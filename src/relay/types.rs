//! Values that flow through the relay.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::ops::Deref;

/// Bytes read from one endpoint in a single poll.
///
/// Never empty. Carries no message framing: it is whatever the driver had
/// buffered at the time of the read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteChunk(Bytes);

impl ByteChunk {
    /// Wrap `data`, or `None` if it is empty.
    pub fn new(data: impl Into<Bytes>) -> Option<Self> {
        let data = data.into();
        if data.is_empty() {
            None
        } else {
            Some(Self(data))
        }
    }

    /// Copy `data` into a new chunk, or `None` if it is empty.
    pub fn copy_from_slice(data: &[u8]) -> Option<Self> {
        Self::new(Bytes::copy_from_slice(data))
    }

    /// Lowercase hex of every byte, no separators.
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(self.0.len() * 2);
        for byte in self.0.iter() {
            // Writing to a String cannot fail
            let _ = write!(out, "{byte:02x}");
        }
        out
    }
}

impl Deref for ByteChunk {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for ByteChunk {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Which way a chunk travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    HardwareToSoftware,
    SoftwareToHardware,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HardwareToSoftware => write!(f, "hw->sw"),
            Self::SoftwareToHardware => write!(f, "sw->hw"),
        }
    }
}

/// The side of the conversation a worker is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointRole {
    /// The physical device port.
    Hardware,
    /// The virtual port the host software talks to.
    Software,
}

impl EndpointRole {
    /// Direction of bytes captured on this side.
    pub fn outbound(self) -> Direction {
        match self {
            Self::Hardware => Direction::HardwareToSoftware,
            Self::Software => Direction::SoftwareToHardware,
        }
    }
}

impl fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hardware => write!(f, "hardware"),
            Self::Software => write!(f, "software"),
        }
    }
}
