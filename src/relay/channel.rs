//! In-process transport between the two workers.
//!
//! A relay channel is a pair of bounded FIFO queues, one per direction. Each
//! worker owns one `RelayEndpoint`: it sends on its outbound queue and
//! receives on the peer's. Neither operation ever blocks; a full queue hands
//! the chunk back so the sender can hold it and retry without losing it.
//!
//! At shutdown a worker closes its sending half once it has nothing left to
//! send. The peer keeps receiving until it sees `Disconnected`, which std
//! `mpsc` only reports after every queued chunk has been taken.

use super::types::ByteChunk;
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError, TrySendError};
use thiserror::Error;

/// Default number of chunks each direction may hold before senders stall.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelError {
    /// The peer endpoint has been dropped.
    #[error("relay peer has disconnected")]
    Disconnected,
    /// This endpoint's sending half was closed with `close_outbound`.
    #[error("relay endpoint is closed for sending")]
    Closed,
}

/// Result of a non-blocking send.
#[derive(Debug, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// The peer's queue is at capacity; the chunk is returned untouched.
    Full(ByteChunk),
}

/// One worker's handle onto the channel pair.
#[derive(Debug)]
pub struct RelayEndpoint {
    /// `None` once closed.
    outbound: Option<SyncSender<ByteChunk>>,
    inbound: Receiver<ByteChunk>,
}

/// Create a connected pair of endpoints, each direction holding at most
/// `capacity` chunks.
pub fn relay_channel(capacity: usize) -> (RelayEndpoint, RelayEndpoint) {
    // A zero-capacity sync_channel is a rendezvous channel, which try_send
    // can only complete while the peer is parked in recv. Never the case here.
    let capacity = capacity.max(1);
    let (a_tx, b_rx) = mpsc::sync_channel(capacity);
    let (b_tx, a_rx) = mpsc::sync_channel(capacity);

    (
        RelayEndpoint {
            outbound: Some(a_tx),
            inbound: a_rx,
        },
        RelayEndpoint {
            outbound: Some(b_tx),
            inbound: b_rx,
        },
    )
}

impl RelayEndpoint {
    pub fn try_send(&self, chunk: ByteChunk) -> Result<SendOutcome, ChannelError> {
        let outbound = self.outbound.as_ref().ok_or(ChannelError::Closed)?;
        match outbound.try_send(chunk) {
            Ok(()) => Ok(SendOutcome::Sent),
            Err(TrySendError::Full(chunk)) => Ok(SendOutcome::Full(chunk)),
            Err(TrySendError::Disconnected(_)) => Err(ChannelError::Disconnected),
        }
    }

    /// Drop the sending half. Chunks already queued stay deliverable; the
    /// peer sees `Disconnected` after taking the last of them.
    pub fn close_outbound(&mut self) {
        self.outbound = None;
    }

    pub fn try_recv(&self) -> Result<Option<ByteChunk>, ChannelError> {
        match self.inbound.try_recv() {
            Ok(chunk) => Ok(Some(chunk)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(ChannelError::Disconnected),
        }
    }
}
