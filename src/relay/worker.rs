//! One side of the relay.
//!
//! A `PortWorker` owns a single serial endpoint and its end of the relay
//! channel. Each iteration it captures whatever the endpoint has buffered,
//! traces it, hands it to the peer, then writes anything the peer has sent
//! to its own endpoint. Both endpoints are only ever touched from their own
//! worker, so every byte crossing the relay is seen here first.

use super::channel::{RelayEndpoint, SendOutcome};
use super::error::RelayError;
use super::idle::{IdleTracker, DEFAULT_IDLE_GAP};
use super::retry::RetryPolicy;
use super::shutdown::ShutdownSignal;
use super::types::{ByteChunk, EndpointRole};
use crate::clock::Clock;
use crate::port::{PortError, SerialPortAdapter};
use crate::trace::{TraceRecord, TraceSink};
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// Tuning for a worker's poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSettings {
    /// Idle time after which the next captured chunk starts a new trace line.
    pub idle_gap: Duration,
    /// Sleep at the end of every iteration. Zero yields the thread instead.
    pub poll_interval: Duration,
    /// Most bytes captured in one read.
    pub read_buffer_size: usize,
    /// Most peer chunks written to the endpoint per iteration.
    pub drain_batch: usize,
    pub retry: RetryPolicy,
    /// How long the shutdown handoff may wait on the peer.
    pub shutdown_timeout: Duration,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            idle_gap: DEFAULT_IDLE_GAP,
            poll_interval: Duration::from_millis(1),
            read_buffer_size: 256,
            drain_batch: 64,
            retry: RetryPolicy::default(),
            shutdown_timeout: Duration::from_secs(2),
        }
    }
}

/// What a single iteration did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepOutcome {
    /// Bytes read from this worker's endpoint.
    pub captured: usize,
    /// Bytes from the peer written to this worker's endpoint.
    pub delivered: usize,
    /// A captured chunk is waiting for room in the peer's queue; capture is
    /// paused until it goes through.
    pub stalled: bool,
}

/// Traffic counters for one worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub chunks_captured: u64,
    pub bytes_captured: u64,
    pub chunks_delivered: u64,
    pub bytes_delivered: u64,
}

pub struct PortWorker {
    role: EndpointRole,
    port: Box<dyn SerialPortAdapter>,
    port_name: String,
    relay: RelayEndpoint,
    sink: Arc<dyn TraceSink>,
    clock: Arc<dyn Clock>,
    shutdown: ShutdownSignal,
    settings: WorkerSettings,
    idle: IdleTracker,
    read_buf: Vec<u8>,
    /// Captured and traced, but refused by a full peer queue.
    held: Option<ByteChunk>,
    summary: WorkerSummary,
}

impl PortWorker {
    pub fn new(
        role: EndpointRole,
        port: Box<dyn SerialPortAdapter>,
        relay: RelayEndpoint,
        sink: Arc<dyn TraceSink>,
        clock: Arc<dyn Clock>,
        shutdown: ShutdownSignal,
        settings: WorkerSettings,
    ) -> Self {
        let idle = IdleTracker::new(settings.idle_gap, clock.now());
        let port_name = port.name().to_string();
        let read_buf = vec![0u8; settings.read_buffer_size.max(1)];

        Self {
            role,
            port,
            port_name,
            relay,
            sink,
            clock,
            shutdown,
            settings,
            idle,
            read_buf,
            held: None,
            summary: WorkerSummary::default(),
        }
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn summary(&self) -> WorkerSummary {
        self.summary
    }

    /// Poll until shutdown is signalled or the endpoint fails.
    ///
    /// A failure triggers the shared shutdown signal so the peer stops too.
    /// The endpoint is closed when this returns.
    pub fn run(mut self) -> Result<WorkerSummary, RelayError> {
        info!(role = %self.role, port = %self.port_name, "relay worker started");

        match self.poll_loop().and_then(|()| self.finish()) {
            Ok(()) => {
                info!(
                    role = %self.role,
                    port = %self.port_name,
                    bytes_captured = self.summary.bytes_captured,
                    bytes_delivered = self.summary.bytes_delivered,
                    "relay worker stopped"
                );
                Ok(self.summary)
            }
            Err(e) => {
                self.shutdown.trigger();
                error!(role = %self.role, port = %self.port_name, error = %e, "relay worker failed");
                Err(e)
            }
        }
    }

    fn poll_loop(&mut self) -> Result<(), RelayError> {
        while !self.shutdown.is_triggered() {
            match self.step() {
                Ok(_) => {}
                // The peer failed first and has already reported it
                Err(RelayError::PeerDisconnected { .. }) if self.shutdown.is_triggered() => break,
                Err(e) => return Err(e),
            }
            self.pause();
        }
        Ok(())
    }

    fn pause(&self) {
        if self.settings.poll_interval.is_zero() {
            thread::yield_now();
        } else {
            thread::sleep(self.settings.poll_interval);
        }
    }

    /// Run one capture / relay-in iteration without sleeping.
    pub fn step(&mut self) -> Result<StepOutcome, RelayError> {
        let mut outcome = StepOutcome::default();

        if self.forward_held()? {
            if let Some(chunk) = self.capture()? {
                outcome.captured = chunk.len();
                self.forward(chunk)?;
            }
        }
        outcome.stalled = self.held.is_some();

        // Always drain, even while stalled: the peer may itself be waiting on
        // our queue, and it only empties when we service it here.
        outcome.delivered = self.relay_in(self.settings.drain_batch.max(1))?;
        Ok(outcome)
    }

    /// Retry a held chunk. Returns whether capture may proceed.
    fn forward_held(&mut self) -> Result<bool, RelayError> {
        match self.held.take() {
            None => Ok(true),
            Some(chunk) => {
                self.forward(chunk)?;
                Ok(self.held.is_none())
            }
        }
    }

    fn forward(&mut self, chunk: ByteChunk) -> Result<(), RelayError> {
        let len = chunk.len();
        match self.relay.try_send(chunk) {
            Ok(SendOutcome::Sent) => Ok(()),
            Ok(SendOutcome::Full(chunk)) => {
                trace!(role = %self.role, bytes = len, "peer queue full, holding chunk");
                self.held = Some(chunk);
                Ok(())
            }
            Err(e) => {
                // Only reachable once the peer worker has failed and gone
                warn!(role = %self.role, bytes = len, error = %e, "captured bytes could not be forwarded");
                Err(RelayError::PeerDisconnected { role: self.role })
            }
        }
    }

    fn capture(&mut self) -> Result<Option<ByteChunk>, RelayError> {
        let port = &mut self.port;
        let retry = &self.settings.retry;

        let available = with_retry(retry, "read", &self.port_name, || port.bytes_available())
            .map_err(|source| read_error(self.role, &self.port_name, source))?;
        if available == 0 {
            return Ok(None);
        }

        let len = available.min(self.read_buf.len());
        let buf = &mut self.read_buf[..len];
        let read = match with_retry(retry, "read", &self.port_name, || port.read_bytes(&mut *buf)) {
            Ok(n) => n,
            // The driver reported bytes it then could not hand over
            Err(PortError::Io(e)) if e.kind() == io::ErrorKind::WouldBlock => 0,
            Err(source) => return Err(read_error(self.role, &self.port_name, source)),
        };

        let Some(chunk) = ByteChunk::copy_from_slice(&self.read_buf[..read]) else {
            return Ok(None);
        };

        let line_break = self.idle.observe(self.clock.now());
        let record = TraceRecord::new(
            self.role.outbound(),
            chunk.clone(),
            self.clock.wall(),
            line_break,
        );
        self.sink.record(&record).map_err(RelayError::Trace)?;

        self.summary.chunks_captured += 1;
        self.summary.bytes_captured += chunk.len() as u64;
        trace!(role = %self.role, bytes = chunk.len(), "captured chunk");
        Ok(Some(chunk))
    }

    /// Write up to `limit` chunks from the peer to this endpoint. Returns the
    /// number of bytes written.
    fn relay_in(&mut self, limit: usize) -> Result<usize, RelayError> {
        let mut delivered = 0;
        for _ in 0..limit {
            let chunk = match self.relay.try_recv() {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                // Closed as part of the peer's shutdown handoff
                Err(_) if self.shutdown.is_triggered() => break,
                Err(_) => return Err(RelayError::PeerDisconnected { role: self.role }),
            };
            self.deliver(&chunk)?;
            delivered += chunk.len();
        }
        Ok(delivered)
    }

    /// Write a whole chunk, resuming after short writes. A retried write picks
    /// up at the first unwritten byte, so nothing is dropped or repeated.
    fn deliver(&mut self, chunk: &ByteChunk) -> Result<(), RelayError> {
        let mut offset = 0;
        let mut attempt = 0;

        while offset < chunk.len() {
            let error = match self.port.write_bytes(&chunk[offset..]) {
                Ok(0) => PortError::Io(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "endpoint accepted no bytes",
                )),
                Ok(n) => {
                    offset += n;
                    attempt = 0;
                    continue;
                }
                Err(e) => e,
            };

            attempt += 1;
            match self.settings.retry.backoff_after(attempt, &error) {
                Some(delay) => {
                    warn!(
                        port = %self.port_name,
                        attempt,
                        error = %error,
                        "transient write fault, retrying in {:?}",
                        delay
                    );
                    thread::sleep(delay);
                }
                None => {
                    return Err(RelayError::Write {
                        role: self.role,
                        port: self.port_name.clone(),
                        source: error,
                    })
                }
            }
        }

        self.summary.chunks_delivered += 1;
        self.summary.bytes_delivered += chunk.len() as u64;
        Ok(())
    }

    /// Clean-shutdown handoff, run once capture has stopped.
    ///
    /// First the held chunk goes out, with inbound still being drained so a
    /// peer stuck on our queue can make room. Then the sending half is closed
    /// and everything the peer sends is written until it closes its own. A
    /// peer closes only after its last send, so every traced chunk on either
    /// side reaches its endpoint unless `shutdown_timeout` runs out first.
    fn finish(&mut self) -> Result<(), RelayError> {
        let deadline = Instant::now() + self.settings.shutdown_timeout;
        let batch = self.settings.drain_batch.max(1);

        while self.held.is_some() && Instant::now() < deadline {
            match self.forward_held() {
                Ok(_) => {}
                Err(RelayError::PeerDisconnected { .. }) => break,
                Err(e) => return Err(e),
            }
            if self.held.is_some() {
                self.relay_in(batch)?;
                self.pause();
            }
        }
        if let Some(chunk) = self.held.take() {
            error!(role = %self.role, bytes = chunk.len(), "peer did not accept captured bytes before the shutdown deadline");
        }
        self.relay.close_outbound();

        let mut flushed = 0;
        loop {
            match self.relay.try_recv() {
                Ok(Some(chunk)) => {
                    self.deliver(&chunk)?;
                    flushed += chunk.len();
                }
                Ok(None) if Instant::now() < deadline => self.pause(),
                Ok(None) => {
                    warn!(role = %self.role, "peer did not finish its shutdown handoff in time");
                    break;
                }
                Err(_) => break,
            }
        }
        if flushed > 0 {
            debug!(role = %self.role, bytes = flushed, "flushed pending peer data");
        }
        Ok(())
    }
}

impl std::fmt::Debug for PortWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortWorker")
            .field("role", &self.role)
            .field("port", &self.port_name)
            .field("summary", &self.summary)
            .finish()
    }
}

fn read_error(role: EndpointRole, port: &str, source: PortError) -> RelayError {
    RelayError::Read {
        role,
        port: port.to_string(),
        source,
    }
}

fn with_retry<T>(
    policy: &RetryPolicy,
    op: &str,
    port_name: &str,
    mut f: impl FnMut() -> Result<T, PortError>,
) -> Result<T, PortError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match f() {
            Ok(value) => return Ok(value),
            Err(e) => match policy.backoff_after(attempt, &e) {
                Some(delay) => {
                    warn!(port = %port_name, attempt, error = %e, "transient {} fault, retrying in {:?}", op, delay);
                    thread::sleep(delay);
                }
                None => return Err(e),
            },
        }
    }
}
