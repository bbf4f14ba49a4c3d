//! Mock serial port implementation for testing.
//!
//! `MockSerialPort` simulates a device without hardware: tests push bytes
//! into its receive queue, inspect what the relay wrote, and inject faults.
//! Clones share state, so a test can keep one handle while a worker owns
//! another.

use super::error::PortError;
use super::traits::{PortConfiguration, PortOpener, SerialPortAdapter};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

/// Inner state of the mock port.
#[derive(Debug, Default)]
struct MockPortState {
    /// Bytes to be returned by read operations.
    read_queue: VecDeque<u8>,
    /// Log of all write calls, one entry per call.
    write_log: Vec<Vec<u8>>,
    /// Number of upcoming reads that fail with a timeout.
    read_timeouts: usize,
    /// Number of upcoming writes that fail with a timeout.
    write_timeouts: usize,
    /// Largest number of bytes a single write accepts.
    max_write_len: Option<usize>,
    /// Once set, every adapter call fails.
    disconnected: bool,
    /// Threads that have called into the adapter side of this port.
    accessors: HashSet<ThreadId>,
    /// Configuration the port was opened with, if opened through an opener.
    opened_with: Option<PortConfiguration>,
}

/// Mock serial port implementation for testing.
///
/// # Example
/// ```
/// use serial_sniffer::port::{MockSerialPort, SerialPortAdapter};
///
/// let mut port = MockSerialPort::new("MOCK0");
/// port.enqueue_read(b"Hello");
/// assert_eq!(port.bytes_available().unwrap(), 5);
///
/// let mut buffer = [0u8; 8];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"Hello");
///
/// port.write_bytes(b"Response").unwrap();
/// assert_eq!(port.written_bytes(), b"Response");
/// ```
#[derive(Clone)]
pub struct MockSerialPort {
    name: String,
    state: Arc<Mutex<MockPortState>>,
}

impl MockSerialPort {
    /// Create a new mock serial port with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockPortState::default())),
        }
    }

    /// Append bytes to the receive queue, as if the device had sent them.
    pub fn enqueue_read(&self, data: &[u8]) {
        self.state.lock().read_queue.extend(data);
    }

    /// Every write call made to the port, in order.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// All bytes written to the port, concatenated in order.
    pub fn written_bytes(&self) -> Vec<u8> {
        self.state.lock().write_log.concat()
    }

    /// Number of bytes still waiting in the receive queue.
    pub fn pending_reads(&self) -> usize {
        self.state.lock().read_queue.len()
    }

    /// Make the next `count` reads fail with a timeout.
    pub fn inject_read_timeouts(&self, count: usize) {
        self.state.lock().read_timeouts = count;
    }

    /// Make the next `count` writes fail with a timeout.
    pub fn inject_write_timeouts(&self, count: usize) {
        self.state.lock().write_timeouts = count;
    }

    /// Cap how many bytes a single write call accepts.
    pub fn set_max_write_len(&self, max: Option<usize>) {
        self.state.lock().max_write_len = max;
    }

    /// Simulate the device being unplugged.
    pub fn disconnect(&self) {
        self.state.lock().disconnected = true;
    }

    /// How many distinct threads have used this port through the adapter trait.
    pub fn accessor_count(&self) -> usize {
        self.state.lock().accessors.len()
    }

    /// Configuration passed to the opener, if the port was opened through one.
    pub fn opened_with(&self) -> Option<PortConfiguration> {
        self.state.lock().opened_with.clone()
    }

    fn touch(&self) -> parking_lot::MutexGuard<'_, MockPortState> {
        let mut state = self.state.lock();
        state.accessors.insert(thread::current().id());
        state
    }
}

impl SerialPortAdapter for MockSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.touch();

        if state.disconnected {
            return Err(PortError::disconnected(&self.name));
        }
        if state.write_timeouts > 0 {
            state.write_timeouts -= 1;
            return Err(PortError::timeout(Duration::from_millis(10)));
        }

        let len = state.max_write_len.map_or(data.len(), |max| max.min(data.len()));
        state.write_log.push(data[..len].to_vec());
        Ok(len)
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.touch();

        if state.disconnected {
            return Err(PortError::disconnected(&self.name));
        }
        if state.read_timeouts > 0 {
            state.read_timeouts -= 1;
            return Err(PortError::timeout(Duration::from_millis(10)));
        }

        let mut bytes_read = 0;
        for byte in buffer.iter_mut() {
            match state.read_queue.pop_front() {
                Some(queued) => {
                    *byte = queued;
                    bytes_read += 1;
                }
                None => break,
            }
        }

        if bytes_read == 0 {
            // Same as a non-blocking driver with nothing buffered
            Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::WouldBlock,
                "No data available",
            )))
        } else {
            Ok(bytes_read)
        }
    }

    fn bytes_available(&self) -> Result<usize, PortError> {
        let state = self.touch();
        if state.disconnected {
            return Err(PortError::disconnected(&self.name));
        }
        Ok(state.read_queue.len())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("pending_reads", &self.pending_reads())
            .finish()
    }
}

/// Hands out registered mock ports by name.
///
/// Opening a name that was never registered, or one marked unavailable,
/// fails with `PortError::NotFound`.
#[derive(Debug, Default, Clone)]
pub struct MockPortOpener {
    ports: HashMap<String, MockSerialPort>,
    unavailable: HashSet<String>,
}

impl MockPortOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a port; the opener hands out clones sharing its state.
    pub fn with_port(mut self, port: MockSerialPort) -> Self {
        self.ports.insert(port.name.clone(), port);
        self
    }

    /// Make opening `name` fail even if a port is registered under it.
    pub fn with_unavailable(mut self, name: impl Into<String>) -> Self {
        self.unavailable.insert(name.into());
        self
    }
}

impl PortOpener for MockPortOpener {
    fn open(
        &self,
        port_name: &str,
        config: &PortConfiguration,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        if self.unavailable.contains(port_name) {
            return Err(PortError::not_found(port_name));
        }
        let port = self
            .ports
            .get(port_name)
            .cloned()
            .ok_or_else(|| PortError::not_found(port_name))?;
        port.state.lock().opened_with = Some(config.clone());
        Ok(Box::new(port))
    }
}
