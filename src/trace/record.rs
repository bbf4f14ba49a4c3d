use crate::relay::{ByteChunk, Direction};
use chrono::{DateTime, Local};

/// One captured chunk, as seen by the trace output.
///
/// Built once per chunk read from an endpoint, before the chunk is forwarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    pub direction: Direction,
    pub chunk: ByteChunk,
    /// Wall-clock capture time.
    pub timestamp: DateTime<Local>,
    /// Start a new line before this record: the capturing side had been idle
    /// for longer than the configured gap.
    pub line_break: bool,
}

impl TraceRecord {
    pub fn new(
        direction: Direction,
        chunk: ByteChunk,
        timestamp: DateTime<Local>,
        line_break: bool,
    ) -> Self {
        Self {
            direction,
            chunk,
            timestamp,
            line_break,
        }
    }

    pub fn hex(&self) -> String {
        self.chunk.to_hex()
    }
}
