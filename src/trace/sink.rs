//! Trace output.
//!
//! Both workers write into one `TraceSink`. Each record is rendered and
//! flushed while holding the sink's lock, so output from the two sides is
//! never interleaved inside a record.

use super::record::TraceRecord;
use crate::relay::Direction;
use crossterm::style::{Color, Stylize};
use parking_lot::Mutex;
use std::io::{self, Write};

pub trait TraceSink: Send + Sync {
    fn record(&self, record: &TraceRecord) -> io::Result<()>;

    /// Called once after both workers have stopped.
    fn finish(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Presentation options for [`TerminalSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceStyle {
    /// Color runs by direction.
    pub color: bool,
    /// Prefix each line with the capture time of its first record.
    pub timestamps: bool,
}

impl Default for TraceStyle {
    fn default() -> Self {
        Self {
            color: true,
            timestamps: false,
        }
    }
}

impl TraceStyle {
    pub fn color_for(direction: Direction) -> Color {
        match direction {
            Direction::HardwareToSoftware => Color::Green,
            Direction::SoftwareToHardware => Color::Magenta,
        }
    }

    /// Render one record. `line_open` is whether the current output line
    /// already holds a record.
    pub fn render(&self, record: &TraceRecord, line_open: bool) -> String {
        let mut out = String::new();
        let starts_line = !line_open || record.line_break;

        if record.line_break && line_open {
            out.push('\n');
        }
        if self.timestamps && starts_line {
            out.push_str(&format!("[{}] ", record.timestamp.format("%H:%M:%S%.3f")));
        }

        let hex = record.hex();
        if self.color {
            out.push_str(&hex.with(Self::color_for(record.direction)).to_string());
        } else {
            out.push_str(&hex);
        }
        out
    }
}

struct TerminalState<W> {
    writer: W,
    line_open: bool,
}

/// Writes records as colored hex runs on a single text stream.
///
/// Records accumulate on the current line; a record flagged with
/// `line_break` starts a new one.
pub struct TerminalSink<W: Write + Send> {
    style: TraceStyle,
    state: Mutex<TerminalState<W>>,
}

impl<W: Write + Send> TerminalSink<W> {
    pub fn new(writer: W, style: TraceStyle) -> Self {
        Self {
            style,
            state: Mutex::new(TerminalState {
                writer,
                line_open: false,
            }),
        }
    }

    pub fn into_inner(self) -> W {
        self.state.into_inner().writer
    }
}

impl<W: Write + Send> TraceSink for TerminalSink<W> {
    fn record(&self, record: &TraceRecord) -> io::Result<()> {
        let mut state = self.state.lock();
        let rendered = self.style.render(record, state.line_open);
        state.writer.write_all(rendered.as_bytes())?;
        state.writer.flush()?;
        state.line_open = true;
        Ok(())
    }

    fn finish(&self) -> io::Result<()> {
        let mut state = self.state.lock();
        if state.line_open {
            state.writer.write_all(b"\n")?;
            state.line_open = false;
        }
        state.writer.flush()
    }
}

impl<W: Write + Send> std::fmt::Debug for TerminalSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalSink")
            .field("style", &self.style)
            .finish()
    }
}

/// Keeps every record in memory. Used by tests and benchmarks.
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Mutex<Vec<TraceRecord>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TraceRecord> {
        self.records.lock().clone()
    }

    /// Concatenated bytes of every record in `direction`, in capture order.
    pub fn bytes_for(&self, direction: Direction) -> Vec<u8> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.direction == direction)
            .flat_map(|r| r.chunk.iter().copied())
            .collect()
    }
}

impl TraceSink for RecordingSink {
    fn record(&self, record: &TraceRecord) -> io::Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}
