//! Human-readable trace of the sniffed conversation.
//!
//! Every chunk a worker captures becomes a [`TraceRecord`]; a [`TraceSink`]
//! renders records from both directions into one stream of hex runs, colored
//! by direction and split into lines at idle gaps.

mod record;
mod sink;

pub use record::TraceRecord;
pub use sink::{RecordingSink, TerminalSink, TraceSink, TraceStyle};
