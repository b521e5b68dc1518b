//! Append-only text destinations with position-addressable read-back.
//!
//! Two kinds exist. [`MemorySink`] keeps everything in a buffer and supports
//! every operation on every pass. [`StreamSink`] forwards writes to an external
//! destination; it mirrors the first pass in memory so the engine can capture
//! its static blocks, then switches to plain pass-through.

mod memory;
mod stream;

pub use memory::MemorySink;
pub use stream::{StreamSink, StreamTarget};

use crate::error::Result;

/// What a sink hands back when a render pass completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finished {
    /// The accumulated text of the pass.
    Text(String),
    /// The pass was written through to a destination and cannot be read back.
    Streamed,
}

pub trait Sink: Send {
    fn write_str(&mut self, text: &str) -> Result<()>;

    fn write_char(&mut self, c: char) -> Result<()> {
        let mut buf = [0u8; 4];
        self.write_str(c.encode_utf8(&mut buf))
    }

    /// Current write offset, in bytes.
    fn position(&self) -> usize;

    /// Everything written since `marker`, which must come from [`Sink::position`].
    fn slice_from(&self, marker: usize) -> Result<&str>;

    /// Completes the pass and clears the accumulated content for the next one.
    fn finish_and_reset(&mut self) -> Result<Finished>;

    /// Drops whatever the current pass accumulated without finishing it.
    fn discard(&mut self);
}

/// The kind of sink a view builds its engines with.
#[derive(Debug, Clone, Default)]
pub enum Output {
    #[default]
    Memory,
    Stream(StreamTarget),
}

impl Output {
    pub fn stream(target: StreamTarget) -> Self {
        Output::Stream(target)
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, Output::Stream(_))
    }

    pub(crate) fn sink(&self) -> Box<dyn Sink> {
        match self {
            Output::Memory => Box::new(MemorySink::new()),
            Output::Stream(target) => Box::new(StreamSink::new(target.clone())),
        }
    }
}
