use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{RenderError, Result};
use crate::sink::{Finished, Sink};

/// A cloneable handle to one shared output destination.
#[derive(Clone)]
pub struct StreamTarget {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl StreamTarget {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        StreamTarget {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
        self.inner.lock().write_all(bytes)
    }

    fn flush(&self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

impl fmt::Debug for StreamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamTarget").finish_non_exhaustive()
    }
}

#[derive(Debug)]
enum Phase {
    /// First pass: writes go through and are mirrored here for block capture.
    Recording(String),
    PassThrough,
}

/// Transport-backed sink that writes through to a [`StreamTarget`].
#[derive(Debug)]
pub struct StreamSink {
    target: StreamTarget,
    phase: Phase,
    written: usize,
}

impl StreamSink {
    pub fn new(target: StreamTarget) -> Self {
        StreamSink {
            target,
            phase: Phase::Recording(String::new()),
            written: 0,
        }
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.phase, Phase::Recording(_))
    }
}

impl Sink for StreamSink {
    fn write_str(&mut self, text: &str) -> Result<()> {
        self.target.write_all(text.as_bytes())?;
        if let Phase::Recording(buf) = &mut self.phase {
            buf.push_str(text);
        }
        self.written += text.len();
        Ok(())
    }

    fn position(&self) -> usize {
        match &self.phase {
            Phase::Recording(buf) => buf.len(),
            Phase::PassThrough => self.written,
        }
    }

    fn slice_from(&self, marker: usize) -> Result<&str> {
        match &self.phase {
            Phase::Recording(buf) => Ok(&buf[marker..]),
            Phase::PassThrough => Err(RenderError::SinkFlushed),
        }
    }

    fn finish_and_reset(&mut self) -> Result<Finished> {
        self.target.flush()?;
        self.phase = Phase::PassThrough;
        self.written = 0;
        Ok(Finished::Streamed)
    }

    fn discard(&mut self) {
        if let Phase::Recording(buf) = &mut self.phase {
            buf.clear();
        }
        self.written = 0;
    }
}
