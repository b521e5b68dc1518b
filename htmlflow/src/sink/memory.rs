use crate::error::Result;
use crate::sink::{Finished, Sink};

/// Buffer-backed sink; restartable and fully readable on every pass.
#[derive(Debug, Default)]
pub struct MemorySink {
    buf: String,
}

impl MemorySink {
    pub fn new() -> Self {
        MemorySink { buf: String::new() }
    }
}

impl Sink for MemorySink {
    fn write_str(&mut self, text: &str) -> Result<()> {
        self.buf.push_str(text);
        Ok(())
    }

    fn write_char(&mut self, c: char) -> Result<()> {
        self.buf.push(c);
        Ok(())
    }

    fn position(&self) -> usize {
        self.buf.len()
    }

    fn slice_from(&self, marker: usize) -> Result<&str> {
        Ok(&self.buf[marker..])
    }

    fn finish_and_reset(&mut self) -> Result<Finished> {
        let text = self.buf.clone();
        self.buf.clear();
        Ok(Finished::Text(text))
    }

    fn discard(&mut self) {
        self.buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_and_resets() {
        let mut sink = MemorySink::new();
        sink.write_str("<html").unwrap();
        let mark = sink.position();
        sink.write_char('>').unwrap();
        sink.write_str("\n\t<body").unwrap();
        assert_eq!(sink.slice_from(mark).unwrap(), ">\n\t<body");

        let finished = sink.finish_and_reset().unwrap();
        assert_eq!(finished, Finished::Text("<html>\n\t<body".to_string()));
        assert_eq!(sink.position(), 0);

        sink.write_str("again").unwrap();
        assert_eq!(
            sink.finish_and_reset().unwrap(),
            Finished::Text("again".to_string())
        );
    }
}
