//! Newline framing over a byte stream

/// Buffers network reads and yields complete, non-empty lines
///
/// Bytes are held until a `\n` arrives, so multi-byte UTF-8 sequences split
/// across reads are reassembled before decoding.
#[derive(Debug, Default)]
pub struct LineSplitter {
    buffer: Vec<u8>,
    /// Start of the first unconsumed line
    cursor: usize,
    /// Bytes past `cursor` already known to hold no terminator
    scanned: usize,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one network read
    pub fn extend(&mut self, chunk: &[u8]) {
        if self.cursor > 0 {
            self.buffer.drain(..self.cursor);
            self.cursor = 0;
        }
        self.buffer.extend_from_slice(chunk);
    }

    /// Next complete line, trimmed; blank and non-UTF-8 lines are skipped
    pub fn next_line(&mut self) -> Option<String> {
        loop {
            let rest = &self.buffer[self.cursor..];
            let Some(offset) = rest[self.scanned..].iter().position(|byte| *byte == b'\n') else {
                self.scanned = rest.len();
                return None;
            };
            let end = self.scanned + offset;
            let line = decode_line(&rest[..end]);
            self.cursor += end + 1;
            self.scanned = 0;

            if let Some(line) = line {
                return Some(line);
            }
        }
    }

    /// Whatever follows the last terminator, once the source is exhausted
    pub fn take_remainder(&mut self) -> Option<String> {
        let line = decode_line(&self.buffer[self.cursor..]);
        self.buffer.clear();
        self.cursor = 0;
        self.scanned = 0;
        line
    }

    /// Bytes waiting for a terminator
    pub fn pending(&self) -> usize {
        self.buffer.len() - self.cursor
    }
}

fn decode_line(bytes: &[u8]) -> Option<String> {
    match std::str::from_utf8(bytes) {
        Ok(text) => {
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_owned())
        }
        Err(e) => {
            tracing::debug!(error = %e, "skipping non UTF-8 line");
            None
        }
    }
}
