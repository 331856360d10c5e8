use serde::de::IgnoredAny;
use tracing::{debug, warn};

/// Upper bound on buffered, not-yet-complete inbound data
pub const MAX_BUFFER_BYTES: usize = 4 * 1024 * 1024;

/// Splits the worker's byte stream into complete JSON values.
///
/// The worker writes one JSON object per write with no delimiter, but the
/// transport is free to split or merge those writes. Bytes are buffered until
/// a value is complete; several values in one chunk are all returned.
///
/// Each byte is scanned once for nesting depth, so a large value arriving in
/// many small reads is only parsed when its closing bracket shows up.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    scanned: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes held back waiting for the rest of a value
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Feed a chunk and return every complete frame it finished.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        let mut start = 0;

        for i in self.scanned..self.buffer.len() {
            let byte = self.buffer[i];

            if self.in_string {
                match byte {
                    _ if self.escaped => self.escaped = false,
                    b'\\' => self.escaped = true,
                    b'"' => self.in_string = false,
                    _ => {}
                }
                continue;
            }

            match byte {
                b'{' | b'[' => self.depth += 1,
                b'}' | b']' if self.depth > 0 => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        let value = &self.buffer[start..i + 1];
                        if let Err(e) = serde_json::from_slice::<IgnoredAny>(value) {
                            self.discard(&e.to_string());
                            return frames;
                        }
                        frames.push(String::from_utf8_lossy(value).trim().to_string());
                        start = i + 1;
                    }
                }
                b'"' if self.depth > 0 => self.in_string = true,
                b' ' | b'\t' | b'\r' | b'\n' => {}
                // Anything else outside an object or array cannot start a frame
                _ if self.depth == 0 => {
                    self.discard("unexpected data between values");
                    return frames;
                }
                _ => {}
            }
        }

        // Whitespace after the last complete value carries nothing
        if self.depth == 0 {
            start = self.buffer.len();
        }
        self.buffer.drain(..start);
        self.scanned = self.buffer.len();

        if self.buffer.len() > MAX_BUFFER_BYTES {
            warn!(bytes = self.buffer.len(), "worker frame exceeded buffer limit, discarding");
            self.reset();
        }

        frames
    }

    fn discard(&mut self, reason: &str) {
        debug!(reason, bytes = self.buffer.len(), "dropping malformed worker data");
        self.reset();
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
        self.depth = 0;
        self.in_string = false;
        self.escaped = false;
    }
}
