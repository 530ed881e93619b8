use crate::events::StreamChunk;

/// Incremental line splitter for the completion event stream.
///
/// Bytes are buffered until a newline arrives, so a line (or a multi-byte
/// character) split across network chunks is decoded whole.
#[derive(Debug, Default)]
pub struct LineStreamParser {
    buffer: Vec<u8>,
}

impl LineStreamParser {
    /// Feed arbitrary bytes and drain every complete line, in order.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamChunk> {
        self.buffer.extend_from_slice(bytes);
        let mut chunks = Vec::new();

        while let Some(newline) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            chunks.push(StreamChunk::from_line(&String::from_utf8_lossy(
                &line[..line.len() - 1],
            )));
        }

        chunks
    }

    /// Classifies a trailing line the stream ended without terminating.
    pub fn finish(&mut self) -> Option<StreamChunk> {
        if self.is_empty_buffer() {
            self.buffer.clear();
            return None;
        }
        let line = std::mem::take(&mut self.buffer);
        Some(StreamChunk::from_line(&String::from_utf8_lossy(&line)))
    }

    /// Parse a complete body in one shot.
    pub fn parse_lines(input: &str) -> Vec<StreamChunk> {
        let mut parser = Self::default();
        let mut chunks = parser.feed(input.as_bytes());
        chunks.extend(parser.finish());
        chunks
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.iter().all(u8::is_ascii_whitespace)
    }
}
