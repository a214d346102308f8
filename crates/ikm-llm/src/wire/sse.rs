//! Incremental Server-Sent-Events frame decoder.
//!
//! Bytes arrive from the network in chunks that split lines, frames and
//! even UTF-8 code points at arbitrary positions. [`SseDecoder`] buffers
//! them and hands back complete [`SseFrame`]s.

use crate::error::LlmError;

/// Maximum size for the accumulation buffers before we abort the stream.
const MAX_BUF: usize = 16 * 1024 * 1024; // 16 MiB

/// One dispatched SSE event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseFrame {
    /// The `event:` field, if the frame had one.
    pub event: Option<String>,
    /// All `data:` lines of the frame joined with `\n`.
    pub data: String,
}

impl SseFrame {
    /// Creates a frame.
    pub fn new(event: Option<&str>, data: impl Into<String>) -> Self {
        Self {
            event: event.map(str::to_owned),
            data: data.into(),
        }
    }
}

/// Splits a byte stream into [`SseFrame`]s.
///
/// Lines are `\n` terminated (a trailing `\r` is dropped). A blank line
/// dispatches the pending frame. Comment lines (`:` prefix) are ignored.
/// A bare line starting with `{` is taken as a data line, for
/// aggregators that omit the `data:` prefix.
#[derive(Debug, Default)]
pub struct SseDecoder {
    utf8_buf: Vec<u8>,
    line_buf: String,
    event: Option<String>,
    data: Vec<String>,
    /// Bytes held in `data` for the pending frame.
    data_len: usize,
}

impl SseDecoder {
    /// Creates an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every frame it completed.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<SseFrame>, LlmError> {
        self.utf8_buf.extend_from_slice(bytes);
        self.check_bound()?;
        self.decode_utf8();

        let mut frames = Vec::new();
        while let Some(pos) = self.line_buf.find('\n') {
            let line: String = self.line_buf.drain(..=pos).collect();
            if let Some(frame) = self.feed_line(line.trim_end_matches(['\n', '\r'])) {
                frames.push(frame);
            }
        }
        self.check_bound()?;
        Ok(frames)
    }

    /// Fails and resets once the raw, line and pending data buffers
    /// together exceed [`MAX_BUF`].
    fn check_bound(&mut self) -> Result<(), LlmError> {
        if self.utf8_buf.len() + self.line_buf.len() + self.data_len <= MAX_BUF {
            return Ok(());
        }
        *self = Self::default();
        Err(LlmError::ResponseFormat {
            message: "SSE stream buffer exceeded 16 MiB".into(),
            raw: String::new(),
        })
    }

    /// Flushes a final frame left unterminated at end of stream.
    pub fn finish(&mut self) -> Option<SseFrame> {
        let rest = std::mem::take(&mut self.line_buf);
        let tail = rest.trim_end_matches('\r');
        let mut frame = None;
        if !tail.is_empty() {
            frame = self.feed_line(tail);
        }
        frame.or_else(|| self.dispatch())
    }

    fn decode_utf8(&mut self) {
        loop {
            match std::str::from_utf8(&self.utf8_buf) {
                Ok(text) => {
                    self.line_buf.push_str(text);
                    self.utf8_buf.clear();
                    return;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    let (valid, _) = self.utf8_buf.split_at(valid_up_to);
                    // Validated above.
                    self.line_buf
                        .push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match e.error_len() {
                        // Permanently invalid bytes are skipped.
                        Some(len) => {
                            self.utf8_buf.drain(..valid_up_to + len);
                        }
                        // Incomplete code point: keep the tail for the next chunk.
                        None => {
                            self.utf8_buf.drain(..valid_up_to);
                            return;
                        }
                    }
                }
            }
        }
    }

    fn feed_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        if line.starts_with('{') {
            self.push_data(line);
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_owned()),
            "data" => self.push_data(value),
            _ => {}
        }
        None
    }

    fn push_data(&mut self, value: &str) {
        self.data_len += value.len();
        self.data.push(value.to_owned());
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        self.data_len = 0;
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseFrame { event, data })
    }
}
