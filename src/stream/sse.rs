//! Incremental SSE frame reassembly for Gemini `alt=sse` bodies.
//!
//! Gemini emits one `data: <json>` line per event followed by a blank line.
//! Frames are matched only at the very start of the buffer, so anything that
//! is not a `data: ` frame stays buffered until end of stream and is surfaced
//! as residue.

use std::ops::Range;

use memchr::memchr2;

/// Terminal sentinel frame of every translated stream.
pub const DONE_FRAME: &str = "data: [DONE]\n\n";

const DATA_PREFIX: &str = "data: ";
const FRAME_TERMINATORS: [&[u8]; 3] = [b"\n\n", b"\r\r", b"\r\n\r\n"];

// ---------------------------------------------------------------------------
// FrameReassembler
// ---------------------------------------------------------------------------

/// Buffers text chunks and yields complete `data:` payloads in order.
#[derive(Debug, Default)]
pub struct FrameReassembler {
    buffer: String,
}

impl FrameReassembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw text and return any complete payloads.
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        let mut out = Vec::new();
        self.feed_into(chunk, &mut out);
        out
    }

    /// Feed raw text and append complete payloads into a caller-provided buffer.
    /// Empty chunks are ignored.
    pub fn feed_into(&mut self, chunk: &str, out: &mut Vec<String>) {
        if chunk.is_empty() {
            return;
        }
        self.buffer.push_str(chunk);

        let mut consumed = 0;
        while let Some((payload, frame_len)) = match_frame(&self.buffer[consumed..]) {
            let start = consumed + payload.start;
            let end = consumed + payload.end;
            out.push(self.buffer[start..end].to_owned());
            consumed += frame_len;
        }

        if consumed == self.buffer.len() {
            self.buffer.clear();
        } else if consumed > 0 {
            self.buffer.drain(..consumed);
        }
    }

    /// Take whatever is left at end of stream. `None` when the stream ended
    /// on a frame boundary.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        }
    }

    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

/// Match one frame at the start of `buffer`: `data: `, a payload without
/// CR/LF, then one of the accepted terminators. Returns the payload range and
/// the total frame length.
#[inline]
fn match_frame(buffer: &str) -> Option<(Range<usize>, usize)> {
    let rest = buffer.strip_prefix(DATA_PREFIX)?.as_bytes();
    let eol = memchr2(b'\n', b'\r', rest)?;
    let tail = &rest[eol..];
    let terminator = FRAME_TERMINATORS.iter().find(|t| tail.starts_with(t))?;
    let start = DATA_PREFIX.len();
    Some((start..start + eol, start + eol + terminator.len()))
}

// ---------------------------------------------------------------------------
// Utf8ChunkDecoder
// ---------------------------------------------------------------------------

/// Decodes a byte stream to text, carrying an incomplete multi-byte sequence
/// over to the next chunk. Invalid sequences become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode_into(&mut self, bytes: &[u8], out: &mut String) {
        let joined;
        let mut input: &[u8] = if self.pending.is_empty() {
            bytes
        } else {
            self.pending.extend_from_slice(bytes);
            joined = std::mem::take(&mut self.pending);
            &joined
        };

        loop {
            match std::str::from_utf8(input) {
                Ok(text) => {
                    out.push_str(text);
                    return;
                }
                Err(err) => {
                    let (valid, rest) = input.split_at(err.valid_up_to());
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            input = &rest[len..];
                        }
                        None => {
                            self.pending.extend_from_slice(rest);
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Flush a dangling partial sequence as U+FFFD.
    pub fn finish(&mut self) -> Option<char> {
        if self.pending.is_empty() {
            None
        } else {
            self.pending.clear();
            Some(char::REPLACEMENT_CHARACTER)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
