//! Output aggregation for a single session
//!
//! Each chunk read from stdout or stderr lands in two buffers: `pending`,
//! which a drain swaps out, and `full`, the running total kept for the
//! completed-session record. Chunks are appended in arrival order; the two
//! streams are interleaved, never grouped.

use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Buffers {
    pending: String,
    full: String,
}

/// Per-session output buffer with at-most-once drain semantics.
#[derive(Debug, Default)]
pub struct OutputAggregator {
    buffers: Mutex<Buffers>,
}

impl OutputAggregator {
    /// Create an empty aggregator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Buffers> {
        self.buffers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append a decoded chunk to both buffers.
    pub fn append(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        let mut buffers = self.lock();
        buffers.pending.push_str(text);
        buffers.full.push_str(text);
    }

    /// Take everything appended since the previous drain.
    #[must_use]
    pub fn drain(&self) -> String {
        std::mem::take(&mut self.lock().pending)
    }

    /// Everything ever appended, without touching the pending buffer.
    #[must_use]
    pub fn snapshot(&self) -> String {
        self.lock().full.clone()
    }

    /// Bytes waiting for the next drain
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Total bytes appended
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.lock().full.len()
    }

    /// Consume the buffers as `(full, undrained)`.
    pub(crate) fn finish(&self) -> (String, String) {
        let mut buffers = self.lock();
        let pending = std::mem::take(&mut buffers.pending);
        (buffers.full.clone(), pending)
    }
}

/// Incremental UTF-8 decoder for one byte stream.
///
/// Holds back an incomplete trailing sequence until the next read completes
/// it, so a multi-byte character split across reads is not replaced.
#[derive(Debug, Default)]
pub(crate) struct Utf8Decoder {
    carry: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `bytes`, returning the text that is complete so far.
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.carry.extend_from_slice(bytes);
        let mut out = String::with_capacity(self.carry.len());
        let mut rest: &[u8] = &self.carry;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, tail) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &tail[bad..];
                        }
                        // incomplete sequence at the end: wait for more bytes
                        None => {
                            rest = tail;
                            break;
                        }
                    }
                }
            }
        }
        self.carry = rest.to_vec();
        out
    }

    /// Flush whatever is held back at end of stream.
    pub fn finish(&mut self) -> String {
        let rest = std::mem::take(&mut self.carry);
        String::from_utf8_lossy(&rest).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_returns_each_span_once() {
        let output = OutputAggregator::new();
        output.append("hello ");
        output.append("world");
        assert_eq!(output.drain(), "hello world");
        assert_eq!(output.drain(), "");
        output.append("!");
        assert_eq!(output.drain(), "!");
        assert_eq!(output.snapshot(), "hello world!");
    }

    #[test]
    fn test_snapshot_does_not_drain() {
        let output = OutputAggregator::new();
        output.append("abc");
        assert_eq!(output.snapshot(), "abc");
        assert_eq!(output.pending_len(), 3);
        assert_eq!(output.drain(), "abc");
        assert_eq!(output.total_len(), 3);
    }

    #[test]
    fn test_finish_splits_full_and_undrained() {
        let output = OutputAggregator::new();
        output.append("one\n");
        let _ = output.drain();
        output.append("two\n");
        let (full, undrained) = output.finish();
        assert_eq!(full, "one\ntwo\n");
        assert_eq!(undrained, "two\n");
        assert_eq!(output.pending_len(), 0);
    }

    #[test]
    fn test_decoder_joins_split_characters() {
        let mut decoder = Utf8Decoder::new();
        let bytes = "héllo ✓".as_bytes();
        // split inside 'é' (2 bytes) and inside '✓' (3 bytes)
        let a = decoder.push(&bytes[..2]);
        let b = decoder.push(&bytes[2..8]);
        let c = decoder.push(&bytes[8..]);
        assert_eq!(a, "h");
        assert_eq!(format!("{a}{b}{c}"), "héllo ✓");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn test_decoder_replaces_invalid_bytes() {
        let mut decoder = Utf8Decoder::new();
        let text = decoder.push(&[b'a', 0xff, b'b']);
        assert_eq!(text, "a\u{fffd}b");
    }

    #[test]
    fn test_decoder_flushes_truncated_tail() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.push(&[b'x', 0xe2, 0x9c]), "x");
        assert_eq!(decoder.finish(), "\u{fffd}");
    }
}
