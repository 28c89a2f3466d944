use crate::intake::frame::scanner::marker::find_marker;
use bytes::{Bytes, BytesMut};
use tracing::warn;

pub const DEFAULT_MAX_BUFFER_BYTES: usize = 4 * 1024 * 1024;

/// Extracts payloads wrapped in application-level start/end markers, e.g.
/// `<IMG>...jpeg bytes...</IMG>`.
///
/// The buffer never holds much more than `max_buffer_bytes`: markerless
/// noise is dropped, and so is an open payload that outgrows the cap.
pub struct EnvelopeScanner {
    start_marker: Vec<u8>,
    end_marker: Vec<u8>,
    buffer: BytesMut,
    max_buffer_bytes: usize,
}

impl EnvelopeScanner {
    pub fn new(start_marker: impl Into<Vec<u8>>, end_marker: impl Into<Vec<u8>>) -> Self {
        Self {
            start_marker: start_marker.into(),
            end_marker: end_marker.into(),
            buffer: BytesMut::new(),
            max_buffer_bytes: DEFAULT_MAX_BUFFER_BYTES,
        }
    }

    pub fn with_max_buffer_bytes(mut self, max_buffer_bytes: usize) -> Self {
        self.max_buffer_bytes = max_buffer_bytes;
        self
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Payload strictly between the first start marker and the end marker
    /// that follows it. The buffer advances past the consumed end marker.
    pub fn next_payload(&mut self) -> Option<Bytes> {
        let Some(start) = find_marker(&self.buffer, &self.start_marker, 0) else {
            self.discard_noise();
            return None;
        };
        let payload_start = start + self.start_marker.len();
        let Some(end) = find_marker(&self.buffer, &self.end_marker, payload_start) else {
            self.discard_oversized(payload_start);
            return None;
        };

        let mut consumed = self.buffer.split_to(end + self.end_marker.len());
        consumed.truncate(end);
        Some(consumed.split_off(payload_start).freeze())
    }

    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    // Only the tail can still be the front of a split start marker.
    fn discard_noise(&mut self) {
        if self.buffer.len() <= self.max_buffer_bytes {
            return;
        }
        let keep = self.start_marker.len().saturating_sub(1).min(self.buffer.len());
        let _ = self.buffer.split_to(self.buffer.len() - keep);
    }

    // An unterminated payload past the cap is abandoned; scanning resumes
    // after its start marker so a later envelope can still be found.
    fn discard_oversized(&mut self, payload_start: usize) {
        if self.buffer.len() <= self.max_buffer_bytes {
            return;
        }
        warn!(
            "Dropping unterminated payload after {} buffered bytes",
            self.buffer.len()
        );
        let _ = self.buffer.split_to(payload_start);
    }
}
