use crate::intake::frame::scanner::marker::find_marker;
use bytes::{Bytes, BytesMut};

pub const JPEG_START: [u8; 2] = [0xFF, 0xD8];
pub const JPEG_END: [u8; 2] = [0xFF, 0xD9];

/// Cuts whole JPEG images out of an MJPEG byte stream that arrives in
/// arbitrary chunks.
pub struct JpegScanner {
    buffer: BytesMut,
    max_buffer_bytes: usize,
}

impl JpegScanner {
    pub fn new(max_buffer_bytes: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            max_buffer_bytes,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Extracts the first complete `FFD8 .. FFD9` span. Everything up to and
    /// including the end marker leaves the buffer; bytes before the start
    /// marker are discarded as debris. Returns `None` and leaves the buffer
    /// untouched while the end marker has not arrived yet.
    pub fn next_frame(&mut self) -> Option<Bytes> {
        let Some(start) = find_marker(&self.buffer, &JPEG_START, 0) else {
            self.discard_debris();
            return None;
        };
        let end = find_marker(&self.buffer, &JPEG_END, start + JPEG_START.len())?;
        let mut consumed = self.buffer.split_to(end + JPEG_END.len());
        Some(consumed.split_off(start).freeze())
    }

    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    // Without a start marker nothing in the buffer can become a frame. Keep a
    // trailing 0xFF since it may be the first half of a split marker.
    fn discard_debris(&mut self) {
        if self.buffer.len() <= self.max_buffer_bytes {
            return;
        }
        let keep = usize::from(self.buffer.last() == Some(&JPEG_START[0]));
        let drop = self.buffer.len() - keep;
        let _ = self.buffer.split_to(drop);
    }
}
