//! JPEG frame boundary extraction from an undelimited MJPEG byte stream.
//!
//! The remote server writes JPEG payloads back to back; chunk reads land at
//! arbitrary offsets, so markers routinely split across reads. The accumulator
//! persists bytes between reads and yields one payload per complete
//! start-of-image / end-of-image pair.

/// JPEG start-of-image marker.
pub(crate) const SOI: [u8; 2] = [0xFF, 0xD8];
/// JPEG end-of-image marker.
pub(crate) const EOI: [u8; 2] = [0xFF, 0xD9];

/// Bytes read from the connection that have not yet yielded a complete frame.
///
/// Owned exclusively by the fetcher's worker thread; reset when the fetcher
/// restarts.
pub struct FrameAccumulator {
    buf: Vec<u8>,
    max_frame_bytes: usize,
}

impl FrameAccumulator {
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            buf: Vec::with_capacity(64 * 1024),
            max_frame_bytes: max_frame_bytes.max(EOI.len()),
        }
    }

    /// Append freshly read bytes.
    ///
    /// A frame that never terminates must not grow the buffer without bound:
    /// past twice the frame cap with no end marker, the oldest bytes are shed.
    /// The retained tail is long enough that a marker split across the cut
    /// still matches.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
        if self.buf.len() > self.max_frame_bytes * 2 {
            let drain = self.buf.len() - self.max_frame_bytes;
            log::warn!(
                "accumulator reached {} bytes without an end marker, dropping {} leading bytes",
                self.buf.len(),
                drain
            );
            self.buf.drain(..drain);
        }
    }

    /// Extract the next complete JPEG payload, start marker through end marker
    /// inclusive.
    ///
    /// Bytes before the start marker are discarded, so malformed leading bytes
    /// never block progress. Returns `None` while no complete frame is
    /// buffered; a start marker with no end marker yet just waits for more
    /// bytes. Call in a loop to drain every frame already present.
    pub fn next_payload(&mut self) -> Option<Vec<u8>> {
        let (start, end) = find_jpeg_bounds(&self.buf)?;
        let payload = self.buf[start..end].to_vec();
        self.buf.drain(..end);
        Some(payload)
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Locate the first start marker and the first end marker after it.
/// Returns `(start, end)` with `end` one past the end marker.
fn find_jpeg_bounds(buf: &[u8]) -> Option<(usize, usize)> {
    let start = find_marker(buf, 0, SOI)?;
    let end = find_marker(buf, start + SOI.len(), EOI)?;
    Some((start, end + EOI.len()))
}

fn find_marker(buf: &[u8], from: usize, marker: [u8; 2]) -> Option<usize> {
    let mut i = from;
    while i + 1 < buf.len() {
        if buf[i] == marker[0] && buf[i + 1] == marker[1] {
            return Some(i);
        }
        i += 1;
    }
    None
}
