//! Decoded frames and the single-slot handoff to the subscriber.
//!
//! The fetcher's worker thread publishes into a capacity-1 latest-value slot.
//! Publishing never blocks the worker: when the consumer has not yet collected
//! the previous frame, it is replaced by the newer one. Frames therefore reach
//! the consumer in arrival order, possibly with gaps, and a stalled consumer
//! never grows memory beyond one frame.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// One decoded raster frame: RGB8, row-major, tightly packed.
///
/// Ownership passes to the subscriber on emission; the fetcher keeps no
/// reference after handoff.
#[derive(Clone, Debug)]
pub struct DecodedFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl DecodedFrame {
    pub(crate) fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

/// Capacity-1 latest-value slot between one fetcher and one subscriber.
pub struct FrameSlot {
    slot: Mutex<Option<DecodedFrame>>,
    ready: Condvar,
    published: AtomicU64,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            ready: Condvar::new(),
            published: AtomicU64::new(0),
        }
    }

    /// Place a frame in the slot, replacing any undelivered older frame.
    pub(crate) fn publish(&self, frame: DecodedFrame) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(frame);
        self.published.fetch_add(1, Ordering::Relaxed);
        drop(slot);
        self.ready.notify_one();
    }

    /// Take the latest frame if one is waiting.
    pub fn try_recv(&self) -> Option<DecodedFrame> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.take()
    }

    /// Wait up to `timeout` for a frame.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<DecodedFrame> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if let Some(frame) = slot.take() {
                return Some(frame);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard, _) = self
                .ready
                .wait_timeout(slot, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            slot = guard;
        }
    }

    /// Discard any undelivered frame. The session calls this between stopping
    /// one fetcher and starting the next, so a stale frame from the old stream
    /// can never be observed after a switch.
    pub(crate) fn clear(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }

    /// Total frames ever published into the slot, delivered or replaced.
    pub fn frames_published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl Default for FrameSlot {
    fn default() -> Self {
        Self::new()
    }
}
