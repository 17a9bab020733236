//! Raw frames and the recent-frame ring buffer.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One captured image.
///
/// Pixel data is reference counted, so cloning a frame is cheap.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Capture sequence number
    pub index: u64,
    pub width: u32,
    pub height: u32,
    /// Raw pixel bytes (format depends on the capture source)
    pub data: Arc<[u8]>,
}

impl Frame {
    pub fn new(index: u64, width: u32, height: u32, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            index,
            width,
            height,
            data: data.into(),
        }
    }
}

/// Bounded buffer of the most recent frames, oldest evicted first.
///
/// Safe to share between threads; every operation takes the internal lock for
/// its own duration only.
#[derive(Debug)]
pub struct FrameBuffer {
    capacity: usize,
    frames: Mutex<VecDeque<Frame>>,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new(3)
    }
}

impl FrameBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            frames: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    // A panic while holding the lock cannot leave the deque half-updated.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Frame>> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a frame, evicting the oldest one if the buffer is full.
    pub fn push(&self, frame: Frame) {
        let mut frames = self.lock();
        if frames.len() >= self.capacity {
            frames.pop_front();
        }
        frames.push_back(frame);
    }

    /// Most recent frame, if any.
    pub fn latest(&self) -> Option<Frame> {
        self.lock().back().cloned()
    }

    /// Snapshot of the buffered frames, oldest first.
    pub fn frames(&self) -> Vec<Frame> {
        self.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
