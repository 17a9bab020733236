//! Bounded, non-blocking FIFO between the driver and the worker.

use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};

/// Fixed-capacity FIFO queue.
///
/// Pushing never blocks: when the queue is full the item is handed back, so
/// callers drop stale data instead of waiting. Clones share the same queue.
#[derive(Debug)]
pub struct FrameQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
    capacity: usize,
}

impl<T> Clone for FrameQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
            capacity: self.capacity,
        }
    }
}

impl<T> FrameQueue<T> {
    pub fn new(capacity: usize) -> Self {
        // A zero-capacity crossbeam channel is a rendezvous, which would reject
        // every push made while the worker is busy.
        let capacity = capacity.max(1);
        let (tx, rx) = bounded(capacity);
        Self { tx, rx, capacity }
    }

    /// Enqueue without blocking. Returns the item back if the queue is full.
    pub fn try_push(&self, item: T) -> Result<(), T> {
        self.tx.try_send(item).map_err(|err| match err {
            TrySendError::Full(item) | TrySendError::Disconnected(item) => item,
        })
    }

    /// Dequeue without blocking.
    pub fn try_pop(&self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(item) => Some(item),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Dequeue, waiting at most `timeout` for an item.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        self.rx.recv_timeout(timeout).ok()
    }

    pub(crate) fn receiver(&self) -> &Receiver<T> {
        &self.rx
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.rx.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
