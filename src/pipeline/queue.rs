use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

/// A multi-producer, multi-consumer FIFO queue shared between pipeline stages
///
/// Every handle holds both ends of the channel, so the queue stays connected
/// for as long as any stage holds a clone. Capacity is not bounded here:
/// the pipeline bounds memory through [`ByteBudget`](super::ByteBudget)
/// instead, acquiring the byte cost of each item before pushing it.
#[derive(Debug)]
pub struct BlockingQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> Clone for BlockingQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
        }
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BlockingQueue<T> {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Appends an item; never blocks
    pub fn push(&self, item: T) {
        // Cannot fail: this handle owns a receiver, so the channel is connected.
        let _ = self.tx.send(item);
    }

    /// Removes the oldest item, blocking until one is available
    pub fn pop(&self) -> T {
        loop {
            if let Ok(item) = self.rx.recv() {
                return item;
            }
        }
    }

    /// Removes the oldest item, waiting at most `timeout` for one to arrive
    ///
    /// Worker loops use this so they can observe the shutdown flag between
    /// waits.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(item) => Some(item),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Removes the oldest item if one is immediately available
    pub fn try_pop(&self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(item) => Some(item),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
