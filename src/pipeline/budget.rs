use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::trace;

/// Shared counter bounding the bytes buffered across every pipeline queue
///
/// Producers [`acquire`](Self::acquire) the byte cost of an item before
/// pushing it and consumers [`release`](Self::release) it after popping, so
/// the total held by all queues never exceeds `max`. When the budget is full
/// producers block, which stalls the stages feeding them.
#[derive(Debug)]
pub struct ByteBudget {
    current: Mutex<u64>,
    freed: Condvar,
    max: u64,
}

impl ByteBudget {
    pub fn new(max: u64) -> Self {
        Self {
            current: Mutex::new(0),
            freed: Condvar::new(),
            max,
        }
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    /// Bytes currently held
    pub fn current(&self) -> u64 {
        *self.lock()
    }

    /// Reserves `n` bytes, blocking until they fit under the ceiling
    ///
    /// A request larger than the whole ceiling is granted once nothing else
    /// is held, so it cannot wait forever.
    pub fn acquire(&self, n: u64) {
        let guard = self.lock();
        let mut current = self
            .freed
            .wait_while(guard, |current| !self.fits(*current, n))
            .unwrap_or_else(PoisonError::into_inner);
        *current += n;
        trace!("Acquired {} bytes, {} of {} held", n, *current, self.max);
    }

    /// Reserves `n` bytes only if they fit right now
    pub fn try_acquire(&self, n: u64) -> bool {
        let mut current = self.lock();
        if !self.fits(*current, n) {
            return false;
        }
        *current += n;
        true
    }

    /// Like [`acquire`](Self::acquire) but gives up after `timeout`
    ///
    /// Returns `true` if the bytes were reserved.
    pub fn acquire_timeout(&self, n: u64, timeout: Duration) -> bool {
        let guard = self.lock();
        let (mut current, result) = self
            .freed
            .wait_timeout_while(guard, timeout, |current| !self.fits(*current, n))
            .unwrap_or_else(PoisonError::into_inner);
        if result.timed_out() && !self.fits(*current, n) {
            return false;
        }
        *current += n;
        true
    }

    /// Blocks like [`acquire`](Self::acquire) while `running` stays set
    ///
    /// Re-checks the flag every `poll`. Returns `false`, holding nothing, if
    /// the flag was cleared before the bytes could be reserved.
    pub fn acquire_while(&self, n: u64, running: &AtomicBool, poll: Duration) -> bool {
        loop {
            if self.acquire_timeout(n, poll) {
                return true;
            }
            if !running.load(Ordering::Acquire) {
                return false;
            }
        }
    }

    /// Returns `n` bytes to the budget and wakes blocked acquirers
    ///
    /// The counter floors at zero, so releasing more than was acquired is
    /// harmless.
    pub fn release(&self, n: u64) {
        let mut current = self.lock();
        *current = current.saturating_sub(n);
        drop(current);
        // Waiters want different amounts; waking only one could pick a
        // request that still does not fit while a smaller one would.
        self.freed.notify_all();
    }

    fn fits(&self, current: u64, n: u64) -> bool {
        current + n <= self.max || (n > self.max && current == 0)
    }

    fn lock(&self) -> MutexGuard<'_, u64> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
