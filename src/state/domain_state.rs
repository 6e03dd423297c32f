use lru::LruCache;
use std::num::NonZeroUsize;

/// Dispatch count for one host since its last reset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCount {
    /// Window sequence number at which `count` was last zeroed
    pub reset_seq: u64,
    /// URLs dispatched to this host since `reset_seq`
    pub count: u32,
}

/// Sliding-window per-host rate limiter used by the dispatcher
///
/// The window clock advances by one on every decision. Every `window` ticks,
/// hosts whose count was last reset more than `window` ticks ago start over.
/// The history only remembers the `window` most recently seen hosts.
#[derive(Debug)]
pub struct HostWindow {
    hosts: LruCache<String, HostCount>,
    window: u64,
    ceiling: u32,
    seq: u64,
}

impl HostWindow {
    /// Creates a limiter allowing `ceiling` dispatches per host per window
    pub fn new(window: usize, ceiling: u32) -> Self {
        let capacity = NonZeroUsize::new(window).unwrap_or(NonZeroUsize::MIN);
        Self {
            hosts: LruCache::new(capacity),
            window: capacity.get() as u64,
            ceiling,
            seq: 0,
        }
    }

    /// Records a dispatch attempt for `host`
    ///
    /// # Returns
    ///
    /// * `true` - The URL may be dispatched now
    /// * `false` - The host has reached its ceiling in the current window
    pub fn try_dispatch(&mut self, host: &str) -> bool {
        self.seq += 1;
        if self.seq % self.window == 0 {
            self.expire();
        }

        if let Some(entry) = self.hosts.get_mut(host) {
            if entry.count >= self.ceiling {
                return false;
            }
            entry.count += 1;
            return true;
        }

        if self.ceiling == 0 {
            return false;
        }
        self.hosts.put(
            host.to_string(),
            HostCount {
                reset_seq: self.seq,
                count: 1,
            },
        );
        true
    }

    pub fn count(&self, host: &str) -> Option<HostCount> {
        self.hosts.peek(host).copied()
    }

    /// Current value of the window clock
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn tracked_hosts(&self) -> usize {
        self.hosts.len()
    }

    fn expire(&mut self) {
        let seq = self.seq;
        let window = self.window;
        for (_, entry) in self.hosts.iter_mut() {
            if seq - entry.reset_seq > window {
                entry.reset_seq = seq;
                entry.count = 0;
            }
        }
    }
}
