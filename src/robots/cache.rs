//! Bounded cache of per-host robots policies

use crate::robots::RobotsPolicy;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;

/// Robots policies keyed by host, bounded to a fixed number of hosts
///
/// Lookups use [`LruCache::peek`] so reading a policy never refreshes it:
/// once the cache is full the oldest entry the caller does not pin is
/// evicted, and will be fetched again the next time one of its URLs is seen.
pub struct RobotsCache {
    entries: LruCache<String, Arc<RobotsPolicy>>,
}

impl RobotsCache {
    /// Creates an empty cache holding at most `capacity` hosts (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Returns the policy for a host key, if one is cached
    pub fn get(&self, host: &str) -> Option<Arc<RobotsPolicy>> {
        self.entries.peek(host).cloned()
    }

    /// Caches a policy under its host key
    ///
    /// When the cache is full, the oldest entry for which `pinned` returns
    /// `false` is evicted to make room.
    ///
    /// # Returns
    ///
    /// `false` if every cached entry is pinned; nothing is inserted then
    pub fn try_insert<F>(&mut self, policy: Arc<RobotsPolicy>, pinned: F) -> bool
    where
        F: Fn(&RobotsPolicy) -> bool,
    {
        let host = policy.host().to_string();
        if self.entries.len() >= self.capacity() && !self.entries.contains(host.as_str()) {
            let victim = self
                .entries
                .iter()
                .rev()
                .find(|(_, cached)| !pinned(cached.as_ref()))
                .map(|(victim, _)| victim.clone());
            let Some(victim) = victim else {
                return false;
            };
            self.entries.pop(victim.as_str());
            debug!("Evicted robots policy for {}", victim);
        }
        self.entries.push(host, policy);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}
