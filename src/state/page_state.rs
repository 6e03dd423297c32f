use crate::url::UrlRef;
use std::collections::{HashMap, HashSet};

/// Where a canonical URL currently sits in the crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Progress {
    /// Discovered and waiting for its host's robots policy
    Pending,
    /// Admitted and queued for fetching
    ToVisit,
    /// Fetched (or at least handed back by a fetch worker)
    Visited,
}

/// What the frontier decided for one pending URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingDecision {
    /// Robots policy not resolved yet; look again on the next scan
    Keep,
    /// Allowed; move to `to_visit`
    Admit,
    /// Disallowed or host unusable; forget it
    Discard,
}

/// Counts from one pass over the pending set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    pub admitted: usize,
    pub discarded: usize,
    pub kept: usize,
}

/// The frontier's three deduplication sets
///
/// Every transition removes a URL from its previous set before inserting it
/// into the next, so a canonical URL is in at most one set at any time.
/// Owned by the frontier thread alone.
#[derive(Debug, Default)]
pub struct ProgressSets {
    visited: HashSet<String>,
    to_visit: HashSet<String>,
    pending: HashMap<String, UrlRef>,
}

impl ProgressSets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn progress(&self, key: &str) -> Option<Progress> {
        if self.visited.contains(key) {
            Some(Progress::Visited)
        } else if self.to_visit.contains(key) {
            Some(Progress::ToVisit)
        } else if self.pending.contains_key(key) {
            Some(Progress::Pending)
        } else {
            None
        }
    }

    /// Records a newly discovered URL as pending
    ///
    /// # Returns
    ///
    /// `false` if the URL is already known in any set
    pub fn discover(&mut self, key: String, url: UrlRef) -> bool {
        if self.progress(&key).is_some() {
            return false;
        }
        self.pending.insert(key, url);
        true
    }

    /// Marks a URL as fetched, whatever set it was in before
    ///
    /// A URL that was still pending here (for example a redirect target that
    /// was discovered independently) is returned so its byte cost can be
    /// released.
    pub fn mark_visited(&mut self, key: &str) -> Option<UrlRef> {
        self.to_visit.remove(key);
        let was_pending = self.pending.remove(key);
        self.visited.insert(key.to_string());
        was_pending
    }

    /// URLs still waiting for a robots decision
    pub fn pending_urls(&self) -> impl Iterator<Item = &UrlRef> {
        self.pending.values()
    }

    /// Runs `decide` over every pending URL and applies the decisions
    pub fn scan_pending<F>(&mut self, mut decide: F) -> ScanOutcome
    where
        F: FnMut(&str, &UrlRef) -> PendingDecision,
    {
        let mut outcome = ScanOutcome::default();
        let to_visit = &mut self.to_visit;

        self.pending.retain(|key, url| match decide(key.as_str(), &*url) {
            PendingDecision::Keep => {
                outcome.kept += 1;
                true
            }
            PendingDecision::Admit => {
                to_visit.insert(key.clone());
                outcome.admitted += 1;
                false
            }
            PendingDecision::Discard => {
                outcome.discarded += 1;
                false
            }
        });

        outcome
    }

    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }

    pub fn to_visit_len(&self) -> usize {
        self.to_visit.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// True if no URL is in more than one set
    pub fn is_disjoint(&self) -> bool {
        self.visited.is_disjoint(&self.to_visit)
            && self.pending.keys().all(|k| {
                !self.visited.contains(k) && !self.to_visit.contains(k)
            })
    }
}
