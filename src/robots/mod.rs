//! Robots.txt handling module
//!
//! One [`RobotsPolicy`] exists per host. It is created the first time a URL
//! on that host is seen, fetches and parses `robots.txt` on its own thread,
//! and publishes the outcome through an atomic status that the frontier
//! polls. Policies are kept in a bounded [`RobotsCache`].

mod cache;
mod parser;

pub use cache::RobotsCache;
pub use parser::{RobotsRules, DEFAULT_CRAWL_DELAY};

use crate::crawler::Fetch;
use crate::url::{host_key, host_root, UrlRef};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Lifecycle of a host's robots policy
///
/// `Pending` moves exactly once to one of the three terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RobotsStatus {
    /// robots.txt has not been fetched yet
    Pending = 0,
    /// robots.txt was fetched and its rules apply
    Rules = 1,
    /// robots.txt is absent or blank; everything is allowed
    Empty = 2,
    /// robots.txt could not be fetched; nothing is allowed
    Bad = 3,
}

impl RobotsStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Rules,
            2 => Self::Empty,
            3 => Self::Bad,
            _ => Self::Pending,
        }
    }

    /// True once the policy can answer [`RobotsPolicy::is_allowed`]
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// The robots.txt policy of one host
#[derive(Debug)]
pub struct RobotsPolicy {
    host: String,
    user_agent: String,
    user_agent_full: String,
    root: UrlRef,
    status: AtomicU8,
    rules: OnceLock<RobotsRules>,
}

impl RobotsPolicy {
    /// Creates a pending policy for the host of `url`
    ///
    /// # Arguments
    ///
    /// * `url` - Any complete URL on the host
    /// * `user_agent` - The token matched against `User-agent:` lines
    /// * `user_agent_full` - The header value sent when fetching robots.txt
    ///
    /// # Returns
    ///
    /// `None` if `url` has no scheme or authority to derive a host from
    pub fn for_url(url: &UrlRef, user_agent: &str, user_agent_full: &str) -> Option<Self> {
        let host = host_key(url)?;
        let root = host_root(url)?;
        Some(Self {
            host,
            user_agent: user_agent.to_string(),
            user_agent_full: user_agent_full.to_string(),
            root,
            status: AtomicU8::new(RobotsStatus::Pending as u8),
            rules: OnceLock::new(),
        })
    }

    /// The host key (`scheme://authority`) this policy covers
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn status(&self) -> RobotsStatus {
        RobotsStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn robots_url(&self) -> String {
        format!("{}robots.txt", self.root)
    }

    /// The parsed rules, available once the status is `Rules`
    pub fn rules(&self) -> Option<&RobotsRules> {
        self.rules.get()
    }

    /// Seconds to wait between requests to this host
    pub fn crawl_delay(&self) -> u32 {
        self.rules
            .get()
            .map(|r| r.crawl_delay)
            .unwrap_or(DEFAULT_CRAWL_DELAY)
    }

    /// Fetches and parses robots.txt, then publishes the terminal status
    ///
    /// 2xx gives `Rules` (or `Empty` for a blank body), 4xx gives `Empty`,
    /// and anything else, including a network failure, gives `Bad`. Calling
    /// this on an already resolved policy does nothing.
    pub fn initialize(&self, fetcher: &dyn Fetch, timeout: Duration) {
        if self.status().is_resolved() {
            return;
        }

        let robots_url = self.robots_url();
        let status = match fetcher.fetch(&robots_url, timeout, &self.user_agent_full) {
            Ok(response) if (200..300).contains(&response.status) => {
                let body = String::from_utf8_lossy(&response.body);
                self.apply_body(&body)
            }
            Ok(response) if (400..500).contains(&response.status) => {
                debug!("{} returned {}, allowing all", robots_url, response.status);
                RobotsStatus::Empty
            }
            Ok(response) => {
                warn!("{} returned {}", robots_url, response.status);
                RobotsStatus::Bad
            }
            Err(e) => {
                warn!("Failed to fetch {}: {}", robots_url, e);
                RobotsStatus::Bad
            }
        };

        self.publish(status);
    }

    /// Runs [`initialize`](Self::initialize) on a detached thread
    pub fn spawn_initialize(self: &Arc<Self>, fetcher: Arc<dyn Fetch>, timeout: Duration) {
        let policy = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(format!("robots {}", self.host))
            .spawn(move || policy.initialize(fetcher.as_ref(), timeout));

        if let Err(e) = spawned {
            warn!("Could not start robots fetch for {}: {}", self.host, e);
            self.publish(RobotsStatus::Bad);
        }
    }

    /// Parses a robots.txt body and stores its rules
    fn apply_body(&self, body: &str) -> RobotsStatus {
        if body.trim().is_empty() {
            return RobotsStatus::Empty;
        }
        let rules = RobotsRules::parse(body, &self.user_agent, &self.root);
        debug!(
            "{}: {} allow, {} disallow, crawl delay {}s",
            self.host,
            rules.allow.len(),
            rules.disallow.len(),
            rules.crawl_delay
        );
        let _ = self.rules.set(rules);
        RobotsStatus::Rules
    }

    fn publish(&self, status: RobotsStatus) {
        let _ = self.status.compare_exchange(
            RobotsStatus::Pending as u8,
            status as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Decides whether `url` may be fetched
    ///
    /// Allow rules are consulted before Disallow rules and the first list
    /// with a matching rule decides. A pending or failed policy allows
    /// nothing.
    pub fn is_allowed(&self, url: &UrlRef) -> bool {
        match self.status() {
            RobotsStatus::Pending | RobotsStatus::Bad => false,
            RobotsStatus::Empty => true,
            RobotsStatus::Rules => {
                let Some(rules) = self.rules.get() else {
                    return true;
                };
                if rules.allow.iter().any(|rule| url.is_prefix_of_or_matches(rule)) {
                    return true;
                }
                !rules
                    .disallow
                    .iter()
                    .any(|rule| url.is_prefix_of_or_matches(rule))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::FetchResponse;
    use crate::TidemarkError;
    use std::sync::Mutex;
    use std::time::Instant;

    /// Serves one canned robots.txt response and records requests
    struct CannedFetch {
        status: u16,
        body: &'static str,
        requests: Mutex<Vec<(String, String)>>,
    }

    impl CannedFetch {
        fn new(status: u16, body: &'static str) -> Self {
            Self {
                status,
                body,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl Fetch for CannedFetch {
        fn fetch(
            &self,
            url: &str,
            _timeout: Duration,
            user_agent: &str,
        ) -> crate::Result<FetchResponse> {
            self.requests
                .lock()
                .unwrap()
                .push((url.to_string(), user_agent.to_string()));
            if self.status == 0 {
                return Err(TidemarkError::Thread("connection refused".to_string()));
            }
            Ok(FetchResponse {
                status: self.status,
                effective_url: url.to_string(),
                body: self.body.as_bytes().to_vec(),
            })
        }
    }

    fn policy() -> RobotsPolicy {
        RobotsPolicy::for_url(
            &UrlRef::parse("http://example.com/some/page"),
            "tidemark",
            "tidemark/1.0 (+http://example.org/bot)",
        )
        .unwrap()
    }

    fn initialized(status: u16, body: &'static str) -> RobotsPolicy {
        let policy = policy();
        policy.initialize(&CannedFetch::new(status, body), Duration::from_secs(1));
        policy
    }

    fn allowed(policy: &RobotsPolicy, url: &str) -> bool {
        policy.is_allowed(&UrlRef::parse(url))
    }

    #[test]
    fn test_new_policy_is_pending() {
        let policy = policy();
        assert_eq!(policy.host(), "http://example.com");
        assert_eq!(policy.status(), RobotsStatus::Pending);
        assert_eq!(policy.robots_url(), "http://example.com/robots.txt");
        assert!(!allowed(&policy, "http://example.com/"));
    }

    #[test]
    fn test_for_url_requires_host() {
        assert!(RobotsPolicy::for_url(&UrlRef::parse("/relative"), "a", "a").is_none());
    }

    #[test]
    fn test_fetch_uses_full_user_agent() {
        let fetcher = CannedFetch::new(404, "");
        let policy = policy();
        policy.initialize(&fetcher, Duration::from_secs(1));

        let requests = fetcher.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, "http://example.com/robots.txt");
        assert_eq!(requests[0].1, "tidemark/1.0 (+http://example.org/bot)");
    }

    #[test]
    fn test_success_with_rules() {
        let policy = initialized(200, "User-agent: *\nDisallow: /private/\n");
        assert_eq!(policy.status(), RobotsStatus::Rules);
        assert!(allowed(&policy, "http://example.com/public/y"));
        assert!(!allowed(&policy, "http://example.com/private/x"));
        assert!(!allowed(&policy, "http://example.com/private/"));
    }

    #[test]
    fn test_blank_body_is_empty() {
        let policy = initialized(200, "  \n");
        assert_eq!(policy.status(), RobotsStatus::Empty);
        assert!(allowed(&policy, "http://example.com/anything"));
    }

    #[test]
    fn test_client_error_allows_all() {
        let policy = initialized(404, "Not found");
        assert_eq!(policy.status(), RobotsStatus::Empty);
        assert!(allowed(&policy, "http://example.com/anything"));
    }

    #[test]
    fn test_server_error_is_bad() {
        let policy = initialized(503, "");
        assert_eq!(policy.status(), RobotsStatus::Bad);
        assert!(!allowed(&policy, "http://example.com/"));
    }

    #[test]
    fn test_network_failure_is_bad() {
        let policy = initialized(0, "");
        assert_eq!(policy.status(), RobotsStatus::Bad);
    }

    #[test]
    fn test_allow_precedes_disallow() {
        let policy = initialized(200, "User-agent: *\nDisallow: /a\nAllow: /a/b\n");
        assert!(allowed(&policy, "http://example.com/a/b/c"));
        assert!(!allowed(&policy, "http://example.com/a/x"));
        assert!(allowed(&policy, "http://example.com/other"));
    }

    #[test]
    fn test_crawl_delay_exposed() {
        let policy = initialized(200, "User-agent: *\nCrawl-delay: 30\n");
        assert_eq!(policy.crawl_delay(), 30);
        assert_eq!(self::policy().crawl_delay(), DEFAULT_CRAWL_DELAY);
    }

    #[test]
    fn test_status_transitions_once() {
        let policy = initialized(404, "");
        policy.initialize(&CannedFetch::new(503, ""), Duration::from_secs(1));
        assert_eq!(policy.status(), RobotsStatus::Empty);
    }

    #[test]
    fn test_spawn_initialize_publishes() {
        let policy = Arc::new(policy());
        let fetcher: Arc<dyn Fetch> = Arc::new(CannedFetch::new(200, "User-agent: *\nDisallow: /\n"));
        policy.spawn_initialize(fetcher, Duration::from_secs(1));

        let deadline = Instant::now() + Duration::from_secs(5);
        while !policy.status().is_resolved() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(policy.status(), RobotsStatus::Rules);
        assert!(!allowed(&policy, "http://example.com/x"));
    }
}
