//! robots.txt directive parser
//!
//! Rules are resolved against the host root and kept in two lists. Only the
//! blocks addressed to this crawler (or to `*` when no block names it) are
//! retained.

use crate::url::UrlRef;
use tracing::trace;

/// Crawl delay assumed when robots.txt does not ask for a longer one
pub const DEFAULT_CRAWL_DELAY: u32 = 4;

/// The directives of one robots.txt file that apply to this crawler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotsRules {
    pub allow: Vec<UrlRef>,
    pub disallow: Vec<UrlRef>,
    /// Seconds; only ever raised above [`DEFAULT_CRAWL_DELAY`]
    pub crawl_delay: u32,
}

impl Default for RobotsRules {
    fn default() -> Self {
        Self {
            allow: Vec::new(),
            disallow: Vec::new(),
            crawl_delay: DEFAULT_CRAWL_DELAY,
        }
    }
}

impl RobotsRules {
    /// Parses robots.txt content for the given user-agent token
    ///
    /// # Arguments
    ///
    /// * `content` - The raw robots.txt body
    /// * `agent` - The crawler's short name, matched case-insensitively
    ///   against `User-agent:` values
    /// * `root` - The host root that rule paths are resolved against
    ///
    /// # Returns
    ///
    /// The applicable rules. A group naming `agent` discards whatever was
    /// collected from `*` groups, and `*` groups are ignored once a specific
    /// group has been seen.
    pub fn parse(content: &str, agent: &str, root: &UrlRef) -> Self {
        let mut rules = Self::default();
        let mut group_applies = false;
        let mut reading_agents = false;
        let mut seen_specific = false;

        for line in content.lines() {
            let line = match line.find('#') {
                Some(hash) => &line[..hash],
                None => line,
            };
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            if key == "user-agent" {
                if !reading_agents {
                    group_applies = false;
                    reading_agents = true;
                }
                if value.eq_ignore_ascii_case(agent) {
                    if !seen_specific {
                        rules.allow.clear();
                        rules.disallow.clear();
                        seen_specific = true;
                    }
                    group_applies = true;
                } else if value == "*" && !seen_specific {
                    group_applies = true;
                }
                continue;
            }

            reading_agents = false;
            if !group_applies {
                continue;
            }

            match key.as_str() {
                "allow" => push_rule(&mut rules.allow, value, root),
                "disallow" => push_rule(&mut rules.disallow, value, root),
                "crawl-delay" => {
                    let delay = leading_integer(value);
                    rules.crawl_delay = rules.crawl_delay.max(delay);
                }
                _ => trace!("Ignoring robots directive {:?}", key),
            }
        }

        rules
    }

    pub fn is_empty(&self) -> bool {
        self.allow.is_empty() && self.disallow.is_empty()
    }
}

fn push_rule(list: &mut Vec<UrlRef>, value: &str, root: &UrlRef) {
    // `Disallow:` with no value allows everything
    if value.is_empty() {
        return;
    }
    let rule = UrlRef::parse(value).merge(root);
    if rule.is_good() {
        list.push(rule);
    } else {
        trace!("Skipping malformed robots rule {:?}", value);
    }
}

/// Parses the leading decimal digits of `value`, `0` if there are none
fn leading_integer(value: &str) -> u32 {
    let digits: String = value.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}
