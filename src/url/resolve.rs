//! Reconstruction, reference resolution and rule comparison for [`UrlRef`]

use super::matcher::{match_glob, PatternMatch};
use super::{Components, RefKind, UrlRef};

impl UrlRef {
    /// Reassembles the selected components into a normalised string
    ///
    /// This is the single canonical form used for deduplication and rule
    /// comparison: the same `UrlRef` state always yields the same string.
    ///
    /// # Examples
    ///
    /// ```
    /// use tidemark::url::{Components, UrlRef};
    ///
    /// let url = UrlRef::parse("HTTP://Example.com/a/./b?q=1#frag");
    /// assert_eq!(url.compose(Components::ALL), "http://example.com/a/b?q=1#frag");
    /// assert_eq!(url.compose(Components::PATH), "/a/b");
    /// ```
    pub fn compose(&self, parts: Components) -> String {
        let mut out = String::new();

        if parts.scheme && !self.scheme.is_empty() {
            out.push_str(&self.scheme);
            out.push(':');
        }
        if parts.authority && !self.authority.is_empty() {
            out.push_str("//");
            out.push_str(&self.authority);
        }
        if parts.path {
            self.write_path(&mut out);
        }
        if parts.query && self.has_query {
            out.push('?');
            for (i, arg) in self.query_args.iter().enumerate() {
                if i > 0 {
                    out.push(self.query_delims.get(i - 1).copied().unwrap_or('&'));
                }
                out.push_str(arg);
            }
        }
        if parts.fragment && !self.fragment.is_empty() {
            out.push('#');
            out.push_str(&self.fragment);
        }

        out
    }

    fn write_path(&self, out: &mut String) {
        match self.kind {
            RefKind::Opaque => out.push_str(&self.segments.join("/")),
            RefKind::PathRelative => {
                out.push_str(&self.segments.join("/"));
                if self.is_dir && !self.segments.is_empty() {
                    out.push('/');
                }
            }
            _ => {
                for seg in &self.segments {
                    out.push('/');
                    out.push_str(seg);
                }
                if self.is_dir || self.segments.is_empty() {
                    out.push('/');
                }
            }
        }
    }

    /// Resolves this reference against `base`
    ///
    /// Only the components this reference lacks are taken from `base`, in the
    /// order scheme, authority, path. When exactly one side has a relative
    /// path the two paths are joined: a relative `self` is appended to the
    /// directory of `base`, and a relative `base` is appended to the
    /// directory of `self` (taking its query and fragment along).
    ///
    /// Merging is a no-op when either side is malformed or opaque, or when
    /// both are already complete.
    ///
    /// # Examples
    ///
    /// ```
    /// use tidemark::url::UrlRef;
    ///
    /// let page = UrlRef::parse("http://h/a/b.html");
    /// assert_eq!(UrlRef::parse("d").merge(&page).to_string(), "http://h/a/d");
    ///
    /// let dir = UrlRef::parse("http://h/a/b/");
    /// assert_eq!(UrlRef::parse("d").merge(&dir).to_string(), "http://h/a/b/d");
    /// ```
    pub fn merge(mut self, base: &UrlRef) -> UrlRef {
        if !self.good || !base.good {
            return self;
        }
        if self.kind == RefKind::Opaque || base.kind == RefKind::Opaque {
            return self;
        }
        if self.is_complete() && base.is_complete() {
            return self;
        }

        let mut rel_scheme = self.rel_scheme();
        let mut rel_auth = self.rel_auth();
        let mut rel_path = self.rel_path();

        if rel_scheme && !base.rel_scheme() {
            self.scheme = base.scheme.clone();
            rel_scheme = false;
        }

        if rel_auth && !base.rel_auth() {
            self.authority = base.authority.clone();
            self.user = base.user.clone();
            self.pass = base.pass.clone();
            self.host = base.host.clone();
            self.port = base.port.clone();
            rel_auth = false;
        }

        if rel_path && !base.rel_path() {
            if self.has_no_path() {
                // `?query` or `#fragment` alone: the base path stays whole
                self.segments = base.segments.clone();
                self.is_dir = base.is_dir;
                if !self.has_query {
                    self.has_query = base.has_query;
                    self.query = base.query.clone();
                    self.query_args = base.query_args.clone();
                    self.query_delims = base.query_delims.clone();
                }
            } else {
                let keep = if base.is_dir {
                    base.segments.len()
                } else {
                    base.segments.len().saturating_sub(1)
                };
                let mut segments = base.segments[..keep].to_vec();
                segments.append(&mut self.segments);
                self.segments = segments;
            }
            self.is_pattern |= base.is_pattern;
            rel_path = false;
        } else if !rel_path && base.rel_path() {
            if !base.has_no_path() {
                if !self.is_dir {
                    self.segments.pop();
                }
                self.segments.extend(base.segments.iter().cloned());
                self.is_dir = base.is_dir;
            }
            self.has_query = base.has_query;
            self.query = base.query.clone();
            self.query_args = base.query_args.clone();
            self.query_delims = base.query_delims.clone();
            self.fragment = base.fragment.clone();
            self.is_pattern |= base.is_pattern;
        }

        if !rel_path {
            self.remove_dot_segments();
        }

        self.kind = RefKind::from_flags(rel_scheme, rel_auth, rel_path);
        self.path = self.compose(Components::PATH);
        self
    }

    /// A relative reference carrying only a query and/or fragment
    fn has_no_path(&self) -> bool {
        self.kind == RefKind::PathRelative && self.segments.is_empty() && !self.is_dir
    }

    fn remove_dot_segments(&mut self) {
        let mut cleaned: Vec<String> = Vec::with_capacity(self.segments.len());
        let mut ends_with_dots = false;

        for seg in self.segments.drain(..) {
            ends_with_dots = false;
            match seg.as_str() {
                "" => {}
                "." => ends_with_dots = true,
                ".." => {
                    cleaned.pop();
                    ends_with_dots = true;
                }
                _ => cleaned.push(seg),
            }
        }

        self.segments = cleaned;
        if ends_with_dots {
            self.is_dir = true;
        }
    }

    /// Walks this reference against a rule in lockstep
    ///
    /// Both sides are compared in canonical form without fragments. Scheme
    /// and authority are only compared when both sides carry them.
    pub fn matches(&self, rule: &UrlRef) -> PatternMatch {
        let parts = self.comparable_parts(rule);
        let subject = self.compose(parts);
        let pattern = rule.compose(parts);
        match_glob(subject.as_bytes(), pattern.as_bytes())
    }

    fn comparable_parts(&self, rule: &UrlRef) -> Components {
        let both_auths = !self.rel_auth() && !rule.rel_auth();
        Components {
            scheme: both_auths && !self.rel_scheme() && !rule.rel_scheme(),
            authority: both_auths,
            path: true,
            query: true,
            fragment: false,
        }
    }

    /// True if this URL falls under `rule`
    ///
    /// Holds when a trailing wildcard is reached, when both strings are equal,
    /// or when the rule is exhausted at a `/` or `?` boundary of this URL so
    /// that this URL is a sub-path of the rule.
    ///
    /// # Examples
    ///
    /// ```
    /// use tidemark::url::UrlRef;
    ///
    /// let rule = UrlRef::parse("/private/*");
    /// assert!(UrlRef::parse("/private/x").is_prefix_of_or_matches(&rule));
    /// assert!(!UrlRef::parse("/public/x").is_prefix_of_or_matches(&rule));
    /// ```
    pub fn is_prefix_of_or_matches(&self, rule: &UrlRef) -> bool {
        match self.matches(rule) {
            PatternMatch::Wildcard => true,
            PatternMatch::NoMatch => false,
            PatternMatch::Prefix { subject_pos, .. } => {
                let subject = self.compose(self.comparable_parts(rule));
                let subject = subject.as_bytes();
                let boundary = |b: u8| b == b'/' || b == b'?';

                subject_pos == subject.len()
                    || (subject_pos > 0 && boundary(subject[subject_pos - 1]))
                    || boundary(subject[subject_pos])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(reference: &str, base: &str) -> String {
        UrlRef::parse(reference)
            .merge(&UrlRef::parse(base))
            .to_string()
    }

    #[test]
    fn test_canonical_form_is_idempotent() {
        let inputs = [
            "http://example.com/",
            "http://Example.com//a/./b/../c?x=1;y=2#frag",
            "https://u:p@h:8443/a%20b/caf\u{e9}/",
            "http://h/a b?q=a b",
            "http://h",
            "http://h/search?",
        ];
        for input in inputs {
            let once = UrlRef::parse(input).to_string();
            let twice = UrlRef::parse(&once).to_string();
            assert_eq!(once, twice, "not idempotent for {}", input);
        }
    }

    #[test]
    fn test_dot_segment_removal() {
        assert_eq!(
            UrlRef::parse("http://h/a/b/../c").to_string(),
            "http://h/a/c"
        );
    }

    #[test]
    fn test_relative_resolution() {
        assert_eq!(resolve("../d", "http://h/a/b/c"), "http://h/a/d");
    }

    #[test]
    fn test_directory_vs_file_base() {
        assert_eq!(resolve("d", "http://h/a/b.html"), "http://h/a/d");
        assert_eq!(resolve("d", "http://h/a/b/"), "http://h/a/b/d");
    }

    #[test]
    fn test_rfc_style_examples() {
        let base = "http://a/b/c/d;p?q";
        assert_eq!(resolve("g", base), "http://a/b/c/g");
        assert_eq!(resolve("./g", base), "http://a/b/c/g");
        assert_eq!(resolve("g/", base), "http://a/b/c/g/");
        assert_eq!(resolve("/g", base), "http://a/g");
        assert_eq!(resolve("//g", base), "http://g/");
        assert_eq!(resolve("g?y", base), "http://a/b/c/g?y");
        assert_eq!(resolve("#s", base), "http://a/b/c/d%3Bp?q#s");
        assert_eq!(resolve(".", base), "http://a/b/c/");
        assert_eq!(resolve("..", base), "http://a/b/");
        assert_eq!(resolve("../g", base), "http://a/b/g");
        assert_eq!(resolve("../..", base), "http://a/");
        assert_eq!(resolve("../../g", base), "http://a/g");
    }

    #[test]
    fn test_query_only_keeps_base_path() {
        assert_eq!(resolve("?page=2", "http://h/list/all"), "http://h/list/all?page=2");
    }

    #[test]
    fn test_compose_keeps_query_separators() {
        let url = UrlRef::parse("http://h/p?a=1;b=2&c=3");
        assert_eq!(url.canonical(), "http://h/p?a=1;b=2&c=3");
        assert_eq!(resolve("?x=1;y=2", "http://h/list"), "http://h/list?x=1;y=2");
        assert_eq!(UrlRef::parse("?a;&&b").compose(Components::ALL), "?a;b");
    }

    #[test]
    fn test_cannot_escape_root() {
        assert_eq!(resolve("../../escape", "http://example.com/"), "http://example.com/escape");
    }

    #[test]
    fn test_scheme_relative_takes_scheme() {
        assert_eq!(resolve("//cdn.h/x.js", "https://h/a"), "https://cdn.h/x.js");
    }

    #[test]
    fn test_complete_references_do_not_merge() {
        assert_eq!(resolve("http://other/x", "http://h/a/"), "http://other/x");
    }

    #[test]
    fn test_opaque_references_do_not_merge() {
        assert_eq!(resolve("mailto:a@b.c", "http://h/a/"), "mailto:a@b.c");
        let merged = UrlRef::parse("x").merge(&UrlRef::parse("mailto:a@b.c"));
        assert_eq!(merged.kind(), RefKind::PathRelative);
    }

    #[test]
    fn test_malformed_references_do_not_merge() {
        let merged = UrlRef::parse("http:/bad").merge(&UrlRef::parse("http://h/"));
        assert!(!merged.is_good());
    }

    #[test]
    fn test_base_supplies_relative_suffix() {
        let merged = UrlRef::parse("http://h/a/b").merge(&UrlRef::parse("c/d?x"));
        assert_eq!(merged.to_string(), "http://h/a/c/d?x");
    }

    #[test]
    fn test_merge_recomputes_path_and_kind() {
        let merged = UrlRef::parse("x/../y").merge(&UrlRef::parse("http://h/a/"));
        assert!(merged.is_complete());
        assert_eq!(merged.path(), "/a/y");
    }

    #[test]
    fn test_merge_against_relative_base_stays_relative() {
        let merged = UrlRef::parse("d").merge(&UrlRef::parse("/a/b"));
        assert_eq!(merged.kind(), RefKind::AuthorityRelative);
        assert_eq!(merged.to_string(), "/a/d");
    }

    #[test]
    fn test_wildcard_containment() {
        let rule = UrlRef::parse("/private/*");
        assert!(UrlRef::parse("/private/x").is_prefix_of_or_matches(&rule));
        assert!(UrlRef::parse("/private/").is_prefix_of_or_matches(&rule));
        assert!(!UrlRef::parse("/public/x").is_prefix_of_or_matches(&rule));
    }

    #[test]
    fn test_directory_prefix_containment() {
        let root = UrlRef::parse("http://h/");
        let rule = UrlRef::parse("/a/b").merge(&root);
        assert!(UrlRef::parse("http://h/a/b").is_prefix_of_or_matches(&rule));
        assert!(UrlRef::parse("http://h/a/b/c").is_prefix_of_or_matches(&rule));
        assert!(UrlRef::parse("http://h/a/b?x=1").is_prefix_of_or_matches(&rule));
        assert!(!UrlRef::parse("http://h/a/bc").is_prefix_of_or_matches(&rule));
        assert!(!UrlRef::parse("http://h/a").is_prefix_of_or_matches(&rule));
    }

    #[test]
    fn test_rule_for_other_host_does_not_match() {
        let rule = UrlRef::parse("http://h/a");
        assert!(!UrlRef::parse("http://other/a").is_prefix_of_or_matches(&rule));
    }

    #[test]
    fn test_inner_wildcard() {
        let rule = UrlRef::parse("/*.php").merge(&UrlRef::parse("http://h/"));
        assert!(UrlRef::parse("http://h/index.php").is_prefix_of_or_matches(&rule));
        assert!(UrlRef::parse("http://h/a/b.php?x").is_prefix_of_or_matches(&rule));
        assert!(!UrlRef::parse("http://h/index.html").is_prefix_of_or_matches(&rule));
    }

    #[test]
    fn test_matches_reports_prefix_position() {
        let rule = UrlRef::parse("/a");
        match UrlRef::parse("/a/b").matches(&rule) {
            PatternMatch::Prefix { subject_pos, pattern_pos } => {
                assert_eq!(subject_pos, 2);
                assert_eq!(pattern_pos, 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
