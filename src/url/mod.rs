//! URL handling module for Tidemark
//!
//! This module provides the crawler's own URL model: a parser that splits a
//! URL or URL-reference into its components while remembering which of them
//! were absent (and must be inherited from a base), the resolution operator
//! that fills those components in, and the wildcard comparison used to
//! evaluate robots.txt rules.
//!
//! # Example
//!
//! ```
//! use tidemark::url::UrlRef;
//!
//! let base = UrlRef::parse("http://example.com/a/b/c");
//! let link = UrlRef::parse("../d").merge(&base);
//! assert_eq!(link.to_string(), "http://example.com/a/d");
//! ```

mod domain;
mod encode;
mod matcher;
mod parse;
mod resolve;

use crate::{UrlError, UrlResult};
use std::fmt;

pub use domain::{host_key, host_root};
pub use encode::{percent_encode, trim_control};
pub use matcher::{match_glob, PatternMatch};

/// Which leading components of a reference are missing
///
/// The first missing component determines what the remainder must inherit:
/// a reference with no authority cannot carry its own scheme, and a relative
/// path has neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    /// `scheme://authority/path`
    Absolute,
    /// `//authority/path`
    SchemeRelative,
    /// `/path`
    AuthorityRelative,
    /// `path`, `./path`, `../path`, `?query`, `#fragment`
    PathRelative,
    /// `scheme:opaque-data` such as `mailto:` links; never resolved
    Opaque,
}

impl RefKind {
    /// Builds the kind from the three relativity flags
    pub(crate) fn from_flags(rel_scheme: bool, rel_auth: bool, rel_path: bool) -> Self {
        match (rel_scheme, rel_auth, rel_path) {
            (false, false, false) => Self::Absolute,
            (true, false, false) => Self::SchemeRelative,
            (true, true, false) => Self::AuthorityRelative,
            _ => Self::PathRelative,
        }
    }

    /// True if the scheme must be inherited from a base
    pub fn rel_scheme(&self) -> bool {
        matches!(
            self,
            Self::SchemeRelative | Self::AuthorityRelative | Self::PathRelative
        )
    }

    /// True if the authority must be inherited from a base
    pub fn rel_auth(&self) -> bool {
        matches!(self, Self::AuthorityRelative | Self::PathRelative)
    }

    /// True if the path is relative to a base directory
    pub fn rel_path(&self) -> bool {
        matches!(self, Self::PathRelative)
    }
}

/// Selects which components [`UrlRef::compose`] writes out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Components {
    pub scheme: bool,
    pub authority: bool,
    pub path: bool,
    pub query: bool,
    pub fragment: bool,
}

impl Components {
    pub const ALL: Self = Self {
        scheme: true,
        authority: true,
        path: true,
        query: true,
        fragment: true,
    };

    pub const PATH: Self = Self {
        scheme: false,
        authority: false,
        path: true,
        query: false,
        fragment: false,
    };

    pub const QUERY: Self = Self {
        scheme: false,
        authority: false,
        path: false,
        query: true,
        fragment: false,
    };

    /// Everything except the fragment, which never reaches a server
    pub const RESOURCE: Self = Self {
        scheme: true,
        authority: true,
        path: true,
        query: true,
        fragment: false,
    };
}

/// A parsed URL or URL-reference
///
/// Constructed from one input string and parsed once. After parsing the
/// stored fields always compose back to a normalised form with dot-segments
/// removed and duplicate slashes collapsed; [`UrlRef::merge`] is the only way
/// to obtain a more complete instance.
///
/// Callers must check [`UrlRef::is_good`] before relying on any other field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRef {
    pub(crate) scheme: String,
    pub(crate) authority: String,
    pub(crate) user: String,
    pub(crate) pass: String,
    pub(crate) host: String,
    pub(crate) port: String,
    pub(crate) path: String,
    pub(crate) segments: Vec<String>,
    pub(crate) query: String,
    pub(crate) query_args: Vec<String>,
    /// Separator written before each argument after the first
    pub(crate) query_delims: Vec<char>,
    pub(crate) has_query: bool,
    pub(crate) fragment: String,
    pub(crate) kind: RefKind,
    pub(crate) is_dir: bool,
    pub(crate) is_pattern: bool,
    pub(crate) good: bool,
}

impl UrlRef {
    /// Parses a URL or URL-reference
    ///
    /// Never fails: a structural error yields an instance whose
    /// [`is_good`](Self::is_good) is false.
    pub fn parse(input: &str) -> Self {
        parse::parse(input)
    }

    /// Parses an input that must be a complete `http`/`https` URL
    ///
    /// Used for seed lists and other operator-supplied input.
    pub fn try_parse(input: &str) -> UrlResult<Self> {
        let parsed = Self::parse(input);

        if !parsed.is_good() {
            return Err(UrlError::Malformed(input.to_string()));
        }
        if !parsed.is_complete() {
            return Err(UrlError::Incomplete(input.to_string()));
        }
        if !parsed.is_http() {
            return Err(UrlError::UnsupportedScheme(parsed.scheme.clone()));
        }

        Ok(parsed)
    }

    /// True if parsing did not hit a structural error
    pub fn is_good(&self) -> bool {
        self.good
    }

    /// True if scheme, authority and path are all present
    pub fn is_complete(&self) -> bool {
        self.kind == RefKind::Absolute
    }

    /// The relativity of this reference
    pub fn kind(&self) -> RefKind {
        self.kind
    }

    pub fn rel_scheme(&self) -> bool {
        self.kind.rel_scheme()
    }

    pub fn rel_auth(&self) -> bool {
        self.kind.rel_auth()
    }

    pub fn rel_path(&self) -> bool {
        self.kind.rel_path()
    }

    /// True for `scheme:opaque` forms such as `mailto:`
    pub fn auth_less(&self) -> bool {
        self.kind == RefKind::Opaque
    }

    /// True if a `*` wildcard occurs in the path
    pub fn is_pattern(&self) -> bool {
        self.is_pattern
    }

    /// True if the path names a directory (it ended with `/`, `.` or `..`)
    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// True if the last path segment looks like a file name
    ///
    /// A segment qualifies when it is longer than one byte and contains a dot.
    pub fn is_file(&self) -> bool {
        !self.is_dir
            && self
                .segments
                .last()
                .map(|seg| seg.len() > 1 && seg.contains('.'))
                .unwrap_or(false)
    }

    /// True for `http` and `https` references
    pub fn is_http(&self) -> bool {
        self.scheme.eq_ignore_ascii_case("http") || self.scheme.eq_ignore_ascii_case("https")
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn pass(&self) -> &str {
        &self.pass
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    /// The normalised path, recomputed after parsing and every merge
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The raw query text as it appeared in the input
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn query_args(&self) -> &[String] {
        &self.query_args
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// The canonical string without its fragment
    ///
    /// This is the key the frontier deduplicates on.
    pub fn canonical(&self) -> String {
        self.compose(Components::RESOURCE)
    }

    /// Builds a malformed placeholder
    pub(crate) fn bad() -> Self {
        Self {
            good: false,
            ..Self::empty()
        }
    }

    pub(crate) fn empty() -> Self {
        Self {
            scheme: String::new(),
            authority: String::new(),
            user: String::new(),
            pass: String::new(),
            host: String::new(),
            port: String::new(),
            path: String::new(),
            segments: Vec::new(),
            query: String::new(),
            query_args: Vec::new(),
            query_delims: Vec::new(),
            has_query: false,
            fragment: String::new(),
            kind: RefKind::Absolute,
            is_dir: false,
            is_pattern: false,
            good: true,
        }
    }
}

impl fmt::Display for UrlRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compose(Components::ALL))
    }
}
