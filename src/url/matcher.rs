/// Result of walking a subject string against a glob pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternMatch {
    /// The pattern was consumed; `subject_pos` is where the subject stopped
    Prefix {
        subject_pos: usize,
        pattern_pos: usize,
    },
    /// A trailing `*` was reached, so everything that follows matches
    Wildcard,
    /// The subject diverges from the pattern
    NoMatch,
}

/// Matches `subject` against a pattern that may contain `*` wildcards
///
/// A `*` skips zero or more subject bytes until the rest of the pattern lines
/// up again. Only the most recent `*` is remembered as a restart point, which
/// is enough for robots.txt rules. A `*` at the very end of the pattern
/// short-circuits to [`PatternMatch::Wildcard`].
///
/// The pattern does not have to consume the whole subject: a successful walk
/// reports where the subject stopped so the caller can decide whether the
/// remainder is acceptable.
///
/// # Arguments
///
/// * `subject` - The concrete URL text
/// * `pattern` - The rule text, possibly containing `*`
///
/// # Examples
///
/// ```
/// use tidemark::url::{match_glob, PatternMatch};
///
/// assert_eq!(match_glob(b"/private/x", b"/private/*"), PatternMatch::Wildcard);
/// assert_eq!(match_glob(b"/public/x", b"/private/*"), PatternMatch::NoMatch);
/// assert_eq!(
///     match_glob(b"/a/b", b"/a"),
///     PatternMatch::Prefix { subject_pos: 2, pattern_pos: 2 }
/// );
/// ```
pub fn match_glob(subject: &[u8], pattern: &[u8]) -> PatternMatch {
    let mut s = 0;
    let mut p = 0;
    // (pattern index after the last `*`, subject index it was tried from)
    let mut restart: Option<(usize, usize)> = None;

    while p < pattern.len() {
        if pattern[p] == b'*' {
            if p + 1 == pattern.len() {
                return PatternMatch::Wildcard;
            }
            p += 1;
            restart = Some((p, s));
            continue;
        }

        if s < subject.len() && subject[s] == pattern[p] {
            s += 1;
            p += 1;
            continue;
        }

        match restart {
            Some((rp, rs)) if rs < subject.len() => {
                restart = Some((rp, rs + 1));
                p = rp;
                s = rs + 1;
            }
            _ => return PatternMatch::NoMatch,
        }
    }

    PatternMatch::Prefix {
        subject_pos: s,
        pattern_pos: p,
    }
}
