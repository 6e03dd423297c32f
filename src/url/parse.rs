//! Single-pass decomposition of a URL-reference into its components

use super::encode::{encode_with, trim_control, EncodeSet};
use super::{Components, RefKind, UrlRef};
use tracing::trace;

/// Outcome of looking for a `scheme:` prefix
enum SchemePrefix<'a> {
    /// The scheme text and the offset just past its `:`
    Found(&'a str, usize),
    /// A path delimiter came first, so the input is a relative reference
    Missing,
    /// A `:` was found but what precedes it cannot be a scheme
    Invalid,
}

pub(super) fn parse(input: &str) -> UrlRef {
    let text = trim_control(input);
    let bytes = text.as_bytes();
    let Some(&first) = bytes.first() else {
        return UrlRef::bad();
    };

    let mut url = UrlRef::empty();
    // (rel_scheme, rel_auth, rel_path)
    let mut rel = (false, false, false);
    let mut opaque = false;

    let (start, has_authority) = match first {
        b'/' if bytes.len() > 1 && bytes[1] == b'/' => {
            rel.0 = true;
            (2, true)
        }
        b'/' => {
            rel = (true, true, false);
            (0, false)
        }
        b'.' | b'*' | b'?' | b'#' => {
            rel = (true, true, true);
            (0, false)
        }
        _ => match scheme_prefix(text) {
            SchemePrefix::Missing => {
                rel = (true, true, true);
                (0, false)
            }
            SchemePrefix::Invalid => {
                trace!("Rejecting {:?}: invalid scheme", text);
                return UrlRef::bad();
            }
            SchemePrefix::Found(scheme, after) => {
                url.scheme = scheme.to_ascii_lowercase();
                let rest = &text[after..];
                if rest.starts_with("//") {
                    (after + 2, true)
                } else if rest.starts_with('/') {
                    trace!("Rejecting {:?}: scheme followed by a single slash", text);
                    return UrlRef::bad();
                } else {
                    opaque = true;
                    (after, false)
                }
            }
        },
    };

    let mut rest = &text[start..];

    if has_authority {
        let end = rest
            .find(|c| matches!(c, '/' | '?' | '#'))
            .unwrap_or(rest.len());
        if !parse_authority(&mut url, &rest[..end]) {
            trace!("Rejecting {:?}: bad authority", text);
            return UrlRef::bad();
        }
        rest = &rest[end..];
    }

    let path_end = rest.find(|c| matches!(c, '?' | '#')).unwrap_or(rest.len());
    let path = &rest[..path_end];
    if opaque {
        if !path.is_empty() {
            url.segments.push(path.to_string());
        }
    } else {
        parse_path(&mut url, path, rel.2);
    }
    rest = &rest[path_end..];

    if let Some(query) = rest.strip_prefix('?') {
        let end = query.find('#').unwrap_or(query.len());
        parse_query(&mut url, &query[..end]);
        rest = &query[end..];
    }

    if let Some(fragment) = rest.strip_prefix('#') {
        url.fragment = encode_with(fragment, EncodeSet::Default);
    }

    url.kind = if opaque {
        RefKind::Opaque
    } else {
        RefKind::from_flags(rel.0, rel.1, rel.2)
    };
    url.path = url.compose(Components::PATH);
    url
}

fn scheme_prefix(text: &str) -> SchemePrefix<'_> {
    for (i, c) in text.char_indices() {
        match c {
            ':' => {
                let scheme = &text[..i];
                return if is_valid_scheme(scheme) {
                    SchemePrefix::Found(scheme, i + 1)
                } else {
                    SchemePrefix::Invalid
                };
            }
            '.' | '/' | '?' | '#' => return SchemePrefix::Missing,
            _ => {}
        }
    }
    SchemePrefix::Missing
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-')
}

/// Splits `[user[:pass]@]host[:port]`; false if the host is missing or the
/// port is not numeric
fn parse_authority(url: &mut UrlRef, raw: &str) -> bool {
    if raw.is_empty() {
        return false;
    }

    let (userinfo, hostport) = match raw.rfind('@') {
        Some(at) => (Some(&raw[..at]), &raw[at + 1..]),
        None => (None, raw),
    };

    if let Some(info) = userinfo {
        match info.split_once(':') {
            Some((user, pass)) => {
                url.user = user.to_string();
                url.pass = pass.to_string();
            }
            None => url.user = info.to_string(),
        }
    }

    // bracketed IPv6 literals contain colons of their own
    let port_sep = if hostport.starts_with('[') {
        hostport.find("]:").map(|i| i + 1)
    } else {
        hostport.rfind(':')
    };
    let (host, port) = match port_sep {
        Some(i) => (&hostport[..i], &hostport[i + 1..]),
        None => (hostport, ""),
    };

    if host.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    url.host = host.to_ascii_lowercase();
    url.port = port.to_string();

    let mut authority = String::with_capacity(raw.len());
    if userinfo.is_some() {
        authority.push_str(&url.user);
        if !url.pass.is_empty() {
            authority.push(':');
            authority.push_str(&url.pass);
        }
        authority.push('@');
    }
    authority.push_str(&url.host);
    if !url.port.is_empty() {
        authority.push(':');
        authority.push_str(&url.port);
    }
    url.authority = authority;
    true
}

/// Fills `segments`; dot-segments are only applied when the path is rooted,
/// a relative path keeps them for resolution against its base
fn parse_path(url: &mut UrlRef, path: &str, rel_path: bool) {
    let raw: Vec<&str> = path.split('/').filter(|seg| !seg.is_empty()).collect();
    let names_dir = path.ends_with('/') || matches!(raw.last(), Some(&".") | Some(&".."));

    url.is_pattern = path.contains('*');
    let set = if url.is_pattern {
        EncodeSet::Pattern
    } else {
        EncodeSet::Default
    };

    for seg in raw {
        if !rel_path {
            match seg {
                "." => continue,
                ".." => {
                    url.segments.pop();
                    continue;
                }
                _ => {}
            }
        }
        url.segments.push(encode_with(seg, set));
    }

    url.is_dir = names_dir || (!rel_path && url.segments.is_empty());
}

fn parse_query(url: &mut UrlRef, query: &str) {
    url.has_query = true;
    url.query = query.to_string();
    url.query_args.clear();
    url.query_delims.clear();

    // a run of separators between two arguments keeps its first one
    let mut delim = None;
    for piece in query.split_inclusive(|c| c == '&' || c == ';') {
        let (arg, next) = match piece.chars().last() {
            Some(c @ ('&' | ';')) => (&piece[..piece.len() - 1], Some(c)),
            _ => (piece, None),
        };
        if arg.is_empty() {
            delim = delim.or(next);
            continue;
        }
        if !url.query_args.is_empty() {
            url.query_delims.push(delim.unwrap_or('&'));
        }
        url.query_args.push(encode_with(arg, EncodeSet::QueryArg));
        delim = next;
    }
}
