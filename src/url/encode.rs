/// Byte classes that may appear unescaped in a stored component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EncodeSet {
    /// Path segments and fragments
    Default,
    /// Path segments of a robots rule, where `*` is a wildcard
    Pattern,
    /// Query arguments, where `=` separates key and value
    QueryArg,
}

impl EncodeSet {
    fn passes(&self, byte: u8) -> bool {
        if byte.is_ascii_alphanumeric() || byte == b'%' || byte == b'.' {
            return true;
        }
        match self {
            Self::Default => false,
            Self::Pattern => byte == b'*',
            Self::QueryArg => byte == b'=',
        }
    }
}

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// Percent-encodes every byte outside `[0-9A-Za-z%.]`
///
/// Multi-byte UTF-8 sequences are encoded one byte at a time, so the output
/// for a given input is always the same sequence of `%XX` tokens. An existing
/// `%` is passed through, which makes encoding idempotent.
///
/// # Examples
///
/// ```
/// use tidemark::url::percent_encode;
///
/// assert_eq!(percent_encode("a b"), "a%20b");
/// assert_eq!(percent_encode("caf\u{e9}"), "caf%C3%A9");
/// assert_eq!(percent_encode("a%20b"), "a%20b");
/// ```
pub fn percent_encode(input: &str) -> String {
    encode_with(input, EncodeSet::Default)
}

pub(crate) fn encode_with(input: &str, set: EncodeSet) -> String {
    let mut out = String::with_capacity(input.len());
    for &byte in input.as_bytes() {
        if set.passes(byte) {
            out.push(byte as char);
        } else {
            out.push('%');
            out.push(HEX[(byte >> 4) as usize] as char);
            out.push(HEX[(byte & 0x0f) as usize] as char);
        }
    }
    out
}

/// Strips leading and trailing control characters and whitespace
///
/// Any byte at or below `0x20` counts, which covers the stray `\r`, tabs and
/// NULs found in scraped `href` values.
pub fn trim_control(input: &str) -> &str {
    input.trim_matches(|c: char| (c as u32) <= 0x20)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough_characters() {
        assert_eq!(percent_encode("Index.html"), "Index.html");
        assert_eq!(percent_encode("abcXYZ019"), "abcXYZ019");
    }

    #[test]
    fn test_reserved_characters_encoded() {
        assert_eq!(percent_encode("a-b_c~d"), "a%2Db%5Fc%7Ed");
        assert_eq!(percent_encode("x@y"), "x%40y");
        assert_eq!(percent_encode("*"), "%2A");
    }

    #[test]
    fn test_multibyte_encoded_bytewise() {
        // two, three and four byte sequences
        assert_eq!(percent_encode("\u{e9}"), "%C3%A9");
        assert_eq!(percent_encode("\u{20ac}"), "%E2%82%AC");
        assert_eq!(percent_encode("\u{1f600}"), "%F0%9F%98%80");
    }

    #[test]
    fn test_encoding_is_idempotent() {
        let once = percent_encode("a b/c\u{e9}");
        assert_eq!(percent_encode(&once), once);
    }

    #[test]
    fn test_pattern_keeps_wildcard() {
        assert_eq!(encode_with("*.php", EncodeSet::Pattern), "*.php");
        assert_eq!(encode_with("*.php", EncodeSet::Default), "%2A.php");
    }

    #[test]
    fn test_query_arg_keeps_equals() {
        assert_eq!(encode_with("k=v w", EncodeSet::QueryArg), "k=v%20w");
    }

    #[test]
    fn test_trim_control() {
        assert_eq!(trim_control("  \t/path\r\n"), "/path");
        assert_eq!(trim_control("\u{0}x\u{1}"), "x");
        assert_eq!(trim_control(" \n "), "");
        assert_eq!(trim_control("a b"), "a b");
    }
}
