use super::UrlRef;

/// Builds the per-host key `scheme://authority` for a URL
///
/// Robots policies and rate-limit counters are tracked per key, so two URLs
/// that differ only in scheme or port are treated as different hosts.
///
/// # Returns
///
/// * `Some(String)` - The lowercase key
/// * `None` - If the URL is malformed or lacks a scheme or authority
///
/// # Examples
///
/// ```
/// use tidemark::url::{host_key, UrlRef};
///
/// let url = UrlRef::parse("https://Example.COM:8443/path?q");
/// assert_eq!(host_key(&url), Some("https://example.com:8443".to_string()));
///
/// assert_eq!(host_key(&UrlRef::parse("/relative")), None);
/// ```
pub fn host_key(url: &UrlRef) -> Option<String> {
    if !url.is_good() || url.auth_less() || url.rel_scheme() || url.rel_auth() {
        return None;
    }
    Some(format!("{}://{}", url.scheme(), url.authority()).to_lowercase())
}

/// The root directory (`scheme://authority/`) of a URL's host
///
/// Robots rules are resolved against this.
pub fn host_root(url: &UrlRef) -> Option<UrlRef> {
    host_key(url).map(|key| UrlRef::parse(&format!("{}/", key)))
}
