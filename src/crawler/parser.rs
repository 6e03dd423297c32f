//! HTML content extraction
//!
//! This module turns raw page bytes into:
//! - The visible text of the page
//! - The page title
//! - Link targets to follow (from <a> tags and canonical links), exactly as
//!   written in the markup
//!
//! Links are not resolved here; the frontier resolves them against the
//! page's effective URL.

use scraper::{ElementRef, Html, Selector};

/// Content extracted from one HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Visible text with whitespace collapsed to single spaces
    pub text: String,

    /// `href` values in document order, untouched
    pub raw_links: Vec<String>,
}

/// Extracts text and raw link targets from an HTML body
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">`
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - Empty `href` values
///
/// Invalid UTF-8 is replaced rather than rejected.
///
/// # Example
///
/// ```
/// use tidemark::crawler::extract;
///
/// let html = br#"<html><head><title>Test</title></head><body><p>Hi</p><a href="../page">Link</a></body></html>"#;
/// let page = extract(html);
/// assert_eq!(page.title, Some("Test".to_string()));
/// assert_eq!(page.text, "Hi Link");
/// assert_eq!(page.raw_links, vec!["../page".to_string()]);
/// ```
pub fn extract(body: &[u8]) -> Extracted {
    let html = String::from_utf8_lossy(body);
    let document = Html::parse_document(&html);

    Extracted {
        title: extract_title(&document),
        text: extract_text(&document),
        raw_links: extract_links(&document),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Collects text nodes under <body>, skipping script and style contents
fn extract_text(document: &Html) -> String {
    let root = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element());

    let mut words: Vec<&str> = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(ElementRef::wrap)
            .map(|parent| matches!(parent.value().name(), "script" | "style" | "noscript"))
            .unwrap_or(false);
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }

    words.join(" ")
}

/// Extracts raw link targets from the HTML document
fn extract_links(document: &Html) -> Vec<String> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                push_href(&mut links, href);
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                push_href(&mut links, href);
            }
        }
    }

    links
}

fn push_href(links: &mut Vec<String>, href: &str) {
    if !href.trim().is_empty() {
        links.push(href.to_string());
    }
}
