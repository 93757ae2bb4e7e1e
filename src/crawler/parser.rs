//! HTML parser for page metadata
//!
//! This module extracts from an HTML document:
//! - The page title (`<title>`, falling back to `og:title`)
//! - The description (`<meta name="description">` or `og:description`)
//! - The canonical URL
//! - Outgoing links to feed back into the frontier

use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Absolute canonical URL, if declared
    pub canonical: Option<String>,
    /// Absolute http(s) links in document order, without duplicates
    pub links: Vec<String>,
}

/// Parses HTML content and extracts metadata and links
///
/// # Link Extraction Rules
///
/// **Include:** `<a href="...">` and `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - Fragment-only links
/// - Anything that is not http(s) after resolution
///
/// # Example
///
/// ```
/// use mercator_frontier::crawler::parse_page;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_page(html, &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn parse_page(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    let title = select_text(&document, "title")
        .or_else(|| select_attr(&document, r#"meta[property="og:title"]"#, "content"));
    let description = select_attr(&document, r#"meta[name="description"]"#, "content")
        .or_else(|| select_attr(&document, r#"meta[property="og:description"]"#, "content"));
    let canonical = select_attr(&document, r#"link[rel="canonical"]"#, "href")
        .and_then(|href| resolve_link(&href, base_url));

    let mut links = extract_links(&document, base_url);
    if let Some(canonical) = &canonical {
        if !links.contains(canonical) {
            links.push(canonical.clone());
        }
    }

    ParsedPage {
        title,
        description,
        canonical,
        links,
    }
}

fn select_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn select_attr(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .filter_map(|element| element.value().attr(attr))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut links = Vec::new();
    let mut seen = HashSet::new();

    let Ok(a_selector) = Selector::parse("a[href]") else {
        return links;
    };

    for element in document.select(&a_selector) {
        if element.value().attr("download").is_some() {
            continue;
        }

        let Some(absolute_url) = element
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, base_url))
        else {
            continue;
        };

        if seen.insert(absolute_url.clone()) {
            links.push(absolute_url);
        }
    }

    links
}

/// Resolves a link href to an absolute http(s) URL
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let mut absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() != "http" && absolute_url.scheme() != "https" {
        return None;
    }
    absolute_url.set_fragment(None);
    Some(absolute_url.to_string())
}
