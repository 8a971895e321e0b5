//! Link extraction from rendered documents
//!
//! This module parses rendered HTML to find the routes it references.
//!
//! # Link Extraction Rules
//!
//! **Include:**
//! - `<a href="...">` and `<area href="...">`
//! - `<link rel="canonical" href="...">` and `<link rel="alternate" href="...">`
//!
//! **Exclude:**
//! - `<link rel="stylesheet" ...>`, `<script src="...">`, `<img src="...">`
//! - `<a href="..." download>` and `rel="external"` links
//! - `javascript:`, `mailto:`, `tel:` and `data:` links
//! - Fragment-only links
//! - Links to other origins and to the document's own route
//! - Links whose last segment has an extension outside the configured
//!   document extensions (`/guide.pdf`, `/logo.png`); those are assets
//!
//! A `<base href>` element changes the base used to resolve relative links.

use crate::route::{route_from_url, route_url, RoutePath};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

const LINK_SELECTOR: &str = "a[href], area[href], link[href]";

/// Parses HTML content and returns every followable absolute URL, in
/// document order
///
/// # Example
///
/// ```
/// use static_export::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><body><a href="/page">Link</a></body></html>"#;
/// let page_url = Url::parse("http://localhost:4173/").unwrap();
/// let links = parse_html(html, &page_url);
/// assert_eq!(links[0].as_str(), "http://localhost:4173/page");
/// ```
pub fn parse_html(html: &str, page_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let base_url = document_base(&document, page_url);

    let Ok(selector) = Selector::parse(LINK_SELECTOR) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter(|element| is_followable(element))
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, &base_url))
        .collect()
}

/// Extracts the same-origin routes referenced by a rendered document
///
/// Results are deduplicated, keep document order, and never include `route`
/// itself. A link whose last segment carries an extension is kept only if
/// that extension is one of `document_extensions`.
///
/// # Returns
///
/// * `Ok(Vec<RoutePath>)` - Discovered routes
/// * `Err(String)` - The content is not valid UTF-8
pub fn extract_links(
    origin: &Url,
    route: &RoutePath,
    content: &[u8],
    document_extensions: &[String],
) -> Result<Vec<RoutePath>, String> {
    let html = std::str::from_utf8(content)
        .map_err(|e| format!("document is not valid UTF-8: {}", e))?;

    let page_url = route_url(origin, route).map_err(|e| e.to_string())?;

    let mut seen = HashSet::new();
    let mut routes = Vec::new();

    for url in parse_html(html, &page_url) {
        let Some(found) = route_from_url(origin, &url) else {
            continue;
        };
        if &found == route || !is_navigable(&found, document_extensions) {
            continue;
        }
        if seen.insert(found.clone()) {
            routes.push(found);
        }
    }

    Ok(routes)
}

/// Returns true if a rendered document should be scanned for links
///
/// Routes with a non-HTML extension (feeds, JSON, text) are never parsed, nor
/// are bodies whose content type says they are not HTML.
pub fn is_html_document(route: &RoutePath, content_type: Option<&str>) -> bool {
    if let Some(ext) = route.extension() {
        if ext != "html" && ext != "htm" {
            return false;
        }
    }

    match content_type {
        Some(content_type) => {
            let mime = content_type.split(';').next().unwrap_or("").trim();
            mime.is_empty() || mime.eq_ignore_ascii_case("text/html")
                || mime.eq_ignore_ascii_case("application/xhtml+xml")
        }
        None => true,
    }
}

/// Returns false for links to non-document resources such as `/guide.pdf`
fn is_navigable(route: &RoutePath, document_extensions: &[String]) -> bool {
    if route.has_trailing_slash() {
        return true;
    }
    match route.extension() {
        Some(ext) => document_extensions
            .iter()
            .any(|known| known.eq_ignore_ascii_case(&ext)),
        None => true,
    }
}

/// Returns the URL relative links resolve against
fn document_base(document: &Html, page_url: &Url) -> Url {
    let Ok(selector) = Selector::parse("base[href]") else {
        return page_url.clone();
    };

    document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr("href"))
        .and_then(|href| page_url.join(href.trim()).ok())
        .unwrap_or_else(|| page_url.clone())
}

fn is_followable(element: &ElementRef) -> bool {
    let value = element.value();
    let rel: Vec<String> = value
        .attr("rel")
        .map(|rel| rel.split_ascii_whitespace().map(str::to_ascii_lowercase).collect())
        .unwrap_or_default();

    match value.name() {
        "link" => rel.iter().any(|r| r == "canonical" || r == "alternate"),
        _ => value.attr("download").is_none() && !rel.iter().any(|r| r == "external"),
    }
}

/// Resolves a link href to an absolute URL
///
/// Returns None for special schemes, fragment-only links, unparseable hrefs
/// and anything that is not HTTP(S) after resolution.
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url),
        _ => None,
    }
}
