//! Shared HTML helpers for listing and landing page parsing.
//!
//! `scraper::Html` is not `Send`, so every parser in this crate is a plain
//! synchronous function that consumes the page text and returns owned values.

use regex::Regex;
use scraper::{ElementRef, Selector};
use url::Url;

/// Compiles a hardcoded CSS selector, panicking with the selector on error.
pub(crate) fn compile_static_selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid static selector '{css}': {e:?}"))
}

/// Compiles a hardcoded regex, panicking with the pattern on error.
pub(crate) fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

/// Text content of an element with whitespace runs collapsed to one space.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// The trimmed `href` of an `<a>` element, if it has a non-empty one.
pub(crate) fn anchor_href(element: ElementRef<'_>) -> Option<&str> {
    if element.value().name() != "a" {
        return None;
    }
    element
        .value()
        .attr("href")
        .map(str::trim)
        .filter(|href| !href.is_empty())
}

/// First `href` among the elements matched by `selector` under `scope`.
///
/// Only the first matched element is considered, mirroring how a listing's
/// "first link" is defined.
pub(crate) fn first_href<'a>(scope: ElementRef<'a>, selector: &Selector) -> Option<&'a str> {
    scope.select(selector).next().and_then(anchor_href)
}

/// Resolves `href` against the page URL, keeping only http(s) results.
pub(crate) fn absolutize(page_url: &str, href: &str) -> Option<String> {
    let resolved = match Url::parse(page_url) {
        Ok(base) => base.join(href).ok()?,
        Err(_) => Url::parse(href).ok()?,
    };
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

/// Splits an author line on commas, dropping empty names.
pub(crate) fn split_authors(line: &str) -> Vec<String> {
    line.split([',', ';'])
        .map(|name| name.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|name| !name.is_empty())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use scraper::Html;

    use super::*;

    #[test]
    fn test_element_text_collapses_whitespace() {
        let doc = Html::parse_fragment("<p>  A\n  <b>cache</b>   paper </p>");
        let p = doc.select(&compile_static_selector("p")).next().unwrap();
        assert_eq!(element_text(p), "A cache paper");
    }

    #[test]
    fn test_first_href_ignores_non_anchor_matches() {
        let doc = Html::parse_fragment(r#"<div><span class="pdf">x</span><a class="pdf" href="/b.pdf">b</a></div>"#);
        let root = doc.root_element();
        assert_eq!(first_href(root, &compile_static_selector(".pdf")), None);
        assert_eq!(
            first_href(root, &compile_static_selector("a.pdf")),
            Some("/b.pdf")
        );
    }

    #[test]
    fn test_absolutize_relative_and_rejects_javascript() {
        assert_eq!(
            absolutize("https://openaccess.thecvf.com/CVPR2023?day=all", "/content/a.pdf")
                .as_deref(),
            Some("https://openaccess.thecvf.com/content/a.pdf")
        );
        assert_eq!(absolutize("https://x.org/", "javascript:void(0)"), None);
    }

    #[test]
    fn test_split_authors() {
        assert_eq!(
            split_authors(" Ada Lovelace,  Alan\nTuring , "),
            vec!["Ada Lovelace".to_string(), "Alan Turing".to_string()]
        );
    }
}
