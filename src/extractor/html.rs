//! Small helpers over `scraper` shared by the page-scraping extractors.

use scraper::{ElementRef, Html, Selector};

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn element_text(el: ElementRef) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

/// Text of the first element matching `selector`, if it is non-empty.
pub fn select_text(doc: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    let node = doc.select(&sel).next()?;
    let text = element_text(node);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Tries each selector in order and returns the first non-empty text.
pub fn select_first_text(doc: &Html, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|s| select_text(doc, s))
}

pub fn meta_content(doc: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    let node = doc.select(&sel).next()?;
    node.value().attr("content").map(|s| s.to_string())
}

/// Every value of `attr` on elements matching `selector`, in document order.
pub fn attr_values(doc: &Html, selector: &str, attr: &str) -> Vec<String> {
    let Ok(sel) = Selector::parse(selector) else {
        return Vec::new();
    };
    doc.select(&sel)
        .filter_map(|el| el.value().attr(attr))
        .map(|s| s.to_string())
        .collect()
}

/// Last path segment of a URL or path.
pub fn file_name_from_url(url: &str) -> String {
    url.rsplit('/').next().unwrap_or(url).to_string()
}
