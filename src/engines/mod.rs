//! Search engine implementations.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Selector};

use crate::{Result, SearchError};

mod baidu;
mod bing;
mod brave;
mod duckduckgo;

pub use baidu::Baidu;
pub use bing::Bing;
pub use brave::Brave;
pub use duckduckgo::DuckDuckGo;

/// Parses a CSS selector, mapping failures to a parse error.
pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| SearchError::Parse(format!("Failed to parse selector '{}': {:?}", css, e)))
}

/// Text content of an element with runs of whitespace collapsed.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));
    let text = element.text().collect::<String>();
    whitespace.replace_all(text.trim(), " ").into_owned()
}

/// Returns true if `html` contains any of the bot-challenge `markers`.
pub(crate) fn is_bot_challenge(html: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| html.contains(marker))
}
