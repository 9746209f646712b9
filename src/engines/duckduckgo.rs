//! DuckDuckGo search engine implementation.
//!
//! Uses the JavaScript-free HTML endpoint, which is also what renders fastest
//! in a pooled page.

use scraper::Html;
use url::Url;

use super::{element_text, is_bot_challenge, selector};
use crate::{Engine, EngineConfig, Result, SearchError, SearchResult};

const BOT_MARKERS: &[&str] = &["anomaly-modal", "Unfortunately, bots use DuckDuckGo too"];

/// DuckDuckGo search engine.
pub struct DuckDuckGo {
    config: EngineConfig,
}

impl DuckDuckGo {
    /// Creates a new DuckDuckGo engine.
    pub fn new() -> Self {
        Self {
            config: EngineConfig {
                name: "DuckDuckGo".to_string(),
                shortcut: "duckduckgo".to_string(),
                timeout: 5,
                enabled: true,
            },
        }
    }

    /// Creates with custom configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }
}

impl Default for DuckDuckGo {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for DuckDuckGo {
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn build_query_url(&self, query: &str) -> Result<String> {
        let url = Url::parse_with_params("https://html.duckduckgo.com/html/", &[("q", query)])?;
        Ok(url.into())
    }

    fn parse_results(&self, html: &str, limit: usize) -> Result<Vec<SearchResult>> {
        if is_bot_challenge(html, BOT_MARKERS) {
            return Err(SearchError::Captcha(self.shortcut().to_string()));
        }

        let document = Html::parse_document(html);
        let result_selector = selector(".result")?;
        let title_selector = selector(".result__title a, a.result__a")?;
        let snippet_selector = selector(".result__snippet")?;

        let mut results = Vec::new();

        for element in document.select(&result_selector) {
            if results.len() >= limit {
                break;
            }
            // Sponsored entries carry the extra `result--ad` class.
            if element.value().classes().any(|c| c == "result--ad") {
                continue;
            }

            let Some(title_elem) = element.select(&title_selector).next() else {
                continue;
            };
            let title = element_text(title_elem);
            let href = title_elem.value().attr("href").unwrap_or_default();
            let url = if href.contains("duckduckgo.com/l/") {
                extract_redirect_url(href).unwrap_or_else(|| href.to_string())
            } else {
                href.to_string()
            };

            if url.is_empty() || title.is_empty() {
                continue;
            }

            let description = element
                .select(&snippet_selector)
                .next()
                .map(element_text)
                .unwrap_or_default();

            results.push(SearchResult::new(self.shortcut(), url, title, description));
        }

        Ok(results)
    }

    fn health_url(&self) -> &str {
        "https://html.duckduckgo.com/html/"
    }
}

/// Pulls the target out of a `//duckduckgo.com/l/?uddg=...` redirect link.
fn extract_redirect_url(href: &str) -> Option<String> {
    let (_, query) = href.split_once('?')?;
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("uddg="))
        .and_then(|target| urlencoding::decode(target).ok())
        .map(|decoded| decoded.into_owned())
}
