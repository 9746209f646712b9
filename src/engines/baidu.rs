//! Baidu search engine implementation.
//!
//! Baidu's results page relies on JavaScript rendering, so it needs a real
//! browser page rather than a plain HTTP fetch.

use scraper::Html;
use url::Url;

use super::{element_text, is_bot_challenge, selector};
use crate::{Engine, EngineConfig, Result, SearchError, SearchResult};

const BOT_MARKERS: &[&str] = &["wappass.baidu.com", "安全验证", "timeout-button"];

/// Baidu search engine (百度).
pub struct Baidu {
    config: EngineConfig,
}

impl Baidu {
    /// Creates a new Baidu engine.
    pub fn new() -> Self {
        Self {
            config: EngineConfig {
                name: "Baidu".to_string(),
                shortcut: "baidu".to_string(),
                timeout: 10,
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

impl Default for Baidu {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for Baidu {
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn build_query_url(&self, query: &str) -> Result<String> {
        let url = Url::parse_with_params("https://www.baidu.com/s", &[("wd", query)])?;
        Ok(url.into())
    }

    fn parse_results(&self, html: &str, limit: usize) -> Result<Vec<SearchResult>> {
        if is_bot_challenge(html, BOT_MARKERS) {
            return Err(SearchError::Captcha(self.shortcut().to_string()));
        }

        let document = Html::parse_document(html);
        let result_selector = selector("div.result, div.c-container")?;
        let title_selector = selector("h3 a, .t a")?;
        let snippet_selector = selector(".c-abstract, .c-span-last, [class^=\"content-right\"]")?;
        let source_selector = selector(".c-showurl, [class^=\"source-text\"]")?;

        let mut results = Vec::new();

        for element in document.select(&result_selector) {
            if results.len() >= limit {
                break;
            }

            let Some(title_elem) = element.select(&title_selector).next() else {
                continue;
            };
            let title = element_text(title_elem);

            // `mu` carries the real target; the title link is a baidu.com redirect.
            let url = element
                .value()
                .attr("mu")
                .filter(|mu| mu.starts_with("http"))
                .or_else(|| title_elem.value().attr("href"))
                .unwrap_or_default();

            if title.is_empty() || url.is_empty() {
                continue;
            }

            let description = element
                .select(&snippet_selector)
                .next()
                .map(element_text)
                .unwrap_or_default();

            let mut result = SearchResult::new(self.shortcut(), url, title, description);
            if let Some(source) = element.select(&source_selector).next().map(element_text) {
                if !source.is_empty() {
                    result = result.with_source(source);
                }
            }
            results.push(result);
        }

        Ok(results)
    }

    fn health_url(&self) -> &str {
        "https://www.baidu.com/"
    }
}
