//! Bing search engine implementation.

use scraper::Html;
use url::Url;

use super::{element_text, is_bot_challenge, selector};
use crate::{Engine, EngineConfig, Result, SearchError, SearchResult};

const BOT_MARKERS: &[&str] = &["b_captcha", "/challenge/verify", "cf-turnstile"];

/// Bing search engine.
pub struct Bing {
    config: EngineConfig,
}

impl Bing {
    /// Creates a new Bing engine.
    pub fn new() -> Self {
        Self {
            config: EngineConfig {
                name: "Bing".to_string(),
                shortcut: "bing".to_string(),
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

impl Default for Bing {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for Bing {
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn build_query_url(&self, query: &str) -> Result<String> {
        let url = Url::parse_with_params("https://www.bing.com/search", &[("q", query)])?;
        Ok(url.into())
    }

    fn parse_results(&self, html: &str, limit: usize) -> Result<Vec<SearchResult>> {
        if is_bot_challenge(html, BOT_MARKERS) {
            return Err(SearchError::Captcha(self.shortcut().to_string()));
        }

        let document = Html::parse_document(html);
        let result_selector = selector("li.b_algo")?;
        let title_selector = selector("h2 a")?;
        let snippet_selector = selector(".b_caption p, .b_algoSlug, .b_lineclamp2")?;
        let source_selector = selector(".tptt")?;

        let mut results = Vec::new();

        for element in document.select(&result_selector) {
            if results.len() >= limit {
                break;
            }

            let Some(title_elem) = element.select(&title_selector).next() else {
                continue;
            };
            let title = element_text(title_elem);
            let url = title_elem.value().attr("href").unwrap_or_default();

            if title.is_empty() || !url.starts_with("http") {
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
        "https://www.bing.com/"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        <html><body><ol id="b_results">
            <li class="b_algo">
                <div class="tptt">Rust</div>
                <h2><a href="https://www.rust-lang.org/">Rust Programming   Language</a></h2>
                <div class="b_caption"><p>A language empowering everyone.</p></div>
            </li>
            <li class="b_algo">
                <h2><a href="https://doc.rust-lang.org/book/">The Rust Book</a></h2>
                <div class="b_caption"><p>The official book.</p></div>
            </li>
            <li class="b_algo">
                <h2><a href="/search?q=related">Related searches</a></h2>
            </li>
        </ol></body></html>
    "#;

    #[test]
    fn test_bing_new() {
        let engine = Bing::new();
        assert_eq!(engine.config.name, "Bing");
        assert_eq!(engine.config.shortcut, "bing");
        assert_eq!(engine.config.timeout, 10);
    }

    #[test]
    fn test_bing_with_config() {
        let custom_config = EngineConfig {
            name: "Custom Bing".to_string(),
            shortcut: "cbing".to_string(),
            ..Default::default()
        };
        let engine = Bing::default().with_config(custom_config);
        assert_eq!(engine.name(), "Custom Bing");
        assert_eq!(engine.shortcut(), "cbing");
    }

    #[test]
    fn test_bing_build_query_url() {
        let url = Bing::new().build_query_url("rust & c++").unwrap();
        assert_eq!(url, "https://www.bing.com/search?q=rust+%26+c%2B%2B");
    }

    #[test]
    fn test_bing_parse_results() {
        let results = Bing::new().parse_results(SAMPLE, 10).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Rust Programming Language");
        assert_eq!(results[0].url, "https://www.rust-lang.org/");
        assert_eq!(results[0].description, "A language empowering everyone.");
        assert_eq!(results[0].source, "Rust");
        assert_eq!(results[0].engine, "bing");
        assert_eq!(results[1].source, "doc.rust-lang.org");
    }

    #[test]
    fn test_bing_parse_results_respects_limit() {
        let results = Bing::new().parse_results(SAMPLE, 1).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_bing_parse_results_empty() {
        let results = Bing::new().parse_results("<html><body></body></html>", 10).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_bing_detects_captcha() {
        let html = r#"<html><body><div id="b_captcha">Verify</div></body></html>"#;
        let err = Bing::new().parse_results(html, 10).unwrap_err();
        assert!(matches!(err, SearchError::Captcha(ref e) if e == "bing"));
    }
}
