//! Brave search engine implementation.

use scraper::Html;
use url::Url;

use super::{element_text, is_bot_challenge, selector};
use crate::{Engine, EngineConfig, Result, SearchError, SearchResult};

const BOT_MARKERS: &[&str] = &["captcha-container", "/search/captcha"];

/// Brave search engine.
pub struct Brave {
    config: EngineConfig,
}

impl Brave {
    /// Creates a new Brave engine.
    pub fn new() -> Self {
        Self {
            config: EngineConfig {
                name: "Brave".to_string(),
                shortcut: "brave".to_string(),
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

impl Default for Brave {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for Brave {
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn build_query_url(&self, query: &str) -> Result<String> {
        let url = Url::parse_with_params(
            "https://search.brave.com/search",
            &[("q", query), ("source", "web")],
        )?;
        Ok(url.into())
    }

    fn parse_results(&self, html: &str, limit: usize) -> Result<Vec<SearchResult>> {
        if is_bot_challenge(html, BOT_MARKERS) {
            return Err(SearchError::Captcha(self.shortcut().to_string()));
        }

        let document = Html::parse_document(html);
        let result_selector = selector(r#"div.snippet[data-type="web"]"#)?;
        let title_selector = selector(".search-snippet-title, .title")?;
        let desc_selector = selector(".generic-snippet .content, .snippet-description")?;
        let url_selector = selector(r#"a[href^="http"]"#)?;
        let site_selector = selector(".site-name-content .desktop-small-semibold, .netloc")?;

        let mut results = Vec::new();

        for element in document.select(&result_selector) {
            if results.len() >= limit {
                break;
            }

            let title = element
                .select(&title_selector)
                .next()
                .map(element_text)
                .unwrap_or_default();
            let url = element
                .select(&url_selector)
                .next()
                .and_then(|e| e.value().attr("href"))
                .unwrap_or_default();

            if title.is_empty() || url.is_empty() {
                continue;
            }

            let description = element
                .select(&desc_selector)
                .next()
                .map(element_text)
                .unwrap_or_default();

            let mut result = SearchResult::new(self.shortcut(), url, title, description);
            if let Some(site) = element.select(&site_selector).next().map(element_text) {
                if !site.is_empty() {
                    result = result.with_source(site);
                }
            }
            results.push(result);
        }

        Ok(results)
    }

    fn health_url(&self) -> &str {
        "https://search.brave.com/"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brave_new() {
        let engine = Brave::new();
        assert_eq!(engine.config.name, "Brave");
        assert_eq!(engine.config.shortcut, "brave");
        assert_eq!(engine.config.timeout, 5);
    }

    #[test]
    fn test_brave_engine_trait() {
        let engine = Brave::default();
        assert_eq!(engine.name(), "Brave");
        assert_eq!(engine.shortcut(), "brave");
        assert!(engine.is_enabled());
    }

    #[test]
    fn test_brave_build_query_url() {
        let url = Brave::new().build_query_url("rust async").unwrap();
        assert_eq!(url, "https://search.brave.com/search?q=rust+async&source=web");
    }

    #[test]
    fn test_brave_parse_results_with_data() {
        let html = r#"
        <html><body>
        <div class="snippet" data-type="web">
            <a href="https://www.rust-lang.org/" class="search-snippet-title">Rust Programming Language</a>
            <div class="netloc">rust-lang.org</div>
            <div class="generic-snippet"><div class="content">A systems programming language focused on safety.</div></div>
        </div>
        <div class="snippet" data-type="web">
            <a href="https://doc.rust-lang.org/book/" class="search-snippet-title">The Rust Book</a>
            <div class="snippet-description">Official Rust programming guide.</div>
        </div>
        </body></html>
        "#;
        let results = Brave::new().parse_results(html, 10).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Rust Programming Language");
        assert_eq!(results[0].url, "https://www.rust-lang.org/");
        assert_eq!(
            results[0].description,
            "A systems programming language focused on safety."
        );
        assert_eq!(results[0].source, "rust-lang.org");
        assert_eq!(results[1].title, "The Rust Book");
        assert_eq!(results[1].description, "Official Rust programming guide.");
    }

    #[test]
    fn test_brave_parse_results_skips_non_web() {
        let html = r#"
        <html><body>
        <div class="snippet" data-type="video">
            <a href="https://example.com/video" class="search-snippet-title">A Video</a>
        </div>
        <div class="snippet" data-type="web">
            <a href="https://example.com/page" class="search-snippet-title">A Page</a>
        </div>
        </body></html>
        "#;
        let results = Brave::new().parse_results(html, 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "A Page");
    }

    #[test]
    fn test_brave_detects_captcha() {
        let html = r#"<html><body><div class="captcha-container"></div></body></html>"#;
        assert!(matches!(
            Brave::new().parse_results(html, 10),
            Err(SearchError::Captcha(_))
        ));
    }
}
