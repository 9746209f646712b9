//! Search result types.

use serde::{Deserialize, Serialize};

/// A single search result produced by one engine.
///
/// Results are values: engines build them once and nothing downstream
/// mutates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Result title.
    pub title: String,
    /// Result URL.
    pub url: String,
    /// Result description/snippet.
    pub description: String,
    /// Human-readable source label (usually the host name).
    pub source: String,
    /// Identifier of the engine that produced this result.
    pub engine: String,
}

impl SearchResult {
    /// Creates a new search result. The source label defaults to the URL's host.
    pub fn new(
        engine: impl Into<String>,
        url: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let url = url.into();
        let source = source_label(&url);
        Self {
            title: title.into(),
            url,
            description: description.into(),
            source,
            engine: engine.into(),
        }
    }

    /// Overrides the source label.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

/// Host name of `url` without a leading `www.`, or an empty string.
fn source_label(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_default()
}

/// Results for one caller-supplied query, as returned to the tool layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResults {
    /// The query as the caller wrote it, trimmed.
    pub query: String,
    /// Engines the query was sent to, in request order.
    pub backends: Vec<String>,
    /// Number of entries in `results`.
    pub total_results: usize,
    /// Merged results, in engine order, truncated to the request limit.
    pub results: Vec<SearchResult>,
}

impl QueryResults {
    /// Creates a query entry, deriving `total_results` from `results`.
    pub fn new(query: impl Into<String>, backends: Vec<String>, results: Vec<SearchResult>) -> Self {
        Self {
            query: query.into(),
            backends,
            total_results: results.len(),
            results,
        }
    }

    /// Returns true if no engine produced anything for this query.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
