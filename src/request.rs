//! Search request validation.

use serde::{Deserialize, Serialize};

use crate::{Result, SearchError};

/// Maximum number of queries accepted in one request.
pub const MAX_QUERIES: usize = 10;

/// Maximum result limit accepted in one request.
pub const MAX_LIMIT: usize = 50;

/// A multi-query search request as received from the tool layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Queries to run, in caller order. Duplicates are allowed.
    pub queries: Vec<String>,
    /// Maximum results per query, across all engines.
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Engine ids to query, in priority order.
    pub backends: Vec<String>,
}

fn default_limit() -> usize {
    10
}

impl SearchRequest {
    /// Creates a request.
    pub fn new<Q, B>(queries: Q, limit: usize, backends: B) -> Self
    where
        Q: IntoIterator,
        Q::Item: Into<String>,
        B: IntoIterator,
        B::Item: Into<String>,
    {
        Self {
            queries: queries.into_iter().map(Into::into).collect(),
            limit,
            backends: backends.into_iter().map(Into::into).collect(),
        }
    }

    /// Checks the request shape.
    pub fn validate(&self) -> Result<()> {
        if self.backends.is_empty() {
            return Err(SearchError::NoEngines);
        }
        if self.queries.is_empty() {
            return Err(SearchError::InvalidQuery("at least one query is required".into()));
        }
        if self.queries.len() > MAX_QUERIES {
            return Err(SearchError::InvalidQuery(format!(
                "at most {} queries are allowed, got {}",
                MAX_QUERIES,
                self.queries.len()
            )));
        }
        if let Some(pos) = self.queries.iter().position(|q| q.trim().is_empty()) {
            return Err(SearchError::InvalidQuery(format!("query {} is empty", pos + 1)));
        }
        if !(1..=MAX_LIMIT).contains(&self.limit) {
            return Err(SearchError::InvalidQuery(format!(
                "limit must be between 1 and {}, got {}",
                MAX_LIMIT, self.limit
            )));
        }
        Ok(())
    }
}
