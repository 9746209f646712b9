//! Sequential fallback across engines.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::engine::SearchBackend;
use crate::{Result, SearchError, SearchResult};

/// Tries each backend in order and returns the first successful result set.
///
/// Backends after the first success are never called. If every backend
/// fails, the error of the last one is returned; earlier errors are only
/// logged.
pub async fn search_with_fallback(
    backends: &[Arc<dyn SearchBackend>],
    query: &str,
    limit: usize,
) -> Result<Vec<SearchResult>> {
    let mut last_error = None;

    for (attempt, backend) in backends.iter().enumerate() {
        match backend.search(query, limit).await {
            Ok(results) => {
                debug!(
                    engine = backend.id(),
                    attempt = attempt + 1,
                    count = results.len(),
                    "Fallback chain succeeded"
                );
                return Ok(results);
            }
            Err(e) => {
                let remaining = backends.len() - attempt - 1;
                warn!(
                    engine = backend.id(),
                    %query,
                    error = %e,
                    remaining,
                    "Engine failed, trying next"
                );
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or(SearchError::NoEngines))
}
