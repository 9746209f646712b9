//! Multi-query search orchestration.
//!
//! Every engine runs concurrently with the others, but each engine works
//! through the distinct queries one at a time. Results are then reassembled
//! in the caller's query order, duplicates included.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::engine::SearchBackend;
use crate::registry::EngineRegistry;
use crate::request::SearchRequest;
use crate::{QueryResults, Result, SearchError, SearchResult};

/// Splits `limit` across `backends` engines, giving the remainder to the
/// earliest ones. `distribute_limit(10, 3) == [4, 3, 3]`.
pub fn distribute_limit(limit: usize, backends: usize) -> Vec<usize> {
    if backends == 0 {
        return Vec::new();
    }
    let base = limit / backends;
    let remainder = limit % backends;
    (0..backends)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}

/// Multi-query, multi-engine search over a fixed engine registry.
pub struct Search {
    registry: Arc<EngineRegistry>,
}

impl Search {
    /// Creates a search over the engines in `registry`.
    pub fn new(registry: Arc<EngineRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the engine registry.
    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }

    /// Validates `request` and runs it.
    pub async fn run(&self, request: &SearchRequest) -> Result<Vec<QueryResults>> {
        request.validate()?;
        self.search(&request.queries, &request.backends, request.limit)
            .await
    }

    /// Runs every query against every engine in `backends`.
    ///
    /// Returns one entry per element of `queries`, in the same order. Only an
    /// empty engine list is an error; engine failures and unknown engine ids
    /// yield empty results for the affected queries.
    pub async fn search(
        &self,
        queries: &[String],
        backends: &[String],
        limit: usize,
    ) -> Result<Vec<QueryResults>> {
        if backends.is_empty() {
            return Err(SearchError::NoEngines);
        }

        let start = Instant::now();
        let trimmed: Vec<&str> = queries.iter().map(|q| q.trim()).collect();

        let mut unique: Vec<&str> = Vec::new();
        for &query in &trimmed {
            if !query.is_empty() && !unique.contains(&query) {
                unique.push(query);
            }
        }

        let shares = distribute_limit(limit, backends.len());
        debug!(
            queries = queries.len(),
            unique = unique.len(),
            engines = backends.len(),
            ?shares,
            "Starting multi-query search"
        );

        let runs = backends
            .iter()
            .zip(shares)
            .map(|(id, share)| self.run_engine(id, &unique, share));
        let per_engine: Vec<HashMap<&str, Vec<SearchResult>>> = join_all(runs).await;

        let output = trimmed
            .iter()
            .map(|query| {
                let results: Vec<SearchResult> = per_engine
                    .iter()
                    .filter_map(|by_query| by_query.get(query))
                    .flatten()
                    .take(limit)
                    .cloned()
                    .collect();
                QueryResults::new(*query, backends.to_vec(), results)
            })
            .collect();

        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Multi-query search finished"
        );
        Ok(output)
    }

    /// Runs `queries` one after another on a single engine.
    async fn run_engine<'q>(
        &self,
        id: &str,
        queries: &[&'q str],
        limit: usize,
    ) -> HashMap<&'q str, Vec<SearchResult>> {
        let mut by_query = HashMap::with_capacity(queries.len());

        let backend = match self.registry.resolve(id) {
            Ok(backend) => backend,
            Err(e) => {
                warn!(error = %e, "Returning no results");
                return by_query;
            }
        };
        if limit == 0 {
            return by_query;
        }

        for &query in queries {
            let results = search_one(backend.as_ref(), query, limit).await;
            by_query.insert(query, results);
        }
        by_query
    }
}

async fn search_one(backend: &dyn SearchBackend, query: &str, limit: usize) -> Vec<SearchResult> {
    match backend.search(query, limit).await {
        Ok(mut results) => {
            results.truncate(limit);
            results
        }
        Err(e) => {
            warn!(engine = backend.id(), %query, error = %e, "Search failed");
            Vec::new()
        }
    }
}
