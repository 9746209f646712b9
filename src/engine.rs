//! Search engine traits and configuration.
//!
//! [`Engine`] is the per-backend adapter: it knows how to build a query URL
//! and how to pull results out of a rendered page. [`SearchBackend`] is what
//! the orchestrator and fallback chain consume; [`PooledEngine`] bridges the
//! two by running an engine on a page borrowed from the [`PagePool`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::pool::{PageHandle, PagePool};
use crate::{Result, SearchResult};

/// Configuration for a search engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Display name of the engine.
    pub name: String,
    /// Identifier used in requests (e.g., "duckduckgo").
    pub shortcut: String,
    /// Health check timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Whether the engine is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_timeout() -> u64 {
    10
}

fn default_enabled() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            shortcut: String::new(),
            timeout: default_timeout(),
            enabled: true,
        }
    }
}

/// Trait for implementing search engine adapters.
///
/// Adapters are stateless apart from their configuration. Navigation and page
/// ownership are handled by [`PooledEngine`].
#[async_trait]
pub trait Engine: Send + Sync {
    /// Returns the engine configuration.
    fn config(&self) -> &EngineConfig;

    /// Builds the results page URL for `query`.
    fn build_query_url(&self, query: &str) -> Result<String>;

    /// Parses up to `limit` results out of a rendered results page.
    ///
    /// Fails with [`crate::SearchError::Captcha`] when the page is a bot
    /// challenge instead of results.
    fn parse_results(&self, html: &str, limit: usize) -> Result<Vec<SearchResult>>;

    /// URL probed by health checks.
    fn health_url(&self) -> &str;

    /// Extracts up to `limit` results from a page that already shows the
    /// results for a query.
    async fn extract_results(&self, page: &PageHandle, limit: usize) -> Result<Vec<SearchResult>> {
        let html = page.content().await?;
        self.parse_results(&html, limit)
    }

    /// Returns the engine name.
    fn name(&self) -> &str {
        &self.config().name
    }

    /// Returns the engine shortcut.
    fn shortcut(&self) -> &str {
        &self.config().shortcut
    }

    /// Returns whether the engine is enabled.
    fn is_enabled(&self) -> bool {
        self.config().enabled
    }
}

/// A searchable backend as seen by the orchestrator.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Identifier used to select this backend in requests.
    fn id(&self) -> &str;

    /// Human-readable name. Defaults to the id.
    fn name(&self) -> &str {
        self.id()
    }

    /// Runs one search returning at most `limit` results.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>>;

    /// Returns whether the backend looks reachable. Never fails.
    async fn health_check(&self) -> bool;
}

/// Runs an [`Engine`] on pages borrowed from a shared [`PagePool`].
pub struct PooledEngine<E> {
    engine: E,
    pool: PagePool,
    client: Client,
}

impl<E: Engine> PooledEngine<E> {
    /// Binds `engine` to `pool`. `client` is used for health checks only.
    pub fn new(engine: E, pool: PagePool, client: Client) -> Self {
        Self {
            engine,
            pool,
            client,
        }
    }
}

#[async_trait]
impl<E: Engine> SearchBackend for PooledEngine<E> {
    fn id(&self) -> &str {
        self.engine.shortcut()
    }

    fn name(&self) -> &str {
        self.engine.name()
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let url = self.engine.build_query_url(query)?;
        let page = self.pool.acquire().await?;
        debug!(engine = self.id(), page = page.id(), %url, "Navigating");

        let outcome = match page.goto(&url).await {
            Ok(()) => self.engine.extract_results(&page, limit).await,
            Err(e) => Err(e),
        };
        self.pool.release(page).await;

        let results = outcome?;
        debug!(engine = self.id(), count = results.len(), "Engine returned results");
        Ok(results)
    }

    async fn health_check(&self) -> bool {
        let timeout = Duration::from_secs(self.engine.config().timeout);
        let url = self.engine.health_url();
        match tokio::time::timeout(timeout, self.client.get(url).send()).await {
            Ok(Ok(response)) if response.status().is_success() => true,
            Ok(Ok(response)) => {
                warn!(engine = self.id(), status = %response.status(), "Health check failed");
                false
            }
            Ok(Err(e)) => {
                warn!(engine = self.id(), error = %e, "Health check failed");
                false
            }
            Err(_) => {
                warn!(engine = self.id(), "Health check timed out");
                false
            }
        }
    }
}
