//! Engine registry, resolved once at startup.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use crate::engine::{Engine, PooledEngine, SearchBackend};
use crate::engines::{Baidu, Bing, Brave, DuckDuckGo};
use crate::pool::PagePool;
use crate::{Result, SearchError};

/// Maps engine ids to backends, preserving registration order.
#[derive(Default, Clone)]
pub struct EngineRegistry {
    order: Vec<String>,
    backends: HashMap<String, Arc<dyn SearchBackend>>,
}

impl EngineRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the built-in engines on `pool`.
    pub fn with_defaults(pool: &PagePool) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("multisearch/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(15))
            .build()?;

        let mut registry = Self::new();
        registry.add_engine(Bing::new(), pool, &client);
        registry.add_engine(DuckDuckGo::new(), pool, &client);
        registry.add_engine(Brave::new(), pool, &client);
        registry.add_engine(Baidu::new(), pool, &client);
        Ok(registry)
    }

    /// Registers `engine` to run on pages from `pool`. Disabled engines are
    /// skipped.
    pub fn add_engine<E: Engine + 'static>(&mut self, engine: E, pool: &PagePool, client: &Client) {
        if !engine.is_enabled() {
            debug!(engine = engine.shortcut(), "Engine disabled, not registering");
            return;
        }
        self.register(Arc::new(PooledEngine::new(engine, pool.clone(), client.clone())));
    }

    /// Registers a backend, replacing any earlier backend with the same id.
    pub fn register(&mut self, backend: Arc<dyn SearchBackend>) {
        let id = backend.id().to_string();
        if self.backends.insert(id.clone(), backend).is_none() {
            self.order.push(id);
        }
    }

    /// Looks up a backend by id.
    pub fn get(&self, id: &str) -> Option<Arc<dyn SearchBackend>> {
        self.backends.get(id).cloned()
    }

    /// Looks up a backend by id, failing with
    /// [`SearchError::UnsupportedEngine`] if none is registered.
    pub fn resolve(&self, id: &str) -> Result<Arc<dyn SearchBackend>> {
        self.get(id)
            .ok_or_else(|| SearchError::UnsupportedEngine(id.to_string()))
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    /// Returns the number of registered engines.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
