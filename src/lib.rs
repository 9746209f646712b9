//! # multisearch
//!
//! Multi-query, multi-engine web search over a shared headless browser.
//!
//! Search engines are scraped through rendered browser tabs. Tabs come from a
//! [`PagePool`] that bounds how many are open at once and recycles them
//! between searches:
//!
//! - `shared`: one tab, searches take turns
//! - `pool`: up to N tabs, extra searches wait in FIFO order
//! - `per-search`: a fresh tab for every search, closed afterwards
//!
//! A [`Search`] fans a batch of queries out over several engines at once,
//! splits the result limit fairly between engines and reassembles the
//! results per query, in the order the queries were given. A failing engine
//! only loses its own share of the results.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use multisearch::{ChromeLauncher, EngineRegistry, PagePool, PoolConfig, PoolMode, Search};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = PagePool::new(
//!         PoolConfig::new(PoolMode::Pool).with_capacity(3),
//!         Arc::new(ChromeLauncher::default()),
//!     )?;
//!     let search = Search::new(Arc::new(EngineRegistry::with_defaults(&pool)?));
//!
//!     let queries = vec!["rust async".to_string(), "tokio tutorial".to_string()];
//!     let engines = vec!["bing".to_string(), "duckduckgo".to_string()];
//!     for batch in search.search(&queries, &engines, 10).await? {
//!         println!("{}: {} results", batch.query, batch.total_results);
//!     }
//!
//!     pool.shutdown().await;
//!     Ok(())
//! }
//! ```

mod engine;
mod error;
mod fallback;
mod pool;
mod registry;
mod renderer;
mod request;
mod result;
mod search;

pub mod engines;

#[cfg(feature = "headless")]
mod browser;
#[cfg(feature = "headless")]
mod browser_setup;

pub use engine::{Engine, EngineConfig, PooledEngine, SearchBackend};
pub use error::{Result, SearchError};
pub use fallback::search_with_fallback;
pub use pool::{PageHandle, PagePool, PoolConfig, PoolMode, PoolStats};
pub use registry::EngineRegistry;
pub use renderer::{Launched, Launcher, RenderPage, Renderer};
pub use request::{SearchRequest, MAX_LIMIT, MAX_QUERIES};
pub use result::{QueryResults, SearchResult};
pub use search::{distribute_limit, Search};

#[cfg(feature = "headless")]
pub use browser::{ChromeConfig, ChromeLauncher};
#[cfg(feature = "headless")]
pub use browser_setup::detect_chrome;
