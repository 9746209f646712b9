//! Integration tests for the public API.
//!
//! Most tests drive the pool and orchestrator with in-memory backends or an
//! in-memory renderer. Tests against real engines need Chrome and network
//! access and are marked `#[ignore]`.
//!
//! Run those with: `cargo test --test integration -- --ignored`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use multisearch::engines::Bing;
use multisearch::{
    search_with_fallback, EngineRegistry, Launched, Launcher, PagePool, PoolConfig, PoolMode,
    RenderPage, Renderer, Result, Search, SearchBackend, SearchError, SearchRequest,
    SearchResult,
};

/// Backend that answers with `{id}-{query}-{n}` URLs, optionally failing.
struct EchoBackend {
    id: String,
    fail: bool,
    delay: Duration,
    calls: AtomicUsize,
}

impl EchoBackend {
    fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            fail: false,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            fail: true,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    fn slow(id: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            fail: false,
            delay,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl SearchBackend for EchoBackend {
    fn id(&self) -> &str {
        &self.id
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if self.fail {
            return Err(SearchError::Engine {
                engine: self.id.clone(),
                reason: "connection reset".to_string(),
            });
        }
        Ok((0..limit)
            .map(|n| {
                SearchResult::new(
                    &self.id,
                    format!("https://{}.test/{}/{}", self.id, query, n),
                    format!("{} {}", query, n),
                    "",
                )
            })
            .collect())
    }

    async fn health_check(&self) -> bool {
        !self.fail
    }
}

fn registry_of(backends: &[Arc<EchoBackend>]) -> Arc<EngineRegistry> {
    let mut registry = EngineRegistry::new();
    for backend in backends {
        registry.register(backend.clone());
    }
    Arc::new(registry)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_multi_query_keeps_caller_order() {
    let search = Search::new(registry_of(&[EchoBackend::new("a"), EchoBackend::new("b")]));

    let batches = search
        .search(&strings(&["zig", "rust", "zig"]), &strings(&["a", "b"]), 5)
        .await
        .unwrap();

    let queries: Vec<&str> = batches.iter().map(|b| b.query.as_str()).collect();
    assert_eq!(queries, ["zig", "rust", "zig"]);
    assert_eq!(batches[0].results, batches[2].results);

    // 5 split as [3, 2], engine order preserved.
    let engines: Vec<&str> = batches[1].results.iter().map(|r| r.engine.as_str()).collect();
    assert_eq!(engines, ["a", "a", "a", "b", "b"]);
    assert_eq!(batches[1].total_results, 5);
}

#[tokio::test]
async fn test_failing_engine_only_loses_its_share() {
    let broken = EchoBackend::failing("broken");
    let search = Search::new(registry_of(&[broken.clone(), EchoBackend::new("ok")]));

    let batches = search
        .search(&strings(&["rust", "tokio"]), &strings(&["broken", "ok"]), 4)
        .await
        .unwrap();

    assert_eq!(broken.calls.load(Ordering::SeqCst), 2);
    for batch in &batches {
        assert_eq!(batch.total_results, 2);
        assert!(batch.results.iter().all(|r| r.engine == "ok"));
        assert_eq!(batch.backends, ["broken", "ok"]);
    }
}

#[tokio::test]
async fn test_engines_run_concurrently() {
    let delay = Duration::from_millis(200);
    let search = Search::new(registry_of(&[
        EchoBackend::slow("a", delay),
        EchoBackend::slow("b", delay),
        EchoBackend::slow("c", delay),
    ]));

    let start = tokio::time::Instant::now();
    search
        .search(&strings(&["rust"]), &strings(&["a", "b", "c"]), 3)
        .await
        .unwrap();
    assert!(start.elapsed() < delay * 3);
}

#[tokio::test]
async fn test_run_validates_request() {
    let search = Search::new(registry_of(&[EchoBackend::new("a")]));

    let err = search
        .run(&SearchRequest::new(["rust"], 0, ["a"]))
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::InvalidQuery(_)));

    let err = search
        .run(&SearchRequest::new(["rust"], 10, Vec::<String>::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::NoEngines));
}

#[tokio::test]
async fn test_query_results_json_shape() {
    let search = Search::new(registry_of(&[EchoBackend::new("a")]));
    let batches = search
        .run(&SearchRequest::new(["rust"], 1, ["a"]))
        .await
        .unwrap();

    let json = serde_json::to_value(&batches).unwrap();
    assert_eq!(json[0]["query"], "rust");
    assert_eq!(json[0]["totalResults"], 1);
    assert_eq!(json[0]["backends"][0], "a");
    assert_eq!(json[0]["results"][0]["url"], "https://a.test/rust/0");
    assert_eq!(json[0]["results"][0]["source"], "a.test");
}

#[tokio::test]
async fn test_fallback_chain_through_public_api() {
    let first = EchoBackend::failing("first");
    let second = EchoBackend::new("second");
    let third = EchoBackend::new("third");
    let chain: Vec<Arc<dyn SearchBackend>> = vec![first.clone(), second.clone(), third.clone()];

    let results = search_with_fallback(&chain, "rust", 2).await.unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.engine == "second"));
    assert_eq!(third.calls.load(Ordering::SeqCst), 0);
}

/// In-memory renderer that serves a Bing-like results page for any URL.
#[derive(Default)]
struct StaticSite {
    launches: AtomicUsize,
    pages: AtomicUsize,
    visited: Mutex<Vec<String>>,
}

struct StaticLauncher(Arc<StaticSite>);
struct StaticRenderer(Arc<StaticSite>);
struct StaticPage {
    site: Arc<StaticSite>,
    url: Mutex<String>,
}

#[async_trait]
impl Launcher for StaticLauncher {
    async fn launch(&self, _config: &PoolConfig) -> Result<Launched> {
        self.0.launches.fetch_add(1, Ordering::SeqCst);
        let (exit_tx, exited) = oneshot::channel();
        // Keep the renderer alive for the whole test.
        std::mem::forget(exit_tx);
        Ok(Launched {
            renderer: Arc::new(StaticRenderer(self.0.clone())),
            exited,
        })
    }
}

#[async_trait]
impl Renderer for StaticRenderer {
    async fn new_page(&self) -> Result<Box<dyn RenderPage>> {
        self.0.pages.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StaticPage {
            site: self.0.clone(),
            url: Mutex::new("about:blank".to_string()),
        }))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl RenderPage for StaticPage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.site.visited.lock().push(url.to_string());
        *self.url.lock() = url.to_string();
        Ok(())
    }

    async fn content(&self) -> Result<String> {
        let url = self.url.lock().clone();
        Ok(format!(
            r#"<html><body><ol id="b_results">
                <li class="b_algo">
                    <h2><a href="https://www.rust-lang.org/">Rust</a></h2>
                    <div class="b_caption"><p>Loaded from {}</p></div>
                </li>
                <li class="b_algo">
                    <h2><a href="https://crates.io/">crates.io</a></h2>
                </li>
            </ol></body></html>"#,
            url
        ))
    }

    async fn reset(&self) -> Result<()> {
        *self.url.lock() = "about:blank".to_string();
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_bing_on_shared_page_pool() {
    let site = Arc::new(StaticSite::default());
    let pool = PagePool::new(
        PoolConfig::new(PoolMode::Shared),
        Arc::new(StaticLauncher(site.clone())),
    )
    .unwrap();

    let mut registry = EngineRegistry::new();
    registry.add_engine(Bing::new(), &pool, &reqwest::Client::new());
    let search = Search::new(Arc::new(registry));

    let batches = search
        .search(&strings(&["rust lang", "crates"]), &strings(&["bing"]), 2)
        .await
        .unwrap();

    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].results[0].title, "Rust");
    assert_eq!(batches[0].results[0].source, "rust-lang.org");
    assert!(batches[0].results[0].description.contains("q=rust+lang"));
    assert_eq!(batches[1].results[1].url, "https://crates.io/");

    // One renderer, one reused page, one navigation per query.
    assert_eq!(site.launches.load(Ordering::SeqCst), 1);
    assert_eq!(site.pages.load(Ordering::SeqCst), 1);
    assert_eq!(site.visited.lock().len(), 2);

    let stats = pool.stats();
    assert_eq!(stats.live, 1);
    assert_eq!(stats.idle, 1);
    pool.shutdown().await;

    let err = pool.acquire().await.unwrap_err();
    assert!(matches!(err, SearchError::PoolShutdown));
}

#[tokio::test]
async fn test_per_search_pool_opens_page_per_search() {
    let site = Arc::new(StaticSite::default());
    let pool = PagePool::new(
        PoolConfig::new(PoolMode::PerSearch),
        Arc::new(StaticLauncher(site.clone())),
    )
    .unwrap();

    let mut registry = EngineRegistry::new();
    registry.add_engine(Bing::new(), &pool, &reqwest::Client::new());
    let search = Search::new(Arc::new(registry));

    search
        .search(&strings(&["a", "b", "c"]), &strings(&["bing"]), 1)
        .await
        .unwrap();

    assert_eq!(site.pages.load(Ordering::SeqCst), 3);
    assert_eq!(pool.stats().idle, 0);
    pool.shutdown().await;
}

#[cfg(feature = "headless")]
mod live {
    use super::*;
    use multisearch::ChromeLauncher;

    async fn live_search(engine: &str, query: &str) -> usize {
        let pool = PagePool::new(
            PoolConfig::new(PoolMode::Pool).with_capacity(2),
            Arc::new(ChromeLauncher::default()),
        )
        .unwrap();
        let registry = EngineRegistry::with_defaults(&pool).unwrap();
        let search = Search::new(Arc::new(registry));

        let batches = search
            .search(&strings(&[query]), &strings(&[engine]), 5)
            .await
            .unwrap();
        for (i, result) in batches[0].results.iter().enumerate() {
            println!("  {}. {} - {}", i + 1, result.title, result.url);
        }
        pool.shutdown().await;
        batches[0].total_results
    }

    #[tokio::test]
    #[ignore]
    async fn test_bing_live() {
        assert!(live_search("bing", "rust programming").await > 0);
    }

    #[tokio::test]
    #[ignore]
    async fn test_duckduckgo_live() {
        assert!(live_search("duckduckgo", "rust programming").await > 0);
    }

    #[tokio::test]
    #[ignore]
    async fn test_brave_live() {
        assert!(live_search("brave", "rust programming").await > 0);
    }

    #[tokio::test]
    #[ignore]
    async fn test_baidu_live() {
        let count = live_search("baidu", "Rust 编程语言").await;
        println!("Baidu returned {} results", count);
    }
}
