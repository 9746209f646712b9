//! Page pool over a single shared renderer process.
//!
//! The renderer is launched lazily on the first `acquire()`. Pages are handed
//! out under one of three policies ([`PoolMode`]):
//!
//! - `shared`: one page, serialized access, reset between callers
//! - `pool`: up to `capacity` reusable pages
//! - `per-search`: a fresh page per caller, closed on release
//!
//! Callers that cannot be served immediately queue in strict FIFO order and
//! stay queued until a page is released, the renderer dies, or the pool shuts
//! down. Waiting is unbounded.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tracing::{debug, info, warn};

use crate::renderer::{Launched, Launcher, RenderPage, Renderer};
use crate::{Result, SearchError};

/// How long `shutdown()` waits for the renderer process to exit.
const RENDERER_CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Page allocation policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PoolMode {
    /// A single page shared by all callers, one at a time.
    #[default]
    Shared,
    /// A bounded set of reusable pages.
    Pool,
    /// A fresh page for every caller, never reused.
    PerSearch,
}

impl fmt::Display for PoolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Shared => "shared",
            Self::Pool => "pool",
            Self::PerSearch => "per-search",
        };
        f.write_str(name)
    }
}

impl FromStr for PoolMode {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shared" => Ok(Self::Shared),
            "pool" => Ok(Self::Pool),
            "per-search" | "per_search" => Ok(Self::PerSearch),
            other => Err(SearchError::Config(format!("unknown pool mode '{}'", other))),
        }
    }
}

/// Configuration for the page pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Allocation policy.
    pub mode: PoolMode,
    /// Maximum number of live pages. Only used in `pool` mode.
    pub capacity: usize,
    /// Upper bound for a single page navigation.
    pub navigation_timeout: Duration,
    /// Whether to run the renderer without a visible window.
    pub headless: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            mode: PoolMode::Shared,
            capacity: 4,
            navigation_timeout: Duration::from_secs(30),
            headless: true,
        }
    }
}

impl PoolConfig {
    /// Creates a configuration for the given mode with default settings.
    pub fn new(mode: PoolMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Sets the pool capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the navigation timeout.
    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// Sets headless mode.
    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Checks the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(SearchError::Config("capacity must be at least 1".into()));
        }
        if self.navigation_timeout.is_zero() {
            return Err(SearchError::Config(
                "navigation timeout must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Number of pages that may exist at once under this mode.
    fn effective_capacity(&self) -> usize {
        match self.mode {
            PoolMode::Shared => 1,
            PoolMode::Pool => self.capacity,
            PoolMode::PerSearch => usize::MAX,
        }
    }
}

/// Point-in-time view of the pool bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub mode: PoolMode,
    /// Pages that exist (idle, in use, or being created).
    pub live: usize,
    pub idle: usize,
    pub waiting: usize,
    /// Whether a renderer process is currently running.
    pub launched: bool,
}

/// Exclusive handle to a pooled page.
///
/// Return it with [`PagePool::release`]. A handle that is dropped instead is
/// closed in the background and its slot is freed.
pub struct PageHandle {
    id: u64,
    generation: u64,
    navigation_timeout: Duration,
    page: Option<Box<dyn RenderPage>>,
    pool: Weak<PoolInner>,
}

impl PageHandle {
    /// Stable identifier of the underlying page. Reused pages keep their id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Navigates to `url`, bounded by the pool's navigation timeout.
    pub async fn goto(&self, url: &str) -> Result<()> {
        let page = self.page()?;
        match tokio::time::timeout(self.navigation_timeout, page.goto(url)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(SearchError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(SearchError::Navigation {
                url: url.to_string(),
                reason: format!("timed out after {:?}", self.navigation_timeout),
            }),
        }
    }

    /// Returns the rendered HTML of the current document.
    pub async fn content(&self) -> Result<String> {
        self.page()?.content().await
    }

    fn page(&self) -> Result<&dyn RenderPage> {
        self.page
            .as_deref()
            .ok_or_else(|| SearchError::Browser("page handle already released".into()))
    }

    fn into_parts(mut self) -> Option<(u64, u64, Box<dyn RenderPage>)> {
        self.page.take().map(|page| (self.id, self.generation, page))
    }
}

impl fmt::Debug for PageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageHandle")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .finish()
    }
}

impl Drop for PageHandle {
    fn drop(&mut self) {
        if let Some(page) = self.page.take() {
            if let Some(pool) = self.pool.upgrade() {
                pool.forget(self.id, self.generation, page);
            }
        }
    }
}

type Waiter = oneshot::Sender<Result<PageHandle>>;

struct IdlePage {
    id: u64,
    page: Box<dyn RenderPage>,
}

struct PoolState {
    renderer: Option<Arc<dyn Renderer>>,
    /// Bumped every time the renderer dies; pages from older generations are stale.
    generation: u64,
    idle: VecDeque<IdlePage>,
    live: usize,
    waiters: VecDeque<Waiter>,
    closed: bool,
}

impl PoolState {
    fn prune_waiters(&mut self) {
        self.waiters.retain(|tx| !tx.is_closed());
    }
}

struct PoolInner {
    config: PoolConfig,
    launcher: Arc<dyn Launcher>,
    state: Mutex<PoolState>,
    launch_lock: AsyncMutex<()>,
    next_id: AtomicU64,
}

/// Pool of renderer pages. Cheap to clone; clones share the same pool.
#[derive(Clone)]
pub struct PagePool {
    inner: Arc<PoolInner>,
}

impl PagePool {
    /// Creates a pool. No renderer is launched until the first `acquire()`.
    pub fn new(config: PoolConfig, launcher: Arc<dyn Launcher>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(PoolInner {
                config,
                launcher,
                state: Mutex::new(PoolState {
                    renderer: None,
                    generation: 0,
                    idle: VecDeque::new(),
                    live: 0,
                    waiters: VecDeque::new(),
                    closed: false,
                }),
                launch_lock: AsyncMutex::new(()),
                next_id: AtomicU64::new(1),
            }),
        })
    }

    /// Returns the pool configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Returns the current bookkeeping counters.
    pub fn stats(&self) -> PoolStats {
        let state = self.inner.state.lock();
        PoolStats {
            mode: self.inner.config.mode,
            live: state.live,
            idle: state.idle.len(),
            waiting: state.waiters.iter().filter(|tx| !tx.is_closed()).count(),
            launched: state.renderer.is_some(),
        }
    }

    /// Acquires a page, waiting in FIFO order if none is available.
    pub async fn acquire(&self) -> Result<PageHandle> {
        let inner = &self.inner;

        if inner.config.mode == PoolMode::PerSearch {
            let generation = {
                let state = inner.state.lock();
                if state.closed {
                    return Err(SearchError::PoolShutdown);
                }
                state.generation
            };
            return inner.open_page(generation).await;
        }

        enum Next {
            Ready(PageHandle),
            Create(u64),
            Wait(oneshot::Receiver<Result<PageHandle>>),
        }

        let next = {
            let mut state = inner.state.lock();
            if state.closed {
                return Err(SearchError::PoolShutdown);
            }
            state.prune_waiters();

            if !state.waiters.is_empty() {
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                Next::Wait(rx)
            } else if let Some(idle) = state.idle.pop_front() {
                Next::Ready(inner.wrap(idle.id, state.generation, idle.page))
            } else if state.live < inner.config.effective_capacity() {
                state.live += 1;
                Next::Create(state.generation)
            } else {
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                Next::Wait(rx)
            }
        };

        match next {
            Next::Ready(handle) => {
                debug!(page = handle.id, "reusing idle page");
                Ok(handle)
            }
            Next::Create(generation) => {
                let mut slot = Reservation {
                    inner: Arc::clone(inner),
                    generation,
                    armed: true,
                };
                let handle = inner.open_page(generation).await?;
                slot.armed = false;
                Ok(handle)
            }
            Next::Wait(rx) => {
                debug!("no page available, waiting");
                match rx.await {
                    Ok(result) => result,
                    Err(_) => Err(SearchError::PoolDisconnected),
                }
            }
        }
    }

    /// Returns a page to the pool.
    ///
    /// The handle stays armed until the page has been reset or closed, so a
    /// caller cancelled mid-release still gives its slot back through drop.
    pub async fn release(&self, handle: PageHandle) {
        let inner = &self.inner;
        let Ok(page) = handle.page() else {
            return;
        };

        if inner.config.mode == PoolMode::PerSearch || inner.is_stale(handle.generation) {
            if let Err(e) = page.close().await {
                debug!(page = handle.id, error = %e, "Failed to close page");
            }
            drop(handle.into_parts());
            return;
        }

        match page.reset().await {
            Ok(()) => {
                let Some((id, generation, page)) = handle.into_parts() else {
                    return;
                };
                if let Some(page) = inner.hand_off(id, generation, page) {
                    inner.retire(id, page, false);
                }
            }
            Err(e) => {
                warn!(page = handle.id, error = %e, "page reset failed, closing it");
                if let Err(e) = page.close().await {
                    debug!(page = handle.id, error = %e, "Failed to close page");
                }
                let Some((_, generation, _closed)) = handle.into_parts() else {
                    return;
                };
                if inner.release_slot(generation) {
                    inner.spawn_serve();
                }
            }
        }
    }

    /// Shuts the pool down: fails all waiters, closes idle pages and stops
    /// the renderer. Calling it again is a no-op.
    pub async fn shutdown(&self) {
        let (waiters, idle, renderer) = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            state.live = 0;
            (
                std::mem::take(&mut state.waiters),
                std::mem::take(&mut state.idle),
                state.renderer.take(),
            )
        };

        for tx in waiters {
            let _ = tx.send(Err(SearchError::PoolShutdown));
        }
        for idle in idle {
            close_quietly(idle.id, idle.page).await;
        }
        if let Some(renderer) = renderer {
            close_renderer(renderer).await;
        }
        info!("Page pool shut down");
    }
}

/// Holds a counted slot while a page is being created. Dropping it without
/// disarming gives the slot back.
struct Reservation {
    inner: Arc<PoolInner>,
    generation: u64,
    armed: bool,
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.armed && self.inner.release_slot(self.generation) {
            self.inner.spawn_serve();
        }
    }
}

impl PoolInner {
    fn wrap(self: &Arc<Self>, id: u64, generation: u64, page: Box<dyn RenderPage>) -> PageHandle {
        PageHandle {
            id,
            generation,
            navigation_timeout: self.config.navigation_timeout,
            page: Some(page),
            pool: Arc::downgrade(self),
        }
    }

    fn is_stale(&self, generation: u64) -> bool {
        let state = self.state.lock();
        state.closed || state.generation != generation
    }

    /// Returns the running renderer, launching one if needed.
    async fn renderer(self: &Arc<Self>) -> Result<(Arc<dyn Renderer>, u64)> {
        if let Some(running) = self.running()? {
            return Ok(running);
        }

        let _launching = self.launch_lock.lock().await;
        if let Some(running) = self.running()? {
            return Ok(running);
        }

        info!(
            mode = %self.config.mode,
            headless = self.config.headless,
            "Launching renderer"
        );
        let Launched { renderer, exited } = self.launcher.launch(&self.config).await?;

        let generation = {
            let mut state = self.state.lock();
            if state.closed {
                None
            } else {
                state.renderer = Some(Arc::clone(&renderer));
                Some(state.generation)
            }
        };
        let Some(generation) = generation else {
            close_renderer(renderer).await;
            return Err(SearchError::PoolShutdown);
        };

        self.watch_exit(exited, generation);
        Ok((renderer, generation))
    }

    fn running(&self) -> Result<Option<(Arc<dyn Renderer>, u64)>> {
        let state = self.state.lock();
        if state.closed {
            return Err(SearchError::PoolShutdown);
        }
        Ok(state
            .renderer
            .as_ref()
            .map(|r| (Arc::clone(r), state.generation)))
    }

    fn watch_exit(self: &Arc<Self>, exited: oneshot::Receiver<()>, generation: u64) {
        let pool = Arc::downgrade(self);
        tokio::spawn(async move {
            let _ = exited.await;
            if let Some(pool) = pool.upgrade() {
                pool.handle_disconnect(generation);
            }
        });
    }

    /// Resets the pool after the renderer of `generation` went away.
    fn handle_disconnect(&self, generation: u64) {
        let (waiters, idle) = {
            let mut state = self.state.lock();
            if state.closed || state.generation != generation {
                return;
            }
            state.generation += 1;
            state.renderer = None;
            state.live = 0;
            (
                std::mem::take(&mut state.waiters),
                std::mem::take(&mut state.idle),
            )
        };

        warn!(
            waiters = waiters.len(),
            idle = idle.len(),
            "Renderer disconnected, resetting page pool"
        );
        for tx in waiters {
            let _ = tx.send(Err(SearchError::PoolDisconnected));
        }
    }

    /// Opens a page on the renderer of `generation`.
    async fn open_page(self: &Arc<Self>, generation: u64) -> Result<PageHandle> {
        let (renderer, current) = self.renderer().await?;
        if current != generation {
            return Err(SearchError::PoolDisconnected);
        }

        let page = renderer
            .new_page()
            .await
            .map_err(|e| SearchError::PageCreation(e.to_string()))?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(page = id, "Opened page");
        Ok(self.wrap(id, generation, page))
    }

    /// Gives a reset page to the oldest live waiter, or parks it as idle.
    /// Returns the page if it should be closed instead.
    fn hand_off(
        self: &Arc<Self>,
        id: u64,
        generation: u64,
        mut page: Box<dyn RenderPage>,
    ) -> Option<Box<dyn RenderPage>> {
        let mut state = self.state.lock();
        if state.closed || state.generation != generation {
            return Some(page);
        }

        while let Some(tx) = state.waiters.pop_front() {
            if tx.is_closed() {
                continue;
            }
            match tx.send(Ok(self.wrap(id, generation, page))) {
                Ok(()) => {
                    debug!(page = id, "handed page to waiter");
                    return None;
                }
                Err(returned) => match returned.ok().and_then(|mut h| h.page.take()) {
                    Some(back) => page = back,
                    None => return None,
                },
            }
        }

        if state.idle.len() < self.config.effective_capacity() {
            state.idle.push_back(IdlePage { id, page });
            None
        } else {
            state.live = state.live.saturating_sub(1);
            Some(page)
        }
    }

    /// Frees one counted slot. Returns true if waiters could now be served.
    fn release_slot(&self, generation: u64) -> bool {
        let mut state = self.state.lock();
        if state.closed || state.generation != generation {
            return false;
        }
        state.live = state.live.saturating_sub(1);
        state.prune_waiters();
        !state.waiters.is_empty()
    }

    /// Creates pages for queued waiters while capacity allows.
    async fn serve_waiters(self: Arc<Self>) {
        loop {
            let (tx, generation) = {
                let mut state = self.state.lock();
                if state.closed {
                    return;
                }
                state.prune_waiters();
                if state.live >= self.config.effective_capacity() {
                    return;
                }
                let Some(tx) = state.waiters.pop_front() else {
                    return;
                };
                state.live += 1;
                (tx, state.generation)
            };

            match self.open_page(generation).await {
                Ok(handle) => {
                    if let Err(Ok(handle)) = tx.send(Ok(handle)) {
                        if let Some((id, generation, page)) = handle.into_parts() {
                            if let Some(page) = self.hand_off(id, generation, page) {
                                close_quietly(id, page).await;
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to create page for waiter");
                    self.release_slot(generation);
                    let _ = tx.send(Err(e));
                }
            }
        }
    }

    fn spawn_serve(self: &Arc<Self>) {
        match tokio::runtime::Handle::try_current() {
            Ok(rt) => {
                rt.spawn(Arc::clone(self).serve_waiters());
            }
            Err(_) => debug!("No runtime available to serve queued page requests"),
        }
    }

    /// Bookkeeping for a handle dropped without `release()`.
    fn forget(self: &Arc<Self>, id: u64, generation: u64, page: Box<dyn RenderPage>) {
        debug!(page = id, "page handle dropped without release");
        let serve = self.config.mode != PoolMode::PerSearch && self.release_slot(generation);
        self.retire(id, page, serve);
    }

    /// Closes an uncounted page in the background, then serves waiters if
    /// `serve` is set.
    fn retire(self: &Arc<Self>, id: u64, page: Box<dyn RenderPage>, serve: bool) {
        match tokio::runtime::Handle::try_current() {
            Ok(rt) => {
                let pool = Arc::clone(self);
                rt.spawn(async move {
                    close_quietly(id, page).await;
                    if serve {
                        pool.serve_waiters().await;
                    }
                });
            }
            Err(_) => debug!(page = id, "No runtime available, page left to the renderer"),
        }
    }
}

async fn close_quietly(id: u64, page: Box<dyn RenderPage>) {
    if let Err(e) = page.close().await {
        debug!(page = id, error = %e, "Failed to close page");
    }
}

async fn close_renderer(renderer: Arc<dyn Renderer>) {
    match tokio::time::timeout(RENDERER_CLOSE_GRACE, renderer.close()).await {
        Ok(Ok(())) => debug!("Renderer closed"),
        Ok(Err(e)) => warn!(error = %e, "Renderer close failed"),
        Err(_) => warn!(
            "Renderer did not exit within {:?}, continuing",
            RENDERER_CLOSE_GRACE
        ),
    }
}
