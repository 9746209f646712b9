//! Renderer abstraction used by the page pool.
//!
//! A renderer is a single browser process that can open pages. The pool only
//! talks to these traits, so the Chrome implementation (`headless` feature)
//! can be swapped for an in-memory fake in tests.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::pool::PoolConfig;
use crate::Result;

/// A renderer surface that can navigate and return its rendered HTML.
#[async_trait]
pub trait RenderPage: Send + Sync {
    /// Navigates to `url` and waits for the load event.
    async fn goto(&self, url: &str) -> Result<()>;

    /// Returns the current rendered HTML.
    async fn content(&self) -> Result<String>;

    /// Clears transient state (cookies, local and session storage) so the
    /// page can be reused by another caller.
    async fn reset(&self) -> Result<()>;

    /// Closes the page.
    async fn close(&self) -> Result<()>;
}

/// A running renderer process.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Opens a new blank page.
    async fn new_page(&self) -> Result<Box<dyn RenderPage>>;

    /// Terminates the renderer process.
    async fn close(&self) -> Result<()>;
}

/// A freshly launched renderer and its exit signal.
pub struct Launched {
    /// The renderer process.
    pub renderer: Arc<dyn Renderer>,
    /// Completes (or is dropped) when the renderer process goes away.
    pub exited: oneshot::Receiver<()>,
}

/// Starts renderer processes on demand.
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Launches a new renderer process.
    async fn launch(&self, config: &PoolConfig) -> Result<Launched>;
}
