//! Chrome renderer for the page pool.
//!
//! This module is only available when the `headless` Cargo feature is enabled.
//! It launches one Chrome/Chromium process over the Chrome DevTools Protocol
//! and exposes its tabs as [`RenderPage`]s.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    ClearBrowserCookiesParams, SetUserAgentOverrideParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, warn};

use crate::browser_setup::detect_chrome;
use crate::pool::PoolConfig;
use crate::renderer::{Launched, Launcher, RenderPage, Renderer};
use crate::{Result, SearchError};

/// Realistic user agent; `--headless=new` otherwise advertises "HeadlessChrome".
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

const CLEAR_STORAGE_JS: &str =
    "(() => { try { localStorage.clear(); sessionStorage.clear(); } catch (e) {} return true; })()";

/// Process-level Chrome settings. Pool-level settings live in [`PoolConfig`].
#[derive(Debug, Clone, Default)]
pub struct ChromeConfig {
    /// Path to the Chrome/Chromium executable. If `None`, auto-detected.
    pub chrome_path: Option<PathBuf>,
    /// Proxy URL for the browser to use.
    pub proxy_url: Option<String>,
    /// User agent override. If `None`, a desktop Chrome UA is used.
    pub user_agent: Option<String>,
    /// Additional launch arguments for Chrome.
    pub launch_args: Vec<String>,
}

/// Launches Chrome processes for a [`crate::PagePool`].
pub struct ChromeLauncher {
    config: ChromeConfig,
}

impl ChromeLauncher {
    /// Creates a launcher with the given Chrome settings.
    pub fn new(config: ChromeConfig) -> Self {
        Self { config }
    }

    fn executable(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.config.chrome_path {
            return Ok(path.clone());
        }
        detect_chrome().ok_or_else(|| {
            SearchError::Browser(
                "No Chrome/Chromium installation found; set CHROME or pass --chrome-path"
                    .to_string(),
            )
        })
    }

    fn browser_config(&self, pool: &PoolConfig) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .chrome_executable(self.executable()?)
            .request_timeout(pool.navigation_timeout);

        builder = if pool.headless {
            builder.arg("--headless=new")
        } else {
            builder.with_head()
        };

        let user_agent = self
            .config
            .user_agent
            .as_deref()
            .unwrap_or(DEFAULT_USER_AGENT);
        builder = builder
            .arg(format!("--user-agent={}", user_agent))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg("--disable-default-apps")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--mute-audio")
            .arg("--no-first-run");

        if let Some(ref proxy) = self.config.proxy_url {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }
        for arg in &self.config.launch_args {
            builder = builder.arg(arg);
        }

        builder
            .build()
            .map_err(|e| SearchError::Browser(format!("Failed to build browser config: {}", e)))
    }
}

impl Default for ChromeLauncher {
    fn default() -> Self {
        Self::new(ChromeConfig::default())
    }
}

#[async_trait]
impl Launcher for ChromeLauncher {
    async fn launch(&self, config: &PoolConfig) -> Result<Launched> {
        let browser_config = self.browser_config(config)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(cdp_error("Failed to launch browser"))?;

        let (exited_tx, exited) = oneshot::channel();
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("Browser CDP handler error: {}", e);
                }
            }
            debug!("Browser CDP handler exited");
            let _ = exited_tx.send(());
        });

        Ok(Launched {
            renderer: Arc::new(ChromeRenderer {
                browser: Mutex::new(browser),
                user_agent: self.config.user_agent.clone(),
            }),
            exited,
        })
    }
}

struct ChromeRenderer {
    browser: Mutex<Browser>,
    user_agent: Option<String>,
}

#[async_trait]
impl Renderer for ChromeRenderer {
    async fn new_page(&self) -> Result<Box<dyn RenderPage>> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .map_err(cdp_error("Failed to open tab"))?;

        if let Some(ref ua) = self.user_agent {
            page.set_user_agent(SetUserAgentOverrideParams::new(ua.as_str()))
                .await
                .map_err(cdp_error("Failed to set user agent"))?;
        }

        Ok(Box::new(ChromePage { page }))
    }

    async fn close(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        browser
            .close()
            .await
            .map_err(cdp_error("Failed to close browser"))?;
        if let Err(e) = browser.wait().await {
            debug!("Waiting for browser exit failed: {}", e);
        }
        Ok(())
    }
}

struct ChromePage {
    page: Page,
}

#[async_trait]
impl RenderPage for ChromePage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .map_err(cdp_error("Navigation failed"))?;
        Ok(())
    }

    async fn content(&self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(cdp_error("Failed to get page content"))
    }

    async fn reset(&self) -> Result<()> {
        self.page
            .evaluate(CLEAR_STORAGE_JS)
            .await
            .map_err(cdp_error("Failed to clear storage"))?;
        self.page
            .execute(ClearBrowserCookiesParams::default())
            .await
            .map_err(cdp_error("Failed to clear cookies"))?;
        self.page
            .goto("about:blank")
            .await
            .map_err(cdp_error("Failed to blank page"))?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.page
            .clone()
            .close()
            .await
            .map_err(cdp_error("Failed to close tab"))
    }
}

fn cdp_error(context: &'static str) -> impl Fn(CdpError) -> SearchError {
    move |e| SearchError::Browser(format!("{}: {}", context, e))
}
