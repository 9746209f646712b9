//! Error types for the search library.

use thiserror::Error;

/// Result type alias for search operations.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Errors that can occur during search operations.
#[derive(Error, Debug)]
pub enum SearchError {
    /// The page pool has been shut down and will not hand out pages.
    #[error("Page pool is shut down")]
    PoolShutdown,

    /// The renderer process exited while the caller was waiting for a page.
    #[error("Renderer disconnected while waiting for a page")]
    PoolDisconnected,

    /// Creating a new page failed.
    #[error("Failed to create page: {0}")]
    PageCreation(String),

    /// Launching or talking to the renderer process failed.
    #[error("Browser error: {0}")]
    Browser(String),

    /// Navigation failed or did not finish in time.
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// The engine served a bot challenge instead of results.
    #[error("Engine '{0}' returned a CAPTCHA page (bot detected)")]
    Captcha(String),

    /// An engine failed for some other engine-specific reason.
    #[error("Engine '{engine}' failed: {reason}")]
    Engine { engine: String, reason: String },

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// No engines configured.
    #[error("No search engines configured")]
    NoEngines,

    /// The requested engine id has no registered implementation.
    #[error("Unsupported engine: {0}")]
    UnsupportedEngine(String),

    /// Invalid query.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// URL parsing error.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}
