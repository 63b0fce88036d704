//! Sumi-Stream: a live, session-based domain crawler
//!
//! This crate crawls a web domain from a root URL up to a bounded depth and
//! reports every visited page, together with its outbound links, to the caller
//! as it happens. Many crawl sessions can run side by side; each one owns its
//! own frontier, visited set, adaptive backoff and pool of fetch workers.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Top-level error type for the binary and setup paths
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Errors that can cross the session boundary
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Session not found: {key}")]
    NotFound { key: String },

    #[error("Event stream for session {key} has already been taken")]
    AlreadySubscribed { key: String },

    #[error("Session registry is shutting down")]
    ShuttingDown,
}

/// Rejections of a session request, raised before any worker starts
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid root URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Unsupported URL scheme '{scheme}' (only http and https are crawled)")]
    UnsupportedScheme { scheme: String },

    #[error("Root URL '{url}' has no host")]
    MissingHost { url: String },

    #[error("max depth must be >= 0, got {0}")]
    NegativeDepth(i64),
}

/// Per-URL fetch failures
///
/// These never leave a worker: they are absorbed as backoff pressure.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Expected HTML from {url}, got '{content_type}'")]
    NotHtml { url: String, content_type: String },

    #[error("Failed to read body of {url}: {message}")]
    Body { url: String, message: String },
}

impl FetchError {
    /// The URL the failed fetch was aimed at
    pub fn url(&self) -> &str {
        match self {
            Self::Transport { url, .. }
            | Self::Timeout { url }
            | Self::Status { url, .. }
            | Self::NotHtml { url, .. }
            | Self::Body { url, .. } => url,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Sumi-Stream operations
pub type Result<T> = std::result::Result<T, StreamError>;

/// Result type alias for session operations
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlSession, Fetcher, HttpFetcher, PageFetch, SessionKey, SessionRegistry};
pub use output::{SessionStats, VisitedEvent};
pub use state::{SessionState, StopReason};
