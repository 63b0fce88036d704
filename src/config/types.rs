use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Sumi-Stream
///
/// Every table is optional; missing keys fall back to the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub backoff: BackoffConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
}

/// Crawl session behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Number of fetch workers per session
    pub workers: u32,

    /// Whole-request timeout for a single fetch (milliseconds)
    pub request_timeout_ms: u64,

    /// Connection establishment timeout (milliseconds)
    pub connect_timeout_ms: u64,

    /// Extra attempts after a failed fetch (0 drops the URL on first failure)
    pub retry_attempts: u32,

    /// Only follow and report links on the root URL's host
    pub same_host_only: bool,

    /// How long a terminated session stays resolvable (milliseconds)
    pub terminated_retention_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            request_timeout_ms: 10_000,
            connect_timeout_ms: 5_000,
            retry_attempts: 0,
            same_host_only: true,
            terminated_retention_ms: 30_000,
        }
    }
}

impl CrawlerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn terminated_retention(&self) -> Duration {
        Duration::from_millis(self.terminated_retention_ms)
    }
}

/// Adaptive backoff configuration, shared by all workers of a session
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BackoffConfig {
    /// Delay applied before the first fetch (milliseconds)
    pub initial_delay_ms: u64,

    /// Lower bound for the delay (milliseconds)
    pub min_delay_ms: u64,

    /// Upper bound for the delay (milliseconds)
    pub max_delay_ms: u64,

    /// Multiplier applied on failure, must be > 1
    pub growth_factor: f64,

    /// Multiplier applied on success, must be in (0, 1)
    pub shrink_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 250,
            min_delay_ms: 100,
            max_delay_ms: 10_000,
            growth_factor: 2.0,
            shrink_factor: 0.8,
        }
    }
}

impl BackoffConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: String,

    /// Email address for crawler-related contact
    pub contact_email: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "SumiStream".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/sumi-stream".to_string(),
            contact_email: "crawler@example.com".to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the user agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}
