//! Per-session crawl statistics
//!
//! Counters are updated by workers without locking and read as a snapshot.

use crate::state::StopReason;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of a session's statistics
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    /// Pages fetched successfully (one VisitedEvent each)
    pub pages_visited: u64,

    /// Fetch attempts that failed
    pub fetch_failures: u64,

    /// Failed fetches that were attempted again
    pub retries: u64,

    /// In-scope links reported across all visited pages
    pub links_discovered: u64,

    /// Links that won their claim and were pushed onto the frontier
    pub links_enqueued: u64,

    /// When the session was created
    pub created_at: DateTime<Utc>,

    /// When the session reached Terminated
    pub finished_at: Option<DateTime<Utc>>,

    /// Why the session stopped, once it has
    pub stop_reason: Option<StopReason>,
}

impl SessionStats {
    /// Wall-clock run time, up to now if the session is still live
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at.unwrap_or_else(Utc::now) - self.created_at
    }

    pub fn pages_per_second(&self) -> f64 {
        let seconds = self.elapsed().num_milliseconds() as f64 / 1000.0;
        if seconds > 0.0 {
            self.pages_visited as f64 / seconds
        } else {
            0.0
        }
    }
}

/// Lock-free counters shared by a session's workers
#[derive(Debug)]
pub struct StatsTracker {
    pages_visited: AtomicU64,
    fetch_failures: AtomicU64,
    retries: AtomicU64,
    links_discovered: AtomicU64,
    links_enqueued: AtomicU64,
    created_at: DateTime<Utc>,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self {
            pages_visited: AtomicU64::new(0),
            fetch_failures: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            links_discovered: AtomicU64::new(0),
            links_enqueued: AtomicU64::new(0),
            created_at: Utc::now(),
        }
    }

    // Relaxed everywhere: the counters are informational and never gate control flow.

    pub fn page_visited(&self, links: usize) {
        self.pages_visited.fetch_add(1, Ordering::Relaxed);
        self.links_discovered
            .fetch_add(links as u64, Ordering::Relaxed);
    }

    pub fn fetch_failed(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn retried(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn link_enqueued(&self) {
        self.links_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Takes a snapshot, stamped with the session's finish data if known
    pub fn snapshot(
        &self,
        finished_at: Option<DateTime<Utc>>,
        stop_reason: Option<StopReason>,
    ) -> SessionStats {
        SessionStats {
            pages_visited: self.pages_visited.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            links_discovered: self.links_discovered.load(Ordering::Relaxed),
            links_enqueued: self.links_enqueued.load(Ordering::Relaxed),
            created_at: self.created_at,
            finished_at,
            stop_reason,
        }
    }
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Prints statistics in a formatted manner
///
/// Goes to stderr so stdout stays a clean event stream.
pub fn print_statistics(key: &str, stats: &SessionStats) {
    eprintln!("=== Session {} ===\n", key);

    eprintln!("Overview:");
    eprintln!("  Pages visited: {}", stats.pages_visited);
    eprintln!("  Fetch failures: {}", stats.fetch_failures);
    eprintln!("  Retries: {}", stats.retries);
    eprintln!("  Links discovered: {}", stats.links_discovered);
    eprintln!("  Links enqueued: {}", stats.links_enqueued);
    eprintln!();

    eprintln!("Timing:");
    eprintln!("  Started: {}", stats.created_at.to_rfc3339());
    if let Some(finished) = stats.finished_at {
        eprintln!("  Finished: {}", finished.to_rfc3339());
    }
    eprintln!(
        "  Elapsed: {:.1}s ({:.2} pages/sec)",
        stats.elapsed().num_milliseconds() as f64 / 1000.0,
        stats.pages_per_second()
    );

    if let Some(reason) = stats.stop_reason {
        eprintln!("  Stop reason: {}", reason);
    }

    let attempts = stats.pages_visited + stats.fetch_failures;
    let success_rate = if attempts > 0 {
        (stats.pages_visited as f64 / attempts as f64) * 100.0
    } else {
        0.0
    };
    eprintln!(
        "\nSuccess Rate: {:.1}% ({} / {} fetch attempts)",
        success_rate, stats.pages_visited, attempts
    );
}
