//! Visited registry: the single deduplication gate of a session
//!
//! Keys are canonical URL strings (see `crate::url::canonicalize`). A mutex
//! around a `HashSet` gives the atomic test-and-insert a claim needs.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Set of URLs already enqueued or fetched by a session
#[derive(Debug, Default)]
pub struct VisitedRegistry {
    claimed: Mutex<HashSet<String>>,
}

impl VisitedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.claimed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims a canonical URL
    ///
    /// Returns true only to the first caller for a given URL; every later call
    /// for the same URL returns false for the lifetime of the registry.
    pub fn try_claim(&self, url: &str) -> bool {
        let mut claimed = self.lock();
        if claimed.contains(url) {
            return false;
        }
        claimed.insert(url.to_string())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.lock().contains(url)
    }

    /// Number of claimed URLs
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
