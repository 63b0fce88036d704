//! Fetch worker loop
//!
//! Each session runs a fixed pool of these. A worker pops an item, waits out
//! the shared backoff, fetches, emits one `VisitedEvent` on success and claims
//! and enqueues the in-depth links it found. Fetch failures never leave the
//! worker: they only feed the backoff coordinator.

use crate::crawler::frontier::FrontierItem;
use crate::crawler::session::CrawlSession;
use crate::crawler::{Fetcher, PageFetch};
use crate::output::VisitedEvent;
use crate::state::StopReason;
use crate::url::{canonical_key, is_same_host};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// One fetch worker of a session
pub(crate) struct Worker {
    pub id: usize,
    pub session: Arc<CrawlSession>,
    pub fetcher: Arc<dyn Fetcher>,
    pub events: UnboundedSender<VisitedEvent>,
}

/// Marks a popped item as finished when dropped
///
/// Dropping also covers early returns and panics inside `process`, so the
/// outstanding count can never leak and stall drain detection.
struct InFlight<'a> {
    session: &'a CrawlSession,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.session.frontier().task_done() {
            tracing::info!("frontier drained, completing session");
            self.session.begin_stop(StopReason::Drained);
        }
    }
}

impl Worker {
    /// Runs until the session is cancelled or its frontier closes
    pub async fn run(self) {
        tracing::debug!("worker {} started", self.id);
        let cancel = self.session.cancel_token().clone();

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let item = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                item = self.session.frontier().pop_wait() => match item {
                    Some(item) => item,
                    None => break,
                },
            };

            let _in_flight = InFlight {
                session: &self.session,
            };
            self.process(&item).await;
        }

        tracing::debug!("worker {} exiting", self.id);
    }

    async fn process(&self, item: &FrontierItem) {
        let Some(page) = self.fetch_with_retry(item).await else {
            return;
        };

        let links = self.scope_links(page.links);
        let session = &self.session;

        let event = VisitedEvent::new(item.url.clone(), item.depth, links.clone());
        let emitted = session.frontier().if_open(|| {
            session.tracker().page_visited(links.len());
            // A dropped subscriber is not a reason to stop crawling
            let _ = self.events.send(event);
        });

        if emitted.is_none() {
            tracing::debug!("session stopping, discarding result for {}", item.url);
            return;
        }

        tracing::debug!(
            "visited {} (depth {}, {} links)",
            item.url,
            item.depth,
            links.len()
        );

        if item.depth >= session.max_depth() {
            return;
        }

        let next_depth = item.depth + 1;
        for link in &links {
            let canonical = match canonical_key(link) {
                Ok(canonical) => canonical,
                Err(e) => {
                    tracing::trace!("skipping link {}: {}", link, e);
                    continue;
                }
            };

            if !session.visited().try_claim(&canonical) {
                continue;
            }

            if session
                .frontier()
                .push(FrontierItem::new(canonical.as_str(), next_depth))
            {
                session.tracker().link_enqueued();
                tracing::debug!("enqueued {} at depth {}", canonical, next_depth);
            }
        }
    }

    /// Fetches `item`, re-attempting up to the configured retry count
    ///
    /// Every attempt waits out the backoff first and every outcome is
    /// reported to it. Returns `None` once attempts are exhausted or the
    /// session is cancelled between attempts.
    async fn fetch_with_retry(&self, item: &FrontierItem) -> Option<PageFetch> {
        let session = &self.session;
        let cancel = session.cancel_token();
        let attempts = session.retry_attempts().saturating_add(1);

        for attempt in 1..=attempts {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                _ = session.backoff().wait() => {}
            }

            match self.fetcher.fetch(&item.url).await {
                Ok(page) => {
                    session.backoff().report_success();
                    return Some(page);
                }
                Err(e) => {
                    tracing::warn!("fetch failed (attempt {}/{}): {}", attempt, attempts, e);
                    session.tracker().fetch_failed();
                    session.backoff().report_failure();

                    if attempt < attempts {
                        session.tracker().retried();
                    }
                }
            }
        }

        None
    }

    fn scope_links(&self, links: Vec<String>) -> Vec<String> {
        if !self.session.same_host_only() {
            return links;
        }

        let root = self.session.root_url();
        links
            .into_iter()
            .filter(|link| is_same_host(root, link))
            .collect()
    }
}
