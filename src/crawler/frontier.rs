//! Frontier queue shared by a session's workers
//!
//! A mutex-guarded FIFO with a close signal. The count of popped-but-unfinished
//! items lives under the same mutex, so popping an item and counting it as
//! outstanding is one atomic step, and so is finishing an item and checking
//! whether the crawl has drained. Idle workers park on a `Notify` and are woken
//! by `push` (one waiter) or `close` (all waiters).

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// A URL waiting to be fetched, with its hop count from the root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierItem {
    pub url: String,
    pub depth: u32,
}

impl FrontierItem {
    pub fn new(url: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            depth,
        }
    }
}

#[derive(Debug, Default)]
struct FrontierInner {
    queue: VecDeque<FrontierItem>,
    outstanding: usize,
    closed: bool,
}

/// Concurrent FIFO of frontier items with drain detection
#[derive(Debug, Default)]
pub struct Frontier {
    inner: Mutex<FrontierInner>,
    notify: Notify,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FrontierInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an item and wakes one idle worker
    ///
    /// Returns false (and drops the item) if the queue is already closed.
    pub fn push(&self, item: FrontierItem) -> bool {
        {
            let mut inner = self.lock();
            if inner.closed {
                return false;
            }
            tracing::trace!("frontier push: {} (depth {})", item.url, item.depth);
            inner.queue.push_back(item);
        }
        self.notify.notify_one();
        true
    }

    /// Removes the oldest item without waiting
    ///
    /// A returned item counts as outstanding until `task_done` is called.
    pub fn try_pop(&self) -> Option<FrontierItem> {
        let mut inner = self.lock();
        if inner.closed {
            return None;
        }
        let item = inner.queue.pop_front()?;
        inner.outstanding += 1;
        Some(item)
    }

    /// Waits for an item, or returns `None` once the queue is closed
    ///
    /// A returned item counts as outstanding until `task_done` is called.
    pub async fn pop_wait(&self) -> Option<FrontierItem> {
        loop {
            // Register interest before inspecting the queue so a push or close
            // that lands between the check and the await is not missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut inner = self.lock();
                if inner.closed {
                    return None;
                }
                if let Some(item) = inner.queue.pop_front() {
                    inner.outstanding += 1;
                    return Some(item);
                }
            }

            notified.await;
        }
    }

    /// Marks one popped item as fully processed
    ///
    /// Returns true when this call drained the frontier: the queue is empty and
    /// nothing is outstanding. Exactly one caller observes the drain.
    pub fn task_done(&self) -> bool {
        let mut inner = self.lock();
        inner.outstanding = inner.outstanding.saturating_sub(1);
        !inner.closed && inner.outstanding == 0 && inner.queue.is_empty()
    }

    /// Closes the queue, discarding pending items and releasing every waiter
    ///
    /// Returns true only for the call that actually closed it.
    pub fn close(&self) -> bool {
        let was_open = {
            let mut inner = self.lock();
            let was_open = !inner.closed;
            inner.closed = true;
            let discarded = inner.queue.len();
            inner.queue.clear();
            if was_open && discarded > 0 {
                tracing::debug!("frontier closed with {} pending items discarded", discarded);
            }
            was_open
        };
        self.notify.notify_waiters();
        was_open
    }

    /// Runs `f` only while the queue is open
    ///
    /// `close` takes the same lock, so anything `f` does is ordered strictly
    /// before the close. Workers emit their events through this.
    pub fn if_open<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        let inner = self.lock();
        if inner.closed {
            return None;
        }
        Some(f())
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of items waiting to be popped
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// Items popped but not yet marked done
    pub fn outstanding(&self) -> usize {
        self.lock().outstanding
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_fifo_order() {
        let frontier = Frontier::new();
        frontier.push(FrontierItem::new("https://example.test/1", 0));
        frontier.push(FrontierItem::new("https://example.test/2", 1));

        assert_eq!(frontier.len(), 2);
        assert_eq!(frontier.try_pop().unwrap().url, "https://example.test/1");
        assert_eq!(frontier.try_pop().unwrap().url, "https://example.test/2");
        assert!(frontier.try_pop().is_none());
        assert_eq!(frontier.outstanding(), 2);
    }

    #[test]
    fn test_task_done_reports_drain_once() {
        let frontier = Frontier::new();
        frontier.push(FrontierItem::new("a", 0));
        frontier.push(FrontierItem::new("b", 0));

        let _a = frontier.try_pop().unwrap();
        // Queue still holds "b"
        assert!(!frontier.task_done());

        let _b = frontier.try_pop().unwrap();
        assert!(frontier.task_done());
        assert_eq!(frontier.outstanding(), 0);
    }

    #[test]
    fn test_not_drained_while_another_item_is_outstanding() {
        let frontier = Frontier::new();
        frontier.push(FrontierItem::new("a", 0));
        frontier.push(FrontierItem::new("b", 0));

        let _a = frontier.try_pop().unwrap();
        let _b = frontier.try_pop().unwrap();

        assert!(!frontier.task_done());
        assert!(frontier.task_done());
    }

    #[test]
    fn test_push_after_close_is_rejected() {
        let frontier = Frontier::new();
        frontier.push(FrontierItem::new("a", 0));

        assert!(frontier.close());
        assert!(!frontier.close());
        assert!(frontier.is_closed());
        assert!(frontier.is_empty());
        assert!(!frontier.push(FrontierItem::new("b", 0)));
        assert!(frontier.try_pop().is_none());
    }

    #[test]
    fn test_if_open_stops_running_after_close() {
        let frontier = Frontier::new();
        assert_eq!(frontier.if_open(|| 7), Some(7));

        frontier.close();
        let mut ran = false;
        assert_eq!(frontier.if_open(|| ran = true), None);
        assert!(!ran);
    }

    #[tokio::test]
    async fn test_pop_wait_wakes_on_push() {
        let frontier = Arc::new(Frontier::new());

        let waiter = {
            let frontier = frontier.clone();
            tokio::spawn(async move { frontier.pop_wait().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        frontier.push(FrontierItem::new("https://example.test/late", 3));

        let item = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
        assert_eq!(item, Some(FrontierItem::new("https://example.test/late", 3)));
    }

    #[tokio::test]
    async fn test_close_releases_all_waiters() {
        let frontier = Arc::new(Frontier::new());

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let frontier = frontier.clone();
                tokio::spawn(async move { frontier.pop_wait().await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(20)).await;
        frontier.close();

        for waiter in waiters {
            let result = tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .expect("waiter should be released")
                .unwrap();
            assert!(result.is_none());
        }
    }

    #[tokio::test]
    async fn test_no_duplicate_delivery() {
        let frontier = Arc::new(Frontier::new());
        for i in 0..200 {
            frontier.push(FrontierItem::new(format!("https://example.test/{}", i), 0));
        }

        let mut handles = Vec::new();
        for _ in 0..8 {
            let frontier = frontier.clone();
            handles.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                while let Some(item) = frontier.try_pop() {
                    seen.push(item.url);
                    tokio::task::yield_now().await;
                }
                seen
            }));
        }

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.await.unwrap());
        }
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 200);
    }
}
