//! Crawl session: one independent crawl run
//!
//! A session owns its frontier, visited registry, backoff coordinator and a
//! fixed pool of fetch workers, all driven by a supervisor task:
//!
//! ```text
//! Running --(stop request | frontier drained | shutdown)--> Stopping --(all workers joined)--> Terminated
//! ```
//!
//! Validation happens synchronously in [`CrawlSession::start`]; a session that
//! fails it never exists. Once `Terminated`, every event sender is gone, so the
//! subscriber's stream ends.

use crate::config::Config;
use crate::crawler::backoff::BackoffCoordinator;
use crate::crawler::frontier::{Frontier, FrontierItem};
use crate::crawler::visited::VisitedRegistry;
use crate::crawler::worker::Worker;
use crate::crawler::Fetcher;
use crate::output::{SessionStats, StatsTracker, VisitedEvent};
use crate::state::{SessionState, StopReason};
use crate::url::validate_root_url;
use crate::{SessionError, SessionResult, ValidationError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

/// Opaque, unique identifier of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionKey(Uuid);

impl SessionKey {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionKey {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Checks a requested depth bound
pub fn validate_max_depth(max_depth: i64) -> Result<u32, ValidationError> {
    if max_depth < 0 {
        return Err(ValidationError::NegativeDepth(max_depth));
    }
    Ok(u32::try_from(max_depth).unwrap_or(u32::MAX))
}

/// A running or finished crawl
pub struct CrawlSession {
    key: SessionKey,
    root_url: Url,
    max_depth: u32,
    workers: usize,
    retry_attempts: u32,
    same_host_only: bool,
    state: watch::Sender<SessionState>,
    frontier: Frontier,
    visited: VisitedRegistry,
    backoff: BackoffCoordinator,
    tracker: StatsTracker,
    cancel: CancellationToken,
    events: Mutex<Option<mpsc::UnboundedReceiver<VisitedEvent>>>,
    stop_reason: OnceLock<StopReason>,
    finished_at: OnceLock<DateTime<Utc>>,
}

impl CrawlSession {
    /// Validates the request and starts the session's worker pool
    ///
    /// The root URL is canonicalized, claimed and enqueued at depth 0 before
    /// any worker runs. `cancel` is normally a child of the registry's token;
    /// cancelling it stops the session with [`StopReason::Shutdown`].
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// [`SessionError::Validation`] if the root URL is not an absolute
    /// http(s) URL with a host, or if `max_depth` is negative.
    pub fn start(
        root_url: &str,
        max_depth: i64,
        config: &Config,
        fetcher: Arc<dyn Fetcher>,
        cancel: CancellationToken,
    ) -> SessionResult<Arc<Self>> {
        let root_url = validate_root_url(root_url)?;
        let max_depth = validate_max_depth(max_depth)?;

        let key = SessionKey::new();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(SessionState::Running);

        let session = Arc::new(Self {
            key,
            root_url,
            max_depth,
            workers: config.crawler.workers.max(1) as usize,
            retry_attempts: config.crawler.retry_attempts,
            same_host_only: config.crawler.same_host_only,
            state,
            frontier: Frontier::new(),
            visited: VisitedRegistry::new(),
            backoff: BackoffCoordinator::new(&config.backoff),
            tracker: StatsTracker::new(),
            cancel,
            events: Mutex::new(Some(events_rx)),
            stop_reason: OnceLock::new(),
            finished_at: OnceLock::new(),
        });

        let root = session.root_url.as_str();
        session.visited.try_claim(root);
        session.frontier.push(FrontierItem::new(root, 0));

        let span = tracing::info_span!("session", session = %key);
        span.in_scope(|| {
            tracing::info!(
                "starting crawl of {} (max depth {}, {} workers)",
                session.root_url,
                session.max_depth,
                session.workers
            );
        });

        tokio::spawn(session.clone().supervise(fetcher, events_tx).instrument(span));

        Ok(session)
    }

    /// Spawns the workers, joins them all, then marks the session terminated
    async fn supervise(
        self: Arc<Self>,
        fetcher: Arc<dyn Fetcher>,
        events: mpsc::UnboundedSender<VisitedEvent>,
    ) {
        let mut workers = JoinSet::new();
        for id in 0..self.workers {
            let worker = Worker {
                id,
                session: self.clone(),
                fetcher: fetcher.clone(),
                events: events.clone(),
            };
            workers.spawn(
                worker
                    .run()
                    .instrument(tracing::debug_span!("worker", worker = id)),
            );
        }
        // Only workers hold senders now; the stream ends when the last one exits
        drop(events);

        loop {
            tokio::select! {
                joined = workers.join_next() => match joined {
                    Some(Ok(())) => {}
                    Some(Err(e)) => tracing::error!("worker task failed: {}", e),
                    None => break,
                },
                _ = self.cancel.cancelled(), if self.state().is_running() => {
                    self.begin_stop(StopReason::Shutdown);
                }
            }
        }

        self.finish();
    }

    /// Moves `Running -> Stopping` and closes the frontier
    ///
    /// Idempotent. Explicit stops also cancel the session token so workers
    /// leave their backoff wait promptly; a drain does not need to, since
    /// nothing is in flight by then. Returns true only for the call that
    /// performed the transition.
    pub(crate) fn begin_stop(&self, reason: StopReason) -> bool {
        let transitioned = self.state.send_if_modified(|state| {
            if !state.can_transition_to(SessionState::Stopping) {
                return false;
            }
            let _ = self.stop_reason.set(reason);
            *state = SessionState::Stopping;
            true
        });

        if reason != StopReason::Drained {
            self.cancel.cancel();
        }
        self.frontier.close();

        if transitioned {
            tracing::info!(session = %self.key, "session stopping ({})", reason);
        }
        transitioned
    }

    fn finish(&self) {
        if self.state().is_running() {
            let reason = if self.cancel.is_cancelled() {
                StopReason::Shutdown
            } else {
                StopReason::Drained
            };
            self.begin_stop(reason);
        }

        let _ = self.finished_at.set(Utc::now());
        self.state.send_if_modified(|state| {
            if !state.can_transition_to(SessionState::Terminated) {
                return false;
            }
            *state = SessionState::Terminated;
            true
        });

        let stats = self.stats();
        tracing::info!(
            "session terminated: {} pages visited, {} fetch failures",
            stats.pages_visited,
            stats.fetch_failures
        );
    }

    /// Requests a cooperative stop
    ///
    /// Workers observe it at the top of their loop and when leaving a backoff
    /// wait; a fetch already in flight is allowed to finish, but its result is
    /// discarded. Calling this on a stopping or terminated session is a no-op.
    pub fn stop(&self) {
        self.begin_stop(StopReason::Requested);
    }

    /// Takes the session's event stream
    ///
    /// The stream yields every `VisitedEvent` in emission order and ends when
    /// the session terminates. Events produced before the call are buffered.
    ///
    /// # Errors
    ///
    /// [`SessionError::AlreadySubscribed`] if the stream was already taken.
    pub fn subscribe(&self) -> SessionResult<UnboundedReceiverStream<VisitedEvent>> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .map(UnboundedReceiverStream::new)
            .ok_or_else(|| SessionError::AlreadySubscribed {
                key: self.key.to_string(),
            })
    }

    /// Resolves once the session reaches `Terminated`
    pub async fn wait_terminated(&self) {
        let mut state = self.state.subscribe();
        // The sender lives as long as `self`, so this cannot fail
        let _ = state.wait_for(SessionState::is_terminal).await;
    }

    pub fn key(&self) -> SessionKey {
        self.key
    }

    pub fn root_url(&self) -> &Url {
        &self.root_url
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason.get().copied()
    }

    /// Items popped by workers and not yet finished
    pub fn outstanding(&self) -> usize {
        self.frontier.outstanding()
    }

    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    /// URLs claimed so far, the root included
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn current_delay(&self) -> Duration {
        self.backoff.current_delay()
    }

    pub fn stats(&self) -> SessionStats {
        self.tracker
            .snapshot(self.finished_at.get().copied(), self.stop_reason())
    }

    pub(crate) fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub(crate) fn visited(&self) -> &VisitedRegistry {
        &self.visited
    }

    pub(crate) fn backoff(&self) -> &BackoffCoordinator {
        &self.backoff
    }

    pub(crate) fn tracker(&self) -> &StatsTracker {
        &self.tracker
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    pub(crate) fn same_host_only(&self) -> bool {
        self.same_host_only
    }
}

impl fmt::Debug for CrawlSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrawlSession")
            .field("key", &self.key)
            .field("root_url", &self.root_url.as_str())
            .field("max_depth", &self.max_depth)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::PageFetch;
    use crate::FetchError;
    use async_trait::async_trait;
    use tokio_stream::StreamExt;

    /// Every page links to nothing
    struct EmptyPages;

    #[async_trait]
    impl Fetcher for EmptyPages {
        async fn fetch(&self, _url: &str) -> Result<PageFetch, FetchError> {
            Ok(PageFetch {
                status: 200,
                links: Vec::new(),
            })
        }
    }

    fn fast_config() -> Config {
        let mut config = Config::default();
        config.backoff.initial_delay_ms = 1;
        config.backoff.min_delay_ms = 1;
        config.backoff.max_delay_ms = 10;
        config
    }

    fn start(root: &str, max_depth: i64) -> SessionResult<Arc<CrawlSession>> {
        CrawlSession::start(
            root,
            max_depth,
            &fast_config(),
            Arc::new(EmptyPages),
            CancellationToken::new(),
        )
    }

    #[test]
    fn test_session_key_round_trips_through_display() {
        let key = SessionKey::new();
        let parsed: SessionKey = key.to_string().parse().unwrap();
        assert_eq!(parsed, key);
        assert!("not-a-key".parse::<SessionKey>().is_err());
    }

    #[test]
    fn test_validate_max_depth() {
        assert_eq!(validate_max_depth(0), Ok(0));
        assert_eq!(validate_max_depth(3), Ok(3));
        assert_eq!(
            validate_max_depth(-1),
            Err(ValidationError::NegativeDepth(-1))
        );
    }

    #[tokio::test]
    async fn test_rejects_negative_depth() {
        let err = start("https://example.test/", -2).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Validation(ValidationError::NegativeDepth(-2))
        ));
    }

    #[tokio::test]
    async fn test_rejects_bad_root() {
        let err = start("not a url", 1).unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)));
    }

    #[tokio::test]
    async fn test_drains_and_terminates() {
        let session = start("https://example.test/", 3).unwrap();
        let events: Vec<_> = session.subscribe().unwrap().collect().await;

        session.wait_terminated().await;
        assert_eq!(events.len(), 1);
        assert_eq!(session.state(), SessionState::Terminated);
        assert_eq!(session.stop_reason(), Some(StopReason::Drained));
        assert_eq!(session.outstanding(), 0);
        assert!(session.stats().finished_at.is_some());
    }

    #[tokio::test]
    async fn test_subscribe_only_once() {
        let session = start("https://example.test/", 0).unwrap();
        let _stream = session.subscribe().unwrap();
        assert!(matches!(
            session.subscribe(),
            Err(SessionError::AlreadySubscribed { .. })
        ));
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let session = start("https://example.test/", 5).unwrap();
        session.stop();
        session.stop();
        session.wait_terminated().await;
        session.stop();

        assert_eq!(session.state(), SessionState::Terminated);
    }

    #[tokio::test]
    async fn test_cancelled_token_means_shutdown() {
        let token = CancellationToken::new();
        let session = CrawlSession::start(
            "https://example.test/",
            5,
            &fast_config(),
            Arc::new(EmptyPages),
            token.clone(),
        )
        .unwrap();

        token.cancel();
        session.wait_terminated().await;

        let reason = session.stop_reason();
        // The root page may already have drained the session before the cancel
        assert!(matches!(
            reason,
            Some(StopReason::Shutdown) | Some(StopReason::Drained)
        ));
    }
}
