//! Process-wide session registry
//!
//! Maps session keys to live sessions. A terminated session stays resolvable
//! for the configured retention period, so a stop or lookup racing with natural
//! completion sees a consistent `Terminated` session instead of `NotFound`.

use crate::config::Config;
use crate::crawler::session::{CrawlSession, SessionKey};
use crate::crawler::{Fetcher, HttpFetcher};
use crate::output::VisitedEvent;
use crate::state::StopReason;
use crate::{SessionError, SessionResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::Duration;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

struct RegistryInner {
    sessions: RwLock<HashMap<SessionKey, Arc<CrawlSession>>>,
    fetcher: Arc<dyn Fetcher>,
    config: Config,
    root: CancellationToken,
    shutting_down: AtomicBool,
}

impl RegistryInner {
    fn read(&self) -> RwLockReadGuard<'_, HashMap<SessionKey, Arc<CrawlSession>>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<SessionKey, Arc<CrawlSession>>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owner of every crawl session in the process
///
/// Cheap to clone; clones share the same sessions.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

impl SessionRegistry {
    /// Creates a registry whose sessions fetch through `fetcher`
    pub fn new(config: Config, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                sessions: RwLock::new(HashMap::new()),
                fetcher,
                config,
                root: CancellationToken::new(),
                shutting_down: AtomicBool::new(false),
            }),
        }
    }

    /// Creates a registry whose sessions fetch over HTTP
    ///
    /// # Errors
    ///
    /// [`StreamError::Reqwest`](crate::StreamError::Reqwest) if the HTTP
    /// client cannot be built.
    pub fn with_http_fetcher(config: Config) -> crate::Result<Self> {
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Self::new(config, Arc::new(fetcher)))
    }

    /// Creates and starts a session
    ///
    /// # Errors
    ///
    /// - [`SessionError::Validation`] for a bad root URL or negative depth
    /// - [`SessionError::ShuttingDown`] once [`shutdown`](Self::shutdown) has begun
    pub fn create(&self, root_url: &str, max_depth: i64) -> SessionResult<SessionKey> {
        let session = {
            let mut sessions = self.inner.write();
            if self.inner.shutting_down.load(Ordering::SeqCst) {
                return Err(SessionError::ShuttingDown);
            }

            let session = CrawlSession::start(
                root_url,
                max_depth,
                &self.inner.config,
                self.inner.fetcher.clone(),
                self.inner.root.child_token(),
            )?;
            sessions.insert(session.key(), session.clone());
            session
        };

        let retention = self.inner.config.crawler.terminated_retention();
        tokio::spawn(reap(Arc::downgrade(&self.inner), session.clone(), retention));

        Ok(session.key())
    }

    /// Looks up a session
    pub fn get(&self, key: &SessionKey) -> SessionResult<Arc<CrawlSession>> {
        self.inner
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| SessionError::NotFound {
                key: key.to_string(),
            })
    }

    /// Parses a key received from outside the process
    ///
    /// A string that is not a valid key cannot name a session, so it is
    /// reported as `NotFound`.
    pub fn parse_key(key: &str) -> SessionResult<SessionKey> {
        key.parse().map_err(|_| SessionError::NotFound {
            key: key.to_string(),
        })
    }

    /// Requests a stop; succeeds again on a stopping or terminated session
    pub fn stop(&self, key: &SessionKey) -> SessionResult<()> {
        let session = self.get(key)?;
        session.stop();
        Ok(())
    }

    /// Takes a session's event stream
    pub fn subscribe(&self, key: &SessionKey) -> SessionResult<UnboundedReceiverStream<VisitedEvent>> {
        self.get(key)?.subscribe()
    }

    /// Keys of every resolvable session
    pub fn list(&self) -> Vec<SessionKey> {
        self.inner.read().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Stops every session and waits for all of them to terminate
    ///
    /// Later `create` calls fail with [`SessionError::ShuttingDown`].
    pub async fn shutdown(&self) {
        let sessions: Vec<_> = {
            let sessions = self.inner.write();
            self.inner.shutting_down.store(true, Ordering::SeqCst);
            sessions.values().cloned().collect()
        };

        tracing::info!("shutting down {} sessions", sessions.len());
        for session in &sessions {
            session.begin_stop(StopReason::Shutdown);
        }
        self.inner.root.cancel();

        for session in sessions {
            session.wait_terminated().await;
        }
        tracing::info!("all sessions terminated");
    }
}

/// Removes a session from the registry once it has been terminated for `retention`
async fn reap(registry: Weak<RegistryInner>, session: Arc<CrawlSession>, retention: Duration) {
    session.wait_terminated().await;
    tokio::time::sleep(retention).await;

    let key = session.key();
    drop(session);

    if let Some(inner) = registry.upgrade() {
        if inner.write().remove(&key).is_some() {
            tracing::debug!(session = %key, "session removed from registry");
        }
    }
}
