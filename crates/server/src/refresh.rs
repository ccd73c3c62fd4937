//! Background refresh of cached artifacts.
//!
//! Readers signal keys that may need refreshing through a [`RefreshHandle`].
//! A single [`RefreshOrchestrator`] task drains the signals one at a time,
//! ignores keys refreshed within the cooldown, and otherwise rebuilds or
//! re-fetches the artifact and writes it back to the cache. It is the only
//! writer of cached artifacts.

use crate::cache::ArtifactCache;
use crate::fetcher::{FetchError, OriginFetch};
use crate::materializer::{AggregateBuild, MaterializeError};
use crate::metrics::{
    REFRESH_DEBOUNCED, REFRESH_DISPATCHES, REFRESH_DURATION, REFRESH_FAILURES,
    REFRESH_SIGNALS_DROPPED,
};
use benchcache_core::config::{OriginsConfig, RefreshConfig};
use benchcache_core::{ArtifactKey, ArtifactSource};
use benchcache_metadata::MetadataError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Upper bound on keys remembered for debouncing.
///
/// Entries older than the cooldown are pruned first; past this bound the oldest
/// entry is evicted.
pub const MAX_TRACKED_KEYS: usize = 10_000;

/// Reasons a dispatched refresh failed. The cached entry is unchanged.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    #[error("cache write failed: {0}")]
    CacheWrite(#[source] MetadataError),
}

/// Create a bounded signal queue.
///
/// `capacity` must be non-zero.
pub fn channel(capacity: usize) -> (RefreshHandle, mpsc::Receiver<ArtifactKey>) {
    let (tx, rx) = mpsc::channel(capacity);
    (RefreshHandle { tx }, rx)
}

/// Sending side of the refresh queue. Cheap to clone.
#[derive(Clone, Debug)]
pub struct RefreshHandle {
    tx: mpsc::Sender<ArtifactKey>,
}

impl RefreshHandle {
    /// Signal that `key` may be stale. Never waits.
    ///
    /// Returns false when the signal was dropped; a later read will signal again.
    pub fn notify(&self, key: ArtifactKey) -> bool {
        match self.tx.try_send(key) {
            Ok(()) => true,
            Err(TrySendError::Full(key)) => {
                tracing::debug!(key = %key, "Refresh queue full, dropping signal");
                REFRESH_SIGNALS_DROPPED.inc();
                false
            }
            Err(TrySendError::Closed(key)) => {
                tracing::debug!(key = %key, "Refresh orchestrator stopped, dropping signal");
                REFRESH_SIGNALS_DROPPED.inc();
                false
            }
        }
    }
}

/// What happened to a single signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The artifact was rebuilt or fetched and written to the cache.
    Refreshed,
    /// The key was dispatched within the cooldown; nothing was done.
    Debounced,
    /// The refresh was attempted and failed.
    Failed,
}

/// Single consumer of refresh signals.
pub struct RefreshOrchestrator {
    cache: ArtifactCache,
    fetcher: Arc<dyn OriginFetch>,
    materializer: Arc<dyn AggregateBuild>,
    origins: OriginsConfig,
    cooldown: Duration,
    advance_cooldown_on_failure: bool,
    last_dispatch: HashMap<ArtifactKey, Instant>,
    max_tracked_keys: usize,
}

impl RefreshOrchestrator {
    pub fn new(
        cache: ArtifactCache,
        fetcher: Arc<dyn OriginFetch>,
        materializer: Arc<dyn AggregateBuild>,
        origins: OriginsConfig,
        config: &RefreshConfig,
    ) -> Self {
        Self {
            cache,
            fetcher,
            materializer,
            origins,
            cooldown: config.cooldown(),
            advance_cooldown_on_failure: config.advance_cooldown_on_failure,
            last_dispatch: HashMap::new(),
            max_tracked_keys: MAX_TRACKED_KEYS,
        }
    }

    /// Process one signal.
    pub async fn handle(&mut self, key: ArtifactKey) -> DispatchOutcome {
        if let Some(last) = self.last_dispatch.get(&key)
            && last.elapsed() < self.cooldown
        {
            tracing::debug!(key = %key, "Refresh within cooldown, ignoring");
            REFRESH_DEBOUNCED.inc();
            return DispatchOutcome::Debounced;
        }

        let started = Instant::now();
        let kind = self.kind(&key);
        REFRESH_DISPATCHES.with_label_values(&[kind]).inc();

        let result = self.refresh(&key).await;
        REFRESH_DURATION
            .with_label_values(&[kind])
            .observe(started.elapsed().as_secs_f64());

        match result {
            Ok(bytes) => {
                tracing::info!(key = %key, bytes, "Refreshed artifact");
                self.record_dispatch(key, started);
                DispatchOutcome::Refreshed
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Artifact refresh failed");
                REFRESH_FAILURES.with_label_values(&[kind]).inc();
                if self.advance_cooldown_on_failure {
                    self.record_dispatch(key, started);
                }
                DispatchOutcome::Failed
            }
        }
    }

    fn record_dispatch(&mut self, key: ArtifactKey, at: Instant) {
        let cooldown = self.cooldown;
        self.last_dispatch
            .retain(|_, last| last.elapsed() < cooldown);

        if self.last_dispatch.len() >= self.max_tracked_keys
            && !self.last_dispatch.contains_key(&key)
            && let Some(oldest) = self
                .last_dispatch
                .iter()
                .min_by_key(|(_, last)| **last)
                .map(|(k, _)| k.clone())
        {
            tracing::debug!(key = %oldest, "Debounce table full, evicting oldest key");
            self.last_dispatch.remove(&oldest);
        }

        self.last_dispatch.insert(key, at);
    }

    fn kind(&self, key: &ArtifactKey) -> &'static str {
        if key.is_aggregate() {
            "aggregate"
        } else {
            "origin"
        }
    }

    async fn refresh(&self, key: &ArtifactKey) -> Result<usize, RefreshError> {
        let blob = match self.origins.source_for(key) {
            ArtifactSource::Aggregate => self.materializer.rebuild().await?,
            ArtifactSource::Origin(url) => self.fetcher.fetch(&url).await?.to_vec(),
        };

        self.cache
            .put(key, &blob)
            .await
            .map_err(RefreshError::CacheWrite)?;
        Ok(blob.len())
    }

    /// Drain signals until every [`RefreshHandle`] is dropped.
    pub async fn run(mut self, mut rx: mpsc::Receiver<ArtifactKey>) {
        tracing::info!(
            cooldown_secs = self.cooldown.as_secs(),
            advance_cooldown_on_failure = self.advance_cooldown_on_failure,
            "Refresh orchestrator started"
        );

        while let Some(key) = rx.recv().await {
            self.handle(key).await;
        }

        tracing::info!("Refresh orchestrator stopped");
    }

    /// Run the orchestrator on its own task.
    pub fn spawn(self, rx: mpsc::Receiver<ArtifactKey>) -> JoinHandle<()> {
        tokio::spawn(self.run(rx))
    }
}
