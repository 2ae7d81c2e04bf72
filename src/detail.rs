//! Selection/detail view.
//!
//! Tracks the selected record and lazily loads its detail (a patient's
//! prescription history, one prescription in full). Cache hits render at
//! once; misses wait out a short debounce so rapid re-selection issues a
//! single request, then fill the cache.

use std::fmt::Display;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::api::ApiError;
use crate::cache::ResultCache;
use crate::config;
use crate::notify::{Notification, Notifier};
use crate::search::Debouncer;

/// Shown instead of the generic failure when the detail fetch is throttled.
pub const RATE_LIMITED_DETAIL: &str =
    "Too many requests while loading details. Please wait a moment and try again.";

const GENERIC_DETAIL_FAILURE: &str = "Failed to load details. Please try again.";

#[async_trait]
pub trait DetailSource: Send + Sync + 'static {
    type Key: Eq + Hash + Clone + Display + Send + Sync + 'static;
    type Detail: Clone + Send + Sync + 'static;

    async fn load(&self, key: &Self::Key) -> Result<Self::Detail, ApiError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailState<V> {
    /// Nothing selected.
    Idle,
    Loading,
    Ready(V),
    Failed(String),
}

impl<V> DetailState<V> {
    pub fn ready(&self) -> Option<&V> {
        match self {
            Self::Ready(v) => Some(v),
            _ => None,
        }
    }
}

/// Message for a failed detail fetch.
pub fn failure_message(err: &ApiError) -> String {
    match err {
        ApiError::RateLimited => RATE_LIMITED_DETAIL.to_string(),
        other => other.user_message(GENERIC_DETAIL_FAILURE),
    }
}

struct ViewState<K, V> {
    selected: Option<K>,
    detail: DetailState<V>,
}

struct ViewInner<D: DetailSource> {
    source: D,
    cache: ResultCache<D::Key, D::Detail>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<ViewState<D::Key, D::Detail>>,
    seq: AtomicU64,
    revision: watch::Sender<u64>,
}

impl<D: DetailSource> ViewInner<D> {
    fn lock(&self) -> MutexGuard<'_, ViewState<D::Key, D::Detail>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn changed(&self) {
        self.revision.send_modify(|r| *r = r.wrapping_add(1));
    }

    async fn fetch(&self, key: D::Key, seq: u64) -> Result<D::Detail, ApiError> {
        let outcome = self.source.load(&key).await;
        if let Ok(detail) = &outcome {
            self.cache.put(key.clone(), detail.clone());
        }

        {
            let mut state = self.lock();
            if self.seq.load(Ordering::SeqCst) != seq {
                tracing::debug!(%key, "Discarding detail for superseded selection");
                return outcome;
            }
            state.detail = match &outcome {
                Ok(detail) => DetailState::Ready(detail.clone()),
                Err(e) => {
                    tracing::warn!(%key, error = %e, "Detail fetch failed");
                    DetailState::Failed(failure_message(e))
                }
            };
        }
        self.changed();

        if let Err(e) = &outcome {
            if !e.is_reported_globally() {
                self.notifier
                    .notify(Notification::error("Error", failure_message(e)));
            }
        }
        outcome
    }
}

pub struct SelectionView<D: DetailSource> {
    inner: Arc<ViewInner<D>>,
    debouncer: Debouncer,
}

impl<D: DetailSource> SelectionView<D> {
    pub fn new(source: D, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_settings(
            source,
            notifier,
            config::DETAIL_DEBOUNCE,
            config::DETAIL_CACHE_TTL,
        )
    }

    pub fn with_settings(
        source: D,
        notifier: Arc<dyn Notifier>,
        debounce: Duration,
        ttl: Duration,
    ) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(ViewInner {
                source,
                cache: ResultCache::new(ttl),
                notifier,
                state: Mutex::new(ViewState {
                    selected: None,
                    detail: DetailState::Idle,
                }),
                seq: AtomicU64::new(0),
                revision,
            }),
            debouncer: Debouncer::new(debounce),
        }
    }

    pub fn source(&self) -> &D {
        &self.inner.source
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    pub fn selected(&self) -> Option<D::Key> {
        self.inner.lock().selected.clone()
    }

    pub fn detail(&self) -> DetailState<D::Detail> {
        self.inner.lock().detail.clone()
    }

    pub fn is_open(&self) -> bool {
        self.inner.lock().selected.is_some()
    }

    /// Select `key`. Previous detail is cleared at once.
    pub fn select(&self, key: D::Key) {
        let seq = self.inner.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let cached = self.inner.cache.get(&key);
        {
            let mut state = self.inner.lock();
            state.selected = Some(key.clone());
            state.detail = match &cached {
                Some(detail) => DetailState::Ready(detail.clone()),
                None => DetailState::Loading,
            };
        }
        self.inner.changed();

        if cached.is_some() {
            self.debouncer.cancel();
            tracing::debug!(%key, "Detail served from cache");
            return;
        }

        let inner = self.inner.clone();
        self.debouncer.schedule(async move {
            let _ = inner.fetch(key, seq).await;
        });
    }

    /// Load `key` immediately, cache first. Used when the detail is the
    /// whole screen rather than a panel next to a list.
    pub async fn open(&self, key: D::Key) -> Result<D::Detail, ApiError> {
        self.debouncer.cancel();
        let seq = self.inner.seq.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(detail) = self.inner.cache.get(&key) {
            {
                let mut state = self.inner.lock();
                state.selected = Some(key);
                state.detail = DetailState::Ready(detail.clone());
            }
            self.inner.changed();
            return Ok(detail);
        }

        {
            let mut state = self.inner.lock();
            state.selected = Some(key.clone());
            state.detail = DetailState::Loading;
        }
        self.inner.changed();
        self.inner.fetch(key, seq).await
    }

    /// Deselect and clear the panel.
    pub fn close(&self) {
        self.debouncer.cancel();
        self.inner.seq.fetch_add(1, Ordering::SeqCst);
        {
            let mut state = self.inner.lock();
            state.selected = None;
            state.detail = DetailState::Idle;
        }
        self.inner.changed();
    }

    /// Forget a cached detail after a mutation.
    pub fn invalidate(&self, key: &D::Key) {
        self.inner.cache.invalidate(key);
    }

    pub fn teardown(&self) {
        self.close();
        self.inner.cache.clear();
    }
}

impl<D: DetailSource> Drop for SelectionView<D> {
    fn drop(&mut self) {
        self.debouncer.cancel();
        self.inner.seq.fetch_add(1, Ordering::SeqCst);
    }
}
