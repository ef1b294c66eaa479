//! Redirect-and-track orchestration
//!
//! The redirect target is fixed as soon as the link lookup finishes. Tracking
//! runs afterwards in its own task; whatever happens there (store errors,
//! geolocation failures, panics) is logged and the visitor is still sent to
//! the destination. Background tasks are kept in a `JoinSet` so shutdown can
//! wait for clicks that are still being recorded.

use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::analytics::{
    ClickRecorder, ClickTracker, DedupCache, DedupKey, IpApiLocator, KeywordClassifier,
    MemoryDedupCache, VisitContext,
};
use crate::config::{TrackingConfig, TrackingMode};
use crate::models::ShortLink;
use crate::storage::LinkStore;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("no link for this short code")]
    NotFound,
    #[error("link is inactive")]
    Inactive,
    #[error("link lookup failed: {0}")]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
    Destination(String),
    Home,
}

impl RedirectTarget {
    pub fn location<'a>(&'a self, home_url: &'a str) -> &'a str {
        match self {
            RedirectTarget::Destination(url) => url,
            RedirectTarget::Home => home_url,
        }
    }
}

#[derive(Clone)]
pub struct Redirector {
    store: Arc<dyn LinkStore>,
    dedup: Arc<dyn DedupCache>,
    tracker: ClickTracker,
    mode: TrackingMode,
    background: Arc<Mutex<JoinSet<()>>>,
}

impl Redirector {
    pub fn new(
        store: Arc<dyn LinkStore>,
        dedup: Arc<dyn DedupCache>,
        tracker: ClickTracker,
        mode: TrackingMode,
    ) -> Self {
        Self {
            store,
            dedup,
            tracker,
            mode,
            background: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    /// Wire the default collaborators: keyword classifier, ip-api locator and
    /// an in-memory dedup cache
    pub fn from_config(store: Arc<dyn LinkStore>, config: &TrackingConfig) -> anyhow::Result<Self> {
        let geo = IpApiLocator::new(&config.geo_api_url, config.geo_timeout())?;
        let recorder = ClickRecorder::new(Arc::clone(&store), config.counter_mode);
        let tracker = ClickTracker::new(Arc::new(KeywordClassifier), Arc::new(geo), recorder);
        let dedup = Arc::new(MemoryDedupCache::from_config(&config.dedup));

        Ok(Self::new(store, dedup, tracker, config.mode))
    }

    /// Look up an active link by short code
    pub async fn resolve(&self, short_code: &str) -> Result<ShortLink, LookupError> {
        match self.store.get_by_code(short_code).await? {
            Some(link) if link.active => Ok(link),
            Some(_) => Err(LookupError::Inactive),
            None => Err(LookupError::NotFound),
        }
    }

    pub async fn handle(&self, short_code: &str, visit: VisitContext) -> RedirectTarget {
        let link = match self.resolve(short_code).await {
            Ok(link) => link,
            Err(LookupError::Store(err)) => {
                error!(short_code, error = %err, "link lookup failed, redirecting home");
                return RedirectTarget::Home;
            }
            Err(err) => {
                debug!(short_code, reason = %err, "redirecting home");
                return RedirectTarget::Home;
            }
        };

        let destination = RedirectTarget::Destination(link.destination_url.clone());

        let key = DedupKey::new(link.id, visit.client_ip.as_str());
        if self.dedup.check_and_mark(&key, Instant::now()) {
            debug!(short_code, ip = %visit.client_ip, "duplicate click suppressed");
            return destination;
        }

        let tracker = self.tracker.clone();
        let track = async move { tracker.track(&link, visit).await };

        match self.mode {
            TrackingMode::Inline => {
                if let Err(err) = tokio::spawn(track).await {
                    warn!(short_code, error = %err, "click tracking aborted");
                }
            }
            TrackingMode::Background => {
                let mut tasks = self.background.lock().await;
                while let Some(finished) = tasks.try_join_next() {
                    if let Err(err) = finished {
                        warn!(error = %err, "click tracking aborted");
                    }
                }
                tasks.spawn(track);
            }
        }

        destination
    }

    /// Wait up to `timeout` for background tracking tasks still in flight.
    /// Returns how many were pending when the drain started.
    pub async fn drain_background(&self, timeout: Duration) -> usize {
        let mut tasks = std::mem::take(&mut *self.background.lock().await);
        let pending = tasks.len();
        if pending == 0 {
            return 0;
        }

        info!(pending, "waiting for background click tracking to finish");
        let drained = tokio::time::timeout(timeout, async {
            while let Some(finished) = tasks.join_next().await {
                if let Err(err) = finished {
                    warn!(error = %err, "click tracking aborted");
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                dropped = tasks.len(),
                "background click tracking did not finish in time, dropping clicks"
            );
            tasks.abort_all();
        }

        pending
    }
}
