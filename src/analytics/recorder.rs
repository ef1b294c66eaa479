use anyhow::Result;
use std::sync::Arc;
use tracing::{error, warn};

use crate::config::CounterMode;
use crate::models::{ClickEvent, NewClick};
use crate::storage::LinkStore;

/// Writes click rows and keeps the per-link aggregate counter moving
#[derive(Clone)]
pub struct ClickRecorder {
    store: Arc<dyn LinkStore>,
    counter_mode: CounterMode,
}

impl ClickRecorder {
    pub fn new(store: Arc<dyn LinkStore>, counter_mode: CounterMode) -> Self {
        Self {
            store,
            counter_mode,
        }
    }

    pub async fn record(&self, click: &NewClick) -> Result<ClickEvent> {
        self.store.insert_click(click).await
    }

    /// In observed mode the counter becomes `observed + 1`, so concurrent
    /// clicks on one link can overwrite each other's increment.
    pub async fn increment_count(&self, link_id: i64, observed: i64) -> Result<()> {
        match self.counter_mode {
            CounterMode::Observed => self.store.set_click_count(link_id, observed + 1).await,
            CounterMode::Atomic => self.store.increment_clicks(link_id).await,
        }
    }

    /// Insert the click, then bump the counter. Each step is attempted and
    /// logged on its own; neither failure is returned.
    pub async fn record_and_count(&self, click: &NewClick, observed: i64) -> bool {
        let inserted = match self.record(click).await {
            Ok(_) => true,
            Err(err) => {
                error!(link_id = click.link_id, error = %err, "failed to insert click");
                false
            }
        };

        if let Err(err) = self.increment_count(click.link_id, observed).await {
            warn!(link_id = click.link_id, error = %err, "failed to update click counter");
        }

        inserted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShortLink;
    use crate::storage::{SqliteStorage, StorageResult};
    use anyhow::anyhow;
    use async_trait::async_trait;

    /// Delegates to SQLite but can fail the click insert or the counter update
    struct FlakyStore {
        inner: Arc<dyn LinkStore>,
        fail_insert: bool,
        fail_counter: bool,
    }

    #[async_trait]
    impl LinkStore for FlakyStore {
        async fn init(&self) -> Result<()> {
            self.inner.init().await
        }

        async fn create_link(
            &self,
            short_code: &str,
            destination_url: &str,
            title: Option<&str>,
        ) -> StorageResult<ShortLink> {
            self.inner.create_link(short_code, destination_url, title).await
        }

        async fn get_by_code(&self, short_code: &str) -> Result<Option<ShortLink>> {
            self.inner.get_by_code(short_code).await
        }

        async fn get_by_id(&self, id: i64) -> Result<Option<ShortLink>> {
            self.inner.get_by_id(id).await
        }

        async fn list_links(&self, limit: i64, offset: i64) -> Result<Vec<ShortLink>> {
            self.inner.list_links(limit, offset).await
        }

        async fn set_active(&self, id: i64, active: bool) -> Result<bool> {
            self.inner.set_active(id, active).await
        }

        async fn insert_click(&self, click: &NewClick) -> Result<ClickEvent> {
            if self.fail_insert {
                return Err(anyhow!("clicks table is locked"));
            }
            self.inner.insert_click(click).await
        }

        async fn set_click_count(&self, id: i64, total_clicks: i64) -> Result<()> {
            if self.fail_counter {
                return Err(anyhow!("links table is locked"));
            }
            self.inner.set_click_count(id, total_clicks).await
        }

        async fn increment_clicks(&self, id: i64) -> Result<()> {
            if self.fail_counter {
                return Err(anyhow!("links table is locked"));
            }
            self.inner.increment_clicks(id).await
        }

        async fn list_clicks(&self, link_id: i64, limit: i64) -> Result<Vec<ClickEvent>> {
            self.inner.list_clicks(link_id, limit).await
        }

        async fn click_count(&self, link_id: i64) -> Result<i64> {
            self.inner.click_count(link_id).await
        }
    }

    async fn flaky_setup(
        mode: CounterMode,
        fail_insert: bool,
        fail_counter: bool,
    ) -> (Arc<dyn LinkStore>, ClickRecorder) {
        let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
        storage.init().await.unwrap();
        let inner: Arc<dyn LinkStore> = Arc::new(storage);
        let flaky: Arc<dyn LinkStore> = Arc::new(FlakyStore {
            inner: Arc::clone(&inner),
            fail_insert,
            fail_counter,
        });
        (inner, ClickRecorder::new(flaky, mode))
    }

    async fn setup(mode: CounterMode) -> (Arc<dyn LinkStore>, ClickRecorder) {
        let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
        storage.init().await.unwrap();
        let store: Arc<dyn LinkStore> = Arc::new(storage);
        let recorder = ClickRecorder::new(Arc::clone(&store), mode);
        (store, recorder)
    }

    fn click(link_id: i64) -> NewClick {
        NewClick {
            link_id,
            ip_address: "1.2.3.4".to_string(),
            device_type: "mobile".to_string(),
            browser: "Safari".to_string(),
            os: "Mac".to_string(),
            referrer: "direct".to_string(),
            user_agent: "iPhone".to_string(),
            country: "Local".to_string(),
            city: "Local".to_string(),
            clicked_at: 1_700_000_000,
        }
    }

    #[tokio::test]
    async fn test_observed_mode_uses_lookup_count() {
        let (store, recorder) = setup(CounterMode::Observed).await;
        let link = store
            .create_link("obs", "https://example.com", None)
            .await
            .unwrap();

        // Two writers that both observed 0 collapse into a single increment
        recorder.increment_count(link.id, 0).await.unwrap();
        recorder.increment_count(link.id, 0).await.unwrap();

        let link = store.get_by_id(link.id).await.unwrap().unwrap();
        assert_eq!(link.total_clicks, 1);
    }

    #[tokio::test]
    async fn test_atomic_mode_ignores_observed_count() {
        let (store, recorder) = setup(CounterMode::Atomic).await;
        let link = store
            .create_link("atomic", "https://example.com", None)
            .await
            .unwrap();

        recorder.increment_count(link.id, 0).await.unwrap();
        recorder.increment_count(link.id, 0).await.unwrap();

        let link = store.get_by_id(link.id).await.unwrap().unwrap();
        assert_eq!(link.total_clicks, 2);
    }

    #[tokio::test]
    async fn test_record_and_count() {
        let (store, recorder) = setup(CounterMode::Observed).await;
        let link = store
            .create_link("both", "https://example.com", None)
            .await
            .unwrap();

        assert!(recorder.record_and_count(&click(link.id), link.total_clicks).await);

        assert_eq!(store.click_count(link.id).await.unwrap(), 1);
        let link = store.get_by_id(link.id).await.unwrap().unwrap();
        assert_eq!(link.total_clicks, 1);
    }

    #[tokio::test]
    async fn test_failed_insert_still_updates_counter() {
        for mode in [CounterMode::Observed, CounterMode::Atomic] {
            let (store, recorder) = flaky_setup(mode, true, false).await;
            let link = store
                .create_link("noinsert", "https://example.com", None)
                .await
                .unwrap();
            store.set_click_count(link.id, 7).await.unwrap();

            assert!(!recorder.record_and_count(&click(link.id), 7).await);

            assert_eq!(store.click_count(link.id).await.unwrap(), 0);
            let link = store.get_by_id(link.id).await.unwrap().unwrap();
            assert_eq!(link.total_clicks, 8);
        }
    }

    #[tokio::test]
    async fn test_failed_counter_keeps_click_row() {
        let (store, recorder) = flaky_setup(CounterMode::Observed, false, true).await;
        let link = store
            .create_link("nocount", "https://example.com", None)
            .await
            .unwrap();

        assert!(recorder.record_and_count(&click(link.id), link.total_clicks).await);

        assert_eq!(store.click_count(link.id).await.unwrap(), 1);
        let link = store.get_by_id(link.id).await.unwrap().unwrap();
        assert_eq!(link.total_clicks, 0);
    }
}
