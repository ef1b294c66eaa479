use crate::models::{ClickEvent, NewClick, ShortLink};
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("short code already exists")]
    Conflict,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Initialize the storage (create tables and indexes)
    async fn init(&self) -> Result<()>;

    /// Create a new link under a caller-provided short code
    async fn create_link(
        &self,
        short_code: &str,
        destination_url: &str,
        title: Option<&str>,
    ) -> StorageResult<ShortLink>;

    /// Get a link by short code, regardless of its active flag
    async fn get_by_code(&self, short_code: &str) -> Result<Option<ShortLink>>;

    /// Get a link by id
    async fn get_by_id(&self, id: i64) -> Result<Option<ShortLink>>;

    /// List links, newest first
    async fn list_links(&self, limit: i64, offset: i64) -> Result<Vec<ShortLink>>;

    /// Set the active flag. Returns false if no link has this id.
    async fn set_active(&self, id: i64, active: bool) -> Result<bool>;

    /// Persist a click event
    async fn insert_click(&self, click: &NewClick) -> Result<ClickEvent>;

    /// Overwrite the aggregate counter with a value computed by the caller
    async fn set_click_count(&self, id: i64, total_clicks: i64) -> Result<()>;

    /// Increment the aggregate counter inside the database
    async fn increment_clicks(&self, id: i64) -> Result<()>;

    /// List recorded clicks for a link, newest first
    async fn list_clicks(&self, link_id: i64, limit: i64) -> Result<Vec<ClickEvent>>;

    /// Number of click rows recorded for a link
    async fn click_count(&self, link_id: i64) -> Result<i64>;
}
