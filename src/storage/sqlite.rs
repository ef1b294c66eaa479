use crate::models::{ClickEvent, NewClick, ShortLink};
use crate::storage::{unix_now, LinkStore, StorageError, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;

const LINK_COLUMNS: &str =
    "id, short_code, destination_url, title, active, total_clicks, created_at";

const CLICK_COLUMNS: &str = "id, link_id, ip_address, device_type, browser, os, referrer, \
     user_agent, country, city, clicked_at";

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
}

impl SqliteStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl LinkStore for SqliteStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS links (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                short_code TEXT NOT NULL UNIQUE,
                destination_url TEXT NOT NULL,
                title TEXT,
                active INTEGER NOT NULL DEFAULT 1,
                total_clicks INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS clicks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                link_id INTEGER NOT NULL REFERENCES links(id),
                ip_address TEXT NOT NULL,
                device_type TEXT NOT NULL,
                browser TEXT NOT NULL,
                os TEXT NOT NULL,
                referrer TEXT NOT NULL,
                user_agent TEXT NOT NULL,
                country TEXT NOT NULL,
                city TEXT NOT NULL,
                clicked_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_clicks_link_id ON clicks(link_id, clicked_at)")
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn create_link(
        &self,
        short_code: &str,
        destination_url: &str,
        title: Option<&str>,
    ) -> StorageResult<ShortLink> {
        let result = sqlx::query(
            r#"
            INSERT INTO links (short_code, destination_url, title, active, total_clicks, created_at)
            VALUES (?, ?, ?, 1, 0, ?)
            ON CONFLICT(short_code) DO NOTHING
            "#,
        )
        .bind(short_code)
        .bind(destination_url)
        .bind(title)
        .bind(unix_now())
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }

        let link = sqlx::query_as::<_, ShortLink>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE short_code = ?"
        ))
        .bind(short_code)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        Ok(link)
    }

    async fn get_by_code(&self, short_code: &str) -> Result<Option<ShortLink>> {
        let link = sqlx::query_as::<_, ShortLink>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE short_code = ?"
        ))
        .bind(short_code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ShortLink>> {
        let link = sqlx::query_as::<_, ShortLink>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn list_links(&self, limit: i64, offset: i64) -> Result<Vec<ShortLink>> {
        let links = sqlx::query_as::<_, ShortLink>(&format!(
            "SELECT {LINK_COLUMNS} FROM links ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(links)
    }

    async fn set_active(&self, id: i64, active: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE links SET active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_click(&self, click: &NewClick) -> Result<ClickEvent> {
        let event = sqlx::query_as::<_, ClickEvent>(&format!(
            r#"
            INSERT INTO clicks (link_id, ip_address, device_type, browser, os, referrer,
                                user_agent, country, city, clicked_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {CLICK_COLUMNS}
            "#
        ))
        .bind(click.link_id)
        .bind(&click.ip_address)
        .bind(&click.device_type)
        .bind(&click.browser)
        .bind(&click.os)
        .bind(&click.referrer)
        .bind(&click.user_agent)
        .bind(&click.country)
        .bind(&click.city)
        .bind(click.clicked_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(event)
    }

    async fn set_click_count(&self, id: i64, total_clicks: i64) -> Result<()> {
        sqlx::query("UPDATE links SET total_clicks = ? WHERE id = ?")
            .bind(total_clicks)
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn increment_clicks(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE links SET total_clicks = total_clicks + 1 WHERE id = ?")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn list_clicks(&self, link_id: i64, limit: i64) -> Result<Vec<ClickEvent>> {
        let clicks = sqlx::query_as::<_, ClickEvent>(&format!(
            "SELECT {CLICK_COLUMNS} FROM clicks WHERE link_id = ? \
             ORDER BY clicked_at DESC, id DESC LIMIT ?"
        ))
        .bind(link_id)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(clicks)
    }

    async fn click_count(&self, link_id: i64) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM clicks WHERE link_id = ?")
            .bind(link_id)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(count)
    }
}
