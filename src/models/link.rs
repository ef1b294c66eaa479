use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ShortLink {
    pub id: i64,
    pub short_code: String,
    pub destination_url: String,
    pub title: Option<String>,
    pub active: bool,
    /// Approximate; may lag the number of rows in `clicks` under concurrency.
    pub total_clicks: i64,
    pub created_at: i64,
}
