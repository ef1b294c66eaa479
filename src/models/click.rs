use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A persisted visit. Rows are written once and never updated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClickEvent {
    pub id: i64,
    pub link_id: i64,
    pub ip_address: String,
    pub device_type: String,
    pub browser: String,
    pub os: String,
    pub referrer: String,
    pub user_agent: String,
    pub country: String,
    pub city: String,
    pub clicked_at: i64,
}

/// Click data assembled by the tracking pipeline before insertion
#[derive(Debug, Clone)]
pub struct NewClick {
    pub link_id: i64,
    pub ip_address: String,
    pub device_type: String,
    pub browser: String,
    pub os: String,
    pub referrer: String,
    pub user_agent: String,
    pub country: String,
    pub city: String,
    pub clicked_at: i64,
}
