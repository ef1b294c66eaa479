use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub redirect: RedirectConfig,
    pub tracking: TrackingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectConfig {
    /// Where not-found, inactive and failed lookups are sent
    pub home_url: String,
    /// HTTP status used for every redirect (301, 302, 303, 307 or 308)
    pub status: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingMode {
    /// Finish tracking before the redirect response is sent
    Inline,
    /// Spawn tracking and redirect immediately
    Background,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterMode {
    /// `total_clicks = observed + 1`, using the count read at lookup time
    Observed,
    /// `total_clicks = total_clicks + 1` inside the database
    Atomic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    pub mode: TrackingMode,
    pub counter_mode: CounterMode,
    pub geo_api_url: String,
    pub geo_timeout_ms: u64,
    pub dedup: DedupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    pub window_ms: u64,
    pub sweep_age_ms: u64,
    pub max_entries: usize,
}

impl DedupConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn sweep_age(&self) -> Duration {
        Duration::from_millis(self.sweep_age_ms)
    }

    /// Rejects a zero capacity and a sweep age shorter than the window
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_entries == 0 {
            bail!("DEDUP_MAX_ENTRIES must be greater than zero");
        }
        if self.sweep_age_ms < self.window_ms {
            bail!(
                "DEDUP_SWEEP_MS ({}) must not be shorter than DEDUP_WINDOW_MS ({})",
                self.sweep_age_ms,
                self.window_ms
            );
        }
        Ok(())
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            window_ms: 2_000,
            sweep_age_ms: 5_000,
            max_entries: 100_000,
        }
    }
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            home_url: "/".to_string(),
            status: 307,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            mode: TrackingMode::Inline,
            counter_mode: CounterMode::Observed,
            geo_api_url: "http://ip-api.com".to_string(),
            geo_timeout_ms: 1_500,
            dedup: DedupConfig::default(),
        }
    }
}

impl TrackingConfig {
    pub fn geo_timeout(&self) -> Duration {
        Duration::from_millis(self.geo_timeout_ms)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn validate_redirect_status(status: u16) -> anyhow::Result<u16> {
    if !matches!(status, 301 | 302 | 303 | 307 | 308) {
        bail!("REDIRECT_STATUS must be one of 301, 302, 303, 307, 308 (got {status})");
    }
    Ok(status)
}

fn parse_tracking_mode(raw: &str) -> TrackingMode {
    match raw.trim().to_lowercase().as_str() {
        "inline" => TrackingMode::Inline,
        "background" => TrackingMode::Background,
        other => {
            tracing::warn!(
                "Unknown TRACKING_MODE '{other}', falling back to 'inline'. Supported values: inline, background"
            );
            TrackingMode::Inline
        }
    }
}

fn parse_counter_mode(raw: &str) -> CounterMode {
    match raw.trim().to_lowercase().as_str() {
        "observed" => CounterMode::Observed,
        "atomic" => CounterMode::Atomic,
        other => {
            tracing::warn!(
                "Unknown COUNTER_MODE '{other}', falling back to 'observed'. Supported values: observed, atomic"
            );
            CounterMode::Observed
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_str = env_or("DATABASE_BACKEND", "sqlite");
        let backend = match backend_str.to_lowercase().as_str() {
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            "sqlite" => DatabaseBackend::Sqlite,
            other => {
                tracing::warn!(
                    "Unknown DATABASE_BACKEND '{other}', falling back to 'sqlite'. Supported values: sqlite, postgres"
                );
                DatabaseBackend::Sqlite
            }
        };

        let database_url = env_or("DATABASE_URL", "sqlite://./znuost.db?mode=rwc");
        let max_connections = parse_env("DATABASE_MAX_CONNECTIONS", 5u32)?;

        let host = env_or("SERVER_HOST", "127.0.0.1");
        let port = parse_env("SERVER_PORT", 3000u16)?;

        let redirect_defaults = RedirectConfig::default();
        let home_url = env_or("HOME_URL", &redirect_defaults.home_url);
        let status =
            validate_redirect_status(parse_env("REDIRECT_STATUS", redirect_defaults.status)?)?;

        let tracking_defaults = TrackingConfig::default();

        let mode = parse_tracking_mode(&env_or("TRACKING_MODE", "inline"));
        let counter_mode = parse_counter_mode(&env_or("COUNTER_MODE", "observed"));

        let geo_api_url = env_or("GEO_API_URL", &tracking_defaults.geo_api_url);
        let geo_timeout_ms = parse_env("GEO_TIMEOUT_MS", tracking_defaults.geo_timeout_ms)?;

        let dedup_defaults = DedupConfig::default();
        let dedup = DedupConfig {
            window_ms: parse_env("DEDUP_WINDOW_MS", dedup_defaults.window_ms)?,
            sweep_age_ms: parse_env("DEDUP_SWEEP_MS", dedup_defaults.sweep_age_ms)?,
            max_entries: parse_env("DEDUP_MAX_ENTRIES", dedup_defaults.max_entries)?,
        };
        dedup.validate()?;

        Ok(Config {
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
            },
            server: ServerConfig { host, port },
            redirect: RedirectConfig { home_url, status },
            tracking: TrackingConfig {
                mode,
                counter_mode,
                geo_api_url,
                geo_timeout_ms,
                dedup,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_defaults_match_window_and_sweep() {
        let dedup = DedupConfig::default();
        assert_eq!(dedup.window(), Duration::from_millis(2000));
        assert_eq!(dedup.sweep_age(), Duration::from_millis(5000));
    }

    #[test]
    fn test_tracking_defaults() {
        let tracking = TrackingConfig::default();
        assert_eq!(tracking.mode, TrackingMode::Inline);
        assert_eq!(tracking.counter_mode, CounterMode::Observed);
        assert_eq!(tracking.geo_timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        std::env::set_var("ZNUOST_TEST_PARSE_ENV", "not-a-number");
        let parsed = parse_env("ZNUOST_TEST_PARSE_ENV", 5u64);
        std::env::remove_var("ZNUOST_TEST_PARSE_ENV");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_redirect_status_must_be_a_redirect() {
        for status in [301, 302, 303, 307, 308] {
            assert_eq!(validate_redirect_status(status).unwrap(), status);
        }
        for status in [200, 304, 404, 500] {
            assert!(validate_redirect_status(status).is_err());
        }
    }

    #[test]
    fn test_unknown_modes_fall_back_to_defaults() {
        assert_eq!(parse_tracking_mode("Background"), TrackingMode::Background);
        assert_eq!(parse_tracking_mode("eventually"), TrackingMode::Inline);
        assert_eq!(parse_counter_mode(" ATOMIC "), CounterMode::Atomic);
        assert_eq!(parse_counter_mode("exact"), CounterMode::Observed);
    }

    #[test]
    fn test_dedup_sweep_shorter_than_window_is_rejected() {
        let dedup = DedupConfig {
            window_ms: 2_000,
            sweep_age_ms: 1_000,
            max_entries: 10,
        };
        assert!(dedup.validate().is_err());

        let equal = DedupConfig {
            sweep_age_ms: 2_000,
            ..dedup.clone()
        };
        assert!(equal.validate().is_ok());
        assert!(DedupConfig::default().validate().is_ok());
    }

    #[test]
    fn test_dedup_zero_capacity_is_rejected() {
        let dedup = DedupConfig {
            max_entries: 0,
            ..DedupConfig::default()
        };
        assert!(dedup.validate().is_err());
    }

    #[test]
    fn test_parse_env_uses_default_when_unset() {
        let parsed = parse_env("ZNUOST_TEST_UNSET_VARIABLE", 42u16).unwrap();
        assert_eq!(parsed, 42);
    }
}
