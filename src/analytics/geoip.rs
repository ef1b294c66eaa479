//! IP geolocation over an ip-api compatible HTTP service
//!
//! Lookups never fail from the caller's point of view: private and
//! unidentified sources resolve to "Local" without touching the network,
//! and every lookup error collapses to "Unknown".

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, warn};

use crate::analytics::models::{GeoLocation, UNKNOWN_LOCATION};

/// Sentinel used when the client IP could not be determined
pub const UNKNOWN_IP: &str = "unknown";

#[async_trait]
pub trait GeoLocator: Send + Sync {
    /// Resolve an IP to a country and city. Always returns populated labels.
    async fn resolve(&self, ip: &str) -> GeoLocation;
}

/// Returns true for addresses that are never sent to the lookup service
pub fn is_local_source(ip: &str) -> bool {
    if ip == UNKNOWN_IP || ip.starts_with("192.168") {
        return true;
    }

    ip.parse::<IpAddr>()
        .map(|addr| addr.is_loopback())
        .unwrap_or(false)
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: Option<String>,
    country: Option<String>,
    city: Option<String>,
}

/// Geolocation through `GET {base}/json/{ip}`
#[derive(Clone)]
pub struct IpApiLocator {
    client: Client,
    base_url: Url,
}

impl IpApiLocator {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("znuost-geo/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client for geolocation")?;

        let base_url = Url::parse(base_url)
            .with_context(|| format!("invalid geolocation service URL '{base_url}'"))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("geolocation service URL '{base_url}' cannot be used as a base");
        }

        Ok(Self { client, base_url })
    }

    fn lookup_url(&self, ip: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("json").push(ip);
        }
        url
    }

    async fn lookup(&self, ip: &str) -> Result<GeoLocation> {
        let response = self
            .client
            .get(self.lookup_url(ip))
            .send()
            .await
            .context("geolocation request failed")?;

        let body: IpApiResponse = response
            .json()
            .await
            .context("geolocation response was not valid JSON")?;

        if body.status.as_deref() != Some("success") {
            anyhow::bail!(
                "geolocation service reported status {:?}",
                body.status.unwrap_or_default()
            );
        }

        Ok(GeoLocation {
            country: label_or_unknown(body.country),
            city: label_or_unknown(body.city),
        })
    }
}

fn label_or_unknown(value: Option<String>) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| UNKNOWN_LOCATION.to_string())
}

#[async_trait]
impl GeoLocator for IpApiLocator {
    async fn resolve(&self, ip: &str) -> GeoLocation {
        if is_local_source(ip) {
            return GeoLocation::local();
        }

        match self.lookup(ip).await {
            Ok(location) => {
                debug!(ip, country = %location.country, city = %location.city, "geolocated client");
                location
            }
            Err(err) => {
                warn!(ip, error = %format!("{err:#}"), "geo lookup failed");
                GeoLocation::unknown()
            }
        }
    }
}
