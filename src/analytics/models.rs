//! Data models for click analytics

use serde::{Deserialize, Serialize};

/// Label used for browser and OS when no keyword matched
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Location label used when a lookup was attempted and failed
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// Location label used for private-network and unidentified sources
pub const LOCAL_LOCATION: &str = "Local";

/// Geographic location attached to every recorded click
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub country: String,
    pub city: String,
}

impl GeoLocation {
    pub fn local() -> Self {
        Self {
            country: LOCAL_LOCATION.to_string(),
            city: LOCAL_LOCATION.to_string(),
        }
    }

    pub fn unknown() -> Self {
        Self {
            country: UNKNOWN_LOCATION.to_string(),
            city: UNKNOWN_LOCATION.to_string(),
        }
    }
}

/// Coarse client classification derived from the user-agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// "mobile" or "desktop"
    pub device_type: String,
    pub browser: String,
    pub os: String,
}

/// Request data the tracking pipeline needs, extracted from the inbound request
#[derive(Debug, Clone)]
pub struct VisitContext {
    pub client_ip: String,
    pub user_agent: String,
    pub referrer: String,
}
