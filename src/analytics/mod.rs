//! Click tracking
//!
//! Everything the redirect path does after it has decided where to send the
//! visitor: duplicate suppression, client classification, geolocation and
//! persistence. None of it is allowed to change the redirect outcome.

pub mod classifier;
pub mod dedup;
pub mod geoip;
pub mod ip_extractor;
pub mod models;
pub mod pipeline;
pub mod recorder;

pub use classifier::{ClientClassifier, KeywordClassifier};
pub use dedup::{DedupCache, DedupKey, MemoryDedupCache};
pub use geoip::{GeoLocator, IpApiLocator};
pub use ip_extractor::{extract_client_ip, extract_visit_context};
pub use models::{ClientInfo, GeoLocation, VisitContext};
pub use pipeline::ClickTracker;
pub use recorder::ClickRecorder;
