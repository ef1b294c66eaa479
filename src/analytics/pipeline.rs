use std::sync::Arc;
use tracing::info;

use crate::analytics::classifier::ClientClassifier;
use crate::analytics::geoip::GeoLocator;
use crate::analytics::models::VisitContext;
use crate::analytics::recorder::ClickRecorder;
use crate::models::{NewClick, ShortLink};
use crate::storage::unix_now;

/// Classify, geolocate and persist one counted click
#[derive(Clone)]
pub struct ClickTracker {
    classifier: Arc<dyn ClientClassifier>,
    geo: Arc<dyn GeoLocator>,
    recorder: ClickRecorder,
}

impl ClickTracker {
    pub fn new(
        classifier: Arc<dyn ClientClassifier>,
        geo: Arc<dyn GeoLocator>,
        recorder: ClickRecorder,
    ) -> Self {
        Self {
            classifier,
            geo,
            recorder,
        }
    }

    /// `link` is the row read at lookup time; its `total_clicks` is the
    /// observed count the recorder increments from.
    pub async fn track(&self, link: &ShortLink, visit: VisitContext) {
        let client = self.classifier.classify(&visit.user_agent);
        let location = self.geo.resolve(&visit.client_ip).await;

        let click = NewClick {
            link_id: link.id,
            ip_address: visit.client_ip,
            device_type: client.device_type,
            browser: client.browser,
            os: client.os,
            referrer: visit.referrer,
            user_agent: visit.user_agent,
            country: location.country,
            city: location.city,
            clicked_at: unix_now(),
        };

        if self
            .recorder
            .record_and_count(&click, link.total_clicks)
            .await
        {
            info!(
                short_code = %link.short_code,
                city = %click.city,
                country = %click.country,
                "click tracked"
            );
        }
    }
}
