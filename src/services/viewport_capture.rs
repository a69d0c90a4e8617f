// pagesnap Viewport Capture
// Wraps the host snapshot primitive and keeps invocations under the platform's
// capture-rate ceiling. Also implements the single-shot visible/region captures.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{self, Instant};
use tracing::debug;

use crate::host::{run_in_page, TabHost};
use crate::services::image_codec::{self, Bitmap};
use crate::types::errors::{CaptureError, HostError};
use crate::types::tab::{CropArea, PageMetrics, TabId};

/// Platform ceiling is about two captures per second.
pub const DEFAULT_MIN_CAPTURE_INTERVAL: Duration = Duration::from_millis(500);

/// Paced access to [`TabHost::capture_visible`].
pub struct ViewportCapture {
    host: Arc<dyn TabHost>,
    min_interval: Duration,
    last_capture: Mutex<Option<Instant>>,
}

impl ViewportCapture {
    pub fn new(host: Arc<dyn TabHost>) -> Self {
        Self::with_min_interval(host, DEFAULT_MIN_CAPTURE_INTERVAL)
    }

    pub fn with_min_interval(host: Arc<dyn TabHost>, min_interval: Duration) -> Self {
        Self {
            host,
            min_interval,
            last_capture: Mutex::new(None),
        }
    }

    pub fn host(&self) -> &Arc<dyn TabHost> {
        &self.host
    }

    /// Snapshots the visible content of `tab` as a PNG data URL.
    ///
    /// Waits until `min_interval` has passed since the previous call. The lock
    /// is held across the wait so concurrent callers queue in order.
    pub async fn capture(&self, tab: TabId) -> Result<String, HostError> {
        let mut last = self.last_capture.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.min_interval;
            if Instant::now() < ready_at {
                debug!(tab = %tab, "pacing viewport capture");
                time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
        self.host.capture_visible(tab).await
    }

    /// Captures and decodes in one step.
    pub async fn capture_bitmap(&self, tab: TabId) -> Result<Bitmap, CaptureError> {
        let encoded = self.capture(tab).await?;
        Ok(image_codec::decode(&encoded)?)
    }

    /// Captures the viewport and crops `area`, given in CSS pixels.
    pub async fn capture_region(&self, tab: TabId, area: CropArea) -> Result<String, CaptureError> {
        let metrics: PageMetrics = run_in_page(self.host.as_ref(), tab, |page| page.metrics()).await?;
        let bitmap = self.capture_bitmap(tab).await?;
        let region = image_codec::crop(&bitmap, &area.scaled(metrics.dpr()))?;
        Ok(image_codec::encode(&region)?)
    }
}
