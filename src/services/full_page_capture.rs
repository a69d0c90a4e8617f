// pagesnap Full-Page Capture
// Drives a scroll capture end to end: arms the session, shows the marker
// overlay, records the start, stitches on finish and tears everything down.
// Also runs the marker-free whole-document capture.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{info, warn};

use crate::host::{run_in_page, TabHost};
use crate::managers::capture_session_manager::{
    ArmResult, CaptureSessionRegistry, CaptureSessionRegistryTrait,
};
use crate::services::document_capture::DocumentCapture;
use crate::services::marker_overlay::MarkerOverlay;
use crate::services::scroll_controller::ScrollController;
use crate::services::stitching_engine::StitchingEngine;
use crate::services::viewport_capture::ViewportCapture;
use crate::types::errors::{CaptureError, SessionError};
use crate::types::session::{CapturePhase, CaptureSession, ScrollRange};
use crate::types::stitch::{GridOutcome, StitchConfig, StitchOutcome, StitchRequest};
use crate::types::tab::{PageMetrics, TabId};

type SharedController = Arc<tokio::sync::Mutex<ScrollController>>;

pub struct FullPageCapture {
    host: Arc<dyn TabHost>,
    capture: Arc<ViewportCapture>,
    registry: CaptureSessionRegistry,
    overlay: MarkerOverlay,
    config: Mutex<StitchConfig>,
    controllers: Mutex<HashMap<TabId, SharedController>>,
}

impl FullPageCapture {
    pub fn new(capture: Arc<ViewportCapture>, config: StitchConfig) -> Self {
        let host = capture.host().clone();
        Self {
            registry: CaptureSessionRegistry::new(config.min_distance_px),
            overlay: MarkerOverlay::new(host.clone()),
            host,
            capture,
            config: Mutex::new(config),
            controllers: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &CaptureSessionRegistry {
        &self.registry
    }

    pub fn overlay(&self) -> &MarkerOverlay {
        &self.overlay
    }

    pub fn config(&self) -> StitchConfig {
        self.config.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Applies to captures started after the call.
    pub fn set_config(&self, config: StitchConfig) {
        self.registry.set_min_distance(config.min_distance_px);
        *self.config.lock().unwrap_or_else(|p| p.into_inner()) = config;
    }

    pub fn status(&self, tab: TabId) -> Option<CaptureSession> {
        self.registry.get(tab)
    }

    /// Arms a capture and shows the overlay.
    ///
    /// A tab that is already capturing is left alone and its phase returned.
    pub async fn start(&self, tab: TabId) -> Result<CapturePhase, CaptureError> {
        if let ArmResult::Unchanged(phase) = self.registry.arm(tab) {
            info!(tab = %tab, %phase, "capture already active");
            return Ok(phase);
        }

        let controller: SharedController =
            Arc::new(tokio::sync::Mutex::new(ScrollController::new(self.host.clone(), tab)));
        self.lock_controllers().insert(tab, controller.clone());

        if let Err(e) = self.overlay.mount(tab).await {
            self.lock_controllers().remove(&tab);
            if let Err(fe) = self.registry.fail(tab, &e.to_string()) {
                warn!(tab = %tab, error = %fe, "could not record failure");
            }
            return Err(e.into());
        }

        controller.lock().await.detect().await;
        self.overlay.start_position_poll(tab, controller);
        Ok(CapturePhase::Armed)
    }

    /// Records the start position: `offset`, or the page's current one.
    ///
    /// Outside the armed phase the error is shown on the overlay and returned;
    /// the session is left as it was.
    pub async fn mark_start(&self, tab: TabId, offset: Option<f64>) -> Result<f64, CaptureError> {
        if self.registry.phase(tab) != CapturePhase::Armed {
            let e = match self.registry.get(tab) {
                Some(session) => SessionError::InvalidTransition {
                    phase: session.phase.to_string(),
                    action: "mark start".to_string(),
                },
                None => SessionError::NotFound(tab),
            };
            self.report(tab, e.to_string()).await;
            return Err(e.into());
        }
        let controller = self.controller(tab).ok_or(SessionError::NotFound(tab))?;
        let start = {
            let mut scroll = controller.lock().await;
            scroll.detect().await;
            match offset {
                Some(y) => y,
                None => scroll.read_offset().await?,
            }
        };

        if let Err(e) = self.registry.mark_start(tab, start) {
            self.report(tab, e.to_string()).await;
            return Err(e.into());
        }
        if let Err(e) = self.overlay.show_recording(tab, start).await {
            warn!(tab = %tab, error = %e, "failed to update overlay");
        }
        Ok(start)
    }

    /// Stitches from the recorded start to `end_offset`, or to the page's
    /// current offset.
    ///
    /// `NotArmed` and `DistanceTooSmall` are shown on the overlay and leave
    /// the session recording. Once stitching starts the overlay is removed
    /// whatever the result.
    pub async fn finish(
        &self,
        tab: TabId,
        end_offset: Option<f64>,
    ) -> Result<StitchOutcome, CaptureError> {
        match self.registry.get(tab) {
            None => return Err(SessionError::NotFound(tab).into()),
            Some(session) if session.phase == CapturePhase::Stitching => {
                return Err(SessionError::Busy(tab).into())
            }
            Some(_) => {}
        }
        let Some(controller) = self.controller(tab) else {
            return Err(SessionError::NotArmed.into());
        };
        let mut scroll = controller.lock().await;
        let end = match end_offset {
            Some(y) => y,
            None => scroll.read_offset().await?,
        };

        let range = match self.registry.finish(tab, end) {
            Ok(range) => range,
            Err(e) => {
                match &e {
                    SessionError::NotArmed => self.report(tab, e.to_string()).await,
                    SessionError::DistanceTooSmall { .. } => {
                        self.report(tab, format!("{}\nScroll further, then press \"Finish\"", e))
                            .await
                    }
                    _ => {}
                }
                return Err(e.into());
            }
        };

        if let Err(e) = self.overlay.set_visible(tab, false).await {
            warn!(tab = %tab, error = %e, "failed to hide overlay");
        }
        let result = self.stitch(&mut scroll, range).await;
        drop(scroll);

        self.overlay.remove(tab).await;
        self.lock_controllers().remove(&tab);

        match result {
            Ok(outcome) => {
                self.registry.complete(tab, outcome.image.len())?;
                Ok(outcome)
            }
            Err(e) => {
                if let Err(fe) = self.registry.fail(tab, &e.to_string()) {
                    warn!(tab = %tab, error = %fe, "could not record failure");
                }
                Err(e)
            }
        }
    }

    /// Cancels an armed or recording capture and removes the overlay.
    pub async fn cancel(&self, tab: TabId) -> Result<CapturePhase, CaptureError> {
        let phase = self.registry.cancel(tab)?;
        if phase == CapturePhase::Cancelled {
            self.overlay.remove(tab).await;
            self.lock_controllers().remove(&tab);
        }
        Ok(phase)
    }

    /// Captures the whole document of `tab` without markers.
    ///
    /// Refused while a marker capture of the same tab is stitching, since
    /// both would move the page.
    pub async fn capture_document(&self, tab: TabId) -> Result<GridOutcome, CaptureError> {
        if self.registry.phase(tab) == CapturePhase::Stitching {
            return Err(SessionError::Busy(tab).into());
        }
        let settle = Duration::from_millis(self.config().slice_settle_ms);
        DocumentCapture::new(self.capture.clone(), settle)
            .capture(tab)
            .await
    }

    async fn stitch(
        &self,
        scroll: &mut ScrollController,
        range: ScrollRange,
    ) -> Result<StitchOutcome, CaptureError> {
        let metrics: PageMetrics =
            run_in_page(self.host.as_ref(), scroll.tab(), |page| page.metrics()).await?;
        let request = StitchRequest {
            start_offset: range.start,
            end_offset: range.end,
            viewport_height: metrics.viewport_height,
            device_pixel_ratio: metrics.dpr(),
            document_width: metrics.document_width,
        };
        let engine = StitchingEngine::new(self.capture.clone(), self.config());
        Ok(engine.stitch(scroll, &request).await?)
    }

    async fn report(&self, tab: TabId, message: String) {
        if let Err(e) = self.overlay.show_message(tab, message).await {
            warn!(tab = %tab, error = %e, "failed to show overlay message");
        }
    }

    fn controller(&self, tab: TabId) -> Option<SharedController> {
        self.lock_controllers().get(&tab).cloned()
    }

    fn lock_controllers(&self) -> MutexGuard<'_, HashMap<TabId, SharedController>> {
        self.controllers.lock().unwrap_or_else(|p| p.into_inner())
    }
}
