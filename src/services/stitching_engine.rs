// pagesnap Stitching Engine
// Scrolls a page slice by slice, captures each viewport and composites the
// frames into one tall canvas. Slices after the first are pulled back by the
// overlap so whatever a fixed header hides at the top of a frame is cropped
// away instead of composited.

use std::sync::Arc;
use std::time::Duration;

use image::{imageops, RgbaImage};
use tokio::time;
use tracing::{debug, info, warn};

use crate::services::image_codec;
use crate::services::scroll_controller::ScrollController;
use crate::services::viewport_capture::ViewportCapture;
use crate::types::errors::StitchError;
use crate::types::stitch::{
    SliceGeometry, StitchConfig, StitchOutcome, StitchPlan, StitchRequest, Termination,
};

/// Largest canvas side the engine will allocate, in device pixels.
pub const MAX_CANVAS_SIDE: u32 = 32_767;

/// Derives the run geometry from a request.
pub fn plan(request: &StitchRequest, config: &StitchConfig) -> Result<StitchPlan, StitchError> {
    if !(request.viewport_height.is_finite() && request.viewport_height > 0.0) {
        return Err(StitchError::Failure(format!(
            "invalid viewport height {}",
            request.viewport_height
        )));
    }
    if !(request.start_offset.is_finite() && request.end_offset.is_finite())
        || request.end_offset < request.start_offset
    {
        return Err(StitchError::Failure(format!(
            "invalid scroll range {}..{}",
            request.start_offset, request.end_offset
        )));
    }

    let dpr = if request.device_pixel_ratio.is_finite() && request.device_pixel_ratio > 0.0 {
        request.device_pixel_ratio
    } else {
        1.0
    };
    let capture_height = request.end_offset - request.start_offset + request.viewport_height;
    let effective_advance = (request.viewport_height - config.overlap_px).max(config.min_advance_px);
    let estimated_slice_count =
        (capture_height / effective_advance).ceil() as u32 + config.slice_margin;

    let canvas_width = (request.document_width * dpr).round().max(1.0);
    let canvas_height = (capture_height * dpr).round().max(1.0);
    if canvas_width > MAX_CANVAS_SIDE as f64 || canvas_height > MAX_CANVAS_SIDE as f64 {
        return Err(StitchError::Failure(format!(
            "canvas {}x{} exceeds the {}px limit",
            canvas_width, canvas_height, MAX_CANVAS_SIDE
        )));
    }

    Ok(StitchPlan {
        capture_height,
        overlap_px: config.overlap_px,
        effective_advance,
        estimated_slice_count,
        device_pixel_ratio: dpr,
        canvas_width: canvas_width as u32,
        canvas_height: canvas_height as u32,
    })
}

/// Offset to scroll to for slice `index` (zero-based).
pub fn scroll_target_for(index: u32, current_y: f64, start_offset: f64, overlap_px: f64) -> f64 {
    if index == 0 {
        current_y
    } else {
        start_offset.max(current_y - overlap_px)
    }
}

/// Crop and placement of a frame captured at `actual_offset` while the
/// loop logically stands at `current_y`.
pub fn slice_geometry(
    plan: &StitchPlan,
    current_y: f64,
    target_offset: f64,
    actual_offset: f64,
    bitmap_height: u32,
    composed: u32,
) -> SliceGeometry {
    let dpr = plan.device_pixel_ratio;
    let source_y = ((current_y - actual_offset) * dpr).max(0.0).round() as u32;
    let draw_height =
        (bitmap_height as f64 / dpr).min(plan.capture_height - composed as f64 / dpr);
    let physical = (draw_height * dpr)
        .min(bitmap_height as f64 - source_y as f64)
        .min(plan.canvas_height as f64 - composed as f64)
        .floor()
        .max(0.0);

    SliceGeometry {
        target_offset,
        actual_offset,
        source_y,
        draw_height,
        physical_draw_height: physical as u32,
    }
}

/// Loop bookkeeping of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StitchProgress {
    /// Logical offset of the next uncomposited content.
    pub current_y: f64,
    /// Canvas rows written so far.
    pub composed: u32,
    pub no_progress: u32,
    pub slices: u32,
}

impl StitchProgress {
    pub fn new(start_offset: f64) -> Self {
        Self {
            current_y: start_offset,
            composed: 0,
            no_progress: 0,
            slices: 0,
        }
    }

    pub fn is_filled(&self, plan: &StitchPlan, config: &StitchConfig) -> bool {
        self.composed as f64 >= plan.canvas_height as f64 - config.completion_tolerance_px
    }

    /// Accounts for one captured slice. Returns a termination when the loop
    /// must stop after this slice.
    pub fn record(
        &mut self,
        geometry: &SliceGeometry,
        bitmap_height: u32,
        plan: &StitchPlan,
        config: &StitchConfig,
    ) -> Option<Termination> {
        self.slices += 1;
        if geometry.physical_draw_height > 0 {
            self.composed += geometry.physical_draw_height;
            self.current_y += geometry.physical_draw_height as f64 / plan.device_pixel_ratio;
            self.no_progress = 0;
        } else {
            self.no_progress += 1;
            if self.no_progress >= config.no_progress_limit {
                return Some(Termination::NoProgress);
            }
            if geometry.source_y >= bitmap_height {
                return Some(Termination::ContentExhausted);
            }
        }
        if self.is_filled(plan, config) {
            return Some(Termination::Filled);
        }
        None
    }
}

/// Runs the capture loop against one tab at a time.
pub struct StitchingEngine {
    capture: Arc<ViewportCapture>,
    config: StitchConfig,
}

impl StitchingEngine {
    pub fn new(capture: Arc<ViewportCapture>, config: StitchConfig) -> Self {
        Self { capture, config }
    }

    pub fn config(&self) -> &StitchConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: StitchConfig) {
        self.config = config;
    }

    /// Captures `request.start_offset..request.end_offset` plus one viewport.
    ///
    /// The page's scroll offset is restored on every exit path. A restore
    /// failure is logged and does not change the result.
    pub async fn stitch(
        &self,
        scroll: &mut ScrollController,
        request: &StitchRequest,
    ) -> Result<StitchOutcome, StitchError> {
        let plan = plan(request, &self.config)?;
        info!(
            tab = %scroll.tab(),
            capture_height = plan.capture_height,
            slices = plan.estimated_slice_count,
            canvas_width = plan.canvas_width,
            canvas_height = plan.canvas_height,
            "stitching started"
        );

        let original_offset = scroll.read_offset().await?;
        let result = self.run_slices(scroll, request, &plan).await;

        if let Err(e) = scroll.set_offset(original_offset).await {
            warn!(tab = %scroll.tab(), error = %e, "failed to restore scroll offset");
        }

        let (canvas, progress, termination) = result?;
        let image = image_codec::encode(&canvas)?;
        info!(
            tab = %scroll.tab(),
            slices = progress.slices,
            composed = progress.composed,
            ?termination,
            "stitching finished"
        );

        Ok(StitchOutcome {
            image,
            width: canvas.width(),
            height: canvas.height(),
            slices: progress.slices,
            composed_height: progress.composed,
            termination,
        })
    }

    async fn run_slices(
        &self,
        scroll: &mut ScrollController,
        request: &StitchRequest,
        plan: &StitchPlan,
    ) -> Result<(RgbaImage, StitchProgress, Termination), StitchError> {
        let mut canvas = RgbaImage::new(plan.canvas_width, plan.canvas_height);
        let mut progress = StitchProgress::new(request.start_offset);

        scroll.set_offset(request.start_offset).await?;
        time::sleep(Duration::from_millis(self.config.initial_settle_ms)).await;

        let termination = loop {
            if progress.is_filled(plan, &self.config) {
                break Termination::Filled;
            }
            if progress.slices >= plan.estimated_slice_count {
                break Termination::SliceBudget;
            }

            let target = scroll_target_for(
                progress.slices,
                progress.current_y,
                request.start_offset,
                plan.overlap_px,
            );
            scroll.set_offset(target).await?;
            time::sleep(Duration::from_millis(self.config.slice_settle_ms)).await;
            let actual = scroll.read_offset().await?;

            let frame = image_codec::decode(&self.capture.capture(scroll.tab()).await?)?;
            let geometry = slice_geometry(
                plan,
                progress.current_y,
                target,
                actual,
                frame.height(),
                progress.composed,
            );
            debug!(
                slice = progress.slices + 1,
                target = geometry.target_offset,
                actual = geometry.actual_offset,
                source_y = geometry.source_y,
                rows = geometry.physical_draw_height,
                "slice captured"
            );

            if geometry.physical_draw_height > 0 {
                let strip = imageops::crop_imm(
                    &frame,
                    0,
                    geometry.source_y,
                    frame.width(),
                    geometry.physical_draw_height,
                )
                .to_image();
                imageops::replace(&mut canvas, &strip, 0, progress.composed as i64);
            }

            if let Some(termination) = progress.record(&geometry, frame.height(), plan, &self.config)
            {
                break termination;
            }
        };

        Ok((canvas, progress, termination))
    }
}
