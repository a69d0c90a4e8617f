// pagesnap Document Capture
// Captures a whole document without user markers: walks a grid of
// viewport-sized tiles, scrolling to each one, and draws every tile where the
// page actually scrolled to. The last row and column are clamped by the
// browser, so they overlap their neighbours instead of running off the canvas.

use std::sync::Arc;
use std::time::Duration;

use image::{imageops, RgbaImage};
use tokio::time;
use tracing::{debug, info, warn};

use crate::host::{run_in_page, TabHost};
use crate::services::image_codec;
use crate::services::scroll_controller::ScrollController;
use crate::services::stitching_engine::MAX_CANVAS_SIDE;
use crate::services::viewport_capture::ViewportCapture;
use crate::types::errors::{CaptureError, HostError, StitchError};
use crate::types::page::ScrollMetrics;
use crate::types::stitch::{GridOutcome, GridPlan};
use crate::types::tab::{PageMetrics, TabId};

/// Lays out the tiles covering `extent` vertically and the document
/// horizontally.
pub fn plan_grid(metrics: &PageMetrics, extent: &ScrollMetrics) -> Result<GridPlan, StitchError> {
    let tile_width = metrics.viewport_width;
    let tile_height = if extent.client_height > 0.0 {
        extent.client_height
    } else {
        metrics.viewport_height
    };
    if !(tile_width.is_finite() && tile_width > 0.0 && tile_height.is_finite() && tile_height > 0.0)
    {
        return Err(StitchError::Failure(format!(
            "invalid viewport {}x{}",
            tile_width, tile_height
        )));
    }

    let content_width = metrics.document_width.max(tile_width);
    let content_height = extent.scroll_height.max(tile_height);
    let dpr = metrics.dpr();
    let canvas_width = (content_width * dpr).round().max(1.0);
    let canvas_height = (content_height * dpr).round().max(1.0);
    if canvas_width > MAX_CANVAS_SIDE as f64 || canvas_height > MAX_CANVAS_SIDE as f64 {
        return Err(StitchError::Failure(format!(
            "canvas {}x{} exceeds the {}px limit",
            canvas_width, canvas_height, MAX_CANVAS_SIDE
        )));
    }

    Ok(GridPlan {
        columns: (content_width / tile_width).ceil() as u32,
        rows: (content_height / tile_height).ceil() as u32,
        tile_width,
        tile_height,
        device_pixel_ratio: dpr,
        canvas_width: canvas_width as u32,
        canvas_height: canvas_height as u32,
    })
}

async fn scroll_window_x(host: &dyn TabHost, tab: TabId, x: f64) -> Result<f64, HostError> {
    run_in_page(host, tab, move |page| {
        page.set_window_scroll_x(x);
        page.window_scroll_x()
    })
    .await
}

/// One-shot capture of everything a tab can scroll to.
pub struct DocumentCapture {
    capture: Arc<ViewportCapture>,
    settle: Duration,
}

impl DocumentCapture {
    /// `settle` is the wait after each scroll before the tile is captured.
    pub fn new(capture: Arc<ViewportCapture>, settle: Duration) -> Self {
        Self { capture, settle }
    }

    /// Captures the document of `tab` tile by tile.
    ///
    /// Both scroll offsets are restored on every exit path once scrolling
    /// has begun. A restore failure is logged and does not change the result.
    pub async fn capture(&self, tab: TabId) -> Result<GridOutcome, CaptureError> {
        let host = self.capture.host().clone();
        let mut scroll = ScrollController::new(host.clone(), tab);
        scroll.detect().await;

        let extent = scroll.extent().await?;
        let metrics: PageMetrics = run_in_page(host.as_ref(), tab, |page| page.metrics()).await?;
        let original_x: f64 = run_in_page(host.as_ref(), tab, |page| page.window_scroll_x()).await?;
        let plan = plan_grid(&metrics, &extent)?;
        info!(
            tab = %tab,
            columns = plan.columns,
            rows = plan.rows,
            canvas_width = plan.canvas_width,
            canvas_height = plan.canvas_height,
            "document capture started"
        );

        let result = self.run_tiles(&mut scroll, &plan).await;

        if let Err(e) = scroll.set_offset(extent.scroll_top).await {
            warn!(tab = %tab, error = %e, "failed to restore scroll offset");
        }
        if let Err(e) = scroll_window_x(host.as_ref(), tab, original_x).await {
            warn!(tab = %tab, error = %e, "failed to restore horizontal scroll");
        }

        let canvas = result?;
        let image = image_codec::encode(&canvas)?;
        info!(tab = %tab, tiles = plan.tile_count(), "document capture finished");

        Ok(GridOutcome {
            image,
            width: canvas.width(),
            height: canvas.height(),
            tiles: plan.tile_count(),
        })
    }

    async fn run_tiles(
        &self,
        scroll: &mut ScrollController,
        plan: &GridPlan,
    ) -> Result<RgbaImage, CaptureError> {
        let tab = scroll.tab();
        let host = self.capture.host().clone();
        let mut canvas = RgbaImage::new(plan.canvas_width, plan.canvas_height);

        for row in 0..plan.rows {
            scroll.set_offset(row as f64 * plan.tile_height).await?;
            for column in 0..plan.columns {
                let actual_x =
                    scroll_window_x(host.as_ref(), tab, column as f64 * plan.tile_width).await?;
                time::sleep(self.settle).await;
                let actual_y = scroll.read_offset().await?;

                let frame = self.capture.capture_bitmap(tab).await?;
                let (x, y) = plan.device_origin(actual_x, actual_y);
                debug!(row, column, x, y, "tile captured");
                imageops::replace(&mut canvas, &frame, x, y);
            }
        }

        Ok(canvas)
    }
}
