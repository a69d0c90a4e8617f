use serde::{Deserialize, Serialize};

/// Tunable constants of the scroll-and-stitch loop.
///
/// The defaults were chosen empirically; none of them is optimal for every
/// layout, so all of them are persisted with the rest of the settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StitchConfig {
    /// Distance each slice after the first is pulled back, in CSS pixels.
    pub overlap_px: f64,
    /// Lower bound on the per-slice advance used for the slice estimate.
    pub min_advance_px: f64,
    /// Extra slices allowed beyond the estimate.
    pub slice_margin: u32,
    /// Consecutive zero-height slices that end the loop.
    pub no_progress_limit: u32,
    /// Wait after the initial move to the start offset.
    pub initial_settle_ms: u64,
    /// Wait after each slice scroll; also paces the capture primitive.
    pub slice_settle_ms: u64,
    /// Device-pixel slack when deciding the canvas is full.
    pub completion_tolerance_px: f64,
    /// Smallest start/end distance accepted by `finish`.
    pub min_distance_px: f64,
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            overlap_px: 150.0,
            min_advance_px: 100.0,
            slice_margin: 5,
            no_progress_limit: 3,
            initial_settle_ms: 300,
            slice_settle_ms: 600,
            completion_tolerance_px: 1.0,
            min_distance_px: 10.0,
        }
    }
}

/// Inputs of a single stitching run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StitchRequest {
    pub start_offset: f64,
    pub end_offset: f64,
    pub viewport_height: f64,
    pub device_pixel_ratio: f64,
    pub document_width: f64,
}

/// Derived geometry of a run. Computed once, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StitchPlan {
    /// CSS pixels to cover: distance plus one viewport.
    pub capture_height: f64,
    pub overlap_px: f64,
    pub effective_advance: f64,
    pub estimated_slice_count: u32,
    pub device_pixel_ratio: f64,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

/// Crop and placement of one captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SliceGeometry {
    /// Logical offset the slice represents.
    pub target_offset: f64,
    /// Offset the page actually settled at.
    pub actual_offset: f64,
    /// First bitmap row to copy, in device pixels.
    pub source_y: u32,
    /// CSS pixels that may still be drawn.
    pub draw_height: f64,
    /// Rows to copy, in device pixels.
    pub physical_draw_height: u32,
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// The canvas was filled.
    Filled,
    /// Consecutive slices produced nothing drawable.
    NoProgress,
    /// The crop start fell below the captured frame.
    ContentExhausted,
    /// The slice estimate was used up.
    SliceBudget,
}

/// Result of a stitching run.
#[derive(Debug, Clone, PartialEq)]
pub struct StitchOutcome {
    /// PNG data URL of the canvas.
    pub image: String,
    pub width: u32,
    pub height: u32,
    pub slices: u32,
    /// Device-pixel rows that received content.
    pub composed_height: u32,
    pub termination: Termination,
}

/// Tile layout of an automatic whole-document capture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPlan {
    pub columns: u32,
    pub rows: u32,
    /// Horizontal step between tiles, in CSS pixels.
    pub tile_width: f64,
    /// Vertical step between tiles, in CSS pixels.
    pub tile_height: f64,
    pub device_pixel_ratio: f64,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl GridPlan {
    pub fn tile_count(&self) -> u32 {
        self.columns * self.rows
    }

    /// Canvas position of a tile captured at the given scroll offsets.
    pub fn device_origin(&self, scroll_x: f64, scroll_y: f64) -> (i64, i64) {
        let dpr = self.device_pixel_ratio;
        ((scroll_x * dpr).round() as i64, (scroll_y * dpr).round() as i64)
    }
}

/// Result of a whole-document capture.
#[derive(Debug, Clone, PartialEq)]
pub struct GridOutcome {
    /// PNG data URL of the canvas.
    pub image: String,
    pub width: u32,
    pub height: u32,
    pub tiles: u32,
}
