use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque handle to a browser tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Geometry of the visible page, as reported by the page itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PageMetrics {
    pub viewport_width: f64,
    /// Client height of the root element; excludes a horizontal scrollbar.
    pub viewport_height: f64,
    pub device_pixel_ratio: f64,
    /// Widest of the root and body scroll widths.
    pub document_width: f64,
    pub document_height: f64,
}

impl PageMetrics {
    /// Device pixel ratio, falling back to 1 for pages reporting nonsense.
    pub fn dpr(&self) -> f64 {
        if self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0 {
            self.device_pixel_ratio
        } else {
            1.0
        }
    }
}

/// A rectangle in CSS pixels relative to the viewport.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CropArea {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropArea {
    /// Converts to device pixels.
    pub fn scaled(&self, dpr: f64) -> CropArea {
        CropArea {
            x: self.x * dpr,
            y: self.y * dpr,
            width: self.width * dpr,
            height: self.height * dpr,
        }
    }
}
