use std::fmt;

use serde::{Deserialize, Serialize};

use super::tab::TabId;

/// Lifecycle phase of a full-page capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapturePhase {
    Idle,
    /// Overlay shown, start not yet marked.
    Armed,
    /// Start marked; waiting for the user to scroll and finish.
    Recording,
    Stitching,
    Completed,
    Cancelled,
    Failed,
}

impl CapturePhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CapturePhase::Completed | CapturePhase::Cancelled | CapturePhase::Failed
        )
    }

    /// Armed or Recording: the user is interacting with the overlay.
    pub fn is_interactive(self) -> bool {
        matches!(self, CapturePhase::Armed | CapturePhase::Recording)
    }
}

impl fmt::Display for CapturePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CapturePhase::Idle => "idle",
            CapturePhase::Armed => "armed",
            CapturePhase::Recording => "recording",
            CapturePhase::Stitching => "stitching",
            CapturePhase::Completed => "completed",
            CapturePhase::Cancelled => "cancelled",
            CapturePhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// State of one tab's full-page capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureSession {
    pub tab_id: TabId,
    pub phase: CapturePhase,
    pub start_offset: Option<f64>,
    pub end_offset: Option<f64>,
    pub failure: Option<String>,
    /// Encoded length of the finished artifact.
    pub artifact_size: Option<usize>,
    pub updated_at: i64,
}

impl CaptureSession {
    pub fn new(tab_id: TabId, now: i64) -> Self {
        Self {
            tab_id,
            phase: CapturePhase::Idle,
            start_offset: None,
            end_offset: None,
            failure: None,
            artifact_size: None,
            updated_at: now,
        }
    }
}

/// Normalized scroll range handed to the stitching engine by `finish`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollRange {
    pub start: f64,
    pub end: f64,
}

impl ScrollRange {
    /// Orders the two offsets so that `start <= end`.
    pub fn normalized(a: f64, b: f64) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    pub fn distance(&self) -> f64 {
        self.end - self.start
    }
}
