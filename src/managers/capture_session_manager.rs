//! Capture session registry for pagesnap.
//!
//! Implements `CaptureSessionRegistryTrait`: one explicit state machine per
//! tab, `Idle → Armed → Recording → Stitching → Completed | Cancelled | Failed`.
//! Every method takes the lock for a single transition and releases it before
//! returning, so callers never hold it across an await.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;

use crate::types::errors::SessionError;
use crate::types::session::{CapturePhase, CaptureSession, ScrollRange};
use crate::types::tab::TabId;

/// Result of [`CaptureSessionRegistryTrait::arm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmResult {
    /// A new session was armed.
    Armed,
    /// A session was already active; its phase is returned untouched.
    Unchanged(CapturePhase),
}

/// Trait defining the capture session transitions.
pub trait CaptureSessionRegistryTrait {
    fn arm(&self, tab: TabId) -> ArmResult;
    fn mark_start(&self, tab: TabId, offset: f64) -> Result<(), SessionError>;
    fn finish(&self, tab: TabId, end_offset: f64) -> Result<ScrollRange, SessionError>;
    fn complete(&self, tab: TabId, artifact_size: usize) -> Result<(), SessionError>;
    fn fail(&self, tab: TabId, reason: &str) -> Result<(), SessionError>;
    fn cancel(&self, tab: TabId) -> Result<CapturePhase, SessionError>;
    fn get(&self, tab: TabId) -> Option<CaptureSession>;
}

struct RegistryState {
    sessions: HashMap<TabId, CaptureSession>,
    min_distance: f64,
}

/// In-memory session registry keyed by tab.
pub struct CaptureSessionRegistry {
    state: Mutex<RegistryState>,
}

impl CaptureSessionRegistry {
    /// Creates an empty registry rejecting ranges shorter than `min_distance`.
    pub fn new(min_distance: f64) -> Self {
        Self {
            state: Mutex::new(RegistryState {
                sessions: HashMap::new(),
                min_distance,
            }),
        }
    }

    pub fn set_min_distance(&self, min_distance: f64) {
        self.lock().min_distance = min_distance;
    }

    /// Phase of the tab's session, `Idle` when there is none.
    pub fn phase(&self, tab: TabId) -> CapturePhase {
        self.lock()
            .sessions
            .get(&tab)
            .map(|s| s.phase)
            .unwrap_or(CapturePhase::Idle)
    }

    /// Sessions that are neither idle nor terminal.
    pub fn active_count(&self) -> usize {
        self.lock()
            .sessions
            .values()
            .filter(|s| s.phase != CapturePhase::Idle && !s.phase.is_terminal())
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }

    fn invalid(session: &CaptureSession, action: &str) -> SessionError {
        SessionError::InvalidTransition {
            phase: session.phase.to_string(),
            action: action.to_string(),
        }
    }
}

impl CaptureSessionRegistryTrait for CaptureSessionRegistry {
    /// Arms a capture for `tab`. Idle and finished sessions are replaced.
    fn arm(&self, tab: TabId) -> ArmResult {
        let mut state = self.lock();
        let now = Self::now();
        let session = state
            .sessions
            .entry(tab)
            .or_insert_with(|| CaptureSession::new(tab, now));

        if session.phase.is_interactive() || session.phase == CapturePhase::Stitching {
            return ArmResult::Unchanged(session.phase);
        }

        *session = CaptureSession::new(tab, now);
        session.phase = CapturePhase::Armed;
        info!(tab = %tab, "capture session armed");
        ArmResult::Armed
    }

    fn mark_start(&self, tab: TabId, offset: f64) -> Result<(), SessionError> {
        let mut state = self.lock();
        let session = state
            .sessions
            .get_mut(&tab)
            .ok_or(SessionError::NotFound(tab))?;

        if session.phase != CapturePhase::Armed {
            return Err(Self::invalid(session, "mark start"));
        }
        session.start_offset = Some(offset);
        session.phase = CapturePhase::Recording;
        session.updated_at = Self::now();
        info!(tab = %tab, offset, "start position marked");
        Ok(())
    }

    /// Moves a recording session to `Stitching` and returns its range.
    ///
    /// A range shorter than the minimum distance leaves the session recording
    /// so the user can scroll further and retry.
    fn finish(&self, tab: TabId, end_offset: f64) -> Result<ScrollRange, SessionError> {
        let mut state = self.lock();
        let minimum = state.min_distance;
        let session = state
            .sessions
            .get_mut(&tab)
            .ok_or(SessionError::NotFound(tab))?;

        match session.phase {
            CapturePhase::Recording => {}
            CapturePhase::Stitching => return Err(SessionError::Busy(tab)),
            _ => return Err(SessionError::NotArmed),
        }
        let start = session.start_offset.ok_or(SessionError::NotArmed)?;

        let range = ScrollRange::normalized(start, end_offset);
        if range.distance() < minimum {
            return Err(SessionError::DistanceTooSmall {
                distance: range.distance(),
                minimum,
            });
        }

        session.start_offset = Some(range.start);
        session.end_offset = Some(range.end);
        session.phase = CapturePhase::Stitching;
        session.updated_at = Self::now();
        info!(tab = %tab, start = range.start, end = range.end, "stitching scheduled");
        Ok(range)
    }

    fn complete(&self, tab: TabId, artifact_size: usize) -> Result<(), SessionError> {
        let mut state = self.lock();
        let session = state
            .sessions
            .get_mut(&tab)
            .ok_or(SessionError::NotFound(tab))?;

        if session.phase != CapturePhase::Stitching {
            return Err(Self::invalid(session, "complete"));
        }
        session.phase = CapturePhase::Completed;
        session.artifact_size = Some(artifact_size);
        session.updated_at = Self::now();
        info!(tab = %tab, artifact_size, "capture completed");
        Ok(())
    }

    /// Marks the session failed from any non-terminal phase.
    fn fail(&self, tab: TabId, reason: &str) -> Result<(), SessionError> {
        let mut state = self.lock();
        let session = state
            .sessions
            .get_mut(&tab)
            .ok_or(SessionError::NotFound(tab))?;

        if session.phase.is_terminal() {
            return Err(Self::invalid(session, "fail"));
        }
        session.phase = CapturePhase::Failed;
        session.failure = Some(reason.to_string());
        session.updated_at = Self::now();
        info!(tab = %tab, reason, "capture failed");
        Ok(())
    }

    /// Cancels an armed or recording session.
    ///
    /// Idle and terminal sessions are left alone and their phase returned.
    /// A stitching session cannot be interrupted and yields `Busy`.
    fn cancel(&self, tab: TabId) -> Result<CapturePhase, SessionError> {
        let mut state = self.lock();
        let session = state
            .sessions
            .get_mut(&tab)
            .ok_or(SessionError::NotFound(tab))?;

        match session.phase {
            CapturePhase::Armed | CapturePhase::Recording => {
                session.phase = CapturePhase::Cancelled;
                session.updated_at = Self::now();
                info!(tab = %tab, "capture cancelled");
                Ok(CapturePhase::Cancelled)
            }
            CapturePhase::Stitching => Err(SessionError::Busy(tab)),
            phase => Ok(phase),
        }
    }

    fn get(&self, tab: TabId) -> Option<CaptureSession> {
        self.lock().sessions.get(&tab).cloned()
    }
}
