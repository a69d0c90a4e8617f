use std::fmt;

use super::tab::TabId;

// === SessionError ===

/// Errors raised by the per-tab capture session state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// `finish` was called before a start position was marked.
    NotArmed,
    /// The normalized scroll distance is below the configured minimum.
    DistanceTooSmall { distance: f64, minimum: f64 },
    /// The requested action is not valid in the session's current phase.
    InvalidTransition { phase: String, action: String },
    /// No session exists for the given tab.
    NotFound(TabId),
    /// The session is stitching and cannot accept the request.
    Busy(TabId),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotArmed => {
                write!(f, "Start position not marked: press \"Start\" first")
            }
            SessionError::DistanceTooSmall { distance, minimum } => write!(
                f,
                "Scroll distance too small: {}px (minimum {}px)",
                distance.round(),
                minimum
            ),
            SessionError::InvalidTransition { phase, action } => {
                write!(f, "Cannot {} while session is {}", action, phase)
            }
            SessionError::NotFound(tab) => write!(f, "No capture session for tab {}", tab),
            SessionError::Busy(tab) => write!(f, "Capture in progress for tab {}", tab),
        }
    }
}

impl std::error::Error for SessionError {}

// === HostError ===

/// Errors reported by the tab scripting host or its capture primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum HostError {
    /// The capture primitive was invoked faster than the platform allows.
    RateLimited(String),
    /// The host refuses to capture this page (system or store pages).
    TabNotCapturable(String),
    /// The tab no longer exists.
    TabNotFound(TabId),
    /// A script run in the page failed or returned an unexpected value.
    ScriptFailed(String),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::RateLimited(msg) => write!(f, "Capture rate limited: {}", msg),
            HostError::TabNotCapturable(url) => write!(f, "Tab cannot be captured: {}", url),
            HostError::TabNotFound(tab) => write!(f, "Tab not found: {}", tab),
            HostError::ScriptFailed(msg) => write!(f, "Page script failed: {}", msg),
        }
    }
}

impl std::error::Error for HostError {}

// === CodecError ===

/// Errors related to encoding and decoding raster images.
#[derive(Debug, Clone, PartialEq)]
pub enum CodecError {
    /// The payload is not valid base64.
    Base64(String),
    /// The bytes could not be decoded as an image.
    Decode(String),
    /// The bitmap could not be encoded.
    Encode(String),
    /// A requested crop region does not intersect the image.
    EmptyRegion,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Base64(msg) => write!(f, "Invalid base64 image data: {}", msg),
            CodecError::Decode(msg) => write!(f, "Image decode failed: {}", msg),
            CodecError::Encode(msg) => write!(f, "Image encode failed: {}", msg),
            CodecError::EmptyRegion => write!(f, "Crop region is empty"),
        }
    }
}

impl std::error::Error for CodecError {}

// === StitchError ===

/// Errors that abort a stitching run.
#[derive(Debug, Clone, PartialEq)]
pub enum StitchError {
    /// The host failed while scrolling or capturing.
    Host(HostError),
    /// A captured frame could not be decoded or the canvas not encoded.
    Codec(CodecError),
    /// The inputs cannot produce a canvas.
    Failure(String),
}

impl fmt::Display for StitchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StitchError::Host(e) => write!(f, "Stitching aborted: {}", e),
            StitchError::Codec(e) => write!(f, "Stitching aborted: {}", e),
            StitchError::Failure(msg) => write!(f, "Stitching failed: {}", msg),
        }
    }
}

impl std::error::Error for StitchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StitchError::Host(e) => Some(e),
            StitchError::Codec(e) => Some(e),
            StitchError::Failure(_) => None,
        }
    }
}

impl From<HostError> for StitchError {
    fn from(e: HostError) -> Self {
        StitchError::Host(e)
    }
}

impl From<CodecError> for StitchError {
    fn from(e: CodecError) -> Self {
        StitchError::Codec(e)
    }
}

// === CaptureError ===

/// Errors surfaced by capture commands (single-shot and full-page).
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureError {
    Session(SessionError),
    Host(HostError),
    Codec(CodecError),
    Stitch(StitchError),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::Session(e) => write!(f, "{}", e),
            CaptureError::Host(e) => write!(f, "{}", e),
            CaptureError::Codec(e) => write!(f, "{}", e),
            CaptureError::Stitch(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CaptureError {}

impl From<SessionError> for CaptureError {
    fn from(e: SessionError) -> Self {
        CaptureError::Session(e)
    }
}

impl From<HostError> for CaptureError {
    fn from(e: HostError) -> Self {
        CaptureError::Host(e)
    }
}

impl From<CodecError> for CaptureError {
    fn from(e: CodecError) -> Self {
        CaptureError::Codec(e)
    }
}

impl From<StitchError> for CaptureError {
    fn from(e: StitchError) -> Self {
        CaptureError::Stitch(e)
    }
}

// === ScreenshotError ===

/// Errors related to the pending screenshot store.
#[derive(Debug)]
pub enum ScreenshotError {
    /// Screenshot with the given ID was not found.
    NotFound(String),
    /// Database operation failed.
    DatabaseError(String),
}

impl fmt::Display for ScreenshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScreenshotError::NotFound(id) => write!(f, "Screenshot not found: {}", id),
            ScreenshotError::DatabaseError(msg) => {
                write!(f, "Screenshot database error: {}", msg)
            }
        }
    }
}

impl std::error::Error for ScreenshotError {}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    IoError(String),
    /// Failed to serialize or deserialize settings.
    SerializationError(String),
    /// The referenced scenario does not exist.
    ScenarioNotFound(String),
    /// The provided key path does not exist in the settings.
    InvalidKey(String),
    /// The provided settings value is invalid.
    InvalidValue(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::IoError(msg) => write!(f, "Settings I/O error: {}", msg),
            SettingsError::SerializationError(msg) => {
                write!(f, "Settings serialization error: {}", msg)
            }
            SettingsError::ScenarioNotFound(id) => write!(f, "Scenario not found: {}", id),
            SettingsError::InvalidKey(key) => write!(f, "Invalid settings key: {}", key),
            SettingsError::InvalidValue(msg) => {
                write!(f, "Invalid settings value: {}", msg)
            }
        }
    }
}

impl std::error::Error for SettingsError {}

// === UploadError ===

/// Errors related to forwarding screenshots to the configured endpoint.
#[derive(Debug)]
pub enum UploadError {
    /// No HTTP endpoint has been configured.
    NotConfigured,
    /// The configured request cannot be built.
    InvalidConfig(String),
    /// The request did not complete within the configured timeout (seconds).
    Timeout(u64),
    /// A network error occurred.
    NetworkError(String),
    /// The endpoint answered with a non-success status.
    HttpStatus { status: u16, reason: String },
    /// Uploading all pending screenshots was requested with an empty list.
    NothingToUpload,
    /// The pending screenshot list could not be read or cleared.
    Storage(String),
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::NotConfigured => write!(f, "No HTTP endpoint configured"),
            UploadError::InvalidConfig(msg) => write!(f, "Invalid upload config: {}", msg),
            UploadError::Timeout(secs) => write!(f, "Upload timed out after {}s", secs),
            UploadError::NetworkError(msg) => write!(f, "Upload network error: {}", msg),
            UploadError::HttpStatus { status, reason } => {
                write!(f, "HTTP {}: {}", status, reason)
            }
            UploadError::NothingToUpload => write!(f, "No screenshots to upload"),
            UploadError::Storage(msg) => write!(f, "Screenshot store error: {}", msg),
        }
    }
}

impl std::error::Error for UploadError {}

impl From<ScreenshotError> for UploadError {
    fn from(e: ScreenshotError) -> Self {
        UploadError::Storage(e.to_string())
    }
}

// === CurlError ===

/// Errors related to importing a cURL command.
#[derive(Debug, PartialEq)]
pub enum CurlError {
    /// The command is empty.
    Empty,
    /// A quoted argument is not terminated.
    UnterminatedQuote,
    /// No URL was found in the command.
    MissingUrl,
    /// A flag is missing its argument.
    MissingArgument(String),
}

impl fmt::Display for CurlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurlError::Empty => write!(f, "Empty cURL command"),
            CurlError::UnterminatedQuote => write!(f, "Unterminated quote in cURL command"),
            CurlError::MissingUrl => write!(f, "No valid URL found in cURL command"),
            CurlError::MissingArgument(flag) => write!(f, "Missing argument for {}", flag),
        }
    }
}

impl std::error::Error for CurlError {}
