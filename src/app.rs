//! App Core for pagesnap.
//!
//! Central struct holding the capture pipeline, the screenshot store, the
//! settings and the uploader. Every field is internally synchronized, so an
//! `App` is shared by reference across tasks.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{info, warn};

use crate::database::connection::Database;
use crate::host::TabHost;
use crate::managers::screenshot_manager::{ScreenshotManager, ScreenshotManagerTrait};
use crate::services::full_page_capture::FullPageCapture;
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::services::upload_service::{
    now_millis, Placeholders, UploadResponse, UploadService, UploadSummary,
};
use crate::services::viewport_capture::ViewportCapture;
use crate::types::errors::{CaptureError, ScreenshotError, UploadError};
use crate::types::screenshot::StoredScreenshot;
use crate::types::settings::AppSettings;
use crate::types::stitch::GridOutcome;
use crate::types::tab::{CropArea, TabId};

/// Pause between consecutive requests of [`App::upload_all`].
pub const UPLOAD_PACING: Duration = Duration::from_millis(500);

/// Central application struct holding all managers and services.
///
/// `ScreenshotManager` borrows the connection, so it is created on demand
/// through [`App::with_screenshots`].
pub struct App {
    db: Mutex<Database>,
    settings_engine: Mutex<SettingsEngine>,
    pub capture: Arc<ViewportCapture>,
    pub full_page: FullPageCapture,
    pub upload_service: UploadService,
}

impl App {
    /// Builds an app over `host`, loading settings from `settings_engine`.
    ///
    /// A settings file that fails to load is logged and replaced by defaults.
    pub fn new(host: Arc<dyn TabHost>, db: Database, mut settings_engine: SettingsEngine) -> Self {
        if let Err(e) = settings_engine.load() {
            warn!(error = %e, path = settings_engine.get_config_path(), "using default settings");
        }
        let capture = Arc::new(ViewportCapture::new(host));
        let full_page = FullPageCapture::new(
            capture.clone(),
            settings_engine.get_settings().capture.clone(),
        );
        info!(path = settings_engine.get_config_path(), "app initialized");

        Self {
            db: Mutex::new(db),
            settings_engine: Mutex::new(settings_engine),
            capture,
            full_page,
            upload_service: UploadService::new(),
        }
    }

    /// Opens the database at `db_path` and settings at `settings_path`
    /// (platform default when `None`).
    pub fn open(
        host: Arc<dyn TabHost>,
        db_path: &str,
        settings_path: Option<String>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let db = Database::open(db_path)?;
        Ok(Self::new(host, db, SettingsEngine::new(settings_path)))
    }

    /// Snapshot of the current settings.
    pub fn settings(&self) -> AppSettings {
        self.lock_settings().get_settings().clone()
    }

    /// Runs `f` against the settings engine, then re-applies capture tuning.
    pub fn update_settings<R>(&self, f: impl FnOnce(&mut SettingsEngine) -> R) -> R {
        let mut engine = self.lock_settings();
        let result = f(&mut engine);
        self.full_page
            .set_config(engine.get_settings().capture.clone());
        result
    }

    /// Runs `f` with a screenshot manager over the app database.
    pub fn with_screenshots<R>(&self, f: impl FnOnce(&mut ScreenshotManager<'_>) -> R) -> R {
        let db = self.db.lock().unwrap_or_else(|p| p.into_inner());
        let mut manager = ScreenshotManager::new(db.connection());
        f(&mut manager)
    }

    pub async fn capture_visible(&self, tab: TabId) -> Result<String, CaptureError> {
        Ok(self.capture.capture(tab).await?)
    }

    pub async fn capture_region(&self, tab: TabId, area: CropArea) -> Result<String, CaptureError> {
        self.capture.capture_region(tab, area).await
    }

    /// Captures the whole document of `tab` as a grid of viewport tiles.
    pub async fn capture_full(&self, tab: TabId) -> Result<GridOutcome, CaptureError> {
        self.full_page.capture_document(tab).await
    }

    pub fn add_screenshot(&self, data: &str) -> Result<StoredScreenshot, ScreenshotError> {
        self.with_screenshots(|m| m.add(data))
    }

    /// Uploads one image with the active endpoint configuration.
    pub async fn upload_image(&self, data_url: &str) -> Result<UploadResponse, UploadError> {
        let (config, scenario) = self.active_upload_config()?;
        let placeholders = Placeholders::single(data_url, now_millis(), &scenario);
        self.upload_service.upload(&config, &placeholders).await
    }

    /// Uploads every pending screenshot with its own request, pausing
    /// [`UPLOAD_PACING`] between requests. The list is cleared only when
    /// every upload succeeded.
    pub async fn upload_all(&self) -> Result<UploadSummary, UploadError> {
        let pending = self.with_screenshots(|m| m.list())?;
        if pending.is_empty() {
            return Err(UploadError::NothingToUpload);
        }
        let (config, scenario) = self.active_upload_config()?;

        let mut summary = UploadSummary { succeeded: 0, failed: 0 };
        for (index, shot) in pending.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(UPLOAD_PACING).await;
            }
            let placeholders = Placeholders::single(&shot.data, now_millis(), &scenario);
            match self.upload_service.upload(&config, &placeholders).await {
                Ok(_) => summary.succeeded += 1,
                Err(e) => {
                    warn!(id = %shot.id, error = %e, "screenshot upload failed");
                    summary.failed += 1;
                }
            }
        }

        if summary.failed == 0 {
            let cleared = self.with_screenshots(|m| m.clear())?;
            info!(cleared, "pending screenshots uploaded");
        } else {
            warn!(
                succeeded = summary.succeeded,
                failed = summary.failed,
                "keeping pending screenshots after failed uploads"
            );
        }
        Ok(summary)
    }

    fn active_upload_config(
        &self,
    ) -> Result<(crate::types::scenario::HttpConfig, String), UploadError> {
        let engine = self.lock_settings();
        let upload = &engine.get_settings().upload;
        let config = upload
            .active_config()
            .filter(|c| !c.url.trim().is_empty())
            .cloned()
            .ok_or(UploadError::NotConfigured)?;
        let scenario = upload
            .current_scenario()
            .map(|s| s.name.clone())
            .unwrap_or_default();
        Ok((config, scenario))
    }

    fn lock_settings(&self) -> MutexGuard<'_, SettingsEngine> {
        self.settings_engine.lock().unwrap_or_else(|p| p.into_inner())
    }
}
