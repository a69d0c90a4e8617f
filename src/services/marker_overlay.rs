// pagesnap Marker Overlay
// The on-page control shown during a scroll capture. At most one per page;
// mounting removes any previous instance. A background task refreshes the
// position readout every 500ms for display only.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, warn};

use crate::host::{run_in_page, TabHost};
use crate::services::scroll_controller::ScrollController;
use crate::types::errors::HostError;
use crate::types::page::OverlayView;
use crate::types::tab::TabId;

pub const POSITION_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct MarkerOverlay {
    host: Arc<dyn TabHost>,
    polls: Mutex<HashMap<TabId, JoinHandle<()>>>,
}

impl MarkerOverlay {
    pub fn new(host: Arc<dyn TabHost>) -> Self {
        Self {
            host,
            polls: Mutex::new(HashMap::new()),
        }
    }

    /// Mounts a fresh overlay, replacing any existing one.
    pub async fn mount(&self, tab: TabId) -> Result<(), HostError> {
        let replaced: bool = run_in_page(self.host.as_ref(), tab, |page| {
            let replaced = page.remove_overlay();
            page.mount_overlay(OverlayView::armed());
            replaced
        })
        .await?;
        if replaced {
            debug!(tab = %tab, "replaced stale overlay");
        }
        Ok(())
    }

    /// Shows `message` and makes the overlay visible. Returns whether an
    /// overlay was present.
    pub async fn show_message(&self, tab: TabId, message: String) -> Result<bool, HostError> {
        self.update(tab, move |view| {
            view.message = message;
            view.visible = true;
        })
        .await
    }

    /// Switches the controls to the recording layout.
    pub async fn show_recording(&self, tab: TabId, start_offset: f64) -> Result<bool, HostError> {
        self.update(tab, move |view| {
            view.message = format!(
                "Start position recorded: {}px\nScroll to the end position, then press \"Finish\"",
                start_offset.round()
            );
            view.show_start = false;
            view.show_finish = true;
            view.visible = true;
        })
        .await
    }

    pub async fn set_visible(&self, tab: TabId, visible: bool) -> Result<bool, HostError> {
        self.update(tab, move |view| view.visible = visible).await
    }

    /// Stops the display poll and removes the overlay.
    ///
    /// Teardown never fails; host errors are logged.
    pub async fn remove(&self, tab: TabId) {
        self.stop_position_poll(tab);
        match run_in_page(self.host.as_ref(), tab, |page| page.remove_overlay()).await {
            Ok(true) => debug!(tab = %tab, "overlay removed"),
            Ok(false) => {}
            Err(e) => warn!(tab = %tab, error = %e, "failed to remove overlay"),
        }
    }

    /// Starts refreshing the position and target labels. Replaces a poll
    /// already running for `tab`. The task ends on its own once the overlay
    /// or the tab is gone.
    pub fn start_position_poll(&self, tab: TabId, scroll: Arc<tokio::sync::Mutex<ScrollController>>) {
        let host = self.host.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(POSITION_POLL_INTERVAL);
            loop {
                ticker.tick().await;
                // Skip the tick while a capture holds the controller.
                let Ok(mut controller) = scroll.try_lock() else {
                    continue;
                };
                let position = controller.position().await;
                drop(controller);

                let (offset, label) = match position {
                    Ok(position) => position,
                    Err(e) => {
                        debug!(tab = %tab, error = %e, "position poll stopped");
                        break;
                    }
                };
                let updated: Result<bool, HostError> =
                    run_in_page(host.as_ref(), tab, move |page| match page.overlay_mut() {
                        Some(view) => {
                            view.position_label = format!("Current position: {}px", offset.round());
                            view.target_label = format!("Scroll element: {}", label);
                            true
                        }
                        None => false,
                    })
                    .await;
                if !matches!(updated, Ok(true)) {
                    break;
                }
            }
        });

        if let Some(previous) = self.lock_polls().insert(tab, handle) {
            previous.abort();
        }
    }

    pub fn stop_position_poll(&self, tab: TabId) {
        if let Some(handle) = self.lock_polls().remove(&tab) {
            handle.abort();
        }
    }

    pub fn is_polling(&self, tab: TabId) -> bool {
        self.lock_polls()
            .get(&tab)
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    fn lock_polls(&self) -> std::sync::MutexGuard<'_, HashMap<TabId, JoinHandle<()>>> {
        self.polls.lock().unwrap_or_else(|p| p.into_inner())
    }

    async fn update<F>(&self, tab: TabId, f: F) -> Result<bool, HostError>
    where
        F: FnOnce(&mut OverlayView) + Send + 'static,
    {
        run_in_page(self.host.as_ref(), tab, move |page| match page.overlay_mut() {
            Some(view) => {
                f(view);
                true
            }
            None => false,
        })
        .await
    }
}

impl Drop for MarkerOverlay {
    fn drop(&mut self) {
        for (_, handle) in self.lock_polls().drain() {
            handle.abort();
        }
    }
}
