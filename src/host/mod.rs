//! Tab scripting host.
//!
//! Everything that touches a live page goes through [`TabHost`]: running a
//! closure in the page's context against a [`PageAccessor`], and taking a
//! snapshot of the visible tab. Calls are awaited one at a time; nothing in
//! the crate batches them.

pub mod simulated;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::types::errors::HostError;
use crate::types::page::{ElementRef, OverflowStyle, OverlayView, ScrollMetrics};
use crate::types::tab::{PageMetrics, TabId};

/// View of a page's DOM as seen by a script running inside it.
pub trait PageAccessor {
    fn window_scroll_y(&self) -> f64;
    /// Scrolls the window instantly (no smooth behaviour).
    fn set_window_scroll_y(&mut self, y: f64);
    fn window_scroll_x(&self) -> f64;
    fn set_window_scroll_x(&mut self, x: f64);

    /// The document root (`<html>`).
    fn root(&self) -> ElementRef;
    fn body(&self) -> Option<ElementRef>;
    /// All attached elements in document order.
    fn elements(&self) -> Vec<ElementRef>;
    /// Whether the element is still attached to the document.
    fn contains(&self, element: ElementRef) -> bool;

    fn overflow_style(&self, element: ElementRef) -> OverflowStyle;
    fn scroll_metrics(&self, element: ElementRef) -> ScrollMetrics;
    fn set_scroll_top(&mut self, element: ElementRef, y: f64);
    /// `#id`, `.class` or the lowercase tag name.
    fn describe(&self, element: ElementRef) -> String;

    fn metrics(&self) -> PageMetrics;

    fn overlay(&self) -> Option<&OverlayView>;
    fn overlay_mut(&mut self) -> Option<&mut OverlayView>;
    /// Replaces any existing overlay; there is at most one per page.
    fn mount_overlay(&mut self, view: OverlayView);
    /// Returns whether an overlay was present.
    fn remove_overlay(&mut self) -> bool;
}

/// A closure run in the context of a page, producing a JSON result.
pub type PageScript = Box<dyn FnOnce(&mut dyn PageAccessor) -> Value + Send>;

/// The browser capabilities the capture pipeline depends on.
#[async_trait]
pub trait TabHost: Send + Sync {
    /// Runs `script` against the page loaded in `tab`.
    async fn run_script(&self, tab: TabId, script: PageScript) -> Result<Value, HostError>;

    /// Snapshots the visible content of `tab` as a PNG data URL.
    ///
    /// Fails with [`HostError::RateLimited`] when called faster than the
    /// platform allows and [`HostError::TabNotCapturable`] on system pages.
    async fn capture_visible(&self, tab: TabId) -> Result<String, HostError>;
}

/// Typed wrapper over [`TabHost::run_script`].
pub async fn run_in_page<T, F>(host: &dyn TabHost, tab: TabId, f: F) -> Result<T, HostError>
where
    F: FnOnce(&mut dyn PageAccessor) -> T + Send + 'static,
    T: Serialize + DeserializeOwned,
{
    let script: PageScript =
        Box::new(move |page| serde_json::to_value(f(page)).unwrap_or(Value::Null));
    let value = host.run_script(tab, script).await?;
    serde_json::from_value(value).map_err(|e| HostError::ScriptFailed(e.to_string()))
}
