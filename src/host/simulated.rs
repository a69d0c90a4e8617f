//! In-process page and host model.
//!
//! `SimulatedPage` paints every document row with a colour derived from its
//! y coordinate, so a stitched image can be checked row by row. A fixed
//! header and the marker overlay are painted on top of the content the way a
//! browser would composite them. `SimulatedHost` serves pages by tab and
//! enforces the capture rate ceiling.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use serde_json::Value;
use tokio::time::Instant;

use super::{PageAccessor, PageScript, TabHost};
use crate::services::image_codec;
use crate::types::errors::HostError;
use crate::types::page::{ElementRef, Overflow, OverflowStyle, OverlayView, ScrollMetrics};
use crate::types::tab::{PageMetrics, TabId};

/// Colour of fixed header rows.
pub const HEADER_PIXEL: Rgba<u8> = Rgba([0, 0, 0, 255]);
/// Colour of the marker overlay box.
pub const OVERLAY_PIXEL: Rgba<u8> = Rgba([255, 0, 255, 255]);

/// Colour of document row `y`. Unique for the first 65536 rows.
pub fn content_pixel(y: u32) -> Rgba<u8> {
    Rgba([(y % 256) as u8, ((y / 256) % 256) as u8, 200, 255])
}

/// Inverse of [`content_pixel`]; `None` for header, overlay or blank pixels.
pub fn content_row(pixel: &Rgba<u8>) -> Option<u32> {
    if pixel[2] != 200 || pixel[3] != 255 {
        return None;
    }
    Some(pixel[0] as u32 + pixel[1] as u32 * 256)
}

const ROOT: ElementRef = ElementRef(0);
const BODY: ElementRef = ElementRef(1);

#[derive(Debug, Clone)]
struct SimElement {
    tag: String,
    html_id: Option<String>,
    class: Option<String>,
    style: OverflowStyle,
    metrics: ScrollMetrics,
    attached: bool,
}

/// What scrolls the visible content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSource {
    Window,
    Element(ElementRef),
}

/// A page with a deterministic rendering.
#[derive(Debug, Clone)]
pub struct SimulatedPage {
    pub url: String,
    viewport_width: f64,
    viewport_height: f64,
    device_pixel_ratio: f64,
    document_width: f64,
    document_height: f64,
    window_scroll_y: f64,
    window_scroll_x: f64,
    elements: Vec<SimElement>,
    content: ContentSource,
    fixed_header_px: f64,
    overlay: Option<OverlayView>,
    overlay_mounts: u32,
}

impl SimulatedPage {
    /// A page scrolled by the window, `document_height` CSS pixels tall.
    pub fn new(viewport_width: f64, viewport_height: f64, document_height: f64, dpr: f64) -> Self {
        let body = SimElement {
            tag: "body".to_string(),
            html_id: None,
            class: None,
            style: OverflowStyle::default(),
            metrics: ScrollMetrics {
                scroll_top: 0.0,
                scroll_height: document_height,
                client_height: document_height,
            },
            attached: true,
        };
        let root = SimElement {
            tag: "html".to_string(),
            html_id: None,
            class: None,
            style: OverflowStyle::default(),
            metrics: ScrollMetrics::default(),
            attached: true,
        };
        Self {
            url: "https://example.com/".to_string(),
            viewport_width,
            viewport_height,
            device_pixel_ratio: dpr,
            document_width: viewport_width,
            document_height,
            window_scroll_y: 0.0,
            window_scroll_x: 0.0,
            elements: vec![root, body],
            content: ContentSource::Window,
            fixed_header_px: 0.0,
            overlay: None,
            overlay_mounts: 0,
        }
    }

    /// An app-shell page: the document fits the viewport and a full-size
    /// `div#app` with `overflow-y: auto` scrolls `content_height` pixels.
    pub fn with_scroll_container(
        viewport_width: f64,
        viewport_height: f64,
        content_height: f64,
        dpr: f64,
    ) -> Self {
        let mut page = Self::new(viewport_width, viewport_height, viewport_height, dpr);
        let container = page.add_element(
            "div",
            Some("app"),
            None,
            OverflowStyle {
                overflow: Overflow::Visible,
                overflow_y: Overflow::Auto,
            },
            ScrollMetrics {
                scroll_top: 0.0,
                scroll_height: content_height,
                client_height: viewport_height,
            },
        );
        page.content = ContentSource::Element(container);
        page
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    /// Paints a fixed header over the top `px` CSS pixels of every frame.
    pub fn with_fixed_header(mut self, px: f64) -> Self {
        self.fixed_header_px = px;
        self
    }

    pub fn with_document_width(mut self, width: f64) -> Self {
        self.document_width = width;
        self
    }

    /// Appends an element to the document and returns its handle.
    pub fn add_element(
        &mut self,
        tag: &str,
        html_id: Option<&str>,
        class: Option<&str>,
        style: OverflowStyle,
        metrics: ScrollMetrics,
    ) -> ElementRef {
        self.elements.push(SimElement {
            tag: tag.to_string(),
            html_id: html_id.map(str::to_string),
            class: class.map(str::to_string),
            style,
            metrics,
            attached: true,
        });
        ElementRef(self.elements.len() as u64 - 1)
    }

    /// Removes an element from the document; its handle goes stale.
    pub fn detach(&mut self, element: ElementRef) {
        if let Some(el) = self.elements.get_mut(element.0 as usize) {
            el.attached = false;
        }
    }

    /// Makes `element` the scroller of the visible content.
    pub fn set_content_source(&mut self, source: ContentSource) {
        self.content = source;
    }

    pub fn content_source(&self) -> ContentSource {
        self.content
    }

    /// Current offset of whatever scrolls the content.
    pub fn content_offset(&self) -> f64 {
        match self.content {
            ContentSource::Window => self.window_scroll_y,
            ContentSource::Element(el) => self.scroll_metrics(el).scroll_top,
        }
    }

    /// Scrolls the content scroller, clamped like a browser would.
    pub fn scroll_content_to(&mut self, y: f64) {
        match self.content {
            ContentSource::Window => self.set_window_scroll_y(y),
            ContentSource::Element(el) => self.set_scroll_top(el, y),
        }
    }

    /// Largest offset the content scroller can reach.
    pub fn max_content_offset(&self) -> f64 {
        match self.content {
            ContentSource::Window => self.max_window_scroll(),
            ContentSource::Element(el) => {
                let m = self.scroll_metrics(el);
                (m.scroll_height - m.client_height).max(0.0)
            }
        }
    }

    /// How many times an overlay was mounted on this page.
    pub fn overlay_mounts(&self) -> u32 {
        self.overlay_mounts
    }

    fn max_window_scroll(&self) -> f64 {
        match self.content {
            ContentSource::Window => (self.document_height - self.viewport_height).max(0.0),
            ContentSource::Element(_) => 0.0,
        }
    }

    fn element(&self, element: ElementRef) -> Option<&SimElement> {
        self.elements.get(element.0 as usize).filter(|e| e.attached)
    }

    /// Renders the visible viewport in device pixels.
    pub fn render_viewport(&self) -> RgbaImage {
        let dpr = self.device_pixel_ratio;
        let width = ((self.viewport_width * dpr).round() as u32).max(1);
        let height = ((self.viewport_height * dpr).round() as u32).max(1);
        let offset = self.content_offset();

        let overlay_visible = self.overlay.as_ref().map(|o| o.visible).unwrap_or(false);
        let overlay_left = ((self.viewport_width - 300.0).max(0.0) * dpr) as u32;
        let overlay_right = ((self.viewport_width - 20.0).max(0.0) * dpr) as u32;
        let overlay_top = (20.0 * dpr) as u32;
        let overlay_bottom = (140.0 * dpr) as u32;

        RgbaImage::from_fn(width, height, |x, y| {
            let css_y = y as f64 / dpr;
            if overlay_visible
                && (overlay_left..overlay_right).contains(&x)
                && (overlay_top..overlay_bottom).contains(&y)
            {
                OVERLAY_PIXEL
            } else if css_y < self.fixed_header_px {
                HEADER_PIXEL
            } else {
                content_pixel((offset + css_y).floor() as u32)
            }
        })
    }
}

impl PageAccessor for SimulatedPage {
    fn window_scroll_y(&self) -> f64 {
        self.window_scroll_y
    }

    fn set_window_scroll_y(&mut self, y: f64) {
        self.window_scroll_y = y.clamp(0.0, self.max_window_scroll());
    }

    fn window_scroll_x(&self) -> f64 {
        self.window_scroll_x
    }

    /// Rows do not vary horizontally, so only the offset is tracked.
    fn set_window_scroll_x(&mut self, x: f64) {
        let max = (self.document_width - self.viewport_width).max(0.0);
        self.window_scroll_x = x.clamp(0.0, max);
    }

    fn root(&self) -> ElementRef {
        ROOT
    }

    fn body(&self) -> Option<ElementRef> {
        self.element(BODY).map(|_| BODY)
    }

    fn elements(&self) -> Vec<ElementRef> {
        self.elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.attached)
            .map(|(i, _)| ElementRef(i as u64))
            .collect()
    }

    fn contains(&self, element: ElementRef) -> bool {
        self.element(element).is_some()
    }

    fn overflow_style(&self, element: ElementRef) -> OverflowStyle {
        self.element(element).map(|e| e.style).unwrap_or_default()
    }

    fn scroll_metrics(&self, element: ElementRef) -> ScrollMetrics {
        if element == ROOT {
            // The root mirrors the window scroll in standards mode.
            let scroll_height = match self.content {
                ContentSource::Window => self.document_height,
                ContentSource::Element(_) => self.viewport_height,
            };
            return ScrollMetrics {
                scroll_top: self.window_scroll_y,
                scroll_height,
                client_height: self.viewport_height,
            };
        }
        self.element(element).map(|e| e.metrics).unwrap_or_default()
    }

    fn set_scroll_top(&mut self, element: ElementRef, y: f64) {
        if element == ROOT {
            self.set_window_scroll_y(y);
            return;
        }
        if let Some(el) = self.elements.get_mut(element.0 as usize) {
            if el.attached {
                let max = (el.metrics.scroll_height - el.metrics.client_height).max(0.0);
                el.metrics.scroll_top = y.clamp(0.0, max);
            }
        }
    }

    fn describe(&self, element: ElementRef) -> String {
        match self.element(element) {
            Some(el) => {
                if let Some(id) = &el.html_id {
                    format!("#{}", id)
                } else if let Some(class) = &el.class {
                    format!(".{}", class.split(' ').next().unwrap_or_default())
                } else {
                    el.tag.clone()
                }
            }
            None => "detached".to_string(),
        }
    }

    fn metrics(&self) -> PageMetrics {
        PageMetrics {
            viewport_width: self.viewport_width,
            viewport_height: self.viewport_height,
            device_pixel_ratio: self.device_pixel_ratio,
            document_width: self.document_width,
            document_height: self.document_height,
        }
    }

    fn overlay(&self) -> Option<&OverlayView> {
        self.overlay.as_ref()
    }

    fn overlay_mut(&mut self) -> Option<&mut OverlayView> {
        self.overlay.as_mut()
    }

    fn mount_overlay(&mut self, view: OverlayView) {
        self.overlay = Some(view);
        self.overlay_mounts += 1;
    }

    fn remove_overlay(&mut self) -> bool {
        self.overlay.take().is_some()
    }
}

const UNCAPTURABLE_PREFIXES: &[&str] = &[
    "chrome://",
    "chrome-extension://",
    "edge://",
    "about:",
    "https://chrome.google.com/webstore",
];

/// Host serving [`SimulatedPage`]s.
pub struct SimulatedHost {
    pages: Mutex<HashMap<TabId, SimulatedPage>>,
    min_capture_interval: Duration,
    last_capture: Mutex<Option<Instant>>,
    capture_count: AtomicU32,
    capture_failure: Mutex<Option<(u32, HostError)>>,
}

impl SimulatedHost {
    /// A host allowing two captures per second.
    pub fn new() -> Self {
        Self::with_capture_interval(Duration::from_millis(500))
    }

    pub fn with_capture_interval(min_capture_interval: Duration) -> Self {
        Self {
            pages: Mutex::new(HashMap::new()),
            min_capture_interval,
            last_capture: Mutex::new(None),
            capture_count: AtomicU32::new(0),
            capture_failure: Mutex::new(None),
        }
    }

    pub fn insert_page(&self, tab: TabId, page: SimulatedPage) {
        self.lock_pages().insert(tab, page);
    }

    /// Runs `f` against the page in `tab`, if any.
    pub fn with_page<R>(&self, tab: TabId, f: impl FnOnce(&mut SimulatedPage) -> R) -> Option<R> {
        self.lock_pages().get_mut(&tab).map(f)
    }

    /// Successful captures so far.
    pub fn capture_count(&self) -> u32 {
        self.capture_count.load(Ordering::SeqCst)
    }

    /// Makes every capture after the first `successes` fail with `error`.
    pub fn fail_captures_after(&self, successes: u32, error: HostError) {
        *self
            .capture_failure
            .lock()
            .unwrap_or_else(|p| p.into_inner()) = Some((successes, error));
    }

    fn lock_pages(&self) -> std::sync::MutexGuard<'_, HashMap<TabId, SimulatedPage>> {
        self.pages.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn check_rate(&self) -> Result<(), HostError> {
        let mut last = self.last_capture.lock().unwrap_or_else(|p| p.into_inner());
        let now = Instant::now();
        if let Some(previous) = *last {
            if now.duration_since(previous) < self.min_capture_interval {
                return Err(HostError::RateLimited(
                    "MAX_CAPTURE_VISIBLE_TAB_CALLS_PER_SECOND exceeded".to_string(),
                ));
            }
        }
        *last = Some(now);
        Ok(())
    }
}

impl Default for SimulatedHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TabHost for SimulatedHost {
    async fn run_script(&self, tab: TabId, script: PageScript) -> Result<Value, HostError> {
        let mut pages = self.lock_pages();
        let page = pages.get_mut(&tab).ok_or(HostError::TabNotFound(tab))?;
        Ok(script(page as &mut dyn PageAccessor))
    }

    async fn capture_visible(&self, tab: TabId) -> Result<String, HostError> {
        let frame = {
            let pages = self.lock_pages();
            let page = pages.get(&tab).ok_or(HostError::TabNotFound(tab))?;
            if UNCAPTURABLE_PREFIXES.iter().any(|p| page.url.starts_with(p)) {
                return Err(HostError::TabNotCapturable(page.url.clone()));
            }
            page.render_viewport()
        };

        if let Some((successes, error)) = self
            .capture_failure
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .as_ref()
        {
            if self.capture_count() >= *successes {
                return Err(error.clone());
            }
        }

        self.check_rate()?;
        let encoded = image_codec::encode(&frame)
            .map_err(|e| HostError::ScriptFailed(e.to_string()))?;
        self.capture_count.fetch_add(1, Ordering::SeqCst);
        Ok(encoded)
    }
}
