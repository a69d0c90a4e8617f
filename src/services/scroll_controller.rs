// pagesnap Scroll Controller
// Finds what scrolls a page (the window, the root, the body or an inner
// container) and reads or moves its offset. The detected target is cached per
// tab and re-validated on every read.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::host::{run_in_page, PageAccessor, TabHost};
use crate::types::errors::HostError;
use crate::types::page::{ElementRef, ScrollMetrics, ScrollTarget};
use crate::types::tab::TabId;

/// Finds the element, or the window, that scrolls the page.
///
/// Priority: a scrolled window, a scrolled root, a scrolled body, the first
/// scrolled overflow container. When nothing is scrolled yet, the first of
/// root, body or overflow container that has more content than room.
pub fn detect_scroll_target(page: &dyn PageAccessor) -> ScrollTarget {
    if page.window_scroll_y() > 0.0 {
        return ScrollTarget::Window;
    }

    let root = page.root();
    if page.scroll_metrics(root).scroll_top > 0.0 {
        return ScrollTarget::Element(root);
    }

    let body = page.body();
    if let Some(body) = body {
        if page.scroll_metrics(body).scroll_top > 0.0 {
            return ScrollTarget::Element(body);
        }
    }

    let elements = page.elements();
    let is_container = |el: ElementRef| {
        page.overflow_style(el).allows_scroll() && page.scroll_metrics(el).has_overflow()
    };

    if let Some(el) = elements
        .iter()
        .copied()
        .find(|&el| is_container(el) && page.scroll_metrics(el).scroll_top > 0.0)
    {
        return ScrollTarget::Element(el);
    }

    if page.scroll_metrics(root).has_overflow() {
        return ScrollTarget::Element(root);
    }
    if let Some(body) = body {
        if page.scroll_metrics(body).has_overflow() {
            return ScrollTarget::Element(body);
        }
    }
    elements
        .into_iter()
        .find(|&el| is_container(el))
        .map(ScrollTarget::Element)
        .unwrap_or(ScrollTarget::None)
}

/// Returns `cached` when still usable, else a fresh detection.
pub fn resolve(page: &dyn PageAccessor, cached: Option<ScrollTarget>) -> ScrollTarget {
    match cached {
        Some(ScrollTarget::Window) => ScrollTarget::Window,
        Some(ScrollTarget::Element(el)) if page.contains(el) => ScrollTarget::Element(el),
        _ => detect_scroll_target(page),
    }
}

pub fn read_offset(page: &dyn PageAccessor, target: ScrollTarget) -> f64 {
    match target {
        ScrollTarget::Window => page.window_scroll_y(),
        ScrollTarget::Element(el) => page.scroll_metrics(el).scroll_top,
        ScrollTarget::None => 0.0,
    }
}

/// Offset, content height and visible height along the target's axis.
///
/// The window, and a page with no detected scroller, measure the document.
pub fn scroll_extent(page: &dyn PageAccessor, target: ScrollTarget) -> ScrollMetrics {
    match target {
        ScrollTarget::Element(el) => page.scroll_metrics(el),
        ScrollTarget::Window | ScrollTarget::None => {
            let metrics = page.metrics();
            ScrollMetrics {
                scroll_top: page.window_scroll_y(),
                scroll_height: metrics.document_height,
                client_height: metrics.viewport_height,
            }
        }
    }
}

/// Moves the target instantly. No-op for [`ScrollTarget::None`].
pub fn set_offset(page: &mut dyn PageAccessor, target: ScrollTarget, y: f64) {
    match target {
        ScrollTarget::Window => page.set_window_scroll_y(y),
        ScrollTarget::Element(el) => page.set_scroll_top(el, y),
        ScrollTarget::None => {}
    }
}

/// Short label for the overlay.
pub fn describe_target(page: &dyn PageAccessor, target: ScrollTarget) -> String {
    match target {
        ScrollTarget::Window => "window".to_string(),
        ScrollTarget::Element(el) if el == page.root() => "html".to_string(),
        ScrollTarget::Element(el) if Some(el) == page.body() => "body".to_string(),
        ScrollTarget::Element(el) => page.describe(el),
        ScrollTarget::None => "not detected".to_string(),
    }
}

/// Per-tab scroll access with a cached target.
pub struct ScrollController {
    host: Arc<dyn TabHost>,
    tab: TabId,
    target: Option<ScrollTarget>,
}

impl ScrollController {
    pub fn new(host: Arc<dyn TabHost>, tab: TabId) -> Self {
        Self {
            host,
            tab,
            target: None,
        }
    }

    pub fn tab(&self) -> TabId {
        self.tab
    }

    /// The cached target, if detection has run.
    pub fn target(&self) -> Option<ScrollTarget> {
        self.target
    }

    /// Runs detection and replaces the cached target.
    ///
    /// Never fails: host errors degrade to [`ScrollTarget::None`].
    pub async fn detect(&mut self) -> ScrollTarget {
        let target = match run_in_page(self.host.as_ref(), self.tab, |page| {
            detect_scroll_target(page)
        })
        .await
        {
            Ok(target) => target,
            Err(e) => {
                warn!(tab = %self.tab, error = %e, "scroll target detection failed");
                ScrollTarget::None
            }
        };
        debug!(tab = %self.tab, ?target, "scroll target detected");
        self.target = Some(target);
        target
    }

    /// Reads the current offset, re-detecting when the cached element is gone.
    pub async fn read_offset(&mut self) -> Result<f64, HostError> {
        let cached = self.target;
        let (target, offset): (ScrollTarget, f64) =
            run_in_page(self.host.as_ref(), self.tab, move |page| {
                let target = resolve(page, cached);
                (target, read_offset(page, target))
            })
            .await?;
        self.target = Some(target);
        Ok(offset)
    }

    pub async fn set_offset(&mut self, y: f64) -> Result<(), HostError> {
        let cached = self.target;
        let target: ScrollTarget = run_in_page(self.host.as_ref(), self.tab, move |page| {
            let target = resolve(page, cached);
            set_offset(page, target, y);
            target
        })
        .await?;
        self.target = Some(target);
        Ok(())
    }

    pub async fn extent(&mut self) -> Result<ScrollMetrics, HostError> {
        let cached = self.target;
        let (target, extent): (ScrollTarget, ScrollMetrics) =
            run_in_page(self.host.as_ref(), self.tab, move |page| {
                let target = resolve(page, cached);
                (target, scroll_extent(page, target))
            })
            .await?;
        self.target = Some(target);
        Ok(extent)
    }

    /// Current offset together with the target's label.
    pub async fn position(&mut self) -> Result<(f64, String), HostError> {
        let cached = self.target;
        let (target, offset, label): (ScrollTarget, f64, String) =
            run_in_page(self.host.as_ref(), self.tab, move |page| {
                let target = resolve(page, cached);
                (target, read_offset(page, target), describe_target(page, target))
            })
            .await?;
        self.target = Some(target);
        Ok((offset, label))
    }
}
