use serde::{Deserialize, Serialize};

/// Handle to an element inside a page. Only meaningful for the page that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementRef(pub u64);

/// Computed CSS overflow value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Overflow {
    #[default]
    Visible,
    Hidden,
    Clip,
    Auto,
    Scroll,
}

impl Overflow {
    /// Whether the value lets the user scroll the element.
    pub fn is_scrollable(self) -> bool {
        matches!(self, Overflow::Auto | Overflow::Scroll)
    }
}

/// Computed overflow of an element (`overflow` shorthand and `overflow-y`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OverflowStyle {
    pub overflow: Overflow,
    pub overflow_y: Overflow,
}

impl OverflowStyle {
    pub fn allows_scroll(&self) -> bool {
        self.overflow.is_scrollable() || self.overflow_y.is_scrollable()
    }
}

/// Vertical scroll metrics of an element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
}

impl ScrollMetrics {
    pub fn has_overflow(&self) -> bool {
        self.scroll_height > self.client_height
    }
}

/// Which part of the page scrolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "element", rename_all = "lowercase")]
pub enum ScrollTarget {
    Window,
    Element(ElementRef),
    #[default]
    None,
}

/// Content of the on-page marker control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayView {
    pub message: String,
    /// Live scroll position readout; refreshed by the display poll.
    pub position_label: String,
    /// Short description of the detected scroll target.
    pub target_label: String,
    pub show_start: bool,
    pub show_finish: bool,
    pub visible: bool,
}

impl OverlayView {
    pub fn armed() -> Self {
        Self {
            message: "Scroll to the start position, then press \"Start\"".to_string(),
            position_label: "Current position: detecting...".to_string(),
            target_label: "Scroll element: detecting...".to_string(),
            show_start: true,
            show_finish: false,
            visible: true,
        }
    }
}
