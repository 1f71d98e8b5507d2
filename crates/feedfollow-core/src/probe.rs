#![forbid(unsafe_code)]

//! Element descriptors read from the host.
//!
//! The locator never touches host elements directly. It asks the host for an
//! [`ElementProbe`] per candidate and runs pure predicates over it.

/// Computed `overflow-y` value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Overflow {
    #[default]
    Visible,
    Hidden,
    Clip,
    Auto,
    Scroll,
}

impl Overflow {
    /// Parse a computed-style keyword. Unknown keywords map to `Visible`.
    #[must_use]
    pub fn from_css(value: &str) -> Self {
        match value.trim() {
            "auto" | "overlay" => Self::Auto,
            "scroll" => Self::Scroll,
            "hidden" => Self::Hidden,
            "clip" => Self::Clip,
            _ => Self::Visible,
        }
    }

    /// Whether the user can scroll an overflowing box with this value.
    #[must_use]
    pub const fn is_scrollable(self) -> bool {
        matches!(self, Self::Auto | Self::Scroll)
    }
}

/// Snapshot of one candidate element.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ElementProbe {
    pub client_height: f64,
    pub scroll_height: f64,
    pub overflow_y: Overflow,
    /// Contains at least one block-level descendant (`div` or `p`).
    pub has_block_children: bool,
    /// Not `display: none` and not `visibility: hidden`.
    pub visible: bool,
}

impl ElementProbe {
    /// Content is taller than the box.
    #[must_use]
    pub fn overflows(&self) -> bool {
        self.scroll_height > self.client_height
    }
}

/// Live scroll geometry of the bound container.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_height: f64,
    pub scroll_top: f64,
    pub client_height: f64,
}

impl ScrollMetrics {
    /// Pixels between the bottom of the viewport and the end of the content.
    #[must_use]
    pub fn distance_from_bottom(&self) -> f64 {
        self.scroll_height - self.scroll_top - self.client_height
    }
}
