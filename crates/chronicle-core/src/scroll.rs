// Scroll-position preservation across timeline mutations
//
// Pure pixel arithmetic: the rendering layer reports viewport geometry and
// applies the returned commands. Prepends are compensated so anchored
// content does not jump; appends auto-scroll only when the reader was
// already at (or near) the bottom, or on first population.

use serde::{Deserialize, Serialize};

/// Viewport geometry as reported by the rendering layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Current scroll offset from the top of the content, in px
    pub scroll_top: f64,
    /// Visible height of the scrollable panel, in px
    pub viewport_height: f64,
    /// Total scrollable content height, in px
    pub content_height: f64,
}

impl Viewport {
    /// Distance from the bottom of the visible region to the bottom edge
    pub fn distance_to_bottom(&self) -> f64 {
        self.content_height - (self.scroll_top + self.viewport_height)
    }
}

/// Height captured before a prepend mutation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrependSnapshot {
    pub scroll_top: f64,
    pub content_height: f64,
}

/// Scroll adjustment for the rendering layer to apply
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollCommand {
    /// Set the scroll offset to an absolute value
    To(f64),
    /// Scroll to the bottom edge of the content
    Bottom,
}

/// Decides scroll adjustments around prepend/append mutations
#[derive(Debug, Clone, Copy)]
pub struct ScrollAnchor {
    bottom_threshold_px: f64,
}

impl ScrollAnchor {
    pub fn new(bottom_threshold_px: f64) -> Self {
        Self {
            bottom_threshold_px,
        }
    }

    /// Capture geometry before older content is prepended
    pub fn before_prepend(&self, viewport: &Viewport) -> PrependSnapshot {
        PrependSnapshot {
            scroll_top: viewport.scroll_top,
            content_height: viewport.content_height,
        }
    }

    /// After the prepend mutation, shift the offset by the height delta so
    /// the previously visible content stays visually anchored.
    pub fn after_prepend(
        &self,
        snapshot: &PrependSnapshot,
        new_content_height: f64,
    ) -> ScrollCommand {
        let delta = new_content_height - snapshot.content_height;
        ScrollCommand::To(snapshot.scroll_top + delta)
    }

    /// After an append, scroll to bottom when the viewport was near the
    /// bottom edge beforehand, or on the very first population. Returns
    /// None when a reader scrolled up into history must stay undisturbed.
    pub fn after_append(&self, before: Option<&Viewport>) -> Option<ScrollCommand> {
        match before {
            None => Some(ScrollCommand::Bottom),
            Some(v) if v.content_height <= 0.0 => Some(ScrollCommand::Bottom),
            Some(v) if v.distance_to_bottom() <= self.bottom_threshold_px => {
                Some(ScrollCommand::Bottom)
            }
            Some(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor() -> ScrollAnchor {
        ScrollAnchor::new(150.0)
    }

    #[test]
    fn prepend_shifts_offset_by_exact_height_delta() {
        let viewport = Viewport {
            scroll_top: 42.0,
            viewport_height: 600.0,
            content_height: 2000.0,
        };
        let snapshot = anchor().before_prepend(&viewport);

        // 350px of older content arrives above the fold
        let command = anchor().after_prepend(&snapshot, 2350.0);
        assert_eq!(command, ScrollCommand::To(392.0));
    }

    #[test]
    fn append_near_bottom_scrolls_to_bottom() {
        let viewport = Viewport {
            scroll_top: 1300.0,
            viewport_height: 600.0,
            content_height: 2000.0,
        };
        assert_eq!(
            anchor().after_append(Some(&viewport)),
            Some(ScrollCommand::Bottom)
        );
    }

    #[test]
    fn append_while_reading_history_is_undisturbed() {
        let viewport = Viewport {
            scroll_top: 100.0,
            viewport_height: 600.0,
            content_height: 2000.0,
        };
        assert_eq!(anchor().after_append(Some(&viewport)), None);
    }

    #[test]
    fn first_population_always_scrolls_to_bottom() {
        assert_eq!(anchor().after_append(None), Some(ScrollCommand::Bottom));

        let empty = Viewport {
            scroll_top: 0.0,
            viewport_height: 600.0,
            content_height: 0.0,
        };
        assert_eq!(
            anchor().after_append(Some(&empty)),
            Some(ScrollCommand::Bottom)
        );
    }
}
