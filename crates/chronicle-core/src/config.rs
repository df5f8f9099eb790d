// Engine configuration
//
// TimelineConfig is a plain serde struct so drivers can load it from
// flags, env, or a config file. Durations are stored as milliseconds for
// serde-friendliness and exposed as std Durations via accessors.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the timeline engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineConfig {
    /// Lower bound on the adaptive poll wait, in milliseconds
    #[serde(default = "default_min_refresh_ms")]
    pub min_refresh_ms: u64,

    /// Upper bound on the adaptive poll wait, in milliseconds
    #[serde(default = "default_max_refresh_ms")]
    pub max_refresh_ms: u64,

    /// Explicit short wait used after a manual refresh request, in milliseconds
    #[serde(default = "default_manual_refresh_ms")]
    pub manual_refresh_ms: u64,

    /// Delay between staging a collapse (`closing`) and completing it, in milliseconds
    #[serde(default = "default_collapse_delay_ms")]
    pub collapse_delay_ms: u64,

    /// Proximity to the bottom edge within which new arrivals auto-scroll, in px
    #[serde(default = "default_bottom_threshold_px")]
    pub bottom_threshold_px: f64,

    /// Proximity to the top edge that triggers a backward fetch, in px
    #[serde(default = "default_fetch_threshold_px")]
    pub fetch_threshold_px: f64,

    /// Vertical offset of the sticky boundary below the viewport top, in px
    #[serde(default = "default_sticky_offset_px")]
    pub sticky_offset_px: f64,
}

fn default_min_refresh_ms() -> u64 {
    1_000
}

fn default_max_refresh_ms() -> u64 {
    60_000
}

fn default_manual_refresh_ms() -> u64 {
    500
}

fn default_collapse_delay_ms() -> u64 {
    300
}

fn default_bottom_threshold_px() -> f64 {
    150.0
}

fn default_fetch_threshold_px() -> f64 {
    100.0
}

fn default_sticky_offset_px() -> f64 {
    10.0
}

impl TimelineConfig {
    /// Set the adaptive refresh bounds
    pub fn with_refresh_bounds(mut self, min: Duration, max: Duration) -> Self {
        self.min_refresh_ms = min.as_millis() as u64;
        self.max_refresh_ms = max.as_millis() as u64;
        self
    }

    /// Set the manual refresh wait
    pub fn with_manual_refresh(mut self, wait: Duration) -> Self {
        self.manual_refresh_ms = wait.as_millis() as u64;
        self
    }

    /// Set the collapse completion delay
    pub fn with_collapse_delay(mut self, delay: Duration) -> Self {
        self.collapse_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Set the auto-scroll bottom proximity threshold
    pub fn with_bottom_threshold(mut self, px: f64) -> Self {
        self.bottom_threshold_px = px;
        self
    }

    /// Set the sticky boundary offset
    pub fn with_sticky_offset(mut self, px: f64) -> Self {
        self.sticky_offset_px = px;
        self
    }

    pub fn min_refresh(&self) -> Duration {
        Duration::from_millis(self.min_refresh_ms)
    }

    pub fn max_refresh(&self) -> Duration {
        Duration::from_millis(self.max_refresh_ms)
    }

    pub fn manual_refresh(&self) -> Duration {
        Duration::from_millis(self.manual_refresh_ms)
    }

    pub fn collapse_delay(&self) -> Duration {
        Duration::from_millis(self.collapse_delay_ms)
    }
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            min_refresh_ms: default_min_refresh_ms(),
            max_refresh_ms: default_max_refresh_ms(),
            manual_refresh_ms: default_manual_refresh_ms(),
            collapse_delay_ms: default_collapse_delay_ms(),
            bottom_threshold_px: default_bottom_threshold_px(),
            fetch_threshold_px: default_fetch_threshold_px(),
            sticky_offset_px: default_sticky_offset_px(),
        }
    }
}
