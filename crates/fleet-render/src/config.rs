//! Configuration for the render synchronizer

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Render timing and camera settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Marker glide duration between consecutive reports
    pub animation_duration_ms: u64,
    /// Popup refresh period while open
    pub popup_refresh_ms: u64,
    /// Camera zoom used when flying to a selected drone
    pub fly_to_zoom: f64,
    pub fly_to_speed: f64,
    /// Keep the camera on the selected drone as new reports arrive
    pub follow_selection: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            animation_duration_ms: 600,
            popup_refresh_ms: 1000,
            fly_to_zoom: 14.0,
            fly_to_speed: 1.2,
            follow_selection: true,
        }
    }
}

impl RenderConfig {
    pub fn animation_duration(&self) -> Duration {
        Duration::from_millis(self.animation_duration_ms)
    }

    /// Never zero; intervals need a positive period
    pub fn popup_refresh(&self) -> Duration {
        Duration::from_millis(self.popup_refresh_ms.max(1))
    }

    /// Snap markers instead of animating them
    pub fn without_animation() -> Self {
        Self {
            animation_duration_ms: 0,
            ..Default::default()
        }
    }
}
