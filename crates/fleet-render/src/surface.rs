//! Map surface contract
//!
//! The surface is an opaque drawing target. Everything the synchronizer
//! does to it goes through these verbs, keyed by layer and marker ids
//! derived from the drone registration.

use fleet_core::{Position, Registration};
use serde::{Deserialize, Serialize};

pub const LINE_ID_PREFIX: &str = "drone-line-";
pub const MARKER_ID_PREFIX: &str = "drone-marker-";

/// Layer id for a drone's flight path
pub fn line_id(registration: &Registration) -> String {
    format!("{}{}", LINE_ID_PREFIX, registration)
}

/// Marker id for a drone's position marker
pub fn marker_id(registration: &Registration) -> String {
    format!("{}{}", MARKER_ID_PREFIX, registration)
}

/// Registration encoded in a marker id
pub fn registration_from_marker_id(id: &str) -> Option<Registration> {
    id.strip_prefix(MARKER_ID_PREFIX)
        .filter(|reg| !reg.is_empty())
        .map(Registration::from)
}

/// Handle for a registered drag listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DragListener(pub u64);

/// Drawing operations the render synchronizer needs
#[cfg_attr(test, mockall::automock)]
pub trait MapSurface {
    /// Whether the surface accepts drawing commands
    fn is_ready(&self) -> bool;

    /// Create the line layer or replace its coordinates
    fn upsert_line_layer(&mut self, id: &str, coordinates: &[[f64; 2]], color: &str);
    fn set_layer_visibility(&mut self, id: &str, visible: bool);

    fn place_marker(&mut self, id: &str, position: Position, rotation: f64, color: &str);
    fn move_marker(&mut self, id: &str, position: Position, rotation: f64);
    fn set_marker_visibility(&mut self, id: &str, visible: bool);

    fn attach_popup(&mut self, marker_id: &str, html: &str);
    fn set_popup_content(&mut self, marker_id: &str, html: &str);

    /// Register for map drag notifications
    fn on_drag(&mut self) -> DragListener;
    fn off_drag(&mut self, listener: DragListener);

    fn fly_to(&mut self, target: Position, zoom: f64, speed: f64);
}

/// Events a surface reports back to its owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SurfaceEvent {
    Ready,
    Failed { reason: String },
    Drag { listener: DragListener },
    MarkerClicked { marker_id: String },
    PopupOpened { marker_id: String },
    PopupClosed { marker_id: String },
}
