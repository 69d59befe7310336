//! In-memory map surface
//!
//! Keeps the full drawn scene in memory. Used headless by the dashboard
//! to expose the scene over HTTP, and by tests to assert on it.

use crate::error::{RenderError, RenderResult};
use crate::surface::{DragListener, MapSurface};
use fleet_core::Position;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineLayer {
    pub coordinates: Vec<[f64; 2]>,
    pub color: String,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerState {
    pub position: Position,
    pub rotation: f64,
    pub color: String,
    pub visible: bool,
    pub popup: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraTarget {
    pub center: Position,
    pub zoom: f64,
    pub speed: f64,
}

/// Serializable view of everything on the surface
#[derive(Debug, Clone, Serialize)]
pub struct SceneSnapshot {
    pub ready: bool,
    pub error: Option<String>,
    pub lines: BTreeMap<String, LineLayer>,
    pub markers: BTreeMap<String, MarkerState>,
    pub camera: Option<CameraTarget>,
    pub drag_listeners: usize,
}

#[derive(Debug, Default)]
pub struct InMemorySurface {
    ready: bool,
    error: Option<String>,
    lines: BTreeMap<String, LineLayer>,
    markers: BTreeMap<String, MarkerState>,
    drag_listeners: BTreeSet<DragListener>,
    next_listener: u64,
    camera: Option<CameraTarget>,
    fly_to_count: usize,
    writes: BTreeMap<&'static str, u64>,
}

impl InMemorySurface {
    /// A surface that still needs a credential
    pub fn new() -> Self {
        Self::default()
    }

    /// A surface that is ready immediately
    pub fn ready() -> Self {
        Self {
            ready: true,
            ..Default::default()
        }
    }

    /// Bring the surface up with an access credential
    ///
    /// A blank credential fails and leaves the surface not ready, so the
    /// caller can retry with another one.
    pub fn initialize(&mut self, credential: &str) -> RenderResult<()> {
        if credential.trim().is_empty() {
            self.ready = false;
            self.error = Some(RenderError::MissingCredential.to_string());
            warn!("Map surface initialization failed: missing credential");
            return Err(RenderError::MissingCredential);
        }

        self.ready = true;
        self.error = None;
        info!("Map surface ready");
        Ok(())
    }

    /// Mark the surface failed, e.g. after a tile or style load error
    pub fn fail(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!("Map surface failed: {}", reason);
        self.ready = false;
        self.error = Some(reason);
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn line(&self, id: &str) -> Option<&LineLayer> {
        self.lines.get(id)
    }

    pub fn marker(&self, id: &str) -> Option<&MarkerState> {
        self.markers.get(id)
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn camera(&self) -> Option<CameraTarget> {
        self.camera
    }

    pub fn fly_to_count(&self) -> usize {
        self.fly_to_count
    }

    pub fn drag_listeners(&self) -> Vec<DragListener> {
        self.drag_listeners.iter().copied().collect()
    }

    /// Write counts per surface verb
    pub fn writes(&self) -> &BTreeMap<&'static str, u64> {
        &self.writes
    }

    pub fn write_count(&self, verb: &str) -> u64 {
        self.writes.get(verb).copied().unwrap_or(0)
    }

    pub fn total_writes(&self) -> u64 {
        self.writes.values().sum()
    }

    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot {
            ready: self.ready,
            error: self.error.clone(),
            lines: self.lines.clone(),
            markers: self.markers.clone(),
            camera: self.camera,
            drag_listeners: self.drag_listeners.len(),
        }
    }

    fn record(&mut self, verb: &'static str) {
        *self.writes.entry(verb).or_insert(0) += 1;
    }
}

impl MapSurface for InMemorySurface {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn upsert_line_layer(&mut self, id: &str, coordinates: &[[f64; 2]], color: &str) {
        self.record("upsert_line_layer");
        let layer = self.lines.entry(id.to_string()).or_insert_with(|| LineLayer {
            coordinates: Vec::new(),
            color: color.to_string(),
            visible: true,
        });
        layer.coordinates = coordinates.to_vec();
        layer.color = color.to_string();
        debug!("Line {} now has {} points", id, coordinates.len());
    }

    fn set_layer_visibility(&mut self, id: &str, visible: bool) {
        self.record("set_layer_visibility");
        if let Some(layer) = self.lines.get_mut(id) {
            layer.visible = visible;
        }
    }

    fn place_marker(&mut self, id: &str, position: Position, rotation: f64, color: &str) {
        self.record("place_marker");
        self.markers.insert(
            id.to_string(),
            MarkerState {
                position,
                rotation,
                color: color.to_string(),
                visible: true,
                popup: None,
            },
        );
        debug!("Placed marker {}", id);
    }

    fn move_marker(&mut self, id: &str, position: Position, rotation: f64) {
        self.record("move_marker");
        if let Some(marker) = self.markers.get_mut(id) {
            marker.position = position;
            marker.rotation = rotation;
        }
    }

    fn set_marker_visibility(&mut self, id: &str, visible: bool) {
        self.record("set_marker_visibility");
        if let Some(marker) = self.markers.get_mut(id) {
            marker.visible = visible;
        }
    }

    fn attach_popup(&mut self, marker_id: &str, html: &str) {
        self.record("attach_popup");
        if let Some(marker) = self.markers.get_mut(marker_id) {
            marker.popup = Some(html.to_string());
        }
    }

    fn set_popup_content(&mut self, marker_id: &str, html: &str) {
        self.record("set_popup_content");
        if let Some(marker) = self.markers.get_mut(marker_id) {
            marker.popup = Some(html.to_string());
        }
    }

    fn on_drag(&mut self) -> DragListener {
        self.record("on_drag");
        self.next_listener += 1;
        let listener = DragListener(self.next_listener);
        self.drag_listeners.insert(listener);
        listener
    }

    fn off_drag(&mut self, listener: DragListener) {
        self.record("off_drag");
        self.drag_listeners.remove(&listener);
    }

    fn fly_to(&mut self, target: Position, zoom: f64, speed: f64) {
        self.record("fly_to");
        self.fly_to_count += 1;
        self.camera = Some(CameraTarget {
            center: target,
            zoom,
            speed,
        });
        debug!(
            "Flying to ({:.5}, {:.5}) at zoom {}",
            target.longitude, target.latitude, zoom
        );
    }
}
