//! # Fleet Render
//!
//! Keeps a map surface in step with the fleet state.
//!
//! ## Features
//!
//! - Opaque [`MapSurface`] contract with an in-memory implementation
//! - One render binding per registration, created once and reused
//! - Linear marker glide between consecutive reports
//! - Popup refresh intervals that start on open and stop on close
//! - Visibility, camera and drag-listener sync from the view state

pub mod animation;
pub mod config;
pub mod error;
pub mod memory;
pub mod popup;
pub mod surface;
pub mod sync;
pub mod timers;

pub use animation::{AnimationState, MarkerAnimation};
pub use config::RenderConfig;
pub use error::{RenderError, RenderResult};
pub use memory::{CameraTarget, InMemorySurface, LineLayer, MarkerState, SceneSnapshot};
pub use popup::{render_popup, PopupSnapshot};
pub use surface::{
    line_id, marker_id, registration_from_marker_id, DragListener, MapSurface, SurfaceEvent,
};
pub use sync::RenderSynchronizer;
pub use timers::{ManualTimers, TimerId, Timers};
