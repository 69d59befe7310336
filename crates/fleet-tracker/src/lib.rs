//! # Fleet Tracker
//!
//! In-memory fleet model for the Drone Fleet Monitor.
//!
//! ## Features
//! - Track store keyed by registration, first-seen order preserved
//! - Ingestion reducer implementing the merge/append/create policy
//! - Selection and view options driven by user actions
//! - Dashboard summaries derived from the store

pub mod clock;
pub mod reducer;
pub mod store;
pub mod summary;
pub mod view;

pub use clock::{Clock, ManualClock, SystemClock};
pub use reducer::{IngestOutcome, IngestionReducer};
pub use store::{FleetState, Track};
pub use summary::{
    format_clock, format_hours_minutes, format_minutes_seconds, DroneSnapshot, FleetSummary,
};
pub use view::{ViewAction, ViewChange, ViewOptions, ViewState};
