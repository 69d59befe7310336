//! # Fleet Core
//!
//! Core domain models for the Drone Fleet Monitor.
//! This crate provides the report and status types shared by the
//! tracker, the render synchronizer and the telemetry channel.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod error;
pub mod geo;
pub mod wire;

pub use error::{CoreError, CoreResult};
pub use geo::*;
pub use wire::*;

// ============================================================================
// IDENTITY
// ============================================================================

/// Registration of a drone, the stable identity key for its track
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Registration(pub String);

impl Registration {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Registration {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Registration {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ============================================================================
// REPORT
// ============================================================================

/// One telemetry sample for one drone at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub registration: Registration,
    pub name: String,
    pub pilot: String,
    pub organization: String,
    pub serial: String,
    /// Altitude in meters, `None` when the feed omitted it
    pub altitude: Option<f64>,
    /// Yaw in degrees, `None` when the feed omitted it
    pub yaw: Option<f64>,
    pub position: Position,
}

impl Report {
    pub fn new(registration: impl Into<Registration>, position: Position) -> Self {
        Self {
            registration: registration.into(),
            name: String::new(),
            pilot: String::new(),
            organization: String::new(),
            serial: String::new(),
            altitude: None,
            yaw: None,
            position,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_pilot(mut self, pilot: impl Into<String>) -> Self {
        self.pilot = pilot.into();
        self
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = organization.into();
        self
    }

    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = serial.into();
        self
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    pub fn with_yaw(mut self, yaw: f64) -> Self {
        self.yaw = Some(yaw);
        self
    }

    /// Altitude for display and averaging; unknown counts as zero
    pub fn altitude_or_zero(&self) -> f64 {
        self.altitude.unwrap_or(0.0)
    }

    /// Marker rotation in degrees
    pub fn rotation(&self) -> f64 {
        self.yaw.unwrap_or(0.0)
    }
}

// ============================================================================
// STATUS
// ============================================================================

/// Online/offline status shown on the map and the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DroneStatus {
    Online,
    Offline,
}

impl DroneStatus {
    pub const ONLINE_COLOR: &'static str = "#00ff00";
    pub const OFFLINE_COLOR: &'static str = "#f9000e";

    /// Line and marker color for this status
    pub fn line_color(&self) -> &'static str {
        match self {
            DroneStatus::Online => Self::ONLINE_COLOR,
            DroneStatus::Offline => Self::OFFLINE_COLOR,
        }
    }

    pub fn is_online(&self) -> bool {
        *self == DroneStatus::Online
    }
}

impl fmt::Display for DroneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DroneStatus::Online => write!(f, "Online"),
            DroneStatus::Offline => write!(f, "Offline"),
        }
    }
}

/// Derives a drone's status from its registration
///
/// No connectivity signal is carried by the feed, so status is a pure
/// function of identity. Swap the predicate to model staleness or any
/// other rule without touching the reducer or the renderer.
pub trait StatusPredicate: Send + Sync {
    fn status(&self, registration: &Registration) -> DroneStatus;
}

/// Registration-prefix convention: drones whose registration starts with
/// the prefix are online, everything else is offline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixStatus {
    pub prefix: String,
}

impl PrefixStatus {
    pub const DEFAULT_PREFIX: &'static str = "SD-B";

    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for PrefixStatus {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PREFIX)
    }
}

impl StatusPredicate for PrefixStatus {
    fn status(&self, registration: &Registration) -> DroneStatus {
        if registration.as_str().starts_with(&self.prefix) {
            DroneStatus::Online
        } else {
            DroneStatus::Offline
        }
    }
}

impl<F> StatusPredicate for F
where
    F: Fn(&Registration) -> DroneStatus + Send + Sync,
{
    fn status(&self, registration: &Registration) -> DroneStatus {
        self(registration)
    }
}

// ============================================================================
// TESTS
// ============================================================================
