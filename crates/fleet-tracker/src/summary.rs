//! Dashboard read views derived from the track store

use crate::store::{FleetState, Track};
use chrono::{DateTime, Duration, Utc};
use fleet_core::{DroneStatus, StatusPredicate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Fleet-wide statistics snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetSummary {
    pub total: usize,
    pub online: usize,
    pub offline: usize,
    /// Rounded share of the fleet online, 0 when empty
    pub online_percent: u32,
    pub unique_pilots: usize,
    /// Mean of each drone's latest altitude, unknown counted as zero
    pub average_altitude: f64,
    pub total_flight_seconds: i64,
    /// `"Xh Ym"`
    pub total_flight_time: String,
    pub drones: Vec<DroneSnapshot>,
    pub latest: Option<DroneSnapshot>,
    pub timestamp: DateTime<Utc>,
}

impl FleetSummary {
    pub fn empty() -> Self {
        Self::from_state(&FleetState::new(), &fleet_core::PrefixStatus::default(), Utc::now())
    }

    pub fn from_state(
        state: &FleetState,
        predicate: &dyn StatusPredicate,
        now: DateTime<Utc>,
    ) -> Self {
        let drones: Vec<DroneSnapshot> = state
            .tracks()
            .map(|t| DroneSnapshot::from_track(t, predicate, now))
            .collect();

        let total = drones.len();
        let online = drones.iter().filter(|d| d.status.is_online()).count();

        let unique_pilots = state
            .tracks()
            .map(|t| t.first_report().pilot.as_str())
            .filter(|p| !p.is_empty())
            .collect::<HashSet<_>>()
            .len();

        let average_altitude = if total > 0 {
            state
                .tracks()
                .map(|t| t.latest_report().altitude_or_zero())
                .sum::<f64>()
                / total as f64
        } else {
            0.0
        };

        let total_flight = state
            .tracks()
            .fold(Duration::zero(), |acc, t| acc + t.flight_duration(now));

        let online_percent = if total > 0 {
            ((online as f64 / total as f64) * 100.0).round() as u32
        } else {
            0
        };

        Self {
            total,
            online,
            offline: total - online,
            online_percent,
            unique_pilots,
            average_altitude,
            total_flight_seconds: total_flight.num_seconds(),
            total_flight_time: format_hours_minutes(total_flight),
            latest: state
                .latest()
                .map(|t| DroneSnapshot::from_track(t, predicate, now)),
            drones,
            timestamp: now,
        }
    }
}

/// Per-drone row for the dashboard and the panel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DroneSnapshot {
    pub registration: String,
    pub name: String,
    pub pilot: String,
    pub organization: String,
    pub serial: String,
    pub status: DroneStatus,
    pub altitude: Option<f64>,
    pub yaw: Option<f64>,
    pub position: [f64; 2],
    pub report_count: usize,
    pub flight_start_time: DateTime<Utc>,
    /// `"m:ss"`
    pub flight_time: String,
}

impl DroneSnapshot {
    pub fn from_track(track: &Track, predicate: &dyn StatusPredicate, now: DateTime<Utc>) -> Self {
        let report = track.latest_report();

        Self {
            registration: track.registration().to_string(),
            name: report.name.clone(),
            pilot: report.pilot.clone(),
            organization: report.organization.clone(),
            serial: report.serial.clone(),
            status: predicate.status(track.registration()),
            altitude: report.altitude,
            yaw: report.yaw,
            position: report.position.to_array(),
            report_count: track.len(),
            flight_start_time: track.flight_start_time(),
            flight_time: format_minutes_seconds(track.flight_duration(now)),
        }
    }
}

// ============================================================================
// DURATION FORMATTING
// ============================================================================

/// `"Xh Ym"`, used for fleet totals
pub fn format_hours_minutes(duration: Duration) -> String {
    let secs = duration.num_seconds().max(0);
    format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
}

/// `"m:ss"`, used for per-drone flight time
pub fn format_minutes_seconds(duration: Duration) -> String {
    let secs = duration.num_seconds().max(0);
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// `"HH:MM:SS"`, used in map popups
pub fn format_clock(duration: Duration) -> String {
    let secs = duration.num_seconds().max(0);
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

// ============================================================================
// TESTS
// ============================================================================
