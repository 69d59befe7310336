//! Track store: the authoritative in-memory fleet model
//!
//! Mutation is crate-private; only the [`IngestionReducer`](crate::IngestionReducer)
//! writes. Everything else reads through the accessors below.

use chrono::{DateTime, Duration, Utc};
use fleet_core::{Position, Registration, Report};
use serde::Serialize;
use std::collections::HashMap;

/// Accumulated flight history for one drone
#[derive(Debug, Clone, Serialize)]
pub struct Track {
    registration: Registration,
    /// Arrival order, never empty
    reports: Vec<Report>,
    flight_start_time: DateTime<Utc>,
}

impl Track {
    pub(crate) fn start(report: Report, started_at: DateTime<Utc>) -> Self {
        Self {
            registration: report.registration.clone(),
            reports: vec![report],
            flight_start_time: started_at,
        }
    }

    pub(crate) fn push(&mut self, report: Report) {
        self.reports.push(report);
    }

    pub fn registration(&self) -> &Registration {
        &self.registration
    }

    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Wall-clock time the first report for this registration was processed
    pub fn flight_start_time(&self) -> DateTime<Utc> {
        self.flight_start_time
    }

    pub fn first_report(&self) -> &Report {
        &self.reports[0]
    }

    pub fn latest_report(&self) -> &Report {
        &self.reports[self.reports.len() - 1]
    }

    pub fn latest_position(&self) -> Position {
        self.latest_report().position
    }

    /// Full path as `[lon, lat]` pairs in arrival order
    pub fn coordinates(&self) -> Vec<[f64; 2]> {
        self.reports.iter().map(|r| r.position.to_array()).collect()
    }

    /// Time since the flight started, never negative
    pub fn flight_duration(&self, now: DateTime<Utc>) -> Duration {
        (now - self.flight_start_time).max(Duration::zero())
    }
}

/// All tracks plus the most recently touched one
#[derive(Debug, Clone, Default)]
pub struct FleetState {
    /// First-seen order
    tracks: Vec<Track>,
    index: HashMap<Registration, usize>,
    /// Index into `tracks`, not a copy
    latest: Option<usize>,
}

impl FleetState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, registration: &Registration) -> Option<&Track> {
        self.index.get(registration).map(|&i| &self.tracks[i])
    }

    pub fn contains(&self, registration: &Registration) -> bool {
        self.index.contains_key(registration)
    }

    /// Tracks in first-seen order
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    pub fn registrations(&self) -> impl Iterator<Item = &Registration> {
        self.tracks.iter().map(Track::registration)
    }

    pub fn latest(&self) -> Option<&Track> {
        self.latest.map(|i| &self.tracks[i])
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Total reports across every track
    pub fn report_count(&self) -> usize {
        self.tracks.iter().map(Track::len).sum()
    }

    /// Append to an existing track or start a new one; returns the touched
    /// track and whether it was created
    pub(crate) fn upsert(&mut self, report: Report, now: DateTime<Utc>) -> (&Track, bool) {
        let (idx, created) = match self.index.get(&report.registration) {
            Some(&idx) => {
                self.tracks[idx].push(report);
                (idx, false)
            }
            None => {
                let idx = self.tracks.len();
                self.index.insert(report.registration.clone(), idx);
                self.tracks.push(Track::start(report, now));
                (idx, true)
            }
        };

        self.latest = Some(idx);
        (&self.tracks[idx], created)
    }

    pub(crate) fn clear(&mut self) {
        self.tracks.clear();
        self.index.clear();
        self.latest = None;
    }
}
