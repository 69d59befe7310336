//! Ingestion reducer: merges incoming reports into the track store

use crate::clock::{Clock, SystemClock};
use crate::store::{FleetState, Track};
use fleet_core::{CoreError, CoreResult, Registration, Report, TelemetryMessage};
use tracing::{debug, info, warn};

/// Result of applying one telemetry message
#[derive(Debug, Clone, Default)]
pub struct IngestOutcome {
    /// Registrations touched, in application order
    pub applied: Vec<Registration>,
    /// Features that failed validation
    pub rejected: Vec<CoreError>,
}

impl IngestOutcome {
    /// True when at least one report landed, so `latest` moved
    pub fn latest_changed(&self) -> bool {
        !self.applied.is_empty()
    }
}

/// Applies the merge/append/create policy to a [`FleetState`]
///
/// Reports are appended in delivery order with no deduplication or
/// reordering: a report identical to the previous one is still appended.
/// There are no sequence numbers on the feed, so duplicates and
/// out-of-order arrivals are kept exactly as delivered.
#[derive(Debug, Clone, Default)]
pub struct IngestionReducer<C: Clock = SystemClock> {
    clock: C,
}

impl IngestionReducer<SystemClock> {
    pub fn new() -> Self {
        Self { clock: SystemClock }
    }
}

impl<C: Clock> IngestionReducer<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Merge one report; malformed reports are rejected untouched
    pub fn apply<'s>(&self, state: &'s mut FleetState, report: Report) -> CoreResult<&'s Track> {
        validate(&report)?;

        let now = self.clock.now();
        let (track, created) = state.upsert(report, now);

        if created {
            info!(
                "New track {} (flight start {})",
                track.registration(),
                track.flight_start_time()
            );
        } else {
            debug!("Track {} now has {} reports", track.registration(), track.len());
        }

        Ok(track)
    }

    /// Apply every feature of a message in order
    ///
    /// A bad feature is logged and skipped; it never aborts the rest of the
    /// message and never touches another drone's track.
    pub fn apply_message(&self, state: &mut FleetState, message: TelemetryMessage) -> IngestOutcome {
        let mut outcome = IngestOutcome::default();
        let reports = message.into_reports();

        if reports.is_empty() {
            warn!("Rejected telemetry message: {}", CoreError::EmptyMessage);
            outcome.rejected.push(CoreError::EmptyMessage);
            return outcome;
        }

        for report in reports {
            match report.and_then(|r| self.apply(state, r).map(|t| t.registration().clone())) {
                Ok(registration) => outcome.applied.push(registration),
                Err(e) => {
                    warn!("Rejected telemetry report: {}", e);
                    outcome.rejected.push(e);
                }
            }
        }

        outcome
    }

    /// Drop every track
    pub fn clear_history(&self, state: &mut FleetState) {
        info!("Clearing flight history ({} tracks)", state.len());
        state.clear();
    }
}

fn validate(report: &Report) -> CoreResult<()> {
    if report.registration.as_str().trim().is_empty() {
        return Err(CoreError::MissingRegistration);
    }

    if !report.position.is_valid() {
        return Err(CoreError::invalid_position(
            report.registration.as_str(),
            report.position.longitude,
            report.position.latitude,
        ));
    }

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{Duration, TimeZone, Utc};
    use fleet_core::Position;

    fn reducer() -> (IngestionReducer<ManualClock>, ManualClock) {
        let clock = ManualClock::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        (IngestionReducer::with_clock(clock.clone()), clock)
    }

    fn report(reg: &str, lng: f64, lat: f64) -> Report {
        Report::new(reg, Position::new(lng, lat))
    }

    #[test]
    fn test_n_reports_same_registration() {
        let (reducer, clock) = reducer();
        let mut state = FleetState::new();
        let start = clock.now();

        for i in 0..10 {
            reducer
                .apply(&mut state, report("SD-B001", 35.0 + i as f64 * 0.01, 31.97))
                .unwrap();
            clock.advance(Duration::seconds(1));
        }

        let track = state.get(&"SD-B001".into()).unwrap();
        assert_eq!(track.len(), 10);
        assert_eq!(track.flight_start_time(), start);
        let lngs: Vec<f64> = track.reports().iter().map(|r| r.position.longitude).collect();
        let expected: Vec<f64> = (0..10).map(|i| 35.0 + i as f64 * 0.01).collect();
        assert_eq!(lngs, expected);
    }

    #[test]
    fn test_k_registrations_no_cross_contamination() {
        let (reducer, _) = reducer();
        let mut state = FleetState::new();
        let regs = ["SD-B001", "SD-B002", "X-9"];

        for round in 0..4 {
            for reg in regs {
                reducer.apply(&mut state, report(reg, round as f64, 0.0)).unwrap();
            }
        }

        assert_eq!(state.len(), 3);
        for track in state.tracks() {
            assert_eq!(track.len(), 4);
            assert!(track.reports().iter().all(|r| &r.registration == track.registration()));
        }
    }

    #[test]
    fn test_identical_report_is_still_appended() {
        let (reducer, _) = reducer();
        let mut state = FleetState::new();
        let r = report("SD-B001", 35.83, 31.97);

        reducer.apply(&mut state, r.clone()).unwrap();
        reducer.apply(&mut state, r).unwrap();

        assert_eq!(state.get(&"SD-B001".into()).unwrap().len(), 2);
    }

    #[test]
    fn test_out_of_order_arrivals_kept_as_delivered() {
        // No sequence numbers exist, so a late sample lands at the end
        let (reducer, _) = reducer();
        let mut state = FleetState::new();

        reducer.apply(&mut state, report("SD-B001", 3.0, 0.0)).unwrap();
        reducer.apply(&mut state, report("SD-B001", 1.0, 0.0)).unwrap();

        let track = state.get(&"SD-B001".into()).unwrap();
        assert_eq!(track.latest_position().longitude, 1.0);
    }

    #[test]
    fn test_latest_follows_last_report() {
        let (reducer, _) = reducer();
        let mut state = FleetState::new();

        reducer.apply(&mut state, report("SD-B001", 1.0, 0.0)).unwrap();
        reducer.apply(&mut state, report("X-9", 2.0, 0.0)).unwrap();
        assert_eq!(state.latest().unwrap().registration().as_str(), "X-9");

        reducer.apply(&mut state, report("SD-B001", 3.0, 0.0)).unwrap();
        assert_eq!(state.latest().unwrap().registration().as_str(), "SD-B001");
    }

    #[test]
    fn test_missing_registration_rejected_state_unchanged() {
        let (reducer, _) = reducer();
        let mut state = FleetState::new();
        reducer.apply(&mut state, report("SD-B001", 1.0, 0.0)).unwrap();

        let err = reducer.apply(&mut state, report("", 2.0, 0.0)).unwrap_err();

        assert_eq!(err, CoreError::MissingRegistration);
        assert_eq!(state.len(), 1);
        assert_eq!(state.get(&"SD-B001".into()).unwrap().len(), 1);
        assert_eq!(state.latest().unwrap().registration().as_str(), "SD-B001");
    }

    #[test]
    fn test_invalid_position_rejected() {
        let (reducer, _) = reducer();
        let mut state = FleetState::new();

        let err = reducer.apply(&mut state, report("SD-B001", 500.0, 0.0)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPosition { .. }));
        assert!(state.is_empty());
    }

    #[test]
    fn test_apply_message_partial_rejection() {
        let (reducer, _) = reducer();
        let mut state = FleetState::new();
        let text = r#"{"type":"FeatureCollection","features":[
            {"properties":{"registration":"SD-B001"},"geometry":{"coordinates":[35.83,31.97]}},
            {"properties":{"Name":"no reg"},"geometry":{"coordinates":[1.0,1.0]}},
            {"properties":{"registration":"X-9"},"geometry":{"coordinates":[35.84,31.98]}}
        ]}"#;

        let outcome = reducer.apply_message(&mut state, TelemetryMessage::parse(text).unwrap());

        assert_eq!(outcome.applied.len(), 2);
        assert_eq!(outcome.rejected, vec![CoreError::MissingRegistration]);
        assert!(outcome.latest_changed());
        assert_eq!(state.len(), 2);
        assert_eq!(state.latest().unwrap().registration().as_str(), "X-9");
    }

    #[test]
    fn test_apply_message_without_features() {
        let (reducer, _) = reducer();
        let mut state = FleetState::new();

        let outcome = reducer.apply_message(&mut state, TelemetryMessage::default());

        assert!(!outcome.latest_changed());
        assert_eq!(outcome.rejected, vec![CoreError::EmptyMessage]);
        assert!(state.is_empty());
    }

    #[test]
    fn test_two_report_scenario() {
        let (reducer, _) = reducer();
        let mut state = FleetState::new();

        reducer
            .apply(&mut state, report("SD-B001", 35.83, 31.97).with_altitude(50.0))
            .unwrap();
        reducer
            .apply(&mut state, report("SD-B001", 35.84, 31.98).with_altitude(55.0))
            .unwrap();

        assert_eq!(state.len(), 1);
        let track = state.latest().unwrap();
        assert_eq!(track.len(), 2);
        assert_eq!(track.coordinates(), vec![[35.83, 31.97], [35.84, 31.98]]);
        assert_eq!(track.latest_report().altitude, Some(55.0));
    }

    #[test]
    fn test_clear_history() {
        let (reducer, _) = reducer();
        let mut state = FleetState::new();
        reducer.apply(&mut state, report("SD-B001", 1.0, 0.0)).unwrap();

        reducer.clear_history(&mut state);
        assert!(state.is_empty());

        // A registration seen before the clear starts a fresh flight
        reducer.apply(&mut state, report("SD-B001", 1.0, 0.0)).unwrap();
        assert_eq!(state.get(&"SD-B001".into()).unwrap().len(), 1);
    }
}
