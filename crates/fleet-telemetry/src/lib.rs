//! # Fleet Telemetry - Metrics
//!
//! Prometheus metrics for the fleet monitor:
//! - Report ingestion and rejections
//! - Fleet size and online count
//! - Telemetry channel state
//! - Map surface writes and popup refresh timers

use fleet_core::CoreError;
use fleet_tracker::{FleetSummary, IngestOutcome};
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use tracing::info;

/// Metrics collector for the fleet monitor
pub struct MetricsCollector {
    registry: Registry,

    // Ingestion
    reports_ingested: IntCounter,
    reports_rejected: IntCounterVec,

    // Fleet
    tracks: IntGauge,
    online_tracks: IntGauge,

    // Channel
    channel_connected: IntGauge,

    // Render
    popup_timers_active: IntGauge,
    surface_writes: IntCounterVec,
}

impl MetricsCollector {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let reports_ingested = IntCounter::new(
            "fleet_reports_ingested_total",
            "Reports merged into a track",
        )?;
        registry.register(Box::new(reports_ingested.clone()))?;

        let reports_rejected = IntCounterVec::new(
            Opts::new("fleet_reports_rejected_total", "Reports rejected during validation"),
            &["reason"],
        )?;
        registry.register(Box::new(reports_rejected.clone()))?;

        let tracks = IntGauge::new("fleet_tracks", "Tracks in the fleet state")?;
        registry.register(Box::new(tracks.clone()))?;

        let online_tracks = IntGauge::new("fleet_online_tracks", "Tracks with online status")?;
        registry.register(Box::new(online_tracks.clone()))?;

        let channel_connected = IntGauge::new(
            "fleet_channel_connected",
            "Whether the telemetry feed is connected",
        )?;
        registry.register(Box::new(channel_connected.clone()))?;

        let popup_timers_active = IntGauge::new(
            "fleet_popup_timers_active",
            "Popup refresh intervals currently running",
        )?;
        registry.register(Box::new(popup_timers_active.clone()))?;

        let surface_writes = IntCounterVec::new(
            Opts::new("fleet_surface_writes_total", "Map surface writes by verb"),
            &["verb"],
        )?;
        registry.register(Box::new(surface_writes.clone()))?;

        info!("📊 Metrics collector initialized");

        Ok(Self {
            registry,
            reports_ingested,
            reports_rejected,
            tracks,
            online_tracks,
            channel_connected,
            popup_timers_active,
            surface_writes,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    // ========================================================================
    // INGESTION
    // ========================================================================

    pub fn record_outcome(&self, outcome: &IngestOutcome) {
        self.reports_ingested.inc_by(outcome.applied.len() as u64);
        for rejection in &outcome.rejected {
            self.record_rejection(rejection);
        }
    }

    pub fn record_rejection(&self, error: &CoreError) {
        self.reports_rejected
            .with_label_values(&[rejection_reason(error)])
            .inc();
    }

    // ========================================================================
    // FLEET
    // ========================================================================

    pub fn update_fleet(&self, summary: &FleetSummary) {
        self.tracks.set(summary.total as i64);
        self.online_tracks.set(summary.online as i64);
    }

    // ========================================================================
    // CHANNEL
    // ========================================================================

    pub fn set_channel_connected(&self, connected: bool) {
        self.channel_connected.set(if connected { 1 } else { 0 });
    }

    // ========================================================================
    // RENDER
    // ========================================================================

    pub fn set_popup_timers(&self, active: usize) {
        self.popup_timers_active.set(active as i64);
    }

    pub fn record_surface_writes(&self, verb: &str, count: u64) {
        if count > 0 {
            self.surface_writes.with_label_values(&[verb]).inc_by(count);
        }
    }
}

/// Label value for a rejected report
pub fn rejection_reason(error: &CoreError) -> &'static str {
    match error {
        CoreError::MissingRegistration => "missing_registration",
        CoreError::MissingPosition { .. } => "missing_position",
        CoreError::InvalidPosition { .. } => "invalid_position",
        CoreError::EmptyMessage => "empty_message",
        CoreError::Serialization(_) => "undecodable",
        CoreError::Configuration(_) => "other",
    }
}

// ============================================================================
// TESTS
// ============================================================================
