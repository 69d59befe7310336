//! Application state shared by the HTTP handlers

use crate::config::DashboardConfig;
use crate::session::SessionHandle;

use chrono::{DateTime, Utc};
use fleet_telemetry::MetricsCollector;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<DashboardConfig>,
    /// Front door to the monitoring session
    pub session: SessionHandle,
    pub metrics: Arc<MetricsCollector>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        config: DashboardConfig,
        session: SessionHandle,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            session,
            metrics,
            started_at: Utc::now(),
        }
    }

    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
