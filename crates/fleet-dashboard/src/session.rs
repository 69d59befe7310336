//! Monitoring session
//!
//! A single task owns the reducer and the render synchronizer and
//! serializes everything that mutates them: telemetry from the channel,
//! operator commands from the API, surface events, popup timer ticks and
//! animation frames. The fleet and view state are shared with the API
//! behind a lock so read views never go through the loop.

use crate::config::DashboardConfig;
use crate::error::{SessionError, SessionResult};

use chrono::Utc;
use fleet_channel::ChannelEvent;
use fleet_core::{Registration, StatusPredicate, TelemetryMessage};
use fleet_render::{
    DragListener, InMemorySurface, MapSurface, RenderResult, RenderSynchronizer, SceneSnapshot,
    SurfaceEvent, TimerId, Timers,
};
use fleet_telemetry::MetricsCollector;
use fleet_tracker::{
    DroneSnapshot, FleetState, FleetSummary, IngestionReducer, ViewAction, ViewState,
};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Animation frame period while any marker is gliding
const FRAME_PERIOD: Duration = Duration::from_millis(16);

const COMMAND_CAPACITY: usize = 64;

// ============================================================================
// SHARED STATE
// ============================================================================

/// State readable by the API without going through the session loop
#[derive(Debug, Default)]
pub struct SharedState {
    pub fleet: FleetState,
    pub view: ViewState,
    pub channel_connected: bool,
    pub last_channel_error: Option<String>,
    pub surface_ready: bool,
    pub surface_error: Option<String>,
}

/// One drone with its full path
#[derive(Debug, Clone, Serialize)]
pub struct DroneDetail {
    #[serde(flatten)]
    pub snapshot: DroneSnapshot,
    pub path: Vec<[f64; 2]>,
    pub selected: bool,
}

// ============================================================================
// COMMANDS
// ============================================================================

/// Operator requests forwarded to the session loop
#[derive(Debug)]
pub enum Command {
    View {
        action: ViewAction,
        reply: oneshot::Sender<ViewState>,
    },
    Credential {
        token: String,
        reply: oneshot::Sender<RenderResult<()>>,
    },
    /// Drag the map as the operator would; replies whether it cleared a selection
    Drag { reply: oneshot::Sender<bool> },
    Surface(SurfaceEvent),
    ClearHistory { reply: oneshot::Sender<()> },
    Scene { reply: oneshot::Sender<SceneSnapshot> },
}

/// Cloneable front door to a running session
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    shared: Arc<RwLock<SharedState>>,
    status: Arc<dyn StatusPredicate>,
}

impl SessionHandle {
    /// Read the shared state under the lock
    pub fn read<R>(&self, f: impl FnOnce(&SharedState) -> R) -> R {
        f(&self.shared.read())
    }

    pub fn summary(&self) -> FleetSummary {
        let shared = self.shared.read();
        FleetSummary::from_state(&shared.fleet, self.status.as_ref(), Utc::now())
    }

    pub fn drones(&self) -> Vec<DroneSnapshot> {
        let now = Utc::now();
        let shared = self.shared.read();
        shared
            .fleet
            .tracks()
            .map(|t| DroneSnapshot::from_track(t, self.status.as_ref(), now))
            .collect()
    }

    pub fn drone(&self, registration: &Registration) -> Option<DroneDetail> {
        let shared = self.shared.read();
        shared.fleet.get(registration).map(|track| DroneDetail {
            snapshot: DroneSnapshot::from_track(track, self.status.as_ref(), Utc::now()),
            path: track.coordinates(),
            selected: shared.view.is_selected(registration),
        })
    }

    pub fn view(&self) -> ViewState {
        self.shared.read().view.clone()
    }

    pub async fn apply(&self, action: ViewAction) -> SessionResult<ViewState> {
        self.request(|reply| Command::View { action, reply }).await
    }

    pub async fn set_credential(&self, token: String) -> SessionResult<RenderResult<()>> {
        self.request(|reply| Command::Credential { token, reply }).await
    }

    pub async fn drag(&self) -> SessionResult<bool> {
        self.request(|reply| Command::Drag { reply }).await
    }

    pub async fn surface_event(&self, event: SurfaceEvent) -> SessionResult<()> {
        self.commands
            .send(Command::Surface(event))
            .await
            .map_err(|_| SessionError::Closed)
    }

    pub async fn clear_history(&self) -> SessionResult<()> {
        self.request(|reply| Command::ClearHistory { reply }).await
    }

    pub async fn scene(&self) -> SessionResult<SceneSnapshot> {
        self.request(|reply| Command::Scene { reply }).await
    }

    async fn request<R>(
        &self,
        make: impl FnOnce(oneshot::Sender<R>) -> Command,
    ) -> SessionResult<R> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)
    }
}

// ============================================================================
// SESSION
// ============================================================================

pub struct Session<T: Timers> {
    core: SessionCore<T>,
    commands: mpsc::Receiver<Command>,
    timer_ticks: mpsc::UnboundedReceiver<TimerId>,
}

impl<T: Timers> Session<T> {
    /// Build a session; `timer_ticks` receives the ids fired by `timers`
    pub fn new(
        config: &DashboardConfig,
        timers: T,
        timer_ticks: mpsc::UnboundedReceiver<TimerId>,
        metrics: Arc<MetricsCollector>,
    ) -> (Self, SessionHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let shared = Arc::new(RwLock::new(SharedState::default()));
        let status: Arc<dyn StatusPredicate> = Arc::new(config.status());

        let core = SessionCore::new(config, timers, shared.clone(), status.clone(), metrics);
        let handle = SessionHandle {
            commands: command_tx,
            shared,
            status,
        };

        (
            Self {
                core,
                commands: command_rx,
                timer_ticks,
            },
            handle,
        )
    }

    /// Run until `shutdown` resolves, then tear the render state down
    pub async fn run<F>(self, mut events: mpsc::Receiver<ChannelEvent>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let Session {
            mut core,
            mut commands,
            mut timer_ticks,
        } = self;
        tokio::pin!(shutdown);

        let mut frames = tokio::time::interval(FRAME_PERIOD);
        frames.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Session started");
        loop {
            // Telemetry is drained before commands
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Session shutting down");
                    break;
                }
                Some(event) = events.recv() => core.on_channel_event(event),
                Some(command) = commands.recv() => core.on_command(command),
                Some(timer) = timer_ticks.recv() => core.on_timer(timer),
                _ = frames.tick(), if core.is_animating() => core.on_frame(),
                else => break,
            }
            core.publish();
        }

        core.teardown();
        info!("Session stopped");
    }
}

// ============================================================================
// SESSION CORE
// ============================================================================

/// Session logic without the event loop
pub struct SessionCore<T: Timers> {
    reducer: IngestionReducer,
    sync: RenderSynchronizer<InMemorySurface, T>,
    shared: Arc<RwLock<SharedState>>,
    status: Arc<dyn StatusPredicate>,
    metrics: Arc<MetricsCollector>,
    reported_writes: BTreeMap<&'static str, u64>,
}

impl<T: Timers> SessionCore<T> {
    pub fn new(
        config: &DashboardConfig,
        timers: T,
        shared: Arc<RwLock<SharedState>>,
        status: Arc<dyn StatusPredicate>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        let sync = RenderSynchronizer::new(
            InMemorySurface::new(),
            timers,
            config.render.clone(),
            status.clone(),
        );

        let mut core = Self {
            reducer: IngestionReducer::new(),
            sync,
            shared,
            status,
            metrics,
            reported_writes: BTreeMap::new(),
        };

        match &config.map_access_token {
            Some(token) => {
                if let Err(e) = core.set_credential(token) {
                    error!("Map unavailable: {}", e);
                }
            }
            None => warn!("MAP_ACCESS_TOKEN not set, map stays down until a credential is supplied"),
        }
        core.publish();
        core
    }

    #[cfg(test)]
    pub fn sync(&self) -> &RenderSynchronizer<InMemorySurface, T> {
        &self.sync
    }

    pub fn is_animating(&self) -> bool {
        self.sync.is_animating()
    }

    // ========================================================================
    // CHANNEL
    // ========================================================================

    pub fn on_channel_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Connected { connection_id, .. } => {
                info!("Telemetry connected ({})", connection_id);
                self.shared.write().channel_connected = true;
                self.metrics.set_channel_connected(true);
            }
            ChannelEvent::Message(message) => self.ingest(message),
            ChannelEvent::Disconnected => {
                warn!("Telemetry disconnected, waiting for reconnect");
                self.shared.write().channel_connected = false;
                self.metrics.set_channel_connected(false);
            }
            ChannelEvent::Error(reason) => {
                warn!("Telemetry error: {}", reason);
                self.shared.write().last_channel_error = Some(reason);
            }
        }
    }

    fn ingest(&mut self, message: TelemetryMessage) {
        let now = Instant::now();
        let wall = Utc::now();

        let mut shared = self.shared.write();
        let SharedState { fleet, view, .. } = &mut *shared;

        let outcome = self.reducer.apply_message(fleet, message);
        self.metrics.record_outcome(&outcome);

        for registration in &outcome.applied {
            let Some(track) = fleet.get(registration) else {
                continue;
            };
            // New bindings pick up the current visibility rule
            if self.sync.on_latest(track, now, wall) {
                self.sync.apply_visibility(registration, view);
            }
        }

        if outcome.latest_changed() && self.sync.config().follow_selection {
            let followed = view
                .selected()
                .filter(|reg| outcome.applied.contains(reg))
                .and_then(|reg| fleet.get(reg));
            if let Some(track) = followed {
                self.sync.fly_to_track(track);
            }
        }

        self.metrics
            .update_fleet(&FleetSummary::from_state(fleet, self.status.as_ref(), wall));
    }

    // ========================================================================
    // COMMANDS
    // ========================================================================

    pub fn on_command(&mut self, command: Command) {
        match command {
            Command::View { action, reply } => {
                let _ = reply.send(self.apply_view(action));
            }
            Command::Credential { token, reply } => {
                let _ = reply.send(self.set_credential(&token));
            }
            Command::Drag { reply } => {
                let _ = reply.send(self.drag());
            }
            Command::Surface(event) => self.on_surface_event(event),
            Command::ClearHistory { reply } => {
                self.clear_history();
                let _ = reply.send(());
            }
            Command::Scene { reply } => {
                let _ = reply.send(self.sync.surface().snapshot());
            }
        }
    }

    pub fn apply_view(&mut self, action: ViewAction) -> ViewState {
        let mut shared = self.shared.write();
        let SharedState { fleet, view, .. } = &mut *shared;

        let change = view.apply(action);
        if change.selection_changed {
            self.sync.on_selection_changed(fleet, view);
        }
        if change.any() {
            self.sync.sync_visibility(view);
            self.sync.sync_drag_listener(&view.options);
        }
        view.clone()
    }

    /// Bring the map up with a credential; a failure leaves it down and retryable
    pub fn set_credential(&mut self, token: &str) -> RenderResult<()> {
        self.sync.surface_mut().initialize(token)?;
        self.on_surface_ready();
        Ok(())
    }

    fn on_surface_ready(&mut self) {
        let shared = self.shared.read();
        self.sync
            .on_surface_ready(&shared.fleet, &shared.view, Instant::now(), Utc::now());
    }

    pub fn on_surface_event(&mut self, event: SurfaceEvent) {
        match event {
            SurfaceEvent::Ready => self.on_surface_ready(),
            SurfaceEvent::Failed { reason } => {
                error!("Map surface failed: {}", reason);
                self.sync.surface_mut().fail(reason);
            }
            SurfaceEvent::Drag { listener } => {
                self.on_drag(listener);
            }
            SurfaceEvent::MarkerClicked { marker_id } => {
                if let Some(registration) = self.sync.registration_for_marker(&marker_id) {
                    self.apply_view(ViewAction::Select(Some(registration)));
                }
            }
            SurfaceEvent::PopupOpened { marker_id } => {
                if let Some(registration) = self.sync.registration_for_marker(&marker_id) {
                    self.sync.on_popup_open(&registration, Utc::now());
                }
            }
            SurfaceEvent::PopupClosed { marker_id } => {
                if let Some(registration) = self.sync.registration_for_marker(&marker_id) {
                    self.sync.on_popup_close(&registration);
                }
            }
        }
    }

    /// Handle a drag notification; returns whether it cleared a selection
    fn on_drag(&mut self, listener: DragListener) -> bool {
        if !self.sync.accepts_drag(listener) {
            debug!("Ignoring drag from detached listener {:?}", listener);
            return false;
        }
        let had_selection = self.shared.read().view.selected().is_some();
        self.apply_view(ViewAction::Select(None));
        had_selection
    }

    /// Deliver a drag to every listener registered on the surface
    pub fn drag(&mut self) -> bool {
        let mut cleared = false;
        for listener in self.sync.surface().drag_listeners() {
            cleared |= self.on_drag(listener);
        }
        cleared
    }

    pub fn clear_history(&mut self) {
        {
            let mut shared = self.shared.write();
            self.reducer.clear_history(&mut shared.fleet);
        }
        self.sync.on_history_cleared();
        self.metrics.update_fleet(&FleetSummary::empty());
        info!("Flight history cleared");
    }

    // ========================================================================
    // TIMERS & FRAMES
    // ========================================================================

    pub fn on_timer(&mut self, timer: TimerId) {
        self.sync.on_timer(timer, Utc::now());
    }

    pub fn on_frame(&mut self) {
        self.sync.on_frame(Instant::now());
    }

    // ========================================================================
    // PUBLISH
    // ========================================================================

    /// Mirror surface status into the shared state and metrics
    pub fn publish(&mut self) {
        let surface = self.sync.surface();
        {
            let mut shared = self.shared.write();
            shared.surface_ready = surface.is_ready();
            shared.surface_error = surface.error().map(str::to_string);
        }

        for (verb, total) in surface.writes() {
            let reported = self.reported_writes.entry(*verb).or_insert(0);
            self.metrics.record_surface_writes(verb, total - *reported);
            *reported = *total;
        }
        self.metrics.set_popup_timers(self.sync.open_popup_count());
    }

    pub fn teardown(&mut self) {
        self.sync.teardown();
        self.publish();
    }
}

// ============================================================================
// TESTS
// ============================================================================
