//! Render synchronizer
//!
//! Owns one render binding per registration seen during the session and
//! turns state changes into the minimum set of surface writes:
//!
//! - latest report: extend the path, then place or glide the marker
//! - animation frames: move gliding markers
//! - popup open/close: start/stop exactly one refresh interval
//! - view changes: derive visibility, fly to selection, drag listener
//!
//! Nothing is written while the surface is not ready. Writes are not queued;
//! the next triggering event re-derives the scene from current state.

use crate::animation::MarkerAnimation;
use crate::config::RenderConfig;
use crate::popup::{render_popup, PopupSnapshot};
use crate::surface::{line_id, marker_id, registration_from_marker_id, DragListener, MapSurface};
use crate::timers::{TimerId, Timers};
use chrono::{DateTime, Utc};
use fleet_core::{DroneStatus, Registration, StatusPredicate};
use fleet_tracker::{FleetState, Track, ViewOptions, ViewState};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace};

// ============================================================================
// BINDING
// ============================================================================

/// Render resources owned for one registration
#[derive(Debug)]
struct RenderBinding {
    marker_id: String,
    line_id: String,
    status: DroneStatus,
    has_line: bool,
    animation: MarkerAnimation,
    rotation: f64,
    snapshot: PopupSnapshot,
    flight_start: DateTime<Utc>,
    popup_timer: Option<TimerId>,
    visible: bool,
}

impl RenderBinding {
    fn popup_html(&self, wall: DateTime<Utc>) -> String {
        let elapsed = (wall - self.flight_start).max(chrono::Duration::zero());
        render_popup(&self.snapshot, elapsed)
    }
}

// ============================================================================
// SYNCHRONIZER
// ============================================================================

pub struct RenderSynchronizer<S: MapSurface, T: Timers> {
    surface: S,
    timers: T,
    config: RenderConfig,
    status: Arc<dyn StatusPredicate>,
    bindings: HashMap<Registration, RenderBinding>,
    drag_listener: Option<DragListener>,
}

impl<S: MapSurface, T: Timers> RenderSynchronizer<S, T> {
    pub fn new(surface: S, timers: T, config: RenderConfig, status: Arc<dyn StatusPredicate>) -> Self {
        Self {
            surface,
            timers,
            config,
            status,
            bindings: HashMap::new(),
            drag_listener: None,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn timers(&self) -> &T {
        &self.timers
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    pub fn has_binding(&self, registration: &Registration) -> bool {
        self.bindings.contains_key(registration)
    }

    /// Visibility last applied to a registration's path and marker
    pub fn visibility(&self, registration: &Registration) -> Option<bool> {
        self.bindings.get(registration).map(|b| b.visible)
    }

    pub fn popup_timer(&self, registration: &Registration) -> Option<TimerId> {
        self.bindings.get(registration).and_then(|b| b.popup_timer)
    }

    pub fn open_popup_count(&self) -> usize {
        self.bindings
            .values()
            .filter(|b| b.popup_timer.is_some())
            .count()
    }

    pub fn drag_listener(&self) -> Option<DragListener> {
        self.drag_listener
    }

    pub fn is_animating(&self) -> bool {
        self.bindings.values().any(|b| b.animation.is_animating())
    }

    /// Registration for a marker this synchronizer placed
    pub fn registration_for_marker(&self, marker_id: &str) -> Option<Registration> {
        registration_from_marker_id(marker_id).filter(|reg| self.bindings.contains_key(reg))
    }

    // ========================================================================
    // REPORTS
    // ========================================================================

    /// Render the track that just received a report; returns whether a new
    /// binding was created for it
    pub fn on_latest(&mut self, track: &Track, now: Instant, wall: DateTime<Utc>) -> bool {
        if !self.surface.is_ready() {
            trace!("Surface not ready, skipping render of {}", track.registration());
            return false;
        }

        let registration = track.registration();
        let report = track.latest_report();
        let position = report.position;
        let rotation = report.rotation();

        match self.bindings.get_mut(registration) {
            Some(binding) => {
                if track.len() >= 2 || binding.has_line {
                    self.surface.upsert_line_layer(
                        &binding.line_id,
                        &track.coordinates(),
                        binding.status.line_color(),
                    );
                    // A layer drawn for the first time starts out shown
                    if !binding.has_line && !binding.visible {
                        self.surface.set_layer_visibility(&binding.line_id, false);
                    }
                    binding.has_line = true;
                }

                binding.animation.retarget(position, now);
                binding.rotation = rotation;
                binding.snapshot = PopupSnapshot::from_report(report);
                binding.flight_start = track.flight_start_time();

                if binding.popup_timer.is_some() {
                    let html = binding.popup_html(wall);
                    self.surface.set_popup_content(&binding.marker_id, &html);
                }
                debug!("Retargeted marker {}", binding.marker_id);
                false
            }
            None => {
                let status = self.status.status(registration);
                let mut binding = RenderBinding {
                    marker_id: marker_id(registration),
                    line_id: line_id(registration),
                    status,
                    has_line: false,
                    animation: MarkerAnimation::new(position, self.config.animation_duration()),
                    rotation,
                    snapshot: PopupSnapshot::from_report(report),
                    flight_start: track.flight_start_time(),
                    popup_timer: None,
                    visible: true,
                };

                if track.len() >= 2 {
                    self.surface.upsert_line_layer(
                        &binding.line_id,
                        &track.coordinates(),
                        status.line_color(),
                    );
                    binding.has_line = true;
                }

                self.surface
                    .place_marker(&binding.marker_id, position, rotation, status.line_color());
                let html = binding.popup_html(wall);
                self.surface.attach_popup(&binding.marker_id, &html);

                info!("Created render binding for {} ({})", registration, status);
                self.bindings.insert(registration.clone(), binding);
                true
            }
        }
    }

    /// Re-derive the scene after the surface becomes ready
    pub fn on_surface_ready(
        &mut self,
        state: &FleetState,
        view: &ViewState,
        now: Instant,
        wall: DateTime<Utc>,
    ) {
        if let Some(track) = state.latest() {
            self.on_latest(track, now, wall);
        }
        self.sync_drag_listener(&view.options);
        self.sync_visibility(view);
    }

    /// Empty every drawn path after the history was cleared
    pub fn on_history_cleared(&mut self) {
        if !self.surface.is_ready() {
            return;
        }
        for binding in self.bindings.values().filter(|b| b.has_line) {
            self.surface
                .upsert_line_layer(&binding.line_id, &[], binding.status.line_color());
        }
    }

    /// Advance marker animations; returns whether any are still running
    pub fn on_frame(&mut self, now: Instant) -> bool {
        if !self.surface.is_ready() {
            return self.is_animating();
        }

        let mut animating = false;
        for binding in self.bindings.values_mut() {
            if let Some(position) = binding.animation.tick(now) {
                self.surface
                    .move_marker(&binding.marker_id, position, binding.rotation);
            }
            animating |= binding.animation.is_animating();
        }
        animating
    }

    // ========================================================================
    // POPUPS
    // ========================================================================

    /// Start refreshing a popup once per period while it is open
    pub fn on_popup_open(&mut self, registration: &Registration, wall: DateTime<Utc>) {
        if !self.surface.is_ready() {
            return;
        }
        let Some(binding) = self.bindings.get_mut(registration) else {
            return;
        };
        if binding.popup_timer.is_some() {
            return;
        }

        let html = binding.popup_html(wall);
        self.surface.set_popup_content(&binding.marker_id, &html);
        let timer = self.timers.set_interval(self.config.popup_refresh());
        binding.popup_timer = Some(timer);
        debug!("Popup opened for {} ({})", registration, timer);
    }

    pub fn on_popup_close(&mut self, registration: &Registration) {
        if let Some(timer) = self
            .bindings
            .get_mut(registration)
            .and_then(|b| b.popup_timer.take())
        {
            self.timers.clear_interval(timer);
            debug!("Popup closed for {} ({})", registration, timer);
        }
    }

    /// Refresh the popup owning `timer`
    pub fn on_timer(&mut self, timer: TimerId, wall: DateTime<Utc>) {
        let Some(binding) = self
            .bindings
            .values()
            .find(|b| b.popup_timer == Some(timer))
        else {
            // Unknown timer: stop it so it cannot keep firing
            self.timers.clear_interval(timer);
            return;
        };

        if self.surface.is_ready() {
            let html = binding.popup_html(wall);
            self.surface.set_popup_content(&binding.marker_id, &html);
        }
    }

    // ========================================================================
    // VIEW
    // ========================================================================

    /// Apply the visibility rule to every rendered registration
    pub fn sync_visibility(&mut self, view: &ViewState) {
        if !self.surface.is_ready() {
            return;
        }

        for (registration, binding) in self.bindings.iter_mut() {
            let visible = visible_under(view, registration);
            if binding.has_line {
                self.surface.set_layer_visibility(&binding.line_id, visible);
            }
            self.surface
                .set_marker_visibility(&binding.marker_id, visible);
            binding.visible = visible;
        }
    }

    /// Apply the visibility rule to one registration, writing only on change
    pub fn apply_visibility(&mut self, registration: &Registration, view: &ViewState) {
        if !self.surface.is_ready() {
            return;
        }
        let Some(binding) = self.bindings.get_mut(registration) else {
            return;
        };

        let visible = visible_under(view, registration);
        if binding.visible == visible {
            return;
        }
        if binding.has_line {
            self.surface.set_layer_visibility(&binding.line_id, visible);
        }
        self.surface.set_marker_visibility(&binding.marker_id, visible);
        binding.visible = visible;
    }

    /// Fly to the newly selected drone, if any
    pub fn on_selection_changed(&mut self, state: &FleetState, view: &ViewState) {
        if let Some(track) = view.selected().and_then(|reg| state.get(reg)) {
            self.fly_to_track(track);
        }
    }

    pub fn fly_to_track(&mut self, track: &Track) {
        if !self.surface.is_ready() {
            return;
        }
        self.surface.fly_to(
            track.latest_position(),
            self.config.fly_to_zoom,
            self.config.fly_to_speed,
        );
    }

    /// Attach or detach the drag listener to match the options
    pub fn sync_drag_listener(&mut self, options: &ViewOptions) {
        if !self.surface.is_ready() {
            return;
        }

        match (options.cancel_selection_on_drag, self.drag_listener) {
            (true, None) => {
                self.drag_listener = Some(self.surface.on_drag());
                debug!("Drag listener attached");
            }
            (false, Some(listener)) => {
                self.surface.off_drag(listener);
                self.drag_listener = None;
                debug!("Drag listener detached");
            }
            _ => {}
        }
    }

    /// Whether a drag notification came from the live listener
    pub fn accepts_drag(&self, listener: DragListener) -> bool {
        self.drag_listener == Some(listener)
    }

    /// Release every timer and listener
    pub fn teardown(&mut self) {
        for binding in self.bindings.values_mut() {
            if let Some(timer) = binding.popup_timer.take() {
                self.timers.clear_interval(timer);
            }
        }
        if let Some(listener) = self.drag_listener.take() {
            self.surface.off_drag(listener);
        }
        if !self.bindings.is_empty() {
            info!("Render synchronizer torn down ({} bindings)", self.bindings.len());
        }
        self.bindings.clear();
    }
}

/// Everything is shown unless only the selected drone's path is wanted
fn visible_under(view: &ViewState, registration: &Registration) -> bool {
    match (view.options.show_selected_path_only, view.selected()) {
        (true, Some(selected)) => selected == registration,
        _ => true,
    }
}

impl<S: MapSurface, T: Timers> Drop for RenderSynchronizer<S, T> {
    fn drop(&mut self) {
        self.teardown();
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemorySurface;
    use crate::surface::MockMapSurface;
    use crate::timers::{ManualTimers, MockTimers};
    use chrono::TimeZone;
    use fleet_core::{Position, PrefixStatus, Report};
    use fleet_tracker::{IngestionReducer, ManualClock, ViewAction};
    use std::time::Duration;

    struct Harness {
        clock: ManualClock,
        reducer: IngestionReducer<ManualClock>,
        state: FleetState,
        view: ViewState,
        sync: RenderSynchronizer<InMemorySurface, ManualTimers>,
        t0: Instant,
    }

    impl Harness {
        fn new() -> Self {
            let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
            Self {
                reducer: IngestionReducer::with_clock(clock.clone()),
                clock,
                state: FleetState::new(),
                view: ViewState::default(),
                sync: RenderSynchronizer::new(
                    InMemorySurface::ready(),
                    ManualTimers::new(),
                    RenderConfig::default(),
                    Arc::new(PrefixStatus::default()),
                ),
                t0: Instant::now(),
            }
        }

        fn wall(&self) -> DateTime<Utc> {
            use fleet_tracker::Clock;
            self.clock.now()
        }

        fn ingest(&mut self, reg: &str, lng: f64, lat: f64) {
            let report = Report::new(reg, Position::new(lng, lat))
                .with_name(format!("{} drone", reg))
                .with_altitude(40.0);
            let wall = self.wall();
            let track = self.reducer.apply(&mut self.state, report).unwrap();
            self.sync.on_latest(track, self.t0, wall);
        }

        fn act(&mut self, action: ViewAction) {
            let change = self.view.apply(action);
            if change.selection_changed {
                self.sync.on_selection_changed(&self.state, &self.view);
            }
            if change.any() {
                self.sync.sync_visibility(&self.view);
                self.sync.sync_drag_listener(&self.view.options);
            }
        }
    }

    #[test]
    fn test_first_report_places_marker_without_line() {
        let mut h = Harness::new();
        h.ingest("SD-B1", 35.0, 31.0);

        let surface = h.sync.surface();
        assert_eq!(surface.line_count(), 0);
        let marker = surface.marker("drone-marker-SD-B1").unwrap();
        assert_eq!(marker.position, Position::new(35.0, 31.0));
        assert_eq!(marker.color, DroneStatus::ONLINE_COLOR);
        assert!(marker.popup.as_deref().unwrap().contains("SD-B1 drone"));
    }

    #[test]
    fn test_second_report_draws_path_and_animates() {
        let mut h = Harness::new();
        h.ingest("SD-B1", 35.0, 31.0);
        h.ingest("SD-B1", 35.1, 31.1);

        let line = h.sync.surface().line("drone-line-SD-B1").unwrap();
        assert_eq!(line.coordinates, vec![[35.0, 31.0], [35.1, 31.1]]);
        assert_eq!(line.color, DroneStatus::ONLINE_COLOR);
        assert_eq!(h.sync.surface().write_count("place_marker"), 1);

        assert!(h.sync.on_frame(h.t0 + Duration::from_millis(300)));
        let mid = h.sync.surface().marker("drone-marker-SD-B1").unwrap().position;
        assert!((mid.longitude - 35.05).abs() < 1e-9);

        assert!(!h.sync.on_frame(h.t0 + Duration::from_millis(600)));
        let end = h.sync.surface().marker("drone-marker-SD-B1").unwrap().position;
        assert_eq!(end, Position::new(35.1, 31.1));
    }

    #[test]
    fn test_offline_drone_uses_offline_color() {
        let mut h = Harness::new();
        h.ingest("XY-1", 35.0, 31.0);
        h.ingest("XY-1", 35.1, 31.0);

        assert_eq!(
            h.sync.surface().line("drone-line-XY-1").unwrap().color,
            DroneStatus::OFFLINE_COLOR
        );
    }

    #[test]
    fn test_path_render_is_idempotent() {
        let mut h = Harness::new();
        h.ingest("SD-B1", 35.0, 31.0);
        h.ingest("SD-B1", 35.1, 31.1);

        let track = h.state.get(&Registration::from("SD-B1")).unwrap().clone();
        let before = h.sync.surface().line("drone-line-SD-B1").cloned();
        let wall = h.wall();
        h.sync.on_latest(&track, h.t0, wall);
        h.sync.on_latest(&track, h.t0, wall);

        assert_eq!(h.sync.surface().line("drone-line-SD-B1").cloned(), before);
        assert_eq!(h.sync.surface().line_count(), 1);
        assert_eq!(h.sync.binding_count(), 1);
    }

    #[test]
    fn test_not_ready_surface_receives_no_writes() {
        let mut h = Harness::new();
        h.sync = RenderSynchronizer::new(
            InMemorySurface::new(),
            ManualTimers::new(),
            RenderConfig::default(),
            Arc::new(PrefixStatus::default()),
        );
        h.ingest("SD-B1", 35.0, 31.0);
        h.act(ViewAction::Select(Some(Registration::from("SD-B1"))));

        assert_eq!(h.sync.surface().total_writes(), 0);
        assert_eq!(h.sync.binding_count(), 0);

        // Ready makes the next event render from current state
        h.sync.surface_mut().initialize("pk.test").unwrap();
        let wall = h.wall();
        h.sync.on_surface_ready(&h.state, &h.view, h.t0, wall);
        assert!(h.sync.surface().marker("drone-marker-SD-B1").is_some());
        assert!(h.sync.drag_listener().is_some());
    }

    #[test]
    fn test_show_selected_only_visibility() {
        let mut h = Harness::new();
        h.ingest("SD-B1", 35.0, 31.0);
        h.ingest("SD-B1", 35.1, 31.0);
        h.ingest("SD-B2", 36.0, 31.0);
        h.ingest("SD-B2", 36.1, 31.0);
        let b1 = Registration::from("SD-B1");
        let b2 = Registration::from("SD-B2");

        h.act(ViewAction::SetShowSelectedPathOnly(true));
        assert_eq!(h.sync.visibility(&b1), Some(true));
        assert_eq!(h.sync.visibility(&b2), Some(true));

        h.act(ViewAction::Select(Some(b1.clone())));
        assert_eq!(h.sync.visibility(&b1), Some(true));
        assert_eq!(h.sync.visibility(&b2), Some(false));
        assert!(!h.sync.surface().line("drone-line-SD-B2").unwrap().visible);
        assert!(!h.sync.surface().marker("drone-marker-SD-B2").unwrap().visible);

        h.act(ViewAction::Select(None));
        assert_eq!(h.sync.visibility(&b2), Some(true));

        h.act(ViewAction::Select(Some(b1.clone())));
        h.act(ViewAction::SetShowSelectedPathOnly(false));
        assert_eq!(h.sync.visibility(&b2), Some(true));
    }

    #[test]
    fn test_visibility_sync_is_idempotent() {
        let mut h = Harness::new();
        for reg in ["SD-B1", "SD-B2", "XY-3"] {
            h.ingest(reg, 35.0, 31.0);
            h.ingest(reg, 35.1, 31.0);
        }
        h.act(ViewAction::SetShowSelectedPathOnly(true));
        h.act(ViewAction::Select(Some(Registration::from("XY-3"))));

        let once = h.sync.surface().snapshot();
        h.sync.sync_visibility(&h.view);
        let twice = h.sync.surface().snapshot();

        assert_eq!(once.lines, twice.lines);
        assert_eq!(once.markers, twice.markers);
        for reg in h.state.registrations() {
            assert!(h.sync.visibility(reg).is_some());
        }
    }

    #[test]
    fn test_selection_flies_camera() {
        let mut h = Harness::new();
        h.ingest("SD-B1", 35.0, 31.0);
        h.act(ViewAction::Select(Some(Registration::from("SD-B1"))));

        let camera = h.sync.surface().camera().unwrap();
        assert_eq!(camera.center, Position::new(35.0, 31.0));
        assert_eq!(camera.zoom, 14.0);
        assert_eq!(camera.speed, 1.2);
        assert_eq!(h.sync.surface().fly_to_count(), 1);

        h.act(ViewAction::Select(None));
        assert_eq!(h.sync.surface().fly_to_count(), 1);
    }

    #[test]
    fn test_selection_change_issues_exactly_one_fly_to() {
        let mut surface = MockMapSurface::new();
        surface.expect_is_ready().return_const(true);
        surface
            .expect_fly_to()
            .withf(|target: &Position, zoom: &f64, _speed: &f64| {
                *target == Position::new(35.0, 31.0) && *zoom == 14.0
            })
            .times(1)
            .return_const(());

        let mut timers = MockTimers::new();
        timers.expect_set_interval().never();

        let mut sync = RenderSynchronizer::new(
            surface,
            timers,
            RenderConfig::default(),
            Arc::new(PrefixStatus::default()),
        );

        let reducer = IngestionReducer::new();
        let mut state = FleetState::new();
        reducer
            .apply(&mut state, Report::new("SD-B1", Position::new(35.0, 31.0)))
            .unwrap();
        let mut view = ViewState::default();
        view.apply(ViewAction::Select(Some(Registration::from("SD-B1"))));

        sync.on_selection_changed(&state, &view);
    }

    #[test]
    fn test_not_ready_mock_sees_only_readiness_checks() {
        let mut surface = MockMapSurface::new();
        surface.expect_is_ready().return_const(false);
        let mut timers = MockTimers::new();
        timers.expect_set_interval().never();

        let mut sync = RenderSynchronizer::new(
            surface,
            timers,
            RenderConfig::default(),
            Arc::new(PrefixStatus::default()),
        );

        let reducer = IngestionReducer::new();
        let mut state = FleetState::new();
        let track = reducer
            .apply(&mut state, Report::new("SD-B1", Position::new(35.0, 31.0)))
            .unwrap()
            .clone();
        let view = ViewState::default();

        sync.on_latest(&track, Instant::now(), Utc::now());
        sync.on_popup_open(&Registration::from("SD-B1"), Utc::now());
        sync.sync_visibility(&view);
        sync.sync_drag_listener(&view.options);
        sync.on_selection_changed(&state, &view);
        assert!(!sync.on_frame(Instant::now()));
    }

    #[test]
    fn test_popup_cycles_leave_no_timers() {
        let mut h = Harness::new();
        h.ingest("SD-B1", 35.0, 31.0);
        let reg = Registration::from("SD-B1");

        for _ in 0..5 {
            let wall = h.wall();
            h.sync.on_popup_open(&reg, wall);
            h.sync.on_popup_open(&reg, wall);
            assert_eq!(h.sync.timers().active_count(), 1);
            h.sync.on_popup_close(&reg);
        }

        assert_eq!(h.sync.timers().active_count(), 0);
        assert_eq!(h.sync.timers().started(), 5);
        assert_eq!(h.sync.open_popup_count(), 0);
    }

    #[test]
    fn test_popup_timer_refreshes_elapsed() {
        let mut h = Harness::new();
        h.ingest("SD-B1", 35.0, 31.0);
        let reg = Registration::from("SD-B1");

        let wall = h.wall();
        h.sync.on_popup_open(&reg, wall);
        let timer = h.sync.popup_timer(&reg).unwrap();

        h.clock.advance(chrono::Duration::seconds(65));
        let wall = h.wall();
        h.sync.on_timer(timer, wall);

        let popup = h.sync.surface().marker("drone-marker-SD-B1").unwrap().popup.clone();
        assert!(popup.unwrap().contains("00:01:05"));
    }

    #[test]
    fn test_new_report_refreshes_open_popup() {
        let mut h = Harness::new();
        h.ingest("SD-B1", 35.0, 31.0);
        let reg = Registration::from("SD-B1");
        let wall = h.wall();
        h.sync.on_popup_open(&reg, wall);

        let popup = |h: &Harness| {
            h.sync.surface().marker("drone-marker-SD-B1").unwrap().popup.clone().unwrap()
        };
        assert!(popup(&h).contains("<div>40 m</div>"));
        let refreshes = h.sync.surface().write_count("set_popup_content");

        let report = Report::new("SD-B1", Position::new(35.1, 31.0)).with_altitude(75.0);
        let track = h.reducer.apply(&mut h.state, report).unwrap();
        h.sync.on_latest(track, h.t0, wall);

        assert!(popup(&h).contains("<div>75 m</div>"));
        assert_eq!(h.sync.surface().write_count("set_popup_content"), refreshes + 1);
        assert_eq!(h.sync.timers().started(), 1);
    }

    #[test]
    fn test_closed_popup_is_not_refreshed_by_reports() {
        let mut h = Harness::new();
        h.ingest("SD-B1", 35.0, 31.0);
        h.ingest("SD-B1", 35.1, 31.0);
        assert_eq!(h.sync.surface().write_count("set_popup_content"), 0);
    }

    #[test]
    fn test_unknown_timer_is_cleared() {
        let mut timers = MockTimers::new();
        timers
            .expect_clear_interval()
            .withf(|id: &TimerId| *id == TimerId(42))
            .times(1)
            .return_const(());

        let mut sync = RenderSynchronizer::new(
            InMemorySurface::ready(),
            timers,
            RenderConfig::default(),
            Arc::new(PrefixStatus::default()),
        );
        sync.on_timer(TimerId(42), Utc::now());
    }

    #[test]
    fn test_drag_listener_follows_option() {
        let mut h = Harness::new();
        h.sync.sync_drag_listener(&h.view.options);
        let first = h.sync.drag_listener().unwrap();
        assert!(h.sync.accepts_drag(first));

        h.act(ViewAction::SetCancelSelectionOnDrag(false));
        assert_eq!(h.sync.drag_listener(), None);
        assert!(!h.sync.accepts_drag(first));
        assert!(h.sync.surface().drag_listeners().is_empty());

        h.act(ViewAction::SetCancelSelectionOnDrag(true));
        let second = h.sync.drag_listener().unwrap();
        assert_ne!(first, second);
        assert_eq!(h.sync.surface().drag_listeners(), vec![second]);
    }

    #[test]
    fn test_history_clear_empties_paths() {
        let mut h = Harness::new();
        h.ingest("SD-B1", 35.0, 31.0);
        h.ingest("SD-B1", 35.1, 31.0);

        h.reducer.clear_history(&mut h.state);
        h.sync.on_history_cleared();
        assert!(h.sync.surface().line("drone-line-SD-B1").unwrap().coordinates.is_empty());

        h.ingest("SD-B1", 36.0, 31.0);
        assert_eq!(
            h.sync.surface().line("drone-line-SD-B1").unwrap().coordinates,
            vec![[36.0, 31.0]]
        );
        assert_eq!(h.sync.binding_count(), 1);
        assert_eq!(h.sync.surface().write_count("place_marker"), 1);
    }

    #[test]
    fn test_teardown_releases_everything() {
        let mut h = Harness::new();
        h.ingest("SD-B1", 35.0, 31.0);
        h.ingest("SD-B2", 36.0, 31.0);
        let wall = h.wall();
        h.sync.on_popup_open(&Registration::from("SD-B1"), wall);
        h.sync.on_popup_open(&Registration::from("SD-B2"), wall);
        h.sync.sync_drag_listener(&h.view.options);

        h.sync.teardown();

        assert_eq!(h.sync.timers().active_count(), 0);
        assert!(h.sync.surface().drag_listeners().is_empty());
        assert_eq!(h.sync.binding_count(), 0);
    }

    #[test]
    fn test_registration_for_marker() {
        let mut h = Harness::new();
        h.ingest("SD-B1", 35.0, 31.0);

        assert_eq!(
            h.sync.registration_for_marker("drone-marker-SD-B1"),
            Some(Registration::from("SD-B1"))
        );
        assert_eq!(h.sync.registration_for_marker("drone-marker-SD-B9"), None);
    }
}
