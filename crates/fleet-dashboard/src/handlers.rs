//! API request handlers

use crate::error::{ApiError, ApiResult};
use crate::session::DroneDetail;
use crate::state::AppState;

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;
use fleet_core::Registration;
use fleet_render::{SceneSnapshot, SurfaceEvent};
use fleet_tracker::{DroneSnapshot, FleetSummary, ViewAction, ViewState};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// ============================================================================
// RESPONSE TYPES
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub telemetry_url: String,
    pub channel_connected: bool,
    pub last_channel_error: Option<String>,
    pub map_ready: bool,
    pub map_error: Option<String>,
    pub tracks: usize,
    pub reports: usize,
    pub uptime_seconds: i64,
}

#[derive(Serialize)]
pub struct DroneListResponse {
    pub drones: Vec<DroneSnapshot>,
    pub total: usize,
}

#[derive(Serialize)]
pub struct MapResponse {
    pub scene: SceneSnapshot,
    pub view: ViewState,
}

#[derive(Serialize)]
pub struct MapStatusResponse {
    pub ready: bool,
}

#[derive(Serialize)]
pub struct DragResponse {
    pub selection_cleared: bool,
}

// ============================================================================
// REQUEST TYPES
// ============================================================================

#[derive(Deserialize)]
pub struct SelectionRequest {
    /// Drone to select, `null` clears the selection
    pub registration: Option<String>,
    /// Clear instead when the drone is already selected
    #[serde(default)]
    pub toggle: bool,
}

#[derive(Deserialize)]
pub struct OptionsRequest {
    pub show_selected_path_only: Option<bool>,
    pub cancel_selection_on_drag: Option<bool>,
}

#[derive(Deserialize)]
pub struct CredentialRequest {
    pub token: String,
}

// ============================================================================
// HEALTH & STATUS
// ============================================================================

pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Channel and map status
pub async fn system_status(State(state): State<AppState>) -> impl IntoResponse {
    let response = state.session.read(|shared| StatusResponse {
        telemetry_url: state.config.channel.url.clone(),
        channel_connected: shared.channel_connected,
        last_channel_error: shared.last_channel_error.clone(),
        map_ready: shared.surface_ready,
        map_error: shared.surface_error.clone(),
        tracks: shared.fleet.len(),
        reports: shared.fleet.report_count(),
        uptime_seconds: state.uptime_seconds(),
    });
    Json(response)
}

/// Prometheus metrics endpoint
pub async fn metrics(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let body = state
        .metrics
        .export()
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}

// ============================================================================
// DASHBOARD READ VIEWS
// ============================================================================

pub async fn get_summary(State(state): State<AppState>) -> Json<FleetSummary> {
    Json(state.session.summary())
}

pub async fn list_drones(State(state): State<AppState>) -> Json<DroneListResponse> {
    let drones = state.session.drones();
    Json(DroneListResponse {
        total: drones.len(),
        drones,
    })
}

pub async fn get_drone(
    State(state): State<AppState>,
    Path(registration): Path<String>,
) -> ApiResult<Json<DroneDetail>> {
    state
        .session
        .drone(&Registration::from(registration.as_str()))
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Drone {} not found", registration)))
}

pub async fn get_map(State(state): State<AppState>) -> ApiResult<Json<MapResponse>> {
    let scene = state.session.scene().await?;
    Ok(Json(MapResponse {
        scene,
        view: state.session.view(),
    }))
}

// ============================================================================
// USER ACTIONS
// ============================================================================

pub async fn select_drone(
    State(state): State<AppState>,
    Json(request): Json<SelectionRequest>,
) -> ApiResult<Json<ViewState>> {
    let registration = request.registration.map(Registration::from);

    if let Some(reg) = &registration {
        let known = state.session.read(|shared| shared.fleet.contains(reg));
        if !known {
            return Err(ApiError::not_found(format!("Drone {} not found", reg)));
        }
    }

    let action = match (registration, request.toggle) {
        (Some(reg), true) => ViewAction::ToggleSelection(reg),
        (None, true) => return Err(ApiError::bad_request("toggle requires a registration")),
        (selection, false) => ViewAction::Select(selection),
    };

    debug!("Selection request: {:?}", action);
    Ok(Json(state.session.apply(action).await?))
}

pub async fn update_options(
    State(state): State<AppState>,
    Json(request): Json<OptionsRequest>,
) -> ApiResult<Json<ViewState>> {
    let mut actions = Vec::new();
    if let Some(on) = request.show_selected_path_only {
        actions.push(ViewAction::SetShowSelectedPathOnly(on));
    }
    if let Some(on) = request.cancel_selection_on_drag {
        actions.push(ViewAction::SetCancelSelectionOnDrag(on));
    }
    if actions.is_empty() {
        return Err(ApiError::bad_request("no option to change"));
    }

    let mut view = state.session.view();
    for action in actions {
        view = state.session.apply(action).await?;
    }
    Ok(Json(view))
}

/// Retry map initialization with a new credential
pub async fn set_map_credential(
    State(state): State<AppState>,
    Json(request): Json<CredentialRequest>,
) -> ApiResult<Json<MapStatusResponse>> {
    state.session.set_credential(request.token).await??;
    info!("Map credential accepted");
    Ok(Json(MapStatusResponse { ready: true }))
}

pub async fn drag_map(State(state): State<AppState>) -> ApiResult<Json<DragResponse>> {
    let selection_cleared = state.session.drag().await?;
    Ok(Json(DragResponse { selection_cleared }))
}

/// Forward an event raised by a map client
pub async fn post_map_event(
    State(state): State<AppState>,
    Json(event): Json<SurfaceEvent>,
) -> ApiResult<StatusCode> {
    state.session.surface_event(event).await?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn clear_history(State(state): State<AppState>) -> ApiResult<Json<FleetSummary>> {
    state.session.clear_history().await?;
    Ok(Json(state.session.summary()))
}
