use super::state::AppState;
use crate::error::VoiceError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct DisconnectRequest {
    /// Also release the microphone (default: true)
    #[serde(default = "default_true")]
    pub stop_local_media: bool,
}

#[derive(Debug, Deserialize)]
pub struct DeviceRequest {
    /// `None` selects the system default (mic only)
    pub device_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GainRequest {
    pub percent: u32,
}

#[derive(Debug, Serialize)]
pub struct GainResponse {
    pub percent: u32,
    pub linear: f32,
}

#[derive(Debug, Deserialize)]
pub struct MuteRequest {
    /// Omit to toggle
    pub muted: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct MuteResponse {
    pub muted: bool,
}

#[derive(Debug, Deserialize)]
pub struct VolumeRequest {
    pub identity: String,
    pub volume: f32,
}

#[derive(Debug, Serialize)]
pub struct VolumeResponse {
    pub identity: String,
    pub volume: f32,
}

#[derive(Debug, Deserialize)]
pub struct AutoConnectRequest {
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct IdentityRequest {
    pub identity: String,
}

#[derive(Debug, Serialize)]
pub struct IdentityResponse {
    pub identity: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

fn default_true() -> bool {
    true
}

fn status_for(err: &VoiceError) -> StatusCode {
    match err {
        VoiceError::InvalidIdentity(_) | VoiceError::InvalidChannel(_) => StatusCode::BAD_REQUEST,
        VoiceError::NotConnected | VoiceError::DeviceAcquisitionFailed(_) => StatusCode::CONFLICT,
        VoiceError::TokenAcquisitionFailed(_)
        | VoiceError::ConnectionFailed(_)
        | VoiceError::PublishFailed(_) => StatusCode::BAD_GATEWAY,
        VoiceError::SettingsIoFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        VoiceError::ControllerUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn error_response(err: VoiceError) -> Response {
    let status = status_for(&err);
    if status.is_server_error() {
        error!("Request failed: {}", err);
    } else {
        warn!("Request rejected: {}", err);
    }
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            kind: err.kind().to_string(),
        }),
    )
        .into_response()
}

fn accepted(state: &AppState) -> Response {
    (StatusCode::OK, Json(state.controller.status())).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /status
/// Current connection state and status line
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.controller.status())
}

/// GET /roster
/// Participants in the current channel, local first
pub async fn get_roster(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.controller.roster())
}

/// GET /devices
/// Last enumerated input and output devices
pub async fn get_devices(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.controller.devices().await)
}

/// POST /devices/refresh
/// Re-enumerate devices (e.g. after a device change notification)
pub async fn refresh_devices(State(state): State<AppState>) -> Response {
    match state.controller.refresh_devices().await {
        Ok(devices) => (StatusCode::OK, Json(devices)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /connect
/// Join the selected channel
pub async fn connect(State(state): State<AppState>) -> Response {
    info!("Connect requested");
    match state.controller.connect().await {
        Ok(()) => accepted(&state),
        Err(e) => error_response(e),
    }
}

/// POST /disconnect
/// Leave the channel
pub async fn disconnect(
    State(state): State<AppState>,
    req: Option<Json<DisconnectRequest>>,
) -> Response {
    let stop_local_media = req.map(|Json(r)| r.stop_local_media).unwrap_or(true);
    info!("Disconnect requested (stop_local_media={})", stop_local_media);
    match state.controller.disconnect(stop_local_media).await {
        Ok(()) => accepted(&state),
        Err(e) => error_response(e),
    }
}

/// POST /channel/:channel
/// Move to another channel
pub async fn switch_channel(
    State(state): State<AppState>,
    Path(channel): Path<u32>,
) -> Response {
    info!("Switch to channel {} requested", channel);
    match state.controller.switch_channel(channel).await {
        Ok(()) => accepted(&state),
        Err(e) => error_response(e),
    }
}

/// POST /mic
/// Select the capture device
pub async fn select_mic(
    State(state): State<AppState>,
    Json(req): Json<DeviceRequest>,
) -> Response {
    match state.controller.select_input_device(req.device_id).await {
        Ok(()) => accepted(&state),
        Err(e) => error_response(e),
    }
}

/// POST /speaker
/// Select the playback device
pub async fn select_speaker(
    State(state): State<AppState>,
    Json(req): Json<DeviceRequest>,
) -> Response {
    let Some(device_id) = req.device_id else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "device_id is required".to_string(),
                kind: "invalid_request".to_string(),
            }),
        )
            .into_response();
    };
    match state.controller.select_output_device(device_id).await {
        Ok(()) => accepted(&state),
        Err(e) => error_response(e),
    }
}

/// POST /gain
/// Set microphone gain in percent
pub async fn set_gain(State(state): State<AppState>, Json(req): Json<GainRequest>) -> Response {
    match state.controller.set_gain(req.percent).await {
        Ok(linear) => (
            StatusCode::OK,
            Json(GainResponse {
                percent: req.percent,
                linear,
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /mute
/// Mute, unmute or toggle the published microphone
pub async fn set_mute(State(state): State<AppState>, Json(req): Json<MuteRequest>) -> Response {
    let result = match req.muted {
        Some(muted) => state.controller.set_muted(muted).await,
        None => state.controller.toggle_mute().await,
    };
    match result {
        Ok(Some(muted)) => (StatusCode::OK, Json(MuteResponse { muted })).into_response(),
        Ok(None) => error_response(VoiceError::NotConnected),
        Err(e) => error_response(e),
    }
}

/// GET /volume
/// Stored per-participant volumes
pub async fn get_volumes(State(state): State<AppState>) -> Response {
    match state.controller.volumes().await {
        Ok(volumes) => (StatusCode::OK, Json(volumes)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /volume
/// Set the playback volume for one participant identity
pub async fn set_volume(State(state): State<AppState>, Json(req): Json<VolumeRequest>) -> Response {
    match state
        .controller
        .set_peer_volume(req.identity.clone(), req.volume)
        .await
    {
        Ok(Some(volume)) => (
            StatusCode::OK,
            Json(VolumeResponse {
                identity: req.identity,
                volume,
            }),
        )
            .into_response(),
        Ok(None) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("Volume {} is not a number", req.volume),
                kind: "invalid_request".to_string(),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /auto-connect
/// Toggle automatic connect and reconnect
pub async fn set_auto_connect(
    State(state): State<AppState>,
    Json(req): Json<AutoConnectRequest>,
) -> Response {
    match state.controller.set_auto_connect(req.enabled).await {
        Ok(()) => accepted(&state),
        Err(e) => error_response(e),
    }
}

/// POST /identity
/// Store a new display identity (used from the next connect)
pub async fn set_identity(
    State(state): State<AppState>,
    Json(req): Json<IdentityRequest>,
) -> Response {
    match state.controller.set_identity(req.identity).await {
        Ok(identity) => (StatusCode::OK, Json(IdentityResponse { identity })).into_response(),
        Err(e) => error_response(e),
    }
}
