use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session queries
        .route("/status", get(handlers::get_status))
        .route("/roster", get(handlers::get_roster))
        .route("/devices", get(handlers::get_devices))
        .route("/devices/refresh", post(handlers::refresh_devices))
        // Connection control
        .route("/connect", post(handlers::connect))
        .route("/disconnect", post(handlers::disconnect))
        .route("/channel/:channel", post(handlers::switch_channel))
        // Audio control
        .route("/mic", post(handlers::select_mic))
        .route("/speaker", post(handlers::select_speaker))
        .route("/gain", post(handlers::set_gain))
        .route("/mute", post(handlers::set_mute))
        .route("/volume", get(handlers::get_volumes).post(handlers::set_volume))
        // Preferences
        .route("/auto-connect", post(handlers::set_auto_connect))
        .route("/identity", post(handlers::set_identity))
        // The overlay UI runs in a webview on another origin
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
