//! HTTP API server for external control (tray menu, overlay UI)
//!
//! This module provides a local REST API over the session controller:
//! - GET /status, /roster, /devices, /volume - Query state
//! - POST /connect, /disconnect, /channel/:n - Channel membership
//! - POST /mic, /speaker, /gain, /mute, /volume - Audio control
//! - POST /auto-connect, /identity - Preferences
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::ErrorResponse;
pub use routes::create_router;
pub use state::AppState;
