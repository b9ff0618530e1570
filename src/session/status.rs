use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Reconnecting,
    Disconnected,
}

/// Snapshot of the controller for status displays
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    /// Current connection state
    pub state: ConnectionState,

    /// Human-readable status line
    pub status_text: String,

    /// Selected channel number and its relay room name
    pub channel: u32,
    pub channel_name: String,

    /// Local display identity, once resolved
    pub identity: Option<String>,

    /// When the current session connected
    pub connected_at: Option<DateTime<Utc>>,

    /// Pending automatic reconnect, if any
    pub reconnect_attempt: Option<u32>,

    pub input_device: Option<String>,
    pub output_device: Option<String>,
    pub mic_gain_percent: u32,
    pub muted: bool,
    pub auto_connect: bool,
}
