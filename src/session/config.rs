use std::time::Duration;

/// Runtime parameters for the session controller
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Media relay URL
    pub endpoint: String,

    /// Channels are numbered 1..=channel_count
    pub channel_count: u32,

    /// Channel selected at startup
    pub default_channel: u32,

    /// First unit of the reconnect backoff (delay = base * 2^attempt)
    pub reconnect_base: Duration,

    /// Upper bound on a single reconnect delay
    pub reconnect_max: Duration,

    /// Roster reconciliation interval while connected
    pub heartbeat_interval: Duration,

    /// Delay before the startup auto-connect, so devices and preferences
    /// settle first
    pub startup_delay: Duration,

    /// Command mailbox depth
    pub mailbox_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://127.0.0.1:7880".to_string(),
            channel_count: 8,
            default_channel: 1,
            reconnect_base: Duration::from_secs(1),
            reconnect_max: Duration::from_secs(30),
            heartbeat_interval: Duration::from_secs(1),
            startup_delay: Duration::from_millis(300),
            mailbox_capacity: 64,
        }
    }
}
