//! Error taxonomy for the voice session core.
//!
//! Collaborator traits return `anyhow::Result`; the controller and pipeline
//! classify failures into [`VoiceError`] so callers can decide whether a
//! failure should trigger the reconnect backoff or just surface as status.

use thiserror::Error;

/// Voice core error type.
#[derive(Debug, Error)]
pub enum VoiceError {
    /// The token collaborator could not issue a join credential.
    #[error("Token acquisition failed: {0}")]
    TokenAcquisitionFailed(String),

    /// Connecting to (or staying connected with) the media relay failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Microphone could not be opened (permission denied, device removed).
    #[error("Device acquisition failed: {0}")]
    DeviceAcquisitionFailed(String),

    /// Publishing the local track to the relay failed.
    #[error("Publish failed: {0}")]
    PublishFailed(String),

    /// Reading or writing a preference failed.
    #[error("Settings I/O failed: {0}")]
    SettingsIoFailed(String),

    /// Display identity is missing or too short.
    #[error("Invalid identity: {0:?}")]
    InvalidIdentity(String),

    /// Channel selector outside the configured range.
    #[error("Invalid channel: {0}")]
    InvalidChannel(u32),

    /// Operation requires an active relay session.
    #[error("Not connected")]
    NotConnected,

    /// The controller task has stopped and no longer accepts commands.
    #[error("Session controller unavailable")]
    ControllerUnavailable,
}

impl VoiceError {
    /// Whether this failure should schedule a reconnect attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            VoiceError::ConnectionFailed(_) | VoiceError::TokenAcquisitionFailed(_)
        )
    }

    /// Short machine-readable kind, used by the control API.
    pub fn kind(&self) -> &'static str {
        match self {
            VoiceError::TokenAcquisitionFailed(_) => "token_acquisition_failed",
            VoiceError::ConnectionFailed(_) => "connection_failed",
            VoiceError::DeviceAcquisitionFailed(_) => "device_acquisition_failed",
            VoiceError::PublishFailed(_) => "publish_failed",
            VoiceError::SettingsIoFailed(_) => "settings_io_failed",
            VoiceError::InvalidIdentity(_) => "invalid_identity",
            VoiceError::InvalidChannel(_) => "invalid_channel",
            VoiceError::NotConnected => "not_connected",
            VoiceError::ControllerUnavailable => "controller_unavailable",
        }
    }
}

/// Render an `anyhow` chain on one line (`outer: inner: root`).
pub(crate) fn chain(err: &anyhow::Error) -> String {
    format!("{:#}", err)
}
