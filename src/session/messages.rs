use tokio::sync::oneshot;

use crate::error::VoiceError;
use crate::settings::VolumeTable;

/// Commands handled by the session controller task, one at a time
#[derive(Debug)]
pub enum ControllerMessage {
    Connect {
        respond_to: oneshot::Sender<Result<(), VoiceError>>,
    },
    Disconnect {
        stop_local_media: bool,
        respond_to: oneshot::Sender<()>,
    },
    SwitchChannel {
        channel: u32,
        respond_to: oneshot::Sender<Result<(), VoiceError>>,
    },
    SelectInputDevice {
        device_id: Option<String>,
        respond_to: oneshot::Sender<Result<(), VoiceError>>,
    },
    SelectOutputDevice {
        device_id: String,
        respond_to: oneshot::Sender<()>,
    },
    SetGain {
        percent: u32,
        respond_to: oneshot::Sender<f32>,
    },
    /// `None` toggles the current state
    SetMuted {
        muted: Option<bool>,
        respond_to: oneshot::Sender<Option<bool>>,
    },
    SetPeerVolume {
        identity: String,
        volume: f32,
        respond_to: oneshot::Sender<Option<f32>>,
    },
    GetVolumes {
        respond_to: oneshot::Sender<VolumeTable>,
    },
    SetAutoConnect {
        enabled: bool,
        respond_to: oneshot::Sender<()>,
    },
    SetIdentity {
        identity: String,
        respond_to: oneshot::Sender<Result<String, VoiceError>>,
    },
}
