use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::messages::ControllerMessage;
use super::status::SessionStatus;
use crate::audio::{DeviceCatalog, DeviceList};
use crate::error::{chain, VoiceError};
use crate::roster::ParticipantSession;
use crate::settings::VolumeTable;

/// Cloneable handle to a running session controller
#[derive(Clone)]
pub struct SessionControllerHandle {
    sender: mpsc::Sender<ControllerMessage>,
    status: watch::Receiver<SessionStatus>,
    roster: watch::Receiver<Vec<ParticipantSession>>,
    connect_in_flight: Arc<AtomicBool>,
    catalog: DeviceCatalog,
    cancel: CancellationToken,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SessionControllerHandle {
    pub(crate) fn new(
        sender: mpsc::Sender<ControllerMessage>,
        status: watch::Receiver<SessionStatus>,
        roster: watch::Receiver<Vec<ParticipantSession>>,
        connect_in_flight: Arc<AtomicBool>,
        catalog: DeviceCatalog,
        cancel: CancellationToken,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            sender,
            status,
            roster,
            connect_in_flight,
            catalog,
            cancel,
            task: Arc::new(Mutex::new(Some(task))),
        }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> ControllerMessage,
    ) -> Result<T, VoiceError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| VoiceError::ControllerUnavailable)?;
        rx.await.map_err(|_| VoiceError::ControllerUnavailable)
    }

    /// Join the selected channel
    ///
    /// A no-op while another connect is already in flight or queued, so
    /// rapid repeated calls produce a single connection attempt.
    pub async fn connect(&self) -> Result<(), VoiceError> {
        if self.connect_in_flight.swap(true, Ordering::SeqCst) {
            debug!("connect ignored (already connecting)");
            return Ok(());
        }
        let result = self
            .request(|respond_to| ControllerMessage::Connect { respond_to })
            .await;
        if result.is_err() {
            // Never reached the controller, which is what clears the flag
            self.connect_in_flight.store(false, Ordering::SeqCst);
        }
        result?
    }

    /// Leave the channel; `stop_local_media` also releases the microphone
    pub async fn disconnect(&self, stop_local_media: bool) -> Result<(), VoiceError> {
        self.request(|respond_to| ControllerMessage::Disconnect {
            stop_local_media,
            respond_to,
        })
        .await
    }

    /// Leave the current channel and join channel `channel`
    pub async fn switch_channel(&self, channel: u32) -> Result<(), VoiceError> {
        self.request(|respond_to| ControllerMessage::SwitchChannel { channel, respond_to })
            .await?
    }

    pub async fn select_input_device(&self, device_id: Option<String>) -> Result<(), VoiceError> {
        self.request(|respond_to| ControllerMessage::SelectInputDevice {
            device_id,
            respond_to,
        })
        .await?
    }

    pub async fn select_output_device(&self, device_id: impl Into<String>) -> Result<(), VoiceError> {
        let device_id = device_id.into();
        self.request(|respond_to| ControllerMessage::SelectOutputDevice {
            device_id,
            respond_to,
        })
        .await
    }

    /// Set mic gain in percent; returns the linear factor applied
    pub async fn set_gain(&self, percent: u32) -> Result<f32, VoiceError> {
        self.request(|respond_to| ControllerMessage::SetGain { percent, respond_to })
            .await
    }

    /// Returns the new mute state, or `None` when nothing is published
    pub async fn set_muted(&self, muted: bool) -> Result<Option<bool>, VoiceError> {
        self.request(|respond_to| ControllerMessage::SetMuted {
            muted: Some(muted),
            respond_to,
        })
        .await
    }

    pub async fn toggle_mute(&self) -> Result<Option<bool>, VoiceError> {
        self.request(|respond_to| ControllerMessage::SetMuted {
            muted: None,
            respond_to,
        })
        .await
    }

    /// Set a peer's playback volume; returns the clamped value stored
    pub async fn set_peer_volume(
        &self,
        identity: impl Into<String>,
        volume: f32,
    ) -> Result<Option<f32>, VoiceError> {
        let identity = identity.into();
        self.request(|respond_to| ControllerMessage::SetPeerVolume {
            identity,
            volume,
            respond_to,
        })
        .await
    }

    pub async fn volumes(&self) -> Result<VolumeTable, VoiceError> {
        self.request(|respond_to| ControllerMessage::GetVolumes { respond_to })
            .await
    }

    pub async fn set_auto_connect(&self, enabled: bool) -> Result<(), VoiceError> {
        self.request(|respond_to| ControllerMessage::SetAutoConnect {
            enabled,
            respond_to,
        })
        .await
    }

    /// Store a display identity; used from the next connect on
    pub async fn set_identity(&self, identity: impl Into<String>) -> Result<String, VoiceError> {
        let identity = identity.into();
        self.request(|respond_to| ControllerMessage::SetIdentity {
            identity,
            respond_to,
        })
        .await?
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    pub fn roster(&self) -> Vec<ParticipantSession> {
        self.roster.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    pub fn subscribe_roster(&self) -> watch::Receiver<Vec<ParticipantSession>> {
        self.roster.clone()
    }

    pub async fn devices(&self) -> DeviceList {
        self.catalog.list().await
    }

    pub async fn refresh_devices(&self) -> Result<DeviceList, VoiceError> {
        self.catalog
            .refresh()
            .await
            .map_err(|e| VoiceError::DeviceAcquisitionFailed(chain(&e)))
    }

    /// Stop the controller, leaving the channel and releasing the microphone
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let task = self.task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!("Session controller task panicked: {}", e);
            }
        }
    }
}
