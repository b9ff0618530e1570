use anyhow::Result;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::audio::AudioFrame;
use crate::token::Credential;

/// Provider-assigned participant id, unique per connection instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Provider-assigned track id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackSid(pub String);

impl fmt::Display for TrackSid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackSid {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One participant as the provider currently sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub sid: SessionId,
    /// Display identity; empty when the provider has not reported it yet
    pub identity: String,
    /// Remote audio tracks this client is subscribed to
    pub audio_tracks: Vec<TrackSid>,
}

impl ParticipantInfo {
    pub fn new(sid: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            sid: SessionId(sid.into()),
            identity: identity.into(),
            audio_tracks: Vec::new(),
        }
    }

    pub fn has_media(&self) -> bool {
        !self.audio_tracks.is_empty()
    }
}

/// The provider's authoritative participant set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticipantSnapshot {
    /// `None` when the provider could not report the local participant
    pub local: Option<ParticipantInfo>,
    pub remotes: Vec<ParticipantInfo>,
}

impl ParticipantSnapshot {
    /// Every live session id, local included
    pub fn live_ids(&self) -> HashSet<SessionId> {
        self.local
            .iter()
            .chain(self.remotes.iter())
            .map(|p| p.sid.clone())
            .collect()
    }

    pub fn remote(&self, sid: &SessionId) -> Option<&ParticipantInfo> {
        self.remotes.iter().find(|p| &p.sid == sid)
    }

    pub fn contains(&self, sid: &SessionId) -> bool {
        self.local.as_ref().is_some_and(|p| &p.sid == sid) || self.remote(sid).is_some()
    }
}

/// A remote audio track delivered to this client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteAudioTrack {
    pub sid: TrackSid,
    pub participant: SessionId,
    pub identity: String,
}

/// Events emitted by a media session
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    Connected,
    Reconnecting,
    Reconnected,
    /// The relay dropped the session (never emitted for a local disconnect)
    Disconnected { reason: Option<String> },
    ParticipantJoined(ParticipantInfo),
    ParticipantLeft(ParticipantInfo),
    TrackSubscribed(RemoteAudioTrack),
    TrackUnsubscribed(RemoteAudioTrack),
    ActiveSpeakersChanged(Vec<SessionId>),
    MediaDeviceError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions {
    pub auto_subscribe: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self { auto_subscribe: true }
    }
}

/// Processed microphone audio ready to publish
///
/// The mute flag is shared with whoever publishes the track, so muting does
/// not touch the capture chain.
#[derive(Debug)]
pub struct LocalAudioTrack {
    pub name: String,
    pub frames: mpsc::Receiver<AudioFrame>,
    muted: Arc<AtomicBool>,
}

impl LocalAudioTrack {
    pub fn new(name: impl Into<String>, frames: mpsc::Receiver<AudioFrame>) -> Self {
        Self {
            name: name.into(),
            frames,
            muted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared transmit flag for this track
    pub fn mute_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.muted)
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }
}

/// Opens media sessions against a relay
#[async_trait::async_trait]
pub trait MediaProvider: Send + Sync {
    async fn connect(
        &self,
        endpoint: &str,
        credential: &Credential,
        options: ConnectOptions,
    ) -> Result<Box<dyn MediaSession>>;
}

/// One live membership in a channel
#[async_trait::async_trait]
pub trait MediaSession: Send + Sync {
    /// Take the event stream; `None` if it was already taken
    fn take_events(&mut self) -> Option<BoxStream<'static, ProviderEvent>>;

    /// The relay's current authoritative participant set
    async fn current_participants(&self) -> Result<ParticipantSnapshot>;

    /// This client's own participant entry
    fn local_participant(&self) -> ParticipantInfo;

    async fn publish_track(&self, track: LocalAudioTrack) -> Result<TrackSid>;

    async fn unpublish_track(&self, sid: &TrackSid) -> Result<()>;

    /// Route remote playback to an output device
    async fn set_output_device(&self, device_id: &str) -> Result<()>;

    /// Start playing a subscribed remote track at `volume`
    async fn attach_track(&self, sid: &TrackSid, volume: f32) -> Result<()>;

    /// Stop playing a remote track and release its playback sink
    async fn detach_track(&self, sid: &TrackSid) -> Result<()>;

    async fn set_track_volume(&self, sid: &TrackSid, volume: f32) -> Result<()>;

    /// Leave the channel
    async fn disconnect(&self) -> Result<()>;
}
