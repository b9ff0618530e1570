use anyhow::{bail, Context, Result};
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::types::{
    ConnectOptions, LocalAudioTrack, MediaProvider, MediaSession, ParticipantInfo,
    ParticipantSnapshot, ProviderEvent, RemoteAudioTrack, SessionId, TrackSid,
};
use crate::token::{decode_dev_token, Credential};

/// In-process relay
///
/// Holds one local membership at a time plus a set of simulated remote
/// participants per channel. Every call is counted so callers can observe
/// exactly what the session core asked the relay to do.
#[derive(Clone, Default)]
pub struct LoopbackRelay {
    inner: Arc<Mutex<RelayState>>,
}

#[derive(Default)]
struct RelayState {
    epoch: u64,
    room: Option<Room>,
    remotes: BTreeMap<String, BTreeMap<SessionId, ParticipantInfo>>,
    connect_attempts: usize,
    pending_connect_failures: usize,
    fail_publish: bool,
    fail_queries: bool,
    tokens: Vec<String>,
    channels: Vec<String>,
    sessions_closed: usize,
    sessions_dropped: usize,
    overlapping_sessions: usize,
    publish_count: usize,
    unpublish_count: usize,
    peak_published: usize,
    output_device: Option<String>,
    frames_received: Arc<AtomicU64>,
}

struct Room {
    epoch: u64,
    channel: String,
    local: ParticipantInfo,
    events: mpsc::UnboundedSender<ProviderEvent>,
    published: HashMap<TrackSid, PublishedTrack>,
    attached: HashMap<TrackSid, f32>,
}

struct PublishedTrack {
    muted: Arc<AtomicBool>,
    drain: JoinHandle<()>,
}

impl Room {
    fn emit(&self, event: ProviderEvent) {
        if self.events.send(event).is_err() {
            debug!("Loopback session {} has no event listener", self.epoch);
        }
    }

    fn close(&mut self) {
        for (_, track) in self.published.drain() {
            track.drain.abort();
        }
        self.attached.clear();
    }
}

fn remote_track(info: &ParticipantInfo) -> Option<RemoteAudioTrack> {
    info.audio_tracks.first().map(|sid| RemoteAudioTrack {
        sid: sid.clone(),
        participant: info.sid.clone(),
        identity: info.identity.clone(),
    })
}

impl LoopbackRelay {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RelayState> {
        // A panic while holding the lock leaves counters that are still usable.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a remote participant (with one audio track) to `channel`
    pub fn add_remote(&self, channel: &str, sid: &str, identity: &str) {
        let mut info = ParticipantInfo::new(sid, identity);
        info.audio_tracks.push(TrackSid(format!("TR_{}", sid)));

        let mut state = self.state();
        state
            .remotes
            .entry(channel.to_string())
            .or_default()
            .insert(info.sid.clone(), info.clone());

        if let Some(room) = state.room.as_ref().filter(|r| r.channel == channel) {
            room.emit(ProviderEvent::ParticipantJoined(info.clone()));
            if let Some(track) = remote_track(&info) {
                room.emit(ProviderEvent::TrackSubscribed(track));
            }
        }
    }

    /// Remove a remote participant, emitting unsubscribe and leave events
    pub fn remove_remote(&self, channel: &str, sid: &str) {
        let mut state = self.state();
        let removed = state
            .remotes
            .get_mut(channel)
            .and_then(|members| members.remove(&SessionId::from(sid)));

        if let (Some(info), Some(room)) = (removed, state.room.as_ref()) {
            if room.channel == channel {
                if let Some(track) = remote_track(&info) {
                    room.emit(ProviderEvent::TrackUnsubscribed(track));
                }
                room.emit(ProviderEvent::ParticipantLeft(info));
            }
        }
    }

    /// Remove a remote participant without telling anyone (a lost event)
    pub fn remove_remote_silently(&self, channel: &str, sid: &str) {
        let mut state = self.state();
        if let Some(members) = state.remotes.get_mut(channel) {
            members.remove(&SessionId::from(sid));
        }
    }

    /// Inject a raw event into the live session
    pub fn emit(&self, event: ProviderEvent) {
        if let Some(room) = self.state().room.as_ref() {
            room.emit(event);
        }
    }

    pub fn set_active_speakers(&self, sids: &[&str]) {
        let speakers = sids.iter().map(|s| SessionId::from(*s)).collect();
        self.emit(ProviderEvent::ActiveSpeakersChanged(speakers));
    }

    /// Drop the live session from the relay side
    pub fn drop_connection(&self, reason: &str) {
        let mut state = self.state();
        if let Some(mut room) = state.room.take() {
            info!("Loopback relay dropping session {}: {}", room.epoch, reason);
            room.emit(ProviderEvent::Disconnected {
                reason: Some(reason.to_string()),
            });
            room.close();
            state.sessions_dropped += 1;
        }
    }

    pub fn fail_next_connects(&self, count: usize) {
        self.state().pending_connect_failures = count;
    }

    pub fn fail_publishes(&self, fail: bool) {
        self.state().fail_publish = fail;
    }

    pub fn fail_participant_queries(&self, fail: bool) {
        self.state().fail_queries = fail;
    }

    pub fn connect_attempts(&self) -> usize {
        self.state().connect_attempts
    }

    /// Every token presented to `connect`, in order
    pub fn tokens(&self) -> Vec<String> {
        self.state().tokens.clone()
    }

    /// Channel of every successful connect, in order
    pub fn channels(&self) -> Vec<String> {
        self.state().channels.clone()
    }

    pub fn active_channel(&self) -> Option<String> {
        self.state().room.as_ref().map(|r| r.channel.clone())
    }

    pub fn is_connected(&self) -> bool {
        self.state().room.is_some()
    }

    /// Sessions closed by the client
    pub fn sessions_closed(&self) -> usize {
        self.state().sessions_closed
    }

    /// Sessions dropped by the relay
    pub fn sessions_dropped(&self) -> usize {
        self.state().sessions_dropped
    }

    /// Connects that arrived while another membership was still open
    pub fn overlapping_sessions(&self) -> usize {
        self.state().overlapping_sessions
    }

    pub fn publish_count(&self) -> usize {
        self.state().publish_count
    }

    pub fn unpublish_count(&self) -> usize {
        self.state().unpublish_count
    }

    pub fn published_now(&self) -> usize {
        self.state().room.as_ref().map_or(0, |r| r.published.len())
    }

    /// Highest number of simultaneously published local tracks ever seen
    pub fn peak_published(&self) -> usize {
        self.state().peak_published
    }

    pub fn frames_received(&self) -> u64 {
        self.state().frames_received.load(Ordering::Relaxed)
    }

    pub fn output_device(&self) -> Option<String> {
        self.state().output_device.clone()
    }

    pub fn attached_volume(&self, track: &str) -> Option<f32> {
        let state = self.state();
        state
            .room
            .as_ref()
            .and_then(|r| r.attached.get(&TrackSid::from(track)).copied())
    }

    pub fn attached_count(&self) -> usize {
        self.state().room.as_ref().map_or(0, |r| r.attached.len())
    }

    /// Transmit state of the published local track, if any
    pub fn local_muted(&self) -> Option<bool> {
        let state = self.state();
        let room = state.room.as_ref()?;
        room.published
            .values()
            .next()
            .map(|t| t.muted.load(Ordering::SeqCst))
    }
}

#[async_trait::async_trait]
impl MediaProvider for LoopbackRelay {
    async fn connect(
        &self,
        endpoint: &str,
        credential: &Credential,
        options: ConnectOptions,
    ) -> Result<Box<dyn MediaSession>> {
        let mut state = self.state();
        state.connect_attempts += 1;
        state.tokens.push(credential.token.clone());

        if state.pending_connect_failures > 0 {
            state.pending_connect_failures -= 1;
            bail!("relay at {} unreachable", endpoint);
        }

        let grant = decode_dev_token(&credential.token).context("relay rejected credential")?;
        if grant.room != credential.channel {
            bail!("credential is not valid for {}", credential.channel);
        }

        if let Some(mut previous) = state.room.take() {
            warn!(
                "Loopback relay: new session while session {} still open",
                previous.epoch
            );
            previous.close();
            state.overlapping_sessions += 1;
        }

        state.epoch += 1;
        let epoch = state.epoch;
        let local = ParticipantInfo::new(
            format!("PA_{}", &uuid::Uuid::new_v4().simple().to_string()[..12]),
            grant.identity,
        );

        let (tx, rx) = mpsc::unbounded_channel();
        let room = Room {
            epoch,
            channel: grant.room.clone(),
            local: local.clone(),
            events: tx,
            published: HashMap::new(),
            attached: HashMap::new(),
        };

        room.emit(ProviderEvent::Connected);
        if options.auto_subscribe {
            if let Some(members) = state.remotes.get(&grant.room) {
                for info in members.values() {
                    if let Some(track) = remote_track(info) {
                        room.emit(ProviderEvent::TrackSubscribed(track));
                    }
                }
            }
        }

        state.room = Some(room);
        state.channels.push(grant.room.clone());
        info!("Loopback relay: {} joined {} (session {})", local.identity, grant.room, epoch);

        let events = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })
        .boxed();

        Ok(Box::new(LoopbackSession {
            relay: self.clone(),
            epoch,
            local,
            events: Mutex::new(Some(events)),
        }))
    }
}

struct LoopbackSession {
    relay: LoopbackRelay,
    epoch: u64,
    local: ParticipantInfo,
    events: Mutex<Option<BoxStream<'static, ProviderEvent>>>,
}

impl LoopbackSession {
    fn with_room<T>(&self, f: impl FnOnce(&mut RelayState) -> Result<T>) -> Result<T> {
        let mut state = self.relay.state();
        let open = matches!(state.room.as_ref(), Some(room) if room.epoch == self.epoch);
        if !open {
            bail!("session {} is closed", self.epoch);
        }
        f(&mut *state)
    }
}

fn room_mut(state: &mut RelayState) -> Result<&mut Room> {
    state.room.as_mut().context("session is closed")
}

#[async_trait::async_trait]
impl MediaSession for LoopbackSession {
    fn take_events(&mut self) -> Option<BoxStream<'static, ProviderEvent>> {
        self.events
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    async fn current_participants(&self) -> Result<ParticipantSnapshot> {
        self.with_room(|state| {
            if state.fail_queries {
                bail!("participant query timed out");
            }
            let room = room_mut(state)?;
            let channel = room.channel.clone();
            let local = room.local.clone();
            let remotes = state
                .remotes
                .get(&channel)
                .map(|members| members.values().cloned().collect())
                .unwrap_or_default();
            Ok(ParticipantSnapshot {
                local: Some(local),
                remotes,
            })
        })
    }

    fn local_participant(&self) -> ParticipantInfo {
        self.local.clone()
    }

    async fn publish_track(&self, track: LocalAudioTrack) -> Result<TrackSid> {
        self.with_room(|state| {
            if state.fail_publish {
                bail!("relay refused track {}", track.name);
            }

            let counter = Arc::clone(&state.frames_received);
            let muted = track.mute_flag();
            let mut frames = track.frames;
            let drain = tokio::spawn(async move {
                while frames.recv().await.is_some() {
                    counter.fetch_add(1, Ordering::Relaxed);
                }
            });

            let sid = TrackSid(format!("TR_{}", &uuid::Uuid::new_v4().simple().to_string()[..12]));
            let room = room_mut(state)?;
            room.published.insert(sid.clone(), PublishedTrack { muted, drain });
            let published = room.published.len();

            state.publish_count += 1;
            state.peak_published = state.peak_published.max(published);
            Ok(sid)
        })
    }

    async fn unpublish_track(&self, sid: &TrackSid) -> Result<()> {
        self.with_room(|state| {
            let track = room_mut(state)?
                .published
                .remove(sid)
                .with_context(|| format!("track {} is not published", sid))?;
            track.drain.abort();
            state.unpublish_count += 1;
            Ok(())
        })
    }

    async fn set_output_device(&self, device_id: &str) -> Result<()> {
        self.with_room(|state| {
            state.output_device = Some(device_id.to_string());
            Ok(())
        })
    }

    async fn attach_track(&self, sid: &TrackSid, volume: f32) -> Result<()> {
        self.with_room(|state| {
            room_mut(state)?.attached.insert(sid.clone(), volume);
            Ok(())
        })
    }

    async fn detach_track(&self, sid: &TrackSid) -> Result<()> {
        self.with_room(|state| {
            room_mut(state)?.attached.remove(sid);
            Ok(())
        })
    }

    async fn set_track_volume(&self, sid: &TrackSid, volume: f32) -> Result<()> {
        self.with_room(|state| {
            let room = room_mut(state)?;
            match room.attached.get_mut(sid) {
                Some(v) => {
                    *v = volume;
                    Ok(())
                }
                None => bail!("track {} is not attached", sid),
            }
        })
    }

    async fn disconnect(&self) -> Result<()> {
        let mut state = self.relay.state();
        match state.room.take() {
            Some(mut room) if room.epoch == self.epoch => {
                room.close();
                state.sessions_closed += 1;
                info!("Loopback relay: session {} closed", self.epoch);
                Ok(())
            }
            other => {
                state.room = other;
                bail!("session {} is already closed", self.epoch)
            }
        }
    }
}
