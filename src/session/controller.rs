//! `SessionController` - the task that owns the connection, roster and audio pipeline.
//!
//! All state lives in one task. Commands from handles, provider events, the
//! roster heartbeat and the reconnect timer are handled one at a time from a
//! single `select!` loop, so no two connection attempts, roster passes or
//! pipeline rebuilds ever interleave. Provider events queue in their stream
//! while a pass is awaiting the relay and are drained in arrival order.

use chrono::{DateTime, Utc};
use futures::stream::{BoxStream, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::backoff::Backoff;
use super::channel::{channel_name, validate_channel};
use super::config::SessionConfig;
use super::handle::SessionControllerHandle;
use super::identity::{generated_identity, IdentityPrompt};
use super::messages::ControllerMessage;
use super::status::{ConnectionState, SessionStatus};
use crate::audio::{AudioHost, AudioPipeline, DeviceCatalog, PlaybackSink, RemotePlayback};
use crate::error::{chain, VoiceError};
use crate::notify::{NotificationDispatcher, OverlaySurface};
use crate::provider::{
    ConnectOptions, MediaProvider, MediaSession, ProviderEvent, RemoteAudioTrack, SessionId,
    TrackSid,
};
use crate::roster::{ParticipantSession, RosterEngine};
use crate::settings::{validate_identity, PreferenceStore, SettingsGateway, VolumeTable};
use crate::token::TokenIssuer;

/// Shortest heartbeat period; `interval` rejects zero
const MIN_HEARTBEAT: Duration = Duration::from_millis(1);

/// External collaborators the controller is built from
pub struct SessionDeps {
    pub tokens: Arc<dyn TokenIssuer>,
    pub provider: Arc<dyn MediaProvider>,
    pub audio: Arc<dyn AudioHost>,
    pub settings: Arc<dyn SettingsGateway>,
    pub identity_prompt: Arc<dyn IdentityPrompt>,
    pub overlay: Arc<dyn OverlaySurface>,
}

/// The live relay membership
struct Link {
    session: Box<dyn MediaSession>,
    channel_name: String,
}

struct PendingReconnect {
    due: Instant,
    attempt: u32,
}

/// A participant the provider says may be gone
struct Departure {
    sid: SessionId,
    /// Assume absent if the provider cannot be asked
    presumed_gone: bool,
}

pub struct SessionController {
    config: SessionConfig,
    backoff: Backoff,
    tokens: Arc<dyn TokenIssuer>,
    provider: Arc<dyn MediaProvider>,
    identity_prompt: Arc<dyn IdentityPrompt>,
    prefs: PreferenceStore,
    dispatcher: NotificationDispatcher,

    pipeline: AudioPipeline,
    roster: RosterEngine,
    playback: RemotePlayback,
    volumes: VolumeTable,

    identity: Option<String>,
    auto_connect: bool,
    channel: u32,
    output_device: Option<String>,

    state: ConnectionState,
    status_text: String,
    connected_at: Option<DateTime<Utc>>,
    link: Option<Link>,
    events: Option<BoxStream<'static, ProviderEvent>>,
    reconnect: Option<PendingReconnect>,
    /// Retry that yielded to a queued manual connect
    yielded_attempt: Option<u32>,

    connect_in_flight: Arc<AtomicBool>,
    status_tx: watch::Sender<SessionStatus>,
    roster_tx: watch::Sender<Vec<ParticipantSession>>,
}

impl SessionController {
    /// Load preferences, enumerate devices and start the controller task
    ///
    /// When the stored auto-connect flag is on, the first connect is
    /// scheduled after `startup_delay`.
    pub async fn spawn(config: SessionConfig, deps: SessionDeps) -> SessionControllerHandle {
        let prefs = PreferenceStore::new(deps.settings);
        let preferences = prefs.load().await;
        info!(
            "Preferences loaded: identity={:?}, gain={}%, auto_connect={}, {} peer volumes",
            preferences.username,
            preferences.mic_gain_percent,
            preferences.auto_connect,
            preferences.volumes.len()
        );

        let catalog = DeviceCatalog::new(Arc::clone(&deps.audio));
        if let Err(e) = catalog.refresh().await {
            warn!("Device enumeration failed: {}", chain(&e));
        }

        let channel = validate_channel(config.default_channel, config.channel_count).unwrap_or_else(|e| {
            warn!("{}; falling back to channel 1", e);
            1
        });

        let (sender, mailbox) = mpsc::channel(config.mailbox_capacity.max(1));
        let cancel = CancellationToken::new();
        let connect_in_flight = Arc::new(AtomicBool::new(false));

        let mut controller = Self {
            backoff: Backoff::new(config.reconnect_base, config.reconnect_max),
            tokens: deps.tokens,
            provider: deps.provider,
            identity_prompt: deps.identity_prompt,
            prefs,
            dispatcher: NotificationDispatcher::spawn(deps.overlay),
            pipeline: AudioPipeline::new(deps.audio, None, preferences.mic_gain_percent),
            roster: RosterEngine::new(),
            playback: RemotePlayback::new(),
            volumes: preferences.volumes,
            identity: preferences.username,
            auto_connect: preferences.auto_connect,
            channel,
            output_device: None,
            state: ConnectionState::Idle,
            status_text: "Idle".to_string(),
            connected_at: None,
            link: None,
            events: None,
            reconnect: None,
            yielded_attempt: None,
            connect_in_flight: Arc::clone(&connect_in_flight),
            status_tx: watch::channel(placeholder_status()).0,
            roster_tx: watch::channel(Vec::new()).0,
            config,
        };

        if controller.auto_connect {
            controller.reconnect = Some(PendingReconnect {
                due: Instant::now() + controller.config.startup_delay,
                attempt: 0,
            });
        }

        let status_rx = controller.status_tx.subscribe();
        let roster_rx = controller.roster_tx.subscribe();
        controller.publish_status();

        let task = tokio::spawn(controller.run(mailbox, cancel.clone()));

        SessionControllerHandle::new(
            sender,
            status_rx,
            roster_rx,
            connect_in_flight,
            catalog,
            cancel,
            task,
        )
    }

    async fn run(mut self, mut mailbox: mpsc::Receiver<ControllerMessage>, cancel: CancellationToken) {
        info!("Session controller started");

        let period = self.config.heartbeat_interval.max(MIN_HEARTBEAT);
        let mut heartbeat = tokio::time::interval(period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let retry_due = self.reconnect.as_ref().map(|r| r.due);
            let heartbeat_on = self.state == ConnectionState::Connected;

            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                message = mailbox.recv() => match message {
                    Some(message) => self.handle_message(message).await,
                    None => break,
                },

                event = next_event(&mut self.events) => self.handle_provider_event(event).await,

                _ = heartbeat.tick(), if heartbeat_on => self.reconcile(None, true).await,

                _ = sleep_until_due(retry_due), if retry_due.is_some() => self.fire_reconnect().await,
            }

            self.publish_status();
        }

        info!("Session controller stopping");
        self.disconnect(true).await;
        self.publish_status();
    }

    async fn handle_message(&mut self, message: ControllerMessage) {
        match message {
            ControllerMessage::Connect { respond_to } => {
                // A manual connect during backoff stands in for the pending retry
                let attempt = self
                    .yielded_attempt
                    .take()
                    .or_else(|| self.reconnect.as_ref().map(|r| r.attempt))
                    .unwrap_or(0);
                let result = self.connect(attempt).await;
                self.connect_in_flight.store(false, Ordering::SeqCst);
                let _ = respond_to.send(result);
            }
            ControllerMessage::Disconnect {
                stop_local_media,
                respond_to,
            } => {
                self.disconnect(stop_local_media).await;
                let _ = respond_to.send(());
            }
            ControllerMessage::SwitchChannel { channel, respond_to } => {
                let result = self.switch_channel(channel).await;
                let _ = respond_to.send(result);
            }
            ControllerMessage::SelectInputDevice {
                device_id,
                respond_to,
            } => {
                let result = self.select_input_device(device_id).await;
                let _ = respond_to.send(result);
            }
            ControllerMessage::SelectOutputDevice {
                device_id,
                respond_to,
            } => {
                self.select_output_device(device_id).await;
                let _ = respond_to.send(());
            }
            ControllerMessage::SetGain { percent, respond_to } => {
                let linear = self.set_gain(percent).await;
                let _ = respond_to.send(linear);
            }
            ControllerMessage::SetMuted { muted, respond_to } => {
                let _ = respond_to.send(self.set_muted(muted));
            }
            ControllerMessage::SetPeerVolume {
                identity,
                volume,
                respond_to,
            } => {
                let stored = self.set_peer_volume(&identity, volume).await;
                let _ = respond_to.send(stored);
            }
            ControllerMessage::GetVolumes { respond_to } => {
                let _ = respond_to.send(self.volumes.clone());
            }
            ControllerMessage::SetAutoConnect {
                enabled,
                respond_to,
            } => {
                self.set_auto_connect(enabled).await;
                let _ = respond_to.send(());
            }
            ControllerMessage::SetIdentity {
                identity,
                respond_to,
            } => {
                let result = self.set_identity(&identity).await;
                let _ = respond_to.send(result);
            }
        }
    }

    // ------------------------------------------------------------------
    // Connection lifecycle
    // ------------------------------------------------------------------

    /// One connection attempt; `attempt` is 0 for user-initiated connects
    async fn connect(&mut self, attempt: u32) -> Result<(), VoiceError> {
        if self.state == ConnectionState::Connecting {
            debug!("connect ignored (already connecting)");
            return Ok(());
        }
        if let Some(link) = &self.link {
            debug!("connect ignored (already in {})", link.channel_name);
            self.reconnect = None;
            return Ok(());
        }

        self.cancel_reconnect();
        self.set_state(ConnectionState::Connecting, "Generating token...");

        match self.open_session().await {
            Ok(identity) => {
                let room = self
                    .link
                    .as_ref()
                    .map(|l| l.channel_name.clone())
                    .unwrap_or_default();
                self.connected_at = Some(Utc::now());
                self.set_state(
                    ConnectionState::Connected,
                    format!("Connected as {} in room \"{}\"", identity, room),
                );
                Ok(())
            }
            Err(e) => {
                error!("Connect failed: {}", e);
                self.abandon_session().await;
                self.set_state(ConnectionState::Disconnected, format!("Error: {}", e));
                self.schedule_reconnect(attempt.saturating_add(1));
                Err(e)
            }
        }
    }

    async fn open_session(&mut self) -> Result<String, VoiceError> {
        let identity = self.resolve_identity().await?;
        let room = channel_name(self.channel);

        let credential = self
            .tokens
            .issue_token(&identity, &room)
            .await
            .map_err(|e| VoiceError::TokenAcquisitionFailed(chain(&e)))?;

        self.status_text = "Connecting...".to_string();
        self.publish_status();
        info!(
            "Connecting to {} as {} in room {}",
            self.config.endpoint, identity, room
        );

        let mut session = self
            .provider
            .connect(&self.config.endpoint, &credential, ConnectOptions { auto_subscribe: true })
            .await
            .map_err(|e| VoiceError::ConnectionFailed(chain(&e)))?;

        self.events = session.take_events();
        if self.events.is_none() {
            warn!("Media session has no event stream; roster relies on heartbeat only");
        }
        self.link = Some(Link {
            session,
            channel_name: room,
        });

        // Participants already in the channel form the baseline and are not announced
        self.reconcile(None, false).await;

        let Some(link) = self.link.as_ref() else {
            return Err(VoiceError::NotConnected);
        };
        self.pipeline.start(link.session.as_ref()).await?;

        if let Some(device) = &self.output_device {
            if let Err(e) = link.session.set_output_device(device).await {
                warn!("setOutputDevice failed: {}", chain(&e));
            }
        }

        Ok(identity)
    }

    async fn resolve_identity(&mut self) -> Result<String, VoiceError> {
        if let Some(identity) = &self.identity {
            return Ok(identity.clone());
        }

        let identity = match self.identity_prompt.prompt_identity().await {
            Some(answer) => validate_identity(&answer)?,
            None => generated_identity(),
        };

        if let Err(e) = self.prefs.save_username(&identity).await {
            warn!("{}", e);
        }
        info!("Using identity {}", identity);
        self.identity = Some(identity.clone());
        Ok(identity)
    }

    /// Clean up after a failed connect, releasing whatever was opened
    async fn abandon_session(&mut self) {
        self.events = None;
        let link = self.link.take();
        self.pipeline
            .teardown(link.as_ref().map(|l| l.session.as_ref()))
            .await;
        if let Some(link) = link {
            if let Err(e) = link.session.disconnect().await {
                debug!("Disconnect after failed connect: {}", chain(&e));
            }
        }
        self.clear_roster();
        self.connected_at = None;
    }

    async fn disconnect(&mut self, stop_local_media: bool) {
        self.cancel_reconnect();
        self.events = None;
        let link = self.link.take();

        if stop_local_media {
            self.pipeline
                .teardown(link.as_ref().map(|l| l.session.as_ref()))
                .await;
        } else {
            self.pipeline.detach_session();
        }

        if let Some(link) = link {
            info!("Leaving room {}", link.channel_name);
            if let Err(e) = link.session.disconnect().await {
                warn!("Provider disconnect failed: {}", chain(&e));
            }
        }

        self.clear_roster();
        self.connected_at = None;
        self.set_state(ConnectionState::Disconnected, "Disconnected");
    }

    async fn switch_channel(&mut self, channel: u32) -> Result<(), VoiceError> {
        let channel = validate_channel(channel, self.config.channel_count)?;
        let target = channel_name(channel);

        if self.link.is_none() {
            self.channel = channel;
            info!("Channel set to {}", target);
            self.publish_status();
            if self.auto_connect {
                return self.connect(0).await;
            }
            return Ok(());
        }

        if channel == self.channel {
            debug!("Already in {}", target);
            return Ok(());
        }

        self.status_text = format!("Switching to {}...", target);
        self.publish_status();

        self.disconnect(true).await;
        self.channel = channel;
        self.connect(0).await
    }

    /// The relay dropped us: release everything and start backing off
    async fn handle_unexpected_disconnect(&mut self, reason: Option<String>) {
        if self.link.is_none() {
            return;
        }
        warn!(
            "Disconnected by relay: {}",
            reason.as_deref().unwrap_or("no reason given")
        );

        // The relay already dropped our tracks; only local media needs releasing
        self.link = None;
        self.events = None;
        self.pipeline.teardown(None).await;
        self.clear_roster();
        self.connected_at = None;
        self.set_state(ConnectionState::Disconnected, "Disconnected");
        self.schedule_reconnect(1);
    }

    // ------------------------------------------------------------------
    // Reconnect backoff
    // ------------------------------------------------------------------

    fn schedule_reconnect(&mut self, attempt: u32) {
        if !self.auto_connect {
            debug!("Auto-connect off, not scheduling reconnect");
            return;
        }
        self.cancel_reconnect();

        let attempt = attempt.max(1);
        let delay = self.backoff.delay(attempt);
        let secs = (delay.as_millis() as f64 / 1000.0).round() as u64;

        self.status_text = format!("Reconnecting in {}s (attempt {})...", secs, attempt);
        info!("Scheduling reconnect in {}s (attempt {})", secs, attempt);

        self.reconnect = Some(PendingReconnect {
            due: Instant::now() + delay,
            attempt,
        });
    }

    fn cancel_reconnect(&mut self) {
        self.yielded_attempt = None;
        if let Some(pending) = self.reconnect.take() {
            debug!("Cancelled pending reconnect (attempt {})", pending.attempt);
        }
    }

    async fn fire_reconnect(&mut self) {
        let Some(pending) = self.reconnect.take() else {
            return;
        };
        if self.connect_in_flight.swap(true, Ordering::SeqCst) {
            debug!("Reconnect skipped, a connect request is already queued");
            self.yielded_attempt = Some(pending.attempt);
            return;
        }

        let result = self.connect(pending.attempt).await;
        self.connect_in_flight.store(false, Ordering::SeqCst);

        match result {
            Ok(()) => info!("Reconnected via backoff (attempt {})", pending.attempt),
            Err(e) => debug!("Reconnect attempt {} failed: {}", pending.attempt, e),
        }
    }

    // ------------------------------------------------------------------
    // Provider events and roster
    // ------------------------------------------------------------------

    async fn handle_provider_event(&mut self, event: Option<ProviderEvent>) {
        let Some(event) = event else {
            self.events = None;
            self.handle_unexpected_disconnect(Some("event stream closed".to_string()))
                .await;
            return;
        };

        match event {
            ProviderEvent::Connected => debug!("RoomEvent: Connected"),
            ProviderEvent::Reconnecting => {
                info!("RoomEvent: Reconnecting");
                self.set_state(ConnectionState::Reconnecting, "Reconnecting...");
            }
            ProviderEvent::Reconnected => {
                info!("RoomEvent: Reconnected");
                self.set_state(ConnectionState::Connected, "Connected");
                self.reconcile(None, true).await;
            }
            ProviderEvent::Disconnected { reason } => {
                self.handle_unexpected_disconnect(reason).await;
            }
            ProviderEvent::ParticipantJoined(info) => {
                debug!("RoomEvent: ParticipantJoined {} ({})", info.identity, info.sid);
                self.reconcile(None, true).await;
            }
            ProviderEvent::ParticipantLeft(info) => {
                debug!("RoomEvent: ParticipantLeft {} ({})", info.identity, info.sid);
                let departure = Departure {
                    sid: info.sid,
                    presumed_gone: true,
                };
                self.reconcile(Some(departure), true).await;
            }
            ProviderEvent::TrackSubscribed(track) => {
                debug!("RoomEvent: TrackSubscribed {} from {}", track.sid, track.identity);
                self.attach_remote(track).await;
                self.reconcile(None, true).await;
            }
            ProviderEvent::TrackUnsubscribed(track) => {
                debug!("RoomEvent: TrackUnsubscribed {}", track.sid);
                self.detach_remote(&track.sid).await;
                let departure = Departure {
                    sid: track.participant,
                    presumed_gone: false,
                };
                self.reconcile(Some(departure), true).await;
            }
            ProviderEvent::ActiveSpeakersChanged(speakers) => {
                if self.roster.set_active_speakers(speakers) {
                    self.publish_roster();
                }
                self.reconcile(None, true).await;
            }
            ProviderEvent::MediaDeviceError(message) => {
                warn!("RoomEvent: MediaDevicesError {}", message);
                self.status_text = format!("Media device error: {}", message);
            }
        }
    }

    /// One reconciliation pass, optionally checking a possible departure
    async fn reconcile(&mut self, departure: Option<Departure>, notify: bool) {
        let Some(link) = self.link.as_ref() else {
            return;
        };

        let (mut delta, snapshot) = self.roster.reconcile_with(link.session.as_ref()).await;

        if let Some(departure) = departure {
            let present = match &snapshot {
                Some(snapshot) => snapshot.contains(&departure.sid),
                None => !departure.presumed_gone,
            };
            let has_media = snapshot
                .as_ref()
                .and_then(|s| s.remote(&departure.sid))
                .is_some_and(|p| p.has_media());
            if let Some(entry) = self.roster.remove_departed(&departure.sid, present, has_media) {
                delta.removed.push(entry);
            }
        }

        // Release playback for everyone who left the roster
        for entry in &delta.removed {
            for sink in self.playback.remove_participant(&entry.session_id) {
                if let Err(e) = link.session.detach_track(&sink.track).await {
                    debug!("Detach error: {}", chain(&e));
                }
            }
        }

        if delta.is_empty() {
            return;
        }
        self.publish_roster();
        if notify {
            self.dispatcher.dispatch(&delta);
        }
    }

    async fn attach_remote(&mut self, track: RemoteAudioTrack) {
        let Some(link) = self.link.as_ref() else {
            return;
        };

        let identity = if track.identity.is_empty() {
            self.roster
                .get(&track.participant)
                .map(|p| p.identity.clone())
                .unwrap_or_default()
        } else {
            track.identity
        };
        let volume = self.volumes.get(&identity);

        if let Err(e) = link.session.attach_track(&track.sid, volume).await {
            warn!("Attach error for {}: {}", track.sid, chain(&e));
            return;
        }

        self.playback.insert(PlaybackSink {
            track: track.sid,
            participant: track.participant,
            identity,
            volume,
        });
    }

    async fn detach_remote(&mut self, track: &TrackSid) {
        let Some(link) = self.link.as_ref() else {
            return;
        };
        if self.playback.remove(track).is_some() {
            if let Err(e) = link.session.detach_track(track).await {
                warn!("Detach error for {}: {}", track, chain(&e));
            }
        }
    }

    fn clear_roster(&mut self) {
        self.roster.clear();
        self.playback.clear();
        self.publish_roster();
    }

    // ------------------------------------------------------------------
    // Devices and preferences
    // ------------------------------------------------------------------

    async fn select_input_device(&mut self, device_id: Option<String>) -> Result<(), VoiceError> {
        let session = self.link.as_ref().map(|l| l.session.as_ref());
        match self.pipeline.select_input_device(device_id, session).await {
            Ok(()) => {
                info!("Mic switched to {}", self.pipeline.input_device().unwrap_or("default"));
                self.publish_status();
                Ok(())
            }
            Err(e) => {
                error!("Mic switch failed: {}", e);
                self.status_text = format!("Error: {}", e);
                self.publish_status();
                Err(e)
            }
        }
    }

    async fn select_output_device(&mut self, device_id: String) {
        if let Some(link) = &self.link {
            match link.session.set_output_device(&device_id).await {
                Ok(()) => info!("Speaker switched to {}", device_id),
                Err(e) => error!("Speaker switch failed: {}", chain(&e)),
            }
        }
        self.output_device = Some(device_id);
        self.publish_status();
    }

    async fn set_gain(&mut self, percent: u32) -> f32 {
        let linear = self.pipeline.set_gain(percent);
        self.publish_status();
        if let Err(e) = self.prefs.save_mic_gain(percent).await {
            warn!("{}", e);
        }
        linear
    }

    fn set_muted(&mut self, muted: Option<bool>) -> Option<bool> {
        let target = muted.unwrap_or(!self.pipeline.is_muted());
        match self.pipeline.set_muted(target) {
            Some(muted) => {
                info!("Local mic {}", if muted { "muted" } else { "unmuted" });
                self.status_text = if muted { "Mic off" } else { "Mic on" }.to_string();
                self.publish_status();
                Some(muted)
            }
            None => {
                debug!("Mute requested but no local track");
                None
            }
        }
    }

    async fn set_peer_volume(&mut self, identity: &str, volume: f32) -> Option<f32> {
        let stored = self.volumes.set(identity, volume)?;
        if let Err(e) = self.prefs.save_volumes(&self.volumes).await {
            warn!("{}", e);
        }

        let tracks = self.playback.set_identity_volume(identity, stored);
        if let Some(link) = &self.link {
            for track in tracks {
                if let Err(e) = link.session.set_track_volume(&track, stored).await {
                    warn!("Volume change for {} failed: {}", track, chain(&e));
                }
            }
        }
        debug!("Volume for {} set to {}", identity, stored);
        Some(stored)
    }

    async fn set_auto_connect(&mut self, enabled: bool) {
        self.auto_connect = enabled;
        self.publish_status();
        if let Err(e) = self.prefs.save_auto_connect(enabled).await {
            warn!("{}", e);
        }

        if !enabled {
            self.cancel_reconnect();
            self.publish_status();
            return;
        }
        if self.link.is_none() {
            // Connect right away when switched on while offline
            if let Err(e) = self.connect(0).await {
                debug!("Auto-connect attempt failed: {}", e);
            }
        }
    }

    async fn set_identity(&mut self, identity: &str) -> Result<String, VoiceError> {
        let identity = validate_identity(identity)?;
        if let Err(e) = self.prefs.save_username(&identity).await {
            warn!("{}", e);
        }
        self.identity = Some(identity.clone());
        self.publish_status();
        Ok(identity)
    }

    // ------------------------------------------------------------------
    // Status
    // ------------------------------------------------------------------

    fn set_state(&mut self, state: ConnectionState, text: impl Into<String>) {
        if self.state != state {
            info!("Connection state {:?} -> {:?}", self.state, state);
        }
        self.state = state;
        self.status_text = text.into();
        self.publish_status();
    }

    fn publish_status(&self) {
        self.status_tx.send_replace(SessionStatus {
            state: self.state,
            status_text: self.status_text.clone(),
            channel: self.channel,
            channel_name: channel_name(self.channel),
            identity: self.identity.clone(),
            connected_at: self.connected_at,
            reconnect_attempt: self
                .reconnect
                .as_ref()
                .map(|r| r.attempt)
                .filter(|attempt| *attempt > 0),
            input_device: self.pipeline.input_device().map(str::to_string),
            output_device: self.output_device.clone(),
            mic_gain_percent: self.pipeline.gain_percent(),
            muted: self.pipeline.is_muted(),
            auto_connect: self.auto_connect,
        });
    }

    fn publish_roster(&self) {
        self.roster_tx.send_replace(self.roster.snapshot());
    }
}

fn placeholder_status() -> SessionStatus {
    SessionStatus {
        state: ConnectionState::Idle,
        status_text: String::new(),
        channel: 1,
        channel_name: channel_name(1),
        identity: None,
        connected_at: None,
        reconnect_attempt: None,
        input_device: None,
        output_device: None,
        mic_gain_percent: 100,
        muted: false,
        auto_connect: false,
    }
}

async fn next_event(
    events: &mut Option<BoxStream<'static, ProviderEvent>>,
) -> Option<ProviderEvent> {
    match events.as_mut() {
        Some(events) => events.next().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until_due(due: Option<Instant>) {
    match due {
        Some(due) => tokio::time::sleep_until(due).await,
        None => std::future::pending().await,
    }
}
