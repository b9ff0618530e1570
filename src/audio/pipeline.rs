use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::backend::{AudioHost, CaptureConstraints, CaptureStream};
use super::gain::{percent_to_linear, GainStage};
use crate::error::{chain, VoiceError};
use crate::provider::{LocalAudioTrack, MediaSession, TrackSid};

/// Frames buffered between the gain stage and the published track
const PROCESSED_BUFFER: usize = 32;

const TRACK_NAME: &str = "microphone";

/// Capture stream plus the task that runs it through the gain stage
struct CaptureChain {
    capture: Box<dyn CaptureStream>,
    processor: JoinHandle<()>,
}

struct PublishedTrack {
    sid: TrackSid,
    muted: Arc<AtomicBool>,
}

/// Owns the local capture -> gain -> publish chain
///
/// Invariants:
/// - at most one capture chain is open
/// - at most one track is published; the old one is unpublished before a
///   new one is offered to the relay
/// - a failed device acquisition leaves the running chain untouched
pub struct AudioPipeline {
    host: Arc<dyn AudioHost>,
    input_device: Option<String>,
    gain_percent: u32,
    gain: GainStage,
    chain: Option<CaptureChain>,
    published: Option<PublishedTrack>,
    muted: bool,
}

impl AudioPipeline {
    pub fn new(host: Arc<dyn AudioHost>, input_device: Option<String>, gain_percent: u32) -> Self {
        Self {
            host,
            input_device,
            gain_percent,
            gain: GainStage::new(percent_to_linear(gain_percent as f64)),
            chain: None,
            published: None,
            muted: false,
        }
    }

    pub fn input_device(&self) -> Option<&str> {
        self.input_device.as_deref()
    }

    pub fn gain_percent(&self) -> u32 {
        self.gain_percent
    }

    pub fn linear_gain(&self) -> f32 {
        self.gain.linear()
    }

    /// Whether a capture chain is open
    pub fn is_active(&self) -> bool {
        self.chain.is_some()
    }

    pub fn published_track(&self) -> Option<&TrackSid> {
        self.published.as_ref().map(|p| &p.sid)
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Switch microphones
    ///
    /// Without a session only the selection is stored. With one, the new
    /// device is opened first; if that fails the current chain keeps
    /// running and the selection is unchanged.
    pub async fn select_input_device(
        &mut self,
        device_id: Option<String>,
        session: Option<&dyn MediaSession>,
    ) -> Result<(), VoiceError> {
        match session {
            None => {
                self.input_device = device_id;
                Ok(())
            }
            Some(session) => self.rebuild(session, device_id).await,
        }
    }

    /// Set the gain stage from a slider percentage; returns the linear factor
    ///
    /// Applied to the running chain immediately, no device re-acquisition.
    pub fn set_gain(&mut self, percent: u32) -> f32 {
        self.gain_percent = percent;
        self.gain.set_linear(percent_to_linear(percent as f64));
        debug!("Mic gain set to {}% (linear {})", percent, self.gain.linear());
        self.gain.linear()
    }

    /// Build the chain for the current selection and publish it
    pub async fn start(&mut self, session: &dyn MediaSession) -> Result<(), VoiceError> {
        let device_id = self.input_device.clone();
        self.rebuild(session, device_id).await
    }

    async fn rebuild(
        &mut self,
        session: &dyn MediaSession,
        device_id: Option<String>,
    ) -> Result<(), VoiceError> {
        let constraints = CaptureConstraints::voice(device_id.clone());

        let mut capture = self
            .host
            .open_capture(&constraints)
            .await
            .map_err(|e| VoiceError::DeviceAcquisitionFailed(chain(&e)))?;

        let frames = match capture.start().await {
            Ok(frames) => frames,
            Err(e) => {
                if let Err(stop_err) = capture.stop().await {
                    warn!("Failed to release {}: {}", capture.device_id(), chain(&stop_err));
                }
                return Err(VoiceError::DeviceAcquisitionFailed(chain(&e)));
            }
        };

        // New device is live; retire the previous chain before wiring this one
        self.stop_chain().await;

        let (processor, processed) = self.gain.spawn(frames, PROCESSED_BUFFER);
        info!("Capture chain built on {}", capture.device_id());
        self.chain = Some(CaptureChain { capture, processor });
        self.input_device = device_id;

        let track = LocalAudioTrack::new(TRACK_NAME, processed);
        if let Err(e) = self.publish(session, track).await {
            self.stop_chain().await;
            return Err(e);
        }
        Ok(())
    }

    /// Publish `track`, unpublishing any previous track first
    pub async fn publish(
        &mut self,
        session: &dyn MediaSession,
        track: LocalAudioTrack,
    ) -> Result<TrackSid, VoiceError> {
        self.unpublish(session).await;

        let muted = track.mute_flag();
        muted.store(self.muted, Ordering::SeqCst);

        let sid = session
            .publish_track(track)
            .await
            .map_err(|e| VoiceError::PublishFailed(chain(&e)))?;

        info!("Published processed mic {} (gain linear = {})", sid, self.gain.linear());
        self.published = Some(PublishedTrack {
            sid: sid.clone(),
            muted,
        });
        Ok(sid)
    }

    async fn unpublish(&mut self, session: &dyn MediaSession) {
        if let Some(track) = self.published.take() {
            if let Err(e) = session.unpublish_track(&track.sid).await {
                warn!("Unpublish of old track {} failed: {}", track.sid, chain(&e));
            }
        }
    }

    /// Toggle the published track's transmit state
    ///
    /// Returns the new state, or `None` when nothing is published.
    pub fn set_muted(&mut self, muted: bool) -> Option<bool> {
        let track = self.published.as_ref()?;
        track.muted.store(muted, Ordering::SeqCst);
        self.muted = muted;
        Some(muted)
    }

    /// Forget the published track after the relay session is gone
    pub fn detach_session(&mut self) {
        self.published = None;
    }

    /// Release everything: unpublish (when a session is given), stop
    /// capture and the processing task. Safe to call repeatedly.
    pub async fn teardown(&mut self, session: Option<&dyn MediaSession>) {
        match session {
            Some(session) => self.unpublish(session).await,
            None => self.published = None,
        }
        if self.stop_chain().await {
            info!("Audio pipeline torn down");
        }
    }

    async fn stop_chain(&mut self) -> bool {
        let Some(mut old) = self.chain.take() else {
            return false;
        };
        old.processor.abort();
        if let Err(e) = old.capture.stop().await {
            warn!("Failed to stop capture on {}: {}", old.capture.device_id(), chain(&e));
        }
        true
    }
}
