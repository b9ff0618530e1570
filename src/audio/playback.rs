use std::collections::HashMap;

use crate::provider::{SessionId, TrackSid};

/// A remote track attached for playback
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSink {
    pub track: TrackSid,
    pub participant: SessionId,
    pub identity: String,
    pub volume: f32,
}

/// Remote playback sinks owned by this client, keyed by track
///
/// Ownership is by session id; identity is carried only to apply the
/// per-identity volume.
#[derive(Debug, Default)]
pub struct RemotePlayback {
    sinks: HashMap<TrackSid, PlaybackSink>,
}

impl RemotePlayback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an attached sink; returns false if the track was already attached
    pub fn insert(&mut self, sink: PlaybackSink) -> bool {
        self.sinks.insert(sink.track.clone(), sink).is_none()
    }

    pub fn remove(&mut self, track: &TrackSid) -> Option<PlaybackSink> {
        self.sinks.remove(track)
    }

    /// Remove every sink owned by `participant`
    pub fn remove_participant(&mut self, participant: &SessionId) -> Vec<PlaybackSink> {
        let tracks: Vec<TrackSid> = self
            .sinks
            .values()
            .filter(|s| &s.participant == participant)
            .map(|s| s.track.clone())
            .collect();
        tracks.iter().filter_map(|t| self.sinks.remove(t)).collect()
    }

    pub fn has_tracks(&self, participant: &SessionId) -> bool {
        self.sinks.values().any(|s| &s.participant == participant)
    }

    /// Sinks whose participant shows `identity`; volume updated in place
    pub fn set_identity_volume(&mut self, identity: &str, volume: f32) -> Vec<TrackSid> {
        self.sinks
            .values_mut()
            .filter(|s| s.identity == identity)
            .map(|s| {
                s.volume = volume;
                s.track.clone()
            })
            .collect()
    }

    pub fn get(&self, track: &TrackSid) -> Option<&PlaybackSink> {
        self.sinks.get(track)
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn clear(&mut self) {
        self.sinks.clear();
    }
}
