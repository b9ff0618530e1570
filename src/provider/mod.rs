//! Real-time media provider boundary
//!
//! The media transport itself belongs to an external SFU client. This
//! module defines the typed surface the session core drives:
//! - `MediaProvider::connect` opens a session for one credential
//! - `MediaSession` exposes the event stream, the authoritative participant
//!   set, track publishing and playback control
//!
//! `LoopbackRelay` is an in-process implementation used by the demo binary
//! and the test suite.

mod loopback;
mod types;

pub use loopback::LoopbackRelay;
pub use types::{
    ConnectOptions, LocalAudioTrack, MediaProvider, MediaSession, ParticipantInfo,
    ParticipantSnapshot, ProviderEvent, RemoteAudioTrack, SessionId, TrackSid,
};
