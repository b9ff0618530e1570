pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod nats;
pub mod notify;
pub mod provider;
pub mod roster;
pub mod session;
pub mod settings;
pub mod token;

pub use audio::{
    AudioDevice, AudioFrame, AudioHost, AudioPipeline, CaptureConstraints, CaptureStream,
    DeviceCatalog, DeviceKind, DeviceList, SyntheticHost,
};
pub use config::Config;
pub use error::VoiceError;
pub use http::{create_router, AppState};
pub use nats::{NatsOverlay, OverlayMessage};
pub use notify::{LogOverlay, NotificationDispatcher, OverlaySurface, PresenceEvent, PresenceVariant};
pub use provider::{LoopbackRelay, MediaProvider, MediaSession, ProviderEvent, SessionId, TrackSid};
pub use roster::{ParticipantSession, RosterDelta, RosterEngine};
pub use session::{
    ConnectionState, SessionConfig, SessionController, SessionControllerHandle, SessionDeps,
    SessionStatus,
};
pub use settings::{JsonFileSettings, MemorySettings, PreferenceStore, SettingsGateway, VolumeTable};
pub use token::{Credential, DevTokenIssuer, TokenIssuer};
