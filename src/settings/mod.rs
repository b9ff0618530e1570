//! Durable preferences
//!
//! The core never persists anything itself; it reads and writes through the
//! [`SettingsGateway`] key/value interface:
//! - `username` - display identity (min length 2)
//! - `micGainPercent` - microphone gain in percent (default 100)
//! - `autoConnect` - connect at startup and reconnect on drop (default false)
//! - `volumes` - per-identity playback volume in [0, 1]

mod gateway;
mod preferences;

pub use gateway::{JsonFileSettings, MemorySettings, SettingsGateway};
pub use preferences::{
    validate_identity, PreferenceStore, Preferences, VolumeTable, KEY_AUTO_CONNECT,
    KEY_MIC_GAIN_PERCENT, KEY_USERNAME, KEY_VOLUMES, MIN_IDENTITY_LEN,
};
