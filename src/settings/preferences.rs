use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::gateway::SettingsGateway;
use crate::error::{chain, VoiceError};

pub const KEY_USERNAME: &str = "username";
pub const KEY_MIC_GAIN_PERCENT: &str = "micGainPercent";
pub const KEY_AUTO_CONNECT: &str = "autoConnect";
pub const KEY_VOLUMES: &str = "volumes";

pub const MIN_IDENTITY_LEN: usize = 2;

const DEFAULT_MIC_GAIN_PERCENT: u32 = 100;
const DEFAULT_PEER_VOLUME: f32 = 1.0;

/// Per-identity playback volume (linear, in [0, 1])
///
/// Keyed by display identity so a peer's volume survives reconnects. Two
/// peers that share a display name therefore share one volume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VolumeTable(BTreeMap<String, f32>);

impl VolumeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Volume for `identity`, 1.0 if never set
    pub fn get(&self, identity: &str) -> f32 {
        self.0.get(identity).copied().unwrap_or(DEFAULT_PEER_VOLUME)
    }

    /// Store a volume clamped to [0, 1]; non-finite input is ignored.
    /// Returns the value actually stored.
    pub fn set(&mut self, identity: &str, volume: f32) -> Option<f32> {
        if !volume.is_finite() {
            return None;
        }
        let volume = volume.clamp(0.0, 1.0);
        self.0.insert(identity.to_string(), volume);
        Some(volume)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Preferences as read at startup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preferences {
    pub username: Option<String>,
    pub mic_gain_percent: u32,
    pub auto_connect: bool,
    pub volumes: VolumeTable,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            username: None,
            mic_gain_percent: DEFAULT_MIC_GAIN_PERCENT,
            auto_connect: false,
            volumes: VolumeTable::new(),
        }
    }
}

/// Trim and check a display identity
pub fn validate_identity(raw: &str) -> Result<String, VoiceError> {
    let trimmed = raw.trim();
    if trimmed.chars().count() < MIN_IDENTITY_LEN {
        return Err(VoiceError::InvalidIdentity(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Typed access to the settings gateway
///
/// Reads never fail: an unreadable or malformed value falls back to its
/// default. Writes report `SettingsIoFailed` so the caller can log it.
#[derive(Clone)]
pub struct PreferenceStore {
    gateway: Arc<dyn SettingsGateway>,
}

impl PreferenceStore {
    pub fn new(gateway: Arc<dyn SettingsGateway>) -> Self {
        Self { gateway }
    }

    pub async fn load(&self) -> Preferences {
        let defaults = Preferences::default();

        let username = self
            .read(KEY_USERNAME)
            .await
            .and_then(|v| v.as_str().map(str::to_string))
            .and_then(|name| validate_identity(&name).ok());

        let mic_gain_percent = self
            .read(KEY_MIC_GAIN_PERCENT)
            .await
            .and_then(|v| v.as_f64())
            .filter(|pct| pct.is_finite())
            .map(|pct| pct.max(0.0).round() as u32)
            .unwrap_or(defaults.mic_gain_percent);

        let auto_connect = self
            .read(KEY_AUTO_CONNECT)
            .await
            .and_then(|v| v.as_bool())
            .unwrap_or(defaults.auto_connect);

        let volumes = match self.read(KEY_VOLUMES).await {
            Some(raw) => match serde_json::from_value::<VolumeTable>(raw) {
                Ok(table) => sanitize(table),
                Err(e) => {
                    warn!("Ignoring malformed volume table: {}", e);
                    VolumeTable::new()
                }
            },
            None => VolumeTable::new(),
        };

        Preferences {
            username,
            mic_gain_percent,
            auto_connect,
            volumes,
        }
    }

    pub async fn save_username(&self, username: &str) -> Result<(), VoiceError> {
        self.write(KEY_USERNAME, Value::from(username)).await
    }

    pub async fn save_mic_gain(&self, percent: u32) -> Result<(), VoiceError> {
        self.write(KEY_MIC_GAIN_PERCENT, Value::from(percent)).await
    }

    pub async fn save_auto_connect(&self, on: bool) -> Result<(), VoiceError> {
        self.write(KEY_AUTO_CONNECT, Value::from(on)).await
    }

    pub async fn save_volumes(&self, volumes: &VolumeTable) -> Result<(), VoiceError> {
        let value = serde_json::to_value(volumes)
            .map_err(|e| VoiceError::SettingsIoFailed(e.to_string()))?;
        self.write(KEY_VOLUMES, value).await
    }

    async fn read(&self, key: &str) -> Option<Value> {
        match self.gateway.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to read setting {}: {}", key, chain(&e));
                None
            }
        }
    }

    async fn write(&self, key: &str, value: Value) -> Result<(), VoiceError> {
        debug!("Saving setting {}", key);
        self.gateway
            .set(key, value)
            .await
            .map_err(|e| VoiceError::SettingsIoFailed(format!("{}: {}", key, chain(&e))))
    }
}

// Drop entries that cannot be volumes (negative, > 1, NaN) by re-clamping.
fn sanitize(table: VolumeTable) -> VolumeTable {
    let mut clean = VolumeTable::new();
    for (identity, volume) in table.iter() {
        clean.set(identity, volume);
    }
    clean
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_defaults_to_full() {
        let table = VolumeTable::new();
        assert_eq!(table.get("Nova"), 1.0);
    }

    #[test]
    fn test_volume_is_clamped() {
        let mut table = VolumeTable::new();
        assert_eq!(table.set("Nova", 1.7), Some(1.0));
        assert_eq!(table.set("Orion", -0.2), Some(0.0));
        assert_eq!(table.set("Vega", f32::NAN), None);
        assert_eq!(table.get("Nova"), 1.0);
        assert_eq!(table.get("Orion"), 0.0);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_identity_validation() {
        assert_eq!(validate_identity("  Nova ").unwrap(), "Nova");
        assert!(validate_identity("N").is_err());
        assert!(validate_identity("   ").is_err());
    }
}
