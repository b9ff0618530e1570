use anyhow::{bail, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::session::SessionConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub relay: RelayConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub roster: RosterConfig,
    pub settings: SettingsConfig,
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub token: TokenConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct RelayConfig {
    pub endpoint: String,
}

#[derive(Debug, Deserialize)]
pub struct ChannelsConfig {
    pub count: u32,
    pub default: u32,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self { count: 8, default: 1 }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReconnectConfig {
    pub base_ms: u64,
    pub max_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_ms: 1_000,
            max_ms: 30_000,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RosterConfig {
    pub heartbeat_ms: u64,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self { heartbeat_ms: 1_000 }
    }
}

#[derive(Debug, Deserialize)]
pub struct SettingsConfig {
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct OverlayConfig {
    pub nats_url: String,
    pub subject: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenConfig {
    pub ttl_secs: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self { ttl_secs: 3600 }
    }
}

impl Config {
    /// Load configuration from `path` (any format the `config` crate
    /// recognises), with `VOICE_`-prefixed environment overrides
    /// (e.g. `VOICE_RELAY__ENDPOINT`).
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("VOICE").separator("__"))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would stall or spin the session controller.
    pub fn validate(&self) -> Result<()> {
        if self.roster.heartbeat_ms == 0 {
            bail!("roster.heartbeat_ms must be greater than zero");
        }
        if self.reconnect.base_ms == 0 {
            bail!("reconnect.base_ms must be greater than zero");
        }
        if self.reconnect.max_ms < self.reconnect.base_ms {
            bail!(
                "reconnect.max_ms ({}) must not be below reconnect.base_ms ({})",
                self.reconnect.max_ms,
                self.reconnect.base_ms
            );
        }
        if self.channels.count == 0 {
            bail!("channels.count must be at least 1");
        }
        Ok(())
    }

    /// Settings file path with `~` and environment variables expanded.
    pub fn settings_path(&self) -> Result<PathBuf> {
        let expanded = shellexpand::full(&self.settings.path)?;
        Ok(PathBuf::from(expanded.as_ref()))
    }

    /// Runtime parameters for the session controller.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            endpoint: self.relay.endpoint.clone(),
            channel_count: self.channels.count,
            default_channel: self.channels.default,
            reconnect_base: Duration::from_millis(self.reconnect.base_ms),
            reconnect_max: Duration::from_millis(self.reconnect.max_ms),
            heartbeat_interval: Duration::from_millis(self.roster.heartbeat_ms),
            ..SessionConfig::default()
        }
    }
}
