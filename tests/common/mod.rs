// Shared fixtures for controller-level tests
//
// Wires a session controller to the loopback relay, the synthetic audio host,
// in-memory settings and an overlay that records what it was asked to show.

#![allow(dead_code)]

use anyhow::Result;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use voice_companion::notify::{OverlaySurface, PresenceEvent};
use voice_companion::provider::LoopbackRelay;
use voice_companion::session::{
    FixedIdentity, IdentityPrompt, SessionConfig, SessionController, SessionControllerHandle,
    SessionDeps,
};
use voice_companion::settings::{MemorySettings, SettingsGateway};
use voice_companion::{DevTokenIssuer, SyntheticHost};

#[derive(Default)]
pub struct RecordingOverlay {
    events: Mutex<Vec<PresenceEvent>>,
}

impl RecordingOverlay {
    pub fn events(&self) -> Vec<PresenceEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl OverlaySurface for RecordingOverlay {
    async fn show(&self, event: &PresenceEvent) -> Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

pub struct Harness {
    pub relay: LoopbackRelay,
    pub host: SyntheticHost,
    pub overlay: Arc<RecordingOverlay>,
    pub settings: Arc<MemorySettings>,
    pub handle: SessionControllerHandle,
}

impl Harness {
    /// Controller with identity "me" stored and auto-connect off
    pub async fn start() -> Self {
        let settings = Arc::new(MemorySettings::new());
        settings.set("username", Value::from("me")).await.unwrap();
        Self::start_with(settings, Arc::new(FixedIdentity("prompted".into()))).await
    }

    /// Controller with identity "me" stored and auto-connect on
    pub async fn start_auto_connect() -> Self {
        let settings = Arc::new(MemorySettings::new());
        settings.set("username", Value::from("me")).await.unwrap();
        settings.set("autoConnect", Value::from(true)).await.unwrap();
        Self::start_with(settings, Arc::new(FixedIdentity("prompted".into()))).await
    }

    pub async fn start_with(settings: Arc<MemorySettings>, prompt: Arc<dyn IdentityPrompt>) -> Self {
        Self::start_configured(settings, prompt, SessionConfig::default()).await
    }

    /// Controller with identity "me" stored and the given runtime config
    pub async fn start_with_config(config: SessionConfig) -> Self {
        let settings = Arc::new(MemorySettings::new());
        settings.set("username", Value::from("me")).await.unwrap();
        Self::start_configured(settings, Arc::new(FixedIdentity("prompted".into())), config).await
    }

    async fn start_configured(
        settings: Arc<MemorySettings>,
        prompt: Arc<dyn IdentityPrompt>,
        config: SessionConfig,
    ) -> Self {
        let relay = LoopbackRelay::new();
        let host = SyntheticHost::new();
        let overlay = Arc::new(RecordingOverlay::default());

        let deps = SessionDeps {
            tokens: Arc::new(DevTokenIssuer::default()),
            provider: Arc::new(relay.clone()),
            audio: Arc::new(host.clone()),
            settings: settings.clone(),
            identity_prompt: prompt,
            overlay: overlay.clone(),
        };
        let handle = SessionController::spawn(config, deps).await;

        Self {
            relay,
            host,
            overlay,
            settings,
            handle,
        }
    }

    pub fn roster_names(&self) -> Vec<String> {
        self.handle
            .roster()
            .into_iter()
            .map(|p| p.identity)
            .collect()
    }

    pub async fn setting(&self, key: &str) -> Option<Value> {
        self.settings.get(key).await.unwrap()
    }
}

/// Poll `check` until it holds, failing the test after a few (virtual) seconds
pub async fn wait_until(what: &str, check: impl Fn() -> bool) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {}", what);
}
