// Preference persistence tests
//
// Uses a real JSON settings file in a temp directory, plus a gateway that
// always fails to show that storage errors never break the session.

use anyhow::{bail, Result};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use voice_companion::notify::LogOverlay;
use voice_companion::provider::LoopbackRelay;
use voice_companion::session::{
    ConnectionState, FixedIdentity, NoPrompt, SessionConfig, SessionController, SessionDeps,
};
use voice_companion::settings::{
    JsonFileSettings, PreferenceStore, SettingsGateway, VolumeTable,
};
use voice_companion::{DevTokenIssuer, SyntheticHost};

struct BrokenSettings;

#[async_trait::async_trait]
impl SettingsGateway for BrokenSettings {
    async fn get(&self, _key: &str) -> Result<Option<Value>> {
        bail!("settings backend offline")
    }

    async fn set(&self, _key: &str, _value: Value) -> Result<()> {
        bail!("settings backend offline")
    }
}

fn deps(settings: Arc<dyn SettingsGateway>, relay: &LoopbackRelay) -> SessionDeps {
    SessionDeps {
        tokens: Arc::new(DevTokenIssuer::default()),
        provider: Arc::new(relay.clone()),
        audio: Arc::new(SyntheticHost::new()),
        settings,
        identity_prompt: Arc::new(FixedIdentity("Nova".into())),
        overlay: Arc::new(LogOverlay),
    }
}

#[tokio::test]
async fn test_json_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("settings.json");

    let store = JsonFileSettings::open(&path).await.unwrap();
    assert_eq!(store.get("username").await.unwrap(), None);
    store.set("username", json!("Nova")).await.unwrap();
    store.set("micGainPercent", json!(80)).await.unwrap();

    let reopened = JsonFileSettings::open(&path).await.unwrap();
    assert_eq!(reopened.get("username").await.unwrap(), Some(json!("Nova")));
    assert_eq!(reopened.get("micGainPercent").await.unwrap(), Some(json!(80)));

    // No temp file left behind
    let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(leftovers.len(), 1);
}

#[tokio::test]
async fn test_json_file_rejects_non_object() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "[1, 2, 3]").unwrap();

    assert!(JsonFileSettings::open(&path).await.is_err());
}

#[tokio::test]
async fn test_preferences_defaults_and_sanitizing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(
        &path,
        r#"{ "username": "x", "micGainPercent": -20, "volumes": { "alice": 3.5, "bob": -1 } }"#,
    )
    .unwrap();

    let gateway = Arc::new(JsonFileSettings::open(&path).await.unwrap());
    let prefs = PreferenceStore::new(gateway).load().await;

    // Too short to be an identity
    assert_eq!(prefs.username, None);
    assert_eq!(prefs.mic_gain_percent, 0);
    assert!(!prefs.auto_connect);
    assert_eq!(prefs.volumes.get("alice"), 1.0);
    assert_eq!(prefs.volumes.get("bob"), 0.0);
}

#[tokio::test]
async fn test_volumes_persist_across_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    let relay = LoopbackRelay::new();

    let settings = Arc::new(JsonFileSettings::open(&path).await.unwrap());
    let handle = SessionController::spawn(SessionConfig::default(), deps(settings, &relay)).await;
    handle.set_peer_volume("alice", 0.3).await.unwrap();
    handle.set_peer_volume("bob", 0.75).await.unwrap();
    handle.set_gain(60).await.unwrap();
    handle.shutdown().await;

    let settings = Arc::new(JsonFileSettings::open(&path).await.unwrap());
    let handle = SessionController::spawn(SessionConfig::default(), deps(settings, &relay)).await;

    let volumes: VolumeTable = handle.volumes().await.unwrap();
    assert!((volumes.get("alice") - 0.3).abs() < 1e-6);
    assert!((volumes.get("bob") - 0.75).abs() < 1e-6);
    assert_eq!(volumes.get("carol"), 1.0);
    assert_eq!(handle.status().mic_gain_percent, 60);
}

#[tokio::test]
async fn test_identity_persists_across_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    let relay = LoopbackRelay::new();

    let settings = Arc::new(JsonFileSettings::open(&path).await.unwrap());
    let handle = SessionController::spawn(SessionConfig::default(), deps(settings, &relay)).await;
    handle.connect().await.unwrap();
    handle.shutdown().await;

    let settings = Arc::new(JsonFileSettings::open(&path).await.unwrap());
    let mut restarted = deps(settings, &relay);
    restarted.identity_prompt = Arc::new(NoPrompt);
    let handle = SessionController::spawn(SessionConfig::default(), restarted).await;
    handle.connect().await.unwrap();

    assert_eq!(handle.status().identity.as_deref(), Some("Nova"));
}

#[tokio::test]
async fn test_settings_failures_are_not_fatal() {
    let relay = LoopbackRelay::new();
    let handle =
        SessionController::spawn(SessionConfig::default(), deps(Arc::new(BrokenSettings), &relay))
            .await;

    // Defaults when nothing can be read
    let status = handle.status();
    assert_eq!(status.mic_gain_percent, 100);
    assert!(!status.auto_connect);

    handle.connect().await.unwrap();
    assert_eq!(handle.status().state, ConnectionState::Connected);

    // Writes fail quietly; in-memory values still take effect
    assert_eq!(handle.set_peer_volume("alice", 0.5).await.unwrap(), Some(0.5));
    assert_eq!(handle.volumes().await.unwrap().get("alice"), 0.5);
    assert!((handle.set_gain(200).await.unwrap() - 2.0).abs() < f32::EPSILON);
    handle.set_auto_connect(true).await.unwrap();
    assert!(handle.status().auto_connect);
}
