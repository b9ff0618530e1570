// Configuration loading tests

use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use voice_companion::Config;

const BASE: &str = r#"
[service]
name = "voice-companion"

[service.http]
bind = "127.0.0.1"
port = 7878

[relay]
endpoint = "ws://127.0.0.1:7880"

[settings]
path = "~/.config/voice-companion/settings.json"

[overlay]
nats_url = "nats://localhost:4222"
subject = "overlay.show"
"#;

fn write_config(dir: &TempDir, extra: &str) -> String {
    let path = dir.path().join("voice.toml");
    fs::write(&path, format!("{}\n{}", BASE, extra)).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_defaults_fill_optional_sections() {
    let dir = TempDir::new().unwrap();
    let config = Config::load(&write_config(&dir, "")).unwrap();

    let session = config.session_config();
    assert_eq!(session.channel_count, 8);
    assert_eq!(session.default_channel, 1);
    assert_eq!(session.reconnect_base, Duration::from_secs(1));
    assert_eq!(session.reconnect_max, Duration::from_secs(30));
    assert_eq!(session.heartbeat_interval, Duration::from_secs(1));
}

#[test]
fn test_zero_heartbeat_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[roster]\nheartbeat_ms = 0\n");

    let err = Config::load(&path).unwrap_err();
    assert!(err.to_string().contains("heartbeat_ms"), "{}", err);
}

#[test]
fn test_zero_reconnect_base_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[reconnect]\nbase_ms = 0\nmax_ms = 30000\n");

    let err = Config::load(&path).unwrap_err();
    assert!(err.to_string().contains("base_ms"), "{}", err);
}

#[test]
fn test_reconnect_cap_below_base_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[reconnect]\nbase_ms = 5000\nmax_ms = 1000\n");

    let err = Config::load(&path).unwrap_err();
    assert!(err.to_string().contains("max_ms"), "{}", err);
}

#[test]
fn test_shipped_config_is_valid() {
    let config = Config::load("config/voice-companion").unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.service.http.port, 7878);
}
