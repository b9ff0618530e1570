use voice_companion::nats::messages::OverlayMessage;
use voice_companion::notify::{PresenceEvent, PresenceVariant};

#[test]
fn test_overlay_message_serialization() {
    let msg = OverlayMessage::from_event(&PresenceEvent::joined("Nova"));

    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("\"variant\":\"join\""));
    assert!(json.contains("\"body\":\"Nova\""));
    assert!(json.contains("Player joined your channel"));

    let deserialized: OverlayMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized.title, "Player joined your channel");
    assert_eq!(deserialized.body, "Nova");
    assert_eq!(deserialized.variant, PresenceVariant::Join);
    assert!(chrono::DateTime::parse_from_rfc3339(&deserialized.timestamp).is_ok());
}

#[test]
fn test_overlay_message_leave_variant() {
    let msg = OverlayMessage::from_event(&PresenceEvent::left("Nova"));

    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("\"variant\":\"leave\""));
    assert!(json.contains("Player left your channel"));
}

#[test]
fn test_overlay_message_deserialization() {
    let json = r#"{
        "title": "Player joined your channel",
        "body": "Orion",
        "variant": "join",
        "timestamp": "2025-10-27T14:30:05Z"
    }"#;

    let msg: OverlayMessage = serde_json::from_str(json).unwrap();
    assert_eq!(msg.body, "Orion");
    assert_eq!(msg.variant, PresenceVariant::Join);
    assert_eq!(msg.timestamp, "2025-10-27T14:30:05Z");
}

#[test]
fn test_overlay_message_rejects_unknown_variant() {
    let json = r#"{
        "title": "x",
        "body": "y",
        "variant": "wave",
        "timestamp": "2025-10-27T14:30:05Z"
    }"#;

    assert!(serde_json::from_str::<OverlayMessage>(json).is_err());
}
