use serde::{Deserialize, Serialize};

use crate::notify::{PresenceEvent, PresenceVariant};

/// Overlay message published to NATS
#[derive(Debug, Serialize, Deserialize)]
pub struct OverlayMessage {
    pub title: String,
    pub body: String,
    pub variant: PresenceVariant,
    pub timestamp: String, // RFC3339 timestamp
}

impl OverlayMessage {
    pub fn from_event(event: &PresenceEvent) -> Self {
        Self {
            title: event.title.clone(),
            body: event.body.clone(),
            variant: event.variant,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
