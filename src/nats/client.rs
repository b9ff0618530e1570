use anyhow::{Context, Result};
use async_nats::Client;
use tracing::{debug, info};

use super::messages::OverlayMessage;
use crate::notify::{OverlaySurface, PresenceEvent};

/// Overlay surface that publishes presence events to NATS
pub struct NatsOverlay {
    client: Client,
    subject: String,
}

impl NatsOverlay {
    /// Connect to NATS server
    pub async fn connect(url: &str, subject: impl Into<String>) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self {
            client,
            subject: subject.into(),
        })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

#[async_trait::async_trait]
impl OverlaySurface for NatsOverlay {
    async fn show(&self, event: &PresenceEvent) -> Result<()> {
        let message = OverlayMessage::from_event(event);
        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(self.subject.clone(), payload.into())
            .await
            .context("Failed to publish overlay event")?;

        debug!("Published {:?} for {} to {}", event.variant, event.body, self.subject);

        Ok(())
    }
}
