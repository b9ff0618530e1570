use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::chain;
use crate::roster::RosterDelta;

pub const JOIN_TITLE: &str = "Player joined your channel";
pub const LEAVE_TITLE: &str = "Player left your channel";

/// Queue depth before new notifications are dropped
const DISPATCH_BUFFER: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceVariant {
    Join,
    Leave,
}

/// What the overlay shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEvent {
    pub title: String,
    pub body: String,
    pub variant: PresenceVariant,
}

impl PresenceEvent {
    pub fn joined(identity: &str) -> Self {
        Self {
            title: JOIN_TITLE.to_string(),
            body: identity.to_string(),
            variant: PresenceVariant::Join,
        }
    }

    pub fn left(identity: &str) -> Self {
        Self {
            title: LEAVE_TITLE.to_string(),
            body: identity.to_string(),
            variant: PresenceVariant::Leave,
        }
    }
}

/// External surface that renders presence events
#[async_trait::async_trait]
pub trait OverlaySurface: Send + Sync {
    async fn show(&self, event: &PresenceEvent) -> Result<()>;
}

/// Overlay that only logs; used when no overlay is reachable
pub struct LogOverlay;

#[async_trait::async_trait]
impl OverlaySurface for LogOverlay {
    async fn show(&self, event: &PresenceEvent) -> Result<()> {
        info!("{}: {}", event.title, event.body);
        Ok(())
    }
}

/// Turns roster deltas into presence events
///
/// Events are delivered in order by a single worker task. When the overlay
/// falls behind, new events are dropped rather than blocking the caller.
#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::Sender<PresenceEvent>,
}

impl NotificationDispatcher {
    pub fn spawn(surface: Arc<dyn OverlaySurface>) -> Self {
        let (tx, mut rx) = mpsc::channel::<PresenceEvent>(DISPATCH_BUFFER);

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(e) = surface.show(&event).await {
                    debug!("Overlay did not take {:?} for {}: {}", event.variant, event.body, chain(&e));
                }
            }
            debug!("Notification dispatcher stopped");
        });

        Self { tx }
    }

    /// Queue one event per remote participant added or removed
    ///
    /// Returns how many events were queued.
    pub fn dispatch(&self, delta: &RosterDelta) -> usize {
        let joins = delta
            .added
            .iter()
            .filter(|p| !p.is_local)
            .map(|p| PresenceEvent::joined(&p.identity));
        let leaves = delta
            .removed
            .iter()
            .filter(|p| !p.is_local)
            .map(|p| PresenceEvent::left(&p.identity));

        let mut queued = 0;
        for event in joins.chain(leaves) {
            match self.tx.try_send(event) {
                Ok(()) => queued += 1,
                Err(e) => warn!("Dropping presence notification: {}", e),
            }
        }
        queued
    }
}
