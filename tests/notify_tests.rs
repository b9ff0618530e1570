// Presence notification tests

mod common;

use anyhow::Result;
use common::{wait_until, RecordingOverlay};
use std::sync::Arc;
use voice_companion::notify::{
    NotificationDispatcher, OverlaySurface, PresenceEvent, PresenceVariant, JOIN_TITLE,
    LEAVE_TITLE,
};
use voice_companion::provider::SessionId;
use voice_companion::roster::{ParticipantSession, RosterDelta};

fn participant(sid: &str, identity: &str, is_local: bool) -> ParticipantSession {
    ParticipantSession::new(SessionId::from(sid), identity.to_string(), is_local)
}

/// Overlay that never finishes showing anything
struct StuckOverlay;

#[async_trait::async_trait]
impl OverlaySurface for StuckOverlay {
    async fn show(&self, _event: &PresenceEvent) -> Result<()> {
        std::future::pending().await
    }
}

#[test]
fn test_presence_event_text() {
    let joined = PresenceEvent::joined("Nova");
    assert_eq!(joined.title, JOIN_TITLE);
    assert_eq!(joined.title, "Player joined your channel");
    assert_eq!(joined.body, "Nova");

    let left = PresenceEvent::left("Nova");
    assert_eq!(left.title, "Player left your channel");
    assert_eq!(left.title, LEAVE_TITLE);
    assert_eq!(left.variant, PresenceVariant::Leave);
}

#[tokio::test]
async fn test_dispatch_skips_local_and_orders_joins_first() {
    let overlay = Arc::new(RecordingOverlay::default());
    let dispatcher = NotificationDispatcher::spawn(overlay.clone());

    let delta = RosterDelta {
        added: vec![participant("L", "me", true), participant("A", "alice", false)],
        removed: vec![participant("B", "bob", false), participant("L0", "me", true)],
        updated: false,
    };

    assert_eq!(dispatcher.dispatch(&delta), 2);
    wait_until("two events", || overlay.events().len() == 2).await;

    let events = overlay.events();
    assert_eq!(events[0].variant, PresenceVariant::Join);
    assert_eq!(events[0].body, "alice");
    assert_eq!(events[1].variant, PresenceVariant::Leave);
    assert_eq!(events[1].body, "bob");
}

#[tokio::test]
async fn test_empty_delta_dispatches_nothing() {
    let overlay = Arc::new(RecordingOverlay::default());
    let dispatcher = NotificationDispatcher::spawn(overlay.clone());

    let delta = RosterDelta {
        updated: true,
        ..RosterDelta::default()
    };
    assert_eq!(dispatcher.dispatch(&delta), 0);
}

#[tokio::test]
async fn test_slow_overlay_drops_instead_of_blocking() {
    let dispatcher = NotificationDispatcher::spawn(Arc::new(StuckOverlay));

    let delta = RosterDelta {
        added: (0..100)
            .map(|i| participant(&format!("P{}", i), &format!("player{}", i), false))
            .collect(),
        ..RosterDelta::default()
    };

    // Returns immediately with only what fits in the queue
    let queued = dispatcher.dispatch(&delta);
    assert!(queued > 0);
    assert!(queued < 100);
}
