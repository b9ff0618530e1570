//! Join/leave presence notifications
//!
//! Roster deltas become presence events for an external overlay. Delivery
//! is fire-and-forget: nothing the overlay does can affect the roster or
//! the connection.

mod dispatcher;

pub use dispatcher::{
    LogOverlay, NotificationDispatcher, OverlaySurface, PresenceEvent, PresenceVariant,
    JOIN_TITLE, LEAVE_TITLE,
};
