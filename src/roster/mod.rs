//! Roster reconciliation
//!
//! The roster is the local view of who is in the channel. Provider events
//! arrive out of order, duplicated or not at all, so every pass rebuilds
//! the roster against the provider's authoritative participant set:
//! 1. prune entries the provider no longer reports
//! 2. upsert the local participant
//! 3. upsert every live remote
//! 4. apply the latest active-speaker report
//!
//! Entries are keyed by provider session id, never by display identity.

mod engine;
mod participant;

pub use engine::{RosterDelta, RosterEngine};
pub use participant::ParticipantSession;
