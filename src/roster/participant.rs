use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::provider::SessionId;

/// One participant in the roster
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantSession {
    /// Provider-assigned id; the roster key
    pub session_id: SessionId,

    /// Display identity (may collide between participants)
    pub identity: String,

    /// Whether this is the local participant
    pub is_local: bool,

    /// Whether the provider currently reports this participant as speaking
    pub speaking: bool,

    /// When this client first observed the participant
    pub first_seen: DateTime<Utc>,
}

impl ParticipantSession {
    pub fn new(session_id: SessionId, identity: String, is_local: bool) -> Self {
        Self {
            session_id,
            identity,
            is_local,
            speaking: false,
            first_seen: Utc::now(),
        }
    }
}
