use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

use super::participant::ParticipantSession;
use crate::error::chain;
use crate::provider::{MediaSession, ParticipantInfo, ParticipantSnapshot, SessionId};

/// What one reconciliation pass changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RosterDelta {
    pub added: Vec<ParticipantSession>,
    pub removed: Vec<ParticipantSession>,
    /// Identity or speaking state changed on an existing entry
    pub updated: bool,
}

impl RosterDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && !self.updated
    }

    fn merge(&mut self, other: RosterDelta) {
        self.added.extend(other.added);
        self.removed.extend(other.removed);
        self.updated |= other.updated;
    }
}

/// Canonical session-id -> participant mapping
#[derive(Debug, Default)]
pub struct RosterEngine {
    entries: BTreeMap<SessionId, ParticipantSession>,
    speakers: HashSet<SessionId>,
    local: Option<SessionId>,
}

impl RosterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Query the session and reconcile against its answer
    ///
    /// Never fails: if the provider cannot report its participant set the
    /// roster is left as it was. Returns the snapshot used, if any.
    pub async fn reconcile_with(
        &mut self,
        session: &dyn MediaSession,
    ) -> (RosterDelta, Option<ParticipantSnapshot>) {
        match session.current_participants().await {
            Ok(snapshot) => (self.reconcile(&snapshot), Some(snapshot)),
            Err(e) => {
                warn!("Participant query failed, keeping roster: {}", chain(&e));
                (RosterDelta::default(), None)
            }
        }
    }

    /// One reconciliation pass against an authoritative snapshot
    pub fn reconcile(&mut self, snapshot: &ParticipantSnapshot) -> RosterDelta {
        let mut delta = RosterDelta::default();

        // Prune: nothing survives that the provider does not report
        let mut live = snapshot.live_ids();
        if snapshot.local.is_none() {
            // Partial report; keep our own entry rather than dropping it
            if let Some(local) = &self.local {
                live.insert(local.clone());
            }
        }
        let stale: Vec<SessionId> = self
            .entries
            .keys()
            .filter(|sid| !live.contains(*sid))
            .cloned()
            .collect();
        for sid in stale {
            if let Some(entry) = self.entries.remove(&sid) {
                debug!("Pruned {} ({})", entry.identity, sid);
                delta.removed.push(entry);
            }
        }

        if let Some(local) = &snapshot.local {
            if self.local.as_ref().is_some_and(|prev| prev != &local.sid) {
                // Local session id changed (provider-side resume); old entry was pruned above
                debug!("Local session id changed to {}", local.sid);
            }
            self.local = Some(local.sid.clone());
            delta.merge(self.upsert(local, true));
        }

        let mut seen = HashSet::new();
        for remote in &snapshot.remotes {
            if remote.sid.as_str().is_empty() {
                warn!("Ignoring participant with empty session id ({:?})", remote.identity);
                continue;
            }
            if self.local.as_ref() == Some(&remote.sid) || !seen.insert(remote.sid.clone()) {
                continue;
            }
            delta.merge(self.upsert(remote, false));
        }

        delta.updated |= self.apply_speakers();
        delta
    }

    fn upsert(&mut self, info: &ParticipantInfo, is_local: bool) -> RosterDelta {
        let mut delta = RosterDelta::default();
        match self.entries.get_mut(&info.sid) {
            Some(entry) => {
                // An empty identity is a partial report; keep what we had
                if !info.identity.is_empty() && entry.identity != info.identity {
                    entry.identity = info.identity.clone();
                    delta.updated = true;
                }
                if entry.is_local != is_local {
                    entry.is_local = is_local;
                    delta.updated = true;
                }
            }
            None => {
                let identity = if info.identity.is_empty() {
                    info.sid.to_string()
                } else {
                    info.identity.clone()
                };
                let entry = ParticipantSession::new(info.sid.clone(), identity, is_local);
                debug!("Roster added {} ({})", entry.identity, entry.session_id);
                self.entries.insert(info.sid.clone(), entry.clone());
                delta.added.push(entry);
            }
        }
        delta
    }

    /// Record the provider's latest speaker report
    ///
    /// Takes effect immediately on existing entries and on every later pass.
    pub fn set_active_speakers(&mut self, speakers: impl IntoIterator<Item = SessionId>) -> bool {
        self.speakers = speakers.into_iter().collect();
        self.apply_speakers()
    }

    fn apply_speakers(&mut self) -> bool {
        let mut changed = false;
        for (sid, entry) in self.entries.iter_mut() {
            let speaking = self.speakers.contains(sid);
            if entry.speaking != speaking {
                entry.speaking = speaking;
                changed = true;
            }
        }
        changed
    }

    /// Eagerly drop a departed participant
    ///
    /// Removes the entry only when the participant is neither present nor
    /// holding any subscribed media. The local entry is never removed here.
    pub fn remove_departed(
        &mut self,
        sid: &SessionId,
        present: bool,
        has_media: bool,
    ) -> Option<ParticipantSession> {
        if present || has_media || self.local.as_ref() == Some(sid) {
            return None;
        }
        let entry = self.entries.remove(sid)?;
        debug!("Removed departed {} ({})", entry.identity, sid);
        Some(entry)
    }

    /// Forget everything (used when leaving a channel)
    pub fn clear(&mut self) {
        self.entries.clear();
        self.speakers.clear();
        self.local = None;
    }

    pub fn get(&self, sid: &SessionId) -> Option<&ParticipantSession> {
        self.entries.get(sid)
    }

    pub fn contains(&self, sid: &SessionId) -> bool {
        self.entries.contains_key(sid)
    }

    pub fn local(&self) -> Option<&ParticipantSession> {
        self.local.as_ref().and_then(|sid| self.entries.get(sid))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn session_ids(&self) -> HashSet<SessionId> {
        self.entries.keys().cloned().collect()
    }

    /// Entries for rendering: local first, then remotes by identity
    pub fn snapshot(&self) -> Vec<ParticipantSession> {
        let mut entries: Vec<ParticipantSession> = self.entries.values().cloned().collect();
        entries.sort_by(|a, b| {
            b.is_local
                .cmp(&a.is_local)
                .then_with(|| a.identity.cmp(&b.identity))
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        entries
    }
}
