use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Transport-assigned identity of one live connection.
pub type ConnectionId = Uuid;

/// Chat identity of one connection: who it claims to be and where it sits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: ConnectionId,
    pub name: String,
    pub room: String,
}

#[derive(Debug)]
struct Entry {
    session: Session,
    // bumped on every upsert, orders rosters by most recent update
    seq: u64,
}

/// In-memory store of every joined connection, keyed by connection id.
///
/// Rooms are not stored. A room exists while at least one session names it, so
/// [`SessionRegistry::room_names`] and [`SessionRegistry::members_of`] are
/// recomputed from the entries on every call.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    entries: HashMap<ConnectionId, Entry>,
    next_seq: u64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the session for `id`, replacing any previous one in the same step.
    pub fn upsert(&mut self, id: ConnectionId, name: &str, room: &str) -> Session {
        let session = Session {
            id,
            name: name.to_string(),
            room: room.to_string(),
        };
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            id,
            Entry {
                session: session.clone(),
                seq,
            },
        );
        session
    }

    /// Removes the session for `id` and hands it back. Absent ids are a no-op.
    pub fn remove(&mut self, id: &ConnectionId) -> Option<Session> {
        self.entries.remove(id).map(|entry| entry.session)
    }

    pub fn get(&self, id: &ConnectionId) -> Option<&Session> {
        self.entries.get(id).map(|entry| &entry.session)
    }

    /// Sessions currently in `room`, least recently updated first.
    pub fn members_of(&self, room: &str) -> Vec<Session> {
        let mut members: Vec<&Entry> = self
            .entries
            .values()
            .filter(|entry| entry.session.room == room)
            .collect();
        members.sort_by_key(|entry| entry.seq);
        members.into_iter().map(|entry| entry.session.clone()).collect()
    }

    /// Distinct occupied room names, sorted.
    pub fn room_names(&self) -> Vec<String> {
        self.entries
            .values()
            .map(|entry| entry.session.room.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
