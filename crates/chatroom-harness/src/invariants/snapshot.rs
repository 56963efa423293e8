//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture the registry and the open sessions at a point in time.
//! Invariants operate on snapshots rather than live state so every check
//! sees the same data.

use std::collections::BTreeMap;

use chatroom_core::{Environment, RoomRegistry, Session};
use serde::Serialize;

/// Snapshot of the entire system state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SystemSnapshot {
    /// Live rooms, sorted by id.
    pub rooms: Vec<RoomState>,
    /// Open sessions, in the order given to [`SystemSnapshot::capture`].
    pub sessions: Vec<SessionState>,
    /// Session count reported by the registry.
    pub session_count: usize,
    /// Log lengths observed per room over time (for monotonicity checks).
    #[serde(skip)]
    pub log_history: BTreeMap<String, Vec<usize>>,
}

impl SystemSnapshot {
    /// Create an empty snapshot (no rooms, no sessions).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Capture the registry and the given sessions.
    pub fn capture<'a, E: Environment>(
        registry: &RoomRegistry,
        sessions: impl IntoIterator<Item = &'a Session<E>>,
    ) -> Self {
        let rooms = registry
            .snapshot()
            .into_iter()
            .map(|room| RoomState {
                id: room.id.to_string(),
                open_count: room.open_count,
                log_len: room.log_len,
            })
            .collect();
        let sessions = sessions
            .into_iter()
            .map(|session| SessionState {
                room_id: session.room_id().to_string(),
                cursor: session.cursor(),
            })
            .collect();

        Self { rooms, sessions, session_count: registry.session_count(), log_history: BTreeMap::new() }
    }

    /// Record this snapshot in `history` and attach the history so far.
    pub fn with_history(mut self, history: &mut LogHistory) -> Self {
        history.record(&self);
        self.log_history = history.lengths.clone();
        self
    }

    /// Room state by id.
    pub fn room(&self, id: &str) -> Option<&RoomState> {
        self.rooms.iter().find(|room| room.id == id)
    }
}

/// Snapshot of one live room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomState {
    /// Room id.
    pub id: String,
    /// Open sessions reported by the room.
    pub open_count: usize,
    /// Messages in the room's log.
    pub log_len: usize,
}

/// Snapshot of one open session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    /// Room the session is open on.
    pub room_id: String,
    /// Next unread position.
    pub cursor: usize,
}

/// Per-room log lengths across successive snapshots.
///
/// A room's history ends when the room is destroyed; reopening the same id
/// starts a new history.
#[derive(Debug, Clone, Default)]
pub struct LogHistory {
    lengths: BTreeMap<String, Vec<usize>>,
}

impl LogHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the log lengths of `snapshot`, dropping destroyed rooms.
    pub fn record(&mut self, snapshot: &SystemSnapshot) {
        self.lengths.retain(|id, _| snapshot.room(id).is_some());
        for room in &snapshot.rooms {
            self.lengths.entry(room.id.clone()).or_default().push(room.log_len);
        }
    }
}
