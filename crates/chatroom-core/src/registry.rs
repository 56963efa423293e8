//! Room registry: lazy room creation and reference-counted destruction.
//!
//! The registry maps room ids to live rooms. The first open of an id creates
//! the room, later opens share it, and the close that drops its open count to
//! zero removes it together with its whole log.
//!
//! All count changes and map changes happen under one registry lock, so two
//! concurrent first opens cannot create duplicate rooms and a last close
//! cannot race an open into reviving a room that is being destroyed.

#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

use crate::{
    error::ChatError,
    message::RoomId,
    room::Room,
};

/// Default maximum number of live rooms.
pub const DEFAULT_MAX_ROOMS: usize = 1024;

/// Default maximum number of open sessions across all rooms.
pub const DEFAULT_MAX_SESSIONS: usize = 65_536;

/// Registry limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Maximum number of live rooms
    pub max_rooms: usize,
    /// Maximum number of open sessions across all rooms
    pub max_sessions: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { max_rooms: DEFAULT_MAX_ROOMS, max_sessions: DEFAULT_MAX_SESSIONS }
    }
}

/// Point-in-time counters for a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryStats {
    /// Live rooms
    pub rooms: usize,
    /// Open sessions across all rooms
    pub sessions: usize,
    /// Messages held across all live logs
    pub messages: usize,
}

/// Observable state of one live room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    /// Room identifier
    pub id: RoomId,
    /// Open sessions on the room
    pub open_count: usize,
    /// Messages in the room's log
    pub log_len: usize,
}

/// Process-wide map from room id to live room.
///
/// Thread-safe via `Arc<Mutex<_>>`. Clones share the same rooms, so a service
/// instance creates one registry and hands clones to its sessions; separate
/// registries are fully isolated.
#[derive(Clone)]
pub struct RoomRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    config: RegistryConfig,
    rooms: Mutex<HashMap<RoomId, Arc<Room>>>,
    sessions: AtomicUsize,
}

impl RoomRegistry {
    /// Create an empty registry with default limits.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty registry with the given limits.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                config,
                rooms: Mutex::new(HashMap::new()),
                sessions: AtomicUsize::new(0),
            }),
        }
    }

    /// Registry limits.
    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    fn rooms(&self) -> MutexGuard<'_, HashMap<RoomId, Arc<Room>>> {
        self.inner.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a room, creating it on first use.
    ///
    /// Increments the room's open count. Every successful call must be paired
    /// with exactly one [`close`](Self::close).
    ///
    /// # Errors
    ///
    /// `ChatError::ResourceExhausted` if the room limit is reached or the map
    /// cannot grow.
    pub fn open(&self, room_id: RoomId) -> Result<Arc<Room>, ChatError> {
        let mut rooms = self.rooms();

        if let Some(room) = rooms.get(&room_id) {
            let open_count = room.acquire();
            tracing::debug!(%room_id, open_count, "room opened");
            return Ok(Arc::clone(room));
        }

        let max_rooms = self.inner.config.max_rooms;
        if rooms.len() >= max_rooms {
            tracing::warn!(%room_id, max_rooms, "room limit reached");
            return Err(ChatError::ResourceExhausted(format!(
                "room limit of {max_rooms} reached"
            )));
        }

        rooms.try_reserve(1)?;
        let room = Arc::new(Room::new(room_id.clone()));
        rooms.insert(room_id.clone(), Arc::clone(&room));

        tracing::debug!(%room_id, rooms = rooms.len(), "room created");
        Ok(room)
    }

    /// Close one reference to `room`. Returns the remaining open count.
    ///
    /// At zero the room leaves the registry and its log is released once the
    /// caller drops its last handle. Closing more often than opening is a
    /// caller bug; it is logged and otherwise ignored.
    pub fn close(&self, room: &Arc<Room>) -> usize {
        let mut rooms = self.rooms();

        let Some(remaining) = room.release() else {
            tracing::error!(room_id = %room.id(), "close without matching open");
            return 0;
        };

        if remaining == 0 {
            let is_registered = rooms.get(room.id()).is_some_and(|r| Arc::ptr_eq(r, room));
            if is_registered {
                rooms.remove(room.id());
            }
            tracing::debug!(
                room_id = %room.id(),
                messages = room.log().len(),
                "room destroyed"
            );
        } else {
            tracing::debug!(room_id = %room.id(), open_count = remaining, "room closed");
        }

        remaining
    }

    /// Reserve one session slot.
    ///
    /// # Errors
    ///
    /// `ChatError::ResourceExhausted` if the session limit is reached.
    pub(crate) fn admit_session(&self) -> Result<(), ChatError> {
        let max_sessions = self.inner.config.max_sessions;
        self.inner
            .sessions
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                (count < max_sessions).then_some(count + 1)
            })
            .map(|_| ())
            .map_err(|_| {
                tracing::warn!(max_sessions, "session limit reached");
                ChatError::ResourceExhausted(format!("session limit of {max_sessions} reached"))
            })
    }

    /// Return a slot taken by [`admit_session`](Self::admit_session).
    pub(crate) fn release_session(&self) {
        let released = self
            .inner
            .sessions
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| count.checked_sub(1));
        debug_assert!(released.is_ok(), "invariant: session release paired with admit");
    }

    /// Whether a room with this id is live.
    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.rooms().contains_key(room_id)
    }

    /// Live room by id.
    pub fn get(&self, room_id: &RoomId) -> Option<Arc<Room>> {
        self.rooms().get(room_id).cloned()
    }

    /// Open count of a live room. `None` if the room does not exist.
    pub fn open_count(&self, room_id: &RoomId) -> Option<usize> {
        self.rooms().get(room_id).map(|room| room.open_count())
    }

    /// Number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms().len()
    }

    /// Number of open sessions across all rooms.
    pub fn session_count(&self) -> usize {
        self.inner.sessions.load(Ordering::Acquire)
    }

    /// Ids of all live rooms, sorted.
    pub fn room_ids(&self) -> Vec<RoomId> {
        let mut ids: Vec<RoomId> = self.rooms().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Snapshot of every live room, sorted by id.
    pub fn snapshot(&self) -> Vec<RoomSnapshot> {
        let rooms = self.rooms();
        let mut snapshot: Vec<RoomSnapshot> = rooms
            .values()
            .map(|room| RoomSnapshot {
                id: room.id().clone(),
                open_count: room.open_count(),
                log_len: room.log().len(),
            })
            .collect();
        snapshot.sort_by(|a, b| a.id.cmp(&b.id));
        snapshot
    }

    /// Aggregate counters.
    pub fn stats(&self) -> RegistryStats {
        let rooms = self.rooms();
        RegistryStats {
            rooms: rooms.len(),
            sessions: self.session_count(),
            messages: rooms.values().map(|room| room.log().len()).sum(),
        }
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RoomRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomRegistry")
            .field("room_count", &self.room_count())
            .field("session_count", &self.session_count())
            .field("config", &self.inner.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_open_creates_room() {
        let registry = RoomRegistry::new();
        let room = registry.open(RoomId::from("lobby")).unwrap();

        assert_eq!(room.open_count(), 1);
        assert!(registry.contains(&RoomId::from("lobby")));
        assert_eq!(registry.room_count(), 1);
    }

    #[test]
    fn second_open_shares_room() {
        let registry = RoomRegistry::new();
        let a = registry.open(RoomId::from("lobby")).unwrap();
        let b = registry.open(RoomId::from("lobby")).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.open_count(&RoomId::from("lobby")), Some(2));
        assert_eq!(registry.room_count(), 1);
    }

    #[test]
    fn last_close_removes_room() {
        let registry = RoomRegistry::new();
        let id = RoomId::from("lobby");
        let a = registry.open(id.clone()).unwrap();
        let b = registry.open(id.clone()).unwrap();

        assert_eq!(registry.close(&a), 1);
        assert!(registry.contains(&id));

        assert_eq!(registry.close(&b), 0);
        assert!(!registry.contains(&id));
        assert_eq!(registry.open_count(&id), None);
    }

    #[test]
    fn reopen_after_destroy_starts_empty() {
        let registry = RoomRegistry::new();
        let id = RoomId::from("lobby");

        let room = registry.open(id.clone()).unwrap();
        room.log().append(crate::Message::new(1, 1, &b"old"[..]).unwrap()).unwrap();
        registry.close(&room);

        let fresh = registry.open(id).unwrap();
        assert!(!Arc::ptr_eq(&room, &fresh));
        assert!(fresh.log().is_empty());
    }

    #[test]
    fn extra_close_is_ignored() {
        let registry = RoomRegistry::new();
        let id = RoomId::from("lobby");
        let room = registry.open(id.clone()).unwrap();

        assert_eq!(registry.close(&room), 0);
        assert_eq!(registry.close(&room), 0);
        assert_eq!(registry.room_count(), 0);
    }

    #[test]
    fn stale_close_does_not_remove_new_room() {
        let registry = RoomRegistry::new();
        let id = RoomId::from("lobby");

        let old = registry.open(id.clone()).unwrap();
        registry.close(&old);
        let _new = registry.open(id.clone()).unwrap();

        // Double close on the destroyed room must not evict its successor.
        registry.close(&old);
        assert_eq!(registry.open_count(&id), Some(1));
    }

    #[test]
    fn room_limit_is_enforced() {
        let registry = RoomRegistry::with_config(RegistryConfig { max_rooms: 1, max_sessions: 10 });
        let _a = registry.open(RoomId::from("a")).unwrap();

        let result = registry.open(RoomId::from("b"));
        assert!(matches!(result, Err(ChatError::ResourceExhausted(_))));

        // Existing rooms can still be opened at the limit.
        assert!(registry.open(RoomId::from("a")).is_ok());
    }

    #[test]
    fn session_slots_are_limited() {
        let registry = RoomRegistry::with_config(RegistryConfig { max_rooms: 10, max_sessions: 2 });

        registry.admit_session().unwrap();
        registry.admit_session().unwrap();
        assert!(matches!(registry.admit_session(), Err(ChatError::ResourceExhausted(_))));

        registry.release_session();
        assert!(registry.admit_session().is_ok());
        assert_eq!(registry.session_count(), 2);
    }

    #[test]
    fn snapshot_and_stats() {
        let registry = RoomRegistry::new();
        let b = registry.open(RoomId::from("b")).unwrap();
        let _a = registry.open(RoomId::from("a")).unwrap();
        b.log().append(crate::Message::new(1, 1, &b"x"[..]).unwrap()).unwrap();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].id, RoomId::from("a"));
        assert_eq!(snapshot[1].log_len, 1);

        assert_eq!(registry.room_ids(), vec![RoomId::from("a"), RoomId::from("b")]);
        assert_eq!(registry.stats(), RegistryStats { rooms: 2, sessions: 0, messages: 1 });
    }

    #[test]
    fn registries_are_isolated() {
        let first = RoomRegistry::new();
        let second = RoomRegistry::new();

        let _room = first.open(RoomId::from("lobby")).unwrap();
        assert!(!second.contains(&RoomId::from("lobby")));
    }
}
