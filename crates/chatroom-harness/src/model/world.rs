//! Model world - reference registry, rooms and sessions.
//!
//! Plain vectors and maps with no concurrency. The world is the oracle
//! against which the real implementation is verified.

use std::collections::BTreeMap;

use chatroom_core::{MAX_MESSAGE_LENGTH, Message, RegistryConfig};

use super::operation::{ModelRoomId, Operation, OperationError, OperationResult, SessionSlot};

/// Model message, comparable with real messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelMessage {
    /// Identity of the writer.
    pub sender_id: i32,
    /// Clock reading at write time.
    pub timestamp: i64,
    /// Payload bytes.
    pub content: Vec<u8>,
}

impl From<&Message> for ModelMessage {
    fn from(message: &Message) -> Self {
        Self {
            sender_id: message.sender_id(),
            timestamp: message.timestamp(),
            content: message.payload().to_vec(),
        }
    }
}

/// Model room: a log and a reference count.
#[derive(Debug, Clone, Default)]
pub struct ModelRoom {
    /// Messages in append order.
    pub log: Vec<ModelMessage>,
    /// Number of open sessions.
    pub open_count: usize,
}

/// Model session: a room and a cursor.
#[derive(Debug, Clone)]
pub struct ModelSession {
    /// Room the session is open on.
    pub room_id: ModelRoomId,
    /// Next unread position.
    pub cursor: usize,
    /// Sender id stamped on this session's writes.
    pub sender_id: i32,
}

/// Observable state for oracle comparison.
///
/// This is the subset of world state that can be compared against the real
/// implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// Live rooms (sorted): id, open count, log.
    pub rooms: Vec<(ModelRoomId, usize, Vec<ModelMessage>)>,
    /// Open sessions in slot order: room and cursor.
    pub sessions: Vec<(ModelRoomId, usize)>,
}

/// Model world - the reference implementation.
///
/// Sender ids are handed out from 1 in order of successful opens, so the
/// real side can assign the same ids.
#[derive(Debug, Clone)]
pub struct ModelWorld {
    config: RegistryConfig,
    now: i64,
    next_sender: i32,
    rooms: BTreeMap<ModelRoomId, ModelRoom>,
    sessions: Vec<ModelSession>,
}

impl ModelWorld {
    /// Create an empty world whose clock reads `now`.
    pub fn new(config: RegistryConfig, now: i64) -> Self {
        Self { config, now, next_sender: 1, rooms: BTreeMap::new(), sessions: Vec::new() }
    }

    /// Sender id the next successful open will receive.
    pub fn next_sender(&self) -> i32 {
        self.next_sender
    }

    /// Open sessions, in slot order.
    pub fn sessions(&self) -> &[ModelSession] {
        &self.sessions
    }

    /// Live room by id.
    pub fn room(&self, room_id: ModelRoomId) -> Option<&ModelRoom> {
        self.rooms.get(&room_id)
    }

    /// Resolve a slot to a session index. `None` when no session is open.
    pub fn slot(&self, session: SessionSlot) -> Option<usize> {
        if self.sessions.is_empty() {
            return None;
        }
        Some(session as usize % self.sessions.len())
    }

    /// Apply an operation and return the result.
    ///
    /// The result should match the real implementation's result.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        match op {
            Operation::Open { room_id } => self.apply_open(*room_id),
            Operation::Write { session, content } => {
                self.apply_write(*session, content.to_bytes())
            },
            Operation::Read { session, max } => self.apply_read(*session, *max as usize),
            Operation::CountUnread { session } => self.apply_count_unread(*session),
            Operation::Seek { session, index } => self.apply_seek(*session, *index as usize),
            Operation::Close { session } => self.apply_close(*session),
            Operation::AdvanceClock { secs } => {
                self.now += i64::from(*secs);
                OperationResult::ClockAdvanced
            },
        }
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        let rooms = self
            .rooms
            .iter()
            .map(|(&room_id, room)| (room_id, room.open_count, room.log.clone()))
            .collect();
        let sessions = self.sessions.iter().map(|s| (s.room_id, s.cursor)).collect();

        ObservableState { rooms, sessions }
    }

    /// Existing room: the session limit applies. New room: the room limit
    /// applies first, then the session limit.
    fn apply_open(&mut self, room_id: ModelRoomId) -> OperationResult {
        let at_session_limit = self.sessions.len() >= self.config.max_sessions;

        if let Some(room) = self.rooms.get_mut(&room_id) {
            if at_session_limit {
                return OperationResult::Error(OperationError::ResourceExhausted);
            }
            room.open_count += 1;
        } else {
            if self.rooms.len() >= self.config.max_rooms || at_session_limit {
                return OperationResult::Error(OperationError::ResourceExhausted);
            }
            self.rooms.insert(room_id, ModelRoom { log: Vec::new(), open_count: 1 });
        }

        self.sessions.push(ModelSession { room_id, cursor: 0, sender_id: self.next_sender });
        self.next_sender += 1;
        OperationResult::Opened
    }

    fn apply_write(&mut self, session: SessionSlot, content: Vec<u8>) -> OperationResult {
        let Some(index) = self.slot(session) else {
            return OperationResult::Error(OperationError::NoSession);
        };
        if content.len() > MAX_MESSAGE_LENGTH {
            return OperationResult::Error(OperationError::PayloadTooLarge);
        }

        let session = &self.sessions[index];
        let Some(room) = self.rooms.get_mut(&session.room_id) else {
            return OperationResult::Error(OperationError::NoSession);
        };

        let len = content.len();
        room.log.push(ModelMessage { sender_id: session.sender_id, timestamp: self.now, content });
        OperationResult::Wrote(len)
    }

    fn apply_read(&mut self, session: SessionSlot, max: usize) -> OperationResult {
        let Some(index) = self.slot(session) else {
            return OperationResult::Error(OperationError::NoSession);
        };

        let session = &mut self.sessions[index];
        let log = self.rooms.get(&session.room_id).map_or(&[][..], |room| &room.log[..]);

        let end = log.len().min(session.cursor + max);
        let messages = log[session.cursor.min(end)..end].to_vec();
        session.cursor += messages.len();
        OperationResult::Read(messages)
    }

    fn apply_count_unread(&self, session: SessionSlot) -> OperationResult {
        let Some(index) = self.slot(session) else {
            return OperationResult::Error(OperationError::NoSession);
        };

        let session = &self.sessions[index];
        let len = self.rooms.get(&session.room_id).map_or(0, |room| room.log.len());
        OperationResult::Unread(len.saturating_sub(session.cursor))
    }

    fn apply_seek(&mut self, session: SessionSlot, target: usize) -> OperationResult {
        let Some(index) = self.slot(session) else {
            return OperationResult::Error(OperationError::NoSession);
        };

        let session = &mut self.sessions[index];
        let len = self.rooms.get(&session.room_id).map_or(0, |room| room.log.len());
        session.cursor = target.min(len);
        OperationResult::Cursor(session.cursor)
    }

    fn apply_close(&mut self, session: SessionSlot) -> OperationResult {
        let Some(index) = self.slot(session) else {
            return OperationResult::Error(OperationError::NoSession);
        };

        let session = self.sessions.remove(index);
        let Some(room) = self.rooms.get_mut(&session.room_id) else {
            return OperationResult::Error(OperationError::NoSession);
        };

        room.open_count -= 1;
        let remaining = room.open_count;
        if remaining == 0 {
            self.rooms.remove(&session.room_id);
        }
        OperationResult::Closed(remaining)
    }
}
