//! Client session: one open handle on a room with a private cursor.
//!
//! A session starts at the head of the room's log, so a new reader sees the
//! whole backlog. Its cursor only moves through [`Session::read`],
//! [`Session::read_into`] and [`Session::seek`]; writes from any session only
//! extend the tail the cursor may later reach.

use std::sync::Arc;

use chatroom_proto::Whence;

use crate::{
    env::Environment,
    error::ChatError,
    message::{Message, RoomId},
    registry::RoomRegistry,
    room::Room,
};

/// Open handle on a room.
///
/// Closing is tied to ownership: [`close`](Self::close) consumes the session,
/// and dropping an unclosed session closes it, so every successful open is
/// paired with exactly one registry close.
pub struct Session<E: Environment> {
    registry: RoomRegistry,
    room: Arc<Room>,
    env: E,
    cursor: usize,
    closed: bool,
}

impl<E: Environment> Session<E> {
    /// Open a session on `room_id`, creating the room if needed.
    ///
    /// The cursor starts at position 0.
    ///
    /// # Errors
    ///
    /// `ChatError::ResourceExhausted` if the room or the session cannot be
    /// allocated. A failure after the room was opened rolls the open back,
    /// destroying the room if this was its only reference.
    pub fn open(
        registry: &RoomRegistry,
        env: E,
        room_id: impl Into<RoomId>,
    ) -> Result<Self, ChatError> {
        let room = registry.open(room_id.into())?;

        if let Err(err) = registry.admit_session() {
            let remaining = registry.close(&room);
            tracing::warn!(room_id = %room.id(), remaining, "session rejected, open rolled back");
            return Err(err);
        }

        Ok(Self { registry: registry.clone(), room, env, cursor: 0, closed: false })
    }

    /// Broadcast `payload` to every reader of the room.
    ///
    /// Stamps the message with the environment's sender id and clock, appends
    /// it, and returns the number of payload bytes accepted. The cursor is not
    /// moved.
    ///
    /// # Errors
    ///
    /// - `ChatError::PayloadTooLarge` if `payload` exceeds
    ///   [`MAX_MESSAGE_LENGTH`](crate::MAX_MESSAGE_LENGTH); nothing is appended
    /// - `ChatError::ResourceExhausted` if the log cannot grow
    pub fn write(&self, payload: &[u8]) -> Result<usize, ChatError> {
        let message = Message::new(
            self.env.sender_id(),
            self.env.wall_clock_secs(),
            bytes::Bytes::copy_from_slice(payload),
        )
        .inspect_err(|err| {
            tracing::debug!(room_id = %self.room.id(), error = %err, "write rejected");
        })?;
        let position = self.room.log().append(message)?;

        tracing::trace!(room_id = %self.room.id(), position, len = payload.len(), "message appended");
        Ok(payload.len())
    }

    /// Read up to `max_messages` from the cursor and advance past them.
    ///
    /// An empty result means there is nothing new yet.
    pub fn read(&mut self, max_messages: usize) -> Vec<Message> {
        let messages = self.room.log().read_from(self.cursor, max_messages);
        self.cursor += messages.len();

        tracing::trace!(
            room_id = %self.room.id(),
            count = messages.len(),
            cursor = self.cursor,
            "messages read"
        );
        messages
    }

    /// Deliver up to `max_messages` from the cursor to `sink`, one at a time.
    ///
    /// The cursor advances once per message the sink accepts. If the sink
    /// fails on the first message the error is returned; a failure on a later
    /// message stops delivery and the count delivered so far is returned.
    pub fn read_into<F>(&mut self, max_messages: usize, mut sink: F) -> Result<usize, ChatError>
    where
        F: FnMut(&Message) -> Result<(), ChatError>,
    {
        let mut delivered = 0;

        for message in self.room.log().range(self.cursor, max_messages) {
            match sink(&message) {
                Ok(()) => {
                    self.cursor += 1;
                    delivered += 1;
                },
                Err(err) if delivered == 0 => return Err(err),
                Err(err) => {
                    tracing::debug!(
                        room_id = %self.room.id(),
                        delivered,
                        error = %err,
                        "read stopped early"
                    );
                    break;
                },
            }
        }

        Ok(delivered)
    }

    /// Number of messages between the cursor and the current tail.
    pub fn count_unread(&self) -> usize {
        self.room.log().len().saturating_sub(self.cursor)
    }

    /// Move the cursor to `index`, clamped to the current tail.
    ///
    /// Only [`Whence::Set`] is supported. Returns the new cursor.
    ///
    /// # Errors
    ///
    /// `ChatError::InvalidArgument` for any other origin.
    pub fn seek(&mut self, index: usize, whence: Whence) -> Result<usize, ChatError> {
        if whence != Whence::Set {
            return Err(ChatError::InvalidArgument(format!("unsupported seek origin {whence:?}")));
        }

        self.cursor = index.min(self.room.log().len());
        Ok(self.cursor)
    }

    /// Current cursor position.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Id of the room this session is open on.
    pub fn room_id(&self) -> &RoomId {
        self.room.id()
    }

    /// Room this session is open on.
    pub fn room(&self) -> &Arc<Room> {
        &self.room
    }

    /// Whether the session has been closed in place.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Close the session. Returns the room's remaining open count.
    pub fn close(mut self) -> usize {
        self.close_in_place()
    }

    /// Close the session without giving it up.
    ///
    /// For owners that share the session behind a lock: the room is released
    /// immediately, even while other holders keep the session alive. Later
    /// calls, and the eventual drop, do not touch the registry again.
    pub fn close_in_place(&mut self) -> usize {
        if self.closed {
            return self.room.open_count();
        }
        self.closed = true;

        let remaining = self.registry.close(&self.room);
        self.registry.release_session();
        remaining
    }
}

impl<E: Environment> Drop for Session<E> {
    fn drop(&mut self) {
        self.close_in_place();
    }
}

impl<E: Environment> std::fmt::Debug for Session<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("room_id", self.room.id())
            .field("cursor", &self.cursor)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}
