//! Operations for model-based testing.
//!
//! Operations represent every action a client can take on the registry. They
//! are generated randomly by proptest and applied to both the model and the
//! real implementation.

use arbitrary::Arbitrary;
use chatroom_core::{ChatError, RoomId};
use chatroom_proto::MAX_MESSAGE_LENGTH;

use super::world::ModelMessage;

/// Room identifier (uses u8 to keep test space manageable).
pub type ModelRoomId = u8;

/// Index into the list of open sessions, taken modulo its length.
pub type SessionSlot = u8;

/// Real room id for a model room.
pub fn room_name(room_id: ModelRoomId) -> RoomId {
    RoomId::from(format!("room-{room_id}"))
}

/// Operations that can be applied to the system.
///
/// Every operation except `Open` and `AdvanceClock` targets an open session
/// chosen by slot. Sessions are kept in open order, and closing one shifts
/// later sessions down.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Open a new session on a room.
    Open {
        /// Room to open.
        room_id: ModelRoomId,
    },

    /// Write a message through a session.
    Write {
        /// Session writing.
        session: SessionSlot,
        /// Message content (kept small for efficiency).
        content: SmallMessage,
    },

    /// Read messages from a session's cursor.
    Read {
        /// Session reading.
        session: SessionSlot,
        /// Maximum number of messages.
        max: u8,
    },

    /// Query a session's unread count.
    CountUnread {
        /// Session queried.
        session: SessionSlot,
    },

    /// Move a session's cursor.
    Seek {
        /// Session repositioned.
        session: SessionSlot,
        /// Target message index.
        index: u8,
    },

    /// Close a session.
    Close {
        /// Session closed.
        session: SessionSlot,
    },

    /// Advance the shared clock.
    AdvanceClock {
        /// Seconds to advance.
        secs: u8,
    },
}

/// Small message content for testing.
///
/// A compact representation that still reaches the length boundary on both
/// sides. The content is deterministic from the seed.
#[derive(Debug, Clone, Arbitrary)]
pub struct SmallMessage {
    /// Message seed.
    pub seed: u8,
    /// Length class (0-4 maps to empty/small/medium/maximum/oversized).
    pub size_class: u8,
}

impl SmallMessage {
    /// Expand to actual message bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let len = match self.size_class % 5 {
            0 => 0,
            1 => 8,
            2 => 64,
            3 => MAX_MESSAGE_LENGTH,
            _ => MAX_MESSAGE_LENGTH + 1,
        };

        (0..len).map(|i| self.seed.wrapping_add(i as u8)).collect()
    }
}

/// Result of applying an operation.
///
/// Used to compare model and real system behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    /// Session opened.
    Opened,
    /// Message appended; payload bytes accepted.
    Wrote(usize),
    /// Messages read, in log order.
    Read(Vec<ModelMessage>),
    /// Unread count.
    Unread(usize),
    /// Cursor after a seek.
    Cursor(usize),
    /// Session closed; remaining open count of its room.
    Closed(usize),
    /// Clock advanced.
    ClockAdvanced,
    /// Operation failed.
    Error(OperationError),
}

impl OperationResult {
    /// Check if operation succeeded.
    pub fn is_ok(&self) -> bool {
        !self.is_err()
    }

    /// Check if operation failed.
    pub fn is_err(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// Expected errors that can occur during operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationError {
    /// No session is open to target.
    NoSession,
    /// Invalid argument.
    InvalidArgument,
    /// Payload longer than the maximum message length.
    PayloadTooLarge,
    /// Room or session limit reached.
    ResourceExhausted,
    /// Copy across the call boundary failed.
    IoFault,
    /// Unknown control operation.
    UnsupportedOperation,
}

impl From<&ChatError> for OperationError {
    fn from(err: &ChatError) -> Self {
        match err {
            ChatError::InvalidArgument(_) => Self::InvalidArgument,
            ChatError::PayloadTooLarge { .. } => Self::PayloadTooLarge,
            ChatError::ResourceExhausted(_) => Self::ResourceExhausted,
            ChatError::IoFault(_) => Self::IoFault,
            ChatError::UnsupportedOperation(_) => Self::UnsupportedOperation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_classes_cover_the_boundary() {
        let lens: Vec<_> =
            (0..5).map(|size_class| SmallMessage { seed: 1, size_class }.to_bytes().len()).collect();
        assert_eq!(lens, vec![0, 8, 64, 100, 101]);
    }

    #[test]
    fn room_names_are_distinct() {
        assert_eq!(room_name(3).as_str(), "room-3");
        assert_ne!(room_name(1), room_name(2));
    }

    #[test]
    fn chat_errors_classify() {
        let err = ChatError::PayloadTooLarge { size: 101, max: 100 };
        assert_eq!(OperationError::from(&err), OperationError::PayloadTooLarge);
        assert!(OperationResult::Error(OperationError::NoSession).is_err());
        assert!(OperationResult::Opened.is_ok());
    }
}
