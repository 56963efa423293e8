//! Messages and room identifiers.

use std::{fmt, sync::Arc};

use bytes::Bytes;
use chatroom_proto::MessageRecord;
pub use chatroom_proto::MAX_MESSAGE_LENGTH;

use crate::error::ChatError;

/// Stable identifier of a room.
///
/// Cheap to clone; the registry keys rooms by this value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(Arc<str>);

impl RoomId {
    /// Create a room id from any string.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// Room id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RoomId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A timestamped message. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    sender_id: i32,
    timestamp: i64,
    payload: Bytes,
}

impl Message {
    /// Create a message.
    ///
    /// # Errors
    ///
    /// `ChatError::PayloadTooLarge` if the payload exceeds
    /// [`MAX_MESSAGE_LENGTH`].
    pub fn new(sender_id: i32, timestamp: i64, payload: impl Into<Bytes>) -> Result<Self, ChatError> {
        let payload = payload.into();
        if payload.len() > MAX_MESSAGE_LENGTH {
            return Err(ChatError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_MESSAGE_LENGTH,
            });
        }

        Ok(Self { sender_id, timestamp, payload })
    }

    /// Identity of the writer.
    pub fn sender_id(&self) -> i32 {
        self.sender_id
    }

    /// Write time in seconds since the Unix epoch.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Payload bytes exactly as written.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Encode as a fixed-size wire record.
    pub fn to_record(&self) -> MessageRecord {
        debug_assert!(self.payload.len() <= MAX_MESSAGE_LENGTH);

        let mut padded = [0u8; MAX_MESSAGE_LENGTH];
        padded[..self.payload.len()].copy_from_slice(&self.payload);
        MessageRecord::from_padded(self.sender_id, self.timestamp, padded)
    }

    /// Decode from a wire record. Trailing zero padding is dropped.
    pub fn from_record(record: &MessageRecord) -> Self {
        Self {
            sender_id: record.sender_id(),
            timestamp: record.timestamp(),
            payload: Bytes::copy_from_slice(record.payload()),
        }
    }
}
