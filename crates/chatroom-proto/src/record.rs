//! Fixed-size message record with zero-copy parsing.
//!
//! `MessageRecord` mirrors the C layout of a chat message on LP64 targets:
//! a 32-bit sender id, four bytes of alignment padding, a 64-bit timestamp in
//! seconds, a 100-byte zero-padded payload and four bytes of tail padding.
//! Integers are little-endian. Padding bytes are always written as zero.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::{ProtocolError, Result};

/// Maximum number of payload bytes carried by a single message.
pub const MAX_MESSAGE_LENGTH: usize = 100;

/// Fixed 120-byte message record (little-endian, C layout).
///
/// Fields are stored as raw byte arrays so the struct has alignment 1 and no
/// implicit padding; every 120-byte pattern is a valid record, which lets
/// callers cast untrusted buffers without copying.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct MessageRecord {
    sender_id: [u8; 4], // i32 sender identity (writer process id)
    _pad0: [u8; 4],     // alignment of the timestamp field
    timestamp: [u8; 8], // i64 seconds since the Unix epoch
    payload: [u8; MAX_MESSAGE_LENGTH],
    _pad1: [u8; 4], // struct tail padding to 8-byte alignment
}

impl MessageRecord {
    /// Size of one serialized record (120 bytes).
    pub const SIZE: usize = 120;

    /// Build a record, zero-padding the payload.
    ///
    /// # Errors
    ///
    /// `ProtocolError::PayloadTooLarge` if `payload` is longer than
    /// [`MAX_MESSAGE_LENGTH`].
    pub fn new(sender_id: i32, timestamp: i64, payload: &[u8]) -> Result<Self> {
        if payload.len() > MAX_MESSAGE_LENGTH {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_MESSAGE_LENGTH,
            });
        }

        let mut padded = [0u8; MAX_MESSAGE_LENGTH];
        padded[..payload.len()].copy_from_slice(payload);

        Ok(Self::from_padded(sender_id, timestamp, padded))
    }

    /// Build a record from an already padded payload field.
    #[must_use]
    pub const fn from_padded(
        sender_id: i32,
        timestamp: i64,
        payload: [u8; MAX_MESSAGE_LENGTH],
    ) -> Self {
        Self {
            sender_id: sender_id.to_le_bytes(),
            _pad0: [0; 4],
            timestamp: timestamp.to_le_bytes(),
            payload,
            _pad1: [0; 4],
        }
    }

    /// Parse a record from the front of `bytes` (zero-copy).
    ///
    /// Trailing bytes beyond the first record are ignored.
    ///
    /// # Errors
    ///
    /// `ProtocolError::BufferTooShort` if fewer than [`Self::SIZE`] bytes are
    /// available.
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(bytes)
            .map(|(record, _rest)| record)
            .map_err(|_| ProtocolError::BufferTooShort { expected: Self::SIZE, actual: bytes.len() })
    }

    /// Serialize the record.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(IntoBytes::as_bytes(self));
        arr
    }

    /// Sender identity stamped at write time.
    #[must_use]
    pub fn sender_id(&self) -> i32 {
        i32::from_le_bytes(self.sender_id)
    }

    /// Write timestamp in seconds.
    #[must_use]
    pub fn timestamp(&self) -> i64 {
        i64::from_le_bytes(self.timestamp)
    }

    /// Full zero-padded payload field.
    #[must_use]
    pub fn payload_bytes(&self) -> &[u8; MAX_MESSAGE_LENGTH] {
        &self.payload
    }

    /// Payload with trailing zero padding removed.
    ///
    /// Payloads that legitimately end in zero bytes lose them here; the
    /// record carries no explicit length.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        let end = self.payload.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        &self.payload[..end]
    }

    /// Number of whole records that fit in `len` bytes.
    #[must_use]
    pub const fn records_in(len: usize) -> usize {
        len / Self::SIZE
    }
}

impl std::fmt::Debug for MessageRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageRecord")
            .field("sender_id", &self.sender_id())
            .field("timestamp", &self.timestamp())
            .field("payload", &String::from_utf8_lossy(self.payload()))
            .finish()
    }
}

const _: () = assert!(std::mem::size_of::<MessageRecord>() == MessageRecord::SIZE);
