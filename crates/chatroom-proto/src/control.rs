//! Control-operation codes and seek origins.
//!
//! Control codes follow the Linux `_IO(type, nr)` encoding so the values
//! match what a C client passes to `ioctl(2)`.

/// `ioctl` magic (type) byte shared by all chatroom control codes.
pub const CONTROL_MAGIC: u8 = b'r';

/// Encode a no-argument control code (`_IO(type, nr)`).
const fn io(kind: u8, nr: u8) -> u32 {
    ((kind as u32) << 8) | nr as u32
}

/// Recognized control operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlCode {
    /// Number of messages between the caller's cursor and the log tail.
    CountUnread,
}

impl ControlCode {
    /// Raw code for [`ControlCode::CountUnread`] (`_IO('r', 0)`).
    pub const COUNT_UNREAD: u32 = io(CONTROL_MAGIC, 0);

    /// Decode a raw control code. `None` if unrecognized.
    #[must_use]
    pub fn from_u32(code: u32) -> Option<Self> {
        match code {
            Self::COUNT_UNREAD => Some(Self::CountUnread),
            _ => None,
        }
    }

    /// Raw control code.
    #[must_use]
    pub fn to_u32(self) -> u32 {
        match self {
            Self::CountUnread => Self::COUNT_UNREAD,
        }
    }
}

/// Seek origin, using the `lseek(2)` whence numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Whence {
    /// Offset is absolute from the first message (`SEEK_SET`).
    Set,
    /// Offset is relative to the current cursor (`SEEK_CUR`).
    Current,
    /// Offset is relative to the log tail (`SEEK_END`).
    End,
}

impl Whence {
    /// Decode a raw whence value. `None` if unrecognized.
    #[must_use]
    pub fn from_i32(whence: i32) -> Option<Self> {
        match whence {
            0 => Some(Self::Set),
            1 => Some(Self::Current),
            2 => Some(Self::End),
            _ => None,
        }
    }

    /// Raw whence value.
    #[must_use]
    pub fn to_i32(self) -> i32 {
        match self {
            Self::Set => 0,
            Self::Current => 1,
            Self::End => 2,
        }
    }
}
