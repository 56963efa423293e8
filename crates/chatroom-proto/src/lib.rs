//! Chatroom wire protocol.
//!
//! Defines the fixed-size message record exchanged across the device
//! boundary, the control-operation codes accepted by `ioctl`, and the seek
//! origins accepted by `llseek`. Nothing here performs I/O.
//!
//! # Record layout
//!
//! Every message crosses the boundary as one [`MessageRecord`] of
//! [`MessageRecord::SIZE`] bytes. Reads and writes always move whole records;
//! byte counts that are not a multiple of the record size are floored.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod control;
pub mod errors;
pub mod record;

pub use control::{ControlCode, Whence};
pub use errors::{ProtocolError, Result};
pub use record::{MAX_MESSAGE_LENGTH, MessageRecord};
