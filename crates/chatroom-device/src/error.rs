//! Device error types.
//!
//! Every entry point reports failures as a [`DeviceError`]. `errno()` gives
//! the positive errno value a character device would return for it.

use chatroom_core::ChatError;
use thiserror::Error;

use crate::device::Handle;

/// `EINVAL`
const EINVAL: i32 = 22;

/// Errors returned by device entry points.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Handle was never opened on this device or has been released.
    #[error("unknown handle: {0}")]
    UnknownHandle(Handle),

    /// Room, session or transfer failure.
    #[error(transparent)]
    Chat(#[from] ChatError),
}

impl DeviceError {
    /// Positive errno value for this error.
    ///
    /// Unknown handles report `EINVAL`, like any other invalid argument.
    pub fn errno(&self) -> i32 {
        match self {
            Self::UnknownHandle(_) => EINVAL,
            Self::Chat(err) => err.errno(),
        }
    }
}
