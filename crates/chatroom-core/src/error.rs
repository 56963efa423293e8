//! Error taxonomy for chatroom operations.
//!
//! Every failure surfaces synchronously as one of five kinds. None of them
//! are retried internally; the caller decides.

use chatroom_proto::ProtocolError;
use thiserror::Error;

/// `EINVAL`
const EINVAL: i32 = 22;
/// `ENOSPC`
const ENOSPC: i32 = 28;
/// `ENOMEM`
const ENOMEM: i32 = 12;
/// `EFAULT`
const EFAULT: i32 = 14;
/// `ENOTTY`
const ENOTTY: i32 = 25;

/// Errors returned by registry, session and device operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// Missing or unreadable buffer, unknown handle, or unsupported seek mode.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Write payload exceeds the maximum message length.
    #[error("payload too large: {size} bytes exceeds maximum {max}")]
    PayloadTooLarge {
        /// Payload length supplied by the caller
        size: usize,
        /// Maximum accepted payload length
        max: usize,
    },

    /// A room, log block or session could not be allocated.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Transferring bytes across the call boundary failed.
    #[error("I/O fault: {0}")]
    IoFault(String),

    /// Unrecognized control-operation code.
    #[error("unsupported operation: {0:#06x}")]
    UnsupportedOperation(u32),
}

impl ChatError {
    /// Positive errno value reported by the device entry points for this error.
    pub fn errno(&self) -> i32 {
        match self {
            Self::InvalidArgument(_) => EINVAL,
            Self::PayloadTooLarge { .. } => ENOSPC,
            Self::ResourceExhausted(_) => ENOMEM,
            Self::IoFault(_) => EFAULT,
            Self::UnsupportedOperation(_) => ENOTTY,
        }
    }
}

impl From<ProtocolError> for ChatError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::PayloadTooLarge { size, max } => Self::PayloadTooLarge { size, max },
            ProtocolError::BufferTooShort { .. } => Self::InvalidArgument(err.to_string()),
        }
    }
}

impl From<std::collections::TryReserveError> for ChatError {
    fn from(err: std::collections::TryReserveError) -> Self {
        Self::ResourceExhausted(err.to_string())
    }
}
