//! Chatroom device entry points.
//!
//! Exposes rooms through the operations of a character device: `open`,
//! `read`, `write`, `ioctl`, `llseek` and `release`. Each open produces a
//! [`Handle`] owning one [`chatroom_core::Session`]; reads and writes move
//! whole [`chatroom_proto::MessageRecord`]s across the boundary.
//!
//! # Components
//!
//! - [`ChatDevice`]: handle table and file operations over a room registry
//! - [`DeviceConfig`]: device name and registry limits
//! - [`DeviceError`]: failures with their errno values
//! - [`SystemEnv`]: production clock and identity (system time, process id)
//! - [`shell`]: line commands driving a device, used by the binary

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod device;
mod error;
pub mod shell;
mod system_env;

pub use device::{ChatDevice, DEFAULT_DEVICE_NAME, DeviceConfig, Handle};
pub use error::DeviceError;
pub use system_env::SystemEnv;
