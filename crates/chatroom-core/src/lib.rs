//! Chatroom core: rooms, shared message logs and per-session cursors.
//!
//! A room is an independent broadcast channel holding one append-only
//! [`MessageLog`]. Every [`Session`] opened on a room shares that log but keeps
//! its own cursor, so a write reaches all current and future readers while
//! each reader consumes at its own pace.
//!
//! # Architecture
//!
//! ```text
//! RoomRegistry ──owns──▶ Room ──owns──▶ MessageLog
//!      ▲                  ▲
//!      │ open/close       │ shared (Arc)
//!      └──── Session ─────┘  + private cursor
//! ```
//!
//! - [`RoomRegistry`] creates a room on the first open of its id and destroys
//!   it when the last session closes. One registry per service instance.
//! - [`MessageLog`] is an index-addressed block arena. Appends are serialized
//!   per log; readers only take an acquire snapshot of the length.
//! - [`Session`] pairs a room reference with a cursor. Dropping a session
//!   closes it.
//! - [`Environment`] supplies the sender identity and timestamp stamped onto
//!   each message.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod env;
pub mod error;
pub mod log;
pub mod message;
pub mod registry;
pub mod room;
pub mod session;

pub use chatroom_proto::Whence;
pub use env::Environment;
pub use error::ChatError;
pub use log::{LogRange, MessageLog};
pub use message::{MAX_MESSAGE_LENGTH, Message, RoomId};
pub use registry::{RegistryConfig, RegistryStats, RoomRegistry, RoomSnapshot};
pub use room::Room;
pub use session::Session;
