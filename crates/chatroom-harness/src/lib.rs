//! Deterministic test harness for chatroom rooms and sessions.
//!
//! [`SimEnv`] replaces the system clock and process identity with values the
//! test controls, so message stamps are reproducible.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation. Operations are
//! applied to both [`ModelWorld`] and the real registry, and their results
//! and observable states are compared.
//!
//! # Invariant Testing
//!
//! The `invariants` module checks properties that must hold after every
//! operation, whatever the history. Use [`InvariantRegistry::standard()`] for
//! the registry/session invariants.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod model;
pub mod sim_env;

pub use invariants::{
    CursorWithinLog, Invariant, InvariantRegistry, InvariantResult, LiveRoomsAreOpen,
    LogHistory, LogMonotonicity, OpenCountMatchesSessions, RoomState, SessionState,
    SystemSnapshot, Violation,
};
pub use model::{
    ModelMessage, ModelRoom, ModelRoomId, ModelSession, ModelWorld, ObservableState, Operation,
    OperationError, OperationResult, SessionSlot, SmallMessage, room_name,
};
pub use sim_env::SimEnv;
