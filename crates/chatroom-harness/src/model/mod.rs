//! Reference model for model-based testing.
//!
//! The model keeps rooms as plain vectors and sessions as (room, cursor)
//! pairs. Tests apply the same [`Operation`] sequence to the model and to the
//! real registry and compare results step by step.

mod operation;
mod world;

pub use operation::{
    ModelRoomId, Operation, OperationError, OperationResult, SessionSlot, SmallMessage, room_name,
};
pub use world::{ModelMessage, ModelRoom, ModelSession, ModelWorld, ObservableState};
