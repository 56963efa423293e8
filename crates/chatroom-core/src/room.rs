//! Room: one broadcast channel and its shared log.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{log::MessageLog, message::RoomId};

/// A broadcast channel shared by every session opened on its id.
///
/// Owns its [`MessageLog`] exclusively. `open_count` is only mutated by the
/// registry while it holds the registry lock, so the transition to zero and
/// the removal of the room happen in one critical section.
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    log: MessageLog,
    open_count: AtomicUsize,
}

impl Room {
    /// New room with an empty log and one open reference.
    pub(crate) fn new(id: RoomId) -> Self {
        Self { id, log: MessageLog::new(), open_count: AtomicUsize::new(1) }
    }

    /// Room identifier.
    pub fn id(&self) -> &RoomId {
        &self.id
    }

    /// Shared message log.
    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    /// Number of open sessions referencing this room.
    pub fn open_count(&self) -> usize {
        self.open_count.load(Ordering::Acquire)
    }

    /// Add one reference. Returns the new count.
    pub(crate) fn acquire(&self) -> usize {
        self.open_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Drop one reference. Returns the remaining count.
    ///
    /// `None` if the count was already zero, which means a close without a
    /// matching open.
    pub(crate) fn release(&self) -> Option<usize> {
        self.open_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| count.checked_sub(1))
            .ok()
            .map(|previous| previous - 1)
    }
}
