//! Append-only message log.
//!
//! The log is a directory of fixed-size blocks, each holding write-once
//! slots. A message's position is a plain index (`block * BLOCK_CAPACITY +
//! slot`), so cursors are integers and stay valid for the life of the log.
//!
//! # Concurrency
//!
//! - Appends are serialized by the append lock. The critical section fills one
//!   slot (allocating a block every `BLOCK_CAPACITY` appends) and publishes the
//!   new length with `Release` ordering.
//! - Readers load the length with `Acquire` ordering and never touch the
//!   append lock. The block directory's read lock is only contended while a
//!   new block is being linked in.
//! - Slots are never cleared, so a range snapshot taken before an append still
//!   sees the same prefix afterward.

#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::sync::{
    Arc, Mutex, OnceLock, PoisonError, RwLock,
    atomic::{AtomicUsize, Ordering},
};

use crate::{error::ChatError, message::Message};

/// Number of message slots per block.
pub const BLOCK_CAPACITY: usize = 64;

/// Fixed-size run of write-once message slots.
struct Block {
    slots: Box<[OnceLock<Message>]>,
}

impl Block {
    fn try_new() -> Result<Self, ChatError> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(BLOCK_CAPACITY)?;
        slots.resize_with(BLOCK_CAPACITY, OnceLock::new);
        Ok(Self { slots: slots.into_boxed_slice() })
    }

    fn get(&self, slot: usize) -> Option<&Message> {
        self.slots.get(slot).and_then(OnceLock::get)
    }
}

/// Append-side state, guarded by the append lock.
#[derive(Default)]
struct Tail {
    /// Block currently receiving appends
    block: Option<Arc<Block>>,
}

/// Append-only, index-addressed sequence of messages for one room.
///
/// Positions are 0-based. `len()` only grows.
pub struct MessageLog {
    /// Block directory, in position order
    blocks: RwLock<Vec<Arc<Block>>>,
    /// Number of published messages
    len: AtomicUsize,
    /// Serializes appenders
    tail: Mutex<Tail>,
}

impl MessageLog {
    /// Create an empty log. Allocates nothing until the first append.
    pub fn new() -> Self {
        Self {
            blocks: RwLock::new(Vec::new()),
            len: AtomicUsize::new(0),
            tail: Mutex::new(Tail::default()),
        }
    }

    /// Append a message at the tail and return its position.
    ///
    /// Either the message is fully published or nothing changes.
    ///
    /// # Errors
    ///
    /// `ChatError::ResourceExhausted` if a new block cannot be allocated.
    pub fn append(&self, message: Message) -> Result<usize, ChatError> {
        let mut tail = self.tail.lock().unwrap_or_else(PoisonError::into_inner);

        // Only appenders write `len`, and they hold the tail lock.
        let position = self.len.load(Ordering::Relaxed);
        let slot = position % BLOCK_CAPACITY;

        let current = if slot == 0 { None } else { tail.block.clone() };
        let block = match current {
            Some(block) => block,
            None => {
                let block = Arc::new(Block::try_new()?);
                let mut blocks = self.blocks.write().unwrap_or_else(PoisonError::into_inner);
                blocks.try_reserve(1)?;
                debug_assert_eq!(blocks.len(), position / BLOCK_CAPACITY);
                blocks.push(Arc::clone(&block));
                tail.block = Some(Arc::clone(&block));
                block
            },
        };

        let stored = block.slots[slot].set(message);
        debug_assert!(stored.is_ok(), "invariant: slot {position} is written once");

        self.len.store(position + 1, Ordering::Release);
        Ok(position)
    }

    /// Message at `position`. `None` at or beyond the tail.
    pub fn at(&self, position: usize) -> Option<Message> {
        if position >= self.len() {
            return None;
        }

        let blocks = self.blocks.read().unwrap_or_else(PoisonError::into_inner);
        blocks.get(position / BLOCK_CAPACITY)?.get(position % BLOCK_CAPACITY).cloned()
    }

    /// Number of published messages.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Whether no message has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of up to `max` messages starting at `start`.
    ///
    /// The range is bounded by the length observed at call time; appends that
    /// land afterwards are not included. An empty range is returned when
    /// `start` is at or beyond the tail.
    pub fn range(&self, start: usize, max: usize) -> LogRange {
        let end = self.len().min(start.saturating_add(max));
        if start >= end {
            return LogRange { blocks: Vec::new(), first_block: 0, next: start, end: start };
        }

        let first_block = start / BLOCK_CAPACITY;
        let last_block = (end - 1) / BLOCK_CAPACITY;
        let blocks = self.blocks.read().unwrap_or_else(PoisonError::into_inner);
        let blocks = blocks[first_block..=last_block].to_vec();

        LogRange { blocks, first_block, next: start, end }
    }

    /// Collect up to `max` messages starting at `start`.
    pub fn read_from(&self, start: usize, max: usize) -> Vec<Message> {
        self.range(start, max).collect()
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MessageLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageLog").field("len", &self.len()).finish_non_exhaustive()
    }
}

/// Forward iterator over a snapshot of log positions.
///
/// Holds its own references to the blocks it covers, so it stays valid
/// without any lock held.
pub struct LogRange {
    blocks: Vec<Arc<Block>>,
    first_block: usize,
    next: usize,
    end: usize,
}

impl LogRange {
    /// Position of the next message this range will yield.
    pub fn position(&self) -> usize {
        self.next
    }
}

impl Iterator for LogRange {
    type Item = Message;

    fn next(&mut self) -> Option<Message> {
        if self.next >= self.end {
            return None;
        }

        let block = self.blocks.get(self.next / BLOCK_CAPACITY - self.first_block)?;
        let message = block.get(self.next % BLOCK_CAPACITY)?.clone();
        self.next += 1;
        Some(message)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for LogRange {}
