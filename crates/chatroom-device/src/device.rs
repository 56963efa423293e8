//! Character-device entry points over a room registry.
//!
//! Each [`ChatDevice::open`] creates a [`Session`] and files it under a fresh
//! [`Handle`]. The remaining entry points look the handle up and act on its
//! session:
//!
//! - `read` copies whole [`MessageRecord`]s into a writer, never a fraction of
//!   one
//! - `write` pulls at most [`MAX_MESSAGE_LENGTH`] bytes from a reader and
//!   broadcasts them
//! - `ioctl` answers [`ControlCode::CountUnread`]
//! - `llseek` moves the cursor in units of whole records
//! - `release` closes the session
//!
//! # Locking
//!
//! The handle table lock is held only to insert, look up or remove an entry.
//! Operations on one handle are serialized by that handle's own lock, so
//! independent handles never contend with each other. `release` closes the
//! session under that lock, so a call that looked the handle up before the
//! release finds the session closed and fails with
//! [`DeviceError::UnknownHandle`].

#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::HashMap,
    fmt,
    io::{Read, Write},
    sync::{
        Arc, Mutex, MutexGuard, PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use chatroom_core::{
    ChatError, Environment, MAX_MESSAGE_LENGTH, RegistryConfig, RoomRegistry, Session, Whence,
};
use chatroom_proto::{ControlCode, MessageRecord};

use crate::error::DeviceError;

/// Default device name, also used as the room id by the binary.
pub const DEFAULT_DEVICE_NAME: &str = "chat";

/// Device configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Device name, used in log output
    pub name: String,
    /// Room and session limits
    pub registry: RegistryConfig,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self { name: DEFAULT_DEVICE_NAME.to_string(), registry: RegistryConfig::default() }
    }
}

/// Opaque identifier of an open device file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u64);

impl Handle {
    /// Handle from its raw value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw handle value.
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type SharedSession<E> = Arc<Mutex<Session<E>>>;

/// Chat device: handle table and file operations.
///
/// Generic over [`Environment`] so tests can pin the clock and sender id.
pub struct ChatDevice<E: Environment> {
    config: DeviceConfig,
    registry: RoomRegistry,
    env: E,
    handles: RwLock<HashMap<Handle, SharedSession<E>>>,
    next_handle: AtomicU64,
}

impl<E: Environment> ChatDevice<E> {
    /// Create a device with its own empty room registry.
    pub fn new(config: DeviceConfig, env: E) -> Self {
        let registry = RoomRegistry::with_config(config.registry.clone());
        tracing::info!(name = %config.name, "chat device registered");

        Self {
            config,
            registry,
            env,
            handles: RwLock::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Device configuration.
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Room registry behind this device.
    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Open `room`, creating it on first use.
    ///
    /// The new handle's cursor starts at the head of the room's log.
    ///
    /// # Errors
    ///
    /// `ChatError::ResourceExhausted` if the room, session or handle slot
    /// cannot be allocated. Nothing stays open on failure.
    pub fn open(&self, room: &str) -> Result<Handle, DeviceError> {
        let session = Session::open(&self.registry, self.env.clone(), room)?;

        let handle = {
            let mut handles = self.handles.write().unwrap_or_else(PoisonError::into_inner);
            // On failure `session` drops here and closes itself.
            handles.try_reserve(1).map_err(ChatError::from)?;
            let handle = Handle(self.next_handle.fetch_add(1, Ordering::Relaxed));
            handles.insert(handle, Arc::new(Mutex::new(session)));
            handle
        };

        tracing::debug!(
            %handle,
            room_id = room,
            open_count = self.registry.open_count(&room.into()),
            "device opened"
        );
        Ok(handle)
    }

    /// Copy unread records into `dest`, advancing the handle's cursor.
    ///
    /// `max_bytes` is floored to whole records; a buffer smaller than one
    /// record reads nothing. Returns the number of bytes written, always a
    /// multiple of [`MessageRecord::SIZE`]. Zero means nothing new.
    ///
    /// # Errors
    ///
    /// - `DeviceError::UnknownHandle` if `handle` is not open
    /// - `ChatError::InvalidArgument` if `dest` is absent
    /// - `ChatError::IoFault` if writing the first record fails. A failure on
    ///   a later record ends the read with the records already delivered.
    pub fn read<W: Write + ?Sized>(
        &self,
        handle: Handle,
        dest: Option<&mut W>,
        max_bytes: usize,
    ) -> Result<usize, DeviceError> {
        let shared = self.session(handle)?;
        let mut session = live(&shared, handle)?;
        let Some(dest) = dest else {
            return Err(ChatError::InvalidArgument("read buffer is absent".into()).into());
        };

        let max_messages = MessageRecord::records_in(max_bytes);
        let delivered = session.read_into(max_messages, |message| {
            dest.write_all(&message.to_record().to_bytes())
                .map_err(|err| ChatError::IoFault(err.to_string()))
        })?;

        tracing::trace!(%handle, records = delivered, cursor = session.cursor(), "device read");
        Ok(delivered * MessageRecord::SIZE)
    }

    /// Read `count` bytes from `src` and broadcast them as one message.
    ///
    /// Returns the number of bytes accepted. The handle's cursor is not
    /// moved.
    ///
    /// # Errors
    ///
    /// - `DeviceError::UnknownHandle` if `handle` is not open
    /// - `ChatError::PayloadTooLarge` if `count` exceeds
    ///   [`MAX_MESSAGE_LENGTH`]; `src` is not touched
    /// - `ChatError::InvalidArgument` if `src` is absent
    /// - `ChatError::IoFault` if `count` bytes cannot be read from `src`
    /// - `ChatError::ResourceExhausted` if the log cannot grow
    ///
    /// Nothing is appended on error.
    pub fn write<R: Read + ?Sized>(
        &self,
        handle: Handle,
        src: Option<&mut R>,
        count: usize,
    ) -> Result<usize, DeviceError> {
        let shared = self.session(handle)?;
        if count > MAX_MESSAGE_LENGTH {
            tracing::warn!(%handle, count, "write rejected: payload too large");
            return Err(ChatError::PayloadTooLarge { size: count, max: MAX_MESSAGE_LENGTH }.into());
        }
        let Some(src) = src else {
            return Err(ChatError::InvalidArgument("write buffer is absent".into()).into());
        };

        let mut payload = [0u8; MAX_MESSAGE_LENGTH];
        src.read_exact(&mut payload[..count]).map_err(|err| ChatError::IoFault(err.to_string()))?;

        let accepted = live(&shared, handle)?.write(&payload[..count])?;
        tracing::trace!(%handle, accepted, "device write");
        Ok(accepted)
    }

    /// Execute control operation `code`.
    ///
    /// [`ControlCode::CountUnread`] returns the number of messages between
    /// the handle's cursor and the tail.
    ///
    /// # Errors
    ///
    /// - `DeviceError::UnknownHandle` if `handle` is not open
    /// - `ChatError::UnsupportedOperation` for any other code
    pub fn ioctl(&self, handle: Handle, code: u32) -> Result<i64, DeviceError> {
        let shared = self.session(handle)?;
        let session = live(&shared, handle)?;

        match ControlCode::from_u32(code) {
            Some(ControlCode::CountUnread) => {
                let unread = session.count_unread();
                Ok(i64::try_from(unread).unwrap_or(i64::MAX))
            },
            None => {
                tracing::warn!(%handle, code, "unsupported control operation");
                Err(ChatError::UnsupportedOperation(code).into())
            },
        }
    }

    /// Reposition the handle's cursor.
    ///
    /// `offset_bytes` is converted to a message index by flooring to whole
    /// records; the index is clamped to the current tail, and a negative
    /// offset lands on the head. Returns the new position in bytes.
    ///
    /// # Errors
    ///
    /// - `DeviceError::UnknownHandle` if `handle` is not open
    /// - `ChatError::InvalidArgument` unless `whence` is `SEEK_SET`
    pub fn llseek(&self, handle: Handle, offset_bytes: i64, whence: i32) -> Result<i64, DeviceError> {
        let shared = self.session(handle)?;
        let mut session = live(&shared, handle)?;

        let whence = Whence::from_i32(whence)
            .ok_or_else(|| ChatError::InvalidArgument(format!("unknown seek origin {whence}")))?;
        let offset = usize::try_from(offset_bytes).unwrap_or(0);

        let cursor = session.seek(offset / MessageRecord::SIZE, whence)?;
        let position = cursor.saturating_mul(MessageRecord::SIZE);
        Ok(i64::try_from(position).unwrap_or(i64::MAX))
    }

    /// Close `handle`. Returns the room's remaining open count.
    ///
    /// Destroys the room and its log when this was the last open handle on
    /// it. Calls on `handle` still in flight on other threads fail with
    /// `DeviceError::UnknownHandle` once they reach the session.
    ///
    /// # Errors
    ///
    /// `DeviceError::UnknownHandle` if `handle` is not open.
    pub fn release(&self, handle: Handle) -> Result<usize, DeviceError> {
        let shared = self
            .handles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle)
            .ok_or(DeviceError::UnknownHandle(handle))?;

        let remaining = lock(&shared).close_in_place();
        tracing::debug!(%handle, open_count = remaining, "device released");
        Ok(remaining)
    }

    /// Number of handles currently open.
    pub fn open_handles(&self) -> usize {
        self.handles.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Release every open handle. Returns how many were still open.
    pub fn shutdown(&self) -> usize {
        let drained: Vec<_> = {
            let mut handles = self.handles.write().unwrap_or_else(PoisonError::into_inner);
            handles.drain().collect()
        };

        let leaked = drained.len();
        if leaked > 0 {
            tracing::warn!(name = %self.config.name, leaked, "handles still open at shutdown");
        }
        for (_, shared) in drained {
            lock(&shared).close_in_place();
        }

        tracing::info!(name = %self.config.name, "chat device unregistered");
        leaked
    }

    fn session(&self, handle: Handle) -> Result<SharedSession<E>, DeviceError> {
        self.handles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&handle)
            .cloned()
            .ok_or(DeviceError::UnknownHandle(handle))
    }
}

impl<E: Environment> fmt::Debug for ChatDevice<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatDevice")
            .field("name", &self.config.name)
            .field("open_handles", &self.open_handles())
            .finish_non_exhaustive()
    }
}

fn lock<E: Environment>(shared: &SharedSession<E>) -> MutexGuard<'_, Session<E>> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Lock a session looked up by `handle`, unless it was released meanwhile.
fn live<E: Environment>(
    shared: &SharedSession<E>,
    handle: Handle,
) -> Result<MutexGuard<'_, Session<E>>, DeviceError> {
    let session = lock(shared);
    if session.is_closed() {
        return Err(DeviceError::UnknownHandle(handle));
    }
    Ok(session)
}
