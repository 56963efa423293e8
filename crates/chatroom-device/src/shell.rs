//! Line commands driving a [`ChatDevice`].
//!
//! One command per line, words separated by whitespace:
//!
//! ```text
//! open <room>            open a handle on <room>
//! write <handle> <text>  broadcast <text> (rest of the line)
//! read <handle> [max]    read up to [max] messages (default 10)
//! unread <handle>        count unread messages
//! seek <handle> <index>  move the cursor to message <index>
//! close <handle>         release the handle
//! stats                  room, session and message totals
//! quit                   release everything and exit
//! ```

use chatroom_core::{ChatError, Environment};
use chatroom_proto::{ControlCode, MessageRecord, Whence};
use thiserror::Error;

use crate::{
    device::{ChatDevice, Handle},
    error::DeviceError,
};

/// Messages returned by `read` when no maximum is given.
pub const DEFAULT_READ_MAX: usize = 10;

/// Parsed shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open a handle on a room.
    Open {
        /// Room to open
        room: String,
    },
    /// Broadcast a line of text.
    Write {
        /// Handle to write through
        handle: Handle,
        /// Message text
        text: String,
    },
    /// Read unread messages.
    Read {
        /// Handle to read from
        handle: Handle,
        /// Maximum number of messages
        max: usize,
    },
    /// Count unread messages.
    Unread {
        /// Handle to query
        handle: Handle,
    },
    /// Move the cursor.
    Seek {
        /// Handle to reposition
        handle: Handle,
        /// Target message index
        index: usize,
    },
    /// Release a handle.
    Close {
        /// Handle to release
        handle: Handle,
    },
    /// Registry totals.
    Stats,
    /// Release everything and stop.
    Quit,
}

/// Errors from parsing or executing a shell command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShellError {
    /// Line did not start with a known command.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Command is missing an argument.
    #[error("usage: {0}")]
    Usage(&'static str),

    /// Argument is not a valid number.
    #[error("invalid number: {0}")]
    InvalidNumber(String),

    /// Device operation failed.
    #[error("{0} (errno {errno})", errno = .0.errno())]
    Device(#[from] DeviceError),
}

impl Command {
    /// Parse one input line. `Ok(None)` for blank lines.
    pub fn parse(line: &str) -> Result<Option<Self>, ShellError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (name, rest) = split_word(line);
        let command = match name {
            "open" => {
                let (room, _) = split_word(rest);
                if room.is_empty() {
                    return Err(ShellError::Usage("open <room>"));
                }
                Self::Open { room: room.to_string() }
            },
            "write" => {
                let (handle, text) = split_word(rest);
                let handle = parse_handle(handle, "write <handle> <text>")?;
                Self::Write { handle, text: text.to_string() }
            },
            "read" => {
                let (handle, max) = split_word(rest);
                let handle = parse_handle(handle, "read <handle> [max]")?;
                let max = if max.is_empty() { DEFAULT_READ_MAX } else { parse_number(max)? };
                Self::Read { handle, max }
            },
            "unread" => Self::Unread { handle: parse_handle(rest, "unread <handle>")? },
            "seek" => {
                let (handle, index) = split_word(rest);
                let handle = parse_handle(handle, "seek <handle> <index>")?;
                if index.is_empty() {
                    return Err(ShellError::Usage("seek <handle> <index>"));
                }
                Self::Seek { handle, index: parse_number(index)? }
            },
            "close" => Self::Close { handle: parse_handle(rest, "close <handle>")? },
            "stats" => Self::Stats,
            "quit" | "q" => Self::Quit,
            other => return Err(ShellError::UnknownCommand(other.to_string())),
        };

        Ok(Some(command))
    }
}

/// Executes commands against a device and renders replies as text lines.
#[derive(Debug)]
pub struct Shell<E: Environment> {
    device: ChatDevice<E>,
}

impl<E: Environment> Shell<E> {
    /// Create a shell over `device`.
    pub fn new(device: ChatDevice<E>) -> Self {
        Self { device }
    }

    /// Device driven by this shell.
    pub fn device(&self) -> &ChatDevice<E> {
        &self.device
    }

    /// Execute `command` and return the reply lines.
    pub fn execute(&self, command: &Command) -> Result<Vec<String>, ShellError> {
        let lines = match command {
            Command::Open { room } => {
                let handle = self.device.open(room)?;
                vec![format!("opened {room} as {handle}")]
            },
            Command::Write { handle, text } => {
                let mut src = text.as_bytes();
                let accepted = self.device.write(*handle, Some(&mut src), text.len())?;
                vec![format!("wrote {accepted} bytes")]
            },
            Command::Read { handle, max } => {
                let mut dest = Vec::new();
                let max_bytes = max.saturating_mul(MessageRecord::SIZE);
                self.device.read(*handle, Some(&mut dest), max_bytes)?;

                let mut lines = Vec::new();
                for chunk in dest.chunks_exact(MessageRecord::SIZE) {
                    let record = MessageRecord::from_bytes(chunk)
                        .map_err(|err| DeviceError::from(ChatError::from(err)))?;
                    lines.push(render(record));
                }
                if lines.is_empty() {
                    lines.push("no new messages".to_string());
                }
                lines
            },
            Command::Unread { handle } => {
                let unread = self.device.ioctl(*handle, ControlCode::COUNT_UNREAD)?;
                vec![format!("{unread} unread")]
            },
            Command::Seek { handle, index } => {
                let offset = index.saturating_mul(MessageRecord::SIZE);
                let offset = i64::try_from(offset).unwrap_or(i64::MAX);
                let position = self.device.llseek(*handle, offset, Whence::Set.to_i32())?;
                let cursor = position / MessageRecord::SIZE as i64;
                vec![format!("cursor at {cursor}")]
            },
            Command::Close { handle } => {
                let remaining = self.device.release(*handle)?;
                vec![format!("closed {handle}, {remaining} still open on room")]
            },
            Command::Stats => {
                let stats = self.device.registry().stats();
                let mut lines = vec![format!(
                    "rooms={} sessions={} messages={}",
                    stats.rooms, stats.sessions, stats.messages
                )];
                for room in self.device.registry().snapshot() {
                    lines.push(format!(
                        "  {}: open={} messages={}",
                        room.id, room.open_count, room.log_len
                    ));
                }
                lines
            },
            Command::Quit => {
                let leaked = self.device.shutdown();
                vec![format!("released {leaked} open handles")]
            },
        };

        Ok(lines)
    }
}

fn render(record: &MessageRecord) -> String {
    format!(
        "[{}] {}: {}",
        record.timestamp(),
        record.sender_id(),
        String::from_utf8_lossy(record.payload())
    )
}

fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (input, ""),
    }
}

fn parse_handle(word: &str, usage: &'static str) -> Result<Handle, ShellError> {
    let (word, _) = split_word(word);
    if word.is_empty() {
        return Err(ShellError::Usage(usage));
    }
    Ok(Handle::from_raw(parse_number(word)?))
}

fn parse_number<T: std::str::FromStr>(word: &str) -> Result<T, ShellError> {
    word.trim().parse().map_err(|_| ShellError::InvalidNumber(word.to_string()))
}
