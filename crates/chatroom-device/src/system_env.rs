//! Production environment using the system clock and process identity.
//!
//! `SystemEnv` stamps messages with the wall-clock time in whole seconds and
//! the current process id, matching what a device driver sees for the
//! calling task.

use std::time::{SystemTime, UNIX_EPOCH};

use chatroom_core::Environment;

/// Production environment: system time and process id.
#[derive(Clone, Debug, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    #[allow(clippy::disallowed_methods)]
    fn wall_clock_secs(&self) -> i64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => elapsed.as_secs() as i64,
            Err(err) => -(err.duration().as_secs() as i64),
        }
    }

    fn sender_id(&self) -> i32 {
        std::process::id() as i32
    }
}
