//! Standard invariant checks.
//!
//! These invariants capture properties of the registry and its sessions that
//! must hold after every operation.

use std::collections::BTreeMap;

use super::{Invariant, InvariantResult, SystemSnapshot, Violation};

/// Each room's open count equals the number of sessions open on it.
///
/// Also checks that every session's room is live and that the registry's
/// session counter matches. A mismatch means an open or close was lost, so
/// a room would outlive its last session or die under a live one.
pub struct OpenCountMatchesSessions;

impl Invariant for OpenCountMatchesSessions {
    fn name(&self) -> &'static str {
        "open_count_matches_sessions"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let mut per_room: BTreeMap<&str, usize> = BTreeMap::new();
        for session in &state.sessions {
            *per_room.entry(session.room_id.as_str()).or_default() += 1;
        }

        for (room_id, &sessions) in &per_room {
            let Some(room) = state.room(room_id) else {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("{sessions} session(s) open on destroyed room {room_id}"),
                });
            };
            if room.open_count != sessions {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "room {room_id}: open_count {} but {sessions} session(s) open",
                        room.open_count
                    ),
                });
            }
        }

        if state.session_count != state.sessions.len() {
            return Err(Violation {
                invariant: self.name(),
                message: format!(
                    "registry counts {} sessions but {} are open",
                    state.session_count,
                    state.sessions.len()
                ),
            });
        }
        Ok(())
    }
}

/// Rooms leave the registry when their last session closes.
pub struct LiveRoomsAreOpen;

impl Invariant for LiveRoomsAreOpen {
    fn name(&self) -> &'static str {
        "live_rooms_are_open"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        match state.rooms.iter().find(|room| room.open_count == 0) {
            Some(room) => Err(Violation {
                invariant: self.name(),
                message: format!("room {} is live with open_count 0", room.id),
            }),
            None => Ok(()),
        }
    }
}

/// A cursor never points past the end of its room's log.
pub struct CursorWithinLog;

impl Invariant for CursorWithinLog {
    fn name(&self) -> &'static str {
        "cursor_within_log"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for (slot, session) in state.sessions.iter().enumerate() {
            let log_len = state.room(&session.room_id).map_or(0, |room| room.log_len);
            if session.cursor > log_len {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "session {slot} on {}: cursor {} beyond log length {log_len}",
                        session.room_id, session.cursor
                    ),
                });
            }
        }
        Ok(())
    }
}

/// A live room's log length never decreases.
pub struct LogMonotonicity;

impl Invariant for LogMonotonicity {
    fn name(&self) -> &'static str {
        "log_monotonicity"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for (room_id, history) in &state.log_history {
            for window in history.windows(2) {
                if window[1] < window[0] {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!(
                            "room {room_id}: log length decreased {} -> {}",
                            window[0], window[1]
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}
