//! Property-based tests for session and log behavior.
//!
//! These tests verify properties that must hold for all operation sequences:
//! broadcast visibility, cursor independence, log immutability, seek clamping,
//! payload limits and write/read round trips.

use chatroom_core::{ChatError, Environment, MAX_MESSAGE_LENGTH, RoomRegistry, Session, Whence};
use proptest::prelude::*;

#[derive(Clone)]
struct TestEnv {
    sender_id: i32,
    now: i64,
}

impl Environment for TestEnv {
    fn wall_clock_secs(&self) -> i64 {
        self.now
    }

    fn sender_id(&self) -> i32 {
        self.sender_id
    }
}

fn payloads() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 0..=MAX_MESSAGE_LENGTH), 0..40)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: A message written through one session is readable through
    /// every other session on the room, in write order.
    #[test]
    fn prop_broadcast_visibility(from_a in payloads(), from_b in payloads()) {
        let registry = RoomRegistry::new();
        let mut a = Session::open(&registry, TestEnv { sender_id: 1, now: 10 }, "room")?;
        let mut b = Session::open(&registry, TestEnv { sender_id: 2, now: 20 }, "room")?;

        for payload in &from_a {
            a.write(payload)?;
        }
        for payload in &from_b {
            b.write(payload)?;
        }

        let expected: Vec<&[u8]> =
            from_a.iter().chain(from_b.iter()).map(Vec::as_slice).collect();

        let seen_by_a: Vec<_> = a.read(usize::MAX);
        let seen_by_b: Vec<_> = b.read(usize::MAX);
        prop_assert_eq!(&seen_by_a, &seen_by_b);

        let payloads: Vec<&[u8]> = seen_by_a.iter().map(|m| &m.payload()[..]).collect();
        prop_assert_eq!(payloads, expected);
    }

    /// Property: Reading through one session never changes another session's
    /// unread count.
    #[test]
    fn prop_cursor_independence(
        writes in payloads(),
        first_read in 0usize..50,
        second_read in 0usize..50,
    ) {
        let registry = RoomRegistry::new();
        let env = TestEnv { sender_id: 1, now: 0 };
        let mut a = Session::open(&registry, env.clone(), "room")?;
        let b = Session::open(&registry, env, "room")?;

        for payload in &writes {
            a.write(payload)?;
        }

        let before = b.count_unread();
        a.read(first_read);
        a.read(second_read);

        prop_assert_eq!(b.count_unread(), before);
        prop_assert_eq!(b.count_unread(), writes.len());
        prop_assert_eq!(a.count_unread(), writes.len() - a.cursor());
    }

    /// Property: Once appended, the message at a position never changes.
    #[test]
    fn prop_append_only(initial in payloads(), later in payloads()) {
        let registry = RoomRegistry::new();
        let mut session = Session::open(&registry, TestEnv { sender_id: 5, now: 0 }, "room")?;

        for payload in &initial {
            session.write(payload)?;
        }
        let log = session.room().log();
        let snapshot: Vec<_> = (0..log.len()).filter_map(|p| log.at(p)).collect();

        for payload in &later {
            session.write(payload)?;
        }
        session.read(usize::MAX);

        let log = session.room().log();
        for (position, message) in snapshot.iter().enumerate() {
            let current = log.at(position);
            prop_assert_eq!(current.as_ref(), Some(message));
        }
        prop_assert_eq!(log.len(), initial.len() + later.len());
    }

    /// Property: Seeking beyond the tail lands exactly on the tail.
    #[test]
    fn prop_seek_clamps(writes in 0usize..100, index in any::<usize>()) {
        let registry = RoomRegistry::new();
        let mut session = Session::open(&registry, TestEnv { sender_id: 1, now: 0 }, "room")?;
        for _ in 0..writes {
            session.write(b"m")?;
        }

        let cursor = session.seek(index, Whence::Set)?;
        prop_assert_eq!(cursor, index.min(writes));
        prop_assert_eq!(session.count_unread(), writes - cursor);
    }

    /// Property: Payloads up to the limit are accepted; longer ones are
    /// rejected without touching the log.
    #[test]
    fn prop_max_length_enforced(len in 0usize..(MAX_MESSAGE_LENGTH * 2)) {
        let registry = RoomRegistry::new();
        let session = Session::open(&registry, TestEnv { sender_id: 1, now: 0 }, "room")?;
        let payload = vec![b'x'; len];

        let result = session.write(&payload);
        if len <= MAX_MESSAGE_LENGTH {
            prop_assert_eq!(result, Ok(len));
            prop_assert_eq!(session.room().log().len(), 1);
        } else {
            prop_assert_eq!(result, Err(ChatError::PayloadTooLarge { size: len, max: MAX_MESSAGE_LENGTH }));
            prop_assert_eq!(session.room().log().len(), 0);
        }
    }

    /// Property: A write read back from the pre-write tail yields exactly that
    /// message and advances the cursor by one.
    #[test]
    fn prop_round_trip(
        backlog in payloads(),
        payload in prop::collection::vec(any::<u8>(), 0..=MAX_MESSAGE_LENGTH),
        sender_id in any::<i32>(),
        now in any::<i64>(),
    ) {
        let registry = RoomRegistry::new();
        let mut session = Session::open(&registry, TestEnv { sender_id, now }, "room")?;
        for message in &backlog {
            session.write(message)?;
        }

        let tail = session.room().log().len();
        session.seek(tail, Whence::Set)?;
        session.write(&payload)?;

        let messages = session.read(10);
        prop_assert_eq!(messages.len(), 1);
        prop_assert_eq!(messages[0].sender_id(), sender_id);
        prop_assert_eq!(messages[0].timestamp(), now);
        prop_assert_eq!(&messages[0].payload()[..], &payload[..]);
        prop_assert_eq!(session.cursor(), tail + 1);
    }

    /// Property: Open counts always equal the number of live sessions per
    /// room, and rooms vanish with their last session.
    #[test]
    fn prop_refcount_lifecycle(opens in prop::collection::vec(0u8..4, 1..30), closes in any::<prop::sample::Index>()) {
        let registry = RoomRegistry::new();
        let env = TestEnv { sender_id: 1, now: 0 };

        let mut sessions = Vec::new();
        for room in &opens {
            sessions.push(Session::open(&registry, env.clone(), format!("room-{room}"))?);
        }

        let to_close = closes.index(sessions.len() + 1);
        for session in sessions.drain(..to_close) {
            session.close();
        }

        for room in 0u8..4 {
            let id = chatroom_core::RoomId::from(format!("room-{room}"));
            let live = sessions.iter().filter(|s| *s.room_id() == id).count();
            if live == 0 {
                prop_assert!(!registry.contains(&id));
            } else {
                prop_assert_eq!(registry.open_count(&id), Some(live));
            }
        }
        prop_assert_eq!(registry.session_count(), sessions.len());
    }
}
