//! Model-based property tests.
//!
//! These tests generate random operation sequences and verify that the real
//! registry and sessions behave identically to the reference model.
//!
//! # Architecture
//!
//! ```text
//! proptest generates: Vec<Operation>
//!                          │
//!           ┌──────────────┼──────────────┐
//!           ▼              ▼              ▼
//!      ModelWorld    RealWorld      Invariants
//!      (reference)   (registry)     (after each step)
//! ```

use chatroom_core::{Environment, RegistryConfig, RoomRegistry, Session, Whence};
use chatroom_harness::{
    InvariantRegistry, LogHistory, ModelMessage, ModelRoomId, ModelWorld, ObservableState,
    Operation, OperationError, OperationResult, SessionSlot, SimEnv, SmallMessage,
    SystemSnapshot, room_name,
};
use proptest::prelude::*;

/// Real system wrapper that mirrors ModelWorld's interface.
struct RealWorld {
    registry: RoomRegistry,
    env: SimEnv,
    next_sender: i32,
    sessions: Vec<(ModelRoomId, Session<SimEnv>)>,
    history: LogHistory,
}

impl RealWorld {
    fn new(config: RegistryConfig, seed: u64) -> Self {
        Self {
            registry: RoomRegistry::with_config(config),
            env: SimEnv::with_seed(seed),
            next_sender: 1,
            sessions: Vec::new(),
            history: LogHistory::new(),
        }
    }

    fn now(&self) -> i64 {
        self.env.wall_clock_secs()
    }

    fn slot(&self, session: SessionSlot) -> Option<usize> {
        if self.sessions.is_empty() {
            return None;
        }
        Some(session as usize % self.sessions.len())
    }

    fn apply(&mut self, op: &Operation) -> OperationResult {
        match op {
            Operation::Open { room_id } => {
                let env = self.env.with_sender(self.next_sender);
                match Session::open(&self.registry, env, room_name(*room_id)) {
                    Ok(session) => {
                        self.sessions.push((*room_id, session));
                        self.next_sender += 1;
                        OperationResult::Opened
                    },
                    Err(err) => OperationResult::Error(OperationError::from(&err)),
                }
            },
            Operation::Write { session, content } => {
                self.on_session(*session, |s| match s.write(&content.to_bytes()) {
                    Ok(n) => OperationResult::Wrote(n),
                    Err(err) => OperationResult::Error(OperationError::from(&err)),
                })
            },
            Operation::Read { session, max } => self.on_session(*session, |s| {
                OperationResult::Read(s.read(*max as usize).iter().map(ModelMessage::from).collect())
            }),
            Operation::CountUnread { session } => {
                self.on_session(*session, |s| OperationResult::Unread(s.count_unread()))
            },
            Operation::Seek { session, index } => {
                self.on_session(*session, |s| match s.seek(*index as usize, Whence::Set) {
                    Ok(cursor) => OperationResult::Cursor(cursor),
                    Err(err) => OperationResult::Error(OperationError::from(&err)),
                })
            },
            Operation::Close { session } => match self.slot(*session) {
                Some(index) => {
                    let (_, session) = self.sessions.remove(index);
                    OperationResult::Closed(session.close())
                },
                None => OperationResult::Error(OperationError::NoSession),
            },
            Operation::AdvanceClock { secs } => {
                self.env.advance(i64::from(*secs));
                OperationResult::ClockAdvanced
            },
        }
    }

    fn on_session<F>(&mut self, slot: SessionSlot, f: F) -> OperationResult
    where
        F: FnOnce(&mut Session<SimEnv>) -> OperationResult,
    {
        match self.slot(slot) {
            Some(index) => f(&mut self.sessions[index].1),
            None => OperationResult::Error(OperationError::NoSession),
        }
    }

    fn snapshot(&mut self) -> SystemSnapshot {
        SystemSnapshot::capture(&self.registry, self.sessions.iter().map(|(_, session)| session))
            .with_history(&mut self.history)
    }

    fn observable_state(&self) -> ObservableState {
        let mut room_ids: Vec<ModelRoomId> = self.sessions.iter().map(|(id, _)| *id).collect();
        room_ids.sort_unstable();
        room_ids.dedup();

        let rooms = room_ids
            .into_iter()
            .filter_map(|room_id| {
                let room = self.registry.get(&room_name(room_id))?;
                let log = room.log().read_from(0, room.log().len());
                Some((room_id, room.open_count(), log.iter().map(ModelMessage::from).collect()))
            })
            .collect();
        let sessions =
            self.sessions.iter().map(|(room_id, session)| (*room_id, session.cursor())).collect();

        ObservableState { rooms, sessions }
    }
}

/// Small limits so the generated sequences reach them.
fn limits() -> RegistryConfig {
    RegistryConfig { max_rooms: 3, max_sessions: 6 }
}

/// Strategy for generating SmallMessage.
fn small_message_strategy() -> impl Strategy<Value = SmallMessage> {
    (any::<u8>(), any::<u8>()).prop_map(|(seed, size_class)| SmallMessage { seed, size_class })
}

/// Strategy for generating operations over a handful of rooms.
fn operation_strategy() -> impl Strategy<Value = Operation> {
    let room_id = 0..4u8;
    let session = any::<SessionSlot>();

    prop_oneof![
        // Weight towards more interesting operations
        3 => room_id.prop_map(|room_id| Operation::Open { room_id }),
        5 => (session.clone(), small_message_strategy())
            .prop_map(|(session, content)| Operation::Write { session, content }),
        3 => (session.clone(), 0..8u8).prop_map(|(session, max)| Operation::Read { session, max }),
        1 => session.clone().prop_map(|session| Operation::CountUnread { session }),
        1 => (session.clone(), 0..16u8)
            .prop_map(|(session, index)| Operation::Seek { session, index }),
        2 => session.prop_map(|session| Operation::Close { session }),
        1 => (1..60u8).prop_map(|secs| Operation::AdvanceClock { secs }),
    ]
}

proptest! {
    /// Verify that operation results match between model and real implementation.
    ///
    /// This is the core model-based test. Results must be identical at every
    /// step, invariants must hold after every step, and the final observable
    /// states must agree.
    #[test]
    fn prop_model_matches_real(
        seed in any::<u64>(),
        ops in prop::collection::vec(operation_strategy(), 0..80)
    ) {
        let mut real = RealWorld::new(limits(), seed);
        let mut model = ModelWorld::new(limits(), real.now());
        let invariants = InvariantRegistry::standard();

        for (i, op) in ops.iter().enumerate() {
            let model_result = model.apply(op);
            let real_result = real.apply(op);

            prop_assert_eq!(
                &model_result,
                &real_result,
                "Divergence at operation {}: {:?}",
                i, op
            );

            let snapshot = real.snapshot();
            if let Err(violations) = invariants.check_all(&snapshot) {
                prop_assert!(false, "Invariant violation after {:?}: {:?}", op, violations);
            }
        }

        prop_assert_eq!(model.observable_state(), real.observable_state());
        prop_assert_eq!(real.registry.room_count(), model.observable_state().rooms.len());
    }

    /// Verify every session eventually closes cleanly.
    #[test]
    fn prop_closing_everything_empties_registry(
        seed in any::<u64>(),
        ops in prop::collection::vec(operation_strategy(), 0..60)
    ) {
        let mut real = RealWorld::new(limits(), seed);
        for op in &ops {
            real.apply(op);
        }

        while !real.sessions.is_empty() {
            let result = real.apply(&Operation::Close { session: 0 });
            prop_assert!(matches!(result, OperationResult::Closed(_)));
        }

        prop_assert_eq!(real.registry.room_count(), 0);
        prop_assert_eq!(real.registry.session_count(), 0);
    }

    /// Verify writes are stamped with the writer's sender id and the clock.
    #[test]
    fn prop_messages_carry_sender_and_clock(
        seed in any::<u64>(),
        writers in 1..5usize,
        secs in 0..120u8,
    ) {
        let mut real = RealWorld::new(RegistryConfig::default(), seed);
        for _ in 0..writers {
            real.apply(&Operation::Open { room_id: 0 });
        }
        real.apply(&Operation::AdvanceClock { secs });
        let now = real.now();

        for slot in 0..writers {
            let content = SmallMessage { seed: slot as u8, size_class: 1 };
            real.apply(&Operation::Write { session: slot as u8, content });
        }

        let OperationResult::Read(messages) = real.apply(&Operation::Read { session: 0, max: 255 })
        else {
            return Err(TestCaseError::fail("read failed"));
        };
        prop_assert_eq!(messages.len(), writers);
        for (slot, message) in messages.iter().enumerate() {
            prop_assert_eq!(message.sender_id, slot as i32 + 1);
            prop_assert_eq!(message.timestamp, now);
        }
    }
}
