//! Simulated environment for deterministic tests.
//!
//! All clones of a [`SimEnv`] share one virtual clock and one seeded RNG.
//! Each clone carries its own sender id, so several writers can be simulated
//! against the same timeline.

use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicI64, Ordering},
};

use chatroom_core::Environment;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Earliest start time picked by [`SimEnv::with_seed`] (2023-11-14T22:13:20Z).
pub const SIM_EPOCH: i64 = 1_700_000_000;

/// Deterministic clock, identity and randomness.
#[derive(Clone, Debug)]
pub struct SimEnv {
    clock: Arc<AtomicI64>,
    rng: Arc<Mutex<ChaCha8Rng>>,
    sender_id: i32,
}

impl SimEnv {
    /// Environment starting at a seed-derived time within a day of
    /// [`SIM_EPOCH`], with sender id 0.
    pub fn with_seed(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let start = SIM_EPOCH + rng.gen_range(0..86_400);

        Self { clock: Arc::new(AtomicI64::new(start)), rng: Arc::new(Mutex::new(rng)), sender_id: 0 }
    }

    /// Environment fixed at `now`, with sender id 0.
    pub fn at(now: i64) -> Self {
        Self {
            clock: Arc::new(AtomicI64::new(now)),
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(0))),
            sender_id: 0,
        }
    }

    /// Clone sharing this clock and RNG but stamping `sender_id`.
    pub fn with_sender(&self, sender_id: i32) -> Self {
        Self { clock: Arc::clone(&self.clock), rng: Arc::clone(&self.rng), sender_id }
    }

    /// Move the shared clock forward by `secs`.
    pub fn advance(&self, secs: i64) {
        self.clock.fetch_add(secs, Ordering::Relaxed);
    }

    /// Random `u64` from the shared seeded RNG.
    pub fn random_u64(&self) -> u64 {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).next_u64()
    }

    /// Random payload of up to `max_len` bytes.
    pub fn random_payload(&self, max_len: usize) -> Vec<u8> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let len = rng.gen_range(0..=max_len);
        let mut payload = vec![0u8; len];
        rng.fill_bytes(&mut payload);
        payload
    }
}

impl Environment for SimEnv {
    fn wall_clock_secs(&self) -> i64 {
        self.clock.load(Ordering::Relaxed)
    }

    fn sender_id(&self) -> i32 {
        self.sender_id
    }
}
