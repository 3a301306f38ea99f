//! The game's persisted pseudo-random generator.
//!
//! A 56-slot additive lagged generator. Its whole internal state is saved
//! and restored so a reloaded game continues the exact same stream.
//! Fresh states are seeded from a `Pcg64Mcg` stream; nothing here reads a
//! platform RNG.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;
use serde::{Deserialize, Serialize};

pub const STATE_LEN: usize = 56;
/// Lag between the two taps. `k` starts this far ahead of `j`.
const TAP_DISTANCE: usize = 24;
/// Table words per `random.tableN` line.
pub const WORDS_PER_LINE: usize = 7;
/// Number of `random.tableN` lines.
pub const TABLE_LINES: usize = STATE_LEN / WORDS_PER_LINE;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomState {
    pub j: usize,
    pub k: usize,
    pub x: usize,
    /// Always `STATE_LEN` words.
    pub v: Vec<u32>,
}

impl RandomState {
    /// Deterministic state for `seed`.
    pub fn seeded(seed: u64) -> Self {
        let mut source = Pcg64Mcg::seed_from_u64(seed);
        let v = (0..STATE_LEN).map(|_| source.next_u32()).collect();
        Self {
            j: 0,
            k: STATE_LEN - 1 - TAP_DISTANCE,
            x: STATE_LEN - 1,
            v,
        }
    }

    /// Whether the indices and the table describe a usable generator.
    pub fn is_valid(&self) -> bool {
        self.v.len() == STATE_LEN && self.j < STATE_LEN && self.k < STATE_LEN && self.x < STATE_LEN
    }
}

/// Live generator over a [`RandomState`].
#[derive(Debug, Clone)]
pub struct GameRng {
    state: RandomState,
}

impl GameRng {
    pub fn new(state: RandomState) -> Self {
        Self { state }
    }

    pub fn from_seed_u64(seed: u64) -> Self {
        Self::new(RandomState::seeded(seed))
    }

    pub fn state(&self) -> &RandomState {
        &self.state
    }

    pub fn into_state(self) -> RandomState {
        self.state
    }

    /// Roll a value in [0, size). Returns 0 for an empty range.
    pub fn below(&mut self, size: u32) -> u32 {
        if size <= 1 {
            return 0;
        }
        // Reject the tail so every outcome is equally likely.
        let limit = u32::MAX - (u32::MAX % size);
        loop {
            let n = self.next_u32();
            if n < limit {
                return n % size;
            }
        }
    }
}

impl RngCore for GameRng {
    fn next_u32(&mut self) -> u32 {
        let s = &mut self.state;
        let value = s.v[s.j].wrapping_add(s.v[s.k]);
        s.x = (s.x + 1) % STATE_LEN;
        s.j = (s.j + 1) % STATE_LEN;
        s.k = (s.k + 1) % STATE_LEN;
        s.v[s.x] = value;
        value
    }

    fn next_u64(&mut self) -> u64 {
        let lo = u64::from(self.next_u32());
        let hi = u64::from(self.next_u32());
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = GameRng::from_seed_u64(42);
        let mut b = GameRng::from_seed_u64(42);
        for _ in 0..200 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn restored_state_continues_stream() {
        let mut rng = GameRng::from_seed_u64(7);
        for _ in 0..100 {
            rng.next_u32();
        }
        let mut resumed = GameRng::new(rng.state().clone());
        for _ in 0..100 {
            assert_eq!(rng.next_u32(), resumed.next_u32());
        }
    }

    #[test]
    fn below_stays_in_range() {
        let mut rng = GameRng::from_seed_u64(1);
        for _ in 0..500 {
            assert!(rng.below(6) < 6);
        }
        assert_eq!(rng.below(0), 0);
    }

    #[test]
    fn validity_checks_table_and_indices() {
        let mut s = RandomState::seeded(3);
        assert!(s.is_valid());
        s.k = STATE_LEN;
        assert!(!s.is_valid());
        let mut s = RandomState::seeded(3);
        s.v.pop();
        assert!(!s.is_valid());
    }
}
