//! Deterministic RNG streams.
//!
//! Every agent draws from its own stream, seeded from the dungeon seed and the agent id, so the
//! order in which agents consume randomness never leaks between them. Not cryptographic.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub trait DeterministicRng {
    fn next_u64(&mut self) -> u64;

    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn next_f32_unit(&mut self) -> f32 {
        // 24 bits of mantissa -> [0, 1)
        let x = self.next_u32() >> 8;
        (x as f32) / ((1u32 << 24) as f32)
    }

    fn next_bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }

    /// Uniform integer in `[lo, hi]` (inclusive). Returns `lo` when the range is empty.
    fn range_inclusive(&mut self, lo: i32, hi: i32) -> i32 {
        if hi <= lo {
            return lo;
        }
        let span = (i64::from(hi) - i64::from(lo) + 1) as u64;
        // In [lo, hi], so the narrowing cannot wrap.
        (i64::from(lo) + (self.next_u64() % span) as i64) as i32
    }

    /// Uniform index in `[0, len)`; `None` for an empty range.
    fn pick_index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some((self.next_u64() % len as u64) as usize)
    }
}

/// SplitMix64: good seeding RNG and small deterministic generator.
///
/// The whole generator is its 64-bit state, which is what save files persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Stream for one agent, derived from the global dungeon seed.
    pub fn for_agent(global_seed: u64, agent_id: u64) -> Self {
        Self::new(derive_seed(global_seed, agent_id, 0))
    }

    pub fn state(&self) -> u64 {
        self.state
    }

    fn step(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E3779B97F4A7C15);
        mix64(self.state)
    }
}

impl DeterministicRng for SplitMix64 {
    fn next_u64(&mut self) -> u64 {
        self.step()
    }
}

pub fn mix64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xBF58476D1CE4E5B9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94D049BB133111EB);
    x ^ (x >> 31)
}

pub fn derive_seed(global_seed: u64, agent_id: u64, stream: u64) -> u64 {
    let x = global_seed ^ mix64(agent_id.wrapping_add(0x9E3779B97F4A7C15)) ^ mix64(stream);
    mix64(x)
}

/// Order-sensitive 64-bit state hasher used for world hashes and replay checks.
///
/// `std::hash` makes no stability promise across releases, so the simulation hashes through this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StableHasher {
    state: u64,
}

impl Default for StableHasher {
    fn default() -> Self {
        Self {
            state: 0xCBF2_9CE4_8422_2325,
        }
    }
}

impl StableHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_u64(&mut self, value: u64) -> &mut Self {
        self.state = mix64(self.state ^ value.wrapping_add(0x9E3779B97F4A7C15));
        self
    }

    pub fn write_i64(&mut self, value: i64) -> &mut Self {
        self.write_u64(value as u64)
    }

    pub fn write_f32(&mut self, value: f32) -> &mut Self {
        self.write_u64(value.to_bits() as u64)
    }

    pub fn write_bool(&mut self, value: bool) -> &mut Self {
        self.write_u64(value as u64)
    }

    pub fn finish(&self) -> u64 {
        self.state
    }
}
