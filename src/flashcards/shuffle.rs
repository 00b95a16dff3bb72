//! Deterministic deck shuffling.
//!
//! The PRNG and the seed arithmetic are pure; only [`TimeSeed`] reads the
//! clock, and it sits behind [`SeedSource`] so sessions can be replayed.

use super::clock::Clock;

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// mulberry32: yields floats in `[0, 1)`.
#[derive(Debug, Clone)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6d2b_79f5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / 4_294_967_296.0
    }
}

/// Fisher-Yates from the back, driven by mulberry32.
pub fn shuffle<T: Clone>(items: &[T], seed: u32) -> Vec<T> {
    let mut result = items.to_vec();
    let mut random = Mulberry32::new(seed);

    for i in (1..result.len()).rev() {
        let j = (random.next_f64() * (i + 1) as f64).floor() as usize;
        result.swap(i, j);
    }

    result
}

/// FNV-1a over the UTF-16 units of the `|`-joined ids.
pub fn hash_ids(ids: &[String]) -> u32 {
    ids.join("|")
        .encode_utf16()
        .fold(FNV_OFFSET, |hash, unit| (hash ^ u32::from(unit)).wrapping_mul(FNV_PRIME))
}

/// Mixes the deck hash with the low 32 bits of `now_ms`. Never zero.
pub fn derive_shuffle_seed(ids: &[String], now_ms: u64) -> u32 {
    let seed = hash_ids(ids) ^ (now_ms & 0xffff_ffff) as u32;
    if seed == 0 {
        1
    } else {
        seed
    }
}

/// One LCG step, used when a finished deck is restarted. Never zero.
pub fn advance_shuffle_seed(seed: u32) -> u32 {
    let next = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
    if next == 0 {
        1
    } else {
        next
    }
}

pub trait SeedSource {
    fn seed_for(&self, ids: &[String]) -> u32;
}

/// Seeds from the deck and the current time, so every mount reshuffles.
pub struct TimeSeed<C> {
    clock: C,
}

impl<C: Clock> TimeSeed<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> SeedSource for TimeSeed<C> {
    fn seed_for(&self, ids: &[String]) -> u32 {
        derive_shuffle_seed(ids, self.clock.now_ms())
    }
}

/// Always the same seed.
#[derive(Debug, Clone, Copy)]
pub struct FixedSeed(pub u32);

impl SeedSource for FixedSeed {
    fn seed_for(&self, _ids: &[String]) -> u32 {
        if self.0 == 0 {
            1
        } else {
            self.0
        }
    }
}
