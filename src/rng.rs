//! Counter-based randomness: every system gets a fresh stream per tick,
//! derived from (seed, system name, tick). A world restored from a snapshot
//! therefore draws exactly what an uninterrupted run would have drawn.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

#[derive(Debug, Clone, Copy)]
pub struct RngManager {
    seed: u64,
}

impl RngManager {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn stream(&self, name: &str, tick: u64) -> SystemRng {
        SystemRng {
            inner: ChaCha8Rng::seed_from_u64(self.derive_seed(name, tick)),
        }
    }

    fn derive_seed(&self, name: &str, tick: u64) -> u64 {
        let mut seed = self.seed;
        seed = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        seed ^= fnv1a(name.as_bytes());
        seed = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        seed ^= tick.wrapping_mul(69069);
        seed
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut state = FNV_OFFSET_BASIS;
    for &byte in bytes {
        state ^= byte as u64;
        state = state.wrapping_mul(FNV_PRIME);
    }
    state
}

pub struct SystemRng {
    inner: ChaCha8Rng,
}

impl RngCore for SystemRng {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.inner.try_fill_bytes(dest)
    }
}
