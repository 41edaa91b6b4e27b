// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Seedable randomness threaded through the driver, coordinator and workers.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Pseudo-random generator with a known seed.
///
/// * Not cryptographically secure.
/// * Matching seeds yield identical sequences as long as callers consume
///   numbers in the same order; concurrent code forks a child per task via
///   [`RandomSource::fork`] so each task's stream is fixed by the seed.
#[derive(Debug, Clone)]
pub struct RandomSource {
    seed: u64,
    rng: StdRng,
}

impl RandomSource {
    /// Constructs a source from an explicit seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Constructs a source from a fresh OS-provided seed.
    ///
    /// The seed is kept so a run can be replayed with [`RandomSource::seeded`].
    pub fn from_entropy() -> Self {
        Self::seeded(rand::random())
    }

    /// Seed this source was built from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Derives an independent child source.
    ///
    /// The child's seed is drawn from this source, so the sequence of forks
    /// is itself reproducible.
    pub fn fork(&mut self) -> Self {
        Self::seeded(self.rng.next_u64())
    }

    /// Uniform integer in `[0, bound)`. Returns 0 when `bound` is 0.
    pub fn below(&mut self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }
        self.rng.gen_range(0..bound)
    }

    /// Uniform integer in `[low, high]`. Returns `low` when the range is empty.
    pub fn between(&mut self, low: usize, high: usize) -> usize {
        if high <= low {
            return low;
        }
        self.rng.gen_range(low..=high)
    }
}

impl RngCore for RandomSource {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}
