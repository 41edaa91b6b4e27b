// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Serializable engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::driver::WorkerPolicy;
use crate::pass::{ExecutionMode, PassOptions, DEFAULT_STALL_TIMEOUT};
use crate::rng::RandomSource;

/// Engine settings persisted as JSON. Missing fields take their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShuffleConfig {
    /// Number of passes to run.
    pub passes: usize,
    /// Worker count policy.
    pub workers: WorkerPolicy,
    /// Fixed seed; a fresh one is drawn when absent.
    pub seed: Option<u64>,
    /// Scheduling model.
    pub mode: ExecutionMode,
    /// Completion barrier deadline in milliseconds.
    pub barrier_timeout_ms: Option<u64>,
    /// Bound on a worker's blocking send to its last candidate channel.
    pub stall_timeout_ms: u64,
}

impl Default for ShuffleConfig {
    fn default() -> Self {
        Self {
            passes: 2,
            workers: WorkerPolicy::default(),
            seed: None,
            mode: ExecutionMode::Concurrent,
            barrier_timeout_ms: None,
            stall_timeout_ms: u64::try_from(DEFAULT_STALL_TIMEOUT.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl ShuffleConfig {
    /// Coordinator options derived from this config.
    pub fn pass_options(&self) -> PassOptions {
        PassOptions {
            mode: self.mode,
            barrier_timeout: self.barrier_timeout_ms.map(Duration::from_millis),
            stall_timeout: Duration::from_millis(self.stall_timeout_ms),
        }
    }

    /// Randomness source for this config: seeded if a seed is set.
    pub fn random_source(&self) -> RandomSource {
        self.seed
            .map_or_else(RandomSource::from_entropy, RandomSource::seeded)
    }
}
