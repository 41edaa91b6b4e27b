// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Multi-pass driver and worker-count policies.

use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use crate::error::ShuffleError;
use crate::partition::SegmentPlan;
use crate::pass::{shuffle_pass, PassOptions};
use crate::rng::RandomSource;
use crate::token::Token;
use crate::worker::WorkerReport;

/// Chooses the worker count for each pass.
pub trait WorkerCountPicker {
    /// Worker count for pass `pass` over `token_count` tokens.
    fn pick(&mut self, pass: usize, token_count: usize, rng: &mut RandomSource) -> usize;
}

/// Declarative worker-count policy, usable from config files.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerPolicy {
    /// Same count every pass. Counts above the token count fail the pass.
    Fixed(usize),
    /// Uniform draw in `[1, min(max_workers, token_count)]`.
    Random {
        /// Upper bound; zero or negative means a single worker.
        max_workers: i64,
    },
    /// Explicit per-pass counts; the last entry repeats past the end.
    Sequence(Vec<usize>),
}

impl Default for WorkerPolicy {
    fn default() -> Self {
        Self::Random { max_workers: 10 }
    }
}

impl WorkerCountPicker for WorkerPolicy {
    fn pick(&mut self, pass: usize, token_count: usize, rng: &mut RandomSource) -> usize {
        match self {
            Self::Fixed(n) => *n,
            Self::Random { max_workers } => random_worker_count(token_count, *max_workers, rng),
            Self::Sequence(counts) => counts
                .get(pass)
                .or_else(|| counts.last())
                .copied()
                .unwrap_or(1),
        }
    }
}

impl<F> WorkerCountPicker for F
where
    F: FnMut(usize, usize, &mut RandomSource) -> usize,
{
    fn pick(&mut self, pass: usize, token_count: usize, rng: &mut RandomSource) -> usize {
        self(pass, token_count, rng)
    }
}

/// Random worker count in `[1, min(max_workers, token_count)]`.
///
/// `max_workers <= 0` yields 1. An empty corpus also yields 1; the driver
/// rejects empty input before asking.
pub fn random_worker_count(token_count: usize, max_workers: i64, rng: &mut RandomSource) -> usize {
    let Ok(max) = usize::try_from(max_workers) else {
        return 1;
    };
    if max == 0 {
        return 1;
    }
    let upper = max.min(token_count).max(1);
    rng.between(1, upper)
}

/// Per-pass record kept by the driver.
#[derive(Clone, Debug)]
pub struct PassSummary {
    /// Zero-based pass index.
    pub index: usize,
    /// Worker count used.
    pub workers: usize,
    /// Segment plan used.
    pub plan: SegmentPlan,
    /// Worker reports in index order.
    pub reports: Vec<WorkerReport>,
}

/// Output of a full drive.
#[derive(Clone, Debug)]
pub struct DriveOutcome {
    /// Final token order.
    pub tokens: Vec<Token>,
    /// One summary per executed pass.
    pub passes: Vec<PassSummary>,
}

/// Runs passes back to back, feeding each pass's output into the next.
#[derive(Debug)]
pub struct PassDriver {
    rng: RandomSource,
    options: PassOptions,
}

impl PassDriver {
    /// Creates a driver drawing all randomness from `rng`.
    pub fn new(rng: RandomSource, options: PassOptions) -> Self {
        Self { rng, options }
    }

    /// Seed of the underlying randomness source.
    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Pass options applied to every pass.
    pub fn options(&self) -> &PassOptions {
        &self.options
    }

    /// Runs `passes` shuffle passes over `input`.
    ///
    /// Zero passes returns the input untouched. Empty input with at least one
    /// pass fails with [`ShuffleError::NothingToShuffle`] before any pass is
    /// built.
    ///
    /// # Errors
    ///
    /// [`ShuffleError::NothingToShuffle`] for empty input, otherwise the first
    /// failing pass's error (see [`shuffle_pass`]). A failing pass aborts the
    /// drive and earlier passes' output is discarded.
    pub fn run(
        &mut self,
        input: Vec<Token>,
        passes: usize,
        picker: &mut impl WorkerCountPicker,
    ) -> Result<DriveOutcome, ShuffleError> {
        if passes == 0 {
            return Ok(DriveOutcome {
                tokens: input,
                passes: Vec::new(),
            });
        }
        if input.is_empty() {
            return Err(ShuffleError::NothingToShuffle);
        }

        let mut tokens = input;
        let mut summaries = Vec::with_capacity(passes);
        for index in 0..passes {
            let workers = picker.pick(index, tokens.len(), &mut self.rng);
            let span = info_span!("pass", index, workers, tokens = tokens.len());
            let _guard = span.enter();

            let mut pass_rng = self.rng.fork();
            let outcome = shuffle_pass(tokens, workers, &mut pass_rng, &self.options)?;
            let rejections: usize = outcome.reports.iter().map(|r| r.rejections).sum();
            info!(plan = ?outcome.plan.sizes(), rejections, "pass complete");

            tokens = outcome.tokens;
            summaries.push(PassSummary {
                index,
                workers,
                plan: outcome.plan,
                reports: outcome.reports,
            });
        }

        Ok(DriveOutcome {
            tokens,
            passes: summaries,
        })
    }
}
