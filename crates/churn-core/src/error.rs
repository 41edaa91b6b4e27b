// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error taxonomy for planning and running shuffle passes.

use thiserror::Error;

/// Failures raised while planning, running or driving shuffle passes.
///
/// Planning errors (`InvalidWorkerCount`, `InsufficientTokens`) are raised
/// before any thread is spawned. Worker and barrier errors are raised after
/// the pass has started and abort it; no pass is retried internally.
#[derive(Debug, Error)]
pub enum ShuffleError {
    /// Worker count was zero (or negative before conversion).
    #[error("[CHURN_INVALID_WORKERS] worker count must be at least 1, got {requested}")]
    InvalidWorkerCount {
        /// The requested worker count.
        requested: i64,
    },
    /// Fewer tokens than workers.
    #[error("[CHURN_INSUFFICIENT_TOKENS] {tokens} tokens cannot feed {workers} workers")]
    InsufficientTokens {
        /// Tokens available to the pass.
        tokens: usize,
        /// Workers requested for the pass.
        workers: usize,
    },
    /// Candidate-list bookkeeping pointed past the end of the list.
    #[error("[CHURN_INDEX_OUT_OF_RANGE] index {index} out of range for {len} candidates")]
    IndexOutOfRange {
        /// Offending index.
        index: usize,
        /// Candidate list length at the time.
        len: usize,
    },
    /// Every output channel rejected a token and none remain to try.
    #[error("[CHURN_CANDIDATES_EXHAUSTED] worker {worker} has no output channel left")]
    CandidatesExhausted {
        /// Worker index.
        worker: usize,
    },
    /// The last remaining output channel stayed full past the stall timeout.
    #[error("[CHURN_REDISTRIBUTION_STALLED] worker {worker} stalled on its last output")]
    RedistributionStalled {
        /// Worker index.
        worker: usize,
    },
    /// Intake closed before the worker received its full quota.
    #[error("[CHURN_INTAKE_CLOSED] worker {worker} received {received} of {expected} tokens")]
    IntakeClosed {
        /// Worker index.
        worker: usize,
        /// Segment size from the plan.
        expected: usize,
        /// Tokens actually received.
        received: usize,
    },
    /// The completion barrier deadline elapsed.
    #[error("[CHURN_BARRIER_TIMEOUT] only {completed} of {expected} workers finished in time")]
    BarrierTimeout {
        /// Completion signals received.
        completed: usize,
        /// Workers launched.
        expected: usize,
    },
    /// A worker thread exited without signalling completion.
    #[error("[CHURN_WORKER_LOST] completions closed after {completed} of {expected} signals")]
    WorkerLost {
        /// Completion signals received.
        completed: usize,
        /// Workers launched.
        expected: usize,
    },
    /// The OS refused to spawn a worker or feeder thread.
    #[error("[CHURN_SPAWN] failed to spawn pass thread: {0}")]
    Spawn(#[from] std::io::Error),
    /// Empty input handed to the driver with at least one pass requested.
    #[error("[CHURN_NOTHING_TO_SHUFFLE] input contains no tokens")]
    NothingToShuffle,
}

impl ShuffleError {
    /// True for errors raised before a pass starts any thread.
    pub fn is_planning_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidWorkerCount { .. }
                | Self::InsufficientTokens { .. }
                | Self::NothingToShuffle
        )
    }
}
