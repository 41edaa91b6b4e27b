// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! churn-core: concurrent partition-shuffle-redistribute engine.
//!
//! A pass splits a token sequence into balanced segments, hands each segment
//! to its own worker thread over a shared rendezvous channel, lets every
//! worker shuffle locally and scatter its tokens across all output channels,
//! then collects the outputs once every worker has signalled completion.
//! [`PassDriver`] chains passes so each one starts from a different partition.
//!
//! # Randomness
//!
//! All random choices flow from a [`RandomSource`]. The driver forks one
//! generator per pass and the coordinator forks one per worker, so the
//! choices themselves are reproducible from a seed. Thread interleaving is
//! not; use [`ExecutionMode::Lockstep`] when the output must be reproducible
//! too.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]

mod config;
mod driver;
mod error;
mod partition;
mod pass;
mod rng;
mod token;
mod worker;

pub use config::ShuffleConfig;
pub use driver::{
    random_worker_count, DriveOutcome, PassDriver, PassSummary, WorkerCountPicker, WorkerPolicy,
};
pub use error::ShuffleError;
pub use partition::SegmentPlan;
pub use pass::{shuffle_pass, ExecutionMode, PassOptions, PassOutcome, DEFAULT_STALL_TIMEOUT};
pub use rng::RandomSource;
pub use token::Token;
pub use worker::WorkerReport;
