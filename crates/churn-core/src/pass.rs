// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! One shuffle pass: plan, spawn, feed, barrier, collect.
//!
//! # Channel layout
//!
//! - intake: rendezvous (`bounded(0)`), shared by every worker, so each token
//!   goes to whichever worker is ready first.
//! - outputs: `N` channels, each bounded to the full pass length, shared by
//!   every worker.
//! - completion: `bounded(N)`, one signal per worker.
//!
//! Output capacity equal to the pass length means a worker's non-blocking
//! send can only be rejected transiently; the stall timeout turns a
//! violation of that sizing into an error instead of a hang.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ShuffleError;
use crate::partition::SegmentPlan;
use crate::rng::RandomSource;
use crate::token::Token;
use crate::worker::{Completion, Worker, WorkerReport};

/// Default bound on a worker's blocking send to its last candidate channel.
pub const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_secs(1);

/// How a pass schedules its workers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One OS thread per worker plus a feeder thread.
    #[default]
    Concurrent,
    /// Workers run one after another on the calling thread, each handed the
    /// next contiguous segment. Reproducible for a fixed seed.
    Lockstep,
}

/// Knobs for a single pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassOptions {
    /// Scheduling model.
    pub mode: ExecutionMode,
    /// Optional deadline for the completion barrier.
    pub barrier_timeout: Option<Duration>,
    /// Bound on a blocking send to a worker's last candidate channel.
    pub stall_timeout: Duration,
}

impl Default for PassOptions {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Concurrent,
            barrier_timeout: None,
            stall_timeout: DEFAULT_STALL_TIMEOUT,
        }
    }
}

impl PassOptions {
    /// Options for a reproducible single-threaded pass.
    pub fn lockstep() -> Self {
        Self {
            mode: ExecutionMode::Lockstep,
            ..Self::default()
        }
    }
}

/// Result of a completed pass.
#[derive(Clone, Debug)]
pub struct PassOutcome {
    /// Shuffled tokens; a permutation of the input.
    pub tokens: Vec<Token>,
    /// Segment plan the pass ran with.
    pub plan: SegmentPlan,
    /// Worker reports ordered by worker index.
    pub reports: Vec<WorkerReport>,
}

/// Runs one partition-shuffle-redistribute-collect cycle over `input`.
///
/// Callers are expected to short-circuit empty input.
///
/// # Errors
///
/// - [`ShuffleError::InvalidWorkerCount`] / [`ShuffleError::InsufficientTokens`]
///   when `workers` is zero or exceeds the token count; nothing is spawned.
/// - [`ShuffleError::Spawn`] when a worker or feeder thread cannot start.
/// - [`ShuffleError::BarrierTimeout`] / [`ShuffleError::WorkerLost`] when the
///   completion barrier does not collect every signal.
/// - The lowest-indexed worker's failure otherwise.
pub fn shuffle_pass(
    input: Vec<Token>,
    workers: usize,
    rng: &mut RandomSource,
    options: &PassOptions,
) -> Result<PassOutcome, ShuffleError> {
    let plan = SegmentPlan::new(input.len(), workers)?;
    let graph = PassGraph::new(&plan, input.len());
    let worker_rngs: Vec<RandomSource> = (0..plan.len()).map(|_| rng.fork()).collect();

    let completions = match options.mode {
        ExecutionMode::Concurrent => run_concurrent(input, &plan, worker_rngs, &graph, options)?,
        ExecutionMode::Lockstep => run_lockstep(input, &plan, worker_rngs, &graph, options),
    };

    let reports = settle(completions)?;
    let tokens = graph.collect();
    debug!(
        tokens = tokens.len(),
        workers = plan.len(),
        "pass collected"
    );
    Ok(PassOutcome {
        tokens,
        plan,
        reports,
    })
}

/// Output channels for one pass. Dropped (closed) at collection.
struct PassGraph {
    senders: Vec<Sender<Token>>,
    receivers: Vec<Receiver<Token>>,
}

impl PassGraph {
    fn new(plan: &SegmentPlan, capacity: usize) -> Self {
        let (senders, receivers) = (0..plan.len()).map(|_| bounded(capacity)).unzip();
        Self { senders, receivers }
    }

    /// Closes each output in index order and drains it in FIFO order.
    fn collect(self) -> Vec<Token> {
        let Self { senders, receivers } = self;
        drop(senders);
        let mut result = Vec::new();
        for receiver in &receivers {
            result.extend(receiver.try_iter());
        }
        result
    }
}

fn run_concurrent(
    input: Vec<Token>,
    plan: &SegmentPlan,
    worker_rngs: Vec<RandomSource>,
    graph: &PassGraph,
    options: &PassOptions,
) -> Result<Vec<Completion>, ShuffleError> {
    let expected = plan.len();
    let (intake_tx, intake_rx) = bounded::<Token>(0);
    let (done_tx, done_rx) = bounded::<Completion>(expected);

    let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(expected + 1);
    for (index, (quota, worker_rng)) in plan.iter().zip(worker_rngs).enumerate() {
        let worker = Worker::new(index, quota, worker_rng, options.stall_timeout);
        let intake = intake_rx.clone();
        let outputs = graph.senders.clone();
        let done = done_tx.clone();
        // On spawn failure the already-running workers see intake disconnect
        // once `intake_tx` drops and exit with `IntakeClosed`.
        let handle = thread::Builder::new()
            .name(format!("churn-worker-{index}"))
            .spawn(move || worker.run(&intake, &outputs, &done))?;
        handles.push(handle);
    }
    drop(intake_rx);
    drop(done_tx);

    let feeder = thread::Builder::new()
        .name("churn-feeder".to_owned())
        .spawn(move || {
            for token in input {
                if intake_tx.send(token).is_err() {
                    break;
                }
            }
        })?;
    handles.push(feeder);

    let completions = barrier(&done_rx, expected, options.barrier_timeout)?;

    for handle in handles {
        if let Err(payload) = handle.join() {
            std::panic::resume_unwind(payload);
        }
    }
    Ok(completions)
}

fn run_lockstep(
    input: Vec<Token>,
    plan: &SegmentPlan,
    worker_rngs: Vec<RandomSource>,
    graph: &PassGraph,
    options: &PassOptions,
) -> Vec<Completion> {
    let (done_tx, done_rx) = bounded::<Completion>(plan.len());
    let mut tokens = input.into_iter();

    for (index, (quota, worker_rng)) in plan.iter().zip(worker_rngs).enumerate() {
        let segment: Vec<Token> = tokens.by_ref().take(quota).collect();
        match preloaded_intake(index, segment) {
            Ok(intake) => {
                let worker = Worker::new(index, quota, worker_rng, options.stall_timeout);
                worker.run(&intake, &graph.senders, &done_tx);
            }
            Err(err) => {
                warn!(
                    worker = index,
                    error = %err,
                    "lockstep intake rejected its segment"
                );
                // `done_rx` is alive and sized for every worker.
                let _ = done_tx.send(Completion {
                    worker: index,
                    outcome: Err(err),
                });
            }
        }
    }
    drop(done_tx);
    done_rx.try_iter().collect()
}

/// Closed intake holding exactly `segment`, in order.
fn preloaded_intake(worker: usize, segment: Vec<Token>) -> Result<Receiver<Token>, ShuffleError> {
    let expected = segment.len();
    let (intake_tx, intake_rx) = bounded::<Token>(expected);
    for (received, token) in segment.into_iter().enumerate() {
        if intake_tx.try_send(token).is_err() {
            return Err(ShuffleError::IntakeClosed {
                worker,
                expected,
                received,
            });
        }
    }
    Ok(intake_rx)
}

/// Waits for exactly `expected` completion signals.
fn barrier(
    done: &Receiver<Completion>,
    expected: usize,
    timeout: Option<Duration>,
) -> Result<Vec<Completion>, ShuffleError> {
    let deadline = timeout.map(|t| Instant::now() + t);
    let mut completions = Vec::with_capacity(expected);

    while completions.len() < expected {
        let next = deadline.map_or_else(
            || done.recv().map_err(|_| RecvTimeoutError::Disconnected),
            |deadline| done.recv_deadline(deadline),
        );
        match next {
            Ok(completion) => completions.push(completion),
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    completed = completions.len(),
                    expected,
                    "barrier deadline elapsed; abandoning pass"
                );
                return Err(ShuffleError::BarrierTimeout {
                    completed: completions.len(),
                    expected,
                });
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(ShuffleError::WorkerLost {
                    completed: completions.len(),
                    expected,
                });
            }
        }
    }
    Ok(completions)
}

/// Orders completions by worker and surfaces the first worker failure.
fn settle(mut completions: Vec<Completion>) -> Result<Vec<WorkerReport>, ShuffleError> {
    completions.sort_by_key(|c| c.worker);
    completions.into_iter().map(|c| c.outcome).collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn sorted(tokens: &[Token]) -> Vec<String> {
        let mut out: Vec<String> = tokens.iter().map(ToString::to_string).collect();
        out.sort();
        out
    }

    #[test]
    fn four_tokens_two_workers() {
        let input = Token::sequence(&["a", "b", "c", "d"]);
        let mut rng = RandomSource::seeded(1);
        let outcome = shuffle_pass(input, 2, &mut rng, &PassOptions::default()).unwrap();
        assert_eq!(outcome.plan.sizes(), [2, 2]);
        assert_eq!(sorted(&outcome.tokens), ["a", "b", "c", "d"]);
        assert_eq!(outcome.reports.len(), 2);
        assert!(outcome
            .reports
            .iter()
            .enumerate()
            .all(|(i, r)| r.worker == i && r.acquired == 2));
    }

    #[test]
    fn planning_failure_spawns_nothing() {
        let input = Token::sequence(&["a", "b"]);
        let mut rng = RandomSource::seeded(1);
        let before = rng.clone().fork().seed();
        let err = shuffle_pass(input, 3, &mut rng, &PassOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            ShuffleError::InsufficientTokens {
                tokens: 2,
                workers: 3
            }
        ));
        // No worker generators were forked either.
        assert_eq!(rng.fork().seed(), before);
    }

    #[test]
    fn settle_surfaces_lowest_worker_error() {
        let completions = vec![
            Completion {
                worker: 2,
                outcome: Err(ShuffleError::CandidatesExhausted { worker: 2 }),
            },
            Completion {
                worker: 0,
                outcome: Ok(WorkerReport {
                    worker: 0,
                    acquired: 1,
                    rejections: 0,
                }),
            },
            Completion {
                worker: 1,
                outcome: Err(ShuffleError::RedistributionStalled { worker: 1 }),
            },
        ];
        assert!(matches!(
            settle(completions),
            Err(ShuffleError::RedistributionStalled { worker: 1 })
        ));
    }

    #[test]
    fn barrier_times_out_when_signals_are_missing() {
        let (tx, rx) = bounded::<Completion>(2);
        tx.send(Completion {
            worker: 0,
            outcome: Ok(WorkerReport {
                worker: 0,
                acquired: 1,
                rejections: 0,
            }),
        })
        .unwrap();
        let err = barrier(&rx, 2, Some(Duration::from_millis(10))).unwrap_err();
        assert!(matches!(
            err,
            ShuffleError::BarrierTimeout {
                completed: 1,
                expected: 2
            }
        ));
        drop(tx);
    }

    #[test]
    fn barrier_reports_lost_workers() {
        let (tx, rx) = bounded::<Completion>(2);
        drop(tx);
        let err = barrier(&rx, 2, None).unwrap_err();
        assert!(matches!(
            err,
            ShuffleError::WorkerLost {
                completed: 0,
                expected: 2
            }
        ));
    }

    #[test]
    fn preloaded_intake_hands_over_the_whole_segment() {
        let intake = preloaded_intake(0, Token::sequence(&["x", "y", "z"])).unwrap();
        assert_eq!(intake.len(), 3);
        let drained: Vec<Token> = intake.try_iter().collect();
        assert_eq!(drained, Token::sequence(&["x", "y", "z"]));
        // Sender side is gone: a worker asking for more sees a closed intake.
        assert!(intake.recv().is_err());
    }

    #[test]
    fn lockstep_workers_each_receive_their_quota() {
        let input = Token::sequence(&["a", "b", "c", "d", "e", "f", "g"]);
        let mut rng = RandomSource::seeded(21);
        let outcome = shuffle_pass(input.clone(), 3, &mut rng, &PassOptions::lockstep()).unwrap();
        let acquired: Vec<usize> = outcome.reports.iter().map(|r| r.acquired).collect();
        assert_eq!(acquired, [3, 2, 2]);
        assert_eq!(sorted(&outcome.tokens), sorted(&input));
    }

    #[test]
    fn lockstep_is_reproducible() {
        let input = Token::sequence(&["q", "w", "e", "r", "t", "y", "u", "i", "o", "p"]);
        let run = |seed| {
            let mut rng = RandomSource::seeded(seed);
            shuffle_pass(input.clone(), 3, &mut rng, &PassOptions::lockstep())
                .unwrap()
                .tokens
        };
        assert_eq!(run(99), run(99));
        assert_eq!(sorted(&run(99)), sorted(&input));
    }
}
