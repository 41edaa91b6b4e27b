// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Segment worker: acquire, shuffle locally, scatter across outputs.
//!
//! A worker only touches shared state through channels. Its candidate list
//! of output channels is a private copy: dropping a full channel from it
//! does not hide that channel from any other worker.

use std::time::Duration;

use crossbeam_channel::{Receiver, SendTimeoutError, Sender, TrySendError};
use rand::seq::SliceRandom;
use tracing::{debug, trace, warn};

use crate::error::ShuffleError;
use crate::rng::RandomSource;
use crate::token::Token;

/// Summary a worker hands back with its completion signal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerReport {
    /// Worker index within the pass.
    pub worker: usize,
    /// Tokens received from intake (the worker's segment size).
    pub acquired: usize,
    /// Sends that were rejected and retried on another channel.
    pub rejections: usize,
}

/// Completion signal: one per worker per pass.
#[derive(Debug)]
pub(crate) struct Completion {
    pub(crate) worker: usize,
    pub(crate) outcome: Result<WorkerReport, ShuffleError>,
}

/// One worker bound to its segment quota and private generator.
#[derive(Debug)]
pub(crate) struct Worker {
    index: usize,
    quota: usize,
    rng: RandomSource,
    stall_timeout: Duration,
}

impl Worker {
    pub(crate) fn new(
        index: usize,
        quota: usize,
        rng: RandomSource,
        stall_timeout: Duration,
    ) -> Self {
        Self {
            index,
            quota,
            rng,
            stall_timeout,
        }
    }

    /// Runs the worker to completion and reports on `completion`.
    ///
    /// Never panics on channel failures; every failure is carried in the
    /// completion signal.
    pub(crate) fn run(
        self,
        intake: &Receiver<Token>,
        outputs: &[Sender<Token>],
        completion: &Sender<Completion>,
    ) {
        let worker = self.index;
        let outcome = self.process(intake, outputs);
        match &outcome {
            Ok(report) => debug!(
                worker,
                acquired = report.acquired,
                rejections = report.rejections,
                "worker finished"
            ),
            Err(err) => warn!(worker, error = %err, "worker failed"),
        }
        // A disconnected completion channel means the coordinator already
        // abandoned the pass.
        let _ = completion.send(Completion { worker, outcome });
    }

    fn process(
        mut self,
        intake: &Receiver<Token>,
        outputs: &[Sender<Token>],
    ) -> Result<WorkerReport, ShuffleError> {
        let mut segment = self.acquire(intake)?;
        // rand's slice shuffle is the tail-first Fisher–Yates.
        segment.shuffle(&mut self.rng);

        let mut router = Router::new(self.index, outputs, self.stall_timeout);
        for token in segment {
            router.route(token, &mut self.rng)?;
        }

        Ok(WorkerReport {
            worker: self.index,
            acquired: self.quota,
            rejections: router.rejections,
        })
    }

    /// Receives exactly `quota` tokens, blocking between them.
    fn acquire(&self, intake: &Receiver<Token>) -> Result<Vec<Token>, ShuffleError> {
        let mut segment = Vec::with_capacity(self.quota);
        while segment.len() < self.quota {
            match intake.recv() {
                Ok(token) => segment.push(token),
                Err(_) => {
                    return Err(ShuffleError::IntakeClosed {
                        worker: self.index,
                        expected: self.quota,
                        received: segment.len(),
                    });
                }
            }
        }
        Ok(segment)
    }
}

/// Random output routing with per-worker fallback.
#[derive(Debug)]
pub(crate) struct Router<'a> {
    worker: usize,
    outputs: &'a [Sender<Token>],
    candidates: Vec<usize>,
    stall_timeout: Duration,
    rejections: usize,
}

impl<'a> Router<'a> {
    pub(crate) fn new(
        worker: usize,
        outputs: &'a [Sender<Token>],
        stall_timeout: Duration,
    ) -> Self {
        Self {
            worker,
            outputs,
            candidates: (0..outputs.len()).collect(),
            stall_timeout,
            rejections: 0,
        }
    }

    /// Sends `token` to a uniformly chosen candidate channel.
    ///
    /// A channel that rejects the token is dropped from this router's
    /// candidates for the rest of its life. When only one candidate is left
    /// and it is full, the send blocks up to the stall timeout.
    pub(crate) fn route(
        &mut self,
        mut token: Token,
        rng: &mut RandomSource,
    ) -> Result<(), ShuffleError> {
        let outputs = self.outputs;
        loop {
            if self.candidates.is_empty() {
                return Err(ShuffleError::CandidatesExhausted {
                    worker: self.worker,
                });
            }
            let pick = rng.below(self.candidates.len());
            let channel = self.candidates[pick];
            let Some(output) = outputs.get(channel) else {
                return Err(ShuffleError::IndexOutOfRange {
                    index: channel,
                    len: outputs.len(),
                });
            };

            match output.try_send(token) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Full(back)) if self.candidates.len() == 1 => {
                    self.rejections += 1;
                    return self.block_on_last(output, channel, back);
                }
                Err(TrySendError::Full(back) | TrySendError::Disconnected(back)) => {
                    self.rejections += 1;
                    trace!(worker = self.worker, channel, "output rejected token");
                    remove_candidate(&mut self.candidates, pick)?;
                    token = back;
                }
            }
        }
    }

    fn block_on_last(
        &mut self,
        output: &Sender<Token>,
        channel: usize,
        token: Token,
    ) -> Result<(), ShuffleError> {
        warn!(
            worker = self.worker,
            channel,
            timeout = ?self.stall_timeout,
            "last output channel full; blocking"
        );
        match output.send_timeout(token, self.stall_timeout) {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => Err(ShuffleError::RedistributionStalled {
                worker: self.worker,
            }),
            Err(SendTimeoutError::Disconnected(_)) => {
                self.candidates.clear();
                Err(ShuffleError::CandidatesExhausted {
                    worker: self.worker,
                })
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn candidates(&self) -> &[usize] {
        &self.candidates
    }
}

/// Removes the entry at `index`, preserving the order of the rest.
pub(crate) fn remove_candidate(
    candidates: &mut Vec<usize>,
    index: usize,
) -> Result<usize, ShuffleError> {
    if index >= candidates.len() {
        return Err(ShuffleError::IndexOutOfRange {
            index,
            len: candidates.len(),
        });
    }
    Ok(candidates.remove(index))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    use super::*;
    use crossbeam_channel::bounded;

    const STALL: Duration = Duration::from_millis(20);

    fn channels(n: usize, cap: usize) -> (Vec<Sender<Token>>, Vec<Receiver<Token>>) {
        (0..n).map(|_| bounded(cap)).unzip()
    }

    #[test]
    fn remove_candidate_guards_range() {
        let mut list = vec![4, 5, 6];
        assert_eq!(remove_candidate(&mut list, 1).unwrap(), 5);
        assert_eq!(list, [4, 6]);
        assert!(matches!(
            remove_candidate(&mut list, 2),
            Err(ShuffleError::IndexOutOfRange { index: 2, len: 2 })
        ));
    }

    #[test]
    fn full_channel_is_dropped_locally_and_tokens_land_elsewhere() {
        let (full_tx, full_rx) = bounded(1);
        let (open_tx, open_rx) = bounded(16);
        full_tx.send(Token::from("occupant")).unwrap();
        let txs = vec![full_tx, open_tx];

        let mut rng = RandomSource::seeded(3);
        let mut router = Router::new(0, &txs, STALL);
        for word in ["a", "b", "c", "d", "e", "f", "g", "h"] {
            router.route(Token::from(word), &mut rng).unwrap();
        }

        assert_eq!(full_rx.len(), 1);
        assert_eq!(open_rx.len(), 8);
        assert!(router.rejections <= 1);
        if router.rejections == 1 {
            assert_eq!(router.candidates(), [1]);
        } else {
            assert_eq!(router.candidates(), [0, 1]);
        }
    }

    #[test]
    fn local_exclusion_does_not_leak_to_other_routers() {
        let (txs, rxs) = channels(2, 4);
        txs[0].send(Token::from("x")).unwrap();
        drop(rxs);

        let mut rng = RandomSource::seeded(11);
        let mut first = Router::new(0, &txs, STALL);
        let err = first.route(Token::from("a"), &mut rng).unwrap_err();
        assert!(matches!(
            err,
            ShuffleError::CandidatesExhausted { worker: 0 }
        ));
        assert!(first.candidates().is_empty());

        let second = Router::new(1, &txs, STALL);
        assert_eq!(second.candidates(), [0, 1]);
    }

    #[test]
    fn last_full_channel_times_out() {
        let (txs, _rxs) = channels(1, 1);
        txs[0].send(Token::from("occupant")).unwrap();

        let mut rng = RandomSource::seeded(5);
        let mut router = Router::new(2, &txs, STALL);
        let err = router.route(Token::from("late"), &mut rng).unwrap_err();
        assert!(matches!(
            err,
            ShuffleError::RedistributionStalled { worker: 2 }
        ));
        assert_eq!(router.rejections, 1);
    }

    #[test]
    fn worker_takes_exactly_its_quota() {
        let (intake_tx, intake_rx) = bounded(8);
        for w in ["a", "b", "c", "d", "e"] {
            intake_tx.send(Token::from(w)).unwrap();
        }
        let (txs, rxs) = channels(3, 5);
        let (done_tx, done_rx) = bounded(1);

        Worker::new(0, 3, RandomSource::seeded(1), STALL).run(&intake_rx, &txs, &done_tx);

        let completion = done_rx.recv().unwrap();
        let report = completion.outcome.unwrap();
        assert_eq!(completion.worker, 0);
        assert_eq!(report.acquired, 3);
        assert_eq!(intake_rx.len(), 2);

        let mut routed: Vec<String> = rxs
            .iter()
            .flat_map(|rx| rx.try_iter().map(|t| String::from(t.as_str())))
            .collect();
        routed.sort();
        assert_eq!(routed, ["a", "b", "c"]);
    }

    #[test]
    fn worker_reports_short_intake() {
        let (intake_tx, intake_rx) = bounded(4);
        intake_tx.send(Token::from("only")).unwrap();
        drop(intake_tx);
        let (txs, _rxs) = channels(1, 4);
        let (done_tx, done_rx) = bounded(1);

        Worker::new(4, 2, RandomSource::seeded(1), STALL).run(&intake_rx, &txs, &done_tx);

        let completion = done_rx.recv().expect("completion signal");
        assert!(matches!(
            completion.outcome,
            Err(ShuffleError::IntakeClosed {
                worker: 4,
                expected: 2,
                received: 1
            })
        ));
    }
}
