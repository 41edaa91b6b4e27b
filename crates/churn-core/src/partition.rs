// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Balanced segment planning.

use crate::error::ShuffleError;

/// Per-worker segment sizes for one pass.
///
/// Invariants (checked at construction):
/// - one entry per worker,
/// - entries sum to the input length,
/// - entries differ by at most one, with the larger entries first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentPlan {
    sizes: Vec<usize>,
}

impl SegmentPlan {
    /// Splits `len` tokens across `workers` segments.
    ///
    /// The first `len % workers` segments get one extra token.
    ///
    /// # Errors
    ///
    /// [`ShuffleError::InvalidWorkerCount`] when `workers` is zero;
    /// [`ShuffleError::InsufficientTokens`] when `len < workers`.
    pub fn new(len: usize, workers: usize) -> Result<Self, ShuffleError> {
        if workers == 0 {
            return Err(ShuffleError::InvalidWorkerCount { requested: 0 });
        }
        if len < workers {
            return Err(ShuffleError::InsufficientTokens {
                tokens: len,
                workers,
            });
        }

        let base = len / workers;
        let extra = len % workers;
        let sizes = (0..workers)
            .map(|i| if i < extra { base + 1 } else { base })
            .collect();
        Ok(Self { sizes })
    }

    /// Signed entry point for worker counts read from configuration.
    ///
    /// # Errors
    ///
    /// [`ShuffleError::InvalidWorkerCount`] when `workers <= 0`; otherwise as
    /// [`SegmentPlan::new`].
    pub fn from_signed(len: usize, workers: i64) -> Result<Self, ShuffleError> {
        let workers = usize::try_from(workers)
            .ok()
            .filter(|w| *w > 0)
            .ok_or(ShuffleError::InvalidWorkerCount { requested: workers })?;
        Self::new(len, workers)
    }

    /// Number of segments (equals the worker count).
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    /// Always false; a plan has at least one segment.
    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Segment sizes in worker order.
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Sum of all segments.
    pub fn total(&self) -> usize {
        self.sizes.iter().sum()
    }

    /// Iterates segment sizes in worker order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.sizes.iter().copied()
    }
}
