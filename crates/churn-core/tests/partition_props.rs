// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Property checks for balanced segment planning.
#![allow(clippy::expect_used, clippy::unwrap_used)]

use churn_core::{SegmentPlan, ShuffleError};
use proptest::prelude::*;

proptest! {
    #[test]
    fn plan_is_balanced_and_complete(workers in 1usize..64, extra in 0usize..4096) {
        let len = workers + extra;
        let plan = SegmentPlan::new(len, workers).unwrap();

        prop_assert_eq!(plan.len(), workers);
        prop_assert_eq!(plan.total(), len);

        let max = plan.iter().max().unwrap();
        let min = plan.iter().min().unwrap();
        prop_assert!(max - min <= 1);
        prop_assert!(min >= 1);

        // Larger segments come first.
        prop_assert!(plan.sizes().windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn plan_is_deterministic(workers in 1usize..32, len in 32usize..512) {
        let first = SegmentPlan::new(len, workers).unwrap();
        let second = SegmentPlan::new(len, workers).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn too_few_tokens_fail(workers in 1usize..64, short in 1usize..64) {
        let len = workers.saturating_sub(short);
        prop_assume!(len < workers);
        let is_insufficient = matches!(
            SegmentPlan::new(len, workers),
            Err(ShuffleError::InsufficientTokens { .. })
        );
        prop_assert!(is_insufficient);
    }

    #[test]
    fn non_positive_workers_fail(len in 0usize..128, workers in i64::MIN..=0) {
        let is_invalid = matches!(
            SegmentPlan::from_signed(len, workers),
            Err(ShuffleError::InvalidWorkerCount { .. })
        );
        prop_assert!(is_invalid);
    }
}

#[test]
fn five_tokens_three_workers() {
    let plan = SegmentPlan::new(5, 3).unwrap();
    assert_eq!(plan.sizes(), [2, 2, 1]);
    assert_eq!(plan.total(), 5);
}
