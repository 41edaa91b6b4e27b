// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared fixtures for churn-core integration tests.
#![allow(dead_code)]

use churn_core::Token;

/// Worker counts exercised by the invariance tests.
pub const WORKER_COUNTS: &[usize] = &[1, 2, 3, 4, 7, 16];

/// Seeds exercised by the reproducibility tests.
pub const SEEDS: &[u64] = &[0, 1, 42, 0xDEAD_BEEF, u64::MAX];

/// `n` distinct tokens `w0..w{n-1}`.
pub fn corpus(n: usize) -> Vec<Token> {
    (0..n).map(|i| Token::new(format!("w{i}"))).collect()
}

/// Sorted token texts, for multiset comparison.
pub fn multiset(tokens: &[Token]) -> Vec<String> {
    let mut out: Vec<String> = tokens.iter().map(ToString::to_string).collect();
    out.sort();
    out
}

/// Panics with a readable message unless `actual` is a permutation of `expected`.
pub fn assert_permutation(expected: &[Token], actual: &[Token], context: &str) {
    assert_eq!(expected.len(), actual.len(), "length changed: {context}");
    assert_eq!(
        multiset(expected),
        multiset(actual),
        "multiset changed: {context}"
    );
}
