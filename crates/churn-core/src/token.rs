// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Opaque token values moved through the shuffle graph.

use std::fmt;
use std::sync::Arc;

/// One immutable unit of text (typically a whitespace-delimited word).
///
/// Cloning is a reference-count bump, so tokens can cross channels and
/// threads without copying the underlying string. Equality, ordering and
/// hashing compare content, never identity.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(Arc<str>);

impl Token {
    /// Creates a token from any string-like value.
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self(text.into())
    }

    /// Borrows the token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds a sequence from a slice of string literals.
    pub fn sequence<S: AsRef<str>>(words: &[S]) -> Vec<Self> {
        words.iter().map(|w| Self::new(w.as_ref())).collect()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
