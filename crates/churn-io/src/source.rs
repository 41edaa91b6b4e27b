// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Token sources: whitespace-delimited words from a reader or file.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use churn_core::Token;
use thiserror::Error;
use tracing::debug;

/// Failure to produce tokens.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The input could not be opened.
    #[error("[CHURN_SOURCE_UNAVAILABLE] cannot open {}: {source}", .path.display())]
    Unavailable {
        /// Input path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// Reading failed part-way through.
    #[error("[CHURN_SOURCE_READ] read failed: {0}")]
    Read(#[from] io::Error),
}

/// Supplies a finite, ordered token sequence.
///
/// Implementations must produce the same sequence for the same underlying
/// input.
pub trait TokenSource {
    /// Reads every token, in input order.
    fn read_tokens(&mut self) -> Result<Vec<Token>, SourceError>;
}

/// Splits a buffered reader on Unicode whitespace.
#[derive(Debug)]
pub struct WhitespaceSource<R> {
    reader: R,
}

impl<R: BufRead> WhitespaceSource<R> {
    /// Wraps a buffered reader.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> TokenSource for WhitespaceSource<R> {
    fn read_tokens(&mut self) -> Result<Vec<Token>, SourceError> {
        let mut tokens = Vec::new();
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                break;
            }
            tokens.extend(line.split_whitespace().map(Token::from));
        }
        Ok(tokens)
    }
}

/// Whitespace tokens from a file on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Source reading `path` when asked for tokens.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path this source reads.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenSource for FileSource {
    fn read_tokens(&mut self) -> Result<Vec<Token>, SourceError> {
        let file = File::open(&self.path).map_err(|source| SourceError::Unavailable {
            path: self.path.clone(),
            source,
        })?;
        let tokens = WhitespaceSource::new(BufReader::new(file)).read_tokens()?;
        debug!(
            path = %self.path.display(),
            tokens = tokens.len(),
            "read tokens"
        );
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::io::Cursor;

    fn words(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(Token::as_str).collect()
    }

    fn read(text: &str) -> Vec<Token> {
        let mut source = WhitespaceSource::new(Cursor::new(text));
        source.read_tokens().unwrap()
    }

    #[test]
    fn splits_on_any_whitespace() {
        let text = "  the quick\tbrown\n\nfox  jumps\r\nover\u{00a0}it ";
        let tokens = read(text);
        assert_eq!(
            words(&tokens),
            ["the", "quick", "brown", "fox", "jumps", "over", "it"]
        );
    }

    #[test]
    fn empty_and_blank_inputs_yield_no_tokens() {
        for text in ["", " \n\t \n"] {
            let tokens = read(text);
            assert!(tokens.is_empty(), "{text:?}");
        }
    }

    #[test]
    fn same_input_same_sequence() {
        let text = "a b c a b";
        let first = read(text);
        let second = read(text);
        assert_eq!(first, second);
    }

    #[test]
    fn missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut src = FileSource::new(dir.path().join("nope.txt"));
        assert!(matches!(
            src.read_tokens(),
            Err(SourceError::Unavailable { .. })
        ));
    }

    #[test]
    fn reads_file_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("text.txt");
        std::fs::write(&path, "lorem ipsum\ndolor sit amet\n").unwrap();
        let tokens = FileSource::new(&path).read_tokens().unwrap();
        assert_eq!(words(&tokens), ["lorem", "ipsum", "dolor", "sit", "amet"]);
    }
}
