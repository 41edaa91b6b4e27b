// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Result sinks with append-block semantics.
//!
//! Every `append` writes each token followed by one space, then a newline,
//! the separator line and a final newline:
//!
//! ```text
//! dolor lorem ipsum
//! -------------
//! ```

use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use churn_core::Token;
use thiserror::Error;
use tracing::debug;

/// Line written after every appended block.
pub const BLOCK_SEPARATOR: &str = "-------------";

/// Failure to persist tokens.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The output could not be opened for appending.
    #[error("[CHURN_SINK_UNAVAILABLE] cannot open {}: {source}", .path.display())]
    Unavailable {
        /// Output path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// Writing or flushing failed.
    #[error("[CHURN_SINK_WRITE] write failed: {0}")]
    Write(#[from] io::Error),
}

/// Accepts finite token sequences, appending one block per call.
pub trait ResultSink {
    /// Appends `tokens` as a new block.
    fn append(&mut self, tokens: &[Token]) -> Result<(), SinkError>;
}

/// Sink over any writer (stdout, buffers, files opened by the caller).
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    /// Wraps a writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ResultSink for WriterSink<W> {
    fn append(&mut self, tokens: &[Token]) -> Result<(), SinkError> {
        write_block(&mut self.writer, tokens)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Appends blocks to a file, creating it on first use.
#[derive(Debug, Clone)]
pub struct AppendFileSink {
    path: PathBuf,
}

impl AppendFileSink {
    /// Sink appending to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path this sink appends to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for AppendFileSink {
    fn append(&mut self, tokens: &[Token]) -> Result<(), SinkError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| SinkError::Unavailable {
                path: self.path.clone(),
                source,
            })?;
        let mut writer = BufWriter::new(file);
        write_block(&mut writer, tokens)?;
        writer.flush()?;
        debug!(
            path = %self.path.display(),
            tokens = tokens.len(),
            "appended block"
        );
        Ok(())
    }
}

fn write_block(writer: &mut impl Write, tokens: &[Token]) -> io::Result<()> {
    for token in tokens {
        write!(writer, "{token} ")?;
    }
    writeln!(writer)?;
    writeln!(writer, "{BLOCK_SEPARATOR}")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn writer_sink_formats_block() {
        let mut sink = WriterSink::new(Vec::new());
        sink.append(&Token::sequence(&["b", "a", "c"])).unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, "b a c \n-------------\n");
    }

    #[test]
    fn empty_block_still_gets_separator() {
        let mut sink = WriterSink::new(Vec::new());
        sink.append(&[]).unwrap();
        assert_eq!(sink.into_inner(), b"\n-------------\n");
    }

    #[test]
    fn file_sink_appends_rather_than_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.txt");
        std::fs::write(&path, "existing\n").unwrap();

        let mut sink = AppendFileSink::new(&path);
        sink.append(&Token::sequence(&["x", "y"])).unwrap();
        sink.append(&Token::sequence(&["y", "x"])).unwrap();

        let out = std::fs::read_to_string(&path).unwrap();
        assert_eq!(out, "existing\nx y \n-------------\ny x \n-------------\n");
    }

    #[test]
    fn unopenable_path_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = AppendFileSink::new(dir.path().join("missing-dir").join("out.txt"));
        assert!(matches!(
            sink.append(&Token::sequence(&["z"])),
            Err(SinkError::Unavailable { .. })
        ));
    }
}
