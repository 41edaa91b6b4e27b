// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! I/O collaborators for the churn engine (token sources, result sinks, config).
//! Keeps the engine itself free of filesystem concerns.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]

pub mod config;
pub mod fs;
pub mod sink;
pub mod source;

pub use config::{read_config_file, ConfigError, ConfigRepo, ConfigStore, SHUFFLE_KEY};
pub use fs::FsConfigStore;
pub use sink::{AppendFileSink, ResultSink, SinkError, WriterSink, BLOCK_SEPARATOR};
pub use source::{FileSource, SourceError, TokenSource, WhitespaceSource};
