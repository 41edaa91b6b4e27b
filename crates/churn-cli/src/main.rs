// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! churn CLI entrypoint.
//!
//! Reads whitespace-delimited tokens, runs the multi-pass worker shuffle and
//! appends the result as a new block in the output file.
//!
//! # Usage
//! ```text
//! churn shuffle [--input text.txt] [--output output.txt] [--passes 2] [--max-workers 10]
//! churn plan --tokens 5 --workers 3
//! churn config [--save]
//! ```
//!
//! Logs go to stderr (`RUST_LOG` overrides the default `info` level); stdout
//! carries only command output.
#![allow(clippy::print_stdout)]

use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use churn_core::{ExecutionMode, PassDriver, SegmentPlan, ShuffleConfig, WorkerPolicy};
use churn_io::{
    read_config_file, AppendFileSink, ConfigRepo, FileSource, FsConfigStore, ResultSink,
    TokenSource, WriterSink,
};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Multi-pass worker shuffle for text corpora")]
struct Args {
    /// Directory holding persisted config (defaults to the platform config dir)
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Shuffle a text file and append the result to the output file
    Shuffle(ShuffleArgs),
    /// Print the segment plan for a token count and worker count
    Plan {
        /// Number of tokens
        #[arg(long)]
        tokens: usize,
        /// Number of workers
        #[arg(long, allow_negative_numbers = true)]
        workers: i64,
    },
    /// Print the effective configuration as JSON
    Config {
        /// Read config from this JSON file instead of the store
        #[arg(long)]
        config: Option<PathBuf>,
        /// Persist the effective configuration into the store
        #[arg(long)]
        save: bool,
    },
}

#[derive(clap::Args, Debug)]
struct ShuffleArgs {
    /// Input text; tokens are whitespace-delimited
    #[arg(long, default_value = "text.txt")]
    input: PathBuf,
    /// Output file; each run appends a block plus a separator line
    #[arg(long, default_value = "output.txt")]
    output: PathBuf,
    /// Number of passes
    #[arg(long)]
    passes: Option<usize>,
    /// Fixed worker count for every pass
    #[arg(long, conflicts_with_all = ["max_workers", "worker_counts"])]
    workers: Option<usize>,
    /// Upper bound for a random worker count per pass (<= 0 means one worker)
    #[arg(long, allow_negative_numbers = true, conflicts_with = "worker_counts")]
    max_workers: Option<i64>,
    /// Explicit per-pass worker counts, comma separated
    #[arg(long, value_delimiter = ',')]
    worker_counts: Vec<usize>,
    /// Seed for reproducible randomness
    #[arg(long)]
    seed: Option<u64>,
    /// Run workers one after another on one thread (reproducible with --seed)
    #[arg(long)]
    lockstep: bool,
    /// Deadline for each pass's completion barrier, in milliseconds
    #[arg(long)]
    barrier_timeout_ms: Option<u64>,
    /// Read config from this JSON file instead of the store
    #[arg(long)]
    config: Option<PathBuf>,
    /// Also write the shuffled tokens to stdout
    #[arg(long)]
    print: bool,
}

impl ShuffleArgs {
    /// Applies command-line overrides on top of `cfg`.
    fn apply(&self, cfg: &mut ShuffleConfig) {
        if let Some(passes) = self.passes {
            cfg.passes = passes;
        }
        if let Some(workers) = self.workers {
            cfg.workers = WorkerPolicy::Fixed(workers);
        } else if !self.worker_counts.is_empty() {
            cfg.workers = WorkerPolicy::Sequence(self.worker_counts.clone());
        } else if let Some(max_workers) = self.max_workers {
            cfg.workers = WorkerPolicy::Random { max_workers };
        }
        if self.seed.is_some() {
            cfg.seed = self.seed;
        }
        if self.lockstep {
            cfg.mode = ExecutionMode::Lockstep;
        }
        if self.barrier_timeout_ms.is_some() {
            cfg.barrier_timeout_ms = self.barrier_timeout_ms;
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match args.cmd {
        Command::Shuffle(ref shuffle) => run_shuffle(shuffle, args.store_dir.as_deref()),
        Command::Plan { tokens, workers } => {
            let plan = SegmentPlan::from_signed(tokens, workers)?;
            println!("{:?}", plan.sizes());
            Ok(())
        }
        Command::Config { ref config, save } => {
            let cfg = load_config(config.as_deref(), args.store_dir.as_deref())?;
            if save {
                let repo = ConfigRepo::new(open_store(args.store_dir.as_deref())?);
                repo.save(&cfg).context("saving config")?;
                info!(dir = %repo.store().base().display(), "config saved");
            }
            println!("{}", serde_json::to_string_pretty(&cfg)?);
            Ok(())
        }
    }
}

fn run_shuffle(args: &ShuffleArgs, store_dir: Option<&Path>) -> Result<()> {
    let start = Instant::now();
    let mut cfg = load_config(args.config.as_deref(), store_dir)?;
    args.apply(&mut cfg);

    let tokens = FileSource::new(&args.input)
        .read_tokens()
        .with_context(|| format!("reading tokens from {}", args.input.display()))?;
    if tokens.is_empty() {
        info!(input = %args.input.display(), "nothing to shuffle");
        return Ok(());
    }

    let rng = cfg.random_source();
    info!(
        seed = rng.seed(),
        passes = cfg.passes,
        tokens = tokens.len(),
        mode = ?cfg.mode,
        "shuffling"
    );

    let mut driver = PassDriver::new(rng, cfg.pass_options());
    let mut policy = cfg.workers.clone();
    let outcome = driver
        .run(tokens, cfg.passes, &mut policy)
        .context("shuffle failed")?;
    for pass in &outcome.passes {
        info!(
            pass = pass.index + 1,
            workers = pass.workers,
            "pass finished"
        );
    }

    AppendFileSink::new(&args.output)
        .append(&outcome.tokens)
        .with_context(|| format!("writing {}", args.output.display()))?;
    if args.print {
        WriterSink::new(io::stdout().lock())
            .append(&outcome.tokens)
            .context("writing stdout")?;
    }

    info!(
        elapsed = ?start.elapsed(),
        output = %args.output.display(),
        "done"
    );
    Ok(())
}

fn open_store(store_dir: Option<&Path>) -> Result<FsConfigStore> {
    let store = match store_dir {
        Some(dir) => FsConfigStore::at(dir),
        None => FsConfigStore::new(),
    };
    store.context("opening config store")
}

/// Explicit file first, then the store (best-effort), then defaults.
fn load_config(path: Option<&Path>, store_dir: Option<&Path>) -> Result<ShuffleConfig> {
    if let Some(path) = path {
        return Ok(read_config_file(path)?);
    }

    let stored = open_store(store_dir).and_then(|store| {
        ConfigRepo::new(store)
            .load_or_default()
            .context("loading stored config")
    });
    match stored {
        Ok(cfg) => Ok(cfg),
        Err(err) => {
            warn!(error = %err, "ignoring stored config");
            Ok(ShuffleConfig::default())
        }
    }
}
