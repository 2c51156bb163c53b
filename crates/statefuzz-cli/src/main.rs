//! CI-gate CLI: run one fuzz session against a JSON machine spec.
//!
//! Prints the shrunk violation report as JSON on stdout, or
//! `no violation found within budget`. Exit codes: 0 no violation,
//! 1 violation found, 2 invalid spec/config.

mod exit_codes;
mod logging;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use statefuzz_core::loader;
use statefuzz_core::machine::{MachineError, MachineSpec};
use statefuzz_core::scheduler::{self, FuzzConfig, SessionOutcome};

#[derive(Debug, Parser)]
#[command(
    name = "statefuzz",
    about = "Invariant fuzzer for declarative state machines"
)]
struct Cli {
    /// Path to the JSON machine spec.
    spec: PathBuf,

    /// PRNG seed. Sessions are fully reproducible given the same seed.
    #[arg(long, default_value_t = 0x5EED)]
    seed: u64,

    /// Maximum length of generated call sequences.
    #[arg(long, default_value_t = 32)]
    max_sequence_length: usize,

    /// Iteration budget for the session.
    #[arg(long, default_value_t = 100_000)]
    max_iterations: u64,

    /// Optional wall-clock budget in milliseconds.
    #[arg(long)]
    time_budget_ms: Option<u64>,

    /// Shrink round limit.
    #[arg(long, default_value_t = 16)]
    max_shrink_rounds: usize,

    /// JSON file of initial corpus sequences, e.g. [[["set0", 100]]].
    #[arg(long)]
    corpus_seeds: Option<PathBuf>,

    /// Number of independent worker loops sharing one corpus.
    #[cfg(feature = "parallel")]
    #[arg(long, default_value_t = 1)]
    workers: usize,
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    let spec_json = std::fs::read_to_string(&cli.spec)
        .with_context(|| format!("reading spec file {}", cli.spec.display()))?;
    let spec = loader::load_spec_json(&spec_json).context("parsing machine spec")?;

    let corpus_seeds = match &cli.corpus_seeds {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading seed file {}", path.display()))?;
            loader::load_seeds_json(&json, &spec).context("parsing corpus seeds")?
        }
        None => Vec::new(),
    };

    let config = FuzzConfig {
        seed: cli.seed,
        max_sequence_length: cli.max_sequence_length,
        max_iterations: cli.max_iterations,
        time_budget: cli.time_budget_ms.map(Duration::from_millis),
        max_shrink_rounds: cli.max_shrink_rounds,
        corpus_seeds,
    };

    tracing::info!(
        spec = %spec.name(),
        seed = config.seed,
        max_iterations = config.max_iterations,
        "starting fuzz session"
    );

    match dispatch(cli, &spec, &config)? {
        SessionOutcome::Violation(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(exit_codes::VIOLATION)
        }
        SessionOutcome::Exhausted(reason) => {
            tracing::info!(?reason, "session exhausted");
            println!("no violation found within budget");
            Ok(exit_codes::OK)
        }
    }
}

#[cfg(feature = "parallel")]
fn dispatch(
    cli: &Cli,
    spec: &MachineSpec,
    config: &FuzzConfig,
) -> Result<SessionOutcome, MachineError> {
    if cli.workers > 1 {
        scheduler::run_parallel_session(spec, config, cli.workers)
    } else {
        scheduler::run_session(spec, config)
    }
}

#[cfg(not(feature = "parallel"))]
fn dispatch(
    _cli: &Cli,
    spec: &MachineSpec,
    config: &FuzzConfig,
) -> Result<SessionOutcome, MachineError> {
    scheduler::run_session(spec, config)
}
