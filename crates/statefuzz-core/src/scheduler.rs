//! The fuzz session loop: sample, mutate, execute, absorb or shrink.
//!
//! A session is a single-threaded cooperative loop — one sequence is
//! generated, executed, and checked to completion before the next begins.
//! Each iteration consumes one corpus sample and contributes at most one
//! corpus insertion. The loop terminates on the first violation (after
//! shrinking), on budget exhaustion, or on external cancellation.
//!
//! The optional `parallel` feature adds N independent loops over a shared,
//! mutex-guarded corpus; see [`run_parallel_session`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::corpus::Corpus;
use crate::executor::{self, Violation};
use crate::machine::{MachineError, MachineSpec};
use crate::report::ViolationReport;
use crate::rng::FuzzRng;
use crate::sequence::CallSequence;
use crate::shrink;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Session configuration.
#[derive(Debug, Clone)]
pub struct FuzzConfig {
    /// PRNG seed — a session is fully reproducible from it.
    pub seed: u64,
    /// Maximum length of generated/mutated sequences.
    pub max_sequence_length: usize,
    /// Iteration budget. Zero means the executor is never invoked.
    pub max_iterations: u64,
    /// Optional wall-clock budget, checked at iteration boundaries.
    pub time_budget: Option<Duration>,
    /// Shrink round limit (local-fixpoint bound).
    pub max_shrink_rounds: usize,
    /// Initial corpus entries. May be empty (pure random generation).
    pub corpus_seeds: Vec<CallSequence>,
}

impl Default for FuzzConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED,
            max_sequence_length: 32,
            max_iterations: 10_000,
            time_budget: None,
            max_shrink_rounds: 16,
            corpus_seeds: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Why a session stopped without finding a violation.
///
/// `Cancelled` ("search stopped") is distinguishable from the budget
/// variants ("search completed within budget").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustReason {
    Iterations,
    TimeBudget,
    Cancelled,
}

/// Terminal outcome of a session. Neither variant is an error: absence of a
/// counterexample is not proof of correctness, and a found violation is the
/// tool doing its job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Violation(ViolationReport),
    Exhausted(ExhaustReason),
}

// ---------------------------------------------------------------------------
// Session loop
// ---------------------------------------------------------------------------

/// Run one fuzz session to completion.
///
/// Spec-integrity errors (`UnknownMutator`, `UnknownInvariant`) abort the
/// session; a candidate that fails its own execution (out-of-range argument)
/// is logged and discarded without killing the loop.
pub fn run_session(
    spec: &MachineSpec,
    config: &FuzzConfig,
) -> Result<SessionOutcome, MachineError> {
    let never = AtomicBool::new(false);
    run_session_with_cancel(spec, config, &never)
}

/// Like [`run_session`], polling `cancel` at each iteration boundary.
pub fn run_session_with_cancel(
    spec: &MachineSpec,
    config: &FuzzConfig,
    cancel: &AtomicBool,
) -> Result<SessionOutcome, MachineError> {
    let mut rng = FuzzRng::new(config.seed);
    let mut corpus = Corpus::new(spec, config.max_sequence_length);
    corpus.seed(config.corpus_seeds.clone());

    let started = Instant::now();

    for iteration in 0..config.max_iterations {
        if cancel.load(Ordering::Relaxed) {
            tracing::debug!(iteration, "session cancelled");
            return Ok(SessionOutcome::Exhausted(ExhaustReason::Cancelled));
        }
        if let Some(budget) = config.time_budget
            && started.elapsed() >= budget
        {
            tracing::debug!(iteration, "time budget elapsed");
            return Ok(SessionOutcome::Exhausted(ExhaustReason::TimeBudget));
        }

        match step(spec, config, &mut rng, &mut corpus)? {
            Some(report) => {
                tracing::info!(
                    iteration,
                    invariant = %report.violating_invariant,
                    sequence_len = report.sequence.len(),
                    "violation found"
                );
                return Ok(SessionOutcome::Violation(report));
            }
            None => continue,
        }
    }

    tracing::debug!(
        corpus = corpus.len(),
        signatures = corpus.signature_count(),
        "iteration budget exhausted"
    );
    Ok(SessionOutcome::Exhausted(ExhaustReason::Iterations))
}

/// One iteration: sample-or-mutate, execute, then absorb or shrink.
fn step(
    spec: &MachineSpec,
    config: &FuzzConfig,
    rng: &mut FuzzRng,
    corpus: &mut Corpus,
) -> Result<Option<ViolationReport>, MachineError> {
    let mut candidate = corpus.sample(rng, spec);
    if !corpus.is_empty() {
        corpus.mutate(&mut candidate, rng, spec);
    }

    let trace = match executor::run(spec, &candidate) {
        Ok(trace) => trace,
        Err(err @ MachineError::ArgumentOutOfRange { .. }) => {
            // A generated argument escaped its domain. That points at the
            // generator, not the target; discard the candidate and go on.
            tracing::warn!(%err, "discarding invalid candidate sequence");
            return Ok(None);
        }
        // Spec/sequence mismatch: the session cannot proceed.
        Err(err) => return Err(err),
    };

    if let Some(violation) = trace.violation {
        return Ok(Some(shrink_and_report(spec, config, &violation)));
    }

    corpus.absorb(candidate, &trace);
    Ok(None)
}

/// Shrink a violation and build its report.
fn shrink_and_report(
    spec: &MachineSpec,
    config: &FuzzConfig,
    violation: &Violation,
) -> ViolationReport {
    let shrunk = shrink::shrink(spec, violation, config.max_shrink_rounds);

    // Re-run the shrunk sequence for its final violation index. The shrinker
    // guarantees reproduction; fall back to the original if that ever breaks.
    let reproduced = executor::run(spec, &shrunk)
        .ok()
        .and_then(|trace| trace.violation);
    match reproduced {
        Some(v) => ViolationReport::new(spec, &v),
        None => {
            tracing::error!("shrunk sequence failed to reproduce; reporting original");
            ViolationReport::new(spec, violation)
        }
    }
}

// ---------------------------------------------------------------------------
// Parallel mode
// ---------------------------------------------------------------------------

/// Run `workers` independent session loops over a shared corpus.
///
/// Each worker owns a derived, thread-confined RNG and its own state
/// instances; the corpus mutex around `sample`/`absorb` is the only shared
/// mutation point. The first violation cancels the remaining workers.
#[cfg(feature = "parallel")]
pub fn run_parallel_session(
    spec: &MachineSpec,
    config: &FuzzConfig,
    workers: usize,
) -> Result<SessionOutcome, MachineError> {
    use std::sync::Mutex;
    use std::sync::atomic::AtomicU64;

    let workers = workers.max(1);
    let corpus = {
        let mut c = Corpus::new(spec, config.max_sequence_length);
        c.seed(config.corpus_seeds.clone());
        Mutex::new(c)
    };
    let iterations = AtomicU64::new(0);
    let stop = AtomicBool::new(false);
    let outcome: Mutex<Option<Result<SessionOutcome, MachineError>>> = Mutex::new(None);
    let started = Instant::now();
    let parent = FuzzRng::new(config.seed);

    rayon::scope(|scope| {
        for worker in 0..workers as u64 {
            let corpus = &corpus;
            let iterations = &iterations;
            let stop = &stop;
            let outcome = &outcome;
            let parent = &parent;
            scope.spawn(move |_| {
                let mut rng = parent.derive(worker);
                loop {
                    if stop.load(Ordering::Relaxed) {
                        return;
                    }
                    if iterations.fetch_add(1, Ordering::Relaxed) >= config.max_iterations {
                        return;
                    }
                    if let Some(budget) = config.time_budget
                        && started.elapsed() >= budget
                    {
                        return;
                    }

                    let candidate = {
                        let corpus = corpus.lock().expect("corpus lock poisoned");
                        let mut candidate = corpus.sample(&mut rng, spec);
                        if !corpus.is_empty() {
                            corpus.mutate(&mut candidate, &mut rng, spec);
                        }
                        candidate
                    };

                    let trace = match executor::run(spec, &candidate) {
                        Ok(trace) => trace,
                        Err(err @ MachineError::ArgumentOutOfRange { .. }) => {
                            tracing::warn!(%err, "discarding invalid candidate sequence");
                            continue;
                        }
                        Err(err) => {
                            stop.store(true, Ordering::Relaxed);
                            outcome.lock().expect("outcome lock poisoned").get_or_insert(Err(err));
                            return;
                        }
                    };

                    if let Some(violation) = trace.violation {
                        let report = shrink_and_report(spec, config, &violation);
                        stop.store(true, Ordering::Relaxed);
                        outcome
                            .lock()
                            .expect("outcome lock poisoned")
                            .get_or_insert(Ok(SessionOutcome::Violation(report)));
                        return;
                    }

                    corpus
                        .lock()
                        .expect("corpus lock poisoned")
                        .absorb(candidate, &trace);
                }
            });
        }
    });

    outcome
        .into_inner()
        .expect("outcome lock poisoned")
        .unwrap_or(Ok(SessionOutcome::Exhausted(ExhaustReason::Iterations)))
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn finds_and_shrinks_breaker_violation() {
        let spec = breaker_spec();
        let config = FuzzConfig {
            seed: 1,
            max_iterations: 200_000,
            ..FuzzConfig::default()
        };
        let outcome = run_session(&spec, &config).unwrap();

        let SessionOutcome::Violation(report) = outcome else {
            panic!("expected a violation, got {outcome:?}");
        };
        assert_eq!(report.violating_invariant, "invariant_never_false");
        // The shrunk witness is exactly set0 then set1, arguments zeroed.
        assert_eq!(report.sequence, vec![
            ("set0".to_string(), 0),
            ("set1".to_string(), 0),
        ]);
        assert_eq!(report.violating_index, 1);
    }

    #[test]
    fn zero_iterations_exhausts_without_executing() {
        let spec = breaker_spec();
        let config = FuzzConfig {
            max_iterations: 0,
            ..FuzzConfig::default()
        };
        let outcome = run_session(&spec, &config).unwrap();
        assert_eq!(
            outcome,
            SessionOutcome::Exhausted(ExhaustReason::Iterations)
        );
    }

    #[test]
    fn cancellation_is_distinguishable_from_budget() {
        let spec = breaker_spec();
        let config = FuzzConfig::default();
        let cancel = AtomicBool::new(true);
        let outcome = run_session_with_cancel(&spec, &config, &cancel).unwrap();
        assert_eq!(outcome, SessionOutcome::Exhausted(ExhaustReason::Cancelled));
    }

    #[test]
    fn sessions_are_reproducible_for_same_seed() {
        let spec = breaker_spec();
        let config = FuzzConfig {
            seed: 99,
            max_iterations: 50_000,
            ..FuzzConfig::default()
        };
        let a = run_session(&spec, &config).unwrap();
        let b = run_session(&spec, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn corpus_seed_speeds_discovery() {
        let spec = breaker_spec();
        // Seed one call short of the violation; the append mutation closes
        // the gap within a small iteration budget.
        let config = FuzzConfig {
            seed: 7,
            max_iterations: 50_000,
            corpus_seeds: vec![seq(&spec, &[("set0", 100)])],
            ..FuzzConfig::default()
        };
        let outcome = run_session(&spec, &config).unwrap();
        assert!(matches!(outcome, SessionOutcome::Violation(_)));
    }

    #[test]
    fn unsatisfiable_invariant_spec_exhausts() {
        // A machine whose invariant can never fail.
        let spec = counter_spec();
        let config = FuzzConfig {
            max_iterations: 500,
            ..FuzzConfig::default()
        };
        let outcome = run_session(&spec, &config).unwrap();
        assert_eq!(
            outcome,
            SessionOutcome::Exhausted(ExhaustReason::Iterations)
        );
    }

    #[test]
    fn time_budget_zero_exhausts_immediately() {
        let spec = breaker_spec();
        let config = FuzzConfig {
            time_budget: Some(Duration::ZERO),
            ..FuzzConfig::default()
        };
        let outcome = run_session(&spec, &config).unwrap();
        assert_eq!(
            outcome,
            SessionOutcome::Exhausted(ExhaustReason::TimeBudget)
        );
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_session_finds_breaker_violation() {
        let spec = breaker_spec();
        let config = FuzzConfig {
            seed: 3,
            max_iterations: 400_000,
            ..FuzzConfig::default()
        };
        let outcome = run_parallel_session(&spec, &config, 4).unwrap();
        let SessionOutcome::Violation(report) = outcome else {
            panic!("expected a violation, got {outcome:?}");
        };
        assert_eq!(report.violating_invariant, "invariant_never_false");
    }
}
