//! Property-based tests for the fuzzer core.
//!
//! Uses proptest to generate random call sequences against the breaker
//! fixture, then verify executor, shrinker, and corpus invariants hold.

use proptest::prelude::*;
use statefuzz_core::corpus::Corpus;
use statefuzz_core::executor;
use statefuzz_core::machine::MutatorId;
use statefuzz_core::rng::FuzzRng;
use statefuzz_core::sequence::{Call, CallSequence};
use statefuzz_core::shrink::shrink;
use statefuzz_core::test_utils::*;

// ===========================================================================
// Generators
// ===========================================================================

/// Generate a random in-domain call sequence for the breaker fixture.
fn arb_sequence(max_len: usize) -> impl Strategy<Value = CallSequence> {
    proptest::collection::vec((0..2u32, 0..=BREAKER_ARG_MAX), 0..=max_len).prop_map(|calls| {
        CallSequence::from_calls(
            calls
                .into_iter()
                .map(|(mutator, arg)| Call {
                    mutator: MutatorId(mutator),
                    arg,
                })
                .collect(),
        )
    })
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Replaying the same sequence on fresh instances yields identical traces.
    #[test]
    fn executor_is_deterministic(sequence in arb_sequence(24)) {
        let spec = breaker_spec();
        let a = executor::run(&spec, &sequence).unwrap();
        let b = executor::run(&spec, &sequence).unwrap();
        prop_assert_eq!(a, b);
    }

    /// A trace never extends past its violation point.
    #[test]
    fn trace_stops_at_first_failure(sequence in arb_sequence(24)) {
        let spec = breaker_spec();
        let trace = executor::run(&spec, &sequence).unwrap();
        match &trace.violation {
            Some(violation) => prop_assert_eq!(trace.steps.len(), violation.index + 1),
            None => prop_assert_eq!(trace.steps.len(), sequence.len()),
        }
    }

    /// Shrinking never grows a sequence, and the result always reproduces
    /// the same invariant violation when re-executed.
    #[test]
    fn shrink_output_reproduces(sequence in arb_sequence(24)) {
        let spec = breaker_spec();
        let trace = executor::run(&spec, &sequence).unwrap();
        if let Some(violation) = trace.violation {
            let shrunk = shrink(&spec, &violation, 16);
            prop_assert!(shrunk.len() <= sequence.len());

            let rerun = executor::run(&spec, &shrunk).unwrap();
            let reproduced = rerun.violation.expect("shrunk sequence must reproduce");
            prop_assert_eq!(reproduced.invariant, violation.invariant);
        }
    }

    /// Corpus size never decreases, whatever order traces are absorbed in.
    #[test]
    fn corpus_grows_monotonically(sequences in proptest::collection::vec(arb_sequence(12), 1..30)) {
        let spec = breaker_spec();
        let mut corpus = Corpus::new(&spec, 12);
        let mut last = 0;
        for sequence in sequences {
            let trace = executor::run(&spec, &sequence).unwrap();
            if trace.violation.is_none() {
                corpus.absorb(sequence, &trace);
            }
            prop_assert!(corpus.len() >= last);
            last = corpus.len();
        }
    }

    /// Sampling and mutating stay within the declared argument domains.
    #[test]
    fn generated_calls_stay_in_domain(seed in any::<u64>()) {
        let spec = breaker_spec();
        let corpus = Corpus::new(&spec, 16);
        let mut rng = FuzzRng::new(seed);
        let mut sequence = corpus.sample(&mut rng, &spec);
        for _ in 0..32 {
            corpus.mutate(&mut sequence, &mut rng, &spec);
        }
        for call in &sequence.calls {
            prop_assert!(spec.mutator(call.mutator).domain.contains(call.arg));
        }
    }
}
