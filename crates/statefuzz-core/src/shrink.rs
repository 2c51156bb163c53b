//! Violation minimization.
//!
//! Given a sequence known to violate an invariant, the shrinker searches for
//! a shorter, simpler sequence that still reproduces the same violation.
//! Two reductions are attempted per round: deleting a call, and replacing a
//! call's argument with a simpler value. Rounds repeat until a local
//! fixpoint, bounded by the configured round limit. The result is locally,
//! not globally, minimal.

use crate::executor::{self, Violation};
use crate::machine::{InvariantId, MachineSpec};
use crate::sequence::CallSequence;

/// Re-run a candidate and check that it still violates the same invariant
/// at an index no later than `max_index`. Returns the reproduced index.
///
/// Execution errors count as "does not reproduce" — a shrink candidate must
/// stand on its own.
fn reproduces(
    spec: &MachineSpec,
    candidate: &CallSequence,
    invariant: InvariantId,
    max_index: usize,
) -> Option<usize> {
    let trace = executor::run(spec, candidate).ok()?;
    let violation = trace.violation?;
    (violation.invariant == invariant && violation.index <= max_index).then_some(violation.index)
}

/// Minimize a violating sequence.
///
/// Never returns a sequence longer than the input, and the returned sequence
/// always reproduces the original violation's invariant when re-executed.
pub fn shrink(
    spec: &MachineSpec,
    violation: &Violation,
    max_rounds: usize,
) -> CallSequence {
    let mut best = violation.sequence.clone();
    let mut best_index = violation.index;

    // Anything past the violation point never executed; drop it up front.
    best.calls.truncate(best_index + 1);

    for _ in 0..max_rounds {
        let mut improved = false;

        // Pass (a): try deleting each call.
        let mut i = 0;
        while i < best.calls.len() {
            let mut candidate = best.clone();
            candidate.calls.remove(i);
            match reproduces(spec, &candidate, violation.invariant, best_index) {
                Some(index) => {
                    best = candidate;
                    best_index = index;
                    improved = true;
                }
                None => i += 1,
            }
        }

        // Pass (b): try simpler arguments, smallest first.
        for i in 0..best.calls.len() {
            let call = best.calls[i];
            let domain = spec.mutator(call.mutator).domain;
            for simpler in [0, domain.min, call.arg / 2] {
                if simpler == call.arg || !domain.contains(simpler) {
                    continue;
                }
                let mut candidate = best.clone();
                candidate.calls[i].arg = simpler;
                if let Some(index) =
                    reproduces(spec, &candidate, violation.invariant, best_index)
                {
                    best = candidate;
                    best_index = index;
                    improved = true;
                    break;
                }
            }
        }

        if !improved {
            break;
        }
    }

    best
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn violation_for(spec: &MachineSpec, sequence: CallSequence) -> Violation {
        executor::run(spec, &sequence)
            .unwrap()
            .violation
            .expect("fixture sequence must violate")
    }

    #[test]
    fn shrinks_noise_out_of_violating_sequence() {
        let spec = breaker_spec();
        // Noisy sequence: only set0(300) and set1(20) matter.
        let sequence = seq(
            &spec,
            &[
                ("set0", 5),
                ("set1", 7),
                ("set0", 300),
                ("set1", 33),
                ("set1", 20),
            ],
        );
        let violation = violation_for(&spec, sequence);
        let shrunk = shrink(&spec, &violation, 16);

        assert_eq!(shrunk.len(), 2);
        // Arguments simplified to the smallest reproducing values.
        assert_eq!(shrunk.to_named(&spec), vec![
            ("set0".to_string(), 0),
            ("set1".to_string(), 0),
        ]);
    }

    #[test]
    fn shrunk_sequence_reproduces_same_invariant() {
        let spec = breaker_spec();
        let sequence = seq(&spec, &[("set0", 100), ("set1", 55), ("set1", 10)]);
        let violation = violation_for(&spec, sequence);
        let shrunk = shrink(&spec, &violation, 16);

        let trace = executor::run(&spec, &shrunk).unwrap();
        let reproduced = trace.violation.expect("shrunk sequence must reproduce");
        assert_eq!(reproduced.invariant, violation.invariant);
    }

    #[test]
    fn never_longer_than_input() {
        let spec = breaker_spec();
        let sequence = seq(&spec, &[("set0", 100), ("set1", 10)]);
        let violation = violation_for(&spec, sequence.clone());
        let shrunk = shrink(&spec, &violation, 16);
        assert!(shrunk.len() <= sequence.len());
    }

    #[test]
    fn truncates_calls_after_violation_point() {
        let spec = breaker_spec();
        // Violation at index 1; trailing calls are dead weight.
        let sequence = seq(
            &spec,
            &[("set0", 100), ("set1", 10), ("set0", 5), ("set1", 7)],
        );
        let violation = violation_for(&spec, sequence);
        assert_eq!(violation.index, 1);
        let shrunk = shrink(&spec, &violation, 16);
        assert_eq!(shrunk.len(), 2);
    }

    #[test]
    fn zero_rounds_returns_truncated_input() {
        let spec = breaker_spec();
        let sequence = seq(&spec, &[("set0", 100), ("set1", 10)]);
        let violation = violation_for(&spec, sequence.clone());
        let shrunk = shrink(&spec, &violation, 0);
        assert_eq!(shrunk, sequence);
    }
}
