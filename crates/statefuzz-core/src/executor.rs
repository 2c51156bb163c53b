//! Sequence replay and invariant checking.
//!
//! The executor replays a call sequence against a fresh state instance,
//! evaluating every invariant after each call. Execution stops at the first
//! call after which any invariant is false ("first failure" semantics) — the
//! remaining calls are never applied to the corrupted state.

use std::collections::BTreeMap;

use crate::machine::{InvariantId, MachineError, MachineSpec, StateInstance, StateSignature};
use crate::sequence::CallSequence;

// ---------------------------------------------------------------------------
// Trace types
// ---------------------------------------------------------------------------

/// State and invariant results after one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceStep {
    /// Index of the call that produced this step.
    pub index: usize,
    /// Snapshot of all field values after the call.
    pub state: StateSignature,
    /// Invariant results, indexed by `InvariantId`.
    pub invariants: Vec<bool>,
}

/// A recorded invariant violation. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// The sequence that triggered the violation.
    pub sequence: CallSequence,
    /// Index of the first failing call.
    pub index: usize,
    /// The first invariant that evaluated false at that call.
    pub invariant: InvariantId,
}

/// The result of replaying one sequence. Read-only once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionTrace {
    pub steps: Vec<TraceStep>,
    pub violation: Option<Violation>,
}

impl ExecutionTrace {
    /// Signature of the final step, if any call was executed.
    pub fn final_signature(&self) -> Option<&StateSignature> {
        self.steps.last().map(|s| &s.state)
    }
}

// ---------------------------------------------------------------------------
// Invariant checker
// ---------------------------------------------------------------------------

/// Evaluate every invariant against the current state.
///
/// Pure and stateless; results are indexed by `InvariantId`.
pub fn check_all(spec: &MachineSpec, state: &StateInstance) -> Vec<bool> {
    spec.invariants()
        .iter()
        .map(|inv| inv.holds.eval(state, 0))
        .collect()
}

/// The name -> result mapping for one set of invariant results.
pub fn results_by_name<'a>(spec: &'a MachineSpec, results: &[bool]) -> BTreeMap<&'a str, bool> {
    spec.invariants()
        .iter()
        .zip(results)
        .map(|(inv, &ok)| (inv.name.as_str(), ok))
        .collect()
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Replay a sequence against a freshly constructed instance.
///
/// Applies each call in order; after each call every invariant is evaluated
/// and a trace step appended. Stops early once any invariant is false and
/// records that index as the violation point. No state outside the fresh
/// instance is touched.
pub fn run(spec: &MachineSpec, sequence: &CallSequence) -> Result<ExecutionTrace, MachineError> {
    let mut state = spec.initial_state();
    let mut steps = Vec::with_capacity(sequence.len());
    let mut violation = None;

    for (index, call) in sequence.calls.iter().enumerate() {
        spec.apply_mutator(&mut state, call.mutator, call.arg)?;
        let invariants = check_all(spec, &state);
        let failed = invariants.iter().position(|ok| !ok);
        steps.push(TraceStep {
            index,
            state: state.signature(),
            invariants,
        });
        if let Some(pos) = failed {
            violation = Some(Violation {
                sequence: sequence.clone(),
                index,
                invariant: InvariantId(pos as u32),
            });
            break;
        }
    }

    Ok(ExecutionTrace { steps, violation })
}

// ===========================================================================
// Tests
// ===========================================================================
