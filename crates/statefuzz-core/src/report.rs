//! Structured violation reports — the artifact a human or CI gate consumes.

use serde::{Deserialize, Serialize};

use crate::executor::Violation;
use crate::machine::MachineSpec;

/// The report emitted when a session finds (and shrinks) a violation.
///
/// Serializes to the wire format
/// `{"sequence": [["set0", 0], ["set1", 0]], "violatingInvariant": ...,
/// "violatingIndex": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationReport {
    /// The (shrunk) sequence as (mutator name, argument) pairs.
    pub sequence: Vec<(String, i64)>,
    /// Name of the first invariant that evaluated false.
    pub violating_invariant: String,
    /// Index of the first failing call within `sequence`.
    pub violating_index: usize,
}

impl ViolationReport {
    pub fn new(spec: &MachineSpec, violation: &Violation) -> Self {
        Self {
            sequence: violation.sequence.to_named(spec),
            violating_invariant: spec.invariant(violation.invariant).name.clone(),
            violating_index: violation.index,
        }
    }
}
