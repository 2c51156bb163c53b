//! Call sequences: the fuzzer's unit of input.

use serde::{Deserialize, Serialize};

use crate::machine::{MachineError, MachineSpec, MutatorId};

/// One mutator invocation: which mutator, with which argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub mutator: MutatorId,
    pub arg: i64,
}

/// An ordered sequence of calls.
///
/// Owned by the corpus; cloned (never shared mutably) when handed to the
/// executor, so evaluation can never mutate a retained corpus entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSequence {
    pub calls: Vec<Call>,
}

impl CallSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_calls(calls: Vec<Call>) -> Self {
        Self { calls }
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Resolve a sequence of (mutator name, argument) pairs against a spec.
    ///
    /// Fails with `UnknownMutator` on any unresolved name — a spec/sequence
    /// mismatch that must never be silently ignored.
    pub fn resolve(spec: &MachineSpec, named: &[(String, i64)]) -> Result<Self, MachineError> {
        let calls = named
            .iter()
            .map(|(name, arg)| {
                Ok(Call {
                    mutator: spec.mutator_id(name)?,
                    arg: *arg,
                })
            })
            .collect::<Result<Vec<_>, MachineError>>()?;
        Ok(Self { calls })
    }

    /// Render the sequence with mutator names, for reports and seed files.
    pub fn to_named(&self, spec: &MachineSpec) -> Vec<(String, i64)> {
        self.calls
            .iter()
            .map(|c| (spec.mutator(c.mutator).name.clone(), c.arg))
            .collect()
    }
}
