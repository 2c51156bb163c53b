//! Coverage-guided corpus of retained call sequences.
//!
//! A sequence earns its place in the corpus by reaching a final-step
//! state-signature no earlier member reached. The corpus only grows during a
//! session; retention decisions and all mutation operators draw randomness
//! exclusively from the caller's [`FuzzRng`], so a session is reproducible
//! from its seed.

use std::collections::BTreeSet;

use crate::executor::ExecutionTrace;
use crate::machine::{MachineSpec, MutatorId, StateSignature};
use crate::rng::FuzzRng;
use crate::sequence::{Call, CallSequence};

/// Stores, samples, and mutates call sequences.
#[derive(Debug, Clone)]
pub struct Corpus {
    entries: Vec<CallSequence>,
    seen: BTreeSet<StateSignature>,
    max_sequence_length: usize,
}

impl Corpus {
    /// Create an empty corpus.
    ///
    /// The initial state's signature counts as already seen: a sequence that
    /// goes nowhere new is never retained.
    pub fn new(spec: &MachineSpec, max_sequence_length: usize) -> Self {
        let mut seen = BTreeSet::new();
        seen.insert(spec.initial_state().signature());
        Self {
            entries: Vec::new(),
            seen,
            max_sequence_length: max_sequence_length.max(1),
        }
    }

    /// Add initial sequences without a coverage check.
    pub fn seed(&mut self, sequences: Vec<CallSequence>) {
        self.entries.extend(sequences);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct state-signatures observed so far.
    pub fn signature_count(&self) -> usize {
        self.seen.len()
    }

    /// Pick a sequence to work on next.
    ///
    /// Uniform choice from the corpus; when the corpus is empty, a fresh
    /// random sequence of random length (1..=max) is generated instead.
    pub fn sample(&self, rng: &mut FuzzRng, spec: &MachineSpec) -> CallSequence {
        if self.entries.is_empty() {
            return self.random_sequence(rng, spec);
        }
        self.entries[rng.index(self.entries.len())].clone()
    }

    /// Apply one randomly chosen mutation operator to the sequence.
    ///
    /// Operators: insert a random call, delete a random call, mutate one
    /// call's argument (uniform in its domain), splice with another corpus
    /// member. Inapplicable choices fall back to insertion.
    pub fn mutate(&self, sequence: &mut CallSequence, rng: &mut FuzzRng, spec: &MachineSpec) {
        match rng.index(4) {
            1 if sequence.len() > 1 => {
                let at = rng.index(sequence.len());
                sequence.calls.remove(at);
            }
            2 if !sequence.is_empty() => {
                let at = rng.index(sequence.len());
                let domain = spec.mutator(sequence.calls[at].mutator).domain;
                sequence.calls[at].arg = rng.range_i64(domain.min, domain.max);
            }
            3 if !self.entries.is_empty() => {
                let other = &self.entries[rng.index(self.entries.len())];
                self.splice(sequence, other, rng);
            }
            _ => {
                if sequence.len() < self.max_sequence_length {
                    let at = rng.index(sequence.len() + 1);
                    sequence.calls.insert(at, self.random_call(rng, spec));
                } else if !sequence.is_empty() {
                    let at = rng.index(sequence.len());
                    let domain = spec.mutator(sequence.calls[at].mutator).domain;
                    sequence.calls[at].arg = rng.range_i64(domain.min, domain.max);
                }
            }
        }
    }

    /// Retain the sequence iff its trace reached a new final state-signature.
    ///
    /// Returns whether the sequence was absorbed. Re-absorbing an
    /// already-represented signature is a no-op; the corpus never shrinks.
    pub fn absorb(&mut self, sequence: CallSequence, trace: &ExecutionTrace) -> bool {
        let Some(signature) = trace.final_signature() else {
            return false;
        };
        if !self.seen.insert(signature.clone()) {
            return false;
        }
        self.entries.push(sequence);
        true
    }

    fn random_call(&self, rng: &mut FuzzRng, spec: &MachineSpec) -> Call {
        let mutator = MutatorId(rng.index(spec.mutators().len()) as u32);
        let domain = spec.mutator(mutator).domain;
        Call {
            mutator,
            arg: rng.range_i64(domain.min, domain.max),
        }
    }

    fn random_sequence(&self, rng: &mut FuzzRng, spec: &MachineSpec) -> CallSequence {
        let len = 1 + rng.index(self.max_sequence_length);
        let calls = (0..len).map(|_| self.random_call(rng, spec)).collect();
        CallSequence::from_calls(calls)
    }

    /// Keep a prefix of `sequence`, then append a suffix of `other`.
    fn splice(&self, sequence: &mut CallSequence, other: &CallSequence, rng: &mut FuzzRng) {
        if other.is_empty() {
            return;
        }
        let cut = rng.index(sequence.len() + 1);
        let from = rng.index(other.len());
        sequence.calls.truncate(cut);
        sequence.calls.extend_from_slice(&other.calls[from..]);
        sequence.calls.truncate(self.max_sequence_length);
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor;
    use crate::test_utils::*;

    #[test]
    fn empty_corpus_generates_random_sequences() {
        let spec = breaker_spec();
        let corpus = Corpus::new(&spec, 8);
        let mut rng = FuzzRng::new(1);
        for _ in 0..100 {
            let sequence = corpus.sample(&mut rng, &spec);
            assert!((1..=8).contains(&sequence.len()));
            for call in &sequence.calls {
                let domain = spec.mutator(call.mutator).domain;
                assert!(domain.contains(call.arg));
            }
        }
    }

    #[test]
    fn absorb_retains_only_new_signatures() {
        let spec = breaker_spec();
        let mut corpus = Corpus::new(&spec, 8);

        // [set0(100)] reaches [0, 1] — new.
        let a = seq(&spec, &[("set0", 100)]);
        let trace_a = executor::run(&spec, &a).unwrap();
        assert!(corpus.absorb(a.clone(), &trace_a));
        assert_eq!(corpus.len(), 1);

        // A different sequence with the same final signature — no-op.
        let b = seq(&spec, &[("set0", 5), ("set0", 200)]);
        let trace_b = executor::run(&spec, &b).unwrap();
        assert!(!corpus.absorb(b, &trace_b));
        assert_eq!(corpus.len(), 1);
    }

    #[test]
    fn absorb_rejects_initial_signature() {
        let spec = breaker_spec();
        let mut corpus = Corpus::new(&spec, 8);

        // [set0(5)] ends at [1, 1] == the initial signature.
        let a = seq(&spec, &[("set0", 5)]);
        let trace = executor::run(&spec, &a).unwrap();
        assert!(!corpus.absorb(a, &trace));
        assert!(corpus.is_empty());
    }

    #[test]
    fn absorb_never_decreases_size() {
        let spec = breaker_spec();
        let mut corpus = Corpus::new(&spec, 8);
        let mut rng = FuzzRng::new(77);

        let mut last = 0;
        for _ in 0..200 {
            let sequence = corpus.sample(&mut rng, &spec);
            if let Ok(trace) = executor::run(&spec, &sequence) {
                corpus.absorb(sequence, &trace);
            }
            assert!(corpus.len() >= last);
            last = corpus.len();
        }
    }

    #[test]
    fn empty_trace_is_not_absorbed() {
        let spec = breaker_spec();
        let mut corpus = Corpus::new(&spec, 8);
        let empty = CallSequence::new();
        let trace = executor::run(&spec, &empty).unwrap();
        assert!(!corpus.absorb(empty, &trace));
    }

    #[test]
    fn mutation_respects_length_and_domains() {
        let spec = breaker_spec();
        let mut corpus = Corpus::new(&spec, 4);
        corpus.seed(vec![seq(&spec, &[("set0", 100), ("set1", 7)])]);
        let mut rng = FuzzRng::new(9);

        for _ in 0..500 {
            let mut sequence = corpus.sample(&mut rng, &spec);
            corpus.mutate(&mut sequence, &mut rng, &spec);
            assert!(sequence.len() <= 4);
            for call in &sequence.calls {
                assert!(spec.mutator(call.mutator).domain.contains(call.arg));
            }
        }
    }

    #[test]
    fn mutation_is_reproducible_for_same_seed() {
        let spec = breaker_spec();
        let corpus = Corpus::new(&spec, 16);

        let run_once = |seed: u64| {
            let mut rng = FuzzRng::new(seed);
            let mut sequence = seq(&spec, &[("set0", 100), ("set1", 7), ("set1", 10)]);
            for _ in 0..50 {
                corpus.mutate(&mut sequence, &mut rng, &spec);
            }
            sequence
        };

        assert_eq!(run_once(42), run_once(42));
    }
}
