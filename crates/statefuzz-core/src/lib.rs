//! Statefuzz Core -- a deterministic state-machine invariant fuzzer.
//!
//! This crate searches for call sequences that violate declared invariants
//! of a small, pure state machine: a record of named integer fields, a set
//! of named mutators (one bounded integer argument each), and a set of named
//! invariant predicates.
//!
//! # Session Loop
//!
//! Each iteration of [`scheduler::run_session`] moves through four stages:
//!
//! 1. **Sample** -- Pull a corpus entry (or generate a fresh random sequence
//!    when the corpus is empty) and apply one mutation operator.
//! 2. **Execute** -- Replay the candidate against a freshly constructed
//!    state instance, evaluating every invariant after each call.
//! 3. **Check** -- Stop at the first call where any invariant is false
//!    ("first failure" semantics).
//! 4. **Absorb or Shrink** -- On no violation, retain the candidate iff it
//!    reached a new state-signature; on violation, minimize the sequence and
//!    report.
//!
//! All randomness flows through a seeded SplitMix64 PRNG, so a session is
//! fully reproducible from its configuration.
//!
//! # Key Types
//!
//! - [`machine::MachineSpec`] -- Immutable machine descriptor, built through
//!   [`machine::SpecBuilder`] (register by name, then freeze).
//! - [`sequence::CallSequence`] -- The fuzzer's unit of input.
//! - [`executor::ExecutionTrace`] -- Per-step state snapshots and invariant
//!   results for one replay.
//! - [`corpus::Corpus`] -- Coverage-guided retention of interesting inputs.
//! - [`scheduler::FuzzConfig`] / [`scheduler::SessionOutcome`] -- Session
//!   configuration and terminal outcome (violation report or exhaustion).
//! - [`shrink::shrink`] -- Local-fixpoint minimization of violating
//!   sequences.
//! - [`loader`] -- Declarative JSON spec and seed-file ingestion.

pub mod corpus;
pub mod executor;
pub mod loader;
pub mod machine;
pub mod report;
pub mod rng;
pub mod scheduler;
pub mod sequence;
pub mod shrink;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
