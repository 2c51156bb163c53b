//! Declarative pipeline: JSON spec file -> session -> JSON report.
//!
//! Uses the same spec file the CLI ships, so the file and the programmatic
//! fixture cannot drift apart silently.

use statefuzz_core::executor;
use statefuzz_core::loader::{load_seeds_json, load_spec_json};
use statefuzz_core::report::ViolationReport;
use statefuzz_core::scheduler::{FuzzConfig, SessionOutcome, run_session};
use statefuzz_core::test_utils::breaker_spec;

const BREAKER_FILE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../statefuzz-cli/specs/breaker.json"
));

#[test]
fn shipped_spec_file_matches_programmatic_fixture() {
    let loaded = load_spec_json(BREAKER_FILE).unwrap();
    let built = breaker_spec();

    for named in [
        vec![("set0".to_string(), 100), ("set1".to_string(), 10)],
        vec![("set1".to_string(), 10)],
        vec![("set0".to_string(), 5), ("set1".to_string(), 10)],
        vec![("set0".to_string(), 0), ("set1".to_string(), 0)],
    ] {
        let a = executor::run(
            &loaded,
            &statefuzz_core::sequence::CallSequence::resolve(&loaded, &named).unwrap(),
        )
        .unwrap();
        let b = executor::run(
            &built,
            &statefuzz_core::sequence::CallSequence::resolve(&built, &named).unwrap(),
        )
        .unwrap();
        assert_eq!(a.steps, b.steps, "divergence on {named:?}");
    }
}

#[test]
fn loaded_spec_session_produces_wire_format_report() {
    let spec = load_spec_json(BREAKER_FILE).unwrap();
    let config = FuzzConfig {
        seed: 8,
        max_iterations: 300_000,
        ..FuzzConfig::default()
    };

    let outcome = run_session(&spec, &config).unwrap();
    let SessionOutcome::Violation(report) = outcome else {
        panic!("expected a violation, got {outcome:?}");
    };

    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains(r#""violatingInvariant":"invariant_never_false""#));
    let back: ViolationReport = serde_json::from_str(&json).unwrap();
    assert_eq!(back, report);
}

#[test]
fn seeded_session_finds_violation_fast() {
    let spec = load_spec_json(BREAKER_FILE).unwrap();
    let seeds = load_seeds_json(r#"[[["set0", 100], ["set1", 10]]]"#, &spec).unwrap();
    let config = FuzzConfig {
        seed: 2,
        max_iterations: 1_000,
        corpus_seeds: seeds,
        ..FuzzConfig::default()
    };

    let outcome = run_session(&spec, &config).unwrap();
    assert!(matches!(outcome, SessionOutcome::Violation(_)));
}

#[test]
fn known_witnesses_behave_per_fixture_semantics() {
    let spec = load_spec_json(BREAKER_FILE).unwrap();

    // [set0(100), set1(10)] violates at index 1.
    let violating = seq_for(&spec, &[("set0", 100), ("set1", 10)]);
    let trace = executor::run(&spec, &violating).unwrap();
    let violation = trace.violation.expect("must violate");
    assert_eq!(violation.index, 1);

    // [set1(10)] alone does not violate.
    let harmless = seq_for(&spec, &[("set1", 10)]);
    assert!(executor::run(&spec, &harmless).unwrap().violation.is_none());

    // [set0(5), set1(10)] does not violate.
    let harmless = seq_for(&spec, &[("set0", 5), ("set1", 10)]);
    assert!(executor::run(&spec, &harmless).unwrap().violation.is_none());
}

fn seq_for(
    spec: &statefuzz_core::machine::MachineSpec,
    calls: &[(&str, i64)],
) -> statefuzz_core::sequence::CallSequence {
    // Mirrors test_utils::seq but stays independent of which spec instance
    // (loaded or programmatic) is in play.
    let named: Vec<(String, i64)> = calls
        .iter()
        .map(|(name, arg)| (name.to_string(), *arg))
        .collect();
    statefuzz_core::sequence::CallSequence::resolve(spec, &named).unwrap()
}
