//! Shared test helpers: fixture specs and sequence construction.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and downstream crates
//! (via the `test-utils` feature).

use crate::machine::{ArgDomain, ComparisonOp, MachineSpec, Operand, Predicate, SpecBuilder, Update};
use crate::sequence::CallSequence;

/// Argument domain used by the breaker fixture's mutators.
pub const BREAKER_ARG_MAX: i64 = 1_000_000;

/// The JSON form of the breaker fixture, identical in behavior to
/// [`breaker_spec`]. Kept in sync with `statefuzz-cli/specs/breaker.json`.
pub const BREAKER_SPEC_JSON: &str = r#"{
    "name": "invariant_breaker",
    "fields": [
        { "name": "flag0", "init": 1 },
        { "name": "flag1", "init": 1 }
    ],
    "mutators": [
        {
            "name": "set0", "min": 0, "max": 1000000,
            "updates": [{
                "when": { "compare": { "left": { "arg_mod": 100 }, "op": "eq", "right": { "const": 0 } } },
                "field": "flag0",
                "set": { "const": 0 }
            }]
        },
        {
            "name": "set1", "min": 0, "max": 1000000,
            "updates": [{
                "when": { "all": [
                    { "compare": { "left": { "arg_mod": 10 }, "op": "eq", "right": { "const": 0 } } },
                    { "compare": { "left": { "field": "flag0" }, "op": "eq", "right": { "const": 0 } } }
                ] },
                "field": "flag1",
                "set": { "const": 0 }
            }]
        }
    ],
    "invariants": [
        {
            "name": "invariant_never_false",
            "holds": { "compare": { "left": { "field": "flag1" }, "op": "eq", "right": { "const": 1 } } }
        }
    ]
}"#;

fn eq(left: Operand, right: Operand) -> Predicate {
    Predicate::Compare {
        left,
        op: ComparisonOp::Eq,
        right,
    }
}

/// The two-flag breaker fixture.
///
/// `set0(arg)` clears `flag0` iff `arg % 100 == 0`; `set1(arg)` clears
/// `flag1` iff `arg % 10 == 0` and `flag0` is already cleared. The single
/// invariant `invariant_never_false` requires `flag1 == 1`, so the minimal
/// violating witness is `[set0(0), set1(0)]`.
pub fn breaker_spec() -> MachineSpec {
    let mut builder = SpecBuilder::new("invariant_breaker");
    let flag0 = builder.register_field("flag0", 1);
    let flag1 = builder.register_field("flag1", 1);
    let domain = ArgDomain {
        min: 0,
        max: BREAKER_ARG_MAX,
    };

    builder.register_mutator(
        "set0",
        domain,
        vec![Update {
            when: Some(eq(Operand::ArgMod(100), Operand::Const(0))),
            field: flag0,
            set: Operand::Const(0),
        }],
    );
    builder.register_mutator(
        "set1",
        domain,
        vec![Update {
            when: Some(Predicate::All(vec![
                eq(Operand::ArgMod(10), Operand::Const(0)),
                eq(Operand::Field(flag0), Operand::Const(0)),
            ])),
            field: flag1,
            set: Operand::Const(0),
        }],
    );
    builder.register_invariant("invariant_never_false", eq(Operand::Field(flag1), Operand::Const(1)));

    builder
        .build()
        .expect("breaker fixture spec must be valid")
}

/// The breaker fixture extended with the optional `flag0` invariant, so a
/// session reports the earlier `set0` step as the violation.
pub fn breaker_spec_with_flag0_invariant() -> MachineSpec {
    let mut builder = SpecBuilder::new("invariant_breaker_strict");
    let flag0 = builder.register_field("flag0", 1);
    let flag1 = builder.register_field("flag1", 1);
    let domain = ArgDomain {
        min: 0,
        max: BREAKER_ARG_MAX,
    };

    builder.register_mutator(
        "set0",
        domain,
        vec![Update {
            when: Some(eq(Operand::ArgMod(100), Operand::Const(0))),
            field: flag0,
            set: Operand::Const(0),
        }],
    );
    builder.register_mutator(
        "set1",
        domain,
        vec![Update {
            when: Some(Predicate::All(vec![
                eq(Operand::ArgMod(10), Operand::Const(0)),
                eq(Operand::Field(flag0), Operand::Const(0)),
            ])),
            field: flag1,
            set: Operand::Const(0),
        }],
    );
    builder.register_invariant("invariant_never_false", eq(Operand::Field(flag1), Operand::Const(1)));
    builder.register_invariant("flag0_never_false", eq(Operand::Field(flag0), Operand::Const(1)));

    builder
        .build()
        .expect("strict breaker fixture spec must be valid")
}

/// A machine whose single invariant (`count >= 0`) can never fail: `bump`
/// adds `arg % 5` to the counter. Useful for exercising the exhausted path.
pub fn counter_spec() -> MachineSpec {
    let mut builder = SpecBuilder::new("counter");
    let count = builder.register_field("count", 0);

    builder.register_mutator(
        "bump",
        ArgDomain { min: 0, max: 1000 },
        vec![Update {
            when: None,
            field: count,
            set: Operand::ArgMod(5),
        }],
    );
    builder.register_invariant(
        "count_never_negative",
        Predicate::Compare {
            left: Operand::Field(count),
            op: ComparisonOp::Gte,
            right: Operand::Const(0),
        },
    );

    builder.build().expect("counter fixture spec must be valid")
}

/// Build a call sequence from (mutator name, argument) literals.
pub fn seq(spec: &MachineSpec, calls: &[(&str, i64)]) -> CallSequence {
    let named: Vec<(String, i64)> = calls
        .iter()
        .map(|(name, arg)| (name.to_string(), *arg))
        .collect();
    CallSequence::resolve(spec, &named).expect("fixture sequence must resolve")
}
