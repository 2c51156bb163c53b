//! Declarative spec loading from JSON.
//!
//! Spec files name fields, mutators (with inclusive argument domains and
//! guarded updates), and invariants; all cross-references are by name and
//! resolved against a [`SpecBuilder`]. Example:
//!
//! ```json
//! {
//!   "name": "invariant_breaker",
//!   "fields": [{ "name": "flag0", "init": 1 }],
//!   "mutators": [{
//!     "name": "set0", "min": 0, "max": 1000000,
//!     "updates": [{
//!       "when": { "compare": { "left": { "arg_mod": 100 },
//!                              "op": "eq",
//!                              "right": { "const": 0 } } },
//!       "field": "flag0",
//!       "set": { "const": 0 }
//!     }]
//!   }],
//!   "invariants": [{
//!     "name": "flag0_never_false",
//!     "holds": { "compare": { "left": { "field": "flag0" },
//!                             "op": "eq",
//!                             "right": { "const": 1 } } }
//!   }]
//! }
//! ```
//!
//! Seed files are arrays of named call sequences:
//! `[[["set0", 100], ["set1", 10]]]`.

use serde::Deserialize;

use crate::machine::{
    ArgDomain, ComparisonOp, MachineError, MachineSpec, Operand, Predicate, SpecBuilder,
    SpecError, Update,
};
use crate::sequence::CallSequence;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur while loading a spec or seed file.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("spec error: {0}")]
    Spec(#[from] SpecError),
    #[error("seed sequence error: {0}")]
    Seed(#[from] MachineError),
}

// ---------------------------------------------------------------------------
// JSON data structures
// ---------------------------------------------------------------------------

/// Top-level spec file structure.
#[derive(Debug, Deserialize)]
pub struct SpecData {
    #[serde(default)]
    pub name: Option<String>,
    pub fields: Vec<FieldData>,
    pub mutators: Vec<MutatorData>,
    pub invariants: Vec<InvariantData>,
}

#[derive(Debug, Deserialize)]
pub struct FieldData {
    pub name: String,
    #[serde(default)]
    pub init: i64,
}

#[derive(Debug, Deserialize)]
pub struct MutatorData {
    pub name: String,
    pub min: i64,
    pub max: i64,
    #[serde(default)]
    pub updates: Vec<UpdateData>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateData {
    #[serde(default)]
    pub when: Option<PredicateData>,
    pub field: String, // references a field by name
    pub set: OperandData,
}

#[derive(Debug, Deserialize)]
pub struct InvariantData {
    pub name: String,
    pub holds: PredicateData,
}

/// JSON representation of an operand.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperandData {
    Const(i64),
    Field(String),
    Arg,
    ArgMod(i64),
}

/// JSON representation of a comparison operator.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOpData {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
}

impl From<ComparisonOpData> for ComparisonOp {
    fn from(op: ComparisonOpData) -> Self {
        match op {
            ComparisonOpData::Eq => ComparisonOp::Eq,
            ComparisonOpData::Ne => ComparisonOp::Ne,
            ComparisonOpData::Gt => ComparisonOp::Gt,
            ComparisonOpData::Lt => ComparisonOp::Lt,
            ComparisonOpData::Gte => ComparisonOp::Gte,
            ComparisonOpData::Lte => ComparisonOp::Lte,
        }
    }
}

/// JSON representation of a predicate.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateData {
    Compare {
        left: OperandData,
        op: ComparisonOpData,
        right: OperandData,
    },
    All(Vec<PredicateData>),
    Any(Vec<PredicateData>),
    Not(Box<PredicateData>),
}

// ---------------------------------------------------------------------------
// Loading functions
// ---------------------------------------------------------------------------

/// Load a machine spec from a JSON string.
pub fn load_spec_json(json: &str) -> Result<MachineSpec, LoadError> {
    let data: SpecData = serde_json::from_str(json)?;
    build_spec(data)
}

/// Load corpus seed sequences from a JSON string, resolving mutator names
/// against an already-built spec.
pub fn load_seeds_json(json: &str, spec: &MachineSpec) -> Result<Vec<CallSequence>, LoadError> {
    let data: Vec<Vec<(String, i64)>> = serde_json::from_str(json)?;
    data.iter()
        .map(|named| CallSequence::resolve(spec, named).map_err(LoadError::from))
        .collect()
}

fn resolve_operand(builder: &SpecBuilder, op: &OperandData) -> Result<Operand, SpecError> {
    Ok(match op {
        OperandData::Const(v) => Operand::Const(*v),
        OperandData::Field(name) => Operand::Field(builder.field_id(name)?),
        OperandData::Arg => Operand::Arg,
        OperandData::ArgMod(m) => Operand::ArgMod(*m),
    })
}

fn resolve_predicate(builder: &SpecBuilder, pred: &PredicateData) -> Result<Predicate, SpecError> {
    Ok(match pred {
        PredicateData::Compare { left, op, right } => Predicate::Compare {
            left: resolve_operand(builder, left)?,
            op: (*op).into(),
            right: resolve_operand(builder, right)?,
        },
        PredicateData::All(preds) => Predicate::All(
            preds
                .iter()
                .map(|p| resolve_predicate(builder, p))
                .collect::<Result<_, _>>()?,
        ),
        PredicateData::Any(preds) => Predicate::Any(
            preds
                .iter()
                .map(|p| resolve_predicate(builder, p))
                .collect::<Result<_, _>>()?,
        ),
        PredicateData::Not(pred) => Predicate::Not(Box::new(resolve_predicate(builder, pred)?)),
    })
}

fn build_spec(data: SpecData) -> Result<MachineSpec, LoadError> {
    let mut builder = SpecBuilder::new(data.name.as_deref().unwrap_or("machine"));

    for field in &data.fields {
        builder.register_field(&field.name, field.init);
    }

    for mutator in &data.mutators {
        let updates = mutator
            .updates
            .iter()
            .map(|u| {
                Ok(Update {
                    when: u
                        .when
                        .as_ref()
                        .map(|p| resolve_predicate(&builder, p))
                        .transpose()?,
                    field: builder.field_id(&u.field)?,
                    set: resolve_operand(&builder, &u.set)?,
                })
            })
            .collect::<Result<Vec<_>, SpecError>>()?;
        builder.register_mutator(
            &mutator.name,
            ArgDomain {
                min: mutator.min,
                max: mutator.max,
            },
            updates,
        );
    }

    for invariant in &data.invariants {
        let holds = resolve_predicate(&builder, &invariant.holds)?;
        builder.register_invariant(&invariant.name, holds);
    }

    Ok(builder.build()?)
}

// ===========================================================================
// Tests
// ===========================================================================
