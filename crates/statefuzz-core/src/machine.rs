//! Declarative state-machine model: fields, mutators, and invariants.
//!
//! A [`MachineSpec`] is an immutable description of the target under test:
//! a record of named integer fields (booleans stored as 0/1), a set of named
//! mutators (each taking one bounded integer argument and applying guarded
//! field updates), and a set of named invariant predicates. Specs are built
//! through [`SpecBuilder`] using a two-phase lifecycle: registration by name,
//! then `build()` freezes the spec and validates all references.
//!
//! All evaluation is pure and deterministic given (state, argument) — no
//! hidden randomness, no I/O.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

/// Identifies a state field. Dense index into the spec's field table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct FieldId(pub u32);

/// Identifies a mutator. Dense index into the spec's mutator table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct MutatorId(pub u32);

/// Identifies an invariant. Dense index into the spec's invariant table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct InvariantId(pub u32);

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised while resolving or executing calls against a spec.
///
/// `UnknownMutator` and `UnknownInvariant` indicate a spec/sequence mismatch
/// and abort the whole session. `ArgumentOutOfRange` is a defensive check on
/// generated arguments; a correct generator never produces it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MachineError {
    #[error("unknown mutator '{0}'")]
    UnknownMutator(String),
    #[error("unknown invariant '{0}'")]
    UnknownInvariant(String),
    #[error("argument {arg} outside domain [{min}, {max}] of mutator '{mutator}'")]
    ArgumentOutOfRange {
        mutator: String,
        arg: i64,
        min: i64,
        max: i64,
    },
}

/// Errors raised while building a spec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpecError {
    #[error("duplicate name '{0}'")]
    DuplicateName(String),
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("mutator '{name}': empty argument domain [{min}, {max}]")]
    EmptyDomain { name: String, min: i64, max: i64 },
    #[error("modulus must be positive, got {0}")]
    BadModulus(i64),
    #[error("invariant '{0}' references the call argument")]
    ArgInInvariant(String),
    #[error("spec declares no fields")]
    NoFields,
    #[error("spec declares no mutators")]
    NoMutators,
    #[error("spec declares no invariants")]
    NoInvariants,
}

// ---------------------------------------------------------------------------
// Expression model
// ---------------------------------------------------------------------------

/// Comparison operator for predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
}

impl ComparisonOp {
    pub fn eval(self, left: i64, right: i64) -> bool {
        match self {
            ComparisonOp::Eq => left == right,
            ComparisonOp::Ne => left != right,
            ComparisonOp::Gt => left > right,
            ComparisonOp::Lt => left < right,
            ComparisonOp::Gte => left >= right,
            ComparisonOp::Lte => left <= right,
        }
    }
}

/// A value read during predicate or update evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    /// A literal constant.
    Const(i64),
    /// The current value of a state field.
    Field(FieldId),
    /// The call argument.
    Arg,
    /// The call argument modulo the given positive constant (Euclidean).
    ArgMod(i64),
}

impl Operand {
    fn eval(self, state: &StateInstance, arg: i64) -> i64 {
        match self {
            Operand::Const(v) => v,
            Operand::Field(f) => state.get(f),
            Operand::Arg => arg,
            Operand::ArgMod(m) => arg.rem_euclid(m),
        }
    }
}

/// A pure boolean predicate over (state, argument).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Predicate {
    Compare {
        left: Operand,
        op: ComparisonOp,
        right: Operand,
    },
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// Evaluate against the current state and call argument.
    ///
    /// Invariant predicates are evaluated with `arg = 0`; the builder
    /// rejects invariants that reference `Arg`.
    pub fn eval(&self, state: &StateInstance, arg: i64) -> bool {
        match self {
            Predicate::Compare { left, op, right } => {
                op.eval(left.eval(state, arg), right.eval(state, arg))
            }
            Predicate::All(preds) => preds.iter().all(|p| p.eval(state, arg)),
            Predicate::Any(preds) => preds.iter().any(|p| p.eval(state, arg)),
            Predicate::Not(pred) => !pred.eval(state, arg),
        }
    }

    fn for_each_operand(&self, f: &mut impl FnMut(Operand)) {
        match self {
            Predicate::Compare { left, right, .. } => {
                f(*left);
                f(*right);
            }
            Predicate::All(preds) | Predicate::Any(preds) => {
                for p in preds {
                    p.for_each_operand(f);
                }
            }
            Predicate::Not(pred) => pred.for_each_operand(f),
        }
    }
}

/// One guarded field assignment inside a mutator.
///
/// Updates apply in declaration order; a later guard observes the writes of
/// earlier updates in the same mutator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    /// Apply only when this predicate holds. `None` means unconditional.
    pub when: Option<Predicate>,
    pub field: FieldId,
    pub set: Operand,
}

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// Inclusive integer argument domain of a mutator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgDomain {
    pub min: i64,
    pub max: i64,
}

impl ArgDomain {
    pub fn contains(&self, arg: i64) -> bool {
        arg >= self.min && arg <= self.max
    }
}

/// A state field definition: name and initial value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub init: i64,
}

/// A mutator definition: name, argument domain, and ordered updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutatorDef {
    pub name: String,
    pub domain: ArgDomain,
    pub updates: Vec<Update>,
}

/// An invariant definition: name and predicate that must always hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvariantDef {
    pub name: String,
    pub holds: Predicate,
}

// ---------------------------------------------------------------------------
// State instance
// ---------------------------------------------------------------------------

/// Snapshot of all field values, used as the coverage key.
pub type StateSignature = Vec<i64>;

/// Mutable field record for one replay.
///
/// Created fresh before each sequence replay and owned exclusively by the
/// executor for the duration of that run. Only `MachineSpec::apply_mutator`
/// changes its visible state, one call at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateInstance {
    values: Vec<i64>,
}

impl StateInstance {
    pub fn get(&self, field: FieldId) -> i64 {
        self.values[field.0 as usize]
    }

    pub fn values(&self) -> &[i64] {
        &self.values
    }

    /// Snapshot of all field values.
    pub fn signature(&self) -> StateSignature {
        self.values.clone()
    }
}

// ---------------------------------------------------------------------------
// MachineSpec
// ---------------------------------------------------------------------------

/// Immutable descriptor of the state machine under test.
///
/// Frozen at build time; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct MachineSpec {
    name: String,
    fields: Vec<FieldDef>,
    mutators: Vec<MutatorDef>,
    invariants: Vec<InvariantDef>,
    mutator_ids: HashMap<String, MutatorId>,
    invariant_ids: HashMap<String, InvariantId>,
}

impl MachineSpec {
    /// Produce the initial state for a fresh replay.
    pub fn initial_state(&self) -> StateInstance {
        StateInstance {
            values: self.fields.iter().map(|f| f.init).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn mutators(&self) -> &[MutatorDef] {
        &self.mutators
    }

    pub fn invariants(&self) -> &[InvariantDef] {
        &self.invariants
    }

    pub fn mutator(&self, id: MutatorId) -> &MutatorDef {
        &self.mutators[id.0 as usize]
    }

    pub fn invariant(&self, id: InvariantId) -> &InvariantDef {
        &self.invariants[id.0 as usize]
    }

    /// Resolve a mutator name to its id.
    pub fn mutator_id(&self, name: &str) -> Result<MutatorId, MachineError> {
        self.mutator_ids
            .get(name)
            .copied()
            .ok_or_else(|| MachineError::UnknownMutator(name.to_string()))
    }

    /// Resolve an invariant name to its id.
    pub fn invariant_id(&self, name: &str) -> Result<InvariantId, MachineError> {
        self.invariant_ids
            .get(name)
            .copied()
            .ok_or_else(|| MachineError::UnknownInvariant(name.to_string()))
    }

    /// Apply one mutator call to the instance.
    ///
    /// Checks the argument against the declared domain, then applies the
    /// mutator's guarded updates in order. Deterministic given (state, arg).
    pub fn apply_mutator(
        &self,
        state: &mut StateInstance,
        mutator: MutatorId,
        arg: i64,
    ) -> Result<(), MachineError> {
        let def = self
            .mutators
            .get(mutator.0 as usize)
            .ok_or_else(|| MachineError::UnknownMutator(format!("#{}", mutator.0)))?;
        if !def.domain.contains(arg) {
            return Err(MachineError::ArgumentOutOfRange {
                mutator: def.name.clone(),
                arg,
                min: def.domain.min,
                max: def.domain.max,
            });
        }
        for update in &def.updates {
            let applies = match &update.when {
                Some(pred) => pred.eval(state, arg),
                None => true,
            };
            if applies {
                let value = update.set.eval(state, arg);
                state.values[update.field.0 as usize] = value;
            }
        }
        Ok(())
    }

    /// Evaluate one invariant predicate against the current state.
    pub fn eval_invariant(&self, state: &StateInstance, invariant: InvariantId) -> bool {
        self.invariants[invariant.0 as usize].holds.eval(state, 0)
    }
}

// ---------------------------------------------------------------------------
// SpecBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing an immutable [`MachineSpec`].
///
/// Two-phase lifecycle: register fields, mutators, and invariants by name,
/// then `build()` validates references and freezes the spec.
#[derive(Debug, Default)]
pub struct SpecBuilder {
    name: String,
    fields: Vec<FieldDef>,
    field_name_to_id: HashMap<String, FieldId>,
    mutators: Vec<MutatorDef>,
    invariants: Vec<InvariantDef>,
}

impl SpecBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Register a state field with its initial value. Returns its id.
    pub fn register_field(&mut self, name: &str, init: i64) -> FieldId {
        let id = FieldId(self.fields.len() as u32);
        self.fields.push(FieldDef {
            name: name.to_string(),
            init,
        });
        self.field_name_to_id.insert(name.to_string(), id);
        id
    }

    /// Register a mutator. Returns its id.
    pub fn register_mutator(
        &mut self,
        name: &str,
        domain: ArgDomain,
        updates: Vec<Update>,
    ) -> MutatorId {
        let id = MutatorId(self.mutators.len() as u32);
        self.mutators.push(MutatorDef {
            name: name.to_string(),
            domain,
            updates,
        });
        id
    }

    /// Register an invariant. Returns its id.
    pub fn register_invariant(&mut self, name: &str, holds: Predicate) -> InvariantId {
        let id = InvariantId(self.invariants.len() as u32);
        self.invariants.push(InvariantDef {
            name: name.to_string(),
            holds,
        });
        id
    }

    /// Look up a registered field by name (for resolving loaded specs).
    pub fn field_id(&self, name: &str) -> Result<FieldId, SpecError> {
        self.field_name_to_id
            .get(name)
            .copied()
            .ok_or_else(|| SpecError::UnknownField(name.to_string()))
    }

    /// Validate and freeze the spec.
    pub fn build(self) -> Result<MachineSpec, SpecError> {
        if self.fields.is_empty() {
            return Err(SpecError::NoFields);
        }
        if self.mutators.is_empty() {
            return Err(SpecError::NoMutators);
        }
        if self.invariants.is_empty() {
            return Err(SpecError::NoInvariants);
        }

        let field_count = self.fields.len() as u32;
        let check_operand = |op: Operand| -> Result<(), SpecError> {
            match op {
                Operand::Field(f) if f.0 >= field_count => {
                    Err(SpecError::UnknownField(format!("#{}", f.0)))
                }
                Operand::ArgMod(m) if m <= 0 => Err(SpecError::BadModulus(m)),
                _ => Ok(()),
            }
        };
        let check_predicate = |pred: &Predicate| -> Result<(), SpecError> {
            let mut result = Ok(());
            pred.for_each_operand(&mut |op| {
                if result.is_ok() {
                    result = check_operand(op);
                }
            });
            result
        };

        let mut mutator_ids = HashMap::new();
        for (i, m) in self.mutators.iter().enumerate() {
            if mutator_ids
                .insert(m.name.clone(), MutatorId(i as u32))
                .is_some()
            {
                return Err(SpecError::DuplicateName(m.name.clone()));
            }
            if m.domain.min > m.domain.max {
                return Err(SpecError::EmptyDomain {
                    name: m.name.clone(),
                    min: m.domain.min,
                    max: m.domain.max,
                });
            }
            for update in &m.updates {
                if update.field.0 >= field_count {
                    return Err(SpecError::UnknownField(format!("#{}", update.field.0)));
                }
                check_operand(update.set)?;
                if let Some(pred) = &update.when {
                    check_predicate(pred)?;
                }
            }
        }

        let mut invariant_ids = HashMap::new();
        for (i, inv) in self.invariants.iter().enumerate() {
            if invariant_ids
                .insert(inv.name.clone(), InvariantId(i as u32))
                .is_some()
            {
                return Err(SpecError::DuplicateName(inv.name.clone()));
            }
            check_predicate(&inv.holds)?;
            let mut references_arg = false;
            inv.holds.for_each_operand(&mut |op| {
                if matches!(op, Operand::Arg | Operand::ArgMod(_)) {
                    references_arg = true;
                }
            });
            if references_arg {
                return Err(SpecError::ArgInInvariant(inv.name.clone()));
            }
        }

        let mut field_names = HashMap::new();
        for f in &self.fields {
            if field_names.insert(f.name.clone(), ()).is_some() {
                return Err(SpecError::DuplicateName(f.name.clone()));
            }
        }

        Ok(MachineSpec {
            name: self.name,
            fields: self.fields,
            mutators: self.mutators,
            invariants: self.invariants,
            mutator_ids,
            invariant_ids,
        })
    }
}

// ===========================================================================
// Tests
// ===========================================================================
