//! DPLL (Davis-Putnam-Logemann-Loveland) algorithm over string-named CNF atoms.
//!
//! This is the propositional core the DPLL(T) orchestrator drives: clause
//! simplification, unit propagation, pure-literal elimination, and
//! backtracking search, with no clause learning beyond whatever blocking
//! clauses the orchestrator appends between rounds.
//!
//! This implementation includes:
//! - Clause simplification under the current partial assignment
//! - Unit propagation for constraint propagation
//! - Pure-literal elimination
//! - Backtracking search with branch pruning

use std::collections::{HashMap, HashSet};

use super::unit::unit_propagate;
use crate::cnf::{variables, Clause, Cnf, Literal};

/// The truth value of an atom in a [`Model`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Val {
    True,
    False,
    Undef,
}

/// A (possibly partial) assignment of truth values to CNF atoms, keyed by
/// atom name rather than a dense index, since atoms here are Tseitin-style
/// names (`a_3`, `t_7`) and original identifiers, not a contiguous range.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    vals: HashMap<String, Val>,
}

impl Model {
    /// Creates a model with every atom in `atoms` unassigned.
    pub fn new(atoms: &[String]) -> Self {
        Model {
            vals: atoms.iter().map(|a| (a.clone(), Val::Undef)).collect(),
        }
    }

    pub fn value(&self, atom: &str) -> Val {
        self.vals.get(atom).copied().unwrap_or(Val::Undef)
    }

    pub fn assign(&mut self, atom: &str, val: Val) {
        self.vals.insert(atom.to_string(), val);
    }

    /// Whether `lit` evaluates to true under this (possibly partial) model.
    pub fn is_true(&self, lit: &Literal) -> bool {
        matches!(
            (self.value(&lit.atom), lit.neg),
            (Val::True, false) | (Val::False, true)
        )
    }

    /// Every atom this model has an entry for, paired with its value. Used
    /// by the orchestrator to read back which theory atoms came out true.
    pub fn assignments(&self) -> Vec<(String, Val)> {
        self.vals.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }
}

/// Result of a propositional solving attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveResult {
    /// The formula is satisfiable with the given model.
    Sat(Model),
    /// The formula is unsatisfiable.
    Unsat,
}

/// Solves a CNF formula using DPLL with unit propagation and pure-literal
/// elimination. Atoms are discovered from the clauses themselves.
pub fn solve(cnf: &Cnf) -> SolveResult {
    let atoms = variables(cnf);
    let mut model = Model::new(&atoms);
    match dpll_search(cnf, &mut model) {
        Ok(()) => SolveResult::Sat(model),
        Err(()) => SolveResult::Unsat,
    }
}

/// Core DPLL search procedure with systematic branching and backtracking.
fn dpll_search(cnf: &Cnf, model: &mut Model) -> Result<(), ()> {
    let reduced = simplify(cnf, model).ok_or(())?;

    if unit_propagate(&reduced, model).is_err() {
        return Err(());
    }
    let reduced = simplify(&reduced, model).ok_or(())?;

    let reduced = eliminate_pure_literals(&reduced, model).ok_or(())?;

    if reduced.is_empty() {
        return Ok(());
    }

    let var = match choose_variable(&reduced, model) {
        Some(v) => v,
        None => return Err(()), // clauses remain but nothing left to branch on
    };

    let mut model_true = model.clone();
    model_true.assign(&var, Val::True);
    if dpll_search(&reduced, &mut model_true).is_ok() {
        *model = model_true;
        return Ok(());
    }

    model.assign(&var, Val::False);
    dpll_search(&reduced, model)
}

/// Drops satisfied clauses and removes falsified literals from the rest.
/// Returns `None` if that produces an empty (fully falsified) clause.
fn simplify(cnf: &Cnf, model: &Model) -> Option<Cnf> {
    let mut out = Cnf::with_capacity(cnf.len());
    for clause in cnf {
        if clause.iter().any(|lit| model.is_true(lit)) {
            continue;
        }
        let remaining: Clause = clause
            .iter()
            .filter(|lit| model.value(&lit.atom) == Val::Undef)
            .cloned()
            .collect();
        if remaining.is_empty() {
            return None;
        }
        out.push(remaining);
    }
    Some(out)
}

/// Assigns every atom that appears with only one polarity across the whole
/// (reduced) formula, then simplifies again under those new assignments.
fn eliminate_pure_literals(cnf: &Cnf, model: &mut Model) -> Option<Cnf> {
    let mut seen_pos: HashSet<String> = HashSet::new();
    let mut seen_neg: HashSet<String> = HashSet::new();
    for clause in cnf {
        for lit in clause {
            if lit.neg {
                seen_neg.insert(lit.atom.clone());
            } else {
                seen_pos.insert(lit.atom.clone());
            }
        }
    }
    for atom in seen_pos.difference(&seen_neg) {
        model.assign(atom, Val::True);
    }
    for atom in seen_neg.difference(&seen_pos) {
        model.assign(atom, Val::False);
    }
    simplify(cnf, model)
}

/// Chooses the first unassigned atom appearing in a not-yet-satisfied
/// clause, in clause order.
fn choose_variable(cnf: &Cnf, model: &Model) -> Option<String> {
    for clause in cnf {
        if clause.iter().any(|lit| model.is_true(lit)) {
            continue;
        }
        for lit in clause {
            if model.value(&lit.atom) == Val::Undef {
                return Some(lit.atom.clone());
            }
        }
    }
    None
}
