//! DPLL(T) orchestrator: Boolean CDCL-style search over the Tseitin CNF
//! abstraction, refined by the Reluplex theory solver via blocking clauses.
//!
//! Each round asks propositional DPLL for a Boolean model, reads off which
//! theory atoms it assigned, and hands the active ones to Reluplex. On a
//! theory conflict it appends a blocking clause that rules out exactly that
//! Boolean assignment before looping again. This is the same two-level
//! "abstract, check, refine" shape as classic DPLL(T): the Boolean layer
//! never itself understands real arithmetic, it only learns which
//! combinations of atoms the theory solver rejected.

use std::collections::{BTreeMap, HashMap};

use log::{info, warn};

use super::dpll::{self, SolveResult, Val};
use super::reluplex::{reluplex, ReluplexConfig, ReluplexOutcome};
use crate::ast::{eliminate_implies, nnf, simplify, Prop, TheoryAtom};
use crate::cnf::{tseitin_cnf, Literal};

/// Small positive margin used to approximate the strict negation of an
/// inequality that the Boolean model assigned False. The theory solver
/// only reasons about non-strict (`≥`) inequalities, so a strict `<` is
/// represented as `≥` shifted by this epsilon rather than proven exactly.
pub const EPS_STRICT: f64 = 1e-6;

/// Tunable budgets for a `dpll_t` run: the Boolean-refinement round cap,
/// plus the full [`ReluplexConfig`] used for every theory call within a
/// round.
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    pub max_rounds: usize,
    pub reluplex: ReluplexConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig {
            max_rounds: 1000,
            reluplex: ReluplexConfig::default(),
        }
    }
}

/// The outcome of a full DPLL(T) decision: either a real-valued model
/// witnessing satisfiability, or UNSAT. Unlike the internal three-way
/// Simplex/Reluplex outcomes, this boundary is deliberately binary.
/// `Unknown` from an exhausted budget is folded into `Unsat` here, since a
/// caller asking "is this formula satisfiable" wants a decision, not a
/// third option.
#[derive(Debug, Clone, PartialEq)]
pub enum DpllTOutcome {
    /// The formula is satisfiable, with a real-valued assignment for every
    /// variable that was constrained during solving.
    Sat(HashMap<String, f64>),
    /// The formula is unsatisfiable.
    Unsat,
}

/// Translates admitted inequalities into Simplex row/bound form: each
/// `Σcᵢxᵢ ≥ b` becomes a fresh slack row `s_i = Σcᵢxᵢ` bounded `[b, +∞)`.
/// Every referenced variable gets `(−∞, +∞)` bounds unless already present.
fn ineqs_to_reluplex_input(
    ineqs: &[crate::ast::Ineq],
) -> (
    Vec<(String, BTreeMap<String, f64>)>,
    HashMap<String, (f64, f64)>,
) {
    let mut row_defs = Vec::new();
    let mut bounds = HashMap::new();

    for (i, ineq) in ineqs.iter().enumerate() {
        let sname = format!("ineq_slack_{}", i);
        let coeffs: BTreeMap<String, f64> = ineq.coeffs.clone();
        for v in coeffs.keys() {
            bounds
                .entry(v.clone())
                .or_insert((f64::NEG_INFINITY, f64::INFINITY));
        }
        row_defs.push((sname.clone(), coeffs));
        bounds.insert(sname, (ineq.b, f64::INFINITY));
    }

    (row_defs, bounds)
}

/// Decides satisfiability of `formula` under the combined propositional,
/// linear-arithmetic, and ReLU theory.
///
/// This is the main entry point tying the Boolean SAT core to the Simplex
/// and Reluplex theory solvers. It normalizes the formula, Tseitin-encodes
/// it once, and then loops: ask DPLL for a model, hand its active theory
/// atoms to Reluplex, and block the model on conflict.
///
/// # Arguments
///
/// * `formula` - The formula to decide, over propositional variables plus
///   inequality and ReLU theory atoms
/// * `config` - The round cap and Reluplex budgets for this run
///
/// # Returns
///
/// * `DpllTOutcome::Sat(model)` - If satisfiable, with a real-valued
///   assignment for every variable constrained during solving
/// * `DpllTOutcome::Unsat` - If unsatisfiable, or if the round budget is
///   exceeded (a conservative decision, not a proof)
///
/// # Algorithm
///
/// 1. **Normalize**: simplify, eliminate implications, and push the formula
///    to negation normal form.
/// 2. **Encode**: Tseitin-encode the normalized formula into CNF once, up
///    front; blocking clauses are appended to this CNF across rounds.
/// 3. **Boolean search**: run DPLL on the current CNF; UNSAT here is
///    terminal.
/// 4. **Theory admission**: read off every theory atom the Boolean model
///    assigned and translate it into Simplex row/bound form.
/// 5. **Theory check**: run Reluplex; SAT returns the real-valued model.
/// 6. **Refine**: on theory conflict, block the exact Boolean assignment
///    and loop.
///
/// # Examples
///
/// ```
/// use putnam_relu::ast::{Ineq, Prop};
/// use putnam_relu::solver::orchestrator::{dpll_t, DpllTOutcome, OrchestratorConfig};
///
/// let formula = Prop::Ineq(Ineq::new([("x".to_string(), 1.0)], 0.0));
/// match dpll_t(&formula, &OrchestratorConfig::default()) {
///     DpllTOutcome::Sat(assign) => println!("satisfiable: {:?}", assign),
///     DpllTOutcome::Unsat => println!("unsatisfiable"),
/// }
/// ```
pub fn dpll_t(formula: &Prop, config: &OrchestratorConfig) -> DpllTOutcome {
    let normalized = nnf(&eliminate_implies(&simplify(formula)));
    let encoding = tseitin_cnf(&normalized);
    let mut cnf = encoding.cnf;

    for round in 0..config.max_rounds {
        info!("dpll(t) round {}", round);
        let model = match dpll::solve(&cnf) {
            SolveResult::Sat(model) => model,
            SolveResult::Unsat => return DpllTOutcome::Unsat,
        };

        let mut active_ineqs = Vec::new();
        let mut active_relus: Vec<(String, String)> = Vec::new();
        let mut active_atoms: Vec<Literal> = Vec::new();

        for (atom, theory) in &encoding.atom_to_theory {
            match (model.value(atom), theory) {
                (Val::True, TheoryAtom::Ineq(ineq)) => {
                    active_atoms.push(Literal::pos(atom.clone()));
                    active_ineqs.push(ineq.clone());
                }
                (Val::True, TheoryAtom::Relu(x, y)) => {
                    active_atoms.push(Literal::pos(atom.clone()));
                    active_relus.push((x.clone(), y.clone()));
                }
                (Val::False, TheoryAtom::Ineq(ineq)) => {
                    active_atoms.push(Literal::neg(atom.clone()));
                    active_ineqs.push(ineq.negated(EPS_STRICT));
                }
                // A negated ReLU atom is never admitted to the theory call;
                // it relies entirely on the blocking-clause loop (see the
                // policy note on `TheoryAtom::Relu` in the module docs).
                (Val::False, TheoryAtom::Relu(_, _)) => {}
                (Val::Undef, _) => {}
            }
        }

        if active_ineqs.is_empty() && active_relus.is_empty() {
            return DpllTOutcome::Sat(HashMap::new());
        }

        let (mut row_defs, mut bounds) = ineqs_to_reluplex_input(&active_ineqs);
        for (x, y) in &active_relus {
            bounds
                .entry(x.clone())
                .or_insert((f64::NEG_INFINITY, f64::INFINITY));
            bounds
                .entry(y.clone())
                .or_insert((f64::NEG_INFINITY, f64::INFINITY));
        }
        row_defs.sort_by(|a, b| a.0.cmp(&b.0));

        match reluplex(row_defs, bounds, active_relus, config.reluplex) {
            ReluplexOutcome::Sat(assign) => return DpllTOutcome::Sat(assign),
            ReluplexOutcome::Unsat | ReluplexOutcome::Unknown => {
                if active_atoms.is_empty() {
                    return DpllTOutcome::Unsat;
                }
                let blocking: Vec<Literal> =
                    active_atoms.iter().map(|lit| lit.negated()).collect();
                cnf.push(blocking);
            }
        }
    }

    warn!("dpll(t) exceeded round budget, conservatively returning UNSAT");
    DpllTOutcome::Unsat
}
