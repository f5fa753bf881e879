//! Tseitin CNF encoding.
//!
//! Converts a negation-normal-form [`Prop`] tree into an equisatisfiable
//! clause set over fresh Boolean atoms, returning the bidirectional mapping
//! between theory atoms and the propositional names that stand in for them.

use std::collections::HashMap;
use std::fmt;

use crate::ast::{Prop, TheoryAtom};

/// A signed reference to a propositional atom: `name` or `~name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal {
    pub atom: String,
    pub neg: bool,
}

impl Literal {
    pub fn pos(atom: impl Into<String>) -> Self {
        Literal {
            atom: atom.into(),
            neg: false,
        }
    }
    pub fn neg(atom: impl Into<String>) -> Self {
        Literal {
            atom: atom.into(),
            neg: true,
        }
    }
    pub fn negated(&self) -> Literal {
        Literal {
            atom: self.atom.clone(),
            neg: !self.neg,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.neg {
            write!(f, "~{}", self.atom)
        } else {
            write!(f, "{}", self.atom)
        }
    }
}

pub type Clause = Vec<Literal>;
pub type Cnf = Vec<Clause>;

/// Per-encode fresh-name counter, threaded explicitly through [`tseitin_cnf`]
/// instead of kept as a module-level counter. Repeated encodes of the same
/// formula produce the same names and stay side-effect free.
#[derive(Debug, Default)]
pub struct FreshNames {
    next_internal: u64,
    next_atom: u64,
}

impl FreshNames {
    pub fn new() -> Self {
        FreshNames::default()
    }

    fn next_internal(&mut self) -> String {
        let n = self.next_internal;
        self.next_internal += 1;
        format!("t_{}", n)
    }

    fn next_atom(&mut self) -> String {
        let n = self.next_atom;
        self.next_atom += 1;
        format!("a_{}", n)
    }
}

/// The result of Tseitin-encoding a formula: the CNF plus the bidirectional
/// theory-atom/propositional-name table.
#[derive(Debug, Clone)]
pub struct Encoding {
    pub cnf: Cnf,
    pub atom_to_theory: HashMap<String, TheoryAtom>,
    pub theory_to_atom: HashMap<TheoryAtom, String>,
}

/// Tseitin-encodes an NNF formula into an equisatisfiable CNF.
///
/// `nnf` must already be in negation normal form (see [`crate::ast::nnf`]);
/// this function does not push negations itself.
pub fn tseitin_cnf(nnf: &Prop) -> Encoding {
    let mut fresh = FreshNames::new();
    let mut atom_to_theory = HashMap::new();
    let mut theory_to_atom = HashMap::new();
    let mut cnf = Cnf::new();
    let mut true_atom: Option<String> = None;
    let mut false_atom: Option<String> = None;

    let root = encode(
        nnf,
        &mut fresh,
        &mut atom_to_theory,
        &mut theory_to_atom,
        &mut cnf,
        &mut true_atom,
        &mut false_atom,
    );
    cnf.push(vec![root]);

    Encoding {
        cnf,
        atom_to_theory,
        theory_to_atom,
    }
}

#[allow(clippy::too_many_arguments)]
fn encode(
    p: &Prop,
    fresh: &mut FreshNames,
    atom_to_theory: &mut HashMap<String, TheoryAtom>,
    theory_to_atom: &mut HashMap<TheoryAtom, String>,
    cnf: &mut Cnf,
    true_atom: &mut Option<String>,
    false_atom: &mut Option<String>,
) -> Literal {
    match p {
        Prop::True => {
            let atom = true_atom.get_or_insert_with(|| fresh.next_atom()).clone();
            // Only assert once; repeated occurrences reuse the same atom.
            if !cnf.contains(&vec![Literal::pos(atom.clone())]) {
                cnf.push(vec![Literal::pos(atom.clone())]);
            }
            Literal::pos(atom)
        }
        Prop::False => {
            let atom = false_atom.get_or_insert_with(|| fresh.next_atom()).clone();
            if !cnf.contains(&vec![Literal::neg(atom.clone())]) {
                cnf.push(vec![Literal::neg(atom.clone())]);
            }
            Literal::pos(atom)
        }
        Prop::Var(v) => Literal::pos(v.clone()),
        Prop::Ineq(i) => theory_literal(
            TheoryAtom::Ineq(i.clone()),
            fresh,
            atom_to_theory,
            theory_to_atom,
        ),
        Prop::Relu(x, y) => theory_literal(
            TheoryAtom::Relu(x.clone(), y.clone()),
            fresh,
            atom_to_theory,
            theory_to_atom,
        ),
        Prop::Not(inner) => {
            let lit = encode(
                inner,
                fresh,
                atom_to_theory,
                theory_to_atom,
                cnf,
                true_atom,
                false_atom,
            );
            lit.negated()
        }
        Prop::And(a, b) => {
            let la = encode(
                a,
                fresh,
                atom_to_theory,
                theory_to_atom,
                cnf,
                true_atom,
                false_atom,
            );
            let lb = encode(
                b,
                fresh,
                atom_to_theory,
                theory_to_atom,
                cnf,
                true_atom,
                false_atom,
            );
            let t = fresh.next_internal();
            let lt = Literal::pos(t);
            cnf.push(vec![lt.negated(), la.clone()]);
            cnf.push(vec![lt.negated(), lb.clone()]);
            cnf.push(vec![lt.clone(), la.negated(), lb.negated()]);
            lt
        }
        Prop::Or(a, b) => {
            let la = encode(
                a,
                fresh,
                atom_to_theory,
                theory_to_atom,
                cnf,
                true_atom,
                false_atom,
            );
            let lb = encode(
                b,
                fresh,
                atom_to_theory,
                theory_to_atom,
                cnf,
                true_atom,
                false_atom,
            );
            let t = fresh.next_internal();
            let lt = Literal::pos(t);
            cnf.push(vec![lt.negated(), la.clone(), lb.clone()]);
            cnf.push(vec![lt.clone(), la.negated()]);
            cnf.push(vec![lt.clone(), lb.negated()]);
            lt
        }
        Prop::Implies(a, b) => {
            // Not expected after NNF, but handled so encode() is total.
            let rewritten = (**a).clone().not().or((**b).clone());
            encode(
                &rewritten,
                fresh,
                atom_to_theory,
                theory_to_atom,
                cnf,
                true_atom,
                false_atom,
            )
        }
    }
}

fn theory_literal(
    atom: TheoryAtom,
    fresh: &mut FreshNames,
    atom_to_theory: &mut HashMap<String, TheoryAtom>,
    theory_to_atom: &mut HashMap<TheoryAtom, String>,
) -> Literal {
    let name = theory_to_atom
        .entry(atom.clone())
        .or_insert_with(|| fresh.next_atom())
        .clone();
    atom_to_theory.entry(name.clone()).or_insert(atom);
    Literal::pos(name)
}

/// Collects the set of distinct atom names referenced by a CNF, in
/// ascending lexical order (used to size a [`crate::solver::dpll::Model`]).
pub fn variables(cnf: &Cnf) -> Vec<String> {
    let mut set: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();
    for clause in cnf {
        for lit in clause {
            set.insert(lit.atom.clone());
        }
    }
    set.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{nnf, Ineq};
    use crate::solver::dpll::{solve, SolveResult, Val};

    fn var(name: &str) -> Prop {
        Prop::Var(name.to_string())
    }

    fn is_sat_under(cnf: &Cnf, assignment: &HashMap<String, bool>) -> bool {
        cnf.iter().all(|clause| {
            clause.iter().any(|lit| {
                let val = assignment.get(&lit.atom).copied().unwrap_or(false);
                val != lit.neg
            })
        })
    }

    fn eval_prop(p: &Prop, assignment: &HashMap<String, bool>) -> bool {
        match p {
            Prop::True => true,
            Prop::False => false,
            Prop::Var(v) => assignment.get(v).copied().unwrap_or(false),
            Prop::Ineq(_) | Prop::Relu(_, _) => {
                panic!("eval_prop only supports purely propositional formulas")
            }
            Prop::Not(a) => !eval_prop(a, assignment),
            Prop::And(a, b) => eval_prop(a, assignment) && eval_prop(b, assignment),
            Prop::Or(a, b) => eval_prop(a, assignment) || eval_prop(b, assignment),
            Prop::Implies(a, b) => !eval_prop(a, assignment) || eval_prop(b, assignment),
        }
    }

    #[test]
    fn theory_atom_map_is_complete_and_bijective() {
        let ineq = Prop::Ineq(Ineq::new([("x".to_string(), 1.0)], 0.0));
        let relu = Prop::Relu("x".to_string(), "y".to_string());
        let p = ineq.clone().and(relu.clone());
        let encoding = tseitin_cnf(&nnf(&p));

        assert_eq!(encoding.theory_to_atom.len(), 2);
        assert_eq!(encoding.atom_to_theory.len(), 2);
        for (atom, theory) in &encoding.atom_to_theory {
            assert_eq!(encoding.theory_to_atom.get(theory).unwrap(), atom);
        }
    }

    #[test]
    fn encoding_sat_matches_formula_sat() {
        // (x and y) or (not x and not y)  -- satisfiable, equivalent to x<->y
        let p = var("x")
            .and(var("y"))
            .or(var("x").not().and(var("y").not()));
        let encoding = tseitin_cnf(&nnf(&p));

        match solve(&encoding.cnf) {
            SolveResult::Sat(model) => {
                let assignment: HashMap<String, bool> = model
                    .assignments()
                    .into_iter()
                    .map(|(k, v)| (k, v == Val::True))
                    .collect();
                assert!(is_sat_under(&encoding.cnf, &assignment));
                assert!(eval_prop(&p, &assignment));
            }
            SolveResult::Unsat => panic!("expected SAT"),
        }
    }

    #[test]
    fn encoding_unsat_matches_formula_unsat() {
        let p = var("x").and(var("x").not());
        let encoding = tseitin_cnf(&nnf(&p));
        assert_eq!(solve(&encoding.cnf), SolveResult::Unsat);
    }

    #[test]
    fn top_level_literal_is_asserted() {
        let p = var("x");
        let encoding = tseitin_cnf(&nnf(&p));
        assert!(encoding.cnf.contains(&vec![Literal::pos("x")]));
    }
}
