//! Propositional formula algebra over linear-arithmetic and ReLU theory atoms.
//!
//! A [`Prop`] tree is the output of the surface parser and the input to the
//! Tseitin encoder. Nodes are plain owned values compared structurally, with
//! no hash-consing here, just `Eq`/`Clone` on a recursive enum.

use std::collections::BTreeMap;
use std::fmt;

/// A real-valued variable name.
pub type Var = String;

/// A linear inequality `Σ cᵢ·vᵢ ≥ b`.
///
/// `coeffs` is a canonical (sorted-by-name) map rather than an arbitrary
/// list, so two inequalities built from the same terms in different orders
/// compare and hash equal.
#[derive(Debug, Clone)]
pub struct Ineq {
    pub coeffs: BTreeMap<Var, f64>,
    pub b: f64,
}

impl Ineq {
    pub fn new(coeffs: impl IntoIterator<Item = (Var, f64)>, b: f64) -> Self {
        Ineq {
            coeffs: coeffs.into_iter().collect(),
            b,
        }
    }

    /// The strict negation `Σ(−cᵢ)·vᵢ ≥ −b + eps`, the ε-margin approximation
    /// of `¬(Σcᵢvᵢ ≥ b)` used by the DPLL(T) orchestrator (§4.6).
    pub fn negated(&self, eps: f64) -> Ineq {
        let coeffs = self.coeffs.iter().map(|(v, c)| (v.clone(), -c)).collect();
        Ineq {
            coeffs,
            b: -self.b + eps,
        }
    }
}

impl fmt::Display for Ineq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.coeffs.is_empty() {
            write!(f, "0 >= {}", self.b)
        } else {
            let terms: Vec<String> = self
                .coeffs
                .iter()
                .map(|(v, c)| format!("{}*{}", c, v))
                .collect();
            write!(f, "{} >= {}", terms.join(" + "), self.b)
        }
    }
}

// f64 has no total Eq/Hash; compare/hash via bit pattern instead. Two
// `Ineq`s built from the same coefficients and constant compare equal
// regardless of how they were constructed, since `coeffs` is already
// canonically ordered.
impl PartialEq for Ineq {
    fn eq(&self, other: &Self) -> bool {
        self.b.to_bits() == other.b.to_bits()
            && self.coeffs.len() == other.coeffs.len()
            && self
                .coeffs
                .iter()
                .zip(other.coeffs.iter())
                .all(|((k1, v1), (k2, v2))| k1 == k2 && v1.to_bits() == v2.to_bits())
    }
}
impl Eq for Ineq {}

impl std::hash::Hash for Ineq {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for (k, v) in &self.coeffs {
            k.hash(state);
            v.to_bits().hash(state);
        }
        self.b.to_bits().hash(state);
    }
}

/// A propositional formula over Boolean variables and linear-arithmetic /
/// ReLU theory atoms.
#[derive(Debug, Clone, PartialEq)]
pub enum Prop {
    True,
    False,
    /// A purely propositional variable.
    Var(String),
    /// A linear inequality theory atom.
    Ineq(Ineq),
    /// A ReLU theory atom `y = max(0, x)`, carrying `(x, y)`.
    Relu(Var, Var),
    And(Box<Prop>, Box<Prop>),
    Or(Box<Prop>, Box<Prop>),
    Not(Box<Prop>),
    Implies(Box<Prop>, Box<Prop>),
}

impl Prop {
    pub fn and(self, other: Prop) -> Prop {
        Prop::And(Box::new(self), Box::new(other))
    }
    pub fn or(self, other: Prop) -> Prop {
        Prop::Or(Box::new(self), Box::new(other))
    }
    pub fn not(self) -> Prop {
        Prop::Not(Box::new(self))
    }
    pub fn implies(self, other: Prop) -> Prop {
        Prop::Implies(Box::new(self), Box::new(other))
    }

    /// True for the two theory-atom variants (inequality, ReLU); false for
    /// everything purely propositional.
    pub fn is_theory_atom(&self) -> bool {
        matches!(self, Prop::Ineq(_) | Prop::Relu(_, _))
    }
}

impl fmt::Display for Prop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prop::True => write!(f, "true"),
            Prop::False => write!(f, "false"),
            Prop::Var(v) => write!(f, "{}", v),
            Prop::Ineq(i) => write!(f, "ineq({})", i),
            Prop::Relu(x, y) => write!(f, "relu({}, {})", x, y),
            Prop::Not(p) => write!(f, "not {}", p),
            Prop::And(a, b) => write!(f, "({} and {})", a, b),
            Prop::Or(a, b) => write!(f, "({} or {})", a, b),
            Prop::Implies(a, b) => write!(f, "({} -> {})", a, b),
        }
    }
}

/// A side table identifying theory atoms, independent of `Prop` identity.
///
/// The Tseitin encoder interns each distinct theory atom it encounters into
/// this key type and hands back a stable propositional name for it; the
/// resulting map is a plain bidirectional table, never a pointer graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TheoryAtom {
    Ineq(Ineq),
    Relu(Var, Var),
}

impl fmt::Display for TheoryAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TheoryAtom::Ineq(i) => write!(f, "ineq({})", i),
            TheoryAtom::Relu(x, y) => write!(f, "relu({}, {})", x, y),
        }
    }
}

/// Constant-folds `True`/`False` through `And`/`Or`/`Not` and removes double
/// negation. Does not touch `Implies` (see [`eliminate_implies`]).
pub fn simplify(p: &Prop) -> Prop {
    match p {
        Prop::And(a, b) => {
            let a = simplify(a);
            let b = simplify(b);
            match (&a, &b) {
                (Prop::False, _) | (_, Prop::False) => Prop::False,
                (Prop::True, _) => b,
                (_, Prop::True) => a,
                _ => a.and(b),
            }
        }
        Prop::Or(a, b) => {
            let a = simplify(a);
            let b = simplify(b);
            match (&a, &b) {
                (Prop::True, _) | (_, Prop::True) => Prop::True,
                (Prop::False, _) => b,
                (_, Prop::False) => a,
                _ => a.or(b),
            }
        }
        Prop::Not(a) => {
            let a = simplify(a);
            match a {
                Prop::True => Prop::False,
                Prop::False => Prop::True,
                Prop::Not(inner) => *inner,
                other => other.not(),
            }
        }
        Prop::Implies(a, b) => simplify(a).implies(simplify(b)),
        other => other.clone(),
    }
}

/// Rewrites every `P -> Q` to `¬P ∨ Q`, structurally, leaving every other
/// node shape unchanged.
pub fn eliminate_implies(p: &Prop) -> Prop {
    match p {
        Prop::And(a, b) => eliminate_implies(a).and(eliminate_implies(b)),
        Prop::Or(a, b) => eliminate_implies(a).or(eliminate_implies(b)),
        Prop::Not(a) => eliminate_implies(a).not(),
        Prop::Implies(a, b) => eliminate_implies(a).not().or(eliminate_implies(b)),
        other => other.clone(),
    }
}

/// Pushes negation down to the leaves via De Morgan, producing negation
/// normal form. Handles `Implies` and double negation inline, so `nnf` is
/// idempotent and sound even when called on a formula that hasn't already
/// been through [`simplify`]/[`eliminate_implies`].
///
/// A literal over a theory atom (inequality or ReLU) is preserved as
/// `Not(atom)`: the CNF encoder gives it a single propositional name and
/// relies on the theory solver to interpret the negation.
pub fn nnf(p: &Prop) -> Prop {
    go(p, false)
}

fn go(p: &Prop, neg: bool) -> Prop {
    match p {
        Prop::True => {
            if neg {
                Prop::False
            } else {
                Prop::True
            }
        }
        Prop::False => {
            if neg {
                Prop::True
            } else {
                Prop::False
            }
        }
        Prop::Var(v) => leaf(Prop::Var(v.clone()), neg),
        Prop::Ineq(i) => leaf(Prop::Ineq(i.clone()), neg),
        Prop::Relu(x, y) => leaf(Prop::Relu(x.clone(), y.clone()), neg),
        Prop::Not(inner) => go(inner, !neg),
        Prop::And(a, b) => {
            if neg {
                go(a, true).or(go(b, true))
            } else {
                go(a, false).and(go(b, false))
            }
        }
        Prop::Or(a, b) => {
            if neg {
                go(a, true).and(go(b, true))
            } else {
                go(a, false).or(go(b, false))
            }
        }
        Prop::Implies(a, b) => {
            // ¬P ∨ Q, recursed with the same target polarity.
            let rewritten = (**a).clone().not().or((**b).clone());
            go(&rewritten, neg)
        }
    }
}

fn leaf(atom: Prop, neg: bool) -> Prop {
    if neg {
        atom.not()
    } else {
        atom
    }
}
