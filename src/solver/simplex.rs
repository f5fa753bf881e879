//! General-bound Simplex feasibility engine (Dutertre & de Moura,
//! "A Fast Linear-Arithmetic Solver for DPLL(T)").
//!
//! The tableau keeps every basic variable expressed as a linear combination
//! of non-basic ones (`xj = Σ aᵢ·xi`), each variable carrying its own
//! `[lower, upper]` bound. The loop invariant is that non-basic variables
//! always sit inside their bounds; only basic variables can go out of
//! range, and the algorithm repeatedly pivots a violating basic variable
//! against a non-basic one that can absorb the correction, using Bland's
//! rule (lexicographically smallest pivot candidate) to guarantee
//! termination.

use std::collections::HashMap;

use log::debug;

use crate::error::SolveError;

/// Numerical slack below which a bound is considered exactly met. Matches
/// the tolerance the Reluplex layer uses for its own residual checks.
pub const EPS: f64 = 1e-9;

/// Inclusive bounds on a single variable. `lower`/`upper` may be
/// `f64::NEG_INFINITY` / `f64::INFINITY` for an unbounded side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    pub lower: f64,
    pub upper: f64,
}

impl Bound {
    pub fn new(lower: f64, upper: f64) -> Self {
        Bound { lower, upper }
    }

    pub fn unbounded() -> Self {
        Bound::new(f64::NEG_INFINITY, f64::INFINITY)
    }
}

/// A tableau row: `basic = Σ coeffs[v] * v` over non-basic variables.
///
/// `coeffs` is a `BTreeMap` rather than a `HashMap` so Bland's rule (pivot
/// on the lexicographically first eligible variable) falls out of a plain
/// ascending iteration instead of needing an explicit sort per pivot.
#[derive(Debug, Clone)]
pub struct Row {
    pub basic: String,
    pub coeffs: std::collections::BTreeMap<String, f64>,
}

/// Full Simplex tableau state: row equations, variable bounds, and the
/// current assignment.
#[derive(Debug, Clone)]
pub struct Tableau {
    pub rows: Vec<Row>,
    pub bounds: HashMap<String, Bound>,
    pub assign: HashMap<String, f64>,
}

impl Tableau {
    pub fn basic_vars(&self) -> Vec<String> {
        self.rows.iter().map(|r| r.basic.clone()).collect()
    }
}

/// Builds a tableau from row definitions and variable bounds.
///
/// `row_defs` is `[(basic_var, {non_basic_var: coeff, ...}), ...]`.
/// `bounds` must cover every variable mentioned, basic or non-basic.
///
/// Non-basic variables are initialized to their lower bound (or `0.0`/the
/// nearer finite bound, if unbounded below); basic variables are then
/// computed from their row equations. Returns
/// [`SolveError::InconsistentBounds`] if any variable has `lower > upper`.
pub fn build_tableau(
    row_defs: Vec<(String, std::collections::BTreeMap<String, f64>)>,
    bounds: HashMap<String, (f64, f64)>,
) -> Result<Tableau, SolveError> {
    let mut bound_map = HashMap::new();
    for (var, (lo, hi)) in &bounds {
        if lo > hi {
            return Err(SolveError::InconsistentBounds {
                var: var.clone(),
                lower: *lo,
                upper: *hi,
            });
        }
        bound_map.insert(var.clone(), Bound::new(*lo, *hi));
    }

    let rows: Vec<Row> = row_defs
        .into_iter()
        .map(|(basic, coeffs)| Row { basic, coeffs })
        .collect();

    let basic_set: std::collections::HashSet<String> =
        rows.iter().map(|r| r.basic.clone()).collect();

    let mut assign: HashMap<String, f64> = HashMap::new();
    for var in bound_map.keys() {
        if basic_set.contains(var) {
            continue;
        }
        let b = bound_map[var];
        let v = if b.lower == f64::NEG_INFINITY && b.upper == f64::INFINITY {
            0.0
        } else if b.lower == f64::NEG_INFINITY {
            b.upper.min(0.0)
        } else {
            b.lower
        };
        assign.insert(var.clone(), v);
    }

    for row in &rows {
        let v = compute_basic(&assign, row);
        assign.insert(row.basic.clone(), v);
    }

    Ok(Tableau {
        rows,
        bounds: bound_map,
        assign,
    })
}

pub(crate) fn compute_basic(assign: &HashMap<String, f64>, row: &Row) -> f64 {
    row.coeffs
        .iter()
        .map(|(v, c)| c * assign.get(v).copied().unwrap_or(0.0))
        .sum()
}

pub(crate) fn recompute_all_basic(tableau: &mut Tableau) {
    for row in &tableau.rows {
        let v = compute_basic(&tableau.assign, row);
        tableau.assign.insert(row.basic.clone(), v);
    }
}

/// Swaps non-basic `xi` into the basis in place of basic `xj`, rewriting
/// `xj`'s row in terms of the old basis and substituting the new
/// expression for `xi` into every other row that references it.
///
/// Rows store only non-zero coefficients, so both the rewritten pivot row
/// and every substituted row are pruned of entries that land within `EPS`
/// of zero.
pub(crate) fn pivot(tableau: &mut Tableau, xi: &str, xj: &str) {
    let pivot_idx = tableau
        .rows
        .iter()
        .position(|r| r.basic == xj)
        .expect("pivot: xj must be a basic variable");
    let a = tableau.rows[pivot_idx].coeffs[xi];

    let mut new_coeffs = std::collections::BTreeMap::new();
    for (var, c) in &tableau.rows[pivot_idx].coeffs {
        if var == xi {
            continue;
        }
        new_coeffs.insert(var.clone(), -c / a);
    }
    new_coeffs.insert(xj.to_string(), 1.0 / a);
    new_coeffs.retain(|_, c| c.abs() > EPS);

    tableau.rows[pivot_idx].basic = xi.to_string();
    tableau.rows[pivot_idx].coeffs = new_coeffs.clone();

    for (idx, row) in tableau.rows.iter_mut().enumerate() {
        if idx == pivot_idx || row.basic == xi {
            continue;
        }
        let factor = match row.coeffs.remove(xi) {
            Some(f) => f,
            None => continue,
        };
        for (var, c) in &new_coeffs {
            *row.coeffs.entry(var.clone()).or_insert(0.0) += factor * c;
        }
        row.coeffs.retain(|_, c| c.abs() > EPS);
    }
}

pub(crate) fn update_assign(tableau: &mut Tableau, xj: &str, new_val: f64) {
    tableau.assign.insert(xj.to_string(), new_val);
    recompute_all_basic(tableau);
}

/// The three-way outcome of a bounded Simplex search.
///
/// A budget-limited search cannot always tell a true infeasibility apart
/// from having run out of pivots, so this result carries a third `Unknown`
/// variant alongside the textbook `Sat`/`Unsat` pair. Callers that only care
/// about the conservative decision can fold `Unknown` into `Unsat`.
#[derive(Debug, Clone, PartialEq)]
pub enum SimplexOutcome {
    /// The tableau is feasible, with the witnessing assignment.
    Sat(HashMap<String, f64>),
    /// The tableau is infeasible.
    Unsat,
    /// The search exhausted `max_iter` pivots without deciding.
    Unknown,
}

/// Runs the bounded-variable Simplex decision procedure on `tableau`,
/// mutating it in place, for at most `max_iter` pivots.
///
/// # Arguments
///
/// * `tableau` - The tableau to decide, mutated in place across pivots
/// * `max_iter` - The maximum number of pivots to perform before giving up
///
/// # Returns
///
/// * `SimplexOutcome::Sat(assignment)` - If every row and bound is
///   satisfied, with the witnessing assignment
/// * `SimplexOutcome::Unsat` - If a violated row has no eligible pivot
/// * `SimplexOutcome::Unknown` - If `max_iter` pivots were spent without
///   deciding
///
/// # Algorithm
///
/// Each iteration:
/// 1. **Find a violation**: scan rows in order for the first basic variable
///    outside its bounds (within `EPS`). If none, return SAT.
/// 2. **Determine direction**: if the value is below its lower bound it
///    must increase; if above its upper bound it must decrease.
/// 3. **Select a pivot (Bland's rule)**: scan the violated row's non-basic
///    variables in ascending name order for the first one that can move to
///    absorb the violation. If none, return UNSAT.
/// 4. **Pivot**: exchange the chosen non-basic variable into the basis in
///    place of the violated one, driving the violated variable exactly to
///    its nearest bound.
///
/// # Examples
///
/// ```
/// use std::collections::{BTreeMap, HashMap};
/// use putnam_relu::solver::simplex::{build_tableau, simplex, SimplexOutcome};
///
/// let row_defs = vec![("s".to_string(), BTreeMap::from([("x".to_string(), 1.0)]))];
/// let bounds = HashMap::from([
///     ("s".to_string(), (0.0, f64::INFINITY)),
///     ("x".to_string(), (f64::NEG_INFINITY, f64::INFINITY)),
/// ]);
/// let mut tableau = build_tableau(row_defs, bounds).unwrap();
/// assert!(matches!(simplex(&mut tableau, 10_000), SimplexOutcome::Sat(_)));
/// ```
pub fn simplex(tableau: &mut Tableau, max_iter: usize) -> SimplexOutcome {
    for _ in 0..max_iter {
        let violated = tableau.rows.iter().find(|row| {
            let val = tableau.assign[&row.basic];
            let b = tableau.bounds[&row.basic];
            val < b.lower - EPS || val > b.upper + EPS
        });

        let violated_row = match violated {
            Some(r) => r.clone(),
            None => return SimplexOutcome::Sat(tableau.assign.clone()),
        };

        let xj = violated_row.basic.clone();
        let val = tableau.assign[&xj];
        let b_xj = tableau.bounds[&xj];
        let going_up = val < b_xj.lower;

        let mut pivot_xi: Option<String> = None;
        for xi in violated_row.coeffs.keys() {
            let a = violated_row.coeffs[xi];
            let b_xi = tableau.bounds[xi];
            let xi_val = tableau.assign[xi];

            let eligible = if going_up {
                (a > EPS && xi_val < b_xi.upper - EPS) || (a < -EPS && xi_val > b_xi.lower + EPS)
            } else {
                (a < -EPS && xi_val < b_xi.upper - EPS) || (a > EPS && xi_val > b_xi.lower + EPS)
            };
            if eligible {
                pivot_xi = Some(xi.clone());
                break;
            }
        }

        let pivot_xi = match pivot_xi {
            Some(xi) => xi,
            None => return SimplexOutcome::Unsat,
        };

        let a = violated_row.coeffs[&pivot_xi];
        let target = if going_up { b_xj.lower } else { b_xj.upper };
        let delta = (target - val) / a;

        debug!("pivot: {} enters, {} leaves, delta={}", pivot_xi, xj, delta);

        let new_xi_val = tableau.assign[&pivot_xi] + delta;
        update_assign(tableau, &pivot_xi, new_xi_val);
        pivot(tableau, &pivot_xi, &xj);
        tableau.assign.insert(xj, target);
        recompute_all_basic(tableau);
    }
    SimplexOutcome::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(basic: &str, coeffs: &[(&str, f64)]) -> (String, std::collections::BTreeMap<String, f64>) {
        (
            basic.to_string(),
            coeffs.iter().map(|(v, c)| (v.to_string(), *c)).collect(),
        )
    }

    #[test]
    fn satisfiable_system_is_sat() {
        let row_defs = vec![
            row("s1", &[("x", 1.0), ("y", 1.0)]),
            row("s2", &[("x", -2.0), ("y", 1.0)]),
            row("s3", &[("x", -10.0), ("y", 1.0)]),
        ];
        let bounds = HashMap::from([
            ("s1".to_string(), (0.0, f64::INFINITY)),
            ("s2".to_string(), (2.0, f64::INFINITY)),
            ("s3".to_string(), (-5.0, f64::INFINITY)),
            ("x".to_string(), (f64::NEG_INFINITY, f64::INFINITY)),
            ("y".to_string(), (f64::NEG_INFINITY, f64::INFINITY)),
        ]);
        let mut tableau = build_tableau(row_defs, bounds).unwrap();
        match simplex(&mut tableau, 10_000) {
            SimplexOutcome::Sat(assign) => {
                assert!(assign["x"] + assign["y"] >= -EPS);
                assert!(-2.0 * assign["x"] + assign["y"] >= 2.0 - EPS);
                assert!(-10.0 * assign["x"] + assign["y"] >= -5.0 - EPS);
            }
            other => panic!("expected Sat, got {:?}", other),
        }
    }

    #[test]
    fn contradictory_bounds_are_unsat() {
        // x >= 5 and x <= 3 is infeasible.
        let row_defs = vec![row("s1", &[("x", 1.0)]), row("s2", &[("x", -1.0)])];
        let bounds = HashMap::from([
            ("s1".to_string(), (5.0, f64::INFINITY)),
            ("s2".to_string(), (-3.0, f64::INFINITY)),
            ("x".to_string(), (0.0, f64::INFINITY)),
        ]);
        let mut tableau = build_tableau(row_defs, bounds).unwrap();
        assert_eq!(simplex(&mut tableau, 10_000), SimplexOutcome::Unsat);
    }

    #[test]
    fn multi_variable_system_is_sat() {
        let row_defs = vec![
            row("s1", &[("x", 1.0), ("y", 1.0)]),
            row("s2", &[("x", 1.0), ("y", -1.0)]),
            row("s3", &[("x", -1.0), ("y", 2.0)]),
        ];
        let bounds = HashMap::from([
            ("s1".to_string(), (10.0, f64::INFINITY)),
            ("s2".to_string(), (0.0, f64::INFINITY)),
            ("s3".to_string(), (3.0, f64::INFINITY)),
            ("x".to_string(), (0.0, f64::INFINITY)),
            ("y".to_string(), (0.0, f64::INFINITY)),
        ]);
        let mut tableau = build_tableau(row_defs, bounds).unwrap();
        assert!(matches!(
            simplex(&mut tableau, 10_000),
            SimplexOutcome::Sat(_)
        ));
    }

    #[test]
    fn inconsistent_bounds_are_rejected_at_build_time() {
        let row_defs = vec![row("s1", &[("x", 1.0)])];
        let bounds = HashMap::from([
            ("s1".to_string(), (0.0, f64::INFINITY)),
            ("x".to_string(), (5.0, 1.0)),
        ]);
        assert!(matches!(
            build_tableau(row_defs, bounds),
            Err(SolveError::InconsistentBounds { .. })
        ));
    }

    #[test]
    fn zero_iteration_budget_yields_unknown_on_a_violating_start() {
        let row_defs = vec![row("s1", &[("x", 1.0), ("y", 1.0)])];
        let bounds = HashMap::from([
            ("s1".to_string(), (5.0, f64::INFINITY)),
            ("x".to_string(), (f64::NEG_INFINITY, f64::INFINITY)),
            ("y".to_string(), (f64::NEG_INFINITY, f64::INFINITY)),
        ]);
        let mut tableau = build_tableau(row_defs, bounds).unwrap();
        assert_eq!(simplex(&mut tableau, 0), SimplexOutcome::Unknown);
    }
}
