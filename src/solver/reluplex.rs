//! Reluplex: Simplex extended with ReLU repair and case-splitting (Katz et
//! al., "Reluplex: An Efficient SMT Solver for Verifying Deep Neural
//! Networks").
//!
//! A ReLU constraint `y = max(0, x)` is not linear, so it cannot live
//! inside the Simplex tableau directly. Reluplex instead runs ordinary
//! Simplex to a feasible point, checks which `(x, y)` pairs violate their
//! ReLU relationship, and repairs them one at a time by forcing either
//! `y ← relu(x)` or `x ← y` and re-running Simplex. When repair stalls it
//! case-splits on one violated pair into an "active" branch (`x ≥ 0`,
//! tied to `y = x` via a zero-bounded slack row) and an "inactive" branch
//! (`x ≤ 0`, `y = 0`), recursing into each.

use std::collections::{BTreeMap, HashMap};

use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::simplex::{build_tableau, pivot, simplex, update_assign, SimplexOutcome, Tableau};

fn relu(v: f64) -> f64 {
    if v > 0.0 {
        v
    } else {
        0.0
    }
}

const TOL: f64 = 1e-9;

fn check_relu_violations(
    assign: &HashMap<String, f64>,
    relus: &[(String, String)],
) -> Vec<(String, String)> {
    relus
        .iter()
        .filter(|(x, y)| match (assign.get(x), assign.get(y)) {
            (Some(xv), Some(yv)) => (yv - relu(*xv)).abs() > TOL,
            _ => true,
        })
        .cloned()
        .collect()
}

/// Tunable search budgets for [`reluplex`].
///
/// # Fields
///
/// * `max_recursion` - The maximum case-split recursion depth
/// * `simplex_max_iter` - The maximum Simplex pivots per feasibility check
/// * `local_repair_max_iter` - The maximum repair attempts per recursion
///   level before giving up and case-splitting
/// * `branch_tau` - The repair-count threshold past which a stalled pair is
///   abandoned in favor of splitting
/// * `seed` - The seed for the repair-direction shuffle, for reproducible
///   runs
#[derive(Debug, Clone, Copy)]
pub struct ReluplexConfig {
    pub max_recursion: usize,
    pub simplex_max_iter: usize,
    pub local_repair_max_iter: usize,
    pub branch_tau: usize,
    pub seed: u64,
}

impl Default for ReluplexConfig {
    fn default() -> Self {
        ReluplexConfig {
            max_recursion: 50,
            simplex_max_iter: 10_000,
            local_repair_max_iter: 10,
            branch_tau: 5,
            seed: 0,
        }
    }
}

/// The three-way outcome of a Reluplex search, mirroring
/// [`super::simplex::SimplexOutcome`].
#[derive(Debug, Clone, PartialEq)]
pub enum ReluplexOutcome {
    /// The constraints are feasible, with a witnessing assignment that also
    /// satisfies every `(x, y)` ReLU pair.
    Sat(HashMap<String, f64>),
    /// The constraints are infeasible.
    Unsat,
    /// The search exhausted its recursion or repair budget without deciding.
    Unknown,
}

struct Search {
    config: ReluplexConfig,
    relus: Vec<(String, String)>,
    /// Per-pair repair attempt counts, keyed by pair rather than by
    /// insertion order, so ties break on pair ordering instead of hash
    /// iteration order.
    repair_count: BTreeMap<(String, String), usize>,
    rng: StdRng,
    saw_unknown: bool,
}

impl Search {
    fn select_violation(&self, violations: &[(String, String)]) -> (String, String) {
        violations
            .iter()
            .min_by_key(|p| self.repair_count.get(*p).copied().unwrap_or(0))
            .cloned()
            .expect("select_violation called with no violations")
    }

    /// Attempts a single repair direction: `direction == 0` forces
    /// `y ← relu(x)`; `direction == 1` forces `x ← y`. Pivots the target
    /// variable out of the basis first if it's currently basic, since only
    /// non-basic variables can be assigned directly.
    fn try_repair(&mut self, tableau: &Tableau, x: &str, y: &str, direction: u8) -> SimplexOutcome {
        let mut t = tableau.clone();

        let x_val = *t.assign.get(x).unwrap_or(&0.0);
        let y_val = *t.assign.get(y).unwrap_or(&0.0);

        let (target_var, target_val): (&str, f64) = if direction == 0 {
            (y, relu(x_val))
        } else {
            (x, y_val)
        };

        let bound = t.bounds[target_var];
        if target_val < bound.lower - TOL || target_val > bound.upper + TOL {
            return SimplexOutcome::Unsat;
        }

        if t.basic_vars().iter().any(|b| b == target_var) {
            let pivot_col = t
                .rows
                .iter()
                .find(|r| r.basic == target_var)
                .and_then(|r| {
                    r.coeffs
                        .iter()
                        .find(|(_, c)| c.abs() > TOL)
                        .map(|(v, _)| v.clone())
                });
            match pivot_col {
                Some(col) => pivot(&mut t, &col, target_var),
                None => return SimplexOutcome::Unsat,
            }
        }

        update_assign(&mut t, target_var, target_val);

        simplex(&mut t, self.config.simplex_max_iter)
    }

    fn run(
        &mut self,
        bounds_now: &HashMap<String, (f64, f64)>,
        depth: usize,
        row_defs: &[(String, BTreeMap<String, f64>)],
    ) -> ReluplexOutcome {
        if depth > self.config.max_recursion {
            return ReluplexOutcome::Unknown;
        }

        let mut bounds_now = bounds_now.clone();
        for (_, y) in &self.relus {
            let (lo, hi) = *bounds_now
                .get(y)
                .unwrap_or(&(f64::NEG_INFINITY, f64::INFINITY));
            let new_lo = lo.max(0.0);
            if new_lo > hi + TOL {
                return ReluplexOutcome::Unsat;
            }
            bounds_now.insert(y.clone(), (new_lo, hi));
        }

        let tableau = match build_tableau(row_defs.to_vec(), bounds_now.clone()) {
            Ok(t) => t,
            Err(_) => return ReluplexOutcome::Unsat,
        };
        let mut tableau = tableau;
        let outcome = simplex(&mut tableau, self.config.simplex_max_iter);
        let mut assign = match outcome {
            SimplexOutcome::Sat(a) => a,
            SimplexOutcome::Unsat => return ReluplexOutcome::Unsat,
            SimplexOutcome::Unknown => {
                self.saw_unknown = true;
                return ReluplexOutcome::Unknown;
            }
        };

        let mut violations = check_relu_violations(&assign, &self.relus);
        if violations.is_empty() {
            return ReluplexOutcome::Sat(assign);
        }

        for _ in 0..self.config.local_repair_max_iter {
            let pair = self.select_violation(&violations);
            *self.repair_count.entry(pair.clone()).or_insert(0) += 1;
            debug!(
                "repair attempt on ({}, {}), count={}",
                pair.0,
                pair.1,
                self.repair_count[&pair]
            );

            let mut best_assign: Option<HashMap<String, f64>> = None;
            let mut best_violations = usize::MAX;
            let mut directions = [0u8, 1u8];
            directions.shuffle(&mut self.rng);

            for direction in directions {
                let repaired = self.try_repair(&tableau, &pair.0, &pair.1, direction);
                let candidate = match repaired {
                    SimplexOutcome::Sat(a) => a,
                    SimplexOutcome::Unsat => continue,
                    SimplexOutcome::Unknown => {
                        self.saw_unknown = true;
                        continue;
                    }
                };
                let candidate_violations = check_relu_violations(&candidate, &self.relus);
                if candidate_violations.is_empty() {
                    return ReluplexOutcome::Sat(candidate);
                }
                if candidate_violations.len() < best_violations {
                    best_violations = candidate_violations.len();
                    best_assign = Some(candidate);
                }
            }

            let candidate = match best_assign {
                Some(a) => a,
                None => break,
            };
            assign = candidate;
            violations = check_relu_violations(&assign, &self.relus);
            if violations.is_empty() {
                return ReluplexOutcome::Sat(assign);
            }

            let next_pair = self.select_violation(&violations);
            if self.repair_count.get(&next_pair).copied().unwrap_or(0) >= self.config.branch_tau {
                break;
            }
        }

        // Repair stalled; pick the most-attempted pair whose x-bounds still
        // straddle zero and split on it.
        let mut candidates: Vec<(&(String, String), usize)> = self
            .repair_count
            .iter()
            .map(|(p, c)| (p, *c))
            .collect();
        candidates.sort_by(|a, b| b.1.cmp(&a.1));

        let branch_x = candidates.into_iter().find_map(|(pair, _)| {
            let (lo, hi) = *bounds_now
                .get(&pair.0)
                .unwrap_or(&(f64::NEG_INFINITY, f64::INFINITY));
            if lo < 0.0 && hi > 0.0 {
                Some(pair.0.clone())
            } else {
                None
            }
        });

        let relu_y = branch_x
            .as_ref()
            .and_then(|bx| self.relus.iter().find(|(x, _)| x == bx).map(|(_, y)| y.clone()));

        let branch_x = match branch_x {
            Some(bx) if depth < self.config.max_recursion => bx,
            _ => return ReluplexOutcome::Unsat,
        };

        let (lo, hi) = *bounds_now
            .get(&branch_x)
            .unwrap_or(&(f64::NEG_INFINITY, f64::INFINITY));

        info!("case split on {} at depth {}", branch_x, depth);

        // Branch 1: x >= 0, tied to y = x via a zero-bounded slack row.
        let mut bounds1 = bounds_now.clone();
        bounds1.insert(branch_x.clone(), (lo.max(0.0), hi));
        let mut row_defs1 = row_defs.to_vec();
        if let Some(y) = &relu_y {
            let slack_name = format!("relu_slack_{}_pos_{}", branch_x, depth);
            let mut coeffs = BTreeMap::new();
            coeffs.insert(y.clone(), 1.0);
            coeffs.insert(branch_x.clone(), -1.0);
            row_defs1.push((slack_name.clone(), coeffs));
            bounds1.insert(slack_name, (0.0, 0.0));
        }
        if let ReluplexOutcome::Sat(a) = self.run(&bounds1, depth + 1, &row_defs1) {
            return ReluplexOutcome::Sat(a);
        }

        // Branch 2: x <= 0, y pinned to 0.
        let mut bounds2 = bounds_now.clone();
        bounds2.insert(branch_x.clone(), (lo, hi.min(0.0)));
        if let Some(y) = &relu_y {
            bounds2.insert(y.clone(), (0.0, 0.0));
        }
        if let ReluplexOutcome::Sat(a) = self.run(&bounds2, depth + 1, row_defs) {
            return ReluplexOutcome::Sat(a);
        }

        if self.saw_unknown {
            ReluplexOutcome::Unknown
        } else {
            ReluplexOutcome::Unsat
        }
    }
}

/// Decides feasibility of a Simplex system extended with ReLU constraints.
///
/// # Arguments
///
/// * `row_defs` - The tableau row definitions, as in
///   [`super::simplex::build_tableau`]
/// * `bounds` - The per-variable bounds, as in
///   [`super::simplex::build_tableau`]
/// * `relus` - The `(x, y)` pairs constrained by `y = max(0, x)`
/// * `config` - The recursion, repair, and Simplex budgets for this search
///
/// # Returns
///
/// * `ReluplexOutcome::Sat(assignment)` - If feasible, with an assignment
///   satisfying every row, bound, and ReLU pair
/// * `ReluplexOutcome::Unsat` - If infeasible
/// * `ReluplexOutcome::Unknown` - If the recursion or repair budget was
///   exhausted without deciding
///
/// # Algorithm
///
/// 1. Intersect every ReLU output's lower bound with `0`.
/// 2. Run Simplex on the current tableau; propagate its outcome on
///    Unsat/Unknown.
/// 3. Check every `(x, y)` pair for a ReLU violation; if none, return SAT.
/// 4. Attempt local repair on the least-attempted violated pair, trying
///    both `y ← relu(x)` and `x ← y` and keeping the best result.
/// 5. If repair stalls, case-split on the most-attempted pair whose input
///    bounds straddle zero, into an active and an inactive branch, and
///    recurse into each.
///
/// # Examples
///
/// ```
/// use std::collections::{BTreeMap, HashMap};
/// use putnam_relu::solver::reluplex::{reluplex, ReluplexConfig, ReluplexOutcome};
///
/// let row_defs = vec![(
///     "s".to_string(),
///     BTreeMap::from([("x".to_string(), 1.0), ("y".to_string(), 1.0)]),
/// )];
/// let bounds = HashMap::from([
///     ("s".to_string(), (5.0, f64::INFINITY)),
///     ("x".to_string(), (f64::NEG_INFINITY, f64::INFINITY)),
///     ("y".to_string(), (f64::NEG_INFINITY, f64::INFINITY)),
/// ]);
/// let relus = vec![("x".to_string(), "y".to_string())];
/// assert!(matches!(
///     reluplex(row_defs, bounds, relus, ReluplexConfig::default()),
///     ReluplexOutcome::Sat(_)
/// ));
/// ```
pub fn reluplex(
    row_defs: Vec<(String, BTreeMap<String, f64>)>,
    bounds: HashMap<String, (f64, f64)>,
    relus: Vec<(String, String)>,
    config: ReluplexConfig,
) -> ReluplexOutcome {
    let mut search = Search {
        config,
        relus,
        repair_count: BTreeMap::new(),
        rng: StdRng::seed_from_u64(config.seed),
        saw_unknown: false,
    };
    search.run(&bounds, 0, &row_defs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(basic: &str, coeffs: &[(&str, f64)]) -> (String, BTreeMap<String, f64>) {
        (
            basic.to_string(),
            coeffs.iter().map(|(v, c)| (v.to_string(), *c)).collect(),
        )
    }

    #[test]
    fn sat_with_relu_active() {
        // x + y >= 5, y = relu(x). Satisfiable with x = y = 2.5.
        let row_defs = vec![row("s1", &[("x", 1.0), ("y", 1.0)])];
        let bounds = HashMap::from([
            ("s1".to_string(), (5.0, f64::INFINITY)),
            ("x".to_string(), (f64::NEG_INFINITY, f64::INFINITY)),
            ("y".to_string(), (f64::NEG_INFINITY, f64::INFINITY)),
        ]);
        let relus = vec![("x".to_string(), "y".to_string())];
        let outcome = reluplex(row_defs, bounds, relus, ReluplexConfig::default());
        match outcome {
            ReluplexOutcome::Sat(assign) => {
                let x = assign["x"];
                let y = assign["y"];
                assert!((y - relu(x)).abs() < 1e-6);
                assert!(x + y >= 5.0 - 1e-6);
            }
            other => panic!("expected Sat, got {:?}", other),
        }
    }

    #[test]
    fn unsat_when_relu_output_forced_negative() {
        // x >= 0, y = relu(x), y < 0: contradictory since relu is non-negative.
        let row_defs = vec![row("c1", &[("x", 1.0)])];
        let bounds = HashMap::from([
            ("c1".to_string(), (0.0, f64::INFINITY)),
            ("x".to_string(), (f64::NEG_INFINITY, f64::INFINITY)),
            ("y".to_string(), (f64::NEG_INFINITY, -1e-6)),
        ]);
        let relus = vec![("x".to_string(), "y".to_string())];
        let outcome = reluplex(row_defs, bounds, relus, ReluplexConfig::default());
        assert_eq!(outcome, ReluplexOutcome::Unsat);
    }

    #[test]
    fn sat_with_relu_inactive() {
        // x + y <= 2 (as s1 = x+y >= 2 is not required; here s1 >= 2 upper-bounded
        // differently), y = relu(x); x = -1, y = 0 should be reachable.
        let row_defs = vec![row("s1", &[("x", 1.0), ("y", 1.0)])];
        let bounds = HashMap::from([
            ("s1".to_string(), (-10.0, f64::INFINITY)),
            ("x".to_string(), (f64::NEG_INFINITY, 0.0)),
            ("y".to_string(), (f64::NEG_INFINITY, f64::INFINITY)),
        ]);
        let relus = vec![("x".to_string(), "y".to_string())];
        let outcome = reluplex(row_defs, bounds, relus, ReluplexConfig::default());
        assert!(matches!(outcome, ReluplexOutcome::Sat(_)));
    }

    #[test]
    fn deterministic_for_fixed_seed() {
        let row_defs = vec![row("s1", &[("x", 1.0), ("y", 1.0)])];
        let bounds = HashMap::from([
            ("s1".to_string(), (5.0, f64::INFINITY)),
            ("x".to_string(), (f64::NEG_INFINITY, f64::INFINITY)),
            ("y".to_string(), (f64::NEG_INFINITY, f64::INFINITY)),
        ]);
        let relus = vec![("x".to_string(), "y".to_string())];
        let cfg = ReluplexConfig {
            seed: 42,
            ..ReluplexConfig::default()
        };
        let a = reluplex(row_defs.clone(), bounds.clone(), relus.clone(), cfg);
        let b = reluplex(row_defs, bounds, relus, cfg);
        assert_eq!(a, b);
    }
}
