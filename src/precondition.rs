//! Helpers for building common preconditions as [`Prop`] trees, rather than
//! hand-writing them through the surface DSL.
//!
//! Robustness-style verification queries (e.g. "does a small perturbation
//! of this input ever change the network's decision") start from an
//! L∞-box precondition around a center point; this module builds that
//! conjunction directly.

use crate::ast::{Ineq, Prop};

/// Builds `∧ᵢ (cᵢ − eps ≤ xᵢ ≤ cᵢ + eps)`, optionally conjoined with
/// `∧ᵢ (0 ≤ xᵢ ≤ 1)` when `clamp_01` is set.
///
/// # Arguments
///
/// * `vars` - The variable names the box is built over
/// * `centers` - The center point, one coordinate per entry in `vars`
/// * `eps` - The half-width of the box along every dimension
/// * `clamp_01` - Whether to additionally conjoin `0 ≤ xᵢ ≤ 1` per variable
///
/// # Returns
///
/// A `Prop` conjunction of two inequalities per variable (lower and upper
/// bound), plus two more per variable when `clamp_01` is set.
///
/// # Panics
///
/// Panics if `vars.len() != centers.len()`. A length mismatch between the
/// variable list and the center point is a caller bug, not a value to
/// propagate through `Result`.
pub fn make_precondition_linf_box(
    vars: &[String],
    centers: &[f64],
    eps: f64,
    clamp_01: bool,
) -> Prop {
    assert_eq!(
        vars.len(),
        centers.len(),
        "vars and centers must have the same length"
    );

    let mut p = Prop::True;
    for (xi, ci) in vars.iter().zip(centers.iter()) {
        let lower = Prop::Ineq(Ineq::new([(xi.clone(), 1.0)], ci - eps));
        let upper = Prop::Ineq(Ineq::new([(xi.clone(), -1.0)], -(ci + eps)));
        p = p.and(lower).and(upper);

        if clamp_01 {
            let ge0 = Prop::Ineq(Ineq::new([(xi.clone(), 1.0)], 0.0));
            let le1 = Prop::Ineq(Ineq::new([(xi.clone(), -1.0)], -1.0));
            p = p.and(ge0).and(le1);
        }
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::orchestrator::{dpll_t, DpllTOutcome, OrchestratorConfig};

    #[test]
    fn single_variable_box_is_satisfiable_at_the_center() {
        let p = make_precondition_linf_box(&["x".to_string()], &[1.0], 0.1, false);
        assert!(matches!(
            dpll_t(&p, &OrchestratorConfig::default()),
            DpllTOutcome::Sat(_)
        ));
    }

    #[test]
    fn clamp_01_rejects_centers_outside_unit_interval() {
        let p = make_precondition_linf_box(&["x".to_string()], &[5.0], 0.01, true);
        // center 5.0 with a tight box around it can never satisfy 0<=x<=1.
        assert_eq!(
            dpll_t(&p, &OrchestratorConfig::default()),
            DpllTOutcome::Unsat
        );
    }

    #[test]
    fn multi_variable_box_builds_four_inequalities_per_variable_with_clamp() {
        let p = make_precondition_linf_box(
            &["x".to_string(), "y".to_string()],
            &[0.5, 0.5],
            0.1,
            true,
        );
        // Two variables, six inequalities each, folded via And. Just check
        // it's satisfiable (0.5 is comfortably inside [0,1]).
        assert!(matches!(
            dpll_t(&p, &OrchestratorConfig::default()),
            DpllTOutcome::Sat(_)
        ));
    }

    #[test]
    #[should_panic(expected = "same length")]
    fn mismatched_lengths_panics() {
        make_precondition_linf_box(&["x".to_string()], &[1.0, 2.0], 0.1, false);
    }
}
