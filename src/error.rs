//! Unified error taxonomy for every layer of the solver.
//!
//! Internal invariant violations (a pivot on a zero coefficient, a missing
//! row for a basic variable) are programming errors and `panic!` rather than
//! flow through this type: they indicate a bug in this crate, not a
//! malformed input or an exhausted search budget.

use thiserror::Error;

/// Errors surfaced across parsing, bound setup, and search-budget exhaustion.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolveError {
    /// The input formula DSL could not be parsed.
    #[error("parse error at byte {position}: {message}")]
    Parse { message: String, position: usize },

    /// A variable was given `lower > upper` somewhere during tableau setup.
    #[error("inconsistent bounds for variable `{var}`: lower {lower} > upper {upper}")]
    InconsistentBounds { var: String, lower: f64, upper: f64 },

    /// Simplex exhausted its pivot budget without proving SAT or UNSAT.
    #[error("simplex iteration budget exceeded")]
    SimplexBudgetExceeded,

    /// Reluplex exhausted its recursion or repair budget without deciding.
    #[error("reluplex recursion/repair budget exceeded")]
    ReluplexBudgetExceeded,

    /// DPLL(T) exhausted its round budget without deciding.
    #[error("DPLL(T) round budget exceeded")]
    RoundBudgetExceeded,
}
