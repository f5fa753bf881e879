//! # putnam-relu
//!
//! An SMT decision procedure for linear real arithmetic extended with ReLU
//! constraints, built in three layers:
//!
//! - **Propositional core** ([`solver::dpll`], [`solver::unit`]): DPLL with
//!   unit propagation and pure-literal elimination over string-named CNF
//!   atoms.
//! - **Theory core** ([`solver::simplex`], [`solver::reluplex`]): a
//!   general-bound Simplex feasibility engine, extended with ReLU repair
//!   and case-splitting.
//! - **Orchestrator** ([`solver::orchestrator`]): the DPLL(T) loop that
//!   ties Boolean search to the theory solver via Tseitin CNF encoding and
//!   blocking clauses.
//!
//! Formulas are built directly as [`ast::Prop`] trees, or parsed from the
//! textual DSL via [`parser::parse`].
//!
//! ## Quick start
//!
//! ```rust
//! use putnam_relu::parser::parse;
//! use putnam_relu::solver::orchestrator::{dpll_t, DpllTOutcome, OrchestratorConfig};
//!
//! let formula = parse("ineq(1, x, 1, y, 5) and relu(x, y)").unwrap();
//! match dpll_t(&formula, &OrchestratorConfig::default()) {
//!     DpllTOutcome::Sat(model) => println!("satisfiable: {:?}", model),
//!     DpllTOutcome::Unsat => println!("unsatisfiable"),
//! }
//! ```

pub mod ast;
pub mod cnf;
pub mod error;
pub mod parser;
pub mod precondition;
pub mod solver;

pub use error::SolveError;
pub use solver::orchestrator::{dpll_t, DpllTOutcome, OrchestratorConfig};
