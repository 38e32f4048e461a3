//! Symgen core: path selection and constraint simplification for
//! symbolic-execution test generation.
//!
//! The driving executor pops a state from a [`select::PathSelector`],
//! executes one step, and offers successor states back; each state carries a
//! [`query::Query`] that simplifies branch facts incrementally and detects
//! local unsatisfiability without touching the solver. Selectors rank states
//! by distance to their current objective, computed by the [`dist`] oracles
//! over the [`graph`] models.
//!
//! The bytecode loader, the solver, test rendering, and the fuzzing layer are
//! external collaborators reached through the traits in [`solver`] and
//! [`graph::body`].

pub mod config;
pub mod constraint;
pub mod dist;
pub mod error;
pub mod expr;
pub mod graph;
pub mod query;
pub mod select;
pub mod simplify;
pub mod solver;
pub mod taint;

pub use config::EngineConfig;
pub use error::ResolveError;
pub use expr::Expr;
pub use query::{Query, QueryStatus};
pub use select::{ExecutionState, PathSelector};
