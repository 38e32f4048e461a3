//! Boundary to the external SAT/SMT oracle.
//!
//! The solver itself is out of scope for this core: it is an opaque,
//! synchronous, cancelable callback. A timeout surfaces as `Undefined`, never
//! as an error — the state that owns the query stays schedulable.

use crate::expr::{Expr, ScalarValue};
use crate::query::Query;
use std::fmt;
use std::sync::Arc;

/// A satisfying assignment returned by the solver. `eval` concretizes an
/// expression under this one model; `None` means the model does not pin the
/// expression down (partial models are allowed).
pub trait ModelEval: fmt::Debug {
    fn eval(&self, expr: &Expr) -> Option<ScalarValue>;
}

/// Outcome of one solver invocation.
#[derive(Debug, Clone)]
pub enum CheckSat {
    Sat(Arc<dyn ModelEval>),
    Unsat,
    /// Timeout or inconclusive. The caller keeps the query `Undefined` and
    /// the owning state live.
    Undefined,
}

/// The oracle contract this core consumes. `timeout_ms == 0` disables the
/// timeout.
pub trait SolverOracle {
    fn check_sat(&mut self, query: &Query, timeout_ms: u64) -> CheckSat;
}
