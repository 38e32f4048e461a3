//! Expression rewriting to canonical, reduced form.
//!
//! The rewriter is a single bottom-up pass: children first, then at most one
//! rule application per node, chaining through recursive re-simplification of
//! the strictly smaller sub-results a rule builds. No rule re-scans the tree,
//! so a pass terminates; a second pass over its own output changes nothing.
//!
//! Outcome classification: a definite `True` (contributes nothing to a path
//! condition), a definite `False` (the path condition is locally UNSAT), or a
//! normalized fact for the solver. Anything with no applicable rule flows
//! through unchanged as an opaque fact.

pub mod arith;
pub mod arrays;
pub mod bounds;

use crate::config::EngineConfig;
use crate::expr::{Expr, Node, ScalarValue, Sort};
use crate::solver::ModelEval;
use tracing::warn;

/// Result of simplifying one boolean fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Simplified {
    True,
    False,
    /// Canonical (possibly unchanged) fact to keep for the solver.
    Fact(Expr),
}

pub struct Simplifier<'m> {
    model: Option<&'m dyn ModelEval>,
    max_depth: usize,
}

impl Default for Simplifier<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'m> Simplifier<'m> {
    pub fn new() -> Self {
        Self {
            model: None,
            max_depth: EngineConfig::default().max_simplify_depth,
        }
    }

    pub fn with_config(cfg: &EngineConfig) -> Self {
        Self {
            model: None,
            max_depth: cfg.max_simplify_depth,
        }
    }

    /// Model-directed simplifier for result extraction. `Ite` conditions that
    /// evaluate concretely under `model` collapse to the selected branch —
    /// a closed-world rewrite valid only for concretized output, never for
    /// query construction.
    pub fn with_model(model: &'m dyn ModelEval) -> Self {
        Self {
            model: Some(model),
            max_depth: EngineConfig::default().max_simplify_depth,
        }
    }

    /// Classify a boolean fact after rewriting.
    pub fn simplify(&self, expr: &Expr) -> Simplified {
        assert_eq!(expr.sort(), Sort::Bool, "path facts must be boolean");
        let canonical = self.rewrite(expr);
        match canonical.as_bool_const() {
            Some(true) => Simplified::True,
            Some(false) => Simplified::False,
            None => Simplified::Fact(canonical),
        }
    }

    /// Rewrite any expression to canonical form.
    pub fn rewrite(&self, expr: &Expr) -> Expr {
        self.rw(expr, 0)
    }

    fn rw(&self, expr: &Expr, depth: usize) -> Expr {
        if depth >= self.max_depth {
            // Pathological nesting: bail to opaque rather than recurse on.
            warn!(depth, "simplifier depth limit hit; leaving subtree opaque");
            return expr.clone();
        }
        let d = depth + 1;
        match expr.node() {
            Node::True
            | Node::False
            | Node::BoolVar(_)
            | Node::IntConst(_)
            | Node::FloatConst(_)
            | Node::Var { .. } => expr.clone(),

            Node::Not(e) => self.fold_not(self.rw(e, d)),

            Node::Neg(e) => arith::fold_neg(self.rw(e, d)),

            Node::Cast { target, operand } => fold_cast(target, self.rw(operand, d)),

            Node::Arith { op, lhs, rhs } => {
                arith::fold_arith(*op, self.rw(lhs, d), self.rw(rhs, d))
            }

            Node::Rel { op, lhs, rhs } => arith::fold_rel(*op, self.rw(lhs, d), self.rw(rhs, d)),

            Node::NaryAnd(ops) => {
                let rewritten: Vec<Expr> = ops.iter().map(|e| self.rw(e, d)).collect();
                fold_and(rewritten)
            }

            Node::NaryOr(ops) => {
                let rewritten: Vec<Expr> = ops.iter().map(|e| self.rw(e, d)).collect();
                fold_or(rewritten)
            }

            Node::Ite {
                cond,
                then_e,
                else_e,
            } => {
                let rc = self.rw(cond, d);
                if let Some(b) = rc.as_bool_const() {
                    let chosen = if b { then_e } else { else_e };
                    return self.rw(chosen, d);
                }
                if let Some(model) = self.model {
                    if let Some(ScalarValue::Bool(b)) = model.eval(&rc) {
                        // Concretized extraction: recurse into the selected
                        // branch only.
                        let chosen = if b { then_e } else { else_e };
                        return self.rw(chosen, d);
                    }
                }
                let rt = self.rw(then_e, d);
                let re = self.rw(else_e, d);
                if rt == re {
                    // Identical branches denote identical values whatever the
                    // condition is, NaN included.
                    return rt;
                }
                match (rt.as_bool_const(), re.as_bool_const()) {
                    (Some(true), Some(false)) => rc,
                    (Some(false), Some(true)) => self.fold_not(rc),
                    _ => Expr::ite(rc, rt, re),
                }
            }

            Node::Select { array, index } => {
                arrays::fold_select(self.rw(array, d), self.rw(index, d))
            }

            Node::Store { array, updates } => {
                let ra = self.rw(array, d);
                let ru: Vec<(Expr, Expr)> = updates
                    .iter()
                    .map(|(i, v)| (self.rw(i, d), self.rw(v, d)))
                    .collect();
                Expr::store(ra, ru)
            }

            Node::ConstArray { sort, element } => {
                let re = self.rw(element, d);
                match sort {
                    Sort::Array(idx, _) => Expr::const_array((**idx).clone(), re),
                    _ => unreachable!("ConstArray with non-array sort"),
                }
            }
        }
    }

    fn fold_not(&self, operand: Expr) -> Expr {
        match operand.node() {
            // De Morgan: push the negation through and re-fold each side.
            Node::NaryAnd(ops) => {
                let negated: Vec<Expr> = ops.iter().cloned().map(arith::negate_bool).collect();
                fold_or(negated)
            }
            Node::NaryOr(ops) => {
                let negated: Vec<Expr> = ops.iter().cloned().map(arith::negate_bool).collect();
                fold_and(negated)
            }
            _ => arith::negate_bool(operand),
        }
    }
}

/// Concretize an expression under a solver model for result extraction:
/// model-directed rewrite, then read the constant off the root. Falls back to
/// asking the model directly for anything the rewrite left symbolic.
pub fn concretize(expr: &Expr, model: &dyn ModelEval) -> Option<ScalarValue> {
    let rewritten = Simplifier::with_model(model).rewrite(expr);
    match rewritten.node() {
        Node::True => Some(ScalarValue::Bool(true)),
        Node::False => Some(ScalarValue::Bool(false)),
        Node::IntConst(v) => Some(ScalarValue::Int(*v)),
        Node::FloatConst(v) => Some(ScalarValue::Float(*v)),
        _ => model.eval(&rewritten),
    }
}

/// Conjunction folding over canonical operands: drop `True`, short-circuit on
/// `False`, dedupe preserving first-occurrence order, unwrap singletons.
pub fn fold_and(operands: Vec<Expr>) -> Expr {
    let mut kept: Vec<Expr> = Vec::with_capacity(operands.len());
    for e in flatten(operands, true) {
        match e.as_bool_const() {
            Some(true) => continue,
            Some(false) => return Expr::f(),
            None => {
                if !kept.contains(&e) {
                    kept.push(e);
                }
            }
        }
    }
    match kept.len() {
        0 => Expr::t(),
        1 => kept.pop().expect("len checked"),
        _ => Expr::and(kept),
    }
}

/// Disjunction folding, dual to `fold_and`.
pub fn fold_or(operands: Vec<Expr>) -> Expr {
    let mut kept: Vec<Expr> = Vec::with_capacity(operands.len());
    for e in flatten(operands, false) {
        match e.as_bool_const() {
            Some(false) => continue,
            Some(true) => return Expr::t(),
            None => {
                if !kept.contains(&e) {
                    kept.push(e);
                }
            }
        }
    }
    match kept.len() {
        0 => Expr::f(),
        1 => kept.pop().expect("len checked"),
        _ => Expr::or(kept),
    }
}

fn flatten(operands: Vec<Expr>, conjunction: bool) -> Vec<Expr> {
    let mut out = Vec::with_capacity(operands.len());
    for e in operands {
        match (conjunction, e.node()) {
            (true, Node::NaryAnd(inner)) | (false, Node::NaryOr(inner)) => {
                out.extend(inner.iter().cloned())
            }
            _ => out.push(e),
        }
    }
    out
}

fn fold_cast(target: &Sort, operand: Expr) -> Expr {
    if operand.sort() == *target {
        return operand;
    }
    match (target, operand.as_int_const(), operand.as_float_const()) {
        (Sort::Int(w), Some(v), _) => Expr::int(v.cast(*w)),
        (Sort::Float(crate::expr::FloatWidth::F64), _, Some(f)) => {
            Expr::float(crate::expr::FloatValue::from_f64(f.as_f64()))
        }
        (Sort::Float(crate::expr::FloatWidth::F32), _, Some(f)) => {
            Expr::float(crate::expr::FloatValue::from_f32(f.as_f64() as f32))
        }
        (Sort::Float(crate::expr::FloatWidth::F64), Some(v), _) => {
            Expr::float(crate::expr::FloatValue::from_f64(v.value() as f64))
        }
        (Sort::Float(crate::expr::FloatWidth::F32), Some(v), _) => {
            Expr::float(crate::expr::FloatValue::from_f32(v.value() as f32))
        }
        // Float-to-int narrowing has saturating host semantics that are easy
        // to get wrong against the solver; leave it opaque.
        _ => Expr::cast(target.clone(), operand),
    }
}
