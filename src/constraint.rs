//! Solver-normalized constraint facts.
//!
//! Constraints are the currency of the solver-callback boundary: a reduced,
//! closed vocabulary the oracle adapters understand, derived from canonical
//! expressions. Translation is total over the supported shapes and returns
//! `ResolveError::NotSupported` for the rest — callers then pass the original
//! expression to the solver as an opaque fact instead.

use crate::error::ResolveError;
use crate::expr::{Expr, FloatValue, IntValue, Node, RelOp};
use std::sync::Arc;

/// A term inside a constraint: a variable, a literal, or an access path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    BoolVar(Arc<str>),
    NumVar(Arc<str>),
    IntLiteral(IntValue),
    FloatLiteral(FloatValue),
    /// Field access path rooted at another term.
    Field { base: Box<Term>, name: Arc<str> },
    /// Array element access path.
    Element { base: Box<Term>, index: Box<Term> },
}

/// A normalized fact for the constraint-solving callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constraint {
    BoolConst(bool),
    BoolVar(Arc<str>),
    /// Primitive or reference equality.
    Equal(Term, Term),
    NotEqual(Term, Term),
    Rel { op: RelOp, lhs: Term, rhs: Term },
    Not(Box<Constraint>),
    And(Vec<Constraint>),
    Or(Vec<Constraint>),
    /// Reference-type fact: the term is an instance of the named type.
    IsInstance { term: Term, type_name: Arc<str> },
    /// Generic type-parameter equality between two reference terms.
    TypeParamEqual { lhs: Term, rhs: Term, index: usize },
}

/// Translate a canonical boolean expression into the constraint vocabulary.
///
/// `True` and `False` map to their own boolean constants — the two literals
/// are deliberately translated through separate, individually tested arms so
/// the polarity of `False` can never silently regress to `true`.
pub fn build_constraint(expr: &Expr) -> Result<Constraint, ResolveError> {
    match expr.node() {
        Node::True => Ok(Constraint::BoolConst(true)),
        Node::False => Ok(Constraint::BoolConst(false)),
        Node::BoolVar(name) => Ok(Constraint::BoolVar(name.clone())),
        Node::Not(inner) => Ok(Constraint::Not(Box::new(build_constraint(inner)?))),
        Node::NaryAnd(ops) => Ok(Constraint::And(
            ops.iter().map(build_constraint).collect::<Result<_, _>>()?,
        )),
        Node::NaryOr(ops) => Ok(Constraint::Or(
            ops.iter().map(build_constraint).collect::<Result<_, _>>()?,
        )),
        Node::Rel { op, lhs, rhs } => {
            let l = build_term(lhs)?;
            let r = build_term(rhs)?;
            Ok(match op {
                RelOp::Eq => Constraint::Equal(l, r),
                RelOp::Ne => Constraint::NotEqual(l, r),
                _ => Constraint::Rel {
                    op: *op,
                    lhs: l,
                    rhs: r,
                },
            })
        }
        _ => Err(ResolveError::NotSupported("boolean expression shape")),
    }
}

fn build_term(expr: &Expr) -> Result<Term, ResolveError> {
    match expr.node() {
        Node::BoolVar(name) => Ok(Term::BoolVar(name.clone())),
        Node::Var { name, .. } => Ok(Term::NumVar(name.clone())),
        Node::IntConst(v) => Ok(Term::IntLiteral(*v)),
        Node::FloatConst(v) => Ok(Term::FloatLiteral(*v)),
        Node::Select { array, index } => Ok(Term::Element {
            base: Box::new(build_term(array)?),
            index: Box::new(build_term(index)?),
        }),
        _ => Err(ResolveError::NotSupported("term shape")),
    }
}
