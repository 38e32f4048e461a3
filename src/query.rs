//! Path-condition accumulator.
//!
//! A query is the running conjunction of branch facts along one symbolic
//! path: an ordered, duplicate-free hard set, a best-effort soft set, and
//! solver assumptions. Every hard fact is pushed through the simplifier on
//! admission and checked against the per-variable range state, so the hard
//! set never holds a fact that is provably redundant — and a locally provable
//! contradiction flips the status to `Unsat` without consulting the solver.
//!
//! Queries fork copy-on-write at branch points: `with` never mutates the
//! receiver.

use crate::expr::{Expr, Node, Sort};
use crate::simplify::bounds::{as_bound, merge_bound, BoundEntry, BoundMerge};
use crate::simplify::{Simplified, Simplifier};
use crate::solver::{CheckSat, ModelEval};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Solver status of a query. The accumulator only ever proves `Unsat` on its
/// own; `Sat` is assigned exclusively from an external solver verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryStatus {
    #[default]
    Undefined,
    Unsat,
    Sat,
}

#[derive(Debug, Clone, Default)]
pub struct Query {
    hard: Vec<Expr>,
    hard_members: HashSet<Expr>,
    soft: Vec<Expr>,
    assumptions: Vec<Expr>,
    bounds: HashMap<Expr, BoundEntry>,
    status: QueryStatus,
    model: Option<Arc<dyn ModelEval>>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> QueryStatus {
        self.status
    }

    pub fn hard(&self) -> &[Expr] {
        &self.hard
    }

    pub fn soft(&self) -> &[Expr] {
        &self.soft
    }

    pub fn assumptions(&self) -> &[Expr] {
        &self.assumptions
    }

    pub fn model(&self) -> Option<&Arc<dyn ModelEval>> {
        self.model.as_ref()
    }

    /// Fork for a new branch. Plain clone today; named so call sites read as
    /// the copy-on-write boundary they are.
    pub fn fork(&self) -> Self {
        self.clone()
    }

    /// Return a new query extended with the given facts. Hard facts are
    /// simplified incrementally; if any conjunct reduces to `False` the
    /// result is `Unsat` with a hard set of exactly `{False}` and the
    /// remaining conjuncts are not processed.
    pub fn with(&self, hard: &[Expr], soft: &[Expr], assumptions: &[Expr]) -> Query {
        let mut next = self.fork();
        if next.status == QueryStatus::Unsat {
            return next;
        }
        // New facts invalidate a previously attached model.
        if !hard.is_empty() || !soft.is_empty() || !assumptions.is_empty() {
            next.model = None;
            if next.status == QueryStatus::Sat {
                next.status = QueryStatus::Undefined;
            }
        }

        let simplifier = Simplifier::new();
        for fact in hard {
            match simplifier.simplify(fact) {
                Simplified::True => continue,
                Simplified::False => {
                    next.mark_unsat();
                    return next;
                }
                Simplified::Fact(canonical) => {
                    if !next.admit_conjuncts(canonical) {
                        next.mark_unsat();
                        return next;
                    }
                }
            }
        }

        for fact in soft {
            match simplifier.simplify(fact) {
                // Soft facts are optimization hints: a trivially false one is
                // dropped, never propagated into the status.
                Simplified::True | Simplified::False => continue,
                Simplified::Fact(canonical) => {
                    if !next.soft.contains(&canonical) {
                        next.soft.push(canonical);
                    }
                }
            }
        }

        for fact in assumptions {
            match simplifier.simplify(fact) {
                Simplified::True => continue,
                Simplified::False | Simplified::Fact(_) => {
                    let canonical = simplifier.rewrite(fact);
                    if !next.assumptions.contains(&canonical) {
                        next.assumptions.push(canonical);
                    }
                }
            }
        }

        next
    }

    /// Attach the outcome of one solver invocation. `Undefined` (timeout or
    /// inconclusive) leaves the query schedulable and status untouched.
    pub fn with_solver_verdict(&self, verdict: CheckSat) -> Query {
        let mut next = self.fork();
        match verdict {
            CheckSat::Sat(model) => {
                next.status = QueryStatus::Sat;
                next.model = Some(model);
            }
            CheckSat::Unsat => {
                // Solver-proved: keep the hard set for diagnostics, unlike a
                // locally proved contradiction which collapses it to {False}.
                next.status = QueryStatus::Unsat;
                next.model = None;
            }
            CheckSat::Undefined => {}
        }
        next
    }

    fn mark_unsat(&mut self) {
        self.status = QueryStatus::Unsat;
        self.model = None;
        self.hard.clear();
        self.hard_members.clear();
        self.bounds.clear();
        self.hard.push(Expr::f());
        self.hard_members.insert(Expr::f());
    }

    /// Admit a canonical fact, splitting top-level conjunctions. Returns
    /// `false` on a locally provable contradiction.
    fn admit_conjuncts(&mut self, canonical: Expr) -> bool {
        match canonical.node() {
            Node::NaryAnd(conjuncts) => {
                for c in conjuncts.clone() {
                    if !self.admit_one(c) {
                        return false;
                    }
                }
                true
            }
            _ => self.admit_one(canonical),
        }
    }

    fn admit_one(&mut self, fact: Expr) -> bool {
        debug_assert_eq!(fact.sort(), Sort::Bool);
        if self.hard_members.contains(&fact) {
            return true;
        }

        if let Some(bound) = as_bound(&fact) {
            let width = match bound.key.sort() {
                Sort::Int(w) => w,
                _ => unreachable!("bound key is integer-sorted by construction"),
            };
            let entry = self
                .bounds
                .entry(bound.key.clone())
                .or_insert_with(|| BoundEntry::full(width));
            return match merge_bound(entry, &bound, &fact) {
                BoundMerge::Contradiction => false,
                BoundMerge::Redundant => true,
                BoundMerge::Collapsed { evict, equality } => {
                    self.evict(&evict);
                    self.push_fact(equality);
                    true
                }
                BoundMerge::Narrowed { evict } => {
                    self.evict(&evict);
                    self.push_fact(fact);
                    true
                }
            };
        }

        self.push_fact(fact);
        true
    }

    fn push_fact(&mut self, fact: Expr) {
        if self.hard_members.insert(fact.clone()) {
            self.hard.push(fact);
        }
    }

    fn evict(&mut self, facts: &[Expr]) {
        for f in facts {
            if self.hard_members.remove(f) {
                self.hard.retain(|kept| kept != f);
            }
        }
    }
}
