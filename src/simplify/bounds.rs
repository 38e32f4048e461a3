//! Range deduction over integer facts.
//!
//! The path-condition accumulator keeps, per left-hand side, the inclusive
//! interval implied by the relational facts admitted so far. A new bound
//! either contradicts the interval (local UNSAT), is subsumed by it
//! (dropped), collapses it to a single value (the bounds are replaced by one
//! equality), or tightens one side.

use crate::expr::{Expr, IntValue, IntWidth, Node, RelOp, Sort};

/// Inclusive signed interval at a fixed width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntInterval {
    width: IntWidth,
    lo: i64,
    hi: i64,
}

impl IntInterval {
    pub fn full(width: IntWidth) -> Self {
        Self {
            width,
            lo: width.min_value(),
            hi: width.max_value(),
        }
    }

    pub fn lo(&self) -> i64 {
        self.lo
    }

    pub fn hi(&self) -> i64 {
        self.hi
    }

    /// Interval admitted by `lhs <op> k`. `None` for `Ne`, which carves a
    /// hole rather than bounding a side.
    pub fn from_rel(op: RelOp, k: IntValue) -> Option<Self> {
        let width = k.width();
        let (min, max) = (width.min_value(), width.max_value());
        let v = k.value();
        let (lo, hi) = match op {
            RelOp::Eq => (v, v),
            RelOp::Lt => {
                if v == min {
                    // Lt(a, MIN) admits nothing.
                    return Some(Self {
                        width,
                        lo: 1,
                        hi: 0,
                    });
                }
                (min, v - 1)
            }
            RelOp::Le => (min, v),
            RelOp::Gt => {
                if v == max {
                    return Some(Self {
                        width,
                        lo: 1,
                        hi: 0,
                    });
                }
                (v + 1, max)
            }
            RelOp::Ge => (v, max),
            RelOp::Ne => return None,
        };
        Some(Self { width, lo, hi })
    }

    pub fn is_empty(&self) -> bool {
        self.lo > self.hi
    }

    pub fn is_singleton(&self) -> bool {
        self.lo == self.hi
    }

    pub fn singleton_value(&self) -> Option<IntValue> {
        if self.is_singleton() {
            Some(IntValue::new(self.width, self.lo))
        } else {
            None
        }
    }

    pub fn contains(&self, v: i64) -> bool {
        self.lo <= v && v <= self.hi
    }

    pub fn intersect(&self, other: &IntInterval) -> IntInterval {
        debug_assert_eq!(self.width, other.width);
        IntInterval {
            width: self.width,
            lo: self.lo.max(other.lo),
            hi: self.hi.min(other.hi),
        }
    }
}

/// A canonical relational fact recognized as a bound: `key <op> literal`
/// with an integer-sorted, non-constant left side.
#[derive(Debug, Clone)]
pub struct BoundFact {
    pub key: Expr,
    pub op: RelOp,
    pub literal: IntValue,
}

/// Recognize a canonical fact as a bound candidate. The rewriter has already
/// mirrored constants to the right, so only the `Rel(non-const, const)` shape
/// needs handling here.
pub fn as_bound(fact: &Expr) -> Option<BoundFact> {
    if let Node::Rel { op, lhs, rhs } = fact.node() {
        if !matches!(lhs.sort(), Sort::Int(_)) || lhs.is_const() {
            return None;
        }
        if let Some(literal) = rhs.as_int_const() {
            return Some(BoundFact {
                key: lhs.clone(),
                op: *op,
                literal,
            });
        }
    }
    None
}

/// Per-key bound state: the current interval plus the facts that currently
/// justify each side (so a superseded fact can be evicted from the hard set).
#[derive(Debug, Clone)]
pub struct BoundEntry {
    pub interval: IntInterval,
    pub lo_fact: Option<Expr>,
    pub hi_fact: Option<Expr>,
}

impl BoundEntry {
    pub fn full(width: IntWidth) -> Self {
        Self {
            interval: IntInterval::full(width),
            lo_fact: None,
            hi_fact: None,
        }
    }
}

/// Outcome of merging one new bound into an entry.
#[derive(Debug)]
pub enum BoundMerge {
    /// The interval became empty: the accumulated facts contradict.
    Contradiction,
    /// The new fact is implied by the current interval; nothing changes.
    Redundant,
    /// The interval collapsed to a single value. `evict` lists facts to
    /// remove from the hard set; the equality replaces them.
    Collapsed { evict: Vec<Expr>, equality: Expr },
    /// One or both sides tightened. `evict` lists superseded facts.
    Narrowed { evict: Vec<Expr> },
}

/// Merge `fact` (recognized as `bound`) into `entry`, updating it in place.
pub fn merge_bound(entry: &mut BoundEntry, bound: &BoundFact, fact: &Expr) -> BoundMerge {
    let candidate = match IntInterval::from_rel(bound.op, bound.literal) {
        Some(iv) => iv,
        None => {
            // Ne: only decisive against a singleton or an excluded literal.
            if let Some(v) = entry.interval.singleton_value() {
                if v == bound.literal {
                    return BoundMerge::Contradiction;
                }
            }
            if !entry.interval.contains(bound.literal.value()) {
                return BoundMerge::Redundant;
            }
            return BoundMerge::Narrowed { evict: Vec::new() };
        }
    };

    let merged = entry.interval.intersect(&candidate);
    if merged.is_empty() {
        return BoundMerge::Contradiction;
    }
    if merged == entry.interval {
        return BoundMerge::Redundant;
    }

    let mut evict = Vec::new();
    let lo_tightened = merged.lo() > entry.interval.lo();
    let hi_tightened = merged.hi() < entry.interval.hi();
    entry.interval = merged;

    if let Some(v) = merged.singleton_value() {
        if let Some(old) = entry.lo_fact.take() {
            evict.push(old);
        }
        if let Some(old) = entry.hi_fact.take() {
            evict.push(old);
        }
        let equality = Expr::eq(bound.key.clone(), Expr::int(v));
        entry.lo_fact = Some(equality.clone());
        entry.hi_fact = Some(equality.clone());
        return BoundMerge::Collapsed { evict, equality };
    }

    if lo_tightened {
        if let Some(old) = entry.lo_fact.replace(fact.clone()) {
            evict.push(old);
        }
    }
    if hi_tightened {
        if let Some(old) = entry.hi_fact.replace(fact.clone()) {
            evict.push(old);
        }
    }
    BoundMerge::Narrowed { evict }
}
