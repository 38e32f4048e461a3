//! Immutable symbolic expression trees.
//!
//! Expressions are built bottom-up by the executor and consumed read-only by
//! the simplifier and distance machinery; nodes are `Arc`-shared so forked
//! states alias common sub-trees instead of copying them. Every node carries
//! a fixed sort; constructors assert operand compatibility — an ill-sorted
//! expression is a programming fault, not a recoverable condition.

pub mod value;

pub use value::{FloatValue, FloatWidth, IntValue, IntWidth, ScalarValue};

use std::fmt;
use std::sync::Arc;

/// Sort of an expression node: bit-width + signedness (all integer sorts are
/// signed two's-complement), float width, boolean, or array-of-sort.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Sort {
    Bool,
    Int(IntWidth),
    Float(FloatWidth),
    Array(Box<Sort>, Box<Sort>),
}

impl Sort {
    pub fn is_int(&self) -> bool {
        matches!(self, Sort::Int(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Sort::Int(_) | Sort::Float(_))
    }

    pub fn array(index: Sort, element: Sort) -> Sort {
        Sort::Array(Box::new(index), Box::new(element))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Ushr,
    Cmp,
    Cmpg,
    Cmpl,
}

impl ArithOp {
    /// Cmp/Cmpg/Cmpl produce a W32 ordering value; everything else keeps the
    /// operand sort.
    fn result_sort(self, operand: &Sort) -> Sort {
        match self {
            ArithOp::Cmp | ArithOp::Cmpg | ArithOp::Cmpl => Sort::Int(IntWidth::W32),
            _ => operand.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl RelOp {
    /// Logical negation of the relation. Exact for integer and boolean
    /// operands; callers must not use it for float operands other than
    /// Eq/Ne (NaN breaks the duality for the orderings).
    pub fn negate(self) -> RelOp {
        match self {
            RelOp::Eq => RelOp::Ne,
            RelOp::Ne => RelOp::Eq,
            RelOp::Lt => RelOp::Ge,
            RelOp::Le => RelOp::Gt,
            RelOp::Gt => RelOp::Le,
            RelOp::Ge => RelOp::Lt,
        }
    }

    /// Mirror of the relation with swapped operands (`a < b` == `b > a`).
    pub fn flip(self) -> RelOp {
        match self {
            RelOp::Eq => RelOp::Eq,
            RelOp::Ne => RelOp::Ne,
            RelOp::Lt => RelOp::Gt,
            RelOp::Le => RelOp::Ge,
            RelOp::Gt => RelOp::Lt,
            RelOp::Ge => RelOp::Le,
        }
    }
}

/// One node of the expression tree. Closed sum type: every consumer pattern
/// matches exhaustively, so adding a variant breaks every visitor at compile
/// time instead of falling through an overridable default.
#[derive(Debug, PartialEq, Eq, Hash)]
pub enum Node {
    True,
    False,
    BoolVar(Arc<str>),
    IntConst(IntValue),
    FloatConst(FloatValue),
    Var { name: Arc<str>, sort: Sort },
    Not(Expr),
    Neg(Expr),
    Cast { target: Sort, operand: Expr },
    Arith { op: ArithOp, lhs: Expr, rhs: Expr },
    Rel { op: RelOp, lhs: Expr, rhs: Expr },
    NaryAnd(Vec<Expr>),
    NaryOr(Vec<Expr>),
    Ite { cond: Expr, then_e: Expr, else_e: Expr },
    Select { array: Expr, index: Expr },
    Store { array: Expr, updates: Vec<(Expr, Expr)> },
    ConstArray { sort: Sort, element: Expr },
}

/// Shared handle to an immutable expression node.
#[derive(Clone)]
pub struct Expr(Arc<Node>);

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for Expr {}

impl std::hash::Hash for Expr {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Expr {
    fn wrap(node: Node) -> Expr {
        Expr(Arc::new(node))
    }

    pub fn node(&self) -> &Node {
        &self.0
    }

    // -- leaf constructors --

    pub fn t() -> Expr {
        Expr::wrap(Node::True)
    }

    pub fn f() -> Expr {
        Expr::wrap(Node::False)
    }

    pub fn bool_const(v: bool) -> Expr {
        if v {
            Expr::t()
        } else {
            Expr::f()
        }
    }

    pub fn bool_var(name: impl Into<Arc<str>>) -> Expr {
        Expr::wrap(Node::BoolVar(name.into()))
    }

    pub fn int(v: IntValue) -> Expr {
        Expr::wrap(Node::IntConst(v))
    }

    pub fn int8(v: i64) -> Expr {
        Expr::int(IntValue::new(IntWidth::W8, v))
    }

    pub fn int32(v: i64) -> Expr {
        Expr::int(IntValue::new(IntWidth::W32, v))
    }

    pub fn int64(v: i64) -> Expr {
        Expr::int(IntValue::new(IntWidth::W64, v))
    }

    pub fn float(v: FloatValue) -> Expr {
        Expr::wrap(Node::FloatConst(v))
    }

    pub fn var(name: impl Into<Arc<str>>, sort: Sort) -> Expr {
        assert!(
            sort.is_numeric() || matches!(sort, Sort::Array(_, _)),
            "numeric/array variable built with sort {sort:?}; use bool_var for booleans"
        );
        Expr::wrap(Node::Var {
            name: name.into(),
            sort,
        })
    }

    // -- compound constructors (sort-checked) --

    pub fn not(e: Expr) -> Expr {
        assert_eq!(e.sort(), Sort::Bool, "Not over non-boolean operand");
        Expr::wrap(Node::Not(e))
    }

    pub fn neg(e: Expr) -> Expr {
        assert!(e.sort().is_numeric(), "Neg over non-numeric operand");
        Expr::wrap(Node::Neg(e))
    }

    pub fn cast(target: Sort, operand: Expr) -> Expr {
        assert!(
            target.is_numeric() && operand.sort().is_numeric(),
            "Cast between non-numeric sorts"
        );
        Expr::wrap(Node::Cast { target, operand })
    }

    pub fn arith(op: ArithOp, lhs: Expr, rhs: Expr) -> Expr {
        match op {
            ArithOp::Shl | ArithOp::Shr | ArithOp::Ushr => {
                // Shift amount sort may differ from the value sort; both must
                // be integers. The amount reduces modulo the value width.
                assert!(
                    lhs.sort().is_int() && rhs.sort().is_int(),
                    "shift over non-integer operands"
                );
            }
            ArithOp::And | ArithOp::Or | ArithOp::Xor => {
                assert!(
                    lhs.sort().is_int() && lhs.sort() == rhs.sort(),
                    "bitwise op over mismatched sorts {:?} / {:?}",
                    lhs.sort(),
                    rhs.sort()
                );
            }
            _ => {
                assert!(
                    lhs.sort().is_numeric() && lhs.sort() == rhs.sort(),
                    "arithmetic op over mismatched sorts {:?} / {:?}",
                    lhs.sort(),
                    rhs.sort()
                );
            }
        }
        Expr::wrap(Node::Arith { op, lhs, rhs })
    }

    pub fn add(lhs: Expr, rhs: Expr) -> Expr {
        Expr::arith(ArithOp::Add, lhs, rhs)
    }

    pub fn sub(lhs: Expr, rhs: Expr) -> Expr {
        Expr::arith(ArithOp::Sub, lhs, rhs)
    }

    pub fn mul(lhs: Expr, rhs: Expr) -> Expr {
        Expr::arith(ArithOp::Mul, lhs, rhs)
    }

    pub fn rel(op: RelOp, lhs: Expr, rhs: Expr) -> Expr {
        assert_eq!(
            lhs.sort(),
            rhs.sort(),
            "relational op over mismatched sorts"
        );
        Expr::wrap(Node::Rel { op, lhs, rhs })
    }

    pub fn eq(lhs: Expr, rhs: Expr) -> Expr {
        Expr::rel(RelOp::Eq, lhs, rhs)
    }

    pub fn lt(lhs: Expr, rhs: Expr) -> Expr {
        Expr::rel(RelOp::Lt, lhs, rhs)
    }

    pub fn le(lhs: Expr, rhs: Expr) -> Expr {
        Expr::rel(RelOp::Le, lhs, rhs)
    }

    pub fn gt(lhs: Expr, rhs: Expr) -> Expr {
        Expr::rel(RelOp::Gt, lhs, rhs)
    }

    pub fn ge(lhs: Expr, rhs: Expr) -> Expr {
        Expr::rel(RelOp::Ge, lhs, rhs)
    }

    /// Flattened n-ary conjunction. Order-irrelevant for semantics, order-
    /// preserving for reproducibility.
    pub fn and(operands: Vec<Expr>) -> Expr {
        let mut flat = Vec::with_capacity(operands.len());
        for e in operands {
            assert_eq!(e.sort(), Sort::Bool, "And over non-boolean operand");
            match e.node() {
                Node::NaryAnd(inner) => flat.extend(inner.iter().cloned()),
                _ => flat.push(e),
            }
        }
        Expr::wrap(Node::NaryAnd(flat))
    }

    /// Flattened n-ary disjunction.
    pub fn or(operands: Vec<Expr>) -> Expr {
        let mut flat = Vec::with_capacity(operands.len());
        for e in operands {
            assert_eq!(e.sort(), Sort::Bool, "Or over non-boolean operand");
            match e.node() {
                Node::NaryOr(inner) => flat.extend(inner.iter().cloned()),
                _ => flat.push(e),
            }
        }
        Expr::wrap(Node::NaryOr(flat))
    }

    pub fn ite(cond: Expr, then_e: Expr, else_e: Expr) -> Expr {
        assert_eq!(cond.sort(), Sort::Bool, "Ite condition must be boolean");
        assert_eq!(
            then_e.sort(),
            else_e.sort(),
            "Ite branches with mismatched sorts"
        );
        Expr::wrap(Node::Ite {
            cond,
            then_e,
            else_e,
        })
    }

    pub fn select(array: Expr, index: Expr) -> Expr {
        match array.sort() {
            Sort::Array(idx, _) => {
                assert_eq!(*idx, index.sort(), "Select index sort mismatch")
            }
            other => panic!("Select over non-array sort {other:?}"),
        }
        Expr::wrap(Node::Select { array, index })
    }

    /// Multi-entry store chain. Nested stores flatten so that `updates` is
    /// ordered oldest-first and the receiver is never itself a `Store`.
    pub fn store(array: Expr, updates: Vec<(Expr, Expr)>) -> Expr {
        let (index_sort, elem_sort) = match array.sort() {
            Sort::Array(i, e) => (*i, *e),
            other => panic!("Store over non-array sort {other:?}"),
        };
        for (idx, val) in &updates {
            assert_eq!(idx.sort(), index_sort, "Store index sort mismatch");
            assert_eq!(val.sort(), elem_sort, "Store value sort mismatch");
        }
        match array.node() {
            Node::Store {
                array: base,
                updates: prior,
            } => {
                let mut all = prior.clone();
                all.extend(updates);
                Expr::wrap(Node::Store {
                    array: base.clone(),
                    updates: all,
                })
            }
            _ => Expr::wrap(Node::Store { array, updates }),
        }
    }

    pub fn const_array(index_sort: Sort, element: Expr) -> Expr {
        let sort = Sort::array(index_sort, element.sort());
        Expr::wrap(Node::ConstArray { sort, element })
    }

    // -- inspectors --

    pub fn sort(&self) -> Sort {
        match self.node() {
            Node::True | Node::False | Node::BoolVar(_) => Sort::Bool,
            Node::IntConst(v) => Sort::Int(v.width()),
            Node::FloatConst(v) => Sort::Float(v.width()),
            Node::Var { sort, .. } => sort.clone(),
            Node::Not(_) => Sort::Bool,
            Node::Neg(e) => e.sort(),
            Node::Cast { target, .. } => target.clone(),
            Node::Arith { op, lhs, .. } => op.result_sort(&lhs.sort()),
            Node::Rel { .. } => Sort::Bool,
            Node::NaryAnd(_) | Node::NaryOr(_) => Sort::Bool,
            Node::Ite { then_e, .. } => then_e.sort(),
            Node::Select { array, .. } => match array.sort() {
                Sort::Array(_, elem) => *elem,
                _ => unreachable!("Select constructed over non-array"),
            },
            Node::Store { array, .. } => array.sort(),
            Node::ConstArray { sort, .. } => sort.clone(),
        }
    }

    pub fn as_int_const(&self) -> Option<IntValue> {
        match self.node() {
            Node::IntConst(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float_const(&self) -> Option<FloatValue> {
        match self.node() {
            Node::FloatConst(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool_const(&self) -> Option<bool> {
        match self.node() {
            Node::True => Some(true),
            Node::False => Some(false),
            _ => None,
        }
    }

    pub fn is_const(&self) -> bool {
        matches!(
            self.node(),
            Node::True | Node::False | Node::IntConst(_) | Node::FloatConst(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality_across_separate_builds() {
        let a = Expr::add(Expr::var("x", Sort::Int(IntWidth::W32)), Expr::int32(1));
        let b = Expr::add(Expr::var("x", Sort::Int(IntWidth::W32)), Expr::int32(1));
        assert_eq!(a, b);
    }

    #[test]
    fn test_nested_and_flattens() {
        let x = Expr::bool_var("x");
        let y = Expr::bool_var("y");
        let z = Expr::bool_var("z");
        let inner = Expr::and(vec![x.clone(), y.clone()]);
        let outer = Expr::and(vec![inner, z.clone()]);
        match outer.node() {
            Node::NaryAnd(ops) => assert_eq!(ops, &[x, y, z]),
            other => panic!("expected NaryAnd, got {other:?}"),
        }
    }

    #[test]
    fn test_store_chain_flattens_oldest_first() {
        let arr = Expr::var(
            "a",
            Sort::array(Sort::Int(IntWidth::W32), Sort::Int(IntWidth::W32)),
        );
        let s1 = Expr::store(arr.clone(), vec![(Expr::int32(0), Expr::int32(10))]);
        let s2 = Expr::store(s1, vec![(Expr::int32(1), Expr::int32(11))]);
        match s2.node() {
            Node::Store { array, updates } => {
                assert_eq!(array, &arr);
                assert_eq!(updates.len(), 2);
                assert_eq!(updates[0].0, Expr::int32(0));
                assert_eq!(updates[1].0, Expr::int32(1));
            }
            other => panic!("expected Store, got {other:?}"),
        }
    }

    #[test]
    #[should_panic(expected = "mismatched sorts")]
    fn test_sort_mismatch_is_a_construction_fault() {
        let _ = Expr::add(Expr::int32(1), Expr::int64(2));
    }

    #[test]
    fn test_cmp_result_sort_is_w32() {
        let a = Expr::int64(3);
        let b = Expr::int64(4);
        let cmp = Expr::arith(ArithOp::Cmp, a, b);
        assert_eq!(cmp.sort(), Sort::Int(IntWidth::W32));
    }
}
