//! Path-condition accumulation as the executor sees it: facts go in, the
//! hard set stays minimal, contradictions prune without a solver call.

use symgen::expr::{ArithOp, Expr, IntWidth, Sort};
use symgen::query::{Query, QueryStatus};
use symgen::simplify::{Simplified, Simplifier};

fn a() -> Expr {
    Expr::var("a", Sort::Int(IntWidth::W32))
}

#[test]
fn test_signed_overflow_equality_normalizes_at_declared_width() {
    // x + 127 == -128 at 8 bits pins x to 1: the offset subtraction wraps
    // mod 256 instead of widening.
    let x = Expr::var("x", Sort::Int(IntWidth::W8));
    let fact = Expr::eq(
        Expr::add(x.clone(), Expr::int8(127)),
        Expr::int8(-128),
    );
    let q = Query::new().with(&[fact], &[], &[]);
    assert_eq!(q.hard(), &[Expr::eq(x, Expr::int8(1))]);
}

#[test]
fn test_bound_sequence_narrows_collapses_then_contradicts() {
    let q = Query::new().with(&[Expr::lt(a(), Expr::int32(10))], &[], &[]);

    // Weaker bound: no change.
    let q = q.with(&[Expr::lt(a(), Expr::int32(15))], &[], &[]);
    assert_eq!(q.hard(), &[Expr::lt(a(), Expr::int32(10))]);

    // Adjacent lower bound: collapse to equality.
    let q = q.with(&[Expr::ge(a(), Expr::int32(9))], &[], &[]);
    assert_eq!(q.hard(), &[Expr::eq(a(), Expr::int32(9))]);
    assert_eq!(q.status(), QueryStatus::Undefined);

    // Anything outside the pinned value is locally unsatisfiable.
    let q = q.with(&[Expr::gt(a(), Expr::int32(9))], &[], &[]);
    assert_eq!(q.status(), QueryStatus::Unsat);
    assert_eq!(q.hard(), &[Expr::f()]);
}

#[test]
fn test_extreme_bounds_prune_without_solver() {
    let min = Expr::int32(i32::MIN as i64);
    let q = Query::new().with(&[Expr::lt(a(), min)], &[], &[]);
    assert_eq!(q.status(), QueryStatus::Unsat);

    let max = Expr::int32(i32::MAX as i64);
    let q = Query::new().with(&[Expr::gt(a(), max)], &[], &[]);
    assert_eq!(q.status(), QueryStatus::Unsat);
}

#[test]
fn test_unsat_query_ignores_later_facts() {
    let q = Query::new()
        .with(&[Expr::f()], &[], &[])
        .with(&[Expr::lt(a(), Expr::int32(3))], &[], &[]);
    assert_eq!(q.status(), QueryStatus::Unsat);
    assert_eq!(q.hard(), &[Expr::f()]);
}

#[test]
fn test_array_alias_ambiguity_survives_accumulation() {
    // A store chain with a symbolic index ahead of the read must reach the
    // hard set intact: one opaque fact, nothing eliminated.
    let arr = Expr::var(
        "xs",
        Sort::array(Sort::Int(IntWidth::W32), Sort::Int(IntWidth::W32)),
    );
    let i = Expr::var("i", Sort::Int(IntWidth::W32));
    let chain = Expr::store(
        arr,
        vec![
            (i, Expr::int32(1)),
            (Expr::int32(4), Expr::int32(2)),
        ],
    );
    let fact = Expr::eq(Expr::select(chain.clone(), Expr::int32(7)), Expr::int32(0));
    let q = Query::new().with(&[fact], &[], &[]);
    assert_eq!(q.hard().len(), 1);
    assert_eq!(
        q.hard()[0],
        Expr::eq(Expr::select(chain, Expr::int32(7)), Expr::int32(0))
    );

    // Contrast: concrete-only chains do simplify away.
    let arr2 = Expr::var(
        "ys",
        Sort::array(Sort::Int(IntWidth::W32), Sort::Int(IntWidth::W32)),
    );
    let concrete = Expr::store(
        arr2,
        vec![
            (Expr::int32(1), Expr::int32(10)),
            (Expr::int32(7), Expr::int32(0)),
        ],
    );
    let fact = Expr::eq(Expr::select(concrete, Expr::int32(7)), Expr::int32(0));
    let q = Query::new().with(&[fact], &[], &[]);
    assert!(q.hard().is_empty(), "0 == 0 contributes nothing");
}

#[test]
fn test_second_simplification_pass_is_identity() {
    let s = Simplifier::new();
    let shapes = vec![
        Expr::eq(
            Expr::arith(ArithOp::Shl, a(), Expr::int32(37)),
            Expr::int32(0),
        ),
        Expr::not(Expr::or(vec![
            Expr::bool_var("p"),
            Expr::lt(a(), Expr::int32(0)),
        ])),
        Expr::eq(
            Expr::arith(ArithOp::Xor, a(), Expr::int32(0xff)),
            Expr::int32(0x0f),
        ),
        Expr::and(vec![
            Expr::bool_var("p"),
            Expr::t(),
            Expr::le(a(), Expr::int32(100)),
        ]),
    ];
    for e in shapes {
        match s.simplify(&e) {
            Simplified::Fact(once) => {
                assert_eq!(s.rewrite(&once), once, "not a fixed point: {e:?}");
            }
            // Constants are trivially fixed points.
            Simplified::True | Simplified::False => {}
        }
    }
}
