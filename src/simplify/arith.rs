//! Arithmetic and relational fold rules.
//!
//! Operands arriving here are already canonical (the rewriter recurses
//! bottom-up), so each rule applies at most once and chains by re-folding the
//! strictly smaller sub-result it built — never by re-scanning the tree.
//! Every constant computation goes through `expr::value` so folding obeys the
//! operand's declared bit-width wraparound, not host arbitrary precision.

use crate::expr::{ArithOp, Expr, IntValue, Node, RelOp, Sort};

/// Fold one binary arithmetic node over canonical operands.
pub fn fold_arith(op: ArithOp, lhs: Expr, rhs: Expr) -> Expr {
    if let Some(folded) = fold_const_arith(op, &lhs, &rhs) {
        return folded;
    }
    match op {
        ArithOp::Add => fold_add(lhs, rhs),
        ArithOp::Sub => fold_sub(lhs, rhs),
        ArithOp::Mul => fold_mul(lhs, rhs),
        ArithOp::Div => fold_div(lhs, rhs),
        ArithOp::Rem => fold_rem(lhs, rhs),
        ArithOp::And | ArithOp::Or | ArithOp::Xor => fold_bitwise(op, lhs, rhs),
        ArithOp::Shl | ArithOp::Shr | ArithOp::Ushr => fold_shift(op, lhs, rhs),
        ArithOp::Cmp => fold_cmp(lhs, rhs),
        // Float orderings (Cmpg/Cmpl) have no sound syntactic rules beyond
        // the constant fold above: x cmpg x is NaN-dependent.
        ArithOp::Cmpg | ArithOp::Cmpl => Expr::arith(op, lhs, rhs),
    }
}

/// Both-constant fold; `None` when either side is symbolic or the fold must
/// bail (zero divisor).
fn fold_const_arith(op: ArithOp, lhs: &Expr, rhs: &Expr) -> Option<Expr> {
    if let (Some(a), Some(b)) = (lhs.as_int_const(), rhs.as_int_const()) {
        let v = match op {
            ArithOp::Add => a.wrapping_add(b),
            ArithOp::Sub => a.wrapping_sub(b),
            ArithOp::Mul => a.wrapping_mul(b),
            ArithOp::Div => a.checked_div(b)?,
            ArithOp::Rem => a.checked_rem(b)?,
            ArithOp::And => a.bit_and(b),
            ArithOp::Or => a.bit_or(b),
            ArithOp::Xor => a.bit_xor(b),
            ArithOp::Shl => a.shl(b),
            ArithOp::Shr => a.shr(b),
            ArithOp::Ushr => a.ushr(b),
            ArithOp::Cmp => a.cmp_value(b),
            ArithOp::Cmpg | ArithOp::Cmpl => return None,
        };
        return Some(Expr::int(v));
    }
    if let (Some(a), Some(b)) = (lhs.as_float_const(), rhs.as_float_const()) {
        let v = match op {
            ArithOp::Add => a.add(b),
            ArithOp::Sub => a.sub(b),
            ArithOp::Mul => a.mul(b),
            ArithOp::Div => a.div(b),
            ArithOp::Rem => a.rem(b),
            ArithOp::Cmpg => return Some(Expr::int(a.cmpg(b))),
            ArithOp::Cmpl => return Some(Expr::int(a.cmpl(b))),
            _ => return None,
        };
        return Some(Expr::float(v));
    }
    None
}

fn is_int_zero(e: &Expr) -> bool {
    e.as_int_const().map(IntValue::is_zero).unwrap_or(false)
}

/// Split `Add(x, c)` / `Sub(x, c)` with a constant right operand.
fn as_offset(e: &Expr) -> Option<(ArithOp, Expr, IntValue)> {
    if let Node::Arith { op, lhs, rhs } = e.node() {
        if matches!(op, ArithOp::Add | ArithOp::Sub) {
            if let Some(c) = rhs.as_int_const() {
                return Some((*op, lhs.clone(), c));
            }
        }
    }
    None
}

fn fold_add(lhs: Expr, rhs: Expr) -> Expr {
    // Canonicalize the constant to the right: c + x -> x + c.
    if lhs.is_const() && !rhs.is_const() {
        return fold_add(rhs, lhs);
    }
    if is_int_zero(&rhs) {
        return lhs;
    }
    if let Some(c2) = rhs.as_int_const() {
        if let Some((inner_op, x, c1)) = as_offset(&lhs) {
            // (x+c1)+c2 -> x+(c1+c2); (x-c1)+c2 -> x+(c2-c1).
            let c = match inner_op {
                ArithOp::Add => c1.wrapping_add(c2),
                _ => c2.wrapping_sub(c1),
            };
            if c.is_zero() {
                return x;
            }
            return Expr::add(x, Expr::int(c));
        }
    }
    Expr::add(lhs, rhs)
}

fn fold_sub(lhs: Expr, rhs: Expr) -> Expr {
    if is_int_zero(&rhs) {
        return lhs;
    }
    if is_int_zero(&lhs) {
        return fold_neg(rhs);
    }
    if lhs == rhs && lhs.sort().is_int() {
        if let Sort::Int(w) = lhs.sort() {
            return Expr::int(IntValue::new(w, 0));
        }
    }
    if let Some(c2) = rhs.as_int_const() {
        if let Some((inner_op, x, c1)) = as_offset(&lhs) {
            // (x+c1)-c2 -> x+(c1-c2); (x-c1)-c2 -> x-(c1+c2).
            return match inner_op {
                ArithOp::Add => {
                    let c = c1.wrapping_sub(c2);
                    if c.is_zero() {
                        x
                    } else {
                        Expr::add(x, Expr::int(c))
                    }
                }
                _ => {
                    let c = c1.wrapping_add(c2);
                    if c.is_zero() {
                        x
                    } else {
                        Expr::sub(x, Expr::int(c))
                    }
                }
            };
        }
    }
    Expr::sub(lhs, rhs)
}

fn fold_mul(lhs: Expr, rhs: Expr) -> Expr {
    if lhs.is_const() && !rhs.is_const() {
        return fold_mul(rhs, lhs);
    }
    if let Some(c) = rhs.as_int_const() {
        if c.is_zero() {
            return Expr::int(c);
        }
        if c.is_one() {
            return lhs;
        }
        if c.is_minus_one() {
            return fold_neg(lhs);
        }
        if let Node::Arith {
            op: ArithOp::Mul,
            lhs: x,
            rhs: inner,
        } = lhs.node()
        {
            if let Some(c1) = inner.as_int_const() {
                // (x*c1)*c2 -> x*(c1*c2).
                return fold_mul(x.clone(), Expr::int(c1.wrapping_mul(c)));
            }
        }
        if let Some((inner_op, x, c1)) = as_offset(&lhs) {
            // (x+c1)*c2 -> x*c2 + c1*c2 (and the Sub analog).
            let scaled = fold_mul(x, Expr::int(c));
            let shifted = Expr::int(c1.wrapping_mul(c));
            return match inner_op {
                ArithOp::Add => fold_add(scaled, shifted),
                _ => fold_sub(scaled, shifted),
            };
        }
    }
    Expr::mul(lhs, rhs)
}

pub fn fold_neg(e: Expr) -> Expr {
    if let Some(v) = e.as_int_const() {
        return Expr::int(v.wrapping_neg());
    }
    if let Some(v) = e.as_float_const() {
        return Expr::float(v.neg());
    }
    if let Node::Neg(inner) = e.node() {
        return inner.clone();
    }
    Expr::neg(e)
}

fn fold_div(lhs: Expr, rhs: Expr) -> Expr {
    if let Some(c) = rhs.as_int_const() {
        if c.is_one() {
            return lhs;
        }
        if c.is_minus_one() {
            return fold_neg(lhs);
        }
        if !c.is_zero() && is_int_zero(&lhs) {
            return lhs;
        }
    }
    Expr::arith(ArithOp::Div, lhs, rhs)
}

fn fold_rem(lhs: Expr, rhs: Expr) -> Expr {
    if let Some(c) = rhs.as_int_const() {
        if (c.is_one() || c.is_minus_one()) && lhs.sort().is_int() {
            if let Sort::Int(w) = lhs.sort() {
                return Expr::int(IntValue::new(w, 0));
            }
        }
    }
    Expr::arith(ArithOp::Rem, lhs, rhs)
}

fn fold_bitwise(op: ArithOp, lhs: Expr, rhs: Expr) -> Expr {
    if lhs.is_const() && !rhs.is_const() {
        return fold_bitwise(op, rhs, lhs);
    }
    if let Some(c) = rhs.as_int_const() {
        if c.is_zero() {
            return match op {
                ArithOp::And => Expr::int(c),
                _ => lhs,
            };
        }
    }
    if lhs == rhs {
        return match op {
            ArithOp::And | ArithOp::Or => lhs,
            _ => {
                // x ^ x = 0.
                match lhs.sort() {
                    Sort::Int(w) => Expr::int(IntValue::new(w, 0)),
                    _ => unreachable!("bitwise over non-integer sort"),
                }
            }
        };
    }
    Expr::arith(op, lhs, rhs)
}

fn fold_shift(op: ArithOp, lhs: Expr, rhs: Expr) -> Expr {
    if let (Sort::Int(w), Some(amount)) = (lhs.sort(), rhs.as_int_const()) {
        let reduced = amount.shift_amount(w);
        if reduced == 0 {
            return lhs;
        }
        // Store the amount in canonical reduced form for its width.
        if reduced as i64 != amount.value() {
            return Expr::arith(
                op,
                lhs,
                Expr::int(IntValue::new(amount.width(), reduced as i64)),
            );
        }
    }
    Expr::arith(op, lhs, rhs)
}

fn fold_cmp(lhs: Expr, rhs: Expr) -> Expr {
    if lhs == rhs && lhs.sort().is_int() {
        return Expr::int32(0);
    }
    Expr::arith(ArithOp::Cmp, lhs, rhs)
}

/// Fold one relational node over canonical operands. Produces `True`/`False`
/// leaves, a strictly simpler relation, or the rebuilt original.
pub fn fold_rel(op: RelOp, lhs: Expr, rhs: Expr) -> Expr {
    // Canonicalize the constant to the right by mirroring the relation.
    if lhs.is_const() && !rhs.is_const() {
        return fold_rel(op.flip(), rhs, lhs);
    }

    if let (Some(a), Some(b)) = (lhs.as_int_const(), rhs.as_int_const()) {
        return Expr::bool_const(eval_int_rel(op, a.value(), b.value()));
    }
    if let (Some(a), Some(b)) = (lhs.as_float_const(), rhs.as_float_const()) {
        return Expr::bool_const(eval_float_rel(op, a.as_f64(), b.as_f64()));
    }
    if let (Some(a), Some(b)) = (lhs.as_bool_const(), rhs.as_bool_const()) {
        let eq = a == b;
        return Expr::bool_const(match op {
            RelOp::Eq => eq,
            RelOp::Ne => !eq,
            _ => unreachable!("ordering over boolean operands"),
        });
    }

    // Syntactic identity. Sound for integers and booleans; floats are
    // excluded because x may be NaN.
    if lhs == rhs && !matches!(lhs.sort(), Sort::Float(_)) {
        return Expr::bool_const(matches!(op, RelOp::Eq | RelOp::Le | RelOp::Ge));
    }

    // Boolean (in)equality against a constant unwraps to the variable side.
    if lhs.sort() == Sort::Bool {
        if let Some(b) = rhs.as_bool_const() {
            let keep = matches!(op, RelOp::Eq) == b;
            return if keep { lhs } else { negate_bool(lhs) };
        }
    }

    if let Some(k) = rhs.as_int_const() {
        // Pull a literal across an additive/subtractive/xor wrapper:
        // Eq(x+c, k) -> Eq(x, k-c), Eq(x-c, k) -> Eq(x, k+c),
        // Eq(x xor c, k) -> Eq(x, k xor c). Sound for Ne as well; all
        // arithmetic wraps at the declared width.
        if matches!(op, RelOp::Eq | RelOp::Ne) {
            if let Node::Arith {
                op: inner,
                lhs: x,
                rhs: c_expr,
            } = lhs.node()
            {
                if let Some(c) = c_expr.as_int_const() {
                    let pulled = match inner {
                        ArithOp::Add => Some(k.wrapping_sub(c)),
                        ArithOp::Sub => Some(k.wrapping_add(c)),
                        ArithOp::Xor => Some(k.bit_xor(c)),
                        _ => None,
                    };
                    if let Some(k2) = pulled {
                        return fold_rel(op, x.clone(), Expr::int(k2));
                    }
                }
            }
            if let Node::Neg(x) = lhs.node() {
                return fold_rel(op, x.clone(), Expr::int(k.wrapping_neg()));
            }
        }

        // Bounds at the representable extreme.
        match op {
            RelOp::Lt if k.is_min() => return Expr::f(),
            RelOp::Gt if k.is_max() => return Expr::f(),
            RelOp::Le if k.is_max() => return Expr::t(),
            RelOp::Ge if k.is_min() => return Expr::t(),
            _ => {}
        }
    }

    Expr::rel(op, lhs, rhs)
}

/// Negate an already-canonical boolean expression without re-running the
/// full rewriter.
pub fn negate_bool(e: Expr) -> Expr {
    match e.node() {
        Node::True => Expr::f(),
        Node::False => Expr::t(),
        Node::Not(inner) => inner.clone(),
        Node::Rel { op, lhs, rhs } => {
            let float_operands = matches!(lhs.sort(), Sort::Float(_));
            if !float_operands || matches!(op, RelOp::Eq | RelOp::Ne) {
                return fold_rel(op.negate(), lhs.clone(), rhs.clone());
            }
            Expr::not(e)
        }
        _ => Expr::not(e),
    }
}

fn eval_int_rel(op: RelOp, a: i64, b: i64) -> bool {
    match op {
        RelOp::Eq => a == b,
        RelOp::Ne => a != b,
        RelOp::Lt => a < b,
        RelOp::Le => a <= b,
        RelOp::Gt => a > b,
        RelOp::Ge => a >= b,
    }
}

fn eval_float_rel(op: RelOp, a: f64, b: f64) -> bool {
    match op {
        RelOp::Eq => a == b,
        RelOp::Ne => a != b,
        RelOp::Lt => a < b,
        RelOp::Le => a <= b,
        RelOp::Gt => a > b,
        RelOp::Ge => a >= b,
    }
}
