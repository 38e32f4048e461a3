//! Select/Store chain rules.
//!
//! A read may only be pushed past a store entry when the two indices are
//! provably distinct. The moment an earlier entry could alias the read index
//! (a symbolic store index that is not syntactically identical), the chain is
//! left intact as an opaque fact — correctness over aggressiveness.

use crate::expr::{Expr, Node};

/// Fold `Select(array, index)` over canonical operands.
pub fn fold_select(array: Expr, index: Expr) -> Expr {
    match array.node() {
        Node::ConstArray { element, .. } => element.clone(),
        Node::Store {
            array: base,
            updates,
        } => {
            // Scan newest-first: the last store to an index wins.
            for (idx, val) in updates.iter().rev() {
                if *idx == index {
                    return val.clone();
                }
                let distinct_literals = match (idx.as_int_const(), index.as_int_const()) {
                    (Some(a), Some(b)) => a != b,
                    _ => false,
                };
                if !distinct_literals {
                    // Potential alias: an entry with a symbolic index (or a
                    // symbolic read index) that we cannot separate from the
                    // read. Keep the whole chain.
                    return Expr::select(array.clone(), index);
                }
            }
            // Every entry is a distinct concrete index: read through to the
            // backing array.
            fold_select(base.clone(), index)
        }
        _ => Expr::select(array, index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{IntWidth, Sort};

    fn int_array() -> Expr {
        Expr::var(
            "a",
            Sort::array(Sort::Int(IntWidth::W32), Sort::Int(IntWidth::W32)),
        )
    }

    #[test]
    fn test_select_of_matching_store_yields_value() {
        let st = Expr::store(int_array(), vec![(Expr::int32(3), Expr::int32(99))]);
        assert_eq!(fold_select(st, Expr::int32(3)), Expr::int32(99));
    }

    #[test]
    fn test_select_pushes_past_distinct_concrete_stores() {
        let st = Expr::store(
            int_array(),
            vec![
                (Expr::int32(1), Expr::int32(10)),
                (Expr::int32(2), Expr::int32(20)),
            ],
        );
        // Index 5 is shadowed by nothing: the read falls through to the base.
        assert_eq!(
            fold_select(st, Expr::int32(5)),
            Expr::select(int_array(), Expr::int32(5))
        );
    }

    #[test]
    fn test_newest_store_shadows_older_same_index() {
        let st = Expr::store(
            int_array(),
            vec![
                (Expr::int32(1), Expr::int32(10)),
                (Expr::int32(1), Expr::int32(20)),
            ],
        );
        assert_eq!(fold_select(st, Expr::int32(1)), Expr::int32(20));
    }

    #[test]
    fn test_symbolic_store_index_blocks_elimination() {
        let i = Expr::var("i", Sort::Int(IntWidth::W32));
        let st = Expr::store(
            int_array(),
            vec![
                (i, Expr::int32(10)),
                (Expr::int32(2), Expr::int32(20)),
            ],
        );
        let read = fold_select(st.clone(), Expr::int32(7));
        // The symbolic index earlier in the chain may alias index 7: the
        // whole select stays opaque.
        assert_eq!(read, Expr::select(st, Expr::int32(7)));
    }

    #[test]
    fn test_const_array_read() {
        let ca = Expr::const_array(Sort::Int(IntWidth::W32), Expr::int32(0));
        assert_eq!(fold_select(ca, Expr::int32(41)), Expr::int32(0));
    }
}
