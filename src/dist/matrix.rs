//! All-pairs statement distances.
//!
//! Floyd–Warshall over the frozen interprocedural graph: every control edge
//! and every spliced call edge weighs 1, the diagonal is 0, unreachable pairs
//! hold the `INF` sentinel. Cubic in statement count, computed once per
//! top-level method under test — never per state.

use crate::dist::{dist_add, INF};
use crate::graph::interproc::InterGraph;
use crate::graph::StmtId;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    ids: HashMap<StmtId, usize>,
    n: usize,
    d: Vec<u64>,
}

impl DistanceMatrix {
    /// Build from a frozen graph. Statements discovered after the build are
    /// simply absent: lookups involving them return `INF`.
    pub fn build(graph: &InterGraph) -> Self {
        assert!(
            graph.is_frozen(),
            "distance matrix over a graph still being joined"
        );
        let mut order: Vec<StmtId> = graph.statements().map(|s| s.id).collect();
        order.sort_unstable();
        let ids: HashMap<StmtId, usize> = order
            .iter()
            .enumerate()
            .map(|(ix, id)| (*id, ix))
            .collect();
        let n = order.len();

        let mut d = vec![INF; n * n];
        for (ix, _) in order.iter().enumerate() {
            d[ix * n + ix] = 0;
        }
        for id in &order {
            let from = ids[id];
            for edge in graph.succs_for_search(*id) {
                if let Some(&to) = ids.get(&edge.to) {
                    let slot = &mut d[from * n + to];
                    *slot = (*slot).min(1);
                }
            }
        }

        for k in 0..n {
            for i in 0..n {
                let dik = d[i * n + k];
                if dik == INF {
                    continue;
                }
                for j in 0..n {
                    let through = dist_add(dik, d[k * n + j]);
                    if through < d[i * n + j] {
                        d[i * n + j] = through;
                    }
                }
            }
        }

        debug!(statements = n, "all-pairs distance matrix built");
        Self { ids, n, d }
    }

    /// Distance in edges; `INF` when either statement never got a table id
    /// or no path exists.
    pub fn distance(&self, from: StmtId, to: StmtId) -> u64 {
        match (self.ids.get(&from), self.ids.get(&to)) {
            (Some(&i), Some(&j)) => self.d[i * self.n + j],
            _ => INF,
        }
    }

    /// Minimum distance from `from` to any target; `INF` over an empty set.
    pub fn distance_to_any(&self, from: StmtId, targets: &[StmtId]) -> u64 {
        targets
            .iter()
            .map(|t| self.distance(from, *t))
            .min()
            .unwrap_or(INF)
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }
}
