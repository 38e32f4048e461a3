//! Per-query stitched distances.
//!
//! The all-pairs matrix is too expensive to recompute per state, so this
//! oracle answers one (position, targets) query at a time: Dijkstra over the
//! method call graph picks the shortest method-level chain, then BFS inside
//! each body converts it to statement granularity:
//!   (a) current statement -> a call site of the chain's next method,
//!   (b) one hop per spliced call edge,
//!   (c) each intermediate method's entry -> its next call site,
//!   (d) the target method's entry -> the target statement.
//! Statement edges and call hops are priced separately: a short
//! intraprocedural detour beats an extra call-boundary crossing.

use crate::config::EngineConfig;
use crate::dist::{dist_add, dist_scale, INF};
use crate::graph::body::BodyProvider;
use crate::graph::callgraph::SceneCallGraph;
use crate::graph::{MethodGraph, MethodRef, ProgramPoint, StmtId};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

pub struct IncrementalOracle {
    call_graph: Arc<SceneCallGraph>,
    bodies: Arc<dyn BodyProvider>,
    inner_coeff: u64,
    inter_coeff: u64,
}

impl IncrementalOracle {
    pub fn new(
        call_graph: Arc<SceneCallGraph>,
        bodies: Arc<dyn BodyProvider>,
        cfg: &EngineConfig,
    ) -> Self {
        Self {
            call_graph,
            bodies,
            inner_coeff: cfg.inner_coeff,
            inter_coeff: cfg.inter_coeff,
        }
    }

    /// Combined weight from a position to one target; `INF` when unreachable.
    pub fn distance_to(
        &self,
        from_method: &MethodRef,
        from_stmt: StmtId,
        target: &ProgramPoint,
    ) -> u64 {
        if *from_method == target.method {
            let Some(body) = self.bodies.body(from_method) else {
                return INF;
            };
            let inner = bfs_distance(&body, from_stmt, &[target.stmt]);
            return dist_scale(inner, self.inner_coeff);
        }

        let Some(chain) = self.call_graph.shortest_path(from_method, &target.method) else {
            return INF;
        };
        debug_assert!(chain.len() >= 2, "cross-method chain has at least 2 nodes");

        let mut inner = 0u64;
        // (a) current statement to a call site of the next method in chain.
        let Some(head) = self.bodies.body(&chain[0]) else {
            return INF;
        };
        inner = dist_add(
            inner,
            bfs_distance(&head, from_stmt, &head.call_sites_of(&chain[1])),
        );

        // (c) each intermediate method: entry to its next call site.
        for window in chain.windows(2).skip(1) {
            let Some(body) = self.bodies.body(&window[0]) else {
                return INF;
            };
            inner = dist_add(
                inner,
                bfs_distance(&body, body.entry(), &body.call_sites_of(&window[1])),
            );
        }

        // (d) target method entry to the target statement.
        let Some(last) = self.bodies.body(&target.method) else {
            return INF;
        };
        inner = dist_add(inner, bfs_distance(&last, last.entry(), &[target.stmt]));

        // (b) one hop per spliced call edge.
        let hops = (chain.len() - 1) as u64;
        dist_add(
            dist_scale(inner, self.inner_coeff),
            dist_scale(hops, self.inter_coeff),
        )
    }

    /// Minimum weight over an objective set; `INF` over an empty set.
    pub fn distance_to_any(
        &self,
        from_method: &MethodRef,
        from_stmt: StmtId,
        targets: &[ProgramPoint],
    ) -> u64 {
        targets
            .iter()
            .map(|t| self.distance_to(from_method, from_stmt, t))
            .min()
            .unwrap_or(INF)
    }
}

/// Unit-weight BFS inside one method body to the nearest of `targets`.
fn bfs_distance(body: &MethodGraph, from: StmtId, targets: &[StmtId]) -> u64 {
    if targets.is_empty() {
        return INF;
    }
    let goal: HashSet<StmtId> = targets.iter().copied().collect();
    if goal.contains(&from) {
        return 0;
    }
    let mut seen: HashSet<StmtId> = HashSet::new();
    let mut queue: VecDeque<(StmtId, u64)> = VecDeque::new();
    seen.insert(from);
    queue.push_back((from, 0));
    while let Some((id, d)) = queue.pop_front() {
        for edge in body.succs(id) {
            if !seen.insert(edge.to) {
                continue;
            }
            let nd = d + 1;
            if goal.contains(&edge.to) {
                return nd;
            }
            queue.push_back((edge.to, nd));
        }
    }
    INF
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::body::StaticBodies;
    use crate::graph::{MethodGraphBuilder, StmtIdGen, StmtKind};

    struct Scene {
        bodies: Arc<StaticBodies>,
        call_graph: Arc<SceneCallGraph>,
        main_entry: StmtId,
        call_site: StmtId,
        sink_stmt: StmtId,
    }

    /// main: entry -> mid -> call(work) -> exit; work: entry -> sink -> exit.
    fn scene() -> Scene {
        let mut ids = StmtIdGen::new();

        let mut wb = MethodGraphBuilder::new(MethodRef::new("work"));
        let w_entry = wb.add_stmt(&mut ids, StmtKind::Plain);
        let sink = wb.add_stmt(&mut ids, StmtKind::Plain);
        let w_exit = wb.add_stmt(&mut ids, StmtKind::Exit);
        wb.add_goto(w_entry, sink);
        wb.add_goto(sink, w_exit);
        let work = wb.build();

        let mut mb = MethodGraphBuilder::new(MethodRef::new("main"));
        let m_entry = mb.add_stmt(&mut ids, StmtKind::Plain);
        let mid = mb.add_stmt(&mut ids, StmtKind::Plain);
        let call = mb.add_stmt(
            &mut ids,
            StmtKind::Call {
                callee: MethodRef::new("work"),
            },
        );
        let m_exit = mb.add_stmt(&mut ids, StmtKind::Exit);
        mb.add_goto(m_entry, mid);
        mb.add_goto(mid, call);
        mb.add_goto(call, m_exit);
        let main = mb.build();

        let bodies = StaticBodies::new();
        bodies.insert(work);
        bodies.insert(main);

        let mut cg = SceneCallGraph::new();
        cg.add_call(MethodRef::new("main"), MethodRef::new("work"));

        Scene {
            bodies: Arc::new(bodies),
            call_graph: Arc::new(cg),
            main_entry: m_entry,
            call_site: call,
            sink_stmt: sink,
        }
    }

    fn oracle(s: &Scene) -> IncrementalOracle {
        IncrementalOracle::new(
            s.call_graph.clone(),
            s.bodies.clone(),
            &EngineConfig::default(),
        )
    }

    #[test]
    fn test_same_method_distance_is_inner_only() {
        let s = scene();
        let o = oracle(&s);
        let d = o.distance_to(
            &MethodRef::new("main"),
            s.main_entry,
            &ProgramPoint::new(MethodRef::new("main"), s.call_site),
        );
        // entry -> mid -> call = 2 edges, inner coefficient 1.
        assert_eq!(d, 2);
    }

    #[test]
    fn test_cross_method_distance_stitches_segments() {
        let s = scene();
        let o = oracle(&s);
        let d = o.distance_to(
            &MethodRef::new("main"),
            s.main_entry,
            &ProgramPoint::new(MethodRef::new("work"), s.sink_stmt),
        );
        // (a) entry->call = 2, (d) work entry->sink = 1, (b) 1 hop * 3.
        assert_eq!(d, 2 + 1 + 3);
    }

    #[test]
    fn test_inner_detour_beats_extra_call_hop() {
        // With defaults (inner 1, inter 3), two extra statement edges cost
        // less than one extra call crossing.
        let cfg = EngineConfig::default();
        assert!(2 * cfg.inner_coeff < cfg.inter_coeff);
    }

    #[test]
    fn test_unreachable_method_is_inf() {
        let s = scene();
        let o = oracle(&s);
        let d = o.distance_to(
            &MethodRef::new("work"),
            s.sink_stmt,
            &ProgramPoint::new(MethodRef::new("main"), s.main_entry),
        );
        // The call graph has no work -> main edge.
        assert_eq!(d, INF);
    }

    #[test]
    fn test_empty_target_set_is_inf() {
        let s = scene();
        let o = oracle(&s);
        assert_eq!(
            o.distance_to_any(&MethodRef::new("main"), s.main_entry, &[]),
            INF
        );
    }
}
