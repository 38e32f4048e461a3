//! Taint-aware selectors.
//!
//! Both steer the search source-first: a state that has not yet crossed any
//! declared source is scored against the source set; once its path history
//! covers at least one source, scoring switches to the sinks registered
//! against every visited source. The scheduler re-targets mid-search as
//! sources are discovered — no state is ever pinned to one source/sink pair
//! up front.
//!
//! The matrix variant pays one all-pairs build per top-level method and
//! answers lookups by table; the path variant recomputes a stitched
//! call-graph distance per offer. Either way an unplaceable state weighs
//! `INF` and sorts last — deprioritized, never discarded.

use crate::dist::incremental::IncrementalOracle;
use crate::dist::matrix::DistanceMatrix;
use crate::graph::{ProgramPoint, StmtId};
use crate::select::{ExecutionState, PathSelector, StateId, WeightedQueue};
use crate::taint::TaintConfig;
use tracing::warn;

fn objectives(config: &TaintConfig, state: &ExecutionState) -> Vec<ProgramPoint> {
    if config.sources_on_path(&state.path).is_empty() {
        config.sources()
    } else {
        config.sinks_for_path(&state.path)
    }
}

/// Matrix-backed taint selector: distances come from a frozen all-pairs
/// table; statements discovered after the freeze weigh `INF`.
pub struct TaintMatrixSelector {
    matrix: DistanceMatrix,
    config: TaintConfig,
    queue: WeightedQueue,
}

impl TaintMatrixSelector {
    pub fn new(matrix: DistanceMatrix, config: TaintConfig) -> Self {
        if config.is_empty() {
            // Every weight will be INF; scheduling degrades to insertion
            // order. Deliberate: states are deprioritized, not dropped.
            warn!("taint selector built with empty taint configuration");
        }
        Self {
            matrix,
            config,
            queue: WeightedQueue::new(),
        }
    }

    fn weight_of(&self, state: &ExecutionState) -> u64 {
        let points = objectives(&self.config, state);
        let stmts: Vec<StmtId> = points.iter().map(|p| p.stmt).collect();
        self.matrix.distance_to_any(state.current, &stmts)
    }
}

impl PathSelector for TaintMatrixSelector {
    fn name(&self) -> &'static str {
        "taint-matrix"
    }

    fn offer(&mut self, state: ExecutionState) {
        let weight = self.weight_of(&state);
        self.queue.offer(state, weight);
    }

    fn poll(&mut self) -> Option<ExecutionState> {
        self.queue.poll()
    }

    fn peek(&self) -> Option<&ExecutionState> {
        self.queue.peek()
    }

    fn remove(&mut self, id: StateId) -> bool {
        self.queue.remove(id)
    }

    fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn queue(&self) -> Vec<(StateId, u64)> {
        self.queue.snapshot()
    }

    fn close(&mut self) {
        self.queue.close();
    }
}

/// Call-graph taint selector: stitched Dijkstra+BFS distance per offer, no
/// global table. Cheaper to set up, dearer per insertion.
pub struct TaintPathSelector {
    oracle: IncrementalOracle,
    config: TaintConfig,
    queue: WeightedQueue,
}

impl TaintPathSelector {
    pub fn new(oracle: IncrementalOracle, config: TaintConfig) -> Self {
        if config.is_empty() {
            warn!("taint selector built with empty taint configuration");
        }
        Self {
            oracle,
            config,
            queue: WeightedQueue::new(),
        }
    }

    fn weight_of(&self, state: &ExecutionState) -> u64 {
        let points = objectives(&self.config, state);
        self.oracle
            .distance_to_any(&state.method, state.current, &points)
    }
}

impl PathSelector for TaintPathSelector {
    fn name(&self) -> &'static str {
        "taint-path"
    }

    fn offer(&mut self, state: ExecutionState) {
        let weight = self.weight_of(&state);
        self.queue.offer(state, weight);
    }

    fn poll(&mut self) -> Option<ExecutionState> {
        self.queue.poll()
    }

    fn peek(&self) -> Option<&ExecutionState> {
        self.queue.peek()
    }

    fn remove(&mut self, id: StateId) -> bool {
        self.queue.remove(id)
    }

    fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn queue(&self) -> Vec<(StateId, u64)> {
        self.queue.snapshot()
    }

    fn close(&mut self) {
        self.queue.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::dist::INF;
    use crate::graph::body::StaticBodies;
    use crate::graph::callgraph::SceneCallGraph;
    use crate::graph::interproc::InterGraph;
    use crate::graph::{MethodGraph, MethodGraphBuilder, MethodRef, StmtIdGen, StmtKind};
    use crate::select::test_state;
    use crate::taint::TaintFlow;
    use std::sync::Arc;

    struct Scene {
        main: MethodGraph,
        bodies: Arc<StaticBodies>,
        call_graph: Arc<SceneCallGraph>,
        stmts: Vec<StmtId>,
        source: StmtId,
        sink: StmtId,
    }

    /// One linear method: s0 -> s1 -> source -> s3 -> sink -> exit.
    fn scene() -> Scene {
        let mut ids = StmtIdGen::new();
        let mut b = MethodGraphBuilder::new(MethodRef::new("main"));
        let s: Vec<StmtId> = (0..6)
            .map(|i| {
                b.add_stmt(
                    &mut ids,
                    if i == 5 { StmtKind::Exit } else { StmtKind::Plain },
                )
            })
            .collect();
        for w in s.windows(2) {
            b.add_goto(w[0], w[1]);
        }
        let main = b.build();

        let bodies = StaticBodies::new();
        bodies.insert(main.clone());
        let mut cg = SceneCallGraph::new();
        cg.add_call(MethodRef::new("root"), MethodRef::new("main"));

        Scene {
            main,
            bodies: Arc::new(bodies),
            call_graph: Arc::new(cg),
            source: s[2],
            sink: s[4],
            stmts: s,
        }
    }

    fn taint_config(s: &Scene) -> TaintConfig {
        TaintConfig::new(vec![TaintFlow {
            source: ProgramPoint::new(MethodRef::new("main"), s.source),
            sinks: vec![ProgramPoint::new(MethodRef::new("main"), s.sink)],
        }])
    }

    fn matrix(s: &Scene) -> DistanceMatrix {
        let mut ig = InterGraph::new();
        ig.expand_all(&s.main, s.bodies.as_ref(), true);
        DistanceMatrix::build(&ig)
    }

    #[test]
    fn test_closer_state_polls_first() {
        let s = scene();
        let mut sel = TaintMatrixSelector::new(matrix(&s), taint_config(&s));
        // Distances to the source (s2): from s0 = 2, from s1 = 1.
        sel.offer(test_state(1, "main", s.stmts[0], vec![s.stmts[0]]));
        sel.offer(test_state(2, "main", s.stmts[1], vec![s.stmts[1]]));
        assert_eq!(sel.poll().map(|st| st.id), Some(StateId(2)));
        assert_eq!(sel.poll().map(|st| st.id), Some(StateId(1)));
    }

    #[test]
    fn test_priority_retargets_once_source_is_on_path() {
        let s = scene();
        let mut sel = TaintMatrixSelector::new(matrix(&s), taint_config(&s));

        // Same position, different histories: before the source, the weight
        // is the distance to the source; after, to the sink.
        let before = test_state(1, "main", s.stmts[3], vec![s.stmts[3]]);
        let after = test_state(
            2,
            "main",
            s.stmts[3],
            vec![s.stmts[1], s.source, s.stmts[3]],
        );
        sel.offer(before);
        sel.offer(after);

        let snapshot = sel.queue();
        let weight = |id: StateId| {
            snapshot
                .iter()
                .find(|(sid, _)| *sid == id)
                .map(|(_, w)| *w)
                .expect("state queued")
        };
        // State 1 still hunts the source behind it: unreachable, INF.
        assert_eq!(weight(StateId(1)), INF);
        // State 2 passed the source; sink is one edge ahead.
        assert_eq!(weight(StateId(2)), 1);
        assert_eq!(sel.poll().map(|st| st.id), Some(StateId(2)));
    }

    #[test]
    fn test_path_selector_matches_matrix_ordering() {
        let s = scene();
        let oracle = IncrementalOracle::new(
            s.call_graph.clone(),
            s.bodies.clone(),
            &EngineConfig::default(),
        );
        let mut sel = TaintPathSelector::new(oracle, taint_config(&s));
        sel.offer(test_state(1, "main", s.stmts[0], vec![s.stmts[0]]));
        sel.offer(test_state(2, "main", s.stmts[1], vec![s.stmts[1]]));
        assert_eq!(sel.poll().map(|st| st.id), Some(StateId(2)));
    }

    #[test]
    fn test_unknown_statement_deprioritized_not_crashing() {
        let s = scene();
        let mut sel = TaintMatrixSelector::new(matrix(&s), taint_config(&s));
        sel.offer(test_state(1, "main", StmtId(9_999), vec![]));
        sel.offer(test_state(2, "main", s.stmts[0], vec![s.stmts[0]]));
        assert_eq!(sel.poll().map(|st| st.id), Some(StateId(2)));
        // The off-table state is still there, just last.
        assert_eq!(sel.poll().map(|st| st.id), Some(StateId(1)));
        assert!(sel.is_empty());
    }

    #[test]
    fn test_empty_config_keeps_states_schedulable() {
        let s = scene();
        let mut sel = TaintMatrixSelector::new(matrix(&s), TaintConfig::default());
        sel.offer(test_state(1, "main", s.stmts[0], vec![]));
        assert_eq!(sel.queue()[0].1, INF);
        assert_eq!(sel.poll().map(|st| st.id), Some(StateId(1)));
    }
}
