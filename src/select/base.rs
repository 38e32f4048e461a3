//! Generic selectors: breadth-first, depth-first, and greedy distance to
//! uncovered targets.

use crate::dist::matrix::DistanceMatrix;
use crate::select::{ExecutionState, PathSelector, StateId, WeightedQueue};
use crate::graph::StmtId;
use std::collections::VecDeque;

/// FIFO expansion: states are processed in discovery order.
pub struct BfsSelector {
    queue: VecDeque<ExecutionState>,
    closed: bool,
}

impl BfsSelector {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            closed: false,
        }
    }
}

impl Default for BfsSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl PathSelector for BfsSelector {
    fn name(&self) -> &'static str {
        "bfs"
    }

    fn offer(&mut self, state: ExecutionState) {
        if self.closed {
            state.release_resources();
            return;
        }
        self.queue.push_back(state);
    }

    fn poll(&mut self) -> Option<ExecutionState> {
        self.queue.pop_front()
    }

    fn peek(&self) -> Option<&ExecutionState> {
        self.queue.front()
    }

    fn remove(&mut self, id: StateId) -> bool {
        if let Some(pos) = self.queue.iter().position(|s| s.id == id) {
            if let Some(state) = self.queue.remove(pos) {
                state.release_resources();
            }
            return true;
        }
        false
    }

    fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn queue(&self) -> Vec<(StateId, u64)> {
        self.queue
            .iter()
            .enumerate()
            .map(|(ix, s)| (s.id, ix as u64))
            .collect()
    }

    fn close(&mut self) {
        self.closed = true;
        for state in self.queue.drain(..) {
            state.release_resources();
        }
    }
}

/// LIFO expansion: dives down one path before backtracking.
pub struct DfsSelector {
    stack: Vec<ExecutionState>,
    closed: bool,
}

impl DfsSelector {
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            closed: false,
        }
    }
}

impl Default for DfsSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl PathSelector for DfsSelector {
    fn name(&self) -> &'static str {
        "dfs"
    }

    fn offer(&mut self, state: ExecutionState) {
        if self.closed {
            state.release_resources();
            return;
        }
        self.stack.push(state);
    }

    fn poll(&mut self) -> Option<ExecutionState> {
        self.stack.pop()
    }

    fn peek(&self) -> Option<&ExecutionState> {
        self.stack.last()
    }

    fn remove(&mut self, id: StateId) -> bool {
        if let Some(pos) = self.stack.iter().position(|s| s.id == id) {
            let state = self.stack.remove(pos);
            state.release_resources();
            return true;
        }
        false
    }

    fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    fn queue(&self) -> Vec<(StateId, u64)> {
        self.stack
            .iter()
            .rev()
            .enumerate()
            .map(|(ix, s)| (s.id, ix as u64))
            .collect()
    }

    fn close(&mut self) {
        self.closed = true;
        for state in self.stack.drain(..) {
            state.release_resources();
        }
    }
}

/// Greedy best-first toward the nearest uncovered target, scored against a
/// precomputed all-pairs matrix. The target set shrinks as coverage lands;
/// queued states are re-weighed when it does.
pub struct GreedyDistanceSelector {
    matrix: DistanceMatrix,
    targets: Vec<StmtId>,
    queue: WeightedQueue,
}

impl GreedyDistanceSelector {
    pub fn new(matrix: DistanceMatrix, targets: Vec<StmtId>) -> Self {
        Self {
            matrix,
            targets,
            queue: WeightedQueue::new(),
        }
    }

    fn weight_of(&self, state: &ExecutionState) -> u64 {
        self.matrix.distance_to_any(state.current, &self.targets)
    }

    /// Drop a now-covered target and re-weigh the queue against the rest.
    pub fn mark_covered(&mut self, target: StmtId) {
        let before = self.targets.len();
        self.targets.retain(|t| *t != target);
        if self.targets.len() != before {
            let matrix = &self.matrix;
            let targets = &self.targets;
            self.queue
                .reweigh(|state| matrix.distance_to_any(state.current, targets));
        }
    }

    pub fn targets(&self) -> &[StmtId] {
        &self.targets
    }
}

impl PathSelector for GreedyDistanceSelector {
    fn name(&self) -> &'static str {
        "greedy-distance"
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
    use crate::dist::INF;
    use crate::graph::body::StaticBodies;
    use crate::graph::interproc::InterGraph;
    use crate::graph::{MethodGraphBuilder, MethodRef, StmtIdGen, StmtKind};
    use crate::select::test_state;

    #[test]
    fn test_bfs_is_fifo_and_dfs_is_lifo() {
        let mut bfs = BfsSelector::new();
        bfs.offer(test_state(1, "m", StmtId(0), vec![]));
        bfs.offer(test_state(2, "m", StmtId(1), vec![]));
        assert_eq!(bfs.poll().map(|s| s.id), Some(StateId(1)));

        let mut dfs = DfsSelector::new();
        dfs.offer(test_state(1, "m", StmtId(0), vec![]));
        dfs.offer(test_state(2, "m", StmtId(1), vec![]));
        assert_eq!(dfs.poll().map(|s| s.id), Some(StateId(2)));
    }

    #[test]
    fn test_remove_by_id_reports_presence() {
        let mut bfs = BfsSelector::new();
        bfs.offer(test_state(1, "m", StmtId(0), vec![]));
        assert!(bfs.remove(StateId(1)));
        assert!(!bfs.remove(StateId(1)));
        assert!(bfs.is_empty());
    }

    fn chain_matrix() -> (DistanceMatrix, Vec<StmtId>) {
        let mut ids = StmtIdGen::new();
        let mut b = MethodGraphBuilder::new(MethodRef::new("m"));
        let s0 = b.add_stmt(&mut ids, StmtKind::Plain);
        let s1 = b.add_stmt(&mut ids, StmtKind::Plain);
        let s2 = b.add_stmt(&mut ids, StmtKind::Plain);
        let s3 = b.add_stmt(&mut ids, StmtKind::Exit);
        b.add_goto(s0, s1);
        b.add_goto(s1, s2);
        b.add_goto(s2, s3);
        let g = b.build();
        let mut ig = InterGraph::new();
        ig.expand_all(&g, &StaticBodies::new(), true);
        (DistanceMatrix::build(&ig), vec![s0, s1, s2, s3])
    }

    #[test]
    fn test_greedy_polls_nearest_state_first() {
        let (matrix, s) = chain_matrix();
        let mut sel = GreedyDistanceSelector::new(matrix, vec![s[3]]);
        sel.offer(test_state(1, "m", s[0], vec![])); // distance 3
        sel.offer(test_state(2, "m", s[2], vec![])); // distance 1
        assert_eq!(sel.poll().map(|st| st.id), Some(StateId(2)));
        assert_eq!(sel.poll().map(|st| st.id), Some(StateId(1)));
    }

    #[test]
    fn test_greedy_reweighs_when_target_covered() {
        let (matrix, s) = chain_matrix();
        let mut sel = GreedyDistanceSelector::new(matrix, vec![s[1], s[3]]);
        sel.offer(test_state(1, "m", s[0], vec![])); // nearest target s1 at 1
        assert_eq!(sel.queue()[0].1, 1);
        sel.mark_covered(s[1]);
        // Only s3 remains, three edges away.
        assert_eq!(sel.queue()[0].1, 3);
    }

    #[test]
    fn test_state_off_the_matrix_sorts_last_never_panics() {
        let (matrix, s) = chain_matrix();
        let mut sel = GreedyDistanceSelector::new(matrix, vec![s[3]]);
        sel.offer(test_state(1, "m", StmtId(999), vec![])); // unknown stmt
        sel.offer(test_state(2, "m", s[0], vec![]));
        let snapshot = sel.queue();
        assert_eq!(snapshot[0].0, StateId(2));
        assert_eq!(snapshot[1].1, INF);
        assert_eq!(sel.poll().map(|st| st.id), Some(StateId(2)));
    }
}
