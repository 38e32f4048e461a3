//! Method-level call graph.
//!
//! Built once per analyzed scene by the excluded call-graph provider and
//! consumed read-only here. Backed by a petgraph `DiGraph` so method-level
//! shortest paths come from the stock algorithms instead of a bespoke queue.

use crate::graph::MethodRef;
use petgraph::algo::astar;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

pub trait CallGraphProvider {
    fn edges_out_of(&self, method: &MethodRef) -> Vec<MethodRef>;
}

#[derive(Debug, Default, Clone)]
pub struct SceneCallGraph {
    graph: DiGraph<MethodRef, ()>,
    index: HashMap<MethodRef, NodeIndex>,
}

impl SceneCallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a provider, starting at the given roots and following
    /// outgoing edges transitively.
    pub fn build(provider: &dyn CallGraphProvider, roots: &[MethodRef]) -> Self {
        let mut cg = Self::new();
        let mut expanded = std::collections::HashSet::new();
        let mut worklist: Vec<MethodRef> = roots.to_vec();
        while let Some(method) = worklist.pop() {
            if !expanded.insert(method.clone()) {
                continue;
            }
            cg.node(&method);
            for callee in provider.edges_out_of(&method) {
                worklist.push(callee.clone());
                cg.add_call(method.clone(), callee);
            }
        }
        cg
    }

    fn node(&mut self, method: &MethodRef) -> NodeIndex {
        if let Some(&ix) = self.index.get(method) {
            return ix;
        }
        let ix = self.graph.add_node(method.clone());
        self.index.insert(method.clone(), ix);
        ix
    }

    pub fn add_call(&mut self, caller: MethodRef, callee: MethodRef) {
        let from = self.node(&caller);
        let to = self.node(&callee);
        if !self.graph.contains_edge(from, to) {
            self.graph.add_edge(from, to, ());
        }
    }

    pub fn contains(&self, method: &MethodRef) -> bool {
        self.index.contains_key(method)
    }

    pub fn method_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Shortest caller->callee chain, endpoints included. Unit edge weights;
    /// `None` when no chain exists or either endpoint is unknown.
    pub fn shortest_path(&self, from: &MethodRef, to: &MethodRef) -> Option<Vec<MethodRef>> {
        let (&start, &goal) = (self.index.get(from)?, self.index.get(to)?);
        let (_, path) = astar(&self.graph, start, |n| n == goal, |_| 1u64, |_| 0u64)?;
        Some(path.into_iter().map(|ix| self.graph[ix].clone()).collect())
    }
}
