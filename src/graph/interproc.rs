//! Interprocedural unit graph.
//!
//! Per-method graphs are spliced at call sites: call-site -> callee-entry,
//! callee-exit -> return-site. Joining follows a strict two-phase protocol:
//! phase 1 drains a worklist until every reachable call site is joined, then
//! the graph freezes; phase 2 runs read-only shortest-path algorithms.
//! Mutation after freeze is a programming fault.
//!
//! `register_edges=false` records splice edges in a search-only overlay, so
//! distance computation can expand callees without changing the authoritative
//! successor view other subsystems execute against.

use crate::graph::body::BodyProvider;
use crate::graph::{Edge, EdgeKind, MethodGraph, MethodRef, Statement, StmtId, StmtKind};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

#[derive(Debug, Default)]
pub struct InterGraph {
    stmts: HashMap<StmtId, Statement>,
    succs: HashMap<StmtId, Vec<Edge>>,
    /// Splice edges registered with `register_edges=false`; consulted by
    /// search traversals only.
    overlay: HashMap<StmtId, Vec<Edge>>,
    joined: HashSet<(StmtId, MethodRef)>,
    imported: HashSet<MethodRef>,
    frozen: bool,
}

impl InterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the graph with a method body (the top-level method under test).
    pub fn add_method(&mut self, graph: &MethodGraph) {
        assert!(!self.frozen, "add_method on a frozen interprocedural graph");
        if !self.imported.insert(graph.method().clone()) {
            return;
        }
        for stmt in graph.statements() {
            self.stmts.insert(stmt.id, stmt.clone());
        }
        for stmt in graph.statements() {
            let edges = self.succs.entry(stmt.id).or_default();
            edges.extend(graph.succs(stmt.id).iter().copied());
        }
    }

    /// Splice `callee` into this graph at `call_site`. Idempotent per
    /// (call-site, callee) pair: a rejoin is a no-op.
    pub fn join(&mut self, call_site: StmtId, callee: &MethodGraph, register_edges: bool) {
        assert!(!self.frozen, "join on a frozen interprocedural graph");
        if !self
            .joined
            .insert((call_site, callee.method().clone()))
        {
            return;
        }

        // The return sites are the call site's ordinary successors, captured
        // before the splice edges land.
        let return_sites: Vec<StmtId> = self
            .succs
            .get(&call_site)
            .map(|edges| {
                edges
                    .iter()
                    .filter(|e| e.kind == EdgeKind::Normal)
                    .map(|e| e.to)
                    .collect()
            })
            .unwrap_or_default();

        self.add_method(callee);

        let mut splice = |from: StmtId, to: StmtId, kind: EdgeKind, this: &mut Self| {
            let bucket = if register_edges {
                this.succs.entry(from).or_default()
            } else {
                this.overlay.entry(from).or_default()
            };
            let edge = Edge { from, to, kind };
            if !bucket.contains(&edge) {
                bucket.push(edge);
            }
        };

        splice(call_site, callee.entry(), EdgeKind::CallToEntry, self);
        for exit in callee.exits() {
            for ret in &return_sites {
                splice(*exit, *ret, EdgeKind::ExitToReturn, self);
            }
        }
    }

    /// Authoritative first successor.
    pub fn succ(&self, id: StmtId) -> Option<&Edge> {
        self.succs.get(&id).and_then(|edges| edges.first())
    }

    /// Authoritative ordered successors. Zero edges for statements whose
    /// method body could not be retrieved — a dead end, not an error.
    pub fn succs(&self, id: StmtId) -> &[Edge] {
        self.succs.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Successors as seen by search traversals: authoritative edges plus the
    /// non-registered splice overlay.
    pub fn succs_for_search(&self, id: StmtId) -> Vec<Edge> {
        let mut out: Vec<Edge> = self.succs(id).to_vec();
        if let Some(extra) = self.overlay.get(&id) {
            out.extend(extra.iter().copied());
        }
        out
    }

    pub fn statement(&self, id: StmtId) -> Option<&Statement> {
        self.stmts.get(&id)
    }

    pub fn statements(&self) -> impl Iterator<Item = &Statement> {
        self.stmts.values()
    }

    pub fn stmt_count(&self) -> usize {
        self.stmts.len()
    }

    /// Total edges across the authoritative view and the search overlay.
    pub fn edge_count(&self) -> usize {
        self.succs.values().map(Vec::len).sum::<usize>()
            + self.overlay.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Phase 1: eagerly join every call site reachable from `root`'s entry,
    /// BFS order, until the worklist drains; then freeze.
    pub fn expand_all(&mut self, root: &MethodGraph, bodies: &dyn BodyProvider, register_edges: bool) {
        assert!(!self.frozen, "expand_all on a frozen interprocedural graph");
        self.add_method(root);

        let mut queue: VecDeque<StmtId> = VecDeque::new();
        let mut seen: HashSet<StmtId> = HashSet::new();
        queue.push_back(root.entry());
        seen.insert(root.entry());

        while let Some(id) = queue.pop_front() {
            if let Some(stmt) = self.stmts.get(&id).cloned() {
                if let StmtKind::Call { callee } = &stmt.kind {
                    // Unretrievable bodies leave the call site a plain
                    // statement with its fall-through successors only.
                    if let Some(body) = bodies.body(callee) {
                        self.join(id, &body, register_edges);
                    }
                }
            }
            for edge in self.succs_for_search(id) {
                if seen.insert(edge.to) {
                    queue.push_back(edge.to);
                }
            }
        }

        self.frozen = true;
        debug!(
            statements = self.stmt_count(),
            edges = self.edge_count(),
            methods = self.imported.len(),
            "interprocedural graph expanded and frozen"
        );
    }
}
