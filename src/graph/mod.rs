//! Control-flow graph model.
//!
//! One `Statement` per instruction, with a stable id used as the key for
//! distance tables and visited sets. Method bodies are built once and cached;
//! the interprocedural graph splices bodies together at call sites.

pub mod body;
pub mod callgraph;
pub mod interproc;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Stable statement identity. Ids are issued by a per-run `StmtIdGen`, never
/// by a process-wide counter, so parallel runs over different top-level
/// methods cannot collide.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct StmtId(pub u64);

impl fmt::Display for StmtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Statement id source, scoped to one analysis run.
#[derive(Debug, Default)]
pub struct StmtIdGen {
    next: u64,
}

impl StmtIdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> StmtId {
        let id = StmtId(self.next);
        self.next += 1;
        id
    }
}

/// Method identity within the analyzed scene.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodRef(pub Arc<str>);

impl MethodRef {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable statement+enclosing-method identity, the key taint configuration
/// and objective sets are expressed in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgramPoint {
    pub method: MethodRef,
    pub stmt: StmtId,
}

impl ProgramPoint {
    pub fn new(method: MethodRef, stmt: StmtId) -> Self {
        Self { method, stmt }
    }
}

impl fmt::Display for ProgramPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.stmt, self.method)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Fall-through / jump inside one method body.
    Normal,
    /// Exceptional successor (handler entry).
    Exceptional,
    /// Spliced call-site -> callee-entry edge.
    CallToEntry,
    /// Spliced callee-exit -> return-site edge.
    ExitToReturn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: StmtId,
    pub to: StmtId,
    pub kind: EdgeKind,
}

/// What a statement does, as far as path selection cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StmtKind {
    Plain,
    /// Two-way branch; successors are ordered false-first.
    Branch,
    /// Table switch; successors are case edges in table order, default last.
    Switch,
    /// Invocation of `callee`; the interprocedural join splices here.
    Call { callee: MethodRef },
    /// Method exit (return or uncaught throw out of the body).
    Exit,
}

#[derive(Debug, Clone)]
pub struct Statement {
    pub id: StmtId,
    pub method: MethodRef,
    pub kind: StmtKind,
}

/// One method body: statements plus ordered intraprocedural successor lists.
#[derive(Debug, Clone)]
pub struct MethodGraph {
    method: MethodRef,
    entry: StmtId,
    exits: Vec<StmtId>,
    stmts: HashMap<StmtId, Statement>,
    succs: HashMap<StmtId, Vec<Edge>>,
}

impl MethodGraph {
    pub fn method(&self) -> &MethodRef {
        &self.method
    }

    pub fn entry(&self) -> StmtId {
        self.entry
    }

    pub fn exits(&self) -> &[StmtId] {
        &self.exits
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

    /// Ordered successors; empty for exits and unknown ids.
    pub fn succs(&self, id: StmtId) -> &[Edge] {
        self.succs.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Call sites in this body, with their callees.
    pub fn call_sites(&self) -> impl Iterator<Item = (StmtId, &MethodRef)> {
        self.stmts.values().filter_map(|s| match &s.kind {
            StmtKind::Call { callee } => Some((s.id, callee)),
            _ => None,
        })
    }

    /// Call sites invoking one specific callee.
    pub fn call_sites_of(&self, callee: &MethodRef) -> Vec<StmtId> {
        self.call_sites()
            .filter(|(_, c)| *c == callee)
            .map(|(id, _)| id)
            .collect()
    }
}

/// Builder enforcing the successor-ordering discipline: branch edges are
/// false-first, switch edges are case-table order with default last.
pub struct MethodGraphBuilder {
    method: MethodRef,
    entry: Option<StmtId>,
    exits: Vec<StmtId>,
    stmts: HashMap<StmtId, Statement>,
    succs: HashMap<StmtId, Vec<Edge>>,
}

impl MethodGraphBuilder {
    pub fn new(method: MethodRef) -> Self {
        Self {
            method,
            entry: None,
            exits: Vec::new(),
            stmts: HashMap::new(),
            succs: HashMap::new(),
        }
    }

    pub fn add_stmt(&mut self, ids: &mut StmtIdGen, kind: StmtKind) -> StmtId {
        let id = ids.next_id();
        if self.entry.is_none() {
            self.entry = Some(id);
        }
        if matches!(kind, StmtKind::Exit) {
            self.exits.push(id);
        }
        self.stmts.insert(
            id,
            Statement {
                id,
                method: self.method.clone(),
                kind,
            },
        );
        self.succs.insert(id, Vec::new());
        id
    }

    pub fn add_goto(&mut self, from: StmtId, to: StmtId) -> &mut Self {
        self.push_edge(from, to, EdgeKind::Normal)
    }

    /// Branch successors in evaluation order: negative/false branch first,
    /// then positive/true branch.
    pub fn add_branch(&mut self, from: StmtId, false_to: StmtId, true_to: StmtId) -> &mut Self {
        self.push_edge(from, false_to, EdgeKind::Normal);
        self.push_edge(from, true_to, EdgeKind::Normal)
    }

    /// Switch successors: one edge per case value in case-table order, then
    /// the default edge last.
    pub fn add_switch(&mut self, from: StmtId, cases: &[StmtId], default: StmtId) -> &mut Self {
        for case in cases {
            self.push_edge(from, *case, EdgeKind::Normal);
        }
        self.push_edge(from, default, EdgeKind::Normal)
    }

    pub fn add_exceptional(&mut self, from: StmtId, handler: StmtId) -> &mut Self {
        self.push_edge(from, handler, EdgeKind::Exceptional)
    }

    fn push_edge(&mut self, from: StmtId, to: StmtId, kind: EdgeKind) -> &mut Self {
        debug_assert!(self.stmts.contains_key(&from), "edge from unknown {from}");
        debug_assert!(self.stmts.contains_key(&to), "edge to unknown {to}");
        self.succs
            .entry(from)
            .or_default()
            .push(Edge { from, to, kind });
        self
    }

    pub fn build(self) -> MethodGraph {
        let entry = self
            .entry
            .expect("method body built without any statement");
        MethodGraph {
            method: self.method,
            entry,
            exits: self.exits,
            stmts: self.stmts,
            succs: self.succs,
        }
    }
}
