//! Declared taint flows.
//!
//! A flow maps one source program point to the sink points its data may
//! reach. The configuration is produced by the excluded loader layer; this
//! core only consumes it, keyed by stable statement+method identity. Serde
//! derives keep the wire shape in one place.

use crate::graph::{ProgramPoint, StmtId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaintFlow {
    pub source: ProgramPoint,
    pub sinks: Vec<ProgramPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaintConfig {
    flows: Vec<TaintFlow>,
}

impl TaintConfig {
    pub fn new(flows: Vec<TaintFlow>) -> Self {
        Self { flows }
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    pub fn sources(&self) -> Vec<ProgramPoint> {
        self.flows.iter().map(|f| f.source.clone()).collect()
    }

    pub fn sinks_for(&self, source: &ProgramPoint) -> &[ProgramPoint] {
        self.flows
            .iter()
            .find(|f| f.source == *source)
            .map(|f| f.sinks.as_slice())
            .unwrap_or(&[])
    }

    /// Sources whose statement appears in the given path history.
    pub fn sources_on_path(&self, path: &[StmtId]) -> Vec<&ProgramPoint> {
        let visited: HashSet<StmtId> = path.iter().copied().collect();
        self.flows
            .iter()
            .map(|f| &f.source)
            .filter(|p| visited.contains(&p.stmt))
            .collect()
    }

    /// Union of the sinks registered against every visited source.
    pub fn sinks_for_path(&self, path: &[StmtId]) -> Vec<ProgramPoint> {
        let visited: HashSet<StmtId> = path.iter().copied().collect();
        let mut out: Vec<ProgramPoint> = Vec::new();
        for flow in &self.flows {
            if visited.contains(&flow.source.stmt) {
                for sink in &flow.sinks {
                    if !out.contains(sink) {
                        out.push(sink.clone());
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MethodRef;

    fn p(method: &str, stmt: u64) -> ProgramPoint {
        ProgramPoint::new(MethodRef::new(method), StmtId(stmt))
    }

    fn config() -> TaintConfig {
        TaintConfig::new(vec![
            TaintFlow {
                source: p("read", 1),
                sinks: vec![p("exec", 10), p("log", 11)],
            },
            TaintFlow {
                source: p("recv", 2),
                sinks: vec![p("exec", 10)],
            },
        ])
    }

    #[test]
    fn test_sources_on_path_uses_prefix_membership() {
        let cfg = config();
        assert!(cfg.sources_on_path(&[StmtId(5), StmtId(6)]).is_empty());
        let hit = cfg.sources_on_path(&[StmtId(5), StmtId(1)]);
        assert_eq!(hit, vec![&p("read", 1)]);
    }

    #[test]
    fn test_sinks_union_over_visited_sources_dedupes() {
        let cfg = config();
        let sinks = cfg.sinks_for_path(&[StmtId(1), StmtId(2)]);
        assert_eq!(sinks, vec![p("exec", 10), p("log", 11)]);
    }

    #[test]
    fn test_round_trips_through_json() {
        let cfg = config();
        let text = serde_json::to_string(&cfg).expect("serializes");
        let back: TaintConfig = serde_json::from_str(&text).expect("parses");
        assert_eq!(back, cfg);
    }
}
