//! Method-body provider boundary.
//!
//! Bodies come from the excluded bytecode-loading layer. A body that cannot
//! be retrieved (native/abstract method) is a dead end for traversal, never
//! an error: lookups return `None` and successor queries yield zero edges.

use crate::graph::{MethodGraph, MethodRef};
use dashmap::DashMap;
use std::sync::Arc;

pub trait BodyProvider {
    fn can_retrieve(&self, method: &MethodRef) -> bool;
    fn body(&self, method: &MethodRef) -> Option<Arc<MethodGraph>>;
}

/// Memoizing wrapper: one lookup per method per run, misses cached too.
pub struct CachedBodyProvider<P> {
    inner: P,
    cache: DashMap<MethodRef, Option<Arc<MethodGraph>>>,
}

impl<P: BodyProvider> CachedBodyProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }
}

impl<P: BodyProvider> BodyProvider for CachedBodyProvider<P> {
    fn can_retrieve(&self, method: &MethodRef) -> bool {
        self.body(method).is_some()
    }

    fn body(&self, method: &MethodRef) -> Option<Arc<MethodGraph>> {
        if let Some(hit) = self.cache.get(method) {
            return hit.value().clone();
        }
        let loaded = if self.inner.can_retrieve(method) {
            self.inner.body(method)
        } else {
            None
        };
        self.cache.insert(method.clone(), loaded.clone());
        loaded
    }
}

/// In-memory provider over pre-built bodies. The test and bench surface, and
/// the shape the instrumentation layer hands over in production.
#[derive(Default)]
pub struct StaticBodies {
    bodies: DashMap<MethodRef, Arc<MethodGraph>>,
}

impl StaticBodies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, graph: MethodGraph) {
        self.bodies
            .insert(graph.method().clone(), Arc::new(graph));
    }
}

impl BodyProvider for StaticBodies {
    fn can_retrieve(&self, method: &MethodRef) -> bool {
        self.bodies.contains_key(method)
    }

    fn body(&self, method: &MethodRef) -> Option<Arc<MethodGraph>> {
        self.bodies.get(method).map(|g| g.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{MethodGraphBuilder, StmtIdGen, StmtKind};

    #[test]
    fn test_missing_body_is_a_dead_end_not_an_error() {
        let provider = StaticBodies::new();
        let native = MethodRef::new("native_method");
        assert!(!provider.can_retrieve(&native));
        assert!(provider.body(&native).is_none());
    }

    #[test]
    fn test_cached_provider_returns_same_arc() {
        let inner = StaticBodies::new();
        let mut ids = StmtIdGen::new();
        let mut b = MethodGraphBuilder::new(MethodRef::new("m"));
        b.add_stmt(&mut ids, StmtKind::Exit);
        inner.insert(b.build());

        let cached = CachedBodyProvider::new(inner);
        let m = MethodRef::new("m");
        let first = cached.body(&m).expect("body present");
        let second = cached.body(&m).expect("body present");
        assert!(Arc::ptr_eq(&first, &second));
    }
}
