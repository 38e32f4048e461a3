//! Path selectors: priority scheduling of pending execution states.
//!
//! Every selector satisfies one contract: `offer`/`poll`/`peek`/`remove`/
//! `is_empty`/`close`, plus a `name` and a debug `queue` snapshot. Smaller
//! weight is dearer — the state closest to its current objective is expanded
//! first. Comparators are total and never panic: a state the distance
//! machinery knows nothing about weighs `INF` and sorts last, it does not
//! crash the queue.

pub mod base;
pub mod taint;

use crate::graph::{MethodRef, StmtId};
use crate::query::Query;
use std::cell::Cell;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use std::rc::Rc;
use tracing::warn;

/// Stable state identity, issued by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub u64);

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "st{}", self.0)
    }
}

/// A resource owned by a queued state (typically a solver context) that must
/// be released when the state leaves the scheduler without being executed.
pub trait Releasable {
    fn release(&self);
}

/// Release-exactly-once wrapper around a state's resources. `release` is
/// idempotent, so a selector may close after a removal path already released
/// some states without double-freeing anything.
#[derive(Default, Clone)]
pub struct StateResources {
    slots: Vec<Rc<dyn Releasable>>,
    released: Cell<bool>,
}

impl StateResources {
    pub fn new(slots: Vec<Rc<dyn Releasable>>) -> Self {
        Self {
            slots,
            released: Cell::new(false),
        }
    }

    pub fn release(&self) {
        if self.released.replace(true) {
            return;
        }
        for slot in &self.slots {
            slot.release();
        }
    }

    pub fn is_released(&self) -> bool {
        self.released.get()
    }
}

impl fmt::Debug for StateResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateResources")
            .field("slots", &self.slots.len())
            .field("released", &self.released.get())
            .finish()
    }
}

/// One frame of a state's call stack: the owning method and where execution
/// resumes in the caller.
#[derive(Debug, Clone)]
pub struct StackFrame {
    pub method: MethodRef,
    pub return_site: StmtId,
}

/// A pending symbolic execution state, produced by the external executor and
/// scheduled here.
#[derive(Debug)]
pub struct ExecutionState {
    pub id: StateId,
    /// Innermost method currently executing.
    pub method: MethodRef,
    /// Statement the state is about to execute.
    pub current: StmtId,
    /// Outer frames, outermost first.
    pub stack: Vec<StackFrame>,
    pub query: Query,
    /// Ordered history of visited statements.
    pub path: Vec<StmtId>,
    pub resources: StateResources,
}

impl ExecutionState {
    pub fn release_resources(&self) {
        self.resources.release();
    }
}

/// The scheduling contract every selector satisfies.
pub trait PathSelector {
    fn name(&self) -> &'static str;

    /// Insert a pending state. No ordering guarantee beyond queue invariants.
    fn offer(&mut self, state: ExecutionState);

    /// Remove and return the dearest state (smallest weight), `None` if empty.
    fn poll(&mut self) -> Option<ExecutionState>;

    /// Inspect the dearest state without removing it.
    fn peek(&self) -> Option<&ExecutionState>;

    /// Remove a specific state out of priority order, releasing its
    /// resources. Returns whether it was present.
    fn remove(&mut self, id: StateId) -> bool;

    fn is_empty(&self) -> bool;

    /// Debug snapshot: (state, weight) pairs, dearest first.
    fn queue(&self) -> Vec<(StateId, u64)>;

    /// Release the resources of every still-queued state. Safe on an empty
    /// or already-closed selector.
    fn close(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeapSlot {
    weight: u64,
    seq: u64,
    id: StateId,
}

impl Ord for HeapSlot {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // BinaryHeap is a max-heap; invert so the smallest weight surfaces,
        // with insertion order breaking ties.
        other
            .weight
            .cmp(&self.weight)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for HeapSlot {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-weight queue shared by the priority selectors. Weights are computed by
/// the owning selector at `offer` time.
#[derive(Default)]
pub(crate) struct WeightedQueue {
    heap: BinaryHeap<HeapSlot>,
    states: HashMap<StateId, (ExecutionState, u64)>,
    seq: u64,
    closed: bool,
}

impl WeightedQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offer(&mut self, state: ExecutionState, weight: u64) {
        if self.closed {
            // Cooperative cancellation already happened; never strand the
            // late arrival's resources.
            warn!(state = %state.id, "offer after close; releasing state");
            state.release_resources();
            return;
        }
        let slot = HeapSlot {
            weight,
            seq: self.seq,
            id: state.id,
        };
        self.seq += 1;
        self.heap.push(slot);
        self.states.insert(state.id, (state, weight));
    }

    pub fn poll(&mut self) -> Option<ExecutionState> {
        while let Some(slot) = self.heap.pop() {
            if let Some((state, _)) = self.states.remove(&slot.id) {
                return Some(state);
            }
            // Stale slot left behind by remove(); skip.
        }
        None
    }

    pub fn peek(&self) -> Option<&ExecutionState> {
        self.heap
            .iter()
            .filter(|slot| self.states.contains_key(&slot.id))
            .min_by_key(|slot| (slot.weight, slot.seq))
            .and_then(|slot| self.states.get(&slot.id))
            .map(|(state, _)| state)
    }

    pub fn remove(&mut self, id: StateId) -> bool {
        match self.states.remove(&id) {
            Some((state, _)) => {
                state.release_resources();
                true
            }
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn snapshot(&self) -> Vec<(StateId, u64)> {
        let mut out: Vec<(StateId, u64)> = self
            .states
            .values()
            .map(|(state, weight)| (state.id, *weight))
            .collect();
        out.sort_by_key(|(_, w)| *w);
        out
    }

    /// Drain and release everything. Idempotent.
    pub fn close(&mut self) {
        self.closed = true;
        for (_, (state, _)) in self.states.drain() {
            state.release_resources();
        }
        self.heap.clear();
    }

    /// Recompute weights in place (objective sets changed).
    pub fn reweigh(&mut self, weight_of: impl Fn(&ExecutionState) -> u64) {
        self.heap.clear();
        for (state, weight) in self.states.values_mut() {
            *weight = weight_of(state);
            self.heap.push(HeapSlot {
                weight: *weight,
                seq: self.seq,
                id: state.id,
            });
            self.seq += 1;
        }
    }
}

/// Build a minimal state for tests and benches.
pub fn test_state(id: u64, method: &str, current: StmtId, path: Vec<StmtId>) -> ExecutionState {
    ExecutionState {
        id: StateId(id),
        method: MethodRef::new(method),
        current,
        stack: Vec::new(),
        query: Query::new(),
        path,
        resources: StateResources::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_queue_polls_smallest_weight_first() {
        let mut q = WeightedQueue::new();
        q.offer(test_state(1, "m", StmtId(0), vec![]), 7);
        q.offer(test_state(2, "m", StmtId(1), vec![]), 3);
        q.offer(test_state(3, "m", StmtId(2), vec![]), 5);
        assert_eq!(q.poll().map(|s| s.id), Some(StateId(2)));
        assert_eq!(q.poll().map(|s| s.id), Some(StateId(3)));
        assert_eq!(q.poll().map(|s| s.id), Some(StateId(1)));
        assert!(q.poll().is_none());
    }

    #[test]
    fn test_ties_break_by_insertion_order() {
        let mut q = WeightedQueue::new();
        q.offer(test_state(1, "m", StmtId(0), vec![]), 4);
        q.offer(test_state(2, "m", StmtId(1), vec![]), 4);
        assert_eq!(q.poll().map(|s| s.id), Some(StateId(1)));
        assert_eq!(q.poll().map(|s| s.id), Some(StateId(2)));
    }

    #[test]
    fn test_peek_does_not_remove() {
        let mut q = WeightedQueue::new();
        q.offer(test_state(1, "m", StmtId(0), vec![]), 2);
        assert_eq!(q.peek().map(|s| s.id), Some(StateId(1)));
        assert!(!q.is_empty());
        assert_eq!(q.poll().map(|s| s.id), Some(StateId(1)));
    }

    #[test]
    fn test_remove_skips_stale_heap_slots() {
        let mut q = WeightedQueue::new();
        q.offer(test_state(1, "m", StmtId(0), vec![]), 1);
        q.offer(test_state(2, "m", StmtId(1), vec![]), 2);
        assert!(q.remove(StateId(1)));
        assert!(!q.remove(StateId(1)));
        assert_eq!(q.poll().map(|s| s.id), Some(StateId(2)));
    }

    struct CountingResource {
        count: Rc<Cell<u32>>,
    }

    impl Releasable for CountingResource {
        fn release(&self) {
            self.count.set(self.count.get() + 1);
        }
    }

    #[test]
    fn test_close_releases_each_state_exactly_once() {
        let count = Rc::new(Cell::new(0u32));
        let mut q = WeightedQueue::new();
        for id in 0..3 {
            let mut state = test_state(id, "m", StmtId(id), vec![]);
            state.resources = StateResources::new(vec![Rc::new(CountingResource {
                count: count.clone(),
            })]);
            q.offer(state, id);
        }
        q.close();
        assert_eq!(count.get(), 3);
        // Second close is a no-op on an already-empty queue.
        q.close();
        assert_eq!(count.get(), 3);
        assert!(q.is_empty());
    }

    #[test]
    fn test_release_is_idempotent_per_state() {
        let count = Rc::new(Cell::new(0u32));
        let res = StateResources::new(vec![Rc::new(CountingResource {
            count: count.clone(),
        })]);
        res.release();
        res.release();
        assert_eq!(count.get(), 1);
        assert!(res.is_released());
    }
}
