use thiserror::Error;

/// Typed, catchable conditions surfaced by the constraint-resolution layer.
///
/// `NotSupported` is an expected, frequent outcome ("this shape has no
/// translation rule"), returned as a value rather than thrown: callers fall
/// back to passing the fact to the solver as an opaque constraint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("constraint resolver does not support expression shape: {0}")]
    NotSupported(&'static str),
}
