use thiserror::Error;

/// Invariant violations inside the aggregation engine.
///
/// None of these are recoverable: the caller is expected to abort the
/// simulation, the world state is undefined once one is returned from a step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A geometric summary was requested from a cluster with no members.
    #[error("cluster has no particles; size, centre and radius are undefined")]
    EmptyCluster,
    /// A recorded candidate index no longer refers to a live entity.
    #[error("stale {kind} index {index} (collection holds {len})")]
    StaleIndex {
        kind: &'static str,
        index: usize,
        len: usize,
    },
    /// The lattice dimension is not one the engine was built for.
    #[error("unsupported lattice dimension {0}")]
    UnsupportedDimension(usize),
}
