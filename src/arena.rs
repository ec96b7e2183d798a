//! Index bookkeeping for dense collections that shrink by swap-remove.
//!
//! Removing slot `i` moves the last element into `i`. Candidate indices
//! recorded before a removal are therefore only valid if they are removed
//! from the highest index downwards, and any candidate that pointed at the
//! old last slot has to follow that element into the vacated slot.

use crate::error::EngineError;

/// Bounds-checked `swap_remove`.
pub fn swap_take<T>(items: &mut Vec<T>, index: usize, kind: &'static str) -> Result<T, EngineError> {
    if index >= items.len() {
        return Err(EngineError::StaleIndex {
            kind,
            index,
            len: items.len(),
        });
    }
    Ok(items.swap_remove(index))
}

/// Remaps candidates recorded before `removed` was swap-removed from a
/// collection whose last index was `old_last`, and orders them for removal
/// (descending).
///
/// A candidate equal to `old_last` now lives at `removed`. A candidate equal
/// to `removed` itself is gone and is an error.
pub fn resolve_candidates(
    candidates: &[usize],
    removed: usize,
    old_last: usize,
    kind: &'static str,
) -> Result<Vec<usize>, EngineError> {
    let mut resolved = Vec::with_capacity(candidates.len());
    for &index in candidates {
        if index == removed || index > old_last {
            return Err(EngineError::StaleIndex {
                kind,
                index,
                len: old_last + 1,
            });
        }
        resolved.push(if index == old_last { removed } else { index });
    }
    resolved.sort_unstable_by(|a, b| b.cmp(a));
    Ok(resolved)
}
