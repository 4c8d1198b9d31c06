//! Monotonic board invariant: marks are never erased or overwritten.

use super::super::Position;
use super::{Invariant, VersionChain};

/// Invariant: between consecutive versions exactly one cell changes, and it
/// changes from empty to a mark.
pub struct MonotonicBoardInvariant;

impl Invariant<VersionChain> for MonotonicBoardInvariant {
    fn holds(chain: &VersionChain) -> bool {
        chain.windows(2).all(|pair| {
            let (before, after) = (pair[0].board(), pair[1].board());
            let changed: Vec<Position> = before.diff(after);
            changed.len() == 1 && before.is_empty(changed[0])
        })
    }

    fn description() -> &'static str {
        "Each version marks exactly one previously empty cell"
    }
}
