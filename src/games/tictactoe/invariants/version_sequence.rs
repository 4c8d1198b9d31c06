//! Version sequence invariant: one game, consecutive versions.

use super::{Invariant, VersionChain};

/// Invariant: every version belongs to the same game and players, and
/// versions increase by exactly one.
pub struct VersionSequenceInvariant;

impl Invariant<VersionChain> for VersionSequenceInvariant {
    fn holds(chain: &VersionChain) -> bool {
        chain.windows(2).all(|pair| {
            pair[1].id() == pair[0].id()
                && pair[1].participants() == pair[0].participants()
                && *pair[1].version() == pair[0].version() + 1
        })
    }

    fn description() -> &'static str {
        "Versions of one game increase by exactly one"
    }
}
