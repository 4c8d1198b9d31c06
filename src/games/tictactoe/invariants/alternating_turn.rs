//! Alternating turn invariant: A, B, A, B, ...

use super::{Invariant, VersionChain};

/// Invariant: players alternate turns across committed versions.
///
/// Player A is active at genesis; every later version hands the turn to
/// the other player.
pub struct AlternatingTurnInvariant;

impl Invariant<VersionChain> for AlternatingTurnInvariant {
    fn holds(chain: &VersionChain) -> bool {
        let Some(first) = chain.first() else {
            return true;
        };

        if *first.version() == 0 && first.active_player() != first.player_a() {
            return false;
        }

        chain
            .windows(2)
            .all(|pair| {
                pair[0].opponent_of(pair[0].active_player()) == Some(pair[1].active_player())
            })
    }

    fn description() -> &'static str {
        "Players alternate turns (A, B, A, B, ...)"
    }
}
