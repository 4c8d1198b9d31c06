//! Completion invariant: `complete` and `winner` follow from the board, and
//! nothing follows a completed version.

use super::super::contracts::{CompletionConsistent, WinnerConsistent};
use super::{Invariant, VersionChain};

/// Invariant: every version's completion flag and winner agree with its
/// board, and a complete version is the last one in the chain.
pub struct CompletionConsistentInvariant;

impl Invariant<VersionChain> for CompletionConsistentInvariant {
    fn holds(chain: &VersionChain) -> bool {
        let consistent = chain.iter().all(|state| {
            CompletionConsistent::check_state(state).is_ok()
                && WinnerConsistent::check_state(state).is_ok()
        });
        let terminal_last = chain
            .iter()
            .position(|state| *state.complete())
            .is_none_or(|index| index + 1 == chain.len());
        consistent && terminal_last
    }

    fn description() -> &'static str {
        "Completion and winner match the board; nothing follows completion"
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::chain_of;
    use super::*;
    use crate::games::tictactoe::{PartyId, Position};

    fn won_chain() -> Vec<crate::games::tictactoe::GameState> {
        // Alice: top row. Bob: middle row, one short.
        chain_of(&[
            Position::TopLeft,
            Position::MiddleLeft,
            Position::TopCenter,
            Position::Center,
            Position::TopRight,
        ])
    }

    #[test]
    fn test_won_chain_holds() {
        let chain = won_chain();
        assert!(*chain.last().unwrap().complete());
        assert!(CompletionConsistentInvariant::holds(chain.as_slice()));
    }

    #[test]
    fn test_forged_winner_violates() {
        let mut chain = chain_of(&[Position::Center]);
        chain[1] = chain[1].clone().with_winner(Some(PartyId::from("Alice")));
        assert!(!CompletionConsistentInvariant::holds(chain.as_slice()));
    }

    #[test]
    fn test_version_after_completion_violates() {
        let mut chain = won_chain();
        let last = chain.last().unwrap().clone();
        let after = last
            .apply_move(&PartyId::from("Bob"), Position::BottomLeft)
            .unwrap()
            .with_complete(true)
            .with_winner(Some(PartyId::from("Alice")));
        chain.push(after);
        assert!(!CompletionConsistentInvariant::holds(chain.as_slice()));
    }
}
