//! First-class invariants over a committed version chain.
//!
//! Invariants are logical properties every committed history must keep.
//! They are testable independently and the vault checks them in debug
//! builds after every append.

use super::GameState;

/// A logical property that must hold for a given state.
pub trait Invariant<S: ?Sized> {
    /// Checks if the invariant holds for the given state.
    fn holds(state: &S) -> bool;

    /// Human-readable description of the invariant.
    fn description() -> &'static str;
}

/// Violation of an invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub description: String,
}

impl InvariantViolation {
    /// Creates a new invariant violation.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// A set of invariants that can be checked together.
///
/// Implementations are provided for tuples.
pub trait InvariantSet<S: ?Sized> {
    /// Checks all invariants in the set, collecting every violation.
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>>;
}

fn collect(checks: &[(bool, &'static str)]) -> Result<(), Vec<InvariantViolation>> {
    let violations: Vec<_> = checks
        .iter()
        .filter(|(holds, _)| !holds)
        .map(|(_, description)| InvariantViolation::new(*description))
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

impl<S, I1, I2> InvariantSet<S> for (I1, I2)
where
    S: ?Sized,
    I1: Invariant<S>,
    I2: Invariant<S>,
{
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
        collect(&[
            (I1::holds(state), I1::description()),
            (I2::holds(state), I2::description()),
        ])
    }
}

impl<S, I1, I2, I3, I4> InvariantSet<S> for (I1, I2, I3, I4)
where
    S: ?Sized,
    I1: Invariant<S>,
    I2: Invariant<S>,
    I3: Invariant<S>,
    I4: Invariant<S>,
{
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
        collect(&[
            (I1::holds(state), I1::description()),
            (I2::holds(state), I2::description()),
            (I3::holds(state), I3::description()),
            (I4::holds(state), I4::description()),
        ])
    }
}

/// Committed versions of one game, oldest first.
pub type VersionChain = [GameState];

pub mod alternating_turn;
pub mod completion_consistent;
pub mod monotonic_board;
pub mod version_sequence;

pub use alternating_turn::AlternatingTurnInvariant;
pub use completion_consistent::CompletionConsistentInvariant;
pub use monotonic_board::MonotonicBoardInvariant;
pub use version_sequence::VersionSequenceInvariant;

/// All chain invariants as a composable set.
pub type ChainInvariants = (
    MonotonicBoardInvariant,
    AlternatingTurnInvariant,
    CompletionConsistentInvariant,
    VersionSequenceInvariant,
);

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::games::tictactoe::{GameState, PartyId, Position};

    /// Plays `moves` from a fresh Alice-vs-Bob game, returning every version.
    pub fn chain_of(moves: &[Position]) -> Vec<GameState> {
        let mut chain = vec![GameState::genesis(PartyId::from("Alice"), PartyId::from("Bob"))];
        for position in moves {
            let current = chain.last().unwrap().clone();
            let mover = current.active_player().clone();
            chain.push(current.apply_move(&mover, *position).unwrap());
        }
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::chain_of;
    use super::*;
    use crate::games::tictactoe::Position;

    #[test]
    fn test_invariant_set_holds_for_genesis() {
        let chain = chain_of(&[]);
        assert!(ChainInvariants::check_all(chain.as_slice()).is_ok());
    }

    #[test]
    fn test_invariant_set_holds_after_moves() {
        let chain = chain_of(&[Position::TopLeft, Position::Center, Position::TopRight]);
        assert!(ChainInvariants::check_all(chain.as_slice()).is_ok());
    }

    #[test]
    fn test_invariant_set_detects_violations() {
        let mut chain = chain_of(&[Position::Center]);
        let corrupted = chain[1].clone().with_version(7).with_complete(true);
        chain[1] = corrupted;

        let violations = ChainInvariants::check_all(chain.as_slice()).unwrap_err();
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn test_two_invariants_as_set() {
        type TwoInvariants = (MonotonicBoardInvariant, AlternatingTurnInvariant);
        let chain = chain_of(&[Position::Center, Position::TopLeft]);
        assert!(TwoInvariants::check_all(chain.as_slice()).is_ok());
    }
}
