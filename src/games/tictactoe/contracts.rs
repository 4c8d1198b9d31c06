//! Contract-based validation of state transitions.
//!
//! Every rule is a small type implementing [`TransitionRule`]. Contracts
//! compose rules in a fixed order and report the first one that fails.
//! The same code runs on the proposing side (fail fast, before any
//! network traffic) and on the endorsing side (never trust the proposer).

use super::action::{Command, MoveError};
use super::rules::evaluate;
use super::{GameState, PartyId};
use tracing::{instrument, warn};

// ─────────────────────────────────────────────────────────────
//  Rule Trait
// ─────────────────────────────────────────────────────────────

/// A single legality rule over `previous -> candidate` by `mover`.
pub trait TransitionRule {
    /// Checks the rule, returning the reason it fails.
    fn check(
        previous: &GameState,
        candidate: &GameState,
        mover: &PartyId,
    ) -> Result<(), MoveError>;
}

// ─────────────────────────────────────────────────────────────
//  Play Rules
// ─────────────────────────────────────────────────────────────

/// Candidate extends exactly this game, one version later, same players.
pub struct ExtendsPrevious;

impl TransitionRule for ExtendsPrevious {
    fn check(
        previous: &GameState,
        candidate: &GameState,
        _mover: &PartyId,
    ) -> Result<(), MoveError> {
        let linked = candidate.id() == previous.id()
            && candidate.player_a() == previous.player_a()
            && candidate.player_b() == previous.player_b()
            && *candidate.version() == previous.version() + 1;
        if linked {
            Ok(())
        } else {
            Err(MoveError::BrokenLink {
                game_id: previous.id().clone(),
                version: *previous.version(),
            })
        }
    }
}

/// The previous version must not be finished.
pub struct NotAlreadyComplete;

impl TransitionRule for NotAlreadyComplete {
    fn check(
        previous: &GameState,
        _candidate: &GameState,
        _mover: &PartyId,
    ) -> Result<(), MoveError> {
        if *previous.complete() {
            Err(MoveError::GameComplete)
        } else {
            Ok(())
        }
    }
}

/// The mover must be the previous version's active player.
pub struct CorrectMover;

impl TransitionRule for CorrectMover {
    fn check(
        previous: &GameState,
        _candidate: &GameState,
        mover: &PartyId,
    ) -> Result<(), MoveError> {
        if !previous.is_participant(mover) {
            return Err(MoveError::NotAParticipant(mover.clone()));
        }
        if mover != previous.active_player() {
            return Err(MoveError::WrongMover {
                expected: previous.active_player().clone(),
                actual: mover.clone(),
            });
        }
        Ok(())
    }
}

/// Exactly one cell changes, from empty to the mover's mark.
pub struct SingleNewMark;

impl TransitionRule for SingleNewMark {
    fn check(
        previous: &GameState,
        candidate: &GameState,
        mover: &PartyId,
    ) -> Result<(), MoveError> {
        let changed = previous.board().diff(candidate.board());
        let position = match changed.as_slice() {
            [] => return Err(MoveError::NoCellMarked),
            [position] => *position,
            many => return Err(MoveError::MultipleCellsChanged(many.len())),
        };

        if !previous.board().is_empty(position) {
            return Err(MoveError::SquareOccupied(position));
        }

        let seat = previous
            .seat_of(mover)
            .ok_or_else(|| MoveError::NotAParticipant(mover.clone()))?;
        if candidate.board().get(position) != super::Square::Occupied(seat) {
            return Err(MoveError::WrongMark {
                position,
                expected: seat,
            });
        }
        Ok(())
    }
}

/// The turn passes to the previous active player's opponent.
pub struct TurnFlips;

impl TransitionRule for TurnFlips {
    fn check(
        previous: &GameState,
        candidate: &GameState,
        _mover: &PartyId,
    ) -> Result<(), MoveError> {
        let opponent = previous
            .opponent_of(previous.active_player())
            .ok_or_else(|| MoveError::NotAParticipant(previous.active_player().clone()))?;
        if candidate.active_player() != opponent {
            Err(MoveError::TurnNotFlipped(opponent.clone()))
        } else {
            Ok(())
        }
    }
}

/// `complete` is exactly "the board is won or full".
pub struct CompletionConsistent;

impl CompletionConsistent {
    /// Checks a single state in isolation.
    pub fn check_state(candidate: &GameState) -> Result<(), MoveError> {
        let actual = evaluate(candidate.board()).is_complete();
        if *candidate.complete() != actual {
            Err(MoveError::CompletionMismatch {
                claimed: *candidate.complete(),
                actual,
            })
        } else {
            Ok(())
        }
    }
}

impl TransitionRule for CompletionConsistent {
    fn check(
        _previous: &GameState,
        candidate: &GameState,
        _mover: &PartyId,
    ) -> Result<(), MoveError> {
        Self::check_state(candidate)
    }
}

/// `winner` is set iff a line is won, and names the party holding it.
///
/// Only the mover can have completed a line this turn, so a consistent
/// winner is always the mover.
pub struct WinnerConsistent;

impl WinnerConsistent {
    /// Checks a single state in isolation.
    pub fn check_state(candidate: &GameState) -> Result<(), MoveError> {
        let actual = evaluate(candidate.board())
            .winning_seat()
            .map(|seat| candidate.party_at(seat).clone());
        if *candidate.winner() != actual {
            Err(MoveError::WinnerMismatch {
                claimed: candidate.winner().clone(),
                actual,
            })
        } else {
            Ok(())
        }
    }
}

impl TransitionRule for WinnerConsistent {
    fn check(
        _previous: &GameState,
        candidate: &GameState,
        _mover: &PartyId,
    ) -> Result<(), MoveError> {
        Self::check_state(candidate)
    }
}

// ─────────────────────────────────────────────────────────────
//  Contracts
// ─────────────────────────────────────────────────────────────

/// Contract for play transitions.
///
/// Rules, in order:
/// - Candidate extends the previous version
/// - Previous version is not complete
/// - Mover is the active player
/// - Exactly one new mark, the mover's, on an empty cell
/// - Turn passes to the opponent
/// - Completion flag matches the board
/// - Winner matches the board
pub struct PlayContract;

impl PlayContract {
    /// Validates a play transition; the first failing rule is reported.
    #[instrument(
        skip(previous, candidate),
        fields(game_id = %previous.id(), version = previous.version())
    )]
    pub fn verify(
        previous: &GameState,
        candidate: &GameState,
        mover: &PartyId,
    ) -> Result<(), MoveError> {
        ExtendsPrevious::check(previous, candidate, mover)?;
        NotAlreadyComplete::check(previous, candidate, mover)?;
        CorrectMover::check(previous, candidate, mover)?;
        SingleNewMark::check(previous, candidate, mover)?;
        TurnFlips::check(previous, candidate, mover)?;
        CompletionConsistent::check(previous, candidate, mover)?;
        WinnerConsistent::check(previous, candidate, mover)?;
        Ok(())
    }
}

/// Contract for create transitions.
///
/// A genesis version has no predecessor, two distinct players, an empty
/// board, player A to move, and is neither complete nor won.
pub struct CreateContract;

impl CreateContract {
    /// Validates a create transition.
    #[instrument(skip(previous, candidate), fields(game_id = %candidate.id()))]
    pub fn verify(previous: Option<&GameState>, candidate: &GameState) -> Result<(), MoveError> {
        if previous.is_some() || *candidate.version() != 0 {
            return Err(MoveError::NotGenesis);
        }
        if candidate.player_a() == candidate.player_b() {
            return Err(MoveError::SameParties(candidate.player_a().clone()));
        }
        if !candidate.board().is_blank() {
            return Err(MoveError::BoardNotEmpty);
        }
        if candidate.active_player() != candidate.player_a() {
            return Err(MoveError::FirstMoverNotPlayerA(candidate.player_a().clone()));
        }
        if *candidate.complete() || candidate.winner().is_some() {
            return Err(MoveError::GenesisFinished);
        }
        Ok(())
    }
}

/// Validates any transition according to its command.
///
/// `previous` is `None` only for [`Command::Create`].
#[instrument(skip(previous, candidate), fields(game_id = %candidate.id()))]
pub fn validate(
    previous: Option<&GameState>,
    candidate: &GameState,
    command: &Command,
    mover: &PartyId,
) -> Result<(), MoveError> {
    let result = match command {
        Command::Create => {
            if !candidate.is_participant(mover) {
                Err(MoveError::NotAParticipant(mover.clone()))
            } else {
                CreateContract::verify(previous, candidate)
            }
        }
        Command::Play { position } => match previous {
            None => Err(MoveError::MissingPredecessor),
            Some(previous) => PlayContract::verify(previous, candidate, mover).and_then(|()| {
                // The command must describe the change actually made.
                if previous.board().diff(candidate.board()) == [*position] {
                    Ok(())
                } else {
                    Err(MoveError::CommandMismatch(*position))
                }
            }),
        },
    };

    if let Err(ref reason) = result {
        warn!(%command, %mover, %reason, "Transition rejected");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::tictactoe::{Board, Position, Seat};

    fn alice() -> PartyId {
        PartyId::from("Alice")
    }

    fn bob() -> PartyId {
        PartyId::from("Bob")
    }

    fn new_game() -> GameState {
        GameState::genesis(alice(), bob())
    }

    #[test]
    fn test_create_accepts_genesis() {
        assert!(CreateContract::verify(None, &new_game()).is_ok());
    }

    #[test]
    fn test_create_rejects_marked_board() {
        let game = new_game().with_board(Board::new().with_mark(Position::Center, Seat::A));
        assert_eq!(CreateContract::verify(None, &game), Err(MoveError::BoardNotEmpty));
    }

    #[test]
    fn test_create_rejects_predecessor() {
        let game = new_game();
        assert_eq!(
            CreateContract::verify(Some(&game), &game),
            Err(MoveError::NotGenesis)
        );
    }

    #[test]
    fn test_create_rejects_self_play() {
        let game = GameState::genesis(alice(), alice());
        assert_eq!(
            CreateContract::verify(None, &game),
            Err(MoveError::SameParties(alice()))
        );
    }

    #[test]
    fn test_play_rules_report_first_failure() {
        let previous = new_game();
        // Bob moves out of turn and forgets to flip it: wrong mover wins.
        let candidate = previous
            .apply_move(&bob(), Position::Center)
            .unwrap()
            .with_active_player(bob());
        assert_eq!(
            PlayContract::verify(&previous, &candidate, &bob()),
            Err(MoveError::WrongMover {
                expected: alice(),
                actual: bob()
            })
        );
    }

    #[test]
    fn test_play_rejects_stale_version() {
        let previous = new_game();
        let candidate = previous
            .apply_move(&alice(), Position::Center)
            .unwrap()
            .with_version(5);
        assert!(matches!(
            PlayContract::verify(&previous, &candidate, &alice()),
            Err(MoveError::BrokenLink { version: 0, .. })
        ));
    }

    #[test]
    fn test_command_must_match_change() {
        let previous = new_game();
        let candidate = previous.apply_move(&alice(), Position::Center).unwrap();
        let command = Command::Play {
            position: Position::TopLeft,
        };
        assert_eq!(
            validate(Some(&previous), &candidate, &command, &alice()),
            Err(MoveError::CommandMismatch(Position::TopLeft))
        );
    }

    #[test]
    fn test_play_without_predecessor_rejected() {
        let candidate = new_game();
        let command = Command::Play {
            position: Position::Center,
        };
        assert_eq!(
            validate(None, &candidate, &command, &alice()),
            Err(MoveError::MissingPredecessor)
        );
    }
}
