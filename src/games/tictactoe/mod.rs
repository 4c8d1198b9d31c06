//! Tic-tac-toe: board model, rules, and transition validation.

mod action;
mod contracts;
mod invariants;
mod position;
mod rules;
mod state;
mod types;

pub use action::{Command, MoveError};
pub use contracts::{
    CompletionConsistent, CorrectMover, CreateContract, ExtendsPrevious, NotAlreadyComplete,
    PlayContract, SingleNewMark, TransitionRule, TurnFlips, WinnerConsistent, validate,
};
pub use invariants::{
    AlternatingTurnInvariant, ChainInvariants, CompletionConsistentInvariant, Invariant,
    InvariantSet, InvariantViolation, MonotonicBoardInvariant, VersionChain,
    VersionSequenceInvariant,
};
pub use position::Position;
pub use rules::{Evaluation, WINNING_LINES, check_winner, evaluate, is_full};
pub use state::{GameState, GameStatus, StateDigest, StateRef};
pub use types::{Board, BoardError, GameId, PartyId, Seat, Square};
