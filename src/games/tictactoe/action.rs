//! Commands and the error raised when a transition is illegal.
//!
//! A command is the intent behind a transition. It travels with the
//! candidate state so every party validates the same thing.

use super::types::{GameId, PartyId, Seat};
use super::Position;
use serde::{Deserialize, Serialize};

/// Intent behind a proposed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    /// Bring a new game into existence (version 0).
    Create,
    /// Place the mover's mark.
    Play {
        /// Cell being marked.
        position: Position,
    },
}

impl Command {
    /// Stable tag byte used when hashing a transition.
    pub(crate) fn tag(&self) -> [u8; 2] {
        match self {
            Command::Create => [0, 0],
            Command::Play { position } => [1, position.to_index() as u8],
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Create => write!(f, "create"),
            Command::Play { position } => write!(f, "play {}", position),
        }
    }
}

/// Reason a proposed transition is not legal.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum MoveError {
    /// Coordinates fall outside the 3x3 grid.
    #[display("Position ({row}, {column}) is off the board")]
    OutOfBounds {
        /// Requested row.
        row: usize,
        /// Requested column.
        column: usize,
    },

    /// The game has already finished.
    #[display("Game is already complete")]
    GameComplete,

    /// Mover is not one of the game's two players.
    #[display("{} is not a player in this game", _0)]
    NotAParticipant(PartyId),

    /// It's not this party's turn.
    #[display("It's {expected}'s turn, not {actual}'s")]
    WrongMover {
        /// Party whose turn it is.
        expected: PartyId,
        /// Party that attempted the move.
        actual: PartyId,
    },

    /// Candidate is not the direct successor of the previous version.
    #[display("Candidate does not extend game {game_id} version {version}")]
    BrokenLink {
        /// Game being extended.
        game_id: GameId,
        /// Version the candidate claims to extend.
        version: u64,
    },

    /// The candidate board is identical to the previous one.
    #[display("No cell was marked")]
    NoCellMarked,

    /// More than one cell changed.
    #[display("{} cells changed, exactly one must", _0)]
    MultipleCellsChanged(usize),

    /// The changed cell was already marked.
    #[display("Square {} is already occupied", _0)]
    SquareOccupied(Position),

    /// The changed cell does not carry the mover's mark.
    #[display("Square {position} must carry seat {expected:?}'s mark")]
    WrongMark {
        /// Changed cell.
        position: Position,
        /// Seat whose mark was required.
        expected: Seat,
    },

    /// The candidate does not hand the turn to the opponent.
    #[display("Turn must pass to {}", _0)]
    TurnNotFlipped(PartyId),

    /// `complete` disagrees with the board.
    #[display("Game marked complete={claimed} but board says complete={actual}")]
    CompletionMismatch {
        /// Value carried by the candidate.
        claimed: bool,
        /// Value computed from the board.
        actual: bool,
    },

    /// `winner` disagrees with the board.
    #[display("Winner {claimed:?} does not match board winner {actual:?}")]
    WinnerMismatch {
        /// Winner carried by the candidate.
        claimed: Option<PartyId>,
        /// Winner computed from the board.
        actual: Option<PartyId>,
    },

    /// A create transition must not consume a previous version.
    #[display("A new game cannot have a predecessor")]
    NotGenesis,

    /// A new game must start with an empty board.
    #[display("A new game must start with an empty board")]
    BoardNotEmpty,

    /// A new game must start with player A to move.
    #[display("A new game must start with {} to move", _0)]
    FirstMoverNotPlayerA(PartyId),

    /// A new game cannot start complete or with a winner.
    #[display("A new game cannot start complete or with a winner")]
    GenesisFinished,

    /// A game needs two distinct parties.
    #[display("{} cannot play against themselves", _0)]
    SameParties(PartyId),

    /// The command names a different cell than the one marked.
    #[display("Command names {} but a different cell was marked", _0)]
    CommandMismatch(Position),

    /// A play transition needs the version it consumes.
    #[display("A move needs the version it extends")]
    MissingPredecessor,
}

impl std::error::Error for MoveError {}
