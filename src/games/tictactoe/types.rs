//! Core domain types for two-party tic-tac-toe.

use super::position::Position;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Legal name of a party taking part in a game (or arbitrating it).
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct PartyId(String);

impl PartyId {
    /// Creates a party identifier from a legal name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the legal name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PartyId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// Stable identifier of a game, shared by every version of it.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    /// Generates a fresh random 128-bit identifier.
    pub fn generate() -> Self {
        let bytes: [u8; 16] = rand::random();
        Self(hex::encode(bytes))
    }

    /// Wraps an existing identifier (e.g. one parsed from a request path).
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One of the two seats at the table.
///
/// Seat A always opens the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seat {
    /// First player's seat.
    A,
    /// Second player's seat.
    B,
}

impl Seat {
    /// Returns the opposing seat.
    pub fn opponent(self) -> Self {
        match self {
            Seat::A => Seat::B,
            Seat::B => Seat::A,
        }
    }
}

/// A cell on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Square {
    /// Nobody has marked this cell.
    Empty,
    /// Cell carries a seat's mark.
    Occupied(Seat),
}

impl Square {
    /// Integer code used by [`Board::from_codes`] and [`Board::to_codes`].
    pub fn code(self) -> i8 {
        match self {
            Square::Empty => -1,
            Square::Occupied(Seat::A) => 0,
            Square::Occupied(Seat::B) => 1,
        }
    }

    /// Decodes a cell code, rejecting anything outside the alphabet.
    pub fn from_code(code: i8) -> Result<Self, BoardError> {
        match code {
            -1 => Ok(Square::Empty),
            0 => Ok(Square::Occupied(Seat::A)),
            1 => Ok(Square::Occupied(Seat::B)),
            other => Err(BoardError::IllegalCode(other)),
        }
    }
}

/// Error raised while constructing a board from raw codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum BoardError {
    /// A cell code is not one of -1 (empty), 0 (seat A) or 1 (seat B).
    #[display("Illegal cell code {}", _0)]
    IllegalCode(i8),
}

impl std::error::Error for BoardError {}

/// Immutable 3x3 board.
///
/// Placing a mark produces a new board; a value never changes once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Board {
    cells: [[Square; 3]; 3],
}

impl Board {
    /// Creates an all-empty board.
    pub fn new() -> Self {
        Self {
            cells: [[Square::Empty; 3]; 3],
        }
    }

    /// Builds a board from integer codes (-1 empty, 0 seat A, 1 seat B).
    #[instrument]
    pub fn from_codes(codes: [[i8; 3]; 3]) -> Result<Self, BoardError> {
        let mut cells = [[Square::Empty; 3]; 3];
        for (row, line) in codes.iter().enumerate() {
            for (col, code) in line.iter().enumerate() {
                cells[row][col] = Square::from_code(*code)?;
            }
        }
        Ok(Self { cells })
    }

    /// Returns the board as integer codes.
    pub fn to_codes(&self) -> [[i8; 3]; 3] {
        self.cells.map(|line| line.map(Square::code))
    }

    /// Gets the square at the given position.
    pub fn get(&self, pos: Position) -> Square {
        self.cells[pos.row()][pos.column()]
    }

    /// Returns a copy of this board with `seat`'s mark at `pos`.
    ///
    /// Overwrites whatever was there; legality is the validator's job.
    pub fn with_mark(&self, pos: Position, seat: Seat) -> Self {
        let mut cells = self.cells;
        cells[pos.row()][pos.column()] = Square::Occupied(seat);
        Self { cells }
    }

    /// Checks if a square is empty.
    pub fn is_empty(&self, pos: Position) -> bool {
        self.get(pos) == Square::Empty
    }

    /// True when no cell has been marked.
    pub fn is_blank(&self) -> bool {
        Position::ALL.iter().all(|pos| self.is_empty(*pos))
    }

    /// Positions whose squares differ between `self` and `other`.
    pub fn diff(&self, other: &Board) -> Vec<Position> {
        Position::ALL
            .iter()
            .copied()
            .filter(|pos| self.get(*pos) != other.get(*pos))
            .collect()
    }

    /// Returns all squares as rows.
    pub fn rows(&self) -> &[[Square; 3]; 3] {
        &self.cells
    }

    /// Formats the board as a human-readable string.
    pub fn display(&self) -> String {
        let mut result = String::new();
        for (row, line) in self.cells.iter().enumerate() {
            for (col, square) in line.iter().enumerate() {
                let symbol = match square {
                    Square::Empty => (row * 3 + col + 1).to_string(),
                    Square::Occupied(Seat::A) => "A".to_string(),
                    Square::Occupied(Seat::B) => "B".to_string(),
                };
                result.push_str(&symbol);
                if col < 2 {
                    result.push('|');
                }
            }
            if row < 2 {
                result.push_str("\n-+-+-\n");
            }
        }
        result
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_codes_round_trips_legal_alphabet() {
        let codes = [[0, 1, -1], [-1, 0, -1], [1, -1, -1]];
        let board = Board::from_codes(codes).expect("legal codes");
        assert_eq!(board.get(Position::TopLeft), Square::Occupied(Seat::A));
        assert_eq!(board.get(Position::TopCenter), Square::Occupied(Seat::B));
        assert_eq!(board.to_codes(), codes);
    }

    #[test]
    fn test_from_codes_rejects_illegal_code() {
        let codes = [[-1, -1, -1], [-1, 2, -1], [-1, -1, -1]];
        assert_eq!(Board::from_codes(codes), Err(BoardError::IllegalCode(2)));
    }

    #[test]
    fn test_with_mark_leaves_original_untouched() {
        let board = Board::new();
        let marked = board.with_mark(Position::Center, Seat::A);
        assert!(board.is_blank());
        assert_eq!(marked.get(Position::Center), Square::Occupied(Seat::A));
        assert_eq!(board.diff(&marked), vec![Position::Center]);
    }

    #[test]
    fn test_structural_equality() {
        let a = Board::new().with_mark(Position::TopLeft, Seat::B);
        let b = Board::from_codes([[1, -1, -1], [-1, -1, -1], [-1, -1, -1]]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_display_numbers_empty_cells() {
        let board = Board::new().with_mark(Position::Center, Seat::A);
        assert_eq!(board.display(), "1|2|3\n-+-+-\n4|A|6\n-+-+-\n7|8|9");
    }
}
