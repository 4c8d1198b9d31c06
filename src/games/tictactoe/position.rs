//! Named board positions and coordinate conversion.

use super::action::MoveError;
use super::types::Board;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// A position on the tic-tac-toe board.
///
/// Row-major: index 0 is the top-left cell, index 8 the bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::EnumIter)]
pub enum Position {
    /// Top-left (row 0, column 0)
    TopLeft,
    /// Top-center (row 0, column 1)
    TopCenter,
    /// Top-right (row 0, column 2)
    TopRight,
    /// Middle-left (row 1, column 0)
    MiddleLeft,
    /// Center (row 1, column 1)
    Center,
    /// Middle-right (row 1, column 2)
    MiddleRight,
    /// Bottom-left (row 2, column 0)
    BottomLeft,
    /// Bottom-center (row 2, column 1)
    BottomCenter,
    /// Bottom-right (row 2, column 2)
    BottomRight,
}

impl Position {
    /// All 9 positions in row-major order.
    pub const ALL: [Position; 9] = [
        Position::TopLeft,
        Position::TopCenter,
        Position::TopRight,
        Position::MiddleLeft,
        Position::Center,
        Position::MiddleRight,
        Position::BottomLeft,
        Position::BottomCenter,
        Position::BottomRight,
    ];

    /// Get label for this position (for display).
    pub fn label(&self) -> &'static str {
        match self {
            Position::TopLeft => "Top-left",
            Position::TopCenter => "Top-center",
            Position::TopRight => "Top-right",
            Position::MiddleLeft => "Middle-left",
            Position::Center => "Center",
            Position::MiddleRight => "Middle-right",
            Position::BottomLeft => "Bottom-left",
            Position::BottomCenter => "Bottom-center",
            Position::BottomRight => "Bottom-right",
        }
    }

    /// Converts position to board index (0-8).
    pub fn to_index(self) -> usize {
        match self {
            Position::TopLeft => 0,
            Position::TopCenter => 1,
            Position::TopRight => 2,
            Position::MiddleLeft => 3,
            Position::Center => 4,
            Position::MiddleRight => 5,
            Position::BottomLeft => 6,
            Position::BottomCenter => 7,
            Position::BottomRight => 8,
        }
    }

    /// Creates position from board index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Row of this position (0-2).
    pub fn row(self) -> usize {
        self.to_index() / 3
    }

    /// Column of this position (0-2).
    pub fn column(self) -> usize {
        self.to_index() % 3
    }

    /// Creates a position from a (row, column) coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`MoveError::OutOfBounds`] if either coordinate is outside 0-2.
    #[instrument]
    pub fn from_coordinates(row: usize, column: usize) -> Result<Self, MoveError> {
        if row >= 3 || column >= 3 {
            return Err(MoveError::OutOfBounds { row, column });
        }
        Self::from_index(row * 3 + column).ok_or(MoveError::OutOfBounds { row, column })
    }

    /// Empty positions on the board, row-major.
    #[instrument(skip(board))]
    pub fn valid_moves(board: &Board) -> Vec<Position> {
        Self::ALL
            .iter()
            .copied()
            .filter(|pos| board.is_empty(*pos))
            .collect()
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, {})", self.label(), self.row(), self.column())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::tictactoe::Seat;
    use strum::IntoEnumIterator;

    #[test]
    fn test_coordinates_round_trip() {
        for pos in Position::iter() {
            assert_eq!(Position::from_coordinates(pos.row(), pos.column()), Ok(pos));
        }
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        assert_eq!(
            Position::from_coordinates(3, 0),
            Err(MoveError::OutOfBounds { row: 3, column: 0 })
        );
        assert!(Position::from_coordinates(0, 7).is_err());
    }

    #[test]
    fn test_valid_moves_skips_marked_cells() {
        let board = Board::new()
            .with_mark(Position::TopLeft, Seat::A)
            .with_mark(Position::Center, Seat::B);
        let moves = Position::valid_moves(&board);
        assert_eq!(moves.len(), 7);
        assert_eq!(moves[0], Position::TopCenter);
        assert!(!moves.contains(&Position::Center));
    }
}
