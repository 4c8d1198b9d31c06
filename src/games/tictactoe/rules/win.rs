//! Win detection logic for tic-tac-toe.

use super::super::{Board, Position, Seat, Square};
use tracing::instrument;

/// The eight lines that win a game: three rows, three columns, two diagonals.
pub const WINNING_LINES: [[Position; 3]; 8] = [
    // Rows
    [Position::TopLeft, Position::TopCenter, Position::TopRight],
    [
        Position::MiddleLeft,
        Position::Center,
        Position::MiddleRight,
    ],
    [
        Position::BottomLeft,
        Position::BottomCenter,
        Position::BottomRight,
    ],
    // Columns
    [
        Position::TopLeft,
        Position::MiddleLeft,
        Position::BottomLeft,
    ],
    [
        Position::TopCenter,
        Position::Center,
        Position::BottomCenter,
    ],
    [
        Position::TopRight,
        Position::MiddleRight,
        Position::BottomRight,
    ],
    // Diagonals
    [Position::TopLeft, Position::Center, Position::BottomRight],
    [Position::TopRight, Position::Center, Position::BottomLeft],
];

/// Checks if a seat holds a full line.
///
/// Returns `Some(seat)` for the first uniform, non-empty line found,
/// `None` otherwise.
#[instrument(skip(board))]
pub fn check_winner(board: &Board) -> Option<Seat> {
    for [a, b, c] in WINNING_LINES {
        let sq = board.get(a);
        if let Square::Occupied(seat) = sq
            && sq == board.get(b)
            && sq == board.get(c)
        {
            return Some(seat);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_winner_empty_board() {
        let board = Board::new();
        assert_eq!(check_winner(&board), None);
    }

    #[test]
    fn test_winner_top_row() {
        let board = Board::new()
            .with_mark(Position::TopLeft, Seat::A)
            .with_mark(Position::TopCenter, Seat::A)
            .with_mark(Position::TopRight, Seat::A);
        assert_eq!(check_winner(&board), Some(Seat::A));
    }

    #[test]
    fn test_winner_anti_diagonal() {
        let board = Board::new()
            .with_mark(Position::TopRight, Seat::B)
            .with_mark(Position::Center, Seat::B)
            .with_mark(Position::BottomLeft, Seat::B);
        assert_eq!(check_winner(&board), Some(Seat::B));
    }

    #[test]
    fn test_mixed_diagonal_is_not_a_win() {
        let board = Board::new()
            .with_mark(Position::TopLeft, Seat::A)
            .with_mark(Position::Center, Seat::B)
            .with_mark(Position::BottomRight, Seat::A);
        assert_eq!(check_winner(&board), None);
    }

    #[test]
    fn test_no_winner_incomplete() {
        let board = Board::new()
            .with_mark(Position::TopLeft, Seat::A)
            .with_mark(Position::TopCenter, Seat::A);
        assert_eq!(check_winner(&board), None);
    }
}
