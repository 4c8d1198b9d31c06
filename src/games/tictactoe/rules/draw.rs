//! Draw detection logic for tic-tac-toe.

use super::super::{Board, Position};
use tracing::instrument;

/// Checks if the board is full (all squares occupied).
///
/// A full board with no winner indicates a draw.
#[instrument(skip(board))]
pub fn is_full(board: &Board) -> bool {
    Position::ALL.iter().all(|pos| !board.is_empty(*pos))
}

#[cfg(test)]
mod tests {
    use super::super::super::Seat;
    use super::super::win::check_winner;
    use super::*;

    fn is_draw(board: &Board) -> bool {
        is_full(board) && check_winner(board).is_none()
    }

    #[test]
    fn test_empty_board_not_full() {
        assert!(!is_full(&Board::new()));
    }

    #[test]
    fn test_partial_board_not_full() {
        let board = Board::new().with_mark(Position::Center, Seat::A);
        assert!(!is_full(&board));
    }

    #[test]
    fn test_draw_detection() {
        // A B A / B A A / B A B
        let board = Board::from_codes([[0, 1, 0], [1, 0, 0], [1, 0, 1]]).unwrap();
        assert!(is_full(&board));
        assert!(is_draw(&board));
    }

    #[test]
    fn test_not_draw_if_winner() {
        let board = Board::from_codes([[0, 0, 0], [1, 1, -1], [-1, -1, -1]]).unwrap();
        assert!(!is_draw(&board));
    }
}
