//! Game rules for tic-tac-toe.
//!
//! Pure functions over a [`Board`](super::Board): no state, no side effects.

mod draw;
mod win;

pub use draw::is_full;
pub use win::{WINNING_LINES, check_winner};

use super::{Board, Seat};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// What a board says about the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Evaluation {
    /// Moves remain and nobody has a line.
    Ongoing,
    /// A seat holds a full line.
    Won(Seat),
    /// Every cell is marked and nobody has a line.
    Drawn,
}

impl Evaluation {
    /// True for [`Evaluation::Won`] and [`Evaluation::Drawn`].
    pub fn is_complete(self) -> bool {
        !matches!(self, Evaluation::Ongoing)
    }

    /// Seat holding the winning line, if any.
    pub fn winning_seat(self) -> Option<Seat> {
        match self {
            Evaluation::Won(seat) => Some(seat),
            Evaluation::Ongoing | Evaluation::Drawn => None,
        }
    }
}

/// Evaluates a board: a winning line first, then a full board, else ongoing.
#[instrument(skip(board))]
pub fn evaluate(board: &Board) -> Evaluation {
    if let Some(seat) = check_winner(board) {
        Evaluation::Won(seat)
    } else if is_full(board) {
        Evaluation::Drawn
    } else {
        Evaluation::Ongoing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_row_wins() {
        let board = Board::from_codes([[0, 0, 0], [-1, -1, -1], [-1, -1, -1]]).unwrap();
        assert_eq!(evaluate(&board), Evaluation::Won(Seat::A));
    }

    #[test]
    fn test_full_board_without_line_is_drawn() {
        // A B A / A B B / B A A
        let board = Board::from_codes([[0, 1, 0], [0, 1, 1], [1, 0, 0]]).unwrap();
        assert_eq!(evaluate(&board), Evaluation::Drawn);
    }

    #[test]
    fn test_win_on_last_cell_beats_draw() {
        // A B A / B A B / B A A  (diagonal for A on a full board)
        let board = Board::from_codes([[0, 1, 0], [1, 0, 1], [1, 0, 0]]).unwrap();
        assert_eq!(evaluate(&board), Evaluation::Won(Seat::A));
    }

    #[test]
    fn test_empty_board_is_ongoing() {
        assert_eq!(evaluate(&Board::new()), Evaluation::Ongoing);
        assert!(!evaluate(&Board::new()).is_complete());
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let board = Board::from_codes([[1, 0, -1], [-1, 1, 0], [-1, -1, 1]]).unwrap();
        let first = evaluate(&board);
        for _ in 0..10 {
            assert_eq!(evaluate(&board), first);
        }
        assert_eq!(first, Evaluation::Won(Seat::B));
    }
}
