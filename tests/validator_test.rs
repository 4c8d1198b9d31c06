//! Tests for the board evaluator, transition validator and chain invariants.

use rand::seq::SliceRandom;
use strictly_turns::{
    Board, ChainInvariants, Command, Evaluation, GameState, InvariantSet, MoveError, PartyId,
    Position, Seat, evaluate, validate,
};

fn alice() -> PartyId {
    PartyId::from("Alice")
}

fn bob() -> PartyId {
    PartyId::from("Bob")
}

#[test]
fn test_genesis_validates() {
    let genesis = GameState::genesis(alice(), bob());
    assert_eq!(validate(None, &genesis, &Command::Create, &alice()), Ok(()));
}

#[test]
fn test_marked_genesis_rejected() {
    for position in Position::ALL {
        let genesis = GameState::genesis(alice(), bob())
            .with_board(Board::new().with_mark(position, Seat::B));
        assert_eq!(
            validate(None, &genesis, &Command::Create, &alice()),
            Err(MoveError::BoardNotEmpty),
            "genesis marked at {}",
            position
        );
    }
}

#[test]
fn test_genesis_with_player_b_to_move_rejected() {
    let genesis = GameState::genesis(alice(), bob()).with_active_player(bob());
    assert_eq!(
        validate(None, &genesis, &Command::Create, &alice()),
        Err(MoveError::FirstMoverNotPlayerA(alice()))
    );
}

#[test]
fn test_genesis_past_version_zero_rejected() {
    let genesis = GameState::genesis(alice(), bob()).with_version(3);
    assert_eq!(
        validate(None, &genesis, &Command::Create, &alice()),
        Err(MoveError::NotGenesis)
    );
}

#[test]
fn test_genesis_already_finished_rejected() {
    let genesis = GameState::genesis(alice(), bob()).with_complete(true);
    assert_eq!(
        validate(None, &genesis, &Command::Create, &alice()),
        Err(MoveError::GenesisFinished)
    );
}

#[test]
fn test_first_move_validates() {
    let previous = GameState::genesis(alice(), bob());
    let candidate = previous
        .clone()
        .with_board(Board::new().with_mark(Position::TopLeft, Seat::A))
        .with_active_player(bob())
        .with_version(1);
    let command = Command::Play {
        position: Position::TopLeft,
    };
    assert!(!*candidate.complete());
    assert_eq!(validate(Some(&previous), &candidate, &command, &alice()), Ok(()));
}

#[test]
fn test_turn_must_flip() {
    let previous = GameState::genesis(alice(), bob());
    let candidate = previous
        .clone()
        .with_board(Board::new().with_mark(Position::TopLeft, Seat::A))
        .with_version(1);
    let command = Command::Play {
        position: Position::TopLeft,
    };
    assert_eq!(
        validate(Some(&previous), &candidate, &command, &alice()),
        Err(MoveError::TurnNotFlipped(bob()))
    );
}

#[test]
fn test_top_row_is_won_by_a() {
    let board = Board::from_codes([[0, 0, 0], [-1, -1, -1], [-1, -1, -1]]).unwrap();
    assert_eq!(evaluate(&board), Evaluation::Won(Seat::A));
}

#[test]
fn test_full_board_without_line_is_drawn() {
    // A B A
    // A B B
    // B A A
    let board = Board::from_codes([[0, 1, 0], [0, 1, 1], [1, 0, 0]]).unwrap();
    assert_eq!(evaluate(&board), Evaluation::Drawn);
}

#[test]
fn test_illegal_cell_code_rejected() {
    assert!(Board::from_codes([[0, 0, 2], [-1, -1, -1], [-1, -1, -1]]).is_err());
}

#[test]
fn test_move_after_completion_rejected() {
    let won = GameState::genesis(alice(), bob())
        .with_board(Board::from_codes([[0, 0, 0], [1, 1, -1], [-1, -1, -1]]).unwrap())
        .with_active_player(bob())
        .with_complete(true)
        .with_winner(Some(alice()))
        .with_version(5);
    let candidate = won.apply_move(&bob(), Position::MiddleRight).unwrap();
    let command = Command::Play {
        position: Position::MiddleRight,
    };
    assert_eq!(
        validate(Some(&won), &candidate, &command, &bob()),
        Err(MoveError::GameComplete)
    );
}

#[test]
fn test_two_new_marks_rejected() {
    let previous = GameState::genesis(alice(), bob());
    let board = Board::new()
        .with_mark(Position::TopLeft, Seat::A)
        .with_mark(Position::Center, Seat::A);
    let candidate = previous
        .clone()
        .with_board(board)
        .with_active_player(bob())
        .with_version(1);
    let command = Command::Play {
        position: Position::TopLeft,
    };
    assert_eq!(
        validate(Some(&previous), &candidate, &command, &alice()),
        Err(MoveError::MultipleCellsChanged(2))
    );
}

#[test]
fn test_unchanged_board_rejected() {
    let previous = GameState::genesis(alice(), bob());
    let candidate = previous.clone().with_active_player(bob()).with_version(1);
    let command = Command::Play {
        position: Position::TopLeft,
    };
    assert_eq!(
        validate(Some(&previous), &candidate, &command, &alice()),
        Err(MoveError::NoCellMarked)
    );
}

#[test]
fn test_opponents_mark_rejected() {
    let previous = GameState::genesis(alice(), bob());
    let candidate = previous
        .clone()
        .with_board(Board::new().with_mark(Position::TopLeft, Seat::B))
        .with_active_player(bob())
        .with_version(1);
    let command = Command::Play {
        position: Position::TopLeft,
    };
    assert_eq!(
        validate(Some(&previous), &candidate, &command, &alice()),
        Err(MoveError::WrongMark {
            position: Position::TopLeft,
            expected: Seat::A,
        })
    );
}

#[test]
fn test_claimed_completion_must_match_board() {
    let previous = GameState::genesis(alice(), bob());
    let candidate = previous
        .apply_move(&alice(), Position::Center)
        .unwrap()
        .with_complete(true);
    let command = Command::Play {
        position: Position::Center,
    };
    assert_eq!(
        validate(Some(&previous), &candidate, &command, &alice()),
        Err(MoveError::CompletionMismatch {
            claimed: true,
            actual: false,
        })
    );
}

#[test]
fn test_claimed_winner_must_match_board() {
    let previous = GameState::genesis(alice(), bob());
    let candidate = previous
        .apply_move(&alice(), Position::Center)
        .unwrap()
        .with_winner(Some(alice()));
    let command = Command::Play {
        position: Position::Center,
    };
    assert_eq!(
        validate(Some(&previous), &candidate, &command, &alice()),
        Err(MoveError::WinnerMismatch {
            claimed: Some(alice()),
            actual: None
        })
    );
}

#[test]
fn test_evaluation_is_deterministic() {
    let board = Board::from_codes([[0, 1, -1], [-1, 0, 1], [-1, -1, -1]]).unwrap();
    let first = evaluate(&board);
    for _ in 0..10 {
        assert_eq!(evaluate(&board), first);
    }
}

#[test]
fn test_random_games_keep_chain_invariants() {
    let mut rng = rand::thread_rng();
    for _ in 0..200 {
        let mut chain = vec![GameState::genesis(alice(), bob())];
        loop {
            let current = chain.last().unwrap().clone();
            if *current.complete() {
                break;
            }
            let mut moves = Position::valid_moves(current.board());
            moves.shuffle(&mut rng);
            let position = moves[0];
            let mover = current.active_player().clone();
            let next = current.apply_move(&mover, position).unwrap();
            assert_eq!(
                validate(Some(&current), &next, &Command::Play { position }, &mover),
                Ok(())
            );
            chain.push(next);
        }

        assert!(chain.len() >= 6 && chain.len() <= 10);
        assert_eq!(ChainInvariants::check_all(chain.as_slice()), Ok(()));
        let last = chain.last().unwrap();
        assert_eq!(*last.complete(), evaluate(last.board()).is_complete());
    }
}
