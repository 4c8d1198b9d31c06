//! Versioned game state and the references that pin a single version.

use super::action::MoveError;
use super::rules::{Evaluation, evaluate};
use super::types::{Board, GameId, PartyId, Seat};
use super::Position;
use derive_getters::Getters;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// BLAKE3 digest of a [`GameState`] version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateDigest([u8; 32]);

impl StateDigest {
    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for StateDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

/// Reference to exactly one committed version of a game.
///
/// This is the optimistic-concurrency token: a transition names the
/// version it consumes, and the notary lets at most one transition
/// consume it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Getters)]
pub struct StateRef {
    game_id: GameId,
    version: u64,
    digest: StateDigest,
}

impl StateRef {
    /// Pins the given state.
    pub fn of(state: &GameState) -> Self {
        Self {
            game_id: state.id.clone(),
            version: state.version,
            digest: state.digest(),
        }
    }
}

impl std::fmt::Display for StateRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@v{}#{}", self.game_id, self.version, self.digest)
    }
}

/// Read-only projection of where a game stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "winner")]
pub enum GameStatus {
    /// Moves remain.
    InProgress,
    /// A party completed a line.
    Won(PartyId),
    /// Board is full without a line.
    Drawn,
}

/// One version of a two-party game.
///
/// Immutable once committed: every transition produces a new value with
/// `version + 1`. The setters exist to build candidates, not to mutate
/// committed versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct GameState {
    /// Stable identifier shared by every version.
    id: GameId,
    /// Party holding seat A; always opens.
    player_a: PartyId,
    /// Party holding seat B.
    player_b: PartyId,
    /// Party whose move is next.
    active_player: PartyId,
    /// Cell marks.
    board: Board,
    /// True once a line is won or the board is full.
    complete: bool,
    /// Party holding the winning line, absent on a draw.
    winner: Option<PartyId>,
    /// Generation marker, bumped exactly once per committed transition.
    version: u64,
}

impl GameState {
    /// Creates version 0 of a new game with a fresh id.
    #[instrument]
    pub fn genesis(player_a: PartyId, player_b: PartyId) -> Self {
        Self::genesis_with_id(GameId::generate(), player_a, player_b)
    }

    /// Creates version 0 of a game under a known id.
    #[instrument]
    pub fn genesis_with_id(id: GameId, player_a: PartyId, player_b: PartyId) -> Self {
        debug!(game_id = %id, "Drafting genesis version");
        Self {
            id,
            active_player: player_a.clone(),
            player_a,
            player_b,
            board: Board::new(),
            complete: false,
            winner: None,
            version: 0,
        }
    }

    /// Seat held by `party`, if they play in this game.
    pub fn seat_of(&self, party: &PartyId) -> Option<Seat> {
        if *party == self.player_a {
            Some(Seat::A)
        } else if *party == self.player_b {
            Some(Seat::B)
        } else {
            None
        }
    }

    /// Party holding `seat`.
    pub fn party_at(&self, seat: Seat) -> &PartyId {
        match seat {
            Seat::A => &self.player_a,
            Seat::B => &self.player_b,
        }
    }

    /// The other player, if `party` plays in this game.
    pub fn opponent_of(&self, party: &PartyId) -> Option<&PartyId> {
        self.seat_of(party).map(|seat| self.party_at(seat.opponent()))
    }

    /// Both players, seat A first.
    pub fn participants(&self) -> [&PartyId; 2] {
        [&self.player_a, &self.player_b]
    }

    /// True if `party` is one of the two players.
    pub fn is_participant(&self, party: &PartyId) -> bool {
        self.seat_of(party).is_some()
    }

    /// Evaluates this version's board.
    pub fn evaluation(&self) -> Evaluation {
        evaluate(&self.board)
    }

    /// Projection for the query surface.
    pub fn status(&self) -> GameStatus {
        match (&self.winner, self.complete) {
            (Some(winner), _) => GameStatus::Won(winner.clone()),
            (None, true) => GameStatus::Drawn,
            (None, false) => GameStatus::InProgress,
        }
    }

    /// Applies `mover`'s mark at `position` to build the next version.
    ///
    /// Mechanical: turn passes to the opponent, completion and winner are
    /// recomputed from the new board, version is bumped. Whether the move
    /// was legal is decided by the validator, not here.
    ///
    /// # Errors
    ///
    /// Returns [`MoveError::NotAParticipant`] if `mover` holds no seat.
    #[instrument(skip(self), fields(game_id = %self.id, version = self.version))]
    pub fn apply_move(&self, mover: &PartyId, position: Position) -> Result<GameState, MoveError> {
        let seat = self
            .seat_of(mover)
            .ok_or_else(|| MoveError::NotAParticipant(mover.clone()))?;
        let board = self.board.with_mark(position, seat);
        let evaluation = evaluate(&board);
        let winner = evaluation.winning_seat().map(|s| self.party_at(s).clone());

        debug!(?evaluation, "Candidate board evaluated");

        Ok(GameState {
            id: self.id.clone(),
            player_a: self.player_a.clone(),
            player_b: self.player_b.clone(),
            active_player: self.party_at(seat.opponent()).clone(),
            board,
            complete: evaluation.is_complete(),
            winner,
            version: self.version + 1,
        })
    }

    /// BLAKE3 over a canonical encoding of every field.
    pub fn digest(&self) -> StateDigest {
        let mut hasher = blake3::Hasher::new();
        hash_str(&mut hasher, self.id.as_str());
        hash_str(&mut hasher, self.player_a.as_str());
        hash_str(&mut hasher, self.player_b.as_str());
        hash_str(&mut hasher, self.active_player.as_str());
        for line in self.board.to_codes() {
            for code in line {
                hasher.update(&code.to_le_bytes());
            }
        }
        hasher.update(&[u8::from(self.complete)]);
        match &self.winner {
            Some(winner) => {
                hasher.update(&[1]);
                hash_str(&mut hasher, winner.as_str());
            }
            None => {
                hasher.update(&[0]);
            }
        }
        hasher.update(&self.version.to_le_bytes());
        StateDigest(*hasher.finalize().as_bytes())
    }
}

fn hash_str(hasher: &mut blake3::Hasher, value: &str) {
    hasher.update(&(value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}
