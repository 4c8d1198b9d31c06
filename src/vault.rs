//! In-memory store of committed game versions for one party.

use crate::games::tictactoe::{ChainInvariants, GameId, GameState, InvariantSet, PartyId, StateRef};
use crate::protocol::{CommittedTransition, StateStore, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument};

/// Every committed transition a party has recorded, per game.
///
/// Appends are linearised per game: a transition is recorded only if it
/// consumes the version currently held, so the chain never forks.
#[derive(Debug)]
pub struct InMemoryVault {
    owner: PartyId,
    games: RwLock<HashMap<GameId, Vec<CommittedTransition>>>,
}

impl InMemoryVault {
    /// Creates an empty vault for `owner`.
    pub fn new(owner: PartyId) -> Self {
        Self {
            owner,
            games: RwLock::new(HashMap::new()),
        }
    }

    /// Party whose vault this is.
    pub fn owner(&self) -> &PartyId {
        &self.owner
    }

    /// Current version of every game, ordered by id.
    #[instrument(skip(self), fields(owner = %self.owner))]
    pub async fn list_games(&self) -> Vec<GameState> {
        let games = self.games.read().await;
        let mut current: Vec<GameState> = games
            .values()
            .filter_map(|chain| chain.last())
            .map(|committed| committed.state().clone())
            .collect();
        current.sort_by(|a, b| a.id().as_str().cmp(b.id().as_str()));
        current
    }

    /// Current version of every game whose completion matches `complete`.
    pub async fn games_by_completion(&self, complete: bool) -> Vec<GameState> {
        self.list_games()
            .await
            .into_iter()
            .filter(|game| *game.complete() == complete)
            .collect()
    }

    /// Every committed version of a game, oldest first.
    #[instrument(skip(self), fields(owner = %self.owner))]
    pub async fn history(&self, id: &GameId) -> Result<Vec<GameState>, StoreError> {
        let games = self.games.read().await;
        let chain = games.get(id).ok_or_else(|| StoreError::NotFound(id.clone()))?;
        Ok(chain.iter().map(|committed| committed.state().clone()).collect())
    }

    /// Every committed transition of a game, oldest first.
    pub async fn transitions(&self, id: &GameId) -> Result<Vec<CommittedTransition>, StoreError> {
        let games = self.games.read().await;
        games
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }
}

#[async_trait]
impl StateStore for InMemoryVault {
    async fn fetch_current(&self, id: &GameId) -> Result<GameState, StoreError> {
        let games = self.games.read().await;
        games
            .get(id)
            .and_then(|chain| chain.last())
            .map(|committed| committed.state().clone())
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    #[instrument(
        skip(self, committed),
        fields(
            owner = %self.owner,
            game_id = %committed.state().id(),
            version = committed.state().version(),
        )
    )]
    async fn record(&self, committed: &CommittedTransition) -> Result<(), StoreError> {
        let state = committed.state();
        if !state.is_participant(&self.owner) {
            return Err(StoreError::NotParticipant {
                owner: self.owner.clone(),
                game_id: state.id().clone(),
            });
        }

        let mut games = self.games.write().await;
        let head = games.get(state.id()).and_then(|chain| chain.last());

        if head.is_some_and(|head| head.digest() == committed.digest()) {
            debug!("Transition already recorded");
            return Ok(());
        }

        let extends_head = match (committed.previous(), head) {
            (None, None) => true,
            (Some(previous), Some(head)) => *previous == StateRef::of(head.state()),
            _ => false,
        };
        if !extends_head {
            return Err(StoreError::OutOfSequence {
                game_id: state.id().clone(),
                expected: committed.previous().map(|previous| *previous.version()),
                actual: head.map(|head| *head.state().version()),
            });
        }

        let chain = games.entry(state.id().clone()).or_default();
        chain.push(committed.clone());
        info!(complete = state.complete(), "Recorded committed version");

        if cfg!(debug_assertions) {
            check_chain(chain);
        }

        Ok(())
    }
}

fn check_chain(chain: &[CommittedTransition]) {
    let versions: Vec<GameState> = chain.iter().map(|c| c.state().clone()).collect();
    if let Err(violations) = ChainInvariants::check_all(versions.as_slice()) {
        error!(?violations, "Committed chain violates invariants");
        debug_assert!(false, "committed chain violates invariants: {violations:?}");
    }
}
