//! Bringing a party's store level with the notary.
//!
//! Commits normally reach the counterparty through
//! [`EndorsementChannel::deliver_commit`](super::EndorsementChannel::deliver_commit).
//! When that delivery is lost, the party pulls the missing transitions from
//! the arbiter instead, verifying each one exactly as if it had been
//! delivered.

use super::endorsement::KeyDirectory;
use super::error::{ProtocolError, StoreError};
use super::ports::{Arbiter, StateStore};
use super::proposal::CommittedTransition;
use crate::games::tictactoe::{GameId, MoveError, PartyId};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Verifies committed transitions and records them in one party's store.
#[derive(Clone)]
pub struct CommitSync {
    party: PartyId,
    store: Arc<dyn StateStore>,
    directory: Arc<KeyDirectory>,
    arbiter: Arc<dyn Arbiter>,
    notary: PartyId,
}

impl std::fmt::Debug for CommitSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitSync")
            .field("party", &self.party)
            .field("notary", &self.notary)
            .finish()
    }
}

impl CommitSync {
    /// Creates a sync for `party`'s store.
    pub fn new(
        party: PartyId,
        store: Arc<dyn StateStore>,
        directory: Arc<KeyDirectory>,
        arbiter: Arc<dyn Arbiter>,
        notary: PartyId,
    ) -> Self {
        Self {
            party,
            store,
            directory,
            arbiter,
            notary,
        }
    }

    /// Party whose store is kept up to date.
    pub fn party(&self) -> &PartyId {
        &self.party
    }

    /// Verifies a committed transition's three signatures and records it.
    #[instrument(
        skip(self, committed),
        fields(
            party = %self.party,
            game_id = %committed.state().id(),
            version = committed.state().version(),
        )
    )]
    pub async fn accept(&self, committed: &CommittedTransition) -> Result<(), ProtocolError> {
        let digest = committed.digest();
        let state = committed.state();
        let [proposer, endorser] = committed.endorsed().signatures();

        self.directory
            .verify_from(&self.notary, committed.notary_signature(), &digest)?;
        self.directory.verify(proposer, &digest)?;
        let expected_endorser = state
            .opponent_of(proposer.signer())
            .ok_or_else(|| MoveError::NotAParticipant(proposer.signer().clone()))?;
        self.directory.verify_from(expected_endorser, endorser, &digest)?;

        self.store.record(committed).await?;
        debug!(%digest, "Commit recorded");
        Ok(())
    }

    /// Pulls every transition the arbiter committed past our current
    /// version and records them in order. Returns how many were recorded.
    #[instrument(skip(self), fields(party = %self.party))]
    pub async fn catch_up(&self, id: &GameId) -> Result<usize, ProtocolError> {
        let local = match self.store.fetch_current(id).await {
            Ok(current) => Some(*current.version()),
            Err(StoreError::NotFound(_)) => None,
            Err(other) => return Err(other.into()),
        };

        let missing = self.arbiter.committed_since(id, local).await?;
        for committed in &missing {
            self.accept(committed).await?;
        }
        if !missing.is_empty() {
            info!(from = ?local, recorded = missing.len(), "Caught up with notary");
        }
        Ok(missing.len())
    }
}
