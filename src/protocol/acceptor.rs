//! Counterparty side of the protocol.
//!
//! The counter-validator never trusts the proposer: it checks the
//! proposer's signature, pins the consumed version against its own store,
//! re-runs the full transition validator and only then signs. A proposal
//! that extends a version this party never received triggers a catch-up
//! against the notary before the version is pinned.

use super::endorsement::{KeyDirectory, PartyKeys, SignatureError};
use super::error::{ProtocolError, StoreError};
use super::ports::{Arbiter, EndorsementResponse, StateStore};
use super::proposal::{CommittedTransition, Proposal};
use super::sync::CommitSync;
use crate::games::tictactoe::{Command, GameId, GameState, MoveError, PartyId, StateRef, validate};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Why a counterparty refused to endorse.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum RejectionReason {
    /// The proposal is not signed by who it claims.
    #[display("{}", _0)]
    Signature(SignatureError),

    /// This party is not the proposal's counterparty.
    #[display("Proposal is not addressed to {}", _0)]
    NotAddressed(PartyId),

    /// The proposal consumes a version other than our current one.
    #[display("Proposal extends {claimed:?}, current version is {current}")]
    Stale {
        /// Version the proposal consumes.
        claimed: Option<StateRef>,
        /// Our current version.
        current: StateRef,
    },

    /// A move for a game we have never seen.
    #[display("Unknown game {}", _0)]
    UnknownGame(GameId),

    /// A create for a game id we already hold.
    #[display("Game {} already exists", _0)]
    AlreadyExists(GameId),

    /// The transition validator failed.
    #[display("{}", _0)]
    Move(MoveError),

    /// Our own store failed.
    #[display("{}", _0)]
    Store(StoreError),
}

impl std::error::Error for RejectionReason {}

/// Independently validates and endorses proposals addressed to one party.
#[derive(Clone)]
pub struct CounterValidator {
    keys: Arc<PartyKeys>,
    store: Arc<dyn StateStore>,
    directory: Arc<KeyDirectory>,
    sync: CommitSync,
}

impl std::fmt::Debug for CounterValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CounterValidator")
            .field("party", self.keys.party())
            .field("sync", &self.sync)
            .finish()
    }
}

impl CounterValidator {
    /// Creates a validator for the party owning `keys`.
    pub fn new(
        keys: Arc<PartyKeys>,
        store: Arc<dyn StateStore>,
        directory: Arc<KeyDirectory>,
        arbiter: Arc<dyn Arbiter>,
        notary: PartyId,
    ) -> Self {
        let sync = CommitSync::new(
            keys.party().clone(),
            store.clone(),
            directory.clone(),
            arbiter,
            notary,
        );
        Self {
            keys,
            store,
            directory,
            sync,
        }
    }

    /// Party this validator endorses for.
    pub fn party(&self) -> &PartyId {
        self.keys.party()
    }

    /// Reviews a proposal, endorsing it only if every check passes.
    #[instrument(
        skip(self, proposal),
        fields(
            party = %self.party(),
            game_id = %proposal.game_id(),
            command = %proposal.command(),
        )
    )]
    pub async fn review(&self, proposal: &Proposal) -> EndorsementResponse {
        match self.check(proposal).await {
            Ok(()) => {
                let digest = proposal.digest();
                info!(%digest, proposer = %proposal.proposer(), "Endorsing transition");
                EndorsementResponse::Endorsed(self.keys.sign(&digest))
            }
            Err(reason) => {
                warn!(%reason, proposer = %proposal.proposer(), "Refusing to endorse");
                EndorsementResponse::Rejected(reason.to_string())
            }
        }
    }

    async fn check(&self, proposal: &Proposal) -> Result<(), RejectionReason> {
        let proposer = proposal.proposer();
        self.directory
            .verify(proposal.proposer_signature(), &proposal.digest())
            .map_err(RejectionReason::Signature)?;

        let candidate = proposal.candidate();
        if proposer == self.party() || !candidate.is_participant(self.party()) {
            return Err(RejectionReason::NotAddressed(self.party().clone()));
        }

        let previous = match proposal.command() {
            Command::Create => {
                if proposal.previous().is_some() {
                    return Err(RejectionReason::Move(MoveError::NotGenesis));
                }
                match self.store.fetch_current(candidate.id()).await {
                    Ok(_) => return Err(RejectionReason::AlreadyExists(candidate.id().clone())),
                    Err(StoreError::NotFound(_)) => {}
                    Err(other) => return Err(RejectionReason::Store(other)),
                }
                None
            }
            Command::Play { .. } => {
                let current = self.current_for(proposal).await?;
                let pinned = StateRef::of(&current);
                if proposal.previous().as_ref() != Some(&pinned) {
                    return Err(RejectionReason::Stale {
                        claimed: proposal.previous().clone(),
                        current: pinned,
                    });
                }
                Some(current)
            }
        };

        validate(previous.as_ref(), candidate, proposal.command(), proposer)
            .map_err(RejectionReason::Move)
    }

    /// Our current version of the game a move extends, catching up first
    /// if the proposal builds on a version we never received.
    async fn current_for(&self, proposal: &Proposal) -> Result<GameState, RejectionReason> {
        let id = proposal.game_id();
        let local = match self.store.fetch_current(id).await {
            Ok(current) => Some(current),
            Err(StoreError::NotFound(_)) => None,
            Err(other) => return Err(RejectionReason::Store(other)),
        };
        let behind = match (&local, proposal.previous()) {
            (None, _) => true,
            (Some(current), Some(claimed)) => claimed.version() > current.version(),
            (Some(_), None) => false,
        };
        if !behind {
            return local.ok_or_else(|| RejectionReason::UnknownGame(id.clone()));
        }

        if let Err(err) = self.sync.catch_up(id).await {
            warn!(error = %err, "Catch-up before review failed");
        }
        match self.store.fetch_current(id).await {
            Ok(current) => Ok(current),
            Err(StoreError::NotFound(id)) => Err(RejectionReason::UnknownGame(id)),
            Err(other) => Err(RejectionReason::Store(other)),
        }
    }

    /// Verifies a committed transition's three signatures and records it.
    pub async fn accept_commit(
        &self,
        committed: &CommittedTransition,
    ) -> Result<(), ProtocolError> {
        self.sync.accept(committed).await
    }
}
