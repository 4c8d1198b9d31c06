//! Seams between the coordinator and the outside world.
//!
//! The coordinator only ever talks to a local store, the counterparty and
//! the arbiter through these traits, so transports and backends can be
//! swapped without touching the protocol.

use super::endorsement::{PartySignature, TransitionDigest};
use super::error::{ArbiterError, StoreError, TransportError};
use super::proposal::{CommittedTransition, EndorsedTransition, Proposal};
use crate::games::tictactoe::{GameId, GameState, PartyId, StateRef};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A party's local record of committed versions.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Latest committed version of the game.
    async fn fetch_current(&self, id: &GameId) -> Result<GameState, StoreError>;

    /// Appends a committed transition; it must extend the current version.
    async fn record(&self, committed: &CommittedTransition) -> Result<(), StoreError>;
}

/// Counterparty's answer to an endorsement request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndorsementResponse {
    /// The counterparty's signature over the transition digest.
    Endorsed(PartySignature),
    /// The counterparty's validation failed.
    Rejected(String),
}

/// Message path to other parties.
#[async_trait]
pub trait EndorsementChannel: Send + Sync {
    /// Asks `counterparty` to independently validate and sign `proposal`.
    async fn request_endorsement(
        &self,
        counterparty: &PartyId,
        proposal: &Proposal,
    ) -> Result<EndorsementResponse, TransportError>;

    /// Hands a committed transition to `counterparty` so they record it.
    async fn deliver_commit(
        &self,
        counterparty: &PartyId,
        committed: &CommittedTransition,
    ) -> Result<(), TransportError>;
}

/// Decision of the arbitration service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArbitrationOutcome {
    /// Accepted; the input version is now consumed.
    Committed(CommittedTransition),
    /// The input version was already consumed by another transition.
    Conflict {
        /// Transition that consumed it.
        consumed_by: TransitionDigest,
    },
}

/// Single-writer arbiter guaranteeing each version is consumed at most once.
#[async_trait]
pub trait Arbiter: Send + Sync {
    /// Atomically checks that `previous` is unconsumed and, if so, commits `endorsed`.
    async fn arbitrate(
        &self,
        previous: Option<&StateRef>,
        endorsed: &EndorsedTransition,
    ) -> Result<ArbitrationOutcome, ArbiterError>;

    /// Committed transitions of a game produced after version `after`
    /// (all of them when `None`), oldest first. Unknown games yield none.
    async fn committed_since(
        &self,
        id: &GameId,
        after: Option<u64>,
    ) -> Result<Vec<CommittedTransition>, ArbiterError>;
}
