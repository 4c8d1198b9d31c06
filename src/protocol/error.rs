//! Error types for the commitment protocol and its collaborators.

use super::endorsement::{SignatureError, TransitionDigest};
use crate::games::tictactoe::{GameId, MoveError, PartyId, StateRef};
use std::time::Duration;

/// Suspension point at which an attempt can time out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum Stage {
    /// Waiting for the counterparty's endorsement.
    #[display("endorsement")]
    Endorsement,
    /// Waiting for the arbitration decision.
    #[display("arbitration")]
    Arbitration,
}

/// Failure of a [`StateStore`](super::StateStore).
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum StoreError {
    /// No version exists for the game.
    #[display("Game {} not found", _0)]
    NotFound(GameId),

    /// The transition does not extend the stored current version.
    #[display("Transition for game {game_id} expects {expected:?}, store holds {actual:?}")]
    OutOfSequence {
        /// Game being extended.
        game_id: GameId,
        /// Version the transition consumes (`None` for genesis).
        expected: Option<u64>,
        /// Version the store holds (`None` if the game is unknown).
        actual: Option<u64>,
    },

    /// The store's owner does not play in the game.
    #[display("{owner} does not play in game {game_id}")]
    NotParticipant {
        /// Owner of the store.
        owner: PartyId,
        /// Game being recorded.
        game_id: GameId,
    },
}

impl std::error::Error for StoreError {}

/// Failure to reach a counterparty.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum TransportError {
    /// No route to the party.
    #[display("Unknown peer {}", _0)]
    UnknownPeer(PartyId),

    /// The peer was reached but failed to process the message.
    #[display("Peer {peer} failed: {message}")]
    Failed {
        /// Peer that failed.
        peer: PartyId,
        /// What went wrong on the peer's side.
        message: String,
    },
}

impl std::error::Error for TransportError {}

/// Refusal by the arbitration service, as opposed to a conflict.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ArbiterError {
    /// The consumed version was never produced through this arbiter.
    #[display("Unknown input version {}", _0)]
    UnknownInput(StateRef),

    /// A required signature is missing or invalid.
    #[display("{}", _0)]
    Signature(SignatureError),

    /// The transition is not well formed (wrong signers, broken linkage).
    #[display("Malformed transition: {}", _0)]
    Malformed(String),
}

impl std::error::Error for ArbiterError {}

impl From<SignatureError> for ArbiterError {
    fn from(err: SignatureError) -> Self {
        Self::Signature(err)
    }
}

/// Typed outcome of a failed transition attempt.
///
/// Every failure is scoped to one attempt; none is retried by the core.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ProtocolError {
    /// Local validation failed; nothing was sent.
    #[display("Invalid move: {}", _0)]
    InvalidMove(MoveError),

    /// The counterparty's independent validation failed.
    #[display("{counterparty} rejected the transition: {reason}")]
    CounterpartyRejection {
        /// Party that refused to endorse.
        counterparty: PartyId,
        /// Their stated reason.
        reason: String,
    },

    /// The consumed version was already consumed by another transition.
    ///
    /// Re-fetch the current version before deciding to resubmit.
    #[display("Game {game_id} already advanced past version {version:?} (by {consumed_by})")]
    ArbitrationConflict {
        /// Game whose version was contested.
        game_id: GameId,
        /// Contested version (`None` for a contested create).
        version: Option<u64>,
        /// Transition that won.
        consumed_by: TransitionDigest,
    },

    /// A suspension point exceeded its deadline.
    #[display("Timed out after {after:?} waiting for {stage}")]
    Timeout {
        /// Where the attempt was waiting.
        stage: Stage,
        /// Deadline that elapsed.
        after: Duration,
    },

    /// The game has no current version.
    #[display("Game {} not found", _0)]
    NotFound(GameId),

    /// The arbiter refused the transition outright.
    #[display("Arbitration refused: {}", _0)]
    ArbitrationRefused(ArbiterError),

    /// A signature did not verify.
    #[display("{}", _0)]
    Signature(SignatureError),

    /// The counterparty could not be reached.
    #[display("{}", _0)]
    Transport(TransportError),

    /// The local store failed.
    #[display("{}", _0)]
    Store(StoreError),
}

impl std::error::Error for ProtocolError {}

impl From<MoveError> for ProtocolError {
    fn from(err: MoveError) -> Self {
        Self::InvalidMove(err)
    }
}

impl From<SignatureError> for ProtocolError {
    fn from(err: SignatureError) -> Self {
        Self::Signature(err)
    }
}

impl From<TransportError> for ProtocolError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

impl From<ArbiterError> for ProtocolError {
    fn from(err: ArbiterError) -> Self {
        Self::ArbitrationRefused(err)
    }
}

impl From<StoreError> for ProtocolError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}
