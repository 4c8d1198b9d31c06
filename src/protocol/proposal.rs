//! Transition proposals and their endorsed and committed forms.
//!
//! A transition gathers signatures as it moves through the protocol:
//!
//! ```text
//! Draft ──validate+sign──▶ Proposal ──endorse──▶ EndorsedTransition ──notarise──▶ CommittedTransition
//! ```

use super::endorsement::{PartyKeys, PartySignature, TransitionDigest};
use crate::games::tictactoe::{
    Command, GameId, GameState, MoveError, PartyId, Position, StateRef, validate,
};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

/// An unsigned candidate transition, not yet validated.
#[derive(Debug, Clone, PartialEq, Eq, Getters, derive_new::new)]
pub struct Draft {
    command: Command,
    previous: Option<GameState>,
    candidate: GameState,
}

impl Draft {
    /// Runs the transition validator with `mover` as the proposer.
    pub fn validate(&self, mover: &PartyId) -> Result<(), MoveError> {
        validate(self.previous.as_ref(), &self.candidate, &self.command, mover)
    }
}

/// A locally validated transition signed by its proposer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct Proposal {
    command: Command,
    previous: Option<StateRef>,
    candidate: GameState,
    proposer_signature: PartySignature,
}

impl Proposal {
    /// Digest every signature on this transition covers.
    pub fn digest(&self) -> TransitionDigest {
        TransitionDigest::compute(&self.command, self.previous.as_ref(), &self.candidate)
    }

    /// Party that proposed the transition.
    pub fn proposer(&self) -> &PartyId {
        self.proposer_signature.signer()
    }

    /// Game the transition belongs to.
    pub fn game_id(&self) -> &GameId {
        self.candidate.id()
    }

    /// Attaches the counterparty's endorsement.
    pub fn endorse(self, endorsement: PartySignature) -> EndorsedTransition {
        EndorsedTransition {
            proposal: self,
            endorsement,
        }
    }
}

/// A proposal carrying both participants' signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct EndorsedTransition {
    proposal: Proposal,
    endorsement: PartySignature,
}

impl EndorsedTransition {
    /// Digest every signature on this transition covers.
    pub fn digest(&self) -> TransitionDigest {
        self.proposal.digest()
    }

    /// State the transition produces.
    pub fn candidate(&self) -> &GameState {
        self.proposal.candidate()
    }

    /// Version the transition consumes.
    pub fn previous(&self) -> Option<&StateRef> {
        self.proposal.previous().as_ref()
    }

    /// Proposer's and endorser's signatures, in that order.
    pub fn signatures(&self) -> [&PartySignature; 2] {
        [self.proposal.proposer_signature(), &self.endorsement]
    }

    /// Attaches the notary's signature.
    pub fn commit(self, notary_signature: PartySignature) -> CommittedTransition {
        CommittedTransition {
            endorsed: self,
            notary_signature,
        }
    }
}

/// A transition accepted by the notary; its candidate is now the current version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct CommittedTransition {
    endorsed: EndorsedTransition,
    notary_signature: PartySignature,
}

impl CommittedTransition {
    /// The newly committed version.
    pub fn state(&self) -> &GameState {
        self.endorsed.candidate()
    }

    /// Version this transition consumed.
    pub fn previous(&self) -> Option<&StateRef> {
        self.endorsed.previous()
    }

    /// Digest every signature on this transition covers.
    pub fn digest(&self) -> TransitionDigest {
        self.endorsed.digest()
    }

    /// Party that proposed the transition.
    pub fn proposer(&self) -> &PartyId {
        self.endorsed.proposal().proposer()
    }

    /// The notary that committed it.
    pub fn notary(&self) -> &PartyId {
        self.notary_signature.signer()
    }
}

/// Drafts and seals proposals on behalf of one party.
#[derive(Debug, Clone)]
pub struct ProposalBuilder {
    keys: Arc<PartyKeys>,
}

impl ProposalBuilder {
    /// Creates a builder signing with `keys`.
    pub fn new(keys: Arc<PartyKeys>) -> Self {
        Self { keys }
    }

    /// Party on whose behalf proposals are built.
    pub fn party(&self) -> &PartyId {
        self.keys.party()
    }

    /// Drafts a new game against `opponent`, with this party as player A.
    #[instrument(skip(self), fields(party = %self.party()))]
    pub fn draft_create(&self, opponent: &PartyId) -> Draft {
        Draft {
            command: Command::Create,
            previous: None,
            candidate: GameState::genesis(self.party().clone(), opponent.clone()),
        }
    }

    /// Drafts a move at `position` on top of `current`.
    #[instrument(skip(self, current), fields(party = %self.party(), game_id = %current.id()))]
    pub fn draft_play(&self, current: &GameState, position: Position) -> Result<Draft, MoveError> {
        let candidate = current.apply_move(self.party(), position)?;
        Ok(Draft {
            command: Command::Play { position },
            previous: Some(current.clone()),
            candidate,
        })
    }

    /// Signs a draft that has already passed validation.
    #[instrument(skip(self, draft), fields(party = %self.party(), command = %draft.command))]
    pub fn seal(&self, draft: Draft) -> Proposal {
        let previous = draft.previous.as_ref().map(StateRef::of);
        let digest = TransitionDigest::compute(&draft.command, previous.as_ref(), &draft.candidate);
        debug!(%digest, "Signing proposal");
        Proposal {
            command: draft.command,
            previous,
            candidate: draft.candidate,
            proposer_signature: self.keys.sign(&digest),
        }
    }

    /// Drafts, validates and seals a create in one step.
    pub fn create(&self, opponent: &PartyId) -> Result<Proposal, MoveError> {
        let draft = self.draft_create(opponent);
        draft.validate(self.party())?;
        Ok(self.seal(draft))
    }

    /// Drafts, validates and seals a move in one step.
    pub fn play(&self, current: &GameState, position: Position) -> Result<Proposal, MoveError> {
        let draft = self.draft_play(current, position)?;
        draft.validate(self.party())?;
        Ok(self.seal(draft))
    }
}
