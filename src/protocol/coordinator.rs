//! Commitment coordinator: drives one transition attempt from draft to commit.
//!
//! # Attempt lifecycle
//!
//! ```text
//! Drafted ─▶ LocallyValidated ─▶ EndorsementRequested ─▶ Endorsed ─▶ ArbitrationRequested ─▶ Committed
//!    │                                  │                                    │
//!    ▼                                  ▼                                    ├─▶ ArbitrationConflict
//! RejectedLocal                   RejectedRemote                             ├─▶ ArbitrationRefused
//!                                                                            └─▶ TimedOut
//! ```
//!
//! Both suspension points (waiting for the counterparty and waiting for the
//! notary) are bounded by [`CoordinatorConfig`] deadlines. An endorsement
//! timeout ends in `RejectedRemote`: nothing has been committed anywhere. An
//! arbitration timeout ends in `TimedOut`: the notary may or may not have
//! accepted, so the caller must re-fetch before deciding what to do.
//!
//! A move that fails locally because this party's store is behind (the
//! opponent's commit was never delivered) triggers a catch-up against the
//! notary and is drafted once more before it is rejected.

use super::endorsement::{KeyDirectory, PartyKeys};
use super::error::{ProtocolError, Stage};
use super::ports::{
    Arbiter, ArbitrationOutcome, EndorsementChannel, EndorsementResponse, StateStore,
};
use super::proposal::{CommittedTransition, Draft, ProposalBuilder};
use super::sync::CommitSync;
use crate::games::tictactoe::{GameId, GameState, MoveError, PartyId, Position};
use derive_getters::Getters;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

/// Deadlines for the two suspension points of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// How long to wait for the counterparty's endorsement.
    pub endorsement_timeout: Duration,
    /// How long to wait for the notary's decision.
    pub arbitration_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            endorsement_timeout: Duration::from_secs(30),
            arbitration_timeout: Duration::from_secs(30),
        }
    }
}

impl CoordinatorConfig {
    /// Set the endorsement deadline.
    #[must_use]
    pub fn with_endorsement_timeout(mut self, timeout: Duration) -> Self {
        self.endorsement_timeout = timeout;
        self
    }

    /// Set the arbitration deadline.
    #[must_use]
    pub fn with_arbitration_timeout(mut self, timeout: Duration) -> Self {
        self.arbitration_timeout = timeout;
        self
    }
}

/// Where a transition attempt stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum AttemptState {
    /// Candidate built, not yet validated.
    Drafted,
    /// Passed the local validator.
    LocallyValidated,
    /// Waiting on the counterparty.
    EndorsementRequested,
    /// Counterparty signed.
    Endorsed,
    /// Waiting on the notary.
    ArbitrationRequested,
    /// Accepted by the notary and recorded locally.
    Committed,
    /// Failed local validation.
    RejectedLocal,
    /// Counterparty refused, was unreachable or too slow.
    RejectedRemote,
    /// Input version already consumed.
    ArbitrationConflict,
    /// Notary refused the transition outright.
    ArbitrationRefused,
    /// Notary did not answer in time.
    TimedOut,
}

impl AttemptState {
    /// True for states an attempt never leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Committed
                | Self::RejectedLocal
                | Self::RejectedRemote
                | Self::ArbitrationConflict
                | Self::ArbitrationRefused
                | Self::TimedOut
        )
    }

    /// True if `next` is a legal successor of this state.
    pub fn can_advance_to(&self, next: AttemptState) -> bool {
        use AttemptState::*;
        matches!(
            (self, next),
            (Drafted, LocallyValidated | RejectedLocal)
                | (LocallyValidated, EndorsementRequested)
                | (EndorsementRequested, Endorsed | RejectedRemote)
                | (Endorsed, ArbitrationRequested)
                | (
                    ArbitrationRequested,
                    Committed | ArbitrationConflict | ArbitrationRefused | TimedOut
                )
        )
    }
}

/// Trail of states one attempt passed through.
#[derive(Debug)]
struct Attempt {
    trail: Vec<AttemptState>,
}

impl Attempt {
    fn new() -> Self {
        Self {
            trail: vec![AttemptState::Drafted],
        }
    }

    fn current(&self) -> AttemptState {
        self.trail
            .last()
            .copied()
            .unwrap_or(AttemptState::Drafted)
    }

    fn advance(&mut self, next: AttemptState) {
        let from = self.current();
        debug_assert!(from.can_advance_to(next), "illegal attempt transition {from} -> {next}");
        debug!(%from, to = %next, "Attempt advanced");
        self.trail.push(next);
    }

    fn fail(&mut self, next: AttemptState, err: ProtocolError) -> ProtocolError {
        self.advance(next);
        warn!(state = %next, error = %err, "Attempt failed");
        err
    }
}

/// Outcome of a successful attempt.
#[derive(Debug, Clone, Getters)]
pub struct CommitReceipt {
    /// The committed transition with all three signatures.
    committed: CommittedTransition,
    /// States the attempt passed through, ending in `Committed`.
    trail: Vec<AttemptState>,
    /// Whether the counterparty acknowledged the commit. When false it
    /// catches up from the notary on its next interaction with the game.
    delivered: bool,
}

impl CommitReceipt {
    /// The newly committed version.
    pub fn state(&self) -> &GameState {
        self.committed.state()
    }
}

/// Drives proposals for one party through endorsement and arbitration.
#[derive(Clone)]
pub struct CommitmentCoordinator {
    builder: ProposalBuilder,
    store: Arc<dyn StateStore>,
    channel: Arc<dyn EndorsementChannel>,
    arbiter: Arc<dyn Arbiter>,
    directory: Arc<KeyDirectory>,
    sync: CommitSync,
    notary: PartyId,
    config: CoordinatorConfig,
}

impl std::fmt::Debug for CommitmentCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitmentCoordinator")
            .field("party", self.builder.party())
            .field("notary", &self.notary)
            .field("config", &self.config)
            .finish()
    }
}

impl CommitmentCoordinator {
    /// Wires a coordinator for the party owning `keys`.
    pub fn new(
        keys: Arc<PartyKeys>,
        store: Arc<dyn StateStore>,
        channel: Arc<dyn EndorsementChannel>,
        arbiter: Arc<dyn Arbiter>,
        directory: Arc<KeyDirectory>,
        notary: PartyId,
        config: CoordinatorConfig,
    ) -> Self {
        let sync = CommitSync::new(
            keys.party().clone(),
            store.clone(),
            directory.clone(),
            arbiter.clone(),
            notary.clone(),
        );
        Self {
            builder: ProposalBuilder::new(keys),
            store,
            channel,
            arbiter,
            directory,
            sync,
            notary,
            config,
        }
    }

    /// Party this coordinator proposes for.
    pub fn party(&self) -> &PartyId {
        self.builder.party()
    }

    /// Active deadlines.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Starts a new game against `opponent`, with this party opening.
    #[instrument(skip(self), fields(party = %self.party()))]
    pub async fn create_game(&self, opponent: &PartyId) -> Result<CommitReceipt, ProtocolError> {
        info!(%opponent, "Creating game");
        let draft = self.builder.draft_create(opponent);
        self.run(draft).await
    }

    /// Plays this party's mark at `position` in game `game_id`.
    #[instrument(skip(self), fields(party = %self.party()))]
    pub async fn play_move(
        &self,
        game_id: &GameId,
        position: Position,
    ) -> Result<CommitReceipt, ProtocolError> {
        let draft = match self.prepare_move(game_id, position).await {
            Ok(draft) => draft,
            Err(err @ (ProtocolError::InvalidMove(_) | ProtocolError::NotFound(_))) => {
                if self.catch_up(game_id).await == 0 {
                    return Err(reject_locally(err));
                }
                self.prepare_move(game_id, position)
                    .await
                    .map_err(reject_locally)?
            }
            Err(err) => return Err(err),
        };
        self.run(draft).await
    }

    /// Pulls commits this party missed from the notary, returning how many
    /// were recorded. Failures are logged and count as nothing recorded.
    #[instrument(skip(self), fields(party = %self.party()))]
    pub async fn catch_up(&self, game_id: &GameId) -> usize {
        let deadline = self.config.arbitration_timeout;
        match timeout(deadline, self.sync.catch_up(game_id)).await {
            Ok(Ok(recorded)) => recorded,
            Ok(Err(err)) => {
                warn!(error = %err, "Catch-up failed");
                0
            }
            Err(_) => {
                warn!(after = ?deadline, "Catch-up timed out");
                0
            }
        }
    }

    async fn prepare_move(
        &self,
        game_id: &GameId,
        position: Position,
    ) -> Result<Draft, ProtocolError> {
        let current = self.store.fetch_current(game_id).await?;
        info!(version = current.version(), %position, "Playing move");
        let draft = self.builder.draft_play(&current, position)?;
        draft.validate(self.party())?;
        Ok(draft)
    }

    async fn run(&self, draft: Draft) -> Result<CommitReceipt, ProtocolError> {
        let mut attempt = Attempt::new();
        let me = self.party().clone();

        if let Err(err) = draft.validate(&me) {
            return Err(attempt.fail(AttemptState::RejectedLocal, err.into()));
        }
        attempt.advance(AttemptState::LocallyValidated);

        let counterparty = match draft.candidate().opponent_of(&me) {
            Some(counterparty) => counterparty.clone(),
            None => {
                let err = MoveError::NotAParticipant(me.clone()).into();
                return Err(attempt.fail(AttemptState::RejectedLocal, err));
            }
        };
        let proposal = self.builder.seal(draft);
        let digest = proposal.digest();

        attempt.advance(AttemptState::EndorsementRequested);
        let request = self.channel.request_endorsement(&counterparty, &proposal);
        let endorsement = match timeout(self.config.endorsement_timeout, request).await {
            Err(_) => {
                let err = ProtocolError::Timeout {
                    stage: Stage::Endorsement,
                    after: self.config.endorsement_timeout,
                };
                return Err(attempt.fail(AttemptState::RejectedRemote, err));
            }
            Ok(Err(transport)) => {
                return Err(attempt.fail(AttemptState::RejectedRemote, transport.into()));
            }
            Ok(Ok(EndorsementResponse::Rejected(reason))) => {
                let err = ProtocolError::CounterpartyRejection {
                    counterparty: counterparty.clone(),
                    reason,
                };
                return Err(attempt.fail(AttemptState::RejectedRemote, err));
            }
            Ok(Ok(EndorsementResponse::Endorsed(signature))) => signature,
        };
        if let Err(err) = self.directory.verify_from(&counterparty, &endorsement, &digest) {
            return Err(attempt.fail(AttemptState::RejectedRemote, err.into()));
        }
        attempt.advance(AttemptState::Endorsed);

        let endorsed = proposal.endorse(endorsement);
        let previous = endorsed.previous().cloned();
        attempt.advance(AttemptState::ArbitrationRequested);
        let decision = self.arbiter.arbitrate(previous.as_ref(), &endorsed);
        let committed = match timeout(self.config.arbitration_timeout, decision).await {
            Err(_) => {
                let err = ProtocolError::Timeout {
                    stage: Stage::Arbitration,
                    after: self.config.arbitration_timeout,
                };
                return Err(attempt.fail(AttemptState::TimedOut, err));
            }
            Ok(Err(refusal)) => {
                return Err(attempt.fail(AttemptState::ArbitrationRefused, refusal.into()));
            }
            Ok(Ok(ArbitrationOutcome::Conflict { consumed_by })) => {
                let game_id = endorsed.candidate().id().clone();
                if previous.is_some() {
                    self.catch_up(&game_id).await;
                }
                let err = ProtocolError::ArbitrationConflict {
                    game_id,
                    version: previous.as_ref().map(|r| *r.version()),
                    consumed_by,
                };
                return Err(attempt.fail(AttemptState::ArbitrationConflict, err));
            }
            Ok(Ok(ArbitrationOutcome::Committed(committed))) => committed,
        };
        if let Err(err) = self
            .directory
            .verify_from(&self.notary, committed.notary_signature(), &digest)
        {
            return Err(attempt.fail(AttemptState::ArbitrationRefused, err.into()));
        }

        if let Err(err) = self.store.record(&committed).await {
            error!(%digest, error = %err, "Notarised transition could not be recorded locally");
            return Err(err.into());
        }
        attempt.advance(AttemptState::Committed);
        info!(
            game_id = %committed.state().id(),
            version = committed.state().version(),
            %digest,
            "Transition committed"
        );

        // The transition is final once notarised; delivery only brings the
        // counterparty's store up to date.
        let delivered = match self.channel.deliver_commit(&counterparty, &committed).await {
            Ok(()) => true,
            Err(err) => {
                warn!(%counterparty, error = %err, "Failed to deliver commit");
                false
            }
        };

        Ok(CommitReceipt {
            committed,
            trail: attempt.trail,
            delivered,
        })
    }
}

/// Records a local validation failure as a rejected attempt.
fn reject_locally(err: ProtocolError) -> ProtocolError {
    match err {
        ProtocolError::InvalidMove(_) => Attempt::new().fail(AttemptState::RejectedLocal, err),
        other => other,
    }
}
