//! In-memory single-writer notary.
//!
//! The notary holds, per game, the head version, which transition
//! consumed every earlier version and the committed chain itself, which
//! parties that missed a delivery pull to catch up. Decisions for all
//! games are serialised behind one lock, so two transitions racing to
//! consume the same version cannot both be accepted.

use crate::games::tictactoe::{GameId, PartyId, StateDigest, StateRef};
use crate::protocol::{
    Arbiter, ArbiterError, ArbitrationOutcome, CommittedTransition, EndorsedTransition,
    KeyDirectory, PartyKeys, TransitionDigest,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Consumption record of one game.
#[derive(Debug, Clone)]
struct Ledger {
    head: StateRef,
    created_by: TransitionDigest,
    consumed: HashMap<u64, (StateDigest, TransitionDigest)>,
    chain: Vec<CommittedTransition>,
}

/// Arbiter that accepts at most one transition per consumed version.
#[derive(Debug)]
pub struct InMemoryNotary {
    keys: PartyKeys,
    directory: Arc<KeyDirectory>,
    ledgers: Mutex<HashMap<GameId, Ledger>>,
}

impl InMemoryNotary {
    /// Creates a notary signing with `keys` and verifying with `directory`.
    pub fn new(keys: PartyKeys, directory: Arc<KeyDirectory>) -> Self {
        Self {
            keys,
            directory,
            ledgers: Mutex::new(HashMap::new()),
        }
    }

    /// Identity the notary signs as.
    pub fn party(&self) -> &PartyId {
        self.keys.party()
    }

    /// Latest version the notary has committed for a game.
    pub async fn head(&self, id: &GameId) -> Option<StateRef> {
        self.ledgers.lock().await.get(id).map(|ledger| ledger.head.clone())
    }

    /// Signs the transition digest, committing `endorsed`.
    fn seal(
        &self,
        endorsed: &EndorsedTransition,
        digest: &TransitionDigest,
    ) -> CommittedTransition {
        endorsed.clone().commit(self.keys.sign(digest))
    }

    /// Checks signatures and linkage; nothing here depends on notary state.
    fn check_well_formed(
        &self,
        previous: Option<&StateRef>,
        endorsed: &EndorsedTransition,
    ) -> Result<TransitionDigest, ArbiterError> {
        let candidate = endorsed.candidate();
        if previous != endorsed.previous() {
            return Err(ArbiterError::Malformed(
                "submitted input differs from the one the parties signed".to_string(),
            ));
        }

        let linked = match previous {
            None => *candidate.version() == 0,
            Some(previous) => {
                previous.game_id() == candidate.id()
                    && *candidate.version() == previous.version() + 1
            }
        };
        if !linked {
            return Err(ArbiterError::Malformed(format!(
                "version {} does not follow {:?}",
                candidate.version(),
                previous.map(|p| *p.version())
            )));
        }

        let digest = endorsed.digest();
        let [proposer, endorser] = endorsed.signatures();
        if proposer.signer() == endorser.signer()
            || !candidate.is_participant(proposer.signer())
            || !candidate.is_participant(endorser.signer())
        {
            return Err(ArbiterError::Malformed(
                "transition must be signed by both players".to_string(),
            ));
        }
        self.directory.verify(proposer, &digest)?;
        self.directory.verify(endorser, &digest)?;
        Ok(digest)
    }
}

#[async_trait]
impl Arbiter for InMemoryNotary {
    #[instrument(
        skip(self, previous, endorsed),
        fields(
            notary = %self.party(),
            game_id = %endorsed.candidate().id(),
            version = endorsed.candidate().version(),
        )
    )]
    async fn arbitrate(
        &self,
        previous: Option<&StateRef>,
        endorsed: &EndorsedTransition,
    ) -> Result<ArbitrationOutcome, ArbiterError> {
        let digest = self.check_well_formed(previous, endorsed)?;
        let candidate = endorsed.candidate();

        let mut ledgers = self.ledgers.lock().await;
        match (previous, ledgers.get_mut(candidate.id())) {
            (None, None) => {
                let committed = self.seal(endorsed, &digest);
                ledgers.insert(
                    candidate.id().clone(),
                    Ledger {
                        head: StateRef::of(candidate),
                        created_by: digest,
                        consumed: HashMap::new(),
                        chain: vec![committed.clone()],
                    },
                );
                info!(%digest, "Game created");
                Ok(ArbitrationOutcome::Committed(committed))
            }
            (None, Some(ledger)) => {
                if ledger.created_by != digest {
                    warn!(consumed_by = %ledger.created_by, "Game id already taken");
                    return Ok(ArbitrationOutcome::Conflict {
                        consumed_by: ledger.created_by,
                    });
                }
                debug!(%digest, "Replayed create");
                Ok(ArbitrationOutcome::Committed(self.seal(endorsed, &digest)))
            }
            (Some(previous), None) => {
                warn!(%previous, "Input was never committed here");
                Err(ArbiterError::UnknownInput(previous.clone()))
            }
            (Some(previous), Some(ledger)) if *previous == ledger.head => {
                let committed = self.seal(endorsed, &digest);
                ledger
                    .consumed
                    .insert(*previous.version(), (*previous.digest(), digest));
                ledger.head = StateRef::of(candidate);
                ledger.chain.push(committed.clone());
                info!(%digest, "Transition notarised");
                Ok(ArbitrationOutcome::Committed(committed))
            }
            (Some(previous), Some(ledger)) => match ledger.consumed.get(previous.version()) {
                Some((input, consumed_by)) if input == previous.digest() => {
                    if *consumed_by != digest {
                        warn!(%previous, %consumed_by, "Input already consumed");
                        return Ok(ArbitrationOutcome::Conflict {
                            consumed_by: *consumed_by,
                        });
                    }
                    debug!(%digest, "Replayed transition");
                    Ok(ArbitrationOutcome::Committed(self.seal(endorsed, &digest)))
                }
                _ => {
                    warn!(%previous, "Input was never committed here");
                    Err(ArbiterError::UnknownInput(previous.clone()))
                }
            },
        }
    }

    #[instrument(skip(self), fields(notary = %self.party()))]
    async fn committed_since(
        &self,
        id: &GameId,
        after: Option<u64>,
    ) -> Result<Vec<CommittedTransition>, ArbiterError> {
        let ledgers = self.ledgers.lock().await;
        let missing: Vec<CommittedTransition> = ledgers
            .get(id)
            .map(|ledger| {
                ledger
                    .chain
                    .iter()
                    .filter(|committed| {
                        after.is_none_or(|after| *committed.state().version() > after)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        debug!(count = missing.len(), "Serving committed transitions");
        Ok(missing)
    }
}
