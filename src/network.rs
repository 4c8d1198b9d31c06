//! In-process network of parties sharing one notary.
//!
//! Each [`Node`] owns a vault, a counter-validator and a coordinator. The
//! [`LocalChannel`] routes endorsement requests and commit deliveries
//! between nodes by party name. Nodes flagged `auto_play` answer every
//! committed version where it is their turn by marking the first empty
//! cell in row-major order.

use crate::config::NetworkConfig;
use crate::games::tictactoe::{GameId, GameState, PartyId, Position};
use crate::notary::InMemoryNotary;
use crate::protocol::{
    CommitmentCoordinator, CommittedTransition, CoordinatorConfig, CounterValidator,
    EndorsementChannel, EndorsementResponse, KeyDirectory, PartyKeys, Proposal, TransportError,
};
use crate::vault::InMemoryVault;
use async_trait::async_trait;
use derive_getters::Getters;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock, Weak};
use tracing::{debug, info, instrument, warn};

/// One party: its store, its endorsing side and its proposing side.
#[derive(Debug, Getters)]
pub struct Node {
    /// Party this node acts for.
    party: PartyId,
    /// Committed versions this party holds.
    vault: Arc<InMemoryVault>,
    /// Endorses proposals addressed to this party.
    validator: CounterValidator,
    /// Proposes this party's transitions.
    coordinator: CommitmentCoordinator,
    /// Whether this party moves on its own.
    auto_play: bool,
}

impl Node {
    /// Assembles a node from its parts.
    pub fn new(
        vault: Arc<InMemoryVault>,
        validator: CounterValidator,
        coordinator: CommitmentCoordinator,
        auto_play: bool,
    ) -> Self {
        Self {
            party: vault.owner().clone(),
            vault,
            validator,
            coordinator,
            auto_play,
        }
    }

    /// Cell an automatic player picks on `state`, if it is this node's turn.
    pub fn auto_move(&self, state: &GameState) -> Option<Position> {
        if !self.auto_play || *state.complete() || state.active_player() != &self.party {
            return None;
        }
        Position::valid_moves(state.board()).first().copied()
    }
}

/// Starts the automatic reply to `state` on `node`, if one is due.
fn schedule_auto_move(node: Arc<Node>, state: &GameState) {
    let Some(position) = node.auto_move(state) else {
        return;
    };
    let game_id: GameId = state.id().clone();
    debug!(party = %node.party, %game_id, %position, "Scheduling automatic move");
    tokio::spawn(async move {
        match node.coordinator.play_move(&game_id, position).await {
            Ok(receipt) => info!(
                party = %node.party,
                %game_id,
                version = receipt.state().version(),
                "Automatic move committed"
            ),
            Err(err) => warn!(party = %node.party, %game_id, error = %err, "Automatic move failed"),
        }
    });
}

/// Routes protocol messages between nodes of one process.
#[derive(Debug, Default)]
pub struct LocalChannel {
    peers: OnceLock<HashMap<PartyId, Weak<Node>>>,
}

impl LocalChannel {
    /// Creates a channel with no peers attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches the nodes this channel routes to. Only the first call has any effect.
    pub fn attach<'a>(&self, nodes: impl IntoIterator<Item = &'a Arc<Node>>) {
        let peers = nodes
            .into_iter()
            .map(|node| (node.party.clone(), Arc::downgrade(node)))
            .collect();
        if self.peers.set(peers).is_err() {
            warn!("Channel peers already attached");
        }
    }

    fn peer(&self, party: &PartyId) -> Result<Arc<Node>, TransportError> {
        self.peers
            .get()
            .and_then(|peers| peers.get(party))
            .and_then(Weak::upgrade)
            .ok_or_else(|| TransportError::UnknownPeer(party.clone()))
    }
}

#[async_trait]
impl EndorsementChannel for LocalChannel {
    async fn request_endorsement(
        &self,
        counterparty: &PartyId,
        proposal: &Proposal,
    ) -> Result<EndorsementResponse, TransportError> {
        let peer = self.peer(counterparty)?;
        Ok(peer.validator.review(proposal).await)
    }

    async fn deliver_commit(
        &self,
        counterparty: &PartyId,
        committed: &CommittedTransition,
    ) -> Result<(), TransportError> {
        let peer = self.peer(counterparty)?;
        peer.validator
            .accept_commit(committed)
            .await
            .map_err(|err| TransportError::Failed {
                peer: counterparty.clone(),
                message: err.to_string(),
            })?;

        // Both players now hold the new version; whichever is to move may be a bot.
        for party in committed.state().participants() {
            if let Ok(node) = self.peer(party) {
                schedule_auto_move(node, committed.state());
            }
        }
        Ok(())
    }
}

/// Every party of the network, the shared notary and the key directory.
#[derive(Debug, Getters)]
pub struct LocalNetwork {
    /// Nodes by party name.
    nodes: BTreeMap<PartyId, Arc<Node>>,
    /// Arbiter shared by every node.
    notary: Arc<InMemoryNotary>,
    /// Public keys of every party and the notary.
    directory: Arc<KeyDirectory>,
    /// Message path between nodes.
    channel: Arc<LocalChannel>,
}

impl LocalNetwork {
    /// Starts describing a network.
    pub fn builder() -> LocalNetworkBuilder {
        LocalNetworkBuilder::default()
    }

    /// Builds the network a configuration describes.
    #[instrument(skip(config))]
    pub fn from_config(config: &NetworkConfig) -> Self {
        config
            .parties()
            .iter()
            .fold(
                Self::builder()
                    .notary(config.notary().clone())
                    .coordinator_config(config.coordinator_config()),
                |builder, party| builder.member(party.name().clone(), *party.auto_play()),
            )
            .build()
    }

    /// Node for `party`.
    pub fn node(&self, party: &PartyId) -> Option<&Arc<Node>> {
        self.nodes.get(party)
    }

    /// Names of every party, sorted.
    pub fn parties(&self) -> Vec<PartyId> {
        self.nodes.keys().cloned().collect()
    }
}

/// Builder for [`LocalNetwork`].
#[derive(Debug, Clone)]
pub struct LocalNetworkBuilder {
    notary: PartyId,
    parties: Vec<(PartyId, bool)>,
    config: CoordinatorConfig,
}

impl Default for LocalNetworkBuilder {
    fn default() -> Self {
        Self {
            notary: PartyId::from("Notary"),
            parties: Vec::new(),
            config: CoordinatorConfig::default(),
        }
    }
}

impl LocalNetworkBuilder {
    /// Name the notary signs as.
    #[must_use]
    pub fn notary(mut self, name: impl Into<PartyId>) -> Self {
        self.notary = name.into();
        self
    }

    /// Adds a party moving only on request.
    #[must_use]
    pub fn party(self, name: impl Into<PartyId>) -> Self {
        self.member(name, false)
    }

    /// Adds a party that plays automatically.
    #[must_use]
    pub fn bot(self, name: impl Into<PartyId>) -> Self {
        self.member(name, true)
    }

    /// Adds a party with an explicit auto-play flag.
    #[must_use]
    pub fn member(mut self, name: impl Into<PartyId>, auto_play: bool) -> Self {
        self.parties.push((name.into(), auto_play));
        self
    }

    /// Deadlines every coordinator uses.
    #[must_use]
    pub fn coordinator_config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Generates keys for every party and wires the nodes together.
    #[instrument(skip(self), fields(notary = %self.notary, parties = self.parties.len()))]
    pub fn build(self) -> LocalNetwork {
        let notary_keys = PartyKeys::generate(self.notary.clone());
        let party_keys: Vec<(Arc<PartyKeys>, bool)> = self
            .parties
            .into_iter()
            .map(|(party, auto_play)| (Arc::new(PartyKeys::generate(party)), auto_play))
            .collect();

        let mut directory = KeyDirectory::new();
        directory.register_keys(&notary_keys);
        for (keys, _) in &party_keys {
            directory.register_keys(keys);
        }
        let directory = Arc::new(directory);

        let notary = Arc::new(InMemoryNotary::new(notary_keys, directory.clone()));
        let channel = Arc::new(LocalChannel::new());

        let nodes: BTreeMap<PartyId, Arc<Node>> = party_keys
            .into_iter()
            .map(|(keys, auto_play)| {
                let party = keys.party().clone();
                let vault = Arc::new(InMemoryVault::new(party.clone()));
                let validator = CounterValidator::new(
                    keys.clone(),
                    vault.clone(),
                    directory.clone(),
                    notary.clone(),
                    self.notary.clone(),
                );
                let coordinator = CommitmentCoordinator::new(
                    keys,
                    vault.clone(),
                    channel.clone(),
                    notary.clone(),
                    directory.clone(),
                    self.notary.clone(),
                    self.config,
                );
                (party, Arc::new(Node::new(vault, validator, coordinator, auto_play)))
            })
            .collect();
        channel.attach(nodes.values());

        info!(parties = ?nodes.keys().collect::<Vec<_>>(), "Local network ready");
        LocalNetwork {
            nodes,
            notary,
            directory,
            channel,
        }
    }
}
