//! Tests for the single-writer notary.

use std::sync::Arc;
use strictly_turns::{
    Arbiter, ArbiterError, ArbitrationOutcome, EndorsedTransition, GameState, InMemoryNotary,
    KeyDirectory, PartyId, PartyKeys, Position, Proposal, ProposalBuilder, StateRef,
};

struct Parties {
    alice: Arc<PartyKeys>,
    bob: Arc<PartyKeys>,
    notary: Arc<InMemoryNotary>,
}

fn setup() -> Parties {
    let alice = Arc::new(PartyKeys::generate(PartyId::from("Alice")));
    let bob = Arc::new(PartyKeys::generate(PartyId::from("Bob")));
    let notary_keys = PartyKeys::generate(PartyId::from("Notary"));
    let mut directory = KeyDirectory::new();
    directory.register_keys(&alice);
    directory.register_keys(&bob);
    directory.register_keys(&notary_keys);
    Parties {
        alice,
        bob,
        notary: Arc::new(InMemoryNotary::new(notary_keys, Arc::new(directory))),
    }
}

fn endorse(endorser: &PartyKeys, proposal: Proposal) -> EndorsedTransition {
    let signature = endorser.sign(&proposal.digest());
    proposal.endorse(signature)
}

async fn committed_genesis(parties: &Parties) -> GameState {
    let proposal = ProposalBuilder::new(parties.alice.clone())
        .create(&PartyId::from("Bob"))
        .unwrap();
    let endorsed = endorse(&parties.bob, proposal);
    match parties.notary.arbitrate(None, &endorsed).await.unwrap() {
        ArbitrationOutcome::Committed(committed) => committed.state().clone(),
        other => panic!("genesis not committed: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_consumers_exactly_one_wins() {
    for _ in 0..25 {
        let parties = setup();
        let genesis = committed_genesis(&parties).await;
        let previous = StateRef::of(&genesis);
        let builder = ProposalBuilder::new(parties.alice.clone());

        let mut handles = Vec::new();
        for position in Position::ALL {
            let proposal = builder.play(&genesis, position).unwrap();
            let endorsed = endorse(&parties.bob, proposal);
            let notary = parties.notary.clone();
            let previous = previous.clone();
            handles.push(tokio::spawn(async move {
                (endorsed.digest(), notary.arbitrate(Some(&previous), &endorsed).await)
            }));
        }

        let mut winners = Vec::new();
        let mut conflicts = Vec::new();
        for handle in handles {
            let (digest, outcome) = handle.await.unwrap();
            match outcome.unwrap() {
                ArbitrationOutcome::Committed(_) => winners.push(digest),
                ArbitrationOutcome::Conflict { consumed_by } => conflicts.push(consumed_by),
            }
        }

        assert_eq!(winners.len(), 1);
        assert_eq!(conflicts.len(), Position::ALL.len() - 1);
        assert!(conflicts.iter().all(|consumed_by| *consumed_by == winners[0]));
        let head = parties.notary.head(genesis.id()).await.unwrap();
        assert_eq!(*head.version(), 1);
    }
}

#[tokio::test]
async fn test_resubmitting_the_winner_is_idempotent() {
    let parties = setup();
    let genesis = committed_genesis(&parties).await;
    let previous = StateRef::of(&genesis);
    let proposal = ProposalBuilder::new(parties.alice.clone())
        .play(&genesis, Position::Center)
        .unwrap();
    let endorsed = endorse(&parties.bob, proposal);

    let first = parties.notary.arbitrate(Some(&previous), &endorsed).await.unwrap();
    let again = parties.notary.arbitrate(Some(&previous), &endorsed).await.unwrap();
    assert!(matches!(first, ArbitrationOutcome::Committed(_)));
    assert_eq!(first, again);
}

#[tokio::test]
async fn test_unknown_input_refused() {
    let parties = setup();
    let genesis = GameState::genesis(PartyId::from("Alice"), PartyId::from("Bob"));
    let proposal = ProposalBuilder::new(parties.alice.clone())
        .play(&genesis, Position::Center)
        .unwrap();
    let endorsed = endorse(&parties.bob, proposal);
    let previous = StateRef::of(&genesis);

    let result = parties.notary.arbitrate(Some(&previous), &endorsed).await;
    assert_eq!(result, Err(ArbiterError::UnknownInput(previous)));
}

#[tokio::test]
async fn test_missing_endorsement_refused() {
    let parties = setup();
    let proposal = ProposalBuilder::new(parties.alice.clone())
        .create(&PartyId::from("Bob"))
        .unwrap();
    // Alice endorses her own proposal.
    let endorsed = endorse(&parties.alice, proposal);

    let result = parties.notary.arbitrate(None, &endorsed).await;
    assert!(matches!(result, Err(ArbiterError::Malformed(_))));
    assert!(parties.notary.head(endorsed.candidate().id()).await.is_none());
}

#[tokio::test]
async fn test_forged_endorsement_refused() {
    let parties = setup();
    let proposal = ProposalBuilder::new(parties.alice.clone())
        .create(&PartyId::from("Bob"))
        .unwrap();
    let impostor = PartyKeys::generate(PartyId::from("Bob"));
    let endorsed = endorse(&impostor, proposal);

    let result = parties.notary.arbitrate(None, &endorsed).await;
    assert!(matches!(result, Err(ArbiterError::Signature(_))));
}

#[tokio::test]
async fn test_submitted_input_must_match_signed_input() {
    let parties = setup();
    let genesis = committed_genesis(&parties).await;
    let proposal = ProposalBuilder::new(parties.alice.clone())
        .play(&genesis, Position::Center)
        .unwrap();
    let endorsed = endorse(&parties.bob, proposal);

    let result = parties.notary.arbitrate(None, &endorsed).await;
    assert!(matches!(result, Err(ArbiterError::Malformed(_))));
}

#[tokio::test]
async fn test_different_games_do_not_contend() {
    let parties = setup();
    let first = committed_genesis(&parties).await;
    let second = committed_genesis(&parties).await;
    assert_ne!(first.id(), second.id());

    let builder = ProposalBuilder::new(parties.alice.clone());
    for game in [&first, &second] {
        let proposal = builder.play(game, Position::Center).unwrap();
        let endorsed = endorse(&parties.bob, proposal);
        let outcome = parties
            .notary
            .arbitrate(Some(&StateRef::of(game)), &endorsed)
            .await
            .unwrap();
        assert!(matches!(outcome, ArbitrationOutcome::Committed(_)));
    }
}

#[tokio::test]
async fn test_committed_chain_is_served_past_a_version() {
    let parties = setup();
    let genesis = committed_genesis(&parties).await;
    let proposal = ProposalBuilder::new(parties.alice.clone())
        .play(&genesis, Position::Center)
        .unwrap();
    let endorsed = endorse(&parties.bob, proposal);
    parties
        .notary
        .arbitrate(Some(&StateRef::of(&genesis)), &endorsed)
        .await
        .unwrap();

    let everything = parties.notary.committed_since(genesis.id(), None).await.unwrap();
    let versions: Vec<u64> = everything.iter().map(|c| *c.state().version()).collect();
    assert_eq!(versions, vec![0, 1]);
    assert_eq!(everything[0].state(), &genesis);
    assert_eq!(everything[1].digest(), endorsed.digest());

    let missing = parties.notary.committed_since(genesis.id(), Some(0)).await.unwrap();
    assert_eq!(missing.len(), 1);
    assert_eq!(*missing[0].state().version(), 1);
    assert!(parties.notary.committed_since(genesis.id(), Some(1)).await.unwrap().is_empty());

    let unknown = GameState::genesis(PartyId::from("Alice"), PartyId::from("Bob"));
    assert!(parties.notary.committed_since(unknown.id(), None).await.unwrap().is_empty());
}
