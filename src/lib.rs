//! Strictly Turns - two-party tic-tac-toe with co-signed, notarised moves
//!
//! Every version of a game is an immutable record. A move is a transition
//! from one committed version to the next: the mover proposes and signs it,
//! the opponent independently re-validates and endorses it, and a notary
//! accepts at most one transition per consumed version.
//!
//! # Architecture
//!
//! - **Games**: board, evaluator, transition validator and chain invariants
//! - **Protocol**: proposals, endorsement, the commitment coordinator and its ports
//! - **Vault**: each party's record of committed versions
//! - **Notary**: single-writer arbiter
//! - **Network**: in-process parties, routing and the automatic player
//! - **Server**: HTTP surface scoped per party
//!
//! # Example
//!
//! ```no_run
//! use strictly_turns::{LocalNetwork, PartyId, Position};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let network = LocalNetwork::builder().party("Alice").bot("Bob").build();
//! let alice = network.node(&PartyId::from("Alice")).expect("configured");
//!
//! let receipt = alice.coordinator().create_game(&PartyId::from("Bob")).await?;
//! alice
//!     .coordinator()
//!     .play_move(receipt.state().id(), Position::Center)
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod config;
mod games;
mod network;
mod notary;
mod protocol;
mod server;
mod vault;

// Crate-level exports - Configuration
pub use config::{ConfigError, NetworkConfig, PartyConfig};

// Crate-level exports - Game types (tic-tac-toe)
pub use games::tictactoe::{
    AlternatingTurnInvariant, Board, BoardError, ChainInvariants, Command, CompletionConsistent,
    CompletionConsistentInvariant, CorrectMover, CreateContract, Evaluation, ExtendsPrevious,
    GameId, GameState, GameStatus, Invariant, InvariantSet, InvariantViolation,
    MonotonicBoardInvariant, MoveError, NotAlreadyComplete, PartyId, PlayContract, Position,
    Seat, SingleNewMark, Square, StateDigest, StateRef, TransitionRule, TurnFlips, VersionChain,
    VersionSequenceInvariant, WINNING_LINES, WinnerConsistent, check_winner, evaluate, is_full,
    validate,
};

// Crate-level exports - Protocol
pub use protocol::{
    Arbiter, ArbiterError, ArbitrationOutcome, AttemptState, CommitReceipt, CommitSync,
    CommitmentCoordinator, CommittedTransition, CoordinatorConfig, CounterValidator, Draft,
    EndorsedTransition, EndorsementChannel, EndorsementResponse, KeyDirectory, PartyKeys,
    PartySignature, Proposal, ProposalBuilder, ProtocolError, RejectionReason, SignatureError,
    Stage, StateStore, StoreError, TransitionDigest, TransportError,
};

// Crate-level exports - Parties, notary and network
pub use network::{LocalChannel, LocalNetwork, LocalNetworkBuilder, Node};
pub use notary::InMemoryNotary;
pub use vault::InMemoryVault;

// Crate-level exports - HTTP surface
pub use server::{
    ApiError, CommitView, CreateGameRequest, GameView, GamesFilter, PlayMoveRequest, router,
};
