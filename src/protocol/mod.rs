//! Co-signed, notarised state transitions between two parties.
//!
//! A transition is drafted and validated by the proposer, independently
//! re-validated and endorsed by the counterparty, then submitted to a
//! single-writer notary that accepts at most one transition per consumed
//! version.

mod acceptor;
mod coordinator;
mod endorsement;
mod error;
mod ports;
mod proposal;
mod sync;

pub use acceptor::{CounterValidator, RejectionReason};
pub use coordinator::{AttemptState, CommitReceipt, CommitmentCoordinator, CoordinatorConfig};
pub use endorsement::{KeyDirectory, PartyKeys, PartySignature, SignatureError, TransitionDigest};
pub use error::{ArbiterError, ProtocolError, Stage, StoreError, TransportError};
pub use ports::{Arbiter, ArbitrationOutcome, EndorsementChannel, EndorsementResponse, StateStore};
pub use proposal::{CommittedTransition, Draft, EndorsedTransition, Proposal, ProposalBuilder};
pub use sync::CommitSync;
