//! Party keys, transition digests and signatures.
//!
//! Every participant signs the digest of a transition: the proposer when
//! proposing, the counterparty when endorsing, the notary when committing.
//! The digest binds the command, the exact version consumed and the full
//! candidate state.

use crate::games::tictactoe::{Command, GameState, PartyId, StateRef};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, instrument};

/// BLAKE3 digest identifying a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionDigest([u8; 32]);

impl TransitionDigest {
    /// Digest of `command` consuming `previous` to produce `candidate`.
    pub fn compute(command: &Command, previous: Option<&StateRef>, candidate: &GameState) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"strictly_turns/transition/v1");
        hasher.update(&command.tag());
        match previous {
            Some(reference) => {
                hasher.update(&[1]);
                hasher.update(&reference.version().to_le_bytes());
                hasher.update(reference.digest().as_bytes());
            }
            None => {
                hasher.update(&[0]);
            }
        }
        hasher.update(candidate.digest().as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for TransitionDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

/// A party's signature over a transition digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartySignature {
    signer: PartyId,
    signature: Signature,
}

impl PartySignature {
    /// Party that produced the signature.
    pub fn signer(&self) -> &PartyId {
        &self.signer
    }
}

/// Signing identity of a party.
pub struct PartyKeys {
    party: PartyId,
    signing_key: SigningKey,
}

impl PartyKeys {
    /// Generates a fresh ed25519 key pair for `party`.
    #[instrument]
    pub fn generate(party: PartyId) -> Self {
        debug!(%party, "Generating signing key");
        Self {
            party,
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Party owning these keys.
    pub fn party(&self) -> &PartyId {
        &self.party
    }

    /// Public half, for the key directory.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Signs a transition digest.
    pub fn sign(&self, digest: &TransitionDigest) -> PartySignature {
        PartySignature {
            signer: self.party.clone(),
            signature: self.signing_key.sign(digest.as_bytes()),
        }
    }
}

impl std::fmt::Debug for PartyKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartyKeys")
            .field("party", &self.party)
            .field("verifying_key", &hex::encode(self.verifying_key().as_bytes()))
            .finish()
    }
}

/// Signature verification failure.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum SignatureError {
    /// The signer has no registered key.
    #[display("No key registered for {}", _0)]
    UnknownSigner(PartyId),

    /// The signature does not match the digest.
    #[display("Invalid signature from {}", _0)]
    Invalid(PartyId),

    /// Signed by someone other than the party required.
    #[display("Expected a signature from {expected}, got one from {actual}")]
    WrongSigner {
        /// Party whose signature was required.
        expected: PartyId,
        /// Party that signed.
        actual: PartyId,
    },
}

impl std::error::Error for SignatureError {}

/// Public keys of every known party, the notary included.
#[derive(Debug, Clone, Default)]
pub struct KeyDirectory {
    keys: HashMap<PartyId, VerifyingKey>,
}

impl KeyDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a party's public key.
    pub fn register(&mut self, party: PartyId, key: VerifyingKey) {
        self.keys.insert(party, key);
    }

    /// Registers the public half of `keys`.
    pub fn register_keys(&mut self, keys: &PartyKeys) {
        self.register(keys.party().clone(), keys.verifying_key());
    }

    /// True if `party` has a registered key.
    pub fn knows(&self, party: &PartyId) -> bool {
        self.keys.contains_key(party)
    }

    /// Verifies `signature` over `digest` with the signer's registered key.
    pub fn verify(
        &self,
        signature: &PartySignature,
        digest: &TransitionDigest,
    ) -> Result<(), SignatureError> {
        let key = self
            .keys
            .get(&signature.signer)
            .ok_or_else(|| SignatureError::UnknownSigner(signature.signer.clone()))?;
        key.verify(digest.as_bytes(), &signature.signature)
            .map_err(|_| SignatureError::Invalid(signature.signer.clone()))
    }

    /// Like [`verify`](Self::verify), additionally requiring `expected` as signer.
    pub fn verify_from(
        &self,
        expected: &PartyId,
        signature: &PartySignature,
        digest: &TransitionDigest,
    ) -> Result<(), SignatureError> {
        if signature.signer() != expected {
            return Err(SignatureError::WrongSigner {
                expected: expected.clone(),
                actual: signature.signer().clone(),
            });
        }
        self.verify(signature, digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::tictactoe::Position;

    fn setup() -> (PartyKeys, KeyDirectory, TransitionDigest) {
        let keys = PartyKeys::generate(PartyId::from("Alice"));
        let mut directory = KeyDirectory::new();
        directory.register_keys(&keys);
        let game = GameState::genesis(PartyId::from("Alice"), PartyId::from("Bob"));
        let digest = TransitionDigest::compute(&Command::Create, None, &game);
        (keys, directory, digest)
    }

    #[test]
    fn test_signature_verifies() {
        let (keys, directory, digest) = setup();
        let signature = keys.sign(&digest);
        assert!(directory.verify(&signature, &digest).is_ok());
        assert!(directory.verify_from(&PartyId::from("Alice"), &signature, &digest).is_ok());
    }

    #[test]
    fn test_signature_bound_to_digest() {
        let (keys, directory, digest) = setup();
        let signature = keys.sign(&digest);
        let game = GameState::genesis(PartyId::from("Alice"), PartyId::from("Carol"));
        let other = TransitionDigest::compute(&Command::Create, None, &game);
        assert_eq!(
            directory.verify(&signature, &other),
            Err(SignatureError::Invalid(PartyId::from("Alice")))
        );
    }

    #[test]
    fn test_unknown_and_wrong_signer() {
        let (_, directory, digest) = setup();
        let mallory = PartyKeys::generate(PartyId::from("Mallory"));
        let signature = mallory.sign(&digest);
        assert_eq!(
            directory.verify(&signature, &digest),
            Err(SignatureError::UnknownSigner(PartyId::from("Mallory")))
        );
        assert!(matches!(
            directory.verify_from(&PartyId::from("Alice"), &signature, &digest),
            Err(SignatureError::WrongSigner { .. })
        ));
    }

    #[test]
    fn test_digest_binds_command_and_previous() {
        let game = GameState::genesis(PartyId::from("Alice"), PartyId::from("Bob"));
        let next = game.apply_move(&PartyId::from("Alice"), Position::Center).unwrap();
        let previous = StateRef::of(&game);
        let play = Command::Play {
            position: Position::Center,
        };
        let with_previous = TransitionDigest::compute(&play, Some(&previous), &next);
        assert_ne!(with_previous, TransitionDigest::compute(&play, None, &next));
        assert_ne!(
            with_previous,
            TransitionDigest::compute(&Command::Create, Some(&previous), &next)
        );
    }
}
