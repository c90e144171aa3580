// Copyright (c) Consensus Systems Team
// SPDX-License-Identifier: Apache-2.0

//! Here we select the cryptographic primitives used by default in this core.
//! The rest of the codebase should only:
//! - refer to the `Signer`/`Verifier` trait objects below, never the concrete EdDSA types
//! - swap the concrete implementation in this module if a different scheme is ever required
//!
//! EdDSA is the only algorithm this core exercises today; nothing outside this module
//! mandates it.

use std::sync::Arc;

use fastcrypto::{
    ed25519,
    traits::{KeyPair as _, Signer as _, ToFromBytes as _, VerifyingKey as _},
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Byte length of an Ed25519 signature, used to size buffers without round-tripping through
/// a concrete signature instance.
pub const ED25519_SIGNATURE_LENGTH: usize = 64;

/// Encoding of the raw bytes carried alongside a `Key`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyFormat {
    Raw,
    Hex,
}

/// An opaque key plus the format tag that explains how to decode it. Carried alongside the
/// key everywhere.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Key {
    pub bytes: Vec<u8>,
    pub format: KeyFormat,
}

impl Key {
    pub fn raw(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            format: KeyFormat::Raw,
        }
    }

    pub fn hex(hex_str: impl Into<String>) -> Self {
        Self {
            bytes: hex_str.into().into_bytes(),
            format: KeyFormat::Hex,
        }
    }

    /// Returns the decoded raw bytes regardless of the original encoding.
    pub fn decoded_bytes(&self) -> Result<Vec<u8>, ConfigurationError> {
        match self.format {
            KeyFormat::Raw => Ok(self.bytes.clone()),
            KeyFormat::Hex => hex::decode(&self.bytes)
                .map_err(|e| ConfigurationError::KeyMaterialInvalid(e.to_string())),
        }
    }
}

/// Capable of verifying `(data, signature)` against a fixed public key and algorithm.
pub trait Verifier: Send + Sync {
    fn verify_buffer(&self, data: &[u8], sig: &[u8]) -> bool;
    fn signature_length(&self) -> usize;
}

/// Symmetric counterpart to `Verifier`.
pub trait Signer: Send + Sync {
    fn sign_buffer(&self, data: &[u8]) -> Vec<u8>;
    fn signature_length(&self) -> usize;
    fn public_key_bytes(&self) -> Vec<u8>;
}

pub struct EdDsaVerifier(ed25519::Ed25519PublicKey);

impl EdDsaVerifier {
    pub fn from_key(key: &Key) -> Result<Self, ConfigurationError> {
        let bytes = key.decoded_bytes()?;
        let pk = ed25519::Ed25519PublicKey::from_bytes(&bytes)
            .map_err(|e| ConfigurationError::KeyMaterialInvalid(e.to_string()))?;
        Ok(Self(pk))
    }
}

impl Verifier for EdDsaVerifier {
    fn verify_buffer(&self, data: &[u8], sig: &[u8]) -> bool {
        let Ok(signature) = ed25519::Ed25519Signature::from_bytes(sig) else {
            return false;
        };
        self.0.verify(data, &signature).is_ok()
    }

    fn signature_length(&self) -> usize {
        ED25519_SIGNATURE_LENGTH
    }
}

pub struct EdDsaSigner(ed25519::Ed25519KeyPair);

impl EdDsaSigner {
    pub fn from_key(key: &Key) -> Result<Self, ConfigurationError> {
        let bytes = key.decoded_bytes()?;
        let private = ed25519::Ed25519PrivateKey::from_bytes(&bytes)
            .map_err(|e| ConfigurationError::KeyMaterialInvalid(e.to_string()))?;
        Ok(Self(ed25519::Ed25519KeyPair::from(private)))
    }

    pub fn generate<R: rand::Rng + fastcrypto::traits::AllowedRng>(rng: &mut R) -> Self {
        Self(ed25519::Ed25519KeyPair::generate(rng))
    }

    pub fn public_key(&self) -> ed25519::Ed25519PublicKey {
        self.0.public().clone()
    }
}

impl Signer for EdDsaSigner {
    fn sign_buffer(&self, data: &[u8]) -> Vec<u8> {
        self.0.sign(data).as_bytes().to_vec()
    }

    fn signature_length(&self) -> usize {
        ED25519_SIGNATURE_LENGTH
    }

    fn public_key_bytes(&self) -> Vec<u8> {
        self.0.public().as_bytes().to_vec()
    }
}

/// A container of per-replica verifiers produced by a single key generation. Verifying for
/// replica `R` extracts `R`'s slot.
#[derive(Clone)]
pub struct MultiVerifier {
    /// Indexed by the replica's offset within the replica principal range (0-based).
    verifiers: Arc<Vec<Arc<dyn Verifier>>>,
}

impl MultiVerifier {
    pub fn new(verifiers: Vec<Arc<dyn Verifier>>) -> Self {
        Self {
            verifiers: Arc::new(verifiers),
        }
    }

    /// Builds a key generation's multi-verifier from `(principal, key)` pairs, rejecting a
    /// principal outside the replica range or the same key material assigned to more than
    /// one replica. Both are fatal misconfiguration, never recoverable at runtime.
    pub fn build(
        registry: &crate::PrincipalRegistry,
        replica_keys: &[(bft_types::PrincipalId, Key)],
    ) -> Result<Self, ConfigurationError> {
        let mut slots: Vec<Option<Arc<dyn Verifier>>> = vec![None; registry.num_replicas() as usize];
        let mut seen_keys: Vec<&[u8]> = Vec::with_capacity(replica_keys.len());

        for (principal, key) in replica_keys {
            let Some(offset) = registry.replica_offset(*principal) else {
                return Err(ConfigurationError::PrincipalOutOfRange {
                    id: principal.as_u16(),
                    low: 0,
                    high: registry.num_replicas(),
                });
            };

            if seen_keys.contains(&key.bytes.as_slice()) {
                return Err(ConfigurationError::DuplicateReplicaKey(principal.as_u16()));
            }
            seen_keys.push(&key.bytes);

            slots[offset] = Some(Arc::new(EdDsaVerifier::from_key(key)?) as Arc<dyn Verifier>);
        }

        let verifiers = slots
            .into_iter()
            .enumerate()
            .map(|(offset, slot)| {
                slot.ok_or(ConfigurationError::MissingReplicaKey(offset as u16))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(verifiers))
    }

    pub fn verifier_for(&self, replica_offset: usize) -> Option<&Arc<dyn Verifier>> {
        self.verifiers.get(replica_offset)
    }

    pub fn len(&self) -> usize {
        self.verifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verifiers.is_empty()
    }
}

/// The symmetric signing side of a key generation. Only the slot for the local replica (if
/// any) is ever populated with `Some`; other slots are `None` since this replica never holds
/// its peers' private keys.
#[derive(Clone)]
pub struct MultiSigner {
    signers: Arc<Vec<Option<Arc<dyn Signer>>>>,
}

impl MultiSigner {
    pub fn new(signers: Vec<Option<Arc<dyn Signer>>>) -> Self {
        Self {
            signers: Arc::new(signers),
        }
    }

    pub fn signer_for(&self, replica_offset: usize) -> Option<&Arc<dyn Signer>> {
        self.signers.get(replica_offset).and_then(|s| s.as_ref())
    }

    /// The signer this generation uses for the local replica, if this replica participates
    /// in the generation at all.
    pub fn own_signer(&self) -> Option<&Arc<dyn Signer>> {
        self.signers.iter().flatten().next()
    }
}
