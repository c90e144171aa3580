// Copyright (c) Consensus Systems Team
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::sync::Arc;

use bft_config::{EdDsaSigner, Key, Signer, Verifier};
use bft_types::PrincipalId;
use parking_lot::Mutex;

use crate::key_generation::KeyGeneration;

/// Holds `{principal_id -> pending_private_key}` candidates introduced by in-band
/// key-exchange messages, until state transfer confirms which ones are genuine.
pub struct KeyExchangeCoordinator {
    candidates: Mutex<HashMap<PrincipalId, Key>>,
}

impl KeyExchangeCoordinator {
    pub fn new() -> Self {
        Self {
            candidates: Mutex::new(HashMap::new()),
        }
    }

    /// Single-writer copy-on-append: a later candidate for the same principal simply
    /// replaces the earlier one.
    pub fn offer_candidate(&self, principal: PrincipalId, key: Key) {
        self.candidates.lock().insert(principal, key);
    }

    /// Walks the latest generation's public keys and keeps only the candidates whose
    /// derived public key matches what the generation already records for that principal.
    /// Matched candidates are removed from the pending set and returned for persistence.
    pub fn sync_private_keys_after_st(
        &self,
        generation: &KeyGeneration,
    ) -> Vec<(PrincipalId, Key)> {
        let mut candidates = self.candidates.lock();
        let mut persistable = Vec::new();

        candidates.retain(|principal, candidate_key| {
            let Some(expected_public) = generation
                .multi_verifier
                .verifier_for(principal.as_u16() as usize)
            else {
                return true;
            };

            let Ok(private_bytes) = candidate_key.decoded_bytes() else {
                return false;
            };
            let Ok(candidate_signer) =
                EdDsaSigner::from_key(&Key::raw(private_bytes)) else {
                return false;
            };
            let derived_public = candidate_signer.public_key().as_bytes().to_vec();

            // Compare via a signature round-trip since `Verifier` does not expose the raw
            // public key bytes it was built from.
            let probe = candidate_signer.sign_buffer(b"bft-key-exchange-probe");
            if expected_public.verify_buffer(b"bft-key-exchange-probe", &probe) {
                persistable.push((*principal, Key::raw(derived_public)));
                false
            } else {
                true
            }
        });

        persistable
    }

    pub fn pending_count(&self) -> usize {
        self.candidates.lock().len()
    }
}

impl Default for KeyExchangeCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
