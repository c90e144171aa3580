// Copyright (c) Consensus Systems Team
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use arc_swap::ArcSwap;
use bft_config::{MultiSigner, MultiVerifier, Signer};

use crate::key_generation::KeyGeneration;

/// Holds an ordered, at-most-2-element set of live key generations, published through an
/// `ArcSwap` so readers never block behind a rotation.
///
/// Generations are published copy-on-write: a rotation builds the new set and swaps it in
/// wholesale rather than mutating the live one in place.
pub struct CryptoEpochManager {
    checkpoint_window: u64,
    generations: ArcSwap<Vec<KeyGeneration>>,
}

impl CryptoEpochManager {
    pub fn new(checkpoint_window: u64, initial: KeyGeneration) -> Self {
        Self {
            checkpoint_window,
            generations: ArcSwap::from_pointee(vec![initial]),
        }
    }

    /// Appends a new generation to the live set, keeping it sorted by activation. Callers
    /// are responsible for calling `on_checkpoint` afterwards to retire anything stale.
    pub fn add_generation(&self, generation: KeyGeneration) {
        let mut next = (**self.generations.load()).clone();
        next.push(generation);
        next.sort();
        self.generations.store(Arc::new(next));
    }

    /// Retires generations whose activation is strictly less than `checkpoint - 1`, keeping
    /// at least the most recent generation alive.
    pub fn on_checkpoint(&self, checkpoint: u64) {
        let current = self.generations.load();
        if current.len() <= 1 {
            return;
        }
        let threshold = checkpoint.saturating_sub(1);
        let mut retained: Vec<KeyGeneration> = current
            .iter()
            .filter(|g| g.checkpoint_activation >= threshold)
            .cloned()
            .collect();
        if retained.is_empty() {
            retained.push(current.last().expect("non-empty live set").clone());
        }
        self.generations.store(Arc::new(retained));
    }

    /// The signer active for sequence number `seq`, i.e. the generation with the largest
    /// activation not exceeding `floor(seq / checkpoint_window)`.
    pub fn signer(&self, seq: u64) -> Option<Arc<dyn Signer>> {
        let checkpoint = seq / self.checkpoint_window.max(1);
        let generations = self.generations.load();
        generations
            .iter()
            .filter(|g| g.covers_checkpoint(checkpoint))
            .max_by_key(|g| g.checkpoint_activation)
            .and_then(|g| g.multi_signer.as_ref())
            .and_then(|s| s.own_signer())
            .cloned()
    }

    pub fn latest_signers(&self) -> Vec<MultiSigner> {
        self.generations
            .load()
            .iter()
            .filter_map(|g| g.multi_signer.clone())
            .collect()
    }

    pub fn latest_verifiers(&self) -> Vec<MultiVerifier> {
        self.generations
            .load()
            .iter()
            .map(|g| g.multi_verifier.clone())
            .collect()
    }

    pub fn live_generation_count(&self) -> usize {
        self.generations.load().len()
    }

    /// The generation with the largest activation checkpoint, used by the reconciliation
    /// pipeline to validate key-exchange candidates against the most recent public keys.
    pub fn latest_generation(&self) -> KeyGeneration {
        self.generations
            .load()
            .iter()
            .max_by_key(|g| g.checkpoint_activation)
            .cloned()
            .expect("generations list is never empty")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bft_config::{EdDsaSigner, EdDsaVerifier, Key};
    use rand::{rngs::StdRng, SeedableRng};

    fn generation(id: u64, activation: u64, seed: u8) -> KeyGeneration {
        let mut rng = StdRng::from_seed([seed; 32]);
        let signer = EdDsaSigner::generate(&mut rng);
        let key = Key::raw(signer.public_key().as_bytes().to_vec());
        let verifier: Arc<dyn bft_config::Verifier> = Arc::new(EdDsaVerifier::from_key(&key).unwrap());
        let signer_arc: Arc<dyn Signer> = Arc::new(signer);
        KeyGeneration::new(
            id,
            activation,
            Some(MultiSigner::new(vec![Some(signer_arc)])),
            MultiVerifier::new(vec![verifier]),
        )
    }

    #[test]
    fn retires_stale_generations_on_checkpoint() {
        let cem = CryptoEpochManager::new(150, generation(0, 0, 1));
        cem.add_generation(generation(1, 5, 2));
        assert_eq!(cem.live_generation_count(), 2);

        cem.on_checkpoint(7);
        assert_eq!(cem.live_generation_count(), 1);
        assert_eq!(cem.latest_signers().len(), 1);
    }

    #[test]
    fn keeps_at_least_one_generation_alive() {
        let cem = CryptoEpochManager::new(150, generation(0, 0, 3));
        cem.on_checkpoint(1000);
        assert_eq!(cem.live_generation_count(), 1);
    }

    #[test]
    fn signer_picks_the_generation_covering_the_sequence() {
        let cem = CryptoEpochManager::new(150, generation(0, 0, 4));
        cem.add_generation(generation(1, 2, 5));

        assert!(cem.signer(0).is_some());
        assert_eq!(cem.live_generation_count(), 2);
    }
}
