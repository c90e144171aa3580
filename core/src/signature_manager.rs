// Copyright (c) Consensus Systems Team
// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use bft_config::{EdDsaVerifier, Key, KeyFormat, PrincipalRegistry, Signer, Verifier};
use bft_types::{ClientsPublicKeys, PrincipalId, PublicKeyEntry, CLIENTS_PUBLIC_KEYS_VERSION};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::crypto_epoch_manager::CryptoEpochManager;
use crate::error::{SigManagerError, SigResult};
use crate::key_store::KeyStore;
use crate::metrics::{SignatureManagerMetrics, UPDATE_METRICS_AGGREGATOR_THRESH};

/// Public façade for signing and verification. Routes through the Crypto Epoch Manager for
/// replica principals, through the Key Store for everyone else.
pub struct SignatureManager {
    registry: PrincipalRegistry,
    key_store: KeyStore,
    cem: CryptoEpochManager,
    metrics: SignatureManagerMetrics,
    clients_public_keys: RwLock<ClientsPublicKeys>,
    replica_verify_successes: AtomicU64,
    client_verify_successes: AtomicU64,
    last_executed_seq: AtomicU64,
}

impl SignatureManager {
    pub fn new(
        registry: PrincipalRegistry,
        key_store: KeyStore,
        cem: CryptoEpochManager,
        metrics: SignatureManagerMetrics,
    ) -> Self {
        Self {
            registry,
            key_store,
            cem,
            metrics,
            clients_public_keys: RwLock::new(ClientsPublicKeys::default()),
            replica_verify_successes: AtomicU64::new(0),
            client_verify_successes: AtomicU64::new(0),
            last_executed_seq: AtomicU64::new(0),
        }
    }

    /// Records the last-executed sequence number as of a completed state-transfer checkpoint.
    /// Purely informational bookkeeping: nothing in this core currently reads it back besides
    /// `last_executed_seq`.
    pub fn set_replica_last_executed_seq(&self, seq: u64) {
        self.last_executed_seq.store(seq, Ordering::Relaxed);
    }

    pub fn last_executed_seq(&self) -> u64 {
        self.last_executed_seq.load(Ordering::Relaxed)
    }

    /// Signs `data` as the local replica for sequence number `seq`. Requires the Crypto
    /// Epoch Manager to have an active signer for `seq`'s checkpoint; this replica is not a
    /// participant in a generation that lacks one (e.g. a read-only replica).
    pub fn sign(&self, seq: u64, data: &[u8]) -> SigResult<Vec<u8>> {
        let signer = self
            .cem
            .signer(seq)
            .ok_or_else(|| SigManagerError::ConfigurationInvalid(
                "no active replica signer for this sequence".to_string(),
            ))?;
        Ok(signer.sign_buffer(data))
    }

    /// Tries every live key generation's verifier for `src`, returning on the first success.
    pub fn verify_replica_sig(&self, src: PrincipalId, data: &[u8], sig: &[u8]) -> SigResult<()> {
        let Some(offset) = self.registry.replica_offset(src) else {
            self.metrics
                .sig_verification_failed_on_unrecognized_participant_id
                .inc();
            return Err(SigManagerError::UnknownPrincipal(src));
        };

        for multi_verifier in self.cem.latest_verifiers() {
            if let Some(verifier) = multi_verifier.verifier_for(offset) {
                debug!(principal = %src, len = sig.len(), "trying replica verifier");
                if verifier.verify_buffer(data, sig) {
                    self.record_replica_success();
                    return Ok(());
                }
            }
        }

        self.metrics.replica_sig_verification_failed.inc();
        Err(SigManagerError::VerificationFailed)
    }

    /// Looks up `src` in the Key Store; an unknown principal is a (non-fatal) verification
    /// failure, not an error.
    pub fn verify_non_replica_sig(&self, src: PrincipalId, data: &[u8], sig: &[u8]) -> bool {
        let Some(verifier) = self.key_store.verifier_for(src) else {
            self.metrics
                .sig_verification_failed_on_unrecognized_participant_id
                .inc();
            return false;
        };

        if verifier.verify_buffer(data, sig) {
            self.record_client_success();
            true
        } else {
            self.metrics.external_client_req_sig_verification_failed.inc();
            false
        }
    }

    /// Dispatches by the principal's role in the registry. Only full replicas carry a
    /// multisig slot; read-only replicas are verified through the Key Store like any other
    /// non-replica principal.
    pub fn verify_sig(&self, src: PrincipalId, data: &[u8], sig: &[u8]) -> SigResult<bool> {
        if self.registry.is_replica(src) {
            match self.verify_replica_sig(src, data, sig) {
                Ok(()) => Ok(true),
                Err(SigManagerError::VerificationFailed) => Ok(false),
                Err(other) => Err(other),
            }
        } else {
            Ok(self.verify_non_replica_sig(src, data, sig))
        }
    }

    /// Signs `data` with every latest signer and checks whether any produced signature
    /// byte-matches `expected`. Used during catch-up reconciliation to confirm a previously
    /// emitted signature is reproducible under the current key material.
    pub fn verify_own_signature(&self, data: &[u8], expected: &[u8]) -> bool {
        self.cem
            .latest_signers()
            .iter()
            .filter_map(|multi| multi.own_signer())
            .any(|signer| signer.sign_buffer(data) == expected)
    }

    /// Signature length for `pid`: for a full replica, that replica's slot in the latest
    /// generation's multi-verifier; the Key Store's verifier length for everyone else,
    /// including read-only replicas, which are verified through the Key Store like any other
    /// non-replica principal. Zero on unknown.
    pub fn sig_length(&self, pid: PrincipalId) -> usize {
        if let Some(offset) = self.registry.replica_offset(pid) {
            self.cem
                .latest_verifiers()
                .iter()
                .find_map(|multi| multi.verifier_for(offset).map(|v| v.signature_length()))
                .unwrap_or(0)
        } else {
            self.key_store
                .verifier_for(pid)
                .map(|v| v.signature_length())
                .unwrap_or(0)
        }
    }

    /// Hot update for client principals. Builds and validates the new verifier before taking
    /// any exclusive lock, then reflects it into the serializable snapshot.
    pub fn set_client_public_key(
        &self,
        key: &Key,
        id: PrincipalId,
        format: KeyFormat,
    ) -> SigResult<()> {
        if self.registry.is_replica(id) || self.registry.is_ro_replica(id) {
            return Err(SigManagerError::ConfigurationInvalid(
                "set_client_public_key called for a replica principal".to_string(),
            ));
        }

        EdDsaVerifier::from_key(key)
            .map_err(|e| SigManagerError::KeyMaterialInvalid(e.to_string()))?;
        self.key_store.set_key(id, key)?;

        let mut snapshot = self.clients_public_keys.write();
        snapshot.version = CLIENTS_PUBLIC_KEYS_VERSION;
        snapshot.ids_to_keys.insert(
            id,
            PublicKeyEntry {
                key: key.bytes.clone(),
                format: format as u8,
            },
        );
        Ok(())
    }

    pub fn get_clients_public_keys(&self) -> ClientsPublicKeys {
        self.clients_public_keys.read().clone()
    }

    /// Crypto Epoch Manager backing this facade, exposed for the reconciliation pipeline
    /// (`CryptoEpochManager::on_checkpoint`, `latest_generation`).
    pub fn crypto_epoch_manager(&self) -> &CryptoEpochManager {
        &self.cem
    }

    /// Key Store backing this facade, exposed so the reconciliation pipeline can reload
    /// other replicas' public keys after catch-up.
    pub fn key_store(&self) -> &KeyStore {
        &self.key_store
    }

    fn record_replica_success(&self) {
        let count = self.replica_verify_successes.fetch_add(1, Ordering::Relaxed) + 1;
        if count % UPDATE_METRICS_AGGREGATOR_THRESH == 0 {
            self.metrics
                .replica_sig_verified
                .inc_by(UPDATE_METRICS_AGGREGATOR_THRESH);
        }
    }

    fn record_client_success(&self) {
        let count = self.client_verify_successes.fetch_add(1, Ordering::Relaxed) + 1;
        if count % UPDATE_METRICS_AGGREGATOR_THRESH == 0 {
            self.metrics
                .external_client_req_sig_verified
                .inc_by(UPDATE_METRICS_AGGREGATOR_THRESH);
        }
    }
}

static INSTANCE: ArcSwapOption<SignatureManager> = ArcSwapOption::const_empty();

/// Installs `sm` as the process-wide Signature Manager, replacing anything previously
/// installed. Atomic so tests can swap in a fresh instance between cases.
pub fn install(sm: SignatureManager) -> Arc<SignatureManager> {
    let arc = Arc::new(sm);
    INSTANCE.store(Some(arc.clone()));
    arc
}

/// Returns the process-wide Signature Manager.
///
/// # Panics
/// Panics if no instance has been installed yet; this is a programmer error, not a runtime
/// condition callers are expected to recover from.
pub fn instance() -> Arc<SignatureManager> {
    INSTANCE
        .load_full()
        .unwrap_or_else(|| {
            warn!("SignatureManager::instance() called before install()");
            panic!("SignatureManager not initialized")
        })
}

/// Clears the process-wide instance. Test-harness only.
pub fn reset() {
    INSTANCE.store(None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bft_config::{EdDsaSigner, MultiSigner, MultiVerifier, ReplicaCounts};
    use rand::{rngs::StdRng, SeedableRng};

    fn make_sm(replica_count: u16) -> (SignatureManager, Vec<EdDsaSigner>) {
        let registry = PrincipalRegistry::new(ReplicaCounts {
            num_replicas: replica_count,
            num_ro_replicas: 0,
            num_client_proxies: 0,
            num_external_clients: 2,
            num_internal_clients: 0,
            num_client_services: 0,
        });

        let mut signers = Vec::new();
        let mut verifiers: Vec<Arc<dyn Verifier>> = Vec::new();
        let mut multi_signers: Vec<Option<Arc<dyn Signer>>> = Vec::new();
        for i in 0..replica_count {
            let seed = [i as u8 + 1; 32];
            // `EdDsaSigner` has no `Clone`; regenerate from the same seed to get a second,
            // independent handle to the local replica's own keypair for test assertions.
            let for_generation = EdDsaSigner::generate(&mut StdRng::from_seed(seed));
            let for_test = EdDsaSigner::generate(&mut StdRng::from_seed(seed));
            let key = Key::raw(for_generation.public_key().as_bytes().to_vec());
            verifiers.push(Arc::new(EdDsaVerifier::from_key(&key).unwrap()));
            multi_signers.push(if i == 0 {
                Some(Arc::new(for_generation) as Arc<dyn Signer>)
            } else {
                None
            });
            signers.push(for_test);
        }

        let generation = crate::key_generation::KeyGeneration::new(
            0,
            0,
            Some(MultiSigner::new(multi_signers)),
            MultiVerifier::new(verifiers),
        );
        let cem = CryptoEpochManager::new(150, generation);
        let key_store = KeyStore::empty();
        let metrics = SignatureManagerMetrics::new_for_test();
        (SignatureManager::new(registry, key_store, cem, metrics), signers)
    }

    #[test]
    fn replica_signature_round_trips_through_verify() {
        let (sm, signers) = make_sm(1);
        let own = &signers[0];
        let sig = own.sign_buffer(b"hello");
        assert!(sm
            .verify_replica_sig(PrincipalId::new(0), b"hello", &sig)
            .is_ok());
    }

    #[test]
    fn unknown_replica_principal_is_rejected() {
        let (sm, _signers) = make_sm(1);
        let err = sm
            .verify_replica_sig(PrincipalId::new(50), b"x", b"sig")
            .unwrap_err();
        assert_eq!(err, SigManagerError::UnknownPrincipal(PrincipalId::new(50)));
    }

    #[test]
    fn client_hot_update_then_verify() {
        let (sm, _signers) = make_sm(1);
        let mut rng = StdRng::from_seed([99; 32]);
        let client_signer = EdDsaSigner::generate(&mut rng);
        let client_key = Key::raw(client_signer.public_key().as_bytes().to_vec());

        let client_id = PrincipalId::new(1);
        sm.set_client_public_key(&client_key, client_id, KeyFormat::Raw)
            .unwrap();

        let sig = client_signer.sign_buffer(b"payload");
        assert!(sm.verify_non_replica_sig(client_id, b"payload", &sig));

        let snapshot = sm.get_clients_public_keys();
        assert_eq!(snapshot.version, CLIENTS_PUBLIC_KEYS_VERSION);
        assert!(snapshot.ids_to_keys.contains_key(&client_id));
    }

    #[test]
    fn read_only_replica_verifies_through_key_store_not_multisig() {
        let registry = PrincipalRegistry::new(ReplicaCounts {
            num_replicas: 1,
            num_ro_replicas: 1,
            ..Default::default()
        });

        let mut rng = StdRng::from_seed([42; 32]);
        let ro_signer = EdDsaSigner::generate(&mut rng);
        let ro_key = Key::raw(ro_signer.public_key().as_bytes().to_vec());
        let ro_id = PrincipalId::new(1);

        let key_store = KeyStore::empty();
        key_store.set_key(ro_id, &ro_key).unwrap();

        let generation = crate::key_generation::KeyGeneration::new(
            0,
            0,
            None,
            MultiVerifier::new(Vec::new()),
        );
        let cem = CryptoEpochManager::new(150, generation);
        let sm = SignatureManager::new(
            registry,
            key_store,
            cem,
            SignatureManagerMetrics::new_for_test(),
        );

        let sig = ro_signer.sign_buffer(b"catch-up");
        assert!(sm.verify_sig(ro_id, b"catch-up", &sig).unwrap());
        assert_eq!(sm.sig_length(ro_id), ro_signer.signature_length());
    }

    #[test]
    fn set_client_public_key_rejects_replica_principal() {
        let (sm, _signers) = make_sm(1);
        let key = Key::raw(vec![0; 32]);
        let err = sm
            .set_client_public_key(&key, PrincipalId::new(0), KeyFormat::Raw)
            .unwrap_err();
        assert!(matches!(err, SigManagerError::ConfigurationInvalid(_)));
    }

    #[test]
    fn install_and_reset_round_trip() {
        reset();
        let (sm, _signers) = make_sm(1);
        install(sm);
        assert_eq!(instance().sig_length(PrincipalId::new(0)), 64);
        reset();
    }

    #[test]
    fn verify_own_signature_matches_local_replay() {
        let (sm, _signers) = make_sm(1);
        let sig = sm.sign(0, b"replay-me").unwrap();
        assert!(sm.verify_own_signature(b"replay-me", &sig));
        assert!(!sm.verify_own_signature(b"different", &sig));
    }
}
