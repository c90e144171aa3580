// Copyright (c) Consensus Systems Team
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::sync::Arc;

use bft_config::{ConfigurationError, Key, KeyFormat, Signer, Verifier};
use bft_types::PrincipalId;
use parking_lot::RwLock;

use crate::error::{SigManagerError, SigResult};

/// Owns `{principal_id -> shared verifier}`. Principals sharing a key index alias to the
/// same verifier instance rather than each holding a copy, following the usual
/// `Arc`-shared-state convention for anything handed out across threads.
pub struct KeyStore {
    verifiers: RwLock<HashMap<PrincipalId, Arc<dyn Verifier>>>,
}

impl KeyStore {
    /// Builds one verifier per distinct key index, then aliases every principal in
    /// `principal_to_index` to its index's verifier. A principal referencing an index with
    /// no backing key material is a `DanglingKeyIndex` configuration error.
    pub fn build(
        keys: &[(Key, KeyFormat)],
        principal_to_index: &[(PrincipalId, usize)],
    ) -> Result<Self, ConfigurationError> {
        let mut index_verifiers: Vec<Arc<dyn Verifier>> = Vec::with_capacity(keys.len());
        for (key, _format) in keys {
            let verifier = bft_config::EdDsaVerifier::from_key(key)?;
            index_verifiers.push(Arc::new(verifier));
        }

        let mut verifiers = HashMap::with_capacity(principal_to_index.len());
        for (principal, index) in principal_to_index {
            let verifier =
                index_verifiers
                    .get(*index)
                    .ok_or(ConfigurationError::DanglingKeyIndex {
                        principal: principal.as_u16(),
                        index: *index,
                    })?;
            verifiers.insert(*principal, verifier.clone());
        }

        Ok(Self {
            verifiers: RwLock::new(verifiers),
        })
    }

    pub fn empty() -> Self {
        Self {
            verifiers: RwLock::new(HashMap::new()),
        }
    }

    /// Looks up the verifier for `principal` under a shared lock. `None` on an unknown
    /// principal; callers decide how to account for that.
    pub fn verifier_for(&self, principal: PrincipalId) -> Option<Arc<dyn Verifier>> {
        self.verifiers.read().get(&principal).cloned()
    }

    pub fn contains(&self, principal: PrincipalId) -> bool {
        self.verifiers.read().contains_key(&principal)
    }

    /// Hot update for external clients and client services, built and validated entirely
    /// before taking the exclusive lock so a bad key leaves the store unchanged.
    pub fn set_key(
        &self,
        principal: PrincipalId,
        key: &Key,
    ) -> SigResult<()> {
        let verifier = bft_config::EdDsaVerifier::from_key(key)
            .map_err(|e| SigManagerError::KeyMaterialInvalid(e.to_string()))?;
        self.verifiers
            .write()
            .insert(principal, Arc::new(verifier));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bft_config::EdDsaSigner;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn aliases_shared_key_index_across_principals() {
        let mut rng = StdRng::from_seed([1; 32]);
        let signer = EdDsaSigner::generate(&mut rng);
        let key = Key::raw(signer.public_key().as_bytes().to_vec());

        let store = KeyStore::build(
            &[(key, KeyFormat::Raw)],
            &[
                (PrincipalId::new(10), 0),
                (PrincipalId::new(11), 0),
            ],
        )
        .unwrap();

        let sig = signer.sign_buffer(b"payload");
        let v10 = store.verifier_for(PrincipalId::new(10)).unwrap();
        let v11 = store.verifier_for(PrincipalId::new(11)).unwrap();
        assert!(v10.verify_buffer(b"payload", &sig));
        assert!(v11.verify_buffer(b"payload", &sig));
        assert!(Arc::ptr_eq(&v10, &v11));
    }

    #[test]
    fn dangling_key_index_is_a_configuration_error() {
        let err = KeyStore::build(&[], &[(PrincipalId::new(0), 0)]).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::DanglingKeyIndex {
                principal: 0,
                index: 0
            }
        );
    }

    #[test]
    fn unknown_principal_lookup_returns_none() {
        let store = KeyStore::empty();
        assert!(store.verifier_for(PrincipalId::new(5)).is_none());
    }

    #[test]
    fn hot_update_replaces_verifier() {
        let store = KeyStore::empty();
        let mut rng = StdRng::from_seed([2; 32]);
        let signer = EdDsaSigner::generate(&mut rng);
        let key = Key::raw(signer.public_key().as_bytes().to_vec());

        store.set_key(PrincipalId::new(20), &key).unwrap();
        let verifier = store.verifier_for(PrincipalId::new(20)).unwrap();
        let sig = signer.sign_buffer(b"x");
        assert!(verifier.verify_buffer(b"x", &sig));
    }

    #[test]
    fn hot_update_with_bad_key_leaves_store_unchanged() {
        let store = KeyStore::empty();
        let bad = Key::hex("not-hex!!");
        assert!(store.set_key(PrincipalId::new(1), &bad).is_err());
        assert!(store.verifier_for(PrincipalId::new(1)).is_none());
    }
}
