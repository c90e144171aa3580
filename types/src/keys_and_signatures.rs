// Copyright (c) Consensus Systems Team
// SPDX-License-Identifier: Apache-2.0

//! Wire format for the serialized snapshot of client public keys that the Signature Manager
//! persists to, and reloads from, reserved pages. Mirrors the `keys_and_signatures.cmf`
//! layout.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::PrincipalId;

/// `version = 2` indicates EdDSA verifiers. `version = 1` was the legacy RSA marker and must
/// never be written by this core.
pub const CLIENTS_PUBLIC_KEYS_VERSION: u8 = 2;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyEntry {
    pub key: Vec<u8>,
    pub format: u8,
}

/// The serializable snapshot that `SignatureManager::get_clients_public_keys` returns, and
/// that reserved-page storage persists across restarts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientsPublicKeys {
    pub version: u8,
    pub ids_to_keys: BTreeMap<PrincipalId, PublicKeyEntry>,
}

impl Default for ClientsPublicKeys {
    fn default() -> Self {
        Self {
            version: CLIENTS_PUBLIC_KEYS_VERSION,
            ids_to_keys: BTreeMap::new(),
        }
    }
}

impl ClientsPublicKeys {
    pub fn serialize(&self) -> Vec<u8> {
        bcs::to_bytes(self).expect("ClientsPublicKeys serialization should not fail")
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, bcs::Error> {
        bcs::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bcs() {
        let mut snapshot = ClientsPublicKeys::default();
        snapshot.ids_to_keys.insert(
            PrincipalId::new(100),
            PublicKeyEntry {
                key: vec![1, 2, 3],
                format: 0,
            },
        );
        let bytes = snapshot.serialize();
        let decoded = ClientsPublicKeys::deserialize(&bytes).unwrap();
        assert_eq!(decoded, snapshot);
        assert_eq!(decoded.version, CLIENTS_PUBLIC_KEYS_VERSION);
    }
}
