// Copyright (c) Consensus Systems Team
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Misconfiguration detected while building a `PrincipalRegistry` or `KeyStore`. Only ever
/// raised at construction time; callers at the process boundary are expected to treat it as
/// fatal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("principal id {id} is out of range [{low}, {high}]")]
    PrincipalOutOfRange { id: u16, low: u16, high: u16 },

    #[error("duplicate replica key for principal {0}")]
    DuplicateReplicaKey(u16),

    #[error("key index {index} referenced by principal {principal} has no backing key material")]
    DanglingKeyIndex { principal: u16, index: usize },

    #[error("no key material supplied for replica at offset {0}")]
    MissingReplicaKey(u16),

    #[error("malformed key material: {0}")]
    KeyMaterialInvalid(String),
}
