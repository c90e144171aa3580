// Copyright (c) Consensus Systems Team
// SPDX-License-Identifier: Apache-2.0

use bft_types::PrincipalId;
use thiserror::Error;

/// Failure modes the Signature Manager and State-Transfer Replica Shim can report at
/// runtime. Construction-time misconfiguration is `bft_config::ConfigurationError`; this
/// enum only covers what can go wrong once the system is up.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SigManagerError {
    #[error("configuration invalid: {0}")]
    ConfigurationInvalid(String),

    #[error("unknown principal {0}")]
    UnknownPrincipal(PrincipalId),

    #[error("signature verification failed")]
    VerificationFailed,

    #[error("key material invalid: {0}")]
    KeyMaterialInvalid(String),

    #[error("transient transport failure: {0}")]
    TransportTransient(String),

    #[error("component already started")]
    AlreadyStarted,

    #[error("component not started")]
    NotStarted,
}

pub type SigResult<T> = Result<T, SigManagerError>;
