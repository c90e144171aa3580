// Copyright (c) Consensus Systems Team
// SPDX-License-Identifier: Apache-2.0

use bft_config::{MultiSigner, MultiVerifier};

/// One generation of replica signing keys, activated at a checkpoint boundary and totally
/// ordered by that activation.
#[derive(Clone)]
pub struct KeyGeneration {
    pub generation_id: u64,
    pub checkpoint_activation: u64,
    pub multi_signer: Option<MultiSigner>,
    pub multi_verifier: MultiVerifier,
}

impl KeyGeneration {
    pub fn new(
        generation_id: u64,
        checkpoint_activation: u64,
        multi_signer: Option<MultiSigner>,
        multi_verifier: MultiVerifier,
    ) -> Self {
        Self {
            generation_id,
            checkpoint_activation,
            multi_signer,
            multi_verifier,
        }
    }

    /// True if this generation is the active signer/verifier for a sequence number falling
    /// in checkpoint `cp`, i.e. `activation <= cp`. Retirement is handled separately by the
    /// owning `CryptoEpochManager`, since it depends on siblings in the live set.
    pub fn covers_checkpoint(&self, cp: u64) -> bool {
        self.checkpoint_activation <= cp
    }
}

impl PartialEq for KeyGeneration {
    fn eq(&self, other: &Self) -> bool {
        self.checkpoint_activation == other.checkpoint_activation
    }
}

impl Eq for KeyGeneration {}

impl PartialOrd for KeyGeneration {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KeyGeneration {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.checkpoint_activation.cmp(&other.checkpoint_activation)
    }
}
