// Copyright (c) Consensus Systems Team
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ReplicaCounts;

/// The signature algorithm a deployment signs replica messages with. EdDSA is the only
/// variant this core exercises; the enum is left open for a future algorithm to join it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SigningAlgorithm {
    #[default]
    EdDsa,
}

/// Operational configuration of the Signature Manager and State-Transfer Replica Shim.
///
/// All fields should tolerate inconsistencies among replicas, without affecting safety of
/// the protocol.
///
/// NOTE: default values should make sense, so most operators should not need to specify any
/// field.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Parameters {
    /// Signing algorithm replica messages use.
    #[serde(default)]
    pub replica_msg_signing_algo: SigningAlgorithm,

    /// Gates whether client verifiers are built at all.
    #[serde(default = "Parameters::default_true")]
    pub client_transaction_signing_enabled: bool,

    /// Gates whether the post-state-transfer reconciliation pipeline reloads replica keys,
    /// advances the Crypto Epoch Manager, and syncs key-exchange candidates.
    #[serde(default = "Parameters::default_true")]
    pub single_signature_scheme: bool,

    #[serde(default)]
    pub debug_statistics_enabled: bool,

    #[serde(default)]
    pub debug_persistent_storage_enabled: bool,

    /// Number of sequence numbers per checkpoint; also used to compute which key generation
    /// applies to a given sequence.
    #[serde(default = "Parameters::default_checkpoint_window")]
    pub checkpoint_window: u64,

    /// Number of in-flight sequence numbers kept before a checkpoint forces a stall.
    #[serde(default = "Parameters::default_work_window")]
    pub work_window: u64,

    /// Size in bytes of one reserved page, used only to compute reserved-page counts.
    #[serde(default = "Parameters::default_reserved_page_size")]
    pub reserved_page_size: usize,

    pub max_reply_message_size: usize,

    #[serde(default)]
    pub client_batching_max_msgs: usize,

    /// How long to wait between timer firings that drive state-transfer progress.
    #[serde(default = "Parameters::default_state_transfer_timer_period")]
    pub state_transfer_timer_period: Duration,

    /// Bounds the reconciliation drain loop. `None` keeps it unbounded-but-logged; `Some(n)`
    /// fails closed with `SigManagerError::TransportTransient` after `n` unsuccessful polls.
    #[serde(default)]
    pub reconciliation_poll_budget: Option<u32>,

    pub replica_counts: ReplicaCounts,
}

impl Parameters {
    fn default_true() -> bool {
        true
    }

    pub fn default_checkpoint_window() -> u64 {
        150
    }

    pub fn default_work_window() -> u64 {
        300
    }

    pub fn default_reserved_page_size() -> usize {
        4096
    }

    pub fn default_state_transfer_timer_period() -> Duration {
        Duration::from_secs(5)
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            replica_msg_signing_algo: SigningAlgorithm::default(),
            client_transaction_signing_enabled: true,
            single_signature_scheme: true,
            debug_statistics_enabled: false,
            debug_persistent_storage_enabled: false,
            checkpoint_window: Self::default_checkpoint_window(),
            work_window: Self::default_work_window(),
            reserved_page_size: Self::default_reserved_page_size(),
            max_reply_message_size: 8192,
            client_batching_max_msgs: 1,
            state_transfer_timer_period: Self::default_state_transfer_timer_period(),
            reconciliation_poll_budget: None,
            replica_counts: ReplicaCounts::default(),
        }
    }
}
