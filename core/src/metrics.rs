// Copyright (c) Consensus Systems Team
// SPDX-License-Identifier: Apache-2.0

use prometheus::{IntCounter, Registry};

/// Number of verification outcomes the Signature Manager aggregates before flushing them
/// to the underlying counters. Mirrors `updateMetricsAggregatorThresh`.
pub const UPDATE_METRICS_AGGREGATOR_THRESH: u64 = 1000;

/// Counters the Signature Manager updates on every sign/verify call. Registered under the
/// `signature_manager` namespace so they can be scraped alongside the rest of the replica's
/// metrics.
pub struct SignatureManagerMetrics {
    pub external_client_req_sig_verification_failed: IntCounter,
    pub external_client_req_sig_verified: IntCounter,
    pub replica_sig_verification_failed: IntCounter,
    pub replica_sig_verified: IntCounter,
    pub sig_verification_failed_on_unrecognized_participant_id: IntCounter,
}

impl SignatureManagerMetrics {
    pub fn new(registry: &Registry) -> Self {
        let metrics = Self {
            external_client_req_sig_verification_failed: IntCounter::new(
                "signature_manager_external_client_req_sig_verification_failed",
                "external client request signatures that failed verification",
            )
            .unwrap(),
            external_client_req_sig_verified: IntCounter::new(
                "signature_manager_external_client_req_sig_verified",
                "external client request signatures that verified successfully",
            )
            .unwrap(),
            replica_sig_verification_failed: IntCounter::new(
                "signature_manager_replica_sig_verification_failed",
                "replica signatures that failed verification",
            )
            .unwrap(),
            replica_sig_verified: IntCounter::new(
                "signature_manager_replica_sig_verified",
                "replica signatures that verified successfully",
            )
            .unwrap(),
            sig_verification_failed_on_unrecognized_participant_id: IntCounter::new(
                "signature_manager_sig_verification_failed_on_unrecognized_participant_id",
                "verification attempts against a principal id the registry does not know",
            )
            .unwrap(),
        };

        for counter in metrics.all_counters() {
            registry
                .register(Box::new(counter.clone()))
                .expect("duplicate signature manager metric registration");
        }

        metrics
    }

    fn all_counters(&self) -> [&IntCounter; 5] {
        [
            &self.external_client_req_sig_verification_failed,
            &self.external_client_req_sig_verified,
            &self.replica_sig_verification_failed,
            &self.replica_sig_verified,
            &self.sig_verification_failed_on_unrecognized_participant_id,
        ]
    }

    #[cfg(test)]
    pub fn new_for_test() -> Self {
        Self::new(&Registry::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_without_panicking() {
        let registry = Registry::new();
        let metrics = SignatureManagerMetrics::new(&registry);
        metrics.replica_sig_verified.inc();
        assert_eq!(metrics.replica_sig_verified.get(), 1);
        assert_eq!(registry.gather().len(), 5);
    }
}
