// Copyright (c) Consensus Systems Team
// SPDX-License-Identifier: Apache-2.0

use bft_types::PrincipalId;
use serde::{Deserialize, Serialize};

/// Role a principal id classifies into. Exactly one role per id; roles are laid out as
/// contiguous, non-overlapping ranges in a fixed order:
/// `[replicas] | [read-only replicas] | [client proxies] | [external | internal | service clients]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrincipalRole {
    Replica,
    ReadOnlyReplica,
    ClientProxy,
    ExternalClient,
    InternalClient,
    ClientService,
}

/// The six replica-count parameters a deployment is built from.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct ReplicaCounts {
    pub num_replicas: u16,
    pub num_ro_replicas: u16,
    pub num_client_proxies: u16,
    pub num_external_clients: u16,
    pub num_internal_clients: u16,
    pub num_client_services: u16,
}

/// Classifies principal identifiers into roles by range membership. Pure function over
/// identifier -> role, O(1), computed once at construction from `ReplicaCounts`. Unlike a
/// committee with stake-weighted membership, principal ranges carry no stake or network
/// metadata: they are a pure partition of the id space.
#[derive(Clone, Copy, Debug)]
pub struct PrincipalRegistry {
    replicas: std::ops::Range<u16>,
    ro_replicas: std::ops::Range<u16>,
    client_proxies: std::ops::Range<u16>,
    external_clients: std::ops::Range<u16>,
    internal_clients: std::ops::Range<u16>,
    client_services: std::ops::Range<u16>,
}

impl PrincipalRegistry {
    pub fn new(counts: ReplicaCounts) -> Self {
        let mut cursor: u16 = 0;
        let mut next_range = |count: u16| -> std::ops::Range<u16> {
            let start = cursor;
            cursor = cursor
                .checked_add(count)
                .expect("principal id space overflowed u16");
            start..cursor
        };

        let replicas = next_range(counts.num_replicas);
        let ro_replicas = next_range(counts.num_ro_replicas);
        let client_proxies = next_range(counts.num_client_proxies);
        let external_clients = next_range(counts.num_external_clients);
        let internal_clients = next_range(counts.num_internal_clients);
        let client_services = next_range(counts.num_client_services);

        Self {
            replicas,
            ro_replicas,
            client_proxies,
            external_clients,
            internal_clients,
            client_services,
        }
    }

    pub fn role(&self, pid: PrincipalId) -> Option<PrincipalRole> {
        let id = pid.as_u16();
        if self.replicas.contains(&id) {
            Some(PrincipalRole::Replica)
        } else if self.ro_replicas.contains(&id) {
            Some(PrincipalRole::ReadOnlyReplica)
        } else if self.client_proxies.contains(&id) {
            Some(PrincipalRole::ClientProxy)
        } else if self.external_clients.contains(&id) {
            Some(PrincipalRole::ExternalClient)
        } else if self.internal_clients.contains(&id) {
            Some(PrincipalRole::InternalClient)
        } else if self.client_services.contains(&id) {
            Some(PrincipalRole::ClientService)
        } else {
            None
        }
    }

    pub fn is_replica(&self, pid: PrincipalId) -> bool {
        self.replicas.contains(&pid.as_u16())
    }

    /// The replica's 0-based offset into the multi-signer/multi-verifier slots of a key
    /// generation, or `None` if `pid` is not a full (voting) replica. Read-only replicas have
    /// no multisig slot and are verified through the Key Store instead.
    pub fn replica_offset(&self, pid: PrincipalId) -> Option<usize> {
        let id = pid.as_u16();
        if self.replicas.contains(&id) {
            Some((id - self.replicas.start) as usize)
        } else {
            None
        }
    }

    pub fn is_ro_replica(&self, pid: PrincipalId) -> bool {
        self.ro_replicas.contains(&pid.as_u16())
    }

    pub fn is_client_proxy(&self, pid: PrincipalId) -> bool {
        self.client_proxies.contains(&pid.as_u16())
    }

    pub fn is_external_client(&self, pid: PrincipalId) -> bool {
        self.external_clients.contains(&pid.as_u16())
    }

    pub fn is_internal_client(&self, pid: PrincipalId) -> bool {
        self.internal_clients.contains(&pid.as_u16())
    }

    pub fn is_client_service(&self, pid: PrincipalId) -> bool {
        self.client_services.contains(&pid.as_u16())
    }

    /// True for any principal recognized by this registry, replica or otherwise.
    pub fn is_known(&self, pid: PrincipalId) -> bool {
        self.role(pid).is_some()
    }

    pub fn num_replicas(&self) -> u16 {
        (self.replicas.end - self.replicas.start) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts() -> ReplicaCounts {
        ReplicaCounts {
            num_replicas: 4,
            num_ro_replicas: 2,
            num_client_proxies: 1,
            num_external_clients: 3,
            num_internal_clients: 1,
            num_client_services: 1,
        }
    }

    #[test]
    fn classifies_every_range_boundary() {
        let pr = PrincipalRegistry::new(counts());

        assert!(pr.is_replica(PrincipalId::new(0)));
        assert!(pr.is_replica(PrincipalId::new(3)));
        assert!(!pr.is_replica(PrincipalId::new(4)));

        assert!(pr.is_ro_replica(PrincipalId::new(4)));
        assert!(pr.is_ro_replica(PrincipalId::new(5)));
        assert!(!pr.is_ro_replica(PrincipalId::new(6)));

        assert!(pr.is_client_proxy(PrincipalId::new(6)));
        assert!(!pr.is_client_proxy(PrincipalId::new(7)));

        assert!(pr.is_external_client(PrincipalId::new(7)));
        assert!(pr.is_external_client(PrincipalId::new(9)));
        assert!(!pr.is_external_client(PrincipalId::new(10)));

        assert!(pr.is_internal_client(PrincipalId::new(10)));
        assert!(pr.is_client_service(PrincipalId::new(11)));

        assert!(!pr.is_known(PrincipalId::new(12)));
        assert_eq!(pr.role(PrincipalId::new(12)), None);

        assert_eq!(pr.replica_offset(PrincipalId::new(2)), Some(2));
        assert_eq!(pr.replica_offset(PrincipalId::new(4)), None);
    }

    #[test]
    fn num_replicas_matches_input() {
        let pr = PrincipalRegistry::new(counts());
        assert_eq!(pr.num_replicas(), 4);
    }
}
