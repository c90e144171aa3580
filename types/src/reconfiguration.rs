// Copyright (c) Consensus Systems Team
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::BlockId;

/// An externally produced state change (e.g. key change, membership), delivered as a
/// block-id-tagged payload by the reconfiguration polling client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconfigurationUpdate {
    pub block_id: BlockId,
    pub payload: Vec<u8>,
}

impl ReconfigurationUpdate {
    pub fn new(block_id: BlockId, payload: Vec<u8>) -> Self {
        Self { block_id, payload }
    }
}

impl PartialOrd for ReconfigurationUpdate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReconfigurationUpdate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.block_id.cmp(&other.block_id)
    }
}
