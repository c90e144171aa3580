// Copyright (c) Consensus Systems Team
// SPDX-License-Identifier: Apache-2.0

use std::collections::VecDeque;

use bft_types::{BlockId, ReconfigurationUpdate};
use parking_lot::{Condvar, Mutex};

struct Inner {
    queue: VecDeque<ReconfigurationUpdate>,
    last_known_block_id: BlockId,
    stopped: bool,
}

/// A lazy bounded sequence of reconfiguration updates. Producers push sorted batches,
/// consumers block for the next one; stopping the client wakes every blocked consumer with
/// a sentinel `(last_known, [])` response.
pub struct ReconfigurationPollingClient {
    inner: Mutex<Inner>,
    available: Condvar,
}

impl ReconfigurationPollingClient {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                queue: VecDeque::new(),
                last_known_block_id: BlockId::ZERO,
                stopped: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Sorts `updates` by block id, drops anything not strictly newer than the watermark,
    /// advances the watermark to the last admitted update, and wakes one waiter.
    pub fn push_update(&self, mut updates: Vec<ReconfigurationUpdate>) {
        updates.sort();
        let mut inner = self.inner.lock();
        for update in updates {
            if update.block_id > inner.last_known_block_id {
                inner.last_known_block_id = update.block_id;
                inner.queue.push_back(update);
            }
        }
        self.available.notify_one();
    }

    /// Blocks until an update past `last_known` is available or the client stops. Returns
    /// `(watermark, [])` on stop.
    pub fn get_next_state(
        &self,
        last_known: BlockId,
    ) -> (BlockId, Vec<ReconfigurationUpdate>) {
        let mut inner = self.inner.lock();
        loop {
            if inner.stopped {
                return (inner.last_known_block_id, Vec::new());
            }
            let pending: Vec<ReconfigurationUpdate> = inner
                .queue
                .iter()
                .filter(|u| u.block_id > last_known)
                .cloned()
                .collect();
            if !pending.is_empty() {
                return (inner.last_known_block_id, pending);
            }
            self.available.wait(&mut inner);
        }
    }

    /// Non-blocking watermark read.
    pub fn get_latest_client_update(&self) -> BlockId {
        self.inner.lock().last_known_block_id
    }

    /// Non-blocking counterpart to `get_next_state`, used by the reconciliation drain loop:
    /// returns the next batch past `last_known` if one is already queued, `None` otherwise.
    pub fn try_drain_once(
        &self,
        last_known: BlockId,
    ) -> Option<Vec<ReconfigurationUpdate>> {
        let inner = self.inner.lock();
        let pending: Vec<ReconfigurationUpdate> = inner
            .queue
            .iter()
            .filter(|u| u.block_id > last_known)
            .cloned()
            .collect();
        if pending.is_empty() {
            None
        } else {
            Some(pending)
        }
    }

    pub fn stop(&self) {
        let mut inner = self.inner.lock();
        inner.stopped = true;
        self.available.notify_all();
    }

    pub fn is_drained(&self, watermark: BlockId) -> bool {
        let inner = self.inner.lock();
        inner
            .queue
            .iter()
            .all(|u| u.block_id <= watermark)
    }
}

impl Default for ReconfigurationPollingClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn update(block_id: u64) -> ReconfigurationUpdate {
        ReconfigurationUpdate::new(BlockId(block_id), vec![block_id as u8])
    }

    #[test]
    fn push_update_drops_non_increasing_block_ids() {
        let rpc = ReconfigurationPollingClient::new();
        rpc.push_update(vec![update(5)]);
        rpc.push_update(vec![update(3), update(5), update(7)]);

        let (watermark, batch) = rpc.get_next_state(BlockId::ZERO);
        assert_eq!(watermark, BlockId(7));
        let ids: Vec<u64> = batch.iter().map(|u| u.block_id.0).collect();
        assert_eq!(ids, vec![5, 7]);
    }

    #[test]
    fn get_next_state_blocks_until_pushed() {
        let rpc = Arc::new(ReconfigurationPollingClient::new());
        let producer = rpc.clone();
        let handle = thread::spawn(move || {
            thread::sleep(std::time::Duration::from_millis(20));
            producer.push_update(vec![update(1)]);
        });

        let (watermark, batch) = rpc.get_next_state(BlockId::ZERO);
        assert_eq!(watermark, BlockId(1));
        assert_eq!(batch.len(), 1);
        handle.join().unwrap();
    }

    #[test]
    fn stop_unblocks_waiters_with_empty_sentinel() {
        let rpc = Arc::new(ReconfigurationPollingClient::new());
        let stopper = rpc.clone();
        let handle = thread::spawn(move || {
            thread::sleep(std::time::Duration::from_millis(20));
            stopper.stop();
        });

        let (_watermark, batch) = rpc.get_next_state(BlockId::ZERO);
        assert!(batch.is_empty());
        handle.join().unwrap();
    }

    #[test]
    fn monotonic_watermark_rejects_replays() {
        let rpc = ReconfigurationPollingClient::new();
        rpc.push_update(vec![update(10)]);
        let _ = rpc.get_next_state(BlockId::ZERO);
        rpc.push_update(vec![update(4)]);
        assert_eq!(rpc.get_latest_client_update(), BlockId(10));
    }

    #[test]
    fn try_drain_once_is_non_blocking() {
        let rpc = ReconfigurationPollingClient::new();
        assert!(rpc.try_drain_once(BlockId::ZERO).is_none());

        rpc.push_update(vec![update(2)]);
        let batch = rpc.try_drain_once(BlockId::ZERO).unwrap();
        assert_eq!(batch.len(), 1);
        assert!(rpc.try_drain_once(BlockId(2)).is_none());
    }
}
