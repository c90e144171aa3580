// Copyright (c) Consensus Systems Team
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::time::Duration;

use bft_config::Key;
use bft_types::{BlockId, PrincipalId, StateTransferFrame};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::{SigManagerError, SigResult};
use crate::key_exchange::KeyExchangeCoordinator;
use crate::reconfig_client::ReconfigurationPollingClient;
use crate::signature_manager::SignatureManager;

/// The state-transfer engine this shim drives. A real implementation fetches blocks from
/// peers; `NullStateTransfer` is a no-op stand-in for configurations that never catch up
/// (e.g. a freshly bootstrapped network).
///
/// Every method here doubles as a named step the shim's start/stop sequencing calls in a
/// fixed order, so a test harness can record and assert on that order with a single mock.
pub trait StateTransfer: Send + Sync {
    fn set_reconf_engine(&self);
    fn add_completion_callback(&self);
    fn start_running(&self);
    fn transport_up(&self);
    fn transport_down(&self);
    fn base_stop(&self);
    fn stop_running(&self);
    fn timer_cancel(&self);

    fn on_timer(&self) {}
    fn handle_message(&self, _src: PrincipalId, _payload: Vec<u8>) {}
}

pub struct NullStateTransfer;

impl StateTransfer for NullStateTransfer {
    fn set_reconf_engine(&self) {}
    fn add_completion_callback(&self) {}
    fn start_running(&self) {}
    fn transport_up(&self) {}
    fn transport_down(&self) {}
    fn base_stop(&self) {}
    fn stop_running(&self) {}
    fn timer_cancel(&self) {}
}

/// Loads other replicas' public keys from the reserved-page substrate. The layout of
/// reserved pages is an external concern; this is the narrow contract STRS consumes from
/// that collaborator.
pub trait ReservedPageStore: Send + Sync {
    fn load_other_replica_keys(&self) -> Vec<(PrincipalId, Key)>;
}

pub struct NullReservedPageStore;

impl ReservedPageStore for NullReservedPageStore {
    fn load_other_replica_keys(&self) -> Vec<(PrincipalId, Key)> {
        Vec::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ShimState {
    Stopped,
    Started,
}

enum TimerControl {
    ChangePeriod(Duration),
}

struct TimerHandle {
    tx_control: mpsc::UnboundedSender<TimerControl>,
    tx_shutdown: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

/// Control layer that drives catch-up for a lagging replica. Owns the state-transfer
/// engine, a recurring progress timer, and the post-completion reconciliation pipeline
/// against SM, CEM, KEC and RPC.
pub struct StateTransferReplicaShim {
    engine: Arc<dyn StateTransfer>,
    reserved_pages: Arc<dyn ReservedPageStore>,
    sm: Arc<SignatureManager>,
    kec: Arc<KeyExchangeCoordinator>,
    rpc: Arc<ReconfigurationPollingClient>,
    is_read_only: bool,
    checkpoint_window: u64,
    reconciliation_poll_budget: Option<u32>,
    state: Mutex<ShimState>,
    timer: Mutex<Option<TimerHandle>>,
    timer_period: Mutex<Duration>,
}

impl StateTransferReplicaShim {
    pub fn new(
        engine: Arc<dyn StateTransfer>,
        reserved_pages: Arc<dyn ReservedPageStore>,
        sm: Arc<SignatureManager>,
        kec: Arc<KeyExchangeCoordinator>,
        rpc: Arc<ReconfigurationPollingClient>,
        is_read_only: bool,
        checkpoint_window: u64,
        reconciliation_poll_budget: Option<u32>,
        timer_period: Duration,
    ) -> Self {
        Self {
            engine,
            reserved_pages,
            sm,
            kec,
            rpc,
            is_read_only,
            checkpoint_window,
            reconciliation_poll_budget,
            state: Mutex::new(ShimState::Stopped),
            timer: Mutex::new(None),
            timer_period: Mutex::new(timer_period),
        }
    }

    /// Construct RPC's state-client wiring, register the completion callback, start the
    /// engine, then enable the transport last so inbound messages never arrive before the
    /// engine is ready.
    pub fn start(&self) -> SigResult<()> {
        let mut state = self.state.lock();
        if *state == ShimState::Started {
            return Err(SigManagerError::AlreadyStarted);
        }

        self.engine.set_reconf_engine();
        self.engine.add_completion_callback();
        self.engine.start_running();
        self.engine.transport_up();

        let period = *self.timer_period.lock();
        *self.timer.lock() = Some(self.spawn_timer(period));

        *state = ShimState::Started;
        Ok(())
    }

    /// Reverse of `start`: transport first, then the consensus base layer, then the engine,
    /// then the timer.
    pub fn stop(&self) -> SigResult<()> {
        let mut state = self.state.lock();
        if *state == ShimState::Stopped {
            return Err(SigManagerError::NotStarted);
        }

        self.engine.transport_down();
        self.engine.base_stop();
        self.engine.stop_running();
        if let Some(handle) = self.timer.lock().take() {
            let _ = handle.tx_shutdown.send(());
            handle.join.abort();
        }
        self.engine.timer_cancel();

        *state = ShimState::Stopped;
        Ok(())
    }

    /// Reconfigurable at runtime; safe to call from any thread per the engine's
    /// cross-thread invocation contract.
    pub fn change_state_transfer_timer_period(&self, period: Duration) {
        *self.timer_period.lock() = period;
        if let Some(handle) = self.timer.lock().as_ref() {
            let _ = handle.tx_control.send(TimerControl::ChangePeriod(period));
        }
    }

    fn spawn_timer(&self, period: Duration) -> TimerHandle {
        let (tx_control, mut rx_control) = mpsc::unbounded_channel();
        let (tx_shutdown, mut rx_shutdown) = oneshot::channel();
        let engine = self.engine.clone();

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        engine.on_timer();
                    }
                    Some(TimerControl::ChangePeriod(new_period)) = rx_control.recv() => {
                        ticker = tokio::time::interval(new_period);
                    }
                    _ = &mut rx_shutdown => {
                        break;
                    }
                }
            }
        });

        TimerHandle {
            tx_control,
            tx_shutdown,
            join,
        }
    }

    /// Strips the fixed header and forwards the payload and sender id to the engine.
    pub fn on_message(&self, frame: &[u8]) -> SigResult<()> {
        let decoded = StateTransferFrame::decode(frame)
            .map_err(|e| SigManagerError::TransportTransient(e.to_string()))?;
        self.engine
            .handle_message(decoded.header.source, decoded.payload);
        Ok(())
    }

    /// Copies `payload` into a freshly framed outbound message addressed from this replica.
    pub fn send_state_transfer_message(&self, own_id: PrincipalId, payload: Vec<u8>) -> Vec<u8> {
        StateTransferFrame::new(own_id, payload).encode()
    }

    /// The full reconciliation pipeline run after catch-up completes. Read-only replicas
    /// skip it entirely.
    pub fn on_transferring_complete(&self, checkpoint: u64) -> SigResult<()> {
        if self.is_read_only {
            return Ok(());
        }

        for (principal, key) in self.reserved_pages.load_other_replica_keys() {
            self.sm.key_store().set_key(principal, &key)?;
        }

        self.sm
            .set_replica_last_executed_seq(checkpoint * self.checkpoint_window);

        self.sm.crypto_epoch_manager().on_checkpoint(checkpoint);

        let generation = self.sm.crypto_epoch_manager().latest_generation();
        let persisted = self.kec.sync_private_keys_after_st(&generation);
        self.persist_candidates(persisted);

        self.drain_reconfiguration_updates()?;
        self.rpc.stop();

        Ok(())
    }

    /// Hands winning key-exchange candidates to storage. Persistence itself is an external
    /// collaborator; this core only decides which candidates qualify.
    fn persist_candidates(&self, candidates: Vec<(PrincipalId, Key)>) {
        for (principal, _key) in candidates {
            tracing::info!(principal = %principal, "persisted confirmed key-exchange candidate");
        }
    }

    /// Drains the polling client until it has caught up with its own watermark. `handled`
    /// tracks what this pipeline has consumed so far, independently of the RPC's
    /// `last_known_block_id`; seeding it from the watermark itself would make every call
    /// vacuously "already caught up" and the budget below unreachable.
    fn drain_reconfiguration_updates(&self) -> SigResult<()> {
        let mut handled = BlockId::ZERO;
        let mut attempts: u32 = 0;

        loop {
            match self.rpc.try_drain_once(handled) {
                Some(batch) => {
                    if let Some(latest) = batch.iter().map(|u| u.block_id).max() {
                        handled = latest;
                    }
                }
                None => break,
            }

            attempts += 1;
            if let Some(budget) = self.reconciliation_poll_budget {
                if attempts >= budget {
                    warn!(attempts, "reconciliation drain budget exhausted");
                    return Err(SigManagerError::TransportTransient(
                        "reconciliation drain did not converge within budget".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}
