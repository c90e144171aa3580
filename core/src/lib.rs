// Copyright (c) Consensus Systems Team
// SPDX-License-Identifier: Apache-2.0

mod crypto_epoch_manager;
mod error;
mod key_exchange;
mod key_generation;
mod key_store;
mod metrics;
mod reconfig_client;
mod signature_manager;
mod state_transfer;

pub use crypto_epoch_manager::*;
pub use error::*;
pub use key_exchange::*;
pub use key_generation::*;
pub use key_store::*;
pub use metrics::*;
pub use reconfig_client::*;
pub use signature_manager::*;
pub use state_transfer::*;
