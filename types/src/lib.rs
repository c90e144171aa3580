// Copyright (c) Consensus Systems Team
// SPDX-License-Identifier: Apache-2.0

mod keys_and_signatures;
mod principal_id;
mod reconfiguration;
mod state_transfer_wire;

pub use keys_and_signatures::*;
pub use principal_id::*;
pub use reconfiguration::*;
pub use state_transfer_wire::*;
