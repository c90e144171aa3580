// Copyright (c) Consensus Systems Team
// SPDX-License-Identifier: Apache-2.0

mod crypto;
mod error;
mod parameters;
mod principal;

pub use crypto::*;
pub use error::*;
pub use parameters::*;
pub use principal::*;
