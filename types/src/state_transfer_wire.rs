// Copyright (c) Consensus Systems Team
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::PrincipalId;

/// Message type codes used by the fixed-size frame header. Only `StateTransfer` is relevant
/// to this core; other codes belong to the out-of-scope consensus message-handling loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum MessageType {
    StateTransfer = 1,
}

/// The fixed-size header that precedes every state-transfer frame on the wire.
/// `ReplicaForStateTransfer::onMessage`-equivalent code strips exactly this many bytes before
/// handing the remainder to the state-transfer engine.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct StateTransferHeader {
    pub source: PrincipalId,
    pub msg_type: MessageType,
    pub size: u32,
}

impl StateTransferHeader {
    pub fn new(source: PrincipalId, payload_len: u32) -> Self {
        Self {
            source,
            msg_type: MessageType::StateTransfer,
            size: payload_len,
        }
    }

    pub fn encoded_len() -> usize {
        // PrincipalId(u16) + MessageType(u16 repr) + size(u32), bcs-encoded.
        let sample = StateTransferHeader::new(PrincipalId::new(0), 0);
        bcs::to_bytes(&sample)
            .expect("header serialization should not fail")
            .len()
    }
}

/// A frame as it crosses the replica boundary: header plus opaque payload.
#[derive(Clone, Debug)]
pub struct StateTransferFrame {
    pub header: StateTransferHeader,
    pub payload: Vec<u8>,
}

impl StateTransferFrame {
    pub fn new(source: PrincipalId, payload: Vec<u8>) -> Self {
        let header = StateTransferHeader::new(source, payload.len() as u32);
        Self { header, payload }
    }

    /// Serializes the header followed by the raw payload bytes (the payload itself is opaque
    /// to this core and is not re-encoded).
    pub fn encode(&self) -> Vec<u8> {
        let mut out = bcs::to_bytes(&self.header).expect("header serialization should not fail");
        out.extend_from_slice(&self.payload);
        out
    }

    /// Strips the fixed header from a received buffer, returning the sender id and the
    /// remaining payload. Mirrors `ReplicaForStateTransfer::onMessage`'s
    /// `msg->body() + sizeof(MessageBase::Header)`.
    pub fn decode(buf: &[u8]) -> bcs::Result<Self> {
        let header_len = Self::encoded_len();
        // `buf.get` rather than direct slicing: a truncated frame should surface as a bcs
        // deserialization error, not panic the caller.
        let header: StateTransferHeader = bcs::from_bytes(buf.get(..header_len).unwrap_or(buf))?;
        let payload = buf.get(header_len..).unwrap_or(&[]).to_vec();
        Ok(Self { header, payload })
    }
}
