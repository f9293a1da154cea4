// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Wire-agnostic data model shared by the relayer pipelines: the cross-chain
//! transaction awaiting delivery, the header-sync unit, and the side-chain
//! epoch-change payload. These types are persisted in the external queues, so
//! all of them are serde-serializable.

use serde::{Deserialize, Serialize};

pub mod chains {
    //! Registry of supported chains and their per-chain relay behavior.
    //!
    //! Chain ids are protocol-level constants shared with the on-chain
    //! contracts; they are not reassignable per deployment.

    pub const HUB: u64 = 0;
    pub const BTC: u64 = 1;
    pub const ETH: u64 = 2;
    pub const ONT: u64 = 3;
    pub const NEO: u64 = 4;
    pub const BSC: u64 = 6;
    pub const HECO: u64 = 7;
    pub const O3: u64 = 10;
    pub const POLYGON: u64 = 17;
    pub const HARMONY: u64 = 21;
    pub const BYTOM: u64 = 29;
    pub const STARCOIN: u64 = 31;
    pub const HSC: u64 = 33;

    pub fn chain_name(chain_id: u64) -> String {
        match chain_id {
            HUB => "hub".to_string(),
            BTC => "btc".to_string(),
            ETH => "eth".to_string(),
            ONT => "ont".to_string(),
            NEO => "neo".to_string(),
            BSC => "bsc".to_string(),
            HECO => "heco".to_string(),
            O3 => "o3".to_string(),
            POLYGON => "polygon".to_string(),
            HARMONY => "harmony".to_string(),
            BYTOM => "bytom".to_string(),
            STARCOIN => "starcoin".to_string(),
            HSC => "hsc".to_string(),
            other => format!("chain-{other}"),
        }
    }

    /// Confirmation depth to wait before treating a source block as final.
    pub fn blocks_to_wait(chain_id: u64) -> u64 {
        match chain_id {
            ETH => 12,
            BSC => 15,
            HECO => 21,
            POLYGON => 128,
            HARMONY => 2,
            _ => 1,
        }
    }

    /// Chains whose submission gate is the hub-reported synced height rather
    /// than the height advertised by the source composer.
    pub fn uses_hub_ready_height(chain_id: u64) -> bool {
        matches!(
            chain_id,
            ETH | HECO | BSC | POLYGON | O3 | STARCOIN | BYTOM | HSC
        )
    }

    /// Chains whose header commits the hub has been observed to drop
    /// silently, requiring the periodic submit-confirmation cross-check.
    pub fn requires_submit_confirmation(chain_id: u64) -> bool {
        matches!(
            chain_id,
            ETH | HECO | BSC | POLYGON | O3 | STARCOIN | BYTOM | HSC
        )
    }

    /// Chains whose cross-chain transactions must carry an explicit state
    /// root and Merkle proof; for all others the hub resolves the proof from
    /// previously synced headers.
    pub fn requires_explicit_proof(chain_id: u64) -> bool {
        matches!(chain_id, NEO | ONT)
    }
}

/// Role of a queued relay message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxType {
    /// A source-chain transaction awaiting import on the hub.
    Src,
    /// A side-chain epoch change to be aggregated into a governance submission.
    Epoch,
}

/// Decoded cross-chain method parameters, populated by the source composer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxParam {
    pub method: String,
    pub cross_chain_id: Vec<u8>,
    pub args: Vec<u8>,
}

/// Epoch-change payload of a side chain governed through the hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideChainEpoch {
    pub epoch_id: u64,
    pub chain_id: u64,
    pub height: u64,
    pub header: Vec<u8>,
}

/// Hub-side view of an epoch, as returned by the epoch-info query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochInfo {
    pub epoch_id: u64,
    pub start_height: u64,
    pub end_height: u64,
}

/// One cross-chain transfer awaiting delivery to the hub.
///
/// Created by an upstream listener, enriched by the source composer, and
/// consumed exactly-once-in-flight by a submitter worker. Only the worker
/// holding a dequeued instance mutates it (`attempts`, `dst_hash`, `sender`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayTx {
    pub tx_type: TxType,
    pub src_chain_id: u64,
    pub dst_chain_id: u64,
    pub src_hash: String,
    #[serde(default)]
    pub src_event: Vec<u8>,
    #[serde(default)]
    pub src_proof: Vec<u8>,
    #[serde(default)]
    pub src_state_root: Vec<u8>,
    #[serde(default)]
    pub src_proof_height: u64,
    #[serde(default)]
    pub src_height: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<TxParam>,
    /// Hub transaction hash, set once the import call has been sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst_hash: Option<String>,
    /// Signer identity, assigned by the worker at dequeue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch: Option<SideChainEpoch>,
}

impl RelayTx {
    pub fn new_src(src_chain_id: u64, dst_chain_id: u64, src_hash: impl Into<String>) -> Self {
        Self {
            tx_type: TxType::Src,
            src_chain_id,
            dst_chain_id,
            src_hash: src_hash.into(),
            src_event: vec![],
            src_proof: vec![],
            src_state_root: vec![],
            src_proof_height: 0,
            src_height: 0,
            param: None,
            dst_hash: None,
            sender: None,
            attempts: 0,
            epoch: None,
        }
    }

    pub fn new_epoch(dst_chain_id: u64, epoch: SideChainEpoch) -> Self {
        let mut tx = Self::new_src(chains::HUB, dst_chain_id, format!("epoch-{}", epoch.epoch_id));
        tx.tx_type = TxType::Epoch;
        tx.epoch = Some(epoch);
        tx
    }
}

/// One unit on the header-sync channel: either a concrete header to append,
/// or a bare height marker (`data == None`) meaning "advance the tracked sync
/// height without new data". A marker is semantically distinct from a header
/// with empty bytes and the distinction must be preserved end to end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderUnit {
    pub height: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,
}

impl HeaderUnit {
    pub fn new(height: u64, data: Vec<u8>) -> Self {
        Self {
            height,
            data: Some(data),
        }
    }

    /// A height marker carrying no header bytes.
    pub fn marker(height: u64) -> Self {
        Self { height, data: None }
    }
}
