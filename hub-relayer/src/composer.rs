// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Pluggable per-source-chain enrichment step. A composer fills in the
//! proof, state-root and decoded-method fields of a [`RelayTx`] before it can
//! be verified on the hub; one implementation exists per supported source
//! chain and is supplied by the embedding process.

use crate::error::{ComposeError, RelayerResult};
use async_trait::async_trait;
use hub_relayer_types::RelayTx;

#[async_trait]
pub trait SrcComposer: Send + Sync {
    /// Most recent source height this composer can safely produce proofs
    /// for. Zero means unknown; callers then gate on the hub-reported ready
    /// height instead.
    async fn latest_height(&self) -> RelayerResult<u64>;

    /// Populate `tx.param`, `tx.src_proof` and `tx.src_state_root` from the
    /// source chain.
    async fn compose(&self, tx: &mut RelayTx) -> Result<(), ComposeError>;
}
