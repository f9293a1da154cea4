// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Typed client surface of the hub chain. `HubClientInner` is the narrow
//! RPC contract (implemented over the real node as well as by the mock used
//! in tests); `HubClient` is the wrapper the core programs against.
//!
//! The write path classifies send outcomes into [`SendTxError`] kinds at
//! this layer, so nothing above it ever inspects error text.

use crate::error::{RelayerError, RelayerResult, SendTxError};
use async_trait::async_trait;
use hub_relayer_types::{EpochInfo, RelayTx};
use tracing::info;

/// A signing account on the hub. Sends must always use the account assigned
/// to the in-flight item so nonce management stays per-account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubAccount {
    pub address: String,
}

impl HubAccount {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

#[async_trait]
pub trait HubClientInner: Send + Sync {
    /// Current tip height of the hub chain itself.
    async fn get_latest_height(&self) -> RelayerResult<u64>;

    /// Height up to which the hub has synced headers of the given side chain.
    async fn get_side_chain_height(&self, chain_id: u64) -> RelayerResult<u64>;

    /// Whether the given cross-chain id has already been imported.
    async fn check_done(&self, chain_id: u64, cross_chain_id: &[u8]) -> RelayerResult<bool>;

    /// Hub-side epoch record; `epoch_id` zero queries the current epoch.
    async fn get_epoch_info(&self, epoch_id: u64) -> RelayerResult<Option<EpochInfo>>;

    /// Send the signed import call for a composed cross-chain transaction.
    async fn import_cross_chain_tx(
        &self,
        tx: &RelayTx,
        signer: &HubAccount,
    ) -> Result<String, SendTxError>;

    /// Send a signed header (or side-chain epoch) submission.
    async fn submit_headers(
        &self,
        chain_id: u64,
        headers: &[Vec<u8>],
        signer: &HubAccount,
    ) -> Result<String, SendTxError>;
}

pub struct HubClient<P> {
    inner: P,
}

impl<P> HubClient<P>
where
    P: HubClientInner,
{
    pub fn new(inner: P) -> Self {
        Self { inner }
    }

    pub fn new_for_testing(inner: P) -> Self {
        Self::new(inner)
    }

    pub async fn describe(&self) -> RelayerResult<()> {
        let height = self.inner.get_latest_height().await?;
        info!(height, "HubClient is connected to the hub chain");
        Ok(())
    }

    pub async fn get_latest_height(&self) -> RelayerResult<u64> {
        self.inner.get_latest_height().await
    }

    pub async fn get_side_chain_height(&self, chain_id: u64) -> RelayerResult<u64> {
        self.inner.get_side_chain_height(chain_id).await
    }

    pub async fn check_done(&self, chain_id: u64, cross_chain_id: &[u8]) -> RelayerResult<bool> {
        self.inner.check_done(chain_id, cross_chain_id).await
    }

    pub async fn get_epoch_info(&self, epoch_id: u64) -> RelayerResult<Option<EpochInfo>> {
        self.inner.get_epoch_info(epoch_id).await
    }

    /// Kind-preserving: the submitter picks its retry policy per kind.
    pub async fn import_cross_chain_tx(
        &self,
        tx: &RelayTx,
        signer: &HubAccount,
    ) -> Result<String, SendTxError> {
        self.inner.import_cross_chain_tx(tx, signer).await
    }

    /// Header submission treats duplicate outcomes as success: a header that
    /// is already imported or already in the mempool advances the sync state
    /// just the same. Returns the hub tx hash when a send actually happened.
    pub async fn submit_headers(
        &self,
        chain_id: u64,
        headers: &[Vec<u8>],
        signer: &HubAccount,
    ) -> RelayerResult<Option<String>> {
        match self.inner.submit_headers(chain_id, headers, signer).await {
            Ok(hash) => Ok(Some(hash)),
            Err(SendTxError::AlreadyDone) | Err(SendTxError::AlreadyKnown) => Ok(None),
            Err(SendTxError::Rpc(e)) => Err(RelayerError::Rpc(e)),
        }
    }
}
