// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! A mock implementation of the hub chain client.

use crate::error::{RelayerResult, SendTxError};
use crate::hub_client::{HubAccount, HubClientInner};
use async_trait::async_trait;
use hub_relayer_types::{EpochInfo, RelayTx};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Mock client used in test environments. Read-path responses are preset by
/// the test; write-path outcomes are scripted per call, defaulting to
/// success with a generated hash when nothing is scripted.
#[derive(Clone, Debug)]
pub struct MockHubClient {
    latest_height: Arc<AtomicU64>,
    side_chain_heights: Arc<Mutex<HashMap<u64, u64>>>,
    done: Arc<Mutex<HashSet<(u64, Vec<u8>)>>>,
    epochs: Arc<Mutex<HashMap<u64, EpochInfo>>>,
    import_results: Arc<Mutex<VecDeque<Result<String, SendTxError>>>>,
    header_results: Arc<Mutex<VecDeque<Result<String, SendTxError>>>>,
    imported: Arc<Mutex<Vec<(RelayTx, String)>>>,
    submitted_headers: Arc<Mutex<Vec<(u64, Vec<Vec<u8>>)>>>,
    next_hash: Arc<AtomicU64>,
    requested_imports_tx: tokio::sync::broadcast::Sender<String>,
}

impl Default for MockHubClient {
    fn default() -> Self {
        Self {
            latest_height: Arc::new(AtomicU64::new(0)),
            side_chain_heights: Default::default(),
            done: Default::default(),
            epochs: Default::default(),
            import_results: Default::default(),
            header_results: Default::default(),
            imported: Default::default(),
            submitted_headers: Default::default(),
            next_hash: Arc::new(AtomicU64::new(1)),
            requested_imports_tx: tokio::sync::broadcast::channel(10000).0,
        }
    }
}

impl MockHubClient {
    pub fn set_latest_height(&self, height: u64) {
        self.latest_height.store(height, Ordering::Relaxed);
    }

    pub fn set_side_chain_height(&self, chain_id: u64, height: u64) {
        self.side_chain_heights
            .lock()
            .unwrap()
            .insert(chain_id, height);
    }

    pub fn add_done(&self, chain_id: u64, cross_chain_id: Vec<u8>) {
        self.done.lock().unwrap().insert((chain_id, cross_chain_id));
    }

    pub fn add_epoch_info(&self, info: EpochInfo) {
        self.epochs.lock().unwrap().insert(info.epoch_id, info);
    }

    pub fn push_import_result(&self, result: Result<String, SendTxError>) {
        self.import_results.lock().unwrap().push_back(result);
    }

    pub fn push_header_result(&self, result: Result<String, SendTxError>) {
        self.header_results.lock().unwrap().push_back(result);
    }

    /// Import calls that reached the signed-send path, with their signer.
    pub fn imported_txes(&self) -> Vec<(RelayTx, String)> {
        self.imported.lock().unwrap().clone()
    }

    /// Header submissions that reached the signed-send path.
    pub fn submitted_headers(&self) -> Vec<(u64, Vec<Vec<u8>>)> {
        self.submitted_headers.lock().unwrap().clone()
    }

    pub fn subscribe_to_requested_imports(&self) -> tokio::sync::broadcast::Receiver<String> {
        self.requested_imports_tx.subscribe()
    }

    fn generated_hash(&self) -> String {
        format!("0x{:016x}", self.next_hash.fetch_add(1, Ordering::SeqCst))
    }
}

#[async_trait]
impl HubClientInner for MockHubClient {
    async fn get_latest_height(&self) -> RelayerResult<u64> {
        Ok(self.latest_height.load(Ordering::Relaxed))
    }

    async fn get_side_chain_height(&self, chain_id: u64) -> RelayerResult<u64> {
        Ok(self
            .side_chain_heights
            .lock()
            .unwrap()
            .get(&chain_id)
            .copied()
            .unwrap_or(0))
    }

    async fn check_done(&self, chain_id: u64, cross_chain_id: &[u8]) -> RelayerResult<bool> {
        Ok(self
            .done
            .lock()
            .unwrap()
            .contains(&(chain_id, cross_chain_id.to_vec())))
    }

    async fn get_epoch_info(&self, epoch_id: u64) -> RelayerResult<Option<EpochInfo>> {
        Ok(self.epochs.lock().unwrap().get(&epoch_id).cloned())
    }

    async fn import_cross_chain_tx(
        &self,
        tx: &RelayTx,
        signer: &HubAccount,
    ) -> Result<String, SendTxError> {
        let _ = self.requested_imports_tx.send(tx.src_hash.clone());
        self.imported
            .lock()
            .unwrap()
            .push((tx.clone(), signer.address.clone()));
        match self.import_results.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(self.generated_hash()),
        }
    }

    async fn submit_headers(
        &self,
        chain_id: u64,
        headers: &[Vec<u8>],
        _signer: &HubAccount,
    ) -> Result<String, SendTxError> {
        self.submitted_headers
            .lock()
            .unwrap()
            .push((chain_id, headers.to_vec()));
        match self.header_results.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(self.generated_hash()),
        }
    }
}
