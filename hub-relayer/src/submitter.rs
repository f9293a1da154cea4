// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The transaction submitter delivers composed cross-chain transactions to
//! the hub's cross-chain manager contract, and aggregates side-chain epoch
//! changes into governance submissions.
//!
//! Delivery is driven by a pool of worker loops, one per hub signing
//! account, all consuming the same height-sorted queue. Workers gate each
//! item on the hub-side ready height and requeue failures with an adjusted
//! gate, so retries never block the queue and never collide with an
//! outstanding nonce.

use crate::bus::{SortedTxBus, TxBus};
use crate::composer::SrcComposer;
use crate::config::SubmitterConfig;
use crate::error::{ComposeError, RelayerError, RelayerResult, SendTxError};
use crate::hub_client::{HubAccount, HubClient, HubClientInner};
use crate::metrics::RelayerMetrics;
use hub_relayer_types::{chains, RelayTx, TxType};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const EMPTY_BUS_IDLE: Duration = Duration::from_millis(200);
const NOT_READY_IDLE: Duration = Duration::from_millis(200);
const EMPTY_PLAIN_BUS_IDLE: Duration = Duration::from_secs(1);
const REQUEUE_RETRY_INTERVAL: Duration = Duration::from_secs(1);

pub struct Submitter<C> {
    config: SubmitterConfig,
    name: String,
    accounts: Vec<HubAccount>,
    client: Arc<HubClient<C>>,
    composer: Arc<dyn SrcComposer>,
    metrics: Arc<RelayerMetrics>,
}

impl<C> Submitter<C>
where
    C: HubClientInner + 'static,
{
    pub fn new(
        config: SubmitterConfig,
        client: Arc<HubClient<C>>,
        composer: Arc<dyn SrcComposer>,
        metrics: Arc<RelayerMetrics>,
    ) -> Self {
        let name = chains::chain_name(config.chain_id);
        info!(
            blocks = config.blocks_to_wait(),
            chain = %name,
            "Chain blocks to wait"
        );
        let accounts = config
            .accounts
            .iter()
            .map(|a| HubAccount::new(a.clone()))
            .collect();
        Self {
            config,
            name,
            accounts,
            client,
            composer,
            metrics,
        }
    }

    pub fn accounts(&self) -> &[HubAccount] {
        &self.accounts
    }

    fn default_signer(&self) -> RelayerResult<&HubAccount> {
        self.accounts.first().ok_or_else(|| {
            RelayerError::InvalidConfig("no hub account configured for submitter".to_string())
        })
    }

    /// Deliver one composed transaction to the hub's cross-chain manager.
    ///
    /// Malformed input is a non-retryable [`RelayerError::InvalidTx`];
    /// disallowed methods are dropped as success; an item the hub already
    /// settled is success without a send.
    pub async fn submit(&self, tx: &mut RelayTx, signer: &HubAccount) -> RelayerResult<()> {
        match self.composer.compose(tx).await {
            Ok(()) => {}
            Err(ComposeError::ProofUnavailable) => return Err(RelayerError::ProofUnavailable),
            Err(ComposeError::Other(reason)) => return Err(RelayerError::Generic(reason)),
        }
        let param = tx.param.clone().ok_or_else(|| {
            RelayerError::InvalidTx(format!(
                "src tx {} has no decoded method params after compose",
                tx.src_hash
            ))
        })?;
        if tx.src_chain_id == 0 {
            return Err(RelayerError::InvalidTx(format!(
                "src tx {} has no source chain id",
                tx.src_hash
            )));
        }

        if !self.config.method_allowed(&param.method) {
            error!(
                src_hash = %tx.src_hash,
                chain = %self.name,
                method = %param.method,
                "Dropping src tx with disallowed method"
            );
            self.metrics
                .tx_submissions
                .with_label_values(&["dropped"])
                .inc();
            return Ok(());
        }

        if chains::requires_explicit_proof(tx.src_chain_id) {
            if tx.src_state_root.is_empty() || tx.src_proof.is_empty() {
                return Err(RelayerError::InvalidTx(format!(
                    "src tx {} from chain {} is missing state root or merkle proof",
                    tx.src_hash, tx.src_chain_id
                )));
            }
        } else {
            // Other chains resolve proofs from previously synced headers, so
            // an existence check is enough to skip settled items.
            let done = self
                .client
                .check_done(tx.src_chain_id, &param.cross_chain_id)
                .await?;
            if done {
                info!(
                    src_hash = %tx.src_hash,
                    cross_chain_id = %hex::encode(&param.cross_chain_id),
                    "Tx already imported"
                );
                self.metrics
                    .tx_submissions
                    .with_label_values(&["already_done"])
                    .inc();
                return Ok(());
            }
        }

        match self.client.import_cross_chain_tx(tx, signer).await {
            Ok(hash) => {
                tx.dst_hash = Some(hash);
                self.metrics
                    .tx_submissions
                    .with_label_values(&["success"])
                    .inc();
                Ok(())
            }
            Err(SendTxError::AlreadyDone) => {
                info!(src_hash = %tx.src_hash, chain = tx.src_chain_id, "Tx already imported");
                self.metrics
                    .tx_submissions
                    .with_label_values(&["already_done"])
                    .inc();
                Ok(())
            }
            Err(SendTxError::AlreadyKnown) => {
                self.metrics
                    .tx_submissions
                    .with_label_values(&["pending"])
                    .inc();
                Err(RelayerError::TxPending)
            }
            Err(SendTxError::Rpc(reason)) => {
                self.metrics
                    .tx_submissions
                    .with_label_values(&["error"])
                    .inc();
                Err(RelayerError::SubmitFailure {
                    src_chain_id: tx.src_chain_id,
                    src_hash: tx.src_hash.clone(),
                    reason,
                })
            }
        }
    }

    /// Highest source height the hub can currently verify against. Errors
    /// are logged and reported as zero; gating then pauses until the next
    /// refresh succeeds.
    pub async fn ready_block(&self) -> u64 {
        let height = if chains::uses_hub_ready_height(self.config.chain_id) {
            self.client.get_side_chain_height(self.config.chain_id).await
        } else {
            match self.composer.latest_height().await {
                // Composer doesn't track a height, gate on the hub instead.
                Ok(0) => self.client.get_side_chain_height(self.config.chain_id).await,
                other => other,
            }
        };
        match height {
            Ok(height) => {
                self.metrics.ready_height.set(height as i64);
                height
            }
            Err(err) => {
                error!(chain = %self.name, err = %err, "Failed to get ready block height");
                0
            }
        }
    }

    /// One multi-account worker: consume the shared height-sorted queue with
    /// a dedicated signing account.
    pub async fn consume(
        self: Arc<Self>,
        account: HubAccount,
        mq: Arc<dyn SortedTxBus>,
        shutdown: CancellationToken,
    ) {
        let poll_interval = Duration::from_millis(self.config.ready_poll_interval_ms);
        let mut height = self.ready_block().await;
        let mut last_refresh = Instant::now();

        loop {
            if shutdown.is_cancelled() {
                info!(chain = %self.name, account = %account.address, "Submitter worker is exiting now");
                return;
            }

            // The ready height is refreshed on its own cadence, never inside
            // the submit path.
            if last_refresh.elapsed() >= poll_interval {
                last_refresh = Instant::now();
                let h = self.ready_block().await;
                if h > 0 && h != height {
                    height = h;
                    info!(chain = %self.name, height, "Current ready block height");
                }
            }

            let popped = tokio::select! {
                _ = shutdown.cancelled() => return,
                popped = mq.pop() => popped,
            };
            let (mut tx, gate) = match popped {
                Err(err) => {
                    error!(chain = %self.name, err = %err, "Bus pop error");
                    self.idle(&shutdown, EMPTY_BUS_IDLE).await;
                    continue;
                }
                Ok(None) => {
                    self.idle(&shutdown, EMPTY_BUS_IDLE).await;
                    continue;
                }
                Ok(Some(item)) => item,
            };

            if gate <= height {
                tx.sender = Some(account.address.clone());
                info!(
                    src_hash = %tx.src_hash,
                    src_chain = tx.src_chain_id,
                    dst_chain = tx.dst_chain_id,
                    "Processing src tx"
                );
                match self.submit(&mut tx, &account).await {
                    Ok(()) => {
                        info!(
                            src_hash = %tx.src_hash,
                            dst_hash = tx.dst_hash.as_deref().unwrap_or(""),
                            "Submitted src tx to hub"
                        );
                    }
                    Err(err) => {
                        let next = if err == RelayerError::TxPending {
                            gate + self.config.pending_retry_delta
                        } else {
                            gate + self.config.retry_delta
                        };
                        tx.attempts += 1;
                        error!(
                            chain = %self.name,
                            err = %err,
                            proof_height = tx.src_proof_height,
                            next_try = next,
                            "Submit src tx to hub error"
                        );
                        self.requeue_sorted(mq.as_ref(), tx, next).await;
                    }
                }
            } else {
                // Not ready yet. Hand it back untouched and let the gate
                // catch up.
                self.requeue_sorted(mq.as_ref(), tx, gate).await;
                self.idle(&shutdown, NOT_READY_IDLE).await;
            }
        }
    }

    /// Single-queue loop over a plain FIFO bus: submits when the source
    /// height is ready and re-pushes on any failure.
    pub async fn run(self: Arc<Self>, mq: Arc<dyn TxBus>, shutdown: CancellationToken) {
        let signer = match self.default_signer() {
            Ok(signer) => signer.clone(),
            Err(err) => {
                error!(chain = %self.name, err = %err, "Cannot start submitter loop");
                return;
            }
        };
        let poll_interval = Duration::from_millis(self.config.run_poll_interval_ms);
        let mut height = self.ready_block().await;
        let mut last_refresh = Instant::now();
        let mut refresh = true;

        loop {
            if shutdown.is_cancelled() {
                info!(chain = %self.name, "Submitter is exiting now");
                return;
            }

            if refresh && last_refresh.elapsed() >= poll_interval {
                refresh = false;
                last_refresh = Instant::now();
                height = self.ready_block().await;
            }

            let popped = tokio::select! {
                _ = shutdown.cancelled() => return,
                popped = mq.pop() => popped,
            };
            let mut tx = match popped {
                Err(err) => {
                    error!(chain = %self.name, err = %err, "Bus pop error");
                    continue;
                }
                Ok(None) => {
                    self.idle(&shutdown, EMPTY_PLAIN_BUS_IDLE).await;
                    continue;
                }
                Ok(Some(tx)) => tx,
            };

            debug!(src_hash = %tx.src_hash, src_chain = tx.src_chain_id, "Hub submitter checking on src tx");
            let mut retry = true;

            if height == 0 || tx.src_height <= height {
                info!(
                    src_hash = %tx.src_hash,
                    src_chain = tx.src_chain_id,
                    dst_chain = tx.dst_chain_id,
                    "Processing src tx"
                );
                match self.submit(&mut tx, &signer).await {
                    Ok(()) => {
                        info!(
                            src_hash = %tx.src_hash,
                            dst_hash = tx.dst_hash.as_deref().unwrap_or(""),
                            "Submitted src tx to hub"
                        );
                        retry = false;
                    }
                    Err(err) => {
                        error!(
                            chain = %self.name,
                            err = %err,
                            proof_height = tx.src_proof_height,
                            "Submit src tx to hub error"
                        );
                        tx.attempts += 1;
                    }
                }
                if height == 0 {
                    refresh = true;
                }
            } else {
                refresh = true;
            }

            if retry {
                self.requeue_plain(mq.as_ref(), tx).await;
            }
        }
    }

    /// Spawn one `consume` worker per configured account.
    pub fn start(
        self: &Arc<Self>,
        mq: Arc<dyn SortedTxBus>,
        shutdown: CancellationToken,
    ) -> Vec<JoinHandle<()>> {
        if self.accounts.is_empty() {
            warn!(chain = %self.name, "No account available for submitter workers");
        }
        let mut handles = Vec::with_capacity(self.accounts.len());
        for (index, account) in self.accounts.iter().enumerate() {
            info!(
                index,
                total = self.accounts.len(),
                account = %account.address,
                chain = %self.name,
                topic = %mq.topic(),
                "Starting hub submitter worker"
            );
            handles.push(tokio::spawn(self.clone().consume(
                account.clone(),
                mq.clone(),
                shutdown.clone(),
            )));
        }
        handles
    }

    /// Aggregate an ordered run of side-chain epoch changes into a single
    /// governance submission. An empty input is a no-op; a non-epoch element
    /// is a fatal input error and nothing is submitted.
    pub async fn process_epochs(&self, epochs: &[RelayTx]) -> RelayerResult<()> {
        if epochs.is_empty() {
            return Ok(());
        }

        let mut headers = Vec::with_capacity(epochs.len());
        for m in epochs {
            let epoch = match (&m.tx_type, &m.epoch) {
                (TxType::Epoch, Some(epoch)) => epoch,
                _ => {
                    return Err(RelayerError::InvalidEpochBatch(format!(
                        "unexpected side chain epoch message {}",
                        m.src_hash
                    )))
                }
            };
            headers.push(epoch.header.clone());
        }

        // The batch is ordered, so the last element names the resulting
        // epoch state.
        let epoch = epochs
            .last()
            .and_then(|m| m.epoch.as_ref())
            .expect("validated above");

        if let Some(info) = self.client.get_epoch_info(epoch.epoch_id).await? {
            info!(
                epoch = epoch.epoch_id,
                height = info.start_height,
                chain = %self.name,
                "Side chain epoch already known to hub"
            );
            return Ok(());
        }

        let signer = self.default_signer()?;
        info!(
            epoch = epoch.epoch_id,
            height = epoch.height,
            chain = %self.name,
            size = epochs.len(),
            from_chain = epoch.chain_id,
            "Submitting side chain epoch"
        );
        let hash = self
            .client
            .submit_headers(epoch.chain_id, &headers, signer)
            .await?;
        info!(
            size = epochs.len(),
            epoch = epoch.epoch_id,
            height = epoch.height,
            chain = %self.name,
            from_chain = epoch.chain_id,
            hash = hash.as_deref().unwrap_or(""),
            "Submitted side chain epochs to hub"
        );
        Ok(())
    }

    async fn idle(&self, shutdown: &CancellationToken, duration: Duration) {
        tokio::select! {
            _ = shutdown.cancelled() => {}
            _ = tokio::time::sleep(duration) => {}
        }
    }

    // A dequeued item must never be lost, shutdown included; duplicates are
    // absorbed downstream by the already-imported check.
    async fn requeue_sorted(&self, mq: &dyn SortedTxBus, tx: RelayTx, gate: u64) {
        loop {
            match mq.push(tx.clone(), gate).await {
                Ok(()) => return,
                Err(err) => {
                    error!(
                        chain = %self.name,
                        src_hash = %tx.src_hash,
                        err = %err,
                        "Failed to push tx back to bus, retrying"
                    );
                    tokio::time::sleep(REQUEUE_RETRY_INTERVAL).await;
                }
            }
        }
    }

    async fn requeue_plain(&self, mq: &dyn TxBus, tx: RelayTx) {
        loop {
            match mq.push(tx.clone()).await {
                Ok(()) => return,
                Err(err) => {
                    error!(
                        chain = %self.name,
                        src_hash = %tx.src_hash,
                        err = %err,
                        "Failed to push tx back to bus, retrying"
                    );
                    tokio::time::sleep(REQUEUE_RETRY_INTERVAL).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{MemorySortedTxBus, MemoryTxBus};
    use crate::hub_mock_client::MockHubClient;
    use crate::test_utils::{init_tracing, new_submitter, ScriptedComposer};
    use hub_relayer_types::{EpochInfo, RelayTx, SideChainEpoch};

    fn src_tx(chain_id: u64, hash: &str) -> RelayTx {
        RelayTx::new_src(chain_id, chains::HUB, hash)
    }

    fn epoch_tx(epoch_id: u64) -> RelayTx {
        RelayTx::new_epoch(
            chains::ETH,
            SideChainEpoch {
                epoch_id,
                chain_id: chains::HUB,
                height: 1000 + epoch_id,
                header: format!("epoch-header-{epoch_id}").into_bytes(),
            },
        )
    }

    #[tokio::test]
    async fn test_submit_skips_already_imported_tx() {
        init_tracing();
        let (submitter, mock) = new_submitter(
            SubmitterConfig::new(chains::ETH),
            Arc::new(ScriptedComposer::filling("unlock")),
        );
        let mut tx = src_tx(chains::ETH, "0xdone");
        // cross_chain_id mirrors the src hash in the scripted composer
        mock.add_done(chains::ETH, b"0xdone".to_vec());

        let signer = HubAccount::new("0xacc1");
        submitter.submit(&mut tx, &signer).await.unwrap();
        assert!(mock.imported_txes().is_empty());
        assert!(tx.dst_hash.is_none());
    }

    #[tokio::test]
    async fn test_submit_drops_disallowed_method() {
        init_tracing();
        let mut config = SubmitterConfig::new(chains::ETH);
        config.allow_methods = vec!["unlock".to_string()];
        let (submitter, mock) =
            new_submitter(config, Arc::new(ScriptedComposer::filling("mint")));

        let mut tx = src_tx(chains::ETH, "0xbad-method");
        let signer = HubAccount::new("0xacc1");
        submitter.submit(&mut tx, &signer).await.unwrap();
        assert!(mock.imported_txes().is_empty());
    }

    #[tokio::test]
    async fn test_submit_missing_params_is_a_data_integrity_error() {
        init_tracing();
        let (submitter, mock) = new_submitter(
            SubmitterConfig::new(chains::ETH),
            Arc::new(ScriptedComposer::noop()),
        );
        let mut tx = src_tx(chains::ETH, "0xempty");
        let signer = HubAccount::new("0xacc1");
        let err = submitter.submit(&mut tx, &signer).await.unwrap_err();
        assert!(matches!(err, RelayerError::InvalidTx(_)));
        assert!(mock.imported_txes().is_empty());
    }

    #[tokio::test]
    async fn test_submit_requires_explicit_proof_for_legacy_chains() {
        init_tracing();
        let (submitter, mock) = new_submitter(
            SubmitterConfig::new(chains::NEO),
            Arc::new(ScriptedComposer::filling("unlock")),
        );
        let mut tx = src_tx(chains::NEO, "0xno-proof");
        let signer = HubAccount::new("0xacc1");
        let err = submitter.submit(&mut tx, &signer).await.unwrap_err();
        assert!(matches!(err, RelayerError::InvalidTx(_)));
        assert!(mock.imported_txes().is_empty());

        // With proof material present the send goes through.
        let mut tx = src_tx(chains::NEO, "0xproved");
        tx.src_proof = vec![1, 2, 3];
        tx.src_state_root = vec![4, 5, 6];
        submitter.submit(&mut tx, &signer).await.unwrap();
        assert_eq!(mock.imported_txes().len(), 1);
        assert!(tx.dst_hash.is_some());
    }

    #[tokio::test]
    async fn test_submit_maps_send_outcomes_to_error_kinds() {
        init_tracing();
        let (submitter, mock) = new_submitter(
            SubmitterConfig::new(chains::ETH),
            Arc::new(ScriptedComposer::filling("unlock")),
        );
        let signer = HubAccount::new("0xacc1");

        // "already done" observed at send time is success, not an error.
        mock.push_import_result(Err(SendTxError::AlreadyDone));
        let mut tx = src_tx(chains::ETH, "0xdup");
        submitter.submit(&mut tx, &signer).await.unwrap();
        assert!(tx.dst_hash.is_none());

        // "already known" means a competing send holds the nonce.
        mock.push_import_result(Err(SendTxError::AlreadyKnown));
        let mut tx = src_tx(chains::ETH, "0xracing");
        let err = submitter.submit(&mut tx, &signer).await.unwrap_err();
        assert_eq!(err, RelayerError::TxPending);

        // Anything else is a generic retryable failure tagged with the hash.
        mock.push_import_result(Err(SendTxError::Rpc("connection reset".into())));
        let mut tx = src_tx(chains::ETH, "0xflaky");
        let err = submitter.submit(&mut tx, &signer).await.unwrap_err();
        assert!(matches!(
            err,
            RelayerError::SubmitFailure { ref src_hash, .. } if src_hash == "0xflaky"
        ));

        // Success records the hub hash.
        let mut tx = src_tx(chains::ETH, "0xok");
        submitter.submit(&mut tx, &signer).await.unwrap();
        assert!(tx.dst_hash.is_some());
    }

    #[tokio::test]
    async fn test_submit_proof_unavailable_passes_through() {
        init_tracing();
        let (submitter, _mock) = new_submitter(
            SubmitterConfig::new(chains::ETH),
            Arc::new(ScriptedComposer::failing(ComposeError::ProofUnavailable)),
        );
        let mut tx = src_tx(chains::ETH, "0xearly");
        let signer = HubAccount::new("0xacc1");
        let err = submitter.submit(&mut tx, &signer).await.unwrap_err();
        assert_eq!(err, RelayerError::ProofUnavailable);
    }

    #[tokio::test]
    async fn test_ready_block_prefers_composer_then_hub() {
        init_tracing();
        let composer = Arc::new(ScriptedComposer::filling("unlock"));
        let (submitter, mock) =
            new_submitter(SubmitterConfig::new(chains::NEO), composer.clone());
        mock.set_side_chain_height(chains::NEO, 80);

        // Composer height unknown: fall back to the hub-reported height.
        assert_eq!(submitter.ready_block().await, 80);

        composer.set_latest_height(120);
        assert_eq!(submitter.ready_block().await, 120);
    }

    #[tokio::test]
    async fn test_ready_block_uses_hub_height_for_gated_chains() {
        init_tracing();
        let composer = Arc::new(ScriptedComposer::filling("unlock"));
        composer.set_latest_height(999);
        let (submitter, mock) = new_submitter(SubmitterConfig::new(chains::ETH), composer);
        mock.set_side_chain_height(chains::ETH, 150);
        assert_eq!(submitter.ready_block().await, 150);
    }

    #[tokio::test]
    async fn test_consume_requeues_unready_tx_unchanged() {
        init_tracing();
        let mut config = SubmitterConfig::new(chains::ETH);
        config.accounts = vec!["0xacc1".to_string()];
        let (submitter, mock) = new_submitter(config, Arc::new(ScriptedComposer::filling("unlock")));
        mock.set_side_chain_height(chains::ETH, 150);

        let mq = Arc::new(MemorySortedTxBus::new());
        mq.push(src_tx(chains::ETH, "0xfuture"), 200).await.unwrap();

        let shutdown = CancellationToken::new();
        let handles = submitter.start(mq.clone(), shutdown.clone());
        tokio::time::sleep(Duration::from_millis(300)).await;
        shutdown.cancel();
        for handle in handles {
            handle.await.unwrap();
        }

        // Above the ready height: never submitted, requeued at the same gate.
        assert!(mock.imported_txes().is_empty());
        let (tx, gate) = mq.pop().await.unwrap().unwrap();
        assert_eq!((tx.src_hash.as_str(), gate), ("0xfuture", 200));
        assert_eq!(tx.attempts, 0);
    }

    #[tokio::test]
    async fn test_consume_submits_ready_tx_with_assigned_account() {
        init_tracing();
        let mut config = SubmitterConfig::new(chains::ETH);
        config.accounts = vec!["0xacc1".to_string()];
        let (submitter, mock) = new_submitter(config, Arc::new(ScriptedComposer::filling("unlock")));
        mock.set_side_chain_height(chains::ETH, 150);

        let mq = Arc::new(MemorySortedTxBus::new());
        mq.push(src_tx(chains::ETH, "0xready"), 100).await.unwrap();
        let mut imports = mock.subscribe_to_requested_imports();

        let shutdown = CancellationToken::new();
        let handles = submitter.start(mq.clone(), shutdown.clone());
        let imported = imports.recv().await.unwrap();
        assert_eq!(imported, "0xready");
        shutdown.cancel();
        for handle in handles {
            handle.await.unwrap();
        }

        let imported = mock.imported_txes();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].0.sender.as_deref(), Some("0xacc1"));
        assert_eq!(imported[0].1, "0xacc1");
        assert!(mq.pop().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_consume_extends_backoff_for_pending_competition() {
        init_tracing();
        let mut config = SubmitterConfig::new(chains::ETH);
        config.accounts = vec!["0xacc1".to_string()];
        let (submitter, mock) = new_submitter(config, Arc::new(ScriptedComposer::filling("unlock")));
        mock.set_side_chain_height(chains::ETH, 150);
        mock.push_import_result(Err(SendTxError::AlreadyKnown));

        let mq = Arc::new(MemorySortedTxBus::new());
        mq.push(src_tx(chains::ETH, "0xnonce-race"), 100)
            .await
            .unwrap();
        let mut imports = mock.subscribe_to_requested_imports();

        let shutdown = CancellationToken::new();
        let handles = submitter.start(mq.clone(), shutdown.clone());
        imports.recv().await.unwrap();
        // Requeued at gate 170, which is above the ready height, so the
        // worker keeps cycling it without further sends.
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.cancel();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(mock.imported_txes().len(), 1);
        let (tx, gate) = mq.pop().await.unwrap().unwrap();
        assert_eq!(gate, 170);
        assert_eq!(tx.attempts, 1);
    }

    #[tokio::test]
    async fn test_consume_plain_failure_requeues_next_height() {
        init_tracing();
        let mut config = SubmitterConfig::new(chains::ETH);
        config.accounts = vec!["0xacc1".to_string()];
        let (submitter, mock) = new_submitter(config, Arc::new(ScriptedComposer::filling("unlock")));
        mock.set_side_chain_height(chains::ETH, 150);
        mock.push_import_result(Err(SendTxError::Rpc("boom".into())));
        // The retry at gate 101 is still below the ready height and will be
        // re-submitted; let it succeed then.
        let mut imports = mock.subscribe_to_requested_imports();

        let mq = Arc::new(MemorySortedTxBus::new());
        mq.push(src_tx(chains::ETH, "0xflaky"), 100).await.unwrap();

        let shutdown = CancellationToken::new();
        let handles = submitter.start(mq.clone(), shutdown.clone());
        imports.recv().await.unwrap();
        imports.recv().await.unwrap();
        shutdown.cancel();
        for handle in handles {
            handle.await.unwrap();
        }

        let imported = mock.imported_txes();
        assert_eq!(imported.len(), 2);
        // The attempt counter advanced before the retry was requeued.
        assert_eq!(imported[1].0.attempts, 1);
        assert!(mq.pop().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_run_loop_requeues_failed_tx() {
        init_tracing();
        let mut config = SubmitterConfig::new(chains::ETH);
        config.accounts = vec!["0xacc1".to_string()];
        // A composer that never fills params makes every submit fail with a
        // deterministic data-integrity error.
        let (submitter, mock) = new_submitter(config, Arc::new(ScriptedComposer::noop()));
        mock.set_side_chain_height(chains::ETH, 150);

        let mq = Arc::new(MemoryTxBus::new());
        let mut tx = src_tx(chains::ETH, "0xbroken");
        tx.src_height = 100;
        mq.push(tx).await.unwrap();

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(submitter.clone().run(mq.clone(), shutdown.clone()));
        tokio::time::sleep(Duration::from_millis(300)).await;
        shutdown.cancel();
        handle.await.unwrap();

        // Still queued, never lost, attempts ticked up.
        let tx = mq.pop().await.unwrap().unwrap();
        assert_eq!(tx.src_hash, "0xbroken");
        assert!(tx.attempts >= 1);
        assert!(mock.imported_txes().is_empty());
    }

    #[tokio::test]
    async fn test_process_epochs_empty_is_a_noop() {
        init_tracing();
        let mut config = SubmitterConfig::new(chains::ETH);
        config.accounts = vec!["0xacc1".to_string()];
        let (submitter, mock) = new_submitter(config, Arc::new(ScriptedComposer::filling("unlock")));
        submitter.process_epochs(&[]).await.unwrap();
        assert!(mock.submitted_headers().is_empty());
    }

    #[tokio::test]
    async fn test_process_epochs_rejects_non_epoch_element() {
        init_tracing();
        let mut config = SubmitterConfig::new(chains::ETH);
        config.accounts = vec!["0xacc1".to_string()];
        let (submitter, mock) = new_submitter(config, Arc::new(ScriptedComposer::filling("unlock")));

        let epochs = vec![epoch_tx(7), src_tx(chains::ETH, "0xnot-an-epoch")];
        let err = submitter.process_epochs(&epochs).await.unwrap_err();
        assert!(matches!(err, RelayerError::InvalidEpochBatch(_)));
        assert!(mock.submitted_headers().is_empty());
    }

    #[tokio::test]
    async fn test_process_epochs_submits_ordered_headers() {
        init_tracing();
        let mut config = SubmitterConfig::new(chains::ETH);
        config.accounts = vec!["0xacc1".to_string()];
        let (submitter, mock) = new_submitter(config, Arc::new(ScriptedComposer::filling("unlock")));

        let epochs = vec![epoch_tx(7), epoch_tx(8), epoch_tx(9)];
        submitter.process_epochs(&epochs).await.unwrap();

        let submitted = mock.submitted_headers();
        assert_eq!(submitted.len(), 1);
        let (chain_id, headers) = &submitted[0];
        assert_eq!(*chain_id, chains::HUB);
        assert_eq!(
            headers,
            &vec![
                b"epoch-header-7".to_vec(),
                b"epoch-header-8".to_vec(),
                b"epoch-header-9".to_vec()
            ]
        );
    }

    #[tokio::test]
    async fn test_process_epochs_skips_already_known_epoch() {
        init_tracing();
        let mut config = SubmitterConfig::new(chains::ETH);
        config.accounts = vec!["0xacc1".to_string()];
        let (submitter, mock) = new_submitter(config, Arc::new(ScriptedComposer::filling("unlock")));
        mock.add_epoch_info(EpochInfo {
            epoch_id: 9,
            start_height: 1009,
            end_height: 2000,
        });

        submitter
            .process_epochs(&[epoch_tx(8), epoch_tx(9)])
            .await
            .unwrap();
        assert!(mock.submitted_headers().is_empty());
    }
}
