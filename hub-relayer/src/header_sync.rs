// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The header sync engine advances the hub's stored header height for one
//! side chain. It consumes a channel of [`HeaderUnit`]s produced by the
//! upstream listener, submits header bytes when present and bare height
//! markers when not, and signals the producer over the reset channel when a
//! commit fails so it can re-emit from an earlier height.

use crate::bus::ChainStore;
use crate::config::HeaderSyncConfig;
use crate::error::{RelayerError, RelayerResult};
use crate::hub_client::{HubAccount, HubClient, HubClientInner};
use crate::metrics::RelayerMetrics;
use hub_relayer_types::{chains, HeaderUnit};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub struct HeaderSyncer<C> {
    config: HeaderSyncConfig,
    name: String,
    signer: HubAccount,
    client: Arc<HubClient<C>>,
    state: Arc<dyn ChainStore>,
    metrics: Arc<RelayerMetrics>,
    // Submit-confirmation state, owned exclusively by the sync task.
    last_commit: u64,
    last_check: u64,
}

impl<C> HeaderSyncer<C>
where
    C: HubClientInner + 'static,
{
    /// Validate the configuration, spawn the sync loop and hand back the
    /// header-unit channel. A zero sync chain id is a fatal configuration
    /// error reported to the caller instead of starting a broken loop.
    pub fn start(
        config: HeaderSyncConfig,
        client: Arc<HubClient<C>>,
        state: Arc<dyn ChainStore>,
        signer: HubAccount,
        metrics: Arc<RelayerMetrics>,
        reset: mpsc::Sender<u64>,
        shutdown: CancellationToken,
    ) -> RelayerResult<(mpsc::Sender<HeaderUnit>, JoinHandle<()>)> {
        let config = config.validate()?;
        let name = chains::chain_name(config.chain_id);
        let (header_tx, header_rx) = mpsc::channel(config.buffer);
        let syncer = Self {
            config,
            name,
            signer,
            client,
            state,
            metrics,
            last_commit: 0,
            last_check: 0,
        };
        let handle = tokio::spawn(syncer.run(header_rx, reset, shutdown));
        Ok((header_tx, handle))
    }

    async fn run(
        mut self,
        rx: mpsc::Receiver<HeaderUnit>,
        reset: mpsc::Sender<u64>,
        shutdown: CancellationToken,
    ) {
        let resume = self.state.height();
        info!(
            chain = %self.name,
            resume_height = resume,
            batch = self.config.batch,
            "Starting header sync loop"
        );
        if self.config.batch == 1 {
            self.sync_loop(rx, &reset, &shutdown).await;
        } else {
            self.sync_batch_loop(rx, &reset, &shutdown).await;
        }
        info!(chain = %self.name, "Header sync exiting loop now");
    }

    /// Single mode: every unit is committed on arrival.
    async fn sync_loop(
        &mut self,
        mut rx: mpsc::Receiver<HeaderUnit>,
        reset: &mpsc::Sender<u64>,
        shutdown: &CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                unit = rx.recv() => {
                    let Some(unit) = unit else { return };
                    let headers = match &unit.data {
                        Some(data) => vec![data.clone()],
                        None => vec![],
                    };
                    if self
                        .submit_headers_with_loop(headers, Some(&unit))
                        .await
                        .is_err()
                    {
                        // Re-emit from two heights back: one of in-flight
                        // uncertainty plus one of safety margin.
                        self.rollback(reset, unit.height.saturating_sub(self.config.rollback_margin))
                            .await;
                    }
                }
            }
        }
    }

    /// Batched mode: accumulate contiguous headers and commit on batch size,
    /// idle timeout, bare marker or channel closure.
    async fn sync_batch_loop(
        &mut self,
        mut rx: mpsc::Receiver<HeaderUnit>,
        reset: &mpsc::Sender<u64>,
        shutdown: &CancellationToken,
    ) {
        let mut headers: Vec<Vec<u8>> = vec![];
        let mut height = 0u64;
        let mut last: Option<HeaderUnit> = None;
        let timeout = Duration::from_secs(self.config.timeout_secs);

        'recv: loop {
            let mut commit = false;
            tokio::select! {
                _ = shutdown.cancelled() => break 'recv,
                unit = rx.recv() => match unit {
                    None => break 'recv,
                    Some(unit) => {
                        if !headers.is_empty() && unit.height != height + 1 {
                            // A height gap invalidates everything pending.
                            info!(
                                chain = %self.name,
                                height,
                                current_height = unit.height,
                                "Resetting header set"
                            );
                            headers.clear();
                        }
                        height = unit.height;
                        match &unit.data {
                            // A bare marker advances the sync height now.
                            None => commit = true,
                            Some(data) => {
                                headers.push(data.clone());
                                commit = headers.len() >= self.config.batch;
                            }
                        }
                        last = Some(unit);
                    }
                },
                _ = time::sleep(timeout) => {
                    commit = !headers.is_empty();
                }
            }
            if commit {
                let batch = std::mem::take(&mut headers);
                let batch_len = batch.len() as u64;
                if self
                    .submit_headers_with_loop(batch, last.as_ref())
                    .await
                    .is_err()
                {
                    // Revert past the whole uncommitted batch plus the margin.
                    self.rollback(
                        reset,
                        height.saturating_sub(batch_len + self.config.rollback_margin),
                    )
                    .await;
                }
            }
        }

        // Flush whatever is pending before exiting.
        if !headers.is_empty() {
            let _ = self.submit_headers_with_loop(headers, last.as_ref()).await;
        }
    }

    /// Shared submission step of both sync modes: send the headers when
    /// there are any, cross-check the commit every few submissions, and
    /// advance the durable cursor only on success. A marker-only call still
    /// advances the cursor.
    async fn submit_headers_with_loop(
        &mut self,
        headers: Vec<Vec<u8>>,
        unit: Option<&HeaderUnit>,
    ) -> RelayerResult<()> {
        let start = Instant::now();
        let mut result = Ok(());
        if !headers.is_empty() {
            result = self
                .client
                .submit_headers(self.config.chain_id, &headers, &self.signer)
                .await
                .map(|_| ());
            if result.is_ok() && unit.is_some() {
                // Check the last commit every 4 successful submits. The hub
                // has been observed to silently drop header commits for
                // these chains even after reporting success.
                if self.last_commit > 0 && self.last_check > 3 {
                    self.last_check = 0;
                    if chains::requires_submit_confirmation(self.config.chain_id) {
                        match self
                            .client
                            .get_side_chain_height(self.config.chain_id)
                            .await
                        {
                            Err(err) => {
                                error!(
                                    chain = %self.name,
                                    err = %err,
                                    "Get side chain header height failure"
                                );
                            }
                            Ok(synced) if synced < self.last_commit => {
                                error!(
                                    chain = %self.name,
                                    height = synced,
                                    last_submit = self.last_commit,
                                    "Chain header submit confirm check failure"
                                );
                                self.metrics.header_confirm_failures.inc();
                                result = Err(RelayerError::HeaderMissing);
                            }
                            Ok(synced) => {
                                info!(
                                    chain = %self.name,
                                    height = synced,
                                    last_submit = self.last_commit,
                                    "Chain header submit confirm check success"
                                );
                            }
                        }
                    }
                } else {
                    self.last_check += 1;
                }
            }
        }

        let mut committed = 0u64;
        if let Some(unit) = unit {
            committed = unit.height;
            if result.is_ok() {
                // Mark header sync height
                self.state.height_mark(unit.height);
                self.last_commit = unit.height;
                self.metrics
                    .last_committed_header_height
                    .set(unit.height as i64);
                self.metrics.header_commits.inc();
            }
        }
        info!(
            chain = self.config.chain_id,
            size = headers.len(),
            height = committed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "Submit headers to hub"
        );
        result
    }

    async fn rollback(&self, reset: &mpsc::Sender<u64>, height: u64) {
        self.metrics.header_rollbacks.inc();
        if reset.send(height).await.is_err() {
            error!(
                chain = %self.name,
                height,
                "Failed to signal header rollback, producer is gone"
            );
        }
    }
}
