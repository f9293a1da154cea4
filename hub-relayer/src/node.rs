// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Process assembly: wires configuration and the externally supplied
//! collaborators into the worker pool and the header sync task.

use crate::bus::{ChainStore, SortedTxBus, TxBus};
use crate::composer::SrcComposer;
use crate::config::RelayerConfig;
use crate::error::RelayerError;
use crate::header_sync::HeaderSyncer;
use crate::hub_client::{HubAccount, HubClient, HubClientInner};
use crate::metrics::RelayerMetrics;
use crate::retry_with_max_elapsed_time;
use crate::submitter::Submitter;
use hub_relayer_types::HeaderUnit;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const RESET_CHANNEL_SIZE: usize = 64;

/// Externally supplied collaborators: durable queues, the sync cursor store
/// and the per-source-chain composer. Their concrete backends live outside
/// this crate.
pub struct RelayerCollaborators {
    pub sorted_bus: Arc<dyn SortedTxBus>,
    /// Legacy single-queue path; omitted when only the worker pool runs.
    pub plain_bus: Option<Arc<dyn TxBus>>,
    pub chain_store: Arc<dyn ChainStore>,
    pub composer: Arc<dyn SrcComposer>,
}

/// Running relayer handles: the header-unit channel feeding the sync task,
/// the rollback signal stream for the upstream producer, and the task
/// handles awaited on shutdown.
#[derive(Debug)]
pub struct RelayerHandles {
    pub header_tx: Option<mpsc::Sender<HeaderUnit>>,
    pub reset_rx: Option<mpsc::Receiver<u64>>,
    pub tasks: Vec<JoinHandle<()>>,
}

pub async fn run_relayer<C>(
    config: RelayerConfig,
    client: Arc<HubClient<C>>,
    collaborators: RelayerCollaborators,
    registry: &prometheus::Registry,
    shutdown: CancellationToken,
) -> anyhow::Result<RelayerHandles>
where
    C: HubClientInner + 'static,
{
    let metrics = Arc::new(RelayerMetrics::new(registry));

    // Probe hub connectivity before spawning anything.
    let Ok(Ok(())) = retry_with_max_elapsed_time!(client.describe(), Duration::from_secs(30))
    else {
        anyhow::bail!("failed to reach the hub node after retries");
    };

    let submitter = Arc::new(Submitter::new(
        config.submitter.clone(),
        client.clone(),
        collaborators.composer.clone(),
        metrics.clone(),
    ));

    let mut tasks = submitter.start(collaborators.sorted_bus.clone(), shutdown.clone());
    if let Some(plain_bus) = collaborators.plain_bus.clone() {
        tasks.push(tokio::spawn(
            submitter.clone().run(plain_bus, shutdown.clone()),
        ));
    }

    let (mut header_tx, mut reset_rx) = (None, None);
    if let Some(sync_config) = config.header_sync.clone() {
        let signer = sync_config
            .account
            .clone()
            .or_else(|| config.submitter.accounts.first().cloned())
            .map(HubAccount::new)
            .ok_or_else(|| {
                RelayerError::InvalidConfig(
                    "header sync requires a hub account".to_string(),
                )
            })?;
        let (reset_tx, rx) = mpsc::channel(RESET_CHANNEL_SIZE);
        let (tx, handle) = HeaderSyncer::start(
            sync_config,
            client,
            collaborators.chain_store.clone(),
            signer,
            metrics,
            reset_tx,
            shutdown,
        )?;
        tasks.push(handle);
        header_tx = Some(tx);
        reset_rx = Some(rx);
    }

    Ok(RelayerHandles {
        header_tx,
        reset_rx,
        tasks,
    })
}
