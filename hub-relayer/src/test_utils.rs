// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::composer::SrcComposer;
use crate::config::SubmitterConfig;
use crate::error::{ComposeError, RelayerResult};
use crate::hub_client::HubClient;
use crate::hub_mock_client::MockHubClient;
use crate::metrics::RelayerMetrics;
use crate::submitter::Submitter;
use async_trait::async_trait;
use hub_relayer_types::{RelayTx, TxParam};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Once};

static INIT_TRACING: Once = Once::new();

pub(crate) fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub(crate) enum ComposeBehavior {
    /// Fill in decoded params with the given method; cross_chain_id mirrors
    /// the source hash so tests can preset the done-set.
    FillParam { method: String },
    Fail(ComposeError),
    /// Leave the transaction untouched.
    Noop,
}

pub(crate) struct ScriptedComposer {
    latest_height: AtomicU64,
    behavior: Mutex<ComposeBehavior>,
}

impl ScriptedComposer {
    pub fn filling(method: &str) -> Self {
        Self {
            latest_height: AtomicU64::new(0),
            behavior: Mutex::new(ComposeBehavior::FillParam {
                method: method.to_string(),
            }),
        }
    }

    pub fn noop() -> Self {
        Self {
            latest_height: AtomicU64::new(0),
            behavior: Mutex::new(ComposeBehavior::Noop),
        }
    }

    pub fn failing(err: ComposeError) -> Self {
        Self {
            latest_height: AtomicU64::new(0),
            behavior: Mutex::new(ComposeBehavior::Fail(err)),
        }
    }

    pub fn set_latest_height(&self, height: u64) {
        self.latest_height.store(height, Ordering::Relaxed);
    }
}

#[async_trait]
impl SrcComposer for ScriptedComposer {
    async fn latest_height(&self) -> RelayerResult<u64> {
        Ok(self.latest_height.load(Ordering::Relaxed))
    }

    async fn compose(&self, tx: &mut RelayTx) -> Result<(), ComposeError> {
        match &*self.behavior.lock().unwrap() {
            ComposeBehavior::Noop => Ok(()),
            ComposeBehavior::Fail(err) => Err(err.clone()),
            ComposeBehavior::FillParam { method } => {
                if tx.param.is_none() {
                    tx.param = Some(TxParam {
                        method: method.clone(),
                        cross_chain_id: tx.src_hash.as_bytes().to_vec(),
                        args: vec![],
                    });
                }
                Ok(())
            }
        }
    }
}

pub(crate) fn new_submitter(
    config: SubmitterConfig,
    composer: Arc<dyn SrcComposer>,
) -> (Arc<Submitter<MockHubClient>>, MockHubClient) {
    let mock = MockHubClient::default();
    let client = Arc::new(HubClient::new_for_testing(mock.clone()));
    let submitter = Arc::new(Submitter::new(
        config,
        client,
        composer,
        Arc::new(RelayerMetrics::new_for_testing()),
    ));
    (submitter, mock)
}
