// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::error::{RelayerError, RelayerResult};
use hub_relayer_config::Config;
use hub_relayer_types::chains;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

fn default_retry_delta() -> u64 {
    1
}

fn default_pending_retry_delta() -> u64 {
    70
}

fn default_ready_poll_interval_ms() -> u64 {
    300
}

fn default_run_poll_interval_ms() -> u64 {
    800
}

fn default_rollback_margin() -> u64 {
    2
}

#[serde_as]
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SubmitterConfig {
    // The source chain this submitter relays to the hub.
    pub chain_id: u64,
    // Hub signing accounts; one worker is started per account.
    #[serde(default)]
    pub accounts: Vec<String>,
    // Destination methods admitted for import. An empty list admits
    // everything; transactions with a disallowed method are dropped, not
    // failed.
    #[serde(default)]
    pub allow_methods: Vec<String>,
    // Gate-height increment applied when requeueing after a plain failure.
    #[serde(default = "default_retry_delta")]
    pub retry_delta: u64,
    // Gate-height increment applied when a competing send for the same
    // nonce is still pending, to avoid immediate re-collision.
    #[serde(default = "default_pending_retry_delta")]
    pub pending_retry_delta: u64,
    // Refresh cadence of the cached hub ready height in the multi-account
    // worker loop.
    #[serde(default = "default_ready_poll_interval_ms")]
    pub ready_poll_interval_ms: u64,
    // Refresh cadence of the single-queue loop.
    #[serde(default = "default_run_poll_interval_ms")]
    pub run_poll_interval_ms: u64,
    // Override of the per-chain confirmation-depth constant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks_to_wait: Option<u64>,
}

impl SubmitterConfig {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            accounts: vec![],
            allow_methods: vec![],
            retry_delta: default_retry_delta(),
            pending_retry_delta: default_pending_retry_delta(),
            ready_poll_interval_ms: default_ready_poll_interval_ms(),
            run_poll_interval_ms: default_run_poll_interval_ms(),
            blocks_to_wait: None,
        }
    }

    pub fn method_allowed(&self, method: &str) -> bool {
        self.allow_methods.is_empty() || self.allow_methods.iter().any(|m| m == method)
    }

    pub fn blocks_to_wait(&self) -> u64 {
        self.blocks_to_wait
            .unwrap_or_else(|| chains::blocks_to_wait(self.chain_id))
    }
}

#[serde_as]
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct HeaderSyncConfig {
    // The side chain whose headers are synced to the hub.
    pub chain_id: u64,
    // Number of headers accumulated before a commit. One disables batching.
    #[serde(default)]
    pub batch: usize,
    // Depth of the header-unit channel. Zero defaults to twice the batch.
    #[serde(default)]
    pub buffer: usize,
    // Idle timeout after which a non-empty pending batch is flushed.
    #[serde(default)]
    pub timeout_secs: u64,
    // Extra heights the producer is reverted past the failed batch, covering
    // one height of in-flight uncertainty plus one of safety margin.
    #[serde(default = "default_rollback_margin")]
    pub rollback_margin: u64,
    // Hub account used for header submissions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

impl HeaderSyncConfig {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            batch: 0,
            buffer: 0,
            timeout_secs: 0,
            rollback_margin: default_rollback_margin(),
            account: None,
        }
    }

    /// Apply defaults and reject configurations the sync loop cannot run
    /// with.
    pub fn validate(mut self) -> RelayerResult<Self> {
        if self.chain_id == 0 {
            return Err(RelayerError::InvalidConfig(
                "header sync side chain id must not be zero".to_string(),
            ));
        }
        if self.batch == 0 {
            self.batch = 1;
        }
        if self.buffer == 0 {
            self.buffer = 2 * self.batch;
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = 1;
        }
        Ok(self)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RelayerConfig {
    pub submitter: SubmitterConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_sync: Option<HeaderSyncConfig>,
}

impl Config for RelayerConfig {}
