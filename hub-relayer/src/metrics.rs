// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use prometheus::{
    register_int_counter_vec_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, IntCounter, IntCounterVec, IntGauge, Registry,
};

#[derive(Clone, Debug)]
pub struct RelayerMetrics {
    /// Last header height this process committed to the hub.
    pub last_committed_header_height: IntGauge,
    pub header_commits: IntCounter,
    pub header_rollbacks: IntCounter,
    pub header_confirm_failures: IntCounter,
    /// Cached hub-side ready height used to gate transaction submission.
    pub ready_height: IntGauge,
    /// Submission attempts by outcome: success / already_done / pending /
    /// dropped / error.
    pub tx_submissions: IntCounterVec,
}

impl RelayerMetrics {
    pub fn new(registry: &Registry) -> Self {
        Self {
            last_committed_header_height: register_int_gauge_with_registry!(
                "relayer_last_committed_header_height",
                "Last header height committed to the hub by this process",
                registry,
            )
            .unwrap(),
            header_commits: register_int_counter_with_registry!(
                "relayer_header_commits",
                "Number of successful header submissions",
                registry,
            )
            .unwrap(),
            header_rollbacks: register_int_counter_with_registry!(
                "relayer_header_rollbacks",
                "Number of rollback signals sent to the header producer",
                registry,
            )
            .unwrap(),
            header_confirm_failures: register_int_counter_with_registry!(
                "relayer_header_confirm_failures",
                "Number of failed header submit-confirmation checks",
                registry,
            )
            .unwrap(),
            ready_height: register_int_gauge_with_registry!(
                "relayer_ready_height",
                "Hub-side ready height used to gate transaction submission",
                registry,
            )
            .unwrap(),
            tx_submissions: register_int_counter_vec_with_registry!(
                "relayer_tx_submissions",
                "Transaction submission attempts by outcome",
                &["outcome"],
                registry,
            )
            .unwrap(),
        }
    }

    pub fn new_for_testing() -> Self {
        let registry = Registry::new();
        Self::new(&registry)
    }
}
