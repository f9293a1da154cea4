// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The hub relayer submission core: reliably delivers cross-chain
//! transactions and source-chain block headers to the hub chain's verifier
//! contracts, tolerating transient RPC failures, chain reorganizations and
//! duplicate or pending transaction races.

pub mod bus;
pub mod composer;
pub mod config;
pub mod error;
pub mod header_sync;
pub mod hub_client;
pub mod hub_mock_client;
pub mod metrics;
pub mod node;
pub mod submitter;

#[cfg(test)]
pub(crate) mod test_utils;

/// Retry an async read-path call with capped exponential backoff.
///
/// The delay sequence (in secs, with jitter) is
/// 0.4, 0.8, 1.6, 3.2, 6.4, 12.8, 25.6, 30, 30 ... until `$max_elapsed_time`
/// is reached. Returns `Ok(Ok(v))` on success, `Err(e)` once retries are
/// exhausted.
#[macro_export]
macro_rules! retry_with_max_elapsed_time {
    ($func:expr, $max_elapsed_time:expr) => {{
        let backoff = backoff::ExponentialBackoff {
            initial_interval: std::time::Duration::from_millis(400),
            randomization_factor: 0.1,
            multiplier: 2.0,
            max_interval: std::time::Duration::from_secs(30),
            max_elapsed_time: Some($max_elapsed_time),
            ..Default::default()
        };
        backoff::future::retry(backoff, || {
            let fut = async {
                let result = $func.await;
                match result {
                    Ok(_) => Ok(result),
                    Err(e) => {
                        // Every error is treated as transient so we keep
                        // retrying until max_elapsed_time.
                        tracing::debug!("Retrying due to error: {:?}", e);
                        Err(backoff::Error::transient(e))
                    }
                }
            };
            std::boxed::Box::pin(fut)
        })
        .await
    }};
}
