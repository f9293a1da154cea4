// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Closed error taxonomy of the submission core. Workers pick their retry
//! policy by matching on these kinds; no error-text inspection happens
//! anywhere above the RPC adapter layer.

use thiserror::Error;

pub type RelayerResult<T> = Result<T, RelayerError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayerError {
    /// The transaction is malformed or incomplete. Non-retryable; a correct
    /// upstream never produces this.
    #[error("invalid transaction: {0}")]
    InvalidTx(String),
    /// The source node lacks the historical trie data needed for the proof.
    /// Retryable, usually by waiting for the node to catch up.
    #[error("source proof data not available yet")]
    ProofUnavailable,
    /// A competing send for the same item is still outstanding on the hub.
    /// Retryable with extended backoff to avoid nonce collision storms.
    #[error("transaction already pending on the hub")]
    TxPending,
    /// Generic import failure, retryable with standard backoff.
    #[error("failed to import src tx {src_hash} from chain {src_chain_id}: {reason}")]
    SubmitFailure {
        src_chain_id: u64,
        src_hash: String,
        reason: String,
    },
    /// The hub reports a synced height below our last header commit: a
    /// previously reported commit was silently dropped.
    #[error("hub is missing a previously committed header")]
    HeaderMissing,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Malformed epoch aggregation input. Fatal for the affected call.
    #[error("invalid side chain epoch batch: {0}")]
    InvalidEpochBatch(String),
    #[error("hub rpc error: {0}")]
    Rpc(String),
    #[error("{0}")]
    Generic(String),
}

/// Outcome kinds of a signed hub send, classified by the client layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendTxError {
    /// The hub has already imported this item. Not a failure.
    #[error("transaction already imported on the hub")]
    AlreadyDone,
    /// An identical transaction is already known to the hub mempool, meaning
    /// a competing send with the same nonce is outstanding.
    #[error("transaction already known to the hub mempool")]
    AlreadyKnown,
    #[error("hub rpc error: {0}")]
    Rpc(String),
}

/// Failure classes of the source composer, distinguished by the submitter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    /// Missing historical trie node on the source full node.
    #[error("source node is missing the required trie data")]
    ProofUnavailable,
    #[error("{0}")]
    Other(String),
}
