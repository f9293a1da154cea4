// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Queue contracts consumed by the submission core. The production queues
//! live in external durable storage and are supplied by the embedding
//! process; the in-memory implementations here back tests and local runs.
//!
//! All bus implementations must be safe for concurrent multi-consumer use
//! and must hand each item to at most one consumer at a time.

use crate::error::RelayerResult;
use async_trait::async_trait;
use hub_relayer_types::RelayTx;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Plain FIFO transaction queue.
#[async_trait]
pub trait TxBus: Send + Sync {
    async fn pop(&self) -> RelayerResult<Option<RelayTx>>;
    async fn push(&self, tx: RelayTx) -> RelayerResult<()>;
    fn topic(&self) -> String;
}

/// Transaction queue ordered by gate height: `pop` returns the item with the
/// lowest gate height together with that height.
#[async_trait]
pub trait SortedTxBus: Send + Sync {
    async fn pop(&self) -> RelayerResult<Option<(RelayTx, u64)>>;
    async fn push(&self, tx: RelayTx, gate_height: u64) -> RelayerResult<()>;
    fn topic(&self) -> String;
}

/// Queue variant that redelivers an item only after a delay has elapsed.
#[async_trait]
pub trait DelayedTxBus: Send + Sync {
    async fn push_delayed(&self, tx: RelayTx, delay: Duration) -> RelayerResult<()>;
    fn topic(&self) -> String;
}

/// Durable cursor recording the last header height successfully marked.
/// Read once at sync start to resume, written on every successful commit.
pub trait ChainStore: Send + Sync {
    fn height_mark(&self, height: u64);
    fn height(&self) -> u64;
}

#[derive(Debug, Default)]
pub struct MemoryTxBus {
    queue: Mutex<VecDeque<RelayTx>>,
}

impl MemoryTxBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TxBus for MemoryTxBus {
    async fn pop(&self) -> RelayerResult<Option<RelayTx>> {
        Ok(self.queue.lock().unwrap().pop_front())
    }

    async fn push(&self, tx: RelayTx) -> RelayerResult<()> {
        self.queue.lock().unwrap().push_back(tx);
        Ok(())
    }

    fn topic(&self) -> String {
        "memory-tx-bus".to_string()
    }
}

#[derive(Debug, Default)]
pub struct MemorySortedTxBus {
    // Gate height -> FIFO of items admitted at that height.
    queue: Mutex<BTreeMap<u64, VecDeque<RelayTx>>>,
}

impl MemorySortedTxBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().unwrap().values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SortedTxBus for MemorySortedTxBus {
    async fn pop(&self) -> RelayerResult<Option<(RelayTx, u64)>> {
        let mut queue = self.queue.lock().unwrap();
        let Some((&height, bucket)) = queue.iter_mut().next() else {
            return Ok(None);
        };
        let tx = bucket.pop_front().expect("empty bucket left in sorted bus");
        if bucket.is_empty() {
            queue.remove(&height);
        }
        Ok(Some((tx, height)))
    }

    async fn push(&self, tx: RelayTx, gate_height: u64) -> RelayerResult<()> {
        self.queue
            .lock()
            .unwrap()
            .entry(gate_height)
            .or_default()
            .push_back(tx);
        Ok(())
    }

    fn topic(&self) -> String {
        "memory-sorted-tx-bus".to_string()
    }
}

#[derive(Debug, Default)]
pub struct MemoryDelayedTxBus {
    queue: Mutex<Vec<(Instant, RelayTx)>>,
}

impl MemoryDelayedTxBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop one item whose delay has elapsed, if any.
    pub fn pop_ready(&self) -> Option<RelayTx> {
        let mut queue = self.queue.lock().unwrap();
        let now = Instant::now();
        let idx = queue.iter().position(|(ready_at, _)| *ready_at <= now)?;
        Some(queue.remove(idx).1)
    }

    pub fn len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }
}

#[async_trait]
impl DelayedTxBus for MemoryDelayedTxBus {
    async fn push_delayed(&self, tx: RelayTx, delay: Duration) -> RelayerResult<()> {
        self.queue
            .lock()
            .unwrap()
            .push((Instant::now() + delay, tx));
        Ok(())
    }

    fn topic(&self) -> String {
        "memory-delayed-tx-bus".to_string()
    }
}

#[derive(Debug, Default)]
pub struct MemoryChainStore {
    height: AtomicU64,
}

impl MemoryChainStore {
    pub fn new(height: u64) -> Self {
        Self {
            height: AtomicU64::new(height),
        }
    }
}

impl ChainStore for MemoryChainStore {
    fn height_mark(&self, height: u64) {
        // The cursor only moves forward.
        self.height.fetch_max(height, Ordering::SeqCst);
    }

    fn height(&self) -> u64 {
        self.height.load(Ordering::SeqCst)
    }
}
