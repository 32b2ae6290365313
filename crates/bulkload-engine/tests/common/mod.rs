// Dweve Bulkload - Streaming Bulk-Insertion Benchmark Engine
//
// Copyright (c) 2025 Dweve IP B.V. and individual contributors.
//
// SPDX-License-Identifier: Apache-2.0
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository or at: http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Shared fixtures for engine tests.

#![allow(dead_code)]

use bulkload_core::{BenchmarkRun, CopyChunk, Method, Row, RunId, RunRequest};
use bulkload_engine::{BenchmarkService, EngineConfig, RunEvent, StrategySettings};
use bulkload_store::{
    BenchmarkStore, CopyConnection, CopyProvider, MemoryStore, RowStore, RunRepository,
    StoreError,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Config with short ticks, few workers and a fixed seed.
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        sequential: StrategySettings::new(1, 1),
        batched: StrategySettings::new(2, 100),
        raw_sql: StrategySettings::new(3, 250),
        indexed_raw_sql: StrategySettings::new(3, 250),
        native_copy: StrategySettings::new(2, 200),
        progress_interval_ms: 20,
        heartbeat_interval_ms: 50,
        seed: Some(7),
        ..EngineConfig::default()
    }
}

/// Service over `store` with [`fast_config`].
pub fn service(store: Arc<dyn BenchmarkStore>) -> BenchmarkService {
    service_with(fast_config(), store)
}

/// Service over `store` with a custom config.
pub fn service_with(config: EngineConfig, store: Arc<dyn BenchmarkStore>) -> BenchmarkService {
    BenchmarkService::new(config, store).unwrap()
}

/// Starts a run and collects every event until the channel closes.
pub async fn run_collecting(
    service: &BenchmarkService,
    request: RunRequest,
) -> (BenchmarkRun, Vec<RunEvent>) {
    let (run, rx) = service.start_and_subscribe(request).unwrap();
    let events = collect(rx).await;
    let finished = service.wait(run.id).await.unwrap();
    (finished, events)
}

/// Drains a receiver until it closes, skipping lag notices.
pub async fn collect(mut rx: broadcast::Receiver<RunEvent>) -> Vec<RunEvent> {
    let mut events = Vec::new();
    loop {
        match rx.recv().await {
            Ok(event) => events.push(event),
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => return events,
        }
    }
}

/// Request helper.
pub fn request(rows: u64, method: Method) -> RunRequest {
    RunRequest::new(rows, method)
}

/// Injected disk-full error.
pub fn injected_error() -> StoreError {
    StoreError::Sqlite(rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(13),
        Some("injected disk full".into()),
    ))
}

/// What a [`FaultStore`] does wrong.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// `insert_batch` call (1-based) that fails.
    pub fail_batch: Option<u64>,
    /// Every n-th `insert_row` call fails.
    pub fail_every_row: Option<u64>,
    /// `insert_batch` panics.
    pub panic_on_batch: bool,
    /// Copy `write_chunk` call (1-based, across sessions) that fails.
    pub fail_chunk: Option<u64>,
    /// Sleep before every row write.
    pub delay: Duration,
}

/// Memory store with injected faults and call counters.
pub struct FaultStore {
    pub inner: MemoryStore,
    faults: Faults,
    batch_calls: AtomicU64,
    row_calls: AtomicU64,
    chunk_calls: Arc<AtomicU64>,
    pub dropped_indexes: AtomicU64,
    pub created_indexes: AtomicU64,
}

impl FaultStore {
    pub fn new(faults: Faults) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStore::new(),
            faults,
            batch_calls: AtomicU64::new(0),
            row_calls: AtomicU64::new(0),
            chunk_calls: Arc::new(AtomicU64::new(0)),
            dropped_indexes: AtomicU64::new(0),
            created_indexes: AtomicU64::new(0),
        })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Self::new(Faults {
            delay,
            ..Faults::default()
        })
    }

    fn pause(&self) {
        if !self.faults.delay.is_zero() {
            std::thread::sleep(self.faults.delay);
        }
    }
}

impl RowStore for FaultStore {
    fn insert_row(&self, row: &Row) -> bulkload_store::Result<()> {
        self.pause();
        let call = self.row_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.faults.fail_every_row.is_some_and(|n| call % n == 0) {
            return Err(injected_error());
        }
        self.inner.insert_row(row)
    }

    fn insert_batch(&self, rows: &[Row]) -> bulkload_store::Result<()> {
        self.pause();
        let call = self.batch_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.faults.panic_on_batch {
            panic!("store exploded on batch {call}");
        }
        if self.faults.fail_batch == Some(call) {
            return Err(injected_error());
        }
        self.inner.insert_batch(rows)
    }

    fn execute_sql(&self, sql: &str) -> bulkload_store::Result<u64> {
        self.pause();
        self.inner.execute_sql(sql)
    }

    fn drop_secondary_indexes(&self) -> bulkload_store::Result<Vec<String>> {
        self.dropped_indexes.fetch_add(1, Ordering::SeqCst);
        self.inner.drop_secondary_indexes()
    }

    fn create_secondary_indexes(&self) -> bulkload_store::Result<()> {
        self.created_indexes.fetch_add(1, Ordering::SeqCst);
        self.inner.create_secondary_indexes()
    }

    fn count_rows(&self, run_id: RunId) -> bulkload_store::Result<u64> {
        self.inner.count_rows(run_id)
    }

    fn delete_rows(&self, run_id: RunId) -> bulkload_store::Result<u64> {
        self.inner.delete_rows(run_id)
    }
}

impl RunRepository for FaultStore {
    fn create(&self, request: &RunRequest, column_count: u32) -> bulkload_store::Result<BenchmarkRun> {
        self.inner.create(request, column_count)
    }

    fn update(&self, run: &BenchmarkRun) -> bulkload_store::Result<()> {
        self.inner.update(run)
    }

    fn get(&self, id: RunId) -> bulkload_store::Result<Option<BenchmarkRun>> {
        self.inner.get(id)
    }

    fn recent(&self, limit: usize) -> bulkload_store::Result<Vec<BenchmarkRun>> {
        self.inner.recent(limit)
    }
}

struct SlowCopy {
    inner: Box<dyn CopyConnection>,
    delay: Duration,
    calls: Arc<AtomicU64>,
    fail_chunk: Option<u64>,
}

impl CopyConnection for SlowCopy {
    fn write_chunk(&mut self, chunk: &CopyChunk) -> bulkload_store::Result<()> {
        std::thread::sleep(self.delay);
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_chunk == Some(call) {
            return Err(injected_error());
        }
        self.inner.write_chunk(chunk)
    }

    fn staged_rows(&self) -> u64 {
        self.inner.staged_rows()
    }

    fn finish(self: Box<Self>) -> bulkload_store::Result<u64> {
        self.inner.finish()
    }
}

impl CopyProvider for FaultStore {
    fn copy_connection(&self) -> bulkload_store::Result<Box<dyn CopyConnection>> {
        Ok(Box::new(SlowCopy {
            inner: self.inner.copy_connection()?,
            delay: self.faults.delay,
            calls: Arc::clone(&self.chunk_calls),
            fail_chunk: self.faults.fail_chunk,
        }))
    }
}
