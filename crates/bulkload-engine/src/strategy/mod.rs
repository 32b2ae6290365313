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

//! Insertion strategies.
//!
//! Every method runs through the same pipeline: one producer fills batches,
//! N workers write them. A strategy only decides
//!
//! - what a batch carries ([`PayloadKind`])
//! - how one worker writes a batch ([`BatchWriter`])
//! - what happens to the store around the load ([`InsertStrategy::prepare`]
//!   and [`InsertStrategy::cleanup`])
//!
//! | Method | Workers | Writer |
//! |---|---|---|
//! | `sequential` | 1 | one `insert_row` per row, failures counted |
//! | `batched` | NumCPU | one `insert_batch` per batch |
//! | `raw_sql` | NumCPU x 2 | one multi-row `INSERT` per batch |
//! | `indexed_raw_sql` | NumCPU x 2 | as `raw_sql`, indexes dropped for large loads |
//! | `native_copy` | NumCPU | one copy session per worker, committed at the end |

mod batched;
mod native_copy;
mod raw_sql;
mod sequential;

pub use batched::BatchedStrategy;
pub use native_copy::NativeCopyStrategy;
pub use raw_sql::RawSqlStrategy;
pub use sequential::SequentialStrategy;

use crate::config::{EngineConfig, StrategySettings};
use crate::error::{EngineError, Result};
use crate::pool::Reusable;
use bulkload_core::{CopyChunk, Method, Row};
use bulkload_store::{BenchmarkStore, StoreError};
use std::borrow::Cow;
use std::sync::Arc;

/// What the producer puts in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// Typed rows.
    Rows,
    /// Pre-encoded COPY text.
    Copy,
}

/// One unit of work on the batch queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Batch {
    /// Typed rows.
    Rows(Vec<Row>),
    /// COPY text.
    Copy(CopyChunk),
}

impl Batch {
    /// Empty batch of the given kind sized for `rows` rows.
    pub fn with_capacity(kind: PayloadKind, rows: usize) -> Self {
        match kind {
            PayloadKind::Rows => Self::Rows(Vec::with_capacity(rows)),
            PayloadKind::Copy => Self::Copy(CopyChunk::with_capacity(rows)),
        }
    }

    /// Rows in the batch.
    pub fn len(&self) -> usize {
        match self {
            Self::Rows(rows) => rows.len(),
            Self::Copy(chunk) => chunk.rows(),
        }
    }

    /// Whether the batch holds no row.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The batch as typed rows, decoding COPY text if needed.
    pub fn rows(&self) -> Result<Cow<'_, [Row]>> {
        match self {
            Self::Rows(rows) => Ok(Cow::Borrowed(rows.as_slice())),
            Self::Copy(chunk) => chunk
                .decode()
                .map(Cow::Owned)
                .map_err(|e| EngineError::Write(StoreError::from(e))),
        }
    }

    /// The batch as COPY text, encoding rows if needed.
    pub fn chunk(&self) -> Cow<'_, CopyChunk> {
        match self {
            Self::Copy(chunk) => Cow::Borrowed(chunk),
            Self::Rows(rows) => {
                let mut chunk = CopyChunk::with_capacity(rows.len());
                for row in rows {
                    chunk.push_row(row);
                }
                Cow::Owned(chunk)
            }
        }
    }
}

impl Reusable for Batch {
    fn reset(&mut self) {
        match self {
            Self::Rows(rows) => rows.clear(),
            Self::Copy(chunk) => chunk.clear(),
        }
    }
}

/// Result of writing one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Rows accepted by the store.
    pub written: u64,
    /// Rows rejected, for strategies that tolerate row errors.
    pub failed: u64,
    /// First row error in this batch.
    pub first_error: Option<String>,
}

impl WriteOutcome {
    /// Every row accepted.
    pub fn written(rows: usize) -> Self {
        Self {
            written: rows as u64,
            ..Self::default()
        }
    }

    /// Rows handled, accepted or not.
    pub fn handled(&self) -> u64 {
        self.written + self.failed
    }
}

/// Per-worker writing state.
pub trait BatchWriter: Send {
    /// Writes one batch. An error aborts the run.
    fn write(&mut self, batch: &Batch) -> Result<WriteOutcome>;

    /// Called once after the queue closes on a run that was not aborted.
    /// Returns rows committed by this call.
    fn finish(self: Box<Self>) -> Result<u64> {
        Ok(0)
    }
}

/// One insertion method.
pub trait InsertStrategy: Send + Sync {
    /// Method implemented.
    fn method(&self) -> Method;

    /// Worker count and batch size.
    fn settings(&self) -> StrategySettings;

    /// Batch contents the producer should build.
    fn payload(&self) -> PayloadKind {
        PayloadKind::Rows
    }

    /// Whether per-row failures are counted instead of aborting the run.
    fn tolerates_row_errors(&self) -> bool {
        false
    }

    /// Runs before any batch is written.
    fn prepare(&self, _store: &dyn BenchmarkStore, _rows: u64) -> Result<()> {
        Ok(())
    }

    /// Runs after the load, whether it succeeded or not.
    fn cleanup(&self, _store: &dyn BenchmarkStore) -> Result<()> {
        Ok(())
    }

    /// State for one worker.
    fn open_writer(&self, store: &Arc<dyn BenchmarkStore>) -> Result<Box<dyn BatchWriter>>;
}

/// The strategy for a method, configured from `config`.
pub fn for_method(method: Method, config: &EngineConfig) -> Box<dyn InsertStrategy> {
    let settings = config.strategy(method);
    match method {
        Method::Sequential => Box::new(SequentialStrategy::new(settings)),
        Method::Batched => Box::new(BatchedStrategy::new(settings)),
        Method::RawSql => Box::new(RawSqlStrategy::plain(settings)),
        Method::IndexedRawSql => {
            Box::new(RawSqlStrategy::indexed(settings, config.index_threshold))
        }
        Method::NativeCopy => Box::new(NativeCopyStrategy::new(settings)),
    }
}
