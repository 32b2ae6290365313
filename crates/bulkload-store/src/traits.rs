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

//! Store interfaces consumed by the engine.
//!
//! The engine writes through three seams:
//!
//! - [`RowStore`]: row writes (single, batched, raw SQL), index management,
//!   counting and bulk deletion
//! - [`RunRepository`]: benchmark run records
//! - [`CopyProvider`]: dedicated [`CopyConnection`]s for the bulk-copy path
//!
//! Implementations must be shareable across worker threads. All methods are
//! blocking; the engine calls them from its own worker threads.

use crate::error::Result;
use bulkload_core::{BenchmarkRun, CopyChunk, Row, RunId, RunRequest};

/// Destination table for benchmark rows.
pub trait RowStore: Send + Sync {
    /// Inserts one row.
    fn insert_row(&self, row: &Row) -> Result<()>;

    /// Inserts a batch atomically: either every row is visible or none is.
    fn insert_batch(&self, rows: &[Row]) -> Result<()>;

    /// Executes one multi-row `INSERT` statement, returning rows affected.
    fn execute_sql(&self, sql: &str) -> Result<u64>;

    /// Drops the secondary indexes on the row table, returning their names.
    fn drop_secondary_indexes(&self) -> Result<Vec<String>>;

    /// Creates every secondary index that does not exist. Idempotent.
    fn create_secondary_indexes(&self) -> Result<()>;

    /// Rows persisted for a run.
    fn count_rows(&self, run_id: RunId) -> Result<u64>;

    /// Deletes every row of a run, returning how many were removed.
    fn delete_rows(&self, run_id: RunId) -> Result<u64>;
}

/// Persistence for [`BenchmarkRun`] records.
pub trait RunRepository: Send + Sync {
    /// Creates a record in `running` state with a fresh id.
    fn create(&self, request: &RunRequest, column_count: u32) -> Result<BenchmarkRun>;

    /// Overwrites a record with the given state.
    fn update(&self, run: &BenchmarkRun) -> Result<()>;

    /// Fetches a record.
    fn get(&self, id: RunId) -> Result<Option<BenchmarkRun>>;

    /// Most recent records, newest first.
    fn recent(&self, limit: usize) -> Result<Vec<BenchmarkRun>>;
}

/// One dedicated bulk-copy session.
///
/// Chunks are staged as they arrive; nothing is visible in the row table
/// until [`CopyConnection::finish`] commits them in one step.
pub trait CopyConnection: Send {
    /// Stages one chunk of COPY text.
    fn write_chunk(&mut self, chunk: &CopyChunk) -> Result<()>;

    /// Rows staged so far.
    fn staged_rows(&self) -> u64;

    /// Commits everything staged and closes the session.
    fn finish(self: Box<Self>) -> Result<u64>;
}

/// Source of dedicated copy connections.
pub trait CopyProvider: Send + Sync {
    /// Opens a new copy session.
    fn copy_connection(&self) -> Result<Box<dyn CopyConnection>>;
}

/// Everything the engine needs from one backend.
pub trait BenchmarkStore: RowStore + RunRepository + CopyProvider {}

impl<T: RowStore + RunRepository + CopyProvider> BenchmarkStore for T {}
