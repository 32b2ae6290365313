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

//! Hand-built multi-row `INSERT` statements, with optional index management.
//!
//! The indexed variant drops the secondary indexes before loads of at least
//! `index_threshold` rows and recreates them afterwards. Recreation uses
//! `CREATE INDEX IF NOT EXISTS` and runs after every indexed load, so a run
//! that died with its indexes dropped is repaired by the next one.

use super::{Batch, BatchWriter, InsertStrategy, WriteOutcome};
use crate::config::StrategySettings;
use crate::error::{EngineError, Result};
use bulkload_core::Method;
use bulkload_store::{BenchmarkStore, InsertBuilder};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// `raw_sql` and `indexed_raw_sql`.
#[derive(Debug, Clone)]
pub struct RawSqlStrategy {
    settings: StrategySettings,
    index_threshold: Option<u64>,
}

impl RawSqlStrategy {
    /// Plain multi-row inserts.
    pub fn plain(settings: StrategySettings) -> Self {
        Self {
            settings,
            index_threshold: None,
        }
    }

    /// Multi-row inserts with indexes dropped for loads of `threshold` rows or more.
    pub fn indexed(settings: StrategySettings, threshold: u64) -> Self {
        Self {
            settings,
            index_threshold: Some(threshold),
        }
    }

    /// Whether a load of `rows` rows drops the indexes.
    pub fn drops_indexes_for(&self, rows: u64) -> bool {
        self.index_threshold.is_some_and(|t| rows >= t)
    }
}

impl InsertStrategy for RawSqlStrategy {
    fn method(&self) -> Method {
        if self.index_threshold.is_some() {
            Method::IndexedRawSql
        } else {
            Method::RawSql
        }
    }

    fn settings(&self) -> StrategySettings {
        self.settings
    }

    fn prepare(&self, store: &dyn BenchmarkStore, rows: u64) -> Result<()> {
        if !self.drops_indexes_for(rows) {
            return Ok(());
        }
        let dropped = store
            .drop_secondary_indexes()
            .map_err(EngineError::Write)?;
        info!(rows, indexes = ?dropped, "dropped secondary indexes for bulk load");
        Ok(())
    }

    fn cleanup(&self, store: &dyn BenchmarkStore) -> Result<()> {
        if self.index_threshold.is_none() {
            return Ok(());
        }
        let started = Instant::now();
        store
            .create_secondary_indexes()
            .map_err(EngineError::Write)?;
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "secondary indexes in place"
        );
        Ok(())
    }

    fn open_writer(&self, store: &Arc<dyn BenchmarkStore>) -> Result<Box<dyn BatchWriter>> {
        Ok(Box::new(StatementWriter {
            store: Arc::clone(store),
            builder: InsertBuilder::with_capacity(self.settings.batch_size),
        }))
    }
}

struct StatementWriter {
    store: Arc<dyn BenchmarkStore>,
    builder: InsertBuilder,
}

impl BatchWriter for StatementWriter {
    fn write(&mut self, batch: &Batch) -> Result<WriteOutcome> {
        let rows = batch.rows()?;
        if rows.is_empty() {
            return Ok(WriteOutcome::default());
        }
        self.builder.clear();
        for row in rows.iter() {
            self.builder.push_row(row);
        }
        let affected = self
            .store
            .execute_sql(self.builder.sql())
            .map_err(EngineError::Write)?;
        Ok(WriteOutcome {
            written: affected,
            ..WriteOutcome::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold() {
        let settings = StrategySettings::new(2, 10);
        let indexed = RawSqlStrategy::indexed(settings, 100);
        assert!(!indexed.drops_indexes_for(99));
        assert!(indexed.drops_indexes_for(100));
        assert!(!RawSqlStrategy::plain(settings).drops_indexes_for(u64::MAX));
        assert_eq!(indexed.method(), Method::IndexedRawSql);
    }
}
