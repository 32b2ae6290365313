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

//! In-process store.
//!
//! Keeps rows and run records behind `parking_lot` locks. Raw SQL is
//! accepted in the multi-row `INSERT` shape produced by
//! [`crate::sql::InsertBuilder`]; copy sessions decode COPY text and publish
//! their rows in one step on finish.

use crate::error::{Result, StoreError};
use crate::sql::{parse_insert, ROWS_TABLE, SECONDARY_INDEXES};
use crate::traits::{CopyConnection, CopyProvider, RowStore, RunRepository};
use bulkload_core::{BenchmarkRun, Column, CopyChunk, Row, RunId, RunRequest};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct Inner {
    rows: RwLock<Vec<Row>>,
    runs: RwLock<BTreeMap<RunId, BenchmarkRun>>,
    indexes: Mutex<BTreeSet<&'static str>>,
    next_run: AtomicU64,
}

/// Store backed by process memory. Cloning shares the data.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Empty store with every secondary index present.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                rows: RwLock::new(Vec::new()),
                runs: RwLock::new(BTreeMap::new()),
                indexes: Mutex::new(SECONDARY_INDEXES.iter().map(|i| i.name).collect()),
                next_run: AtomicU64::new(1),
            }),
        }
    }

    /// Copies of the rows stored for a run.
    pub fn rows_for(&self, run_id: RunId) -> Vec<Row> {
        self.inner
            .rows
            .read()
            .iter()
            .filter(|r| r.run_id == run_id)
            .cloned()
            .collect()
    }

    /// Names of the secondary indexes currently present.
    pub fn index_names(&self) -> Vec<&'static str> {
        self.inner.indexes.lock().iter().copied().collect()
    }

    fn append(&self, mut rows: Vec<Row>) {
        self.inner.rows.write().append(&mut rows);
    }
}

fn rows_from_sql(sql: &str) -> Result<Vec<Row>> {
    let parsed = parse_insert(sql)?;
    if !parsed.table.eq_ignore_ascii_case(ROWS_TABLE) {
        return Err(StoreError::UnsupportedSql(format!(
            "unknown table '{}'",
            parsed.table
        )));
    }

    // Position 0 of each tuple is the run id; the rest map to catalog columns.
    let mut run_id_at = None;
    let mut targets = Vec::with_capacity(parsed.columns.len());
    for (i, name) in parsed.columns.iter().enumerate() {
        if name.eq_ignore_ascii_case("run_id") {
            run_id_at = Some(i);
            targets.push(None);
            continue;
        }
        let column = Column::from_name(name)
            .ok_or_else(|| StoreError::UnsupportedSql(format!("unknown column '{name}'")))?;
        targets.push(Some(column));
    }
    let run_id_at =
        run_id_at.ok_or_else(|| StoreError::UnsupportedSql("missing run_id column".into()))?;

    parsed
        .rows
        .into_iter()
        .map(|tuple| -> Result<Row> {
            let run_id = tuple[run_id_at]
                .as_deref()
                .and_then(|v| v.parse::<u64>().ok())
                .ok_or_else(|| StoreError::Corrupt {
                    column: "run_id",
                    value: format!("{:?}", tuple[run_id_at]),
                })?;
            let mut row = Row::new(RunId(run_id));
            for (value, column) in tuple.iter().zip(&targets) {
                if let (Some(value), Some(column)) = (value, column) {
                    (column.setter())(&mut row, value).map_err(|_| StoreError::Corrupt {
                        column: column.name(),
                        value: value.clone(),
                    })?;
                }
            }
            Ok(row)
        })
        .collect()
}

impl RowStore for MemoryStore {
    fn insert_row(&self, row: &Row) -> Result<()> {
        self.inner.rows.write().push(row.clone());
        Ok(())
    }

    fn insert_batch(&self, rows: &[Row]) -> Result<()> {
        self.inner.rows.write().extend_from_slice(rows);
        Ok(())
    }

    fn execute_sql(&self, sql: &str) -> Result<u64> {
        let rows = rows_from_sql(sql)?;
        let count = rows.len() as u64;
        self.append(rows);
        Ok(count)
    }

    fn drop_secondary_indexes(&self) -> Result<Vec<String>> {
        let mut indexes = self.inner.indexes.lock();
        let dropped = indexes.iter().map(|n| n.to_string()).collect();
        indexes.clear();
        Ok(dropped)
    }

    fn create_secondary_indexes(&self) -> Result<()> {
        self.inner
            .indexes
            .lock()
            .extend(SECONDARY_INDEXES.iter().map(|i| i.name));
        Ok(())
    }

    fn count_rows(&self, run_id: RunId) -> Result<u64> {
        Ok(self
            .inner
            .rows
            .read()
            .iter()
            .filter(|r| r.run_id == run_id)
            .count() as u64)
    }

    fn delete_rows(&self, run_id: RunId) -> Result<u64> {
        let mut rows = self.inner.rows.write();
        let before = rows.len();
        rows.retain(|r| r.run_id != run_id);
        Ok((before - rows.len()) as u64)
    }
}

impl RunRepository for MemoryStore {
    fn create(&self, request: &RunRequest, column_count: u32) -> Result<BenchmarkRun> {
        let id = RunId(self.inner.next_run.fetch_add(1, Ordering::Relaxed));
        let run = BenchmarkRun::new(id, request, column_count);
        self.inner.runs.write().insert(id, run.clone());
        Ok(run)
    }

    fn update(&self, run: &BenchmarkRun) -> Result<()> {
        match self.inner.runs.write().get_mut(&run.id) {
            Some(slot) => {
                *slot = run.clone();
                Ok(())
            }
            None => Err(StoreError::RunNotFound(run.id)),
        }
    }

    fn get(&self, id: RunId) -> Result<Option<BenchmarkRun>> {
        Ok(self.inner.runs.read().get(&id).cloned())
    }

    fn recent(&self, limit: usize) -> Result<Vec<BenchmarkRun>> {
        Ok(self
            .inner
            .runs
            .read()
            .values()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Copy session buffering decoded rows until finish.
struct MemoryCopy {
    store: MemoryStore,
    staged: Vec<Row>,
}

impl CopyConnection for MemoryCopy {
    fn write_chunk(&mut self, chunk: &CopyChunk) -> Result<()> {
        self.staged.extend(chunk.decode()?);
        Ok(())
    }

    fn staged_rows(&self) -> u64 {
        self.staged.len() as u64
    }

    fn finish(self: Box<Self>) -> Result<u64> {
        let count = self.staged.len() as u64;
        self.store.append(self.staged);
        Ok(count)
    }
}

impl CopyProvider for MemoryStore {
    fn copy_connection(&self) -> Result<Box<dyn CopyConnection>> {
        Ok(Box::new(MemoryCopy {
            store: self.clone(),
            staged: Vec::new(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::InsertBuilder;
    use bulkload_core::{Method, RunStatus};

    fn row(run: u64, city: &str) -> Row {
        let mut r = Row::new(RunId(run));
        r.city = Some(city.into());
        r
    }

    #[test]
    fn test_batch_and_count() {
        let store = MemoryStore::new();
        store.insert_batch(&[row(1, "A"), row(1, "B"), row(2, "C")]).unwrap();
        store.insert_row(&row(1, "D")).unwrap();
        assert_eq!(store.count_rows(RunId(1)).unwrap(), 3);
        assert_eq!(store.count_rows(RunId(2)).unwrap(), 1);
        assert_eq!(store.delete_rows(RunId(1)).unwrap(), 3);
        assert_eq!(store.count_rows(RunId(1)).unwrap(), 0);
    }

    #[test]
    fn test_raw_sql_inserts_rows() {
        let store = MemoryStore::new();
        let mut builder = InsertBuilder::with_capacity(2);
        let mut first = row(4, "Zwolle");
        (Column::HireDate.setter())(&mut first, "2019-05-06").unwrap();
        builder.push_row(&first);
        builder.push_row(&row(4, "Emmen"));
        assert_eq!(store.execute_sql(builder.sql()).unwrap(), 2);
        assert_eq!(store.rows_for(RunId(4))[0], first);
    }

    #[test]
    fn test_raw_sql_rejects_unknown_table() {
        let store = MemoryStore::new();
        let err = store
            .execute_sql("INSERT INTO other (run_id) VALUES (1)")
            .unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedSql(_)));
    }

    #[test]
    fn test_copy_publishes_on_finish() {
        let store = MemoryStore::new();
        let mut conn = store.copy_connection().unwrap();
        let mut chunk = CopyChunk::with_capacity(2);
        chunk.push_row(&row(9, "Assen"));
        chunk.push_row(&row(9, "Hoorn"));
        conn.write_chunk(&chunk).unwrap();
        assert_eq!(conn.staged_rows(), 2);
        assert_eq!(store.count_rows(RunId(9)).unwrap(), 0);
        assert_eq!(conn.finish().unwrap(), 2);
        assert_eq!(store.count_rows(RunId(9)).unwrap(), 2);
    }

    #[test]
    fn test_index_drop_and_recreate() {
        let store = MemoryStore::new();
        assert_eq!(store.drop_secondary_indexes().unwrap().len(), 4);
        assert!(store.index_names().is_empty());
        store.create_secondary_indexes().unwrap();
        store.create_secondary_indexes().unwrap();
        assert_eq!(store.index_names().len(), 4);
    }

    #[test]
    fn test_runs_newest_first() {
        let store = MemoryStore::new();
        let a = store.create(&RunRequest::new(10, Method::Batched), 25).unwrap();
        let mut b = store.create(&RunRequest::new(20, Method::RawSql), 25).unwrap();
        assert!(b.id > a.id);
        b.fail("boom", None).unwrap();
        store.update(&b).unwrap();

        let recent = store.recent(10).unwrap();
        assert_eq!(recent.iter().map(|r| r.id).collect::<Vec<_>>(), vec![b.id, a.id]);
        assert_eq!(recent[0].status, RunStatus::Failed);
        assert_eq!(store.recent(1).unwrap().len(), 1);
    }
}
