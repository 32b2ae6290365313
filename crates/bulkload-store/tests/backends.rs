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

//! Backend behaviour shared by the memory and SQLite stores.

use bulkload_core::{Column, CopyChunk, Method, Row, RunId, RunRequest};
use bulkload_store::{
    BenchmarkStore, CopyProvider, InsertBuilder, MemoryStore, RowStore,
    RunRepository, SqliteConfig, SqliteStore,
};
use std::sync::Arc;
use std::thread;

fn sample_rows(run: RunId, count: usize) -> Vec<Row> {
    (0..count)
        .map(|i| {
            let mut row = Row::new(run);
            row.employee_id = Some(i.to_string());
            row.last_name = Some(format!("O'Neil-{i}"));
            (Column::BirthDate.setter())(&mut row, "1980-02-29").unwrap();
            row
        })
        .collect()
}

fn backends() -> Vec<(&'static str, Arc<dyn BenchmarkStore>, Option<tempfile::TempDir>)> {
    let dir = tempfile::tempdir().unwrap();
    let sqlite = SqliteStore::open(SqliteConfig::new(dir.path().join("store.db"))).unwrap();
    vec![
        (
            "memory",
            Arc::new(MemoryStore::new()) as Arc<dyn BenchmarkStore>,
            None,
        ),
        ("sqlite", Arc::new(sqlite) as Arc<dyn BenchmarkStore>, Some(dir)),
    ]
}

#[test]
fn test_concurrent_batches_all_land() {
    for (name, store, _dir) in backends() {
        let run = store.create(&RunRequest::new(800, Method::Batched), 25).unwrap();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for batch in sample_rows(run.id, 200).chunks(50) {
                        store.insert_batch(batch).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.count_rows(run.id).unwrap(), 800, "{name}");
    }
}

#[test]
fn test_raw_sql_escapes_quotes() {
    for (name, store, _dir) in backends() {
        let rows = sample_rows(RunId(5), 30);
        let mut builder = InsertBuilder::with_capacity(rows.len());
        for row in &rows {
            builder.push_row(row);
        }
        assert_eq!(store.execute_sql(builder.sql()).unwrap(), 30, "{name}");
        assert_eq!(store.count_rows(RunId(5)).unwrap(), 30, "{name}");
    }
}

#[test]
fn test_parallel_copy_sessions_commit_on_finish() {
    for (name, store, _dir) in backends() {
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let mut conn = store.copy_connection().unwrap();
                    let mut chunk = CopyChunk::with_capacity(100);
                    for _ in 0..4 {
                        chunk.clear();
                        for row in sample_rows(RunId(8), 100) {
                            chunk.push_row(&row);
                        }
                        conn.write_chunk(&chunk).unwrap();
                    }
                    assert_eq!(conn.staged_rows(), 400);
                    conn.finish().unwrap()
                })
            })
            .collect();
        let committed: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(committed, 1_200, "{name}");
        assert_eq!(store.count_rows(RunId(8)).unwrap(), 1_200, "{name}");
    }
}

#[test]
fn test_unfinished_copy_leaves_no_rows() {
    for (name, store, _dir) in backends() {
        let mut conn = store.copy_connection().unwrap();
        let mut chunk = CopyChunk::with_capacity(10);
        for row in sample_rows(RunId(11), 10) {
            chunk.push_row(&row);
        }
        conn.write_chunk(&chunk).unwrap();
        drop(conn);
        assert_eq!(store.count_rows(RunId(11)).unwrap(), 0, "{name}");
    }
}

#[test]
fn test_index_management_is_idempotent() {
    for (name, store, _dir) in backends() {
        let dropped = store.drop_secondary_indexes().unwrap();
        assert_eq!(dropped.len(), 4, "{name}");
        assert!(store.drop_secondary_indexes().unwrap().is_empty(), "{name}");
        store.create_secondary_indexes().unwrap();
        store.create_secondary_indexes().unwrap();
        assert_eq!(store.drop_secondary_indexes().unwrap().len(), 4, "{name}");
        store.create_secondary_indexes().unwrap();
    }
}

#[test]
fn test_recent_runs_newest_first() {
    for (name, store, _dir) in backends() {
        let ids: Vec<RunId> = (0..5)
            .map(|i| {
                store
                    .create(&RunRequest::new(10 * (i + 1), Method::RawSql), 25)
                    .unwrap()
                    .id
            })
            .collect();
        let recent: Vec<RunId> = store.recent(3).unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(recent, vec![ids[4], ids[3], ids[2]], "{name}");
    }
}
