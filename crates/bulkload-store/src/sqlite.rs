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

//! SQLite backend.
//!
//! A small pool of connections serves row writes and run records. Writers
//! start `IMMEDIATE` transactions and rely on the busy timeout to queue
//! behind each other. Copy sessions open their own connection, stage rows
//! in a per-connection `TEMP` table, and move them into the row table in a
//! single transaction on finish.

use crate::error::{Result, StoreError};
use crate::sql::{insert_columns, ROWS_TABLE, RUNS_TABLE, SECONDARY_INDEXES};
use crate::traits::{CopyConnection, CopyProvider, RowStore, RunRepository};
use bulkload_core::copy_text::decode_fields;
use bulkload_core::{
    BenchmarkRun, Column, CopyChunk, Row, RunId, RunRequest, RunStatus, COLUMN_COUNT,
};
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Statement, TransactionBehavior};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// Default busy timeout (ms).
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 30_000;

/// Default pooled connections.
pub const DEFAULT_POOL_SIZE: usize = 4;

/// `journal_mode` pragma values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JournalMode {
    /// Write-ahead log.
    #[default]
    Wal,
    /// Rollback journal, deleted after each transaction.
    Delete,
    /// Journal in memory.
    Memory,
}

impl JournalMode {
    /// Pragma value.
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
            Self::Memory => "memory",
        }
    }
}

/// `synchronous` pragma values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Sync on every commit.
    Full,
    /// Sync at WAL checkpoints.
    #[default]
    Normal,
    /// Leave syncing to the OS.
    Off,
}

impl SyncMode {
    /// Pragma value.
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
            Self::Off => "off",
        }
    }
}

/// SQLite store settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteConfig {
    /// Database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Journal mode.
    #[serde(default)]
    pub journal_mode: JournalMode,
    /// Sync mode.
    #[serde(default)]
    pub sync_mode: SyncMode,
    /// Pooled connections for row writes and run records.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

const fn default_pool_size() -> usize {
    DEFAULT_POOL_SIZE
}

impl SqliteConfig {
    /// Defaults for a database file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: JournalMode::default(),
            sync_mode: SyncMode::default(),
            pool_size: DEFAULT_POOL_SIZE,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(StoreError::Config("pool_size must be at least 1".into()));
        }
        if self.path.as_os_str().is_empty() || self.path.as_os_str() == ":memory:" {
            return Err(StoreError::Config(
                "path must name a database file shared by every connection".into(),
            ));
        }
        Ok(())
    }
}

fn open_connection(config: &SqliteConfig) -> Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(&config.path, flags)?;
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    let mode: String = conn.query_row(
        &format!("PRAGMA journal_mode = {}", config.journal_mode.pragma_value()),
        [],
        |row| row.get(0),
    )?;
    conn.pragma_update(None, "synchronous", config.sync_mode.pragma_value())?;
    debug!(path = %config.path.display(), journal_mode = %mode, "opened connection");
    Ok(conn)
}

fn row_columns_ddl() -> String {
    Column::ALL
        .iter()
        .map(|c| format!("{} TEXT", c.name()))
        .collect::<Vec<_>>()
        .join(",\n    ")
}

fn initialize_schema(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {RUNS_TABLE} (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    row_count INTEGER NOT NULL,
    column_count INTEGER NOT NULL,
    date_columns INTEGER NOT NULL,
    method TEXT NOT NULL,
    status TEXT NOT NULL,
    generation_ms INTEGER,
    parse_ms INTEGER,
    insert_ms INTEGER,
    total_ms INTEGER,
    error_message TEXT,
    created_at TEXT NOT NULL,
    finished_at TEXT
);
CREATE TABLE IF NOT EXISTS {ROWS_TABLE} (
    id INTEGER PRIMARY KEY,
    run_id INTEGER NOT NULL,
    {}
);
CREATE INDEX IF NOT EXISTS idx_benchmark_rows_run_id ON {ROWS_TABLE} (run_id);",
        row_columns_ddl()
    ))?;
    for index in SECONDARY_INDEXES {
        tx.execute_batch(&index.create_sql())?;
    }
    tx.commit()?;
    Ok(())
}

fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn bind_row(stmt: &mut Statement<'_>, row: &Row) -> rusqlite::Result<()> {
    stmt.raw_bind_parameter(1, to_sql_int(row.run_id.0))?;
    for (i, column) in Column::ALL.into_iter().enumerate() {
        stmt.raw_bind_parameter(i + 2, row.value(column).as_deref())?;
    }
    Ok(())
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn format_time(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_time(column: &'static str, text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|_| StoreError::Corrupt {
            column,
            value: text.to_owned(),
        })
}

/// Store backed by a SQLite database file.
pub struct SqliteStore {
    config: SqliteConfig,
    pool: Vec<Mutex<Connection>>,
    cursor: AtomicUsize,
    insert_sql: String,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.config.path)
            .field("pool_size", &self.pool.len())
            .finish()
    }
}

impl SqliteStore {
    /// Opens the database, creating tables and indexes that are missing.
    pub fn open(config: SqliteConfig) -> Result<Self> {
        config.validate()?;
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Config(format!("{}: {e}", parent.display())))?;
        }

        let mut first = open_connection(&config)?;
        initialize_schema(&mut first)?;
        let mut pool = Vec::with_capacity(config.pool_size);
        pool.push(Mutex::new(first));
        for _ in 1..config.pool_size {
            pool.push(Mutex::new(open_connection(&config)?));
        }

        info!(path = %config.path.display(), pool_size = config.pool_size, "sqlite store ready");
        Ok(Self {
            insert_sql: format!(
                "INSERT INTO {ROWS_TABLE} ({}) VALUES ({})",
                insert_columns(),
                placeholders(COLUMN_COUNT + 1)
            ),
            config,
            pool,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Settings the store was opened with.
    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    /// Names of the secondary indexes currently present.
    pub fn index_names(&self) -> Result<Vec<String>> {
        let conn = self.connection();
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = ?1 ORDER BY name",
        )?;
        let names = stmt
            .query_map([ROWS_TABLE], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names
            .into_iter()
            .filter(|n| SECONDARY_INDEXES.iter().any(|i| i.name == n))
            .collect())
    }

    /// Rows of a run in insertion order.
    pub fn rows_for(&self, run_id: RunId) -> Result<Vec<Row>> {
        let conn = self.connection();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {ROWS_TABLE} WHERE run_id = ?1 ORDER BY id",
            insert_columns()
        ))?;
        let raw = stmt
            .query_map([to_sql_int(run_id.0)], |r| {
                (1..=COLUMN_COUNT)
                    .map(|i| r.get::<_, Option<String>>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw.into_iter()
            .map(|cells| -> Result<Row> {
                let mut row = Row::new(run_id);
                for (column, cell) in Column::ALL.into_iter().zip(cells) {
                    if let Some(value) = cell {
                        (column.setter())(&mut row, &value).map_err(|_| StoreError::Corrupt {
                            column: column.name(),
                            value,
                        })?;
                    }
                }
                Ok(row)
            })
            .collect()
    }

    fn connection(&self) -> MutexGuard<'_, Connection> {
        let start = self.cursor.fetch_add(1, Ordering::Relaxed);
        let len = self.pool.len();
        for i in 0..len {
            if let Some(guard) = self.pool[(start + i) % len].try_lock() {
                return guard;
            }
        }
        self.pool[start % len].lock()
    }
}

impl RowStore for SqliteStore {
    fn insert_row(&self, row: &Row) -> Result<()> {
        let conn = self.connection();
        let mut stmt = conn.prepare_cached(&self.insert_sql)?;
        bind_row(&mut stmt, row)?;
        stmt.raw_execute()?;
        Ok(())
    }

    fn insert_batch(&self, rows: &[Row]) -> Result<()> {
        let mut conn = self.connection();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let mut stmt = tx.prepare_cached(&self.insert_sql)?;
            for row in rows {
                bind_row(&mut stmt, row)?;
                stmt.raw_execute()?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn execute_sql(&self, sql: &str) -> Result<u64> {
        let conn = self.connection();
        Ok(conn.execute(sql, [])? as u64)
    }

    fn drop_secondary_indexes(&self) -> Result<Vec<String>> {
        let present = self.index_names()?;
        let conn = self.connection();
        for index in SECONDARY_INDEXES {
            if present.iter().any(|n| n == index.name) {
                conn.execute_batch(&index.drop_sql())?;
            }
        }
        info!(dropped = present.len(), "dropped secondary indexes");
        Ok(present)
    }

    fn create_secondary_indexes(&self) -> Result<()> {
        let conn = self.connection();
        for index in SECONDARY_INDEXES {
            conn.execute_batch(&index.create_sql())?;
        }
        info!("secondary indexes in place");
        Ok(())
    }

    fn count_rows(&self, run_id: RunId) -> Result<u64> {
        let conn = self.connection();
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {ROWS_TABLE} WHERE run_id = ?1"),
            [to_sql_int(run_id.0)],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    fn delete_rows(&self, run_id: RunId) -> Result<u64> {
        let conn = self.connection();
        let deleted = conn.execute(
            &format!("DELETE FROM {ROWS_TABLE} WHERE run_id = ?1"),
            [to_sql_int(run_id.0)],
        )?;
        Ok(deleted as u64)
    }
}

const RUN_COLUMNS: &str = "id, row_count, column_count, date_columns, method, status, \
     generation_ms, parse_ms, insert_ms, total_ms, error_message, created_at, finished_at";

/// Column values of one `benchmark_runs` row before decoding.
struct RawRun {
    id: i64,
    row_count: i64,
    column_count: i64,
    date_columns: i64,
    method: String,
    status: String,
    durations: [Option<i64>; 4],
    error_message: Option<String>,
    created_at: String,
    finished_at: Option<String>,
}

impl RawRun {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            row_count: row.get(1)?,
            column_count: row.get(2)?,
            date_columns: row.get(3)?,
            method: row.get(4)?,
            status: row.get(5)?,
            durations: [row.get(6)?, row.get(7)?, row.get(8)?, row.get(9)?],
            error_message: row.get(10)?,
            created_at: row.get(11)?,
            finished_at: row.get(12)?,
        })
    }

    fn decode(self) -> Result<BenchmarkRun> {
        let [generation_ms, parse_ms, insert_ms, total_ms] =
            self.durations.map(|d| d.map(|v| v.max(0) as u64));
        Ok(BenchmarkRun {
            id: RunId(self.id.max(0) as u64),
            row_count: self.row_count.max(0) as u64,
            column_count: u32::try_from(self.column_count).unwrap_or_default(),
            date_columns: u8::try_from(self.date_columns).unwrap_or_default(),
            method: self.method.parse()?,
            status: self.status.parse::<RunStatus>()?,
            generation_ms,
            parse_ms,
            insert_ms,
            total_ms,
            error_message: self.error_message,
            created_at: parse_time("created_at", &self.created_at)?,
            finished_at: self
                .finished_at
                .as_deref()
                .map(|t| parse_time("finished_at", t))
                .transpose()?,
        })
    }
}

impl RunRepository for SqliteStore {
    fn create(&self, request: &RunRequest, column_count: u32) -> Result<BenchmarkRun> {
        let mut run = BenchmarkRun::new(RunId(0), request, column_count);
        let conn = self.connection();
        conn.execute(
            &format!(
                "INSERT INTO {RUNS_TABLE} (row_count, column_count, date_columns, method, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
            ),
            params![
                to_sql_int(run.row_count),
                run.column_count,
                run.date_columns,
                run.method.as_str(),
                run.status.as_str(),
                format_time(&run.created_at),
            ],
        )?;
        run.id = RunId(conn.last_insert_rowid().max(0) as u64);
        Ok(run)
    }

    fn update(&self, run: &BenchmarkRun) -> Result<()> {
        let conn = self.connection();
        let changed = conn.execute(
            &format!(
                "UPDATE {RUNS_TABLE} SET status = ?2, generation_ms = ?3, parse_ms = ?4,
                 insert_ms = ?5, total_ms = ?6, error_message = ?7, finished_at = ?8
                 WHERE id = ?1"
            ),
            params![
                to_sql_int(run.id.0),
                run.status.as_str(),
                run.generation_ms.map(to_sql_int),
                run.parse_ms.map(to_sql_int),
                run.insert_ms.map(to_sql_int),
                run.total_ms.map(to_sql_int),
                run.error_message,
                run.finished_at.as_ref().map(format_time),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::RunNotFound(run.id));
        }
        Ok(())
    }

    fn get(&self, id: RunId) -> Result<Option<BenchmarkRun>> {
        let conn = self.connection();
        conn.query_row(
            &format!("SELECT {RUN_COLUMNS} FROM {RUNS_TABLE} WHERE id = ?1"),
            [to_sql_int(id.0)],
            RawRun::from_row,
        )
        .optional()?
        .map(RawRun::decode)
        .transpose()
    }

    fn recent(&self, limit: usize) -> Result<Vec<BenchmarkRun>> {
        let conn = self.connection();
        let mut stmt = conn.prepare(&format!(
            "SELECT {RUN_COLUMNS} FROM {RUNS_TABLE} ORDER BY id DESC LIMIT ?1"
        ))?;
        let raw = stmt
            .query_map([i64::try_from(limit).unwrap_or(i64::MAX)], RawRun::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raw.into_iter().map(RawRun::decode).collect()
    }
}

/// Copy session on its own connection.
struct SqliteCopy {
    conn: Connection,
    stage_sql: String,
    staged: u64,
}

impl SqliteCopy {
    fn open(config: &SqliteConfig) -> Result<Self> {
        let conn = open_connection(config)?;
        conn.execute_batch(&format!(
            "CREATE TEMP TABLE IF NOT EXISTS copy_stage (run_id INTEGER NOT NULL, {});
             DELETE FROM temp.copy_stage;",
            row_columns_ddl()
        ))?;
        Ok(Self {
            conn,
            stage_sql: format!(
                "INSERT INTO temp.copy_stage ({}) VALUES ({})",
                insert_columns(),
                placeholders(COLUMN_COUNT + 1)
            ),
            staged: 0,
        })
    }
}

impl CopyConnection for SqliteCopy {
    fn write_chunk(&mut self, chunk: &CopyChunk) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&self.stage_sql)?;
            for line in chunk.as_str().lines() {
                let (run_id, cells) = decode_fields(line)?;
                stmt.raw_bind_parameter(1, to_sql_int(run_id.0))?;
                for (i, cell) in cells.iter().enumerate() {
                    stmt.raw_bind_parameter(i + 2, cell.as_deref())?;
                }
                stmt.raw_execute()?;
            }
        }
        tx.commit()?;
        self.staged += chunk.rows() as u64;
        Ok(())
    }

    fn staged_rows(&self) -> u64 {
        self.staged
    }

    fn finish(self: Box<Self>) -> Result<u64> {
        let SqliteCopy { mut conn, .. } = *self;
        let columns = insert_columns();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let moved = tx.execute(
            &format!("INSERT INTO {ROWS_TABLE} ({columns}) SELECT {columns} FROM temp.copy_stage"),
            [],
        )?;
        tx.execute_batch("DELETE FROM temp.copy_stage")?;
        tx.commit()?;
        debug!(rows = moved, "copy session committed");
        Ok(moved as u64)
    }
}

impl CopyProvider for SqliteStore {
    fn copy_connection(&self) -> Result<Box<dyn CopyConnection>> {
        Ok(Box::new(SqliteCopy::open(&self.config)?))
    }
}
