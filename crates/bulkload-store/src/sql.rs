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

//! SQL text for the row table.
//!
//! The raw-SQL strategies send hand-built multi-row statements of the form
//!
//! ```text
//! INSERT INTO benchmark_rows (run_id, birth_date, ...) VALUES (7, '1988-03-15T00:00:00Z', ...), (...)
//! ```
//!
//! Every cell is a single-quoted literal with `'` doubled, or `NULL`.
//! [`InsertBuilder`] writes that shape and [`parse_insert`] reads it back
//! for backends without a SQL engine.

use crate::error::{Result, StoreError};
use bulkload_core::{Column, Row};
use std::fmt::Write;

/// Row table name.
pub const ROWS_TABLE: &str = "benchmark_rows";

/// Run table name.
pub const RUNS_TABLE: &str = "benchmark_runs";

/// A secondary index on the row table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexDef {
    /// Index name.
    pub name: &'static str,
    /// Indexed column list.
    pub columns: &'static str,
}

impl IndexDef {
    /// Idempotent creation statement.
    pub fn create_sql(&self) -> String {
        format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
            self.name, ROWS_TABLE, self.columns
        )
    }

    /// Idempotent drop statement.
    pub fn drop_sql(&self) -> String {
        format!("DROP INDEX IF EXISTS {}", self.name)
    }
}

/// Indexes dropped around large index-managed loads.
///
/// The `run_id` index is not among them; it backs counting and deletion.
pub const SECONDARY_INDEXES: [IndexDef; 4] = [
    IndexDef {
        name: "idx_benchmark_rows_last_name",
        columns: "last_name",
    },
    IndexDef {
        name: "idx_benchmark_rows_email",
        columns: "email",
    },
    IndexDef {
        name: "idx_benchmark_rows_hire_date",
        columns: "hire_date",
    },
    IndexDef {
        name: "idx_benchmark_rows_employer_department",
        columns: "employer, department",
    },
];

/// `run_id` followed by the catalog in canonical order.
pub fn insert_columns() -> String {
    let mut out = String::from("run_id");
    for column in Column::ALL {
        out.push_str(", ");
        out.push_str(column.name());
    }
    out
}

/// Appends a quoted literal or `NULL`.
pub fn push_literal(buf: &mut String, value: Option<&str>) {
    let Some(value) = value else {
        buf.push_str("NULL");
        return;
    };
    buf.reserve(value.len() + 2);
    buf.push('\'');
    for ch in value.chars() {
        if ch == '\'' {
            buf.push('\'');
        }
        buf.push(ch);
    }
    buf.push('\'');
}

/// Reusable multi-row `INSERT` buffer.
#[derive(Debug, Clone)]
pub struct InsertBuilder {
    sql: String,
    prefix_len: usize,
    rows: usize,
}

impl InsertBuilder {
    /// Empty statement sized for about `rows` rows.
    pub fn with_capacity(rows: usize) -> Self {
        let mut sql = String::with_capacity(256 + rows * 320);
        let _ = write!(sql, "INSERT INTO {} ({}) VALUES ", ROWS_TABLE, insert_columns());
        Self {
            prefix_len: sql.len(),
            sql,
            rows: 0,
        }
    }

    /// Appends one row tuple.
    pub fn push_row(&mut self, row: &Row) {
        if self.rows > 0 {
            self.sql.push_str(", ");
        }
        let _ = write!(self.sql, "({}", row.run_id.0);
        for column in Column::ALL {
            self.sql.push_str(", ");
            push_literal(&mut self.sql, row.value(column).as_deref());
        }
        self.sql.push(')');
        self.rows += 1;
    }

    /// Row tuples in the statement.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Whether no tuple has been added.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Statement text. Only valid when not empty.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Drops every tuple, keeping the prefix and the allocation.
    pub fn clear(&mut self) {
        self.sql.truncate(self.prefix_len);
        self.rows = 0;
    }
}

/// A parsed multi-row `INSERT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInsert {
    /// Target table.
    pub table: String,
    /// Column list.
    pub columns: Vec<String>,
    /// Tuples, one cell per column.
    pub rows: Vec<Vec<Option<String>>>,
}

/// Parses `INSERT INTO t (a, b) VALUES (..), (..)` with literal values.
pub fn parse_insert(sql: &str) -> Result<ParsedInsert> {
    let mut cur = Cursor { src: sql, pos: 0 };
    cur.keyword("INSERT")?;
    cur.keyword("INTO")?;
    let table = cur.ident()?.to_owned();

    cur.expect('(')?;
    let mut columns = vec![cur.ident()?.to_owned()];
    while cur.eat(',') {
        columns.push(cur.ident()?.to_owned());
    }
    cur.expect(')')?;
    cur.keyword("VALUES")?;

    let mut rows = Vec::new();
    loop {
        cur.expect('(')?;
        let mut tuple = Vec::with_capacity(columns.len());
        tuple.push(cur.literal()?);
        while cur.eat(',') {
            tuple.push(cur.literal()?);
        }
        cur.expect(')')?;
        if tuple.len() != columns.len() {
            return Err(cur.error(&format!(
                "tuple has {} values for {} columns",
                tuple.len(),
                columns.len()
            )));
        }
        rows.push(tuple);
        if !cur.eat(',') {
            break;
        }
    }
    cur.eat(';');
    cur.skip_ws();
    if cur.pos != sql.len() {
        return Err(cur.error("trailing input"));
    }
    Ok(ParsedInsert {
        table,
        columns,
        rows,
    })
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn error(&self, what: &str) -> StoreError {
        StoreError::UnsupportedSql(format!("{what} at byte {}", self.pos))
    }

    fn eat(&mut self, ch: char) -> bool {
        self.skip_ws();
        if self.rest().starts_with(ch) {
            self.pos += ch.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, ch: char) -> Result<()> {
        if self.eat(ch) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{ch}'")))
        }
    }

    fn word(&mut self) -> &'a str {
        self.skip_ws();
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
            .unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn keyword(&mut self, kw: &str) -> Result<()> {
        let start = self.pos;
        if self.word().eq_ignore_ascii_case(kw) {
            Ok(())
        } else {
            self.pos = start;
            Err(self.error(&format!("expected {kw}")))
        }
    }

    fn ident(&mut self) -> Result<&'a str> {
        let word = self.word();
        if word.is_empty() {
            Err(self.error("expected identifier"))
        } else {
            Ok(word)
        }
    }

    fn literal(&mut self) -> Result<Option<String>> {
        self.skip_ws();
        if !self.rest().starts_with('\'') {
            let word = self.word();
            return match word {
                "" => Err(self.error("expected literal")),
                w if w.eq_ignore_ascii_case("NULL") => Ok(None),
                w if w.parse::<f64>().is_ok() => Ok(Some(w.to_owned())),
                _ => Err(self.error("unsupported literal")),
            };
        }

        self.pos += 1;
        let mut out = String::new();
        loop {
            let rest = self.rest();
            let Some(quote) = rest.find('\'') else {
                return Err(self.error("unterminated string"));
            };
            out.push_str(&rest[..quote]);
            self.pos += quote + 1;
            if self.rest().starts_with('\'') {
                out.push('\'');
                self.pos += 1;
            } else {
                return Ok(Some(out));
            }
        }
    }
}
