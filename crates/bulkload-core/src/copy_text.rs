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

//! COPY text format.
//!
//! The bulk-copy path streams rows as PostgreSQL-style `COPY ... FROM STDIN`
//! text: one line per row, tab-separated, `\N` for null, with backslash
//! escapes for tab, newline, carriage return and backslash. The first field
//! is the run id, followed by [`Column::ALL`] in canonical order.

use crate::error::{CoreError, Result};
use crate::model::RunId;
use crate::row::{Column, Row, COLUMN_COUNT};

/// Null marker.
pub const NULL_MARKER: &str = "\\N";

/// A block of encoded rows, the unit handed to a copy connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyChunk {
    data: String,
    rows: usize,
}

impl CopyChunk {
    /// Empty chunk with room for roughly `rows` rows.
    pub fn with_capacity(rows: usize) -> Self {
        Self {
            data: String::with_capacity(rows * 256),
            rows: 0,
        }
    }

    /// Encoded rows in this chunk.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Whether no row has been added.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Raw COPY text.
    pub fn as_str(&self) -> &str {
        &self.data
    }

    /// Appends a typed row.
    pub fn push_row(&mut self, row: &Row) {
        self.begin_record(row.run_id);
        for column in Column::ALL {
            self.data.push('\t');
            push_field(&mut self.data, row.value(column).as_deref());
        }
        self.end_record();
    }

    /// Appends a row given as canonical-order cell values.
    ///
    /// `cells` must yield exactly [`COLUMN_COUNT`] entries.
    pub fn push_cells<'a, I>(&mut self, run_id: RunId, cells: I)
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        self.begin_record(run_id);
        let mut count = 0;
        for cell in cells {
            self.data.push('\t');
            push_field(&mut self.data, cell);
            count += 1;
        }
        debug_assert_eq!(count, COLUMN_COUNT);
        self.end_record();
    }

    /// Decodes every line back into rows.
    pub fn decode(&self) -> Result<Vec<Row>> {
        self.data.lines().map(decode_line).collect()
    }

    /// Empties the chunk, keeping its allocation.
    pub fn clear(&mut self) {
        self.data.clear();
        self.rows = 0;
    }

    fn begin_record(&mut self, run_id: RunId) {
        use std::fmt::Write;
        // Writing into a String cannot fail.
        let _ = write!(self.data, "{}", run_id.0);
    }

    fn end_record(&mut self) {
        self.data.push('\n');
        self.rows += 1;
    }
}

/// Appends one escaped field (or the null marker).
pub fn push_field(buf: &mut String, value: Option<&str>) {
    let Some(value) = value else {
        buf.push_str(NULL_MARKER);
        return;
    };
    for ch in value.chars() {
        match ch {
            '\\' => buf.push_str("\\\\"),
            '\t' => buf.push_str("\\t"),
            '\n' => buf.push_str("\\n"),
            '\r' => buf.push_str("\\r"),
            c => buf.push(c),
        }
    }
}

fn unescape(field: &str) -> Result<Option<String>> {
    if field == NULL_MARKER {
        return Ok(None);
    }
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            other => {
                return Err(CoreError::CopyFormat(format!(
                    "bad escape sequence '\\{}'",
                    other.map(String::from).unwrap_or_default()
                )))
            }
        }
    }
    Ok(Some(out))
}

/// Splits one COPY line into its run id and canonical-order cells.
pub fn decode_fields(line: &str) -> Result<(RunId, Vec<Option<String>>)> {
    let mut fields = line.split('\t');
    let run_id = fields
        .next()
        .and_then(|f| f.parse::<u64>().ok())
        .ok_or_else(|| CoreError::CopyFormat(format!("missing run id in '{line}'")))?;
    let cells = fields.map(unescape).collect::<Result<Vec<_>>>()?;
    if cells.len() != COLUMN_COUNT {
        return Err(CoreError::CopyFormat(format!(
            "expected {} fields after run id, found {}",
            COLUMN_COUNT,
            cells.len()
        )));
    }
    Ok((RunId(run_id), cells))
}

/// Decodes one COPY line into a row.
pub fn decode_line(line: &str) -> Result<Row> {
    let (run_id, cells) = decode_fields(line)?;
    let mut row = Row::new(run_id);
    for (column, cell) in Column::ALL.into_iter().zip(cells) {
        if let Some(value) = cell {
            (column.setter())(&mut row, &value)
                .map_err(|e| CoreError::CopyFormat(format!("{column}: {e}")))?;
        }
    }
    Ok(row)
}
