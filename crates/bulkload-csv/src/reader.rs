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

//! Streaming row parser.
//!
//! [`RowReader`] reads the header once and resolves every position to a
//! [`FieldSetter`]. The hot loop then only indexes into that table. Empty
//! cells are skipped, unknown columns are ignored, and date cells go through
//! the normalizer. An unparseable date leaves its field null and is counted
//! in the [`ParseReport`]; a malformed record is counted and skipped. Only
//! I/O failures stop the reader.

use crate::error::{CsvError, Result};
use bulkload_core::{date, Column, CopyChunk, FieldSetter, Row, RunId, COLUMN_COUNT, NOOP_SETTER};
use csv::StringRecord;
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, warn};

/// Invalid date samples kept per report.
pub const DEFAULT_MAX_SAMPLES: usize = 10;

/// Reader options.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Field delimiter (default: `,`).
    pub delimiter: u8,
    /// Trim surrounding whitespace from cells (default: `true`).
    pub trim: bool,
    /// Invalid date samples to retain (default: 10).
    pub max_samples: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            trim: true,
            max_samples: DEFAULT_MAX_SAMPLES,
        }
    }
}

/// One rejected date cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidSample {
    /// 1-based line in the input.
    pub line: u64,
    /// Column the cell belongs to.
    pub column: Column,
    /// Original text.
    pub raw: String,
}

/// Non-fatal parse outcomes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    /// Rows produced.
    pub rows: u64,
    /// Records skipped as malformed.
    pub bad_records: u64,
    /// Date cells dropped to null.
    pub invalid_dates: u64,
    /// First rejected date cells.
    pub samples: Vec<InvalidSample>,
}

impl ParseReport {
    /// Whether anything was dropped or skipped.
    pub fn is_clean(&self) -> bool {
        self.bad_records == 0 && self.invalid_dates == 0
    }

    /// Logs the report once; samples go out at `warn`.
    pub fn log_summary(&self, run_id: RunId) {
        if self.is_clean() {
            debug!(%run_id, rows = self.rows, "parse finished cleanly");
            return;
        }
        warn!(
            %run_id,
            rows = self.rows,
            bad_records = self.bad_records,
            invalid_dates = self.invalid_dates,
            "parse dropped data"
        );
        for sample in &self.samples {
            warn!(
                %run_id,
                line = sample.line,
                column = %sample.column,
                raw = %sample.raw,
                "unparseable date"
            );
        }
    }

    fn reject_date(&mut self, max_samples: usize, line: u64, column: Column, raw: &str) {
        self.invalid_dates += 1;
        if self.samples.len() < max_samples {
            self.samples.push(InvalidSample {
                line,
                column,
                raw: raw.to_owned(),
            });
        }
    }
}

/// Streams typed rows out of a dataset.
pub struct RowReader<R: Read> {
    reader: csv::Reader<R>,
    record: StringRecord,
    setters: Vec<FieldSetter>,
    columns: Vec<Option<Column>>,
    run_id: RunId,
    max_samples: usize,
    report: ParseReport,
}

impl RowReader<BufReader<File>> {
    /// Opens a dataset file.
    pub fn open(path: impl AsRef<Path>, run_id: RunId, config: &ReaderConfig) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file), run_id, config)
    }
}

impl<R: Read> RowReader<R> {
    /// Reads the header and builds the dispatch table.
    pub fn new(input: R, run_id: RunId, config: &ReaderConfig) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(config.delimiter)
            .has_headers(true)
            .trim(if config.trim {
                csv::Trim::All
            } else {
                csv::Trim::None
            })
            .from_reader(input);

        let headers = reader.headers()?;
        if headers.is_empty() || headers.iter().all(str::is_empty) {
            return Err(CsvError::MissingHeader);
        }
        let columns: Vec<Option<Column>> = headers.iter().map(Column::from_name).collect();
        let setters = columns
            .iter()
            .map(|c| c.map_or(NOOP_SETTER, |c| c.setter()))
            .collect();
        let unknown = columns.iter().filter(|c| c.is_none()).count();
        if unknown > 0 {
            debug!(%run_id, unknown, "ignoring unknown columns");
        }

        Ok(Self {
            reader,
            record: StringRecord::with_capacity(512, COLUMN_COUNT),
            setters,
            columns,
            run_id,
            max_samples: config.max_samples,
            report: ParseReport::default(),
        })
    }

    /// Header positions resolved to catalog columns.
    pub fn columns(&self) -> &[Option<Column>] {
        &self.columns
    }

    /// Counts so far.
    pub fn report(&self) -> &ParseReport {
        &self.report
    }

    /// Consumes the reader, returning its report.
    pub fn into_report(self) -> ParseReport {
        self.report
    }

    /// Next typed row, or `None` at end of input.
    pub fn next_row(&mut self) -> Result<Option<Row>> {
        if !self.advance()? {
            return Ok(None);
        }
        let line = self.line();
        let mut row = Row::new(self.run_id);
        for ((cell, setter), column) in self
            .record
            .iter()
            .zip(&self.setters)
            .zip(&self.columns)
        {
            if cell.is_empty() {
                continue;
            }
            if setter(&mut row, cell).is_err() {
                if let Some(column) = column {
                    self.report.reject_date(self.max_samples, line, *column, cell);
                }
            }
        }
        self.report.rows += 1;
        Ok(Some(row))
    }

    /// Appends up to `max` rows to `batch`; returns how many were added.
    pub fn fill_batch(&mut self, batch: &mut Vec<Row>, max: usize) -> Result<usize> {
        let mut added = 0;
        while added < max {
            match self.next_row()? {
                Some(row) => {
                    batch.push(row);
                    added += 1;
                }
                None => break,
            }
        }
        Ok(added)
    }

    /// Encodes up to `max` rows straight into COPY text.
    ///
    /// No [`Row`] is built: text cells are borrowed from the record and only
    /// date cells allocate their normalized form.
    pub fn fill_copy_chunk(&mut self, chunk: &mut CopyChunk, max: usize) -> Result<usize> {
        let mut added = 0;
        while added < max {
            if !self.advance()? {
                break;
            }
            let line = self.line();
            let Self {
                record,
                columns,
                report,
                run_id,
                max_samples,
                ..
            } = self;

            let mut cells: [Option<Cow<'_, str>>; COLUMN_COUNT] = std::array::from_fn(|_| None);
            for (cell, column) in record.iter().zip(columns.iter()) {
                let Some(column) = column else { continue };
                if cell.is_empty() {
                    continue;
                }
                if !column.is_date() {
                    cells[column.index()] = Some(Cow::Borrowed(cell));
                    continue;
                }
                match date::validate(cell) {
                    Ok(Some(d)) => cells[column.index()] = Some(Cow::Owned(d.to_rfc3339())),
                    Ok(None) => {}
                    Err(_) => report.reject_date(*max_samples, line, *column, cell),
                }
            }
            chunk.push_cells(*run_id, cells.iter().map(|c| c.as_deref()));
            report.rows += 1;
            added += 1;
        }
        Ok(added)
    }

    /// Reads the next well-formed record into `self.record`.
    fn advance(&mut self) -> Result<bool> {
        loop {
            match self.reader.read_record(&mut self.record) {
                Ok(more) => return Ok(more),
                Err(e) if e.is_io_error() => return Err(CsvError::Csv(e)),
                Err(e) => {
                    self.report.bad_records += 1;
                    debug!(run_id = %self.run_id, error = %e, "skipping malformed record");
                }
            }
        }
    }

    fn line(&self) -> u64 {
        self.record.position().map_or(0, |p| p.line())
    }
}
