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

//! Synthetic dataset generation.
//!
//! A dataset is a CSV file whose header is the column catalog in a per-run
//! shuffled order, followed by exactly `row_count` data rows. Only a random
//! subset of the date columns carries data; the others are left empty.
//!
//! Small datasets are written row by row ([`GenerationMode::Direct`]). Large
//! ones ([`GenerationMode::Duplicated`]) start from a base of
//! `ceil(row_count / 2^passes)` fresh rows and then, pass after pass, append
//! a perturbed copy of everything written so far. Each pass copies at most
//! the rows still missing, so the final file holds the exact target.

use crate::error::{CsvError, Result};
use crate::pools::{perturb, ValuePools};
use bulkload_core::{Column, DATE_COLUMNS};
use csv::StringRecord;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Row count at which duplication mode takes over.
pub const DEFAULT_DUPLICATION_THRESHOLD: u64 = 100_000;

/// Upper bound for the freshly generated base in duplication mode.
pub const DEFAULT_MAX_BASE_ROWS: u64 = 50_000;

/// Rows between two cancellation checks.
pub const DEFAULT_CANCEL_CHECK_INTERVAL: u64 = 10_000;

/// Dataset generation parameters.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Data rows to produce (header excluded).
    pub row_count: u64,
    /// How many of the date columns carry data (at most 3).
    pub date_columns: u8,
    /// Row count at which base+duplication mode is used.
    pub duplication_threshold: u64,
    /// Largest acceptable base in duplication mode.
    pub max_base_rows: u64,
    /// Rows between cancellation checks and progress callbacks.
    pub cancel_check_interval: u64,
    /// RNG seed; `None` draws from entropy.
    pub seed: Option<u64>,
    /// Directory for the temp file; `None` uses the system temp dir.
    pub output_dir: Option<PathBuf>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            row_count: 1_000,
            date_columns: DATE_COLUMNS.len() as u8,
            duplication_threshold: DEFAULT_DUPLICATION_THRESHOLD,
            max_base_rows: DEFAULT_MAX_BASE_ROWS,
            cancel_check_interval: DEFAULT_CANCEL_CHECK_INTERVAL,
            seed: None,
            output_dir: None,
        }
    }
}

impl GeneratorConfig {
    /// Config for `row_count` rows with defaults elsewhere.
    pub fn new(row_count: u64, date_columns: u8) -> Self {
        Self {
            row_count,
            date_columns,
            ..Default::default()
        }
    }

    /// Rejects values the generator cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.row_count == 0 {
            return Err(CsvError::invalid_config("row_count", "must be at least 1"));
        }
        if usize::from(self.date_columns) > DATE_COLUMNS.len() {
            return Err(CsvError::invalid_config(
                "date_columns",
                format!("at most {} date columns exist", DATE_COLUMNS.len()),
            ));
        }
        if self.max_base_rows == 0 {
            return Err(CsvError::invalid_config("max_base_rows", "must be at least 1"));
        }
        if self.cancel_check_interval == 0 {
            return Err(CsvError::invalid_config(
                "cancel_check_interval",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// The mode this config generates with.
    pub fn mode(&self) -> GenerationMode {
        plan_mode(self.row_count, self.duplication_threshold, self.max_base_rows)
    }
}

/// How a dataset was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    /// Every row generated once.
    Direct,
    /// Base generated, then doubled `passes` times with truncation.
    Duplicated {
        /// Freshly generated rows.
        base_rows: u64,
        /// Doubling passes.
        passes: u32,
    },
}

/// Chooses the generation mode for a target row count.
///
/// `passes` is the smallest count for which `ceil(target / 2^passes)` fits in
/// `max_base`, so the base is a power-of-two divisor of the target rounded up.
pub fn plan_mode(target: u64, threshold: u64, max_base: u64) -> GenerationMode {
    if target < threshold || max_base == 0 {
        return GenerationMode::Direct;
    }
    let mut passes = 0u32;
    while passes < 63 && target.div_ceil(1u64 << passes) > max_base {
        passes += 1;
    }
    if passes == 0 {
        return GenerationMode::Direct;
    }
    GenerationMode::Duplicated {
        base_rows: target.div_ceil(1u64 << passes),
        passes,
    }
}

/// A generated dataset backed by a temp file, removed on drop.
#[derive(Debug)]
pub struct GeneratedDataset {
    file: NamedTempFile,
    /// Data rows in the file.
    pub rows: u64,
    /// Header order.
    pub header: Vec<Column>,
    /// Date columns that carry data.
    pub populated_dates: Vec<Column>,
    /// Mode used.
    pub mode: GenerationMode,
    /// Wall-clock generation time.
    pub elapsed: Duration,
}

impl GeneratedDataset {
    /// Location of the file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// A fresh read handle positioned at the start of the file.
    pub fn open(&self) -> Result<File> {
        Ok(self.file.reopen()?)
    }

    /// Generation time in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX)
    }

    /// Keeps the file at `path` instead of deleting it on drop.
    pub fn persist(self, path: impl AsRef<Path>) -> Result<File> {
        self.file.persist(path).map_err(|e| CsvError::Io(e.error))
    }
}

/// Writes synthetic datasets.
#[derive(Debug, Clone)]
pub struct DatasetGenerator {
    config: GeneratorConfig,
}

impl DatasetGenerator {
    /// Validates the config and builds a generator.
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The generator's config.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generates the dataset.
    ///
    /// Returns [`CsvError::Cancelled`] if `cancel` fires; the partial file is
    /// deleted.
    pub fn generate(&self, cancel: &CancellationToken) -> Result<GeneratedDataset> {
        self.generate_with_progress(cancel, |_| {})
    }

    /// Generates the dataset, calling `on_progress` with the rows written so
    /// far at every cancellation check.
    pub fn generate_with_progress<F>(
        &self,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<GeneratedDataset>
    where
        F: FnMut(u64),
    {
        let started = Instant::now();
        let cfg = &self.config;
        let mut rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut header = Column::ALL.to_vec();
        header.shuffle(&mut rng);
        let populated_dates: Vec<Column> = DATE_COLUMNS
            .choose_multiple(&mut rng, usize::from(cfg.date_columns))
            .copied()
            .collect();
        let pools = ValuePools::new(&mut rng);
        let mode = cfg.mode();

        let mut builder = tempfile::Builder::new();
        builder.prefix("bulkload-").suffix(".csv");
        let file = match &cfg.output_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        info!(
            rows = cfg.row_count,
            date_columns = populated_dates.len(),
            ?mode,
            path = %file.path().display(),
            "generating dataset"
        );

        let mut writer = csv::Writer::from_writer(file.reopen()?);
        writer.write_record(header.iter().map(Column::name))?;

        let mut sink = RowSink {
            writer: &mut writer,
            cancel,
            interval: cfg.cancel_check_interval,
            written: 0,
            on_progress: &mut on_progress,
        };

        let fresh_rows = match mode {
            GenerationMode::Direct => cfg.row_count,
            GenerationMode::Duplicated { base_rows, .. } => base_rows,
        };
        let mut record = StringRecord::with_capacity(512, header.len());
        for _ in 0..fresh_rows {
            record.clear();
            for column in &header {
                if !column.is_date() {
                    record.push_field(&pools.text_cell(*column, &mut rng));
                } else if populated_dates.contains(column) {
                    record.push_field(&pools.date_cell(&mut rng));
                } else {
                    record.push_field("");
                }
            }
            sink.write(&record)?;
        }

        if let GenerationMode::Duplicated { passes, .. } = mode {
            for pass in 1..=passes {
                sink.writer.flush()?;
                let missing = cfg.row_count - sink.written;
                let to_copy = sink.written.min(missing);
                debug!(pass, to_copy, "duplicating rows");
                duplicate_pass(&file, &header, pass, to_copy, &mut sink, &mut rng)?;
            }
        }

        let written = sink.written;
        on_progress(written);
        writer.flush()?;
        drop(writer);

        let elapsed = started.elapsed();
        info!(
            rows = written,
            elapsed_ms = elapsed.as_millis() as u64,
            "dataset generated"
        );
        Ok(GeneratedDataset {
            file,
            rows: written,
            header,
            populated_dates,
            mode,
            elapsed,
        })
    }
}

struct RowSink<'a, W: std::io::Write, F: FnMut(u64)> {
    writer: &'a mut csv::Writer<W>,
    cancel: &'a CancellationToken,
    interval: u64,
    written: u64,
    on_progress: &'a mut F,
}

impl<W: std::io::Write, F: FnMut(u64)> RowSink<'_, W, F> {
    fn write(&mut self, record: &StringRecord) -> Result<()> {
        self.writer.write_record(record)?;
        self.written += 1;
        if self.written % self.interval == 0 {
            if self.cancel.is_cancelled() {
                return Err(CsvError::Cancelled {
                    rows_written: self.written,
                });
            }
            (self.on_progress)(self.written);
        }
        Ok(())
    }
}

/// Appends a perturbed copy of the first `to_copy` data rows.
fn duplicate_pass<W, F>(
    file: &NamedTempFile,
    header: &[Column],
    pass: u32,
    to_copy: u64,
    sink: &mut RowSink<'_, W, F>,
    rng: &mut StdRng,
) -> Result<()>
where
    W: std::io::Write,
    F: FnMut(u64),
{
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(BufReader::new(file.reopen()?));
    let mut source = StringRecord::new();
    let mut copy = StringRecord::with_capacity(512, header.len());

    for _ in 0..to_copy {
        if !reader.read_record(&mut source)? {
            return Err(CsvError::SourceExhausted(sink.written));
        }
        copy.clear();
        for (column, cell) in header.iter().zip(source.iter()) {
            match perturb(*column, cell, pass, rng) {
                Some(changed) => copy.push_field(&changed),
                None => copy.push_field(cell),
            }
        }
        sink.write(&copy)?;
    }
    Ok(())
}
