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

//! Row reader integration tests over generated and hand-written datasets.

use bulkload_core::{Column, CopyChunk, RunId};
use bulkload_csv::{DatasetGenerator, GeneratorConfig, ReaderConfig, RowReader};
use std::io::Write;
use tokio_util::sync::CancellationToken;

fn dataset(rows: u64) -> bulkload_csv::GeneratedDataset {
    let config = GeneratorConfig {
        seed: Some(42),
        ..GeneratorConfig::new(rows, 3)
    };
    DatasetGenerator::new(config)
        .unwrap()
        .generate(&CancellationToken::new())
        .unwrap()
}

#[test]
fn test_batches_cover_every_generated_row() {
    let data = dataset(2_500);
    let mut reader = RowReader::open(data.path(), RunId(5), &ReaderConfig::default()).unwrap();
    let mut sizes = Vec::new();
    let mut batch = Vec::with_capacity(1_000);
    loop {
        batch.clear();
        let n = reader.fill_batch(&mut batch, 1_000).unwrap();
        if n == 0 {
            break;
        }
        assert!(batch.iter().all(|r| r.run_id == RunId(5)));
        sizes.push(n);
    }
    assert_eq!(sizes, vec![1_000, 1_000, 500]);
    assert_eq!(reader.report().rows, 2_500);
    assert!(reader.report().is_clean());
}

#[test]
fn test_copy_path_matches_row_path() {
    let data = dataset(300);
    let config = ReaderConfig::default();

    let mut typed = RowReader::open(data.path(), RunId(8), &config).unwrap();
    let mut rows = Vec::new();
    typed.fill_batch(&mut rows, 1_000).unwrap();

    let mut inline = RowReader::open(data.path(), RunId(8), &config).unwrap();
    let mut chunk = CopyChunk::with_capacity(300);
    assert_eq!(inline.fill_copy_chunk(&mut chunk, 1_000).unwrap(), 300);
    assert_eq!(chunk.decode().unwrap(), rows);
}

#[test]
fn test_every_date_cell_is_empty_or_normalized() {
    let data = dataset(1_000);
    let mut raw = csv::Reader::from_path(data.path()).unwrap();
    let headers = raw.headers().unwrap().clone();
    for record in raw.records() {
        let record = record.unwrap();
        for (name, cell) in headers.iter().zip(record.iter()) {
            let column = Column::from_name(name).unwrap();
            if column.is_date() && !cell.is_empty() {
                let normalized = bulkload_core::normalize(cell).unwrap().unwrap();
                assert!(chrono::DateTime::parse_from_rfc3339(&normalized).is_ok());
            }
        }
    }
}

#[test]
fn test_invalid_dates_sampled_up_to_limit() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "hire_date,city").unwrap();
    for i in 0..25 {
        writeln!(file, "someday-{i},Haarlem").unwrap();
    }
    file.flush().unwrap();

    let config = ReaderConfig {
        max_samples: 4,
        ..Default::default()
    };
    let mut reader = RowReader::open(file.path(), RunId(1), &config).unwrap();
    let mut rows = Vec::new();
    reader.fill_batch(&mut rows, 100).unwrap();
    assert_eq!(rows.len(), 25);
    assert!(rows.iter().all(|r| r.hire_date.is_none() && r.city.is_some()));

    let report = reader.into_report();
    assert_eq!(report.invalid_dates, 25);
    assert_eq!(report.samples.len(), 4);
    assert_eq!(report.samples[0].raw, "someday-0");
    assert_eq!(report.samples[3].line, 5);
}

#[test]
fn test_semicolon_delimiter() {
    let input = "first_name;birth_date\nGrace;1906-12-09\n";
    let config = ReaderConfig {
        delimiter: b';',
        ..Default::default()
    };
    let mut reader = RowReader::new(input.as_bytes(), RunId(2), &config).unwrap();
    let row = reader.next_row().unwrap().unwrap();
    assert_eq!(row.first_name.as_deref(), Some("Grace"));
    assert_eq!(
        row.value(Column::BirthDate).as_deref(),
        Some("1906-12-09T00:00:00Z")
    );
}
