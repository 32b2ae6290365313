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

//! Dataset generation and streaming row parsing.
//!
//! - **[`generator`]**: writes a synthetic CSV dataset of any size into a
//!   temp file, switching to base+duplication above a row threshold
//! - **[`reader`]**: streams a dataset back as typed [`bulkload_core::Row`]s
//!   or straight into COPY text, normalizing dates on the way
//!
//! # Examples
//!
//! ```no_run
//! use bulkload_core::RunId;
//! use bulkload_csv::{DatasetGenerator, GeneratorConfig, ReaderConfig, RowReader};
//! use tokio_util::sync::CancellationToken;
//!
//! let generator = DatasetGenerator::new(GeneratorConfig::new(5_000, 2)).unwrap();
//! let dataset = generator.generate(&CancellationToken::new()).unwrap();
//!
//! let mut reader = RowReader::open(dataset.path(), RunId(1), &ReaderConfig::default()).unwrap();
//! let mut batch = Vec::new();
//! while reader.fill_batch(&mut batch, 1_000).unwrap() > 0 {
//!     batch.clear();
//! }
//! assert_eq!(reader.report().rows, 5_000);
//! ```

#![deny(missing_docs)]

mod error;
pub mod generator;
mod pools;
pub mod reader;

pub use error::{CsvError, Result};
pub use generator::{plan_mode, DatasetGenerator, GeneratedDataset, GenerationMode, GeneratorConfig};
pub use reader::{InvalidSample, ParseReport, ReaderConfig, RowReader};
