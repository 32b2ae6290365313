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

//! Core types for the bulkload benchmark engine.
//!
//! This crate holds everything the generator, the parser, the stores and the
//! engine agree on:
//!
//! - **[`date`]**: the date normalizer (heterogeneous text to UTC RFC 3339)
//! - **[`model`]**: benchmark run records, methods and statuses
//! - **[`row`]**: the fixed column catalog and the typed [`Row`]
//! - **[`copy_text`]**: the COPY text codec used by the bulk-copy path
//!
//! # Examples
//!
//! ```
//! use bulkload_core::{Column, Row, RunId};
//!
//! let mut row = Row::new(RunId(1));
//! (Column::BirthDate.setter())(&mut row, "15.03.1988").unwrap();
//! assert_eq!(row.value(Column::BirthDate).as_deref(), Some("1988-03-15T00:00:00Z"));
//! ```

#![deny(missing_docs)]

pub mod copy_text;
pub mod date;
mod error;
pub mod model;
pub mod row;

pub use copy_text::CopyChunk;
pub use date::{normalize, validate, DateShape, NormalizedDate};
pub use error::{CoreError, DateError, Result};
pub use model::{BenchmarkRun, Method, PhaseTimings, RunId, RunRequest, RunStatus};
pub use row::{Column, FieldSetter, Row, COLUMN_COUNT, DATE_COLUMNS, NOOP_SETTER};
