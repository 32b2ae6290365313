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

//! Error types for dataset generation and parsing.

use thiserror::Error;

/// Errors raised by the generator and the row reader.
///
/// # Examples
///
/// ```
/// use bulkload_csv::CsvError;
///
/// let err = CsvError::Cancelled { rows_written: 10_000 };
/// assert_eq!(err.to_string(), "generation cancelled after 10000 rows");
/// assert!(err.is_cancelled());
/// ```
#[derive(Debug, Error)]
pub enum CsvError {
    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Fatal CSV reader or writer failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Cancellation observed at a row boundary.
    #[error("generation cancelled after {rows_written} rows")]
    Cancelled {
        /// Rows on disk when the signal was seen.
        rows_written: u64,
    },

    /// Invalid generator or reader configuration.
    #[error("invalid configuration for '{parameter}': {reason}")]
    InvalidConfig {
        /// Offending parameter.
        parameter: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The input has no header row.
    #[error("dataset has no header row")]
    MissingHeader,

    /// Duplication read fewer source rows than were written.
    #[error("duplication source exhausted at row {0}")]
    SourceExhausted(u64),
}

impl CsvError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error reports a cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Result type for this crate.
pub type Result<T> = std::result::Result<T, CsvError>;
