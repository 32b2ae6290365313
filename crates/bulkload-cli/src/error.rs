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

//! Structured error types for the CLI.

use bulkload_core::RunId;
use bulkload_csv::CsvError;
use bulkload_engine::EngineError;
use bulkload_store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors a command can end with.
#[derive(Error, Debug)]
pub enum CliError {
    /// Engine or configuration failure.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Database failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Dataset generation failure.
    #[error(transparent)]
    Dataset(#[from] CsvError),

    /// The benchmark ran and failed.
    #[error("run {id} failed: {message}")]
    RunFailed {
        /// Failed run.
        id: RunId,
        /// Stored error message.
        message: String,
    },

    /// Some `date` arguments did not normalize.
    #[error("{0} of the given dates could not be normalized")]
    InvalidDates(usize),

    /// File system failure outside the stores.
    #[error("I/O error for '{path}': {message}")]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// The async runtime could not start.
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// JSON output failed.
    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// I/O error with its path.
    pub fn io_error(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// Result alias for commands.
pub type Result<T> = std::result::Result<T, CliError>;
