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

//! Error types for the stores.

use bulkload_core::{CoreError, RunId};
use thiserror::Error;

/// Errors raised by row stores, run repositories and copy connections.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite failure.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Malformed record or COPY payload.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Run record not found.
    #[error("run {0} not found")]
    RunNotFound(RunId),

    /// Statement the store cannot execute.
    #[error("unsupported statement: {0}")]
    UnsupportedSql(String),

    /// Stored value that does not decode.
    #[error("corrupt value in column '{column}': {value}")]
    Corrupt {
        /// Column holding the value.
        column: &'static str,
        /// Offending text.
        value: String,
    },

    /// Invalid store configuration.
    #[error("invalid store configuration: {0}")]
    Config(String),
}

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
