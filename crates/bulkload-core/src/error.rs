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

//! Error types for the core data model and date normalization.

use crate::model::RunStatus;
use thiserror::Error;

/// Errors raised by the data model.
///
/// # Examples
///
/// ```
/// use bulkload_core::{CoreError, RunStatus};
///
/// let err = CoreError::InvalidTransition {
///     from: RunStatus::Completed,
///     to: RunStatus::Failed,
/// };
/// assert_eq!(err.to_string(), "invalid status transition: completed -> failed");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A run status change that would break monotonicity.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: RunStatus,
        /// Requested status.
        to: RunStatus,
    },

    /// Unrecognized insertion method name.
    #[error("unknown insertion method: '{0}'")]
    UnknownMethod(String),

    /// Unrecognized run status name.
    #[error("unknown run status: '{0}'")]
    UnknownStatus(String),

    /// Malformed COPY text line.
    #[error("malformed copy line: {0}")]
    CopyFormat(String),
}

/// Errors raised when date text cannot be normalized.
///
/// Empty input is never an error; see [`crate::date::validate`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    /// Text matched none of the accepted date shapes.
    #[error("unrecognized date: '{0}'")]
    Unrecognized(String),

    /// Unix epoch value outside 1970-01-01..2100-01-01.
    #[error("epoch value {0} outside 1970..2100")]
    EpochOutOfRange(i64),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
