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

//! Error types for the engine.

use bulkload_core::RunId;
use bulkload_csv::CsvError;
use bulkload_store::StoreError;
use std::time::Duration;
use thiserror::Error;

/// Errors that end a run or reject a request.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The dataset could not be produced.
    #[error("dataset generation failed: {0}")]
    Generation(#[source] CsvError),

    /// A worker's store write failed.
    #[error("write failed: {0}")]
    Write(#[source] StoreError),

    /// The producer could not read the dataset.
    #[error("producer failed: {0}")]
    Producer(#[source] CsvError),

    /// The producer stayed blocked on a full batch queue.
    #[error("producer blocked for {0:?} handing over a batch")]
    SendTimeout(Duration),

    /// The run outlived its deadline.
    #[error("run exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),

    /// The run was cancelled on request.
    #[error("run cancelled")]
    Cancelled,

    /// A pipeline thread or task panicked.
    #[error("pipeline panicked: {0}")]
    Panicked(String),

    /// Per-row failures under a row-tolerant strategy.
    #[error("{failed} of {total} rows failed to insert; first error: {first}")]
    RowFailures {
        /// Rows that failed.
        failed: u64,
        /// Rows attempted.
        total: u64,
        /// First failure message.
        first: String,
    },

    /// The store holds a different number of rows than requested.
    #[error("persisted {actual} rows, expected {expected}")]
    RowCountMismatch {
        /// Requested rows.
        expected: u64,
        /// Rows found.
        actual: u64,
    },

    /// Run repository failure.
    #[error("run repository error: {0}")]
    Repository(#[source] StoreError),

    /// Rejected run request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid engine configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unknown run.
    #[error("run {0} not found")]
    RunNotFound(RunId),

    /// A worker thread could not be started.
    #[error("failed to spawn worker: {0}")]
    Spawn(#[source] std::io::Error),
}

impl EngineError {
    /// Whether the run was stopped by its deadline or an explicit cancel.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::DeadlineExceeded(_) | Self::Cancelled)
    }

    /// Maps a generator error, keeping cancellations distinguishable.
    pub fn from_generation(err: CsvError) -> Self {
        if err.is_cancelled() {
            Self::Cancelled
        } else {
            Self::Generation(err)
        }
    }

    /// Describes a panic payload.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::Panicked(message)
    }
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_kinds() {
        assert!(EngineError::Cancelled.is_cancellation());
        assert!(EngineError::DeadlineExceeded(Duration::from_secs(1)).is_cancellation());
        assert!(!EngineError::Panicked("x".into()).is_cancellation());
    }

    #[test]
    fn test_generator_cancel_maps_to_cancelled() {
        let err = EngineError::from_generation(CsvError::Cancelled { rows_written: 10 });
        assert!(matches!(err, EngineError::Cancelled));
        let err = EngineError::from_generation(CsvError::MissingHeader);
        assert!(matches!(err, EngineError::Generation(_)));
    }

    #[test]
    fn test_panic_payloads() {
        let err = EngineError::from_panic(Box::new("static str"));
        assert_eq!(err.to_string(), "pipeline panicked: static str");
        let err = EngineError::from_panic(Box::new(String::from("owned")));
        assert_eq!(err.to_string(), "pipeline panicked: owned");
        let err = EngineError::from_panic(Box::new(42u8));
        assert_eq!(err.to_string(), "pipeline panicked: unknown panic payload");
    }
}
