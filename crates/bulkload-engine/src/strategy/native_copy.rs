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

//! Bulk copy, one dedicated session per worker.
//!
//! The producer encodes COPY text straight from the dataset, so no typed
//! row exists on this path. Each worker stages its chunks in its own
//! session and commits once the queue closes; an aborted run drops the
//! sessions uncommitted.

use super::{Batch, BatchWriter, InsertStrategy, PayloadKind, WriteOutcome};
use crate::config::StrategySettings;
use crate::error::{EngineError, Result};
use bulkload_core::Method;
use bulkload_store::{BenchmarkStore, CopyConnection};
use std::sync::Arc;
use tracing::debug;

/// `native_copy`.
#[derive(Debug, Clone)]
pub struct NativeCopyStrategy {
    settings: StrategySettings,
}

impl NativeCopyStrategy {
    /// Strategy with the given settings.
    pub fn new(settings: StrategySettings) -> Self {
        Self { settings }
    }
}

impl InsertStrategy for NativeCopyStrategy {
    fn method(&self) -> Method {
        Method::NativeCopy
    }

    fn settings(&self) -> StrategySettings {
        self.settings
    }

    fn payload(&self) -> PayloadKind {
        PayloadKind::Copy
    }

    fn open_writer(&self, store: &Arc<dyn BenchmarkStore>) -> Result<Box<dyn BatchWriter>> {
        let session = store.copy_connection().map_err(EngineError::Write)?;
        Ok(Box::new(CopyWriter { session }))
    }
}

struct CopyWriter {
    session: Box<dyn CopyConnection>,
}

impl BatchWriter for CopyWriter {
    fn write(&mut self, batch: &Batch) -> Result<WriteOutcome> {
        let chunk = batch.chunk();
        self.session
            .write_chunk(&chunk)
            .map_err(EngineError::Write)?;
        Ok(WriteOutcome::written(chunk.rows()))
    }

    fn finish(self: Box<Self>) -> Result<u64> {
        let Self { session } = *self;
        let staged = session.staged_rows();
        let committed = session.finish().map_err(EngineError::Write)?;
        debug!(staged, committed, "copy session committed");
        Ok(committed)
    }
}
