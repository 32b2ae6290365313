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

//! Framework batch inserts.

use super::{Batch, BatchWriter, InsertStrategy, WriteOutcome};
use crate::config::StrategySettings;
use crate::error::{EngineError, Result};
use bulkload_core::Method;
use bulkload_store::BenchmarkStore;
use std::sync::Arc;

/// One `insert_batch` call per batch.
#[derive(Debug, Clone)]
pub struct BatchedStrategy {
    settings: StrategySettings,
}

impl BatchedStrategy {
    /// Strategy with the given settings.
    pub fn new(settings: StrategySettings) -> Self {
        Self { settings }
    }
}

impl InsertStrategy for BatchedStrategy {
    fn method(&self) -> Method {
        Method::Batched
    }

    fn settings(&self) -> StrategySettings {
        self.settings
    }

    fn open_writer(&self, store: &Arc<dyn BenchmarkStore>) -> Result<Box<dyn BatchWriter>> {
        Ok(Box::new(BatchInserter {
            store: Arc::clone(store),
        }))
    }
}

struct BatchInserter {
    store: Arc<dyn BenchmarkStore>,
}

impl BatchWriter for BatchInserter {
    fn write(&mut self, batch: &Batch) -> Result<WriteOutcome> {
        let rows = batch.rows()?;
        self.store.insert_batch(&rows).map_err(EngineError::Write)?;
        Ok(WriteOutcome::written(rows.len()))
    }
}
