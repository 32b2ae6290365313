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

//! One row per store call.

use super::{Batch, BatchWriter, InsertStrategy, WriteOutcome};
use crate::config::StrategySettings;
use crate::error::Result;
use bulkload_core::Method;
use bulkload_store::BenchmarkStore;
use std::sync::Arc;
use tracing::debug;

/// Single consumer writing each row on its own. Row failures are counted and
/// the load continues.
#[derive(Debug, Clone)]
pub struct SequentialStrategy {
    settings: StrategySettings,
}

impl SequentialStrategy {
    /// Strategy with the given settings.
    pub fn new(settings: StrategySettings) -> Self {
        Self { settings }
    }
}

impl InsertStrategy for SequentialStrategy {
    fn method(&self) -> Method {
        Method::Sequential
    }

    fn settings(&self) -> StrategySettings {
        self.settings
    }

    fn tolerates_row_errors(&self) -> bool {
        true
    }

    fn open_writer(&self, store: &Arc<dyn BenchmarkStore>) -> Result<Box<dyn BatchWriter>> {
        Ok(Box::new(RowByRow {
            store: Arc::clone(store),
        }))
    }
}

struct RowByRow {
    store: Arc<dyn BenchmarkStore>,
}

impl BatchWriter for RowByRow {
    fn write(&mut self, batch: &Batch) -> Result<WriteOutcome> {
        let rows = batch.rows()?;
        let mut outcome = WriteOutcome::default();
        for row in rows.iter() {
            match self.store.insert_row(row) {
                Ok(()) => outcome.written += 1,
                Err(e) => {
                    debug!(run_id = %row.run_id, error = %e, "row insert failed");
                    outcome.failed += 1;
                    outcome.first_error.get_or_insert_with(|| e.to_string());
                }
            }
        }
        Ok(outcome)
    }
}
