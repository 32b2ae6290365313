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

//! Command implementations.

mod dataset;
mod history;
mod run;

pub use dataset::{date, generate};
pub use history::{purge, runs, show};
pub use run::run;

use crate::error::Result;
use bulkload_engine::{BenchmarkService, EngineConfig};
use bulkload_store::{SqliteConfig, SqliteStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Options shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    /// Database file.
    pub db: PathBuf,
    /// Engine config file.
    pub config: Option<PathBuf>,
    /// JSON output.
    pub json: bool,
}

impl Context {
    /// Engine settings from `--config`, or the defaults.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        match &self.config {
            Some(path) => {
                debug!(path = %path.display(), "loading engine config");
                Ok(EngineConfig::from_json_file(path)?)
            }
            None => Ok(EngineConfig::default()),
        }
    }

    /// Opens the database.
    pub fn open_store(&self) -> Result<SqliteStore> {
        Ok(SqliteStore::open(SqliteConfig::new(self.db.clone()))?)
    }

    /// Service over the database.
    pub fn service(&self) -> Result<BenchmarkService> {
        let config = self.engine_config()?;
        let store = Arc::new(self.open_store()?);
        Ok(BenchmarkService::new(config, store)?)
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
