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

//! Engine configuration.
//!
//! Every field has a default; a JSON file only needs the keys it changes.
//!
//! ```
//! use bulkload_core::Method;
//! use bulkload_engine::EngineConfig;
//!
//! let config: EngineConfig =
//!     serde_json::from_str(r#"{ "deadline_ms": 60000, "raw_sql": { "batch_size": 500 } }"#).unwrap();
//! assert_eq!(config.strategy(Method::RawSql).batch_size, 500);
//! assert_eq!(config.strategy(Method::Batched).batch_size, 1000);
//! ```

use crate::error::{EngineError, Result};
use bulkload_core::{Method, RunRequest, DATE_COLUMNS};
use bulkload_csv::generator::{
    DEFAULT_CANCEL_CHECK_INTERVAL, DEFAULT_DUPLICATION_THRESHOLD, DEFAULT_MAX_BASE_ROWS,
};
use bulkload_csv::{GeneratorConfig, ReaderConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

fn cpus() -> usize {
    thread::available_parallelism().map_or(4, |n| n.get())
}

/// Consumer count and batch size of one strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategySettings {
    /// Consumer threads.
    pub workers: usize,
    /// Rows per batch.
    pub batch_size: usize,
}

impl StrategySettings {
    /// Settings with the given values.
    pub const fn new(workers: usize, batch_size: usize) -> Self {
        Self {
            workers,
            batch_size,
        }
    }
}

/// Engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// One consumer, one row per store call.
    pub sequential: StrategySettings,
    /// Framework batch inserts.
    pub batched: StrategySettings,
    /// Multi-row `INSERT` statements.
    pub raw_sql: StrategySettings,
    /// Multi-row `INSERT` statements with index management.
    pub indexed_raw_sql: StrategySettings,
    /// Bulk copy, one session per consumer.
    pub native_copy: StrategySettings,
    /// Batch queue capacity as a multiple of the consumer count.
    pub channel_multiplier: usize,
    /// Longest the producer may block on a full queue.
    pub send_timeout_ms: u64,
    /// Whole-run deadline.
    pub deadline_ms: u64,
    /// Progress tick.
    pub progress_interval_ms: u64,
    /// Heartbeat tick.
    pub heartbeat_interval_ms: u64,
    /// Unchanged heartbeats before a run is flagged as stalled.
    pub stall_heartbeats: u32,
    /// Row count at which index-managed loads drop secondary indexes.
    pub index_threshold: u64,
    /// Row count at which generation switches to base+duplication.
    pub duplication_threshold: u64,
    /// Largest freshly generated base.
    pub max_base_rows: u64,
    /// Generated rows between cancellation checks.
    pub cancel_check_interval: u64,
    /// Directory for generated datasets; system temp dir when unset.
    pub output_dir: Option<PathBuf>,
    /// RNG seed for reproducible datasets.
    pub seed: Option<u64>,
    /// Invalid date samples kept per run.
    pub max_invalid_samples: usize,
    /// Default and maximum length of the recent-runs list.
    pub recent_limit: usize,
    /// Count persisted rows after a successful load.
    pub verify_row_count: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let cpus = cpus();
        Self {
            sequential: StrategySettings::new(1, 1),
            batched: StrategySettings::new(cpus, 1_000),
            raw_sql: StrategySettings::new(cpus * 2, 3_000),
            indexed_raw_sql: StrategySettings::new(cpus * 2, 3_000),
            native_copy: StrategySettings::new(cpus, 2_000),
            channel_multiplier: 2,
            send_timeout_ms: 30_000,
            deadline_ms: 30 * 60 * 1_000,
            progress_interval_ms: 1_000,
            heartbeat_interval_ms: 10_000,
            stall_heartbeats: 3,
            index_threshold: 100_000,
            duplication_threshold: DEFAULT_DUPLICATION_THRESHOLD,
            max_base_rows: DEFAULT_MAX_BASE_ROWS,
            cancel_check_interval: DEFAULT_CANCEL_CHECK_INTERVAL,
            output_dir: None,
            seed: None,
            max_invalid_samples: 10,
            recent_limit: 20,
            verify_row_count: true,
        }
    }
}

impl EngineConfig {
    /// Loads a JSON config file; missing keys keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        for method in Method::ALL {
            let s = self.strategy(method);
            if s.workers == 0 || s.batch_size == 0 {
                return Err(EngineError::Config(format!(
                    "{method}: workers and batch_size must be at least 1"
                )));
            }
        }
        if self.sequential.workers != 1 {
            return Err(EngineError::Config(
                "sequential runs use exactly one worker".into(),
            ));
        }
        let positive = [
            ("channel_multiplier", self.channel_multiplier as u64),
            ("send_timeout_ms", self.send_timeout_ms),
            ("deadline_ms", self.deadline_ms),
            ("progress_interval_ms", self.progress_interval_ms),
            ("heartbeat_interval_ms", self.heartbeat_interval_ms),
            ("stall_heartbeats", u64::from(self.stall_heartbeats)),
            ("max_base_rows", self.max_base_rows),
            ("cancel_check_interval", self.cancel_check_interval),
            ("recent_limit", self.recent_limit as u64),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(EngineError::Config(format!("{name} must be at least 1")));
        }
        Ok(())
    }

    /// Settings for a method.
    pub fn strategy(&self, method: Method) -> StrategySettings {
        match method {
            Method::Sequential => self.sequential,
            Method::Batched => self.batched,
            Method::RawSql => self.raw_sql,
            Method::IndexedRawSql => self.indexed_raw_sql,
            Method::NativeCopy => self.native_copy,
        }
    }

    /// Batch queue capacity for a consumer count.
    pub fn channel_capacity(&self, workers: usize) -> usize {
        workers.saturating_mul(self.channel_multiplier).max(1)
    }

    /// Producer send timeout.
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// Whole-run deadline.
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    /// Progress tick.
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    /// Heartbeat tick.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    /// Checks a request against the catalog.
    pub fn check_request(&self, request: &RunRequest) -> Result<()> {
        if request.row_count == 0 {
            return Err(EngineError::InvalidRequest(
                "rowCount must be at least 1".into(),
            ));
        }
        if usize::from(request.date_columns) > DATE_COLUMNS.len() {
            return Err(EngineError::InvalidRequest(format!(
                "dateColumns must be between 0 and {}",
                DATE_COLUMNS.len()
            )));
        }
        Ok(())
    }

    /// Generator settings for a request.
    pub fn generator_config(&self, request: &RunRequest) -> GeneratorConfig {
        GeneratorConfig {
            row_count: request.row_count,
            date_columns: request.date_columns,
            duplication_threshold: self.duplication_threshold,
            max_base_rows: self.max_base_rows,
            cancel_check_interval: self.cancel_check_interval,
            seed: self.seed,
            output_dir: self.output_dir.clone(),
        }
    }

    /// Reader settings.
    pub fn reader_config(&self) -> ReaderConfig {
        ReaderConfig {
            max_samples: self.max_invalid_samples,
            ..ReaderConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        let cpus = cpus();
        assert_eq!(config.strategy(Method::Sequential), StrategySettings::new(1, 1));
        assert_eq!(config.strategy(Method::Batched).workers, cpus);
        assert_eq!(config.strategy(Method::RawSql).workers, cpus * 2);
        assert_eq!(config.strategy(Method::IndexedRawSql).batch_size, 3_000);
        assert_eq!(config.strategy(Method::NativeCopy).workers, cpus);
        assert_eq!(config.channel_capacity(4), 8);
        assert_eq!(config.deadline(), Duration::from_secs(1_800));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"send_timeout_ms": 5, "seed": 9}}"#).unwrap();
        let config = EngineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.send_timeout(), Duration::from_millis(5));
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.stall_heartbeats, 3);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = EngineConfig {
            channel_multiplier: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));

        let config = EngineConfig {
            sequential: StrategySettings::new(2, 1),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_request_checks() {
        let config = EngineConfig::default();
        assert!(config.check_request(&RunRequest::new(0, Method::Batched)).is_err());
        let too_many = RunRequest::new(10, Method::Batched).with_date_columns(4);
        assert!(config.check_request(&too_many).is_err());
        assert!(config.check_request(&RunRequest::new(10, Method::Batched)).is_ok());
    }
}
