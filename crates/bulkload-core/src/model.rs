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

//! Benchmark run records.
//!
//! A [`BenchmarkRun`] is created in [`RunStatus::Running`] and changes state
//! exactly once more, to either [`RunStatus::Completed`] (with every phase
//! duration filled) or [`RunStatus::Failed`] (with an error message).

use crate::error::{CoreError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque run identifier assigned by the run repository.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RunId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Insertion strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// One row per store call, single consumer.
    Sequential,
    /// Framework-level batch insert per batch.
    Batched,
    /// Hand-built multi-row `INSERT ... VALUES` per batch.
    RawSql,
    /// Like `RawSql`, with secondary indexes dropped for large runs.
    IndexedRawSql,
    /// Native bulk-copy protocol, one dedicated connection per worker.
    NativeCopy,
}

impl Method {
    /// All methods in order of increasing sophistication.
    pub const ALL: [Method; 5] = [
        Method::Sequential,
        Method::Batched,
        Method::RawSql,
        Method::IndexedRawSql,
        Method::NativeCopy,
    ];

    /// Wire name (`raw_sql`, `native_copy`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Batched => "batched",
            Self::RawSql => "raw_sql",
            Self::IndexedRawSql => "indexed_raw_sql",
            Self::NativeCopy => "native_copy",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::UnknownMethod(s.to_string()))
    }
}

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Created, work in progress.
    Running,
    /// Finished with every row persisted.
    Completed,
    /// Aborted; see the error message.
    Failed,
}

impl RunStatus {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }

    /// Only `running -> completed` and `running -> failed` are allowed.
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        matches!(
            (self, next),
            (Self::Running, Self::Completed) | (Self::Running, Self::Failed)
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(CoreError::UnknownStatus(other.to_string())),
        }
    }
}

/// Wall-clock durations of a finished run, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseTimings {
    /// Dataset generation.
    pub generation_ms: u64,
    /// Producer wall clock (parsing and queueing).
    pub parse_ms: u64,
    /// Consumer wall clock (first write to last worker exit).
    pub insert_ms: u64,
    /// Whole run.
    pub total_ms: u64,
}

/// Parameters of a run request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    /// Rows to generate and load.
    pub row_count: u64,
    /// Insertion strategy.
    pub method: Method,
    /// How many of the known date columns carry data.
    #[serde(default = "default_date_columns")]
    pub date_columns: u8,
}

fn default_date_columns() -> u8 {
    crate::row::DATE_COLUMNS.len() as u8
}

impl RunRequest {
    /// Request with every date column populated.
    pub fn new(row_count: u64, method: Method) -> Self {
        Self {
            row_count,
            method,
            date_columns: default_date_columns(),
        }
    }

    /// Sets the number of populated date columns.
    pub fn with_date_columns(mut self, date_columns: u8) -> Self {
        self.date_columns = date_columns;
        self
    }
}

/// One benchmark invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkRun {
    /// Repository key.
    pub id: RunId,
    /// Requested rows.
    pub row_count: u64,
    /// Columns in the generated dataset.
    pub column_count: u32,
    /// Date columns carrying data.
    pub date_columns: u8,
    /// Insertion strategy.
    pub method: Method,
    /// Lifecycle state.
    pub status: RunStatus,
    /// Generation duration, once known.
    pub generation_ms: Option<u64>,
    /// Parse duration, once known.
    pub parse_ms: Option<u64>,
    /// Insert duration, once known.
    pub insert_ms: Option<u64>,
    /// Total duration, once known.
    pub total_ms: Option<u64>,
    /// Failure description.
    pub error_message: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time of the terminal transition.
    pub finished_at: Option<DateTime<Utc>>,
}

impl BenchmarkRun {
    /// A fresh record in `running` state.
    pub fn new(id: RunId, request: &RunRequest, column_count: u32) -> Self {
        Self {
            id,
            row_count: request.row_count,
            column_count,
            date_columns: request.date_columns,
            method: request.method,
            status: RunStatus::Running,
            generation_ms: None,
            parse_ms: None,
            insert_ms: None,
            total_ms: None,
            error_message: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Marks the run completed and records every duration.
    pub fn complete(&mut self, timings: PhaseTimings) -> Result<()> {
        self.transition(RunStatus::Completed)?;
        self.generation_ms = Some(timings.generation_ms);
        self.parse_ms = Some(timings.parse_ms);
        self.insert_ms = Some(timings.insert_ms);
        self.total_ms = Some(timings.total_ms);
        Ok(())
    }

    /// Marks the run failed with a message.
    ///
    /// Durations measured before the failure may be supplied; they are kept.
    pub fn fail(&mut self, message: impl Into<String>, generation_ms: Option<u64>) -> Result<()> {
        self.transition(RunStatus::Failed)?;
        self.error_message = Some(message.into());
        self.generation_ms = generation_ms.or(self.generation_ms);
        Ok(())
    }

    /// Durations, when the run completed.
    pub fn timings(&self) -> Option<PhaseTimings> {
        Some(PhaseTimings {
            generation_ms: self.generation_ms?,
            parse_ms: self.parse_ms?,
            insert_ms: self.insert_ms?,
            total_ms: self.total_ms?,
        })
    }

    fn transition(&mut self, next: RunStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.finished_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run() -> BenchmarkRun {
        BenchmarkRun::new(RunId(7), &RunRequest::new(1000, Method::RawSql), 25)
    }

    #[test]
    fn test_method_round_trip_names() {
        for m in Method::ALL {
            assert_eq!(m.as_str().parse::<Method>().unwrap(), m);
        }
        assert_eq!("NATIVE_COPY".parse::<Method>().unwrap(), Method::NativeCopy);
        assert!("bulk".parse::<Method>().is_err());
    }

    #[test]
    fn test_method_serde_uses_snake_case() {
        let json = serde_json::to_string(&Method::IndexedRawSql).unwrap();
        assert_eq!(json, "\"indexed_raw_sql\"");
    }

    #[test]
    fn test_new_run_is_running() {
        let r = run();
        assert_eq!(r.status, RunStatus::Running);
        assert!(r.timings().is_none());
        assert_eq!(r.date_columns, 3);
    }

    #[test]
    fn test_complete_fills_timings() {
        let mut r = run();
        let t = PhaseTimings {
            generation_ms: 1,
            parse_ms: 2,
            insert_ms: 3,
            total_ms: 6,
        };
        r.complete(t).unwrap();
        assert_eq!(r.status, RunStatus::Completed);
        assert_eq!(r.timings(), Some(t));
        assert!(r.finished_at.is_some());
    }

    #[test]
    fn test_transitions_are_monotonic() {
        let mut r = run();
        r.fail("boom", Some(5)).unwrap();
        assert_eq!(r.error_message.as_deref(), Some("boom"));
        assert_eq!(r.generation_ms, Some(5));

        let err = r.complete(PhaseTimings::default()).unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidTransition {
                from: RunStatus::Failed,
                to: RunStatus::Completed
            }
        );
        assert!(r.fail("again", None).is_err());
        assert!(!RunStatus::Completed.can_transition_to(RunStatus::Running));
    }

    #[test]
    fn test_request_deserializes_camel_case() {
        let req: RunRequest =
            serde_json::from_str(r#"{"rowCount": 10000, "method": "raw_sql"}"#).unwrap();
        assert_eq!(req.row_count, 10_000);
        assert_eq!(req.method, Method::RawSql);
        assert_eq!(req.date_columns, 3);
    }
}
