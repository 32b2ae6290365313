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

//! Shared progress counters.
//!
//! Every worker writes to one [`ProgressTracker`]; the reporter reads it.
//! Writers hold the write lock only for an increment.
//!
//! Overall progress is phase-weighted: generation covers 0-25%, insertion
//! 25-100%. It stays below 100 until the run is marked completed.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// Share of overall progress given to dataset generation.
pub const GENERATION_WEIGHT: f64 = 25.0;

/// Highest overall progress reported before completion.
pub const MAX_RUNNING_PROGRESS: f64 = 99.9;

/// Run phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Writing the dataset.
    CsvGeneration,
    /// Reader open, no batch written yet.
    Parsing,
    /// Workers writing batches.
    Insertion,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
}

impl Phase {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CsvGeneration => "csv_generation",
            Self::Parsing => "parsing",
            Self::Insertion => "insertion",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether the run is over.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy)]
pub struct ProgressSnapshot {
    /// Current phase.
    pub phase: Phase,
    /// Rows written to the dataset.
    pub rows_generated: u64,
    /// Rows handled by workers.
    pub rows_processed: u64,
    /// Batches handled by workers.
    pub batches_processed: u64,
    /// Run start.
    pub started_at: Instant,
    /// Start of the current phase.
    pub phase_started_at: Instant,
}

/// Derived figures for one report.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReading {
    /// Phase at the time of reading.
    pub phase: Phase,
    /// Weighted overall progress, 0-100.
    pub overall: f64,
    /// Progress within the phase, 0-100.
    pub phase_progress: f64,
    /// Rows counted in the current phase.
    pub rows: u64,
    /// Phase throughput.
    pub rows_per_second: f64,
    /// Remaining time, once estimable.
    pub eta: Option<Duration>,
}

/// Counters for one run.
#[derive(Debug)]
pub struct ProgressTracker {
    total_rows: u64,
    state: RwLock<ProgressSnapshot>,
    phase_changed: Notify,
}

impl ProgressTracker {
    /// Tracker for a run of `total_rows` rows, in the generation phase.
    pub fn new(total_rows: u64) -> Self {
        let now = Instant::now();
        Self {
            total_rows,
            state: RwLock::new(ProgressSnapshot {
                phase: Phase::CsvGeneration,
                rows_generated: 0,
                rows_processed: 0,
                batches_processed: 0,
                started_at: now,
                phase_started_at: now,
            }),
            phase_changed: Notify::new(),
        }
    }

    /// Requested rows.
    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }

    /// Copy of the counters.
    pub fn snapshot(&self) -> ProgressSnapshot {
        *self.state.read()
    }

    /// Moves to a new phase. Terminal phases are final.
    pub fn set_phase(&self, phase: Phase) {
        {
            let mut state = self.state.write();
            if state.phase == phase || state.phase.is_terminal() {
                return;
            }
            state.phase = phase;
            state.phase_started_at = Instant::now();
        }
        self.phase_changed.notify_one();
    }

    /// Resolves at the next phase change.
    pub async fn phase_changed(&self) {
        self.phase_changed.notified().await;
    }

    /// Records rows written to the dataset so far.
    pub fn record_generated(&self, rows: u64) {
        let mut state = self.state.write();
        state.rows_generated = state.rows_generated.max(rows);
    }

    /// Records one handled batch; the first one starts the insertion phase.
    pub fn record_batch(&self, rows: u64) {
        let started_insertion = {
            let mut state = self.state.write();
            state.rows_processed += rows;
            state.batches_processed += 1;
            if state.phase == Phase::Parsing {
                state.phase = Phase::Insertion;
                state.phase_started_at = Instant::now();
                true
            } else {
                false
            }
        };
        if started_insertion {
            self.phase_changed.notify_one();
        }
    }

    /// Rows counted across phases, used for stall detection.
    pub fn activity(&self) -> u64 {
        let state = self.state.read();
        state.rows_generated + state.rows_processed
    }

    /// Computes the figures for a report.
    pub fn read(&self) -> ProgressReading {
        self.read_at(Instant::now())
    }

    fn read_at(&self, now: Instant) -> ProgressReading {
        let s = self.snapshot();
        let total = self.total_rows.max(1) as f64;
        let fraction = |rows: u64| (rows as f64 / total).min(1.0);

        let (rows, phase_progress, overall) = match s.phase {
            Phase::CsvGeneration => {
                let f = fraction(s.rows_generated);
                (s.rows_generated, f * 100.0, f * GENERATION_WEIGHT)
            }
            Phase::Parsing => (0, 0.0, GENERATION_WEIGHT),
            Phase::Insertion | Phase::Failed => {
                let f = fraction(s.rows_processed);
                (
                    s.rows_processed,
                    f * 100.0,
                    GENERATION_WEIGHT + f * (100.0 - GENERATION_WEIGHT),
                )
            }
            Phase::Completed => (s.rows_processed, 100.0, 100.0),
        };
        let overall = if s.phase == Phase::Completed {
            100.0
        } else {
            overall.min(MAX_RUNNING_PROGRESS)
        };

        let phase_secs = now.duration_since(s.phase_started_at).as_secs_f64();
        let rows_per_second = if phase_secs > 0.0 {
            rows as f64 / phase_secs
        } else {
            0.0
        };

        let elapsed = now.duration_since(s.started_at).as_secs_f64();
        let eta = if overall > 0.0 && overall < 100.0 && elapsed > 0.0 {
            let remaining = elapsed / (overall / 100.0) - elapsed;
            Some(Duration::from_secs_f64(remaining.max(0.0)))
        } else {
            None
        };

        ProgressReading {
            phase: s.phase,
            overall,
            phase_progress,
            rows,
            rows_per_second,
            eta,
        }
    }
}

/// Renders an ETA for display; `None` reads as still calculating.
pub fn format_eta(eta: Option<Duration>) -> String {
    let Some(eta) = eta else {
        return "calculating...".to_string();
    };
    let secs = eta.as_secs();
    match (secs / 3_600, (secs % 3_600) / 60, secs % 60) {
        (0, 0, s) => format!("{s}s"),
        (0, m, s) => format!("{m}m {s}s"),
        (h, m, _) => format!("{h}h {m}m"),
    }
}
