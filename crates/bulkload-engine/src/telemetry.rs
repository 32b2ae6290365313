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

//! Push telemetry.
//!
//! Each run gets a broadcast channel in the [`EventHub`]. While the run is
//! active a [`Reporter`] drives two tasks:
//!
//! - a monitor that publishes a progress event every tick and on phase changes
//! - a heartbeat that publishes a heartbeat event and flags stalls
//!
//! Delivery is best-effort. A run with no subscribers publishes into the void
//! and lagging subscribers lose events; neither affects the outcome.

use crate::config::EngineConfig;
use crate::progress::{format_eta, Phase, ProgressTracker};
use bulkload_core::{PhaseTimings, RunId};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Events buffered per subscriber before it starts lagging.
pub const EVENT_CAPACITY: usize = 256;

/// Progress report for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// Run reported on.
    pub run_id: RunId,
    /// Current phase.
    pub phase: Phase,
    /// Weighted overall progress, 0-100.
    pub overall_progress: f64,
    /// Progress within the phase, 0-100.
    pub phase_progress: f64,
    /// Rows counted in the phase.
    pub rows_processed: u64,
    /// Phase throughput.
    pub rows_per_second: f64,
    /// Remaining time, human readable.
    pub eta: String,
    /// Status line.
    pub message: String,
    /// No progress across several heartbeats.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_stalled: bool,
    /// Sent by the heartbeat ticker.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_heartbeat: bool,
}

/// Final report of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEvent {
    /// Run reported on.
    pub run_id: RunId,
    /// Phase durations.
    pub timings: PhaseTimings,
    /// Rows persisted.
    pub rows: u64,
    /// Date cells dropped to null.
    pub invalid_dates: u64,
    /// Malformed records skipped.
    pub bad_records: u64,
}

/// Final report of a failed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureEvent {
    /// Run reported on.
    pub run_id: RunId,
    /// Error message, as stored on the run record.
    pub error: String,
    /// Stopped by deadline or cancel rather than an error.
    pub cancelled: bool,
}

/// Anything published on a run's channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// Periodic progress.
    Progress(ProgressEvent),
    /// The run completed; last event on the channel.
    Completed(CompletionEvent),
    /// The run failed; last event on the channel.
    Failed(FailureEvent),
}

impl RunEvent {
    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress(_))
    }

    /// The progress payload, if any.
    pub fn as_progress(&self) -> Option<&ProgressEvent> {
        match self {
            Self::Progress(p) => Some(p),
            _ => None,
        }
    }
}

/// Broadcast channels keyed by run id.
#[derive(Debug, Clone, Default)]
pub struct EventHub {
    channels: Arc<DashMap<RunId, broadcast::Sender<RunEvent>>>,
}

impl EventHub {
    /// Empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the channel for a run.
    pub fn open(&self, run_id: RunId) {
        self.channels
            .entry(run_id)
            .or_insert_with(|| broadcast::channel(EVENT_CAPACITY).0);
    }

    /// Receiver for a run's future events; `None` once the run has finished.
    pub fn subscribe(&self, run_id: RunId) -> Option<broadcast::Receiver<RunEvent>> {
        self.channels.get(&run_id).map(|tx| tx.subscribe())
    }

    /// Publishes an event. Silently dropped when nobody listens.
    pub fn publish(&self, run_id: RunId, event: RunEvent) {
        if let Some(tx) = self.channels.get(&run_id) {
            let _ = tx.send(event);
        }
    }

    /// Drops a run's channel; subscribers see the stream end after the
    /// events already queued.
    pub fn close(&self, run_id: RunId) {
        self.channels.remove(&run_id);
    }

    /// Runs with an open channel.
    pub fn open_channels(&self) -> usize {
        self.channels.len()
    }
}

struct Emitter {
    run_id: RunId,
    tracker: Arc<ProgressTracker>,
    hub: EventHub,
    last_overall: Mutex<f64>,
    stalled: AtomicBool,
    closed: AtomicBool,
}

impl Emitter {
    fn emit(&self, heartbeat: bool) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        let reading = self.tracker.read();
        let overall = {
            let mut last = self.last_overall.lock();
            *last = last.max(reading.overall);
            *last
        };
        let message = match reading.phase {
            Phase::CsvGeneration => format!(
                "generating dataset: {} of {} rows",
                reading.rows,
                self.tracker.total_rows()
            ),
            Phase::Parsing => "reading dataset".to_string(),
            Phase::Insertion => format!(
                "inserting: {} of {} rows",
                reading.rows,
                self.tracker.total_rows()
            ),
            Phase::Completed => format!("completed: {} rows", reading.rows),
            Phase::Failed => "failed".to_string(),
        };
        self.hub.publish(
            self.run_id,
            RunEvent::Progress(ProgressEvent {
                run_id: self.run_id,
                phase: reading.phase,
                overall_progress: overall,
                phase_progress: reading.phase_progress,
                rows_processed: reading.rows,
                rows_per_second: reading.rows_per_second,
                eta: format_eta(reading.eta),
                message,
                is_stalled: self.stalled.load(Ordering::SeqCst),
                is_heartbeat: heartbeat,
            }),
        );
    }
}

/// Background progress publisher for one run.
pub struct Reporter {
    emitter: Arc<Emitter>,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Reporter {
    /// Spawns the monitor and heartbeat tasks. Must run inside a tokio runtime.
    pub fn start(
        run_id: RunId,
        tracker: Arc<ProgressTracker>,
        hub: EventHub,
        config: &EngineConfig,
    ) -> Self {
        let emitter = Arc::new(Emitter {
            run_id,
            tracker,
            hub,
            last_overall: Mutex::new(0.0),
            stalled: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        });
        let shutdown = CancellationToken::new();
        let tasks = vec![
            tokio::spawn(monitor(
                Arc::clone(&emitter),
                shutdown.clone(),
                config.progress_interval(),
            )),
            tokio::spawn(heartbeat(
                Arc::clone(&emitter),
                shutdown.clone(),
                config.heartbeat_interval(),
                config.stall_heartbeats,
            )),
        ];
        Self {
            emitter,
            shutdown,
            tasks,
        }
    }

    /// Stops both tasks.
    ///
    /// With `completed`, publishes the last insertion-phase reading and then
    /// the 100% completion event. Otherwise nothing more is published.
    pub async fn stop(self, completed: bool) {
        if !completed {
            self.emitter.closed.store(true, Ordering::SeqCst);
        }
        self.shutdown.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                debug!(run_id = %self.emitter.run_id, error = %e, "telemetry task ended abnormally");
            }
        }
        if completed {
            self.emitter.emit(false);
            self.emitter.tracker.set_phase(Phase::Completed);
            self.emitter.emit(false);
            self.emitter.closed.store(true, Ordering::SeqCst);
        }
    }
}

async fn monitor(emitter: Arc<Emitter>, shutdown: CancellationToken, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => emitter.emit(false),
            _ = emitter.tracker.phase_changed() => emitter.emit(false),
        }
    }
}

async fn heartbeat(
    emitter: Arc<Emitter>,
    shutdown: CancellationToken,
    every: Duration,
    stall_after: u32,
) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; start counting from the next one.
    ticker.tick().await;
    let mut last_activity = emitter.tracker.activity();
    let mut unchanged = 0u32;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let activity = emitter.tracker.activity();
                if activity == last_activity {
                    unchanged = unchanged.saturating_add(1);
                } else {
                    unchanged = 0;
                    last_activity = activity;
                }
                let stalled = unchanged >= stall_after;
                let was_stalled = emitter.stalled.swap(stalled, Ordering::SeqCst);
                if stalled && !was_stalled {
                    warn!(
                        run_id = %emitter.run_id,
                        heartbeats = unchanged,
                        rows = activity,
                        "no progress across heartbeats, run looks stalled"
                    );
                }
                emitter.emit(true);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> EngineConfig {
        EngineConfig {
            progress_interval_ms: 10,
            heartbeat_interval_ms: 15,
            stall_heartbeats: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_event_json_shape() {
        let event = RunEvent::Progress(ProgressEvent {
            run_id: RunId(3),
            phase: Phase::Insertion,
            overall_progress: 40.0,
            phase_progress: 20.0,
            rows_processed: 200,
            rows_per_second: 100.0,
            eta: "12s".into(),
            message: "inserting".into(),
            is_stalled: false,
            is_heartbeat: true,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["runId"], 3);
        assert_eq!(json["phase"], "insertion");
        assert_eq!(json["isHeartbeat"], true);
        assert!(json.get("isStalled").is_none());
    }

    #[test]
    fn test_publish_without_channel_is_dropped() {
        let hub = EventHub::new();
        hub.publish(
            RunId(1),
            RunEvent::Failed(FailureEvent {
                run_id: RunId(1),
                error: "x".into(),
                cancelled: false,
            }),
        );
        assert!(hub.subscribe(RunId(1)).is_none());
        hub.open(RunId(1));
        assert!(hub.subscribe(RunId(1)).is_some());
        hub.close(RunId(1));
        assert_eq!(hub.open_channels(), 0);
    }

    #[tokio::test]
    async fn test_completed_stop_ends_at_hundred() {
        let hub = EventHub::new();
        hub.open(RunId(5));
        let mut rx = hub.subscribe(RunId(5)).unwrap();
        let tracker = Arc::new(ProgressTracker::new(100));
        let reporter = Reporter::start(RunId(5), Arc::clone(&tracker), hub.clone(), &fast_config());

        tracker.record_generated(100);
        tracker.set_phase(Phase::Parsing);
        tracker.record_batch(100);
        reporter.stop(true).await;
        hub.close(RunId(5));

        let mut events = Vec::new();
        while let Ok(event) = rx.recv().await {
            events.push(event);
        }
        let progress: Vec<_> = events.iter().filter_map(RunEvent::as_progress).collect();
        assert!(progress.iter().any(|p| p.phase == Phase::Insertion));
        let last = progress.last().unwrap();
        assert_eq!(last.phase, Phase::Completed);
        assert_eq!(last.overall_progress, 100.0);
        assert!(progress
            .windows(2)
            .all(|w| w[0].overall_progress <= w[1].overall_progress));
        assert!(progress[..progress.len() - 1]
            .iter()
            .all(|p| p.overall_progress < 100.0));
    }

    #[tokio::test]
    async fn test_failed_stop_publishes_nothing_more() {
        let hub = EventHub::new();
        hub.open(RunId(6));
        let tracker = Arc::new(ProgressTracker::new(100));
        let reporter = Reporter::start(RunId(6), Arc::clone(&tracker), hub.clone(), &fast_config());
        tokio::time::sleep(Duration::from_millis(30)).await;
        reporter.stop(false).await;

        let mut rx = hub.subscribe(RunId(6)).unwrap();
        tracker.record_generated(50);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_stall_flag_raised() {
        let hub = EventHub::new();
        hub.open(RunId(7));
        let mut rx = hub.subscribe(RunId(7)).unwrap();
        let tracker = Arc::new(ProgressTracker::new(100));
        let reporter = Reporter::start(RunId(7), tracker, hub.clone(), &fast_config());

        let stalled = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match rx.recv().await {
                    Ok(RunEvent::Progress(p)) if p.is_heartbeat && p.is_stalled => break true,
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break false,
                }
            }
        })
        .await
        .unwrap_or(false);
        reporter.stop(false).await;
        assert!(stalled);
    }
}
