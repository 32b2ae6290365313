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

//! Run orchestration.
//!
//! [`BenchmarkService`] is the engine's outer surface. Starting a run creates
//! its record and returns at once; a background task then generates the
//! dataset, loads it with the chosen strategy and stores the outcome on the
//! record. The task is bounded by the configured deadline and never lets a
//! panic escape: every way a run can end is written to its record and
//! published as a final event.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::pipeline::{Pipeline, PipelineReport};
use crate::progress::{Phase, ProgressTracker};
use crate::strategy;
use crate::telemetry::{CompletionEvent, EventHub, FailureEvent, Reporter, RunEvent};
use bulkload_core::{BenchmarkRun, PhaseTimings, RunId, RunRequest, COLUMN_COUNT};
use bulkload_csv::{DatasetGenerator, ParseReport, RowReader};
use bulkload_store::BenchmarkStore;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::io::BufReader;
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

struct ActiveRun {
    cancel: CancellationToken,
    done: watch::Receiver<bool>,
}

struct ServiceInner {
    config: EngineConfig,
    store: Arc<dyn BenchmarkStore>,
    hub: EventHub,
    active: DashMap<RunId, ActiveRun>,
}

/// Starts, tracks and cancels benchmark runs.
///
/// Cheap to clone; clones share runs and event channels.
#[derive(Clone)]
pub struct BenchmarkService {
    inner: Arc<ServiceInner>,
}

/// What a successful run produced.
#[derive(Debug, Clone)]
struct RunOutcome {
    timings: PhaseTimings,
    rows: u64,
    parse: ParseReport,
}

impl BenchmarkService {
    /// Service over a store.
    pub fn new(config: EngineConfig, store: Arc<dyn BenchmarkStore>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(ServiceInner {
                config,
                store,
                hub: EventHub::new(),
                active: DashMap::new(),
            }),
        })
    }

    /// Engine settings.
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Backing store.
    pub fn store(&self) -> &Arc<dyn BenchmarkStore> {
        &self.inner.store
    }

    /// Event channels.
    pub fn events(&self) -> &EventHub {
        &self.inner.hub
    }

    /// Creates a run and starts it in the background.
    ///
    /// Returns the record in `running` state. Must be called from within a
    /// tokio runtime.
    pub fn start_run(&self, request: RunRequest) -> Result<BenchmarkRun> {
        self.launch(request, false).map(|(run, _)| run)
    }

    /// Like [`start_run`](Self::start_run), subscribing to the run's events
    /// before any is published.
    pub fn start_and_subscribe(
        &self,
        request: RunRequest,
    ) -> Result<(BenchmarkRun, broadcast::Receiver<RunEvent>)> {
        let (run, rx) = self.launch(request, true)?;
        let rx = rx.ok_or(EngineError::RunNotFound(run.id))?;
        Ok((run, rx))
    }

    fn launch(
        &self,
        request: RunRequest,
        subscribe: bool,
    ) -> Result<(BenchmarkRun, Option<broadcast::Receiver<RunEvent>>)> {
        let handle = Handle::try_current()
            .map_err(|e| EngineError::Config(format!("runs need a tokio runtime: {e}")))?;
        self.inner.config.check_request(&request)?;

        let run = self
            .inner
            .store
            .create(&request, COLUMN_COUNT as u32)
            .map_err(EngineError::Repository)?;
        self.inner.hub.open(run.id);
        let rx = subscribe.then(|| self.inner.hub.subscribe(run.id)).flatten();

        let cancel = CancellationToken::new();
        let (done_tx, done_rx) = watch::channel(false);
        self.inner.active.insert(
            run.id,
            ActiveRun {
                cancel: cancel.clone(),
                done: done_rx,
            },
        );
        info!(
            run_id = %run.id,
            method = %request.method,
            rows = request.row_count,
            date_columns = request.date_columns,
            "run started"
        );
        handle.spawn(execute(
            Arc::clone(&self.inner),
            run.clone(),
            cancel,
            done_tx,
        ));
        Ok((run, rx))
    }

    /// Fetches a run record.
    pub fn get_run(&self, id: RunId) -> Result<BenchmarkRun> {
        self.inner
            .store
            .get(id)
            .map_err(EngineError::Repository)?
            .ok_or(EngineError::RunNotFound(id))
    }

    /// Most recent runs, newest first. The length is capped at the
    /// configured `recent_limit`, which is also the default.
    pub fn recent_runs(&self, limit: Option<usize>) -> Result<Vec<BenchmarkRun>> {
        let max = self.inner.config.recent_limit;
        let limit = limit.unwrap_or(max).min(max);
        self.inner
            .store
            .recent(limit)
            .map_err(EngineError::Repository)
    }

    /// Receiver for a running run's future events.
    pub fn subscribe(&self, id: RunId) -> Option<broadcast::Receiver<RunEvent>> {
        self.inner.hub.subscribe(id)
    }

    /// Whether the run's background task is still going.
    pub fn is_active(&self, id: RunId) -> bool {
        self.inner.active.contains_key(&id)
    }

    /// Asks a running run to stop. Returns `false` when the run is not active.
    pub fn cancel(&self, id: RunId) -> bool {
        match self.inner.active.get(&id) {
            Some(run) => {
                info!(run_id = %id, "cancel requested");
                run.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancels every active run, returning how many were signalled.
    pub fn cancel_all(&self) -> usize {
        let mut count = 0;
        for run in self.inner.active.iter() {
            run.cancel.cancel();
            count += 1;
        }
        count
    }

    /// Waits for a run's background task to end, then returns its record.
    pub async fn wait(&self, id: RunId) -> Result<BenchmarkRun> {
        let done = self.inner.active.get(&id).map(|run| run.done.clone());
        if let Some(mut done) = done {
            // An error means the task is gone, which is what we wait for.
            let _ = done.wait_for(|finished| *finished).await;
        }
        self.get_run(id)
    }
}

fn join_failure(err: JoinError) -> EngineError {
    if err.is_panic() {
        EngineError::from_panic(err.into_panic())
    } else {
        EngineError::Panicked(err.to_string())
    }
}

fn millis(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

async fn execute(
    inner: Arc<ServiceInner>,
    mut run: BenchmarkRun,
    cancel: CancellationToken,
    done: watch::Sender<bool>,
) {
    let run_id = run.id;
    let request = RunRequest {
        row_count: run.row_count,
        method: run.method,
        date_columns: run.date_columns,
    };
    let tracker = Arc::new(ProgressTracker::new(request.row_count));
    let reporter = Reporter::start(
        run_id,
        Arc::clone(&tracker),
        inner.hub.clone(),
        &inner.config,
    );
    let generation_ms = Arc::new(Mutex::new(None));
    let deadline = inner.config.deadline();

    let mut work = tokio::spawn(run_phases(
        Arc::clone(&inner),
        run_id,
        request,
        Arc::clone(&tracker),
        cancel.clone(),
        Arc::clone(&generation_ms),
    ));
    let mut deadline_hit = false;
    let joined = tokio::select! {
        joined = &mut work => joined,
        _ = tokio::time::sleep(deadline) => {
            deadline_hit = true;
            warn!(%run_id, ?deadline, "deadline reached, cancelling run");
            cancel.cancel();
            (&mut work).await
        }
    };
    let outcome = match joined.map_err(join_failure).and_then(|r| r) {
        Err(_) if deadline_hit => Err(EngineError::DeadlineExceeded(deadline)),
        other => other,
    };

    match outcome {
        Ok(outcome) => {
            reporter.stop(true).await;
            if let Err(e) = run.complete(outcome.timings) {
                error!(%run_id, error = %e, "run record refused completion");
            }
            persist(&inner, &run).await;
            info!(
                %run_id,
                method = %run.method,
                rows = outcome.rows,
                generation_ms = outcome.timings.generation_ms,
                parse_ms = outcome.timings.parse_ms,
                insert_ms = outcome.timings.insert_ms,
                total_ms = outcome.timings.total_ms,
                "run completed"
            );
            inner.hub.publish(
                run_id,
                RunEvent::Completed(CompletionEvent {
                    run_id,
                    timings: outcome.timings,
                    rows: outcome.rows,
                    invalid_dates: outcome.parse.invalid_dates,
                    bad_records: outcome.parse.bad_records,
                }),
            );
        }
        Err(err) => {
            reporter.stop(false).await;
            tracker.set_phase(Phase::Failed);
            let message = err.to_string();
            if err.is_cancellation() {
                warn!(%run_id, error = %message, "run stopped");
            } else {
                error!(%run_id, error = %message, "run failed");
            }
            let generation_ms = *generation_ms.lock();
            if let Err(e) = run.fail(message.clone(), generation_ms) {
                error!(%run_id, error = %e, "run record refused failure");
            }
            persist(&inner, &run).await;
            inner.hub.publish(
                run_id,
                RunEvent::Failed(FailureEvent {
                    run_id,
                    error: message,
                    cancelled: err.is_cancellation(),
                }),
            );
        }
    }

    inner.hub.close(run_id);
    inner.active.remove(&run_id);
    let _ = done.send(true);
}

async fn persist(inner: &Arc<ServiceInner>, run: &BenchmarkRun) {
    let store = Arc::clone(&inner.store);
    let record = run.clone();
    let saved = tokio::task::spawn_blocking(move || store.update(&record)).await;
    match saved {
        Ok(Ok(())) => debug!(run_id = %run.id, status = %run.status, "run record saved"),
        Ok(Err(e)) => error!(run_id = %run.id, error = %e, "failed to save run record"),
        Err(e) => error!(run_id = %run.id, error = %e, "run record save task failed"),
    }
}

async fn run_phases(
    inner: Arc<ServiceInner>,
    run_id: RunId,
    request: RunRequest,
    tracker: Arc<ProgressTracker>,
    cancel: CancellationToken,
    generation_ms: Arc<Mutex<Option<u64>>>,
) -> Result<RunOutcome> {
    let started = Instant::now();

    let generator = DatasetGenerator::new(inner.config.generator_config(&request))
        .map_err(EngineError::Generation)?;
    let dataset = {
        let tracker = Arc::clone(&tracker);
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            generator.generate_with_progress(&cancel, |rows| tracker.record_generated(rows))
        })
        .await
        .map_err(join_failure)?
        .map_err(EngineError::from_generation)?
    };
    *generation_ms.lock() = Some(dataset.elapsed_ms());
    tracker.record_generated(dataset.rows);
    debug!(%run_id, path = %dataset.path().display(), rows = dataset.rows, "dataset ready");
    if cancel.is_cancelled() {
        return Err(EngineError::Cancelled);
    }
    let generation = dataset.elapsed_ms();
    tracker.set_phase(Phase::Parsing);

    let report: PipelineReport = {
        let inner = Arc::clone(&inner);
        let tracker = Arc::clone(&tracker);
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            let file = dataset.open().map_err(EngineError::Producer)?;
            let reader = RowReader::new(BufReader::new(file), run_id, &inner.config.reader_config())
                .map_err(EngineError::Producer)?;
            let strategy = strategy::for_method(request.method, &inner.config);
            let pipeline = Pipeline::new(
                run_id,
                strategy.as_ref(),
                Arc::clone(&inner.store),
                &tracker,
                &inner.config,
            );
            let report = pipeline.run(reader, &cancel);
            drop(dataset);
            report
        })
        .await
        .map_err(join_failure)??
    };
    if inner.config.verify_row_count {
        let store = Arc::clone(&inner.store);
        let actual = tokio::task::spawn_blocking(move || store.count_rows(run_id))
            .await
            .map_err(join_failure)?
            .map_err(EngineError::Write)?;
        if actual != request.row_count {
            return Err(EngineError::RowCountMismatch {
                expected: request.row_count,
                actual,
            });
        }
    }

    let total_ms = millis(started);

    Ok(RunOutcome {
        timings: PhaseTimings {
            generation_ms: generation,
            parse_ms: report.parse_ms,
            insert_ms: report.insert_ms,
            total_ms,
        },
        rows: report.rows_written,
        parse: report.parse,
    })
}
