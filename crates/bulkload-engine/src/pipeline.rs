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

//! The producer/consumer pipeline shared by every strategy.
//!
//! The calling thread reads the dataset and fills batches; `workers` scoped
//! threads take them off a bounded queue and write them. The queue holds
//! `workers * channel_multiplier` batches, and a producer blocked on a full
//! queue for longer than the send timeout fails the run.
//!
//! The first error from any thread is kept and aborts the run: the producer
//! stops at its next batch boundary, workers drain the queue without
//! writing, and no writer is finished. Writers are finished only after every
//! worker has stopped, so a failure on one worker also discards the work
//! staged by the others. External cancellation takes the same
//! path without recording an error.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::pool::BatchPool;
use crate::progress::ProgressTracker;
use crate::strategy::{Batch, BatchWriter, InsertStrategy};
use bulkload_core::RunId;
use bulkload_csv::{ParseReport, RowReader};
use bulkload_store::BenchmarkStore;
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender};
use parking_lot::Mutex;
use std::io::Read;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What a finished pipeline reports.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Parser counts.
    pub parse: ParseReport,
    /// Rows accepted by the store.
    pub rows_written: u64,
    /// Batches handed to workers.
    pub batches: u64,
    /// Producer wall clock.
    pub parse_ms: u64,
    /// Worker wall clock, first spawn until the last writer is finished.
    pub insert_ms: u64,
}

/// One load of a dataset into a store.
pub struct Pipeline<'a> {
    run_id: RunId,
    strategy: &'a dyn InsertStrategy,
    store: Arc<dyn BenchmarkStore>,
    tracker: &'a ProgressTracker,
    config: &'a EngineConfig,
}

struct Shared<'a> {
    run_id: RunId,
    abort: CancellationToken,
    first_error: Mutex<Option<EngineError>>,
    written: AtomicU64,
    failed: AtomicU64,
    first_row_error: Mutex<Option<String>>,
    pool: BatchPool<Batch>,
    tracker: &'a ProgressTracker,
}

impl Shared<'_> {
    fn fail(&self, err: EngineError) {
        let mut slot = self.first_error.lock();
        if slot.is_none() {
            warn!(run_id = %self.run_id, error = %err, "aborting load");
            *slot = Some(err);
        } else {
            debug!(run_id = %self.run_id, error = %err, "further error after abort");
        }
        drop(slot);
        self.abort.cancel();
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl<'a> Pipeline<'a> {
    /// Pipeline for one run.
    pub fn new(
        run_id: RunId,
        strategy: &'a dyn InsertStrategy,
        store: Arc<dyn BenchmarkStore>,
        tracker: &'a ProgressTracker,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            run_id,
            strategy,
            store,
            tracker,
            config,
        }
    }

    /// Loads everything `reader` yields.
    ///
    /// The strategy's cleanup runs whatever the outcome; an error from it is
    /// returned only when the load itself succeeded.
    pub fn run<R: Read>(
        &self,
        reader: RowReader<R>,
        cancel: &CancellationToken,
    ) -> Result<PipelineReport> {
        let method = self.strategy.method();
        let settings = self.strategy.settings();
        info!(
            run_id = %self.run_id,
            %method,
            workers = settings.workers,
            batch_size = settings.batch_size,
            "starting load"
        );

        let loaded = self
            .strategy
            .prepare(self.store.as_ref(), self.tracker.total_rows())
            .and_then(|()| self.stream(reader, cancel));
        let cleaned = self.strategy.cleanup(self.store.as_ref());

        match (loaded, cleaned) {
            (Ok(report), Ok(())) => {
                info!(
                    run_id = %self.run_id,
                    %method,
                    rows = report.rows_written,
                    batches = report.batches,
                    parse_ms = report.parse_ms,
                    insert_ms = report.insert_ms,
                    "load finished"
                );
                Ok(report)
            }
            (Ok(_), Err(e)) => Err(e),
            (Err(e), cleanup) => {
                if let Err(cleanup_err) = cleanup {
                    warn!(run_id = %self.run_id, error = %cleanup_err, "cleanup after failed load also failed");
                }
                Err(e)
            }
        }
    }

    fn stream<R: Read>(
        &self,
        reader: RowReader<R>,
        cancel: &CancellationToken,
    ) -> Result<PipelineReport> {
        let settings = self.strategy.settings();
        let capacity = self.config.channel_capacity(settings.workers);
        let shared = Shared {
            run_id: self.run_id,
            abort: cancel.child_token(),
            first_error: Mutex::new(None),
            written: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            first_row_error: Mutex::new(None),
            pool: BatchPool::new(capacity + settings.workers),
            tracker: self.tracker,
        };
        let (tx, rx) = bounded::<Batch>(capacity);

        let mut parse = None;
        let mut batches = 0;
        let mut parse_ms = 0;
        let insert_started = Instant::now();

        thread::scope(|scope| {
            let shared = &shared;
            let mut handles = Vec::with_capacity(settings.workers);
            for index in 0..settings.workers {
                let rx = rx.clone();
                let spawned = thread::Builder::new()
                    .name(format!("bulkload-{}-{index}", self.strategy.method()))
                    .spawn_scoped(scope, move || {
                        let body = AssertUnwindSafe(|| self.consume(&rx, shared));
                        catch_unwind(body).unwrap_or_else(|payload| {
                            shared.fail(EngineError::from_panic(payload));
                            None
                        })
                    });
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(e) => {
                        shared.fail(EngineError::Spawn(e));
                        break;
                    }
                }
            }
            drop(rx);

            let parse_started = Instant::now();
            let produced = catch_unwind(AssertUnwindSafe(|| {
                self.produce(reader, &tx, shared, &mut batches)
            }));
            parse_ms = millis(parse_started.elapsed());
            // Record the failure before closing the queue, so no worker
            // sees a clean end of input.
            match produced {
                Ok(Ok(report)) => parse = Some(report),
                Ok(Err(e)) => shared.fail(e),
                Err(payload) => shared.fail(EngineError::from_panic(payload)),
            }
            drop(tx);

            let mut writers = Vec::with_capacity(handles.len());
            for handle in handles {
                match handle.join() {
                    Ok(writer) => writers.extend(writer),
                    Err(payload) => shared.fail(EngineError::from_panic(payload)),
                }
            }
            self.finish_writers(writers, shared);
        });
        let insert_ms = millis(insert_started.elapsed());
        debug!(
            run_id = %self.run_id,
            reused_batches = shared.pool.reused(),
            idle_batches = shared.pool.idle(),
            "workers joined"
        );

        let Shared {
            first_error,
            written,
            failed,
            first_row_error,
            ..
        } = shared;
        if let Some(err) = first_error.into_inner() {
            return Err(err);
        }
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        let written = written.into_inner();
        let failed = failed.into_inner();
        if failed > 0 {
            return Err(EngineError::RowFailures {
                failed,
                total: written + failed,
                first: first_row_error.into_inner().unwrap_or_default(),
            });
        }
        let parse = parse.ok_or_else(|| {
            EngineError::Panicked("producer ended without a parse report".into())
        })?;
        Ok(PipelineReport {
            parse,
            rows_written: written,
            batches,
            parse_ms,
            insert_ms,
        })
    }

    fn produce<R: Read>(
        &self,
        mut reader: RowReader<R>,
        tx: &Sender<Batch>,
        shared: &Shared<'_>,
        batches: &mut u64,
    ) -> Result<ParseReport> {
        let kind = self.strategy.payload();
        let size = self.strategy.settings().batch_size;
        let timeout = self.config.send_timeout();

        while !shared.abort.is_cancelled() {
            let mut batch = shared.pool.take_or(|| Batch::with_capacity(kind, size));
            let filled = match &mut batch {
                Batch::Rows(rows) => reader.fill_batch(rows, size),
                Batch::Copy(chunk) => reader.fill_copy_chunk(chunk, size),
            }
            .map_err(EngineError::Producer)?;
            if filled == 0 {
                shared.pool.give(batch);
                break;
            }
            match tx.send_timeout(batch, timeout) {
                Ok(()) => *batches += 1,
                Err(SendTimeoutError::Timeout(_)) => {
                    return Err(EngineError::SendTimeout(timeout));
                }
                Err(SendTimeoutError::Disconnected(_)) => {
                    return Err(EngineError::Panicked(
                        "every worker exited before the dataset was consumed".into(),
                    ));
                }
            }
        }

        let report = reader.into_report();
        report.log_summary(self.run_id);
        Ok(report)
    }

    /// Writes batches until the queue closes, handing back the writer
    /// unfinished.
    fn consume(&self, rx: &Receiver<Batch>, shared: &Shared<'_>) -> Option<Box<dyn BatchWriter>> {
        let mut writer = match self.strategy.open_writer(&self.store) {
            Ok(writer) => Some(writer),
            Err(e) => {
                shared.fail(e);
                None
            }
        };

        for batch in rx.iter() {
            if shared.abort.is_cancelled() {
                shared.pool.give(batch);
                continue;
            }
            let Some(active) = writer.as_mut() else {
                shared.pool.give(batch);
                continue;
            };
            match active.write(&batch) {
                Ok(outcome) => {
                    shared.written.fetch_add(outcome.written, Ordering::Relaxed);
                    if outcome.failed > 0 {
                        shared.failed.fetch_add(outcome.failed, Ordering::Relaxed);
                        if let Some(msg) = outcome.first_error.clone() {
                            shared.first_row_error.lock().get_or_insert(msg);
                        }
                    }
                    shared.tracker.record_batch(outcome.handled());
                }
                Err(e) => shared.fail(e),
            }
            shared.pool.give(batch);
        }

        writer
    }

    /// Finishes every writer once all workers have stopped. Nothing is
    /// finished after an abort, and a failing finish stops the rest.
    fn finish_writers(&self, writers: Vec<Box<dyn BatchWriter>>, shared: &Shared<'_>) {
        for (index, writer) in writers.into_iter().enumerate() {
            if shared.abort.is_cancelled() {
                debug!(run_id = %self.run_id, worker = index, "discarding writer of aborted load");
                continue;
            }
            match catch_unwind(AssertUnwindSafe(|| writer.finish())) {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => shared.fail(e),
                Err(payload) => shared.fail(EngineError::from_panic(payload)),
            }
        }
    }
}
