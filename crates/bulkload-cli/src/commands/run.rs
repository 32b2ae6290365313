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

//! `bulkload run`.

use super::{print_json, Context};
use crate::error::{CliError, Result};
use bulkload_core::{BenchmarkRun, Method, RunRequest, RunStatus};
use bulkload_engine::{BenchmarkService, ProgressEvent, RunEvent};
use colored::Colorize;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

/// Runs one benchmark to completion.
///
/// Ctrl-C cancels the run; it is then recorded as failed.
pub fn run(ctx: &Context, rows: u64, method: Method, date_columns: u8, quiet: bool) -> Result<()> {
    let service = ctx.service()?;
    let request = RunRequest::new(rows, method).with_date_columns(date_columns);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    let run = runtime.block_on(drive(&service, request, quiet || ctx.json))?;

    if ctx.json {
        print_json(&run)?;
    } else {
        print_summary(&run);
    }
    match run.status {
        RunStatus::Completed => Ok(()),
        _ => Err(CliError::RunFailed {
            id: run.id,
            message: run.error_message.unwrap_or_default(),
        }),
    }
}

async fn drive(service: &BenchmarkService, request: RunRequest, quiet: bool) -> Result<BenchmarkRun> {
    let (run, mut events) = service.start_and_subscribe(request)?;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(RunEvent::Progress(p)) if !quiet => print_progress(&p),
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                warn!(run_id = %run.id, "interrupted, cancelling run");
                service.cancel(run.id);
            }
        }
    }
    Ok(service.wait(run.id).await?)
}

fn print_progress(p: &ProgressEvent) {
    let stalled = if p.is_stalled {
        format!(" {}", "stalled".yellow().bold())
    } else {
        String::new()
    };
    eprintln!(
        "[{:<14}] {:>5.1}%  {:>10} rows  {:>9.0} rows/s  eta {}{}",
        p.phase.as_str(),
        p.overall_progress,
        p.rows_processed,
        p.rows_per_second,
        p.eta,
        stalled
    );
}

fn print_summary(run: &BenchmarkRun) {
    let status = match run.status {
        RunStatus::Completed => run.status.as_str().green().bold(),
        _ => run.status.as_str().red().bold(),
    };
    println!(
        "{} {} {} ({}, {} rows)",
        "Run".bright_blue().bold(),
        run.id,
        status,
        run.method,
        run.row_count
    );
    match run.timings() {
        Some(t) => {
            println!("  generation {:>10} ms", t.generation_ms);
            println!("  parse      {:>10} ms", t.parse_ms);
            println!("  insert     {:>10} ms", t.insert_ms);
            println!("  total      {:>10} ms", t.total_ms);
            if t.insert_ms > 0 {
                let rate = run.row_count as f64 * 1_000.0 / t.insert_ms as f64;
                println!("  throughput {:>10.0} rows/s", rate);
            }
        }
        None => {
            if let Some(message) = &run.error_message {
                println!("  {} {}", "error:".red(), message);
            }
        }
    }
}
