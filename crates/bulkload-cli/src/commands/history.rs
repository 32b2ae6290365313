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

//! `bulkload runs`, `bulkload show` and `bulkload purge`.

use super::{print_json, Context};
use crate::error::Result;
use bulkload_core::{BenchmarkRun, RunId, RunStatus};
use bulkload_store::RowStore;
use colored::Colorize;
use serde_json::json;

fn ms(value: Option<u64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Lists recent runs.
pub fn runs(ctx: &Context, limit: Option<usize>) -> Result<()> {
    let runs = ctx.service()?.recent_runs(limit)?;
    if ctx.json {
        return print_json(&runs);
    }
    if runs.is_empty() {
        println!("no runs recorded in {}", ctx.db.display());
        return Ok(());
    }
    println!(
        "{:>5}  {:<16} {:>10}  {:<10} {:>10}  {}",
        "ID", "METHOD", "ROWS", "STATUS", "TOTAL MS", "CREATED"
    );
    for run in &runs {
        let status = format!("{:<10}", run.status.as_str());
        let status = match run.status {
            RunStatus::Completed => status.green(),
            RunStatus::Failed => status.red(),
            RunStatus::Running => status.yellow(),
        };
        println!(
            "{:>5}  {:<16} {:>10}  {} {:>10}  {}",
            run.id,
            run.method.as_str(),
            run.row_count,
            status,
            ms(run.total_ms),
            run.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

/// Prints one run.
pub fn show(ctx: &Context, id: u64) -> Result<()> {
    let run = ctx.service()?.get_run(RunId(id))?;
    if ctx.json {
        return print_json(&run);
    }
    print_run(&run);
    Ok(())
}

fn print_run(run: &BenchmarkRun) {
    println!("{} {}", "Run".bright_blue().bold(), run.id);
    println!("  method       {}", run.method);
    println!("  status       {}", run.status);
    println!("  rows         {}", run.row_count);
    println!("  columns      {}", run.column_count);
    println!("  date columns {}", run.date_columns);
    println!("  generation   {} ms", ms(run.generation_ms));
    println!("  parse        {} ms", ms(run.parse_ms));
    println!("  insert       {} ms", ms(run.insert_ms));
    println!("  total        {} ms", ms(run.total_ms));
    println!("  created      {}", run.created_at.to_rfc3339());
    if let Some(finished) = run.finished_at {
        println!("  finished     {}", finished.to_rfc3339());
    }
    if let Some(message) = &run.error_message {
        println!("  error        {}", message.red());
    }
}

/// Deletes a run's rows; the run record stays.
pub fn purge(ctx: &Context, id: u64) -> Result<()> {
    let store = ctx.open_store()?;
    let deleted = store.delete_rows(RunId(id))?;
    if ctx.json {
        return print_json(&json!({ "runId": id, "deleted": deleted }));
    }
    println!("deleted {deleted} rows of run {id}");
    Ok(())
}
