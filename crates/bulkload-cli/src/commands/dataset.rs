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

//! `bulkload generate` and `bulkload date`.

use super::{print_json, Context};
use crate::error::{CliError, Result};
use bulkload_core::{date, Method, RunRequest};
use bulkload_csv::{DatasetGenerator, GenerationMode};
use colored::Colorize;
use serde_json::json;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Writes a dataset to `output`.
pub fn generate(
    ctx: &Context,
    rows: u64,
    output: &Path,
    date_columns: u8,
    seed: Option<u64>,
) -> Result<()> {
    let engine = ctx.engine_config()?;
    let request = RunRequest::new(rows, Method::Batched).with_date_columns(date_columns);
    engine.check_request(&request)?;

    // Generate next to the output so the final rename stays on one file system.
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::env::current_dir().map_err(|e| CliError::io_error(".", e))?,
    };
    let mut config = engine.generator_config(&request);
    config.seed = seed.or(config.seed);
    config.output_dir = Some(dir);

    let dataset = DatasetGenerator::new(config)?.generate(&CancellationToken::new())?;
    let written = dataset.rows;
    let mode = dataset.mode;
    let elapsed_ms = dataset.elapsed_ms();
    dataset.persist(output)?;

    if ctx.json {
        return print_json(&json!({
            "path": output.display().to_string(),
            "rows": written,
            "duplicated": matches!(mode, GenerationMode::Duplicated { .. }),
            "elapsedMs": elapsed_ms,
        }));
    }
    let how = match mode {
        GenerationMode::Direct => "generated directly".to_string(),
        GenerationMode::Duplicated { base_rows, passes } => {
            format!("{base_rows} base rows doubled {passes} times")
        }
    };
    println!(
        "{} {} rows to {} in {} ms ({how})",
        "Wrote".green().bold(),
        written,
        output.display(),
        elapsed_ms
    );
    Ok(())
}

/// Normalizes each value, failing if any does not parse.
pub fn date(ctx: &Context, values: &[String]) -> Result<()> {
    let mut invalid = 0;
    let mut results = Vec::with_capacity(values.len());
    for value in values {
        let outcome = date::validate(value);
        if outcome.is_err() {
            invalid += 1;
        }
        results.push((value, outcome));
    }

    if ctx.json {
        let items: Vec<_> = results
            .iter()
            .map(|(input, outcome)| match outcome {
                Ok(Some(d)) => json!({
                    "input": input,
                    "normalized": d.to_rfc3339(),
                    "shape": format!("{:?}", d.shape),
                }),
                Ok(None) => json!({ "input": input, "normalized": null }),
                Err(e) => json!({ "input": input, "error": e.to_string() }),
            })
            .collect();
        print_json(&items)?;
    } else {
        for (input, outcome) in &results {
            match outcome {
                Ok(Some(d)) => println!("{input} -> {} ({:?})", d.to_rfc3339().green(), d.shape),
                Ok(None) => println!("{input:?} -> {}", "empty".dimmed()),
                Err(e) => println!("{input} -> {}", e.to_string().red()),
            }
        }
    }

    if invalid > 0 {
        return Err(CliError::InvalidDates(invalid));
    }
    Ok(())
}
