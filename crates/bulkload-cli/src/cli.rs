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

//! Command-line definitions.

use crate::commands::{self, Context};
use crate::error::Result;
use bulkload_core::{Method, DATE_COLUMNS};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Bulkload - streaming bulk-insertion benchmarks
///
/// Generates synthetic employee datasets and loads them into a SQLite
/// database with one of five insertion methods, timing every phase.
///
/// # Examples
///
/// ```bash
/// # Load 100k rows with multi-row INSERT statements
/// bulkload run --rows 100000 --method raw_sql
///
/// # Inspect past runs
/// bulkload runs --limit 5
/// bulkload show 3 --json
/// ```
#[derive(Parser, Debug)]
#[command(name = "bulkload")]
#[command(author, version, about = "Bulkload - streaming bulk-insertion benchmarks", long_about = None)]
pub struct Cli {
    /// SQLite database holding rows and run records
    #[arg(long, global = true, default_value = "bulkload.db")]
    pub db: PathBuf,

    /// JSON engine configuration; missing keys keep their defaults
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[allow(missing_docs)]
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a dataset and load it, printing progress
    Run {
        /// Rows to generate and load
        #[arg(short, long)]
        rows: u64,

        /// Insertion method: sequential, batched, raw_sql, indexed_raw_sql, native_copy
        #[arg(short, long, value_parser = parse_method)]
        method: Method,

        /// Date columns carrying data (0-3)
        #[arg(long, default_value_t = DATE_COLUMNS.len() as u8)]
        date_columns: u8,

        /// Do not print progress events
        #[arg(short, long)]
        quiet: bool,
    },

    /// Write a synthetic dataset to a CSV file
    Generate {
        /// Rows to generate
        #[arg(short, long)]
        rows: u64,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Date columns carrying data (0-3)
        #[arg(long, default_value_t = DATE_COLUMNS.len() as u8)]
        date_columns: u8,

        /// RNG seed for a reproducible file
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Normalize date texts to RFC 3339
    Date {
        /// Date texts
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// List recent runs, newest first
    Runs {
        /// Maximum runs shown
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show one run
    Show {
        /// Run id
        id: u64,
    },

    /// Delete the rows a run loaded
    Purge {
        /// Run id
        id: u64,
    },
}

fn parse_method(s: &str) -> std::result::Result<Method, String> {
    s.parse::<Method>().map_err(|e| e.to_string())
}

impl Cli {
    /// Runs the selected command.
    pub fn execute(self) -> Result<()> {
        let ctx = Context {
            db: self.db,
            config: self.config,
            json: self.json,
        };
        match self.command {
            Commands::Run {
                rows,
                method,
                date_columns,
                quiet,
            } => commands::run(&ctx, rows, method, date_columns, quiet),
            Commands::Generate {
                rows,
                output,
                date_columns,
                seed,
            } => commands::generate(&ctx, rows, &output, date_columns, seed),
            Commands::Date { values } => commands::date(&ctx, &values),
            Commands::Runs { limit } => commands::runs(&ctx, limit),
            Commands::Show { id } => commands::show(&ctx, id),
            Commands::Purge { id } => commands::purge(&ctx, id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_method_names() {
        let cli = Cli::try_parse_from(["bulkload", "run", "-r", "10", "-m", "native_copy"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Run {
                method: Method::NativeCopy,
                rows: 10,
                date_columns: 3,
                ..
            }
        ));
        assert!(Cli::try_parse_from(["bulkload", "run", "-r", "10", "-m", "bulk"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["bulkload", "show", "4", "--json", "--db", "x.db"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.db, PathBuf::from("x.db"));
    }
}
