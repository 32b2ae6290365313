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

//! Bulkload command-line library.
//!
//! The `bulkload` binary is a thin wrapper over [`cli::Cli`]. Commands open
//! a SQLite database (`--db`), optionally load an engine configuration file
//! (`--config`) and print either human-readable or JSON output (`--json`).
//!
//! # Commands
//!
//! - **run**: generate a dataset and load it with one insertion method,
//!   streaming progress to stderr
//! - **generate**: write a synthetic dataset to a CSV file
//! - **date**: normalize date texts the way the loader does
//! - **runs** / **show**: inspect recorded runs
//! - **purge**: delete the rows a run loaded
//!
//! # Example
//!
//! ```no_run
//! use bulkload_cli::cli::Cli;
//! use clap::Parser;
//!
//! let cli = Cli::parse_from(["bulkload", "date", "2024-01-15", "1705276800"]);
//! cli.execute().unwrap();
//! ```

#![deny(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;

pub use error::{CliError, Result};
