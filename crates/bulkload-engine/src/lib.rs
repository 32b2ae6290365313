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

//! Bulk-insertion benchmark engine.
//!
//! A run generates a synthetic dataset, streams it through a parser and
//! loads it into a store with one of five [`Method`]s, reporting progress
//! along the way.
//!
//! - **[`strategy`]**: the five insertion methods behind one writer seam
//! - **[`pipeline`]**: bounded producer/consumer load shared by all methods
//! - **[`progress`]** / **[`telemetry`]**: counters, phase-weighted progress,
//!   stall detection and per-run event channels
//! - **[`BenchmarkService`]**: starts, tracks and cancels runs
//!
//! # Examples
//!
//! ```no_run
//! use bulkload_core::{Method, RunRequest, RunStatus};
//! use bulkload_engine::{BenchmarkService, EngineConfig};
//! use bulkload_store::MemoryStore;
//! use std::sync::Arc;
//!
//! # async fn demo() -> bulkload_engine::Result<()> {
//! let service = BenchmarkService::new(EngineConfig::default(), Arc::new(MemoryStore::new()))?;
//! let run = service.start_run(RunRequest::new(10_000, Method::RawSql))?;
//! let finished = service.wait(run.id).await?;
//! assert_eq!(finished.status, RunStatus::Completed);
//! # Ok(())
//! # }
//! ```
//!
//! [`Method`]: bulkload_core::Method

#![deny(missing_docs)]

pub mod config;
mod error;
mod orchestrator;
pub mod pipeline;
pub mod pool;
pub mod progress;
pub mod strategy;
pub mod telemetry;

pub use config::{EngineConfig, StrategySettings};
pub use error::{EngineError, Result};
pub use orchestrator::BenchmarkService;
pub use pipeline::{Pipeline, PipelineReport};
pub use progress::{format_eta, Phase, ProgressReading, ProgressTracker};
pub use strategy::{for_method, Batch, BatchWriter, InsertStrategy, PayloadKind, WriteOutcome};
pub use telemetry::{
    CompletionEvent, EventHub, FailureEvent, ProgressEvent, Reporter, RunEvent,
};
