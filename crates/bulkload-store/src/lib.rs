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

//! Stores for benchmark rows and run records.
//!
//! [`traits`] defines the seams the engine writes through. Two backends
//! implement all of them:
//!
//! - [`MemoryStore`]: process memory, for tests and dry runs
//! - [`SqliteStore`]: a SQLite database file with WAL journaling, pooled
//!   connections and `TEMP`-table staging for bulk copy
//!
//! [`sql`] holds the multi-row `INSERT` builder used by the raw-SQL
//! strategies, plus the index definitions managed around large loads.

#![deny(missing_docs)]

mod error;
mod memory;
pub mod sql;
mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sql::{InsertBuilder, SECONDARY_INDEXES};
pub use sqlite::{JournalMode, SqliteConfig, SqliteStore, SyncMode};
pub use traits::{BenchmarkStore, CopyConnection, CopyProvider, RowStore, RunRepository};
