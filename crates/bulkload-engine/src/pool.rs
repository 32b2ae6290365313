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

//! Recycled batch buffers.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// A buffer that can be emptied for reuse.
pub trait Reusable: Send {
    /// Empties the buffer, keeping its allocation.
    fn reset(&mut self);
}

/// Free list shared by the producer and the workers.
///
/// Workers hand buffers back after writing; the producer takes them before
/// filling. At most `max_idle` buffers are kept.
#[derive(Debug)]
pub struct BatchPool<T> {
    free: Mutex<Vec<T>>,
    max_idle: usize,
    reused: AtomicU64,
}

impl<T: Reusable> BatchPool<T> {
    /// Pool keeping up to `max_idle` buffers.
    pub fn new(max_idle: usize) -> Self {
        Self {
            free: Mutex::new(Vec::with_capacity(max_idle)),
            max_idle,
            reused: AtomicU64::new(0),
        }
    }

    /// A recycled buffer, or a new one from `make`.
    pub fn take_or(&self, make: impl FnOnce() -> T) -> T {
        match self.free.lock().pop() {
            Some(item) => {
                self.reused.fetch_add(1, Ordering::Relaxed);
                item
            }
            None => make(),
        }
    }

    /// Returns a buffer.
    pub fn give(&self, mut item: T) {
        item.reset();
        let mut free = self.free.lock();
        if free.len() < self.max_idle {
            free.push(item);
        }
    }

    /// Buffers handed out again instead of allocated.
    pub fn reused(&self) -> u64 {
        self.reused.load(Ordering::Relaxed)
    }

    /// Buffers waiting in the pool.
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }
}
