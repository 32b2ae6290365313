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

//! Normalizer throughput across the accepted shapes.

use bulkload_core::date::validate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const SAMPLES: &[(&str, &str)] = &[
    ("iso_date", "2024-01-15"),
    ("rfc3339", "2024-01-15T10:30:00+02:00"),
    ("us_slash", "01/15/2024"),
    ("european_dot", "25.12.2023"),
    ("rfc2822", "Mon, 15 Jan 2024 10:30:00 GMT"),
    ("long_month", "January 15, 2024"),
    ("epoch", "1705314600"),
    ("empty", ""),
    ("invalid", "not a date"),
];

fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("date_validate");
    for (name, text) in SAMPLES {
        group.bench_with_input(BenchmarkId::from_parameter(name), text, |b, text| {
            b.iter(|| validate(black_box(text)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_validate);
criterion_main!(benches);
