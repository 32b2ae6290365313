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

//! End-to-end runs through the service.

mod common;

use bulkload_core::{Method, RunId, RunRequest, RunStatus};
use bulkload_engine::{BenchmarkService, EngineConfig, EngineError, Phase, RunEvent};
use bulkload_store::{BenchmarkStore, MemoryStore, RowStore, SqliteConfig, SqliteStore};
use common::{collect, fast_config, request, run_collecting, service, service_with, FaultStore, Faults};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

fn progress(events: &[RunEvent]) -> Vec<&bulkload_engine::ProgressEvent> {
    events.iter().filter_map(RunEvent::as_progress).collect()
}

async fn wait_for_insertion(rx: &mut broadcast::Receiver<RunEvent>) {
    loop {
        match rx.recv().await {
            Ok(RunEvent::Progress(p)) if p.phase == Phase::Insertion => return,
            Ok(event) if event.is_terminal() => panic!("run ended early: {event:?}"),
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => panic!("channel closed early"),
        }
    }
}

#[tokio::test]
async fn test_raw_sql_ten_thousand_rows() {
    let store = Arc::new(MemoryStore::new());
    let service = service(store.clone());

    let (run, events) = run_collecting(&service, request(10_000, Method::RawSql)).await;

    assert_eq!(run.status, RunStatus::Completed, "{:?}", run.error_message);
    assert_eq!(store.count_rows(run.id).unwrap(), 10_000);
    assert!(progress(&events).iter().any(|p| p.phase == Phase::Insertion));

    let timings = run.timings().unwrap();
    assert!(timings.total_ms >= timings.generation_ms);
    assert!(timings.total_ms >= timings.parse_ms.max(timings.insert_ms));
    match events.last() {
        Some(RunEvent::Completed(done)) => {
            assert_eq!(done.rows, 10_000);
            assert_eq!(done.timings, timings);
            assert_eq!(done.invalid_dates, 0);
        }
        other => panic!("expected completion event, got {other:?}"),
    }
    assert!(!service.is_active(run.id));
}

#[tokio::test]
async fn test_every_method_completes_on_both_backends() {
    let dir = tempfile::tempdir().unwrap();
    let sqlite = SqliteStore::open(SqliteConfig::new(dir.path().join("runs.db"))).unwrap();
    let backends: Vec<(&str, Arc<dyn BenchmarkStore>)> = vec![
        ("memory", Arc::new(MemoryStore::new())),
        ("sqlite", Arc::new(sqlite)),
    ];

    for (name, store) in backends {
        let service = service(Arc::clone(&store));
        for method in Method::ALL {
            let run = service.start_run(request(600, method)).unwrap();
            assert_eq!(run.status, RunStatus::Running);
            let run = service.wait(run.id).await.unwrap();
            assert_eq!(
                run.status,
                RunStatus::Completed,
                "{name}/{method}: {:?}",
                run.error_message
            );
            assert_eq!(store.count_rows(run.id).unwrap(), 600, "{name}/{method}");
        }
    }
}

#[tokio::test]
async fn test_sqlite_default_batch_sizes() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn BenchmarkStore> =
        Arc::new(SqliteStore::open(SqliteConfig::new(dir.path().join("defaults.db"))).unwrap());
    let config = EngineConfig {
        progress_interval_ms: 50,
        ..EngineConfig::default()
    };
    assert_eq!(config.raw_sql.batch_size, 3_000);
    let service = service_with(config, Arc::clone(&store));

    // Two full default raw_sql batches plus a tail.
    for method in Method::ALL {
        let run = service.start_run(request(6_500, method)).unwrap();
        let run = service.wait(run.id).await.unwrap();
        assert_eq!(
            run.status,
            RunStatus::Completed,
            "{method}: {:?}",
            run.error_message
        );
        assert_eq!(store.count_rows(run.id).unwrap(), 6_500, "{method}");
    }
}

#[tokio::test]
async fn test_progress_is_monotonic_and_hits_hundred_only_at_completion() {
    let service = service(Arc::new(MemoryStore::new()));
    let (run, events) = run_collecting(&service, request(3_000, Method::Batched)).await;
    assert_eq!(run.status, RunStatus::Completed);

    let progress = progress(&events);
    assert!(progress.len() >= 2);
    assert!(progress
        .windows(2)
        .all(|w| w[0].overall_progress <= w[1].overall_progress));
    let (last, rest) = progress.split_last().unwrap();
    assert_eq!(last.phase, Phase::Completed);
    assert_eq!(last.overall_progress, 100.0);
    assert!(rest.iter().all(|p| p.overall_progress < 100.0));
}

#[tokio::test]
async fn test_batched_write_error_on_second_batch_fails_run() {
    let store = FaultStore::new(Faults {
        fail_batch: Some(2),
        ..Faults::default()
    });
    let mut config = fast_config();
    config.batched.workers = 1;
    let service = service_with(config, store.clone());

    let (run, events) = run_collecting(&service, request(1_000, Method::Batched)).await;

    assert_eq!(run.status, RunStatus::Failed);
    let message = run.error_message.clone().unwrap();
    assert!(message.contains("injected disk full"), "{message}");
    // Batches commit individually: the first is kept, nothing after the failure lands.
    assert_eq!(store.count_rows(run.id).unwrap(), 100);
    match events.last() {
        Some(RunEvent::Failed(failed)) => {
            assert_eq!(failed.error, message);
            assert!(!failed.cancelled);
        }
        other => panic!("expected failure event, got {other:?}"),
    }
    assert!(run.generation_ms.is_some());
    assert!(run.insert_ms.is_none());
}

#[tokio::test]
async fn test_sequential_counts_row_failures() {
    let store = FaultStore::new(Faults {
        fail_every_row: Some(10),
        ..Faults::default()
    });
    let service = service(store.clone());

    let run = service.start_run(request(200, Method::Sequential)).unwrap();
    let run = service.wait(run.id).await.unwrap();

    assert_eq!(run.status, RunStatus::Failed);
    let message = run.error_message.unwrap();
    assert!(message.contains("20 of 200 rows failed"), "{message}");
    assert_eq!(store.count_rows(run.id).unwrap(), 180);
}

#[tokio::test]
async fn test_deadline_marks_run_failed() {
    let store = FaultStore::slow(Duration::from_millis(20));
    let config = EngineConfig {
        deadline_ms: 150,
        ..fast_config()
    };
    let service = service_with(config, store);

    let (run, events) = run_collecting(&service, request(5_000, Method::Batched)).await;

    assert_eq!(run.status, RunStatus::Failed);
    let message = run.error_message.unwrap();
    assert!(message.contains("deadline"), "{message}");
    assert!(matches!(
        events.last(),
        Some(RunEvent::Failed(f)) if f.cancelled
    ));
}

#[tokio::test]
async fn test_cancel_stops_run_and_silences_progress() {
    let store = FaultStore::slow(Duration::from_millis(30));
    let service = service(store.clone());

    let (run, mut rx) = service
        .start_and_subscribe(request(5_000, Method::Batched))
        .unwrap();
    wait_for_insertion(&mut rx).await;
    assert!(service.cancel(run.id));

    let rest = collect(rx).await;
    let run = service.wait(run.id).await.unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(
        run.error_message.as_deref(),
        Some(EngineError::Cancelled.to_string().as_str())
    );

    let failed_at = rest
        .iter()
        .position(|e| matches!(e, RunEvent::Failed(f) if f.cancelled))
        .expect("failure event");
    assert_eq!(failed_at, rest.len() - 1);
    assert!(!service.is_active(run.id));
    assert!(!service.cancel(run.id));
    assert!(store.count_rows(run.id).unwrap() < 5_000);
}

#[tokio::test]
async fn test_cancelled_copy_commits_nothing() {
    let store = FaultStore::slow(Duration::from_millis(30));
    let service = service(store.clone());

    let (run, mut rx) = service
        .start_and_subscribe(request(5_000, Method::NativeCopy))
        .unwrap();
    wait_for_insertion(&mut rx).await;
    service.cancel(run.id);

    let run = service.wait(run.id).await.unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(store.count_rows(run.id).unwrap(), 0);
}

#[tokio::test]
async fn test_store_panic_is_contained() {
    let store = FaultStore::new(Faults {
        panic_on_batch: true,
        ..Faults::default()
    });
    let service = service(store);

    let run = service.start_run(request(500, Method::Batched)).unwrap();
    let run = service.wait(run.id).await.unwrap();

    assert_eq!(run.status, RunStatus::Failed);
    let message = run.error_message.unwrap();
    assert!(message.contains("panicked"), "{message}");
    assert!(message.contains("store exploded"), "{message}");
}

#[tokio::test]
async fn test_indexed_raw_sql_drops_and_restores_indexes() {
    let store = FaultStore::new(Faults::default());
    let config = EngineConfig {
        index_threshold: 1_000,
        ..fast_config()
    };
    let service = service_with(config, store.clone());

    let run = service.start_run(request(2_000, Method::IndexedRawSql)).unwrap();
    let run = service.wait(run.id).await.unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(store.dropped_indexes.load(Ordering::SeqCst), 1);
    assert_eq!(store.created_indexes.load(Ordering::SeqCst), 1);
    assert_eq!(store.inner.index_names().len(), 4);

    // Below the threshold the indexes stay, but recreation still runs.
    let run = service.start_run(request(500, Method::IndexedRawSql)).unwrap();
    service.wait(run.id).await.unwrap();
    assert_eq!(store.dropped_indexes.load(Ordering::SeqCst), 1);
    assert_eq!(store.created_indexes.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_duplicated_dataset_loads_exact_count() {
    let store = Arc::new(MemoryStore::new());
    let config = EngineConfig {
        duplication_threshold: 1_000,
        max_base_rows: 400,
        ..fast_config()
    };
    let service = service_with(config, store.clone());

    let run = service.start_run(request(5_001, Method::NativeCopy)).unwrap();
    let run = service.wait(run.id).await.unwrap();
    assert_eq!(run.status, RunStatus::Completed, "{:?}", run.error_message);
    assert_eq!(store.count_rows(run.id).unwrap(), 5_001);
}

#[tokio::test]
async fn test_zero_date_columns_leave_dates_null() {
    let store = Arc::new(MemoryStore::new());
    let service = service(store.clone());

    let req = RunRequest::new(300, Method::Batched).with_date_columns(0);
    let run = service.start_run(req).unwrap();
    let run = service.wait(run.id).await.unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.date_columns, 0);
    assert!(store
        .rows_for(run.id)
        .iter()
        .all(|r| r.birth_date.is_none() && r.hire_date.is_none() && r.last_review_date.is_none()));
}

#[tokio::test]
async fn test_invalid_requests_create_nothing() {
    let service = service(Arc::new(MemoryStore::new()));
    assert!(matches!(
        service.start_run(request(0, Method::Batched)),
        Err(EngineError::InvalidRequest(_))
    ));
    let too_many_dates = RunRequest::new(10, Method::Batched).with_date_columns(4);
    assert!(service.start_run(too_many_dates).is_err());
    assert!(service.recent_runs(None).unwrap().is_empty());
}

#[tokio::test]
async fn test_recent_runs_newest_first_and_capped() {
    let config = EngineConfig {
        recent_limit: 2,
        ..fast_config()
    };
    let service = service_with(config, Arc::new(MemoryStore::new()));
    let mut ids = Vec::new();
    for _ in 0..3 {
        let run = service.start_run(request(50, Method::Batched)).unwrap();
        ids.push(service.wait(run.id).await.unwrap().id);
    }

    let recent: Vec<RunId> = service
        .recent_runs(Some(10))
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(recent, vec![ids[2], ids[1]]);
    assert_eq!(service.recent_runs(Some(1)).unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_run() {
    let service = service(Arc::new(MemoryStore::new()));
    assert!(matches!(
        service.get_run(RunId(404)),
        Err(EngineError::RunNotFound(RunId(404)))
    ));
    assert!(service.subscribe(RunId(404)).is_none());
    assert!(!service.cancel(RunId(404)));
}

#[test]
fn test_start_requires_runtime() {
    let service = BenchmarkService::new(fast_config(), Arc::new(MemoryStore::new())).unwrap();
    assert!(matches!(
        service.start_run(request(10, Method::Batched)),
        Err(EngineError::Config(_))
    ));
}
