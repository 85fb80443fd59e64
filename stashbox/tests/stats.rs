mod common;

use std::sync::Arc;

use common::{MockRequest, MockResponse, MockUpstream, TestBackend};
use stashbox::{CacheAside, CacheKey, CacheStatus, FallbackRace, Handler, StatsRecorder, StatsValue};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_hits_and_misses_are_all_counted() {
    const HITS: usize = 200;
    const MISSES: usize = 150;

    let backend = TestBackend::new();
    for i in 0..HITS {
        let uri = format!("http://host/hit/{i}");
        backend
            .put(&CacheKey::new("GET", &uri), &MockResponse::cached(200, "cached"))
            .await;
    }
    let handler = CacheAside::builder().backend(backend).build().unwrap();
    let upstream = MockUpstream::ok(200, "live");

    let mut tasks = Vec::with_capacity(HITS + MISSES);
    for i in 0..HITS {
        let (handler, upstream) = (handler.clone(), upstream.clone());
        tasks.push(tokio::spawn(async move {
            handler
                .handle(MockRequest::get(format!("http://host/hit/{i}")), upstream)
                .await
                .1
        }));
    }
    for i in 0..MISSES {
        let (handler, upstream) = (handler.clone(), upstream.clone());
        tasks.push(tokio::spawn(async move {
            handler
                .handle(MockRequest::get(format!("http://host/miss/{i}")), upstream)
                .await
                .1
        }));
    }

    let mut hits = 0;
    for task in tasks {
        if task.await.unwrap() == CacheStatus::Hit {
            hits += 1;
        }
    }

    let total = handler.stats().snapshot().total();
    assert_eq!(hits, HITS);
    assert_eq!(
        total,
        StatsValue {
            hits: HITS as u64,
            misses: MISSES as u64
        }
    );
    assert_eq!(upstream.calls(), MISSES);
}

#[test]
fn concurrent_bucket_creation_loses_nothing() {
    let stats = StatsRecorder::new("test");
    std::thread::scope(|scope| {
        for thread in 0..8u16 {
            let stats = &stats;
            scope.spawn(move || {
                for i in 0..1_000u16 {
                    let status = 200 + (i + thread) % 5;
                    if i % 2 == 0 {
                        stats.report_hit(status);
                    } else {
                        stats.report_miss(status);
                    }
                }
            });
        }
    });

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.per_status_code.len(), 5);
    assert_eq!(snapshot.total(), StatsValue { hits: 4_000, misses: 4_000 });
    let summed: u64 = snapshot.per_status_code.values().map(StatsValue::total).sum();
    assert_eq!(summed, 8_000);
}

#[tokio::test]
async fn handlers_can_share_a_recorder() {
    let stats = Arc::new(StatsRecorder::new("shared"));
    let aside = CacheAside::builder()
        .backend(TestBackend::new())
        .stats(stats.clone())
        .build()
        .unwrap();
    let fallback = FallbackRace::builder()
        .backend(TestBackend::new())
        .stats(stats.clone())
        .build()
        .unwrap();

    aside
        .handle(MockRequest::get("http://host/a"), MockUpstream::ok(200, ""))
        .await;
    fallback
        .handle(MockRequest::get("http://host/b"), MockUpstream::ok(404, ""))
        .await;

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.cache_type, "shared");
    assert_eq!(snapshot.status(200).misses, 1);
    assert_eq!(snapshot.status(404).misses, 1);
    assert!(Arc::ptr_eq(aside.stats(), fallback.stats()));
}
