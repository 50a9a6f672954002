//! Concurrent load through a single shared client.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use resilient_fetch::{ClientConfig, HttpClient, RequestOptions};

mod common;
use common::MockReply;

#[tokio::test]
async fn test_concurrent_requests_share_cache() {
    let hits = Arc::new(AtomicU32::new(0));
    let revalidations = Arc::new(AtomicU32::new(0));
    let (h, r) = (hits.clone(), revalidations.clone());
    let addr = common::start_programmable_backend(move |req| {
        h.fetch_add(1, Ordering::SeqCst);
        let conditional = req.header("if-none-match") == Some("\"stable\"");
        if conditional {
            r.fetch_add(1, Ordering::SeqCst);
        }
        async move {
            if conditional {
                MockReply::new(304, "").header("ETag", "\"stable\"")
            } else {
                MockReply::new(200, "{\"events\":[]}").header("ETag", "\"stable\"")
            }
        }
    })
    .await;

    let mut config = ClientConfig::default();
    config.request.system_proxy = false;
    let client = Arc::new(HttpClient::new(config).unwrap());
    let url = format!("http://{}/events", addr);

    // Warm the cache so every later request is conditional
    client.fetch_retry(&url, RequestOptions::new()).await.unwrap();

    let concurrency = 10;
    let requests_per_task = 10;
    let start = Instant::now();

    let mut handles = Vec::new();
    for _ in 0..concurrency {
        let client = client.clone();
        let url = url.clone();
        handles.push(tokio::spawn(async move {
            let mut ok = 0;
            for _ in 0..requests_per_task {
                let value: serde_json::Value = client.get_json(&url, RequestOptions::new()).await.unwrap();
                if value == serde_json::json!({"events": []}) {
                    ok += 1;
                }
            }
            ok
        }));
    }

    let mut total_ok = 0;
    for handle in handles {
        total_ok += handle.await.unwrap();
    }
    let elapsed = start.elapsed();

    println!(
        "{} requests in {:?} ({:.1} req/s)",
        concurrency * requests_per_task,
        elapsed,
        (concurrency * requests_per_task) as f64 / elapsed.as_secs_f64()
    );

    assert_eq!(total_ok, concurrency * requests_per_task);
    // No de-duplication: every call reaches the backend
    assert_eq!(hits.load(Ordering::SeqCst), 1 + (concurrency * requests_per_task) as u32);
    assert_eq!(revalidations.load(Ordering::SeqCst), (concurrency * requests_per_task) as u32);
    assert_eq!(client.cache().len(), 1);
    assert!(elapsed < Duration::from_secs(30));
}

#[tokio::test]
async fn test_concurrent_writers_last_one_wins() {
    let version = Arc::new(AtomicU32::new(0));
    let v = version.clone();
    let addr = common::start_programmable_backend(move |_| {
        let n = v.fetch_add(1, Ordering::SeqCst);
        async move {
            let etag = format!("\"v{}\"", n);
            MockReply::new(200, format!("body-{}", n)).header("ETag", &etag)
        }
    })
    .await;

    let mut config = ClientConfig::default();
    config.request.system_proxy = false;
    let client = Arc::new(HttpClient::new(config).unwrap());
    let url = format!("http://{}/race", addr);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let client = client.clone();
        let url = url.clone();
        handles.push(tokio::spawn(async move {
            client.fetch_retry(&url, RequestOptions::new()).await.unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // One entry survives and its body matches its own ETag
    let entry = client.cache().get(&url).unwrap();
    let n = entry.etag.trim_matches('"').trim_start_matches('v');
    assert_eq!(entry.body.as_ref(), format!("body-{}", n).as_bytes());
    assert_eq!(client.cache().len(), 1);
}
