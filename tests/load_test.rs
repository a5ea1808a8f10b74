//! Concurrent load against the rate limit gate.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

mod common;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_clients_never_exceed_limit() {
    let backend = common::start_echo_backend().await;
    let mut config = common::proxy_config(backend);
    config.rate_limit.requests_per_window = 25;
    config.rate_limit.window_secs = 60;
    let proxy = common::start_proxy(config).await;

    let concurrency = 10;
    let requests_per_task = 10;
    let accepted = Arc::new(AtomicUsize::new(0));
    let limited = Arc::new(AtomicUsize::new(0));

    let client = common::client();
    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let client = client.clone();
        let url = proxy.url("/load");
        let accepted = accepted.clone();
        let limited = limited.clone();
        tasks.push(tokio::spawn(async move {
            for _ in 0..requests_per_task {
                let res = client.get(&url).send().await.unwrap();
                match res.status().as_u16() {
                    200 => accepted.fetch_add(1, Ordering::SeqCst),
                    429 => limited.fetch_add(1, Ordering::SeqCst),
                    other => panic!("unexpected status {}", other),
                };
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(accepted.load(Ordering::SeqCst), 25);
    assert_eq!(
        limited.load(Ordering::SeqCst),
        concurrency * requests_per_task - 25
    );

    proxy.shutdown.trigger();
}
