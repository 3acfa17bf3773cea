//! Load testing for the gateway.

use std::net::SocketAddr;
use std::time::Instant;
use axum::http::StatusCode;
use futures_util::future::join_all;

use traffic_gateway::config::RateLimitConfig;

mod common;

#[tokio::test]
async fn test_load_performance() {
    let backend_addr: SocketAddr = "127.0.0.1:29081".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:29082".parse().unwrap();
    common::start_mock_backend(backend_addr, "Hello from backend").await;

    let mut config = common::gateway_config(proxy_addr, vec![common::instance("b1", backend_addr)]);
    config.rate_limit.capacity = 100_000;
    let (shutdown, _updates) = common::start_gateway(config).await;

    let concurrency = 20;
    let requests_per_task = 50;
    let total_requests = concurrency * requests_per_task;

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let start = Instant::now();

    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let client = client.clone();
        let url = format!("http://{}", proxy_addr);
        tasks.push(tokio::spawn(async move {
            let mut latencies = Vec::new();
            for _ in 0..requests_per_task {
                let req_start = Instant::now();
                if let Ok(res) = client.get(&url).send().await {
                    if res.status().is_success() {
                        latencies.push(req_start.elapsed());
                    }
                }
            }
            latencies
        }));
    }

    let mut all_latencies = Vec::new();
    for task in tasks {
        all_latencies.extend(task.await.unwrap());
    }

    let duration = start.elapsed();
    let rps = total_requests as f64 / duration.as_secs_f64();

    if all_latencies.is_empty() {
        panic!("No successful requests recorded");
    }

    all_latencies.sort();
    let p50 = all_latencies[all_latencies.len() / 2];
    let p99 = all_latencies[(all_latencies.len() as f64 * 0.99) as usize];

    println!("\n--- Load Test Results ---");
    println!("Total Requests: {}", total_requests);
    println!("Concurrency:    {}", concurrency);
    println!("Total Duration: {:?}", duration);
    println!("Requests/sec:   {:.2}", rps);
    println!("P50 Latency:    {:?}", p50);
    println!("P99 Latency:    {:?}", p99);
    println!("Success Rate:   {}/{}", all_latencies.len(), total_requests);
    println!("-------------------------\n");

    shutdown.trigger();
}

#[tokio::test]
async fn test_concurrent_admission_is_bounded() {
    let backend_addr: SocketAddr = "127.0.0.1:29181".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:29182".parse().unwrap();
    common::start_mock_backend(backend_addr, "ok").await;

    let mut config = common::gateway_config(proxy_addr, vec![common::instance("b1", backend_addr)]);
    config.services[0].rate_limit = Some(RateLimitConfig { capacity: 50, refill_period_ms: 60_000 });
    let (shutdown, _updates) = common::start_gateway(config).await;

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let url = format!("http://{}/", proxy_addr);
    let requests = (0..200).map(|_| {
        let client = client.clone();
        let url = url.clone();
        async move { client.get(&url).send().await.unwrap().status() }
    });
    let statuses = join_all(requests).await;

    let mut admitted = 0;
    let mut limited = 0;
    for status in statuses {
        match status {
            StatusCode::OK => admitted += 1,
            StatusCode::TOO_MANY_REQUESTS => limited += 1,
            other => panic!("unexpected status {other}"),
        }
    }
    assert_eq!(admitted, 50);
    assert_eq!(limited, 150);

    shutdown.trigger();
}
