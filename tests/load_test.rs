//! Load testing over a real TCP listener.

use std::time::{Duration, Instant};

use tokio::net::TcpListener;

use discord_sync_bot::http::HttpServer;
use discord_sync_bot::lifecycle::Shutdown;

mod common;

use common::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_load_performance() {
    // 1. Start the bot on an ephemeral port
    let h = Harness::new();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(&config(), h.state.clone());
    let server_task = tokio::spawn(server.run(listener, shutdown.wait()));

    // 2. Run concurrent signed pings, one client IP per task
    let concurrency = 20;
    let requests_per_task = 50;
    let total_requests = concurrency * requests_per_task;

    let client = reqwest::Client::new();
    let url = format!("http://{}/", addr);
    let ts = h.now_secs();
    let body = ping_body();
    let signature = sign(&ts, body.as_bytes());
    let start = Instant::now();

    let mut tasks = Vec::new();
    for task_id in 0..concurrency {
        let client = client.clone();
        let url = url.clone();
        let ts = ts.clone();
        let body = body.clone();
        let signature = signature.clone();
        tasks.push(tokio::spawn(async move {
            let mut latencies = Vec::new();
            for _ in 0..requests_per_task {
                let req_start = Instant::now();
                let result = client
                    .post(&url)
                    .header("content-type", "application/json")
                    .header("x-signature-ed25519", &signature)
                    .header("x-signature-timestamp", &ts)
                    .header("x-forwarded-for", format!("10.0.0.{}", task_id))
                    .body(body.clone())
                    .send()
                    .await;
                if let Ok(res) = result {
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

    assert_eq!(all_latencies.len(), total_requests, "every request should succeed");

    all_latencies.sort();
    let p50 = all_latencies[all_latencies.len() / 2];
    let p95 = all_latencies[(all_latencies.len() as f64 * 0.95) as usize];
    let p99 = all_latencies[(all_latencies.len() as f64 * 0.99) as usize];

    println!("\n--- Load Test Results ---");
    println!("Total Requests: {}", total_requests);
    println!("Concurrency:    {}", concurrency);
    println!("Total Duration: {:?}", duration);
    println!("Requests/sec:   {:.2}", rps);
    println!("P50 Latency:    {:?}", p50);
    println!("P95 Latency:    {:?}", p95);
    println!("P99 Latency:    {:?}", p99);
    println!("-------------------------\n");

    // 3. One more request from a client that already used its window
    let res = client
        .post(&url)
        .header("content-type", "application/json")
        .header("x-signature-ed25519", &signature)
        .header("x-signature-timestamp", &ts)
        .header("x-forwarded-for", "10.0.0.0")
        .body(body.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK, "50 requests stay under the limit");

    for _ in 0..50 {
        client
            .post(&url)
            .header("content-type", "application/json")
            .header("x-signature-ed25519", &signature)
            .header("x-signature-timestamp", &ts)
            .header("x-forwarded-for", "10.0.0.0")
            .body(body.clone())
            .send()
            .await
            .unwrap();
    }
    let res = client
        .post(&url)
        .header("content-type", "application/json")
        .header("x-signature-ed25519", &signature)
        .header("x-signature-timestamp", &ts)
        .header("x-forwarded-for", "10.0.0.0")
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::TOO_MANY_REQUESTS);

    // 4. Graceful shutdown
    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), server_task)
        .await
        .expect("server stops after shutdown")
        .unwrap()
        .unwrap();
}
