//! Load testing for the observability stack.

use std::collections::HashSet;
use std::time::Instant;

use request_observability::config::ObservabilityConfig;

mod common;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_operation_ids_unique_under_load() {
    let (addr, shutdown) = common::start_server(ObservabilityConfig::default()).await;

    let concurrency = 20;
    let requests_per_task = 25;
    let total_requests = concurrency * requests_per_task;

    let client = reqwest::Client::new();
    let start = Instant::now();

    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let client = client.clone();
        let url = format!("http://{}/subscriptions/s/resourceGroups/g", addr);
        tasks.push(tokio::spawn(async move {
            let mut ids = Vec::new();
            for _ in 0..requests_per_task {
                let response = client.get(&url).send().await.unwrap();
                assert!(response.status().is_success());
                let header = response
                    .headers()
                    .get("x-ms-acs-operation-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                let body = response.text().await.unwrap();
                assert_eq!(header, body, "mirrored id differs from handler view");
                ids.push(body);
            }
            ids
        }));
    }

    let mut all_ids = HashSet::new();
    for task in tasks {
        for id in task.await.unwrap() {
            assert!(all_ids.insert(id), "duplicate operation id");
        }
    }
    assert_eq!(all_ids.len(), total_requests);

    let duration = start.elapsed();
    println!("\n--- Load Test Results ---");
    println!("Total Requests: {}", total_requests);
    println!("Concurrency:    {}", concurrency);
    println!("Total Duration: {:?}", duration);
    println!(
        "Requests/sec:   {:.2}",
        total_requests as f64 / duration.as_secs_f64()
    );
    println!("-------------------------\n");

    let _ = shutdown.send(());
}
