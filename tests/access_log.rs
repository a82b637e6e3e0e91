//! Access log guarantees under real traffic.

use std::collections::HashMap;
use std::time::Duration;

use meetup_server::config::ServiceConfig;
use serde_json::Value;

mod common;

fn key(event: &Value) -> (String, String, String) {
    (
        event["method"].as_str().unwrap_or_default().to_string(),
        event["path"].as_str().unwrap_or_default().to_string(),
        event["remote"].as_str().unwrap_or_default().to_string(),
    )
}

#[tokio::test]
async fn test_each_request_logs_started_and_completed() {
    let logs = common::LogBuffer::default();
    let server = common::spawn_server(ServiceConfig::default(), common::telemetry(&logs)).await;

    let res = common::client().get(server.url("/welcome")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    let events = logs.events();
    assert_eq!(events.len(), 2);
    let (started, completed) = (&events[0], &events[1]);

    assert_eq!(started["message"], "Started request");
    assert_eq!(completed["message"], "Completed request");
    assert_eq!(started["level"], "info");
    assert_eq!(key(started), key(completed));
    assert_eq!(started["method"], "GET");
    assert_eq!(started["path"], "/welcome");
    assert!(started["remote"].as_str().unwrap().starts_with("127.0.0.1:"));

    assert!(started.get("duration").is_none());
    let duration = completed["duration"].as_str().unwrap();
    assert!(
        common::parse_duration(duration).is_some(),
        "unparseable duration {duration:?}"
    );
}

#[tokio::test]
async fn test_favicon_is_not_logged() {
    let logs = common::LogBuffer::default();
    let server = common::spawn_server(ServiceConfig::default(), common::telemetry(&logs)).await;

    let res = common::client().get(server.url("/favicon.ico")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert!(logs.events().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_produce_matched_pairs() {
    let logs = common::LogBuffer::default();
    let server = common::spawn_server(ServiceConfig::default(), common::telemetry(&logs)).await;

    let concurrency = 100;
    let client = common::client();
    let url = server.url("/");

    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let client = client.clone();
        let url = url.clone();
        tasks.push(tokio::spawn(async move {
            let res = client.get(&url).send().await.unwrap();
            assert_eq!(res.status(), 200);
            assert_eq!(res.text().await.unwrap(), "Hello World!");
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    // Every line parses on its own, so no line was interleaved with another.
    let events = logs.events();
    assert_eq!(events.len(), concurrency * 2);

    // Each connection has a distinct peer port: pair lines by (method, path, remote).
    let mut pairs: HashMap<(String, String, String), (usize, usize)> = HashMap::new();
    for event in &events {
        let entry = pairs.entry(key(event)).or_default();
        match event["message"].as_str().unwrap() {
            "Started request" => entry.0 += 1,
            "Completed request" => {
                assert!(common::parse_duration(event["duration"].as_str().unwrap()).is_some());
                entry.1 += 1;
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    assert_eq!(pairs.len(), concurrency);
    assert!(pairs.values().all(|&counts| counts == (1, 1)));
}

fn plain_response(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    )
}

#[tokio::test]
async fn test_client_disconnect_still_completes_request() {
    let upstream = common::start_raw_upstream(Duration::from_secs(2), plain_response("slow")).await;
    let mut config = ServiceConfig::default();
    config.upstream.url = format!("http://{}/get", upstream);
    let logs = common::LogBuffer::default();
    let server = common::spawn_server(config, common::telemetry(&logs)).await;

    let impatient = reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_millis(300))
        .build()
        .unwrap();
    assert!(impatient.get(server.url("/external")).send().await.is_err());

    let events = common::wait_for_events(&logs, 2, Duration::from_secs(5)).await;
    assert_eq!(events.len(), 2, "expected a started and a completed line");
    assert_eq!(events[0]["message"], "Started request");
    assert!(events[1]["message"]
        .as_str()
        .unwrap()
        .starts_with("Completed request"));
    assert_eq!(key(&events[0]), key(&events[1]));
    assert!(common::parse_duration(events[1]["duration"].as_str().unwrap()).is_some());
}

#[tokio::test]
async fn test_timed_out_request_is_logged_and_counted() {
    let upstream = common::start_raw_upstream(Duration::from_secs(3), plain_response("late")).await;
    let mut config = ServiceConfig::default();
    config.upstream.url = format!("http://{}/get", upstream);
    config.upstream.timeout_secs = 5;
    config.timeouts.request_secs = 1;
    let logs = common::LogBuffer::default();
    let server = common::spawn_server(config, common::telemetry(&logs)).await;
    let client = common::client();

    let res = client.get(server.url("/external")).send().await.unwrap();
    assert_eq!(res.status(), 408);
    let _ = res.text().await;

    let events = common::wait_for_events(&logs, 2, Duration::from_secs(2)).await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[1]["message"], "Completed request");

    let text = client
        .get(server.url("/metrics"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(text.contains(
        r#"http_server_requests_total{handler="external",method="GET",status="408"} 1"#
    ));
}
