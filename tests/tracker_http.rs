use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use tokio::net::TcpListener;

use ratio_spoof::tracker::{Announcer, HttpTracker, RetryPolicy};
use ratio_spoof::SpoofError;

const OK_BODY: &[u8] = b"d8:completei5e10:incompletei2e8:intervali900e12:min intervali1200ee";

#[derive(Clone, Default)]
struct Hits {
    /// (path, query, user agent) per request.
    log: Arc<Mutex<Vec<(String, String, String)>>>,
}

impl Hits {
    fn record(&self, path: &str, query: Option<String>, headers: &HeaderMap) {
        let user_agent = headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        self.log
            .lock()
            .push((path.to_string(), query.unwrap_or_default(), user_agent));
    }

    fn paths(&self) -> Vec<String> {
        self.log.lock().iter().map(|(p, _, _)| p.clone()).collect()
    }
}

async fn announce_ok(
    State(hits): State<Hits>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> impl IntoResponse {
    hits.record("/ok", query, &headers);
    OK_BODY.to_vec()
}

async fn announce_rejected(
    State(hits): State<Hits>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> impl IntoResponse {
    hits.record("/rejected", query, &headers);
    b"d14:failure reason12:invalid hashe".to_vec()
}

async fn announce_broken(
    State(hits): State<Hits>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> impl IntoResponse {
    hits.record("/broken", query, &headers);
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

async fn start_server() -> (SocketAddr, Hits) {
    let hits = Hits::default();
    let app = Router::new()
        .route("/ok", get(announce_ok))
        .route("/rejected", get(announce_rejected))
        .route("/broken", get(announce_broken))
        .with_state(hits.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, hits)
}

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(40),
        max_attempts,
    }
}

fn headers() -> HashMap<String, String> {
    HashMap::from([("User-Agent".to_string(), "qBittorrent/5.0.4".to_string())])
}

fn tracker(addr: SocketAddr, paths: &[&str], max_attempts: u32) -> HttpTracker {
    let urls = paths
        .iter()
        .map(|p| format!("http://{}{}", addr, p))
        .collect();
    HttpTracker::new(urls, fast_policy(max_attempts)).unwrap()
}

#[tokio::test]
async fn test_successful_announce() {
    let (addr, hits) = start_server().await;
    let tracker = tracker(addr, &["/ok"], 3);

    let response = tracker
        .announce("info_hash=%AB&event=started", &headers(), true)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(response.interval, 1200);
    assert_eq!(response.seeders, 5);
    assert_eq!(response.leechers, 2);
    assert_eq!(response.warning, None);

    let log = hits.log.lock();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].1, "info_hash=%AB&event=started");
    assert_eq!(log[0].2, "qBittorrent/5.0.4");
}

#[tokio::test]
async fn test_failure_reason_is_fatal() {
    let (addr, hits) = start_server().await;
    let tracker = tracker(addr, &["/rejected"], 5);

    let err = tracker.announce("a=1", &headers(), true).await.unwrap_err();
    match err {
        SpoofError::TrackerProtocol(message) => assert!(message.contains("invalid hash")),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(hits.paths().len(), 1);
}

#[tokio::test]
async fn test_server_errors_exhaust_retry_budget() {
    let (addr, hits) = start_server().await;
    let tracker = tracker(addr, &["/broken"], 3);

    let err = tracker.announce("a=1", &headers(), true).await.unwrap_err();
    match err {
        SpoofError::TrackerUnreachable { attempts, last_error } => {
            assert_eq!(attempts, 3);
            assert!(last_error.contains("500"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(hits.paths().len(), 3);
}

#[tokio::test]
async fn test_best_effort_announce_swallows_failures() {
    let (addr, hits) = start_server().await;

    let broken = tracker(addr, &["/broken"], 10);
    assert_eq!(broken.announce("a=1", &headers(), false).await.unwrap(), None);

    let rejected = tracker(addr, &["/rejected"], 10);
    assert_eq!(rejected.announce("a=1", &headers(), false).await.unwrap(), None);

    assert_eq!(hits.paths(), vec!["/broken", "/rejected"]);
}

#[tokio::test]
async fn test_failing_tracker_rotates_to_next_url() {
    let (addr, hits) = start_server().await;
    let tracker = tracker(addr, &["/broken", "/ok"], 5);

    let response = tracker.announce("a=1", &headers(), true).await.unwrap();
    assert!(response.is_some());
    assert_eq!(hits.paths(), vec!["/broken", "/ok"]);
    assert!(tracker.current_url().ends_with("/ok"));
}

#[tokio::test]
async fn test_existing_query_string_is_extended() {
    let (addr, hits) = start_server().await;
    let tracker = tracker(addr, &["/ok?passkey=abc"], 1);

    tracker.announce("event=started", &headers(), true).await.unwrap();
    assert_eq!(hits.log.lock()[0].1, "passkey=abc&event=started");
}
