//! Integration tests for watch list batches
//!
//! These tests use wiremock to serve listing pages over plain HTTP and run the
//! real fetch engine, diff and watch history end-to-end.

use std::net::TcpListener;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tokio::runtime::Runtime;
use watchlist::batch::{Item, WatchList, WatchQuery};
use watchlist::config::{Config, FailurePolicy};
use watchlist::fetch::{FetchError, Scheme};
use watchlist::history::history_path;
use watchlist::{run_watch_list, WatchError, WatchHistory};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Query whose page lists one item id per line
struct IdListQuery {
    path: &'static str,
}

impl WatchQuery for IdListQuery {
    fn label(&self) -> String {
        self.path.trim_start_matches('/').to_string()
    }

    fn target(&self) -> String {
        self.path.to_string()
    }

    fn extract(&self, payload: &[u8]) -> Vec<Item> {
        String::from_utf8_lossy(payload)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(Item::new)
            .collect()
    }
}

fn id_page(ids: impl IntoIterator<Item = String>) -> String {
    ids.into_iter().collect::<Vec<_>>().join("\n")
}

/// Mounts a page on the mock server, optionally answering after `delay`
fn mount_page(rt: &Runtime, server: &MockServer, page: &str, body: String, delay: Duration) {
    rt.block_on(
        Mock::given(method("GET"))
            .and(path(page))
            .respond_with(ResponseTemplate::new(200).set_body_string(body).set_delay(delay))
            .mount(server),
    );
}

fn create_watch_list(port: u16, history_dir: &Path, paths: &[&'static str]) -> WatchList {
    let mut list = WatchList::new(
        "test",
        Scheme::Http,
        "127.0.0.1",
        history_path(history_dir, "test"),
    )
    .with_port(port);
    for path in paths {
        list.push(IdListQuery { path: *path });
    }
    list
}

fn create_test_config(policy: FailurePolicy) -> Config {
    let mut config = Config::default();
    config.engine.workers = 2;
    config.engine.stage_timeout_ms = Some(5_000);
    config.batch.failure_policy = policy;
    config
}

/// A local port nothing listens on
fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let port = listener.local_addr().expect("No local address").port();
    drop(listener);
    port
}

fn item_ids(items: &[Item]) -> Vec<&str> {
    items.iter().map(|item| item.id.as_str()).collect()
}

#[test]
fn test_outcome_follows_submission_order() {
    let rt = Runtime::new().expect("Failed to create runtime");
    let server = rt.block_on(MockServer::start());
    let dir = TempDir::new().expect("Failed to create temp dir");

    // The first query answers last
    mount_page(&rt, &server, "/slow", "s1\ns2".to_string(), Duration::from_millis(400));
    mount_page(&rt, &server, "/medium", "m1".to_string(), Duration::from_millis(150));
    mount_page(&rt, &server, "/fast", "f1".to_string(), Duration::ZERO);

    let list = create_watch_list(
        server.address().port(),
        dir.path(),
        &["/slow", "/medium", "/fast"],
    );
    let outcome = run_watch_list(&create_test_config(FailurePolicy::FailFast), &list)
        .expect("Batch failed");

    assert_eq!(outcome.labels(), vec!["slow", "medium", "fast"]);
    assert_eq!(outcome.get("slow").map(item_ids), Some(vec!["s1", "s2"]));
    assert_eq!(outcome.new_item_count(), 4);
}

#[test]
fn test_first_run_then_incremental_run() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(FailurePolicy::FailFast);

    // First run: 15 listings, only the first 10 reported, all 15 remembered
    {
        let rt = Runtime::new().expect("Failed to create runtime");
        let server = rt.block_on(MockServer::start());
        mount_page(
            &rt,
            &server,
            "/search",
            id_page((0..15).map(|n| format!("a{n}"))),
            Duration::ZERO,
        );

        let list = create_watch_list(server.address().port(), dir.path(), &["/search"]);
        let outcome = run_watch_list(&config, &list).expect("First run failed");

        let reported = outcome.get("search").expect("No items reported");
        assert_eq!(reported.len(), 10);
        assert_eq!(reported[0].id, "a0");
        assert_eq!(reported[9].id, "a9");

        let history = WatchHistory::load(&list.history_path).expect("History not saved");
        assert_eq!(history.len(), 15);
        assert!(history.contains("a14"));
    }

    // Second run: one listing disappeared, two appeared
    {
        let rt = Runtime::new().expect("Failed to create runtime");
        let server = rt.block_on(MockServer::start());
        mount_page(
            &rt,
            &server,
            "/search",
            id_page((1..15).map(|n| format!("a{n}")).chain(["b1".to_string(), "b2".to_string()])),
            Duration::ZERO,
        );

        let list = create_watch_list(server.address().port(), dir.path(), &["/search"]);
        let outcome = run_watch_list(&config, &list).expect("Second run failed");

        assert_eq!(outcome.get("search").map(item_ids), Some(vec!["b1", "b2"]));

        let history = WatchHistory::load(&list.history_path).expect("History not saved");
        assert_eq!(history.len(), 17);
        assert!(history.contains("a0"));
    }

    // Third run: nothing new
    {
        let rt = Runtime::new().expect("Failed to create runtime");
        let server = rt.block_on(MockServer::start());
        mount_page(&rt, &server, "/search", "b1\nb2".to_string(), Duration::ZERO);

        let list = create_watch_list(server.address().port(), dir.path(), &["/search"]);
        let before = std::fs::read(&list.history_path).expect("Failed to read history");
        let outcome = run_watch_list(&config, &list).expect("Third run failed");

        assert!(outcome.is_empty());
        let after = std::fs::read(&list.history_path).expect("Failed to read history");
        assert_eq!(before, after);
    }
}

#[test]
fn test_first_run_remembers_every_query() {
    let rt = Runtime::new().expect("Failed to create runtime");
    let server = rt.block_on(MockServer::start());
    let dir = TempDir::new().expect("Failed to create temp dir");

    mount_page(&rt, &server, "/a", "id1\nid2".to_string(), Duration::ZERO);
    mount_page(&rt, &server, "/b", "id3".to_string(), Duration::ZERO);

    let list = create_watch_list(server.address().port(), dir.path(), &["/a", "/b"]);
    let outcome = run_watch_list(&create_test_config(FailurePolicy::FailFast), &list)
        .expect("Batch failed");

    assert_eq!(outcome.get("a").map(item_ids), Some(vec!["id1", "id2"]));
    assert_eq!(outcome.get("b").map(item_ids), Some(vec!["id3"]));

    let history = WatchHistory::load(&list.history_path).expect("History not saved");
    assert_eq!(history.iter().collect::<Vec<_>>(), vec!["id1", "id2", "id3"]);
}

#[test]
fn test_not_found_page_yields_no_items() {
    let rt = Runtime::new().expect("Failed to create runtime");
    let server = rt.block_on(MockServer::start());
    let dir = TempDir::new().expect("Failed to create temp dir");

    mount_page(&rt, &server, "/found", "x1".to_string(), Duration::ZERO);
    // "/missing" is not mounted; wiremock answers 404 with an empty body

    let list = create_watch_list(server.address().port(), dir.path(), &["/missing", "/found"]);
    let outcome = run_watch_list(&create_test_config(FailurePolicy::FailFast), &list)
        .expect("A 404 must not fail the batch");

    assert_eq!(outcome.labels(), vec!["found"]);
    assert!(outcome.failures().is_empty());
}

#[test]
fn test_fail_fast_keeps_previous_history() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let list = create_watch_list(closed_port(), dir.path(), &["/a", "/b"]);

    let previous: WatchHistory = ["known".to_string()].into_iter().collect();
    previous.save(&list.history_path).expect("Failed to seed history");
    let before = std::fs::read_to_string(&list.history_path).expect("Failed to read history");

    let result = run_watch_list(&create_test_config(FailurePolicy::FailFast), &list);

    match result {
        Err(WatchError::Network(FetchError::Connect { target, .. })) => assert_eq!(target, "/a"),
        other => panic!("Expected a connect error for the first query, got {:?}", other),
    }
    let after = std::fs::read_to_string(&list.history_path).expect("Failed to read history");
    assert_eq!(before, after);
}

#[test]
fn test_fail_fast_first_run_writes_no_history() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let list = create_watch_list(closed_port(), dir.path(), &["/a"]);

    let result = run_watch_list(&create_test_config(FailurePolicy::FailFast), &list);

    assert!(matches!(result, Err(WatchError::Network(_))));
    assert!(!list.history_path.exists());
}

#[test]
fn test_best_effort_records_failures_and_saves_history() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let list = create_watch_list(closed_port(), dir.path(), &["/a", "/b"]);

    let outcome = run_watch_list(&create_test_config(FailurePolicy::BestEffort), &list)
        .expect("Best effort must not fail the batch");

    assert!(outcome.is_empty());
    let failed: Vec<&str> = outcome.failures().iter().map(|f| f.label.as_str()).collect();
    assert_eq!(failed, vec!["a", "b"]);
    assert!(list.history_path.exists());
    assert!(WatchHistory::load(&list.history_path)
        .expect("History not saved")
        .is_empty());
}

#[test]
fn test_empty_watch_list_fetches_nothing() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let list = create_watch_list(closed_port(), dir.path(), &[]);

    let outcome = run_watch_list(&create_test_config(FailurePolicy::FailFast), &list)
        .expect("Empty list failed");

    assert!(outcome.is_empty());
}
