use super::state::{PageState, CONSOLE_CAP, ERROR_CAP, REQUEST_CAP};
use super::tracker::PageStateTracker;
use crate::driver::mock::MockPageDriver;
use crate::driver::traits::{PageDriver, PageEvent};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_console_buffer_evicts_oldest() {
    let mut state = PageState::new();
    for i in 0..CONSOLE_CAP + 10 {
        state.push_console("log".to_string(), format!("message {}", i), None);
    }

    let console = state.console();
    assert_eq!(console.len(), CONSOLE_CAP);
    assert_eq!(console.first().unwrap().text, "message 10");
    assert_eq!(
        console.last().unwrap().text,
        format!("message {}", CONSOLE_CAP + 9)
    );
}

#[test]
fn test_error_buffer_evicts_oldest() {
    let mut state = PageState::new();
    for i in 0..ERROR_CAP + 5 {
        state.push_error(format!("error {}", i), None, None);
    }

    let errors = state.errors();
    assert_eq!(errors.len(), ERROR_CAP);
    assert_eq!(errors.first().unwrap().message, "error 5");
}

#[test]
fn test_request_backfill() {
    let mut state = PageState::new();
    state.record_request(
        "req-1".to_string(),
        "GET".to_string(),
        "https://example.com/api".to_string(),
        "fetch".to_string(),
    );
    state.record_request(
        "req-2".to_string(),
        "POST".to_string(),
        "https://example.com/submit".to_string(),
        "fetch".to_string(),
    );

    state.complete_request("req-1", 200);
    state.fail_request("req-2", "net::ERR_CONNECTION_RESET".to_string());

    let requests = state.requests();
    assert_eq!(requests[0].status, Some(200));
    assert_eq!(requests[0].ok, Some(true));
    assert_eq!(requests[1].status, None);
    assert_eq!(requests[1].ok, Some(false));
    assert_eq!(
        requests[1].failure.as_deref(),
        Some("net::ERR_CONNECTION_RESET")
    );
}

#[test]
fn test_non_2xx_status_is_not_ok() {
    let mut state = PageState::new();
    state.record_request(
        "req-1".to_string(),
        "GET".to_string(),
        "https://example.com/missing".to_string(),
        "document".to_string(),
    );
    state.complete_request("req-1", 404);

    let requests = state.requests();
    assert_eq!(requests[0].status, Some(404));
    assert_eq!(requests[0].ok, Some(false));
}

#[test]
fn test_response_for_evicted_request_is_dropped() {
    let mut state = PageState::new();
    state.record_request(
        "early".to_string(),
        "GET".to_string(),
        "https://example.com/0".to_string(),
        "fetch".to_string(),
    );
    for i in 1..=REQUEST_CAP {
        state.record_request(
            format!("req-{}", i),
            "GET".to_string(),
            format!("https://example.com/{}", i),
            "fetch".to_string(),
        );
    }

    // The first record is gone; its late response must not touch anything
    state.complete_request("early", 200);

    let requests = state.requests();
    assert_eq!(requests.len(), REQUEST_CAP);
    assert!(requests.iter().all(|r| r.status.is_none()));
    assert_eq!(requests.first().unwrap().url, "https://example.com/1");
}

#[test]
fn test_duplicate_completion_is_ignored() {
    let mut state = PageState::new();
    state.record_request(
        "req-1".to_string(),
        "GET".to_string(),
        "https://example.com/api".to_string(),
        "fetch".to_string(),
    );
    state.complete_request("req-1", 200);
    state.complete_request("req-1", 500);

    assert_eq!(state.requests()[0].status, Some(200));
}

#[test]
fn test_clear_buffers() {
    let mut state = PageState::new();
    state.push_console("log".to_string(), "hello".to_string(), None);
    state.push_error("boom".to_string(), None, None);
    state.record_request(
        "req-1".to_string(),
        "GET".to_string(),
        "https://example.com".to_string(),
        "document".to_string(),
    );

    state.clear_console();
    state.clear_errors();
    state.clear_requests();

    assert!(state.console().is_empty());
    assert!(state.errors().is_empty());
    assert!(state.requests().is_empty());
}

#[tokio::test]
async fn test_tracker_demultiplexes_events() {
    let tracker = PageStateTracker::new();
    let page = Arc::new(MockPageDriver::new("TAB1"));
    let driver: Arc<dyn PageDriver> = Arc::clone(&page) as _;

    let state = tracker.ensure_state(&driver).await.unwrap();

    page.push_event(PageEvent::Console {
        level: "warn".to_string(),
        text: "low disk space".to_string(),
        location: Some("app.js:42".to_string()),
    });
    page.push_event(PageEvent::PageError {
        message: "TypeError: x is undefined".to_string(),
        name: Some("TypeError".to_string()),
        stack: None,
    });
    page.push_event(PageEvent::RequestWillBeSent {
        request_key: "req-1".to_string(),
        method: "GET".to_string(),
        url: "https://example.com/api".to_string(),
        resource_type: "fetch".to_string(),
    });
    page.push_event(PageEvent::ResponseReceived {
        request_key: "req-1".to_string(),
        status: 201,
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let state = state.lock().unwrap();
    assert_eq!(state.console().len(), 1);
    assert_eq!(state.console()[0].level, "warn");
    assert_eq!(state.errors().len(), 1);
    assert_eq!(state.requests()[0].status, Some(201));
    assert_eq!(state.requests()[0].ok, Some(true));
}

#[tokio::test]
async fn test_tracker_instrumentation_is_idempotent() {
    let tracker = PageStateTracker::new();
    let page = Arc::new(MockPageDriver::new("TAB1"));
    let driver: Arc<dyn PageDriver> = Arc::clone(&page) as _;

    let first = tracker.ensure_state(&driver).await.unwrap();
    let second = tracker.ensure_state(&driver).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    // One subscription means one copy of each event
    page.push_event(PageEvent::Console {
        level: "log".to_string(),
        text: "once".to_string(),
        location: None,
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(first.lock().unwrap().console().len(), 1);
}

#[tokio::test]
async fn test_tracker_releases_state_on_close() {
    let tracker = PageStateTracker::new();
    let page = Arc::new(MockPageDriver::new("TAB1"));
    let driver: Arc<dyn PageDriver> = Arc::clone(&page) as _;

    tracker.ensure_state(&driver).await.unwrap();
    assert_eq!(tracker.tracked_count(), 1);
    assert!(tracker.state_for(page.page_id()).is_some());

    page.close().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(tracker.tracked_count(), 0);
    assert!(tracker.state_for(page.page_id()).is_none());
}

#[tokio::test]
async fn test_ensure_states_for_all_pages() {
    let tracker = PageStateTracker::new();
    let pages: Vec<Arc<dyn PageDriver>> = vec![
        Arc::new(MockPageDriver::new("TAB1")),
        Arc::new(MockPageDriver::new("TAB2")),
    ];

    let states = tracker.ensure_states(&pages).await.unwrap();
    assert_eq!(states.len(), 2);
    assert_eq!(tracker.tracked_count(), 2);

    // Re-running keeps the same state handles
    let again = tracker.ensure_states(&pages).await.unwrap();
    for ((_, first), (_, second)) in states.iter().zip(again.iter()) {
        assert!(Arc::ptr_eq(first, second));
    }
}

#[tokio::test]
async fn test_separate_pages_have_separate_state() {
    let tracker = PageStateTracker::new();
    let page_a = Arc::new(MockPageDriver::new("TAB1"));
    let page_b = Arc::new(MockPageDriver::new("TAB2"));
    let driver_a: Arc<dyn PageDriver> = Arc::clone(&page_a) as _;
    let driver_b: Arc<dyn PageDriver> = Arc::clone(&page_b) as _;

    let state_a = tracker.ensure_state(&driver_a).await.unwrap();
    let state_b = tracker.ensure_state(&driver_b).await.unwrap();

    page_a.push_event(PageEvent::Console {
        level: "log".to_string(),
        text: "only tab one".to_string(),
        location: None,
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(state_a.lock().unwrap().console().len(), 1);
    assert!(state_b.lock().unwrap().console().is_empty());
}
