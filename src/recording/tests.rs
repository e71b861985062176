use super::executor::PageExecutor;
use super::recorder::{ActionCapture, Recorder};
use super::replay::{ActionExecutor, Replayer};
use super::store::RecordingStore;
use super::types::{ActionKind, ActionRecording, RecordedAction};
use crate::driver::mock::MockPageDriver;
use crate::driver::traits::PageDriver;
use crate::events::{EventHub, SessionEvent};
use crate::page::PageState;
use crate::refs::{RefCache, RoleRefEntry, RoleRefSnapshot, SnapshotMode, TargetKey};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

fn action(kind: ActionKind, offset_ms: u64, value: Option<&str>) -> RecordedAction {
    RecordedAction {
        kind,
        selector: None,
        value: value.map(|v| v.to_string()),
        coordinates: None,
        offset_ms,
        description: None,
    }
}

fn recording_with(actions: Vec<RecordedAction>) -> ActionRecording {
    ActionRecording {
        id: "rec_test".to_string(),
        name: "test".to_string(),
        description: None,
        created_at: Utc::now(),
        duration_ms: actions.last().map(|a| a.offset_ms).unwrap_or(0),
        actions,
        start_url: None,
        viewport: None,
    }
}

/// Executor that counts calls and fails on a marked value
#[derive(Default)]
struct ScriptedExecutor {
    calls: AtomicUsize,
    log: Mutex<Vec<String>>,
}

#[async_trait]
impl ActionExecutor for ScriptedExecutor {
    async fn execute(&self, action: &RecordedAction) -> Result<()> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.log
            .lock()
            .unwrap()
            .push(action.value.clone().unwrap_or_default());
        if action.value.as_deref() == Some("fail") {
            return Err(Error::action_failed("element vanished"));
        }
        Ok(())
    }
}

async fn temp_store() -> (tempfile::TempDir, RecordingStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = RecordingStore::open(dir.path()).await.unwrap();
    (dir, store)
}

#[tokio::test]
async fn test_record_stop_and_persist() {
    let (_dir, store) = temp_store().await;
    let recorder = Recorder::new(store.clone(), Arc::new(EventHub::default()));

    assert!(!recorder.is_recording());
    let id = recorder.start("login flow", Some("https://example.com".to_string()), None);
    assert!(recorder.is_recording());

    recorder.record_action(
        ActionCapture::new(ActionKind::Click).selector("@e1"),
    );
    tokio::time::sleep(Duration::from_millis(15)).await;
    recorder.record_action(
        ActionCapture::new(ActionKind::Type)
            .selector("@e2")
            .value("admin"),
    );
    tokio::time::sleep(Duration::from_millis(15)).await;
    recorder.record_action(ActionCapture::new(ActionKind::Screenshot));

    let recording = recorder
        .stop(Some("logs in as admin".to_string()))
        .await
        .unwrap()
        .unwrap();
    assert!(!recorder.is_recording());
    assert_eq!(recording.id, id);
    assert_eq!(recording.description.as_deref(), Some("logs in as admin"));
    assert_eq!(recording.actions.len(), 3);

    // Offsets are relative to session start and non-decreasing
    assert!(recording.actions[0].offset_ms <= recording.actions[1].offset_ms);
    assert!(recording.actions[1].offset_ms <= recording.actions[2].offset_ms);
    assert!(recording.actions[2].offset_ms >= 30);

    let loaded = store.load(&id).await.unwrap();
    assert_eq!(loaded.name, "login flow");
    assert_eq!(loaded.actions.len(), 3);
    assert_eq!(loaded.actions[1].value.as_deref(), Some("admin"));
}

#[tokio::test]
async fn test_actions_while_idle_are_dropped() {
    let (_dir, store) = temp_store().await;
    let recorder = Recorder::new(store, Arc::new(EventHub::default()));

    recorder.record_action(ActionCapture::new(ActionKind::Click).selector("@e1"));

    recorder.start("real session", None, None);
    recorder.record_action(ActionCapture::new(ActionKind::Navigate).value("https://a.test"));
    let recording = recorder.stop(None).await.unwrap().unwrap();

    assert_eq!(recording.actions.len(), 1);
    assert_eq!(recording.actions[0].kind, ActionKind::Navigate);
}

#[tokio::test]
async fn test_stop_without_session_returns_none() {
    let (_dir, store) = temp_store().await;
    let recorder = Recorder::new(store, Arc::new(EventHub::default()));
    assert!(recorder.stop(None).await.unwrap().is_none());
}

#[tokio::test]
async fn test_start_discards_unfinished_session() {
    let (_dir, store) = temp_store().await;
    let recorder = Recorder::new(store.clone(), Arc::new(EventHub::default()));

    let first = recorder.start("first", None, None);
    recorder.record_action(ActionCapture::new(ActionKind::Click).selector("@e1"));

    let second = recorder.start("second", None, None);
    assert_ne!(first, second);
    assert_eq!(recorder.active_id(), Some(second.clone()));

    let recording = recorder.stop(None).await.unwrap().unwrap();
    assert_eq!(recording.id, second);
    assert!(recording.actions.is_empty());

    // The discarded session was never persisted
    assert!(matches!(
        store.load(&first).await,
        Err(Error::RecordingNotFound(_))
    ));
}

#[tokio::test]
async fn test_store_list_newest_first_and_delete() {
    let (_dir, store) = temp_store().await;

    let mut old = recording_with(vec![]);
    old.id = "rec_old".to_string();
    old.created_at = Utc::now() - chrono::Duration::hours(1);
    let mut new = recording_with(vec![]);
    new.id = "rec_new".to_string();
    store.save(&old).await.unwrap();
    store.save(&new).await.unwrap();

    let listed = store.list().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, "rec_new");
    assert_eq!(listed[1].id, "rec_old");

    store.delete("rec_old").await.unwrap();
    assert_eq!(store.list().await.unwrap().len(), 1);

    // Deleting again is fine
    store.delete("rec_old").await.unwrap();
}

#[tokio::test]
async fn test_store_list_skips_corrupt_files() {
    let (dir, store) = temp_store().await;
    store.save(&recording_with(vec![])).await.unwrap();
    tokio::fs::write(dir.path().join("broken.json"), "{not json")
        .await
        .unwrap();

    let listed = store.list().await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn test_replay_rejects_non_positive_speed() {
    let replayer = Replayer::new(Arc::new(EventHub::default()));
    let recording = recording_with(vec![action(ActionKind::Wait, 0, None)]);
    let executor = ScriptedExecutor::default();

    for speed in [0.0, -1.0, f64::NAN] {
        assert!(matches!(
            replayer.replay(&recording, speed, &executor).await,
            Err(Error::InvalidArgument(_))
        ));
    }
    assert_eq!(executor.calls.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn test_replay_reproduces_pacing_scaled_by_speed() {
    let replayer = Replayer::new(Arc::new(EventHub::default()));
    let recording = recording_with(vec![
        action(ActionKind::Wait, 0, Some("a")),
        action(ActionKind::Wait, 120, Some("b")),
        action(ActionKind::Wait, 240, Some("c")),
    ]);
    let executor = ScriptedExecutor::default();

    let start = Instant::now();
    let report = replayer.replay(&recording, 1.0, &executor).await.unwrap();
    let full = start.elapsed();
    assert!(report.ok);
    assert!(full >= Duration::from_millis(240), "took {:?}", full);

    let start = Instant::now();
    replayer.replay(&recording, 2.0, &executor).await.unwrap();
    let halved = start.elapsed();
    assert!(halved >= Duration::from_millis(120), "took {:?}", halved);
    assert!(halved < full, "2x replay ({:?}) not faster than 1x ({:?})", halved, full);
}

#[tokio::test]
async fn test_replay_stored_loads_from_store() {
    let (_dir, store) = temp_store().await;
    let recording = recording_with(vec![
        action(ActionKind::Navigate, 0, Some("https://example.com")),
        action(ActionKind::Screenshot, 5, None),
    ]);
    store.save(&recording).await.unwrap();

    let replayer = Replayer::new(Arc::new(EventHub::default()));
    let executor = ScriptedExecutor::default();
    let report = replayer
        .replay_stored(&store, "rec_test", 10.0, &executor)
        .await
        .unwrap();
    assert!(report.ok);
    assert_eq!(report.actions_executed, 2);

    assert!(matches!(
        replayer
            .replay_stored(&store, "rec_missing", 1.0, &executor)
            .await,
        Err(Error::RecordingNotFound(_))
    ));
}

#[tokio::test]
async fn test_replay_continues_past_failures() {
    let hub = Arc::new(EventHub::default());
    let mut events = hub.subscribe();
    let replayer = Replayer::new(Arc::clone(&hub));
    let recording = recording_with(vec![
        action(ActionKind::Click, 0, Some("first")),
        action(ActionKind::Click, 1, Some("fail")),
        action(ActionKind::Click, 2, Some("last")),
    ]);
    let executor = ScriptedExecutor::default();

    let report = replayer.replay(&recording, 10.0, &executor).await.unwrap();

    assert!(!report.ok);
    assert_eq!(report.actions_executed, 2);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].index, 1);
    assert!(report.errors[0].message.contains("element vanished"));

    // All three actions were attempted, in order
    assert_eq!(
        executor.log.lock().unwrap().as_slice(),
        ["first", "fail", "last"]
    );

    // The completion event reflects the aggregate outcome
    let mut completed = None;
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::ReplayCompleted {
            ok,
            actions_executed,
            ..
        } = event
        {
            completed = Some((ok, actions_executed));
        }
    }
    assert_eq!(completed, Some((false, 2)));
}

#[tokio::test]
async fn test_page_executor_resolves_refs() {
    let page = Arc::new(MockPageDriver::new("TAB1"));
    let refs = Arc::new(RefCache::new());
    let state = Arc::new(Mutex::new(PageState::new()));

    let mut snapshot = RoleRefSnapshot::new(SnapshotMode::Role);
    snapshot.refs.insert(
        "e1".to_string(),
        RoleRefEntry {
            role: "button".to_string(),
            name: Some("Submit".to_string()),
            nth: None,
        },
    );
    refs.store_refs(&state, TargetKey::new("http://remote:9222", "TAB1"), snapshot);

    let executor = PageExecutor::new(
        Arc::clone(&page) as Arc<dyn PageDriver>,
        Arc::clone(&refs),
        Arc::clone(&state),
    );

    let mut click = action(ActionKind::Click, 0, None);
    click.selector = Some("@e1".to_string());
    executor.execute(&click).await.unwrap();

    let navigate = action(ActionKind::Navigate, 1, Some("https://example.com"));
    executor.execute(&navigate).await.unwrap();

    let performed = page.performed();
    assert_eq!(performed.len(), 2);
    assert!(performed[0].starts_with("click role=button"));
    assert_eq!(performed[1], "navigate https://example.com");
}

#[tokio::test]
async fn test_page_executor_surfaces_unknown_ref() {
    let page = Arc::new(MockPageDriver::new("TAB1"));
    let refs = Arc::new(RefCache::new());
    let state = Arc::new(Mutex::new(PageState::new()));
    let executor = PageExecutor::new(
        Arc::clone(&page) as Arc<dyn PageDriver>,
        refs,
        state,
    );

    let mut click = action(ActionKind::Click, 0, None);
    click.selector = Some("@e99".to_string());

    let err = executor.execute(&click).await.unwrap_err();
    assert!(matches!(err, Error::UnknownRef(_)));
    assert!(page.performed().is_empty());
}
