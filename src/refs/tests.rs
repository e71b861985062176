use super::cache::{FifoCache, RoleRefEntry, RoleRefSnapshot, SnapshotMode, TargetKey};
use super::resolver::RefCache;
use crate::driver::traits::Locator;
use crate::page::PageState;
use crate::Error;
use std::sync::Mutex;

fn snapshot_with(entries: &[(&str, &str, Option<&str>)]) -> RoleRefSnapshot {
    let mut snapshot = RoleRefSnapshot::new(SnapshotMode::Role);
    for (id, role, name) in entries {
        snapshot.refs.insert(
            id.to_string(),
            RoleRefEntry {
                role: role.to_string(),
                name: name.map(|n| n.to_string()),
                nth: None,
            },
        );
    }
    snapshot
}

fn key(target: &str) -> TargetKey {
    TargetKey::new("http://remote:9222", target)
}

#[test]
fn test_resolve_ref_token_to_role_locator() {
    let cache = RefCache::new();
    let state = Mutex::new(PageState::new());
    cache.store_refs(
        &state,
        key("TAB1"),
        snapshot_with(&[("e12", "button", Some("Submit"))]),
    );

    for token in ["@e12", "ref=e12", "e12"] {
        let locator = cache.resolve(&state, token).unwrap();
        match locator {
            Locator::Role { role, name, .. } => {
                assert_eq!(role, "button");
                assert_eq!(name.as_deref(), Some("Submit"));
            }
            other => panic!("expected role locator, got {}", other),
        }
    }
}

#[test]
fn test_non_ref_token_passes_through() {
    let cache = RefCache::new();
    let state = Mutex::new(PageState::new());

    let locator = cache.resolve(&state, "#submit-button").unwrap();
    assert!(matches!(locator, Locator::Raw(ref t) if t == "#submit-button"));

    // Looks nothing like a short id, passes through even with no snapshot
    let locator = cache.resolve(&state, "div.header").unwrap();
    assert!(matches!(locator, Locator::Raw(_)));
}

#[test]
fn test_prefixed_non_short_id_passes_through_stripped() {
    let cache = RefCache::new();
    let state = Mutex::new(PageState::new());

    let locator = cache.resolve(&state, "@css=button.primary").unwrap();
    assert!(matches!(locator, Locator::Raw(ref t) if t == "css=button.primary"));

    let locator = cache.resolve(&state, "ref=div.header > a").unwrap();
    assert!(matches!(locator, Locator::Raw(ref t) if t == "div.header > a"));
}

#[test]
fn test_unknown_ref_is_an_error() {
    let cache = RefCache::new();
    let state = Mutex::new(PageState::new());
    cache.store_refs(
        &state,
        key("TAB1"),
        snapshot_with(&[("e1", "link", Some("Home"))]),
    );

    let err = cache.resolve(&state, "@e99").unwrap_err();
    assert!(matches!(err, Error::UnknownRef(_)));
    assert!(err.to_string().contains("e99"));
    assert!(err.to_string().contains("snapshot"));
}

#[test]
fn test_bare_short_id_without_snapshot_is_an_error() {
    let cache = RefCache::new();
    let state = Mutex::new(PageState::new());

    assert!(matches!(
        cache.resolve(&state, "e12"),
        Err(Error::UnknownRef(_))
    ));
}

#[test]
fn test_frame_selector_carried_into_locator() {
    let cache = RefCache::new();
    let state = Mutex::new(PageState::new());
    let mut snapshot = snapshot_with(&[("e3", "textbox", Some("Email"))]);
    snapshot.frame_selector = Some("iframe#checkout".to_string());
    cache.store_refs(&state, key("TAB1"), snapshot);

    match cache.resolve(&state, "@e3").unwrap() {
        Locator::Role { frame_selector, .. } => {
            assert_eq!(frame_selector.as_deref(), Some("iframe#checkout"));
        }
        other => panic!("expected role locator, got {}", other),
    }
}

#[test]
fn test_restore_refs_after_reconnect() {
    let cache = RefCache::new();
    let state = Mutex::new(PageState::new());
    cache.store_refs(
        &state,
        key("TAB1"),
        snapshot_with(&[("e5", "button", Some("Save"))]),
    );

    // Reconnect: a fresh page state with no snapshot yet
    let fresh = Mutex::new(PageState::new());
    assert!(cache.restore_refs(&fresh, &key("TAB1")));

    let locator = cache.resolve(&fresh, "@e5").unwrap();
    assert!(matches!(locator, Locator::Role { ref role, .. } if role == "button"));
}

#[test]
fn test_restore_does_not_overwrite_live_snapshot() {
    let cache = RefCache::new();
    let stale = Mutex::new(PageState::new());
    cache.store_refs(
        &stale,
        key("TAB1"),
        snapshot_with(&[("e1", "link", Some("Old"))]),
    );

    // The page takes a new snapshot on its own
    let live = Mutex::new(PageState::new());
    live.lock()
        .unwrap()
        .set_refs(snapshot_with(&[("e1", "button", Some("New"))]));

    assert!(cache.restore_refs(&live, &key("TAB1")));
    match cache.resolve(&live, "@e1").unwrap() {
        Locator::Role { name, .. } => assert_eq!(name.as_deref(), Some("New")),
        other => panic!("expected role locator, got {}", other),
    }
}

#[test]
fn test_restore_misses_unknown_target() {
    let cache = RefCache::new();
    let state = Mutex::new(PageState::new());
    assert!(!cache.restore_refs(&state, &key("NEVER-SEEN")));
}

#[test]
fn test_fifo_evicts_oldest_at_capacity() {
    let mut fifo = FifoCache::new(3);
    for target in ["A", "B", "C"] {
        fifo.insert(key(target), snapshot_with(&[]));
    }
    fifo.insert(key("D"), snapshot_with(&[]));

    assert_eq!(fifo.len(), 3);
    assert!(fifo.get(&key("A")).is_none());
    assert!(fifo.get(&key("B")).is_some());
    assert!(fifo.get(&key("D")).is_some());
}

#[test]
fn test_fifo_replace_keeps_eviction_position() {
    let mut fifo = FifoCache::new(3);
    for target in ["A", "B", "C"] {
        fifo.insert(key(target), snapshot_with(&[]));
    }

    // Refreshing A does not move it to the back of the eviction order
    fifo.insert(key("A"), snapshot_with(&[("e1", "button", None)]));
    assert_eq!(fifo.oldest(), Some(&key("A")));

    fifo.insert(key("D"), snapshot_with(&[]));
    assert!(fifo.get(&key("A")).is_none());
    assert!(fifo.get(&key("D")).is_some());
}

#[test]
fn test_fifo_lookup_does_not_affect_order() {
    let mut fifo = FifoCache::new(2);
    fifo.insert(key("A"), snapshot_with(&[]));
    fifo.insert(key("B"), snapshot_with(&[]));

    let _ = fifo.get(&key("A"));
    fifo.insert(key("C"), snapshot_with(&[]));

    assert!(fifo.get(&key("A")).is_none());
    assert!(fifo.get(&key("B")).is_some());
}

#[test]
fn test_cross_session_cap_enforced() {
    let cache = RefCache::new();
    for i in 0..super::CROSS_SESSION_CAP + 1 {
        let state = Mutex::new(PageState::new());
        cache.store_refs(&state, key(&format!("TAB{}", i)), snapshot_with(&[]));
    }
    assert_eq!(cache.cross_session_count(), super::CROSS_SESSION_CAP);

    // The first target's snapshot was the one evicted
    let fresh = Mutex::new(PageState::new());
    assert!(!cache.restore_refs(&fresh, &key("TAB0")));
    assert!(cache.restore_refs(&fresh, &key("TAB1")));
}
