use std::sync::Arc;
use std::thread;
use std::time::Duration;

use replay_sessions::{
    NewSession, ReferrerUpdate, SessionError, SessionStore, SqlitePool, MAX_TEXT_CHARS,
};

fn open_pool(dir: &tempfile::TempDir) -> Arc<SqlitePool> {
    let pool = SqlitePool::open(&dir.path().join("sessions.db"), Duration::from_secs(5)).unwrap();
    pool.migrate().unwrap();
    Arc::new(pool)
}

fn new_session(session_id: u64, timestamp: u64) -> NewSession {
    NewSession {
        session_id,
        project_id: 1,
        timestamp,
        user_uuid: format!("uuid-{}", session_id),
        user_os: "Linux".to_string(),
        platform: "web".to_string(),
        tracker_version: "11.0.0".to_string(),
        ..Default::default()
    }
}

#[test]
fn session_lifecycle_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(open_pool(&dir));

    store.add(&new_session(1001, 1_000_000)).unwrap();
    store.insert_user_anonymous_id(1001, "anon").unwrap();
    store.insert_user_id(1001, "alice@example.com").unwrap();
    assert_eq!(
        store.insert_referrer(1001, "https://a.example/x", "a.example").unwrap(),
        ReferrerUpdate::Applied
    );
    store.insert_metadata(1001, 5, &"m".repeat(MAX_TEXT_CHARS * 2)).unwrap();
    store.insert_encryption_key(1001, b"0123456789abcdef").unwrap();
    assert_eq!(store.update_duration(1001, 1_042_000).unwrap(), 42_000);

    let sess = store.get(1001).unwrap();
    assert_eq!(sess.user_id.as_deref(), Some("alice@example.com"));
    assert_eq!(sess.user_anonymous_id.as_deref(), Some("anon"));
    assert_eq!(sess.referrer.as_deref(), Some("https://a.example/x"));
    assert_eq!(sess.base_referrer.as_deref(), Some("a.example"));
    assert_eq!(sess.duration, 42_000);
    assert_eq!(sess.issue_score, 1_000);

    let slot = replay_sessions::MetadataSlot::try_from(5).unwrap();
    assert_eq!(sess.metadata.get(slot).map(str::len), Some(MAX_TEXT_CHARS));
}

#[test]
fn data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = SessionStore::new(open_pool(&dir));
        store.add(&new_session(7, 5_000)).unwrap();
        store.update_duration(7, 4_000).unwrap();
    }

    let store = SessionStore::new(open_pool(&dir));
    assert_eq!(store.get_duration(7).unwrap(), 0);
    assert!(matches!(store.add(&new_session(7, 5_000)), Err(SessionError::Conflict(7))));
}

#[test]
fn concurrent_referrer_writes_apply_once() {
    let dir = tempfile::tempdir().unwrap();
    let pool = open_pool(&dir);
    SessionStore::new(Arc::clone(&pool))
        .add(&new_session(55, 0))
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                SessionStore::new(pool)
                    .insert_referrer(55, &format!("ref-{}", i), "base")
                    .unwrap()
            })
        })
        .collect();

    let applied = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|r| r.applied())
        .count();
    assert_eq!(applied, 1);

    let sess = SessionStore::new(pool).get(55).unwrap();
    assert!(sess.referrer.unwrap().starts_with("ref-"));
}

#[test]
fn shared_pool_by_reference() {
    let pool = SqlitePool::open_in_memory().unwrap();
    pool.migrate().unwrap();

    let writer = SessionStore::new(&pool);
    let reader = SessionStore::new(&pool);
    writer.add(&new_session(9, 100)).unwrap();
    writer.update_duration(9, 350).unwrap();

    let timings = reader.get_many(&[9, 10]).unwrap();
    assert_eq!(timings.len(), 1);
    assert_eq!(timings[0].duration, 250);
    assert_eq!(timings[0].timestamp, 100);
}
