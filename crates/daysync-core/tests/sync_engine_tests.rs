mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{day, setup_store, task, ScriptedRemote};
use daysync_core::models::{SyncConfig, SyncOperation, SyncState, Task};
use daysync_core::remote::{MemoryRemoteStore, RemoteStore};
use daysync_core::store::{LocalStore, SqliteLocalStore};
use daysync_core::sync::SyncEngine;
use serde_json::json;

fn immediate_retries() -> SyncConfig {
    SyncConfig {
        base_backoff: Duration::ZERO,
        max_backoff: Duration::ZERO,
        pull_interval: None,
        ..Default::default()
    }
}

async fn stored(local: &SqliteLocalStore, title: &str) -> Task {
    let mut task = task(title, day(2024, 1, 1));
    task.local_id = local.insert(&task).await.unwrap();
    task
}

#[tokio::test]
async fn drain_applies_operations_in_enqueue_order() {
    let (local, _dir) = setup_store().await;
    let remote = Arc::new(ScriptedRemote::signed_in("alice"));
    let engine = SyncEngine::new(local.clone(), remote.clone(), immediate_retries());

    for title in ["A", "B", "C"] {
        let task = stored(&local, title).await;
        engine.enqueue(SyncOperation::Insert(task));
    }
    let report = engine.drain_pending().await;

    assert_eq!(report.applied, 3);
    assert_eq!(remote.calls(), vec!["upsert:A", "upsert:B", "upsert:C"]);
    assert_eq!(engine.state(), SyncState::Synced);
    assert_eq!(engine.pending_len(), 0);
    for row in local.query_all().await.unwrap() {
        assert!(row.remote_id.is_some(), "{} should carry its document id", row.title);
    }
}

#[tokio::test]
async fn failing_operation_is_requeued_alone() {
    let (local, _dir) = setup_store().await;
    let remote = Arc::new(ScriptedRemote::signed_in("alice"));
    let engine = SyncEngine::new(local.clone(), remote.clone(), immediate_retries());
    remote.fail_title("B");

    for title in ["A", "B", "C"] {
        let task = stored(&local, title).await;
        engine.enqueue(SyncOperation::Insert(task));
    }
    let report = engine.drain_pending().await;

    assert_eq!(report.applied, 2);
    assert_eq!(report.requeued, 1);
    assert_eq!(remote.calls(), vec!["upsert:A", "upsert:C"]);
    let pending = engine.pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].operation.task().title, "B");
    assert_eq!(pending[0].attempts, 1);
    assert!(pending[0].last_error.is_some());
    assert!(engine.state().is_error());

    remote.recover();
    let retry = engine.drain_pending().await;
    assert_eq!(retry.applied, 1);
    assert_eq!(remote.calls(), vec!["upsert:A", "upsert:C", "upsert:B"]);
    assert_eq!(engine.state(), SyncState::Synced);
}

#[tokio::test]
async fn backoff_defers_the_retry() {
    let (local, _dir) = setup_store().await;
    let remote = Arc::new(ScriptedRemote::signed_in("alice"));
    let config = SyncConfig {
        base_backoff: Duration::from_secs(60),
        pull_interval: None,
        ..Default::default()
    };
    let engine = SyncEngine::new(local.clone(), remote.clone(), config);
    remote.fail_title("A");

    let task = stored(&local, "A").await;
    engine.enqueue(SyncOperation::Insert(task));
    engine.drain_pending().await;
    remote.recover();

    let report = engine.drain_pending().await;
    assert_eq!(report.deferred, 1);
    assert_eq!(report.applied, 0);
    assert_eq!(engine.pending_len(), 1);
}

#[tokio::test]
async fn exhausted_operations_move_to_dead_letters() {
    let (local, _dir) = setup_store().await;
    let remote = Arc::new(ScriptedRemote::signed_in("alice"));
    let config = SyncConfig {
        max_attempts: 2,
        ..immediate_retries()
    };
    let engine = SyncEngine::new(local.clone(), remote.clone(), config);
    remote.fail_title("A");

    let task = stored(&local, "A").await;
    engine.enqueue(SyncOperation::Insert(task));
    assert_eq!(engine.drain_pending().await.requeued, 1);
    assert_eq!(engine.drain_pending().await.dead_lettered, 1);

    assert_eq!(engine.pending_len(), 0);
    let dead = engine.dead_letters();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].attempts, 2);
}

#[tokio::test]
async fn signed_out_engine_degrades_to_no_ops() {
    let (local, _dir) = setup_store().await;
    let remote = Arc::new(MemoryRemoteStore::new());
    let engine = SyncEngine::new(local.clone(), remote.clone(), immediate_retries());

    let task = stored(&local, "Offline").await;
    engine.enqueue(SyncOperation::Insert(task));
    let report = engine.drain_pending().await;
    assert_eq!(report.skipped_unauthenticated, 1);
    assert_eq!(engine.pending_len(), 0);
    assert_eq!(engine.state(), SyncState::Synced);

    assert_eq!(engine.push_all().await.unwrap().uploaded, 0);
    assert_eq!(engine.pull_and_merge().await.unwrap().inserted, 0);
    assert_eq!(engine.state(), SyncState::Synced);
    assert_eq!(local.query_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn update_queued_before_first_upload_reuses_the_document() {
    let (local, _dir) = setup_store().await;
    let remote = Arc::new(ScriptedRemote::signed_in("alice"));
    let engine = SyncEngine::new(local.clone(), remote.clone(), immediate_retries());

    let mut task = stored(&local, "Draft").await;
    engine.enqueue(SyncOperation::Insert(task.clone()));
    task.title = "Final".to_string();
    task.touch();
    local.update(&task).await.unwrap();
    engine.enqueue(SyncOperation::Update(task.clone()));

    engine.drain_pending().await;
    assert_eq!(remote.inner.len(), 1);
    let documents = remote.fetch_all_ordered_by_creation().await.unwrap();
    assert_eq!(documents[0].data["title"], "Final");
}

#[tokio::test]
async fn delete_of_a_never_uploaded_task_touches_nothing_remote() {
    let (local, _dir) = setup_store().await;
    let remote = Arc::new(ScriptedRemote::signed_in("alice"));
    let engine = SyncEngine::new(local.clone(), remote.clone(), immediate_retries());

    let task = stored(&local, "Short-lived").await;
    engine.enqueue(SyncOperation::Insert(task.clone()));
    local.delete(task.local_id).await.unwrap();
    engine.enqueue(SyncOperation::Delete(task));

    let report = engine.drain_pending().await;
    assert_eq!(report.applied, 2);
    assert!(remote.calls().is_empty());
    assert!(remote.inner.is_empty());
}

#[tokio::test]
async fn delete_removes_the_remote_document() {
    let (local, _dir) = setup_store().await;
    let remote = Arc::new(ScriptedRemote::signed_in("alice"));
    let engine = SyncEngine::new(local.clone(), remote.clone(), immediate_retries());

    let task = stored(&local, "Gone soon").await;
    engine.enqueue(SyncOperation::Insert(task.clone()));
    engine.drain_pending().await;
    let uploaded = local.find_by_id(task.local_id).await.unwrap().unwrap();
    let doc_id = uploaded.remote_id.clone().unwrap();

    local.delete(task.local_id).await.unwrap();
    engine.enqueue(SyncOperation::Delete(uploaded));
    engine.drain_pending().await;

    assert!(remote.calls().contains(&format!("delete:{}", doc_id)));
    assert!(remote.inner.is_empty());
}

#[tokio::test]
async fn push_all_uploads_every_row_once() {
    let (local, _dir) = setup_store().await;
    let remote = Arc::new(ScriptedRemote::signed_in("alice"));
    let engine = SyncEngine::new(local.clone(), remote.clone(), immediate_retries());
    for title in ["one", "two", "three"] {
        stored(&local, title).await;
    }

    assert_eq!(engine.push_all().await.unwrap().uploaded, 3);
    assert_eq!(engine.push_all().await.unwrap().uploaded, 3);
    assert_eq!(remote.inner.len(), 3);
}

#[tokio::test]
async fn pull_never_removes_local_only_rows() {
    let (local, _dir) = setup_store().await;
    let remote = Arc::new(ScriptedRemote::signed_in("alice"));
    let engine = SyncEngine::new(local.clone(), remote.clone(), immediate_retries());

    let local_only = stored(&local, "Only here").await;
    let incoming = Task {
        updated_at: 10,
        ..task("From elsewhere", day(2024, 2, 1))
    };
    remote.inner.upsert("doc-remote", &incoming).await.unwrap();

    for _ in 0..3 {
        engine.pull_and_merge().await.unwrap();
    }

    let rows = local.query_all().await.unwrap();
    assert_eq!(rows.len(), 2);
    let kept = local.find_by_id(local_only.local_id).await.unwrap().unwrap();
    assert_eq!(kept, local_only);
    let inserted = rows.iter().find(|t| t.title == "From elsewhere").unwrap();
    assert_eq!(inserted.remote_id.as_deref(), Some("doc-remote"));
    assert_ne!(inserted.local_id, 0);
}

#[tokio::test]
async fn overlapping_pulls_insert_each_document_once() {
    let (local, _dir) = setup_store().await;
    let remote = Arc::new(ScriptedRemote::signed_in("alice"));
    let engine = SyncEngine::new(local.clone(), remote.clone(), immediate_retries());

    remote
        .inner
        .upsert("doc1", &task("From elsewhere", day(2024, 2, 1)))
        .await
        .unwrap();
    remote.slow_fetch(Duration::from_millis(20));

    let (first, second) = tokio::join!(engine.pull_and_merge(), engine.pull_and_merge());
    assert_eq!(first.unwrap().inserted + second.unwrap().inserted, 1);

    let rows = local.query_all().await.unwrap();
    let copies = rows.iter().filter(|t| t.remote_id.as_deref() == Some("doc1")).count();
    assert_eq!(copies, 1);
    assert_eq!(engine.state(), SyncState::Synced);
}

#[tokio::test]
async fn pull_applies_last_write_wins() {
    let (local, _dir) = setup_store().await;
    let remote = Arc::new(ScriptedRemote::signed_in("alice"));
    let engine = SyncEngine::new(local.clone(), remote.clone(), immediate_retries());

    let mut mine = Task {
        remote_id: Some("doc1".to_string()),
        updated_at: 1_000,
        ..task("Local title", day(2024, 1, 1))
    };
    mine.local_id = local.insert(&mine).await.unwrap();

    let older = Task {
        updated_at: 500,
        ..task("Stale title", day(2024, 1, 1))
    };
    remote.inner.upsert("doc1", &older).await.unwrap();
    let report = engine.pull_and_merge().await.unwrap();
    assert_eq!(report.updated, 0);
    assert_eq!(local.find_by_id(mine.local_id).await.unwrap().unwrap().title, "Local title");

    let newer = Task {
        updated_at: 2_000,
        is_done: true,
        ..task("Remote title", day(2024, 1, 1))
    };
    remote.inner.upsert("doc1", &newer).await.unwrap();
    let report = engine.pull_and_merge().await.unwrap();
    assert_eq!(report.updated, 1);

    let merged = local.find_by_id(mine.local_id).await.unwrap().unwrap();
    assert_eq!(merged.title, "Remote title");
    assert!(merged.is_done);
    assert_eq!(merged.updated_at, 2_000);
    assert_eq!(merged.local_id, mine.local_id);
}

#[tokio::test]
async fn unparseable_documents_are_skipped() {
    let (local, _dir) = setup_store().await;
    let remote = Arc::new(ScriptedRemote::signed_in("alice"));
    let engine = SyncEngine::new(local.clone(), remote.clone(), immediate_retries());

    remote.inner.put_raw("broken", json!({"title": 42})).unwrap();
    remote.inner.put_raw("empty-title", json!({
        "title": "", "date": 0, "createdAt": 0, "updatedAt": 0
    })).unwrap();
    remote.inner.upsert("fine", &task("Valid", day(2024, 3, 3))).await.unwrap();

    let report = engine.pull_and_merge().await.unwrap();
    assert_eq!(report.skipped, 2);
    assert_eq!(report.inserted, 1);
    assert_eq!(engine.state(), SyncState::Synced);
}

#[tokio::test]
async fn fetch_failure_surfaces_in_sync_state() {
    let (local, _dir) = setup_store().await;
    let remote = Arc::new(ScriptedRemote::signed_in("alice"));
    let engine = SyncEngine::new(local.clone(), remote.clone(), immediate_retries());
    let mut states = engine.subscribe_state();
    remote.fail_fetch();

    assert!(engine.pull_and_merge().await.is_err());
    states.changed().await.unwrap();
    match &*states.borrow() {
        SyncState::Error(message) => assert!(message.starts_with("Failed to sync from remote")),
        other => panic!("unexpected state {:?}", other),
    };
}

#[tokio::test]
async fn reset_drops_queue_and_returns_to_idle() {
    let (local, _dir) = setup_store().await;
    let remote = Arc::new(ScriptedRemote::signed_in("alice"));
    let engine = SyncEngine::new(local.clone(), remote.clone(), immediate_retries());
    remote.fail_title("A");

    let task = stored(&local, "A").await;
    engine.enqueue(SyncOperation::Insert(task));
    engine.drain_pending().await;
    assert!(engine.state().is_error());

    engine.reset();
    assert_eq!(engine.pending_len(), 0);
    assert_eq!(engine.state(), SyncState::Idle);
}
