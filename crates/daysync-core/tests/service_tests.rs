mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{day, setup_store, ScriptedRemote};
use daysync_core::error::CoreError;
use daysync_core::models::{NewTask, Recurrence, SyncConfig, SyncState, Task};
use daysync_core::service::TaskService;
use daysync_core::store::{LocalStore, SqliteLocalStore, WatermarkStore};
use tempfile::TempDir;

type Service = TaskService<SqliteLocalStore, ScriptedRemote>;

async fn setup_service() -> (Service, Arc<SqliteLocalStore>, Arc<ScriptedRemote>, TempDir) {
    let (local, dir) = setup_store().await;
    let remote = Arc::new(ScriptedRemote::signed_in("alice"));
    let config = SyncConfig {
        base_backoff: Duration::ZERO,
        max_backoff: Duration::ZERO,
        pull_interval: None,
        ..Default::default()
    };
    let service = TaskService::new(local.clone(), remote.clone(), config, chrono_tz::UTC);
    (service, local, remote, dir)
}

fn new_task(title: &str) -> NewTask {
    NewTask {
        title: title.to_string(),
        date: Some(day(2024, 6, 3)),
        ..Default::default()
    }
}

#[tokio::test]
async fn add_task_writes_locally_and_queues_upload() {
    let (service, local, remote, _dir) = setup_service().await;

    let task = service
        .add_task(NewTask {
            title: "  Read a chapter ".to_string(),
            description: Some(String::new()),
            ..new_task("")
        })
        .await
        .unwrap();

    assert_eq!(task.title, "Read a chapter");
    assert_eq!(task.description, None);
    assert_eq!(task.expected_hours, 1.0);
    assert!(local.find_by_id(task.local_id).await.unwrap().is_some());
    assert_eq!(service.engine().pending_len(), 1);
    assert!(remote.calls().is_empty());

    service.sync_now().await;
    assert_eq!(remote.calls(), vec!["upsert:Read a chapter"]);
    assert!(service.task(task.local_id).await.unwrap().unwrap().remote_id.is_some());
}

#[tokio::test]
async fn add_task_defaults_to_today() {
    let (service, _local, _remote, _dir) = setup_service().await;
    let task = service
        .add_task(NewTask {
            title: "Today".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(task.date, service.today());
}

#[tokio::test]
async fn invalid_input_is_reported_on_the_error_signal() {
    let (service, _local, _remote, _dir) = setup_service().await;
    let errors = service.errors();

    let result = service.add_task(new_task("   ")).await;
    assert!(matches!(result, Err(CoreError::InvalidInput(_))));
    assert!(errors.borrow().as_deref().unwrap().contains("title"));
    assert_eq!(service.engine().pending_len(), 0);

    service.clear_error();
    assert!(errors.borrow().is_none());
}

#[tokio::test]
async fn update_bumps_timestamp_and_keeps_remote_id() {
    let (service, _local, _remote, _dir) = setup_service().await;
    let original = service.add_task(new_task("Draft")).await.unwrap();
    service.sync_now().await;

    // Edit a copy read before the upload assigned a document id.
    let edited = service
        .update_task(Task {
            title: "Final".to_string(),
            ..original.clone()
        })
        .await
        .unwrap();

    assert!(edited.updated_at > original.updated_at);
    assert!(edited.remote_id.is_some());
    let stored = service.task(original.local_id).await.unwrap().unwrap();
    assert_eq!(stored, edited);
}

#[tokio::test]
async fn missing_rows_are_not_found() {
    let (service, _local, _remote, _dir) = setup_service().await;
    assert!(matches!(service.set_done(99, true).await, Err(CoreError::NotFound(_))));
    assert!(matches!(service.delete_task(99).await, Err(CoreError::NotFound(_))));
    assert!(service.errors().borrow().is_some());
}

#[tokio::test]
async fn set_done_and_delete_flow_through_to_remote() {
    let (service, _local, remote, _dir) = setup_service().await;
    let task = service.add_task(new_task("Laundry")).await.unwrap();
    service.sync_now().await;

    let done = service.set_done(task.local_id, true).await.unwrap();
    assert!(done.is_done);
    service.sync_now().await;
    assert_eq!(remote.inner.len(), 1);

    let removed = service.delete_task(task.local_id).await.unwrap();
    assert!(service.task(task.local_id).await.unwrap().is_none());
    service.sync_now().await;

    let doc_id = removed.remote_id.unwrap();
    assert_eq!(remote.calls().last(), Some(&format!("delete:{}", doc_id)));
    assert!(remote.inner.is_empty());
}

#[tokio::test]
async fn live_queries_reemit_on_writes() {
    let (service, _local, _remote, _dir) = setup_service().await;
    let date = day(2024, 6, 3);
    let mut today = service.tasks_for_day(date);
    let mut pending = service.pending_for(date);
    let mut completed = service.completed_for(date);

    assert!(today.next().await.unwrap().unwrap().is_empty());
    pending.next().await.unwrap().unwrap();
    completed.next().await.unwrap().unwrap();

    let task = service.add_task(new_task("Stretch")).await.unwrap();
    let listed = today.next().await.unwrap().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(pending.next().await.unwrap().unwrap().len(), 1);

    service.set_done(task.local_id, true).await.unwrap();
    assert_eq!(completed.next().await.unwrap().unwrap().len(), 1);
    assert!(pending.next().await.unwrap().unwrap().is_empty());

    let everything = service.all_tasks().current().await.unwrap();
    assert_eq!(everything.len(), 1);
    assert_eq!(service.tasks_on(date).await.unwrap().len(), 1);
}

#[tokio::test]
async fn recurrence_check_queues_created_instances() {
    let (service, local, remote, _dir) = setup_service().await;
    service
        .add_task(NewTask {
            title: "Buy milk".to_string(),
            date: Some(day(2024, 1, 1)),
            recurrence: Some(Recurrence::daily()),
            ..Default::default()
        })
        .await
        .unwrap();
    service.sync_now().await;
    local.store_watermark(day(2024, 1, 1)).await.unwrap();

    let report = service.trigger_recurrence_check_for(day(2024, 1, 4)).await.unwrap();
    assert_eq!(report.created.len(), 3);
    assert_eq!(service.engine().pending_len(), 3);

    service.sync_now().await;
    assert_eq!(remote.inner.len(), 4);
}

#[tokio::test]
async fn clear_all_data_wipes_rows_and_queue() {
    let (service, local, remote, _dir) = setup_service().await;
    remote.fail_title("Stuck");
    service.add_task(new_task("Stuck")).await.unwrap();
    service.sync_now().await;
    assert!(service.engine().state().is_error());

    service.clear_all_data().await.unwrap();
    assert!(local.query_all().await.unwrap().is_empty());
    assert_eq!(service.engine().pending_len(), 0);
    assert_eq!(*service.sync_state().borrow(), SyncState::Idle);
}

#[tokio::test]
async fn background_worker_drains_without_explicit_calls() {
    let (service, _local, remote, _dir) = setup_service().await;
    service.start().await.unwrap();

    service.add_task(new_task("Background")).await.unwrap();

    let mut state = service.sync_state();
    tokio::time::timeout(Duration::from_secs(5), async {
        while *state.borrow_and_update() != SyncState::Synced {
            state.changed().await.unwrap();
        }
    })
    .await
    .expect("worker should sync the new task");

    assert_eq!(remote.calls(), vec!["upsert:Background"]);
    service.shutdown().await;
}
