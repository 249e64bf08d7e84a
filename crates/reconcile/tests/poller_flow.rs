//! End-to-end: poller, in-memory store, real child processes, subscriber.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use hydrosync_core::WorkItem;
use hydrosync_reconcile::{MemoryStore, NotificationBus, Poller, ProcessLauncher, Reconciler, TriggerAck};

const LONG: Duration = Duration::from_secs(3600);

/// `sh -c 'touch "$0-$1.done"' <machine> <cycle>` leaves one marker per launch.
fn marker_launcher(dir: &std::path::Path) -> ProcessLauncher {
    ProcessLauncher::new(
        "sh",
        vec!["-c".to_string(), "touch \"$0-$1.done\"".to_string()],
    )
    .with_working_dir(dir)
}

async fn wait_for_file(path: &std::path::Path) -> bool {
    for _ in 0..100 {
        if path.exists() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn startup_pass_launches_missing_keys_and_notifies() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::with_rows(
        [WorkItem::new(1, 1), WorkItem::new(1, 2), WorkItem::new(1, 2), WorkItem::new(2, 1)],
        [WorkItem::new(1, 1)],
    ));
    let bus = NotificationBus::new();
    let mut sub = bus.subscribe();
    let reconciler = Reconciler::new(store.clone(), Arc::new(marker_launcher(dir.path())), bus);
    let poller = Poller::new(reconciler, LONG, LONG);
    let shutdown = Arc::new(Notify::new());
    let task = tokio::spawn(poller.run(shutdown.clone()));

    for _ in 0..2 {
        let got = tokio::time::timeout(Duration::from_secs(5), sub.recv()).await.unwrap();
        assert!(got.is_some());
    }

    assert!(wait_for_file(&dir.path().join("1-2.done")).await);
    assert!(wait_for_file(&dir.path().join("2-1.done")).await);
    assert!(!dir.path().join("1-1.done").exists());

    shutdown.notify_one();
    task.await.unwrap();
}

#[tokio::test]
async fn manual_trigger_picks_up_new_readings() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let bus = NotificationBus::new();
    let mut sub = bus.subscribe();
    let reconciler = Reconciler::new(store.clone(), Arc::new(marker_launcher(dir.path())), bus);
    let poller = Poller::new(reconciler, LONG, LONG);
    let trigger = poller.trigger_handle();
    let shutdown = Arc::new(Notify::new());
    let task = tokio::spawn(poller.run(shutdown.clone()));

    // Let the empty startup pass finish so the trigger is not dropped by the guard.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(sub.try_recv().is_none());

    store.insert_raw(WorkItem::new(5, 9));
    assert_eq!(trigger.request(), TriggerAck::Requested);

    let got = tokio::time::timeout(Duration::from_secs(5), sub.recv()).await.unwrap();
    assert!(got.is_some());
    assert!(wait_for_file(&dir.path().join("5-9.done")).await);

    shutdown.notify_one();
    task.await.unwrap();
}

#[tokio::test]
async fn missing_program_does_not_stop_the_poller() {
    let store = Arc::new(MemoryStore::with_rows([WorkItem::new(3, 3)], Vec::<WorkItem>::new()));
    let bus = NotificationBus::new();
    let mut sub = bus.subscribe();
    let launcher = ProcessLauncher::new("/nonexistent/hydrosync-pipeline", Vec::new());
    let reconciler = Reconciler::new(store.clone(), Arc::new(launcher), bus);
    let poller = Poller::new(reconciler, LONG, LONG);
    let trigger = poller.trigger_handle();
    let shutdown = Arc::new(Notify::new());
    let task = tokio::spawn(poller.run(shutdown.clone()));

    tokio::time::sleep(Duration::from_millis(100)).await;
    // Spawn failure: no notification for that key.
    assert!(sub.try_recv().is_none());

    // The poller still accepts triggers after the failed pass.
    assert_eq!(trigger.request(), TriggerAck::Requested);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(sub.try_recv().is_none());

    shutdown.notify_one();
    task.await.unwrap();
}
