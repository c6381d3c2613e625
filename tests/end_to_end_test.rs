use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tabwatch::config::CsvConfig;
use tabwatch::notifier::FnHandler;
use tabwatch::{
    ChangeEvent, CsvSnapshotReader, LoopState, Owner, Record, ResourceId, VersionedArchive,
    WatchHost,
};
use tempfile::TempDir;
use tokio::sync::mpsc;

fn row(id: &str, val: &str) -> Record {
    Record::from_pairs([("id", id), ("val", val)])
}

fn write_rows(path: &Path, rows: &[(&str, &str)]) {
    let mut content = String::from("id,val\n");
    for (id, val) in rows {
        content.push_str(&format!("{id},{val}\n"));
    }
    fs::write(path, content).unwrap();
}

fn host() -> WatchHost {
    WatchHost::new(
        Arc::new(CsvSnapshotReader::new(&CsvConfig::default())),
        Arc::new(VersionedArchive::in_memory()),
    )
}

#[test]
fn test_add_then_remove_is_archived_as_two_versions() {
    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("customers.csv");
    write_rows(&csv, &[("1", "a")]);

    let mut host = host();
    let owner = Owner::from("app");
    let resource = ResourceId::from(csv.as_path());
    host.registry()
        .register(resource.clone(), Duration::from_secs(60), "customers", &owner)
        .unwrap();
    let watch = host.registry().watch(&resource).unwrap();

    // Baseline cycle before the archive listens
    let baseline = watch.poll_once().unwrap();
    assert_eq!(baseline.added, vec![row("1", "a")]);
    host.enable_archiving();

    write_rows(&csv, &[("1", "a"), ("2", "b")]);
    let added = watch.poll_once().unwrap();
    assert_eq!(added.added, vec![row("2", "b")]);
    assert!(added.removed.is_empty());

    write_rows(&csv, &[("2", "b")]);
    let removed = watch.poll_once().unwrap();
    assert!(removed.added.is_empty());
    assert_eq!(removed.removed, vec![row("1", "a")]);

    let versions = host.archive().query(&resource).unwrap();
    assert_eq!(
        versions.iter().map(|v| v.version).collect::<Vec<_>>(),
        vec![1, 2]
    );
    assert_eq!(versions[0].added, vec![row("2", "b")]);
    assert_eq!(versions[1].removed, vec![row("1", "a")]);
}

#[test]
fn test_reordered_rows_are_not_a_change() {
    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("a.csv");
    write_rows(&csv, &[("1", "a"), ("2", "b")]);

    let host = host();
    let resource = ResourceId::from(csv.as_path());
    host.registry()
        .register(resource.clone(), Duration::from_secs(1), "a", &Owner::from("app"))
        .unwrap();
    let watch = host.registry().watch(&resource).unwrap();
    watch.poll_once().unwrap();

    write_rows(&csv, &[("2", "b"), ("1", "a")]);
    assert!(watch.poll_once().is_none());
}

#[test]
fn test_missing_file_recovers_without_spurious_diff() {
    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("a.csv");
    write_rows(&csv, &[("1", "a")]);

    let host = host();
    let resource = ResourceId::from(csv.as_path());
    host.registry()
        .register(resource.clone(), Duration::from_secs(1), "a", &Owner::from("app"))
        .unwrap();
    let watch = host.registry().watch(&resource).unwrap();
    watch.poll_once().unwrap();

    fs::remove_file(&csv).unwrap();
    assert!(watch.poll_once().is_none());
    assert_eq!(watch.stats().read_failures, 1);

    write_rows(&csv, &[("1", "a")]);
    assert!(watch.poll_once().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_running_watch_feeds_subscribers_and_archive() {
    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("orders.csv");
    write_rows(&csv, &[("1", "a")]);

    let mut host = host();
    let (tx, mut events) = mpsc::unbounded_channel();
    host.notifier()
        .subscribe(FnHandler::new("test", move |event: &ChangeEvent| {
            let _ = tx.send(event.clone());
            Ok(())
        }));

    let owner = Owner::from("app");
    let resource = ResourceId::from(csv.as_path());
    host.watch(&owner, resource.clone(), Duration::from_secs(10), "orders")
        .unwrap();
    assert_eq!(host.registry().state(&resource), Some(LoopState::Running));

    let baseline = events.recv().await.unwrap();
    assert_eq!(baseline.added, vec![row("1", "a")]);
    host.enable_archiving();

    write_rows(&csv, &[("1", "a"), ("2", "b")]);
    let first = events.recv().await.unwrap();
    assert_eq!(first.added, vec![row("2", "b")]);

    write_rows(&csv, &[("2", "b")]);
    let second = events.recv().await.unwrap();
    assert_eq!(second.removed, vec![row("1", "a")]);

    host.shutdown().await;
    assert_eq!(host.registry().state(&resource), Some(LoopState::Stopped));
    assert_eq!(host.archive().current_version(&resource).unwrap(), 2);
}

#[tokio::test]
async fn test_unregister_stops_and_frees_resource() {
    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("a.csv");
    write_rows(&csv, &[("1", "a")]);

    let host = host();
    let alice = host.scope("alice");
    let bob = host.scope("bob");
    let resource = ResourceId::from(csv.as_path());

    alice
        .watch(resource.clone(), Duration::from_secs(5), "alice's")
        .unwrap();
    assert!(bob.watch(resource.clone(), Duration::from_secs(5), "bob's").is_err());
    assert!(bob.unregister(&resource).is_err());

    let loop_handle = host.registry().watch(&resource).unwrap();
    alice.unregister(&resource).unwrap();
    assert!(loop_handle.is_stop_requested());

    bob.watch(resource.clone(), Duration::from_secs(5), "bob's")
        .unwrap();
    assert_eq!(host.registry().get(&resource).unwrap().owner, Owner::from("bob"));

    host.shutdown().await;
}
