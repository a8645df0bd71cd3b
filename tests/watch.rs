use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;

use folio_catalog::catalog::CatalogClient;
use folio_catalog::domain::{Category, ProjectFields};
use folio_catalog::store::MemoryStore;
use folio_catalog::watch::{CatalogEvent, SnapshotWatcher};

const WAIT: Duration = Duration::from_secs(3);

fn fields(title: &str, order: i64) -> ProjectFields {
    ProjectFields {
        title: Some(title.to_string()),
        category: Some(Category::Collaboration),
        description: Some("shared boards".to_string()),
        image_url: Some("https://img.example/b.png".to_string()),
        order: Some(order),
        ..ProjectFields::default()
    }
}

#[test]
fn changes_are_pushed_as_snapshots() {
    let catalog = CatalogClient::new(Arc::new(MemoryStore::new()));
    catalog.create(fields("first", 1)).unwrap();

    let (watcher, events) =
        SnapshotWatcher::spawn(Arc::new(catalog.clone()), Duration::from_millis(20));

    assert_matches!(
        events.recv_timeout(WAIT).unwrap(),
        CatalogEvent::Snapshot(projects) if projects.len() == 1
    );

    catalog.create(fields("second", 0)).unwrap();
    let CatalogEvent::Snapshot(projects) = events.recv_timeout(WAIT).unwrap() else {
        panic!("expected a snapshot");
    };
    assert_eq!(projects[0].title, "second");
    assert_eq!(projects[1].title, "first");

    watcher.stop();
}

#[test]
fn outages_are_reported_once_and_recovery_resumes() {
    let catalog = CatalogClient::new(Arc::new(MemoryStore::new()));
    let (watcher, events) =
        SnapshotWatcher::spawn(Arc::new(catalog.clone()), Duration::from_millis(20));
    assert_matches!(
        events.recv_timeout(WAIT).unwrap(),
        CatalogEvent::Snapshot(projects) if projects.is_empty()
    );

    catalog.store().set_unavailable(true);
    assert_matches!(events.recv_timeout(WAIT).unwrap(), CatalogEvent::Failed(_));
    assert!(events.recv_timeout(Duration::from_millis(150)).is_err());

    catalog.store().set_unavailable(false);
    catalog.create(fields("back", 1)).unwrap();
    assert_matches!(
        events.recv_timeout(WAIT).unwrap(),
        CatalogEvent::Snapshot(projects) if projects.len() == 1
    );

    watcher.stop();
}

#[test]
fn recovery_resends_an_unchanged_snapshot() {
    let catalog = CatalogClient::new(Arc::new(MemoryStore::new()));
    catalog.create(fields("steady", 1)).unwrap();
    let (watcher, events) =
        SnapshotWatcher::spawn(Arc::new(catalog.clone()), Duration::from_millis(20));
    assert_matches!(events.recv_timeout(WAIT).unwrap(), CatalogEvent::Snapshot(_));

    catalog.store().set_unavailable(true);
    assert_matches!(events.recv_timeout(WAIT).unwrap(), CatalogEvent::Failed(_));

    catalog.store().set_unavailable(false);
    assert_matches!(
        events.recv_timeout(WAIT).unwrap(),
        CatalogEvent::Snapshot(projects) if projects.len() == 1 && projects[0].title == "steady"
    );

    watcher.stop();
}
