use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use folio_catalog::app::{App, LoadState, WorkPage};
use folio_catalog::catalog::CatalogClient;
use folio_catalog::domain::{Category, CategoryFilter, ProjectFields};
use folio_catalog::editor::EditorSession;
use folio_catalog::filter::FilterState;
use folio_catalog::error::FolioError;
use folio_catalog::store::{CatalogStore, Document, DocumentWrite, MemoryStore};

fn fields(title: &str, category: Category, order: i64) -> ProjectFields {
    ProjectFields {
        title: Some(title.to_string()),
        category: Some(category),
        description: Some(format!("{title} case study")),
        image_url: Some("https://img.example/x.png".to_string()),
        technologies: Some(vec!["Rust".to_string(), "Tokio".to_string()]),
        order: Some(order),
        ..ProjectFields::default()
    }
}

fn seeded() -> (Arc<MemoryStore>, App<Arc<MemoryStore>>) {
    let store = Arc::new(MemoryStore::new());
    let catalog = CatalogClient::new(store.clone());
    catalog.create(fields("Shop", Category::Web, 2)).unwrap();
    catalog.create(fields("Vision", Category::Ai, 1)).unwrap();
    (store, App::new(catalog))
}

#[test]
fn loaded_page_reports_counts_and_cards() {
    let (_store, app) = seeded();
    let mut page = WorkPage::new(FilterState::default());
    assert_eq!(page.display_state(), LoadState::Loading);
    assert!(app.load_work(&mut page));

    let view = page.view();
    assert_eq!(view.state, LoadState::Loaded);
    assert_eq!(view.counts.all, 2);
    assert_eq!(view.filters.len(), 5);
    assert!(view.filters[0].active);
    assert_eq!(view.projects[0].title, "Vision");
    assert_eq!(view.projects[0].category_label, "AI/ML");
}

#[test]
fn filter_that_hides_everything_shows_empty() {
    let (_store, app) = seeded();
    let mut page = WorkPage::new(FilterState::new(
        CategoryFilter::Only(Category::Analytics),
        "",
    ));
    app.load_work(&mut page);
    assert_eq!(page.display_state(), LoadState::Empty);
    assert_eq!(page.counts().all, 2);

    page.set_category(CategoryFilter::All);
    page.set_query("tokio");
    assert_eq!(page.display_state(), LoadState::Loaded);
    assert_eq!(page.visible().len(), 2);
}

#[test]
fn empty_and_failed_catalogs_differ() {
    let app = App::new(CatalogClient::new(Arc::new(MemoryStore::new())));
    let mut page = WorkPage::new(FilterState::default());
    app.load_work(&mut page);
    assert_eq!(page.display_state(), LoadState::Empty);

    app.catalog().store().set_unavailable(true);
    app.load_work(&mut page);
    assert!(matches!(page.display_state(), LoadState::Error { .. }));
    assert!(!page.is_loading());

    app.catalog().store().set_unavailable(false);
    app.load_work(&mut page);
    assert_eq!(page.display_state(), LoadState::Empty);
}

#[test]
fn view_serializes_with_flattened_state() {
    let (_store, app) = seeded();
    let mut page = WorkPage::new(FilterState::default());
    app.load_work(&mut page);
    let json = serde_json::to_value(page.view()).unwrap();
    assert_eq!(json["state"], "loaded");
    assert_eq!(json["category"], "all");
    assert_eq!(json["projects"][0]["number"], "01");
    assert!(
        json["projects"][0]["fallbackImageUrl"]
            .as_str()
            .unwrap()
            .starts_with("https://placehold.co/")
    );
}

#[test]
fn admin_save_and_delete_reload_the_list() {
    let (_store, app) = seeded();
    let mut session = EditorSession::new();
    let mut form = app.open_editor(&mut session, None).unwrap();
    form.title = "Planner".to_string();
    form.category = "collaboration".to_string();
    form.description = "Team planning".to_string();
    form.image_url = "https://img.example/p.png".to_string();
    form.order = "0".to_string();

    let saved = app.save(&mut session, &form).unwrap();
    assert_eq!(saved.action, "created");
    let catalog = saved.catalog.unwrap();
    assert_eq!(catalog.total, 3);
    assert_eq!(catalog.projects[0].title, "Planner");
    assert!(saved.reload_error.is_none());

    let id = saved.id.parse().unwrap();
    let mut edit = app.open_editor(&mut session, Some(&id)).unwrap();
    edit.featured = true;
    let updated = app.save(&mut session, &edit).unwrap();
    assert_eq!(updated.action, "updated");
    assert!(updated.catalog.unwrap().projects[0].featured);

    let deleted = app.delete(&id).unwrap();
    assert!(deleted.deleted);
    assert_eq!(deleted.catalog.unwrap().total, 2);
}

/// Store whose listing breaks once `fail_list` is set; writes keep working.
struct ListOutage {
    inner: MemoryStore,
    fail_list: AtomicBool,
}

impl CatalogStore for ListOutage {
    fn list_ordered(&self, collection: &str, order_by: &str) -> Result<Vec<Document>, FolioError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(FolioError::StoreUnavailable("listing offline".to_string()));
        }
        self.inner.list_ordered(collection, order_by)
    }

    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, FolioError> {
        self.inner.get(collection, id)
    }

    fn create(&self, collection: &str, write: DocumentWrite) -> Result<String, FolioError> {
        self.inner.create(collection, write)
    }

    fn update(&self, collection: &str, id: &str, write: DocumentWrite) -> Result<(), FolioError> {
        self.inner.update(collection, id, write)
    }

    fn delete(&self, collection: &str, id: &str) -> Result<(), FolioError> {
        self.inner.delete(collection, id)
    }
}

#[test]
fn committed_writes_succeed_when_the_reload_fails() {
    let store = Arc::new(ListOutage {
        inner: MemoryStore::new(),
        fail_list: AtomicBool::new(true),
    });
    let app = App::new(CatalogClient::new(store.clone()));
    let mut session = EditorSession::new();
    let mut form = app.open_editor(&mut session, None).unwrap();
    form.title = "Offline".to_string();
    form.category = "web".to_string();
    form.description = "Saved while listing is down".to_string();
    form.image_url = "https://img.example/o.png".to_string();
    form.order = "1".to_string();

    let saved = app.save(&mut session, &form).unwrap();
    assert_eq!(saved.action, "created");
    assert!(saved.catalog.is_none());
    assert!(saved.reload_error.unwrap().contains("listing offline"));

    let id = saved.id.parse().unwrap();
    assert_eq!(app.show(&id).unwrap().title, "Offline");

    let deleted = app.delete(&id).unwrap();
    assert!(deleted.deleted);
    assert!(deleted.catalog.is_none());

    store.fail_list.store(false, Ordering::SeqCst);
    assert_eq!(app.admin_list().unwrap().total, 0);
}
