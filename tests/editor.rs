use assert_matches::assert_matches;

use folio_catalog::catalog::CatalogClient;
use folio_catalog::domain::{Category, ProjectId};
use folio_catalog::editor::{EditorSession, ProjectForm};
use folio_catalog::error::FolioError;
use folio_catalog::store::MemoryStore;

fn form(title: &str, order: &str) -> ProjectForm {
    ProjectForm {
        title: format!("  {title} "),
        category: "analytics".to_string(),
        description: "Dashboards for finance teams".to_string(),
        image_url: "https://img.example/dash.png".to_string(),
        github_url: "https://github.com/example/dash".to_string(),
        live_url: String::new(),
        technologies: "React, , D3 ,TypeScript".to_string(),
        order: order.to_string(),
        featured: true,
    }
}

#[test]
fn new_record_round_trips_through_the_catalog() {
    let catalog = CatalogClient::new(MemoryStore::new());
    let mut session = EditorSession::new();

    assert_eq!(session.open(&catalog, None).unwrap(), ProjectForm::default());
    assert!(!session.is_editing());
    let id = session.save(&catalog, &form("Dash", " 7 ")).unwrap();
    assert!(!session.is_editing());

    let project = catalog.get(&id).unwrap();
    assert_eq!(project.title, "Dash");
    assert_eq!(project.category, Category::Analytics);
    assert_eq!(project.technologies, ["React", "D3", "TypeScript"]);
    assert_eq!(project.order, 7);
    assert_eq!(project.live_url, None);
    assert!(project.featured);

    let reopened = session.open(&catalog, Some(&id)).unwrap();
    assert_eq!(session.current_id(), Some(&id));
    assert_eq!(reopened.technologies, "React, D3, TypeScript");
    assert_eq!(reopened.order, "7");
}

#[test]
fn saving_an_open_record_updates_it() {
    let catalog = CatalogClient::new(MemoryStore::new());
    let mut session = EditorSession::new();
    let id = session.save(&catalog, &form("Dash", "1")).unwrap();

    let mut edited = session.open(&catalog, Some(&id)).unwrap();
    edited.title = "Dash v2".to_string();
    edited.github_url = "  ".to_string();
    let saved = session.save(&catalog, &edited).unwrap();

    assert_eq!(saved, id);
    let projects = catalog.list_all().unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].title, "Dash v2");
    assert_eq!(projects[0].github_url, None);
}

#[test]
fn non_numeric_order_is_rejected_before_writing() {
    let catalog = CatalogClient::new(MemoryStore::new());
    let mut session = EditorSession::new();
    let err = session.save(&catalog, &form("Dash", "first")).unwrap_err();
    assert_matches!(err, FolioError::Validation(_));
    assert!(catalog.list_all().unwrap().is_empty());
}

#[test]
fn opening_a_deleted_record_gives_a_blank_form() {
    let catalog = CatalogClient::new(MemoryStore::new());
    let mut session = EditorSession::new();
    let id = session.save(&catalog, &form("Gone", "1")).unwrap();
    catalog.delete(&id).unwrap();

    let opened = session.open(&catalog, Some(&id)).unwrap();
    assert_eq!(opened, ProjectForm::default());
    assert_eq!(session.current_id(), None);
}

#[test]
fn opening_another_record_discards_the_previous_one() {
    let catalog = CatalogClient::new(MemoryStore::new());
    let mut session = EditorSession::new();
    let first = session.save(&catalog, &form("First", "1")).unwrap();
    let second = session.save(&catalog, &form("Second", "2")).unwrap();

    session.open(&catalog, Some(&first)).unwrap();
    session.open(&catalog, Some(&second)).unwrap();
    assert_eq!(session.current_id(), Some(&second));

    let missing: ProjectId = "missing".parse().unwrap();
    session.open(&catalog, Some(&missing)).unwrap();
    assert!(!session.is_editing());
}

// Concurrent editors are not coordinated: the last save wins.
#[test]
fn concurrent_sessions_resolve_last_writer_wins() {
    let catalog = CatalogClient::new(MemoryStore::new());
    let mut setup = EditorSession::new();
    let id = setup.save(&catalog, &form("Shared", "1")).unwrap();

    let mut alice = EditorSession::new();
    let mut bob = EditorSession::new();
    let mut alice_form = alice.open(&catalog, Some(&id)).unwrap();
    let mut bob_form = bob.open(&catalog, Some(&id)).unwrap();

    alice_form.description = "from alice".to_string();
    bob_form.title = "Bob's title".to_string();
    alice.save(&catalog, &alice_form).unwrap();
    bob.save(&catalog, &bob_form).unwrap();

    let project = catalog.get(&id).unwrap();
    assert_eq!(project.title, "Bob's title");
    assert_eq!(project.description, "Dashboards for finance teams");
}

#[test]
fn category_case_does_not_create_a_new_category() {
    let catalog = CatalogClient::new(MemoryStore::new());
    let mut session = EditorSession::new();
    let mut input = form("Shop", "1");
    input.category = " Web ".to_string();
    let id = session.save(&catalog, &input).unwrap();
    assert_eq!(catalog.get(&id).unwrap().category, Category::Web);

    let mut other = form("Arcade", "2");
    other.category = "Games".to_string();
    let id = session.save(&catalog, &other).unwrap();
    assert_eq!(
        catalog.get(&id).unwrap().category,
        Category::Other("Games".to_string())
    );
}
