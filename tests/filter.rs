use folio_catalog::domain::{Category, CategoryFilter, Project};
use folio_catalog::filter::{CategoryCounts, FilterState, filter_projects};

fn project(id: &str, title: &str, category: Category, tech: &[&str], order: i64) -> Project {
    Project {
        id: id.parse().unwrap(),
        title: title.to_string(),
        category,
        description: format!("{title} built for clients"),
        image_url: "https://img.example/p.png".to_string(),
        github_url: None,
        live_url: None,
        technologies: tech.iter().map(|tech| tech.to_string()).collect(),
        order,
        featured: false,
        created_at: None,
        updated_at: None,
    }
}

fn catalog() -> Vec<Project> {
    vec![
        project("a", "Shop Front", Category::Web, &["React", "Node"], 1),
        project("b", "Churn Model", Category::Ai, &["Python", "PyTorch"], 2),
        project("c", "Sales Board", Category::Analytics, &["React", "D3"], 3),
        project("d", "Team Chat", Category::Collaboration, &["Go"], 4),
        project("e", "Retro Game", Category::from("games"), &["Rust"], 5),
        project("f", "Landing Page", Category::Web, &["Astro"], 6),
    ]
}

fn ids(projects: &[&Project]) -> Vec<String> {
    projects.iter().map(|project| project.id.to_string()).collect()
}

#[test]
fn all_with_empty_query_is_identity() {
    let projects = catalog();
    let visible = filter_projects(&projects, &CategoryFilter::All, "   ");
    assert_eq!(ids(&visible), ["a", "b", "c", "d", "e", "f"]);
}

#[test]
fn output_preserves_input_order() {
    let projects = catalog();
    let visible = filter_projects(&projects, &CategoryFilter::Only(Category::Web), "");
    assert_eq!(ids(&visible), ["a", "f"]);
}

#[test]
fn query_matches_title_description_and_technologies_case_insensitively() {
    let projects = catalog();
    assert_eq!(ids(&filter_projects(&projects, &CategoryFilter::All, "react")), ["a", "c"]);
    assert_eq!(ids(&filter_projects(&projects, &CategoryFilter::All, "CHURN")), ["b"]);
    assert_eq!(
        ids(&filter_projects(&projects, &CategoryFilter::All, "built for")).len(),
        projects.len()
    );
    assert!(filter_projects(&projects, &CategoryFilter::All, "cobol").is_empty());
}

#[test]
fn category_and_query_commute() {
    let projects = catalog();
    let category = CategoryFilter::Only(Category::Analytics);

    let category_first = filter_projects(&projects, &category, "")
        .into_iter()
        .cloned()
        .collect::<Vec<_>>();
    let then_query = filter_projects(&category_first, &CategoryFilter::All, "react");

    let query_first = filter_projects(&projects, &CategoryFilter::All, "react")
        .into_iter()
        .cloned()
        .collect::<Vec<_>>();
    let then_category = filter_projects(&query_first, &category, "");

    assert_eq!(ids(&then_query), ids(&then_category));
    assert_eq!(ids(&then_query), ["c"]);
}

#[test]
fn unnamed_categories_only_appear_under_all() {
    let projects = catalog();
    for named in Category::NAMED {
        let visible = filter_projects(&projects, &CategoryFilter::Only(named.clone()), "");
        assert!(!ids(&visible).contains(&"e".to_string()));
    }
    assert!(ids(&filter_projects(&projects, &CategoryFilter::All, "")).contains(&"e".to_string()));
}

#[test]
fn counts_ignore_the_active_filter() {
    let projects = catalog();
    let mut state = FilterState::new(CategoryFilter::Only(Category::Ai), "python");
    let before = CategoryCounts::from_projects(&projects);
    assert_eq!(state.apply(&projects).len(), 1);
    state.set_category(CategoryFilter::All);
    state.clear_query();
    assert_eq!(CategoryCounts::from_projects(&projects), before);

    assert_eq!(before.all, 6);
    assert_eq!(before.web, 2);
    assert_eq!(before.ai, 1);
    assert_eq!(before.analytics, 1);
    assert_eq!(before.collaboration, 1);
    assert_eq!(before.get(&CategoryFilter::All), 6);
}

#[test]
fn state_trims_queries() {
    let mut state = FilterState::default();
    state.set_query("  chat ");
    assert_eq!(state.query(), "chat");
    assert_eq!(state.category(), &CategoryFilter::All);
}
