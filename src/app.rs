use serde::Serialize;
use tracing::{debug, warn};

use crate::catalog::CatalogClient;
use crate::domain::{CategoryFilter, Project, ProjectId};
use crate::editor::{EditorSession, ProjectForm};
use crate::error::FolioError;
use crate::filter::{CategoryCounts, FilterState};
use crate::store::CatalogStore;

const PLACEHOLDER_IMAGE_BASE: &str = "https://placehold.co/600x400/1a1a1a/00ffb3";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum LoadState {
    Loading,
    Loaded,
    Empty,
    Error { message: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCard {
    pub number: String,
    pub id: String,
    pub title: String,
    pub category: String,
    pub category_label: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub image_url: String,
    pub fallback_image_url: String,
    pub github_url: Option<String>,
    pub live_url: Option<String>,
    pub featured: bool,
}

impl ProjectCard {
    pub fn new(project: &Project, index: usize) -> Self {
        Self {
            number: format!("{:02}", index + 1),
            id: project.id.to_string(),
            title: project.title.clone(),
            category: project.category.as_str().to_string(),
            category_label: project.category.display_name().to_string(),
            description: project.description.clone(),
            technologies: project.technologies.clone(),
            image_url: project.image_url.clone(),
            fallback_image_url: placeholder_image_url(&project.title),
            github_url: project.github_url.clone(),
            live_url: project.live_url.clone(),
            featured: project.featured,
        }
    }
}

/// Placeholder shown when a project image fails to load.
pub fn placeholder_image_url(title: &str) -> String {
    reqwest::Url::parse_with_params(PLACEHOLDER_IMAGE_BASE, &[("text", title)])
        .map(|url| url.to_string())
        .unwrap_or_else(|_| PLACEHOLDER_IMAGE_BASE.to_string())
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterChoice {
    pub filter: String,
    pub label: String,
    pub count: usize,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkView {
    #[serde(flatten)]
    pub state: LoadState,
    pub category: String,
    pub query: String,
    pub counts: CategoryCounts,
    pub filters: Vec<FilterChoice>,
    pub projects: Vec<ProjectCard>,
}

/// Public work page: the loaded catalog plus the active filter and query.
#[derive(Debug, Clone)]
pub struct WorkPage {
    projects: Vec<Project>,
    counts: CategoryCounts,
    filter: FilterState,
    state: LoadState,
    in_flight: bool,
}

impl WorkPage {
    pub fn new(filter: FilterState) -> Self {
        Self {
            projects: Vec::new(),
            counts: CategoryCounts::default(),
            filter,
            state: LoadState::Loading,
            in_flight: false,
        }
    }

    /// Marks a load as started. Returns `false` while another load is
    /// still in flight; that request should be dropped.
    pub fn begin_load(&mut self) -> bool {
        if self.in_flight {
            debug!("load already in flight; ignoring reload");
            return false;
        }
        self.in_flight = true;
        self.state = LoadState::Loading;
        true
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight
    }

    pub fn finish_load(&mut self, result: Result<Vec<Project>, FolioError>) {
        self.in_flight = false;
        match result {
            Ok(projects) => self.apply_snapshot(projects),
            Err(err) => {
                self.state = LoadState::Error {
                    message: err.to_string(),
                };
            }
        }
    }

    /// Replaces the catalog, e.g. from a change notification.
    pub fn apply_snapshot(&mut self, projects: Vec<Project>) {
        self.counts = CategoryCounts::from_projects(&projects);
        self.state = if projects.is_empty() {
            LoadState::Empty
        } else {
            LoadState::Loaded
        };
        self.projects = projects;
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn counts(&self) -> CategoryCounts {
        self.counts
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn set_category(&mut self, category: CategoryFilter) {
        self.filter.set_category(category);
    }

    pub fn set_query(&mut self, query: &str) {
        self.filter.set_query(query);
    }

    pub fn clear_query(&mut self) {
        self.filter.clear_query();
    }

    pub fn visible(&self) -> Vec<&Project> {
        self.filter.apply(&self.projects)
    }

    /// Catalog state, with a loaded catalog whose filter hides everything
    /// reported as empty.
    pub fn display_state(&self) -> LoadState {
        match &self.state {
            LoadState::Loaded | LoadState::Empty => {
                if self.visible().is_empty() {
                    LoadState::Empty
                } else {
                    LoadState::Loaded
                }
            }
            other => other.clone(),
        }
    }

    pub fn view(&self) -> WorkView {
        let active = self.filter.category();
        WorkView {
            state: self.display_state(),
            category: active.as_str().to_string(),
            query: self.filter.query().to_string(),
            counts: self.counts,
            filters: CategoryFilter::choices()
                .into_iter()
                .map(|choice| FilterChoice {
                    count: self.counts.get(&choice),
                    active: &choice == active,
                    label: choice.label().to_string(),
                    filter: choice.as_str().to_string(),
                })
                .collect(),
            projects: self
                .visible()
                .into_iter()
                .enumerate()
                .map(|(index, project)| ProjectCard::new(project, index))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminRow {
    pub order: i64,
    pub id: String,
    pub title: String,
    pub category: String,
    pub featured: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminListResult {
    pub total: usize,
    pub projects: Vec<AdminRow>,
}

impl AdminListResult {
    pub fn from_projects(projects: &[Project]) -> Self {
        Self {
            total: projects.len(),
            projects: projects
                .iter()
                .map(|project| AdminRow {
                    order: project.order,
                    id: project.id.to_string(),
                    title: project.title.clone(),
                    category: project.category.display_name().to_string(),
                    featured: project.featured,
                })
                .collect(),
        }
    }
}

/// `catalog` is the reloaded list, or `None` with `reload_error` set when the
/// write committed but the reload failed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResult {
    pub id: String,
    pub action: String,
    pub catalog: Option<AdminListResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reload_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub id: String,
    pub deleted: bool,
    pub catalog: Option<AdminListResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reload_error: Option<String>,
}

/// Presentation adapter wiring the catalog into page operations.
#[derive(Clone)]
pub struct App<S: CatalogStore> {
    catalog: CatalogClient<S>,
}

impl<S: CatalogStore> App<S> {
    pub fn new(catalog: CatalogClient<S>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &CatalogClient<S> {
        &self.catalog
    }

    pub fn into_catalog(self) -> CatalogClient<S> {
        self.catalog
    }

    /// Loads the catalog into `page`. Returns `false` if a load was already
    /// running. Failures land in the page state, never in the return value.
    pub fn load_work(&self, page: &mut WorkPage) -> bool {
        if !page.begin_load() {
            return false;
        }
        page.finish_load(self.catalog.list_all());
        true
    }

    pub fn admin_list(&self) -> Result<AdminListResult, FolioError> {
        let projects = self.catalog.list_all()?;
        Ok(AdminListResult::from_projects(&projects))
    }

    pub fn show(&self, id: &ProjectId) -> Result<Project, FolioError> {
        self.catalog.get(id)
    }

    pub fn open_editor(
        &self,
        session: &mut EditorSession,
        id: Option<&ProjectId>,
    ) -> Result<ProjectForm, FolioError> {
        session.open(&self.catalog, id)
    }

    /// Saves the form through the session, then reloads the catalog.
    pub fn save(
        &self,
        session: &mut EditorSession,
        form: &ProjectForm,
    ) -> Result<SaveResult, FolioError> {
        let action = if session.is_editing() {
            "updated"
        } else {
            "created"
        };
        let id = session.save(&self.catalog, form)?;
        let (catalog, reload_error) = self.reload_after_write();
        Ok(SaveResult {
            id: id.to_string(),
            action: action.to_string(),
            catalog,
            reload_error,
        })
    }

    pub fn delete(&self, id: &ProjectId) -> Result<DeleteResult, FolioError> {
        self.catalog.delete(id)?;
        let (catalog, reload_error) = self.reload_after_write();
        Ok(DeleteResult {
            id: id.to_string(),
            deleted: true,
            catalog,
            reload_error,
        })
    }

    // A committed write stays successful even if the reload fails.
    fn reload_after_write(&self) -> (Option<AdminListResult>, Option<String>) {
        match self.admin_list() {
            Ok(list) => (Some(list), None),
            Err(err) => {
                warn!(error = %err, "reload after write failed");
                (None, Some(err.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, ProjectFields};
    use crate::store::MemoryStore;

    fn app_with(titles: &[(&str, &str, i64)]) -> App<MemoryStore> {
        let catalog = CatalogClient::new(MemoryStore::new());
        for (title, category, order) in titles {
            catalog
                .create(ProjectFields {
                    title: Some(title.to_string()),
                    category: Some(Category::from(*category)),
                    description: Some("d".to_string()),
                    image_url: Some("http://img".to_string()),
                    order: Some(*order),
                    ..ProjectFields::default()
                })
                .unwrap();
        }
        App::new(catalog)
    }

    #[test]
    fn reload_is_ignored_while_in_flight() {
        let mut page = WorkPage::new(FilterState::default());
        assert!(page.begin_load());
        assert!(!page.begin_load());
        page.finish_load(Ok(Vec::new()));
        assert!(page.begin_load());
    }

    #[test]
    fn cards_are_numbered_from_one() {
        let app = app_with(&[("B", "web", 2), ("A", "ai", 1)]);
        let mut page = WorkPage::new(FilterState::default());
        assert!(app.load_work(&mut page));
        let view = page.view();
        assert_eq!(view.projects[0].number, "01");
        assert_eq!(view.projects[0].title, "A");
        assert_eq!(view.projects[1].category_label, "Web Apps");
    }

    #[test]
    fn placeholder_encodes_title() {
        let url = placeholder_image_url("My App");
        assert!(url.starts_with("https://placehold.co/600x400/1a1a1a/00ffb3?text="));
        assert!(url.ends_with("My+App") || url.ends_with("My%20App"));
    }
}
