use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::CatalogClient;
use crate::domain::{Category, Project, ProjectFields, ProjectId, split_technologies};
use crate::error::FolioError;
use crate::store::CatalogStore;

/// Raw, unvalidated form values as typed into the editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectForm {
    pub title: String,
    pub category: String,
    pub description: String,
    pub image_url: String,
    pub github_url: String,
    pub live_url: String,
    pub technologies: String,
    pub order: String,
    pub featured: bool,
}

impl ProjectForm {
    pub fn from_project(project: &Project) -> Self {
        Self {
            title: project.title.clone(),
            category: project.category.as_str().to_string(),
            description: project.description.clone(),
            image_url: project.image_url.clone(),
            github_url: project.github_url.clone().unwrap_or_default(),
            live_url: project.live_url.clone().unwrap_or_default(),
            technologies: project.technologies.join(", "),
            order: project.order.to_string(),
            featured: project.featured,
        }
    }

    /// Trims text, splits technologies and parses `order`.
    pub fn normalize(&self) -> Result<ProjectFields, FolioError> {
        let order_text = self.order.trim();
        let order = order_text.parse::<i64>().map_err(|_| {
            FolioError::Validation(format!("order must be an integer, got `{order_text}`"))
        })?;
        Ok(ProjectFields {
            title: Some(self.title.trim().to_string()),
            category: Some(Category::from(self.category.trim())),
            description: Some(self.description.trim().to_string()),
            image_url: Some(self.image_url.trim().to_string()),
            github_url: Some(self.github_url.trim().to_string()),
            live_url: Some(self.live_url.trim().to_string()),
            technologies: Some(split_technologies(&self.technologies)),
            order: Some(order),
            featured: Some(self.featured),
        })
    }
}

#[derive(Debug, Default)]
pub struct EditorSession {
    current_id: Option<ProjectId>,
}

impl EditorSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_id(&self) -> Option<&ProjectId> {
        self.current_id.as_ref()
    }

    pub fn is_editing(&self) -> bool {
        self.current_id.is_some()
    }

    /// Opens `id` for editing, or a blank record for `None`.
    ///
    /// A record that no longer exists yields a blank form with nothing open.
    pub fn open<S: CatalogStore>(
        &mut self,
        catalog: &CatalogClient<S>,
        id: Option<&ProjectId>,
    ) -> Result<ProjectForm, FolioError> {
        self.current_id = None;
        let Some(id) = id else {
            return Ok(ProjectForm::default());
        };
        match catalog.get(id) {
            Ok(project) => {
                debug!(id = %id, "opened project for editing");
                self.current_id = Some(project.id.clone());
                Ok(ProjectForm::from_project(&project))
            }
            Err(FolioError::NotFound(missing)) => {
                warn!(id = %missing, "project to edit no longer exists");
                Ok(ProjectForm::default())
            }
            Err(err) => Err(err),
        }
    }

    /// Creates or updates depending on whether a record is open, then closes
    /// the session. The caller reloads the catalog afterwards.
    pub fn save<S: CatalogStore>(
        &mut self,
        catalog: &CatalogClient<S>,
        form: &ProjectForm,
    ) -> Result<ProjectId, FolioError> {
        let fields = form.normalize()?;
        let id = match &self.current_id {
            Some(id) => {
                catalog.update(id, fields)?;
                id.clone()
            }
            None => catalog.create(fields)?,
        };
        self.close();
        Ok(id)
    }

    pub fn close(&mut self) {
        self.current_id = None;
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn normalize_rejects_non_integer_order() {
        let form = ProjectForm {
            order: "three".to_string(),
            ..ProjectForm::default()
        };
        assert_matches!(form.normalize(), Err(FolioError::Validation(_)));
    }

    #[test]
    fn normalize_trims_and_splits() {
        let form = ProjectForm {
            title: "  Site ".to_string(),
            category: " web".to_string(),
            technologies: "react, node ,  express,".to_string(),
            order: " 7 ".to_string(),
            ..ProjectForm::default()
        };
        let fields = form.normalize().unwrap();
        assert_eq!(fields.title.as_deref(), Some("Site"));
        assert_eq!(fields.category, Some(Category::Web));
        assert_eq!(
            fields.technologies,
            Some(vec![
                "react".to_string(),
                "node".to_string(),
                "express".to_string()
            ])
        );
        assert_eq!(fields.order, Some(7));
    }
}
