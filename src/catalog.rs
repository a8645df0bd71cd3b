use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Number, Value};
use tracing::{debug, info, warn};

use crate::domain::{Category, Project, ProjectFields, ProjectId, normalize_link, split_technologies};
use crate::error::FolioError;
use crate::store::{CatalogStore, Document, DocumentWrite, Fields};

pub const DEFAULT_COLLECTION: &str = "projects";
pub const ORDER_FIELD: &str = "order";
pub const CREATED_AT_FIELD: &str = "createdAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Stored shape of `technologies`: an array, or one comma-separated string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TechnologiesField {
    List(Vec<String>),
    Csv(String),
}

impl TechnologiesField {
    pub fn normalize(self) -> Vec<String> {
        match self {
            TechnologiesField::List(items) => items
                .into_iter()
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect(),
            TechnologiesField::Csv(value) => split_technologies(&value),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum OrderField {
    Int(i64),
    Float(f64),
}

impl OrderField {
    fn value(self) -> i64 {
        match self {
            OrderField::Int(value) => value,
            OrderField::Float(value) => value as i64,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectRecord {
    title: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    github_url: Option<String>,
    #[serde(default)]
    live_url: Option<String>,
    #[serde(default)]
    technologies: Option<TechnologiesField>,
    #[serde(default)]
    order: Option<OrderField>,
    #[serde(default)]
    featured: Option<bool>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

/// Decodes a stored document into a normalized [`Project`].
pub fn decode_project(document: Document) -> Result<Project, FolioError> {
    let Document { id, fields } = document;
    let project_id: ProjectId = id.parse().map_err(|_| FolioError::MalformedDocument {
        id: id.clone(),
        message: "invalid document id".to_string(),
    })?;
    let record: ProjectRecord =
        serde_json::from_value(Value::Object(fields)).map_err(|err| {
            FolioError::MalformedDocument {
                id: id.clone(),
                message: err.to_string(),
            }
        })?;

    Ok(Project {
        id: project_id,
        title: record.title,
        category: Category::from(record.category.unwrap_or_default()),
        description: record.description.unwrap_or_default(),
        image_url: record.image_url.unwrap_or_default(),
        github_url: normalize_link(record.github_url),
        live_url: normalize_link(record.live_url),
        technologies: record
            .technologies
            .map(TechnologiesField::normalize)
            .unwrap_or_default(),
        order: record.order.map(OrderField::value).unwrap_or_default(),
        featured: record.featured.unwrap_or(false),
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}

/// Encodes only the provided fields.
pub fn encode_fields(fields: &ProjectFields) -> Fields {
    let mut out = Fields::new();
    let mut put = |name: &str, value: Value| {
        out.insert(name.to_string(), value);
    };
    if let Some(title) = &fields.title {
        put("title", Value::String(title.clone()));
    }
    if let Some(category) = &fields.category {
        put("category", Value::String(category.as_str().to_string()));
    }
    if let Some(description) = &fields.description {
        put("description", Value::String(description.clone()));
    }
    if let Some(image_url) = &fields.image_url {
        put("imageUrl", Value::String(image_url.clone()));
    }
    if let Some(github_url) = &fields.github_url {
        put("githubUrl", Value::String(github_url.clone()));
    }
    if let Some(live_url) = &fields.live_url {
        put("liveUrl", Value::String(live_url.clone()));
    }
    if let Some(technologies) = &fields.technologies {
        put(
            "technologies",
            Value::Array(technologies.iter().cloned().map(Value::String).collect()),
        );
    }
    if let Some(order) = fields.order {
        put(ORDER_FIELD, Value::Number(Number::from(order)));
    }
    if let Some(featured) = fields.featured {
        put("featured", Value::Bool(featured));
    }
    out
}

#[derive(Clone)]
pub struct CatalogClient<S: CatalogStore> {
    store: S,
    collection: String,
}

impl<S: CatalogStore> CatalogClient<S> {
    pub fn new(store: S) -> Self {
        Self::with_collection(store, DEFAULT_COLLECTION)
    }

    pub fn with_collection(store: S, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Every project, ascending by `order`. An empty catalog is `Ok(vec![])`.
    pub fn list_all(&self) -> Result<Vec<Project>, FolioError> {
        let documents = self.store.list_ordered(&self.collection, ORDER_FIELD)?;
        let total = documents.len();
        let projects = documents
            .into_iter()
            .filter_map(|document| match decode_project(document) {
                Ok(project) => Some(project),
                Err(err) => {
                    warn!(error = %err, "skipping undecodable project document");
                    None
                }
            })
            .collect::<Vec<_>>();
        debug!(
            collection = %self.collection,
            listed = total,
            decoded = projects.len(),
            "listed projects"
        );
        Ok(projects)
    }

    pub fn get(&self, id: &ProjectId) -> Result<Project, FolioError> {
        let document = self
            .store
            .get(&self.collection, id.as_str())?
            .ok_or_else(|| FolioError::NotFound(id.to_string()))?;
        decode_project(document)
    }

    pub fn create(&self, fields: ProjectFields) -> Result<ProjectId, FolioError> {
        let missing = fields.missing_required();
        if !missing.is_empty() {
            return Err(FolioError::Validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }
        let write = DocumentWrite {
            fields: encode_fields(&fields),
            server_timestamps: vec![CREATED_AT_FIELD.to_string(), UPDATED_AT_FIELD.to_string()],
        };
        let id = self.store.create(&self.collection, write)?;
        info!(collection = %self.collection, id = %id, "created project");
        id.parse().map_err(|_| FolioError::MalformedDocument {
            id,
            message: "store returned an invalid document id".to_string(),
        })
    }

    pub fn update(&self, id: &ProjectId, fields: ProjectFields) -> Result<(), FolioError> {
        if fields
            .title
            .as_deref()
            .is_some_and(|title| title.trim().is_empty())
        {
            return Err(FolioError::Validation("title must not be empty".to_string()));
        }
        let write = DocumentWrite {
            fields: encode_fields(&fields),
            server_timestamps: vec![UPDATED_AT_FIELD.to_string()],
        };
        self.store.update(&self.collection, id.as_str(), write)?;
        info!(collection = %self.collection, id = %id, "updated project");
        Ok(())
    }

    pub fn delete(&self, id: &ProjectId) -> Result<(), FolioError> {
        self.store.delete(&self.collection, id.as_str())?;
        info!(collection = %self.collection, id = %id, "deleted project");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn document(id: &str, fields: Value) -> Document {
        Document {
            id: id.to_string(),
            fields: fields.as_object().cloned().unwrap(),
        }
    }

    #[test]
    fn csv_technologies_are_normalized() {
        let project = decode_project(document(
            "p1",
            json!({"title": "T", "technologies": "react, node ,  express", "order": 1}),
        ))
        .unwrap();
        assert_eq!(project.technologies, vec!["react", "node", "express"]);
    }

    #[test]
    fn array_technologies_are_kept() {
        let project = decode_project(document(
            "p1",
            json!({"title": "T", "technologies": ["go", "rust"], "order": 1}),
        ))
        .unwrap();
        assert_eq!(project.technologies, vec!["go", "rust"]);
    }

    #[test]
    fn absent_optional_fields_get_defaults() {
        let project = decode_project(document(
            "p1",
            json!({"title": "T", "githubUrl": "", "order": 2.0}),
        ))
        .unwrap();
        assert!(!project.featured);
        assert_eq!(project.github_url, None);
        assert_eq!(project.order, 2);
        assert!(project.technologies.is_empty());
    }

    #[test]
    fn missing_title_is_malformed() {
        let err = decode_project(document("p1", json!({"order": 1}))).unwrap_err();
        assert!(matches!(err, FolioError::MalformedDocument { .. }));
    }

    #[test]
    fn encode_writes_only_provided_fields() {
        let fields = ProjectFields {
            title: Some("X".to_string()),
            order: Some(4),
            ..ProjectFields::default()
        };
        let encoded = encode_fields(&fields);
        assert_eq!(encoded.len(), 2);
        assert_eq!(encoded["order"], json!(4));
    }
}
