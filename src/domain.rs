use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FolioError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProjectId {
    type Err = FolioError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let is_valid = !trimmed.is_empty()
            && !trimmed.contains('/')
            && trimmed != "."
            && trimmed != ".."
            && !trimmed.chars().any(char::is_whitespace);
        if !is_valid {
            return Err(FolioError::InvalidProjectId(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Project category. Values outside the known set are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Web,
    Ai,
    Analytics,
    Collaboration,
    Other(String),
}

impl Category {
    pub const NAMED: [Category; 4] = [
        Category::Web,
        Category::Ai,
        Category::Analytics,
        Category::Collaboration,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Category::Web => "web",
            Category::Ai => "ai",
            Category::Analytics => "analytics",
            Category::Collaboration => "collaboration",
            Category::Other(value) => value,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Category::Web => "Web Apps",
            Category::Ai => "AI/ML",
            Category::Analytics => "Analytics",
            Category::Collaboration => "Collaboration",
            Category::Other(value) => value,
        }
    }

    pub fn is_named(&self) -> bool {
        !matches!(self, Category::Other(_))
    }
}

/// Named values match case-insensitively; anything else is kept verbatim.
impl From<String> for Category {
    fn from(value: String) -> Self {
        let key = value.trim().to_ascii_lowercase();
        match key.as_str() {
            "web" => Category::Web,
            "ai" => Category::Ai,
            "analytics" => Category::Analytics,
            "collaboration" => Category::Collaboration,
            _ => Category::Other(value),
        }
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        Category::from(value.to_string())
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        match value {
            Category::Other(value) => value,
            named => named.as_str().to_string(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    /// Filter values the work page offers, in button order.
    pub fn choices() -> Vec<CategoryFilter> {
        std::iter::once(CategoryFilter::All)
            .chain(Category::NAMED.into_iter().map(CategoryFilter::Only))
            .collect()
    }

    pub fn matches(&self, category: &Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(wanted) => wanted == category,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CategoryFilter::All => "all",
            CategoryFilter::Only(category) => category.as_str(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            CategoryFilter::All => "All",
            CategoryFilter::Only(category) => category.display_name(),
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CategoryFilter {
    type Err = FolioError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        match normalized.as_str() {
            "" => Err(FolioError::InvalidFilter(value.to_string())),
            "all" => Ok(CategoryFilter::All),
            _ => match Category::from(normalized) {
                Category::Other(_) => Err(FolioError::InvalidFilter(value.to_string())),
                named => Ok(CategoryFilter::Only(named)),
            },
        }
    }
}

/// A catalog entry after normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    pub category: Category,
    pub description: String,
    pub image_url: String,
    pub github_url: Option<String>,
    pub live_url: Option<String>,
    pub technologies: Vec<String>,
    pub order: i64,
    pub featured: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields supplied to a create or update. `None` means "not provided".
///
/// For the link fields an empty string is a provided value that clears the
/// link.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectFields {
    pub title: Option<String>,
    pub category: Option<Category>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub github_url: Option<String>,
    pub live_url: Option<String>,
    pub technologies: Option<Vec<String>>,
    pub order: Option<i64>,
    pub featured: Option<bool>,
}

impl ProjectFields {
    pub fn is_empty(&self) -> bool {
        *self == ProjectFields::default()
    }

    /// Names of the required create fields that are absent or blank.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(self.title.as_deref()) {
            missing.push("title");
        }
        if is_blank(self.category.as_ref().map(Category::as_str)) {
            missing.push("category");
        }
        if is_blank(self.description.as_deref()) {
            missing.push("description");
        }
        if is_blank(self.image_url.as_deref()) {
            missing.push("imageUrl");
        }
        if self.order.is_none() {
            missing.push("order");
        }
        missing
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map(|value| value.trim().is_empty()).unwrap_or(true)
}

/// Splits a comma list into trimmed, non-empty tags.
pub fn split_technologies(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Empty or whitespace-only link values mean "no link".
pub fn normalize_link(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
