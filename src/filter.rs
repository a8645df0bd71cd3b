use serde::Serialize;

use crate::domain::{Category, CategoryFilter, Project};

/// Active filter and search query for one view of the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    category: CategoryFilter,
    query: String,
}

impl FilterState {
    pub fn new(category: CategoryFilter, query: &str) -> Self {
        Self {
            category,
            query: query.trim().to_string(),
        }
    }

    pub fn category(&self) -> &CategoryFilter {
        &self.category
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_category(&mut self, category: CategoryFilter) {
        self.category = category;
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.trim().to_string();
    }

    pub fn clear_query(&mut self) {
        self.query.clear();
    }

    pub fn apply<'a>(&self, projects: &'a [Project]) -> Vec<&'a Project> {
        filter_projects(projects, &self.category, &self.query)
    }
}

pub fn filter_projects<'a>(
    projects: &'a [Project],
    category: &CategoryFilter,
    query: &str,
) -> Vec<&'a Project> {
    let needle = query.trim().to_lowercase();
    projects
        .iter()
        .filter(|project| category.matches(&project.category))
        .filter(|project| needle.is_empty() || matches_query(project, &needle))
        .collect()
}

/// `needle` must already be lowercased.
pub fn matches_query(project: &Project, needle: &str) -> bool {
    project.title.to_lowercase().contains(needle)
        || project.description.to_lowercase().contains(needle)
        || project
            .technologies
            .iter()
            .any(|tech| tech.to_lowercase().contains(needle))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    pub all: usize,
    pub web: usize,
    pub ai: usize,
    pub analytics: usize,
    pub collaboration: usize,
}

impl CategoryCounts {
    pub fn from_projects(projects: &[Project]) -> Self {
        let mut counts = CategoryCounts {
            all: projects.len(),
            ..CategoryCounts::default()
        };
        for project in projects {
            match project.category {
                Category::Web => counts.web += 1,
                Category::Ai => counts.ai += 1,
                Category::Analytics => counts.analytics += 1,
                Category::Collaboration => counts.collaboration += 1,
                Category::Other(_) => {}
            }
        }
        counts
    }

    pub fn get(&self, filter: &CategoryFilter) -> usize {
        match filter {
            CategoryFilter::All => self.all,
            CategoryFilter::Only(Category::Web) => self.web,
            CategoryFilter::Only(Category::Ai) => self.ai,
            CategoryFilter::Only(Category::Analytics) => self.analytics,
            CategoryFilter::Only(Category::Collaboration) => self.collaboration,
            CategoryFilter::Only(Category::Other(_)) => 0,
        }
    }
}
