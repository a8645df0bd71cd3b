use std::io::{self, Write};

use serde::Serialize;

use crate::app::{AdminListResult, DeleteResult, LoadState, SaveResult, WorkView};
use crate::contact::ContactResult;
use crate::domain::Project;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_work(view: &WorkView) -> io::Result<()> {
        Self::print_json(view)
    }

    pub fn print_admin_list(result: &AdminListResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_project(project: &Project) -> io::Result<()> {
        Self::print_json(project)
    }

    pub fn print_save(result: &SaveResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_delete(result: &DeleteResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_contact(result: &ContactResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

/// Plain-text rendering for terminals.
pub struct TextOutput;

impl TextOutput {
    pub fn print_work(view: &WorkView) -> io::Result<()> {
        let mut out = io::stdout().lock();
        let filters = view
            .filters
            .iter()
            .map(|choice| {
                let marker = if choice.active { "*" } else { "" };
                format!("{marker}{} ({})", choice.label, choice.count)
            })
            .collect::<Vec<_>>()
            .join("  ");
        writeln!(out, "{filters}")?;
        if !view.query.is_empty() {
            writeln!(out, "search: {}", view.query)?;
        }
        match &view.state {
            LoadState::Loading => writeln!(out, "Loading projects...")?,
            LoadState::Error { message } => {
                writeln!(out, "Could not load projects: {message}")?;
                writeln!(out, "Run the command again to retry.")?;
            }
            LoadState::Empty => writeln!(out, "No projects found.")?,
            LoadState::Loaded => {
                for card in &view.projects {
                    let featured = if card.featured { " [featured]" } else { "" };
                    writeln!(
                        out,
                        "{}  {}{}  ({})",
                        card.number, card.title, featured, card.category_label
                    )?;
                    writeln!(out, "    {}", card.description)?;
                    if !card.technologies.is_empty() {
                        writeln!(out, "    tech: {}", card.technologies.join(" · "))?;
                    }
                    if let Some(url) = &card.github_url {
                        writeln!(out, "    github: {url}")?;
                    }
                    if let Some(url) = &card.live_url {
                        writeln!(out, "    live: {url}")?;
                    }
                }
            }
        }
        Ok(())
    }

    pub fn print_admin_list(result: &AdminListResult) -> io::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "Total projects: {}", result.total)?;
        if result.projects.is_empty() {
            writeln!(
                out,
                "No projects yet. Run `folio admin add` to create one."
            )?;
            return Ok(());
        }
        writeln!(
            out,
            "{:>5}  {:<32}  {:<14}  {:<8}  {}",
            "ORDER", "TITLE", "CATEGORY", "FEATURED", "ID"
        )?;
        for row in &result.projects {
            writeln!(
                out,
                "{:>5}  {:<32}  {:<14}  {:<8}  {}",
                row.order,
                truncate(&row.title, 32),
                truncate(&row.category, 14),
                if row.featured { "yes" } else { "-" },
                row.id
            )?;
        }
        Ok(())
    }

    pub fn print_project(project: &Project) -> io::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{} ({})", project.title, project.id)?;
        writeln!(out, "category:     {}", project.category.display_name())?;
        writeln!(out, "order:        {}", project.order)?;
        writeln!(out, "featured:     {}", project.featured)?;
        writeln!(out, "description:  {}", project.description)?;
        writeln!(out, "image:        {}", project.image_url)?;
        writeln!(
            out,
            "github:       {}",
            project.github_url.as_deref().unwrap_or("-")
        )?;
        writeln!(
            out,
            "live:         {}",
            project.live_url.as_deref().unwrap_or("-")
        )?;
        writeln!(out, "technologies: {}", project.technologies.join(", "))?;
        if let Some(created) = project.created_at {
            writeln!(out, "created:      {}", created.to_rfc3339())?;
        }
        if let Some(updated) = project.updated_at {
            writeln!(out, "updated:      {}", updated.to_rfc3339())?;
        }
        Ok(())
    }

    pub fn print_save(result: &SaveResult) -> io::Result<()> {
        println!("Project {} successfully! ({})", result.action, result.id);
        Self::print_reloaded(result.catalog.as_ref(), result.reload_error.as_deref())
    }

    pub fn print_delete(result: &DeleteResult) -> io::Result<()> {
        println!("Project deleted successfully! ({})", result.id);
        Self::print_reloaded(result.catalog.as_ref(), result.reload_error.as_deref())
    }

    fn print_reloaded(catalog: Option<&AdminListResult>, error: Option<&str>) -> io::Result<()> {
        match catalog {
            Some(catalog) => Self::print_admin_list(catalog),
            None => {
                println!(
                    "Could not reload the project list: {}",
                    error.unwrap_or("unknown error")
                );
                println!("Run `folio admin list` to check the catalog.");
                Ok(())
            }
        }
    }

    pub fn print_contact(result: &ContactResult) -> io::Result<()> {
        println!("✓ {}", result.message);
        Ok(())
    }
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    let mut short = value.chars().take(max.saturating_sub(1)).collect::<String>();
    short.push('…');
    short
}
