//! Interactive terminal rendition of the public work page.

use std::io::{self, Write};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use miette::IntoDiagnostic;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::app::{App, LoadState, WorkPage};
use crate::domain::{CategoryFilter, Project};
use crate::error::FolioError;
use crate::filter::FilterState;
use crate::store::CatalogStore;
use crate::watch::CatalogEvent;

const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

type LoadResult = Result<Vec<Project>, FolioError>;

pub struct WorkBrowser<S: CatalogStore + 'static> {
    app: Arc<App<S>>,
    page: WorkPage,
    input: String,
    selected: usize,
    tick: usize,
    notice: Option<String>,
}

impl<S: CatalogStore + 'static> WorkBrowser<S> {
    pub fn new(app: Arc<App<S>>, filter: FilterState) -> Self {
        let input = filter.query().to_string();
        Self {
            app,
            page: WorkPage::new(filter),
            input,
            selected: 0,
            tick: 0,
            notice: None,
        }
    }

    /// Runs until the user quits. `events` carries optional change
    /// notifications from a `SnapshotWatcher`.
    pub fn run(mut self, events: Option<Receiver<CatalogEvent>>) -> miette::Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().into_diagnostic()?;
        stdout.execute(EnterAlternateScreen).into_diagnostic()?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).into_diagnostic()?;
        terminal.clear().into_diagnostic()?;

        let result = self.event_loop(&mut terminal, events);

        disable_raw_mode().into_diagnostic()?;
        let mut stdout = io::stdout();
        stdout.execute(LeaveAlternateScreen).into_diagnostic()?;
        result
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        events: Option<Receiver<CatalogEvent>>,
    ) -> miette::Result<()> {
        let (tx, rx) = mpsc::channel::<LoadResult>();
        self.spawn_load(&tx);

        loop {
            terminal
                .draw(|frame| draw_ui(frame, self))
                .into_diagnostic()?;

            if let Ok(result) = rx.try_recv() {
                self.page.finish_load(result);
                self.clamp_selection();
            }

            if let Some(events) = &events {
                while let Ok(event) = events.try_recv() {
                    self.apply_event(event);
                }
            }

            if event::poll(Duration::from_millis(120)).into_diagnostic()? {
                if let Event::Key(key) = event::read().into_diagnostic()? {
                    match self.handle_key(key) {
                        KeyAction::Quit => break,
                        KeyAction::Reload => self.spawn_load(&tx),
                        KeyAction::None => {}
                    }
                }
            }

            self.tick = self.tick.wrapping_add(1);
        }
        Ok(())
    }

    /// Applies a watcher event. Failures become a status-line notice and
    /// the last good catalog stays on screen.
    pub fn apply_event(&mut self, event: CatalogEvent) {
        match event {
            CatalogEvent::Snapshot(projects) => {
                self.notice = None;
                self.page.apply_snapshot(projects);
            }
            CatalogEvent::Failed(message) => {
                self.notice = Some(format!("Live updates interrupted: {message}"));
            }
        }
        self.clamp_selection();
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn page(&self) -> &WorkPage {
        &self.page
    }

    fn spawn_load(&mut self, tx: &Sender<LoadResult>) {
        if !self.page.begin_load() {
            return;
        }
        let app = self.app.clone();
        let tx = tx.clone();
        thread::spawn(move || {
            let _ = tx.send(app.catalog().list_all());
        });
    }

    fn handle_key(&mut self, key: KeyEvent) -> KeyAction {
        if key.kind != KeyEventKind::Press {
            return KeyAction::None;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') | KeyCode::Char('q') => KeyAction::Quit,
                KeyCode::Char('r') => KeyAction::Reload,
                _ => KeyAction::None,
            };
        }
        match key.code {
            KeyCode::Esc => {
                if self.input.is_empty() {
                    return KeyAction::Quit;
                }
                self.input.clear();
                self.page.clear_query();
                self.selected = 0;
            }
            KeyCode::F(5) => return KeyAction::Reload,
            KeyCode::Tab | KeyCode::Right => self.cycle_category(1),
            KeyCode::BackTab | KeyCode::Left => self.cycle_category(-1),
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => {
                self.selected += 1;
                self.clamp_selection();
            }
            KeyCode::Backspace => {
                self.input.pop();
                self.page.set_query(&self.input);
                self.selected = 0;
            }
            KeyCode::Char(ch) => {
                self.input.push(ch);
                self.page.set_query(&self.input);
                self.selected = 0;
            }
            _ => {}
        }
        KeyAction::None
    }

    fn cycle_category(&mut self, step: isize) {
        let choices = CategoryFilter::choices();
        let current = choices
            .iter()
            .position(|choice| choice == self.page.filter().category())
            .unwrap_or(0) as isize;
        let len = choices.len() as isize;
        let next = (current + step).rem_euclid(len) as usize;
        self.page.set_category(choices[next].clone());
        self.selected = 0;
    }

    fn clamp_selection(&mut self) {
        let visible = self.page.visible().len();
        if visible == 0 {
            self.selected = 0;
        } else if self.selected >= visible {
            self.selected = visible - 1;
        }
    }
}

enum KeyAction {
    None,
    Quit,
    Reload,
}

/// Outcome of feeding one key to a [`PasswordInput`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordStep {
    Pending,
    Done(String),
    Cancelled,
}

/// Collects a password from key events without echoing it.
#[derive(Debug, Default)]
pub struct PasswordInput {
    buffer: String,
}

impl PasswordInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_key(&mut self, key: KeyEvent) -> PasswordStep {
        if key.kind != KeyEventKind::Press {
            return PasswordStep::Pending;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') | KeyCode::Char('d') => PasswordStep::Cancelled,
                _ => PasswordStep::Pending,
            };
        }
        match key.code {
            KeyCode::Enter => PasswordStep::Done(std::mem::take(&mut self.buffer)),
            KeyCode::Esc => PasswordStep::Cancelled,
            KeyCode::Backspace => {
                self.buffer.pop();
                PasswordStep::Pending
            }
            KeyCode::Char(ch) => {
                self.buffer.push(ch);
                PasswordStep::Pending
            }
            _ => PasswordStep::Pending,
        }
    }
}

/// Prompts on stderr and reads a password with terminal echo off.
pub fn read_password(label: &str) -> miette::Result<String> {
    let mut stderr = io::stderr();
    write!(stderr, "{label}").into_diagnostic()?;
    stderr.flush().into_diagnostic()?;

    enable_raw_mode().into_diagnostic()?;
    let result = read_password_keys();
    disable_raw_mode().into_diagnostic()?;
    writeln!(stderr).into_diagnostic()?;

    match result? {
        Some(password) => Ok(password),
        None => Err(FolioError::AuthFailed("sign-in cancelled".to_string()).into()),
    }
}

fn read_password_keys() -> miette::Result<Option<String>> {
    let mut input = PasswordInput::new();
    loop {
        if let Event::Key(key) = event::read().into_diagnostic()? {
            match input.push_key(key) {
                PasswordStep::Pending => {}
                PasswordStep::Done(password) => return Ok(Some(password)),
                PasswordStep::Cancelled => return Ok(None),
            }
        }
    }
}

fn draw_ui<S: CatalogStore + 'static>(frame: &mut ratatui::Frame, browser: &WorkBrowser<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(1),
        ])
        .split(frame.area());

    frame.render_widget(draw_filters(browser), chunks[0]);
    frame.render_widget(draw_search(browser), chunks[1]);
    draw_body(frame, browser, chunks[2]);
    frame.render_widget(draw_status(browser), chunks[3]);
}

fn draw_filters<S: CatalogStore + 'static>(browser: &WorkBrowser<S>) -> Paragraph<'static> {
    let counts = browser.page.counts();
    let active = browser.page.filter().category();
    let mut spans = vec![
        Span::styled(
            "WORK",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
    ];
    for choice in CategoryFilter::choices() {
        let style = if &choice == active {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Green)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(
            format!(" {} {} ", choice.label(), counts.get(&choice)),
            style,
        ));
        spans.push(Span::raw(" "));
    }
    Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::BOTTOM))
}

fn draw_search<S: CatalogStore + 'static>(browser: &WorkBrowser<S>) -> Paragraph<'static> {
    let cursor = if browser.tick % 8 < 4 { "▏" } else { " " };
    let line = if browser.input.is_empty() {
        Line::from(vec![
            Span::styled("search ", Style::default().fg(Color::Cyan)),
            Span::raw(cursor),
            Span::styled(
                "title, description or technology",
                Style::default().fg(Color::DarkGray),
            ),
        ])
    } else {
        Line::from(vec![
            Span::styled("search ", Style::default().fg(Color::Cyan)),
            Span::raw(browser.input.clone()),
            Span::raw(cursor),
        ])
    };
    Paragraph::new(line).block(Block::default().borders(Borders::ALL))
}

fn draw_body<S: CatalogStore + 'static>(
    frame: &mut ratatui::Frame,
    browser: &WorkBrowser<S>,
    area: Rect,
) {
    let message = match browser.page.display_state() {
        LoadState::Loading => Some(vec![Line::from(format!(
            "{} Loading projects...",
            SPINNER[browser.tick % SPINNER.len()]
        ))]),
        LoadState::Error { message } => Some(vec![
            Line::styled(
                "Could not load projects",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            Line::from(message),
            Line::from(""),
            Line::styled("Press F5 to retry", Style::default().fg(Color::Yellow)),
        ]),
        LoadState::Empty => Some(vec![
            Line::from("No projects found"),
            Line::styled(
                "Try a different category or search term",
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        LoadState::Loaded => None,
    };
    if let Some(lines) = message {
        let panel = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(panel, area);
        return;
    }

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let visible = browser.page.visible();
    let rows = visible
        .iter()
        .enumerate()
        .map(|(index, project)| {
            let style = if index == browser.selected {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else {
                Style::default()
            };
            let star = if project.featured { " ★" } else { "" };
            Line::styled(
                format!("{:02}  {}{}", index + 1, project.title, star),
                style,
            )
        })
        .collect::<Vec<_>>();
    let list = Paragraph::new(rows).block(Block::default().borders(Borders::ALL).title("Projects"));
    frame.render_widget(list, columns[0]);

    if let Some(project) = visible.get(browser.selected) {
        frame.render_widget(draw_details(project), columns[1]);
    }
}

fn draw_details(project: &Project) -> Paragraph<'static> {
    let label = Style::default().fg(Color::Gray);
    let mut lines = vec![
        Line::styled(
            project.title.clone(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Line::from(vec![
            Span::styled("category ", label),
            Span::raw(project.category.display_name().to_string()),
        ]),
        Line::from(""),
        Line::from(project.description.clone()),
        Line::from(""),
    ];
    if !project.technologies.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("tech ", label),
            Span::styled(
                project.technologies.join(" · "),
                Style::default().fg(Color::Green),
            ),
        ]));
    }
    if let Some(url) = &project.github_url {
        lines.push(Line::from(vec![
            Span::styled("github ", label),
            Span::raw(url.clone()),
        ]));
    }
    if let Some(url) = &project.live_url {
        lines.push(Line::from(vec![
            Span::styled("live ", label),
            Span::raw(url.clone()),
        ]));
    }
    Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Details"))
}

fn draw_status<S: CatalogStore + 'static>(browser: &WorkBrowser<S>) -> Paragraph<'static> {
    let line = match browser.notice() {
        Some(notice) => Line::styled(
            format!("{notice} · F5 reload"),
            Style::default().fg(Color::Yellow),
        ),
        None => Line::styled(
            "Tab/←→ category · type to search · ↑↓ select · F5 reload · Esc clear/quit",
            Style::default().fg(Color::DarkGray),
        ),
    };
    Paragraph::new(line)
}
