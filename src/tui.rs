use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;
use std::sync::mpsc::Receiver;

use crate::db::{Collection, Database, StoreChange};
use crate::listing::ListQuery;
use crate::models::{ApplicationStatus, JobApplication};

struct AppState {
    apps: Vec<JobApplication>,
    query: ListQuery,
    selected: usize,
    scroll_offset: u16,
    message: Option<String>,
}

impl AppState {
    fn new(apps: Vec<JobApplication>, query: ListQuery) -> Self {
        Self {
            apps,
            query,
            selected: 0,
            scroll_offset: 0,
            message: None,
        }
    }

    fn current(&self) -> Option<&JobApplication> {
        self.apps.get(self.selected)
    }

    /// Re-reads the collection, keeping the selection on the same record when it survives.
    fn reload(&mut self, db: &Database) -> Result<()> {
        let keep = self.current().map(|a| a.id.clone());
        self.apps = self.query.apply(db.list_applications()?);
        self.selected = keep
            .and_then(|id| self.apps.iter().position(|a| a.id == id))
            .unwrap_or(0)
            .min(self.apps.len().saturating_sub(1));
        Ok(())
    }

    fn next(&mut self) {
        if !self.apps.is_empty() && self.selected < self.apps.len() - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }
}

fn status_for_key(code: KeyCode) -> Option<ApplicationStatus> {
    match code {
        KeyCode::Char('a') => Some(ApplicationStatus::Applied),
        KeyCode::Char('i') => Some(ApplicationStatus::Interview),
        KeyCode::Char('o') => Some(ApplicationStatus::Offer),
        KeyCode::Char('x') => Some(ApplicationStatus::Rejected),
        KeyCode::Char('p') => Some(ApplicationStatus::Pending),
        KeyCode::Char('w') => Some(ApplicationStatus::Withdrawn),
        _ => None,
    }
}

fn status_color(status: ApplicationStatus) -> Color {
    match status {
        ApplicationStatus::Applied => Color::Cyan,
        ApplicationStatus::Interview => Color::Yellow,
        ApplicationStatus::Offer => Color::Green,
        ApplicationStatus::Rejected => Color::Red,
        ApplicationStatus::Pending => Color::Magenta,
        ApplicationStatus::Withdrawn => Color::DarkGray,
    }
}

pub fn run_browse(db: &Database, query: ListQuery) -> Result<()> {
    let apps = query.apply(db.list_applications()?);
    if apps.is_empty() {
        println!("No applications found.");
        return Ok(());
    }

    let changes = db.subscribe();
    let mut state = AppState::new(apps, query);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, db, &changes);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn set_status(state: &mut AppState, db: &Database, status: ApplicationStatus) {
    let Some(app) = state.current() else { return };
    let mut edited = app.clone();
    edited.status = status;
    state.message = Some(match db.update_application(&edited) {
        Ok(updated) => format!("{} marked {}", updated.company_name, status),
        Err(e) => format!("Update failed: {}", e),
    });
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    db: &Database,
    changes: &Receiver<StoreChange>,
) -> Result<()> {
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        let stale = changes
            .try_iter()
            .any(|c| c.collection == Collection::Applications);
        if stale {
            state.reload(db)?;
            list_state.select(Some(state.selected));
        }

        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
                KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
                code => {
                    if let Some(status) = status_for_key(code) {
                        set_status(state, db, status);
                    }
                }
            }
            list_state.select(Some(state.selected));
        }
    }
    Ok(())
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[0]);

    // Left panel: application list
    let items: Vec<ListItem> = state
        .apps
        .iter()
        .map(|app| {
            let line = Line::from(vec![
                Span::styled(
                    format!("{:<10}", app.status.as_str()),
                    Style::default().fg(status_color(app.status)),
                ),
                Span::raw(format!(
                    "{} {} | {}",
                    app.application_date.format("%m/%d"),
                    crate::truncate(&app.company_name, 20),
                    crate::truncate(&app.job_title, 24)
                )),
            ]);
            ListItem::new(line)
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Applications ({}) ", state.apps.len())),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: detail
    let detail_widget = Paragraph::new(build_detail(state))
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));
    frame.render_widget(detail_widget, chunks[1]);

    let footer = state.message.clone().unwrap_or_else(|| {
        " j/k:navigate  J/K:scroll  a:applied i:interview o:offer x:rejected p:pending w:withdrawn  q:quit"
            .to_string()
    });
    let help = Paragraph::new(footer).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, rows[1]);
}

fn build_detail(state: &AppState) -> Text<'_> {
    let Some(app) = state.current() else {
        return Text::raw("No application selected");
    };

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        &app.job_title,
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(format!("at {}", app.company_name)));
    lines.push(Line::from(Span::styled(
        format!("Status: {}", app.status),
        Style::default().fg(status_color(app.status)),
    )));
    lines.push(Line::from(format!("Source: {}", app.source)));
    lines.push(Line::from(format!(
        "Applied: {}",
        app.application_date.format("%b %-d, %Y")
    )));
    if !app.application_portal.is_empty() {
        lines.push(Line::from(format!("Portal: {}", app.application_portal)));
    }
    for (label, doc) in [("Resume", &app.resume), ("Cover letter", &app.cover_letter)] {
        if let Some(doc) = doc {
            lines.push(Line::from(format!("{}: {} ({})", label, doc.name, doc.kind.as_str())));
        }
    }
    lines.push(Line::from(Span::styled(
        format!("Updated: {}", app.last_updated.format("%Y-%m-%d %H:%M")),
        Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::from(""));

    for (heading, body) in [("Description", &app.job_description), ("Notes", &app.notes)] {
        if body.trim().is_empty() {
            continue;
        }
        lines.push(Line::from(Span::styled(
            heading,
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for line in textwrap::fill(body, 70).lines() {
            lines.push(Line::from(format!("  {}", line)));
        }
        lines.push(Line::from(""));
    }

    Text::from(lines)
}
