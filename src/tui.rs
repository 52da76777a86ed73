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

use crate::datastore::{ActiveBackend, DataStore};
use crate::models::Record;
use crate::store::{ListQuery, PAGE_SIZE, Page};

struct AppState {
    records: Vec<Record>,
    selected: usize,
    scroll_offset: u16,
    backend: ActiveBackend,
}

impl AppState {
    fn new(records: Vec<Record>, backend: ActiveBackend) -> Self {
        Self {
            records,
            selected: 0,
            scroll_offset: 0,
            backend,
        }
    }

    fn current(&self) -> Option<&Record> {
        self.records.get(self.selected)
    }

    fn page(&self) -> Page {
        Page::of(self.records.len(), self.selected / PAGE_SIZE)
    }

    fn select(&mut self, index: usize) {
        if index < self.records.len() && index != self.selected {
            self.selected = index;
            self.scroll_offset = 0;
        }
    }

    fn next(&mut self) {
        self.select(self.selected + 1);
    }

    fn prev(&mut self) {
        if let Some(index) = self.selected.checked_sub(1) {
            self.select(index);
        }
    }

    fn next_page(&mut self) {
        let page = self.page();
        if page.index + 1 < page.count {
            self.select(page.end);
        }
    }

    fn prev_page(&mut self) {
        let page = self.page();
        if page.index > 0 {
            self.select(page.start - PAGE_SIZE);
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }

    fn reload(&mut self, store: &mut DataStore) -> Result<()> {
        self.records = store.list(&ListQuery::default())?;
        self.backend = store.active_backend();
        self.selected = self.selected.min(self.records.len().saturating_sub(1));
        self.scroll_offset = 0;
        Ok(())
    }
}

pub fn run_browse(store: &mut DataStore) -> Result<()> {
    let records = store.list(&ListQuery::default())?;
    if records.is_empty() {
        println!("No applications found.");
        return Ok(());
    }

    let mut state = AppState::new(records, store.active_backend());

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, store);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    store: &mut DataStore,
) -> Result<()> {
    let mut list_state = ListState::default();

    loop {
        list_state.select(Some(state.selected % PAGE_SIZE));
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Right | KeyCode::Char('n') => state.next_page(),
                KeyCode::Left | KeyCode::Char('p') => state.prev_page(),
                KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
                KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
                KeyCode::Char('r') => state.reload(store)?,
                _ => {}
            }
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

    // Left panel: current page
    let page = state.page();
    let items: Vec<ListItem> = state.records[page.start..page.end]
        .iter()
        .map(|record| {
            ListItem::new(format!(
                "{} {} | {}",
                record.date,
                truncate(&record.company, 20),
                truncate(&record.role, 24)
            ))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Applications ({}) - page {}/{} ",
            state.records.len(),
            page.index + 1,
            page.count
        )))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: detail
    let detail_widget = Paragraph::new(build_detail(state))
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));

    frame.render_widget(detail_widget, chunks[1]);

    let help = Paragraph::new(format!(
        " j/k:navigate  n/p:page  J/K:scroll  r:reload  q:quit   [{}]",
        state.backend
    ))
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, rows[1]);
}

fn status_style(status: &str) -> Style {
    match status {
        "Inscrito" => Style::default().fg(Color::Cyan),
        "Entrevista" => Style::default().fg(Color::Yellow),
        "Rejeitado" => Style::default().fg(Color::Red),
        "Contratado" => Style::default().fg(Color::Green),
        _ => Style::default(),
    }
}

fn build_detail(state: &AppState) -> Text<'_> {
    let Some(record) = state.current() else {
        return Text::raw("No application selected");
    };

    let mut lines: Vec<Line> = vec![
        Line::from(Span::styled(
            record.company.as_str(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(record.role.as_str()),
        Line::from(""),
        Line::from(format!("Date:   {}", record.date)),
    ];
    if !record.mode.is_empty() {
        lines.push(Line::from(format!("Mode:   {}", record.mode)));
    }
    lines.push(Line::from(Span::styled(
        format!("Status: {}", record.status),
        status_style(&record.status),
    )));

    if !record.link.is_empty() {
        let mut spans = vec![Span::raw(format!("Link:   {}", record.link))];
        if !record.has_openable_link() {
            spans.push(Span::styled(
                "  (invalid link)",
                Style::default().fg(Color::DarkGray),
            ));
        }
        lines.push(Line::from(spans));
    }

    lines.push(Line::from(""));
    if record.notes.is_empty() {
        lines.push(Line::from(Span::styled(
            "(no notes)",
            Style::default().fg(Color::DarkGray),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "Notes",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for line in textwrap::fill(&record.notes, 70).lines() {
            lines.push(Line::from(format!("  {}", line)));
        }
    }

    Text::from(lines)
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| Record {
                company: format!("Company {i}"),
                ..Record::default()
            })
            .collect()
    }

    #[test]
    fn test_navigation_moves_across_pages() {
        let mut state = AppState::new(records(45), ActiveBackend::Local);
        state.next_page();
        assert_eq!(state.selected, 20);
        state.next_page();
        assert_eq!(state.selected, 40);
        state.next_page();
        assert_eq!(state.selected, 40);

        state.prev_page();
        assert_eq!(state.selected, 20);
        state.prev();
        assert_eq!(state.page().index, 0);

        state.select(44);
        state.next();
        assert_eq!(state.selected, 44);
    }

    #[test]
    fn test_prev_page_from_middle_of_page() {
        let mut state = AppState::new(records(45), ActiveBackend::Local);
        state.select(27);
        state.prev_page();
        assert_eq!(state.selected, 0);
    }

    #[test]
    fn test_truncate_is_char_aware() {
        assert_eq!(truncate("Híbrido", 10), "Híbrido");
        assert_eq!(truncate("Ação Engenharia", 8), "Ação ...");
    }
}
