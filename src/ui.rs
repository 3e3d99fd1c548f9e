use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use patient_records::{
    build_view, summarize, Column, DuplicateResolver, DuplicateReview, FileStorage, Gender, Record,
    RecordStore, SelectionSet, TableStorage, View, ViewQuery, SHOW_ALL,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Records,
    Duplicates,
    Statistics,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Records => Page::Duplicates,
            Page::Duplicates => Page::Statistics,
            Page::Statistics => Page::Records,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Records => Page::Statistics,
            Page::Duplicates => Page::Records,
            Page::Statistics => Page::Duplicates,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Records => "Records",
            Page::Duplicates => "Duplicates",
            Page::Statistics => "Statistics",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
}

/// Checked rows waiting for a y/n answer
#[derive(Debug, Clone)]
pub struct PendingDelete {
    pub page: Page,
    pub serials: Vec<String>,
}

pub struct App<S: TableStorage = FileStorage> {
    store: RecordStore<S>,
    resolver: DuplicateResolver,
    pub current_page: Page,
    pub query: ViewQuery,
    pub view: View,
    pub selection: SelectionSet,
    pub state: TableState,
    pub review: DuplicateReview,
    pub dup_state: TableState,
    pub show_detail: bool,
    pub input_mode: InputMode,
    pub search_input: String,
    pub pending_delete: Option<PendingDelete>,
    pub status: String,
}

impl<S: TableStorage> App<S> {
    pub fn new(store: RecordStore<S>, page_size: usize) -> Self {
        let query = ViewQuery::new().sort_by(Column::SerialNo).page_size(page_size);
        let view = build_view(store.snapshot(), &query);
        let selection = SelectionSet::for_view(&view);
        let resolver = DuplicateResolver::new();
        let review = DuplicateReview::new(&resolver, store.snapshot());

        let mut app = Self {
            store,
            resolver,
            current_page: Page::Records,
            query,
            view,
            selection,
            state: TableState::default(),
            review,
            dup_state: TableState::default(),
            show_detail: false,
            input_mode: InputMode::Normal,
            search_input: String::new(),
            pending_delete: None,
            status: String::new(),
        };
        app.reset_cursor();
        app.rebuild_duplicates();
        app
    }

    pub fn store(&self) -> &RecordStore<S> {
        &self.store
    }

    // ========================================================================
    // VIEW STATE
    // ========================================================================

    /// Rebuild the page. Any selection taken against the old page is dropped.
    pub fn rebuild_view(&mut self) {
        self.view = build_view(self.store.snapshot(), &self.query);
        self.query.page_index = self.view.page_index;
        self.selection = SelectionSet::for_view(&self.view);
        self.reset_cursor();
    }

    pub fn rebuild_duplicates(&mut self) {
        self.review = DuplicateReview::new(&self.resolver, self.store.snapshot());
        let len = self.review.visible_rows().len();
        self.dup_state.select(if len == 0 { None } else { Some(0) });
    }

    fn reset_cursor(&mut self) {
        self.state
            .select(if self.view.rows.is_empty() { None } else { Some(0) });
    }

    pub fn next_result_page(&mut self) {
        if self.view.has_next() {
            self.query.page_index = self.view.page_index + 1;
            self.rebuild_view();
        }
    }

    pub fn previous_result_page(&mut self) {
        if self.view.has_previous() {
            self.query.page_index = self.view.page_index - 1;
            self.rebuild_view();
        }
    }

    pub fn apply_search(&mut self) {
        self.query.search_text = self.search_input.trim().to_string();
        self.query.page_index = 0;
        self.rebuild_view();
    }

    /// All → Male → Female → Other → All
    pub fn cycle_gender_filter(&mut self) {
        let current = self
            .query
            .filters
            .get(&Column::Gender)
            .map(String::as_str)
            .unwrap_or(SHOW_ALL);

        let next = match Gender::parse(current) {
            None => Gender::Male.label(),
            Some(Gender::Male) => Gender::Female.label(),
            Some(Gender::Female) => Gender::Other.label(),
            Some(Gender::Other) => SHOW_ALL,
        };

        self.query.filters.insert(Column::Gender, next.to_string());
        self.query.page_index = 0;
        self.rebuild_view();
    }

    pub fn cycle_sort(&mut self) {
        let sortable = Column::SORTABLE;
        let next = match self.query.sort_key {
            Some(current) => sortable
                .iter()
                .position(|c| *c == current)
                .map(|i| sortable[(i + 1) % sortable.len()])
                .unwrap_or(sortable[0]),
            None => sortable[0],
        };
        self.query.sort_key = Some(next);
        self.rebuild_view();
    }

    /// Drop search, filters and sort back to the startup view
    pub fn clear_query(&mut self) {
        self.search_input.clear();
        self.query = ViewQuery::new()
            .sort_by(Column::SerialNo)
            .page_size(self.query.page_size);
        self.rebuild_view();
    }

    pub fn selected_record(&self) -> Option<&Record> {
        self.state.selected().and_then(|i| self.view.rows.get(i))
    }

    fn selected_duplicate_serial(&self) -> Option<String> {
        let rows = self.review.visible_rows();
        self.dup_state
            .selected()
            .and_then(|i| rows.get(i))
            .map(|r| r.serial_no.clone())
    }

    pub fn toggle_current(&mut self) {
        match self.current_page {
            Page::Records => {
                if let Some(serial) = self.selected_record().map(|r| r.serial_no.clone()) {
                    self.selection.toggle(&serial);
                }
            }
            Page::Duplicates => {
                if let Some(serial) = self.selected_duplicate_serial() {
                    self.review.selection_mut().toggle(&serial);
                }
            }
            Page::Statistics => {}
        }
    }

    pub fn toggle_all(&mut self) {
        match self.current_page {
            Page::Records => self.selection.toggle_all(),
            Page::Duplicates => self.review.selection_mut().toggle_all(),
            Page::Statistics => {}
        }
    }

    pub fn hide_checked_duplicates(&mut self) {
        let hidden = self.review.hide_checked();
        let len = self.review.visible_rows().len();
        self.dup_state.select(if len == 0 { None } else { Some(0) });
        self.status = format!("Marked {} rows as not duplicate", hidden);
    }

    // ========================================================================
    // DELETION
    // ========================================================================

    pub fn request_delete(&mut self) {
        let serials = match self.current_page {
            Page::Records if self.selection.is_for(&self.view) => self.selection.checked_ids(),
            Page::Duplicates => self.review.checked_ids(),
            _ => Vec::new(),
        };

        if serials.is_empty() {
            self.status = "No records selected".to_string();
            return;
        }

        self.pending_delete = Some(PendingDelete {
            page: self.current_page,
            serials,
        });
    }

    pub fn confirm_delete(&mut self) {
        let Some(pending) = self.pending_delete.take() else {
            return;
        };

        match self.store.delete(&pending.serials) {
            Ok(removed) => {
                self.status = format!("Deleted {} records", removed);
                self.rebuild_view();
                self.rebuild_duplicates();
            }
            Err(e) => self.status = format!("Delete failed: {}", e),
        }
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
        self.status = "Delete cancelled".to_string();
    }

    // ========================================================================
    // NAVIGATION
    // ========================================================================

    fn active_state_and_len(&mut self) -> (&mut TableState, usize) {
        match self.current_page {
            Page::Duplicates => {
                let len = self.review.visible_rows().len();
                (&mut self.dup_state, len)
            }
            _ => {
                let len = self.view.rows.len();
                (&mut self.state, len)
            }
        }
    }

    pub fn next(&mut self) {
        let (state, len) = self.active_state_and_len();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let (state, len) = self.active_state_and_len();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
    }

    /// Returns true when the app should exit
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if self.pending_delete.is_some() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => self.confirm_delete(),
                _ => self.cancel_delete(),
            }
            return false;
        }

        if self.input_mode == InputMode::Search {
            match key.code {
                KeyCode::Enter => {
                    self.input_mode = InputMode::Normal;
                    self.apply_search();
                }
                KeyCode::Esc => {
                    self.input_mode = InputMode::Normal;
                    self.search_input = self.query.search_text.clone();
                }
                KeyCode::Backspace => {
                    self.search_input.pop();
                }
                KeyCode::Char(c) => self.search_input.push(c),
                _ => {}
            }
            return false;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Tab => self.current_page = self.current_page.next(),
            KeyCode::BackTab => self.current_page = self.current_page.previous(),
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.previous(),
            KeyCode::Char(' ') => self.toggle_current(),
            KeyCode::Char('a') => self.toggle_all(),
            KeyCode::Char('d') => self.request_delete(),
            KeyCode::Char('r') => {
                self.store.refresh();
                self.rebuild_view();
                self.rebuild_duplicates();
                self.status = format!("Reloaded {} records", self.store.len());
            }
            KeyCode::Char('/') if self.current_page == Page::Records => {
                self.input_mode = InputMode::Search;
            }
            KeyCode::Char('g') if self.current_page == Page::Records => self.cycle_gender_filter(),
            KeyCode::Char('s') if self.current_page == Page::Records => self.cycle_sort(),
            KeyCode::Char('c') if self.current_page == Page::Records => self.clear_query(),
            KeyCode::Right | KeyCode::Char('n') if self.current_page == Page::Records => {
                self.next_result_page()
            }
            KeyCode::Left | KeyCode::Char('p') if self.current_page == Page::Records => {
                self.previous_result_page()
            }
            KeyCode::Enter if self.current_page == Page::Records => {
                self.show_detail = !self.show_detail
            }
            KeyCode::Char('h') if self.current_page == Page::Duplicates => {
                self.hide_checked_duplicates()
            }
            _ => {}
        }
        false
    }
}

pub fn run_ui<S: TableStorage>(app: &mut App<S>) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend, S: TableStorage>(
    terminal: &mut Terminal<B>,
    app: &mut App<S>,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                return Ok(());
            }
            if app.handle_key(key) {
                return Ok(());
            }
        }
    }
}

// ============================================================================
// RENDERING
// ============================================================================

fn ui<S: TableStorage>(f: &mut Frame, app: &mut App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tabs
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Records if app.show_detail => {
            let content_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(chunks[1]);
            render_records(f, content_chunks[0], app);
            render_detail_panel(f, content_chunks[1], app);
        }
        Page::Records => render_records(f, chunks[1], app),
        Page::Duplicates => render_duplicates(f, chunks[1], app),
        Page::Statistics => render_statistics(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header<S: TableStorage>(f: &mut Frame, area: Rect, app: &App<S>) {
    let mut tab_spans = vec![];
    for (i, page) in [Page::Records, Page::Duplicates, Page::Statistics]
        .iter()
        .enumerate()
    {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Patients: {}", app.store.len()),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        match app.store.next_serial() {
            Ok(serial) => format!("Next serial: {}", serial),
            Err(_) => "Next serial: none left".to_string(),
        },
        Style::default().fg(Color::Green),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(header, area);
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    let cells = titles.iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });
    Row::new(cells).style(Style::default().bg(Color::DarkGray)).height(1)
}

fn checkbox(checked: bool) -> Cell<'static> {
    if checked {
        Cell::from("[x]").style(Style::default().fg(Color::Green))
    } else {
        Cell::from("[ ]")
    }
}

fn render_records<S: TableStorage>(f: &mut Frame, area: Rect, app: &mut App<S>) {
    let header = header_row(&["", "Serial", "Name", "Gender", "Age", "Phone", "Start", "End"]);

    let rows: Vec<Row> = app
        .view
        .rows
        .iter()
        .map(|r| {
            Row::new(vec![
                checkbox(app.selection.is_checked(&r.serial_no)),
                Cell::from(r.serial_no.clone()),
                Cell::from(truncate(&r.name, 24)),
                Cell::from(r.gender.clone()),
                Cell::from(r.age.clone()),
                Cell::from(r.phone_no.clone()),
                Cell::from(r.start_date.clone()),
                Cell::from(r.end_date.clone()),
            ])
        })
        .collect();

    let mut title = format!(" {} ", app.view.page_label());
    if !app.query.search_text.is_empty() {
        title.push_str(&format!("| search \"{}\" ", app.query.search_text));
    }
    if let Some(gender) = app.query.filters.get(&Column::Gender) {
        if gender != SHOW_ALL {
            title.push_str(&format!("| gender {} ", gender));
        }
    }
    if let Some(key) = app.query.sort_key {
        title.push_str(&format!("| sort {} ", key));
    }

    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Length(7),
            Constraint::Length(26),
            Constraint::Length(8),
            Constraint::Length(5),
            Constraint::Length(14),
            Constraint::Length(11),
            Constraint::Length(11),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(title),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_duplicates<S: TableStorage>(f: &mut Frame, area: Rect, app: &mut App<S>) {
    let header = header_row(&["", "Serial", "Name", "Email", "Phone", "Aadhar"]);

    let visible = app.review.visible_rows();
    let count = visible.len();
    let rows: Vec<Row> = visible
        .iter()
        .map(|r| {
            Row::new(vec![
                checkbox(app.review.selection().is_checked(&r.serial_no)),
                Cell::from(r.serial_no.clone()),
                Cell::from(truncate(&r.name, 24)),
                Cell::from(truncate(&r.email, 28)),
                Cell::from(r.phone_no.clone()),
                Cell::from(r.aadhar_no.clone()),
            ])
        })
        .collect();

    let title = if count == 0 {
        " No duplicate patients ".to_string()
    } else {
        format!(" {} possible duplicates ", count)
    };

    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Length(7),
            Constraint::Length(26),
            Constraint::Length(30),
            Constraint::Length(14),
            Constraint::Length(14),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(title),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.dup_state);
}

fn summary_lines(title: &str, rows: &[Record]) -> Vec<Line<'static>> {
    let summary = summarize(rows);
    let mut lines = vec![
        Line::from(Span::styled(
            format!("  {}", title),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )),
        Line::from(""),
    ];
    for (label, value) in summary.lines() {
        lines.push(Line::from(vec![
            Span::styled(
                format!("  {:<28}", format!("{}:", label)),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw(value),
        ]));
    }
    lines
}

fn render_statistics<S: TableStorage>(f: &mut Frame, area: Rect, app: &App<S>) {
    let checked = if app.selection.is_for(&app.view) {
        app.selection.checked_ids()
    } else {
        Vec::new()
    };

    let mut content = summary_lines("ALL PATIENTS", app.store.snapshot().rows());
    if !checked.is_empty() {
        content.push(Line::from(""));
        content.push(Line::from("  ─────────────────────────────────────"));
        content.push(Line::from(""));
        let rows = app.store.select_rows(&checked);
        content.extend(summary_lines(&format!("SELECTED ({})", rows.len()), &rows));
    }

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Statistics "),
    );
    f.render_widget(paragraph, area);
}

fn render_detail_panel<S: TableStorage>(f: &mut Frame, area: Rect, app: &App<S>) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Patient Details ");

    let record = match app.selected_record() {
        Some(r) => r,
        None => {
            f.render_widget(Paragraph::new("No patient selected").block(block), area);
            return;
        }
    };

    let label_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let mut content = vec![Line::from("")];
    for column in Column::ALL {
        if column == Column::PhotoPath {
            continue;
        }
        let value = record.get(column);
        if value.contains('\n') {
            content.push(Line::from(Span::styled(format!("  {}:", column), label_style)));
            for line in value.lines() {
                content.push(Line::from(format!("    {}", line)));
            }
        } else {
            content.push(Line::from(vec![
                Span::styled(format!("  {}: ", column), label_style),
                Span::raw(value.to_string()),
            ]));
        }
    }

    content.push(Line::from(""));
    let photo = match record.photo() {
        Some(path) => Span::styled(path.display().to_string(), Style::default().fg(Color::Green)),
        None => Span::styled(
            "Photo not available",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ),
    };
    content.push(Line::from(vec![Span::styled("  Photo: ", label_style), photo]));

    let panel = Paragraph::new(content).block(block).wrap(Wrap { trim: false });
    f.render_widget(panel, area);
}

fn render_status_bar<S: TableStorage>(f: &mut Frame, area: Rect, app: &App<S>) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));

    let spans = if let Some(pending) = &app.pending_delete {
        vec![Span::styled(
            format!(
                " Delete {} selected records? (y/n) ",
                pending.serials.len()
            ),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )]
    } else if app.input_mode == InputMode::Search {
        vec![
            Span::styled(" Search: ", Style::default().fg(Color::Cyan)),
            Span::raw(app.search_input.clone()),
            Span::styled("█", Style::default().fg(Color::Yellow)),
        ]
    } else {
        let mut spans = vec![];
        if !app.status.is_empty() {
            spans.push(Span::styled(
                format!(" {} ", app.status),
                Style::default().fg(Color::Green),
            ));
            spans.push(Span::raw("| "));
        }
        match app.current_page {
            Page::Records => {
                spans.extend([
                    key("/"),
                    Span::raw(" Search | "),
                    key("g"),
                    Span::raw(" Gender | "),
                    key("s"),
                    Span::raw(" Sort | "),
                    key("←/→"),
                    Span::raw(" Page | "),
                    key("Space"),
                    Span::raw(" Check | "),
                    key("d"),
                    Span::raw(" Delete | "),
                    key("Enter"),
                    Span::raw(" Details | "),
                ]);
            }
            Page::Duplicates => {
                spans.extend([
                    key("Space"),
                    Span::raw(" Check | "),
                    key("h"),
                    Span::raw(" Not duplicate | "),
                    key("d"),
                    Span::raw(" Delete | "),
                ]);
            }
            Page::Statistics => {}
        }
        spans.extend([
            key("Tab"),
            Span::raw(" Page | "),
            Span::styled("q", Style::default().fg(Color::Red)),
            Span::raw(" Quit"),
        ]);
        spans
    };

    let status_bar = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );
    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patient_records::MemoryStorage;

    fn create_test_record(serial: &str, name: &str, gender: &str) -> Record {
        Record {
            serial_no: serial.to_string(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            gender: gender.to_string(),
            age: "30".to_string(),
            phone_no: "9000000000".to_string(),
            ..Default::default()
        }
    }

    fn create_test_app(page_size: usize) -> App<MemoryStorage> {
        let mut store = RecordStore::new(MemoryStorage::new());
        for (serial, name, gender) in [
            ("1", "Anil", "Male"),
            ("2", "Bina", "Female"),
            ("3", "Anil", "Male"),
            ("4", "Divya", "Female"),
            ("5", "Esha", "Other"),
        ] {
            store.create(create_test_record(serial, name, gender)).unwrap();
        }
        App::new(store, page_size)
    }

    fn press(app: &mut App<MemoryStorage>, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn test_paging_keys() {
        let mut app = create_test_app(2);
        assert_eq!(app.view.serials(), vec!["1", "2"]);

        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Right);
        assert_eq!(app.view.serials(), vec!["5"]);

        press(&mut app, KeyCode::Right);
        assert_eq!(app.view.page_index, 2);

        press(&mut app, KeyCode::Char('p'));
        assert_eq!(app.view.serials(), vec!["3", "4"]);
    }

    #[test]
    fn test_search_mode() {
        let mut app = create_test_app(24);
        press(&mut app, KeyCode::Char('/'));
        for c in "div".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        // Typing 'q' while searching does not quit
        assert!(!press(&mut app, KeyCode::Char('q')));
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.view.serials(), vec!["4"]);
    }

    #[test]
    fn test_gender_filter_cycles_back_to_all() {
        let mut app = create_test_app(24);
        app.cycle_gender_filter();
        assert_eq!(app.view.serials(), vec!["1", "3"]);
        app.cycle_gender_filter();
        app.cycle_gender_filter();
        assert_eq!(app.view.serials(), vec!["5"]);
        app.cycle_gender_filter();
        assert_eq!(app.view.total_count, 5);
    }

    #[test]
    fn test_delete_checked_after_confirmation() {
        let mut app = create_test_app(24);
        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Char('d'));
        assert!(app.pending_delete.is_some());

        press(&mut app, KeyCode::Char('y'));
        assert_eq!(app.store().len(), 3);
        assert!(app.store().find("1").is_none());
        assert!(app.selection.checked_ids().is_empty());
    }

    #[test]
    fn test_delete_cancelled_by_other_key() {
        let mut app = create_test_app(24);
        app.toggle_all();
        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.store().len(), 5);
        assert!(app.pending_delete.is_none());
    }

    #[test]
    fn test_rebuild_discards_selection() {
        let mut app = create_test_app(24);
        app.toggle_current();
        assert_eq!(app.selection.checked_count(), 1);
        app.cycle_sort();
        assert_eq!(app.selection.checked_count(), 0);
    }

    #[test]
    fn test_duplicates_tab_hide_and_delete() {
        let mut app = create_test_app(24);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.current_page, Page::Duplicates);
        assert_eq!(app.review.visible_rows().len(), 2);

        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Char('h'));
        assert_eq!(app.review.visible_rows().len(), 1);
        assert_eq!(app.store().len(), 5);

        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('y'));
        assert_eq!(app.store().len(), 4);
        assert!(app.review.visible_rows().is_empty());
    }

    #[test]
    fn test_quit_key() {
        let mut app = create_test_app(24);
        assert!(press(&mut app, KeyCode::Char('q')));
    }
}
