use crate::client::TransactionSource;
use crate::transaction::Transaction;
use crate::view::TransactionView;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;
use std::panic::{self, PanicHookInfo};
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

/// Rows skipped by PgUp / PgDn
const PAGE_SIZE: usize = 20;

/// How long to wait for a key before checking the fetch again
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct App<S> {
    pub view: TransactionView,
    source: Arc<S>,
    pub state: TableState,
    pub show_detail: bool,
    pub should_quit: bool,
}

impl<S: TransactionSource> App<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            view: TransactionView::new(),
            source,
            state: TableState::default(),
            show_detail: false,
            should_quit: false,
        }
    }

    /// Start a fetch. Ignored while one is already running.
    pub fn refresh(&mut self) {
        self.view.refresh(self.source.clone());
    }

    /// Pick up a finished fetch; returns whether anything changed.
    pub fn poll(&mut self) -> bool {
        let changed = self.view.poll();
        if changed {
            self.reset_selection();
        }
        changed
    }

    /// Wait for the running fetch, if any.
    pub async fn wait(&mut self) {
        self.view.wait().await;
        self.reset_selection();
    }

    fn reset_selection(&mut self) {
        if self.view.is_empty() {
            self.state.select(None);
        } else {
            self.state.select(Some(0));
        }
    }

    pub fn on_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('r') | KeyCode::Char('R') => self.refresh(),
            KeyCode::Enter => self.toggle_detail(),
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.previous(),
            KeyCode::PageDown => self.page_down(),
            KeyCode::PageUp => self.page_up(),
            KeyCode::Home => self.home(),
            KeyCode::End => self.end(),
            _ => {}
        }
    }
}

impl<S> App<S> {
    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn selected_transaction(&self) -> Option<&Transaction> {
        self.state.selected().and_then(|i| self.view.transactions().get(i))
    }

    pub fn next(&mut self) {
        let len = self.view.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.view.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) => len - 1,
            Some(i) => i - 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.view.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => (i + PAGE_SIZE).min(len - 1),
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        if self.view.is_empty() {
            return;
        }
        let i = self.state.selected().map_or(0, |i| i.saturating_sub(PAGE_SIZE));
        self.state.select(Some(i));
    }

    pub fn home(&mut self) {
        if !self.view.is_empty() {
            self.state.select(Some(0));
        }
    }

    pub fn end(&mut self) {
        if !self.view.is_empty() {
            self.state.select(Some(self.view.len() - 1));
        }
    }
}

// ============================================================================
// TERMINAL LOOP
// ============================================================================

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

/// Runs `cleanup` before the previously installed panic hook.
/// Dropping it puts the previous hook back.
struct PanicHookGuard {
    previous: Arc<PanicHook>,
}

impl PanicHookGuard {
    fn install<F>(cleanup: F) -> Self
    where
        F: Fn() + Sync + Send + 'static,
    {
        let previous = Arc::new(panic::take_hook());
        let chained = previous.clone();
        panic::set_hook(Box::new(move |info| {
            cleanup();
            error!(panic = %info, "process panicked");
            chained(info);
        }));

        Self { previous }
    }
}

impl Drop for PanicHookGuard {
    fn drop(&mut self) {
        // set_hook itself panics on an unwinding thread
        if std::thread::panicking() {
            return;
        }
        let previous = self.previous.clone();
        panic::set_hook(Box::new(move |info| previous(info)));
    }
}

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
}

pub async fn run_ui<S: TransactionSource>(app: &mut App<S>) -> Result<()> {
    // Restore the terminal before the previous hook prints the panic
    let _panic_hook = PanicHookGuard::install(restore_terminal);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

async fn run_app<B: Backend, S: TransactionSource>(
    terminal: &mut Terminal<B>,
    app: &mut App<S>,
) -> Result<()> {
    // Initial display issues the one request
    app.refresh();

    loop {
        app.poll();
        terminal.draw(|f| ui(f, app))?;

        if event::poll(POLL_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key.code);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }

        // Let the fetch task make progress on a current-thread runtime
        tokio::task::yield_now().await;
    }
}

// ============================================================================
// RENDERING
// ============================================================================

pub fn ui<S>(f: &mut Frame, app: &mut App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.view.is_loading() {
        render_loading(f, chunks[1]);
    } else if app.show_detail {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(60), // Transaction list
                Constraint::Percentage(40), // Detail panel
            ])
            .split(chunks[1]);

        render_table(f, content_chunks[0], app);
        render_detail_panel(f, content_chunks[1], app);
    } else {
        render_table(f, chunks[1], app);
    }

    render_status_bar(f, chunks[2], app);
}

fn amount_color(tx: &Transaction) -> Color {
    if tx.is_outflow() {
        Color::Red
    } else {
        Color::Green
    }
}

fn render_header<S>(f: &mut Frame, area: Rect, app: &App<S>) {
    let summary = app.view.summary();

    let spans = vec![
        Span::styled(
            "Transactions",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("Total: {}", summary.count),
            Style::default().fg(Color::White),
        ),
        Span::raw("  |  "),
        Span::styled(format!("↑ {:.2}", summary.inflow), Style::default().fg(Color::Green)),
        Span::raw("  "),
        Span::styled(format!("↓ {:.2}", summary.outflow), Style::default().fg(Color::Red)),
    ];

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_loading(f: &mut Frame, area: Rect) {
    let loading = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            "  Loading transactions...",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Transactions "),
    );

    f.render_widget(loading, area);
}

fn render_table<S>(f: &mut Frame, area: Rect, app: &mut App<S>) {
    let header_cells = ["ID", "Name", "Amount"].iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.view.transactions().iter().map(|tx| {
        let cells = vec![
            Cell::from(tx.id.to_string()),
            Cell::from(truncate(&tx.name, 30)),
            Cell::from(format!("{:>12.2}", tx.amount)).style(Style::default().fg(amount_color(tx))),
        ];

        Row::new(cells).height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Length(32),
            Constraint::Length(14),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Transactions "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_status_bar<S>(f: &mut Frame, area: Rect, app: &App<S>) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
    let total = app.view.len();

    let mut status_spans = vec![Span::styled(
        format!(" Row: {}/{} ", selected, total),
        Style::default().fg(Color::Cyan),
    )];

    let hints = [
        ("Enter", " Details | "),
        ("r", " Refresh | "),
        ("↑/↓", " Nav | "),
        ("PgUp/PgDn", " Fast | "),
    ];
    status_spans.push(Span::raw(" | "));
    for (key, label) in hints {
        status_spans.push(Span::styled(key, Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(label));
    }
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn render_detail_panel<S>(f: &mut Frame, area: Rect, app: &App<S>) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Transaction Details ");

    let Some(tx) = app.selected_transaction() else {
        f.render_widget(Paragraph::new("No transaction selected").block(block), area);
        return;
    };

    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);

    let content = vec![
        Line::from(""),
        Line::from(vec![Span::styled("  ID: ", label), Span::raw(tx.id.to_string())]),
        Line::from(""),
        Line::from(vec![Span::styled("  Name: ", label), Span::raw(tx.name.as_str())]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Amount: ", label),
            Span::styled(format!("{:.2}", tx.amount), Style::default().fg(amount_color(tx))),
        ]),
        Line::from(""),
        Line::from(vec![Span::styled(
            "  Press Enter to close",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )]),
    ];

    f.render_widget(Paragraph::new(content).block(block), area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::view::testing::{sample, HangingSource, ScriptedSource};
    use ratatui::backend::TestBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn draw<S>(app: &mut App<S>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| ui(f, app)).unwrap();
        format!("{:?}", terminal.backend().buffer())
    }

    #[tokio::test]
    async fn test_loading_indicator_while_fetching() {
        let mut app = App::new(Arc::new(HangingSource));
        app.refresh();

        let screen = draw(&mut app);

        assert!(screen.contains("Loading transactions..."));
        assert!(screen.contains("Row: 0/0"));
    }

    #[tokio::test]
    async fn test_renders_every_record_after_load() {
        let mut app = App::new(ScriptedSource::new(vec![Ok(sample(4))]));
        app.refresh();
        app.wait().await;

        let screen = draw(&mut app);

        assert!(!screen.contains("Loading"));
        for id in 1..=4 {
            assert!(screen.contains(&format!("Payee {id}")), "missing row {id}");
        }
        assert!(screen.contains("Row: 1/4"));
        assert!(screen.contains("Total: 4"));
    }

    #[tokio::test]
    async fn test_failure_renders_empty_list_without_error() {
        let mut app = App::new(ScriptedSource::new(vec![Err(FetchError::Aborted)]));
        app.refresh();
        app.wait().await;

        let screen = draw(&mut app);

        assert!(!screen.contains("Loading"));
        assert!(!screen.contains("Payee"));
        assert!(!screen.contains("fetch task"));
        assert!(screen.contains("Row: 0/0"));
        assert!(app.view.error().is_some());
    }

    #[tokio::test]
    async fn test_detail_panel_shows_selection() {
        let mut app = App::new(ScriptedSource::new(vec![Ok(sample(3))]));
        app.refresh();
        app.wait().await;

        app.on_key(KeyCode::Down);
        app.on_key(KeyCode::Enter);
        let screen = draw(&mut app);

        assert!(app.show_detail);
        assert!(screen.contains("Transaction Details"));
        assert_eq!(app.selected_transaction().map(|tx| tx.id), Some(2));
    }

    #[tokio::test]
    async fn test_navigation_wraps_and_clamps() {
        let mut app = App::new(ScriptedSource::new(vec![Ok(sample(25))]));
        app.refresh();
        app.wait().await;
        assert_eq!(app.state.selected(), Some(0));

        app.on_key(KeyCode::Up);
        assert_eq!(app.state.selected(), Some(24));
        app.on_key(KeyCode::Char('j'));
        assert_eq!(app.state.selected(), Some(0));

        app.on_key(KeyCode::PageDown);
        assert_eq!(app.state.selected(), Some(20));
        app.on_key(KeyCode::PageDown);
        assert_eq!(app.state.selected(), Some(24));
        app.on_key(KeyCode::PageUp);
        assert_eq!(app.state.selected(), Some(4));
        app.on_key(KeyCode::PageUp);
        assert_eq!(app.state.selected(), Some(0));

        app.on_key(KeyCode::End);
        assert_eq!(app.state.selected(), Some(24));
        app.on_key(KeyCode::Home);
        assert_eq!(app.state.selected(), Some(0));
    }

    #[tokio::test]
    async fn test_navigation_on_empty_list() {
        let mut app = App::new(ScriptedSource::new(vec![Ok(Vec::new())]));
        app.refresh();
        app.wait().await;

        for code in [KeyCode::Down, KeyCode::Up, KeyCode::PageDown, KeyCode::PageUp, KeyCode::End] {
            app.on_key(code);
        }

        assert_eq!(app.state.selected(), None);
        assert!(app.selected_transaction().is_none());
    }

    #[tokio::test]
    async fn test_refresh_key_and_quit() {
        let mut app = App::new(ScriptedSource::new(vec![Ok(sample(1)), Ok(sample(6))]));
        app.refresh();
        app.wait().await;
        assert_eq!(app.view.len(), 1);

        app.on_key(KeyCode::Char('r'));
        assert!(app.view.is_loading());
        app.wait().await;
        assert_eq!(app.view.len(), 6);

        app.on_key(KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn test_panic_hook_restored_after_teardown() {
        static CLEANUPS: AtomicUsize = AtomicUsize::new(0);
        static REPORTED: AtomicUsize = AtomicUsize::new(0);

        panic::set_hook(Box::new(|_| {
            REPORTED.fetch_add(1, Ordering::SeqCst);
        }));

        let guard = PanicHookGuard::install(|| {
            CLEANUPS.fetch_add(1, Ordering::SeqCst);
        });
        let _ = panic::catch_unwind(|| panic!("while the screen is up"));
        assert_eq!(CLEANUPS.load(Ordering::SeqCst), 1);
        assert_eq!(REPORTED.load(Ordering::SeqCst), 1);

        drop(guard);
        let _ = panic::catch_unwind(|| panic!("after teardown"));
        assert_eq!(CLEANUPS.load(Ordering::SeqCst), 1, "cleanup hook should be gone");
        assert_eq!(REPORTED.load(Ordering::SeqCst), 2);

        drop(panic::take_hook());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long payee name", 10), "a very ...");
        assert_eq!(truncate("Café Crème Brûlée", 8), "Café ...");
    }
}
