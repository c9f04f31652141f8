//! Application state and TUI event loop for the timesheet dashboard.
//!
//! [`App`] owns the theme, the [`DataManager`], and the project / employee
//! selectors. Every filter change recomputes the view from the cached rows;
//! `r` forces the manager to re-aggregate the source. Terminal input and the
//! Ctrl+C signal reach the loop as [`DashboardEvent`]s on a tokio channel.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    text::{Line, Span, Text},
    widgets::Paragraph,
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Interval, MissedTickBehavior};

use timesheet_core::models::AggregatedEntry;
use timesheet_data::aggregator::find_duplicates;
use timesheet_data::analysis::{filter_options, EntryFilter};
use timesheet_runtime::data_manager::DataManager;

use crate::components::filter_bar::FilterBar;
use crate::components::header::Header;
use crate::table_view::{self, DashboardViewData};
use crate::themes::Theme;

/// How often the source file is re-checked for changes.
pub const SOURCE_CHECK_INTERVAL: Duration = Duration::from_secs(5);

/// Timeout of each blocking terminal poll; bounds how long shutdown waits
/// for the input reader.
const INPUT_POLL: Duration = Duration::from_millis(250);

// ── Events ────────────────────────────────────────────────────────────────────

/// Input delivered to the dashboard loop.
#[derive(Debug)]
pub enum DashboardEvent {
    Key(KeyEvent),
    /// The terminal size changed; the next frame redraws.
    Resize,
    /// Ctrl+C delivered as a process signal.
    Interrupt,
    InputFailed(io::Error),
}

/// Read terminal events on a blocking thread until `stop` is set or the
/// receiver is gone.
fn spawn_input_reader(tx: mpsc::Sender<DashboardEvent>, stop: Arc<AtomicBool>) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        while !stop.load(Ordering::Relaxed) {
            let event = match event::poll(INPUT_POLL) {
                Ok(false) => continue,
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                        DashboardEvent::Key(key)
                    }
                    Ok(Event::Resize(..)) => DashboardEvent::Resize,
                    Ok(_) => continue,
                    Err(e) => DashboardEvent::InputFailed(e),
                },
                Err(e) => DashboardEvent::InputFailed(e),
            };
            let failed = matches!(event, DashboardEvent::InputFailed(_));
            if tx.blocking_send(event).is_err() || failed {
                break;
            }
        }
    })
}

async fn forward_interrupt(tx: mpsc::Sender<DashboardEvent>) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    if tx.send(DashboardEvent::Interrupt).await.is_err() {
        tracing::debug!("dashboard closed before Ctrl+C was delivered");
    }
}

/// Interval whose first tick fires one `period` from now.
fn source_ticker(period: Duration) -> Interval {
    let mut ticker = time::interval_at(time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

// ── Selector ──────────────────────────────────────────────────────────────────

/// Cycles through "all" followed by every observed value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    options: Vec<String>,
    /// 0 means "all"; `n` selects `options[n - 1]`.
    index: usize,
}

impl Selector {
    pub fn new(options: Vec<String>) -> Self {
        Self { options, index: 0 }
    }

    /// The selected value, or `None` for "all".
    pub fn current(&self) -> Option<&str> {
        self.index
            .checked_sub(1)
            .and_then(|i| self.options.get(i))
            .map(String::as_str)
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn next(&mut self) {
        self.index = (self.index + 1) % (self.options.len() + 1);
    }

    pub fn prev(&mut self) {
        let n = self.options.len() + 1;
        self.index = (self.index + n - 1) % n;
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }

    /// Select `value` if it is one of the options; otherwise select "all".
    pub fn select(&mut self, value: Option<&str>) {
        self.index = value
            .and_then(|v| self.options.iter().position(|o| o == v.trim()))
            .map_or(0, |i| i + 1);
    }

    /// Replace the options, keeping the current value when it still exists.
    pub fn replace_options(&mut self, options: Vec<String>) {
        let current = self.current().map(str::to_string);
        self.options = options;
        self.select(current.as_deref());
    }
}

// ── App ───────────────────────────────────────────────────────────────────────

/// Root application state for the timesheet dashboard.
pub struct App {
    pub theme: Theme,
    pub should_quit: bool,
    manager: DataManager,
    source_name: String,
    entries: Vec<AggregatedEntry>,
    projects: Selector,
    employees: Selector,
    view: DashboardViewData,
    /// Shown instead of the tables when the filters match nothing.
    empty_message: Option<String>,
    /// Last reload error, shown under the filter bar.
    status: Option<String>,
}

impl App {
    /// Build the app and load the source once. `initial` preselects filter
    /// values; values not present in the data fall back to "all".
    pub fn new(theme_name: &str, manager: DataManager, initial: EntryFilter) -> Self {
        let source_name = manager
            .source()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| manager.source().display().to_string());

        let mut app = Self {
            theme: Theme::from_name(theme_name),
            should_quit: false,
            manager,
            source_name,
            entries: Vec::new(),
            projects: Selector::default(),
            employees: Selector::default(),
            view: DashboardViewData::default(),
            empty_message: None,
            status: None,
        };
        app.reload(false);
        app.projects.select(initial.project.as_deref());
        app.employees.select(initial.employee.as_deref());
        app.rebuild_view();
        app
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn filter(&self) -> EntryFilter {
        EntryFilter::new(
            self.projects.current().map(str::to_string),
            self.employees.current().map(str::to_string),
        )
    }

    pub fn view(&self) -> &DashboardViewData {
        &self.view
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn empty_message(&self) -> Option<&str> {
        self.empty_message.as_deref()
    }

    // ── Event loop ────────────────────────────────────────────────────────────

    /// Run the dashboard until `q`, `Q`, `Esc` or `Ctrl+C`.
    ///
    /// Terminal input is read by a blocking task and forwarded over an `mpsc`
    /// channel together with the process Ctrl+C signal, so the loop awaits
    /// between frames and the terminal is always restored before returning.
    pub async fn run_dashboard(mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let (tx, mut events) = mpsc::channel(32);
        let stop = Arc::new(AtomicBool::new(false));
        let reader = spawn_input_reader(tx.clone(), Arc::clone(&stop));
        let interrupt = tokio::spawn(forward_interrupt(tx));
        let mut ticker = source_ticker(SOURCE_CHECK_INTERVAL);

        let result = loop {
            if let Err(e) = terminal.draw(|frame| self.render(frame)) {
                break Err(e);
            }
            if let Err(e) = self.next_event(&mut events, &mut ticker).await {
                break Err(e);
            }
            if self.should_quit {
                break Ok(());
            }
        };

        stop.store(true, Ordering::Relaxed);
        interrupt.abort();
        drop(events);
        if let Err(e) = reader.await {
            tracing::debug!(error = %e, "input reader ended abnormally");
        }

        // Restore terminal state unconditionally.
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    /// Wait for the next input event or source check and apply it.
    pub async fn next_event(
        &mut self,
        events: &mut mpsc::Receiver<DashboardEvent>,
        ticker: &mut Interval,
    ) -> io::Result<()> {
        tokio::select! {
            event = events.recv() => match event {
                Some(DashboardEvent::Key(key)) => self.handle_key(key),
                Some(DashboardEvent::Resize) => {}
                Some(DashboardEvent::Interrupt) => {
                    tracing::info!("Ctrl+C received; shutting down");
                    self.should_quit = true;
                }
                Some(DashboardEvent::InputFailed(e)) => return Err(e),
                None => self.should_quit = true,
            },
            _ = ticker.tick() => {
                self.reload(false);
                self.rebuild_view();
            }
        }
        Ok(())
    }

    /// Apply one key press.
    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('p') => {
                self.projects.next();
                self.rebuild_view();
            }
            KeyCode::Char('P') => {
                self.projects.prev();
                self.rebuild_view();
            }
            KeyCode::Char('e') => {
                self.employees.next();
                self.rebuild_view();
            }
            KeyCode::Char('E') => {
                self.employees.prev();
                self.rebuild_view();
            }
            KeyCode::Char('a') => {
                self.projects.reset();
                self.employees.reset();
                self.rebuild_view();
            }
            KeyCode::Char('r') => {
                self.reload(true);
                self.rebuild_view();
            }
            _ => {}
        }
    }

    // ── Private helpers ───────────────────────────────────────────────────────

    /// Pull the current rows from the manager and refresh selector options.
    fn reload(&mut self, force: bool) {
        match self.manager.get_data(force) {
            Ok(outcome) => {
                self.entries = outcome.aggregated.clone();
                self.status = None;
            }
            Err(e) => {
                self.status = Some(format!("Reload failed: {e}"));
                if let Some(cached) = self.manager.cached() {
                    self.entries = cached.aggregated.clone();
                }
            }
        }

        let options = filter_options(&self.entries);
        self.projects.replace_options(options.projects);
        self.employees.replace_options(options.employees);
    }

    fn rebuild_view(&mut self) {
        let filter = self.filter();
        tracing::debug!(?filter, rows = self.entries.len(), "rebuilding dashboard view");
        let filtered = filter.apply(&self.entries);
        let duplicates = find_duplicates(&filtered.entries).len();
        self.view = DashboardViewData::from_entries(&filtered.entries, duplicates);
        self.empty_message = filtered.warning.map(|w| w.to_string());
    }

    fn render(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Length(2),
                Constraint::Min(5),
            ])
            .split(frame.area());

        let header = Header::new(&self.source_name, &self.view.metrics, &self.theme);
        frame.render_widget(Paragraph::new(Text::from(header.to_lines())), chunks[0]);

        let mut bar = vec![FilterBar::new(
            self.projects.current(),
            self.employees.current(),
            &self.theme,
        )
        .to_line()];
        if let Some(status) = &self.status {
            bar.push(Line::from(Span::styled(status.as_str(), self.theme.error)));
        } else if self.view.duplicate_count > 0 {
            bar.push(Line::from(Span::styled(
                format!(
                    "{} rows share an employee and project with another row",
                    self.view.duplicate_count
                ),
                self.theme.warning,
            )));
        }
        frame.render_widget(Paragraph::new(Text::from(bar)), chunks[1]);

        match &self.empty_message {
            Some(message) => table_view::render_no_data(frame, chunks[2], message, &self.theme),
            None => table_view::render_dashboard_view(frame, chunks[2], &self.view, &self.theme),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use tempfile::TempDir;
    use timesheet_data::aggregator::TimesheetAggregator;

    const DOC: &str = r#"{"data": [
        {"Employee": "Ann", "Project_No": "P1", "Client": "ACME", "Activity": "Dev",
         "Project_Description": "Build", "Hours": 10, "Staff_Comment": ""},
        {"Employee": "Bob", "Project_No": "P1", "Client": "ACME", "Activity": "Dev",
         "Project_Description": "Build", "Hours": 6, "Staff_Comment": ""},
        {"Employee": "Ann", "Project_No": "P2", "Client": "Globex", "Activity": "QA",
         "Project_Description": "Test", "Hours": 4, "Staff_Comment": ""},
        {"Employee": "Ann", "Project_No": "P2", "Client": "Globex", "Activity": "QA",
         "Project_Description": "Other", "Hours": 1, "Staff_Comment": ""}
    ]}"#;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn make_app(initial: EntryFilter) -> (App, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("data.json");
        std::fs::write(&path, DOC).unwrap();
        let manager = DataManager::new(path, TimesheetAggregator::default());
        (App::new("dark", manager, initial), dir)
    }

    // ── Selector ──────────────────────────────────────────────────────────────

    #[test]
    fn test_selector_cycles_through_all_and_options() {
        let mut s = Selector::new(vec!["A".into(), "B".into()]);
        assert_eq!(s.current(), None);
        s.next();
        assert_eq!(s.current(), Some("A"));
        s.next();
        assert_eq!(s.current(), Some("B"));
        s.next();
        assert_eq!(s.current(), None);
        s.prev();
        assert_eq!(s.current(), Some("B"));
    }

    #[test]
    fn test_selector_empty_options() {
        let mut s = Selector::default();
        s.next();
        s.prev();
        assert_eq!(s.current(), None);
    }

    #[test]
    fn test_selector_select_unknown_falls_back_to_all() {
        let mut s = Selector::new(vec!["A".into()]);
        s.select(Some("Z"));
        assert_eq!(s.current(), None);
        s.select(Some(" A "));
        assert_eq!(s.current(), Some("A"));
    }

    #[test]
    fn test_selector_replace_options_keeps_value() {
        let mut s = Selector::new(vec!["A".into(), "B".into()]);
        s.select(Some("B"));
        s.replace_options(vec!["B".into(), "C".into()]);
        assert_eq!(s.current(), Some("B"));
        s.replace_options(vec!["C".into()]);
        assert_eq!(s.current(), None);
    }

    // ── App ───────────────────────────────────────────────────────────────────

    #[test]
    fn test_app_initial_load() {
        let (app, _dir) = make_app(EntryFilter::default());
        assert!(!app.should_quit);
        assert!(app.status().is_none());
        assert_eq!(app.view().metrics.total_hours, 21.0);
        assert_eq!(app.view().metrics.active_employees, 2);
        // Ann/P2 has two descriptions
        assert_eq!(app.view().duplicate_count, 2);
    }

    #[test]
    fn test_app_initial_filter_applied() {
        let (app, _dir) = make_app(EntryFilter::new(Some("P1".into()), None));
        assert_eq!(app.filter().project.as_deref(), Some("P1"));
        assert_eq!(app.view().metrics.total_hours, 16.0);
    }

    #[test]
    fn test_app_project_key_cycles_filter() {
        let (mut app, _dir) = make_app(EntryFilter::default());
        app.handle_key(key(KeyCode::Char('p')));
        assert_eq!(app.filter().project.as_deref(), Some("P1"));
        assert_eq!(app.view().metrics.total_hours, 16.0);

        app.handle_key(key(KeyCode::Char('p')));
        assert_eq!(app.filter().project.as_deref(), Some("P2"));
        assert_eq!(app.view().metrics.total_hours, 5.0);

        app.handle_key(key(KeyCode::Char('a')));
        assert!(app.filter().is_unrestricted());
    }

    #[test]
    fn test_app_empty_combination_shows_message() {
        let (mut app, _dir) = make_app(EntryFilter::new(Some("P2".into()), None));
        // employees: all -> Ann -> Bob
        app.handle_key(key(KeyCode::Char('e')));
        app.handle_key(key(KeyCode::Char('e')));
        assert_eq!(app.filter().employee.as_deref(), Some("Bob"));
        let message = app.empty_message().expect("empty result message");
        assert!(message.contains("project=P2"));
        assert!(message.contains("employee=Bob"));
        assert_eq!(app.view().metrics.total_hours, 0.0);
    }

    #[test]
    fn test_app_quit_keys() {
        for code in [KeyCode::Char('q'), KeyCode::Char('Q'), KeyCode::Esc] {
            let (mut app, _dir) = make_app(EntryFilter::default());
            app.handle_key(key(code));
            assert!(app.should_quit);
        }
        let (mut app, _dir) = make_app(EntryFilter::default());
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }

    #[test]
    fn test_app_refresh_picks_up_changes() {
        let (mut app, dir) = make_app(EntryFilter::default());
        std::fs::write(
            dir.path().join("data.json"),
            r#"{"data": [{"Employee": "Cid", "Project_No": "P9", "Client": "X",
                "Activity": "Dev", "Project_Description": "D", "Hours": 2}]}"#,
        )
        .unwrap();
        app.handle_key(key(KeyCode::Char('r')));
        assert_eq!(app.view().metrics.total_hours, 2.0);
        assert_eq!(app.view().metrics.active_employees, 1);
    }

    #[test]
    fn test_app_failed_refresh_keeps_data_and_reports() {
        let (mut app, dir) = make_app(EntryFilter::default());
        std::fs::write(dir.path().join("data.json"), "{oops").unwrap();
        app.handle_key(key(KeyCode::Char('r')));
        assert!(app.status().unwrap().starts_with("Reload failed"));
        assert_eq!(app.view().metrics.total_hours, 21.0);
    }

    #[test]
    fn test_app_missing_source_reports_status() {
        let dir = TempDir::new().unwrap();
        let manager = DataManager::new(dir.path().join("none.json"), TimesheetAggregator::default());
        let app = App::new("light", manager, EntryFilter::default());
        assert!(app.status().unwrap().contains("Source file not found"));
        assert!(app.empty_message().is_some());
    }

    // ── Event loop ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_next_event_applies_keys_then_interrupt() {
        let (mut app, _dir) = make_app(EntryFilter::default());
        let (tx, mut rx) = mpsc::channel(4);
        let mut ticker = source_ticker(Duration::from_secs(3600));

        tx.send(DashboardEvent::Key(key(KeyCode::Char('p')))).await.unwrap();
        tx.send(DashboardEvent::Interrupt).await.unwrap();

        app.next_event(&mut rx, &mut ticker).await.unwrap();
        assert_eq!(app.filter().project.as_deref(), Some("P1"));
        assert!(!app.should_quit);

        app.next_event(&mut rx, &mut ticker).await.unwrap();
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_next_event_waits_without_blocking() {
        let (mut app, _dir) = make_app(EntryFilter::default());
        let (_tx, mut rx) = mpsc::channel::<DashboardEvent>(4);
        let mut ticker = source_ticker(Duration::from_secs(3600));

        // With no input pending, a concurrent timer must get to run.
        let waited =
            tokio::time::timeout(Duration::from_millis(20), app.next_event(&mut rx, &mut ticker))
                .await;
        assert!(waited.is_err());
        assert!(!app.should_quit);
    }

    #[tokio::test]
    async fn test_next_event_tick_rechecks_source() {
        let (mut app, dir) = make_app(EntryFilter::default());
        let (_tx, mut rx) = mpsc::channel::<DashboardEvent>(4);
        let mut ticker = source_ticker(Duration::from_millis(10));

        std::fs::write(
            dir.path().join("data.json"),
            r#"{"data": [{"Employee": "Cid", "Project_No": "P9", "Client": "X",
                "Activity": "Dev", "Project_Description": "D", "Hours": 3}]}"#,
        )
        .unwrap();
        app.next_event(&mut rx, &mut ticker).await.unwrap();
        assert_eq!(app.view().metrics.total_hours, 3.0);
    }

    #[tokio::test]
    async fn test_next_event_input_failure_and_closed_channel() {
        let (mut app, _dir) = make_app(EntryFilter::default());
        let mut ticker = source_ticker(Duration::from_secs(3600));

        let (tx, mut rx) = mpsc::channel(4);
        tx.send(DashboardEvent::InputFailed(io::Error::other("tty gone")))
            .await
            .unwrap();
        assert!(app.next_event(&mut rx, &mut ticker).await.is_err());

        drop(tx);
        app.next_event(&mut rx, &mut ticker).await.unwrap();
        assert!(app.should_quit);
    }

    #[test]
    fn test_app_render_does_not_panic() {
        let (app, _dir) = make_app(EntryFilter::default());
        let backend = TestBackend::new(120, 40);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();

        let text: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("TIMESHEET DASHBOARD"));
        assert!(text.contains("data.json"));
        assert!(text.contains("Top projects"));
    }
}
