//! Main TUI application state and logic

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use super::event::{is_quit, Event, EventHandler};
use crate::client::{Backend, ConnectionHandle};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::filter::SmartFilter;
use crate::models::{ConnectionStatus, StreamKind};
use crate::viewer::{TabCoordinator, TabFetch, TabOutcome};

/// Where keystrokes go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    /// Typing into the search box
    Search,
    /// Typing into the filter bar of the active tab
    Filter,
    /// Typing a DSN into the connection dialog
    Connect,
}

/// Main TUI application state
pub struct App {
    /// Whether the app should quit
    pub should_quit: bool,
    /// Current input target
    pub mode: InputMode,
    /// Both record lists
    pub tabs: TabCoordinator,
    /// Filter bar of the logs tab
    pub log_filters: SmartFilter,
    /// Filter bar of the query history tab
    pub query_filters: SmartFilter,
    /// Text of the search box while it is focused
    pub search_buffer: String,
    /// Text of the connection dialog
    pub dsn_input: String,
    /// Show help overlay
    pub show_help: bool,
    /// Status message
    pub status_message: Option<(String, Instant)>,
    /// Last time a response arrived
    pub last_update: Instant,
    /// Fetches currently running in the background
    pub in_flight: usize,
    status_ttl: Duration,
    backend: Arc<dyn Backend>,
    connection: ConnectionHandle,
    tx: UnboundedSender<Event>,
}

impl App {
    /// Create the app. Background work reports back through `tx`.
    pub fn new(
        backend: Arc<dyn Backend>,
        connection: ConnectionHandle,
        config: &Config,
        tx: UnboundedSender<Event>,
    ) -> Self {
        let tabs = TabCoordinator::new(Arc::clone(&backend), connection.clone(), &config.viewer);
        let close_delay = config.viewer.dropdown_close_delay;

        Self {
            should_quit: false,
            mode: InputMode::default(),
            tabs,
            log_filters: Self::filter_bar(StreamKind::Logs, close_delay, tx.clone()),
            query_filters: Self::filter_bar(StreamKind::Queries, close_delay, tx.clone()),
            search_buffer: String::new(),
            dsn_input: String::new(),
            show_help: false,
            status_message: None,
            last_update: Instant::now(),
            in_flight: 0,
            status_ttl: config.tui.status_ttl,
            backend,
            connection,
            tx,
        }
    }

    fn filter_bar(kind: StreamKind, close_delay: Duration, tx: UnboundedSender<Event>) -> SmartFilter {
        let mut filter = SmartFilter::new(kind).with_close_delay(close_delay);
        filter.on_change(move |conditions| {
            let _ = tx.send(Event::FiltersChanged(kind, conditions));
        });
        filter
    }

    /// Current connection status
    pub fn connection(&self) -> ConnectionStatus {
        self.connection.get()
    }

    /// Filter bar of the visible tab
    pub fn active_filter(&self) -> &SmartFilter {
        match self.tabs.active_tab() {
            StreamKind::Logs => &self.log_filters,
            StreamKind::Queries => &self.query_filters,
        }
    }

    fn active_filter_mut(&mut self) -> &mut SmartFilter {
        match self.tabs.active_tab() {
            StreamKind::Logs => &mut self.log_filters,
            StreamKind::Queries => &mut self.query_filters,
        }
    }

    /// Search text shown in the search box
    pub fn search_text(&self) -> &str {
        if self.mode == InputMode::Search {
            return &self.search_buffer;
        }
        match self.tabs.active_tab() {
            StreamKind::Logs => self.tabs.logs().search_input(),
            StreamKind::Queries => self.tabs.queries().search_input(),
        }
    }

    /// Check the connection and load the initial tab
    pub fn start(&mut self) {
        self.check_connection();
        let fetch = self.tabs.reload();
        self.spawn_fetch(fetch);
    }

    // -- background work ---------------------------------------------------

    fn spawn_fetch(&mut self, fetch: Option<TabFetch>) {
        let Some(fetch) = fetch else {
            return;
        };
        self.in_flight += 1;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = fetch.execute().await;
            let _ = tx.send(Event::Fetched(outcome));
        });
    }

    fn check_connection(&self) {
        let backend = Arc::clone(&self.backend);
        let connection = self.connection.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let status = connection.refresh(backend.as_ref()).await;
            let _ = tx.send(Event::Connection {
                status,
                configured: false,
            });
        });
    }

    fn configure_connection(&mut self, dsn: String) {
        info!(dsn = %crate::models::mask_dsn(&dsn), "Submitting connection");
        self.set_status("Connecting...".to_string());

        let backend = Arc::clone(&self.backend);
        let connection = self.connection.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let event = match backend.configure_connection(&dsn).await {
                Ok(response) => {
                    let status = response.resulting_status();
                    connection.set(status.clone());
                    Event::Connection {
                        status,
                        configured: true,
                    }
                }
                Err(e) => Event::Error(format!("Failed to configure connection: {e}")),
            };
            let _ = tx.send(event);
        });
    }

    // -- events ------------------------------------------------------------

    /// Apply one event
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Tick => self.on_tick(Instant::now()),
            Event::Key(key) => self.handle_key(key),
            Event::Fetched(outcome) => self.on_fetched(outcome),
            Event::FiltersChanged(kind, conditions) => {
                debug!(stream = %kind, filters = conditions.len(), "Filters changed");
                let fetch = self.tabs.set_structured_filters(kind, conditions);
                self.spawn_fetch(fetch);
            }
            Event::Connection { status, configured } => self.on_connection(status, configured),
            Event::Error(message) => {
                warn!(error = %message, "Background error");
                self.set_status(message);
            }
            Event::Mouse(_) | Event::Resize(_, _) => {}
        }
    }

    pub(crate) fn on_tick(&mut self, now: Instant) {
        for fetch in self.tabs.poll_timers(now) {
            self.spawn_fetch(Some(fetch));
        }
        self.log_filters.poll_timers(now);
        self.query_filters.poll_timers(now);
    }

    fn on_fetched(&mut self, outcome: TabOutcome) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let kind = outcome.kind();
        let follow_up = self.tabs.finish(outcome);
        self.last_update = Instant::now();

        if follow_up.is_none() {
            let error = match kind {
                StreamKind::Logs => self.tabs.logs().last_error(),
                StreamKind::Queries => self.tabs.queries().last_error(),
            };
            if let Some(error) = error.map(str::to_string) {
                self.set_status(error);
            }
        }
        self.spawn_fetch(follow_up);
    }

    fn on_connection(&mut self, status: ConnectionStatus, configured: bool) {
        info!(connected = status.connected, configured, "Connection status received");
        if status.connected {
            if configured {
                let message = status.message.unwrap_or_else(|| "Connected".to_string());
                self.set_status(message);
                let fetch = self.tabs.reload();
                self.spawn_fetch(fetch);
            }
        } else if let Some(error) = status.error {
            self.set_status(error);
        }
    }

    /// Handle key events
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers == KeyModifiers::CONTROL {
            self.should_quit = true;
            return;
        }
        match self.mode {
            InputMode::Normal => self.handle_normal_key(key),
            InputMode::Search => self.handle_search_key(key),
            InputMode::Filter => self.handle_filter_key(key),
            InputMode::Connect => self.handle_connect_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        if self.show_help {
            self.show_help = false;
            return;
        }
        if is_quit(key) {
            self.should_quit = true;
            return;
        }

        let fetch = match key.code {
            KeyCode::Char('?') => {
                self.show_help = true;
                None
            }
            KeyCode::Tab | KeyCode::BackTab => {
                let next = match self.tabs.active_tab() {
                    StreamKind::Logs => StreamKind::Queries,
                    StreamKind::Queries => StreamKind::Logs,
                };
                self.tabs.set_active_tab(next)
            }
            KeyCode::Char('1') => self.tabs.set_active_tab(StreamKind::Logs),
            KeyCode::Char('2') => self.tabs.set_active_tab(StreamKind::Queries),
            KeyCode::Char('/') => {
                self.search_buffer = self.search_text().to_string();
                self.mode = InputMode::Search;
                None
            }
            KeyCode::Char('f') => {
                self.active_filter_mut().show_input();
                self.mode = InputMode::Filter;
                None
            }
            KeyCode::Char('d') => {
                let last = self.active_filter().filters().last().map(|f| f.id);
                if let Some(id) = last {
                    self.active_filter_mut().remove_filter(id);
                }
                None
            }
            KeyCode::Char('x') => {
                self.active_filter_mut().clear_filters();
                None
            }
            KeyCode::Char('c') => {
                self.dsn_input.clear();
                self.mode = InputMode::Connect;
                None
            }
            KeyCode::Char('l') => self.tabs.cycle_level(),
            KeyCode::Char('t') => {
                let range = self.active_time_range().next();
                self.tabs.set_time_range(range)
            }
            KeyCode::Char('T') => {
                let range = self.active_time_range().prev();
                self.tabs.set_time_range(range)
            }
            KeyCode::Char('a') => {
                let refresh = self.tabs.active_auto_refresh().next();
                self.tabs.set_auto_refresh(refresh, Instant::now());
                self.set_status(format!("Auto refresh: {refresh}"));
                None
            }
            KeyCode::Char('r') => self.tabs.reload(),
            KeyCode::Char('n') | KeyCode::Right => self.tabs.next_page(),
            KeyCode::Char('p') | KeyCode::Left => self.tabs.previous_page(),
            KeyCode::Home => self.tabs.go_to_page(1),
            KeyCode::End => {
                let last = self.tabs.active_list().render().pagination.total_pages;
                self.tabs.go_to_page(last)
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.tabs.select_next();
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.tabs.select_previous();
                None
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                self.tabs.toggle_expanded();
                None
            }
            KeyCode::Char('o') => self.tabs.follow_selected_query_id(),
            _ => None,
        };
        self.spawn_fetch(fetch);
    }

    fn active_time_range(&self) -> crate::models::TimeRange {
        match self.tabs.active_tab() {
            StreamKind::Logs => self.tabs.logs().state().time_range,
            StreamKind::Queries => self.tabs.queries().state().time_range,
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                self.mode = InputMode::Normal;
                let text = self.search_buffer.clone();
                let fetch = self.tabs.set_search(&text);
                self.spawn_fetch(fetch);
            }
            KeyCode::Esc => self.mode = InputMode::Normal,
            KeyCode::Backspace => {
                self.search_buffer.pop();
                self.tabs.search_input_changed(&self.search_buffer, Instant::now());
            }
            KeyCode::Char('u') if key.modifiers == KeyModifiers::CONTROL => {
                self.search_buffer.clear();
                self.tabs.search_input_changed(&self.search_buffer, Instant::now());
            }
            KeyCode::Char(c) => {
                self.search_buffer.push(c);
                self.tabs.search_input_changed(&self.search_buffer, Instant::now());
            }
            _ => {}
        }
    }

    fn handle_filter_key(&mut self, key: KeyEvent) {
        let filter = self.active_filter_mut();
        match key.code {
            KeyCode::Esc => {
                if filter.is_dropdown_open() {
                    filter.escape();
                } else {
                    if filter.input().is_empty() {
                        filter.hide_input();
                    } else {
                        filter.blur(Instant::now());
                    }
                    self.mode = InputMode::Normal;
                }
            }
            KeyCode::Enter => match filter.highlighted() {
                Some(index) if filter.is_dropdown_open() => {
                    filter.select_suggestion(index);
                }
                _ => {
                    filter.submit();
                }
            },
            KeyCode::Down => filter.highlight_next(),
            KeyCode::Up => filter.highlight_previous(),
            KeyCode::Tab => {
                let index = filter.highlighted().unwrap_or(0);
                filter.select_suggestion(index);
            }
            KeyCode::F(n @ 1..=4) => {
                filter.use_example(usize::from(n - 1));
            }
            KeyCode::Backspace => filter.pop_char(),
            KeyCode::Char(c) => filter.push_char(c),
            _ => {}
        }
    }

    fn handle_connect_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.mode = InputMode::Normal,
            KeyCode::Enter => {
                let dsn = self.dsn_input.trim().to_string();
                if dsn.is_empty() {
                    self.set_status("DSN is required".to_string());
                    return;
                }
                self.mode = InputMode::Normal;
                self.configure_connection(dsn);
            }
            KeyCode::Backspace => {
                self.dsn_input.pop();
            }
            KeyCode::Char(c) => self.dsn_input.push(c),
            _ => {}
        }
    }

    /// Set a status message that expires after the configured TTL
    pub fn set_status(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get current status message if not expired
    pub fn get_status(&self) -> Option<&str> {
        self.status_message.as_ref().and_then(|(msg, time)| {
            if time.elapsed() < self.status_ttl {
                Some(msg.as_str())
            } else {
                None
            }
        })
    }

    /// Run the TUI application until the user quits
    pub async fn run(&mut self, mut events: EventHandler) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        };
        use ratatui::{backend::CrosstermBackend, Terminal};
        use std::io;

        let tui_err = |e: io::Error| Error::Tui(e.to_string());

        // Setup terminal
        enable_raw_mode().map_err(tui_err)?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).map_err(tui_err)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).map_err(tui_err)?;

        events.start();
        self.start();

        let mut result = Ok(());
        while !self.should_quit {
            if let Err(e) = terminal.draw(|frame| super::ui::draw(frame, self)) {
                result = Err(tui_err(e));
                break;
            }

            match events.next().await {
                Some(event) => self.handle_event(event),
                None => break,
            }
        }

        // Restore terminal
        disable_raw_mode().map_err(tui_err)?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen).map_err(tui_err)?;
        terminal.show_cursor().map_err(tui_err)?;

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewer::controller::tests::FakeBackend;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn app(backend: Arc<FakeBackend>) -> (App, UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut config = Config::default();
        config.viewer.search_debounce = Duration::from_millis(300);
        let app = App::new(backend, ConnectionHandle::default(), &config, tx);
        (app, rx)
    }

    /// Feed background events back into the app until it goes quiet
    async fn settle(app: &mut App, rx: &mut UnboundedReceiver<Event>) {
        while let Ok(Some(event)) =
            tokio::time::timeout(Duration::from_millis(200), rx.recv()).await
        {
            app.handle_event(event);
        }
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_event(key(KeyCode::Char(c)));
        }
    }

    #[tokio::test]
    async fn test_start_loads_logs() {
        let backend = FakeBackend::with_body(json!({
            "logs": [{"timestamp": "2024-01-01T00:00:00Z", "log_level": "INFO", "message": "hello"}],
            "total": 1
        }));
        let (mut app, mut rx) = app(Arc::clone(&backend));

        app.start();
        settle(&mut app, &mut rx).await;

        assert_eq!(app.in_flight, 0);
        assert_eq!(app.tabs.logs().records().len(), 1);
        assert_eq!(backend.request_count(), 1);
    }

    #[tokio::test]
    async fn test_search_is_debounced_until_tick() {
        let backend = Arc::new(FakeBackend::default());
        let (mut app, mut rx) = app(Arc::clone(&backend));

        app.handle_event(key(KeyCode::Char('/')));
        assert_eq!(app.mode, InputMode::Search);
        type_text(&mut app, "timeout");
        settle(&mut app, &mut rx).await;
        assert_eq!(backend.request_count(), 0);

        app.on_tick(Instant::now() + Duration::from_secs(1));
        settle(&mut app, &mut rx).await;

        let requests = backend.requests.lock();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].1.search.as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn test_submitted_filter_reaches_the_request() {
        let backend = Arc::new(FakeBackend::default());
        let (mut app, mut rx) = app(Arc::clone(&backend));

        app.handle_event(key(KeyCode::Char('f')));
        assert_eq!(app.mode, InputMode::Filter);
        type_text(&mut app, "log_level = 'ERROR'");
        app.handle_event(key(KeyCode::Enter));
        settle(&mut app, &mut rx).await;

        assert_eq!(app.log_filters.filters().len(), 1);
        let requests = backend.requests.lock();
        let (endpoint, request) = requests.last().unwrap();
        assert_eq!(endpoint, "/api/logs");
        assert_eq!(request.filters, vec!["log_level = 'ERROR'".to_string()]);
    }

    #[tokio::test]
    async fn test_switching_tab_loads_queries() {
        let backend = Arc::new(FakeBackend::default());
        let (mut app, mut rx) = app(Arc::clone(&backend));

        app.handle_event(key(KeyCode::Char('2')));
        settle(&mut app, &mut rx).await;

        assert_eq!(app.tabs.active_tab(), StreamKind::Queries);
        let requests = backend.requests.lock();
        assert_eq!(requests.last().map(|(e, _)| e.as_str()), Some("/api/queries"));
    }

    #[tokio::test]
    async fn test_failed_fetch_sets_status() {
        let backend = Arc::new(FakeBackend::default());
        backend.responses.lock().push(Err(Error::api("boom")));
        let (mut app, mut rx) = app(Arc::clone(&backend));

        app.handle_event(key(KeyCode::Char('r')));
        settle(&mut app, &mut rx).await;

        assert_eq!(app.get_status(), Some("Failed to load data: boom"));
    }

    #[tokio::test]
    async fn test_empty_dsn_is_rejected() {
        let (mut app, _rx) = app(Arc::new(FakeBackend::default()));

        app.handle_event(key(KeyCode::Char('c')));
        assert_eq!(app.mode, InputMode::Connect);
        app.handle_event(key(KeyCode::Enter));

        assert_eq!(app.mode, InputMode::Connect);
        assert_eq!(app.get_status(), Some("DSN is required"));
    }

    #[test]
    fn test_status_expires() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut config = Config::default();
        config.tui.status_ttl = Duration::ZERO;
        let mut app = App::new(
            Arc::new(FakeBackend::default()),
            ConnectionHandle::default(),
            &config,
            tx,
        );

        app.set_status("gone".to_string());
        assert_eq!(app.get_status(), None);
    }

    #[test]
    fn test_quit_keys() {
        let (mut app, _rx) = app(Arc::new(FakeBackend::default()));
        app.handle_event(key(KeyCode::Char('q')));
        assert!(app.should_quit);
    }
}
