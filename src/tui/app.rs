//! Main TUI application state and logic

use anyhow::Result;
use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame, Terminal,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, error, info};

use super::components::StatusDisplay;
use super::events::{AppEvent, Dispatcher};
use super::navigation::{NavRequest, Navigation, SIDEBAR_WIDTH};
use super::overlay::PointerHub;
use super::screens::{ExpenditureFormScreen, ExpendituresScreen, RiskIssuePanel};
use super::traits::{Screen, ScreenAction};
use super::ui::{centered_rect, rect_contains};
use crate::api::PmsApi;
use crate::config::Config;
use crate::models::{ProjectId, Route};

/// Called when the user logs out, before the app quits
pub type LogoutHook = Box<dyn FnMut() -> Result<()>>;

/// Who is using the app and where it opens
#[derive(Debug, Clone)]
pub struct AppOptions {
    pub project: ProjectId,
    pub is_owner: bool,
    pub user_name: Option<String>,
    pub start: Route,
}

/// Main TUI application state
pub struct App {
    options: AppOptions,
    dispatcher: Dispatcher,
    events: UnboundedReceiver<AppEvent>,
    pointer: PointerHub,
    on_logout: LogoutHook,

    pub navigation: Navigation,
    pub screen: Box<dyn Screen>,
    pub status: StatusDisplay,

    pub should_quit: bool,
    pub show_help_popup: bool,
    sidebar_area: Rect,
}

impl App {
    /// Create the application and start notification polling.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        config: &Config,
        api: Arc<dyn PmsApi>,
        options: AppOptions,
        on_logout: LogoutHook,
    ) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(api, tx);
        let pointer = PointerHub::new();
        let navigation = Navigation::start(
            dispatcher.api(),
            config.notification_poll_interval(),
            options.user_name.clone(),
            options.project,
        );
        let screen = Self::mount(options.start, &options, &dispatcher, &pointer);

        Self {
            options,
            dispatcher,
            events,
            pointer,
            on_logout,
            navigation,
            screen,
            status: StatusDisplay::new(),
            should_quit: false,
            show_help_popup: false,
            sidebar_area: Rect::default(),
        }
    }

    fn mount(
        route: Route,
        options: &AppOptions,
        dispatcher: &Dispatcher,
        pointer: &PointerHub,
    ) -> Box<dyn Screen> {
        info!("Opening {}", route.path());
        match route {
            Route::RiskIssues(project) => Box::new(RiskIssuePanel::new(
                project,
                options.is_owner,
                dispatcher.clone(),
                pointer.clone(),
            )),
            Route::Expenditures(project) => {
                Box::new(ExpendituresScreen::new(project, dispatcher.clone()))
            }
            Route::AddExpenditure(project) => {
                Box::new(ExpenditureFormScreen::new(project, dispatcher.clone()))
            }
        }
    }

    /// Run the main application loop
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        loop {
            self.navigation.pump();
            while let Ok(event) = self.events.try_recv() {
                self.handle_app_event(event);
            }

            terminal.draw(|f| self.draw(f))?;

            if crossterm::event::poll(Duration::from_millis(100))? {
                match crossterm::event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        self.handle_key_event(key)
                    }
                    Event::Mouse(mouse) => {
                        if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
                            self.handle_pointer_press(mouse.column, mouse.row);
                        }
                    }
                    _ => {}
                }
            }

            if self.should_quit {
                break;
            }
            tokio::task::yield_now().await;
        }

        Ok(())
    }

    /// Deliver a finished remote call to the screen that started it
    pub fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Screen { origin, event } => {
                if !origin.is_alive() {
                    debug!("Dropping {:?} for an unmounted screen", event);
                    return;
                }
                let action = self.screen.handle_event(event);
                self.apply(action);
            }
        }
    }

    /// Handle keyboard input events
    pub fn handle_key_event(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        if self.show_help_popup {
            if matches!(key.code, KeyCode::Esc | KeyCode::F(1) | KeyCode::Char('?')) {
                self.show_help_popup = false;
            }
            return;
        }

        if self.navigation.is_activity_open() {
            self.navigation.handle_activity_key(key);
            return;
        }

        match key.code {
            KeyCode::F(1) => {
                self.show_help_popup = true;
                return;
            }
            KeyCode::F(2) => {
                self.navigation.toggle_activity();
                return;
            }
            _ => {}
        }

        // Plain letters belong to the input field on text-capturing screens
        if !self.screen.captures_text() {
            match key.code {
                KeyCode::Char('q') => {
                    self.should_quit = true;
                    return;
                }
                KeyCode::Char('?') => {
                    self.show_help_popup = true;
                    return;
                }
                KeyCode::Char('a') => {
                    self.navigation.toggle_activity();
                    return;
                }
                KeyCode::Char('L') => {
                    self.logout();
                    return;
                }
                KeyCode::Char(c @ '1'..='3') => {
                    let index = c as usize - '1' as usize;
                    let route = self.navigation.routes()[index];
                    self.navigate_to(route);
                    return;
                }
                _ => {}
            }
        }

        let action = self.screen.handle_key_event(key);
        self.apply(action);
    }

    /// Handle a left-button press at a terminal cell
    pub fn handle_pointer_press(&mut self, column: u16, row: u16) {
        if self.show_help_popup {
            self.show_help_popup = false;
            return;
        }

        if self.navigation.is_activity_open() {
            self.navigation.handle_activity_press(column, row);
            return;
        }

        let modal_open = self.screen.has_open_modal();

        // Outside-press listeners see every press first
        self.pointer.dispatch_press(column, row);
        let action = self.screen.handle_pointer_press(column, row);
        self.apply(action);

        // An open modal's backdrop covers the sidebar
        if !modal_open && rect_contains(self.sidebar_area, column, row) {
            match self.navigation.handle_sidebar_press(column, row) {
                Some(NavRequest::Navigate(route)) => self.navigate_to(route),
                Some(NavRequest::Logout) => self.logout(),
                None => {}
            }
        }
    }

    fn apply(&mut self, action: ScreenAction) {
        match action {
            ScreenAction::NavigateTo(route) => self.navigate_to(route),
            ScreenAction::SetStatus(message) => self.status.set_info(message),
            ScreenAction::SetSuccess(message) => self.status.set_success(message),
            ScreenAction::SetError(message) => self.status.set_error(message),
            ScreenAction::None => {}
        }
    }

    /// Unmount the current screen and mount the one for `route`
    pub fn navigate_to(&mut self, route: Route) {
        if self.screen.route() == route {
            return;
        }
        self.screen = Self::mount(route, &self.options, &self.dispatcher, &self.pointer);
        self.status.clear();
    }

    fn logout(&mut self) {
        info!("Logging out");
        match (self.on_logout)() {
            Ok(()) => self.should_quit = true,
            Err(e) => {
                error!("Logout failed: {:#}", e);
                self.status.set_error(format!("Logout failed: {}", e));
            }
        }
    }

    /// Draw the UI
    pub fn draw(&mut self, f: &mut Frame) {
        let size = f.size();

        // Main layout: status bar at bottom, sidebar and content above
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)])
            .split(size);
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
            .split(rows[0]);

        self.sidebar_area = columns[0];
        let current = self.screen.route();
        self.navigation.draw_sidebar(f, columns[0], current);
        self.screen.draw(f, columns[1]);

        let fallback = format!(
            "PMS - {} | q: Quit | a: Activity | F1/?: Help",
            current.title()
        );
        self.status.render(f, rows[1], &fallback);

        if self.navigation.is_activity_open() {
            self.navigation.draw_activity_modal(f, size);
        }

        if self.show_help_popup {
            self.draw_help_popup(f, size);
        }
    }

    /// Draw help popup with context-sensitive shortcuts
    fn draw_help_popup(&self, f: &mut Frame, area: Rect) {
        let popup_area = centered_rect(80, 70, area);

        f.render_widget(Clear, popup_area);

        let help_content = self.get_context_help();
        let help_popup = Paragraph::new(help_content)
            .block(
                Block::default()
                    .title("Help - Context Shortcuts")
                    .borders(Borders::ALL)
                    .style(Style::default().fg(Color::Yellow)),
            )
            .style(Style::default().fg(Color::White));

        f.render_widget(help_popup, popup_area);
    }

    /// Get context-sensitive help content
    fn get_context_help(&self) -> String {
        let global_help = "Global Shortcuts:\n\
            1/2/3 - Risks & Issues / Expenditures / Record Expenditure\n\
            a / F2 - Recent activity\n\
            L - Logout\n\
            Q / Ctrl+C - Quit application\n\
            F1 / ? - Toggle this help\n\n";

        format!("{}{}", global_help, self.screen.help_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeApi;
    use crate::models::NewExpenditure;
    use ratatui::backend::TestBackend;
    use std::cell::Cell;
    use std::rc::Rc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app_at(api: Arc<FakeApi>, start: Route) -> App {
        let options = AppOptions {
            project: 12,
            is_owner: true,
            user_name: Some("Dana".to_string()),
            start,
        };
        App::new(&Config::default(), api, options, Box::new(|| Ok(())))
    }

    async fn settle(app: &mut App) {
        let event = app.events.recv().await.expect("event channel closed");
        app.handle_app_event(event);
    }

    #[tokio::test]
    async fn test_record_expenditure_lands_on_list() {
        let api = Arc::new(FakeApi::default());
        FakeApi::push(&api.expenditure_creates, Ok(()));
        FakeApi::push(&api.expenditure_lists, Ok(vec![]));
        let mut app = app_at(api.clone(), Route::AddExpenditure(12));

        for c in "Cement".chars() {
            app.handle_key_event(key(KeyCode::Char(c)));
        }
        app.handle_key_event(key(KeyCode::Tab));
        for c in "150.50".chars() {
            app.handle_key_event(key(KeyCode::Char(c)));
        }
        // Digits went into the amount field rather than switching routes
        assert_eq!(app.screen.route(), Route::AddExpenditure(12));

        app.handle_key_event(key(KeyCode::Enter));
        settle(&mut app).await;

        assert_eq!(app.screen.route(), Route::Expenditures(12));
        assert_eq!(app.screen.route().path(), "/projects/12/expenditures");
        assert_eq!(
            api.posted_expenditures.lock().unwrap()[0].1,
            NewExpenditure {
                amount: "150.50".to_string(),
                description: "Cement".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_results_for_unmounted_screen_are_dropped() {
        let api = Arc::new(FakeApi::default());
        FakeApi::push(&api.risk_lists, Ok(vec![]));
        FakeApi::push(&api.expenditure_lists, Ok(vec![]));
        let mut app = app_at(api, Route::RiskIssues(12));

        // Leave before the risk list arrives
        app.handle_key_event(key(KeyCode::Char('2')));
        assert_eq!(app.screen.route(), Route::Expenditures(12));

        settle(&mut app).await;
        assert_eq!(app.screen.route(), Route::Expenditures(12));
        assert!(app.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_activity_modal_takes_keys_while_open() {
        let api = Arc::new(FakeApi::default());
        let mut app = app_at(api, Route::Expenditures(12));

        app.handle_key_event(key(KeyCode::Char('a')));
        assert!(app.navigation.is_activity_open());

        // 'q' is swallowed by the modal
        app.handle_key_event(key(KeyCode::Char('q')));
        assert!(!app.should_quit);

        app.handle_key_event(key(KeyCode::Esc));
        assert!(!app.navigation.is_activity_open());

        app.handle_key_event(key(KeyCode::Char('q')));
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_logout_runs_hook_and_quits() {
        let api = Arc::new(FakeApi::default());
        let called = Rc::new(Cell::new(false));
        let flag = called.clone();
        let options = AppOptions {
            project: 1,
            is_owner: false,
            user_name: None,
            start: Route::Expenditures(1),
        };
        let mut app = App::new(
            &Config::default(),
            api,
            options,
            Box::new(move || {
                flag.set(true);
                Ok(())
            }),
        );

        app.handle_key_event(key(KeyCode::Char('L')));
        assert!(called.get());
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_sidebar_press_behind_modal_only_closes_it() {
        let api = Arc::new(FakeApi::default());
        FakeApi::push(&api.risk_lists, Ok(vec![]));
        let mut app = app_at(api, Route::RiskIssues(12));
        settle(&mut app).await;
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();

        app.handle_key_event(key(KeyCode::Char('n')));
        assert!(app.screen.has_open_modal());
        terminal.draw(|f| app.draw(f)).unwrap();

        // Second sidebar entry, "2 Expenditures"
        app.handle_pointer_press(3, 2);
        assert!(!app.screen.has_open_modal());
        assert_eq!(app.screen.route(), Route::RiskIssues(12));

        terminal.draw(|f| app.draw(f)).unwrap();
        app.handle_pointer_press(3, 2);
        assert_eq!(app.screen.route(), Route::Expenditures(12));
    }

    #[tokio::test]
    async fn test_first_frame_renders_sidebar_and_loading_state() {
        let api = Arc::new(FakeApi::default());
        let mut app = app_at(api, Route::RiskIssues(12));
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();

        terminal.draw(|f| app.draw(f)).unwrap();

        let text: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(text.contains("Activity"));
        assert!(text.contains("Hi, Dana"));
        assert!(text.contains("Loading Risks/Issues"));
    }
}
