//! Expenditure list screen

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Rect},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};
use tracing::warn;

use super::LoadState;
use crate::api::errors::LOAD_EXPENDITURES_FAILED;
use crate::models::{Expenditure, ProjectId, Route};
use crate::tui::{
    events::{Dispatcher, Lifetime, ScreenEvent},
    traits::{Navigable, Screen, ScreenAction},
    ui::{rect_contains, Styles},
};

pub struct ExpendituresScreen {
    project: ProjectId,
    dispatcher: Dispatcher,
    lifetime: Lifetime,
    pub state: LoadState<Expenditure>,
    table_state: TableState,
    body_area: Rect,
}

impl ExpendituresScreen {
    pub fn new(project: ProjectId, dispatcher: Dispatcher) -> Self {
        let screen = Self {
            project,
            dispatcher,
            lifetime: Lifetime::new(),
            state: LoadState::Loading,
            table_state: TableState::default(),
            body_area: Rect::default(),
        };
        screen.fetch();
        screen
    }

    fn fetch(&self) {
        let project = self.project;
        self.dispatcher.spawn(self.lifetime.probe(), move |api| async move {
            ScreenEvent::ExpendituresLoaded(api.list_expenditures(project).await)
        });
    }

    fn reload(&mut self) {
        self.state = LoadState::Loading;
        self.fetch();
    }
}

impl Navigable for ExpendituresScreen {
    fn get_selected_index(&self) -> Option<usize> {
        self.table_state.selected()
    }

    fn set_selected_index(&mut self, index: Option<usize>) {
        self.table_state.select(index);
    }

    fn get_item_count(&self) -> usize {
        self.state.items().len()
    }
}

impl Screen for ExpendituresScreen {
    fn draw(&mut self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(format!("Expenditures - Project {}  (n: Record)", self.project))
            .borders(Borders::ALL)
            .border_style(Styles::active_border());

        let items = match &self.state {
            LoadState::Loading => {
                f.render_widget(Paragraph::new("Loading expenditures…").block(block), area);
                return;
            }
            LoadState::Failed(message) => {
                let banner = Paragraph::new(format!("{}\n\nPress r to retry.", message))
                    .style(Styles::error())
                    .block(block);
                f.render_widget(banner, area);
                return;
            }
            LoadState::Loaded(items) if items.is_empty() => {
                f.render_widget(
                    Paragraph::new("No expenditures recorded yet.").block(block),
                    area,
                );
                return;
            }
            LoadState::Loaded(items) => items,
        };

        let header = Row::new(vec!["Date", "Amount", "Description"]).style(Styles::title());
        let rows: Vec<Row> = items
            .iter()
            .map(|e| {
                let date = e
                    .created_at
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "-".to_string());
                Row::new(vec![
                    Cell::from(date),
                    Cell::from(e.amount.clone()),
                    Cell::from(e.description.clone()),
                ])
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Length(12),
                Constraint::Length(14),
                Constraint::Min(20),
            ],
        )
        .header(header)
        .block(block)
        .highlight_style(Styles::selected());

        // Body starts below the border and the header row
        self.body_area = Rect::new(
            area.x + 1,
            area.y + 2,
            area.width.saturating_sub(2),
            area.height.saturating_sub(3),
        );
        f.render_stateful_widget(table, area, &mut self.table_state);
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> ScreenAction {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.navigate_up(),
            KeyCode::Down | KeyCode::Char('j') => self.navigate_down(),
            KeyCode::Home => self.navigate_to_first(),
            KeyCode::End => self.navigate_to_last(),
            KeyCode::Char('n') => return ScreenAction::NavigateTo(Route::AddExpenditure(self.project)),
            KeyCode::Char('r') => self.reload(),
            _ => {}
        }
        ScreenAction::None
    }

    fn handle_pointer_press(&mut self, column: u16, row: u16) -> ScreenAction {
        if rect_contains(self.body_area, column, row) {
            let index = self.table_state.offset() + (row - self.body_area.y) as usize;
            if index < self.get_item_count() {
                self.table_state.select(Some(index));
            }
        }
        ScreenAction::None
    }

    fn handle_event(&mut self, event: ScreenEvent) -> ScreenAction {
        if let ScreenEvent::ExpendituresLoaded(result) = event {
            match result {
                Ok(items) => {
                    self.table_state
                        .select(if items.is_empty() { None } else { Some(0) });
                    self.state = LoadState::Loaded(items);
                }
                Err(e) => {
                    warn!("Loading expenditures for project {} failed: {}", self.project, e);
                    self.state = LoadState::Failed(e.user_message(LOAD_EXPENDITURES_FAILED));
                }
            }
        }
        ScreenAction::None
    }

    fn route(&self) -> Route {
        Route::Expenditures(self.project)
    }

    fn help_text(&self) -> &'static str {
        "Expenditures:\n\
        ↑/↓ - Select row\n\
        n - Record expenditure\n\
        r - Reload"
    }
}
