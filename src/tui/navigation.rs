//! Navigation sidebar and the activity (notifications) modal
//!
//! The navigation owns the notification poller. Snapshots arrive over a
//! channel and are folded into a [`NotificationFeed`] on every frame; the
//! poller stops when the navigation is dropped.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
    Frame,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::api::PmsApi;
use crate::models::{NotificationItem, ProjectId, Route};
use crate::poller::{NotificationFeed, PollTask};
use crate::tui::overlay::{ModalFrame, ModalPress};
use crate::tui::ui::{centered_rect, rect_contains, truncate_to_width, Styles};

pub const SIDEBAR_WIDTH: u16 = 26;

/// What a sidebar press asks the app to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavRequest {
    Navigate(Route),
    Logout,
}

pub struct Navigation {
    project: ProjectId,
    user_name: Option<String>,
    feed: NotificationFeed,
    snapshots: UnboundedReceiver<Vec<NotificationItem>>,
    _poller: Option<PollTask>,

    activity_open: bool,
    activity_scroll: usize,
    modal_frame: ModalFrame,

    entry_areas: Vec<(Route, Rect)>,
    bell_area: Rect,
    logout_area: Rect,
}

impl Navigation {
    /// Mount the navigation and start polling notifications every `period`
    pub fn start(
        api: Arc<dyn PmsApi>,
        period: Duration,
        user_name: Option<String>,
        project: ProjectId,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let poller = PollTask::spawn(
            "notifications",
            period,
            move || {
                let api = api.clone();
                async move { api.list_notifications().await }
            },
            tx,
        );
        let mut nav = Self::with_receiver(rx, user_name, project);
        nav._poller = Some(poller);
        nav
    }

    /// Navigation fed from an existing channel, without its own poller
    pub fn with_receiver(
        snapshots: UnboundedReceiver<Vec<NotificationItem>>,
        user_name: Option<String>,
        project: ProjectId,
    ) -> Self {
        Self {
            project,
            user_name,
            feed: NotificationFeed::new(),
            snapshots,
            _poller: None,
            activity_open: false,
            activity_scroll: 0,
            modal_frame: ModalFrame::default(),
            entry_areas: Vec::new(),
            bell_area: Rect::default(),
            logout_area: Rect::default(),
        }
    }

    /// Fold any snapshots the poller delivered since the last call
    pub fn pump(&mut self) {
        while let Ok(snapshot) = self.snapshots.try_recv() {
            self.feed.apply(snapshot);
        }
    }

    pub fn feed(&self) -> &NotificationFeed {
        &self.feed
    }

    pub fn has_unseen(&self) -> bool {
        self.feed.has_unseen()
    }

    pub fn is_activity_open(&self) -> bool {
        self.activity_open
    }

    /// Bell pressed: show or hide the activity modal. Either way the user has
    /// now looked, so unseen items are acknowledged.
    pub fn toggle_activity(&mut self) {
        self.activity_open = !self.activity_open;
        self.activity_scroll = 0;
        self.feed.acknowledge();
    }

    pub fn handle_activity_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('a') | KeyCode::F(2) => self.toggle_activity(),
            KeyCode::Up | KeyCode::Char('k') => {
                self.activity_scroll = self.activity_scroll.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.activity_scroll + 1 < self.feed.len() {
                    self.activity_scroll += 1;
                }
            }
            _ => {}
        }
    }

    /// A press while the activity modal is open. Backdrop presses close it.
    pub fn handle_activity_press(&mut self, column: u16, row: u16) {
        if self.modal_frame.classify(column, row) == ModalPress::Backdrop {
            self.toggle_activity();
        }
    }

    /// A press on the sidebar. The bell is handled here.
    pub fn handle_sidebar_press(&mut self, column: u16, row: u16) -> Option<NavRequest> {
        if rect_contains(self.bell_area, column, row) {
            self.toggle_activity();
            return None;
        }
        if rect_contains(self.logout_area, column, row) {
            return Some(NavRequest::Logout);
        }
        self.entry_areas
            .iter()
            .find(|(_, area)| rect_contains(*area, column, row))
            .map(|(route, _)| NavRequest::Navigate(*route))
    }

    pub fn routes(&self) -> [Route; 3] {
        [
            Route::RiskIssues(self.project),
            Route::Expenditures(self.project),
            Route::AddExpenditure(self.project),
        ]
    }

    pub fn draw_sidebar(&mut self, f: &mut Frame, area: Rect, current: Route) {
        let block = Block::default()
            .title(format!("PMS - Project {}", self.project))
            .borders(Borders::ALL)
            .style(Styles::sidebar());
        let inner = block.inner(area);
        f.render_widget(block, area);

        let width = inner.width as usize;
        let line_rect = |offset: u16| Rect::new(inner.x, inner.y + offset, inner.width, 1);
        let mut lines: Vec<Line> = Vec::new();

        self.entry_areas.clear();
        for (index, route) in self.routes().into_iter().enumerate() {
            let label = truncate_to_width(&format!("{} {}", index + 1, route.title()), width);
            let style = if route == current {
                Styles::selected()
            } else {
                Styles::sidebar()
            };
            self.entry_areas.push((route, line_rect(lines.len() as u16)));
            lines.push(Line::from(Span::styled(label, style)));
        }

        lines.push(Line::from(""));
        self.bell_area = line_rect(lines.len() as u16);
        let mut bell = vec![Span::styled("a Activity", Styles::sidebar())];
        if self.feed.has_unseen() {
            bell.push(Span::raw(" "));
            bell.push(Span::styled("(!)", Styles::badge()));
        }
        lines.push(Line::from(bell));

        lines.push(Line::from(""));
        if let Some(name) = &self.user_name {
            lines.push(Line::from(truncate_to_width(&format!("Hi, {}", name), width)));
        }
        self.logout_area = line_rect(lines.len() as u16);
        lines.push(Line::from("L Logout"));

        f.render_widget(Paragraph::new(lines), inner);
    }

    pub fn draw_activity_modal(&mut self, f: &mut Frame, screen: Rect) {
        let area = centered_rect(60, 60, screen);
        self.modal_frame.set_content_area(area);
        f.render_widget(Clear, area);

        let block = Block::default()
            .title("Recent Activity")
            .borders(Borders::ALL)
            .border_style(Styles::active_border());

        if self.feed.is_empty() {
            f.render_widget(Paragraph::new("No recent activity.").block(block), area);
            return;
        }

        let width = area.width.saturating_sub(2) as usize;
        let items: Vec<ListItem> = self
            .feed
            .items()
            .iter()
            .skip(self.activity_scroll)
            .map(|n| {
                ListItem::new(vec![
                    Line::from(vec![
                        Span::styled(format!("{}: ", n.author_name()), Styles::title()),
                        Span::raw(truncate_to_width(&n.description, width.saturating_sub(n.author_name().len() + 2))),
                    ]),
                    Line::from(Span::styled(n.local_timestamp(), Styles::inactive())),
                ])
            })
            .collect();

        f.render_widget(List::new(items).block(block), area);
    }
}
