//! Project risks & issues panel
//!
//! Lists a project's risks and issues, lets the user report a new one through
//! a modal form, and change a row's status through a popover anchored to it.
//! The modal and the popover share one overlay slot.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use tracing::{info, warn};

use super::LoadState;
use crate::api::errors::{LOAD_RISK_ISSUES_FAILED, SUBMIT_FAILED, UPDATE_STATUS_FAILED};
use crate::models::{
    ImpactLevel, NewRiskIssue, ProjectId, RiskIssueItem, RiskIssueKind, RiskIssueStatus, Route,
};
use crate::tui::{
    components::{Form, FormField, FormFieldType},
    events::{Dispatcher, Lifetime, ScreenEvent},
    form_flow::FormFlow,
    overlay::{ModalFrame, ModalPress, OverlaySlot, PointerHub},
    traits::{FormHandler, Navigable, Screen, ScreenAction},
    ui::{anchored_rect, centered_rect, rect_contains, truncate_to_width, Styles},
};

const FIELD_TYPE: usize = 0;
const FIELD_TITLE: usize = 1;
const FIELD_DESCRIPTION: usize = 2;
const FIELD_IMPACT: usize = 3;

const ROW_HEIGHT: u16 = 3;

pub struct RiskIssuePanel {
    project: ProjectId,
    is_owner: bool,
    dispatcher: Dispatcher,
    lifetime: Lifetime,
    pointer: PointerHub,

    pub state: LoadState<RiskIssueItem>,
    list_state: ListState,
    pub overlay: OverlaySlot<u64>,
    modal_frame: ModalFrame,
    pub report: FormFlow<NewRiskIssue>,
    report_form: Form,
    /// Row whose status change is in flight
    pending_status: Option<u64>,

    // Geometry from the last draw, for pointer hit-testing
    row_areas: Vec<(u64, Rect)>,
    field_areas: Vec<Rect>,
}

impl RiskIssuePanel {
    /// Mount the panel and start the initial fetch
    pub fn new(project: ProjectId, is_owner: bool, dispatcher: Dispatcher, pointer: PointerHub) -> Self {
        let report_form = Form::new(vec![
            FormField::new("Type", FormFieldType::Choice).with_locked(!is_owner),
            FormField::new("Title", FormFieldType::Text),
            FormField::new("Description", FormFieldType::TextArea),
            FormField::new("Impact Level", FormFieldType::Choice),
        ]);

        let mut panel = Self {
            project,
            is_owner,
            dispatcher,
            lifetime: Lifetime::new(),
            pointer,
            state: LoadState::Loading,
            list_state: ListState::default(),
            overlay: OverlaySlot::Closed,
            modal_frame: ModalFrame::default(),
            report: FormFlow::new(NewRiskIssue::default()),
            report_form,
            pending_status: None,
            row_areas: Vec::new(),
            field_areas: Vec::new(),
        };
        panel.fetch();
        panel
    }

    fn fetch(&self) {
        let project = self.project;
        self.dispatcher.spawn(self.lifetime.probe(), move |api| async move {
            ScreenEvent::RiskIssuesLoaded(api.list_risk_issues(project).await)
        });
    }

    pub fn selected_item(&self) -> Option<&RiskIssueItem> {
        self.list_state
            .selected()
            .and_then(|i| self.state.items().get(i))
    }

    fn item_by_id(&self, id: u64) -> Option<&RiskIssueItem> {
        self.state.items().iter().find(|item| item.id == id)
    }

    /// "Report" button
    pub fn open_report_modal(&mut self) {
        self.overlay.open_modal();
    }

    /// "Change Status" on the selected row
    pub fn toggle_status_popover(&mut self) -> ScreenAction {
        let Some(item) = self.selected_item() else {
            return ScreenAction::None;
        };
        if !item.status_editable_by(self.is_owner) {
            return ScreenAction::SetError(
                "Only the project owner can change the status of a risk".to_string(),
            );
        }
        let id = item.id;
        self.overlay.toggle_popover(id, &self.pointer);
        ScreenAction::None
    }

    /// The popover's `Change to "<next>"` button
    pub fn change_status(&mut self) -> ScreenAction {
        let Some(id) = self.overlay.popover_key() else {
            return ScreenAction::None;
        };
        if self.pending_status.is_some() {
            return ScreenAction::None;
        }
        let Some(item) = self.item_by_id(id) else {
            self.overlay.close();
            return ScreenAction::None;
        };

        let updated = item.with_status(item.next_status());
        info!("Changing risk/issue {} to {}", id, updated.status.as_str());
        self.pending_status = Some(id);
        self.dispatcher.spawn(self.lifetime.probe(), move |api| async move {
            ScreenEvent::RiskIssueStatusChanged(api.update_risk_issue(&updated).await)
        });
        ScreenAction::SetStatus("Updating status...".to_string())
    }

    /// Modal "Submit". A no-op while a submission is in flight.
    pub fn submit_report(&mut self) -> ScreenAction {
        let Some(draft) = self.report.begin_submit() else {
            return ScreenAction::None;
        };
        let project = self.project;
        self.dispatcher.spawn(self.lifetime.probe(), move |api| async move {
            ScreenEvent::RiskIssueCreated(api.create_risk_issue(project, &draft).await)
        });
        ScreenAction::None
    }

    fn field_value(draft: &NewRiskIssue, index: usize) -> &str {
        match index {
            FIELD_TYPE => draft.kind.as_str(),
            FIELD_TITLE => &draft.title,
            FIELD_DESCRIPTION => &draft.description,
            FIELD_IMPACT => draft.impact_level.as_str(),
            _ => "",
        }
    }

    fn text_mut(draft: &mut NewRiskIssue, index: usize) -> Option<&mut String> {
        match index {
            FIELD_TITLE => Some(&mut draft.title),
            FIELD_DESCRIPTION => Some(&mut draft.description),
            _ => None,
        }
    }

    fn cycle<T: Copy + PartialEq>(options: &[T], current: T, forward: bool) -> T {
        let pos = options.iter().position(|o| *o == current).unwrap_or(0);
        let next = if forward {
            (pos + 1) % options.len()
        } else {
            (pos + options.len() - 1) % options.len()
        };
        options[next]
    }

    fn cycle_choice(&mut self, forward: bool) {
        let index = self.report_form.current_field;
        if self.report_form.current().map_or(true, |f| f.locked) {
            return;
        }
        let Some(draft) = self.report.draft_mut() else {
            return;
        };
        match index {
            FIELD_TYPE => draft.kind = Self::cycle(&RiskIssueKind::ALL, draft.kind, forward),
            FIELD_IMPACT => {
                draft.impact_level = Self::cycle(&ImpactLevel::ALL, draft.impact_level, forward)
            }
            _ => {}
        }
    }

    fn edit_current<F>(&mut self, edit: F)
    where
        F: FnOnce(&mut FormField, &mut String),
    {
        let index = self.report_form.current_field;
        // Only text fields take characters; anything else leaves the error shown
        if !matches!(index, FIELD_TITLE | FIELD_DESCRIPTION) {
            return;
        }
        let Some(draft) = self.report.draft_mut() else {
            return;
        };
        if let (Some(text), Some(field)) = (Self::text_mut(draft, index), self.report_form.current_mut()) {
            edit(field, text);
        }
    }

    fn handle_modal_key(&mut self, key: KeyEvent) -> ScreenAction {
        let is_choice = self
            .report_form
            .current()
            .map_or(false, |f| f.field_type == FormFieldType::Choice);
        let value = Self::field_value(self.report.draft(), self.report_form.current_field).to_string();

        match key.code {
            KeyCode::Esc => self.overlay.close(),
            KeyCode::Enter => return self.submit_report(),
            KeyCode::Tab | KeyCode::Down => self.report_form.next_field(),
            KeyCode::BackTab | KeyCode::Up => self.report_form.previous_field(),
            KeyCode::Left if is_choice => self.cycle_choice(false),
            KeyCode::Right if is_choice => self.cycle_choice(true),
            KeyCode::Left => {
                if let Some(field) = self.report_form.current_mut() {
                    field.move_cursor_left();
                }
            }
            KeyCode::Right => {
                if let Some(field) = self.report_form.current_mut() {
                    field.move_cursor_right(&value);
                }
            }
            KeyCode::Home => {
                if let Some(field) = self.report_form.current_mut() {
                    field.move_cursor_to_start();
                }
            }
            KeyCode::End => {
                if let Some(field) = self.report_form.current_mut() {
                    field.move_cursor_to_end(&value);
                }
            }
            KeyCode::Char(' ') if is_choice => self.cycle_choice(true),
            KeyCode::Char(c) => self.edit_current(|field, text| field.insert_char(text, c)),
            KeyCode::Backspace => self.edit_current(|field, text| field.delete_char(text)),
            KeyCode::Delete => self.edit_current(|field, text| field.delete_char_forward(text)),
            _ => {}
        }
        ScreenAction::None
    }

    fn handle_popover_key(&mut self, key: KeyEvent) -> ScreenAction {
        match key.code {
            KeyCode::Enter | KeyCode::Char('y') => self.change_status(),
            KeyCode::Esc | KeyCode::Char('s') => {
                self.overlay.close();
                ScreenAction::None
            }
            KeyCode::Up | KeyCode::Down => {
                // The popover belongs to a row; moving away closes it
                self.overlay.close();
                self.handle_list_key(key)
            }
            _ => ScreenAction::None,
        }
    }

    fn handle_list_key(&mut self, key: KeyEvent) -> ScreenAction {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.navigate_up(),
            KeyCode::Down | KeyCode::Char('j') => self.navigate_down(),
            KeyCode::Home => self.navigate_to_first(),
            KeyCode::End => self.navigate_to_last(),
            KeyCode::Char('n') => self.open_report_modal(),
            KeyCode::Char('s') | KeyCode::Enter => return self.toggle_status_popover(),
            KeyCode::Char('r') => {
                self.state = LoadState::Loading;
                self.fetch();
            }
            _ => {}
        }
        ScreenAction::None
    }

    fn on_loaded(&mut self, result: Result<Vec<RiskIssueItem>, crate::api::ApiError>) {
        match result {
            Ok(items) => {
                let selected = match self.list_state.selected() {
                    Some(i) if i < items.len() => Some(i),
                    _ if items.is_empty() => None,
                    _ => Some(0),
                };
                self.list_state.select(selected);
                self.state = LoadState::Loaded(items);
            }
            Err(e) => {
                warn!("Loading risks/issues for project {} failed: {}", self.project, e);
                self.overlay.close();
                self.state = LoadState::Failed(e.user_message(LOAD_RISK_ISSUES_FAILED));
            }
        }
    }

    fn on_created(&mut self, result: Result<RiskIssueItem, crate::api::ApiError>) -> ScreenAction {
        match result {
            Ok(item) => {
                info!("Reported risk/issue {} on project {}", item.id, self.project);
                let title = item.title.clone();
                if let LoadState::Loaded(items) = &mut self.state {
                    items.insert(0, item);
                    self.list_state.select(Some(0));
                }
                if self.overlay.is_modal_open() {
                    self.overlay.close();
                }
                self.report.succeed(true);
                self.report_form.reset();
                ScreenAction::SetSuccess(format!("Reported \"{}\"", title))
            }
            Err(e) => {
                let message = e.user_message(SUBMIT_FAILED);
                warn!("Reporting risk/issue failed: {}", e);
                self.report.fail(message.clone());
                if self.overlay.is_modal_open() {
                    ScreenAction::None
                } else {
                    ScreenAction::SetError(message)
                }
            }
        }
    }

    fn on_status_changed(&mut self, result: Result<(), crate::api::ApiError>) -> ScreenAction {
        let id = self.pending_status.take();
        match result {
            Ok(()) => {
                if id.is_some() && self.overlay.popover_key() == id {
                    self.overlay.close();
                }
                self.fetch();
                ScreenAction::SetSuccess("Status updated".to_string())
            }
            Err(e) => {
                warn!("Status change failed: {}", e);
                ScreenAction::SetError(e.user_message(UPDATE_STATUS_FAILED))
            }
        }
    }

    fn row_lines(item: &RiskIssueItem, editable: bool, width: usize) -> Vec<Line<'static>> {
        let badge_style = match item.status {
            RiskIssueStatus::Open => Styles::error(),
            RiskIssueStatus::Closed => Styles::success(),
        };

        let mut meta = vec![
            Span::styled(format!("Type: {} | Impact: {}  ", item.kind.as_str(), item.impact_level.as_str()), Styles::inactive()),
            Span::styled(format!("[{}]", item.status.as_str()), badge_style),
        ];
        if editable {
            meta.push(Span::styled("  s: Change Status", Styles::info()));
        }

        vec![
            Line::from(Span::styled(truncate_to_width(&item.title, width), Styles::title())),
            Line::from(Span::styled(truncate_to_width(&item.description, width), Styles::inactive())),
            Line::from(meta),
        ]
    }

    fn draw_list(&mut self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .title("Project Risks & Issues  (n: Report)")
            .borders(Borders::ALL)
            .border_style(Styles::active_border());
        let inner = block.inner(area);
        self.row_areas.clear();

        let items = match &self.state {
            LoadState::Loading => {
                f.render_widget(Paragraph::new("Loading Risks/Issues…").block(block), area);
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
                    Paragraph::new("No risks or issues reported for this project.").block(block),
                    area,
                );
                return;
            }
            LoadState::Loaded(items) => items,
        };

        let width = inner.width.saturating_sub(2) as usize;
        let list_items: Vec<ListItem> = items
            .iter()
            .map(|item| ListItem::new(Self::row_lines(item, item.status_editable_by(self.is_owner), width)))
            .collect();
        let ids: Vec<u64> = items.iter().map(|i| i.id).collect();

        let list = List::new(list_items)
            .block(block)
            .highlight_style(Styles::selected());
        f.render_stateful_widget(list, area, &mut self.list_state);

        let offset = self.list_state.offset();
        for (position, id) in ids.iter().enumerate().skip(offset) {
            let y = inner.y + (position - offset) as u16 * ROW_HEIGHT;
            if y + ROW_HEIGHT > inner.y + inner.height {
                break;
            }
            self.row_areas.push((*id, Rect::new(inner.x, y, inner.width, ROW_HEIGHT)));
        }
    }

    fn draw_popover(&mut self, f: &mut Frame, bounds: Rect) {
        let Some(id) = self.overlay.popover_key() else {
            return;
        };
        let (Some(anchor), Some(item)) = (
            self.row_areas.iter().find(|(row, _)| *row == id).map(|(_, r)| *r),
            self.item_by_id(id),
        ) else {
            return;
        };

        let label = if self.pending_status == Some(id) {
            "Updating...".to_string()
        } else {
            format!("Change to \"{}\"", item.next_status().as_str())
        };
        let area = anchored_rect(anchor, 28, 3, bounds);
        let popover = Paragraph::new(label)
            .style(Styles::info())
            .block(
                Block::default()
                    .title("Status (Enter)")
                    .borders(Borders::ALL)
                    .border_style(Styles::active_border()),
            );
        f.render_widget(Clear, area);
        f.render_widget(popover, area);
        self.overlay.set_popover_bounds(area);
    }

    fn draw_report_modal(&mut self, f: &mut Frame, screen: Rect) {
        let area = centered_rect(60, 80, screen);
        self.modal_frame.set_content_area(area);
        f.render_widget(Clear, area);

        let block = Block::default()
            .title("Report Risk/Issue")
            .borders(Borders::ALL)
            .border_style(Styles::active_border());
        let inner = block.inner(area);
        f.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(5),
                Constraint::Length(3),
                Constraint::Min(2),
                Constraint::Length(1),
            ])
            .split(inner);

        let submitting = self.report.is_submitting();
        self.field_areas = chunks[..4].to_vec();
        for (index, field) in self.report_form.fields.iter().enumerate() {
            let value = Self::field_value(self.report.draft(), index);
            field.render(f, chunks[index], value, submitting);
        }

        if let Some(error) = self.report.error() {
            f.render_widget(
                Paragraph::new(error.to_string())
                    .style(Styles::error())
                    .wrap(Wrap { trim: true }),
                chunks[4],
            );
        }

        let footer = if submitting {
            "Submitting..."
        } else {
            "Enter: Submit | Esc: Cancel | Tab: Next field | ◀/▶: Change option"
        };
        f.render_widget(Paragraph::new(footer).style(Styles::inactive()), chunks[5]);
    }
}

impl Navigable for RiskIssuePanel {
    fn get_selected_index(&self) -> Option<usize> {
        self.list_state.selected()
    }

    fn set_selected_index(&mut self, index: Option<usize>) {
        self.list_state.select(index);
    }

    fn get_item_count(&self) -> usize {
        self.state.items().len()
    }
}

impl Screen for RiskIssuePanel {
    fn draw(&mut self, f: &mut Frame, area: Rect) {
        self.draw_list(f, area);

        if self.overlay.is_modal_open() {
            self.draw_report_modal(f, area);
        } else if self.overlay.popover_key().is_some() {
            self.draw_popover(f, area);
        }
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> ScreenAction {
        if self.overlay.is_modal_open() {
            self.handle_modal_key(key)
        } else if self.overlay.popover_key().is_some() {
            self.handle_popover_key(key)
        } else if matches!(self.state, LoadState::Loaded(_)) || key.code == KeyCode::Char('r') {
            self.handle_list_key(key)
        } else {
            ScreenAction::None
        }
    }

    fn handle_pointer_press(&mut self, column: u16, row: u16) -> ScreenAction {
        if self.overlay.is_modal_open() {
            match self.modal_frame.classify(column, row) {
                ModalPress::Content => {
                    if let Some(index) = self.field_areas.iter().position(|a| rect_contains(*a, column, row)) {
                        self.report_form.set_current_field(index);
                    }
                }
                ModalPress::Backdrop => self.overlay.close(),
            }
            return ScreenAction::None;
        }

        if self.overlay.dismiss_on_outside_press() {
            return ScreenAction::None;
        }
        if let Some(bounds) = self.overlay.popover_bounds() {
            if rect_contains(bounds, column, row) {
                return self.change_status();
            }
        }

        if let Some(position) = self
            .row_areas
            .iter()
            .position(|(_, area)| rect_contains(*area, column, row))
        {
            let index = self.list_state.offset() + position;
            self.list_state.select(Some(index));
        }
        ScreenAction::None
    }

    fn handle_event(&mut self, event: ScreenEvent) -> ScreenAction {
        match event {
            ScreenEvent::RiskIssuesLoaded(result) => {
                self.on_loaded(result);
                ScreenAction::None
            }
            ScreenEvent::RiskIssueCreated(result) => self.on_created(result),
            ScreenEvent::RiskIssueStatusChanged(result) => self.on_status_changed(result),
            _ => ScreenAction::None,
        }
    }

    fn route(&self) -> Route {
        Route::RiskIssues(self.project)
    }

    fn has_open_modal(&self) -> bool {
        self.overlay.is_modal_open()
    }

    fn captures_text(&self) -> bool {
        self.overlay.is_modal_open()
    }

    fn help_text(&self) -> &'static str {
        "Risks & Issues:\n\
        ↑/↓ - Select row\n\
        s / Enter - Change status (popover)\n\
        n - Report a risk/issue\n\
        r - Reload\n\n\
        Report form:\n\
        Tab - Next field\n\
        ◀/▶ - Change option\n\
        Enter - Submit\n\
        Esc - Cancel"
    }
}
