//! Record Expenditure screen

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use tracing::{error, info};

use crate::api::errors::ADD_EXPENDITURE_FAILED;
use crate::models::{NewExpenditure, ProjectId, Route};
use crate::tui::{
    components::{Form, FormField, FormFieldType},
    events::{Dispatcher, Lifetime, ScreenEvent},
    form_flow::FormFlow,
    traits::{FormHandler, Screen, ScreenAction},
    ui::{rect_contains, Styles},
};

const FIELD_DESCRIPTION: usize = 0;
const FIELD_AMOUNT: usize = 1;

/// Field-level problems that keep the form from being sent
pub fn validate_expenditure(draft: &NewExpenditure) -> Vec<(usize, &'static str)> {
    let mut errors = Vec::new();

    if draft.description.trim().is_empty() {
        errors.push((FIELD_DESCRIPTION, "Description is required"));
    }

    let amount = draft.amount.trim();
    if amount.is_empty() {
        errors.push((FIELD_AMOUNT, "Amount is required"));
    } else if !is_valid_amount(amount) {
        errors.push((
            FIELD_AMOUNT,
            "Amount must be a non-negative number with at most two decimals",
        ));
    }

    errors
}

fn is_valid_amount(amount: &str) -> bool {
    let (whole, fraction) = match amount.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (amount, None),
    };
    let digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());

    if !digits(whole) {
        return false;
    }
    match fraction {
        None => !whole.is_empty(),
        Some(f) => !(whole.is_empty() && f.is_empty()) && f.len() <= 2 && digits(f),
    }
}

pub struct ExpenditureFormScreen {
    project: ProjectId,
    dispatcher: Dispatcher,
    lifetime: Lifetime,
    pub flow: FormFlow<NewExpenditure>,
    pub form: Form,
    field_areas: Vec<Rect>,
}

impl ExpenditureFormScreen {
    pub fn new(project: ProjectId, dispatcher: Dispatcher) -> Self {
        let form = Form::new(vec![
            FormField::new("Description", FormFieldType::TextArea)
                .with_placeholder("e.g. Cement, 40 bags"),
            FormField::new("Amount", FormFieldType::Text).with_placeholder("0.00"),
        ]);

        Self {
            project,
            dispatcher,
            lifetime: Lifetime::new(),
            flow: FormFlow::new(NewExpenditure::default()),
            form,
            field_areas: Vec::new(),
        }
    }

    fn value_mut(draft: &mut NewExpenditure, index: usize) -> &mut String {
        match index {
            FIELD_AMOUNT => &mut draft.amount,
            _ => &mut draft.description,
        }
    }

    fn value(draft: &NewExpenditure, index: usize) -> &str {
        match index {
            FIELD_AMOUNT => &draft.amount,
            _ => &draft.description,
        }
    }

    fn edit_current<F>(&mut self, edit: F)
    where
        F: FnOnce(&mut FormField, &mut String),
    {
        let index = self.form.current_field;
        let Some(draft) = self.flow.draft_mut() else {
            return;
        };
        if let Some(field) = self.form.current_mut() {
            field.validation_error = None;
            edit(field, Self::value_mut(draft, index));
        }
    }

    pub fn submit(&mut self) -> ScreenAction {
        if self.flow.is_submitting() {
            return ScreenAction::None;
        }

        self.form.clear_errors();
        let problems = validate_expenditure(self.flow.draft());
        if !problems.is_empty() {
            for (index, message) in &problems {
                self.form.set_error(*index, message);
            }
            if let Some((first, _)) = problems.first() {
                self.form.set_current_field(*first);
            }
            return ScreenAction::None;
        }

        let Some(draft) = self.flow.begin_submit() else {
            return ScreenAction::None;
        };
        info!(
            "Recording expenditure of {} on project {}",
            draft.amount, self.project
        );
        let project = self.project;
        self.dispatcher.spawn(self.lifetime.probe(), move |api| async move {
            ScreenEvent::ExpenditureCreated(api.create_expenditure(project, &draft).await)
        });
        ScreenAction::None
    }
}

impl Screen for ExpenditureFormScreen {
    fn draw(&mut self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(format!("Record Expenditure - Project {}", self.project))
            .borders(Borders::ALL)
            .border_style(Styles::active_border());
        let inner = block.inner(area);
        f.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(6),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(2),
                Constraint::Min(0),
            ])
            .split(inner);

        let submitting = self.flow.is_submitting();
        self.field_areas = chunks[..2].to_vec();
        for (index, field) in self.form.fields.iter().enumerate() {
            field.render(f, chunks[index], Self::value(self.flow.draft(), index), submitting);
        }

        let (label, style) = if submitting {
            ("Recording...", Styles::inactive())
        } else {
            ("Record Expenditure", Styles::selected())
        };
        let button = Paragraph::new(label)
            .style(style)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(button, chunks[2]);

        if let Some(error) = self.flow.error() {
            f.render_widget(
                Paragraph::new(error.to_string())
                    .style(Styles::error())
                    .wrap(Wrap { trim: true }),
                chunks[3],
            );
        }
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> ScreenAction {
        let value = Self::value(self.flow.draft(), self.form.current_field).to_string();

        match key.code {
            KeyCode::Esc => return ScreenAction::NavigateTo(Route::Expenditures(self.project)),
            KeyCode::Enter => return self.submit(),
            KeyCode::Tab | KeyCode::Down => self.form.next_field(),
            KeyCode::BackTab | KeyCode::Up => self.form.previous_field(),
            KeyCode::Left => {
                if let Some(field) = self.form.current_mut() {
                    field.move_cursor_left();
                }
            }
            KeyCode::Right => {
                if let Some(field) = self.form.current_mut() {
                    field.move_cursor_right(&value);
                }
            }
            KeyCode::Home => {
                if let Some(field) = self.form.current_mut() {
                    field.move_cursor_to_start();
                }
            }
            KeyCode::End => {
                if let Some(field) = self.form.current_mut() {
                    field.move_cursor_to_end(&value);
                }
            }
            KeyCode::Char(c) => self.edit_current(|field, text| field.insert_char(text, c)),
            KeyCode::Backspace => self.edit_current(|field, text| field.delete_char(text)),
            KeyCode::Delete => self.edit_current(|field, text| field.delete_char_forward(text)),
            _ => {}
        }
        ScreenAction::None
    }

    fn handle_pointer_press(&mut self, column: u16, row: u16) -> ScreenAction {
        if let Some(index) = self
            .field_areas
            .iter()
            .position(|a| rect_contains(*a, column, row))
        {
            self.form.set_current_field(index);
        }
        ScreenAction::None
    }

    fn handle_event(&mut self, event: ScreenEvent) -> ScreenAction {
        match event {
            ScreenEvent::ExpenditureCreated(Ok(())) => {
                info!("Expenditure recorded on project {}", self.project);
                self.flow.succeed(false);
                ScreenAction::NavigateTo(Route::Expenditures(self.project))
            }
            ScreenEvent::ExpenditureCreated(Err(e)) => {
                error!("Recording expenditure failed: {}", e);
                self.flow.fail(e.user_message(ADD_EXPENDITURE_FAILED));
                ScreenAction::None
            }
            _ => ScreenAction::None,
        }
    }

    fn route(&self) -> Route {
        Route::AddExpenditure(self.project)
    }

    fn captures_text(&self) -> bool {
        true
    }

    fn help_text(&self) -> &'static str {
        "Record Expenditure:\n\
        Tab/↑/↓ - Switch field\n\
        Enter - Record\n\
        Esc - Back to expenditures"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{status_error, FakeApi};
    use crate::tui::screens::test_support::{dispatcher, next_event};
    use crossterm::event::KeyModifiers;
    use std::sync::Arc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(screen: &mut ExpenditureFormScreen, text: &str) {
        for c in text.chars() {
            screen.handle_key_event(key(KeyCode::Char(c)));
        }
    }

    fn fill(screen: &mut ExpenditureFormScreen, description: &str, amount: &str) {
        type_text(screen, description);
        screen.handle_key_event(key(KeyCode::Tab));
        type_text(screen, amount);
    }

    #[test]
    fn test_amount_validation() {
        for ok in ["150.50", "0", "12", "0.5", ".5", "7."] {
            assert!(is_valid_amount(ok), "{} should be accepted", ok);
        }
        for bad in ["-1", "1.234", "abc", "1,000", ".", "1.2.3", "1e3"] {
            assert!(!is_valid_amount(bad), "{} should be rejected", bad);
        }
    }

    #[tokio::test]
    async fn test_success_navigates_to_expenditure_list() {
        let api = Arc::new(FakeApi::default());
        FakeApi::push(&api.expenditure_creates, Ok(()));
        let (dispatcher, mut rx) = dispatcher(api.clone());
        let mut screen = ExpenditureFormScreen::new(12, dispatcher);

        fill(&mut screen, "Cement", "150.50");
        screen.handle_key_event(key(KeyCode::Enter));
        assert!(screen.flow.is_submitting());

        // Second submit while in flight sends nothing
        screen.handle_key_event(key(KeyCode::Enter));

        let action = screen.handle_event(next_event(&mut rx).await);
        assert_eq!(action, ScreenAction::NavigateTo(Route::Expenditures(12)));
        assert_eq!(Route::Expenditures(12).path(), "/projects/12/expenditures");

        let posted = api.posted_expenditures.lock().unwrap().clone();
        assert_eq!(
            posted,
            vec![(
                12,
                NewExpenditure {
                    amount: "150.50".to_string(),
                    description: "Cement".to_string(),
                }
            )]
        );
    }

    #[tokio::test]
    async fn test_failure_keeps_values_and_shows_message() {
        let api = Arc::new(FakeApi::default());
        FakeApi::push(&api.expenditure_creates, Err(status_error(500, None)));
        let (dispatcher, mut rx) = dispatcher(api.clone());
        let mut screen = ExpenditureFormScreen::new(12, dispatcher);

        fill(&mut screen, "Cement", "150.50");
        screen.submit();
        let action = screen.handle_event(next_event(&mut rx).await);

        assert_eq!(action, ScreenAction::None);
        assert_eq!(screen.flow.error(), Some(ADD_EXPENDITURE_FAILED));
        assert_eq!(screen.flow.draft().amount, "150.50");
        assert_eq!(screen.flow.draft().description, "Cement");
    }

    #[tokio::test]
    async fn test_server_message_is_preferred() {
        let api = Arc::new(FakeApi::default());
        FakeApi::push(
            &api.expenditure_creates,
            Err(status_error(403, Some("Budget exceeded"))),
        );
        let (dispatcher, mut rx) = dispatcher(api);
        let mut screen = ExpenditureFormScreen::new(3, dispatcher);

        fill(&mut screen, "Steel", "99");
        screen.submit();
        screen.handle_event(next_event(&mut rx).await);
        assert_eq!(screen.flow.error(), Some("Budget exceeded"));
    }

    #[tokio::test]
    async fn test_invalid_input_is_not_sent() {
        let api = Arc::new(FakeApi::default());
        let (dispatcher, _rx) = dispatcher(api.clone());
        let mut screen = ExpenditureFormScreen::new(3, dispatcher);

        fill(&mut screen, "", "1.234");
        screen.submit();

        assert!(!screen.flow.is_submitting());
        assert!(screen.form.fields[FIELD_DESCRIPTION].validation_error.is_some());
        assert!(screen.form.fields[FIELD_AMOUNT].validation_error.is_some());
        assert_eq!(screen.form.current_field, FIELD_DESCRIPTION);
        assert!(api.posted_expenditures.lock().unwrap().is_empty());

        // Typing into the field clears its message
        type_text(&mut screen, "Sand");
        assert!(screen.form.fields[FIELD_DESCRIPTION].validation_error.is_none());
    }

    #[tokio::test]
    async fn test_escape_returns_to_list() {
        let api = Arc::new(FakeApi::default());
        let (dispatcher, _rx) = dispatcher(api);
        let mut screen = ExpenditureFormScreen::new(5, dispatcher);
        assert_eq!(
            screen.handle_key_event(key(KeyCode::Esc)),
            ScreenAction::NavigateTo(Route::Expenditures(5))
        );
    }
}
