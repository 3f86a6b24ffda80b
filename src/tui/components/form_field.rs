//! Form field component for user input
//!
//! Fields hold presentation state only (label, focus, cursor, validation
//! message). The values themselves live in the form's draft and are passed
//! in for editing and rendering.

use ratatui::{
    layout::Rect,
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::tui::{traits::FormHandler, ui::Styles};

/// Type of form field
#[derive(Debug, Clone, PartialEq)]
pub enum FormFieldType {
    Text,
    TextArea,
    /// Fixed set of options, cycled with Left/Right
    Choice,
}

/// Individual form field
#[derive(Debug, Clone)]
pub struct FormField {
    pub label: String,
    pub placeholder: String,
    pub field_type: FormFieldType,
    pub is_focused: bool,
    /// Cursor position in characters
    pub cursor_position: usize,
    /// Read-only regardless of form state
    pub locked: bool,
    pub validation_error: Option<String>,
}

impl FormField {
    pub fn new(label: &str, field_type: FormFieldType) -> Self {
        Self {
            label: label.to_string(),
            placeholder: String::new(),
            field_type,
            is_focused: false,
            cursor_position: 0,
            locked: false,
            validation_error: None,
        }
    }

    pub fn with_placeholder(mut self, placeholder: &str) -> Self {
        self.placeholder = placeholder.to_string();
        self
    }

    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    pub fn set_focus(&mut self, focused: bool) {
        self.is_focused = focused;
    }

    pub fn is_text(&self) -> bool {
        self.field_type != FormFieldType::Choice
    }

    fn byte_index(value: &str, char_pos: usize) -> usize {
        value
            .char_indices()
            .nth(char_pos)
            .map(|(i, _)| i)
            .unwrap_or(value.len())
    }

    pub fn insert_char(&mut self, value: &mut String, c: char) {
        if !self.is_text() || self.locked {
            return;
        }
        let at = Self::byte_index(value, self.cursor_position);
        value.insert(at, c);
        self.cursor_position += 1;
        self.validation_error = None;
    }

    pub fn delete_char(&mut self, value: &mut String) {
        if !self.is_text() || self.locked || self.cursor_position == 0 {
            return;
        }
        self.cursor_position -= 1;
        let at = Self::byte_index(value, self.cursor_position);
        value.remove(at);
        self.validation_error = None;
    }

    pub fn delete_char_forward(&mut self, value: &mut String) {
        if !self.is_text() || self.locked {
            return;
        }
        if self.cursor_position < value.chars().count() {
            let at = Self::byte_index(value, self.cursor_position);
            value.remove(at);
            self.validation_error = None;
        }
    }

    pub fn move_cursor_left(&mut self) {
        if self.cursor_position > 0 {
            self.cursor_position -= 1;
        }
    }

    pub fn move_cursor_right(&mut self, value: &str) {
        if self.cursor_position < value.chars().count() {
            self.cursor_position += 1;
        }
    }

    pub fn move_cursor_to_start(&mut self) {
        self.cursor_position = 0;
    }

    pub fn move_cursor_to_end(&mut self, value: &str) {
        self.cursor_position = value.chars().count();
    }

    /// Render the form field. `disabled` greys it out while submitting.
    pub fn render(&self, f: &mut Frame, area: Rect, value: &str, disabled: bool) {
        let inactive = disabled || self.locked;

        let border_style = if self.validation_error.is_some() {
            Styles::error()
        } else if self.is_focused && !inactive {
            Styles::active_border()
        } else {
            Styles::inactive_border()
        };

        let title = if let Some(ref error) = self.validation_error {
            format!("{} - Error: {}", self.label, error)
        } else {
            self.label.clone()
        };

        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(border_style);

        let (display_text, text_style) = if value.is_empty() && !self.placeholder.is_empty() {
            (self.placeholder.clone(), Styles::inactive())
        } else if self.field_type == FormFieldType::Choice {
            let text = if inactive {
                value.to_string()
            } else {
                format!("◀ {} ▶", value)
            };
            (text, Styles::default())
        } else if inactive {
            (value.to_string(), Styles::inactive())
        } else {
            (value.to_string(), Styles::default())
        };

        let mut paragraph = Paragraph::new(display_text)
            .style(text_style)
            .block(block);
        if self.field_type == FormFieldType::TextArea {
            paragraph = paragraph.wrap(Wrap { trim: false });
        }

        f.render_widget(paragraph, area);

        // Single-line cursor; text areas place it on the first row
        if self.is_focused && self.is_text() && !inactive {
            let cursor_x = area.x + 1 + self.cursor_position as u16;
            let cursor_y = area.y + 1;
            if cursor_x < area.x + area.width.saturating_sub(1) {
                f.set_cursor(cursor_x, cursor_y);
            }
        }
    }
}

/// Form container that manages focus across fields
#[derive(Debug, Clone)]
pub struct Form {
    pub fields: Vec<FormField>,
    pub current_field: usize,
}

impl Form {
    pub fn new(fields: Vec<FormField>) -> Self {
        let mut form = Self {
            fields,
            current_field: 0,
        };
        form.update_focus();
        form
    }

    fn update_focus(&mut self) {
        for (i, field) in self.fields.iter_mut().enumerate() {
            field.set_focus(i == self.current_field);
        }
    }

    pub fn current(&self) -> Option<&FormField> {
        self.fields.get(self.current_field)
    }

    pub fn current_mut(&mut self) -> Option<&mut FormField> {
        self.fields.get_mut(self.current_field)
    }

    pub fn set_error(&mut self, index: usize, message: &str) {
        if let Some(field) = self.fields.get_mut(index) {
            field.validation_error = Some(message.to_string());
        }
    }

    pub fn clear_errors(&mut self) {
        for field in &mut self.fields {
            field.validation_error = None;
        }
    }

    /// Back to the first field with cursors at the start
    pub fn reset(&mut self) {
        for field in &mut self.fields {
            field.cursor_position = 0;
            field.validation_error = None;
        }
        self.current_field = 0;
        self.update_focus();
    }
}

impl FormHandler for Form {
    fn get_current_field(&self) -> usize {
        self.current_field
    }

    fn set_current_field(&mut self, field: usize) {
        if field < self.fields.len() {
            self.current_field = field;
            self.update_focus();
        }
    }

    fn get_field_count(&self) -> usize {
        self.fields.len()
    }
}
