//! Core traits for the PMS TUI architecture
//!
//! This module defines the foundational traits shared by all screens.

use crossterm::event::KeyEvent;
use ratatui::{layout::Rect, Frame};

use super::events::ScreenEvent;
use crate::models::Route;

/// Actions that can be returned from screen event handling
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenAction {
    /// Navigate to a different screen
    NavigateTo(Route),
    /// Set status message
    SetStatus(String),
    /// Report a completed change
    SetSuccess(String),
    /// Set error message
    SetError(String),
    /// No action taken
    None,
}

/// Core trait for all TUI screens.
///
/// A screen is mounted when constructed and torn down when dropped. Remote
/// calls it starts carry a probe of its own `Lifetime`.
pub trait Screen {
    /// Draw the screen content
    fn draw(&mut self, f: &mut Frame, area: Rect);

    /// Handle keyboard input and return an action
    fn handle_key_event(&mut self, key: KeyEvent) -> ScreenAction;

    /// Handle a pointer press at a terminal cell
    fn handle_pointer_press(&mut self, _column: u16, _row: u16) -> ScreenAction {
        ScreenAction::None
    }

    /// Apply the result of a remote call this screen started
    fn handle_event(&mut self, event: ScreenEvent) -> ScreenAction;

    /// Route this screen renders
    fn route(&self) -> Route;

    /// Whether a dialog covers the whole view, sidebar included
    fn has_open_modal(&self) -> bool {
        false
    }

    /// Whether plain character keys should go to an input field
    fn captures_text(&self) -> bool {
        false
    }

    /// Context shortcuts shown in the help popup
    fn help_text(&self) -> &'static str;
}

/// Trait for screens with navigable lists
pub trait Navigable {
    /// Get currently selected index
    fn get_selected_index(&self) -> Option<usize>;

    /// Set selected index
    fn set_selected_index(&mut self, index: Option<usize>);

    /// Get total number of items
    fn get_item_count(&self) -> usize;

    /// Move selection up
    fn navigate_up(&mut self) {
        let count = self.get_item_count();
        if count == 0 {
            return;
        }
        let next = match self.get_selected_index() {
            Some(0) | None => count - 1,
            Some(i) => i - 1,
        };
        self.set_selected_index(Some(next));
    }

    /// Move selection down
    fn navigate_down(&mut self) {
        let count = self.get_item_count();
        if count == 0 {
            return;
        }
        let next = match self.get_selected_index() {
            Some(i) => (i + 1) % count,
            None => 0,
        };
        self.set_selected_index(Some(next));
    }

    /// Navigate to first item
    fn navigate_to_first(&mut self) {
        if self.get_item_count() > 0 {
            self.set_selected_index(Some(0));
        }
    }

    /// Navigate to last item
    fn navigate_to_last(&mut self) {
        let count = self.get_item_count();
        if count > 0 {
            self.set_selected_index(Some(count - 1));
        }
    }
}

/// Trait for form focus handling
pub trait FormHandler {
    /// Get current field index
    fn get_current_field(&self) -> usize;

    /// Set current field
    fn set_current_field(&mut self, field: usize);

    /// Get total number of fields
    fn get_field_count(&self) -> usize;

    /// Move to next field
    fn next_field(&mut self) {
        let current = self.get_current_field();
        let total = self.get_field_count();
        if total > 0 {
            self.set_current_field((current + 1) % total);
        }
    }

    /// Move to previous field
    fn previous_field(&mut self) {
        let current = self.get_current_field();
        let total = self.get_field_count();
        if total > 0 {
            self.set_current_field(if current == 0 { total - 1 } else { current - 1 });
        }
    }
}
