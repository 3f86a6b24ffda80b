//! Reusable UI components for the PMS TUI

pub mod form_field;
pub mod status_display;

pub use form_field::{Form, FormField, FormFieldType};
pub use status_display::StatusDisplay;
