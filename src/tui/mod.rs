//! PMS Terminal User Interface (TUI)
//!
//! A sidebar navigation with the notification bell, and one mounted screen
//! at a time: the risk/issue panel, the expenditure list, or the Record
//! Expenditure form.

pub mod app;
pub mod components;
pub mod events;
pub mod form_flow;
pub mod navigation;
pub mod overlay;
pub mod screens;
pub mod traits;
pub mod ui;

pub use app::{App, AppOptions};
pub use events::AppEvent;
