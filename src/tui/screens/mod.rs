//! Screen modules for the PMS TUI

pub mod expenditure_form;
pub mod expenditures;
pub mod risk_issues;

pub use expenditure_form::ExpenditureFormScreen;
pub use expenditures::ExpendituresScreen;
pub use risk_issues::RiskIssuePanel;

/// Primary list state. A failed load blocks the list behind a banner.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    Loading,
    Loaded(Vec<T>),
    Failed(String),
}

impl<T> LoadState<T> {
    pub fn items(&self) -> &[T] {
        match self {
            LoadState::Loaded(items) => items,
            _ => &[],
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }
}
