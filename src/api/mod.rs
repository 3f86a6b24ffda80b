//! Remote API access
//!
//! The [`PmsApi`] trait is the seam between the UI and the network. The TUI
//! and CLI hold an `Arc<dyn PmsApi>`; tests substitute an in-memory fake.

pub mod client;
pub mod credentials;
pub mod errors;

#[cfg(test)]
pub mod fake;

pub use client::ApiClient;
pub use credentials::{CredentialProvider, SessionStore, StaticToken};
pub use errors::ApiError;

use async_trait::async_trait;

use crate::models::{
    Expenditure, NewExpenditure, NewRiskIssue, NotificationItem, ProjectId, RiskIssueItem,
};

#[async_trait]
pub trait PmsApi: Send + Sync {
    /// `GET /api/notifications`
    async fn list_notifications(&self) -> Result<Vec<NotificationItem>, ApiError>;

    /// `GET /api/projects/{project}/risks-issues`
    async fn list_risk_issues(&self, project: ProjectId) -> Result<Vec<RiskIssueItem>, ApiError>;

    /// `POST /api/projects/{project}/risks-issues`, returns the created record
    async fn create_risk_issue(
        &self,
        project: ProjectId,
        draft: &NewRiskIssue,
    ) -> Result<RiskIssueItem, ApiError>;

    /// `PUT /api/risks-issues/{id}` with the full record
    async fn update_risk_issue(&self, item: &RiskIssueItem) -> Result<(), ApiError>;

    /// `POST /api/projects/{project}/expenditures`
    async fn create_expenditure(
        &self,
        project: ProjectId,
        draft: &NewExpenditure,
    ) -> Result<(), ApiError>;

    /// `GET /api/projects/{project}/expenditures`
    async fn list_expenditures(&self, project: ProjectId) -> Result<Vec<Expenditure>, ApiError>;
}
