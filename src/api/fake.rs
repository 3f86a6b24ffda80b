//! Scripted in-memory [`PmsApi`] for unit tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::{ApiError, PmsApi};
use crate::models::{
    Expenditure, NewExpenditure, NewRiskIssue, NotificationItem, ProjectId, RiskIssueItem,
};

type Script<T> = Mutex<VecDeque<Result<T, ApiError>>>;

/// Each call pops the next scripted result; unscripted calls fail with 599
#[derive(Default)]
pub struct FakeApi {
    pub notifications: Script<Vec<NotificationItem>>,
    pub risk_lists: Script<Vec<RiskIssueItem>>,
    pub risk_creates: Script<RiskIssueItem>,
    pub status_updates: Script<()>,
    pub expenditure_lists: Script<Vec<Expenditure>>,
    pub expenditure_creates: Script<()>,

    pub risk_list_calls: Mutex<usize>,
    pub posted_risks: Mutex<Vec<NewRiskIssue>>,
    pub updated_records: Mutex<Vec<RiskIssueItem>>,
    pub posted_expenditures: Mutex<Vec<(ProjectId, NewExpenditure)>>,
}

pub fn status_error(status: u16, message: Option<&str>) -> ApiError {
    ApiError::Status {
        status,
        message: message.map(str::to_string),
    }
}

fn next<T>(script: &Script<T>) -> Result<T, ApiError> {
    script
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(status_error(599, Some("unscripted call"))))
}

impl FakeApi {
    pub fn push<T>(script: &Script<T>, result: Result<T, ApiError>) {
        script.lock().unwrap().push_back(result);
    }
}

#[async_trait]
impl PmsApi for FakeApi {
    async fn list_notifications(&self) -> Result<Vec<NotificationItem>, ApiError> {
        next(&self.notifications)
    }

    async fn list_risk_issues(&self, _project: ProjectId) -> Result<Vec<RiskIssueItem>, ApiError> {
        *self.risk_list_calls.lock().unwrap() += 1;
        next(&self.risk_lists)
    }

    async fn create_risk_issue(
        &self,
        _project: ProjectId,
        draft: &NewRiskIssue,
    ) -> Result<RiskIssueItem, ApiError> {
        self.posted_risks.lock().unwrap().push(draft.clone());
        next(&self.risk_creates)
    }

    async fn update_risk_issue(&self, item: &RiskIssueItem) -> Result<(), ApiError> {
        self.updated_records.lock().unwrap().push(item.clone());
        next(&self.status_updates)
    }

    async fn create_expenditure(
        &self,
        project: ProjectId,
        draft: &NewExpenditure,
    ) -> Result<(), ApiError> {
        self.posted_expenditures
            .lock()
            .unwrap()
            .push((project, draft.clone()));
        next(&self.expenditure_creates)
    }

    async fn list_expenditures(&self, _project: ProjectId) -> Result<Vec<Expenditure>, ApiError> {
        next(&self.expenditure_lists)
    }
}
