//! HTTP client for the project management API

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::credentials::CredentialProvider;
use super::errors::ApiError;
use super::PmsApi;
use crate::config::Config;
use crate::models::{
    Expenditure, NewExpenditure, NewRiskIssue, NotificationItem, ProjectId, RiskIssueItem,
};

/// reqwest-backed implementation of [`PmsApi`]
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl ApiClient {
    pub fn new(config: &Config, credentials: Arc<dyn CredentialProvider>) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(&config.http.user_agent)
            .timeout(config.http_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_base().to_string(),
            credentials,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Providers may touch the filesystem, so they run off the async workers
    async fn token(&self) -> Option<String> {
        let credentials = self.credentials.clone();
        match tokio::task::spawn_blocking(move || credentials.token()).await {
            Ok(token) => token,
            Err(e) => {
                warn!("Credential lookup failed: {}", e);
                None
            }
        }
    }

    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        // An absent token is sent anyway; the server rejects it
        let token = self.token().await.unwrap_or_default();
        debug!("{} {}", method, path);
        self.http
            .request(method, self.url(path))
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            debug!("API responded {} with {} bytes", status, body.len());
            return Err(ApiError::from_status(status.as_u16(), &body));
        }

        Ok(serde_json::from_slice(&body)?)
    }

    async fn send_ignoring_body(&self, request: RequestBuilder) -> Result<(), ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await?;
            return Err(ApiError::from_status(status.as_u16(), &body));
        }
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(self.request(Method::GET, path).await).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send(self.request(Method::POST, path).await.json(body)).await
    }
}

#[async_trait]
impl PmsApi for ApiClient {
    async fn list_notifications(&self) -> Result<Vec<NotificationItem>, ApiError> {
        self.get("/api/notifications").await
    }

    async fn list_risk_issues(&self, project: ProjectId) -> Result<Vec<RiskIssueItem>, ApiError> {
        self.get(&format!("/api/projects/{}/risks-issues", project)).await
    }

    async fn create_risk_issue(
        &self,
        project: ProjectId,
        draft: &NewRiskIssue,
    ) -> Result<RiskIssueItem, ApiError> {
        info!("Reporting {} '{}' on project {}", draft.kind.as_str(), draft.title, project);
        self.post(&format!("/api/projects/{}/risks-issues", project), draft).await
    }

    async fn update_risk_issue(&self, item: &RiskIssueItem) -> Result<(), ApiError> {
        info!("Setting risk/issue {} to {}", item.id, item.status.as_str());
        let request = self
            .request(Method::PUT, &format!("/api/risks-issues/{}", item.id))
            .await
            .json(item);
        self.send_ignoring_body(request).await
    }

    async fn create_expenditure(
        &self,
        project: ProjectId,
        draft: &NewExpenditure,
    ) -> Result<(), ApiError> {
        info!("Recording expenditure of {} on project {}", draft.amount, project);
        let request = self
            .request(Method::POST, &format!("/api/projects/{}/expenditures", project))
            .await
            .json(draft);
        self.send_ignoring_body(request).await
    }

    async fn list_expenditures(&self, project: ProjectId) -> Result<Vec<Expenditure>, ApiError> {
        self.get(&format!("/api/projects/{}/expenditures", project)).await
    }
}
