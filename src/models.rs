use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Identifier of a project on the remote API
pub type ProjectId = u64;

/// Activity entry shown behind the navigation bell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationItem {
    pub id: u64,
    #[serde(default)]
    pub user: Option<UserRef>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl NotificationItem {
    pub fn author_name(&self) -> &str {
        self.user
            .as_ref()
            .and_then(|u| u.name.as_deref())
            .unwrap_or("Unknown")
    }

    pub fn local_timestamp(&self) -> String {
        self.created_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskIssueKind {
    Issue,
    Risk,
}

impl RiskIssueKind {
    pub fn as_str(&self) -> &str {
        match self {
            RiskIssueKind::Issue => "issue",
            RiskIssueKind::Risk => "risk",
        }
    }

    pub const ALL: [RiskIssueKind; 2] = [RiskIssueKind::Issue, RiskIssueKind::Risk];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    Low,
    Medium,
    High,
}

impl ImpactLevel {
    pub fn as_str(&self) -> &str {
        match self {
            ImpactLevel::Low => "low",
            ImpactLevel::Medium => "medium",
            ImpactLevel::High => "high",
        }
    }

    pub const ALL: [ImpactLevel; 3] = [ImpactLevel::Low, ImpactLevel::Medium, ImpactLevel::High];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskIssueStatus {
    Open,
    Closed,
}

impl RiskIssueStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RiskIssueStatus::Open => "open",
            RiskIssueStatus::Closed => "closed",
        }
    }

    /// The status the "Change Status" action moves to
    pub fn toggled(&self) -> Self {
        match self {
            RiskIssueStatus::Open => RiskIssueStatus::Closed,
            RiskIssueStatus::Closed => RiskIssueStatus::Open,
        }
    }
}

/// A project risk or issue as returned by the API.
///
/// Fields the client does not model are kept in `extra` so that a status
/// change can send the record back whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskIssueItem {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: RiskIssueKind,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    pub impact_level: ImpactLevel,
    pub status: RiskIssueStatus,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RiskIssueItem {
    pub fn next_status(&self) -> RiskIssueStatus {
        self.status.toggled()
    }

    /// Full-record replacement with only the status changed
    pub fn with_status(&self, status: RiskIssueStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    /// Owners may change anything; everyone else only issues
    pub fn status_editable_by(&self, is_owner: bool) -> bool {
        is_owner || self.kind == RiskIssueKind::Issue
    }
}

/// Draft body for reporting a risk/issue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRiskIssue {
    #[serde(rename = "type")]
    pub kind: RiskIssueKind,
    pub title: String,
    pub description: String,
    pub impact_level: ImpactLevel,
}

impl Default for NewRiskIssue {
    fn default() -> Self {
        Self {
            kind: RiskIssueKind::Issue,
            title: String::new(),
            description: String::new(),
            impact_level: ImpactLevel::Medium,
        }
    }
}

/// Draft body for recording an expenditure. The amount is sent as typed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewExpenditure {
    pub amount: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Expenditure {
    pub id: u64,
    #[serde(deserialize_with = "amount_as_string")]
    pub amount: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

// Nullable text columns read as empty
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// Decimal columns come back as strings from some backends and numbers from others
fn amount_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected amount as string or number, got {}",
            other
        ))),
    }
}

/// Client-side views, named after the web paths they correspond to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    RiskIssues(ProjectId),
    Expenditures(ProjectId),
    AddExpenditure(ProjectId),
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::RiskIssues(id) => format!("/projects/{}/risks-issues", id),
            Route::Expenditures(id) => format!("/projects/{}/expenditures", id),
            Route::AddExpenditure(id) => format!("/projects/{}/expenditures/new", id),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Route::RiskIssues(_) => "Risks & Issues",
            Route::Expenditures(_) => "Expenditures",
            Route::AddExpenditure(_) => "Record Expenditure",
        }
    }

    pub fn project_id(&self) -> ProjectId {
        match self {
            Route::RiskIssues(id) | Route::Expenditures(id) | Route::AddExpenditure(id) => *id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_risk_issue_keeps_unknown_fields() {
        let raw = json!({
            "id": 4,
            "type": "risk",
            "title": "Supplier delay",
            "description": "Rebar shipment late",
            "impact_level": "high",
            "status": "open",
            "project_id": 7,
            "created_at": "2024-05-01T08:00:00.000000Z"
        });
        let item: RiskIssueItem = serde_json::from_value(raw).unwrap();
        assert_eq!(item.kind, RiskIssueKind::Risk);
        assert_eq!(item.extra.get("project_id"), Some(&json!(7)));

        let body = serde_json::to_value(item.with_status(RiskIssueStatus::Closed)).unwrap();
        assert_eq!(body["status"], "closed");
        assert_eq!(body["project_id"], 7);
        assert_eq!(body["title"], "Supplier delay");
        assert_eq!(body["type"], "risk");
    }

    #[test]
    fn test_status_toggle_and_permissions() {
        let item: RiskIssueItem = serde_json::from_value(json!({
            "id": 1, "type": "risk", "title": "t", "description": "",
            "impact_level": "low", "status": "closed"
        }))
        .unwrap();
        assert_eq!(item.next_status(), RiskIssueStatus::Open);
        assert!(!item.status_editable_by(false));
        assert!(item.status_editable_by(true));
    }

    #[test]
    fn test_notification_author_fallback() {
        let item: NotificationItem = serde_json::from_value(json!({
            "id": 1,
            "user": null,
            "description": "Added expenditure",
            "created_at": "2024-05-01T08:00:00Z"
        }))
        .unwrap();
        assert_eq!(item.author_name(), "Unknown");
    }

    #[test]
    fn test_null_descriptions_decode_as_empty() {
        let items: Vec<RiskIssueItem> = serde_json::from_value(json!([
            {"id": 1, "type": "issue", "title": "a", "description": "ok",
             "impact_level": "low", "status": "open"},
            {"id": 2, "type": "risk", "title": "b", "description": null,
             "impact_level": "high", "status": "closed"}
        ]))
        .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].description, "");
        // null text is not carried into the flattened extras
        assert!(!items[1].extra.contains_key("description"));

        let feed: Vec<NotificationItem> = serde_json::from_value(json!([
            {"id": 1, "user": null, "description": null, "created_at": "2024-05-01T08:00:00Z"}
        ]))
        .unwrap();
        assert_eq!(feed[0].description, "");

        let spent: Vec<Expenditure> = serde_json::from_value(json!([
            {"id": 3, "amount": "10.00", "description": null},
            {"id": 4, "amount": 5}
        ]))
        .unwrap();
        assert_eq!(spent[0].description, "");
        assert_eq!(spent[1].description, "");
    }

    #[test]
    fn test_expenditure_amount_accepts_numbers() {
        let a: Expenditure =
            serde_json::from_value(json!({"id": 1, "amount": 150.5, "description": "Cement"})).unwrap();
        let b: Expenditure =
            serde_json::from_value(json!({"id": 2, "amount": "150.50", "description": "Cement"})).unwrap();
        assert_eq!(a.amount, "150.5");
        assert_eq!(b.amount, "150.50");
    }

    #[test]
    fn test_new_risk_issue_wire_shape() {
        let body = serde_json::to_value(NewRiskIssue::default()).unwrap();
        assert_eq!(
            body,
            json!({"type": "issue", "title": "", "description": "", "impact_level": "medium"})
        );
    }

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::Expenditures(12).path(), "/projects/12/expenditures");
        assert_eq!(Route::RiskIssues(3).project_id(), 3);
    }
}
