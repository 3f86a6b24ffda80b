use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use pms_tui::api::errors::{ADD_EXPENDITURE_FAILED, UPDATE_STATUS_FAILED};
use pms_tui::api::{ApiClient, ApiError, CredentialProvider, PmsApi, SessionStore, StaticToken};
use pms_tui::config::Config;
use pms_tui::models::{NewExpenditure, NewRiskIssue, RiskIssueItem, RiskIssueStatus};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, token: Option<&str>) -> ApiClient {
    let config = Config {
        api_base_url: format!("{}/", server.uri()),
        ..Config::default()
    };
    ApiClient::new(&config, Arc::new(StaticToken(token.map(str::to_string)))).unwrap()
}

#[tokio::test]
async fn notifications_are_fetched_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/notifications"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": 2,
                "user": {"id": 5, "name": "Ari"},
                "description": "Recorded an expenditure",
                "created_at": "2024-05-01T08:00:00.000000Z"
            },
            {
                "id": 1,
                "user": null,
                "description": "Closed an issue",
                "created_at": "2024-04-30T08:00:00Z"
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let items = client(&server, Some("abc")).list_notifications().await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].author_name(), "Ari");
    assert_eq!(items[1].author_name(), "Unknown");
}

#[tokio::test]
async fn token_is_read_from_session_at_call_time() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/notifications"))
        .and(header("authorization", "Bearer second"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let session = SessionStore::new(dir.path().join("session.json"));
    session.sign_in("first", None).unwrap();

    let config = Config {
        api_base_url: server.uri(),
        ..Config::default()
    };
    let api = ApiClient::new(&config, Arc::new(session.clone())).unwrap();

    // Rotated after the client was built
    session.sign_in("second", None).unwrap();
    assert!(api.list_notifications().await.unwrap().is_empty());
}

/// Remembers which thread asked for the token
struct RecordingProvider(Mutex<Option<ThreadId>>);

impl CredentialProvider for RecordingProvider {
    fn token(&self) -> Option<String> {
        *self.0.lock().unwrap() = Some(thread::current().id());
        Some("abc".to_string())
    }
}

#[tokio::test]
async fn token_lookup_runs_off_the_runtime_thread() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/notifications"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let provider = Arc::new(RecordingProvider(Mutex::new(None)));
    let config = Config {
        api_base_url: server.uri(),
        ..Config::default()
    };
    let api = ApiClient::new(&config, provider.clone()).unwrap();
    api.list_notifications().await.unwrap();

    let lookup_thread = provider.0.lock().unwrap().expect("token was never requested");
    assert_ne!(lookup_thread, thread::current().id());
}

#[tokio::test]
async fn null_descriptions_do_not_break_collections() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects/7/risks-issues"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "type": "issue", "title": "a", "description": "ok",
             "impact_level": "low", "status": "open"},
            {"id": 2, "type": "risk", "title": "b", "description": null,
             "impact_level": "high", "status": "open"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "user": null, "description": null, "created_at": "2024-05-01T08:00:00Z"}
        ])))
        .mount(&server)
        .await;

    let api = client(&server, Some("abc"));
    let items = api.list_risk_issues(7).await.unwrap();
    assert_eq!(items[1].description, "");
    let feed = api.list_notifications().await.unwrap();
    assert_eq!(feed[0].description, "");
}

#[tokio::test]
async fn status_change_puts_the_full_record() {
    let server = MockServer::start().await;
    let original = json!({
        "id": 31,
        "type": "issue",
        "title": "Crane inspection overdue",
        "description": "Certificate expired last week",
        "impact_level": "high",
        "status": "open",
        "project_id": 7,
        "reported_by": 3
    });
    let mut expected = original.clone();
    expected["status"] = json!("closed");

    Mock::given(method("PUT"))
        .and(path("/api/risks-issues/31"))
        .and(body_json(&expected))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Updated"})))
        .expect(1)
        .mount(&server)
        .await;

    let item: RiskIssueItem = serde_json::from_value(original).unwrap();
    client(&server, Some("abc"))
        .update_risk_issue(&item.with_status(RiskIssueStatus::Closed))
        .await
        .unwrap();
}

#[tokio::test]
async fn created_risk_issue_is_returned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/projects/7/risks-issues"))
        .and(body_json(json!({
            "type": "issue",
            "title": "Flooding",
            "description": "",
            "impact_level": "medium"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 40,
            "type": "issue",
            "title": "Flooding",
            "description": "",
            "impact_level": "medium",
            "status": "open",
            "project_id": 7
        })))
        .mount(&server)
        .await;

    let draft = NewRiskIssue {
        title: "Flooding".to_string(),
        ..NewRiskIssue::default()
    };
    let created = client(&server, Some("abc"))
        .create_risk_issue(7, &draft)
        .await
        .unwrap();
    assert_eq!(created.id, 40);
    assert_eq!(created.status, RiskIssueStatus::Open);
}

#[tokio::test]
async fn expenditure_is_posted_as_typed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/projects/12/expenditures"))
        .and(body_json(json!({"amount": "150.50", "description": "Cement"})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let draft = NewExpenditure {
        amount: "150.50".to_string(),
        description: "Cement".to_string(),
    };
    client(&server, Some("abc"))
        .create_expenditure(12, &draft)
        .await
        .unwrap();
}

#[tokio::test]
async fn server_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/projects/7/risks-issues"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"message": "The title field is required."})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/projects/12/expenditures"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"error": "Forbidden"})))
        .mount(&server)
        .await;

    let api = client(&server, Some("abc"));

    let err = api
        .create_risk_issue(7, &NewRiskIssue::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 422, .. }));
    assert_eq!(err.server_message(), Some("The title field is required."));

    let err = api
        .create_expenditure(12, &NewExpenditure::default())
        .await
        .unwrap_err();
    assert_eq!(err.user_message(ADD_EXPENDITURE_FAILED), "Forbidden");
}

#[tokio::test]
async fn missing_token_fails_through_generic_path() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/risks-issues/1"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthenticated"))
        .mount(&server)
        .await;

    let item: RiskIssueItem = serde_json::from_value(json!({
        "id": 1, "type": "risk", "title": "t", "description": "",
        "impact_level": "low", "status": "open"
    }))
    .unwrap();
    let err = client(&server, None)
        .update_risk_issue(&item)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Status { status: 401, message: None }));
    assert_eq!(err.user_message(UPDATE_STATUS_FAILED), UPDATE_STATUS_FAILED);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(
        requests[0].headers.get("authorization").unwrap().to_str().unwrap().trim(),
        "Bearer"
    );
}
