//! End-to-end chat flow tests against mock collaborators.
//!
//! Exercise the full HTTP surface: connect, then chat, asserting on the
//! JSON the caller actually sees.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use db_converse::db::{MockFactory, QueryResult, Schema, Table, Value as DbValue};
use db_converse::llm::MockLlmClient;
use db_converse::server::{router, AppState};

fn sample_schema() -> Schema {
    Schema {
        tables: vec![
            Table::new("orders")
                .with_column("id", "int")
                .with_column("user_id", "int"),
            Table::new("users")
                .with_column("id", "int")
                .with_column("name", "varchar(255)"),
        ],
    }
}

fn app_with(llm: MockLlmClient, factory: Arc<MockFactory>) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(
        Some(Arc::new(llm)),
        factory,
        vec![
            "gemini-2.0-flash".to_string(),
            "gemini-flash-latest".to_string(),
        ],
    ));
    (router(Arc::clone(&state)), state)
}

async fn post_json(app: &axum::Router, uri: &str, body: String) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Binds a listener so the connectivity probe passes, and returns its port.
async fn open_port() -> (tokio::net::TcpListener, u16) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

fn connect_body(host: &str, port: u16) -> String {
    format!(
        r#"{{"host":"{host}","port":{port},"user":"root","password":"","database":"shop"}}"#
    )
}

#[tokio::test]
async fn test_connect_then_chat_sql_flow() {
    let llm = MockLlmClient::new()
        .with_response("how many users", "```sql\nSELECT COUNT(*) FROM users\n```")
        .with_response("the database returned this data", "There are 2 users.");
    let factory = Arc::new(MockFactory::working(
        sample_schema(),
        QueryResult::with_data(vec!["count".to_string()], vec![vec![DbValue::Int(2)]]),
    ));
    let (app, _state) = app_with(llm, Arc::clone(&factory));

    let (_listener, port) = open_port().await;
    let (status, json) = post_json(&app, "/api/connect", connect_body("localhost", port)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);

    let (status, json) = post_json(
        &app,
        "/api/chat",
        r#"{"query":"how many users are there?"}"#.to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["is_sql_query"], true);
    assert_eq!(json["sql_query"], "SELECT COUNT(*) FROM users");
    assert_eq!(json["response"], "There are 2 users.");

    let steps: Vec<String> = json["thought_process"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s.as_str().unwrap().to_string())
        .collect();
    assert_eq!(steps[0], "Analyzing database schema...");
    assert!(steps.contains(&"Executing query against database...".to_string()));
    assert!(steps.contains(&"Retrieved 1 rows of data.".to_string()));

    assert_eq!(factory.executed_sql(), ["SELECT COUNT(*) FROM users"]);
}

#[tokio::test]
async fn test_chat_plain_text_answer() {
    let llm = MockLlmClient::new().with_response(
        "what tables exist",
        "The database has users and orders tables.",
    );
    let factory = Arc::new(MockFactory::working(sample_schema(), QueryResult::new()));
    let (app, _state) = app_with(llm, Arc::clone(&factory));

    let (_listener, port) = open_port().await;
    post_json(&app, "/api/connect", connect_body("127.0.0.1", port)).await;

    let (status, json) = post_json(
        &app,
        "/api/chat",
        r#"{"query":"what tables exist?"}"#.to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["is_sql_query"], false);
    assert_eq!(json["response"], "The database has users and orders tables.");
    assert!(json.get("sql_query").is_none());
    // Only the connect opened a database client; the chat turn did not.
    assert_eq!(factory.opened_profiles().len(), 1);
}

#[tokio::test]
async fn test_chat_sql_error_is_conversational() {
    let llm = MockLlmClient::new()
        .with_response("archive", "```sql\nSELECT * FROM archive\n```");
    let factory = Arc::new(MockFactory::failing_queries(
        "ERROR 1146: Table 'shop.archive' doesn't exist",
    ));
    let (app, _state) = app_with(llm, Arc::clone(&factory));

    let (_listener, port) = open_port().await;
    post_json(&app, "/api/connect", connect_body("127.0.0.1", port)).await;

    let (status, json) = post_json(
        &app,
        "/api/chat",
        r#"{"query":"show the archive"}"#.to_string(),
    )
    .await;

    // A failed query is still a successful conversational turn.
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["is_sql_query"], true);
    assert!(json["response"]
        .as_str()
        .unwrap()
        .contains("doesn't exist"));
    assert_eq!(json["sql_query"], "SELECT * FROM archive");
}

#[tokio::test]
async fn test_chat_rate_limit_falls_back_to_second_model() {
    let llm = MockLlmClient::new()
        .with_rate_limited_model("gemini-2.0-flash")
        .with_response("how many users", "```sql\nSELECT COUNT(*) FROM users\n```")
        .with_response("the database returned this data", "Two.");
    let factory = Arc::new(MockFactory::working(
        sample_schema(),
        QueryResult::with_data(vec!["count".to_string()], vec![vec![DbValue::Int(2)]]),
    ));
    let (app, _state) = app_with(llm, factory);

    let (_listener, port) = open_port().await;
    post_json(&app, "/api/connect", connect_body("127.0.0.1", port)).await;

    let (status, json) = post_json(
        &app,
        "/api/chat",
        r#"{"query":"how many users?"}"#.to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);

    let steps: Vec<String> = json["thought_process"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s.as_str().unwrap().to_string())
        .collect();
    let skips: Vec<_> = steps.iter().filter(|s| s.contains("Rate limit hit")).collect();
    assert_eq!(skips.len(), 1);
    assert!(skips[0].contains("gemini-2.0-flash"));
}

#[tokio::test]
async fn test_chat_exhausted_models_is_server_error() {
    let llm = MockLlmClient::new()
        .with_rate_limited_model("gemini-2.0-flash")
        .with_rate_limited_model("gemini-flash-latest");
    let factory = Arc::new(MockFactory::working(sample_schema(), QueryResult::new()));
    let (app, _state) = app_with(llm, factory);

    let (_listener, port) = open_port().await;
    post_json(&app, "/api/connect", connect_body("127.0.0.1", port)).await;

    let (status, json) = post_json(&app, "/api/chat", r#"{"query":"hi"}"#.to_string()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["success"], false);
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("All models exhausted"));
}

#[tokio::test]
async fn test_connect_replaces_previous_session() {
    let llm = MockLlmClient::new();
    let factory = Arc::new(MockFactory::working(sample_schema(), QueryResult::new()));
    let (app, state) = app_with(llm, factory);

    let (_listener, port) = open_port().await;
    post_json(&app, "/api/connect", connect_body("127.0.0.1", port)).await;

    let first = state.session.snapshot().await.unwrap();

    let body = format!(
        r#"{{"host":"127.0.0.1","port":{port},"user":"root","password":"","database":"analytics"}}"#
    );
    post_json(&app, "/api/connect", body).await;

    let second = state.session.snapshot().await.unwrap();
    assert_eq!(first.profile.database, "shop");
    assert_eq!(second.profile.database, "analytics");
}
