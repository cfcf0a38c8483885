//! HTTP surface tests that run without a reachable sandbox database.
//!
//! The pool connects lazily, so everything short of an *admitted* statement
//! can be exercised end to end: admission rejections, the assignment
//! catalog, attempt bookkeeping, and request validation. Statements that
//! pass admission against an unreachable database still come back as a
//! failure envelope rather than an HTTP error.

#![allow(missing_docs)]

use std::io::Write;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sqlpen::config::Config;
use sqlpen::server;
use tower::ServiceExt;

const SEED: &str = r#"
[[assignment]]
id = "select-basics"
title = "Select All Employees"
description = "Learn the basics of the SELECT statement"
difficulty = "Easy"
question = "Retrieve all employee records."
tags = ["beginner"]

[[assignment]]
id = "group-by"
title = "Count Employees by Department"
description = "Learn aggregate functions and GROUP BY"
difficulty = "Medium"
question = "Count the number of employees in each department."
"#;

fn test_config() -> Config {
    let mut config = Config::default();
    // Keep acquisition failures fast; no database is reachable in this suite.
    config.database_url = "postgres://127.0.0.1:1/unreachable".to_string();
    config.pool_acquire_timeout_ms = 200;
    config.attempt_log_capacity = 16;
    config
}

fn app_without_assignments() -> Router {
    let config = test_config();
    let pool = server::build_pool(&config).expect("pool options should parse");
    server::build_app(&config, pool).expect("router should build")
}

fn app_with_assignments() -> (Router, tempfile::NamedTempFile) {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(SEED.as_bytes()).expect("write seed");

    let mut config = test_config();
    config.assignments_path = Some(file.path().to_path_buf());
    let pool = server::build_pool(&config).expect("pool options should parse");
    let app = server::build_app(&config, pool).expect("router should build");
    (app, file)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("request should not error");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should collect");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app_without_assignments();
    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
    assert!(body["timestamp"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
async fn rejected_statement_never_touches_the_database() {
    let app = app_without_assignments();
    let (status, body) = send(
        &app,
        post_json("/api/query/execute", json!({ "query": "DROP TABLE employees" })),
    )
    .await;

    // Envelope failures are still HTTP 200; the envelope carries the verdict.
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(false));
    assert_eq!(
        body["error"],
        json!("query contains forbidden keyword: DROP")
    );
    assert!(body["executionTime"].is_u64());
}

#[tokio::test]
async fn admitted_statement_against_unreachable_database_fails_in_envelope() {
    let app = app_without_assignments();
    let (status, body) = send(
        &app,
        post_json("/api/query/execute", json!({ "query": "SELECT 1" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
}

#[tokio::test]
async fn blank_query_is_a_bad_request() {
    let app = app_without_assignments();
    let (status, body) = send(
        &app,
        post_json("/api/query/execute", json!({ "query": "   " })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "success": false, "error": "SQL query is required" })
    );
}

#[tokio::test]
async fn missing_query_field_is_a_client_error() {
    let app = app_without_assignments();
    let (status, _) = send(&app, post_json("/api/query/execute", json!({}))).await;
    assert!(status.is_client_error(), "got {status}");
}

#[tokio::test]
async fn assignments_list_and_detail() {
    let (app, _seed) = app_with_assignments();

    let (status, body) = send(&app, get("/api/assignments")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["count"], json!(2));
    assert_eq!(body["assignments"][0]["id"], json!("select-basics"));
    // Summaries omit the full question text.
    assert!(body["assignments"][0].get("question").is_none());

    let (status, body) = send(&app, get("/api/assignments/group-by")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["assignment"]["difficulty"], json!("Medium"));
    assert!(body["assignment"]["question"].as_str().is_some());
}

#[tokio::test]
async fn unknown_assignment_is_not_found() {
    let (app, _seed) = app_with_assignments();
    let (status, body) = send(&app, get("/api/assignments/nope")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        json!({ "success": false, "error": "assignment not found" })
    );
}

#[tokio::test]
async fn empty_catalog_lists_nothing() {
    let app = app_without_assignments();
    let (status, body) = send(&app, get("/api/assignments")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(0));
}

#[tokio::test]
async fn attempts_are_recorded_per_assignment() {
    let (app, _seed) = app_with_assignments();

    let (_, body) = send(
        &app,
        post_json(
            "/api/query/execute",
            json!({ "query": "DELETE FROM employees", "assignmentId": "select-basics" }),
        ),
    )
    .await;
    assert_eq!(body["success"], json!(false));

    let (status, body) = send(&app, get("/api/attempts?assignmentId=select-basics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(1));
    let attempt = &body["attempts"][0];
    assert_eq!(attempt["isSuccessful"], json!(false));
    assert_eq!(attempt["sqlQuery"], json!("DELETE FROM employees"));
    assert_eq!(
        attempt["errorMessage"],
        json!("query contains forbidden keyword: DELETE")
    );
    assert!(attempt["createdAt"].as_str().is_some());

    // Other assignments see nothing.
    let (_, body) = send(&app, get("/api/attempts?assignmentId=group-by")).await;
    assert_eq!(body["count"], json!(0));
}

#[tokio::test]
async fn attempts_without_an_assignment_are_not_recorded() {
    let app = app_without_assignments();

    let (_, body) = send(
        &app,
        post_json("/api/query/execute", json!({ "query": "TRUNCATE employees" })),
    )
    .await;
    assert_eq!(body["success"], json!(false));

    let (_, body) = send(&app, get("/api/attempts")).await;
    assert_eq!(body["count"], json!(0));
}
