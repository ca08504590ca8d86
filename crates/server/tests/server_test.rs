//! # Server Endpoint Tests
//!
//! Integration tests for the basic `asknova-server` endpoints: health
//! checks, input validation, and error-body behavior.

mod common;

use anyhow::Result;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_root_and_health_check_endpoints() -> Result<()> {
    // Arrange
    let app = TestApp::spawn().await?;

    // --- Test Root Endpoint ---
    let root_response = app
        .client
        .get(format!("{}/", app.address))
        .send()
        .await
        .expect("Failed to execute request to /");

    assert!(root_response.status().is_success());
    assert_eq!(
        "asknova server is running.",
        root_response.text().await.unwrap()
    );

    // --- Test Health Check Endpoint ---
    let health_response = app
        .client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request to /health");

    assert!(health_response.status().is_success());
    assert_eq!("OK", health_response.text().await.unwrap());

    Ok(())
}

#[tokio::test]
async fn test_query_handler_malformed_json() -> Result<()> {
    let app = TestApp::spawn().await?;
    // This JSON is syntactically invalid (missing closing brace).
    let malformed_body = r#"{"prompt": "where are my orders""#;

    let response = app
        .client
        .post(format!("{}/chat/query", app.address))
        .header("Content-Type", "application/json")
        .body(malformed_body)
        .send()
        .await
        .expect("Failed to execute request.");

    // Axum's `Json` extractor rejects malformed JSON with a 400.
    assert_eq!(400, response.status().as_u16());
    Ok(())
}

#[tokio::test]
async fn test_query_handler_rejects_empty_prompt() -> Result<()> {
    let app = TestApp::spawn().await?;

    let response = app
        .client
        .post(format!("{}/chat/query", app.address))
        .json(&json!({ "prompt": "   " }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());
    let body: serde_json::Value = response.json().await?;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("non-empty string"));
    Ok(())
}

#[tokio::test]
async fn test_feedback_for_unknown_query_is_404() -> Result<()> {
    let app = TestApp::spawn().await?;

    let response = app
        .client
        .post(format!("{}/chat/feedback", app.address))
        .json(&json!({ "query_id": "does-not-exist", "rating": 4 }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(404, response.status().as_u16());
    Ok(())
}

#[tokio::test]
async fn test_invalid_bearer_token_is_rejected() -> Result<()> {
    let app = TestApp::spawn().await?;

    let response = app
        .client
        .post(format!("{}/chat/query", app.address))
        .bearer_auth("not-a-real-token")
        .json(&json!({ "prompt": "hello" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
    Ok(())
}
