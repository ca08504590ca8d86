//! # Admin Surface Tests
//!
//! FAQ management, ERP integration registration/execution, and the
//! analytics endpoint, including the role guards in front of them.

mod common;

use anyhow::Result;
use common::TestApp;
use httpmock::Method;
use serde_json::{json, Value};

#[tokio::test]
async fn faq_admin_crud_requires_admin_role() -> Result<()> {
    let app = TestApp::spawn().await?;
    let admin_token = {
        app.make_admin("admin@example.com").await?;
        app.auth_token("admin@example.com")
    };
    let employee_token = app.auth_token("employee@example.com");

    let faq_body = json!({
        "question": "How do I approve a pending purchase order?",
        "answer": "Go to Purchase > Pending Approvals and click Approve.",
        "department": "purchase",
        "keywords": ["purchase", "approval"]
    });

    // A non-admin caller is rejected.
    let response = app
        .client
        .post(format!("{}/faq", app.address))
        .bearer_auth(&employee_token)
        .json(&faq_body)
        .send()
        .await?;
    assert_eq!(response.status().as_u16(), 403);

    // The admin can create.
    let response = app
        .client
        .post(format!("{}/faq", app.address))
        .bearer_auth(&admin_token)
        .json(&faq_body)
        .send()
        .await?;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await?;
    let faq_id = body["result"]["id"].as_str().unwrap().to_string();

    // Everyone can list; the new entry is visible.
    let response = app
        .client
        .get(format!("{}/faq?department=purchase", app.address))
        .send()
        .await?;
    let body: Value = response.json().await?;
    assert_eq!(body["result"].as_array().unwrap().len(), 1);

    // Update flips the answer.
    let response = app
        .client
        .put(format!("{}/faq/{faq_id}", app.address))
        .bearer_auth(&admin_token)
        .json(&json!({ "answer": "Use the mobile approvals screen instead." }))
        .send()
        .await?;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await?;
    assert_eq!(
        body["result"]["answer"],
        json!("Use the mobile approvals screen instead.")
    );

    // Delete soft-deactivates: the entry disappears from the listing.
    let response = app
        .client
        .delete(format!("{}/faq/{faq_id}", app.address))
        .bearer_auth(&admin_token)
        .send()
        .await?;
    assert_eq!(response.status().as_u16(), 200);

    let response = app
        .client
        .get(format!("{}/faq?department=purchase", app.address))
        .send()
        .await?;
    let body: Value = response.json().await?;
    assert!(body["result"].as_array().unwrap().is_empty());

    // Updating an unknown id is a 404.
    let response = app
        .client
        .put(format!("{}/faq/nope", app.address))
        .bearer_auth(&admin_token)
        .json(&json!({ "answer": "x" }))
        .send()
        .await?;
    assert_eq!(response.status().as_u16(), 404);
    Ok(())
}

#[tokio::test]
async fn integration_registration_visibility_and_execution() -> Result<()> {
    let app = TestApp::spawn().await?;
    app.make_admin("admin@example.com").await?;
    let admin_token = app.auth_token("admin@example.com");
    let employee_token = app.auth_token("worker@example.com");

    // Register a manager-only integration.
    let response = app
        .client
        .post(format!("{}/erp/integrations", app.address))
        .bearer_auth(&admin_token)
        .json(&json!({
            "module": "sales",
            "name": "Sales register",
            "endpoint": "/api/sales",
            "method": "GET",
            "parameters": [
                { "name": "status", "type": "string", "required": true }
            ],
            "response_mapping": { "orders": "data.orders" },
            "access_roles": ["manager", "admin"]
        }))
        .send()
        .await?;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await?;
    let integration_id = body["result"]["id"].as_str().unwrap().to_string();

    // An employee does not see it in the listing.
    let response = app
        .client
        .get(format!("{}/erp/integrations", app.address))
        .bearer_auth(&employee_token)
        .send()
        .await?;
    let body: Value = response.json().await?;
    assert!(body["result"].as_array().unwrap().is_empty());

    // Executing it as an employee fails closed with a 403.
    let response = app
        .client
        .post(format!("{}/erp/execute/{integration_id}", app.address))
        .bearer_auth(&employee_token)
        .json(&json!({ "parameters": { "status": "open" } }))
        .send()
        .await?;
    assert_eq!(response.status().as_u16(), 403);

    // Missing required parameters are reported in batch with a 400.
    let response = app
        .client
        .post(format!("{}/erp/execute/{integration_id}", app.address))
        .bearer_auth(&admin_token)
        .json(&json!({ "parameters": {} }))
        .send()
        .await?;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await?;
    assert!(body["error"].as_str().unwrap().contains("status"));

    // A valid admin execution proxies and reshapes.
    let erp_mock = app.mock_server.mock(|when, then| {
        when.method(Method::GET)
            .path("/api/sales")
            .query_param("status", "open");
        then.status(200)
            .json_body(json!({ "data": { "orders": [101, 102] } }));
    });

    let response = app
        .client
        .post(format!("{}/erp/execute/{integration_id}", app.address))
        .bearer_auth(&admin_token)
        .json(&json!({ "parameters": { "status": "open" } }))
        .send()
        .await?;
    erp_mock.assert();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await?;
    assert_eq!(body["result"]["orders"], json!([101, 102]));
    Ok(())
}

#[tokio::test]
async fn analytics_usage_is_admin_only_and_aggregates() -> Result<()> {
    let app = TestApp::spawn().await?;
    app.make_admin("admin@example.com").await?;
    let admin_token = app.auth_token("admin@example.com");

    // Anonymous callers are rejected.
    let response = app
        .client
        .get(format!("{}/analytics/usage", app.address))
        .send()
        .await?;
    assert_eq!(response.status().as_u16(), 403);

    // Resolve two queries to have something to aggregate.
    app.mock_ai_completion("aggregate me");
    for prompt in ["unmatched words entirely", "more unmatched wording here"] {
        let response = app
            .client
            .post(format!("{}/chat/query", app.address))
            .header("X-Session-Id", "stats-client")
            .json(&json!({ "prompt": prompt }))
            .send()
            .await?;
        assert_eq!(response.status().as_u16(), 200);
    }

    let response = app
        .client
        .get(format!("{}/analytics/usage", app.address))
        .bearer_auth(&admin_token)
        .send()
        .await?;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await?;
    assert_eq!(body["result"]["total_queries"], json!(2));
    let by_source = body["result"]["by_source"].as_array().unwrap();
    assert_eq!(by_source[0]["name"], json!("ai"));
    assert_eq!(by_source[0]["count"], json!(2));
    assert_eq!(body["result"]["escalation_rate"], json!(0.0));
    Ok(())
}
