//! # ERP Gateway Tests
//!
//! Exercises the proxied-call mechanics against an `httpmock` upstream:
//! header propagation, GET query-string vs body parameter passing, response
//! remapping, and the fail-closed permission path.

use anyhow::Result;
use asknova::{
    erp::{ErpGateway, ErpIntegration, ErpParameter},
    ChatError,
};
use httpmock::{Method, MockServer};
use serde_json::{json, Map, Value};
use std::time::Duration;

fn integration(method: &str, mapping: Map<String, Value>) -> ErpIntegration {
    ErpIntegration {
        id: "i1".to_string(),
        module: "sales".to_string(),
        name: "Sales data".to_string(),
        description: None,
        endpoint: "/api/sales".to_string(),
        method: method.to_string(),
        parameters: vec![ErpParameter {
            name: "status".to_string(),
            param_type: "string".to_string(),
            required: false,
        }],
        response_mapping: mapping,
        access_roles: vec!["all".to_string()],
        is_active: true,
    }
}

fn gateway(server: &MockServer) -> ErpGateway {
    ErpGateway::new(
        server.url(""),
        Some("key-123".to_string()),
        Some("token-456".to_string()),
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn get_requests_pass_parameters_as_query_string() -> Result<()> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(Method::GET)
            .path("/api/sales")
            .query_param("status", "pending")
            .header("X-API-KEY", "key-123")
            .header("Authorization", "Bearer token-456");
        then.status(200).json_body(json!({ "orders": [1, 2, 3] }));
    });

    let mut params = Map::new();
    params.insert("status".to_string(), json!("pending"));

    let data = gateway(&server)
        .execute(&integration("GET", Map::new()), &params, "employee")
        .await?;

    mock.assert();
    assert_eq!(data["orders"], json!([1, 2, 3]));
    Ok(())
}

#[tokio::test]
async fn non_get_requests_pass_parameters_as_body() -> Result<()> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(Method::POST)
            .path("/api/sales")
            .json_body(json!({ "status": "open" }));
        then.status(200).json_body(json!({ "created": true }));
    });

    let mut params = Map::new();
    params.insert("status".to_string(), json!("open"));

    let data = gateway(&server)
        .execute(&integration("POST", Map::new()), &params, "employee")
        .await?;

    mock.assert();
    assert_eq!(data["created"], json!(true));
    Ok(())
}

#[tokio::test]
async fn response_mapping_is_applied() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(Method::GET).path("/api/sales");
        then.status(200).json_body(json!({
            "data": { "summary": { "count": 7 } },
            "noise": "ignored"
        }));
    });

    let mut mapping = Map::new();
    mapping.insert("count".to_string(), json!("data.summary.count"));
    mapping.insert("absent".to_string(), json!("data.nothing.here"));

    let data = gateway(&server)
        .execute(&integration("GET", mapping), &Map::new(), "employee")
        .await?;

    let object = data.as_object().unwrap();
    assert_eq!(object.len(), 2);
    assert_eq!(object["count"], json!(7));
    assert_eq!(object["absent"], json!("undefined"));
    assert!(object.get("noise").is_none());
    Ok(())
}

#[tokio::test]
async fn permission_check_fails_closed_before_any_call() -> Result<()> {
    let server = MockServer::start();
    // No mock registered: a hit on the upstream would fail loudly.
    let mut restricted = integration("GET", Map::new());
    restricted.access_roles = vec!["manager".to_string(), "admin".to_string()];

    let err = gateway(&server)
        .execute(&restricted, &Map::new(), "guest")
        .await
        .unwrap_err();

    assert!(matches!(err, ChatError::Permission(_)));
    Ok(())
}

#[tokio::test]
async fn upstream_errors_become_structured_failures() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(Method::GET).path("/api/sales");
        then.status(503).body("maintenance window");
    });

    let err = gateway(&server)
        .execute(&integration("GET", Map::new()), &Map::new(), "employee")
        .await
        .unwrap_err();

    match err {
        ChatError::Upstream(detail) => assert!(detail.contains("503")),
        other => panic!("expected upstream error, got: {other:?}"),
    }
    Ok(())
}
