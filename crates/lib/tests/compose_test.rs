//! # Response Composer Tests
//!
//! End-to-end tests of the query resolution pipeline against an in-memory
//! database, a programmable mock AI provider, and an `httpmock` ERP
//! upstream. These cover the four resolution scenarios (FAQ hit, ERP hit,
//! generative fallback, upstream failure) plus the feedback and escalation
//! lifecycle properties.

use anyhow::Result;
use asknova::{
    constants::FALLBACK_ERROR_RESPONSE,
    erp::ErpGateway,
    queries,
    types::{ChatRequest, Department, ResponseSource},
    ChatError, ResponseComposer,
};
use asknova_test_utils::{MockAiProvider, TestSetup};
use core_access::{get_or_create_user, resolve_session, Identity, NewUserDefaults, Session, User};
use httpmock::{Method, MockServer};
use serde_json::json;
use std::{sync::Arc, time::Duration};

struct Harness {
    setup: TestSetup,
    mock_ai: MockAiProvider,
    erp_server: MockServer,
    composer: ResponseComposer,
    user: User,
    session: Session,
}

impl Harness {
    async fn new(role: &str, department: &str) -> Result<Self> {
        let setup = TestSetup::new().await?;
        let mock_ai = MockAiProvider::new();
        let erp_server = MockServer::start();

        let gateway = ErpGateway::new(
            erp_server.url(""),
            Some("test-key".to_string()),
            None,
            Duration::from_secs(5),
        )?;
        let composer = ResponseComposer::new(Arc::new(mock_ai.clone()), gateway);

        let identity = Identity::Authenticated("tester@example.com".to_string());
        let defaults = NewUserDefaults {
            department: Some(department.to_string()),
            role: Some(role.to_string()),
            ..Default::default()
        };
        let user = get_or_create_user(&setup.db, &identity, &defaults).await?;
        let session = resolve_session(&setup.db, &user, "web", None).await?;

        Ok(Self {
            setup,
            mock_ai,
            erp_server,
            composer,
            user,
            session,
        })
    }

    fn request(&self, prompt: &str) -> ChatRequest {
        ChatRequest {
            prompt: prompt.to_string(),
            department: None,
            platform: None,
            parameters: None,
        }
    }
}

#[tokio::test]
async fn faq_hit_short_circuits_resolution() -> Result<()> {
    let harness = Harness::new("employee", "gst").await?;
    let answer = "Go to Sales > Invoices, pick the customer, and click Generate.";
    let faq_id = harness
        .setup
        .seed_faq("How do I generate a GST invoice?", answer, "gst")
        .await?;

    let reply = harness
        .composer
        .respond(
            &harness.setup.db,
            &harness.user,
            &harness.session,
            &harness.request("How do I generate a GST invoice?"),
        )
        .await?;

    assert_eq!(reply.source, ResponseSource::Faq);
    assert_eq!(reply.response, answer);

    // The persisted row is terminal and carries the same answer.
    let record = queries::get_query(&harness.setup.db, &reply.query_id).await?;
    assert_eq!(record.response_source, ResponseSource::Faq);
    assert_eq!(record.response, answer);
    assert!(record.processing_ms.is_some());
    assert!(record.responded_at.is_some());

    // The generative provider was never consulted.
    assert!(harness.mock_ai.get_calls().is_empty());

    // The matched FAQ's popularity counter was bumped.
    let faq = asknova::faq::get_faq(&harness.setup.db, &faq_id).await?;
    assert_eq!(faq.popularity, 1);
    Ok(())
}

#[tokio::test]
async fn erp_hit_for_classified_intent() -> Result<()> {
    let harness = Harness::new("employee", "inventory").await?;
    harness
        .setup
        .seed_integration(
            "inventory",
            "/api/inventory",
            "GET",
            r#"[{"name": "location", "type": "string", "required": false}]"#,
            r#"{"total": "data.total"}"#,
            r#"["all"]"#,
        )
        .await?;

    let mock = harness.erp_server.mock(|when, then| {
        when.method(Method::GET)
            .path("/api/inventory")
            .header("X-API-KEY", "test-key");
        then.status(200).json_body(json!({ "data": { "total": 812 } }));
    });

    let reply = harness
        .composer
        .respond(
            &harness.setup.db,
            &harness.user,
            &harness.session,
            &harness.request("show me current stock levels"),
        )
        .await?;

    mock.assert();
    assert_eq!(reply.source, ResponseSource::Erp);
    assert!(reply.response.contains("812"));
    assert!(harness.mock_ai.get_calls().is_empty());

    let record = queries::get_query(&harness.setup.db, &reply.query_id).await?;
    assert_eq!(record.response_source, ResponseSource::Erp);
    Ok(())
}

#[tokio::test]
async fn generative_fallback_called_exactly_once() -> Result<()> {
    let harness = Harness::new("employee", "general").await?;
    harness
        .mock_ai
        .add_response("AskNova", "Onboarding starts from the HR portal.");

    let reply = harness
        .composer
        .respond(
            &harness.setup.db,
            &harness.user,
            &harness.session,
            &harness.request("where does new joiner onboarding happen"),
        )
        .await?;

    assert_eq!(reply.source, ResponseSource::Ai);
    assert_eq!(reply.response, "Onboarding starts from the HR portal.");
    assert_eq!(harness.mock_ai.get_calls().len(), 1);
    Ok(())
}

#[tokio::test]
async fn erp_failure_finalizes_as_error() -> Result<()> {
    let harness = Harness::new("employee", "inventory").await?;
    harness
        .setup
        .seed_integration("inventory", "/api/inventory", "GET", "[]", "{}", r#"["all"]"#)
        .await?;

    // The upstream breaks; timeouts take the identical path.
    harness.erp_server.mock(|when, then| {
        when.method(Method::GET).path("/api/inventory");
        then.status(500).body("upstream exploded with secrets");
    });

    let reply = harness
        .composer
        .respond(
            &harness.setup.db,
            &harness.user,
            &harness.session,
            &harness.request("show me current stock levels"),
        )
        .await?;

    // The user sees the generic fallback, never the upstream detail.
    assert_eq!(reply.source, ResponseSource::Error);
    assert_eq!(reply.response, FALLBACK_ERROR_RESPONSE);
    assert!(!reply.response.contains("secrets"));

    let record = queries::get_query(&harness.setup.db, &reply.query_id).await?;
    assert_eq!(record.response_source, ResponseSource::Error);

    // With an existing-but-broken integration, the AI is not consulted.
    assert!(harness.mock_ai.get_calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn generative_failure_finalizes_as_error() -> Result<()> {
    let harness = Harness::new("employee", "general").await?;
    harness.mock_ai.fail_with("model unavailable");

    let reply = harness
        .composer
        .respond(
            &harness.setup.db,
            &harness.user,
            &harness.session,
            &harness.request("tell me something unresolvable"),
        )
        .await?;

    assert_eq!(reply.source, ResponseSource::Error);
    assert_eq!(reply.response, FALLBACK_ERROR_RESPONSE);
    Ok(())
}

#[tokio::test]
async fn missing_required_erp_parameters_propagate_validation() -> Result<()> {
    let harness = Harness::new("employee", "inventory").await?;
    harness
        .setup
        .seed_integration(
            "inventory",
            "/api/inventory",
            "GET",
            r#"[{"name": "warehouseId", "type": "string", "required": true}]"#,
            "{}",
            r#"["all"]"#,
        )
        .await?;

    let err = harness
        .composer
        .respond(
            &harness.setup.db,
            &harness.user,
            &harness.session,
            &harness.request("show me current stock levels"),
        )
        .await
        .unwrap_err();

    match err {
        ChatError::Validation(message) => assert!(message.contains("warehouseId")),
        other => panic!("expected validation error, got: {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn empty_prompt_fails_before_any_persistence() -> Result<()> {
    let harness = Harness::new("employee", "general").await?;

    let err = harness
        .composer
        .respond(
            &harness.setup.db,
            &harness.user,
            &harness.session,
            &harness.request("   "),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Validation(_)));

    let (records, total) = queries::history(&harness.setup.db, &harness.user.id, 10, 0).await?;
    assert!(records.is_empty());
    assert_eq!(total, 0);
    Ok(())
}

#[tokio::test]
async fn duplicate_feedback_creates_rows_without_touching_query() -> Result<()> {
    let harness = Harness::new("employee", "general").await?;
    harness.mock_ai.add_response("AskNova", "Answer one.");

    let reply = harness
        .composer
        .respond(
            &harness.setup.db,
            &harness.user,
            &harness.session,
            &harness.request("anything at all really"),
        )
        .await?;

    let f1 = queries::attach_feedback(&harness.setup.db, &reply.query_id, 5, Some("great")).await?;
    let f2 = queries::attach_feedback(&harness.setup.db, &reply.query_id, 5, Some("great")).await?;
    assert_ne!(f1.id, f2.id);
    assert_eq!(f1.sentiment, "positive");

    let record = queries::get_query(&harness.setup.db, &reply.query_id).await?;
    assert_eq!(record.response, "Answer one.");
    assert_eq!(record.response_source, ResponseSource::Ai);

    // Rating bounds are enforced and low ratings derive negative sentiment.
    let err = queries::attach_feedback(&harness.setup.db, &reply.query_id, 6, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Validation(_)));
    let low = queries::attach_feedback(&harness.setup.db, &reply.query_id, 1, None).await?;
    assert_eq!(low.sentiment, "negative");
    Ok(())
}

#[tokio::test]
async fn escalation_is_a_one_way_transition() -> Result<()> {
    let harness = Harness::new("employee", "general").await?;
    harness.mock_ai.add_response("AskNova", "Resolved answer.");

    let reply = harness
        .composer
        .respond(
            &harness.setup.db,
            &harness.user,
            &harness.session,
            &harness.request("please answer this question"),
        )
        .await?;

    let ticket1 = queries::escalate(&harness.setup.db, &reply.query_id).await?;
    let ticket2 = queries::escalate(&harness.setup.db, &reply.query_id).await?;
    assert_eq!(ticket1, ticket2, "repeat escalation must not mint a new ticket");
    assert!(ticket1.starts_with("TKT-"));

    let record = queries::get_query(&harness.setup.db, &reply.query_id).await?;
    assert!(record.escalated);
    assert_eq!(record.ticket_id.as_deref(), Some(ticket1.as_str()));
    Ok(())
}

#[tokio::test]
async fn department_snapshot_prefers_request_over_profile() -> Result<()> {
    let harness = Harness::new("employee", "sales").await?;
    harness.mock_ai.add_response("AskNova", "ok");

    let mut request = harness.request("a question with no meaningful overlap");
    request.department = Some(Department::Finance);
    let reply = harness
        .composer
        .respond(&harness.setup.db, &harness.user, &harness.session, &request)
        .await?;

    let record = queries::get_query(&harness.setup.db, &reply.query_id).await?;
    assert_eq!(record.department, Department::Finance);
    assert_eq!(record.user_role, "employee");
    Ok(())
}
