//! # Response Composer
//!
//! The orchestration state machine of the pipeline:
//! `received -> intent-classified -> {faq-hit | erp-hit | ai-fallback} ->
//! formatted -> persisted`. The composer always creates the query record in
//! the `pending` state before attempting any resolution step, so a crash
//! mid-pipeline still leaves an auditable row, and it finalizes the record
//! with the response, source tag, and measured latency on every path.

use crate::{
    constants::{FALLBACK_ERROR_RESPONSE, FAQ_DIRECT_THRESHOLD, HISTORY_CONTEXT_TURNS},
    erp::{find_integration, ErpGateway},
    errors::ChatError,
    faq::{active_faqs, increment_popularity, match_faq},
    intent::{classify, Intent},
    platform::{format_for_channel, Channel},
    prompts::build_system_prompt,
    queries,
    types::{ChatRequest, ComposedReply, Department, ResponseSource},
};
use core_access::{Session, User};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use turso::Database;

use crate::providers::ai::AiProvider;

/// Orchestrates FAQ, ERP, and generative resolution for one request at a
/// time. Cheap to clone; holds only shared handles.
#[derive(Clone)]
pub struct ResponseComposer {
    ai_provider: Arc<dyn AiProvider>,
    erp_gateway: ErpGateway,
}

/// The internal outcome of the resolution step, before formatting.
struct Resolution {
    response: String,
    source: ResponseSource,
    context: Option<String>,
}

impl ResponseComposer {
    pub fn new(ai_provider: Arc<dyn AiProvider>, erp_gateway: ErpGateway) -> Self {
        Self {
            ai_provider,
            erp_gateway,
        }
    }

    /// Resolves one user question end-to-end and returns the composed reply.
    ///
    /// Priority order is fixed: an FAQ match at or above the direct
    /// threshold wins outright; otherwise the ERP gateway is attempted for a
    /// non-general intent; otherwise the generative completion answers with
    /// an enriched context prompt. Validation and permission failures
    /// propagate with their specific messages; upstream failures finalize
    /// the query as `error` with the user-safe fallback.
    pub async fn respond(
        &self,
        db: &Database,
        user: &User,
        session: &Session,
        request: &ChatRequest,
    ) -> Result<ComposedReply, ChatError> {
        let prompt = request.prompt.trim();
        if prompt.is_empty() {
            return Err(ChatError::Validation(
                "Prompt must be a non-empty string".to_string(),
            ));
        }

        let department = request
            .department
            .unwrap_or_else(|| Department::parse(&user.department));
        let channel = Channel::from_platform(
            request.platform.as_deref().unwrap_or(&session.platform),
        );
        let started = Instant::now();

        let query_id =
            queries::insert_pending(db, &user.id, &session.id, prompt, department, &user.role)
                .await?;

        let intent = classify(prompt);
        info!(%query_id, intent = intent.as_str(), department = department.as_str(), "Resolving query");

        let resolution = match self
            .resolve(db, user, prompt, department, intent, request)
            .await
        {
            Ok(resolution) => resolution,
            Err(err) => {
                // Finalize the audit row before surfacing the specific
                // error; the caller still gets an actionable 4xx.
                let elapsed = started.elapsed().as_millis() as i64;
                queries::finalize(
                    db,
                    &query_id,
                    &err.to_string(),
                    ResponseSource::Error,
                    intent,
                    elapsed,
                    None,
                )
                .await?;
                return Err(err);
            }
        };

        let elapsed = started.elapsed().as_millis() as i64;
        queries::finalize(
            db,
            &query_id,
            &resolution.response,
            resolution.source,
            intent,
            elapsed,
            resolution.context.as_deref(),
        )
        .await?;

        let formatted = format_for_channel(channel, &resolution.response);
        Ok(ComposedReply {
            query_id,
            response: resolution.response,
            source: resolution.source,
            intent,
            formatted,
        })
    }

    /// The resolution step proper: FAQ, then ERP, then generative fallback.
    ///
    /// Returns `Err` only for caller-correctable failures (validation,
    /// permission); upstream breakage is absorbed into an `error`-sourced
    /// resolution so the pipeline always finalizes.
    async fn resolve(
        &self,
        db: &Database,
        user: &User,
        prompt: &str,
        department: Department,
        intent: Intent,
        request: &ChatRequest,
    ) -> Result<Resolution, ChatError> {
        // 1. FAQ short-circuit.
        let candidates = active_faqs(db).await?;
        if let Some(matched) = match_faq(&candidates, prompt, department) {
            if matched.confidence >= FAQ_DIRECT_THRESHOLD {
                info!(faq_id = %matched.entry.id, confidence = matched.confidence, "FAQ hit");
                increment_popularity(db, &matched.entry.id).await?;
                return Ok(Resolution {
                    response: matched.entry.answer,
                    source: ResponseSource::Faq,
                    context: Some(
                        json!({
                            "faq_id": matched.entry.id,
                            "confidence": matched.confidence,
                        })
                        .to_string(),
                    ),
                });
            }
        }

        // 2. ERP gateway, only for a classified (non-general) intent. A
        //    missing integration falls through to the generative path; a
        //    failing call on an existing integration finalizes as error.
        if intent != Intent::General {
            if let Some(integration) = find_integration(db, intent.as_str()).await? {
                let empty = Map::new();
                let parameters = request.parameters.as_ref().unwrap_or(&empty);
                match self
                    .erp_gateway
                    .execute(&integration, parameters, &user.role)
                    .await
                {
                    Ok(data) => {
                        return Ok(Resolution {
                            response: render_erp_data(&data)?,
                            source: ResponseSource::Erp,
                            context: Some(
                                json!({
                                    "integration_id": integration.id,
                                    "module": integration.module,
                                })
                                .to_string(),
                            ),
                        });
                    }
                    Err(ChatError::Upstream(detail)) => {
                        warn!(module = %integration.module, %detail, "ERP path failed; finalizing as error");
                        return Ok(Resolution {
                            response: FALLBACK_ERROR_RESPONSE.to_string(),
                            source: ResponseSource::Error,
                            context: None,
                        });
                    }
                    Err(other) => return Err(other),
                }
            }
        }

        // 3. Generative fallback with enriched context.
        let turns = queries::recent_turns(db, &user.id, HISTORY_CONTEXT_TURNS).await?;
        let integrations = crate::erp::list_integrations(db, Some(&user.role)).await?;
        let system_prompt = build_system_prompt(
            user.name.as_deref(),
            department,
            &user.role,
            &turns,
            &integrations,
        );

        match self.ai_provider.generate(&system_prompt, prompt).await {
            Ok(text) => Ok(Resolution {
                response: text,
                source: ResponseSource::Ai,
                context: None,
            }),
            Err(err) => {
                error!(error = %err, "Generative completion failed after FAQ and ERP were exhausted");
                Ok(Resolution {
                    response: FALLBACK_ERROR_RESPONSE.to_string(),
                    source: ResponseSource::Error,
                    context: None,
                })
            }
        }
    }
}

/// Renders the reshaped ERP payload as response text.
fn render_erp_data(data: &Value) -> Result<String, ChatError> {
    match data {
        Value::String(s) => Ok(s.clone()),
        other => Ok(serde_json::to_string_pretty(other)?),
    }
}
