//! # Shared Test Utilities
//!
//! Test harness pieces used across the workspace: an isolated in-memory
//! database with the production schema applied, a programmable mock AI
//! provider, and small seeding helpers for FAQ and ERP reference data.

use anyhow::Result;
use asknova::errors::ChatError;
use asknova::providers::ai::AiProvider;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use turso::{params, Database};

// --- Test Setup ---

/// A helper struct to manage database creation for each test.
pub struct TestSetup {
    pub db: Database,
}

impl TestSetup {
    /// Creates a new, isolated in-memory database and initializes the schema.
    pub async fn new() -> Result<Self> {
        let db = turso::Builder::new_local(":memory:").build().await?;
        let conn = db.connect()?;

        for statement in asknova::providers::db::sqlite::sql::ALL_TABLE_CREATION_SQL {
            conn.execute(statement, ()).await?;
        }

        Ok(Self { db })
    }

    /// Seeds one active FAQ entry and returns its id.
    pub async fn seed_faq(
        &self,
        question: &str,
        answer: &str,
        department: &str,
    ) -> Result<String> {
        let id = format!("faq-{}", next_suffix());
        let conn = self.db.connect()?;
        conn.execute(
            "INSERT INTO faqs (id, question, answer, department) VALUES (?, ?, ?, ?)",
            params![
                id.clone(),
                question.to_string(),
                answer.to_string(),
                department.to_string()
            ],
        )
        .await?;
        Ok(id)
    }

    /// Seeds one active ERP integration descriptor and returns its id.
    pub async fn seed_integration(
        &self,
        module: &str,
        endpoint: &str,
        method: &str,
        parameters_json: &str,
        response_mapping_json: &str,
        access_roles_json: &str,
    ) -> Result<String> {
        let id = format!("erp-{}", next_suffix());
        let conn = self.db.connect()?;
        conn.execute(
            "INSERT INTO erp_integrations \
             (id, module, name, endpoint, method, parameters, response_mapping, access_roles) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                id.clone(),
                module.to_string(),
                format!("{module} integration"),
                endpoint.to_string(),
                method.to_string(),
                parameters_json.to_string(),
                response_mapping_json.to_string(),
                access_roles_json.to_string()
            ],
        )
        .await?;
        Ok(id)
    }
}

fn next_suffix() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    format!("{:04}", COUNTER.fetch_add(1, Ordering::Relaxed))
}

// --- Mock AI Provider ---

/// A programmable stand-in for the generative completion API. Responses are
/// keyed by a substring of the system prompt; every call is recorded for
/// assertion.
#[derive(Clone, Debug)]
pub struct MockAiProvider {
    responses: Arc<Mutex<HashMap<String, String>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
    fail_with: Arc<Mutex<Option<String>>>,
}

impl MockAiProvider {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: Arc::new(Mutex::new(None)),
        }
    }

    /// Pre-programs a response for a specific prompt.
    /// The key should be a unique substring of the system prompt.
    pub fn add_response(&self, key: &str, response: &str) {
        let mut responses = self.responses.lock().unwrap();
        responses.insert(key.to_string(), response.to_string());
    }

    /// Makes every subsequent call fail with the given message.
    pub fn fail_with(&self, message: &str) {
        *self.fail_with.lock().unwrap() = Some(message.to_string());
    }

    /// Retrieves the recorded calls for assertion.
    pub fn get_calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockAiProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AiProvider for MockAiProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ChatError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push((system_prompt.to_string(), user_prompt.to_string()));
        drop(calls);

        if let Some(message) = self.fail_with.lock().unwrap().clone() {
            return Err(ChatError::AiApi(message));
        }

        let responses = self.responses.lock().unwrap();
        for (key, response) in responses.iter() {
            if system_prompt.contains(key) {
                return Ok(response.clone());
            }
        }

        Err(ChatError::AiApi(format!(
            "MockAiProvider: No response programmed for system prompt. Got: '{system_prompt}'"
        )))
    }
}
