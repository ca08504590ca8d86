//! # Application State
//!
//! This module defines the shared application state (`AppState`) and the
//! logic for building it at startup. The `AppState` holds all shared
//! resources (the configuration, the storage provider, the instantiated AI
//! providers, the ERP gateway, and the response composer), making them
//! accessible to all request handlers. Configuration is read exactly once,
//! here; business logic never touches the process environment.

use crate::config::AppConfig;
use asknova::{
    erp::ErpGateway,
    providers::{
        ai::{gemini::GeminiProvider, local::LocalAiProvider, AiProvider},
        db::sqlite::SqliteProvider,
    },
    ResponseComposer,
};
use std::{collections::HashMap, sync::Arc, time::Duration};

/// The shared application state, accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration, loaded from `config.yml`.
    pub config: Arc<AppConfig>,
    /// The primary database provider.
    pub sqlite_provider: Arc<SqliteProvider>,
    /// A map of instantiated AI providers, keyed by their name from the
    /// config.
    pub ai_providers: Arc<HashMap<String, Arc<dyn AiProvider>>>,
    /// The gateway for proxied ERP calls.
    pub erp_gateway: ErpGateway,
    /// The query resolution pipeline.
    pub composer: Arc<ResponseComposer>,
}

/// Builds the shared application state from the configuration.
///
/// This instantiates an AI provider client for each entry in the `providers`
/// section, sets up the SQLite connection, ensures the schema exists, and
/// wires the response composer. An unusable provider definition (e.g., a
/// Gemini entry with no API key) fails startup here.
pub async fn build_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let ai_timeout = Duration::from_secs(config.ai_timeout_secs);

    let mut ai_providers: HashMap<String, Arc<dyn AiProvider>> = HashMap::new();
    for (name, provider_config) in &config.providers {
        let provider: Arc<dyn AiProvider> = match provider_config.provider.as_str() {
            "gemini" => {
                let api_key = provider_config.api_key.clone().ok_or_else(|| {
                    anyhow::anyhow!("api_key is required for gemini provider '{name}'")
                })?;
                // If api_url is not provided in config, construct it from the model name.
                let api_url = provider_config.api_url.clone().unwrap_or_else(|| {
                    format!(
                        "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
                        provider_config.model_name
                    )
                });
                Arc::new(GeminiProvider::new(api_url, api_key, ai_timeout)?)
            }
            "local" => {
                let api_url = provider_config.api_url.clone().ok_or_else(|| {
                    anyhow::anyhow!("api_url is required for local provider '{name}'")
                })?;
                Arc::new(LocalAiProvider::new(
                    api_url,
                    provider_config.api_key.clone(),
                    Some(provider_config.model_name.clone()),
                    ai_timeout,
                )?)
            }
            _ => {
                return Err(anyhow::anyhow!(
                    "Unsupported AI provider type '{}' for provider '{}'",
                    provider_config.provider,
                    name
                ));
            }
        };
        ai_providers.insert(name.clone(), provider);
    }

    let chat_provider = ai_providers
        .get(&config.chat_provider)
        .cloned()
        .ok_or_else(|| {
            anyhow::anyhow!(
                "chat_provider '{}' does not name a configured provider",
                config.chat_provider
            )
        })?;

    let erp_gateway = ErpGateway::new(
        config.erp.base_url.clone(),
        config.erp.api_key.clone(),
        config.erp.auth_token.clone(),
        Duration::from_secs(config.erp.timeout_secs),
    )?;

    let sqlite_provider = SqliteProvider::new(&config.db_url).await?;
    tracing::info!(db_path = %config.db_url, "Initialized local storage provider (SQLite).");
    // Ensure the database schema is up-to-date on startup.
    sqlite_provider.initialize_schema().await?;

    let composer = ResponseComposer::new(chat_provider, erp_gateway.clone());

    Ok(AppState {
        config: Arc::new(config),
        sqlite_provider: Arc::new(sqlite_provider),
        ai_providers: Arc::new(ai_providers),
        erp_gateway,
        composer: Arc::new(composer),
    })
}
