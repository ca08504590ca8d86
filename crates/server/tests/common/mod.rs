//! # Common Test Utilities
//!
//! Centralizes the integration-test harness for the `asknova-server` suites:
//!
//! - `TestApp`: spawns a real server on a random port with a temporary
//!   SQLite database and an `httpmock::MockServer` standing in for both the
//!   AI completion endpoint and the proxied ERP upstream.
//! - Helpers for minting JWTs and promoting users to admin.

// Allow unused code because this is a test utility module, and not all
// functions are used by every test file that includes it.
#![allow(unused)]

use anyhow::Result;
use asknova_server::{
    auth::middleware::Claims,
    config, router,
    state::{build_app_state, AppState},
};
use axum::serve;
use httpmock::MockServer;
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::Client;
use std::{
    fs::File,
    io::Write,
    net::SocketAddr,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};
use tempfile::{tempdir, NamedTempFile, TempDir};
use tokio::{net::TcpListener, task::JoinHandle};
use turso::params;
use uuid::Uuid;

/// The default secret the auth middleware falls back to when `JWT_SECRET`
/// is not set in the environment.
pub const TEST_JWT_SECRET: &str = "a-secure-secret-key";

/// A harness for end-to-end testing of the Axum server.
pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub mock_server: MockServer,
    pub app_state: AppState,
    _db_file: NamedTempFile,
    _config_dir: TempDir,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestApp {
    /// Spawns the application server and returns a `TestApp` instance.
    ///
    /// The mock server answers `/v1/chat/completions` for the AI provider
    /// and whatever ERP paths a test registers; the ERP base URL points at
    /// the same mock instance.
    pub async fn spawn() -> Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .compact()
            .try_init();

        let mock_server = MockServer::start();
        let db_file = NamedTempFile::new()?;
        let db_path = db_file.path().to_path_buf();

        let config_dir = tempdir()?;
        let config_path = config_dir.path().join("config.yml");
        let config_content = format!(
            r#"
port: 0
db_url: "{}"
chat_provider: "local_default"
ai_timeout_secs: 5
erp:
  base_url: "{}"
  api_key: "test-erp-key"
  timeout_secs: 5
providers:
  local_default:
    provider: "local"
    api_url: "{}"
    api_key: null
    model_name: "mock-chat-model"
"#,
            db_path.to_str().unwrap(),
            mock_server.base_url(),
            mock_server.url("/v1/chat/completions")
        );
        let mut file = File::create(&config_path)?;
        file.write_all(config_content.as_bytes())?;

        let config = config::get_config(Some(config_path.to_str().unwrap()))?;
        let app_state = build_app_state(config).await?;
        let app_state_for_harness = app_state.clone();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let address = format!("http://{addr}");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let server_handle = tokio::spawn(async move {
            let app = router::create_router(app_state);
            let server = serve(listener, app).with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            });
            if let Err(e) = server.await {
                tracing::error!("[TestApp] Server error: {}", e);
            }
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Ok(Self {
            address,
            client: Client::new(),
            mock_server,
            app_state: app_state_for_harness,
            _db_file: db_file,
            _config_dir: config_dir,
            _server_handle: server_handle,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// Registers the default AI completion mock, answering every chat
    /// fallback with `content`.
    pub fn mock_ai_completion(&self, content: &str) -> httpmock::Mock<'_> {
        let content = content.to_string();
        self.mock_server.mock(|when, then| {
            when.method(httpmock::Method::POST)
                .path("/v1/chat/completions");
            then.status(200).json_body(serde_json::json!({
                "choices": [ { "message": { "role": "assistant", "content": content } } ]
            }));
        })
    }

    /// Mints a bearer token for `subject`, signed with the default secret.
    pub fn auth_token(&self, subject: &str) -> String {
        let exp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as usize
            + 3600;
        let claims = Claims {
            sub: subject.to_string(),
            exp,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_JWT_SECRET.as_ref()),
        )
        .unwrap()
    }

    /// Creates (or promotes) the user behind `subject` as an admin.
    pub async fn make_admin(&self, subject: &str) -> Result<()> {
        let user_id = Uuid::new_v5(&Uuid::NAMESPACE_URL, subject.as_bytes()).to_string();
        let conn = self.app_state.sqlite_provider.db.connect()?;
        let mut rows = conn
            .query("SELECT 1 FROM users WHERE id = ?", params![user_id.clone()])
            .await?;
        if rows.next().await?.is_some() {
            conn.execute(
                "UPDATE users SET role = 'admin' WHERE id = ?",
                params![user_id],
            )
            .await?;
        } else {
            conn.execute(
                "INSERT INTO users (id, identity, department, role) VALUES (?, ?, 'admin', 'admin')",
                params![user_id, subject.to_string()],
            )
            .await?;
        }
        Ok(())
    }

    /// Seeds one active FAQ entry directly in the database.
    pub async fn seed_faq(&self, question: &str, answer: &str, department: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let conn = self.app_state.sqlite_provider.db.connect()?;
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

    /// Seeds one active ERP integration descriptor directly in the database.
    pub async fn seed_integration(
        &self,
        module: &str,
        endpoint: &str,
        parameters_json: &str,
        access_roles_json: &str,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let conn = self.app_state.sqlite_provider.db.connect()?;
        conn.execute(
            "INSERT INTO erp_integrations \
             (id, module, name, endpoint, method, parameters, access_roles) \
             VALUES (?, ?, ?, ?, 'GET', ?, ?)",
            params![
                id.clone(),
                module.to_string(),
                format!("{module} integration"),
                endpoint.to_string(),
                parameters_json.to_string(),
                access_roles_json.to_string()
            ],
        )
        .await?;
        Ok(id)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
