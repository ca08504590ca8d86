//! # Core Access Crate
//!
//! This crate is the central authority for identity resolution and session
//! persistence for the `asknova` application. Every inbound request is mapped
//! to a durable [`User`] and an active [`Session`] here, exactly once, at the
//! request boundary.

pub const ANONYMOUS_DEPARTMENT: &str = "general";
pub const ANONYMOUS_ROLE: &str = "guest";
pub const DEFAULT_ROLE: &str = "employee";

use anyhow::Result;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use turso::{Database, Error as TursoError, Row, Value as TursoValue, params};
use uuid::Uuid;

/// The timestamp format used for all rows written by this crate. It matches
/// SQLite's `CURRENT_TIMESTAMP` so column defaults and explicit writes parse
/// the same way.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Error, Debug)]
pub enum CoreAccessError {
    #[error("Database error: {0}")]
    Database(#[from] TursoError),
    #[error("Failed to create or find user for identity: {0}")]
    UserPersistenceFailed(String),
    #[error("No active session found for id: {0}")]
    SessionNotFound(String),
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),
}

/// The caller's identity, resolved once when a request enters the system.
///
/// `Authenticated` carries the verified subject of a bearer token;
/// `Anonymous` carries a client-stable or freshly generated identifier.
/// Downstream components receive this variant and never re-derive it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Authenticated(String),
    Anonymous(String),
}

impl Identity {
    /// The opaque string used to key the user record.
    pub fn identifier(&self) -> &str {
        match self {
            Identity::Authenticated(subject) => subject,
            Identity::Anonymous(generated) => generated,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous(_))
    }
}

/// Defaults applied when a request creates a brand-new user. They never
/// overwrite fields of an existing user.
#[derive(Debug, Default, Clone)]
pub struct NewUserDefaults {
    pub name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub role: Option<String>,
}

/// Represents a user in the system.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    /// The unique, deterministic ID of the user (UUIDv5 from the identity).
    pub id: String,
    /// The external identity this user was created from.
    pub identity: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub department: String,
    pub role: String,
    pub query_count: i64,
    pub last_active: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A bounded span of interaction for one user on one platform.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub platform: String,
    pub device_info: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

fn now_string() -> String {
    Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, CoreAccessError> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
        .map_err(|e| CoreAccessError::DataIntegrity(format!("Failed to parse date '{raw}': {e}")))
}

fn optional_text(value: TursoValue) -> Option<String> {
    match value {
        TursoValue::Text(s) if !s.is_empty() => Some(s),
        _ => None,
    }
}

impl TryFrom<&Row> for User {
    type Error = CoreAccessError;

    // Column order: id, identity, name, email, department, role,
    // query_count, last_active, created_at.
    fn try_from(row: &Row) -> std::result::Result<Self, Self::Error> {
        let last_active = optional_text(row.get_value(7)?)
            .map(|raw| parse_timestamp(&raw))
            .transpose()?;
        let created_at_str: String = row.get(8)?;

        Ok(User {
            id: row.get(0)?,
            identity: row.get(1)?,
            name: optional_text(row.get_value(2)?),
            email: optional_text(row.get_value(3)?),
            department: row.get(4)?,
            role: row.get(5)?,
            query_count: row.get(6)?,
            last_active,
            created_at: parse_timestamp(&created_at_str)?,
        })
    }
}

impl TryFrom<&Row> for Session {
    type Error = CoreAccessError;

    // Column order: id, user_id, platform, device_info, started_at,
    // ended_at, is_active.
    fn try_from(row: &Row) -> std::result::Result<Self, Self::Error> {
        let started_at_str: String = row.get(4)?;
        let ended_at = optional_text(row.get_value(5)?)
            .map(|raw| parse_timestamp(&raw))
            .transpose()?;
        let is_active: i64 = row.get(6)?;

        Ok(Session {
            id: row.get(0)?,
            user_id: row.get(1)?,
            platform: row.get(2)?,
            device_info: optional_text(row.get_value(3)?),
            started_at: parse_timestamp(&started_at_str)?,
            ended_at,
            is_active: is_active != 0,
        })
    }
}

const USER_COLUMNS: &str =
    "id, identity, name, email, department, role, query_count, last_active, created_at";
const SESSION_COLUMNS: &str =
    "id, user_id, platform, device_info, started_at, ended_at, is_active";

/// Finds the user for an identity, creating one if none exists.
///
/// A deterministic UUIDv5 of the identity string is the primary key, so the
/// operation is idempotent. The supplied defaults apply only to a newly
/// created user; anonymous identities always fall back to the `general`
/// department and the `guest` role.
pub async fn get_or_create_user(
    db: &Database,
    identity: &Identity,
    defaults: &NewUserDefaults,
) -> Result<User, CoreAccessError> {
    let conn = db.connect()?;
    let identifier = identity.identifier();
    let user_id = Uuid::new_v5(&Uuid::NAMESPACE_URL, identifier.as_bytes()).to_string();

    let mut rows = conn
        .query(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"),
            params![user_id.clone()],
        )
        .await?;

    if let Some(row) = rows.next().await? {
        return User::try_from(&row);
    }

    let department = defaults
        .department
        .clone()
        .unwrap_or_else(|| ANONYMOUS_DEPARTMENT.to_string());
    // An anonymous caller never gets to pick a role.
    let role = if identity.is_anonymous() {
        ANONYMOUS_ROLE.to_string()
    } else {
        defaults.role.clone().unwrap_or_else(|| DEFAULT_ROLE.to_string())
    };

    debug!(identifier, department, role, "Creating new user");
    conn.execute(
        "INSERT INTO users (id, identity, name, email, department, role) VALUES (?, ?, ?, ?, ?, ?)",
        params![
            user_id.clone(),
            identifier.to_string(),
            defaults.name.clone().unwrap_or_default(),
            defaults.email.clone().unwrap_or_default(),
            department,
            role
        ],
    )
    .await?;

    let mut rows = conn
        .query(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"),
            params![user_id],
        )
        .await?;

    let row = rows
        .next()
        .await?
        .ok_or_else(|| CoreAccessError::UserPersistenceFailed(identifier.to_string()))?;

    User::try_from(&row)
}

/// Bumps the user's last-active timestamp. Called on every resolved request.
pub async fn touch_last_active(db: &Database, user_id: &str) -> Result<(), CoreAccessError> {
    let conn = db.connect()?;
    conn.execute(
        "UPDATE users SET last_active = ? WHERE id = ?",
        params![now_string(), user_id.to_string()],
    )
    .await?;
    Ok(())
}

/// Returns the user's active session, creating one if none exists.
///
/// Only one session per user is active at a time: creating a new session
/// first closes any previously active one. The active-session lookup is not
/// transactional, so two concurrent first requests for a brand-new user can
/// race into duplicate sessions; the supersession rule heals this on the
/// next session creation.
pub async fn resolve_session(
    db: &Database,
    user: &User,
    platform: &str,
    device_info: Option<&str>,
) -> Result<Session, CoreAccessError> {
    touch_last_active(db, &user.id).await?;

    let conn = db.connect()?;
    let mut rows = conn
        .query(
            &format!(
                "SELECT {SESSION_COLUMNS} FROM sessions \
                 WHERE user_id = ? AND is_active = 1 \
                 ORDER BY started_at DESC LIMIT 1"
            ),
            params![user.id.clone()],
        )
        .await?;

    if let Some(row) = rows.next().await? {
        return Session::try_from(&row);
    }

    // Supersede anything still flagged active before opening a new session.
    conn.execute(
        "UPDATE sessions SET is_active = 0, ended_at = ? WHERE user_id = ? AND is_active = 1",
        params![now_string(), user.id.clone()],
    )
    .await?;

    let session_id = Uuid::new_v4().to_string();
    debug!(user_id = %user.id, platform, "Opening new session");
    conn.execute(
        "INSERT INTO sessions (id, user_id, platform, device_info, started_at, is_active) \
         VALUES (?, ?, ?, ?, ?, 1)",
        params![
            session_id.clone(),
            user.id.clone(),
            platform.to_string(),
            device_info.unwrap_or_default().to_string(),
            now_string()
        ],
    )
    .await?;

    let mut rows = conn
        .query(
            &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?"),
            params![session_id],
        )
        .await?;

    let row = rows
        .next()
        .await?
        .ok_or_else(|| CoreAccessError::UserPersistenceFailed(user.identity.clone()))?;

    Session::try_from(&row)
}

/// Closes an active session and returns its duration in seconds.
pub async fn end_session(db: &Database, session_id: &str) -> Result<i64, CoreAccessError> {
    let conn = db.connect()?;
    let mut rows = conn
        .query(
            &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ? AND is_active = 1"),
            params![session_id.to_string()],
        )
        .await?;

    let row = rows
        .next()
        .await?
        .ok_or_else(|| CoreAccessError::SessionNotFound(session_id.to_string()))?;
    let session = Session::try_from(&row)?;

    let ended_at = Utc::now();
    conn.execute(
        "UPDATE sessions SET is_active = 0, ended_at = ? WHERE id = ?",
        params![
            ended_at.format(TIMESTAMP_FORMAT).to_string(),
            session_id.to_string()
        ],
    )
    .await?;

    Ok((ended_at - session.started_at).num_seconds())
}

#[cfg(test)]
mod tests {
    use super::*;
    use asknova::providers::db::sqlite::SqliteProvider;

    async fn test_db() -> Database {
        let provider = SqliteProvider::new(":memory:").await.unwrap();
        provider.initialize_schema().await.unwrap();
        provider.db
    }

    #[tokio::test]
    async fn test_get_or_create_user_is_idempotent() {
        let db = test_db().await;
        let identity = Identity::Authenticated("amit@example.com".to_string());
        let defaults = NewUserDefaults {
            department: Some("finance".to_string()),
            ..Default::default()
        };

        let user1 = get_or_create_user(&db, &identity, &defaults).await.unwrap();
        let expected_id =
            Uuid::new_v5(&Uuid::NAMESPACE_URL, "amit@example.com".as_bytes()).to_string();
        assert_eq!(user1.id, expected_id);
        assert_eq!(user1.department, "finance");
        assert_eq!(user1.role, DEFAULT_ROLE);

        // A second call with different defaults must return the same user,
        // untouched.
        let other_defaults = NewUserDefaults {
            department: Some("sales".to_string()),
            role: Some("admin".to_string()),
            ..Default::default()
        };
        let user2 = get_or_create_user(&db, &identity, &other_defaults)
            .await
            .unwrap();
        assert_eq!(user1.id, user2.id);
        assert_eq!(user2.department, "finance");
        assert_eq!(user2.role, DEFAULT_ROLE);
    }

    #[tokio::test]
    async fn test_anonymous_user_never_gets_a_role() {
        let db = test_db().await;
        let identity = Identity::Anonymous("browser-3f2a".to_string());
        // The body may pick a department, but never a role.
        let defaults = NewUserDefaults {
            department: Some("gst".to_string()),
            role: Some("admin".to_string()),
            ..Default::default()
        };

        let user = get_or_create_user(&db, &identity, &defaults).await.unwrap();
        assert_eq!(user.department, "gst");
        assert_eq!(user.role, ANONYMOUS_ROLE);

        // With no defaults at all, department falls back to general.
        let bare = get_or_create_user(
            &db,
            &Identity::Anonymous("kiosk-1".to_string()),
            &NewUserDefaults::default(),
        )
        .await
        .unwrap();
        assert_eq!(bare.department, ANONYMOUS_DEPARTMENT);
    }

    #[tokio::test]
    async fn test_resolve_session_reuses_active_session() {
        let db = test_db().await;
        let identity = Identity::Authenticated("priya@example.com".to_string());
        let user = get_or_create_user(&db, &identity, &NewUserDefaults::default())
            .await
            .unwrap();

        let s1 = resolve_session(&db, &user, "web", None).await.unwrap();
        let s2 = resolve_session(&db, &user, "web", None).await.unwrap();
        assert_eq!(s1.id, s2.id);
        assert!(s2.is_active);

        // Resolving also bumps last_active.
        let refreshed = get_or_create_user(&db, &identity, &NewUserDefaults::default())
            .await
            .unwrap();
        assert!(refreshed.last_active.is_some());
    }

    #[tokio::test]
    async fn test_end_session_closes_and_reports_duration() {
        let db = test_db().await;
        let identity = Identity::Anonymous("kiosk-7".to_string());
        let user = get_or_create_user(&db, &identity, &NewUserDefaults::default())
            .await
            .unwrap();
        let session = resolve_session(&db, &user, "web", Some("kiosk"))
            .await
            .unwrap();

        let duration = end_session(&db, &session.id).await.unwrap();
        assert!(duration >= 0);

        // Ending twice is an error: the session is no longer active.
        let err = end_session(&db, &session.id).await.unwrap_err();
        assert!(matches!(err, CoreAccessError::SessionNotFound(_)));

        // The next resolve opens a fresh session.
        let next = resolve_session(&db, &user, "slack", None).await.unwrap();
        assert_ne!(next.id, session.id);
        assert_eq!(next.platform, "slack");
    }
}
