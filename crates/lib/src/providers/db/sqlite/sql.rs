//! # SQLite Schema
//!
//! This module centralizes the table-creation SQL for the application's six
//! collections. Keeping the statements here isolates database-specific syntax
//! and lets tests apply the exact production schema to in-memory databases.

/// Every table-creation statement, in dependency order. All statements are
/// `IF NOT EXISTS`, so running them on every startup is safe.
pub const ALL_TABLE_CREATION_SQL: &[&str] = &[
    // Durable user identities. `identity` is the external auth subject or a
    // generated anonymous id; `id` is its deterministic UUIDv5.
    "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        identity TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL DEFAULT '',
        email TEXT NOT NULL DEFAULT '',
        department TEXT NOT NULL DEFAULT 'general',
        role TEXT NOT NULL DEFAULT 'guest',
        query_count INTEGER NOT NULL DEFAULT 0,
        last_active TEXT,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    // One bounded span of interaction per user and platform. The application
    // keeps at most one row per user with is_active = 1.
    "CREATE TABLE IF NOT EXISTS sessions (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        platform TEXT NOT NULL DEFAULT 'web',
        device_info TEXT,
        started_at TEXT NOT NULL,
        ended_at TEXT,
        is_active INTEGER NOT NULL DEFAULT 1,
        FOREIGN KEY (user_id) REFERENCES users(id)
    )",
    // The query audit trail. Rows are inserted in the 'pending' state with a
    // sentinel response before any resolution step runs.
    "CREATE TABLE IF NOT EXISTS queries (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        session_id TEXT NOT NULL,
        prompt TEXT NOT NULL,
        response TEXT NOT NULL,
        response_source TEXT NOT NULL DEFAULT 'pending',
        department TEXT NOT NULL DEFAULT 'general',
        user_role TEXT NOT NULL DEFAULT 'guest',
        intent TEXT,
        processing_ms INTEGER,
        escalated INTEGER NOT NULL DEFAULT 0,
        ticket_id TEXT,
        context TEXT,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        responded_at TEXT,
        FOREIGN KEY (user_id) REFERENCES users(id)
    )",
    "CREATE TABLE IF NOT EXISTS feedback (
        id TEXT PRIMARY KEY,
        query_id TEXT NOT NULL,
        user_id TEXT NOT NULL,
        rating INTEGER NOT NULL,
        comment TEXT,
        sentiment TEXT NOT NULL DEFAULT 'neutral',
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (query_id) REFERENCES queries(id)
    )",
    // Curated FAQ reference data; soft-deactivated, never deleted.
    "CREATE TABLE IF NOT EXISTS faqs (
        id TEXT PRIMARY KEY,
        question TEXT NOT NULL,
        answer TEXT NOT NULL,
        department TEXT NOT NULL DEFAULT 'general',
        category TEXT NOT NULL DEFAULT '',
        keywords TEXT NOT NULL DEFAULT '[]',
        popularity INTEGER NOT NULL DEFAULT 0,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TEXT
    )",
    // ERP integration descriptors: how to proxy a module's data requests.
    "CREATE TABLE IF NOT EXISTS erp_integrations (
        id TEXT PRIMARY KEY,
        module TEXT NOT NULL,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        endpoint TEXT NOT NULL,
        method TEXT NOT NULL DEFAULT 'GET',
        parameters TEXT NOT NULL DEFAULT '[]',
        response_mapping TEXT NOT NULL DEFAULT '{}',
        access_roles TEXT NOT NULL DEFAULT '[\"all\"]',
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE INDEX IF NOT EXISTS idx_sessions_user_active ON sessions(user_id, is_active)",
    "CREATE INDEX IF NOT EXISTS idx_queries_user_created ON queries(user_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_faqs_department ON faqs(department)",
    "CREATE INDEX IF NOT EXISTS idx_erp_integrations_module ON erp_integrations(module)",
];
