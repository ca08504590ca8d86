//! # Query Record Lifecycle
//!
//! The persisted audit trail of every user question. A row is created in the
//! `pending` state before any resolution step runs, finalized exactly once
//! with its response and latency, and afterwards touched only by feedback
//! attachment and the guarded one-way escalation.

use crate::{
    constants::PENDING_RESPONSE,
    errors::ChatError,
    intent::Intent,
    prompts::HistoryTurn,
    types::{Department, FeedbackRecord, QueryRecord, ResponseSource},
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use turso::{params, Database, Row, Value as TursoValue};
use uuid::Uuid;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn now_string() -> String {
    Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ChatError> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
        .map_err(|e| ChatError::StorageOperationFailed(format!("Failed to parse date '{raw}': {e}")))
}

fn optional_text(value: TursoValue) -> Option<String> {
    match value {
        TursoValue::Text(s) if !s.is_empty() => Some(s),
        _ => None,
    }
}

fn optional_integer(value: TursoValue) -> Option<i64> {
    match value {
        TursoValue::Integer(i) => Some(i),
        _ => None,
    }
}

const QUERY_COLUMNS: &str = "id, user_id, session_id, prompt, response, response_source, \
     department, user_role, intent, processing_ms, escalated, ticket_id, context, \
     created_at, responded_at";

fn query_from_row(row: &Row) -> Result<QueryRecord, ChatError> {
    let source: String = row.get(5)?;
    let department: String = row.get(6)?;
    let intent = optional_text(row.get_value(8)?).map(|raw| Intent::parse(&raw));
    let escalated: i64 = row.get(10)?;
    let created_at_str: String = row.get(13)?;
    let responded_at = optional_text(row.get_value(14)?)
        .map(|raw| parse_timestamp(&raw))
        .transpose()?;

    Ok(QueryRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        session_id: row.get(2)?,
        prompt: row.get(3)?,
        response: row.get(4)?,
        response_source: ResponseSource::parse(&source),
        department: Department::parse(&department),
        user_role: row.get(7)?,
        intent,
        processing_ms: optional_integer(row.get_value(9)?),
        escalated: escalated != 0,
        ticket_id: optional_text(row.get_value(11)?),
        context: optional_text(row.get_value(12)?),
        created_at: parse_timestamp(&created_at_str)?,
        responded_at,
    })
}

/// Inserts a query row in the `pending` state, before any resolution step.
/// A crash mid-pipeline still leaves this auditable row behind, and its
/// response column is never null.
pub async fn insert_pending(
    db: &Database,
    user_id: &str,
    session_id: &str,
    prompt: &str,
    department: Department,
    user_role: &str,
) -> Result<String, ChatError> {
    let conn = db.connect().map_err(|e| ChatError::StorageConnection(e.to_string()))?;
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO queries (id, user_id, session_id, prompt, response, response_source, \
         department, user_role, created_at) VALUES (?, ?, ?, ?, ?, 'pending', ?, ?, ?)",
        params![
            id.clone(),
            user_id.to_string(),
            session_id.to_string(),
            prompt.to_string(),
            PENDING_RESPONSE.to_string(),
            department.as_str().to_string(),
            user_role.to_string(),
            now_string()
        ],
    )
    .await?;
    debug!(query_id = %id, "Created pending query record");
    Ok(id)
}

/// Finalizes a query row with its resolved response, source tag, detected
/// intent, and measured latency, and bumps the owning user's query counter.
pub async fn finalize(
    db: &Database,
    query_id: &str,
    response: &str,
    source: ResponseSource,
    intent: Intent,
    processing_ms: i64,
    context: Option<&str>,
) -> Result<(), ChatError> {
    let conn = db.connect().map_err(|e| ChatError::StorageConnection(e.to_string()))?;
    conn.execute(
        "UPDATE queries SET response = ?, response_source = ?, intent = ?, \
         processing_ms = ?, context = ?, responded_at = ? WHERE id = ?",
        params![
            response.to_string(),
            source.as_str().to_string(),
            intent.as_str().to_string(),
            processing_ms,
            context.unwrap_or_default().to_string(),
            now_string(),
            query_id.to_string()
        ],
    )
    .await?;
    let mut rows = conn
        .query(
            "SELECT user_id FROM queries WHERE id = ?",
            params![query_id.to_string()],
        )
        .await?;
    if let Some(row) = rows.next().await? {
        let user_id: String = row.get(0)?;
        conn.execute(
            "UPDATE users SET query_count = query_count + 1 WHERE id = ?",
            params![user_id],
        )
        .await?;
    }
    Ok(())
}

/// Fetches one query row by id.
pub async fn get_query(db: &Database, query_id: &str) -> Result<QueryRecord, ChatError> {
    let conn = db.connect().map_err(|e| ChatError::StorageConnection(e.to_string()))?;
    let mut rows = conn
        .query(
            &format!("SELECT {QUERY_COLUMNS} FROM queries WHERE id = ?"),
            params![query_id.to_string()],
        )
        .await?;
    let row = rows
        .next()
        .await?
        .ok_or_else(|| ChatError::NotFound(format!("Query '{query_id}'")))?;
    query_from_row(&row)
}

/// Attaches feedback to a resolved query. Feedback is insert-only: repeated
/// submissions create new rows and never mutate the query's stored response.
pub async fn attach_feedback(
    db: &Database,
    query_id: &str,
    rating: i64,
    comment: Option<&str>,
) -> Result<FeedbackRecord, ChatError> {
    if !(1..=5).contains(&rating) {
        return Err(ChatError::Validation(
            "Rating must be between 1 and 5".to_string(),
        ));
    }
    let query = get_query(db, query_id).await?;

    let sentiment = if rating >= 4 {
        "positive"
    } else if rating <= 2 {
        "negative"
    } else {
        "neutral"
    };

    let conn = db.connect().map_err(|e| ChatError::StorageConnection(e.to_string()))?;
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO feedback (id, query_id, user_id, rating, comment, sentiment, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            id.clone(),
            query_id.to_string(),
            query.user_id.clone(),
            rating,
            comment.unwrap_or_default().to_string(),
            sentiment.to_string(),
            now_string()
        ],
    )
    .await?;

    Ok(FeedbackRecord {
        id,
        query_id: query_id.to_string(),
        user_id: query.user_id,
        rating,
        comment: comment.map(str::to_string),
        sentiment: sentiment.to_string(),
        created_at: Utc::now(),
    })
}

/// Escalates a resolved query to a human agent, minting a ticket id.
///
/// The transition is one-way: once `escalated` is set, subsequent requests
/// return the already-minted ticket id and never generate a second one.
pub async fn escalate(db: &Database, query_id: &str) -> Result<String, ChatError> {
    let query = get_query(db, query_id).await?;

    match query.response_source {
        ResponseSource::Pending => {
            return Err(ChatError::Validation(
                "Query is still being processed and cannot be escalated yet".to_string(),
            ))
        }
        ResponseSource::Error => {
            return Err(ChatError::Validation(
                "Failed queries cannot be escalated; please resubmit the question".to_string(),
            ))
        }
        _ => {}
    }

    if query.escalated {
        if let Some(ticket) = query.ticket_id {
            return Ok(ticket);
        }
    }

    let ticket_id = format!(
        "TKT-{}-{}",
        Utc::now().timestamp_millis(),
        &Uuid::new_v4().simple().to_string()[..8]
    );

    let conn = db.connect().map_err(|e| ChatError::StorageConnection(e.to_string()))?;
    conn.execute(
        "UPDATE queries SET escalated = 1, ticket_id = ? WHERE id = ? AND escalated = 0",
        params![ticket_id.clone(), query_id.to_string()],
    )
    .await?;

    // A concurrent escalation may have won the guarded update; the stored
    // ticket is authoritative either way.
    let stored = get_query(db, query_id).await?;
    let ticket = stored.ticket_id.unwrap_or(ticket_id);
    info!(query_id, ticket_id = %ticket, "Query escalated");
    Ok(ticket)
}

/// One page of a user's query history, newest first, plus the total count.
pub async fn history(
    db: &Database,
    user_id: &str,
    limit: u32,
    skip: u32,
) -> Result<(Vec<QueryRecord>, u32), ChatError> {
    let conn = db.connect().map_err(|e| ChatError::StorageConnection(e.to_string()))?;

    let mut rows = conn
        .query(
            "SELECT COUNT(*) FROM queries WHERE user_id = ?",
            params![user_id.to_string()],
        )
        .await?;
    let total: i64 = match rows.next().await? {
        Some(row) => row.get(0)?,
        None => 0,
    };

    let mut rows = conn
        .query(
            &format!(
                "SELECT {QUERY_COLUMNS} FROM queries WHERE user_id = ? \
                 ORDER BY created_at DESC, id DESC LIMIT {limit} OFFSET {skip}"
            ),
            params![user_id.to_string()],
        )
        .await?;

    let mut records = Vec::new();
    while let Some(row) = rows.next().await? {
        records.push(query_from_row(&row)?);
    }
    Ok((records, total as u32))
}

/// The last `n` resolved query/response pairs for a user, oldest first,
/// for generative context enrichment. Pending and failed rows are excluded.
pub async fn recent_turns(
    db: &Database,
    user_id: &str,
    n: u32,
) -> Result<Vec<HistoryTurn>, ChatError> {
    let conn = db.connect().map_err(|e| ChatError::StorageConnection(e.to_string()))?;
    let mut rows = conn
        .query(
            &format!(
                "SELECT prompt, response FROM queries \
                 WHERE user_id = ? AND response_source IN ('faq', 'erp', 'ai', 'human') \
                 ORDER BY created_at DESC, id DESC LIMIT {n}"
            ),
            params![user_id.to_string()],
        )
        .await?;

    let mut turns = Vec::new();
    while let Some(row) = rows.next().await? {
        turns.push(HistoryTurn {
            prompt: row.get(0)?,
            response: row.get(1)?,
        });
    }
    turns.reverse();
    Ok(turns)
}

/// Aggregated usage metrics over the query audit trail.
#[derive(Debug, Serialize)]
pub struct UsageStats {
    pub total_queries: i64,
    pub by_source: Vec<CountBucket>,
    pub avg_processing_ms: f64,
    pub top_intents: Vec<CountBucket>,
    pub sentiment: Vec<CountBucket>,
    pub escalation_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct CountBucket {
    pub name: String,
    pub count: i64,
}

async fn grouped_counts(
    db: &Database,
    sql: &str,
    filter: Option<&str>,
) -> Result<Vec<CountBucket>, ChatError> {
    let conn = db.connect().map_err(|e| ChatError::StorageConnection(e.to_string()))?;
    let mut rows = match filter {
        Some(value) => conn.query(sql, params![value.to_string()]).await?,
        None => conn.query(sql, ()).await?,
    };
    let mut buckets = Vec::new();
    while let Some(row) = rows.next().await? {
        buckets.push(CountBucket {
            name: row.get(0)?,
            count: row.get(1)?,
        });
    }
    Ok(buckets)
}

/// Computes the usage aggregates for the analytics surface, optionally
/// restricted to one department.
pub async fn usage_stats(
    db: &Database,
    department: Option<Department>,
) -> Result<UsageStats, ChatError> {
    let conn = db.connect().map_err(|e| ChatError::StorageConnection(e.to_string()))?;
    let dept = department.map(|d| d.as_str());

    let (where_clause, filter) = match dept {
        Some(d) => ("WHERE department = ?", Some(d)),
        None => ("", None),
    };

    let mut rows = match filter {
        Some(value) => {
            conn.query(
                &format!("SELECT COUNT(*), AVG(processing_ms) FROM queries {where_clause}"),
                params![value.to_string()],
            )
            .await?
        }
        None => {
            conn.query("SELECT COUNT(*), AVG(processing_ms) FROM queries", ())
                .await?
        }
    };

    let (total_queries, avg_processing_ms) = match rows.next().await? {
        Some(row) => {
            let total: i64 = row.get(0)?;
            let avg = match row.get_value(1)? {
                TursoValue::Real(f) => f,
                TursoValue::Integer(i) => i as f64,
                _ => 0.0,
            };
            (total, avg)
        }
        None => (0, 0.0),
    };

    let escalated_clause = if where_clause.is_empty() {
        "WHERE escalated = 1".to_string()
    } else {
        format!("{where_clause} AND escalated = 1")
    };
    let mut rows = match filter {
        Some(value) => {
            conn.query(
                &format!("SELECT COUNT(*) FROM queries {escalated_clause}"),
                params![value.to_string()],
            )
            .await?
        }
        None => {
            conn.query(&format!("SELECT COUNT(*) FROM queries {escalated_clause}"), ())
                .await?
        }
    };
    let escalated: i64 = match rows.next().await? {
        Some(row) => row.get(0)?,
        None => 0,
    };

    let by_source = grouped_counts(
        db,
        &format!(
            "SELECT response_source, COUNT(*) AS n FROM queries {where_clause} \
             GROUP BY response_source ORDER BY n DESC"
        ),
        filter,
    )
    .await?;

    let top_intents = grouped_counts(
        db,
        &format!(
            "SELECT intent, COUNT(*) AS n FROM queries {where_clause}{}intent IS NOT NULL \
             GROUP BY intent ORDER BY n DESC LIMIT 5",
            if where_clause.is_empty() { " WHERE " } else { " AND " }
        ),
        filter,
    )
    .await?;

    // Sentiment joins through to feedback; the department filter applies to
    // the originating query.
    let sentiment = grouped_counts(
        db,
        &format!(
            "SELECT f.sentiment, COUNT(*) FROM feedback f \
             JOIN queries q ON q.id = f.query_id {} \
             GROUP BY f.sentiment",
            match dept {
                Some(_) => "WHERE q.department = ?",
                None => "",
            }
        ),
        filter,
    )
    .await?;

    let escalation_rate = if total_queries > 0 {
        escalated as f64 / total_queries as f64
    } else {
        0.0
    };

    Ok(UsageStats {
        total_queries,
        by_source,
        avg_processing_ms,
        top_intents,
        sentiment,
        escalation_rate,
    })
}
