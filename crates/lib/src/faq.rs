//! # FAQ Matching
//!
//! Scores a user's question against the curated FAQ set and returns the best
//! match with a confidence value. Confidence is the asymmetric overlap
//! |query tokens ∩ question tokens| / |query tokens|: the fraction of the
//! query's meaningful words found in the FAQ question. A short query that is
//! fully contained in a long FAQ question therefore still scores high, which
//! a symmetric Jaccard score would not allow.

use crate::{
    constants::{FAQ_DEPARTMENT_BOOST, FAQ_MIN_TOKEN_LEN, FAQ_ROUTING_THRESHOLD},
    errors::ChatError,
    types::Department,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;
use turso::{params, Database, Row, Value as TursoValue};
use uuid::Uuid;

/// One curated FAQ entry, long-lived reference data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaqEntry {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub department: Department,
    pub category: Option<String>,
    pub keywords: Vec<String>,
    pub popularity: i64,
    pub is_active: bool,
}

/// A scored match against one FAQ entry.
#[derive(Debug, Clone)]
pub struct FaqMatch {
    pub entry: FaqEntry,
    pub confidence: f64,
}

/// Partial update for an FAQ entry; `None` fields are left untouched.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct FaqUpdate {
    pub question: Option<String>,
    pub answer: Option<String>,
    pub department: Option<Department>,
    pub category: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

/// Splits text into lower-cased tokens, discarding noise tokens of length
/// < [`FAQ_MIN_TOKEN_LEN`].
pub fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.len() >= FAQ_MIN_TOKEN_LEN)
        .map(str::to_string)
        .collect()
}

/// Scores one FAQ entry against the query's token set.
///
/// Returns a value in [0, 1]. A query with no meaningful tokens scores zero
/// against everything.
fn score_entry(query_tokens: &HashSet<String>, entry: &FaqEntry, department: Department) -> f64 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let question_tokens = tokenize(&entry.question);
    let shared = query_tokens
        .iter()
        .filter(|token| question_tokens.contains(*token))
        .count();

    let mut confidence = shared as f64 / query_tokens.len() as f64;
    if department != Department::General && entry.department == department {
        confidence *= FAQ_DEPARTMENT_BOOST;
    }
    confidence.min(1.0)
}

/// Returns the highest-scoring active FAQ for the query, or `None` when no
/// candidate clears the routing threshold, signaling the caller to proceed
/// to the ERP lookup or the generative fallback.
pub fn match_faq(candidates: &[FaqEntry], text: &str, department: Department) -> Option<FaqMatch> {
    let query_tokens = tokenize(text);
    if query_tokens.is_empty() {
        return None;
    }

    let mut best: Option<FaqMatch> = None;
    for entry in candidates.iter().filter(|entry| entry.is_active) {
        let confidence = score_entry(&query_tokens, entry, department);
        if best.as_ref().map_or(true, |b| confidence > b.confidence) {
            best = Some(FaqMatch {
                entry: entry.clone(),
                confidence,
            });
        }
    }

    best.filter(|m| m.confidence > FAQ_ROUTING_THRESHOLD)
        .inspect(|m| {
            debug!(
                faq_id = %m.entry.id,
                confidence = m.confidence,
                "FAQ candidate cleared routing threshold"
            );
        })
}

// --- Storage access ---

const FAQ_COLUMNS: &str =
    "id, question, answer, department, category, keywords, popularity, is_active";

fn faq_from_row(row: &Row) -> Result<FaqEntry, ChatError> {
    let department: String = row.get(3)?;
    let category = match row.get_value(4)? {
        TursoValue::Text(s) if !s.is_empty() => Some(s),
        _ => None,
    };
    let keywords_raw: String = row.get(5)?;
    let keywords: Vec<String> = serde_json::from_str(&keywords_raw).unwrap_or_default();
    let is_active: i64 = row.get(7)?;

    Ok(FaqEntry {
        id: row.get(0)?,
        question: row.get(1)?,
        answer: row.get(2)?,
        department: Department::parse(&department),
        category,
        keywords,
        popularity: row.get(6)?,
        is_active: is_active != 0,
    })
}

/// Loads FAQ entries, popularity-descending. Department and category filter
/// when given; inactive entries are excluded unless requested.
pub async fn list_faqs(
    db: &Database,
    department: Option<Department>,
    category: Option<&str>,
    include_inactive: bool,
) -> Result<Vec<FaqEntry>, ChatError> {
    let conn = db.connect().map_err(|e| ChatError::StorageConnection(e.to_string()))?;

    let mut conditions: Vec<String> = Vec::new();
    let mut query_params: Vec<TursoValue> = Vec::new();
    if !include_inactive {
        conditions.push("is_active = 1".to_string());
    }
    if let Some(dept) = department {
        conditions.push("department = ?".to_string());
        query_params.push(dept.as_str().to_string().into());
    }
    if let Some(cat) = category {
        conditions.push("category = ?".to_string());
        query_params.push(cat.to_string().into());
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    let sql =
        format!("SELECT {FAQ_COLUMNS} FROM faqs {where_clause} ORDER BY popularity DESC, id ASC");

    let mut rows = if query_params.is_empty() {
        conn.query(&sql, ()).await?
    } else {
        conn.query(&sql, query_params).await?
    };

    let mut entries = Vec::new();
    while let Some(row) = rows.next().await? {
        entries.push(faq_from_row(&row)?);
    }
    Ok(entries)
}

/// The candidate set for matching: every active FAQ. Department filtering is
/// not applied here because cross-department entries still compete, just
/// without the boost.
pub async fn active_faqs(db: &Database) -> Result<Vec<FaqEntry>, ChatError> {
    list_faqs(db, None, None, false).await
}

/// Creates a new FAQ entry and returns it.
pub async fn create_faq(
    db: &Database,
    question: &str,
    answer: &str,
    department: Department,
    category: Option<&str>,
    keywords: &[String],
) -> Result<FaqEntry, ChatError> {
    if question.trim().is_empty() || answer.trim().is_empty() {
        return Err(ChatError::Validation(
            "FAQ question and answer must be non-empty".to_string(),
        ));
    }
    let conn = db.connect().map_err(|e| ChatError::StorageConnection(e.to_string()))?;
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO faqs (id, question, answer, department, category, keywords) \
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
            id.clone(),
            question.to_string(),
            answer.to_string(),
            department.as_str().to_string(),
            category.unwrap_or_default().to_string(),
            serde_json::to_string(keywords)?
        ],
    )
    .await?;

    get_faq(db, &id).await
}

/// Fetches one FAQ entry by id.
pub async fn get_faq(db: &Database, id: &str) -> Result<FaqEntry, ChatError> {
    let conn = db.connect().map_err(|e| ChatError::StorageConnection(e.to_string()))?;
    let mut rows = conn
        .query(
            &format!("SELECT {FAQ_COLUMNS} FROM faqs WHERE id = ?"),
            params![id.to_string()],
        )
        .await?;
    let row = rows
        .next()
        .await?
        .ok_or_else(|| ChatError::NotFound(format!("FAQ '{id}'")))?;
    faq_from_row(&row)
}

/// Applies a partial update to an FAQ entry and returns the updated row.
pub async fn update_faq(db: &Database, id: &str, update: &FaqUpdate) -> Result<FaqEntry, ChatError> {
    let existing = get_faq(db, id).await?;
    let conn = db.connect().map_err(|e| ChatError::StorageConnection(e.to_string()))?;

    let question = update.question.clone().unwrap_or(existing.question);
    let answer = update.answer.clone().unwrap_or(existing.answer);
    let department = update.department.unwrap_or(existing.department);
    let category = update.category.clone().or(existing.category);
    let keywords = update.keywords.clone().unwrap_or(existing.keywords);
    let is_active = update.is_active.unwrap_or(existing.is_active);

    conn.execute(
        "UPDATE faqs SET question = ?, answer = ?, department = ?, category = ?, \
         keywords = ?, is_active = ?, updated_at = ? WHERE id = ?",
        params![
            question,
            answer,
            department.as_str().to_string(),
            category.unwrap_or_default(),
            serde_json::to_string(&keywords)?,
            is_active as i64,
            Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            id.to_string()
        ],
    )
    .await?;

    get_faq(db, id).await
}

/// Soft-deactivates an FAQ entry. Rows are never hard-deleted so the audit
/// trail of FAQ-sourced answers stays resolvable.
pub async fn deactivate_faq(db: &Database, id: &str) -> Result<(), ChatError> {
    // Existence check keeps the 404 semantics of the admin surface.
    get_faq(db, id).await?;
    let conn = db.connect().map_err(|e| ChatError::StorageConnection(e.to_string()))?;
    conn.execute(
        "UPDATE faqs SET is_active = 0 WHERE id = ?",
        params![id.to_string()],
    )
    .await?;
    Ok(())
}

/// Bumps an entry's popularity counter after it answered a query.
pub async fn increment_popularity(db: &Database, id: &str) -> Result<(), ChatError> {
    let conn = db.connect().map_err(|e| ChatError::StorageConnection(e.to_string()))?;
    conn.execute(
        "UPDATE faqs SET popularity = popularity + 1 WHERE id = ?",
        params![id.to_string()],
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, question: &str, department: Department) -> FaqEntry {
        FaqEntry {
            id: id.to_string(),
            question: question.to_string(),
            answer: format!("answer for {id}"),
            department,
            category: None,
            keywords: Vec::new(),
            popularity: 0,
            is_active: true,
        }
    }

    #[test]
    fn tokenize_discards_noise_tokens() {
        // Every word here is at or below the noise threshold.
        assert!(tokenize("how do I see the GST tax?").is_empty());

        let tokens = tokenize("Generate invoice reports");
        assert!(tokens.contains("generate"));
        assert!(tokens.contains("invoice"));
        assert!(tokens.contains("reports"));
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn confidence_is_query_side_fraction() {
        let candidates = vec![entry(
            "f1",
            "How do I generate a GST invoice for a customer order?",
            Department::Gst,
        )];
        // Meaningful query tokens: generate, invoice. Both appear in the
        // question, so confidence is 1.0 despite the longer question.
        let matched = match_faq(&candidates, "generate invoice", Department::General).unwrap();
        assert!((matched.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn confidence_is_monotone_in_shared_tokens() {
        let candidates = vec![entry(
            "f1",
            "generate monthly inventory valuation report",
            Department::Inventory,
        )];
        let one = match_faq(
            &candidates,
            "please generate unrelated wording everywhere",
            Department::General,
        );
        let two = match_faq(
            &candidates,
            "please generate valuation wording everywhere",
            Department::General,
        );
        let score_of = |m: &Option<FaqMatch>| m.as_ref().map_or(0.0, |m| m.confidence);
        assert!(score_of(&two) >= score_of(&one));
    }

    #[test]
    fn department_boost_prefers_owning_department() {
        let candidates = vec![
            entry("general", "check pending invoice payments", Department::General),
            entry("finance", "check pending invoice totals", Department::Finance),
        ];
        let matched = match_faq(&candidates, "check pending invoice", Department::Finance).unwrap();
        assert_eq!(matched.entry.id, "finance");
        assert!(matched.confidence <= 1.0);
    }

    #[test]
    fn zero_meaningful_tokens_never_matches() {
        let candidates = vec![entry("f1", "how to do it", Department::General)];
        assert!(match_faq(&candidates, "how do I do it", Department::General).is_none());
        assert!(match_faq(&candidates, "", Department::General).is_none());
    }

    #[test]
    fn below_threshold_returns_none_and_inactive_is_skipped() {
        let mut inactive = entry("f1", "generate invoice reports quickly", Department::General);
        inactive.is_active = false;
        let candidates = vec![inactive];
        assert!(match_faq(&candidates, "generate invoice reports", Department::General).is_none());

        let candidates = vec![entry("f2", "completely unrelated question text", Department::General)];
        assert!(match_faq(&candidates, "generate invoice reports", Department::General).is_none());
    }
}
