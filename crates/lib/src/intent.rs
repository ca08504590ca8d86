//! # Intent Classification
//!
//! Maps free-text input to one of a fixed set of domain tags by keyword
//! presence. Intents are tested in a fixed priority order, so overlapping
//! keywords between intents resolve by position, not by best-match scoring.

use serde::{Deserialize, Serialize};

/// The closed set of domain intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Sales,
    Hr,
    Finance,
    Inventory,
    Production,
    #[default]
    General,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Sales => "sales",
            Intent::Hr => "hr",
            Intent::Finance => "finance",
            Intent::Inventory => "inventory",
            Intent::Production => "production",
            Intent::General => "general",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "sales" => Intent::Sales,
            "hr" => Intent::Hr,
            "finance" => Intent::Finance,
            "inventory" => Intent::Inventory,
            "production" => Intent::Production,
            _ => Intent::General,
        }
    }
}

/// Keyword lists per intent, in priority order. The order is load-bearing:
/// "product cost" hits `finance` via "cost" before `inventory` via "product".
const INTENT_KEYWORDS: &[(Intent, &[&str])] = &[
    (
        Intent::Sales,
        &[
            "sales",
            "revenue",
            "customer",
            "order",
            "deal",
            "pipeline",
            "commission",
        ],
    ),
    (
        Intent::Hr,
        &[
            "employee",
            "leave",
            "salary",
            "payroll",
            "vacation",
            "benefits",
            "attendance",
        ],
    ),
    (
        Intent::Finance,
        &[
            "invoice", "payment", "expense", "budget", "cost", "financial", "tax",
        ],
    ),
    (
        Intent::Inventory,
        &["stock", "inventory", "warehouse", "product", "item", "supply"],
    ),
    (
        Intent::Production,
        &["manufacture", "production", "assemble", "quality", "defect"],
    ),
];

/// Classifies free text into an [`Intent`].
///
/// Pure and total: every input maps to exactly one intent, defaulting to
/// `General` when no keyword matches.
pub fn classify(text: &str) -> Intent {
    let lowered = text.to_lowercase();
    for (intent, keywords) in INTENT_KEYWORDS {
        if keywords.iter().any(|keyword| lowered.contains(keyword)) {
            return *intent;
        }
    }
    Intent::General
}
