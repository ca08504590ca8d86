//! # Prompt Templates
//!
//! Constant templates for the generative fallback, plus the context assembly
//! that fills them. Placeholders use `{name}` markers and are substituted
//! with plain `replace`, matching how the rest of the pipeline treats
//! templates as data.

use crate::{erp::ErpIntegration, types::Department};

/// The system prompt for the generative fallback. The caller's profile,
/// recent conversation turns, and the ERP surface visible to their role are
/// substituted in; the raw user question is sent separately as the user
/// prompt.
pub const CHAT_SYSTEM_PROMPT: &str = "\
You are AskNova, an AI assistant for the NovaERP enterprise resource planning system.
You help employees navigate the ERP system and answer their questions about enterprise processes.

User Info:
- Name: {name}
- Department: {department}
- Role: {role}

Module context:
{module_context}

Recent conversation history:
{history}

ERP integrations available to this user:
{integrations}

When answering:
1. Be concise and professional.
2. For data-specific queries, mention you can fetch real-time ERP data.
3. For complex process questions, provide step-by-step instructions.
4. If you don't know, suggest escalation to a human agent.";

/// Per-department context blurbs injected into the system prompt.
pub fn module_context(department: Department) -> &'static str {
    match department {
        Department::Sales => {
            "NovaERP Sales module handles customer management, quotations, invoicing, and order \
             processing. Sales data includes customer details, product prices, discount schemes, \
             taxes, and payment terms."
        }
        Department::Purchase => {
            "NovaERP Purchase module manages vendor relationships, purchase orders, goods \
             receipt, and vendor bills. It includes data on suppliers, purchase prices, and \
             inventory received."
        }
        Department::Gst => {
            "GST module in NovaERP handles tax calculations, GST returns, e-invoicing, and \
             compliance. It includes GSTIN validation, HSN codes, and tax rates for different \
             products."
        }
        Department::Finance => {
            "Finance module covers accounts receivable, accounts payable, general ledger, and \
             financial reporting. Chart of accounts follows standard accounting principles."
        }
        Department::Inventory => {
            "Inventory module tracks stock levels, warehouse management, stock transfers, and \
             inventory valuation. Products have SKUs, batch tracking, and expiry dates where \
             applicable."
        }
        Department::Production => {
            "Production module handles BOMs, work orders, machine scheduling, and raw material \
             planning. Production processes are defined with input materials, labor, and machine \
             hours."
        }
        Department::General | Department::Admin => {
            "NovaERP is an integrated business management system with modules for Sales, \
             Purchase, GST, Finance, Inventory, and Production. The system follows standard \
             business processes and compliance requirements."
        }
    }
}

/// One prior conversation turn, oldest first.
pub struct HistoryTurn {
    pub prompt: String,
    pub response: String,
}

/// Builds the filled system prompt for the generative fallback.
pub fn build_system_prompt(
    name: Option<&str>,
    department: Department,
    role: &str,
    history: &[HistoryTurn],
    integrations: &[ErpIntegration],
) -> String {
    let history_block = if history.is_empty() {
        "(no prior conversation)".to_string()
    } else {
        history
            .iter()
            .map(|turn| format!("User: {}\nAskNova: {}", turn.prompt, turn.response))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let integrations_block = if integrations.is_empty() {
        "(none)".to_string()
    } else {
        integrations
            .iter()
            .map(|i| {
                format!(
                    "- {} ({}): {}",
                    i.module,
                    i.name,
                    i.description.as_deref().unwrap_or("no description")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    CHAT_SYSTEM_PROMPT
        .replace("{name}", name.unwrap_or("Employee"))
        .replace("{department}", department.as_str())
        .replace("{role}", role)
        .replace("{module_context}", module_context(department))
        .replace("{history}", &history_block)
        .replace("{integrations}", &integrations_block)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_substitutes_all_placeholders() {
        let history = vec![HistoryTurn {
            prompt: "where are my orders".to_string(),
            response: "Under Sales > Orders.".to_string(),
        }];
        let prompt = build_system_prompt(
            Some("Asha"),
            Department::Sales,
            "manager",
            &history,
            &[],
        );

        assert!(prompt.contains("Name: Asha"));
        assert!(prompt.contains("Department: sales"));
        assert!(prompt.contains("Role: manager"));
        assert!(prompt.contains("where are my orders"));
        assert!(prompt.contains("(none)"));
        assert!(!prompt.contains('{'));
    }

    #[test]
    fn empty_history_renders_placeholder_line() {
        let prompt = build_system_prompt(None, Department::General, "guest", &[], &[]);
        assert!(prompt.contains("Name: Employee"));
        assert!(prompt.contains("(no prior conversation)"));
    }
}
