//! # ERP Data Gateway
//!
//! Proxies a detected intent to a registered ERP integration: permission
//! check against the descriptor's role allow-list, batch validation of
//! required parameters, the outbound HTTP call, and projection of the raw
//! response through the descriptor's field-remapping table.

use crate::{errors::ChatError, types::Department};
use reqwest::{Client as ReqwestClient, Method};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{info, warn};
use turso::{params, Database, Row, Value as TursoValue};
use uuid::Uuid;

/// One declared parameter of an integration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErpParameter {
    pub name: String,
    #[serde(rename = "type", default)]
    pub param_type: String,
    #[serde(default)]
    pub required: bool,
}

/// Reference-data record describing how to proxy a call to an external ERP
/// surface and how to reshape its response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErpIntegration {
    pub id: String,
    /// The intent tag this integration serves.
    pub module: String,
    pub name: String,
    pub description: Option<String>,
    pub endpoint: String,
    pub method: String,
    pub parameters: Vec<ErpParameter>,
    /// Target key -> dotted source path into the raw response.
    pub response_mapping: Map<String, Value>,
    /// Roles allowed to execute this integration; may contain the `"all"`
    /// wildcard.
    pub access_roles: Vec<String>,
    pub is_active: bool,
}

/// Whether a role clears an integration's allow-list.
pub fn role_allowed(access_roles: &[String], role: &str) -> bool {
    access_roles.iter().any(|r| r == "all" || r == role)
}

/// Projects a raw response into a flat object using the descriptor's
/// dotted-path mapping. Missing path segments map to the explicit
/// `"undefined"` marker rather than failing, so a partially matching
/// response still produces every mapped key.
pub fn remap_response(mapping: &Map<String, Value>, raw: &Value) -> Value {
    let mut shaped = Map::new();
    for (target, path) in mapping {
        let resolved = path
            .as_str()
            .and_then(|p| lookup_dotted(raw, p))
            .cloned()
            .unwrap_or_else(|| Value::String("undefined".to_string()));
        shaped.insert(target.clone(), resolved);
    }
    Value::Object(shaped)
}

fn lookup_dotted<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Validates that every required parameter is present, reporting all missing
/// names at once rather than the first only.
fn validate_parameters(
    integration: &ErpIntegration,
    parameters: &Map<String, Value>,
) -> Result<(), ChatError> {
    let missing: Vec<&str> = integration
        .parameters
        .iter()
        .filter(|p| p.required && !parameters.contains_key(&p.name))
        .map(|p| p.name.as_str())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ChatError::Validation(format!(
            "Missing required parameters: {}",
            missing.join(", ")
        )))
    }
}

/// The gateway client for proxied ERP calls.
#[derive(Clone, Debug)]
pub struct ErpGateway {
    client: ReqwestClient,
    base_url: String,
    api_key: Option<String>,
    auth_token: Option<String>,
}

impl ErpGateway {
    /// Creates a new gateway. Every proxied call is bounded by `timeout`;
    /// a timed-out call is treated exactly like any other upstream failure.
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ChatError> {
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(ChatError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            base_url,
            api_key,
            auth_token,
        })
    }

    /// Executes one integration: permission check, parameter validation,
    /// proxied call, response shaping. Network and HTTP failures come back
    /// as [`ChatError::Upstream`], never as a panic or raw transport error.
    pub async fn execute(
        &self,
        integration: &ErpIntegration,
        parameters: &Map<String, Value>,
        role: &str,
    ) -> Result<Value, ChatError> {
        if !role_allowed(&integration.access_roles, role) {
            return Err(ChatError::Permission(format!(
                "Role '{role}' is not authorized for the {} integration",
                integration.module
            )));
        }
        validate_parameters(integration, parameters)?;

        let url = format!("{}{}", self.base_url, integration.endpoint);
        let method = Method::from_bytes(integration.method.to_uppercase().as_bytes())
            .map_err(|_| {
                ChatError::Validation(format!("Unsupported HTTP method '{}'", integration.method))
            })?;

        info!(%url, method = %method, module = %integration.module, "Proxying ERP call");

        let mut request = self.client.request(method.clone(), &url);
        if let Some(key) = &self.api_key {
            request = request.header("X-API-KEY", key);
        }
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        // GET carries parameters in the query string; everything else in the
        // request body.
        request = if method == Method::GET {
            let pairs: Vec<(String, String)> = parameters
                .iter()
                .map(|(k, v)| (k.clone(), query_value(v)))
                .collect();
            request.query(&pairs)
        } else {
            request.json(parameters)
        };

        let response = request.send().await.map_err(|e| {
            warn!(module = %integration.module, error = %e, "ERP call failed");
            ChatError::Upstream(e.to_string())
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(module = %integration.module, %status, "ERP upstream returned an error");
            return Err(ChatError::Upstream(format!(
                "ERP upstream returned {status}: {body}"
            )));
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| ChatError::Upstream(format!("Invalid ERP response body: {e}")))?;

        if integration.response_mapping.is_empty() {
            Ok(raw)
        } else {
            Ok(remap_response(&integration.response_mapping, &raw))
        }
    }
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// --- Storage access ---

const INTEGRATION_COLUMNS: &str = "id, module, name, description, endpoint, method, \
     parameters, response_mapping, access_roles, is_active";

fn integration_from_row(row: &Row) -> Result<ErpIntegration, ChatError> {
    let description = match row.get_value(3)? {
        TursoValue::Text(s) if !s.is_empty() => Some(s),
        _ => None,
    };
    let parameters_raw: String = row.get(6)?;
    let mapping_raw: String = row.get(7)?;
    let roles_raw: String = row.get(8)?;
    let is_active: i64 = row.get(9)?;

    Ok(ErpIntegration {
        id: row.get(0)?,
        module: row.get(1)?,
        name: row.get(2)?,
        description,
        endpoint: row.get(4)?,
        method: row.get(5)?,
        parameters: serde_json::from_str(&parameters_raw).unwrap_or_default(),
        response_mapping: serde_json::from_str(&mapping_raw).unwrap_or_default(),
        access_roles: serde_json::from_str(&roles_raw).unwrap_or_default(),
        is_active: is_active != 0,
    })
}

/// Finds the active integration registered for a module tag.
pub async fn find_integration(
    db: &Database,
    module: &str,
) -> Result<Option<ErpIntegration>, ChatError> {
    let conn = db.connect().map_err(|e| ChatError::StorageConnection(e.to_string()))?;
    let mut rows = conn
        .query(
            &format!(
                "SELECT {INTEGRATION_COLUMNS} FROM erp_integrations \
                 WHERE module = ? AND is_active = 1 LIMIT 1"
            ),
            params![module.to_string()],
        )
        .await?;

    match rows.next().await? {
        Some(row) => Ok(Some(integration_from_row(&row)?)),
        None => Ok(None),
    }
}

/// Fetches one integration by id.
pub async fn get_integration(db: &Database, id: &str) -> Result<ErpIntegration, ChatError> {
    let conn = db.connect().map_err(|e| ChatError::StorageConnection(e.to_string()))?;
    let mut rows = conn
        .query(
            &format!("SELECT {INTEGRATION_COLUMNS} FROM erp_integrations WHERE id = ?"),
            params![id.to_string()],
        )
        .await?;
    let row = rows
        .next()
        .await?
        .ok_or_else(|| ChatError::NotFound(format!("ERP integration '{id}'")))?;
    integration_from_row(&row)
}

/// Lists active integrations visible to a role. Admins see everything;
/// other roles see only integrations whose allow-list admits them.
pub async fn list_integrations(
    db: &Database,
    role: Option<&str>,
) -> Result<Vec<ErpIntegration>, ChatError> {
    let conn = db.connect().map_err(|e| ChatError::StorageConnection(e.to_string()))?;
    let mut rows = conn
        .query(
            &format!(
                "SELECT {INTEGRATION_COLUMNS} FROM erp_integrations \
                 WHERE is_active = 1 ORDER BY module ASC"
            ),
            (),
        )
        .await?;

    let mut integrations = Vec::new();
    while let Some(row) = rows.next().await? {
        integrations.push(integration_from_row(&row)?);
    }

    if let Some(role) = role {
        if role != Department::Admin.as_str() {
            integrations.retain(|i| role_allowed(&i.access_roles, role));
        }
    }
    Ok(integrations)
}

/// Registers a new integration descriptor and returns it.
#[allow(clippy::too_many_arguments)]
pub async fn create_integration(
    db: &Database,
    module: &str,
    name: &str,
    description: Option<&str>,
    endpoint: &str,
    method: &str,
    parameters: &[ErpParameter],
    response_mapping: &Map<String, Value>,
    access_roles: &[String],
) -> Result<ErpIntegration, ChatError> {
    if endpoint.trim().is_empty() {
        return Err(ChatError::Validation(
            "Integration endpoint must be non-empty".to_string(),
        ));
    }
    let conn = db.connect().map_err(|e| ChatError::StorageConnection(e.to_string()))?;
    let id = Uuid::new_v4().to_string();
    let roles = if access_roles.is_empty() {
        vec!["all".to_string()]
    } else {
        access_roles.to_vec()
    };

    conn.execute(
        "INSERT INTO erp_integrations \
         (id, module, name, description, endpoint, method, parameters, response_mapping, access_roles) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            id.clone(),
            module.to_string(),
            name.to_string(),
            description.unwrap_or_default().to_string(),
            endpoint.to_string(),
            method.to_uppercase(),
            serde_json::to_string(parameters)?,
            serde_json::to_string(response_mapping)?,
            serde_json::to_string(&roles)?
        ],
    )
    .await?;

    get_integration(db, &id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn integration(roles: &[&str], params: Vec<ErpParameter>) -> ErpIntegration {
        ErpIntegration {
            id: "i1".to_string(),
            module: "inventory".to_string(),
            name: "Stock levels".to_string(),
            description: None,
            endpoint: "/api/inventory".to_string(),
            method: "GET".to_string(),
            parameters: params,
            response_mapping: Map::new(),
            access_roles: roles.iter().map(|r| r.to_string()).collect(),
            is_active: true,
        }
    }

    #[test]
    fn role_allow_list_honors_wildcard() {
        assert!(role_allowed(&["all".to_string()], "guest"));
        assert!(role_allowed(
            &["manager".to_string(), "admin".to_string()],
            "manager"
        ));
        assert!(!role_allowed(&["manager".to_string()], "guest"));
    }

    #[test]
    fn missing_required_parameters_reported_in_batch() {
        let integration = integration(
            &["all"],
            vec![
                ErpParameter {
                    name: "startDate".to_string(),
                    param_type: "string".to_string(),
                    required: true,
                },
                ErpParameter {
                    name: "endDate".to_string(),
                    param_type: "string".to_string(),
                    required: true,
                },
                ErpParameter {
                    name: "status".to_string(),
                    param_type: "string".to_string(),
                    required: false,
                },
            ],
        );

        let err = validate_parameters(&integration, &Map::new()).unwrap_err();
        let message = err.to_string();
        // Both missing parameters are named, the optional one is not.
        assert!(message.contains("startDate"));
        assert!(message.contains("endDate"));
        assert!(!message.contains("status"));
    }

    #[test]
    fn remap_projects_exactly_the_mapped_keys() {
        let mut mapping = Map::new();
        mapping.insert("total".to_string(), json!("data.summary.total"));
        mapping.insert("first_item".to_string(), json!("data.items.0.name"));
        mapping.insert("missing".to_string(), json!("data.absent.path"));

        let raw = json!({
            "data": {
                "summary": { "total": 42 },
                "items": [ { "name": "SKU-1" } ]
            },
            "ignored": true
        });

        let shaped = remap_response(&mapping, &raw);
        let object = shaped.as_object().unwrap();
        assert_eq!(object.len(), mapping.len());
        assert_eq!(object["total"], json!(42));
        assert_eq!(object["first_item"], json!("SKU-1"));
        assert_eq!(object["missing"], json!("undefined"));
    }

    #[test]
    fn remap_handles_non_object_root() {
        let mut mapping = Map::new();
        mapping.insert("value".to_string(), json!("anything"));
        let shaped = remap_response(&mapping, &json!("just a string"));
        assert_eq!(shaped["value"], json!("undefined"));
    }
}
